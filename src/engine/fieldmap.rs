//! Manifest field maps.
//!
//! Flattens a YAML document into dotted field paths with scalar values, so
//! two manifests can be diff-scored field by field. Sequence indices are
//! collapsed to a `[*]` wildcard, volatile server-managed paths are pruned,
//! and nesting depth is capped. On parse failure the builder degrades to a
//! lexical scan of top-level keys instead of failing the entry.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::domain::ValueError;

/// Paths excluded from comparison: populated or rewritten by the server,
/// never meaningful in a generated answer.
const VOLATILE_PATHS: &[&str] = &[
    "metadata.resourceVersion",
    "metadata.uid",
    "metadata.generation",
    "metadata.creationTimestamp",
    "metadata.managedFields",
    "metadata.annotations.kubectl.kubernetes.io/last-applied-configuration",
    "status",
];

fn top_level_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^([A-Za-z0-9_][A-Za-z0-9_.\-/]*):[ \t]*(.*)$").expect("valid key regex")
    })
}

/// Flattened view of one manifest: dotted path -> scalar value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    fields: BTreeMap<String, String>,
}

impl FieldMap {
    /// Build a field map from manifest text.
    ///
    /// Unparseable text falls back to extracting top-level `key:` lines.
    pub fn from_manifest(text: &str, max_depth: usize) -> Self {
        let mut map = match serde_yaml::from_str::<serde_yaml::Value>(text) {
            Ok(doc) => {
                let mut map = FieldMap::default();
                map.flatten(&doc, String::new(), 0, max_depth);
                map
            }
            Err(e) => {
                tracing::debug!(error = %e, "Manifest parse failed, using lexical key scan");
                Self::from_lexical_scan(text)
            }
        };
        map.prune_volatile();
        map
    }

    /// Degraded builder: top-level keys only, scanned line by line.
    fn from_lexical_scan(text: &str) -> Self {
        let mut fields = BTreeMap::new();
        for caps in top_level_key_re().captures_iter(text) {
            let key = caps[1].to_string();
            let value = caps[2].trim().to_string();
            fields.entry(key).or_insert(value);
        }
        Self { fields }
    }

    fn flatten(&mut self, value: &serde_yaml::Value, path: String, depth: usize, max_depth: usize) {
        if depth > max_depth {
            return;
        }
        match value {
            serde_yaml::Value::Mapping(mapping) => {
                for (key, child) in mapping {
                    let Some(key) = key.as_str() else { continue };
                    let child_path = if path.is_empty() {
                        key.to_string()
                    } else {
                        format!("{path}.{key}")
                    };
                    self.flatten(child, child_path, depth + 1, max_depth);
                }
            }
            serde_yaml::Value::Sequence(items) => {
                // Indices collapse to a wildcard; first occurrence of a
                // path wins so paths never repeat.
                let child_path = format!("{path}[*]");
                for item in items {
                    self.flatten(item, child_path.clone(), depth + 1, max_depth);
                }
            }
            scalar => {
                // A bare scalar document has no addressable fields.
                if path.is_empty() {
                    return;
                }
                let rendered = render_scalar(scalar);
                self.fields.entry(path).or_insert(rendered);
            }
        }
    }

    fn prune_volatile(&mut self) {
        self.fields.retain(|path, _| {
            !VOLATILE_PATHS
                .iter()
                .any(|prefix| path == prefix || path.starts_with(&format!("{prefix}.")))
        });
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn paths(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.fields.get(path).map(String::as_str)
    }

    /// Diff a generated map against this reference map.
    pub fn diff(&self, generated: &FieldMap) -> FieldDiff {
        let mut missing = Vec::new();
        let mut value_errors = Vec::new();
        let mut matched = 0usize;

        for (path, expected) in &self.fields {
            match generated.get(path) {
                Some(got) => {
                    matched += 1;
                    if got != expected {
                        value_errors.push(ValueError {
                            key: path.clone(),
                            expected: expected.clone(),
                            got: got.to_string(),
                        });
                    }
                }
                None => missing.push(path.clone()),
            }
        }

        let coverage_percent = if self.fields.is_empty() {
            None
        } else {
            Some(100.0 * matched as f64 / self.fields.len() as f64)
        };

        FieldDiff {
            coverage_percent,
            missing,
            value_errors,
        }
    }
}

fn render_scalar(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::Null => "null".to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

/// Result of diffing a generated field map against a reference.
#[derive(Debug, Clone)]
pub struct FieldDiff {
    /// `None` when the reference had no comparable fields.
    pub coverage_percent: Option<f64>,
    pub missing: Vec<String>,
    pub value_errors: Vec<ValueError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEPLOYMENT: &str = "\
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
  resourceVersion: \"12345\"
spec:
  replicas: 3
  template:
    spec:
      containers:
        - name: app
          image: nginx:1.25
status:
  readyReplicas: 3
";

    fn map(text: &str) -> FieldMap {
        FieldMap::from_manifest(text, 8)
    }

    #[test]
    fn test_flattens_nested_paths() {
        let fields = map(DEPLOYMENT);
        assert_eq!(fields.get("apiVersion"), Some("apps/v1"));
        assert_eq!(fields.get("spec.replicas"), Some("3"));
        assert_eq!(
            fields.get("spec.template.spec.containers[*].image"),
            Some("nginx:1.25")
        );
    }

    #[test]
    fn test_volatile_paths_pruned() {
        let fields = map(DEPLOYMENT);
        assert_eq!(fields.get("metadata.resourceVersion"), None);
        assert_eq!(fields.get("status.readyReplicas"), None);
        assert_eq!(fields.get("metadata.name"), Some("web"));
        assert!(fields.paths().all(|p| !p.starts_with("status")));
        assert_eq!(fields.len(), 6);
    }

    #[test]
    fn test_depth_cap_drops_deep_paths() {
        let shallow = FieldMap::from_manifest(DEPLOYMENT, 2);
        assert_eq!(shallow.get("spec.replicas"), Some("3"));
        assert_eq!(shallow.get("spec.template.spec.containers[*].image"), None);
    }

    #[test]
    fn test_lexical_fallback_on_parse_failure() {
        // Unbalanced bracket makes this invalid YAML.
        let broken = "apiVersion: v1\nkind: ConfigMap\ndata: [unclosed\n";
        let fields = map(broken);
        assert_eq!(fields.get("apiVersion"), Some("v1"));
        assert_eq!(fields.get("kind"), Some("ConfigMap"));
    }

    #[test]
    fn test_diff_coverage_and_missing() {
        let reference = map("a: 1\nb: 2\nc: 3\n");
        let generated = map("a: 1\nb: 2\n");
        let diff = reference.diff(&generated);
        let coverage = diff.coverage_percent.unwrap();
        assert!((coverage - 66.666).abs() < 0.1);
        assert_eq!(diff.missing, vec!["c".to_string()]);
        assert!(diff.value_errors.is_empty());
    }

    #[test]
    fn test_diff_value_mismatch() {
        let reference = map("spec:\n  replicas: 3\n");
        let generated = map("spec:\n  replicas: 5\n");
        let diff = reference.diff(&generated);
        assert_eq!(diff.coverage_percent, Some(100.0));
        assert_eq!(diff.value_errors.len(), 1);
        assert_eq!(diff.value_errors[0].key, "spec.replicas");
        assert_eq!(diff.value_errors[0].expected, "3");
        assert_eq!(diff.value_errors[0].got, "5");
    }

    #[test]
    fn test_adding_missing_field_increases_coverage() {
        let reference = map("a: 1\nb: 2\nc: 3\n");
        let before = reference.diff(&map("a: 1\n")).coverage_percent.unwrap();
        let after = reference.diff(&map("a: 1\nb: 2\n")).coverage_percent.unwrap();
        assert!(after > before);
    }

    #[test]
    fn test_empty_reference_has_no_coverage() {
        let reference = map("");
        let diff = reference.diff(&map("a: 1\n"));
        assert_eq!(diff.coverage_percent, None);
        assert!(diff.missing.is_empty());
    }

    #[test]
    fn test_coverage_bounds() {
        let reference = map("a: 1\nb: 2\n");
        let none = reference.diff(&map("x: 9\n")).coverage_percent.unwrap();
        let all = reference.diff(&map("a: 1\nb: 2\n")).coverage_percent.unwrap();
        assert_eq!(none, 0.0);
        assert_eq!(all, 100.0);
    }
}
