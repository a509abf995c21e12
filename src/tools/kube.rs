//! Live toolchain implementation over kubeconform, kube-score and kubectl.

use std::io::Write;
use std::process::Stdio;
use std::time::Duration;

use tempfile::NamedTempFile;
use tokio::process::Command;

use crate::config::ToolsConfig;
use crate::domain::CheckOutcome;
use crate::tools::ClusterTools;

/// Runs the real binaries with an explicit wall-clock limit per invocation.
pub struct KubeToolchain {
    config: ToolsConfig,
}

impl KubeToolchain {
    pub fn new(config: ToolsConfig) -> Self {
        Self { config }
    }

    /// Write a manifest to a temp artifact the tools can read.
    ///
    /// The file lives until the guard drops, after both checks finish.
    fn write_manifest(&self, manifest: &str) -> std::io::Result<NamedTempFile> {
        let mut file = tempfile::Builder::new()
            .prefix("kubejudge-")
            .suffix(".yaml")
            .tempfile()?;
        file.write_all(manifest.as_bytes())?;
        file.flush()?;
        Ok(file)
    }

    /// Run one external command, capturing exit status and combined output.
    ///
    /// A spawn error or timeout becomes a failed outcome with the cause in
    /// `output`. The child is killed if the future is dropped at timeout.
    async fn run(&self, program: &str, args: &[&str]) -> CheckOutcome {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let limit = Duration::from_secs(self.config.timeout_secs);
        let result = tokio::time::timeout(limit, command.output()).await;

        match result {
            Ok(Ok(output)) => {
                let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
                combined.push_str(&String::from_utf8_lossy(&output.stderr));
                CheckOutcome {
                    pass: output.status.success(),
                    output: combined,
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(program, error = %e, "Tool invocation failed");
                CheckOutcome::failed(format!("failed to invoke {program}: {e}"))
            }
            Err(_) => {
                tracing::warn!(program, timeout_secs = self.config.timeout_secs, "Tool timed out");
                CheckOutcome::failed(format!(
                    "{program} timed out after {}s",
                    self.config.timeout_secs
                ))
            }
        }
    }
}

#[async_trait::async_trait]
impl ClusterTools for KubeToolchain {
    async fn schema_check(&self, manifest: &str) -> CheckOutcome {
        let file = match self.write_manifest(manifest) {
            Ok(f) => f,
            Err(e) => return CheckOutcome::failed(format!("temp file error: {e}")),
        };
        let path = file.path().to_string_lossy().into_owned();
        self.run(&self.config.kubeconform_bin, &["-summary", &path])
            .await
    }

    async fn lint(&self, manifest: &str) -> CheckOutcome {
        let file = match self.write_manifest(manifest) {
            Ok(f) => f,
            Err(e) => return CheckOutcome::failed(format!("temp file error: {e}")),
        };
        let path = file.path().to_string_lossy().into_owned();
        let outcome = self.run(&self.config.kube_score_bin, &["score", &path]).await;
        // kube-score exits nonzero on findings; only CRITICAL ones fail the check.
        CheckOutcome {
            pass: !outcome.output.contains("CRITICAL"),
            output: outcome.output,
        }
    }

    async fn dry_run_manifest(&self, manifest: &str, namespace: &str) -> CheckOutcome {
        let file = match self.write_manifest(manifest) {
            Ok(f) => f,
            Err(e) => return CheckOutcome::failed(format!("temp file error: {e}")),
        };
        let path = file.path().to_string_lossy().into_owned();
        self.run(
            &self.config.kubectl_bin,
            &[
                "apply",
                "--dry-run=server",
                "-f",
                &path,
                "-n",
                namespace,
            ],
        )
        .await
    }

    async fn dry_run_command(&self, argv: &[String]) -> CheckOutcome {
        let Some((program, args)) = argv.split_first() else {
            return CheckOutcome::failed("empty command".to_string());
        };
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(program, &args).await
    }
}
