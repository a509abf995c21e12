//! External Kubernetes toolchain.
//!
//! Schema conformance, linting, and server-side dry-run are performed by
//! external binaries behind the [`ClusterTools`] capability trait. Every
//! invocation is side-effect-free against real infrastructure and returns a
//! captured [`CheckOutcome`]; spawn failures and timeouts become failed
//! checks, never unhandled faults.

mod kube;

pub use kube::*;

use crate::domain::CheckOutcome;

/// Capability trait over the kube toolchain.
#[async_trait::async_trait]
pub trait ClusterTools: Send + Sync {
    /// Validate a manifest against known resource schemas.
    async fn schema_check(&self, manifest: &str) -> CheckOutcome;

    /// Lint a manifest for critical findings.
    async fn lint(&self, manifest: &str) -> CheckOutcome;

    /// Apply a manifest with server-side dry-run in the given namespace.
    async fn dry_run_manifest(&self, manifest: &str, namespace: &str) -> CheckOutcome;

    /// Execute a pre-rewritten, non-persisting command argument vector.
    async fn dry_run_command(&self, argv: &[String]) -> CheckOutcome;
}

/// Deterministic toolchain stub with scripted outcomes.
///
/// Used in test suites so engine logic stays decoupled from installed
/// binaries and live clusters.
pub struct StubTools {
    pub schema: CheckOutcome,
    pub lint: CheckOutcome,
    pub dry_run: CheckOutcome,
}

impl StubTools {
    /// Stub where every check passes.
    pub fn all_passing() -> Self {
        Self {
            schema: CheckOutcome::passed(""),
            lint: CheckOutcome::passed(""),
            dry_run: CheckOutcome::passed(""),
        }
    }

    /// Stub where the dry-run fails with the given diagnostic.
    pub fn dry_run_failing(output: impl Into<String>) -> Self {
        Self {
            schema: CheckOutcome::passed(""),
            lint: CheckOutcome::passed(""),
            dry_run: CheckOutcome::failed(output),
        }
    }
}

#[async_trait::async_trait]
impl ClusterTools for StubTools {
    async fn schema_check(&self, _manifest: &str) -> CheckOutcome {
        self.schema.clone()
    }

    async fn lint(&self, _manifest: &str) -> CheckOutcome {
        self.lint.clone()
    }

    async fn dry_run_manifest(&self, _manifest: &str, _namespace: &str) -> CheckOutcome {
        self.dry_run.clone()
    }

    async fn dry_run_command(&self, _argv: &[String]) -> CheckOutcome {
        self.dry_run.clone()
    }
}
