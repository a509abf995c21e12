//! Batch entry source/sink.
//!
//! Reads a JSON array of entries, runs each through the verification
//! pipeline under a bounded-concurrency limiter, and writes the same array
//! augmented with verification fields. Entries are embarrassingly parallel;
//! one entry's failure never prevents another from being scored.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::domain::{Entry, VerificationReport, Verdict};
use crate::engine::VerificationCoordinator;
use crate::error::{JudgeError, JudgeResult};

/// One evaluated record in the output array.
#[derive(Debug, Serialize, Deserialize)]
pub struct EvaluatedEntry {
    #[serde(flatten)]
    pub entry: Entry,
    pub verification: VerificationReport,
    pub verdict: Verdict,
}

/// Read an entry array from a JSON file.
pub fn read_entries(path: &Path) -> JudgeResult<Vec<Entry>> {
    let text = std::fs::read_to_string(path)?;
    let entries: Vec<Entry> = serde_json::from_str(&text)?;
    Ok(entries)
}

/// Write evaluated records to a JSON file.
pub fn write_results(path: &Path, results: &[EvaluatedEntry]) -> JudgeResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let text = serde_json::to_string_pretty(results)?;
    std::fs::write(path, text)?;
    Ok(())
}

/// Verify every entry, preserving input order in the output.
pub async fn run_entries(
    coordinator: Arc<VerificationCoordinator>,
    entries: Vec<Entry>,
    max_concurrent: usize,
) -> Vec<EvaluatedEntry> {
    let limiter = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut tasks = JoinSet::new();

    for (index, entry) in entries.into_iter().enumerate() {
        let coordinator = coordinator.clone();
        let limiter = limiter.clone();
        tasks.spawn(async move {
            let _permit = limiter.acquire_owned().await.ok();
            let result = coordinator.verify(&entry).await;
            let mut entry = entry;
            entry.output_category = result.category;
            (
                index,
                EvaluatedEntry {
                    entry,
                    verification: result.report,
                    verdict: result.verdict,
                },
            )
        });
    }

    let mut indexed = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(item) => indexed.push(item),
            // A panicked task loses only its own entry; the batch goes on.
            Err(e) => tracing::error!(error = %e, "Entry task failed"),
        }
    }
    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, record)| record).collect()
}

/// End-to-end batch run: file in, file out.
pub async fn run_file(
    coordinator: Arc<VerificationCoordinator>,
    input: &Path,
    output: &Path,
    max_concurrent: usize,
) -> JudgeResult<usize> {
    let entries = read_entries(input)?;
    if entries.is_empty() {
        return Err(JudgeError::BadRequest(format!(
            "no entries in {}",
            input.display()
        )));
    }

    tracing::info!(
        count = entries.len(),
        input = %input.display(),
        "Starting batch verification"
    );

    let results = run_entries(coordinator, entries, max_concurrent).await;
    let count = results.len();
    write_results(output, &results)?;

    let correct = results.iter().filter(|r| r.verdict.is_correct).count();
    tracing::info!(
        count,
        correct,
        output = %output.display(),
        "Batch verification complete"
    );

    Ok(count)
}
