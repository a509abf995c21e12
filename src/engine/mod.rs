//! Verification engine for Kubejudge.
//!
//! This module contains the answer-verification pipeline:
//! - Classifier: assigns each generated answer an output modality
//! - Extractor: pulls fenced blocks out of prose
//! - Manifest Verifier: field-diffs and dry-runs structured-config answers
//! - Command Verifier: syntax-checks and dry-runs command-line answers
//! - Hypothesis Generator: derives a checklist of required facts
//! - Entailment Judge: checks each fact against the answer
//! - Scorer: reconciles signals into one verdict
//! - Verification Coordinator: orchestrates all stages

mod classifier;
mod command;
mod coordinator;
mod entailment;
mod extract;
mod fieldmap;
mod hypothesis;
mod manifest;
mod scorer;

pub use classifier::*;
pub use command::*;
pub use coordinator::*;
pub use entailment::*;
pub use extract::*;
pub use fieldmap::*;
pub use hypothesis::*;
pub use manifest::*;
pub use scorer::*;
