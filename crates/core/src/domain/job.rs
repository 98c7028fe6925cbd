// Job Run Domain Model

use super::document::DocumentKey;
use super::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

/// Phase of a single translation run for one DocumentKey
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobPhase {
    Idle,
    SourceFetch,
    CacheCheck,
    UpToDate,
    Translating,
    Merging,
    Committing,
    Done,
    Failed,
}

impl JobPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobPhase::UpToDate | JobPhase::Done | JobPhase::Failed)
    }

    fn can_transition_to(self, next: JobPhase) -> bool {
        use JobPhase::*;

        match (self, next) {
            (Idle, SourceFetch) => true,
            (SourceFetch, CacheCheck) => true,
            (CacheCheck, UpToDate) | (CacheCheck, Translating) => true,
            (Translating, Merging) => true,
            (Merging, Committing) => true,
            (Committing, Done) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobPhase::Idle => "IDLE",
            JobPhase::SourceFetch => "SOURCE_FETCH",
            JobPhase::CacheCheck => "CACHE_CHECK",
            JobPhase::UpToDate => "UP_TO_DATE",
            JobPhase::Translating => "TRANSLATING",
            JobPhase::Merging => "MERGING",
            JobPhase::Committing => "COMMITTING",
            JobPhase::Done => "DONE",
            JobPhase::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// In-memory state of one admitted run
#[derive(Debug, Clone)]
pub struct JobRun {
    pub run_id: String,
    pub key: DocumentKey,
    pub phase: JobPhase,
    pub started_at: i64, // epoch ms
    pub finished_at: Option<i64>,
}

impl JobRun {
    /// Create a run in the Idle phase
    ///
    /// # Arguments
    ///
    /// * `run_id` - Unique run ID (injected, not generated)
    /// * `key` - Document key the run works on
    /// * `started_at` - Admission timestamp in epoch ms (injected, not system time)
    pub fn new(run_id: impl Into<String>, key: DocumentKey, started_at: i64) -> Self {
        Self {
            run_id: run_id.into(),
            key,
            phase: JobPhase::Idle,
            started_at,
            finished_at: None,
        }
    }

    /// Move to `next`, rejecting transitions the state machine does not allow
    pub fn advance(&mut self, next: JobPhase, now_millis: i64) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(DomainError::InvalidPhaseTransition {
                from: self.phase.to_string(),
                to: next.to_string(),
            });
        }
        self.phase = next;
        if next.is_terminal() {
            self.finished_at = Some(now_millis);
        }
        Ok(())
    }

    /// Mark as Failed; a run that already reached a terminal phase keeps it
    pub fn fail(&mut self, now_millis: i64) {
        if !self.phase.is_terminal() {
            self.phase = JobPhase::Failed;
            self.finished_at = Some(now_millis);
        }
    }
}

/// Terminal outcome of a run, delivered exactly once to whoever reads it first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobResult {
    Success { logs: Vec<String> },
    Failure { kind: String, message: String },
}

impl JobResult {
    pub fn is_success(&self) -> bool {
        matches!(self, JobResult::Success { .. })
    }
}

/// What a progress poll observes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressSnapshot {
    Running { logs: Vec<String> },
    Done { result: JobResult },
}
