//! Debounced Persistence
//!
//! Every mutation arms a trailing-edge deadline; repeated mutations push it
//! back, so a burst of edits collapses into one write of the final snapshot.
//! A digest of the last written snapshot lets unchanged writes be skipped.

use std::time::{Duration, Instant};

use log::trace;
use sha2::{Digest, Sha256};

use crate::asset::StateMachineData;
use crate::error::Result;
use crate::view::VisualLayout;

/// SHA-256 of a serialized layer snapshot, hex encoded.
pub fn snapshot_digest(data: &StateMachineData, layout: &VisualLayout) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(data)?);
    hasher.update(serde_json::to_vec(layout)?);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Pending-write slot with a trailing-edge deadline.
#[derive(Debug, Clone)]
pub struct DebouncedWriter {
    window: Duration,
    deadline: Option<Instant>,
    last_digest: Option<String>,
    writes: usize,
    skipped: usize,
}

impl DebouncedWriter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
            last_digest: None,
            writes: 0,
            skipped: 0,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Arm (or push back) the deadline from `now`.
    pub fn schedule_at(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
        trace!("Write-back scheduled in {}ms", self.window.as_millis());
    }

    pub fn schedule(&mut self) {
        self.schedule_at(Instant::now());
    }

    /// Drop the pending write without performing it.
    pub fn cancel(&mut self) {
        if self.deadline.take().is_some() {
            trace!("Pending write-back cancelled");
        }
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Take the pending slot if its deadline has passed.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Take the pending slot regardless of the deadline.
    pub fn take_pending(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Forget what was last written so the next write always goes out.
    pub fn forget_digest(&mut self) {
        self.last_digest = None;
    }

    /// True when `digest` matches the last successful write.
    pub fn is_unchanged(&self, digest: &str) -> bool {
        self.last_digest.as_deref() == Some(digest)
    }

    pub(crate) fn record_write(&mut self, digest: String) {
        self.last_digest = Some(digest);
        self.writes += 1;
    }

    pub(crate) fn record_skip(&mut self) {
        self.skipped += 1;
    }

    /// Writes performed so far.
    pub fn write_count(&self) -> usize {
        self.writes
    }

    /// Writes skipped because the snapshot had not changed.
    pub fn skipped_count(&self) -> usize {
        self.skipped
    }
}
