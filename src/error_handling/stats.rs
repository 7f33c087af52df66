//! Pipeline statistics tracking.
//!
//! Thread-safe counters for record outcomes and connection events, shared
//! between the orchestrator and the resilient pool.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use strum::IntoEnumIterator;

use super::types::PipelineEvent;

/// Thread-safe pipeline statistics tracker.
///
/// Every [`PipelineEvent`] has an atomic counter initialized to zero on
/// creation, so the tracker can be shared across tasks with `Arc`.
#[derive(Debug)]
pub struct PipelineStats {
    events: HashMap<PipelineEvent, AtomicUsize>,
}

impl PipelineStats {
    pub fn new() -> Self {
        let mut events = HashMap::new();
        for event in PipelineEvent::iter() {
            events.insert(event, AtomicUsize::new(0));
        }
        PipelineStats { events }
    }

    /// Increment the counter for an event.
    pub fn increment(&self, event: PipelineEvent) {
        if let Some(counter) = self.events.get(&event) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!(
                "Attempted to increment counter for {:?} which is not in the map. \
                 This indicates a bug in PipelineStats initialization.",
                event
            );
        }
    }

    /// Get the count for an event.
    pub fn get(&self, event: PipelineEvent) -> usize {
        self.events
            .get(&event)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Records that completed, through either branch.
    pub fn total_succeeded(&self) -> usize {
        self.get(PipelineEvent::RecordInserted) + self.get(PipelineEvent::RecordUpdated)
    }

    /// Logs every non-zero counter at info level.
    pub fn log_summary(&self) {
        for event in PipelineEvent::iter() {
            let count = self.get(event);
            if count > 0 {
                log::info!("   {}: {}", event, count);
            }
        }
    }
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}
