//! Domain event system — structured lifecycle events for observers.
//!
//! The pipeline and scheduler publish events as they move through their
//! states. An external observability collaborator subscribes and decides
//! what to do with them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::record::{Outcome, Stage};

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    /// A pipeline stage started
    StageEntered {
        run_id: String,
        stage: Stage,
        timestamp: DateTime<Utc>,
    },

    /// A pipeline stage produced its output
    StageCompleted {
        run_id: String,
        stage: Stage,
        timestamp: DateTime<Utc>,
    },

    /// A pipeline stage failed and the run is aborting
    StageFailed {
        run_id: String,
        stage: Stage,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// A construction record was appended
    RunRecorded {
        run_id: String,
        outcome: Outcome,
        success: bool,
        timestamp: DateTime<Utc>,
    },

    /// An evolution cycle finished
    CycleCompleted {
        cycle_id: String,
        records: usize,
        errors: usize,
        timestamp: DateTime<Utc>,
    },

    /// The router hopped to the local backend
    ProviderFallback {
        from: String,
        to: String,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// Model text was replaced by a fallback record
    ExtractionFailed {
        context: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// Short machine name of the event.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainEvent::StageEntered { .. } => "stage_entered",
            DomainEvent::StageCompleted { .. } => "stage_completed",
            DomainEvent::StageFailed { .. } => "stage_failed",
            DomainEvent::RunRecorded { .. } => "run_recorded",
            DomainEvent::CycleCompleted { .. } => "cycle_completed",
            DomainEvent::ProviderFallback { .. } => "provider_fallback",
            DomainEvent::ExtractionFailed { .. } => "extraction_failed",
        }
    }
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
