/*!
 * Lifecycle event tracking.
 *
 * Every lifecycle operation reports a request, then exactly one of success, error
 * or cancel, to the injected `EventSink`. Weights are part of the contract:
 * request 0, success +1, error -1, cancel 0.
 */

use std::fmt;

use crate::collaborators::EventSink;

/// Category every lifecycle event is filed under
pub const EVENT_CATEGORY: &str = "controller-events";

/// Outcome reported for a lifecycle action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Request,
    Success,
    Error,
    Cancel,
}

impl EventOutcome {
    /// Name recorded in the event sink
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Success => "success",
            Self::Error => "error",
            Self::Cancel => "cancel",
        }
    }

    /// Score attached to the outcome
    pub fn weight(&self) -> i32 {
        match self {
            Self::Request | Self::Cancel => 0,
            Self::Success => 1,
            Self::Error => -1,
        }
    }
}

impl fmt::Display for EventOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle action being tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    NewFile,
    OpenFile,
    Publish,
}

impl Action {
    /// Name recorded in the event sink
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewFile => "file.new",
            Self::OpenFile => "file.open",
            Self::Publish => "file.publish",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record one lifecycle event with its contractual weight
pub fn track(sink: &dyn EventSink, action: Action, outcome: EventOutcome) {
    sink.record_event(EVENT_CATEGORY, outcome.as_str(), action.as_str(), outcome.weight());
}
