/*!
 * Document lifecycle: new, open and publish flows.
 *
 * - `orchestrator`: sequences the flows and reconciles cancellation, fallback and notifications
 * - `poller`: tracks an accepted publish job until it stops
 * - `callbacks`: continuation sets settled at most once
 * - `context`: the collaborators every flow works through
 */

pub mod callbacks;
pub mod context;
pub mod orchestrator;
pub mod poller;

pub use callbacks::Callbacks;
pub use context::EditorContext;
pub use orchestrator::{LifecycleOrchestrator, PublishOutcome, PublishState, SkipReason};
pub use poller::{JobState, PollerSettings, PublishJob, PublishStatusPoller};
