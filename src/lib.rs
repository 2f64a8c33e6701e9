/*!
 * # sitecraft - document lifecycle for a visual website editor
 *
 * Coordinates the lifecycle of the website being edited: starting from a blank
 * page, a template or a recent file, opening an existing document, and publishing
 * it to a hosting target while tracking the remote publish job to completion.
 *
 * ## Features
 *
 * - New document flow with template dialog, recent files and blank fallback
 * - Open document flow restricted to the editor's native mimetype
 * - Publish flow with settings redirection and status polling
 * - Injected collaborators, so the editor UI, storage and hosting stay pluggable
 * - Lifecycle events with fixed weights for simple scoring
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `document`: Document, file and publication target model
 * - `collaborators`: Contracts of the external collaborators, plus:
 *   - `collaborators::fs_store`: Local disk document store
 *   - `collaborators::http_transport`: JSON publish transport
 *   - `collaborators::console`: Headless collaborators for the CLI
 *   - `collaborators::mock`: Scripted collaborators for tests
 * - `lifecycle`: The orchestrator and the publish status poller
 * - `events`: Lifecycle event names and weights
 * - `errors`: Custom error types for the library
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod collaborators;
pub mod document;
pub mod errors;
pub mod events;
pub mod lifecycle;

// Re-export main types for easier usage
pub use app_config::Config;
pub use document::{Document, FileInfo, PublicationTarget};
pub use errors::{AppError, LifecycleError, PickerError, StoreError, TransportError};
pub use lifecycle::{Callbacks, EditorContext, LifecycleOrchestrator, PublishOutcome};
