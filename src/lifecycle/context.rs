use std::sync::Arc;

use crate::collaborators::{
    DocumentStore, EditorView, EventSink, FilePicker, NotificationChannel, PublishTransport,
    TemplateDialog, UndoHistory,
};

/// Collaborators shared by the lifecycle operations
#[derive(Clone)]
pub struct EditorContext {
    pub store: Arc<dyn DocumentStore>,
    pub file_picker: Arc<dyn FilePicker>,
    pub template_dialog: Arc<dyn TemplateDialog>,
    pub transport: Arc<dyn PublishTransport>,
    pub notifications: Arc<dyn NotificationChannel>,
    pub events: Arc<dyn EventSink>,
    pub undo: Arc<dyn UndoHistory>,
    pub view: Arc<dyn EditorView>,
}
