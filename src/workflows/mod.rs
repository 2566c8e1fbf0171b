// Email workflow action.
//
// Event-driven mail dispatch for the booking automation platform: template
// rendering, attachment resolution, gateway send and workflow logging.

pub mod attachments;
pub mod email;
pub mod log;

pub use attachments::{
    sanitize_file_name, validate_attachments, AttachmentResolver, HttpFetcher, ResolvedAttachment,
    ResolvedSet, UrlFetcher, ALLOWED_EXTENSIONS, PLACEHOLDER_BASENAME,
};
pub use email::{
    ActionConfig, ActionSettings, DispatchReport, EmailDispatcher, RecipientOutcome, SendOutcome,
    DRIVER,
};
pub use log::{LogData, MemoryLogStore, WorkflowLogEntry, WorkflowLogStore};
