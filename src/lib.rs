//! Email action driver for booking workflow automation.
//!
//! When a business event fires (appointment created, invoice ready), the
//! [`workflows::EmailDispatcher`] renders an email from the action's
//! templates, resolves local and URL attachments, sends one message per
//! recipient through the configured gateway (platform mailer, SMTP or the
//! Gmail API) and records a workflow log entry per attempt.
//!
//! The host platform supplies the collaborator seams in [`services`]:
//! settings storage, capability limits, usage counters and the shortcode
//! engine.

pub mod config;
pub mod error;
pub mod gateways;
pub mod services;
pub mod workflows;

pub use config::{Config, GmailConfig, SmtpConfig, SmtpSecurity};
pub use error::{DispatchError, GatewayError};
pub use gateways::{GatewayAck, GatewayKind, MailGateway, OutgoingEmail, PlatformMailer};
pub use workflows::{
    ActionConfig, ActionSettings, DispatchReport, EmailDispatcher, SendOutcome,
};
