//! Error types for the email workflow driver.
//!
//! Gateway failures are reported through `GatewayError` and surface as a
//! `SendOutcome::GatewayFailed` rather than aborting the dispatch pipeline.
//! `DispatchError` is reserved for faults that make the pipeline itself
//! meaningless (bad gateway configuration, a dead log store).

use thiserror::Error;

/// Errors raised by a mail gateway while building or transmitting a message.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("smtp transport error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("failed to build mime message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("invalid mailbox address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("invalid attachment content type: {0}")]
    ContentType(#[from] lettre::message::header::ContentTypeErr),

    #[error("attachment read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("oauth token refresh failed: {0}")]
    TokenRefresh(String),

    #[error("gmail api rejected the message (status {status}): {body}")]
    GmailRejected { status: u16, body: String },

    #[error("platform mailer failure: {0}")]
    Platform(String),
}

/// Errors raised by the dispatch pipeline itself.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("gateway configuration error: {0}")]
    GatewayConfig(String),

    #[error("workflow log insert failed: {0}")]
    Log(String),
}
