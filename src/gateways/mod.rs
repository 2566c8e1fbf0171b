// Mail gateways.
//
// Every transport implements the same `MailGateway` capability so the
// dispatcher can treat platform mailer, SMTP and Gmail uniformly and report
// failures through one channel.

pub mod gmail;
pub mod platform;
pub mod smtp;

use std::path::Path;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::Message;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::workflows::attachments::ResolvedAttachment;

pub use gmail::GmailGateway;
pub use platform::{PlatformGateway, PlatformMailer};
pub use smtp::SmtpGateway;

/// A fully rendered message, ready for any transport.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub from_email: String,
    pub from_name: String,
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub attachments: Vec<ResolvedAttachment>,
}

/// Transport acknowledgement. `message_id` is only present when the gateway
/// reports one (Gmail does, SMTP and the platform mailer do not).
#[derive(Debug, Clone)]
pub struct GatewayAck {
    pub gateway: &'static str,
    pub message_id: Option<String>,
}

#[async_trait]
pub trait MailGateway: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, message: &OutgoingEmail) -> Result<GatewayAck, GatewayError>;
}

/// The three supported mail transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayKind {
    Platform,
    Smtp,
    Gmail,
}

impl GatewayKind {
    /// Parse the `mail_gateway` setting. Legacy value spellings from older
    /// installations are accepted; anything unknown falls back to the
    /// platform mailer.
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "smtp" => GatewayKind::Smtp,
            "gmail" | "gmail_api" | "gmail_smtp" => GatewayKind::Gmail,
            _ => GatewayKind::Platform,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayKind::Platform => "platform",
            GatewayKind::Smtp => "smtp",
            GatewayKind::Gmail => "gmail",
        }
    }
}

impl OutgoingEmail {
    fn from_mailbox(&self) -> Result<Mailbox, GatewayError> {
        let mailbox = if self.from_name.is_empty() {
            self.from_email.parse()?
        } else {
            format!("{} <{}>", self.from_name, self.from_email).parse()?
        };
        Ok(mailbox)
    }
}

/// Build the RFC 5322 message shared by the SMTP and Gmail gateways:
/// an HTML part (UTF-8) plus one attachment part per resolved file, named
/// after its base filename.
pub(crate) async fn build_mime_message(message: &OutgoingEmail) -> Result<Message, GatewayError> {
    let mut multipart = MultiPart::mixed().singlepart(
        SinglePart::builder()
            .header(ContentType::TEXT_HTML)
            .body(message.html_body.clone()),
    );

    for attachment in &message.attachments {
        let bytes = tokio::fs::read(&attachment.source_path).await?;
        let filename = attachment
            .source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());
        let content_type = ContentType::parse(content_type_for(&attachment.source_path))?;

        multipart = multipart.singlepart(Attachment::new(filename).body(bytes, content_type));
    }

    let email = Message::builder()
        .from(message.from_mailbox()?)
        .to(message.to.parse()?)
        .subject(message.subject.clone())
        .multipart(multipart)?;

    Ok(email)
}

/// Content type by extension for the allow-listed attachment formats.
pub(crate) fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "png" => "image/png",
        "bmp" => "image/bmp",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "zip" => "application/zip",
        "rar" => "application/vnd.rar",
        _ => "application/octet-stream",
    }
}
