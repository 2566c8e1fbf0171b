//! Host platform mailer gateway.
//!
//! The default transport: messages are handed to whatever mail primitive the
//! host platform exposes (`wp_mail` on WordPress hosts).

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use super::{GatewayAck, MailGateway, OutgoingEmail};
use crate::error::GatewayError;

/// The host platform's mail-send primitive.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlatformMailer: Send + Sync {
    async fn send_mail(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
        headers: &[String],
        attachments: &[PathBuf],
    ) -> Result<(), String>;
}

pub struct PlatformGateway {
    mailer: Arc<dyn PlatformMailer>,
}

impl PlatformGateway {
    pub fn new(mailer: Arc<dyn PlatformMailer>) -> Self {
        Self { mailer }
    }
}

#[async_trait]
impl MailGateway for PlatformGateway {
    fn name(&self) -> &'static str {
        "platform"
    }

    async fn send(&self, message: &OutgoingEmail) -> Result<GatewayAck, GatewayError> {
        let from = if message.from_name.is_empty() {
            message.from_email.clone()
        } else {
            format!("{} <{}>", message.from_name, message.from_email)
        };
        let headers = vec![
            format!("From: {}", from),
            "Content-Type: text/html; charset=UTF-8".to_string(),
        ];

        let attachments: Vec<PathBuf> = message
            .attachments
            .iter()
            .map(|a| a.source_path.clone())
            .collect();

        self.mailer
            .send_mail(
                &message.to,
                &message.subject,
                &message.html_body,
                &headers,
                &attachments,
            )
            .await
            .map_err(GatewayError::Platform)?;

        Ok(GatewayAck {
            gateway: self.name(),
            message_id: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::attachments::ResolvedAttachment;

    fn message() -> OutgoingEmail {
        OutgoingEmail {
            from_email: "noreply@example.com".to_string(),
            from_name: "Acme Bookings".to_string(),
            to: "customer@example.com".to_string(),
            subject: "Reminder".to_string(),
            html_body: "<p>See you soon</p>".to_string(),
            attachments: vec![ResolvedAttachment {
                source_path: PathBuf::from("/tmp/invoice.pdf"),
                size_bytes: 10,
            }],
        }
    }

    #[tokio::test]
    async fn test_headers_and_attachment_paths_forwarded() {
        let mut mailer = MockPlatformMailer::new();
        mailer
            .expect_send_mail()
            .withf(|to, subject, _body, headers, attachments| {
                to == "customer@example.com"
                    && subject == "Reminder"
                    && headers[0] == "From: Acme Bookings <noreply@example.com>"
                    && headers[1].starts_with("Content-Type: text/html")
                    && attachments == [PathBuf::from("/tmp/invoice.pdf")].as_slice()
            })
            .times(1)
            .returning(|_, _, _, _, _| Ok(()));

        let gateway = PlatformGateway::new(Arc::new(mailer));
        let ack = gateway.send(&message()).await.unwrap();
        assert_eq!(ack.gateway, "platform");
    }

    #[tokio::test]
    async fn test_platform_failure_maps_to_gateway_error() {
        let mut mailer = MockPlatformMailer::new();
        mailer
            .expect_send_mail()
            .returning(|_, _, _, _, _| Err("mail() returned false".to_string()));

        let gateway = PlatformGateway::new(Arc::new(mailer));
        let err = gateway.send(&message()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Platform(_)));
    }
}
