//! Authenticated SMTP gateway built on lettre.

use std::time::Duration;

use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::PoolConfig;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};

use super::{build_mime_message, GatewayAck, MailGateway, OutgoingEmail};
use crate::config::{SmtpConfig, SmtpSecurity};
use crate::error::GatewayError;

pub struct SmtpGateway {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpGateway {
    pub fn new(config: &SmtpConfig) -> Result<Self, GatewayError> {
        let builder = match config.security {
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?,
            SmtpSecurity::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            }
            SmtpSecurity::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            }
        };

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .pool_config(PoolConfig::new().max_size(10))
            .timeout(Some(Duration::from_secs(10)))
            .build();

        Ok(SmtpGateway { transport })
    }
}

#[async_trait]
impl MailGateway for SmtpGateway {
    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn send(&self, message: &OutgoingEmail) -> Result<GatewayAck, GatewayError> {
        let email = build_mime_message(message).await?;
        self.transport.send(email).await?;

        Ok(GatewayAck {
            gateway: self.name(),
            message_id: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(security: SmtpSecurity) -> SmtpConfig {
        SmtpConfig {
            host: "mail.example.com".to_string(),
            port: 587,
            username: "mailer".to_string(),
            password: "hunter2".to_string(),
            security,
        }
    }

    #[tokio::test]
    async fn test_transport_builds_for_each_security_mode() {
        assert!(SmtpGateway::new(&config(SmtpSecurity::Tls)).is_ok());
        assert!(SmtpGateway::new(&config(SmtpSecurity::StartTls)).is_ok());
        assert!(SmtpGateway::new(&config(SmtpSecurity::None)).is_ok());
    }

    #[tokio::test]
    async fn test_gateway_name() {
        let gateway = SmtpGateway::new(&config(SmtpSecurity::None)).unwrap();
        assert_eq!(gateway.name(), "smtp");
    }
}
