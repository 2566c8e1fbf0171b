use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::gateways::GatewayKind;
use crate::services::settings::SettingsStore;

#[derive(Debug, Clone)]
pub struct Config {
    /// Gateway used when the `mail_gateway` setting is absent.
    pub default_gateway: GatewayKind,
    /// Directory URL attachments are downloaded into.
    pub cache_dir: PathBuf,
    pub gmail: Option<GmailConfig>,
}

/// SMTP configuration for sending emails
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub security: SmtpSecurity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmtpSecurity {
    None,
    StartTls,
    Tls,
}

/// OAuth application credentials and endpoints for the Gmail API gateway.
///
/// The access/refresh tokens themselves live in the settings store; only the
/// deployment-level application identity belongs here. Endpoints are
/// overridable so tests can point them at a local mock server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GmailConfig {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub api_base: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // Gmail gateway is only available when the OAuth app is configured
        let gmail = if env::var("GMAIL_CLIENT_ID").is_ok() {
            Some(GmailConfig {
                client_id: env::var("GMAIL_CLIENT_ID").unwrap_or_default(),
                client_secret: env::var("GMAIL_CLIENT_SECRET").unwrap_or_default(),
                auth_url: env::var("GMAIL_AUTH_URL")
                    .unwrap_or_else(|_| "https://accounts.google.com/o/oauth2/v2/auth".to_string()),
                token_url: env::var("GMAIL_TOKEN_URL")
                    .unwrap_or_else(|_| "https://oauth2.googleapis.com/token".to_string()),
                api_base: env::var("GMAIL_API_BASE")
                    .unwrap_or_else(|_| "https://gmail.googleapis.com".to_string()),
            })
        } else {
            None
        };

        Ok(Config {
            default_gateway: GatewayKind::parse(
                &env::var("MAIL_GATEWAY").unwrap_or_else(|_| "platform".to_string()),
            ),
            cache_dir: env::var("MAIL_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| env::temp_dir().join("workflow-mailer")),
            gmail,
        })
    }
}

impl SmtpConfig {
    /// Build the SMTP configuration from the installation-level settings,
    /// the same keys the settings UI writes.
    pub fn from_settings(settings: &dyn SettingsStore) -> Self {
        SmtpConfig {
            host: settings.get_option("smtp_hostname", "", true),
            port: settings
                .get_option("smtp_port", "587", true)
                .parse()
                .unwrap_or(587),
            username: settings.get_option("smtp_username", "", true),
            password: settings.get_option("smtp_password", "", true),
            security: SmtpSecurity::parse(&settings.get_option("smtp_secure", "tls", true)),
        }
    }

    /// Check if SMTP is properly configured
    pub fn is_configured(&self) -> bool {
        !self.host.is_empty() && !self.username.is_empty()
    }
}

impl SmtpSecurity {
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "ssl" | "tls" | "smtps" => SmtpSecurity::Tls,
            "starttls" => SmtpSecurity::StartTls,
            _ => SmtpSecurity::None,
        }
    }
}
