//! Gmail API gateway.
//!
//! Uses the access/refresh tokens the host stored when the administrator
//! connected the Google account. The access token is renewed through the
//! refresh grant when expired; the authorization-code flow itself is out of
//! scope here. Messages go out as base64url-encoded RFC 5322 payloads via
//! `users/me/messages/send`.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Utc;
use oauth2::basic::BasicClient;
use oauth2::{AuthUrl, ClientId, ClientSecret, RefreshToken, TokenResponse, TokenUrl};
use serde::Deserialize;
use tracing::{debug, info};

use super::{build_mime_message, GatewayAck, MailGateway, OutgoingEmail};
use crate::config::GmailConfig;
use crate::error::GatewayError;
use crate::services::settings::SettingsStore;

const ACCESS_TOKEN_KEY: &str = "gmail_access_token";
const REFRESH_TOKEN_KEY: &str = "gmail_refresh_token";
const TOKEN_EXPIRES_KEY: &str = "gmail_token_expires_at";

pub struct GmailGateway {
    config: GmailConfig,
    settings: Arc<dyn SettingsStore>,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct GmailSendResponse {
    id: Option<String>,
}

impl GmailGateway {
    pub fn new(config: GmailConfig, settings: Arc<dyn SettingsStore>, http: reqwest::Client) -> Self {
        Self {
            config,
            settings,
            http,
        }
    }

    /// Stored access token, renewed through the refresh grant when expired.
    async fn access_token(&self) -> Result<String, GatewayError> {
        let access = self.settings.get_option(ACCESS_TOKEN_KEY, "", true);
        let expires_at: i64 = self
            .settings
            .get_option(TOKEN_EXPIRES_KEY, "0", true)
            .parse()
            .unwrap_or(0);

        if !access.is_empty() && Utc::now().timestamp() < expires_at {
            return Ok(access);
        }

        let refresh = self.settings.get_option(REFRESH_TOKEN_KEY, "", true);
        if refresh.is_empty() {
            // No way to renew; an unexpired-looking token beats nothing.
            if !access.is_empty() {
                return Ok(access);
            }
            return Err(GatewayError::TokenRefresh(
                "no gmail refresh token stored".to_string(),
            ));
        }

        debug!("gmail access token expired, refreshing");

        let client = BasicClient::new(
            ClientId::new(self.config.client_id.clone()),
            Some(ClientSecret::new(self.config.client_secret.clone())),
            AuthUrl::new(self.config.auth_url.clone())
                .map_err(|e| GatewayError::TokenRefresh(e.to_string()))?,
            Some(
                TokenUrl::new(self.config.token_url.clone())
                    .map_err(|e| GatewayError::TokenRefresh(e.to_string()))?,
            ),
        );

        let token = client
            .exchange_refresh_token(&RefreshToken::new(refresh))
            .request_async(oauth2::reqwest::async_http_client)
            .await
            .map_err(|e| GatewayError::TokenRefresh(e.to_string()))?;

        Ok(token.access_token().secret().clone())
    }
}

#[async_trait]
impl MailGateway for GmailGateway {
    fn name(&self) -> &'static str {
        "gmail"
    }

    async fn send(&self, message: &OutgoingEmail) -> Result<GatewayAck, GatewayError> {
        let access_token = self.access_token().await?;

        let email = build_mime_message(message).await?;
        let raw = URL_SAFE_NO_PAD.encode(email.formatted());

        let response = self
            .http
            .post(format!(
                "{}/gmail/v1/users/me/messages/send",
                self.config.api_base
            ))
            .bearer_auth(access_token)
            .json(&serde_json::json!({ "raw": raw }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::GmailRejected { status, body });
        }

        let sent: GmailSendResponse = response.json().await?;
        info!(to = %message.to, message_id = ?sent.id, "gmail message accepted");

        Ok(GatewayAck {
            gateway: self.name(),
            message_id: sent.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::settings::MemorySettings;
    use crate::workflows::attachments::ResolvedAttachment;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> GmailConfig {
        GmailConfig {
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            auth_url: format!("{}/auth", server.uri()),
            token_url: format!("{}/token", server.uri()),
            api_base: server.uri(),
        }
    }

    fn message() -> OutgoingEmail {
        OutgoingEmail {
            from_email: "noreply@example.com".to_string(),
            from_name: "Acme Bookings".to_string(),
            to: "customer@example.com".to_string(),
            subject: "Your booking".to_string(),
            html_body: "<p>Confirmed.</p>".to_string(),
            attachments: Vec::<ResolvedAttachment>::new(),
        }
    }

    fn settings_with_valid_token() -> Arc<MemorySettings> {
        let settings = Arc::new(MemorySettings::new());
        settings.set_global("gmail_access_token", "stored-token");
        settings.set_global(
            "gmail_token_expires_at",
            &(Utc::now().timestamp() + 3600).to_string(),
        );
        settings.set_global("gmail_refresh_token", "refresh-token");
        settings
    }

    #[tokio::test]
    async fn test_send_with_valid_stored_token() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/gmail/v1/users/me/messages/send"))
            .and(header("authorization", "Bearer stored-token"))
            .and(body_string_contains("raw"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "msg-123"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = GmailGateway::new(
            config(&server),
            settings_with_valid_token(),
            reqwest::Client::new(),
        );

        let ack = gateway.send(&message()).await.unwrap();
        assert_eq!(ack.gateway, "gmail");
        assert_eq!(ack.message_id.as_deref(), Some("msg-123"));
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh-token",
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/gmail/v1/users/me/messages/send"))
            .and(header("authorization", "Bearer fresh-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "msg-456"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let settings = Arc::new(MemorySettings::new());
        settings.set_global("gmail_access_token", "stale-token");
        settings.set_global("gmail_token_expires_at", "1000"); // long past
        settings.set_global("gmail_refresh_token", "refresh-token");

        let gateway = GmailGateway::new(config(&server), settings, reqwest::Client::new());
        let ack = gateway.send(&message()).await.unwrap();
        assert_eq!(ack.message_id.as_deref(), Some("msg-456"));
    }

    #[tokio::test]
    async fn test_api_rejection_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/gmail/v1/users/me/messages/send"))
            .respond_with(ResponseTemplate::new(403).set_body_string("insufficient scope"))
            .mount(&server)
            .await;

        let gateway = GmailGateway::new(
            config(&server),
            settings_with_valid_token(),
            reqwest::Client::new(),
        );

        let err = gateway.send(&message()).await.unwrap_err();
        match err {
            GatewayError::GmailRejected { status, body } => {
                assert_eq!(status, 403);
                assert!(body.contains("insufficient scope"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_tokens_fail_before_any_call() {
        let server = MockServer::start().await;
        let gateway = GmailGateway::new(
            config(&server),
            Arc::new(MemorySettings::new()),
            reqwest::Client::new(),
        );

        let err = gateway.send(&message()).await.unwrap_err();
        assert!(matches!(err, GatewayError::TokenRefresh(_)));
    }
}
