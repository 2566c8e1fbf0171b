//! The email workflow action.
//!
//! Linear pipeline with early-exit guards: decode the action config, filter
//! restricted workflows, render templates, resolve and validate attachments,
//! then send one message per recipient through the configured gateway and
//! record a workflow log entry per attempt.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use regex::Regex;
use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::{Config, SmtpConfig};
use crate::error::DispatchError;
use crate::gateways::{
    GatewayKind, GmailGateway, MailGateway, OutgoingEmail, PlatformGateway, PlatformMailer,
    SmtpGateway,
};
use crate::services::{CapabilityService, SettingsStore, ShortcodeService, UsageService};
use crate::workflows::attachments::{
    validate_attachments, AttachmentResolver, ResolvedAttachment, UrlFetcher,
};
use crate::workflows::log::{LogData, WorkflowLogEntry, WorkflowLogStore};

/// Driver name used for quota accounting and log entries.
pub const DRIVER: &str = "email";

const QUOTA_CAPABILITY: &str = "email_allowed_max_number";
const SENDER_OVERRIDE_CAPABILITY: &str = "email_settings";

/// Workflows restricted to an explicit allow-list of event keys.
const RESTRICTED_WORKFLOWS: [&str; 2] = ["cis", "deposit"];

const RESTRICTED_EVENT_ALLOW_LIST: [&str; 5] = [
    "invoice_ready",
    "invoice_ready_cis",
    "invoice_ready_deposit",
    "email_customer_quote_cis",
    "quote_status_changed",
];

/// The four template strings an email action is configured with.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionConfig {
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub attachments: String,
}

/// The persisted workflow action row: its JSON config blob plus the
/// workflow id and the event key (`when`) it fired for.
#[derive(Debug, Clone)]
pub struct ActionSettings {
    pub workflow_id: Uuid,
    pub when: String,
    pub data: Option<serde_json::Value>,
}

/// Per-recipient result of a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    EmptyRecipient,
    QuotaExceeded,
    GatewayFailed,
}

#[derive(Debug, Clone)]
pub struct RecipientOutcome {
    pub recipient: String,
    pub outcome: SendOutcome,
}

/// What a `handle` call did. `downloaded_files` lists the temp-cache files
/// created for URL attachments; cleanup is the caller's responsibility and
/// scoped to its request.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub outcomes: Vec<RecipientOutcome>,
    pub downloaded_files: Vec<PathBuf>,
}

impl DispatchReport {
    pub fn sent_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.outcome == SendOutcome::Sent)
            .count()
    }
}

pub struct EmailDispatcher {
    config: Config,
    shortcodes: Arc<dyn ShortcodeService>,
    settings: Arc<dyn SettingsStore>,
    capabilities: Arc<dyn CapabilityService>,
    usage: Arc<dyn UsageService>,
    fetcher: Arc<dyn UrlFetcher>,
    log_store: Arc<dyn WorkflowLogStore>,
    platform: Arc<dyn PlatformMailer>,
    http: reqwest::Client,
}

impl EmailDispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        shortcodes: Arc<dyn ShortcodeService>,
        settings: Arc<dyn SettingsStore>,
        capabilities: Arc<dyn CapabilityService>,
        usage: Arc<dyn UsageService>,
        fetcher: Arc<dyn UrlFetcher>,
        log_store: Arc<dyn WorkflowLogStore>,
        platform: Arc<dyn PlatformMailer>,
    ) -> Self {
        Self {
            config,
            shortcodes,
            settings,
            capabilities,
            usage,
            fetcher,
            log_store,
            platform,
            http: reqwest::Client::new(),
        }
    }

    /// Entry point, invoked by the workflow engine once per matching trigger.
    pub async fn handle(
        &self,
        event: &serde_json::Value,
        settings: &ActionSettings,
    ) -> Result<DispatchReport, DispatchError> {
        let mut report = DispatchReport::default();

        let Some(action) = decode_action(settings) else {
            return Ok(report);
        };

        let workflow = event.get("workflow").and_then(|v| v.as_str()).unwrap_or("");
        if RESTRICTED_WORKFLOWS.contains(&workflow)
            && !RESTRICTED_EVENT_ALLOW_LIST.contains(&settings.when.as_str())
        {
            info!(workflow, event_key = %settings.when, "event not in allow-list, skipping email action");
            return Ok(report);
        }

        let send_to = self.shortcodes.replace(&action.to, event);
        let subject = self.shortcodes.replace(&action.subject, event);
        let body = self.shortcodes.replace(&action.body, event);
        let attachments_raw = self.shortcodes.replace(&action.attachments, event);

        let resolver = AttachmentResolver::new(&self.config.cache_dir, self.fetcher.as_ref());
        let resolved = resolver.resolve(&attachments_raw).await;
        report.downloaded_files = resolved.downloaded;
        let attachments = validate_attachments(resolved.attachments);

        if send_to.trim().is_empty() {
            return Ok(report);
        }

        let subject = sanitize_subject(&subject);

        for recipient in send_to.split(',') {
            let recipient = recipient.trim();
            let outcome = self
                .send(recipient, &subject, &body, &attachments, settings)
                .await?;
            report.outcomes.push(RecipientOutcome {
                recipient: recipient.to_string(),
                outcome,
            });
        }

        Ok(report)
    }

    /// Dispatch a single message to one recipient.
    pub async fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        attachments: &[ResolvedAttachment],
        settings: &ActionSettings,
    ) -> Result<SendOutcome, DispatchError> {
        if to.is_empty() {
            return Ok(SendOutcome::EmptyRecipient);
        }

        let limit = self.capabilities.get_limit(QUOTA_CAPABILITY);
        if limit > -1 && self.usage.usage_for(DRIVER) as i64 >= limit {
            warn!(limit, "email quota reached, aborting send");
            return Ok(SendOutcome::QuotaExceeded);
        }

        let sender_email = self.settings.get_option("sender_email", "", true);
        let mut sender_name = self.settings.get_option("sender_name", "", true);
        if self.capabilities.tenant_can(SENDER_OVERRIDE_CAPABILITY) {
            let tenant_name = self.settings.get_option("sender_name", "", false);
            if !tenant_name.is_empty() {
                sender_name = tenant_name;
            }
        }

        let message = OutgoingEmail {
            from_email: sender_email,
            from_name: sender_name,
            to: to.to_string(),
            subject: subject.to_string(),
            html_body: body.to_string(),
            attachments: attachments.to_vec(),
        };

        let gateway = self.build_gateway()?;
        let delivered = match gateway.send(&message).await {
            Ok(ack) => {
                info!(gateway = ack.gateway, to, message_id = ?ack.message_id, "email dispatched");
                true
            }
            Err(e) => {
                error!(gateway = gateway.name(), to, error = %e, "email gateway failure");
                false
            }
        };

        self.log_store.insert(WorkflowLogEntry {
            workflow_id: settings.workflow_id,
            event_key: settings.when.clone(),
            driver: DRIVER.to_string(),
            timestamp: Utc::now(),
            data: LogData {
                to: message.to,
                subject: message.subject,
                body: message.html_body,
                attachments: message
                    .attachments
                    .iter()
                    .map(|a| a.source_path.to_string_lossy().into_owned())
                    .collect(),
                delivered,
            },
        })?;

        Ok(if delivered {
            SendOutcome::Sent
        } else {
            SendOutcome::GatewayFailed
        })
    }

    fn build_gateway(&self) -> Result<Box<dyn MailGateway>, DispatchError> {
        let selected = self.settings.get_option(
            "mail_gateway",
            self.config.default_gateway.as_str(),
            true,
        );

        match GatewayKind::parse(&selected) {
            GatewayKind::Platform => Ok(Box::new(PlatformGateway::new(self.platform.clone()))),
            GatewayKind::Smtp => {
                let smtp = SmtpConfig::from_settings(self.settings.as_ref());
                let gateway = SmtpGateway::new(&smtp)
                    .map_err(|e| DispatchError::GatewayConfig(e.to_string()))?;
                Ok(Box::new(gateway))
            }
            GatewayKind::Gmail => {
                let gmail = self.config.gmail.clone().ok_or_else(|| {
                    DispatchError::GatewayConfig(
                        "gmail gateway selected but no oauth application is configured".to_string(),
                    )
                })?;
                Ok(Box::new(GmailGateway::new(
                    gmail,
                    self.settings.clone(),
                    self.http.clone(),
                )))
            }
        }
    }
}

fn decode_action(settings: &ActionSettings) -> Option<ActionConfig> {
    let data = settings.data.as_ref()?;
    if data.is_null() || data.as_object().map(|o| o.is_empty()).unwrap_or(false) {
        return None;
    }

    match serde_json::from_value::<ActionConfig>(data.clone()) {
        Ok(action) => Some(action),
        Err(e) => {
            warn!(error = %e, "email action config is not decodable, skipping");
            None
        }
    }
}

/// Subjects arrive HTML-rendered from the template engine: decode the entity
/// escapes, turn the literal `&nbsp;` into a plain space, and strip tags.
fn sanitize_subject(subject: &str) -> String {
    let decoded = subject
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");

    let tags = Regex::new(r"<[^>]*>").unwrap();
    tags.replace_all(&decoded, "").into_owned()
}
