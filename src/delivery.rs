use std::time::Duration;

use base64::Engine;
use serde_json::{json, Value};
use tracing::info;

use crate::error::DeliveryError;

const SENDGRID_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";

#[derive(Debug, Clone, Default)]
pub struct DeliveryConfig {
    pub api_key: Option<String>,
    pub from_email: Option<String>,
    /// Overrides the SendGrid mail-send URL.
    pub endpoint: Option<String>,
}

impl DeliveryConfig {
    pub fn is_configured(&self) -> bool {
        let present = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.trim().is_empty());
        present(&self.api_key) && present(&self.from_email)
    }
}

/// A report file to attach to the delivery email.
pub struct Attachment<'a> {
    pub filename: &'a str,
    pub mime_type: &'a str,
    pub bytes: &'a [u8],
}

pub struct EmailDispatcher {
    client: reqwest::Client,
    config: DeliveryConfig,
    endpoint: String,
}

impl EmailDispatcher {
    pub fn new(config: DeliveryConfig) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        let endpoint = config
            .endpoint
            .clone()
            .unwrap_or_else(|| SENDGRID_ENDPOINT.to_string());

        Ok(Self {
            client,
            config,
            endpoint,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    pub fn message(&self, to_email: &str, business_name: &str, attachment: &Attachment) -> Result<Value, DeliveryError> {
        let from_email = self
            .config
            .from_email
            .as_deref()
            .ok_or(DeliveryError::NotConfigured)?;

        let html = format!(
            "<p>Hello,</p>\
             <p>Your AI Visibility Audit for <strong>{business_name}</strong> is complete.</p>\
             <p>Attached is your Visibility Summary.</p>\
             <p>This report assesses how AI agents currently perceive and trust your brand across 5 visibility layers.</p>\
             <p>If you have any questions about your score or the recommended Fastest Score Gains, feel free to reach out.</p>"
        );

        Ok(json!({
            "personalizations": [{ "to": [{ "email": to_email }] }],
            "from": { "email": from_email },
            "subject": format!("Your AI Visibility Audit: {business_name}"),
            "content": [{ "type": "text/html", "value": html }],
            "attachments": [{
                "content": base64::engine::general_purpose::STANDARD.encode(attachment.bytes),
                "filename": attachment.filename,
                "type": attachment.mime_type,
                "disposition": "attachment",
            }],
        }))
    }

    pub async fn send_audit_report(
        &self,
        to_email: &str,
        business_name: &str,
        attachment: &Attachment<'_>,
    ) -> Result<(), DeliveryError> {
        if !self.is_configured() {
            return Err(DeliveryError::NotConfigured);
        }
        let api_key = self.config.api_key.as_deref().unwrap_or_default();
        let body = self.message(to_email, business_name, attachment)?;

        info!(to = to_email, "Sending audit report");
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(DeliveryError::Api {
                status: status.as_u16(),
                message,
            });
        }

        info!(to = to_email, status = status.as_u16(), "Audit report delivered");
        Ok(())
    }
}
