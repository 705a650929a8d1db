use crate::config::MailConfig;
use crate::domain::ports::EmailService;
use crate::error::AppError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info};
use base64::{Engine as _, engine::general_purpose};

pub struct HttpEmailService {
    client: Client,
    api_url: String,
    api_key: String,
    sender: String,
}

impl HttpEmailService {
    pub fn new(config: &MailConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_url: config.service_url.clone(),
            api_key: config.token.clone(),
            sender: config.sender.clone(),
        }
    }
}

#[derive(Serialize)]
struct AttachmentPayload {
    filename: String,
    content_base64: String,
}

#[derive(Serialize)]
struct EmailPayload {
    from_addr: String,
    to_addr: String,
    subject: String,
    html_body: String,
    attachments: Vec<AttachmentPayload>,
}

#[async_trait]
impl EmailService for HttpEmailService {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        html_body: &str,
        attachment_name: Option<&str>,
        attachment_data: Option<&[u8]>
    ) -> Result<(), AppError> {
        let mut attachments = Vec::new();

        if let (Some(name), Some(data)) = (attachment_name, attachment_data) {
            attachments.push(AttachmentPayload {
                filename: name.to_string(),
                content_base64: general_purpose::STANDARD.encode(data),
            });
        }

        let payload = EmailPayload {
            from_addr: self.sender.clone(),
            to_addr: recipient.to_string(),
            subject: subject.to_string(),
            html_body: html_body.to_string(),
            attachments,
        };

        let res = self.client.post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                let msg = format!("Email service connection error: {}", e);
                error!("{}", msg);
                AppError::Dependency(msg)
            })?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            let msg = format!("Email service failed. Status: {}, Body: {}", status, text);
            error!("{}", msg);
            return Err(AppError::Dependency(msg));
        }

        info!(recipient, "Email accepted by mail service");
        Ok(())
    }
}
