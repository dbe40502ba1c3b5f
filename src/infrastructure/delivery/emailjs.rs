use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use url::Url;
use zeroize::Zeroizing;

use crate::{
    entities::submission::Submission,
    errors::DeliveryError,
    repositories::delivery::SubmissionDelivery,
    settings::AppConfig,
};

/// Sends accepted submissions through the EmailJS REST API.
pub struct EmailJsDelivery {
    client: Client,
    endpoint: Url,
    service_id: String,
    template_id: String,
    public_key: String,
    private_key: Option<Zeroizing<String>>,
    recipient: String,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    #[serde(rename = "accessToken", skip_serializing_if = "Option::is_none")]
    access_token: Option<&'a str>,
    template_params: TemplateParams<'a>,
}

#[derive(Serialize)]
struct TemplateParams<'a> {
    from_name: String,
    from_email: String,
    phone: String,
    service_type: &'static str,
    message: String,
    to_email: &'a str,
    submission_id: String,
    submitted_at: String,
}

impl EmailJsDelivery {
    /// `None` unless service, template and public key are all set.
    pub fn from_config(config: &AppConfig) -> Result<Option<Self>, DeliveryError> {
        let (Some(service_id), Some(template_id), Some(public_key)) = (
            config.emailjs_service_id.as_ref(),
            config.emailjs_template_id.as_ref(),
            config.emailjs_public_key.as_ref(),
        ) else {
            return Ok(None);
        };

        let endpoint = Url::parse(&config.emailjs_endpoint)
            .map_err(|e| DeliveryError::NotConfigured(format!("invalid EmailJS endpoint: {e}")))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.delivery_timeout_secs))
            .build()?;

        Ok(Some(EmailJsDelivery {
            client,
            endpoint,
            service_id: service_id.clone(),
            template_id: template_id.clone(),
            public_key: public_key.clone(),
            private_key: config.emailjs_private_key.clone().map(Zeroizing::new),
            recipient: config.contact_recipient.clone(),
        }))
    }

    fn request<'a>(&'a self, submission: &Submission) -> SendRequest<'a> {
        SendRequest {
            service_id: &self.service_id,
            template_id: &self.template_id,
            user_id: &self.public_key,
            access_token: self.private_key.as_ref().map(|k| k.as_str()),
            template_params: TemplateParams {
                from_name: ammonia::clean_text(&submission.name),
                from_email: ammonia::clean_text(&submission.email),
                phone: ammonia::clean_text(&submission.phone),
                service_type: submission.intervention_type.label(),
                message: ammonia::clean_text(&submission.message),
                to_email: &self.recipient,
                submission_id: submission.id.to_string(),
                submitted_at: submission.received_at.to_rfc3339(),
            },
        }
    }
}

#[async_trait]
impl SubmissionDelivery for EmailJsDelivery {
    async fn deliver(&self, submission: &Submission) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&self.request(submission))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(submission_id = %submission.id, "Contact submission sent via EmailJS");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(DeliveryError::Rejected {
            status: status.as_u16(),
            body,
        })
    }

    fn name(&self) -> &'static str {
        "emailjs"
    }
}
