use async_trait::async_trait;

use crate::{
    entities::submission::Submission,
    errors::DeliveryError,
    repositories::delivery::SubmissionDelivery,
};

/// Records the submission in the service log so that nothing is lost when
/// no mail provider is reachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDelivery;

#[async_trait]
impl SubmissionDelivery for LogDelivery {
    async fn deliver(&self, submission: &Submission) -> Result<(), DeliveryError> {
        tracing::info!(
            submission_id = %submission.id,
            nome = %submission.name,
            email = %submission.email,
            telefono = %submission.phone,
            tipo = %submission.intervention_type,
            messaggio = %submission.message,
            timestamp = %submission.received_at.to_rfc3339(),
            "Contact form submission"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
