use async_trait::async_trait;

use crate::{
    entities::submission::Submission,
    errors::DeliveryError,
    repositories::delivery::SubmissionDelivery,
};

/// Tries `primary`, and hands the submission to `fallback` if that fails.
pub struct FallbackDelivery<P, F> {
    primary: P,
    fallback: F,
}

impl<P, F> FallbackDelivery<P, F>
where
    P: SubmissionDelivery,
    F: SubmissionDelivery,
{
    pub fn new(primary: P, fallback: F) -> Self {
        FallbackDelivery { primary, fallback }
    }
}

#[async_trait]
impl<P, F> SubmissionDelivery for FallbackDelivery<P, F>
where
    P: SubmissionDelivery,
    F: SubmissionDelivery,
{
    async fn deliver(&self, submission: &Submission) -> Result<(), DeliveryError> {
        match self.primary.deliver(submission).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!(
                    submission_id = %submission.id,
                    primary = self.primary.name(),
                    fallback = self.fallback.name(),
                    error = %e,
                    "Primary delivery failed, using fallback"
                );
                self.fallback.deliver(submission).await
            }
        }
    }

    fn name(&self) -> &'static str {
        "fallback"
    }
}
