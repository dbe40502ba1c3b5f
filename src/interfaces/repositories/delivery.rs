use std::sync::Arc;

use async_trait::async_trait;

use crate::{entities::submission::Submission, errors::DeliveryError};

/// Hands an accepted submission to whoever reads it (email, logs, ...).
#[async_trait]
pub trait SubmissionDelivery: Send + Sync {
    async fn deliver(&self, submission: &Submission) -> Result<(), DeliveryError>;

    fn name(&self) -> &'static str;
}

#[async_trait]
impl<T> SubmissionDelivery for Arc<T>
where
    T: SubmissionDelivery + ?Sized,
{
    async fn deliver(&self, submission: &Submission) -> Result<(), DeliveryError> {
        (**self).deliver(submission).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
