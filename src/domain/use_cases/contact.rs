use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    constants::MSG_SENT,
    entities::rate_limit::RateLimitPolicy,
    errors::AppError,
    repositories::{delivery::SubmissionDelivery, rate_limit::RateLimitStore},
    use_cases::gate::{GateResult, SubmissionGate},
};

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub message: String,
    pub success: bool,
    pub id: Uuid,
}

pub struct ContactHandler<S, D>
where
    S: RateLimitStore,
    D: SubmissionDelivery,
{
    pub gate: SubmissionGate<S>,
    pub delivery: D,
}

impl<S, D> ContactHandler<S, D>
where
    S: RateLimitStore,
    D: SubmissionDelivery,
{
    pub fn new(store: S, policy: RateLimitPolicy, delivery: D) -> Self {
        ContactHandler {
            gate: SubmissionGate::new(store, policy),
            delivery,
        }
    }

    /// Gates a raw contact request body and delivers it when accepted
    pub async fn submit(
        &self,
        body: &[u8],
        client_key: &str,
        now: DateTime<Utc>,
    ) -> Result<ContactResponse, AppError> {
        let submission = match self.gate.evaluate_body(body, client_key, now).await? {
            GateResult::Accepted(submission) => submission,
            GateResult::Rejected(rejection) => return Err(rejection.into()),
        };

        self.delivery.deliver(&submission).await.map_err(|e| {
            tracing::error!(
                submission_id = %submission.id,
                delivery = self.delivery.name(),
                error = %e,
                "Contact submission could not be delivered"
            );
            AppError::from(e)
        })?;

        Ok(ContactResponse {
            message: MSG_SENT.to_string(),
            success: true,
            id: submission.id,
        })
    }
}
