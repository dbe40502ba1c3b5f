use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::{
    constants::{MSG_INVALID_REQUEST, MSG_RATE_LIMITED, UNKNOWN_CLIENT},
    entities::{
        rate_limit::RateLimitPolicy,
        submission::{RawSubmission, Submission},
    },
    errors::{AppError, FieldError},
    repositories::rate_limit::RateLimitStore,
};

#[derive(Debug, Clone, PartialEq)]
pub enum GateResult {
    Accepted(Submission),
    Rejected(Rejection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    RateLimited,
    Spam,
    InvalidInput,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    RateLimited { retry_after: Option<Duration> },
    Spam,
    /// Field problems in reporting order; never empty.
    InvalidInput(Vec<FieldError>),
}

impl Rejection {
    pub fn kind(&self) -> RejectionKind {
        match self {
            Rejection::RateLimited { .. } => RejectionKind::RateLimited,
            Rejection::Spam => RejectionKind::Spam,
            Rejection::InvalidInput(_) => RejectionKind::InvalidInput,
        }
    }

    /// Sentence shown to the visitor. Spam gets the same wording as any
    /// other bad request.
    pub fn detail(&self) -> String {
        match self {
            Rejection::RateLimited { .. } => MSG_RATE_LIMITED.to_string(),
            Rejection::Spam => MSG_INVALID_REQUEST.to_string(),
            Rejection::InvalidInput(errors) => errors
                .first()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| MSG_INVALID_REQUEST.to_string()),
        }
    }
}

impl From<Rejection> for AppError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::RateLimited { retry_after } => AppError::RateLimited {
                retry_after_secs: retry_after.map(|d| d.as_secs().max(1)),
            },
            Rejection::Spam => AppError::Spam,
            Rejection::InvalidInput(errors) => AppError::ValidationError(errors),
        }
    }
}

/// Decides whether a contact submission may go on to delivery.
///
/// Stages run in a fixed order and the first failure wins: rate limit,
/// honeypot, required fields, field shapes. The rate limit counts attempts,
/// so spam and invalid submissions still use up the client's budget.
pub struct SubmissionGate<S>
where
    S: RateLimitStore,
{
    store: S,
    policy: RateLimitPolicy,
}

impl<S> SubmissionGate<S>
where
    S: RateLimitStore,
{
    pub fn new(store: S, policy: RateLimitPolicy) -> Self {
        SubmissionGate { store, policy }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Runs every stage against already extracted field values.
    ///
    /// `Err` is reserved for failures of the store itself.
    pub async fn evaluate(
        &self,
        raw: &RawSubmission,
        client_key: &str,
        now: DateTime<Utc>,
    ) -> Result<GateResult, AppError> {
        if let Some(rejection) = self.check_rate_limit(client_key, now).await? {
            return Ok(GateResult::Rejected(rejection));
        }

        Ok(self.screen(raw, client_key, now))
    }

    /// Like [`evaluate`](Self::evaluate) but starts from the request body.
    ///
    /// The attempt is counted before the body is parsed, so an unreadable
    /// body still costs one attempt and surfaces as [`AppError::MalformedBody`].
    pub async fn evaluate_body(
        &self,
        body: &[u8],
        client_key: &str,
        now: DateTime<Utc>,
    ) -> Result<GateResult, AppError> {
        if let Some(rejection) = self.check_rate_limit(client_key, now).await? {
            return Ok(GateResult::Rejected(rejection));
        }

        let raw = RawSubmission::from_slice(body)?;
        Ok(self.screen(&raw, client_key, now))
    }

    async fn check_rate_limit(
        &self,
        client_key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Rejection>, AppError> {
        let key = client_key_or_unknown(client_key);
        let outcome = self.store.record_attempt(key, now, &self.policy).await?;

        if outcome.allowed {
            tracing::debug!(
                client_key = key,
                count = outcome.record.count,
                remaining = outcome.record.remaining(&self.policy),
                "Contact attempt counted"
            );
            return Ok(None);
        }

        tracing::warn!(client_key = key, count = outcome.record.count, "Contact rate limit exceeded");
        Ok(Some(Rejection::RateLimited {
            retry_after: outcome.record.retry_after(now, &self.policy),
        }))
    }

    fn screen(&self, raw: &RawSubmission, client_key: &str, now: DateTime<Utc>) -> GateResult {
        if let Some(field) = &raw.honeypot {
            tracing::warn!(client_key, honeypot = %field, "Contact submission flagged as spam");
            return GateResult::Rejected(Rejection::Spam);
        }

        match Submission::parse(raw, now) {
            Ok(submission) => GateResult::Accepted(submission),
            Err(errors) => {
                tracing::debug!(client_key, ?errors, "Contact submission rejected");
                GateResult::Rejected(Rejection::InvalidInput(errors))
            }
        }
    }
}

fn client_key_or_unknown(client_key: &str) -> &str {
    let trimmed = client_key.trim();
    if trimmed.is_empty() {
        UNKNOWN_CLIENT
    } else {
        trimmed
    }
}
