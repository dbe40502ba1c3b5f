
use std::{sync::Arc, time::Duration as StdDuration};

use chrono::{DateTime, Duration, TimeZone, Utc};
use contact_gate::{
    constants::{MSG_INVALID_REQUEST, MSG_RATE_LIMITED, UNKNOWN_CLIENT},
    entities::{
        rate_limit::RateLimitPolicy,
        submission::{InterventionType, RawSubmission},
    },
    errors::AppError,
    limiter::InMemoryRateLimitStore,
    repositories::rate_limit::RateLimitStore,
    use_cases::gate::{GateResult, Rejection, RejectionKind, SubmissionGate},
};
use serde_json::{json, Value};
use test_utils::*;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

fn secs(n: i64) -> Duration {
    Duration::seconds(n)
}

fn gate() -> SubmissionGate<InMemoryRateLimitStore> {
    SubmissionGate::new(InMemoryRateLimitStore::new(), RateLimitPolicy::default())
}

fn raw(form: Value) -> RawSubmission {
    RawSubmission::from_value(form).unwrap()
}

fn kind(result: &GateResult) -> Option<RejectionKind> {
    match result {
        GateResult::Accepted(_) => None,
        GateResult::Rejected(rejection) => Some(rejection.kind()),
    }
}

fn field_errors(result: GateResult) -> Vec<(String, String)> {
    match result {
        GateResult::Rejected(Rejection::InvalidInput(errors)) => errors
            .into_iter()
            .map(|e| (e.field, e.message))
            .collect(),
        other => panic!("expected InvalidInput, got {:?}", other),
    }
}

#[actix_rt::test]
async fn five_attempts_pass_then_sixth_is_rate_limited_until_window_resets() {
    let gate = gate();
    let form = raw(valid_form());

    for i in 0..5 {
        let result = gate.evaluate(&form, "203.0.113.7", t0() + secs(i)).await.unwrap();
        assert_eq!(kind(&result), None, "attempt {} should be accepted", i + 1);
    }

    let sixth = gate.evaluate(&form, "203.0.113.7", t0() + secs(5)).await.unwrap();
    assert_eq!(kind(&sixth), Some(RejectionKind::RateLimited));

    let after_window = gate.evaluate(&form, "203.0.113.7", t0() + secs(3601)).await.unwrap();
    assert_eq!(kind(&after_window), None);

    let record = gate.store().get("203.0.113.7", gate.policy()).await.unwrap().unwrap();
    assert_eq!(record.count, 1);
    assert_eq!(record.window_start, t0() + secs(3601));
}

#[actix_rt::test]
async fn window_resets_exactly_at_its_length() {
    let gate = gate();
    let form = raw(valid_form());

    for _ in 0..5 {
        gate.evaluate(&form, "k", t0()).await.unwrap();
    }
    let just_before = gate.evaluate(&form, "k", t0() + secs(3599)).await.unwrap();
    assert_eq!(kind(&just_before), Some(RejectionKind::RateLimited));

    let at_boundary = gate.evaluate(&form, "k", t0() + secs(3600)).await.unwrap();
    assert_eq!(kind(&at_boundary), None);
}

#[actix_rt::test]
async fn refused_attempt_leaves_record_untouched_and_reports_retry_after() {
    let gate = gate();
    let form = raw(valid_form());

    for i in 0..5 {
        gate.evaluate(&form, "k", t0() + secs(i)).await.unwrap();
    }

    let refused = gate.evaluate(&form, "k", t0() + secs(5)).await.unwrap();
    match &refused {
        GateResult::Rejected(rejection) => {
            assert_eq!(
                rejection,
                &Rejection::RateLimited { retry_after: Some(StdDuration::from_secs(3595)) }
            );
            assert_eq!(rejection.detail(), MSG_RATE_LIMITED);
        }
        other => panic!("expected RateLimited, got {:?}", other),
    }

    let record = gate.store().get("k", gate.policy()).await.unwrap().unwrap();
    assert_eq!(record.count, 5);
    assert_eq!(record.window_start, t0());
}

#[actix_rt::test]
async fn distinct_client_keys_have_independent_budgets() {
    let gate = gate();
    let form = raw(valid_form());

    for _ in 0..5 {
        gate.evaluate(&form, "k1", t0()).await.unwrap();
    }
    let k1 = gate.evaluate(&form, "k1", t0()).await.unwrap();
    assert_eq!(kind(&k1), Some(RejectionKind::RateLimited));

    for _ in 0..5 {
        let k2 = gate.evaluate(&form, "k2", t0()).await.unwrap();
        assert_eq!(kind(&k2), None);
    }
}

#[actix_rt::test]
async fn honeypot_is_spam_and_still_consumes_budget() {
    let gate = gate();
    let spam = raw(with(valid_form(), "honeypot", json!("http://spam.example")));

    let result = gate.evaluate(&spam, "k", t0()).await.unwrap();
    match &result {
        GateResult::Rejected(rejection) => {
            assert_eq!(rejection.kind(), RejectionKind::Spam);
            assert_eq!(rejection.detail(), MSG_INVALID_REQUEST);
        }
        other => panic!("expected Spam, got {:?}", other),
    }

    let form = raw(valid_form());
    for _ in 0..4 {
        let ok = gate.evaluate(&form, "k", t0()).await.unwrap();
        assert_eq!(kind(&ok), None);
    }
    let limited = gate.evaluate(&form, "k", t0()).await.unwrap();
    assert_eq!(kind(&limited), Some(RejectionKind::RateLimited));
}

#[actix_rt::test]
async fn every_honeypot_field_is_checked_before_validation() {
    for key in ["website", "url", "honeypot"] {
        let gate = gate();
        let spam = raw(with(json!({}), key, json!("x")));

        let result = gate.evaluate(&spam, "k", t0()).await.unwrap();
        assert_eq!(kind(&result), Some(RejectionKind::Spam), "honeypot key {key}");
    }
}

#[actix_rt::test]
async fn rate_limit_is_checked_before_spam() {
    let gate = gate();
    let form = raw(valid_form());
    for _ in 0..5 {
        gate.evaluate(&form, "k", t0()).await.unwrap();
    }

    let spam = raw(with(valid_form(), "website", json!("spam.example")));
    let result = gate.evaluate(&spam, "k", t0()).await.unwrap();
    assert_eq!(kind(&result), Some(RejectionKind::RateLimited));
}

#[actix_rt::test]
async fn each_missing_field_is_named() {
    for (key, field) in [
        ("name", "name"),
        ("email", "email"),
        ("phone", "phone"),
        ("interventionType", "interventionType"),
        ("message", "message"),
    ] {
        let gate = gate();
        let result = gate.evaluate(&raw(without(valid_form(), key)), "k", t0()).await.unwrap();

        let errors = field_errors(result);
        assert_eq!(errors.len(), 1, "only {field} should be reported");
        assert_eq!(errors[0].0, field);
    }
}

#[actix_rt::test]
async fn several_missing_fields_are_reported_in_field_order() {
    let gate = gate();
    let form = without(without(without(valid_form(), "message"), "phone"), "name");

    let errors = field_errors(gate.evaluate(&raw(form), "k", t0()).await.unwrap());

    let fields: Vec<&str> = errors.iter().map(|(f, _)| f.as_str()).collect();
    assert_eq!(fields, vec!["name", "phone", "message"]);
    assert_eq!(errors[0].1, "Il nome è obbligatorio");
}

#[actix_rt::test]
async fn missing_fields_are_reported_before_malformed_email() {
    let gate = gate();
    let form = with(without(valid_form(), "message"), "email", json!("not-an-email"));

    let errors = field_errors(gate.evaluate(&raw(form), "k", t0()).await.unwrap());

    assert_eq!(errors[0], ("message".to_string(), "Il messaggio è obbligatorio".to_string()));
    assert_eq!(errors[1], ("email".to_string(), "Inserisci un'email valida".to_string()));
}

#[actix_rt::test]
async fn blank_values_count_as_missing() {
    let gate = gate();
    let form = with(valid_form(), "phone", json!("   "));

    let errors = field_errors(gate.evaluate(&raw(form), "k", t0()).await.unwrap());
    assert_eq!(errors[0].0, "phone");
}

#[actix_rt::test]
async fn email_shape_is_enforced() {
    let accepted = gate()
        .evaluate(&raw(with(valid_form(), "email", json!("a@b.c"))), "k", t0())
        .await
        .unwrap();
    assert_eq!(kind(&accepted), None);

    for email in ["not-an-email", "a@b", "a b@c.d"] {
        let result = gate()
            .evaluate(&raw(with(valid_form(), "email", json!(email))), "k", t0())
            .await
            .unwrap();

        let errors = field_errors(result);
        assert_eq!(errors[0].0, "email", "{email} should be rejected");
    }
}

#[actix_rt::test]
async fn email_with_surrounding_whitespace_is_rejected() {
    for email in [" mario@example.it", "mario@example.it ", "\tmario@example.it"] {
        let result = gate()
            .evaluate(&raw(with(valid_form(), "email", json!(email))), "k", t0())
            .await
            .unwrap();

        let errors = field_errors(result);
        assert_eq!(
            errors[0],
            ("email".to_string(), "Inserisci un'email valida".to_string()),
            "{email:?} should be rejected"
        );
    }

    let blank = gate()
        .evaluate(&raw(with(valid_form(), "email", json!("   "))), "k", t0())
        .await
        .unwrap();
    assert_eq!(
        field_errors(blank)[0],
        ("email".to_string(), "L'email è obbligatoria".to_string())
    );
}

#[actix_rt::test]
async fn unknown_intervention_type_is_invalid() {
    let gate = gate();
    let form = with(valid_form(), "interventionType", json!("Roofing"));

    let errors = field_errors(gate.evaluate(&raw(form), "k", t0()).await.unwrap());
    assert_eq!(errors[0].0, "interventionType");
}

#[actix_rt::test]
async fn italian_keys_produce_a_typed_submission() {
    let gate = gate();

    let result = gate.evaluate(&raw(italian_form()), "k", t0()).await.unwrap();

    match result {
        GateResult::Accepted(submission) => {
            assert_eq!(submission.name, "Giulia");
            assert_eq!(submission.phone, "+39 347 000 0000");
            assert_eq!(submission.intervention_type, InterventionType::BathroomRenovation);
            assert_eq!(submission.received_at, t0());
        }
        other => panic!("expected Accepted, got {:?}", other),
    }
}

#[actix_rt::test]
async fn blank_client_key_falls_back_to_sentinel() {
    let gate = gate();

    gate.evaluate(&raw(valid_form()), "  ", t0()).await.unwrap();

    let record = gate.store().get(UNKNOWN_CLIENT, gate.policy()).await.unwrap().unwrap();
    assert_eq!(record.count, 1);
}

#[actix_rt::test]
async fn malformed_body_is_fatal_but_counted() {
    let gate = gate();

    let result = gate.evaluate_body(b"{not json", "k", t0()).await;
    assert!(matches!(result, Err(AppError::MalformedBody(_))));

    let not_object = gate.evaluate_body(b"[1, 2]", "k", t0()).await;
    assert!(matches!(not_object, Err(AppError::MalformedBody(_))));

    let record = gate.store().get("k", gate.policy()).await.unwrap().unwrap();
    assert_eq!(record.count, 2);
}

#[actix_rt::test]
async fn body_of_rate_limited_client_is_not_parsed() {
    let gate = gate();
    for _ in 0..5 {
        gate.evaluate(&raw(valid_form()), "k", t0()).await.unwrap();
    }

    let result = gate.evaluate_body(b"{not json", "k", t0()).await.unwrap();
    assert_eq!(kind(&result), Some(RejectionKind::RateLimited));
}

#[actix_rt::test]
async fn custom_policy_is_honoured() {
    let gate = SubmissionGate::new(InMemoryRateLimitStore::new(), RateLimitPolicy::new(2, 60));
    let form = raw(valid_form());

    assert_eq!(kind(&gate.evaluate(&form, "k", t0()).await.unwrap()), None);
    assert_eq!(kind(&gate.evaluate(&form, "k", t0()).await.unwrap()), None);
    assert_eq!(
        kind(&gate.evaluate(&form, "k", t0() + secs(59)).await.unwrap()),
        Some(RejectionKind::RateLimited)
    );
    assert_eq!(kind(&gate.evaluate(&form, "k", t0() + secs(60)).await.unwrap()), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_attempts_never_exceed_budget() {
    let gate = Arc::new(gate());
    let form = raw(valid_form());
    let now = t0();

    let tasks: Vec<_> = (0..40)
        .map(|_| {
            let gate = gate.clone();
            let form = form.clone();
            tokio::spawn(async move { gate.evaluate(&form, "burst", now).await.unwrap() })
        })
        .collect();

    let mut accepted = 0;
    for task in tasks {
        if matches!(task.await.unwrap(), GateResult::Accepted(_)) {
            accepted += 1;
        }
    }

    assert_eq!(accepted, 5);
    assert_eq!(gate.store().get("burst", gate.policy()).await.unwrap().unwrap().count, 5);
}

#[actix_rt::test]
async fn purge_drops_only_expired_records() {
    let gate = gate();
    let form = raw(valid_form());

    gate.evaluate(&form, "old", t0()).await.unwrap();
    gate.evaluate(&form, "fresh", t0() + secs(1800)).await.unwrap();

    let purged = gate
        .store()
        .purge_expired(t0() + secs(3600), gate.policy())
        .await
        .unwrap();

    assert_eq!(purged, 1);
    assert!(gate.store().get("old", gate.policy()).await.unwrap().is_none());
    assert!(gate.store().get("fresh", gate.policy()).await.unwrap().is_some());
    assert_eq!(gate.store().len(), 1);
}
