//! Tests for the real delivery channels and the verification client against
//! local mock collaborators.
//!
//! Each test spins up a throwaway axum server on an ephemeral port standing
//! in for the email provider, the storage REST interface, or the
//! verification service.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use leadgate::deliver::{DeliveryChannel, EmailChannel, StorageChannel};
use leadgate::lead::{Lead, SubmissionContext};
use leadgate::state::http_client;
use leadgate::verify::{Verifier, VerifyOutcome};
use leadgate::IntakeConfig;

async fn spawn_mock(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn contact_lead() -> Lead {
    Lead::Contact {
        name: "Jane".into(),
        business_name: "Acme".into(),
        email: "jane@acme.com".into(),
        message: "Hi".into(),
    }
}

fn waitlist_lead() -> Lead {
    Lead::Waitlist {
        email: "early@bird.io".into(),
        product_interest: "pos".into(),
        full_name: None,
        phone: None,
        business_name: None,
        notes: Some("ping me".into()),
    }
}

fn ctx() -> SubmissionContext {
    SubmissionContext {
        page_url: "https://example.com/contact".into(),
        referrer: None,
        user_agent: "channel-test/1.0".into(),
        attribution: None,
        ip: "203.0.113.5".into(),
    }
}

#[tokio::test]
async fn email_channel_posts_and_succeeds() {
    let seen = Arc::new(AtomicUsize::new(0));
    let router = Router::new()
        .route(
            "/emails",
            post(
                |State(seen): State<Arc<AtomicUsize>>, Json(body): Json<Value>| async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    assert_eq!(body["to"], json!(["ops@acme.test"]));
                    assert_eq!(body["subject"], json!("New Contact Lead - Acme"));
                    assert!(body["text"].as_str().unwrap().contains("Lead Type: contact"));
                    StatusCode::OK
                },
            ),
        )
        .with_state(seen.clone());
    let base = spawn_mock(router).await;

    let config = IntakeConfig {
        resend_api_key: Some("re_test".into()),
        resend_from_email: Some("noreply@acme.test".into()),
        lead_receiver_email: "ops@acme.test".into(),
        resend_api_url: base,
        ..IntakeConfig::default()
    };
    let channel = EmailChannel::from_config(&config, http_client());

    let result = channel.deliver(&contact_lead(), &ctx()).await;
    assert!(result.ok, "reason: {:?}", result.reason);
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn email_channel_captures_provider_error() {
    let router = Router::new().route(
        "/emails",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "smtp exploded") }),
    );
    let base = spawn_mock(router).await;

    let config = IntakeConfig {
        resend_api_key: Some("re_test".into()),
        resend_from_email: Some("noreply@acme.test".into()),
        resend_api_url: base,
        ..IntakeConfig::default()
    };
    let channel = EmailChannel::from_config(&config, http_client());

    let result = channel.deliver(&contact_lead(), &ctx()).await;
    assert!(!result.ok);
    assert!(!result.skipped);
    assert_eq!(
        result.reason.as_deref(),
        Some("Resend error (500): smtp exploded")
    );
}

#[tokio::test]
async fn email_channel_without_config_is_skipped() {
    let channel = EmailChannel::from_config(&IntakeConfig::default(), http_client());
    let result = channel.deliver(&contact_lead(), &ctx()).await;
    assert!(result.skipped);
    assert_eq!(result.reason.as_deref(), Some("Missing Resend configuration."));
}

#[tokio::test]
async fn storage_channel_inserts_a_row() {
    let router = Router::new().route(
        "/rest/v1/lead_requests",
        post(|Json(row): Json<Value>| async move {
            assert_eq!(row["lead_type"], json!("contact"));
            assert_eq!(row["business_email"], json!("jane@acme.com"));
            assert_eq!(row["phone"], Value::Null);
            StatusCode::CREATED
        }),
    );
    let base = spawn_mock(router).await;

    let channel = StorageChannel::new(
        http_client(),
        Some(base),
        Some("service-role".into()),
        "lead_requests".into(),
    );
    let result = channel.deliver(&contact_lead(), &ctx()).await;
    assert!(result.ok, "reason: {:?}", result.reason);
}

#[tokio::test]
async fn storage_schema_mismatch_retries_once_without_the_column() {
    let calls = Arc::new(AtomicUsize::new(0));
    let router = Router::new()
        .route(
            "/rest/v1/lead_requests",
            post(
                |State(calls): State<Arc<AtomicUsize>>, Json(row): Json<Value>| async move {
                    let call = calls.fetch_add(1, Ordering::SeqCst);
                    if call == 0 {
                        assert!(row.as_object().unwrap().contains_key("notes"));
                        (
                            StatusCode::BAD_REQUEST,
                            "Could not find the 'notes' column of 'lead_requests' in the schema cache"
                                .to_string(),
                        )
                    } else {
                        assert!(!row.as_object().unwrap().contains_key("notes"));
                        (StatusCode::CREATED, String::new())
                    }
                },
            ),
        )
        .with_state(calls.clone());
    let base = spawn_mock(router).await;

    let channel = StorageChannel::new(
        http_client(),
        Some(base),
        Some("service-role".into()),
        "lead_requests".into(),
    );
    let result = channel.deliver(&waitlist_lead(), &ctx()).await;

    assert!(result.ok, "reason: {:?}", result.reason);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn storage_non_schema_failure_is_not_retried() {
    let calls = Arc::new(AtomicUsize::new(0));
    let router = Router::new()
        .route(
            "/rest/v1/lead_requests",
            post(|State(calls): State<Arc<AtomicUsize>>| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                (StatusCode::INTERNAL_SERVER_ERROR, "permission denied")
            }),
        )
        .with_state(calls.clone());
    let base = spawn_mock(router).await;

    let channel = StorageChannel::new(
        http_client(),
        Some(base),
        Some("service-role".into()),
        "lead_requests".into(),
    );
    let result = channel.deliver(&contact_lead(), &ctx()).await;

    assert!(!result.ok);
    assert_eq!(
        result.reason.as_deref(),
        Some("Supabase error (500): permission denied")
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn verifier_accepts_and_rejects_per_upstream_verdict() {
    let router = Router::new().route(
        "/siteverify",
        post(|body: String| async move {
            // The secret travels as form data; echo a verdict keyed off the
            // token value so one mock covers both verdicts.
            let reject = body.contains("response=bad-token");
            if reject {
                Json(json!({"success": false, "error-codes": ["invalid-input-response"]}))
            } else {
                Json(json!({"success": true}))
            }
        }),
    );
    let base = spawn_mock(router).await;

    let verifier = Verifier::new(
        Some("secret".into()),
        format!("{base}/siteverify"),
        http_client(),
    );

    assert_eq!(
        verifier.verify("good-token", "1.2.3.4").await,
        VerifyOutcome::Passed
    );
    assert_eq!(
        verifier.verify("bad-token", "1.2.3.4").await,
        VerifyOutcome::Rejected("invalid-input-response".to_string())
    );
}

#[tokio::test]
async fn verifier_maps_upstream_5xx_to_unavailable() {
    let router = Router::new().route(
        "/siteverify",
        post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
    );
    let base = spawn_mock(router).await;

    let verifier = Verifier::new(
        Some("secret".into()),
        format!("{base}/siteverify"),
        http_client(),
    );

    assert_eq!(
        verifier.verify("token", "1.2.3.4").await,
        VerifyOutcome::Unavailable("Turnstile verification HTTP 500.".to_string())
    );
}
