//! Router tests against a mocked backend.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::net::IpAddr;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use drone_backend::{BackendConfig, SentryConfig};
use drone_core::{ContractId, TokenPrice, UsdAmount, UserId};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;
use url::Url;
use wiremock::matchers::{body_partial_json, header as header_eq, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::config::FunctionsConfig;
use crate::services::webhook;
use crate::state::AppState;

const TOKEN: &str = "investor-access-token";
const WEBHOOK_SECRET: &str = "whsec-test-secret";

fn test_config(server: &MockServer) -> FunctionsConfig {
    let url = Url::parse(&server.uri()).unwrap();
    FunctionsConfig {
        host: IpAddr::from([127, 0, 0, 1]),
        port: 0,
        backend: BackendConfig {
            functions_url: url.join("functions/v1").unwrap(),
            url,
            anon_key: SecretString::from("anon-test-key"),
            service_key: Some(SecretString::from("service-test-key")),
            request_timeout: Duration::from_secs(5),
        },
        card_checkout_url: Url::parse("https://pay.example.com/checkout").unwrap(),
        webhook_secret: SecretString::from(WEBHOOK_SECRET),
        crypto_confirmation_delay: Duration::ZERO,
        token_price: TokenPrice::parse("0.10").unwrap(),
        min_investment: UsdAmount::parse("100").unwrap(),
        sentry: SentryConfig {
            dsn: None,
            environment: None,
            sample_rate: 1.0,
            traces_sample_rate: 0.0,
        },
    }
}

fn test_app(server: &MockServer) -> Router {
    crate::app(AppState::new(test_config(server)).unwrap())
}

async fn mount_user(server: &MockServer, user_id: UserId) {
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header_eq("authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": user_id,
            "email": "investor@example.com",
            "user_metadata": { "full_name": "Ada Investor" }
        })))
        .mount(server)
        .await;
}

async fn mount_profile(server: &MockServer, user_id: UserId, role: &str) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .and(query_param("id", format!("eq.{user_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": user_id,
            "email": "investor@example.com",
            "full_name": "Ada Investor",
            "role": role,
            "status": "active",
            "kyc_status": "approved",
            "created_at": "2026-01-05T10:00:00Z"
        }])))
        .mount(server)
        .await;
}

fn transaction_row(user_id: UserId, method: &str, tx_hash: &str) -> Value {
    json!({
        "id": "7a1c2d3e-0000-4000-8000-000000000001",
        "user_id": user_id,
        "kind": "purchase",
        "amount_usd": "250",
        "token_amount": "2500",
        "payment_method": method,
        "currency": null,
        "tx_hash": tx_hash,
        "status": "completed",
        "created_at": "2026-02-01T12:00:00Z"
    })
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// An authenticated multipart upload with text `fields` and one PDF file.
fn multipart_request(uri: &str, fields: &[(&str, &str)], file_name: &str) -> Request<Body> {
    let boundary = "drone-test-boundary";
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
         Content-Type: application/pdf\r\n\r\n\
         %PDF-1.4 test\r\n\
         --{boundary}--\r\n"
    ));
    Request::post(uri)
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn read_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let server = MockServer::start().await;
    let response = test_app(&server)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_missing_bearer_is_unauthorized() {
    let server = MockServer::start().await;
    let response = test_app(&server)
        .oneshot(Request::get("/token-api/balance").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = read_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn test_unknown_path_and_wrong_method() {
    let server = MockServer::start().await;
    let app = test_app(&server);

    let response = app
        .clone()
        .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(read_body(response).await["success"], false);

    let response = app
        .oneshot(Request::get("/payment-api/checkout").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(read_body(response).await["error"], "Method not allowed");
}

#[tokio::test]
async fn test_price_is_public() {
    let server = MockServer::start().await;
    let response = test_app(&server)
        .oneshot(Request::get("/token-api/price").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["token"], "DRN");
}

#[tokio::test]
async fn test_balance_defaults_to_zero() {
    let server = MockServer::start().await;
    let user_id = UserId::generate();
    mount_user(&server, user_id).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/token_holders"))
        .and(query_param("user_id", format!("eq.{user_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let response = test_app(&server)
        .oneshot(json_request("GET", "/token-api/balance", &Value::Null))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_body(response).await;
    assert_eq!(body["data"]["user_id"], user_id.to_string());
    assert_eq!(body["data"]["balance"], "0");
}

#[tokio::test]
async fn test_checkout_rejects_amount_below_minimum() {
    let server = MockServer::start().await;
    let user_id = UserId::generate();
    mount_user(&server, user_id).await;

    let response = test_app(&server)
        .oneshot(json_request(
            "POST",
            "/payment-api/checkout",
            &json!({ "amount_usd": "50" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_body(response).await["success"], false);
}

#[tokio::test]
async fn test_checkout_returns_hosted_url() {
    let server = MockServer::start().await;
    let user_id = UserId::generate();
    mount_user(&server, user_id).await;

    let response = test_app(&server)
        .oneshot(json_request(
            "POST",
            "/payment-api/checkout",
            &json!({ "amount_usd": "250" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_body(response).await;
    let reference = body["data"]["reference"].as_str().unwrap();
    assert!(reference.starts_with("DRN-"));
    let url = body["data"]["checkout_url"].as_str().unwrap();
    assert!(url.starts_with("https://pay.example.com/checkout?amount=250.00"));
    assert!(url.contains(reference));
}

#[tokio::test]
async fn test_crypto_address_has_currency_shape() {
    let server = MockServer::start().await;
    let user_id = UserId::generate();
    mount_user(&server, user_id).await;

    let response = test_app(&server)
        .oneshot(json_request(
            "POST",
            "/payment-api/crypto/address",
            &json!({ "currency": "btc", "amount_usd": "500" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_body(response).await;
    assert_eq!(body["data"]["currency"], "BTC");
    assert!(body["data"]["address"].as_str().unwrap().starts_with("bc1q"));
}

#[tokio::test]
async fn test_crypto_verify_empty_hash_writes_nothing() {
    let server = MockServer::start().await;
    let user_id = UserId::generate();
    mount_user(&server, user_id).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/wallet_transactions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let response = test_app(&server)
        .oneshot(json_request(
            "POST",
            "/payment-api/crypto/verify",
            &json!({ "tx_hash": "  ", "currency": "ETH", "amount_usd": "250" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        read_body(response).await["error"],
        "Transaction hash is required"
    );
}

#[tokio::test]
async fn test_crypto_verify_below_minimum_writes_nothing() {
    let server = MockServer::start().await;
    let user_id = UserId::generate();
    mount_user(&server, user_id).await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/rest/v1/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let response = test_app(&server)
        .oneshot(json_request(
            "POST",
            "/payment-api/crypto/verify",
            &json!({ "tx_hash": "0xabc", "currency": "ETH", "amount_usd": "0.01" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        read_body(response).await["error"],
        "The minimum investment is $100.00"
    );
}

#[tokio::test]
async fn test_crypto_verify_records_purchase() {
    let server = MockServer::start().await;
    let user_id = UserId::generate();
    mount_user(&server, user_id).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/wallet_transactions"))
        .and(body_partial_json(json!({
            "payment_method": "crypto",
            "currency": "ETH",
            "tx_hash": "0xabc123",
            "status": "completed"
        })))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!([transaction_row(user_id, "crypto", "0xabc123")])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/update_investment"))
        .and(body_partial_json(json!({ "p_user_id": user_id })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let response = test_app(&server)
        .oneshot(json_request(
            "POST",
            "/payment-api/crypto/verify",
            &json!({ "tx_hash": "0xabc123", "currency": "ETH", "amount_usd": "250" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_body(response).await;
    assert_eq!(body["message"], "Payment confirmed");
    assert_eq!(body["data"]["tx_hash"], "0xabc123");
}

#[tokio::test]
async fn test_webhook_rejects_bad_signature() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/wallet_transactions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let payload = json!({
        "event": "checkout.completed",
        "reference": "DRN-ABCDEF123456",
        "user_id": UserId::generate(),
        "amount_usd": "250"
    })
    .to_string();

    let response = test_app(&server)
        .oneshot(
            Request::post("/payment-api/webhook")
                .header(webhook::SIGNATURE_HEADER, "deadbeef")
                .body(Body::from(payload))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_webhook_records_completed_checkout() {
    let server = MockServer::start().await;
    let user_id = UserId::generate();
    Mock::given(method("POST"))
        .and(path("/rest/v1/wallet_transactions"))
        .and(body_partial_json(json!({
            "payment_method": "card",
            "tx_hash": "DRN-ABCDEF123456"
        })))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!([transaction_row(user_id, "card", "DRN-ABCDEF123456")])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/update_investment"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let payload = json!({
        "event": "checkout.completed",
        "reference": "DRN-ABCDEF123456",
        "user_id": user_id,
        "amount_usd": "250"
    })
    .to_string();
    let signature = webhook::sign(&SecretString::from(WEBHOOK_SECRET), payload.as_bytes());

    let response = test_app(&server)
        .oneshot(
            Request::post("/payment-api/webhook")
                .header(webhook::SIGNATURE_HEADER, signature)
                .body(Body::from(payload))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_body(response).await;
    assert_eq!(body["data"]["recorded"], true);
}

#[tokio::test]
async fn test_webhook_below_minimum_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/rest/v1/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let payload = json!({
        "event": "checkout.completed",
        "reference": "DRN-ABCDEF123456",
        "user_id": UserId::generate(),
        "amount_usd": "0.01"
    })
    .to_string();
    let signature = webhook::sign(&SecretString::from(WEBHOOK_SECRET), payload.as_bytes());

    let response = test_app(&server)
        .oneshot(
            Request::post("/payment-api/webhook")
                .header(webhook::SIGNATURE_HEADER, signature)
                .body(Body::from(payload))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_webhook_ignores_other_events() {
    let server = MockServer::start().await;
    let payload = json!({
        "event": "checkout.expired",
        "reference": "DRN-ABCDEF123456",
        "user_id": UserId::generate(),
        "amount_usd": "250"
    })
    .to_string();
    let signature = webhook::sign(&SecretString::from(WEBHOOK_SECRET), payload.as_bytes());

    let response = test_app(&server)
        .oneshot(
            Request::post("/payment-api/webhook")
                .header(webhook::SIGNATURE_HEADER, signature)
                .body(Body::from(payload))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_body(response).await["data"]["recorded"], false);
}

#[tokio::test]
async fn test_adjust_requires_admin() {
    let server = MockServer::start().await;
    let user_id = UserId::generate();
    mount_user(&server, user_id).await;
    mount_profile(&server, user_id, "investor").await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/adjust_token_balance"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let response = test_app(&server)
        .oneshot(json_request(
            "POST",
            "/token-api/adjust",
            &json!({ "user_id": UserId::generate(), "delta": "100", "reason": "bonus" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(read_body(response).await["error"], "Forbidden");
}

#[tokio::test]
async fn test_admin_adjust_calls_procedure_and_audits() {
    let server = MockServer::start().await;
    let admin_id = UserId::generate();
    let target = UserId::generate();
    mount_user(&server, admin_id).await;
    mount_profile(&server, admin_id, "admin").await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/adjust_token_balance"))
        .and(body_partial_json(json!({ "p_user_id": target, "p_reason": "bonus" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/log_admin_action"))
        .and(body_partial_json(json!({ "p_action": "adjust_token_balance" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let response = test_app(&server)
        .oneshot(json_request(
            "POST",
            "/token-api/adjust",
            &json!({ "user_id": target, "delta": "-25", "reason": "bonus" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_kyc_status_not_started() {
    let server = MockServer::start().await;
    let user_id = UserId::generate();
    mount_user(&server, user_id).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/kyc_sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let response = test_app(&server)
        .oneshot(json_request("GET", "/kyc-api/status", &Value::Null))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_body(response).await;
    assert_eq!(body["data"]["status"], "not_started");
    assert!(body["data"]["session"].is_null());
}

#[tokio::test]
async fn test_contract_upload_removes_object_when_update_fails() {
    let server = MockServer::start().await;
    let user_id = UserId::generate();
    let contract_id = ContractId::generate();
    mount_user(&server, user_id).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/contract_agreements"))
        .and(query_param("id", format!("eq.{contract_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": contract_id,
            "user_id": user_id,
            "contract_type": "subscription",
            "status": "pending",
            "created_at": "2026-01-05T10:00:00Z",
            "updated_at": "2026-01-05T10:00:00Z"
        }])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/storage/v1/object/contracts/.+/signed\.pdf$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Key": "contracts/x" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/contract_agreements"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "boom" })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/storage/v1/object/contracts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let request = multipart_request(
        "/contract-manager/upload",
        &[("contract_id", &contract_id.to_string())],
        "signed.pdf",
    );
    let response = test_app(&server).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        read_body(response).await["error"],
        "Internal server error"
    );
}

#[tokio::test]
async fn test_contract_upload_removes_object_when_row_vanished() {
    let server = MockServer::start().await;
    let user_id = UserId::generate();
    let contract_id = ContractId::generate();
    mount_user(&server, user_id).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/contract_agreements"))
        .and(query_param("id", format!("eq.{contract_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": contract_id,
            "user_id": user_id,
            "contract_type": "subscription",
            "status": "pending",
            "created_at": "2026-01-05T10:00:00Z",
            "updated_at": "2026-01-05T10:00:00Z"
        }])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/storage/v1/object/contracts/.+/signed\.pdf$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Key": "contracts/x" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/contract_agreements"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/storage/v1/object/contracts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let request = multipart_request(
        "/contract-manager/upload",
        &[("contract_id", &contract_id.to_string())],
        "signed.pdf",
    );
    let response = test_app(&server).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_kyc_upload_removes_object_when_row_vanished() {
    let server = MockServer::start().await;
    let user_id = UserId::generate();
    mount_user(&server, user_id).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/kyc_sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "3c9d0e1f-2a3b-4c5d-8e6f-7a8b9c0d1e2f",
            "user_id": user_id,
            "status": "pending",
            "full_name": "Ada Lovelace",
            "country": "GB",
            "document_type": "passport",
            "document_path": null,
            "submitted_at": "2026-01-05T10:00:00Z",
            "reviewed_at": null
        }])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/storage/v1/object/kyc-documents/.+/passport\.pdf$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Key": "kyc/x" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/kyc_sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/storage/v1/object/kyc-documents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let request = multipart_request("/kyc-api/upload", &[], "passport.pdf");
    let response = test_app(&server).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
