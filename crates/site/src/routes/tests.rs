//! Router tests against a mocked backend.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::net::IpAddr;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use drone_backend::{BackendConfig, SentryConfig};
use drone_core::{TokenPrice, UsdAmount, UserId};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;
use url::Url;
use wiremock::matchers::{body_partial_json, header as header_eq, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::config::SiteConfig;
use crate::content::{ContentStore, Page, PageMeta};
use crate::state::AppState;

const USER_ID: &str = "6f1c1d2e-8a53-4c55-9d1b-3f4e5a6b7c8d";
const ACCESS_TOKEN: &str = "access-1";
const CLIENT_IP: &str = "203.0.113.9";

fn test_config(server: &MockServer) -> SiteConfig {
    let url = Url::parse(&server.uri()).unwrap();
    SiteConfig {
        host: IpAddr::from([127, 0, 0, 1]),
        port: 0,
        base_url: Url::parse("http://localhost:3000").unwrap(),
        backend: BackendConfig {
            functions_url: url.join("functions/v1").unwrap(),
            url,
            anon_key: SecretString::from("anon-test-key"),
            service_key: None,
            request_timeout: Duration::from_secs(5),
        },
        min_investment: UsdAmount::parse("100").unwrap(),
        token_price: TokenPrice::parse("0.10").unwrap(),
        sentry: SentryConfig {
            dsn: None,
            environment: None,
            sample_rate: 1.0,
            traces_sample_rate: 0.0,
        },
    }
}

fn test_app(server: &MockServer) -> Router {
    let about = Page {
        slug: "about".to_string(),
        meta: PageMeta {
            title: "About Drone Capital".to_string(),
            description: None,
            updated_at: None,
        },
        content_html: "<p>We finance fleets.</p>".to_string(),
    };
    let state = AppState::new(test_config(server), ContentStore::from_pages(vec![about])).unwrap();
    crate::app(state)
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_form(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header("x-forwarded-for", CLIENT_IP);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn read_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(response: &axum::response::Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
}

fn token_body(access_token: &str, expires_in: i64) -> Value {
    json!({
        "access_token": access_token,
        "refresh_token": "refresh-1",
        "token_type": "bearer",
        "expires_in": expires_in,
        "user": {
            "id": USER_ID,
            "email": "ada@example.com",
            "user_metadata": { "full_name": "Ada Investor" }
        }
    })
}

/// Sign in through the login form and return the session cookie.
async fn sign_in(app: &Router, server: &MockServer, expires_in: i64) -> String {
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(ACCESS_TOKEN, expires_in)))
        .mount(server)
        .await;

    let response = app
        .clone()
        .oneshot(post_form(
            "/auth/login",
            "email=ada%40example.com&password=correct-horse",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/portal");

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

/// Mount the function and table reads the dashboard makes.
async fn mount_dashboard(server: &MockServer, access_token: &str) {
    let bearer = format!("Bearer {access_token}");
    Mock::given(method("GET"))
        .and(path("/functions/v1/token-api/balance"))
        .and(header_eq("authorization", bearer.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "user_id": USER_ID,
                "balance": "2500",
                "total_invested_usd": "250",
                "updated_at": "2026-02-01T12:00:00Z"
            }
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/functions/v1/token-api/transactions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": []})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/functions/v1/kyc-api/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"status": "approved", "session": null}
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/investments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
}

// =============================================================================
// Public pages
// =============================================================================

#[tokio::test]
async fn test_health_sets_request_id_and_security_headers() {
    let server = MockServer::start().await;
    let response = test_app(&server).oneshot(get("/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
}

#[tokio::test]
async fn test_home_shows_platform_stats() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/get_platform_stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_investors": 42,
            "total_raised_usd": "12500",
            "tokens_issued": "125000"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let app = test_app(&server);

    let response = app.clone().oneshot(get("/", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_text(response).await;
    assert!(body.contains("42"));
    assert!(body.contains("$12,500.00"));

    // Served from the cache the second time
    let response = app.oneshot(get("/", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_home_renders_zeros_when_stats_fail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/get_platform_stats"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let response = test_app(&server).oneshot(get("/", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(read_text(response).await.contains("$0.00"));
}

#[tokio::test]
async fn test_content_page_and_unknown_slug() {
    let server = MockServer::start().await;
    let app = test_app(&server);

    let response = app.clone().oneshot(get("/about", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(read_text(response).await.contains("We finance fleets."));

    let response = app.oneshot(get("/no-such-page", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Auth
// =============================================================================

#[tokio::test]
async fn test_portal_requires_sign_in() {
    let server = MockServer::start().await;
    let response = test_app(&server).oneshot(get("/portal", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login");
}

#[tokio::test]
async fn test_bad_credentials_redirect_with_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .mount(&server)
        .await;

    let response = test_app(&server)
        .oneshot(post_form("/auth/login", "email=ada%40example.com&password=wrong", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login?error=credentials");
}

#[tokio::test]
async fn test_login_opens_the_dashboard() {
    let server = MockServer::start().await;
    let app = test_app(&server);
    let cookie = sign_in(&app, &server, 3600).await;
    mount_dashboard(&server, ACCESS_TOKEN).await;

    let response = app.oneshot(get("/portal", Some(&cookie))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_text(response).await;
    assert!(body.contains("Ada Investor"));
    assert!(body.contains("2,500.0000 DRN"));
}

#[tokio::test]
async fn test_expired_token_is_refreshed_once() {
    let server = MockServer::start().await;
    let app = test_app(&server);
    let cookie = sign_in(&app, &server, 0).await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .and(body_partial_json(json!({"refresh_token": "refresh-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("access-2", 3600)))
        .expect(1)
        .mount(&server)
        .await;
    mount_dashboard(&server, "access-2").await;

    let response = app.clone().oneshot(get("/portal", Some(&cookie))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The refreshed token is stored, so no second refresh happens
    let response = app.oneshot(get("/portal", Some(&cookie))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_failed_refresh_signs_the_investor_out() {
    let server = MockServer::start().await;
    let app = test_app(&server);
    let cookie = sign_in(&app, &server, 0).await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Refresh token revoked"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = app.clone().oneshot(get("/portal", Some(&cookie))).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login?error=expired");

    let response = app.oneshot(get("/portal", Some(&cookie))).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login");
}

#[tokio::test]
async fn test_login_is_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error_description": "Invalid login credentials"
        })))
        .mount(&server)
        .await;
    let app = test_app(&server);

    for _ in 0..5 {
        let response = app
            .clone()
            .oneshot(post_form("/auth/login", "email=a%40b.co&password=x", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    let response = app
        .oneshot(post_form("/auth/login", "email=a%40b.co&password=x", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

// =============================================================================
// Portal
// =============================================================================

#[tokio::test]
async fn test_documents_hide_other_investors_files() {
    let server = MockServer::start().await;
    let app = test_app(&server);
    let cookie = sign_in(&app, &server, 3600).await;

    let other = UserId::generate();
    Mock::given(method("GET"))
        .and(path("/rest/v1/documents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": "0b6f7a8e-1111-4000-8000-000000000001",
                "owner_id": null,
                "title": "Quarterly Report Q3",
                "category": "report",
                "storage_path": "public/q3.pdf",
                "file_name": "q3.pdf",
                "content_type": "application/pdf",
                "size_bytes": 2048,
                "is_public": true,
                "uploaded_at": "2026-09-30T09:00:00Z"
            },
            {
                "id": "0b6f7a8e-1111-4000-8000-000000000002",
                "owner_id": other,
                "title": "Someone Else's Statement",
                "category": "statement",
                "storage_path": "private/other.pdf",
                "file_name": "other.pdf",
                "content_type": "application/pdf",
                "size_bytes": 1024,
                "is_public": false,
                "uploaded_at": "2026-09-30T09:00:00Z"
            }
        ])))
        .mount(&server)
        .await;

    let response = app.oneshot(get("/portal/documents", Some(&cookie))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_text(response).await;
    assert!(body.contains("Quarterly Report Q3"));
    assert!(!body.contains("other.pdf"));
}

#[tokio::test]
async fn test_document_download_redirects_to_signed_url() {
    let server = MockServer::start().await;
    let app = test_app(&server);
    let cookie = sign_in(&app, &server, 3600).await;

    let own = "0b6f7a8e-1111-4000-8000-000000000003";
    let foreign = "0b6f7a8e-1111-4000-8000-000000000004";
    let row = |id: &str, owner: Value, storage_path: &str| {
        json!([{
            "id": id,
            "owner_id": owner,
            "title": "Statement",
            "category": "statement",
            "storage_path": storage_path,
            "file_name": "statement.pdf",
            "content_type": "application/pdf",
            "size_bytes": 1024,
            "is_public": false,
            "uploaded_at": "2026-09-30T09:00:00Z"
        }])
    };
    Mock::given(method("GET"))
        .and(path("/rest/v1/documents"))
        .and(query_param("id", format!("eq.{own}")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(row(own, json!(USER_ID), "private/mine.pdf")),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/documents"))
        .and(query_param("id", format!("eq.{foreign}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(row(
            foreign,
            json!(UserId::generate()),
            "private/theirs.pdf",
        )))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/storage/v1/object/sign/documents/private/mine.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "signedURL": "/object/sign/documents/private/mine.pdf?token=t1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = app
        .clone()
        .oneshot(get(&format!("/portal/documents/{own}/download"), Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        format!("{}/storage/v1/object/sign/documents/private/mine.pdf?token=t1", server.uri())
    );

    let response = app
        .oneshot(get(&format!("/portal/documents/{foreign}/download"), Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

fn contract_upload(id: &str, file_contents: &str, cookie: &str) -> Request<Body> {
    let boundary = "drone-portal-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"signed copy.pdf\"\r\n\
         Content-Type: application/pdf\r\n\r\n\
         {file_contents}\r\n\
         --{boundary}--\r\n"
    );
    Request::builder()
        .method("POST")
        .uri(format!("/portal/contracts/{id}/upload"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .header(header::COOKIE, cookie)
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_contract_upload_forwards_file_and_rejects_empty_ones() {
    let server = MockServer::start().await;
    let app = test_app(&server);
    let cookie = sign_in(&app, &server, 3600).await;

    let id = "9a8b7c6d-5e4f-4a3b-8c2d-1e0f9a8b7c6d";
    Mock::given(method("GET"))
        .and(path("/functions/v1/contract-manager/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": []})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/functions/v1/contract-manager/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "id": id,
                "user_id": USER_ID,
                "contract_type": "subscription",
                "status": "uploaded",
                "storage_path": "u/c/signed_copy.pdf",
                "file_name": "signed_copy.pdf",
                "created_at": "2026-10-18T09:00:00Z",
                "updated_at": "2026-10-19T09:00:00Z"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = app
        .clone()
        .oneshot(contract_upload(id, "", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(read_text(response).await.contains("The file is empty"));

    let response = app
        .oneshot(contract_upload(id, "%PDF-1.4", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/portal/contracts?uploaded=1");
}

#[tokio::test]
async fn test_kyc_page_renders_inside_portal_layout() {
    let server = MockServer::start().await;
    let app = test_app(&server);
    let cookie = sign_in(&app, &server, 3600).await;
    Mock::given(method("GET"))
        .and(path("/functions/v1/kyc-api/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"status": "not_started", "session": null}
        })))
        .mount(&server)
        .await;

    let response = app.oneshot(get("/portal/kyc", Some(&cookie))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_text(response).await;
    assert!(body.contains("Identity verification"));
    assert!(body.contains(r#"<aside class="portal-nav">"#));
    assert!(body.contains("Sign out"));
}

#[tokio::test]
async fn test_card_investment_redirects_to_checkout() {
    let server = MockServer::start().await;
    let app = test_app(&server);
    let cookie = sign_in(&app, &server, 3600).await;

    let checkout = "https://pay.example.com/checkout?amount=250.00&reference=DRN-TEST";
    Mock::given(method("POST"))
        .and(path("/functions/v1/payment-api/checkout"))
        .and(body_partial_json(json!({"amount_usd": "250"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "checkout_url": checkout,
                "reference": "DRN-TEST",
                "amount_usd": "250",
                "tokens": "2500"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = app
        .oneshot(post_form(
            "/portal/invest",
            "amount_usd=250&method=card",
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), checkout);
}

#[tokio::test]
async fn test_investment_below_minimum_is_rejected_locally() {
    let server = MockServer::start().await;
    let app = test_app(&server);
    let cookie = sign_in(&app, &server, 3600).await;

    Mock::given(method("POST"))
        .and(path("/functions/v1/payment-api/checkout"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let response = app
        .oneshot(post_form("/portal/invest", "amount_usd=50&method=card", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(read_text(response).await.contains("The minimum investment is $100.00"));
}

#[tokio::test]
async fn test_empty_transaction_hash_never_reaches_payment_api() {
    let server = MockServer::start().await;
    let app = test_app(&server);
    let cookie = sign_in(&app, &server, 3600).await;

    Mock::given(method("POST"))
        .and(path("/functions/v1/payment-api/crypto/address"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "currency": "BTC",
                "address": "bc1qtestaddress000000000000000000000000000",
                "amount_usd": "250",
                "tokens": "2500",
                "token_price": "0.10",
                "expires_at": (chrono::Utc::now() + chrono::Duration::minutes(30)).to_rfc3339()
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/functions/v1/payment-api/crypto/verify"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let response = app
        .clone()
        .oneshot(post_form(
            "/portal/invest",
            "amount_usd=250&method=crypto&currency=BTC",
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(read_text(response).await.contains("bc1qtestaddress"));

    let response = app
        .oneshot(post_form("/portal/invest/crypto/verify", "tx_hash=++", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(read_text(response).await.contains("Enter the transaction hash from your wallet"));
}

#[tokio::test]
async fn test_verify_without_pending_quote_starts_over() {
    let server = MockServer::start().await;
    let app = test_app(&server);
    let cookie = sign_in(&app, &server, 3600).await;

    let response = app
        .oneshot(post_form("/portal/invest/crypto/verify", "tx_hash=0xabc", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/portal/invest?error=expired");
}
