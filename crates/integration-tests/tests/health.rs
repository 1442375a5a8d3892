//! Liveness and readiness of every service.
//!
//! Requires the three servers running locally.

use drone_integration_tests::{Service, client};
use reqwest::StatusCode;

#[tokio::test]
#[ignore = "Requires running site, admin and functions servers"]
async fn test_every_service_is_live() {
    let client = client();
    for service in [Service::Site, Service::Admin, Service::Functions] {
        let resp = client
            .get(service.url("/health"))
            .send()
            .await
            .expect("Failed to reach service");
        assert_eq!(resp.status(), StatusCode::OK, "{service:?} not live");
    }
}

#[tokio::test]
#[ignore = "Requires running servers and a reachable backend"]
async fn test_every_service_is_ready() {
    let client = client();
    for service in [Service::Site, Service::Admin, Service::Functions] {
        let resp = client
            .get(service.url("/health/ready"))
            .send()
            .await
            .expect("Failed to reach service");
        assert_eq!(resp.status(), StatusCode::OK, "{service:?} not ready");
    }
}
