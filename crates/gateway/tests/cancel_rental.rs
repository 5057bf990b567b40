//! Scenario S6: cancelling a rental succeeds even though the car-release
//! compensation initially fails; the failure is handed to the retry queue
//! and drained once the upstream recovers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rental_gateway::http;
use rental_gateway::{AppState, Config};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Fails the first N requests, then succeeds. Lets the test assert the
/// retry queue actually needed to retry rather than succeeding on the first
/// in-line attempt.
struct FailNTimes {
    remaining: Arc<AtomicUsize>,
}

impl Respond for FailNTimes {
    fn respond(&self, _: &Request) -> ResponseTemplate {
        let prev = self.remaining.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
            Some(n.saturating_sub(1))
        });
        if prev.unwrap_or(0) > 0 {
            ResponseTemplate::new(500)
        } else {
            ResponseTemplate::new(200)
        }
    }
}

#[tokio::test(start_paused = true)]
async fn s6_cancel_returns_204_and_retry_queue_drains_release_car() {
    let cars = MockServer::start().await;
    let rental = MockServer::start().await;
    let payment = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/rental/R1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rentalUid": "R1",
            "username": "alice",
            "paymentUid": "P1",
            "carUid": "U1",
            "dateFrom": "2021-10-08",
            "dateTo": "2021-10-10",
            "status": "IN_PROGRESS"
        })))
        .mount(&rental)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/api/v1/rental/R1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&rental)
        .await;

    let remaining = Arc::new(AtomicUsize::new(1));
    Mock::given(method("PATCH"))
        .and(path("/api/v1/cars/U1/availability"))
        .respond_with(FailNTimes {
            remaining: remaining.clone(),
        })
        .mount(&cars)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/api/v1/payment/P1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&payment)
        .await;

    let config = Config {
        cars_service_url: cars.uri(),
        rental_service_url: rental.uri(),
        payment_service_url: payment.uri(),
        upstream_timeout: Duration::from_millis(500),
        retry_interval: Duration::from_millis(10),
        retry_max_attempts: 5,
        ..Config::default()
    };
    let state = AppState::new(config);
    let _worker = state.retry_queue.clone().spawn_worker();

    let app = http::routes(state.clone());
    let response = {
        use axum::body::Body;
        use axum::http::Request as HttpRequest;
        use tower::ServiceExt;

        app.oneshot(
            HttpRequest::builder()
                .method("DELETE")
                .uri("/api/v1/rental/R1")
                .header("X-User-Name", "alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
    };
    assert_eq!(response.status(), axum::http::StatusCode::NO_CONTENT);

    assert_eq!(state.retry_queue.len().await, 1);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(state.retry_queue.len().await, 0);

    state.retry_queue.stop();
}
