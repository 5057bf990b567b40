//! Scenarios S1-S4 from the create-rental contract: happy path, missing car,
//! transport failure during payment, and reservation failure.

use std::time::Duration;

use rental_gateway::{AppState, Config};
use serde_json::json;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn test_state(cars: &MockServer, rental: &MockServer, payment: &MockServer) -> AppState {
    let config = Config {
        cars_service_url: cars.uri(),
        rental_service_url: rental.uri(),
        payment_service_url: payment.uri(),
        upstream_timeout: Duration::from_millis(500),
        ..Config::default()
    };
    AppState::new(config)
}

#[tokio::test]
async fn s1_happy_path_populates_cache_and_returns_payment_price() {
    let cars = MockServer::start().await;
    let rental = MockServer::start().await;
    let payment = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/cars/U1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "carUid": "U1",
            "brand": "Tesla",
            "model": "Model 3",
            "registrationNumber": "A123BC",
            "price": 3500,
            "type": "SEDAN",
            "available": true
        })))
        .mount(&cars)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/api/v1/cars/U1/availability"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&cars)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/payment"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "paymentUid": "P1",
            "status": "PAID",
            "price": 7000
        })))
        .mount(&payment)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/rental"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rentalUid": "R1",
            "status": "IN_PROGRESS"
        })))
        .mount(&rental)
        .await;

    let state = test_state(&cars, &rental, &payment).await;

    let response = rental_gateway::saga::create_rental(&state, "alice", "U1", "2021-10-08", "2021-10-10")
        .await
        .expect("saga should succeed");

    assert_eq!(response.car_uid, "U1");
    assert_eq!(response.payment.price, 7000);
    assert_eq!(
        response.status,
        rental_gateway::models::RentalStatus::InProgress
    );

    let cached = state.car_cache.get("U1").await.expect("car should be cached");
    assert_eq!(cached.brand, "Tesla");
}

#[tokio::test]
async fn s2_car_not_found_short_circuits_before_any_other_call() {
    let cars = MockServer::start().await;
    let rental = MockServer::start().await;
    let payment = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/cars/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&cars)
        .await;

    // No payment or rental mocks registered: an unexpected call to either
    // would be a 404 from wiremock's own unmatched-request handling, which
    // would surface as a different error than `NotFound`.

    let state = test_state(&cars, &rental, &payment).await;

    let err = rental_gateway::saga::create_rental(&state, "alice", "missing", "2021-10-08", "2021-10-10")
        .await
        .expect_err("saga should fail");

    assert!(matches!(err, rental_gateway::error::GatewayError::NotFound("car")));
}

#[tokio::test]
async fn s3_payment_transport_failure_yields_uniform_message() {
    let cars = MockServer::start().await;
    let rental = MockServer::start().await;
    // Payment server is never started as a listener we point at; instead we
    // point the gateway at a payment URL that nothing is listening on by
    // stopping the mock server before use.
    let payment = MockServer::start().await;
    let payment_uri = payment.uri();
    drop(payment);

    Mock::given(method("GET"))
        .and(path("/api/v1/cars/U1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "carUid": "U1",
            "brand": "Tesla",
            "model": "Model 3",
            "registrationNumber": "A123BC",
            "price": 3500,
            "type": "SEDAN",
            "available": true
        })))
        .mount(&cars)
        .await;

    let config = Config {
        cars_service_url: cars.uri(),
        rental_service_url: rental.uri(),
        payment_service_url: payment_uri,
        upstream_timeout: Duration::from_millis(500),
        ..Config::default()
    };
    let state = AppState::new(config);

    let err = rental_gateway::saga::create_rental(&state, "alice", "U1", "2021-10-08", "2021-10-10")
        .await
        .expect_err("saga should fail");

    assert!(matches!(
        err,
        rental_gateway::error::GatewayError::PaymentServiceUnavailable
    ));
}

#[tokio::test]
async fn s4_reservation_failure_compensates_payment_exactly_once() {
    let cars = MockServer::start().await;
    let rental = MockServer::start().await;
    let payment = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/cars/U2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "carUid": "U2",
            "brand": "Honda",
            "model": "Civic",
            "registrationNumber": "B456CD",
            "price": 1000,
            "type": "SEDAN",
            "available": true
        })))
        .mount(&cars)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/api/v1/cars/U2/availability"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&cars)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/payment"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "paymentUid": "P2",
            "status": "PAID",
            "price": 2000
        })))
        .mount(&payment)
        .await;

    Mock::given(method("DELETE"))
        .and(path_regex(r"^/api/v1/payment/P2$"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&payment)
        .await;

    let state = test_state(&cars, &rental, &payment).await;

    let err = rental_gateway::saga::create_rental(&state, "alice", "U2", "2021-10-08", "2021-10-10")
        .await
        .expect_err("saga should fail");

    assert!(matches!(
        err,
        rental_gateway::error::GatewayError::UpstreamApplication { service: "cars", .. }
    ));

    payment.verify().await;
}
