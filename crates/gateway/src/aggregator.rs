//! Read-side fan-out aggregation (C7): assembling [`RentalResponse`]s by
//! joining a rental record with its car and payment, each fetched through its
//! own circuit breaker so a degraded upstream degrades one field, not the
//! whole response.

use gateway_resilience::{registry, BreakerError, CarDescriptor};

use crate::error::GatewayError;
use crate::models::{CarInfo, PaymentInfo, PaymentStatus, RentalResponse, UpstreamRental};
use crate::state::AppState;

pub async fn list_rentals(state: &AppState, username: &str) -> Vec<RentalResponse> {
    let breaker = state
        .breakers
        .get(
            registry::RENTAL_SERVICE,
            state.config.failure_threshold,
            state.config.open_timeout,
        )
        .await;

    let url = format!("{}/api/v1/rental", state.config.rental_service_url);
    let username_owned = username.to_string();

    let rentals = breaker
        .call_or_fallback(
            || fetch_rentals_for_user(state, &url, &username_owned),
            || async { Vec::new() },
        )
        .await;

    let mut responses = Vec::with_capacity(rentals.len());
    for rental in rentals {
        responses.push(compose(state, rental).await);
    }
    responses
}

pub async fn get_rental(
    state: &AppState,
    username: &str,
    rental_uid: &str,
) -> Result<RentalResponse, GatewayError> {
    let breaker = state
        .breakers
        .get(
            registry::RENTAL_SERVICE,
            state.config.failure_threshold,
            state.config.open_timeout,
        )
        .await;

    let url = format!(
        "{}/api/v1/rental/{rental_uid}",
        state.config.rental_service_url
    );

    let rental = breaker
        .call(|| fetch_single_rental(state, &url))
        .await
        .map_err(|err| match err {
            // An open breaker means the rental service is unreachable, not
            // that this particular rental doesn't exist; don't mask an
            // outage as a 404.
            BreakerError::Open { .. } => GatewayError::UpstreamApplication {
                service: "rental",
                detail: "rental service unavailable".to_string(),
            },
            BreakerError::Inner(inner) => inner,
        })?;

    if rental.username != username {
        return Err(GatewayError::NotFound("rental"));
    }

    Ok(compose(state, rental).await)
}

async fn compose(state: &AppState, rental: UpstreamRental) -> RentalResponse {
    let car = fetch_car(state, &rental.car_uid).await;
    let payment = fetch_payment(state, &rental.payment_uid).await;
    RentalResponse {
        rental_uid: rental.rental_uid,
        status: rental.status,
        date_from: rental.date_from,
        date_to: rental.date_to,
        car,
        payment,
    }
}

async fn fetch_car(state: &AppState, car_uid: &str) -> CarInfo {
    let breaker = state
        .breakers
        .get(
            registry::CARS_SERVICE,
            state.config.failure_threshold,
            state.config.open_timeout,
        )
        .await;

    let url = format!("{}/api/v1/cars/{car_uid}", state.config.cars_service_url);
    let car_uid_owned = car_uid.to_string();

    breaker
        .call_or_fallback(
            || async {
                let response = state
                    .client
                    .get(registry::CARS_SERVICE, &url)
                    .await
                    .map_err(|_| ())?;
                if response.status() != reqwest::StatusCode::OK {
                    return Err(());
                }
                let car = response
                    .json::<crate::models::CarResponse>()
                    .await
                    .map_err(|_| ())?;
                state
                    .car_cache
                    .put(CarDescriptor {
                        car_uid: car.car_uid.clone(),
                        brand: car.brand.clone(),
                        model: car.model.clone(),
                        registration_number: car.registration_number.clone(),
                    })
                    .await;
                Ok(CarInfo {
                    car_uid: car.car_uid,
                    brand: car.brand,
                    model: car.model,
                    registration_number: car.registration_number,
                })
            },
            || async {
                state
                    .car_cache
                    .get(&car_uid_owned)
                    .await
                    .map(|descriptor: CarDescriptor| CarInfo {
                        car_uid: descriptor.car_uid,
                        brand: descriptor.brand,
                        model: descriptor.model,
                        registration_number: descriptor.registration_number,
                    })
                    .unwrap_or(CarInfo {
                        car_uid: car_uid_owned,
                        brand: String::new(),
                        model: String::new(),
                        registration_number: String::new(),
                    })
            },
        )
        .await
}

async fn fetch_payment(state: &AppState, payment_uid: &str) -> PaymentInfo {
    let breaker = state
        .breakers
        .get(
            registry::PAYMENT_SERVICE,
            state.config.failure_threshold,
            state.config.open_timeout,
        )
        .await;

    let url = format!(
        "{}/api/v1/payment/{payment_uid}",
        state.config.payment_service_url
    );
    let payment_uid_owned = payment_uid.to_string();

    breaker
        .call_or_fallback(
            || async {
                let response = state
                    .client
                    .get(registry::PAYMENT_SERVICE, &url)
                    .await
                    .map_err(|_| ())?;
                if response.status() != reqwest::StatusCode::OK {
                    return Err(());
                }
                response.json::<PaymentInfo>().await.map_err(|_| ())
            },
            || async {
                PaymentInfo {
                    payment_uid: payment_uid_owned,
                    status: PaymentStatus::Paid,
                    price: 0,
                }
            },
        )
        .await
}

async fn fetch_rentals_for_user(
    state: &AppState,
    url: &str,
    username: &str,
) -> Result<Vec<UpstreamRental>, ()> {
    let response = state
        .client
        .get_query(
            registry::RENTAL_SERVICE,
            url,
            &[("username", username.to_string())],
        )
        .await
        .map_err(|_| ())?;

    // Any non-2xx counts as a breaker failure, same as `fetch_car`/`fetch_payment`;
    // the caller's fallback (an empty list) covers it.
    if response.status() != reqwest::StatusCode::OK {
        return Err(());
    }

    response.json::<Vec<UpstreamRental>>().await.map_err(|_| ())
}

async fn fetch_single_rental(
    state: &AppState,
    url: &str,
) -> Result<UpstreamRental, GatewayError> {
    let response = state
        .client
        .get(registry::RENTAL_SERVICE, url)
        .await
        .map_err(|_| GatewayError::NotFound("rental"))?;

    if response.status() != reqwest::StatusCode::OK {
        return Err(GatewayError::NotFound("rental"));
    }

    response
        .json()
        .await
        .map_err(|_| GatewayError::NotFound("rental"))
}
