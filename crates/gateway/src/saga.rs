//! The create-rental saga (C6): reserve car -> create payment -> reserve
//! availability -> create rental, with inline compensations on failure.
//!
//! None of these calls go through a circuit breaker: a missing car must
//! surface as 404 rather than be masked by a fallback, and the remaining
//! steps need precise, synchronous knowledge of whether a compensation is
//! owed. Only the read paths (`aggregator.rs`) and the cars listing endpoint
//! use the breaker registry.

use chrono::NaiveDate;
use gateway_resilience::CarDescriptor;

use crate::client::TransportError;
use crate::error::GatewayError;
use crate::models::{
    CarResponse, CreatePaymentRequest, CreateRentalResponse, CreateRentalUpstreamRequest,
    PaymentInfo, PaymentStatus, RentalStatus,
};
use crate::state::AppState;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub async fn create_rental(
    state: &AppState,
    username: &str,
    car_uid: &str,
    date_from: &str,
    date_to: &str,
) -> Result<CreateRentalResponse, GatewayError> {
    // Step 1: fetch car directly; a missing car is a 404, never masked.
    let car = fetch_car(state, car_uid).await?;

    state
        .car_cache
        .put(CarDescriptor {
            car_uid: car.car_uid.clone(),
            brand: car.brand.clone(),
            model: car.model.clone(),
            registration_number: car.registration_number.clone(),
        })
        .await;

    // Step 2: compute price.
    let days = rental_days(date_from, date_to)?;
    let total_price = days * car.price;

    // Step 3: create payment. No compensation owed yet if this fails.
    let payment_uid = create_payment(state, total_price).await?;

    // Step 4: reserve the car. Compensate the payment on failure.
    if let Err(err) = set_availability(state, car_uid, false).await {
        cancel_payment_inline(state, &payment_uid).await;
        return Err(err);
    }

    // Step 5: create the rental record. Compensate both on failure.
    match create_rental_record(state, username, &payment_uid, car_uid, date_from, date_to).await {
        Ok((rental_uid, status)) => Ok(CreateRentalResponse {
            rental_uid,
            status,
            car_uid: car_uid.to_string(),
            date_from: date_from.to_string(),
            date_to: date_to.to_string(),
            payment: PaymentInfo {
                payment_uid,
                status: PaymentStatus::Paid,
                price: total_price,
            },
        }),
        Err(err) => {
            set_availability_inline(state, car_uid, true).await;
            cancel_payment_inline(state, &payment_uid).await;
            Err(err)
        }
    }
}

fn rental_days(date_from: &str, date_to: &str) -> Result<i64, GatewayError> {
    let from = NaiveDate::parse_from_str(date_from, DATE_FORMAT)
        .map_err(|_| GatewayError::BadRequest(format!("invalid dateFrom: {date_from}")))?;
    let to = NaiveDate::parse_from_str(date_to, DATE_FORMAT)
        .map_err(|_| GatewayError::BadRequest(format!("invalid dateTo: {date_to}")))?;
    Ok((to - from).num_days().abs())
}

async fn fetch_car(state: &AppState, car_uid: &str) -> Result<CarResponse, GatewayError> {
    let url = format!("{}/api/v1/cars/{car_uid}", state.config.cars_service_url);
    let response = state
        .client
        .get("cars_service", &url)
        .await
        .map_err(transport_to_uniform_unavailable)?;

    if response.status() != reqwest::StatusCode::OK {
        return Err(GatewayError::NotFound("car"));
    }

    response
        .json::<CarResponse>()
        .await
        .map_err(|_| GatewayError::UpstreamApplication {
            service: "cars",
            detail: "malformed car payload".to_string(),
        })
}

async fn create_payment(state: &AppState, price: i64) -> Result<String, GatewayError> {
    let url = format!("{}/api/v1/payment", state.config.payment_service_url);
    let response = state
        .client
        .post_json("payment_service", &url, &CreatePaymentRequest { price })
        .await
        .map_err(transport_to_uniform_unavailable)?;

    if response.status() != reqwest::StatusCode::OK {
        return Err(GatewayError::UpstreamApplication {
            service: "payment",
            detail: "failed to create payment".to_string(),
        });
    }

    let payment: PaymentInfo =
        response
            .json()
            .await
            .map_err(|_| GatewayError::UpstreamApplication {
                service: "payment",
                detail: "malformed payment payload".to_string(),
            })?;
    Ok(payment.payment_uid)
}

async fn set_availability(
    state: &AppState,
    car_uid: &str,
    available: bool,
) -> Result<(), GatewayError> {
    let url = format!(
        "{}/api/v1/cars/{car_uid}/availability",
        state.config.cars_service_url
    );
    let response = state
        .client
        .patch_query("cars_service", &url, &[("available", available.to_string())])
        .await
        .map_err(transport_to_uniform_unavailable)?;

    if response.status() != reqwest::StatusCode::OK {
        return Err(GatewayError::UpstreamApplication {
            service: "cars",
            detail: "failed to reserve car".to_string(),
        });
    }
    Ok(())
}

async fn create_rental_record(
    state: &AppState,
    username: &str,
    payment_uid: &str,
    car_uid: &str,
    date_from: &str,
    date_to: &str,
) -> Result<(String, RentalStatus), GatewayError> {
    let url = format!("{}/api/v1/rental", state.config.rental_service_url);
    let body = CreateRentalUpstreamRequest {
        username,
        payment_uid,
        car_uid,
        date_from,
        date_to,
    };
    let response = state
        .client
        .post_json("rental_service", &url, &body)
        .await
        .map_err(transport_to_uniform_unavailable)?;

    if response.status() != reqwest::StatusCode::OK {
        return Err(GatewayError::UpstreamApplication {
            service: "rental",
            detail: "failed to create rental".to_string(),
        });
    }

    #[derive(serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Created {
        rental_uid: String,
        status: RentalStatus,
    }
    let created: Created = response
        .json()
        .await
        .map_err(|_| GatewayError::UpstreamApplication {
            service: "rental",
            detail: "malformed rental payload".to_string(),
        })?;
    Ok((created.rental_uid, created.status))
}

/// Best-effort inline compensation: cancel a payment created earlier in this
/// saga. Failures here are logged but never surfaced to the caller — by the
/// time a compensation runs, the saga has already decided to fail for a
/// different reason, or has already succeeded.
async fn cancel_payment_inline(state: &AppState, payment_uid: &str) {
    let url = format!(
        "{}/api/v1/payment/{payment_uid}",
        state.config.payment_service_url
    );
    if let Err(err) = state.client.delete("payment_service", &url).await {
        tracing::warn!(payment_uid, error = %err, "compensation: failed to cancel payment");
    }
}

async fn set_availability_inline(state: &AppState, car_uid: &str, available: bool) {
    let url = format!(
        "{}/api/v1/cars/{car_uid}/availability",
        state.config.cars_service_url
    );
    if let Err(err) = state
        .client
        .patch_query("cars_service", &url, &[("available", available.to_string())])
        .await
    {
        tracing::warn!(car_uid, error = %err, "compensation: failed to release car");
    }
}

fn transport_to_uniform_unavailable(_: TransportError) -> GatewayError {
    GatewayError::PaymentServiceUnavailable
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rental_days_is_absolute_and_allows_same_day() {
        assert_eq!(rental_days("2021-10-08", "2021-10-10").unwrap(), 2);
        assert_eq!(rental_days("2021-10-10", "2021-10-08").unwrap(), 2);
        assert_eq!(rental_days("2021-10-08", "2021-10-08").unwrap(), 0);
    }

    #[test]
    fn rental_days_rejects_malformed_input() {
        assert!(rental_days("not-a-date", "2021-10-08").is_err());
    }
}
