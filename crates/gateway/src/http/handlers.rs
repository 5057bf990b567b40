//! Request handlers. Each one extracts the trusted `X-User-Name` header,
//! delegates to the saga coordinator or read aggregator, and translates the
//! outcome into the gateway's HTTP contract.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use gateway_resilience::registry;
use serde::Deserialize;

use crate::aggregator;
use crate::error::GatewayError;
use crate::models::{CreateRentalRequest, PaginationResponse};
use crate::saga;
use crate::state::AppState;

fn username(headers: &HeaderMap) -> Result<String, GatewayError> {
    headers
        .get("X-User-Name")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| GatewayError::BadRequest("missing X-User-Name header".to_string()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCarsQuery {
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_size")]
    size: u32,
    #[serde(default)]
    show_all: bool,
}

fn default_page() -> u32 {
    1
}

fn default_size() -> u32 {
    10
}

pub async fn list_cars(
    State(state): State<AppState>,
    Query(query): Query<ListCarsQuery>,
) -> impl IntoResponse {
    let breaker = state
        .breakers
        .get(
            registry::CARS_SERVICE,
            state.config.failure_threshold,
            state.config.open_timeout,
        )
        .await;

    let url = format!("{}/api/v1/cars", state.config.cars_service_url);
    let page = query.page;

    let response = breaker
        .call_or_fallback(
            || async {
                let resp = state
                    .client
                    .get_query(
                        registry::CARS_SERVICE,
                        &url,
                        &[
                            ("page", page.to_string()),
                            ("size", query.size.to_string()),
                            ("show_all", query.show_all.to_string()),
                        ],
                    )
                    .await
                    .map_err(|_| ())?;
                if resp.status() != reqwest::StatusCode::OK {
                    return Err(());
                }
                resp.json::<PaginationResponse>().await.map_err(|_| ())
            },
            || async { PaginationResponse::empty(page) },
        )
        .await;

    Json(response)
}

pub async fn create_rental(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateRentalRequest>,
) -> Result<Response, GatewayError> {
    let user = username(&headers)?;
    let created = saga::create_rental(&state, &user, &body.car_uid, &body.date_from, &body.date_to)
        .await?;
    Ok((StatusCode::OK, Json(created)).into_response())
}

pub async fn list_rentals(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, GatewayError> {
    let user = username(&headers)?;
    let rentals = aggregator::list_rentals(&state, &user).await;
    Ok((StatusCode::OK, Json(rentals)).into_response())
}

pub async fn get_rental(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(uid): Path<String>,
) -> Result<Response, GatewayError> {
    let user = username(&headers)?;
    let rental = aggregator::get_rental(&state, &user, &uid).await?;
    Ok((StatusCode::OK, Json(rental)).into_response())
}

pub async fn cancel_rental(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(uid): Path<String>,
) -> Result<StatusCode, GatewayError> {
    let user = username(&headers)?;
    let rental = fetch_owned_rental(&state, &user, &uid).await?;
    delete_rental_record(&state, &user, &uid).await?;

    enqueue_release_car(&state, &rental.car_uid).await;
    enqueue_cancel_payment(&state, &rental.payment_uid).await;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn finish_rental(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(uid): Path<String>,
) -> Result<StatusCode, GatewayError> {
    let user = username(&headers)?;
    let rental = fetch_owned_rental(&state, &user, &uid).await?;
    finish_rental_record(&state, &user, &uid).await?;

    enqueue_release_car(&state, &rental.car_uid).await;

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_owned_rental(
    state: &AppState,
    username: &str,
    uid: &str,
) -> Result<crate::models::UpstreamRental, GatewayError> {
    let url = format!(
        "{}/api/v1/rental/{uid}",
        state.config.rental_service_url
    );
    let response = state
        .client
        .get_query(registry::RENTAL_SERVICE, &url, &[("username", username.to_string())])
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

async fn delete_rental_record(state: &AppState, username: &str, uid: &str) -> Result<(), GatewayError> {
    let url = format!("{}/api/v1/rental/{uid}", state.config.rental_service_url);
    let response = state
        .client
        .delete_query(registry::RENTAL_SERVICE, &url, &[("username", username.to_string())])
        .await
        .map_err(|_| GatewayError::UpstreamApplication {
            service: "rental",
            detail: "failed to cancel rental".to_string(),
        })?;

    if response.status() != reqwest::StatusCode::NO_CONTENT {
        return Err(GatewayError::UpstreamApplication {
            service: "rental",
            detail: "failed to cancel rental".to_string(),
        });
    }
    Ok(())
}

async fn finish_rental_record(state: &AppState, username: &str, uid: &str) -> Result<(), GatewayError> {
    let url = format!(
        "{}/api/v1/rental/{uid}/finish",
        state.config.rental_service_url
    );
    let response = state
        .client
        .post_query(registry::RENTAL_SERVICE, &url, &[("username", username.to_string())])
        .await
        .map_err(|_| GatewayError::UpstreamApplication {
            service: "rental",
            detail: "failed to finish rental".to_string(),
        })?;

    if response.status() != reqwest::StatusCode::NO_CONTENT {
        return Err(GatewayError::UpstreamApplication {
            service: "rental",
            detail: "failed to finish rental".to_string(),
        });
    }
    Ok(())
}

/// Release a car's availability in-line; on failure, hand the compensation
/// off to the retry queue rather than surfacing it to the caller.
async fn enqueue_release_car(state: &AppState, car_uid: &str) {
    let url = format!(
        "{}/api/v1/cars/{car_uid}/availability",
        state.config.cars_service_url
    );
    let result = state
        .client
        .patch_query("cars_service", &url, &[("available", "true".to_string())])
        .await;

    let succeeded = matches!(result, Ok(resp) if resp.status() == reqwest::StatusCode::OK);
    if succeeded {
        return;
    }

    let client = state.client.clone();
    let retry_url = url.clone();
    state
        .retry_queue
        .submit(
            "release_car",
            Box::new(move || {
                let client = client.clone();
                let url = retry_url.clone();
                Box::pin(async move {
                    let resp = client
                        .patch_query("cars_service", &url, &[("available", "true".to_string())])
                        .await
                        .map_err(|e| Box::new(e) as gateway_resilience::RetryActionError)?;
                    if resp.status() == reqwest::StatusCode::OK {
                        Ok(())
                    } else {
                        Err(format!("availability patch returned {}", resp.status()).into())
                    }
                })
            }),
        )
        .await;
}

async fn enqueue_cancel_payment(state: &AppState, payment_uid: &str) {
    let url = format!(
        "{}/api/v1/payment/{payment_uid}",
        state.config.payment_service_url
    );
    let result = state.client.delete("payment_service", &url).await;

    let succeeded = matches!(result, Ok(resp) if resp.status() == reqwest::StatusCode::NO_CONTENT);
    if succeeded {
        return;
    }

    let client = state.client.clone();
    let retry_url = url.clone();
    state
        .retry_queue
        .submit(
            "cancel_payment",
            Box::new(move || {
                let client = client.clone();
                let url = retry_url.clone();
                Box::pin(async move {
                    let resp = client
                        .delete("payment_service", &url)
                        .await
                        .map_err(|e| Box::new(e) as gateway_resilience::RetryActionError)?;
                    if resp.status() == reqwest::StatusCode::NO_CONTENT {
                        Ok(())
                    } else {
                        Err(format!("payment delete returned {}", resp.status()).into())
                    }
                })
            }),
        )
        .await;
}
