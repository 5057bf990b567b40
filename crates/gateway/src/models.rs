//! JSON DTOs for the gateway's client-facing API and the upstream HTTP
//! contracts it consumes. Field names follow the camelCase aliases the
//! spec documents; Rust-side fields stay snake_case via `serde(rename_all)`.

use serde::{Deserialize, Serialize};

/// Car type enum as enforced by the Cars service's check constraint.
pub type CarType = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarResponse {
    pub car_uid: String,
    pub brand: String,
    pub model: String,
    pub registration_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power: Option<i64>,
    pub price: i64,
    #[serde(rename = "type")]
    pub car_type: CarType,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationResponse {
    pub page: u32,
    pub page_size: u32,
    pub total_elements: u64,
    pub items: Vec<CarResponse>,
}

impl PaginationResponse {
    /// Degraded response served when the Cars breaker has no fallback cache
    /// data worth returning for a listing (the cache only remembers single
    /// cars by uid, not pages).
    pub fn empty(page: u32) -> Self {
        Self {
            page,
            page_size: 0,
            total_elements: 0,
            items: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Paid,
    Canceled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    pub payment_uid: String,
    pub status: PaymentStatus,
    pub price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarInfo {
    pub car_uid: String,
    pub brand: String,
    pub model: String,
    pub registration_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RentalStatus {
    InProgress,
    Finished,
    Canceled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalResponse {
    pub rental_uid: String,
    pub status: RentalStatus,
    pub date_from: String,
    pub date_to: String,
    pub car: CarInfo,
    pub payment: PaymentInfo,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRentalRequest {
    pub car_uid: String,
    pub date_from: String,
    pub date_to: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRentalResponse {
    pub rental_uid: String,
    pub status: RentalStatus,
    pub car_uid: String,
    pub date_from: String,
    pub date_to: String,
    pub payment: PaymentInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Raw JSON shape returned by the Rental service for a single rental, used
/// internally before it's composed into a [`RentalResponse`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamRental {
    pub rental_uid: String,
    pub username: String,
    pub payment_uid: String,
    pub car_uid: String,
    pub date_from: String,
    pub date_to: String,
    pub status: RentalStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRentalUpstreamRequest<'a> {
    pub username: &'a str,
    pub payment_uid: &'a str,
    pub car_uid: &'a str,
    pub date_from: &'a str,
    pub date_to: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatePaymentRequest {
    pub price: i64,
}
