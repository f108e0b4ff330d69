//! Payload types for the catalog API.

use rocket_shoes_core::ProductId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Product detail as returned by `GET /products/{id}`.
///
/// The cart carries these fields verbatim; it never interprets them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub price: Decimal,
    pub image: String,
}

/// Stock level as returned by `GET /stock/{id}`.
///
/// `amount` is the maximum purchasable quantity at the time of the read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    pub id: ProductId,
    pub amount: u32,
}
