//! Unified error handling for cart operations.
//!
//! Provides the [`CartError`] type internal operations return. Errors never
//! cross the public operation boundary: [`crate::store::CartStore`] maps
//! each variant to a user-facing message and reports it through the
//! notification sink.

use rocket_shoes_core::ProductId;
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::storage::StorageError;

/// User-facing message for the insufficient-stock rejection.
pub const MSG_OUT_OF_STOCK: &str = "Requested quantity out of stock";

/// User-facing message when `add_product` fails.
pub const MSG_ADD_FAILED: &str = "Error adding product";

/// User-facing message when `remove_product` fails.
pub const MSG_REMOVE_FAILED: &str = "Error removing product";

/// User-facing message when `update_product_amount` fails.
pub const MSG_UPDATE_FAILED: &str = "Error changing product quantity";

/// Errors produced by cart operations.
///
/// `OutOfStock` is a business-rule rejection with its own message; every
/// other variant is reported with the generic per-operation message.
#[derive(Debug, Error)]
pub enum CartError {
    /// Catalog API lookup failed.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Durable storage read or write failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Cart snapshot serialization failed.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Requested quantity exceeds the available stock.
    #[error("requested quantity exceeds stock for product {0}")]
    OutOfStock(ProductId),

    /// The product is not in the cart.
    #[error("product {0} is not in the cart")]
    NotInCart(ProductId),

    /// Requested quantity is zero or negative.
    #[error("invalid quantity {0}")]
    InvalidAmount(i32),
}

impl CartError {
    /// Map this error to the message reported to the user.
    ///
    /// The out-of-stock rejection keeps its specific message; everything
    /// else collapses to the generic message for the failed operation.
    #[must_use]
    pub const fn user_message(&self, operation_message: &'static str) -> &'static str {
        match self {
            Self::OutOfStock(_) => MSG_OUT_OF_STOCK,
            _ => operation_message,
        }
    }
}
