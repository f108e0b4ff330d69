//! RocketShoes cart library.
//!
//! Client-side cart state management for the RocketShoes storefront:
//! adding items, removing items, adjusting quantities, and persisting the
//! cart across sessions, with stock-level validation against the catalog
//! API.
//!
//! # Architecture
//!
//! The cart is a single explicit store object, [`store::CartStore`], with
//! its collaborators injected at construction:
//!
//! - [`catalog::ProductCatalog`] - product detail and stock lookups
//! - [`storage::CartStorage`] - the durable key-value slot the cart is
//!   mirrored to after every successful mutation (write-through)
//! - [`notify::NotificationSink`] - user-visible error messages
//!
//! Every failure is absorbed at the operation boundary and reported through
//! the notification sink; callers never receive an error value.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use rocket_shoes_cart::catalog::CatalogClient;
//! use rocket_shoes_cart::config::CartConfig;
//! use rocket_shoes_cart::notify::TracingNotifier;
//! use rocket_shoes_cart::storage::FileStorage;
//! use rocket_shoes_cart::store::CartStore;
//! use rocket_shoes_core::ProductId;
//!
//! let config = CartConfig::from_env()?;
//! let store = CartStore::new(
//!     Arc::new(CatalogClient::new(&config)),
//!     Arc::new(FileStorage::new(config.storage_path.clone())),
//!     Arc::new(TracingNotifier),
//! );
//!
//! store.add_product(ProductId::new(1)).await;
//! let cart = store.cart();
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod error;
pub mod notify;
pub mod storage;
pub mod store;
