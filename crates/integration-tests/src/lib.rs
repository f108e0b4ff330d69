//! Integration tests for the RocketShoes cart.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p rocket-shoes-integration-tests
//! ```
//!
//! The tests exercise [`rocket_shoes_cart::store::CartStore`] end to end
//! over in-process fakes: a scripted catalog, an in-memory storage slot,
//! and a recording notification sink. No network or filesystem access.
//!
//! This crate's library provides the shared fixtures; the scenarios live
//! under `tests/`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rocket_shoes_cart::catalog::{CatalogError, Product, ProductCatalog, StockRecord};
use rocket_shoes_cart::notify::NotificationSink;
use rocket_shoes_cart::storage::{CART_STORAGE_KEY, CartStorage, MemoryStorage};
use rocket_shoes_cart::store::{CartStore, LineItem};
use rocket_shoes_core::ProductId;

/// Catalog fake with scripted products and stock levels.
///
/// Tracks how many stock reads were issued so tests can assert which
/// operations consult the catalog.
#[derive(Default)]
pub struct FakeCatalog {
    products: HashMap<i32, Product>,
    stock: HashMap<i32, u32>,
    fail_all: bool,
    product_reads: AtomicUsize,
    stock_reads: AtomicUsize,
}

impl FakeCatalog {
    /// Script a product with the given stock level.
    #[must_use]
    pub fn with_product(mut self, id: i32, title: &str, price: &str, stock: u32) -> Self {
        self.products.insert(
            id,
            Product {
                id: ProductId::new(id),
                title: title.to_owned(),
                price: price.parse().expect("valid decimal literal"),
                image: format!("https://cdn.test/{id}.jpg"),
            },
        );
        self.stock.insert(id, stock);
        self
    }

    /// A catalog whose every request fails, simulating an API outage.
    #[must_use]
    pub fn unreachable() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    /// Number of `GET /products/{id}` requests issued.
    pub fn product_reads(&self) -> usize {
        self.product_reads.load(Ordering::SeqCst)
    }

    /// Number of `GET /stock/{id}` requests issued.
    pub fn stock_reads(&self) -> usize {
        self.stock_reads.load(Ordering::SeqCst)
    }

    fn outage() -> CatalogError {
        CatalogError::Status(reqwest::StatusCode::INTERNAL_SERVER_ERROR)
    }
}

#[async_trait]
impl ProductCatalog for FakeCatalog {
    async fn product(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.product_reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_all {
            return Err(Self::outage());
        }
        self.products
            .get(&id.as_i32())
            .cloned()
            .ok_or(CatalogError::NotFound(id))
    }

    async fn stock(&self, id: ProductId) -> Result<StockRecord, CatalogError> {
        self.stock_reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_all {
            return Err(Self::outage());
        }
        self.stock
            .get(&id.as_i32())
            .map(|&amount| StockRecord { id, amount })
            .ok_or(CatalogError::NotFound(id))
    }
}

/// Notification sink that records every message it receives.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    /// All messages reported so far, in order.
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl NotificationSink for RecordingNotifier {
    fn error(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(message.to_owned());
    }
}

/// A cart store wired to fakes, with handles to observe every collaborator.
pub struct TestContext {
    pub catalog: Arc<FakeCatalog>,
    pub storage: Arc<MemoryStorage>,
    pub notifier: Arc<RecordingNotifier>,
    pub store: CartStore,
}

impl TestContext {
    /// Build a context over the given catalog and an empty storage slot.
    #[must_use]
    pub fn new(catalog: FakeCatalog) -> Self {
        Self::with_storage(catalog, MemoryStorage::new())
    }

    /// Build a context over the given catalog and a pre-seeded storage.
    #[must_use]
    pub fn with_storage(catalog: FakeCatalog, storage: MemoryStorage) -> Self {
        let catalog = Arc::new(catalog);
        let storage = Arc::new(storage);
        let notifier = Arc::new(RecordingNotifier::default());
        let store = CartStore::new(catalog.clone(), storage.clone(), notifier.clone());
        Self {
            catalog,
            storage,
            notifier,
            store,
        }
    }

    /// Deserialize the persisted cart snapshot.
    ///
    /// # Panics
    ///
    /// Panics when no snapshot has been written or it fails to parse.
    #[must_use]
    pub fn persisted_cart(&self) -> Vec<LineItem> {
        let snapshot = self
            .storage
            .load(CART_STORAGE_KEY)
            .expect("storage readable")
            .expect("snapshot present");
        serde_json::from_str(&snapshot).expect("well-formed snapshot")
    }
}
