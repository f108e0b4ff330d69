//! Cart store.
//!
//! [`CartStore`] holds the ordered cart line items in memory, exposes the
//! three mutation operations, and mirrors every successful mutation to the
//! durable storage slot so the cart survives a session restart.
//!
//! Failures never cross the operation boundary: each public operation
//! resolves to either a committed mutation or a no-op with a notification.
//! Callers observe failures only through the notification sink.
//!
//! Concurrent operations are not serialized. The remote reads happen
//! outside the cart lock, so two racing `add_product` calls for the same
//! id can both observe pre-increment state and both commit. Only the
//! in-memory mutation and its write-through are atomic with respect to
//! each other.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rocket_shoes_core::{CurrencyCode, Price, ProductId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};

use crate::catalog::{Product, ProductCatalog};
use crate::error::{CartError, MSG_ADD_FAILED, MSG_REMOVE_FAILED, MSG_UPDATE_FAILED};
use crate::notify::NotificationSink;
use crate::storage::{CART_STORAGE_KEY, CartStorage};

/// One product entry in the cart with a quantity.
///
/// The product fields are carried verbatim from the catalog payload;
/// `amount` is always at least 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: ProductId,
    pub title: String,
    pub price: Decimal,
    pub image: String,
    pub amount: u32,
}

impl LineItem {
    /// Line subtotal (`price * amount`).
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.price * Decimal::from(self.amount)
    }
}

impl From<Product> for LineItem {
    /// A product enters the cart with a quantity of 1.
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            title: product.title,
            price: product.price,
            image: product.image,
            amount: 1,
        }
    }
}

/// Client-side cart state with write-through persistence.
///
/// Constructed once per session. Seeds itself from the durable snapshot
/// when one is present; a malformed snapshot is logged and replaced by the
/// empty cart.
pub struct CartStore {
    catalog: Arc<dyn ProductCatalog>,
    storage: Arc<dyn CartStorage>,
    notifier: Arc<dyn NotificationSink>,
    cart: Mutex<Vec<LineItem>>,
}

impl CartStore {
    /// Create a cart store, seeding the cart from durable storage.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn ProductCatalog>,
        storage: Arc<dyn CartStorage>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        let cart = seed_cart(storage.as_ref());
        Self {
            catalog,
            storage,
            notifier,
            cart: Mutex::new(cart),
        }
    }

    /// Read-only snapshot of the cart in insertion order.
    #[must_use]
    pub fn cart(&self) -> Vec<LineItem> {
        self.lock_cart().clone()
    }

    /// Cart subtotal across all line items.
    #[must_use]
    pub fn total(&self) -> Price {
        let amount = self.lock_cart().iter().map(LineItem::subtotal).sum();
        Price::new(amount, CurrencyCode::USD)
    }

    /// Total number of units across all line items.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lock_cart().iter().map(|item| item.amount).sum()
    }

    /// Add one unit of a product to the cart.
    ///
    /// A product not yet in the cart is appended with a quantity of 1.
    /// An existing line is incremented only while the new quantity stays
    /// within the stock level observed now; otherwise the cart is left
    /// unchanged and an out-of-stock message is reported.
    #[instrument(skip(self))]
    pub async fn add_product(&self, product_id: ProductId) {
        if let Err(err) = self.try_add_product(product_id).await {
            self.report(&err, MSG_ADD_FAILED);
        }
    }

    /// Remove a product's line from the cart.
    ///
    /// Removing a product that is not in the cart is a failure and is
    /// reported; the cart is left unchanged.
    #[instrument(skip(self))]
    pub fn remove_product(&self, product_id: ProductId) {
        if let Err(err) = self.try_remove_product(product_id) {
            self.report(&err, MSG_REMOVE_FAILED);
        }
    }

    /// Set a product's quantity to `amount`.
    ///
    /// A non-positive `amount` is rejected without consulting the catalog.
    /// An `amount` above the stock level observed now is reported as out of
    /// stock and leaves the cart unchanged. Updating a product that is not
    /// in the cart is a silent no-op (the snapshot is still rewritten).
    #[instrument(skip(self))]
    pub async fn update_product_amount(&self, product_id: ProductId, amount: i32) {
        if let Err(err) = self.try_update_product_amount(product_id, amount).await {
            self.report(&err, MSG_UPDATE_FAILED);
        }
    }

    async fn try_add_product(&self, product_id: ProductId) -> Result<(), CartError> {
        // Two independent reads, both before the cart lock is taken.
        let product = self.catalog.product(product_id).await?;
        let stock = self.catalog.stock(product_id).await?;

        let mut cart = self.lock_cart();
        let next = match cart.iter().find(|item| item.id == product_id) {
            None => {
                let mut next = cart.clone();
                next.push(LineItem::from(product));
                next
            }
            Some(existing) => {
                // Compare before incrementing so a line already at
                // u32::MAX rejects instead of overflowing.
                if existing.amount >= stock.amount {
                    return Err(CartError::OutOfStock(product_id));
                }
                with_amount(&cart, product_id, existing.amount + 1)
            }
        };
        self.commit(&mut cart, next)
    }

    fn try_remove_product(&self, product_id: ProductId) -> Result<(), CartError> {
        let mut cart = self.lock_cart();
        if !cart.iter().any(|item| item.id == product_id) {
            return Err(CartError::NotInCart(product_id));
        }
        let next = cart
            .iter()
            .filter(|item| item.id != product_id)
            .cloned()
            .collect();
        self.commit(&mut cart, next)
    }

    async fn try_update_product_amount(
        &self,
        product_id: ProductId,
        amount: i32,
    ) -> Result<(), CartError> {
        let requested =
            u32::try_from(amount).map_err(|_| CartError::InvalidAmount(amount))?;
        if requested == 0 {
            return Err(CartError::InvalidAmount(amount));
        }

        let stock = self.catalog.stock(product_id).await?;
        if requested > stock.amount {
            return Err(CartError::OutOfStock(product_id));
        }

        let mut cart = self.lock_cart();
        let next = with_amount(&cart, product_id, requested);
        self.commit(&mut cart, next)
    }

    /// Persist `next` and swap it in. The write-through happens before the
    /// in-memory replacement so a failed write leaves the cart unchanged.
    fn commit(
        &self,
        cart: &mut MutexGuard<'_, Vec<LineItem>>,
        next: Vec<LineItem>,
    ) -> Result<(), CartError> {
        let snapshot = serde_json::to_string(&next)?;
        self.storage.store(CART_STORAGE_KEY, &snapshot)?;
        **cart = next;
        Ok(())
    }

    fn report(&self, err: &CartError, operation_message: &'static str) {
        match err {
            CartError::OutOfStock(_) | CartError::NotInCart(_) | CartError::InvalidAmount(_) => {
                debug!(error = %err, "cart operation rejected");
            }
            _ => {
                error!(error = %err, "cart operation failed");
            }
        }
        self.notifier.error(err.user_message(operation_message));
    }

    fn lock_cart(&self) -> MutexGuard<'_, Vec<LineItem>> {
        self.cart.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// New cart sequence with the matching line's amount replaced.
///
/// Returns an identical sequence when `product_id` is absent.
fn with_amount(cart: &[LineItem], product_id: ProductId, amount: u32) -> Vec<LineItem> {
    cart.iter()
        .map(|item| {
            if item.id == product_id {
                LineItem {
                    amount,
                    ..item.clone()
                }
            } else {
                item.clone()
            }
        })
        .collect()
}

/// Deserialize the durable snapshot, falling back to the empty cart.
fn seed_cart(storage: &dyn CartStorage) -> Vec<LineItem> {
    match storage.load(CART_STORAGE_KEY) {
        Ok(Some(snapshot)) => match serde_json::from_str(&snapshot) {
            Ok(cart) => cart,
            Err(err) => {
                warn!(error = %err, "malformed cart snapshot, starting with an empty cart");
                Vec::new()
            }
        },
        Ok(None) => Vec::new(),
        Err(err) => {
            warn!(error = %err, "failed to read cart snapshot, starting with an empty cart");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::catalog::{CatalogError, StockRecord};
    use crate::error::MSG_OUT_OF_STOCK;
    use crate::storage::{MemoryStorage, StorageError};

    /// Catalog fake with scripted products and stock levels.
    #[derive(Default)]
    struct FakeCatalog {
        products: HashMap<i32, Product>,
        stock: HashMap<i32, u32>,
        fail: bool,
        stock_reads: AtomicUsize,
    }

    impl FakeCatalog {
        fn with_product(mut self, id: i32, title: &str, price: &str, stock: u32) -> Self {
            self.products.insert(
                id,
                Product {
                    id: ProductId::new(id),
                    title: title.to_owned(),
                    price: price.parse().unwrap(),
                    image: format!("https://cdn.test/{id}.jpg"),
                },
            );
            self.stock.insert(id, stock);
            self
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl ProductCatalog for FakeCatalog {
        async fn product(&self, id: ProductId) -> Result<Product, CatalogError> {
            if self.fail {
                return Err(CatalogError::Status(
                    reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                ));
            }
            self.products
                .get(&id.as_i32())
                .cloned()
                .ok_or(CatalogError::NotFound(id))
        }

        async fn stock(&self, id: ProductId) -> Result<StockRecord, CatalogError> {
            self.stock_reads.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CatalogError::Status(
                    reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                ));
            }
            self.stock
                .get(&id.as_i32())
                .map(|&amount| StockRecord { id, amount })
                .ok_or(CatalogError::NotFound(id))
        }
    }

    /// Notification sink that records every message it receives.
    #[derive(Default)]
    struct RecordingNotifier {
        messages: Mutex<Vec<String>>,
    }

    impl RecordingNotifier {
        fn messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }
    }

    impl NotificationSink for RecordingNotifier {
        fn error(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_owned());
        }
    }

    /// Storage whose writes always fail.
    struct BrokenStorage;

    impl CartStorage for BrokenStorage {
        fn load(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Ok(None)
        }

        fn store(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Io(std::io::Error::other("disk full")))
        }
    }

    struct Fixture {
        catalog: Arc<FakeCatalog>,
        storage: Arc<MemoryStorage>,
        notifier: Arc<RecordingNotifier>,
        store: CartStore,
    }

    fn fixture(catalog: FakeCatalog) -> Fixture {
        fixture_with_storage(catalog, MemoryStorage::new())
    }

    fn fixture_with_storage(catalog: FakeCatalog, storage: MemoryStorage) -> Fixture {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let catalog = Arc::new(catalog);
        let storage = Arc::new(storage);
        let notifier = Arc::new(RecordingNotifier::default());
        let store = CartStore::new(catalog.clone(), storage.clone(), notifier.clone());
        Fixture {
            catalog,
            storage,
            notifier,
            store,
        }
    }

    fn persisted_cart(storage: &MemoryStorage) -> Vec<LineItem> {
        let snapshot = storage.load(CART_STORAGE_KEY).unwrap().unwrap();
        serde_json::from_str(&snapshot).unwrap()
    }

    #[tokio::test]
    async fn test_add_new_product_appends_with_amount_one() {
        let f = fixture(FakeCatalog::default().with_product(1, "Tenis Leve", "179.9", 5));

        f.store.add_product(ProductId::new(1)).await;

        let cart = f.store.cart();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart[0].id, ProductId::new(1));
        assert_eq!(cart[0].amount, 1);
        assert_eq!(cart[0].title, "Tenis Leve");
        assert!(f.notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_add_existing_product_increments() {
        let f = fixture(FakeCatalog::default().with_product(1, "Tenis Leve", "179.9", 5));

        f.store.add_product(ProductId::new(1)).await;
        f.store.add_product(ProductId::new(1)).await;

        let cart = f.store.cart();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart[0].amount, 2);
    }

    #[tokio::test]
    async fn test_add_at_stock_limit_rejects_with_one_notification() {
        let f = fixture(FakeCatalog::default().with_product(1, "Tenis Leve", "179.9", 1));

        f.store.add_product(ProductId::new(1)).await;
        let before = f.store.cart();

        f.store.add_product(ProductId::new(1)).await;

        assert_eq!(f.store.cart(), before);
        assert_eq!(f.notifier.messages(), vec![MSG_OUT_OF_STOCK.to_owned()]);
    }

    #[tokio::test]
    async fn test_add_remote_failure_notifies_and_leaves_cart_unchanged() {
        let f = fixture(FakeCatalog::failing());

        f.store.add_product(ProductId::new(1)).await;

        assert!(f.store.cart().is_empty());
        assert_eq!(f.notifier.messages(), vec![MSG_ADD_FAILED.to_owned()]);
    }

    #[tokio::test]
    async fn test_add_persist_failure_leaves_cart_unchanged() {
        let catalog = Arc::new(FakeCatalog::default().with_product(1, "Tenis", "10.0", 5));
        let notifier = Arc::new(RecordingNotifier::default());
        let store = CartStore::new(catalog, Arc::new(BrokenStorage), notifier.clone());

        store.add_product(ProductId::new(1)).await;

        assert!(store.cart().is_empty());
        assert_eq!(notifier.messages(), vec![MSG_ADD_FAILED.to_owned()]);
    }

    #[tokio::test]
    async fn test_remove_existing_product() {
        let f = fixture(FakeCatalog::default().with_product(2, "Tenis VR", "139.9", 3));

        f.store.add_product(ProductId::new(2)).await;
        f.store.remove_product(ProductId::new(2));

        assert!(f.store.cart().is_empty());
        assert!(f.notifier.messages().is_empty());
        assert!(persisted_cart(&f.storage).is_empty());
    }

    #[tokio::test]
    async fn test_remove_missing_product_notifies() {
        let f = fixture(FakeCatalog::default());

        f.store.remove_product(ProductId::new(9));

        assert_eq!(f.notifier.messages(), vec![MSG_REMOVE_FAILED.to_owned()]);
    }

    #[tokio::test]
    async fn test_update_sets_amount() {
        let f = fixture(FakeCatalog::default().with_product(3, "Tenis Adapto", "219.9", 4));

        f.store.add_product(ProductId::new(3)).await;
        f.store.update_product_amount(ProductId::new(3), 4).await;

        assert_eq!(f.store.cart()[0].amount, 4);
        assert_eq!(persisted_cart(&f.storage)[0].amount, 4);
    }

    #[tokio::test]
    async fn test_update_above_stock_is_notified_noop() {
        let f = fixture(FakeCatalog::default().with_product(3, "Tenis Adapto", "219.9", 4));

        f.store.add_product(ProductId::new(3)).await;
        f.store.add_product(ProductId::new(3)).await;
        let before = f.store.cart();

        f.store.update_product_amount(ProductId::new(3), 10).await;

        assert_eq!(f.store.cart(), before);
        assert_eq!(
            f.notifier.messages(),
            vec![MSG_OUT_OF_STOCK.to_owned()]
        );
    }

    #[tokio::test]
    async fn test_update_non_positive_amount_skips_remote_read() {
        let f = fixture(FakeCatalog::default().with_product(3, "Tenis Adapto", "219.9", 4));

        f.store.update_product_amount(ProductId::new(3), 0).await;
        f.store.update_product_amount(ProductId::new(3), -2).await;

        assert_eq!(f.catalog.stock_reads.load(Ordering::SeqCst), 0);
        assert_eq!(
            f.notifier.messages(),
            vec![MSG_UPDATE_FAILED.to_owned(), MSG_UPDATE_FAILED.to_owned()]
        );
    }

    #[tokio::test]
    async fn test_update_absent_product_is_silent_noop() {
        let f = fixture(FakeCatalog::default().with_product(3, "Tenis Adapto", "219.9", 4));

        f.store.update_product_amount(ProductId::new(3), 2).await;

        assert!(f.store.cart().is_empty());
        assert!(f.notifier.messages().is_empty());
        // Write-through still happens, mirroring the unchanged cart.
        assert!(persisted_cart(&f.storage).is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_matches_memory_after_every_mutation() {
        let f = fixture(
            FakeCatalog::default()
                .with_product(1, "Tenis Leve", "179.9", 5)
                .with_product(2, "Tenis VR", "139.9", 5),
        );

        f.store.add_product(ProductId::new(1)).await;
        assert_eq!(persisted_cart(&f.storage), f.store.cart());

        f.store.add_product(ProductId::new(2)).await;
        assert_eq!(persisted_cart(&f.storage), f.store.cart());

        f.store.update_product_amount(ProductId::new(1), 3).await;
        assert_eq!(persisted_cart(&f.storage), f.store.cart());

        f.store.remove_product(ProductId::new(2));
        assert_eq!(persisted_cart(&f.storage), f.store.cart());
    }

    #[tokio::test]
    async fn test_seeds_from_durable_snapshot() {
        let seeded = vec![LineItem {
            id: ProductId::new(1),
            title: "Tenis Leve".to_owned(),
            price: "179.9".parse().unwrap(),
            image: "https://cdn.test/1.jpg".to_owned(),
            amount: 2,
        }];
        let storage =
            MemoryStorage::with_slot(CART_STORAGE_KEY, &serde_json::to_string(&seeded).unwrap());

        let f = fixture_with_storage(FakeCatalog::default(), storage);

        assert_eq!(f.store.cart(), seeded);
    }

    #[tokio::test]
    async fn test_malformed_snapshot_seeds_empty_cart() {
        let storage = MemoryStorage::with_slot(CART_STORAGE_KEY, "{not json");

        let f = fixture_with_storage(FakeCatalog::default(), storage);

        assert!(f.store.cart().is_empty());
        assert!(f.notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_total_and_item_count() {
        let f = fixture(
            FakeCatalog::default()
                .with_product(1, "Tenis Leve", "100.00", 5)
                .with_product(2, "Tenis VR", "50.00", 5),
        );

        f.store.add_product(ProductId::new(1)).await;
        f.store.add_product(ProductId::new(1)).await;
        f.store.add_product(ProductId::new(2)).await;

        assert_eq!(f.store.item_count(), 3);
        assert_eq!(f.store.total().display(), "$250.00");
    }
}
