//! Product identity tracker.
//!
//! Storefront product identifiers are only stable within the catalog view
//! that produced them, so every product surfaced by a search is recorded
//! here with the query that produced it. When an identifier later fails to
//! resolve, the recorded query is re-run once and the recorded name drives
//! a substring fallback. Entries are never evicted for the life of the
//! process.

use std::collections::HashMap;
use std::sync::Mutex;

use kirana_core::models::Product;

#[derive(Debug, Clone)]
pub struct KnownProduct {
    pub source_query: String,
    pub name: String,
}

#[derive(Debug, Default)]
pub struct KnownProducts {
    inner: Mutex<HashMap<String, KnownProduct>>,
}

impl KnownProducts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every product of a search result against its query.
    /// Re-seeing an identifier refreshes its entry.
    pub fn record(&self, query: &str, products: &[Product]) {
        let mut map = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        for product in products {
            map.insert(
                product.id.clone(),
                KnownProduct {
                    source_query: query.to_owned(),
                    name: product.name.clone(),
                },
            );
        }
    }

    #[must_use]
    pub fn lookup(&self, product_id: &str) -> Option<KnownProduct> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(product_id)
            .cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, name: &str) -> Product {
        Product {
            id: id.to_owned(),
            name: name.to_owned(),
            price: 1.0,
            original_price: None,
            in_stock: true,
            brand: None,
            category: None,
            unit: None,
            max_quantity: None,
        }
    }

    #[test]
    fn records_and_resolves_by_identifier() {
        let tracker = KnownProducts::new();
        tracker.record("milk", &[product("381406", "Amul Taaza")]);
        let known = tracker.lookup("381406").expect("recorded");
        assert_eq!(known.source_query, "milk");
        assert_eq!(known.name, "Amul Taaza");
        assert!(tracker.lookup("missing").is_none());
    }

    #[test]
    fn reseeing_an_id_refreshes_the_entry() {
        let tracker = KnownProducts::new();
        tracker.record("milk", &[product("1", "Amul Taaza")]);
        tracker.record("toned milk", &[product("1", "Amul Taaza 500ml")]);
        let known = tracker.lookup("1").expect("still recorded");
        assert_eq!(known.source_query, "toned milk");
        assert_eq!(tracker.len(), 1);
    }
}
