//! Product catalog (read-only)
//!
//! The host supplies the active products of an establishment; the floor
//! engine keeps a [`CatalogSnapshot`] and copies prices into order lines at
//! add time, so a later refresh never changes what was already staged.

use std::collections::BTreeMap;

use async_trait::async_trait;
use shared::models::Product;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

#[async_trait]
pub trait Catalog: Send + Sync {
    async fn list_active_products(&self, establishment_id: &str) -> CatalogResult<Vec<Product>>;
}

/// Fixed product list, handy for tests and kiosk setups without a backend
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    products: Vec<Product>,
}

impl StaticCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }
}

#[async_trait]
impl Catalog for StaticCatalog {
    async fn list_active_products(&self, _establishment_id: &str) -> CatalogResult<Vec<Product>> {
        Ok(self.products.clone())
    }
}

/// Products fetched at one point in time
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    products: Vec<Product>,
}

impl CatalogSnapshot {
    pub async fn fetch(catalog: &dyn Catalog, establishment_id: &str) -> CatalogResult<Self> {
        let products = catalog.list_active_products(establishment_id).await?;
        tracing::debug!(establishment_id, count = products.len(), "Catalog snapshot fetched");
        Ok(Self { products })
    }

    pub fn from_products(products: Vec<Product>) -> Self {
        Self { products }
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn get(&self, product_id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == product_id)
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Products grouped by category, categories in name order
    pub fn by_category(&self) -> BTreeMap<&str, Vec<&Product>> {
        let mut groups: BTreeMap<&str, Vec<&Product>> = BTreeMap::new();
        for product in &self.products {
            groups.entry(product.category.as_str()).or_default().push(product);
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn menu() -> StaticCatalog {
        StaticCatalog::new(vec![
            Product::new("p-1", "Mojito", Decimal::new(800, 2)).with_category("Cocktails"),
            Product::new("p-2", "Beer", Decimal::new(500, 2)).with_category("Beer"),
            Product::new("p-3", "Margarita", Decimal::new(900, 2)).with_category("Cocktails"),
        ])
    }

    #[tokio::test]
    async fn test_snapshot_lookup() {
        let snapshot = CatalogSnapshot::fetch(&menu(), "est-1").await.unwrap();
        assert_eq!(snapshot.products().len(), 3);
        assert_eq!(snapshot.get("p-2").unwrap().name, "Beer");
        assert!(snapshot.get("p-9").is_none());
    }

    #[tokio::test]
    async fn test_grouped_by_category() {
        let snapshot = CatalogSnapshot::fetch(&menu(), "est-1").await.unwrap();
        let groups = snapshot.by_category();
        let names: Vec<_> = groups.keys().copied().collect();
        assert_eq!(names, vec!["Beer", "Cocktails"]);
        assert_eq!(groups["Cocktails"].len(), 2);
    }
}
