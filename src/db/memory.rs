// MemoryDatabase: in-process Database implementation.
//
// Used by tests and by local `check` runs that should not touch a database
// file. Same contract as the SQLite backend: api keys are matched by digest,
// results are append-only.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::models::{hash_api_key, AnalysisRecord, NewProduct, Product};
use super::traits::Database;
use crate::verdict::Direction;

/// Logical stores kept here: products, request results, response results.
const STORE_COUNT: i64 = 3;

#[derive(Default)]
struct Tables {
    /// api key digest → product
    products: HashMap<String, Product>,
    results: Vec<(Direction, AnalysisRecord)>,
}

#[derive(Default)]
pub struct MemoryDatabase {
    tables: Mutex<Tables>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of results appended so far, across both directions.
    pub async fn result_count(&self) -> usize {
        self.tables.lock().await.results.len()
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn table_count(&self) -> Result<i64> {
        Ok(STORE_COUNT)
    }

    async fn insert_product(&self, product: &NewProduct) -> Result<Product> {
        let created = Product {
            product_id: Uuid::new_v4(),
            product_name: product.product_name.clone(),
            mode: product.mode,
        };
        let mut tables = self.tables.lock().await;
        let key = hash_api_key(&product.api_key);
        if tables.products.contains_key(&key) {
            anyhow::bail!("Duplicate api key for product {}", product.product_name);
        }
        tables.products.insert(key, created.clone());
        Ok(created)
    }

    async fn get_product_by_api_key(&self, api_key: &str) -> Result<Option<Product>> {
        let tables = self.tables.lock().await;
        Ok(tables.products.get(&hash_api_key(api_key)).cloned())
    }

    async fn append_result(&self, direction: Direction, record: &AnalysisRecord) -> Result<()> {
        self.tables
            .lock()
            .await
            .results
            .push((direction, record.clone()));
        Ok(())
    }

    async fn get_result(
        &self,
        direction: Direction,
        correlation_id: Uuid,
    ) -> Result<Option<AnalysisRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .results
            .iter()
            .rev()
            .find(|(d, r)| *d == direction && r.correlation_id == correlation_id)
            .map(|(_, r)| r.clone()))
    }
}
