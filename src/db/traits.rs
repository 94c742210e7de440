// Database trait: backend-agnostic async interface for product records and
// the analysis result sink.
//
// Implementors: SqliteDatabase (wraps rusqlite), MemoryDatabase (tests and
// runs without a database file). Result writes are append-only; the core
// never reads results back except through `get_result`.

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use super::models::{AnalysisRecord, NewProduct, Product};
use crate::verdict::Direction;

#[async_trait]
pub trait Database: Send + Sync {
    // --- Lifecycle ---

    /// Count the user-created tables in the database. In-memory backends
    /// report their logical stores.
    async fn table_count(&self) -> Result<i64>;

    // --- Products ---

    /// Store a new product and return it with its generated id.
    async fn insert_product(&self, product: &NewProduct) -> Result<Product>;

    /// Resolve a plaintext api key to its product.
    async fn get_product_by_api_key(&self, api_key: &str) -> Result<Option<Product>>;

    // --- Analysis results ---

    /// Append one analysis outcome to the request or response table.
    async fn append_result(&self, direction: Direction, record: &AnalysisRecord) -> Result<()>;

    /// Read a stored outcome by correlation id.
    async fn get_result(
        &self,
        direction: Direction,
        correlation_id: Uuid,
    ) -> Result<Option<AnalysisRecord>>;
}
