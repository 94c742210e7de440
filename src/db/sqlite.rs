// SqliteDatabase: rusqlite backend implementing the Database trait.
//
// The Connection is wrapped in tokio::sync::Mutex because Connection is !Sync.
// Trait methods lock the mutex, do synchronous rusqlite work, and return.
// The lock is never held across .await points.

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::models::{AnalysisRecord, NewProduct, Product};
use super::traits::Database;
use crate::verdict::Direction;

pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    /// Wrap an already-opened rusqlite Connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn table_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::schema::table_count(&conn)
    }

    async fn insert_product(&self, product: &NewProduct) -> Result<Product> {
        let conn = self.conn.lock().await;
        super::queries::insert_product(&conn, product)
    }

    async fn get_product_by_api_key(&self, api_key: &str) -> Result<Option<Product>> {
        let conn = self.conn.lock().await;
        super::queries::get_product_by_api_key(&conn, api_key)
    }

    async fn append_result(&self, direction: Direction, record: &AnalysisRecord) -> Result<()> {
        let conn = self.conn.lock().await;
        super::queries::append_result(&conn, direction, record)
    }

    async fn get_result(
        &self,
        direction: Direction,
        correlation_id: Uuid,
    ) -> Result<Option<AnalysisRecord>> {
        let conn = self.conn.lock().await;
        super::queries::get_result(&conn, direction, correlation_id)
    }
}
