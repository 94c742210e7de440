// Database queries: CRUD operations for all tables.
//
// Every SQL statement lives here so the rest of the crate works with the
// structs in models.rs.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::models::{hash_api_key, AnalysisRecord, NewProduct, Product, ProductMode};
use crate::verdict::Direction;

// --- Products ---

/// Insert a product, storing only the digest of its api key.
pub fn insert_product(conn: &Connection, product: &NewProduct) -> Result<Product> {
    let product_id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO products (product_id, product_name, api_key_hash, mode)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            product_id.to_string(),
            product.product_name,
            hash_api_key(&product.api_key),
            product.mode.as_str(),
        ],
    )
    .with_context(|| format!("Failed to insert product {}", product.product_name))?;

    Ok(Product {
        product_id,
        product_name: product.product_name.clone(),
        mode: product.mode,
    })
}

/// Look up a product by plaintext api key.
pub fn get_product_by_api_key(conn: &Connection, api_key: &str) -> Result<Option<Product>> {
    let mut stmt = conn.prepare(
        "SELECT product_id, product_name, mode FROM products WHERE api_key_hash = ?1",
    )?;
    let row = stmt
        .query_row(params![hash_api_key(api_key)], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })
        .optional()?;

    row.map(|(id, product_name, mode)| {
        Ok(Product {
            product_id: Uuid::parse_str(&id)
                .with_context(|| format!("Corrupt product id in database: {id}"))?,
            product_name,
            mode: mode.parse::<ProductMode>()?,
        })
    })
    .transpose()
}

// --- Analysis results ---

/// Table and correlation-id column for each direction.
fn result_table(direction: Direction) -> (&'static str, &'static str) {
    match direction {
        Direction::Input => ("request_analysis_results", "request_id"),
        Direction::Output => ("response_analysis_results", "response_id"),
    }
}

/// Append one analysis outcome.
pub fn append_result(conn: &Connection, direction: Direction, record: &AnalysisRecord) -> Result<()> {
    let (table, id_column) = result_table(direction);
    let reasons_json = record
        .reasons
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    conn.execute(
        &format!(
            "INSERT INTO {table} (result_id, {id_column}, analyzer_name, metric, reject_flg, reasons, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
        ),
        params![
            record.result_id.to_string(),
            record.correlation_id.to_string(),
            record.analyzer_name,
            record.metric,
            record.reject_flg,
            reasons_json,
            record.created_at,
        ],
    )
    .with_context(|| format!("Failed to append result to {table}"))?;
    Ok(())
}

/// Most recent outcome stored for `correlation_id`.
pub fn get_result(
    conn: &Connection,
    direction: Direction,
    correlation_id: Uuid,
) -> Result<Option<AnalysisRecord>> {
    let (table, id_column) = result_table(direction);
    let mut stmt = conn.prepare(&format!(
        "SELECT result_id, {id_column}, analyzer_name, metric, reject_flg, reasons, created_at
         FROM {table} WHERE {id_column} = ?1
         ORDER BY created_at DESC LIMIT 1"
    ))?;

    let raw = stmt
        .query_row(params![correlation_id.to_string()], raw_result_row)
        .optional()?;

    raw.map(RawResultRow::into_record).transpose()
}

/// Column values as stored, before UUID / JSON decoding.
struct RawResultRow {
    result_id: String,
    correlation_id: String,
    analyzer_name: String,
    metric: f64,
    reject_flg: bool,
    reasons: Option<String>,
    created_at: String,
}

fn raw_result_row(row: &Row<'_>) -> rusqlite::Result<RawResultRow> {
    Ok(RawResultRow {
        result_id: row.get(0)?,
        correlation_id: row.get(1)?,
        analyzer_name: row.get(2)?,
        metric: row.get(3)?,
        reject_flg: row.get(4)?,
        reasons: row.get(5)?,
        created_at: row.get(6)?,
    })
}

impl RawResultRow {
    fn into_record(self) -> Result<AnalysisRecord> {
        Ok(AnalysisRecord {
            result_id: Uuid::parse_str(&self.result_id)?,
            correlation_id: Uuid::parse_str(&self.correlation_id)?,
            analyzer_name: self.analyzer_name,
            metric: self.metric,
            reject_flg: self.reject_flg,
            reasons: self
                .reasons
                .as_deref()
                .map(serde_json::from_str)
                .transpose()
                .context("Corrupt reasons JSON in database")?,
            created_at: self.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::create_tables;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        conn
    }

    fn record(correlation_id: Uuid, reasons: Option<Vec<String>>) -> AnalysisRecord {
        AnalysisRecord {
            result_id: Uuid::new_v4(),
            correlation_id,
            analyzer_name: "toxicity".to_string(),
            metric: 0.905,
            reject_flg: true,
            reasons,
            created_at: "2026-01-01T00:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_product_lookup_by_key() {
        let conn = test_conn();
        let new = NewProduct::new("chatbot", ProductMode::Sync);
        let product = insert_product(&conn, &new).unwrap();

        let found = get_product_by_api_key(&conn, &new.api_key).unwrap().unwrap();
        assert_eq!(found, product);
        assert!(get_product_by_api_key(&conn, "wrong").unwrap().is_none());
    }

    #[test]
    fn test_api_key_not_stored_in_plaintext() {
        let conn = test_conn();
        let new = NewProduct::new("chatbot", ProductMode::Async);
        insert_product(&conn, &new).unwrap();
        let stored: String = conn
            .query_row("SELECT api_key_hash FROM products", [], |row| row.get(0))
            .unwrap();
        assert_ne!(stored, new.api_key);
    }

    #[test]
    fn test_result_roundtrip_with_reasons() {
        let conn = test_conn();
        let id = Uuid::new_v4();
        let rec = record(
            id,
            Some(vec![r#"{"start":8,"stop":14,"additional_metric":0.905}"#.to_string()]),
        );
        append_result(&conn, Direction::Input, &rec).unwrap();

        assert_eq!(get_result(&conn, Direction::Input, id).unwrap(), Some(rec));
        // Directions are stored separately
        assert!(get_result(&conn, Direction::Output, id).unwrap().is_none());
    }

    #[test]
    fn test_result_without_reasons_stores_null() {
        let conn = test_conn();
        let id = Uuid::new_v4();
        append_result(&conn, Direction::Output, &record(id, None)).unwrap();

        let reasons: Option<String> = conn
            .query_row(
                "SELECT reasons FROM response_analysis_results WHERE response_id = ?1",
                [id.to_string()],
                |row| row.get(0),
            )
            .unwrap();
        assert!(reasons.is_none());
        let loaded = get_result(&conn, Direction::Output, id).unwrap().unwrap();
        assert!(loaded.reasons.is_none());
    }
}
