//! Consensus item database operations

use smeta_common::consensus::{ConsensusItem, PriceAnalyses, PriceAnalysis};
use smeta_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::{parse_guid, parse_timestamp};

const SELECT_COLUMNS: &str = r#"
    SELECT guid, name, unit, material_price, work_price,
           material_analysis, work_analysis,
           material_price_approved, work_price_approved,
           cluster_size, source_files, created_at, updated_at
    FROM consensus_items
"#;

/// All items in listing order
pub async fn list(pool: &SqlitePool) -> Result<Vec<ConsensusItem>> {
    let rows = sqlx::query(&format!("{} ORDER BY position", SELECT_COLUMNS))
        .fetch_all(pool)
        .await?;

    rows.iter().map(row_to_item).collect()
}

/// Load one item, `None` if it does not exist
pub async fn fetch(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<ConsensusItem>> {
    let row = sqlx::query(&format!("{} WHERE guid = ?", SELECT_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(row_to_item).transpose()
}

/// Append a new item at the end of the listing
pub async fn insert(conn: &mut SqliteConnection, item: &ConsensusItem) -> Result<()> {
    let columns = ItemColumns::encode(item)?;

    sqlx::query(
        r#"
        INSERT INTO consensus_items (
            guid, position, name, unit, material_price, work_price,
            material_analysis, work_analysis,
            material_price_approved, work_price_approved,
            cluster_size, source_files, created_at, updated_at
        ) VALUES (
            ?, (SELECT COALESCE(MAX(position), -1) + 1 FROM consensus_items),
            ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?
        )
        "#,
    )
    .bind(item.id.to_string())
    .bind(&item.name)
    .bind(&item.unit)
    .bind(item.material_price)
    .bind(item.work_price)
    .bind(&columns.material_analysis)
    .bind(&columns.work_analysis)
    .bind(item.material_price_approved)
    .bind(item.work_price_approved)
    .bind(item.cluster_size as i64)
    .bind(&columns.source_files)
    .bind(item.created_at.to_rfc3339())
    .bind(item.updated_at.to_rfc3339())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Overwrite every mutable column of an existing item
pub async fn update(conn: &mut SqliteConnection, item: &ConsensusItem) -> Result<()> {
    let columns = ItemColumns::encode(item)?;

    let result = sqlx::query(
        r#"
        UPDATE consensus_items SET
            name = ?, unit = ?, material_price = ?, work_price = ?,
            material_analysis = ?, work_analysis = ?,
            material_price_approved = ?, work_price_approved = ?,
            cluster_size = ?, source_files = ?, updated_at = ?
        WHERE guid = ?
        "#,
    )
    .bind(&item.name)
    .bind(&item.unit)
    .bind(item.material_price)
    .bind(item.work_price)
    .bind(&columns.material_analysis)
    .bind(&columns.work_analysis)
    .bind(item.material_price_approved)
    .bind(item.work_price_approved)
    .bind(item.cluster_size as i64)
    .bind(&columns.source_files)
    .bind(item.updated_at.to_rfc3339())
    .bind(item.id.to_string())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Item {}", item.id)));
    }
    Ok(())
}

/// Delete one item; returns whether a row was removed
pub async fn delete(conn: &mut SqliteConnection, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM consensus_items WHERE guid = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete every item; returns the number removed
pub async fn delete_all(conn: &mut SqliteConnection) -> Result<u64> {
    let result = sqlx::query("DELETE FROM consensus_items")
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

/// JSON-encoded columns, prepared before touching the connection
struct ItemColumns {
    material_analysis: String,
    work_analysis: String,
    source_files: String,
}

impl ItemColumns {
    fn encode(item: &ConsensusItem) -> Result<Self> {
        let to_json = |what: &str, value: serde_json::Result<String>| {
            value.map_err(|e| Error::Internal(format!("Failed to serialize {}: {}", what, e)))
        };

        Ok(Self {
            material_analysis: to_json(
                "material analysis",
                serde_json::to_string(&item.price_analysis.material),
            )?,
            work_analysis: to_json("work analysis", serde_json::to_string(&item.price_analysis.work))?,
            source_files: to_json("source files", serde_json::to_string(&item.source_files))?,
        })
    }
}

fn decode_analysis(row: &SqliteRow, column: &str) -> Result<PriceAnalysis> {
    let raw: String = row.try_get(column)?;
    serde_json::from_str(&raw)
        .map_err(|e| Error::Internal(format!("Failed to deserialize {}: {}", column, e)))
}

fn row_to_item(row: &SqliteRow) -> Result<ConsensusItem> {
    let guid: String = row.try_get("guid")?;
    let source_files: String = row.try_get("source_files")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;
    let cluster_size: i64 = row.try_get("cluster_size")?;

    Ok(ConsensusItem {
        id: parse_guid(&guid)?,
        name: row.try_get("name")?,
        unit: row.try_get("unit")?,
        material_price: row.try_get("material_price")?,
        work_price: row.try_get("work_price")?,
        price_analysis: PriceAnalyses {
            material: decode_analysis(row, "material_analysis")?,
            work: decode_analysis(row, "work_analysis")?,
        },
        material_price_approved: row.try_get("material_price_approved")?,
        work_price_approved: row.try_get("work_price_approved")?,
        cluster_size: cluster_size.max(0) as usize,
        source_files: serde_json::from_str(&source_files)
            .map_err(|e| Error::Internal(format!("Failed to deserialize source_files: {}", e)))?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}
