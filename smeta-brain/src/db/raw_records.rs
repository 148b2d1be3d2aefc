//! Raw record database operations

use smeta_common::consensus::RawRecord;
use smeta_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::{parse_guid, parse_timestamp};

const SELECT_COLUMNS: &str = r#"
    SELECT guid, name, unit, material_price, work_price, source_file, created_at, updated_at
    FROM raw_records
"#;

/// All raw records in ingestion order
pub async fn list(pool: &SqlitePool) -> Result<Vec<RawRecord>> {
    let rows = sqlx::query(&format!("{} ORDER BY position", SELECT_COLUMNS))
        .fetch_all(pool)
        .await?;

    rows.iter().map(row_to_record).collect()
}

pub async fn fetch(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<RawRecord>> {
    let row = sqlx::query(&format!("{} WHERE guid = ?", SELECT_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(row_to_record).transpose()
}

pub async fn insert(conn: &mut SqliteConnection, record: &RawRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO raw_records (
            guid, position, name, unit, material_price, work_price,
            source_file, created_at, updated_at
        ) VALUES (
            ?, (SELECT COALESCE(MAX(position), -1) + 1 FROM raw_records),
            ?, ?, ?, ?, ?, ?, ?
        )
        "#,
    )
    .bind(record.id.to_string())
    .bind(&record.name)
    .bind(&record.unit)
    .bind(record.material_price)
    .bind(record.work_price)
    .bind(&record.source_file)
    .bind(record.created_at.to_rfc3339())
    .bind(record.updated_at.to_rfc3339())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn update(conn: &mut SqliteConnection, record: &RawRecord) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE raw_records SET
            name = ?, unit = ?, material_price = ?, work_price = ?, updated_at = ?
        WHERE guid = ?
        "#,
    )
    .bind(&record.name)
    .bind(&record.unit)
    .bind(record.material_price)
    .bind(record.work_price)
    .bind(record.updated_at.to_rfc3339())
    .bind(record.id.to_string())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Raw record {}", record.id)));
    }
    Ok(())
}

pub async fn delete_all(conn: &mut SqliteConnection) -> Result<u64> {
    let result = sqlx::query("DELETE FROM raw_records")
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

fn row_to_record(row: &SqliteRow) -> Result<RawRecord> {
    let guid: String = row.try_get("guid")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(RawRecord {
        id: parse_guid(&guid)?,
        name: row.try_get("name")?,
        unit: row.try_get("unit")?,
        material_price: row.try_get("material_price")?,
        work_price: row.try_get("work_price")?,
        source_file: row.try_get("source_file")?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}
