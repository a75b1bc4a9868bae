//! Whole-table CSV export
//!
//! Columns come from the table schema, so the header row is written even
//! when the table is empty and new columns show up without code changes.

use nlmfb_common::db::ExportEntity;
use nlmfb_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool, ValueRef};

/// Name and declared type of one table column
#[derive(Debug, Clone, PartialEq)]
struct ColumnInfo {
    name: String,
    declared_type: String,
}

impl ColumnInfo {
    fn is_boolean(&self) -> bool {
        self.declared_type.eq_ignore_ascii_case("BOOLEAN")
    }
}

/// Serialize every row of `entity`'s table, ordered by id
pub async fn export_csv(pool: &SqlitePool, entity: ExportEntity) -> Result<Vec<u8>> {
    let table = entity.table_name();
    let columns = table_columns(pool, table).await?;

    let select_list = columns
        .iter()
        .map(|c| format!("\"{}\"", c.name))
        .collect::<Vec<_>>()
        .join(", ");
    let rows = sqlx::query(&format!("SELECT {} FROM {} ORDER BY id", select_list, table))
        .fetch_all(pool)
        .await?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(columns.iter().map(|c| c.name.as_str()))?;
    for row in &rows {
        let record: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(i, column)| render_cell(row, i, column))
            .collect();
        writer.write_record(&record)?;
    }

    let bytes = writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
    tracing::debug!(table, rows = rows.len(), "Exported table");
    Ok(bytes)
}

async fn table_columns(pool: &SqlitePool, table: &str) -> Result<Vec<ColumnInfo>> {
    // PRAGMA table_info returns: (cid, name, type, notnull, dflt_value, pk)
    let rows = sqlx::query(&format!("PRAGMA table_info({})", table))
        .fetch_all(pool)
        .await?;

    if rows.is_empty() {
        return Err(Error::NotFound(format!("table {}", table)));
    }

    rows.iter()
        .map(|row| -> Result<ColumnInfo> {
            Ok(ColumnInfo {
                name: row.try_get::<String, _>(1)?,
                declared_type: row.try_get::<String, _>(2)?,
            })
        })
        .collect()
}

/// Render one value; NULL becomes an empty cell
fn render_cell(row: &SqliteRow, index: usize, column: &ColumnInfo) -> String {
    let is_null = row.try_get_raw(index).map(|v| v.is_null()).unwrap_or(true);
    if is_null {
        return String::new();
    }

    if column.is_boolean() {
        if let Ok(flag) = row.try_get::<i64, _>(index) {
            return if flag != 0 { "True" } else { "False" }.to_string();
        }
    }

    row.try_get::<String, _>(index)
        .ok()
        .or_else(|| row.try_get::<i64, _>(index).ok().map(|v| v.to_string()))
        .or_else(|| row.try_get::<f64, _>(index).ok().map(format_real))
        .unwrap_or_default()
}

/// REAL values keep their decimal point, e.g. `3100.0`
fn format_real(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}
