//! Dataset table lifecycle and bulk population.
//!
//! Tables are created from a resolved [`TableSchema`] and populated in a
//! single transaction with one prepared statement. Cells are coerced to
//! their declared column types at insert time; a value that does not fit
//! its column fails the whole load.

use super::connection::StoreDb;
use crate::Error;
use crate::catalog::{Column, ColumnType, Dataset, TableSchema};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

fn coerce(column: &Column, cell: Option<String>) -> Result<rusqlite::types::Value, Error> {
    use rusqlite::types::Value;

    match cell {
        None => {
            if column.nullable {
                Ok(Value::Null)
            } else {
                Err(Error::TypeCoercion { column: column.name.clone(), value: "NULL".into() })
            }
        }
        Some(text) => match column.ty {
            ColumnType::Integer => text
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| Error::TypeCoercion { column: column.name.clone(), value: text }),
            ColumnType::Real => text
                .trim()
                .parse::<f64>()
                .map(Value::Real)
                .map_err(|_| Error::TypeCoercion { column: column.name.clone(), value: text }),
            ColumnType::Text => Ok(Value::Text(text)),
        },
    }
}

impl StoreDb {
    /// Create the dataset's table from its resolved schema.
    ///
    /// Fails if the table already exists; the orchestrator drops stale
    /// tables before reloading.
    pub async fn create_table(&self, schema: &TableSchema) -> Result<(), Error> {
        let sql = schema.create_sql();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(&sql, [])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Bulk-insert rows in one transaction, coercing each cell to its
    /// declared column type. Returns the number of inserted rows.
    pub async fn insert_rows(&self, schema: &TableSchema, rows: Vec<Vec<Option<String>>>) -> Result<u64, Error> {
        let schema = schema.clone();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let tx = conn.transaction().map_err(Error::from)?;
                let mut inserted = 0u64;
                {
                    let mut stmt = tx.prepare(&schema.insert_sql()).map_err(Error::from)?;
                    for (index, row) in rows.into_iter().enumerate() {
                        if row.len() != schema.columns.len() {
                            return Err(Error::SchemaMismatch {
                                dataset: schema.dataset.table_name(),
                                detail: format!(
                                    "row {} has {} fields, expected {}",
                                    index + 1,
                                    row.len(),
                                    schema.columns.len()
                                ),
                            });
                        }
                        let values = schema
                            .columns
                            .iter()
                            .zip(row)
                            .map(|(column, cell)| coerce(column, cell))
                            .collect::<Result<Vec<_>, Error>>()?;
                        stmt.execute(rusqlite::params_from_iter(values)).map_err(Error::from)?;
                        inserted += 1;
                    }
                }
                tx.commit().map_err(Error::from)?;
                Ok(inserted)
            })
            .await
            .map_err(Error::from)
    }

    /// Drop a dataset's table if it exists.
    pub async fn drop_dataset(&self, dataset: Dataset) -> Result<(), Error> {
        let sql = format!("DROP TABLE IF EXISTS {}", dataset.table_name());
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(&sql, [])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Check whether a dataset's table exists.
    pub async fn dataset_exists(&self, dataset: Dataset) -> Result<bool, Error> {
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn
                    .query_row(
                        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
                        params![dataset.table_name()],
                        |row| row.get(0),
                    )
                    .map_err(Error::from)?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of rows in a dataset's table.
    pub async fn dataset_row_count(&self, dataset: Dataset) -> Result<u64, Error> {
        let sql = format!("SELECT COUNT(*) FROM {}", dataset.table_name());
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(&sql, [], |row| row.get(0)).map_err(Error::from)?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts_schema() -> TableSchema {
        let header: Vec<String> = ["date", "fips", "cases", "deaths"].iter().map(|s| s.to_string()).collect();
        TableSchema::derive(Dataset::State, &header).unwrap()
    }

    fn census_schema() -> TableSchema {
        let header: Vec<String> = ["pop", "density", "name", "state"].iter().map(|s| s.to_string()).collect();
        TableSchema::derive(Dataset::StateCensus, &header).unwrap()
    }

    fn row(cells: &[&str]) -> Vec<Option<String>> {
        cells.iter().map(|s| Some(s.to_string())).collect()
    }

    #[tokio::test]
    async fn test_create_and_fill() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let schema = ts_schema();
        db.create_table(&schema).await.unwrap();

        // 3 regions x 2 dates
        let rows = vec![
            row(&["2021-03-01", "26", "100", "5"]),
            row(&["2021-03-01", "36", "200", "8"]),
            row(&["2021-03-01", "48", "300", "9"]),
            row(&["2021-03-02", "26", "110", "5"]),
            row(&["2021-03-02", "36", "220", "9"]),
            row(&["2021-03-02", "48", "330", "10"]),
        ];
        let inserted = db.insert_rows(&schema, rows).await.unwrap();
        assert_eq!(inserted, 6);
        assert_eq!(db.dataset_row_count(Dataset::State).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_numeric_columns_stored_numeric() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let schema = ts_schema();
        db.create_table(&schema).await.unwrap();
        db.insert_rows(&schema, vec![row(&["2021-03-01", "26", "100", "5"])])
            .await
            .unwrap();

        let kind: String = db
            .conn
            .call(|conn| conn.query_row("SELECT typeof(cases) FROM state", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(kind, "integer");
    }

    #[tokio::test]
    async fn test_bad_integer_rejected_and_rolled_back() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let schema = ts_schema();
        db.create_table(&schema).await.unwrap();

        let rows = vec![
            row(&["2021-03-01", "26", "100", "5"]),
            row(&["2021-03-02", "26", "n/a", "5"]),
        ];
        let result = db.insert_rows(&schema, rows).await;
        assert!(matches!(result, Err(Error::TypeCoercion { .. })));
        assert_eq!(db.dataset_row_count(Dataset::State).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_null_density_allowed() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let schema = census_schema();
        db.create_table(&schema).await.unwrap();

        let rows = vec![vec![
            Some("9986857".to_string()),
            None,
            Some("Michigan".to_string()),
            Some("26".to_string()),
        ]];
        assert_eq!(db.insert_rows(&schema, rows).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_null_in_not_null_column_rejected() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let schema = census_schema();
        db.create_table(&schema).await.unwrap();

        let rows = vec![vec![None, Some("174.8".to_string()), Some("Michigan".to_string()), Some("26".to_string())]];
        let result = db.insert_rows(&schema, rows).await;
        assert!(matches!(result, Err(Error::TypeCoercion { ref column, .. }) if column == "pop"));
    }

    #[tokio::test]
    async fn test_row_width_mismatch_rejected() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let schema = ts_schema();
        db.create_table(&schema).await.unwrap();

        let result = db.insert_rows(&schema, vec![row(&["2021-03-01", "26", "100"])]).await;
        assert!(matches!(result, Err(Error::SchemaMismatch { .. })));
    }

    #[tokio::test]
    async fn test_drop_dataset() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let schema = ts_schema();
        db.create_table(&schema).await.unwrap();
        assert!(db.dataset_exists(Dataset::State).await.unwrap());

        db.drop_dataset(Dataset::State).await.unwrap();
        assert!(!db.dataset_exists(Dataset::State).await.unwrap());

        // dropping a missing table is fine
        db.drop_dataset(Dataset::State).await.unwrap();
    }
}
