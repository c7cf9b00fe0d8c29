//! Dataset catalog and per-family schema policy.
//!
//! The six cached datasets form a closed enumeration. Column typing is an
//! explicit compile-time policy per dataset family rather than something
//! inferred from live response bodies: the upstream header still decides
//! which columns exist, but every name is validated against an identifier
//! grammar and typed through the family policy before any SQL is built.

use crate::Error;
use serde::{Deserialize, Serialize};

/// The six cached datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    Us,
    State,
    County,
    UsCensus,
    StateCensus,
    CountyCensus,
}

impl Dataset {
    /// All datasets in refresh order.
    pub const ALL: [Dataset; 6] = [
        Dataset::Us,
        Dataset::State,
        Dataset::County,
        Dataset::UsCensus,
        Dataset::StateCensus,
        Dataset::CountyCensus,
    ];

    /// Name of the cached table backing this dataset.
    pub fn table_name(self) -> &'static str {
        match self {
            Dataset::Us => "us",
            Dataset::State => "state",
            Dataset::County => "county",
            Dataset::UsCensus => "us_census",
            Dataset::StateCensus => "state_census",
            Dataset::CountyCensus => "county_census",
        }
    }

    /// Reverse lookup from a table name found in the store.
    pub fn from_table_name(name: &str) -> Option<Dataset> {
        Dataset::ALL.into_iter().find(|d| d.table_name() == name)
    }

    pub fn family(self) -> DatasetFamily {
        match self {
            Dataset::Us | Dataset::State | Dataset::County => DatasetFamily::TimeSeries,
            Dataset::UsCensus | Dataset::StateCensus | Dataset::CountyCensus => DatasetFamily::Census,
        }
    }

    /// Columns the query layer depends on; an upstream header missing any
    /// of these is rejected at load time instead of failing mid-query.
    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            Dataset::Us => &["date", "cases", "deaths"],
            Dataset::State => &["date", "fips", "cases", "deaths"],
            Dataset::County => &["date", "fips", "cases", "deaths"],
            Dataset::UsCensus => &["pop", "density"],
            Dataset::StateCensus => &["state", "name", "pop", "density"],
            Dataset::CountyCensus => &["state", "county", "name", "pop", "density"],
        }
    }
}

impl std::fmt::Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table_name())
    }
}

/// Refresh behavior class of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFamily {
    /// Case/death series; stale after the freshness window.
    TimeSeries,
    /// Population figures; loaded once, never refreshed.
    Census,
}

impl DatasetFamily {
    pub fn has_freshness_window(self) -> bool {
        matches!(self, DatasetFamily::TimeSeries)
    }

    fn policy(self) -> &'static FamilyPolicy {
        match self {
            DatasetFamily::TimeSeries => &TIME_SERIES_POLICY,
            DatasetFamily::Census => &CENSUS_POLICY,
        }
    }

    /// Census headers arrive uppercase from the API and are stored lowercase.
    fn normalize(self, name: &str) -> String {
        match self {
            DatasetFamily::TimeSeries => name.to_string(),
            DatasetFamily::Census => name.to_ascii_lowercase(),
        }
    }
}

/// Compile-time column typing per family; anything unlisted is TEXT NOT NULL.
struct FamilyPolicy {
    integer_not_null: &'static [&'static str],
    real_nullable: &'static [&'static str],
}

static TIME_SERIES_POLICY: FamilyPolicy = FamilyPolicy { integer_not_null: &["cases", "deaths"], real_nullable: &[] };

// Density is absent for some geographies upstream.
static CENSUS_POLICY: FamilyPolicy = FamilyPolicy { integer_not_null: &["pop"], real_nullable: &["density"] };

/// SQLite storage class for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    pub fn sql(self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
        }
    }
}

/// One resolved column of a dataset table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
    pub nullable: bool,
}

/// Rows as fetched from an upstream source, before coercion.
///
/// Census rows may carry `None` for nullable fields; feed rows never do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableData {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

/// A dataset's table schema, resolved from an upstream header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub dataset: Dataset,
    pub columns: Vec<Column>,
}

impl TableSchema {
    /// Resolve an upstream header row against the dataset's family policy.
    ///
    /// Rejects empty headers, duplicate or non-identifier column names, and
    /// headers missing any of the dataset's required columns.
    pub fn derive(dataset: Dataset, header: &[String]) -> Result<TableSchema, Error> {
        let family = dataset.family();
        if header.is_empty() {
            return Err(Error::SchemaMismatch { dataset: dataset.table_name(), detail: "empty header".into() });
        }

        let policy = family.policy();
        let mut columns = Vec::with_capacity(header.len());
        for raw in header {
            let name = family.normalize(raw);
            if !is_identifier(&name) {
                return Err(Error::SchemaMismatch {
                    dataset: dataset.table_name(),
                    detail: format!("column name {raw:?} is not a valid identifier"),
                });
            }
            if columns.iter().any(|c: &Column| c.name == name) {
                return Err(Error::SchemaMismatch {
                    dataset: dataset.table_name(),
                    detail: format!("duplicate column {name:?}"),
                });
            }

            let (ty, nullable) = if policy.integer_not_null.contains(&name.as_str()) {
                (ColumnType::Integer, false)
            } else if policy.real_nullable.contains(&name.as_str()) {
                (ColumnType::Real, true)
            } else {
                (ColumnType::Text, false)
            };
            columns.push(Column { name, ty, nullable });
        }

        for required in dataset.required_columns() {
            if !columns.iter().any(|c| c.name == *required) {
                return Err(Error::SchemaMismatch {
                    dataset: dataset.table_name(),
                    detail: format!("header is missing required column {required:?}"),
                });
            }
        }

        Ok(TableSchema { dataset, columns })
    }

    /// CREATE TABLE statement. Identifiers come from the closed dataset enum
    /// and grammar-validated column names, so interpolation is safe here.
    pub fn create_sql(&self) -> String {
        let mut defs = vec!["id INTEGER PRIMARY KEY AUTOINCREMENT".to_string()];
        for col in &self.columns {
            let null = if col.nullable { "" } else { " NOT NULL" };
            defs.push(format!("{} {}{null}", col.name, col.ty.sql()));
        }
        format!("CREATE TABLE {} ({})", self.dataset.table_name(), defs.join(", "))
    }

    /// INSERT statement with one placeholder per data column.
    pub fn insert_sql(&self) -> String {
        let names: Vec<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
        let placeholders: Vec<String> = (1..=self.columns.len()).map(|i| format!("?{i}")).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.dataset.table_name(),
            names.join(", "),
            placeholders.join(", ")
        )
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_table_name_roundtrip() {
        for dataset in Dataset::ALL {
            assert_eq!(Dataset::from_table_name(dataset.table_name()), Some(dataset));
        }
        assert_eq!(Dataset::from_table_name("timings"), None);
    }

    #[test]
    fn test_family_windows() {
        assert!(Dataset::State.family().has_freshness_window());
        assert!(!Dataset::StateCensus.family().has_freshness_window());
    }

    #[test]
    fn test_derive_time_series_typing() {
        let schema = TableSchema::derive(Dataset::State, &header(&["date", "state", "fips", "cases", "deaths"])).unwrap();

        let cases = schema.columns.iter().find(|c| c.name == "cases").unwrap();
        assert_eq!(cases.ty, ColumnType::Integer);
        assert!(!cases.nullable);

        let date = schema.columns.iter().find(|c| c.name == "date").unwrap();
        assert_eq!(date.ty, ColumnType::Text);
    }

    #[test]
    fn test_derive_census_lowercases_and_types() {
        let schema =
            TableSchema::derive(Dataset::StateCensus, &header(&["POP", "DENSITY", "NAME", "state"])).unwrap();

        let names: Vec<&str> = schema.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["pop", "density", "name", "state"]);

        let density = schema.columns.iter().find(|c| c.name == "density").unwrap();
        assert_eq!(density.ty, ColumnType::Real);
        assert!(density.nullable);

        let pop = schema.columns.iter().find(|c| c.name == "pop").unwrap();
        assert_eq!(pop.ty, ColumnType::Integer);
        assert!(!pop.nullable);
    }

    #[test]
    fn test_derive_rejects_bad_identifier() {
        let result = TableSchema::derive(Dataset::Us, &header(&["date", "cases", "deaths", "x; DROP TABLE us"]));
        assert!(matches!(result, Err(Error::SchemaMismatch { .. })));
    }

    #[test]
    fn test_derive_rejects_duplicate() {
        let result = TableSchema::derive(Dataset::Us, &header(&["date", "cases", "cases", "deaths"]));
        assert!(matches!(result, Err(Error::SchemaMismatch { .. })));
    }

    #[test]
    fn test_derive_rejects_missing_required() {
        let result = TableSchema::derive(Dataset::State, &header(&["date", "cases", "deaths"]));
        assert!(matches!(result, Err(Error::SchemaMismatch { .. })));
    }

    #[test]
    fn test_derive_rejects_empty_header() {
        let result = TableSchema::derive(Dataset::Us, &[]);
        assert!(matches!(result, Err(Error::SchemaMismatch { .. })));
    }

    #[test]
    fn test_create_sql_shape() {
        let schema = TableSchema::derive(Dataset::Us, &header(&["date", "cases", "deaths"])).unwrap();
        let sql = schema.create_sql();
        assert!(sql.starts_with("CREATE TABLE us ("));
        assert!(sql.contains("cases INTEGER NOT NULL"));
        assert!(sql.contains("date TEXT NOT NULL"));
        assert!(sql.contains("id INTEGER PRIMARY KEY AUTOINCREMENT"));
    }

    #[test]
    fn test_insert_sql_shape() {
        let schema = TableSchema::derive(Dataset::Us, &header(&["date", "cases", "deaths"])).unwrap();
        assert_eq!(schema.insert_sql(), "INSERT INTO us (date, cases, deaths) VALUES (?1, ?2, ?3)");
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("cases"));
        assert!(is_identifier("state_fips"));
        assert!(is_identifier("_x2"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("2cases"));
        assert!(!is_identifier("Cases"));
        assert!(!is_identifier("ca ses"));
    }
}
