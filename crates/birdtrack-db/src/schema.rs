//! Position table layout and the CQL statements built from it.
//!
//! Keyspace and table names are interpolated into statement text (CQL has no
//! bind markers for identifiers), so they are validated once when a
//! [`QualifiedTable`] is built and every statement is rendered from it.

use core::fmt::Write as _;

use crate::error::DbError;

/// Longest keyspace or table name the store accepts.
const MAX_IDENTIFIER_LEN: usize = 48;

/// CQL column types used by the position table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// UTF-8 text.
    Text,
    /// Calendar date without time zone.
    Date,
    /// Version-1 time-based UUID.
    TimeUuid,
    /// 64-bit float.
    Double,
}

impl ColumnType {
    /// CQL type name.
    pub const fn as_cql(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Date => "DATE",
            Self::TimeUuid => "TIMEUUID",
            Self::Double => "DOUBLE",
        }
    }
}

/// One column definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// Column name.
    pub name: &'static str,
    /// Column type.
    pub kind: ColumnType,
}

/// Sort direction of the clustering key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusteringOrder {
    /// Oldest first.
    Asc,
    /// Newest first.
    Desc,
}

impl ClusteringOrder {
    /// CQL keyword.
    pub const fn as_cql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Column set, key structure and clustering order of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableLayout {
    /// All columns in declaration order.
    pub columns: &'static [Column],
    /// Composite partition key.
    pub partition_key: &'static [&'static str],
    /// Clustering column.
    pub clustering_key: &'static str,
    /// Clustering direction.
    pub clustering_order: ClusteringOrder,
}

/// Layout of the position table.
pub const POSITION_TABLE: TableLayout = TableLayout {
    columns: &[
        Column { name: "bird_id", kind: ColumnType::Text },
        Column { name: "bucket_date", kind: ColumnType::Date },
        Column { name: "ts", kind: ColumnType::TimeUuid },
        Column { name: "species", kind: ColumnType::Text },
        Column { name: "latitude", kind: ColumnType::Double },
        Column { name: "longitude", kind: ColumnType::Double },
    ],
    partition_key: &["bird_id", "bucket_date"],
    clustering_key: "ts",
    clustering_order: ClusteringOrder::Desc,
};

impl TableLayout {
    /// Column names in declaration order.
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// Render `CREATE TABLE IF NOT EXISTS` for this layout.
    pub fn create_cql(&self, table: &QualifiedTable) -> String {
        let mut cql = format!("CREATE TABLE IF NOT EXISTS {table} (\n");
        for column in self.columns {
            let _ = writeln!(cql, "    {} {},", column.name, column.kind.as_cql());
        }
        let _ = writeln!(
            cql,
            "    PRIMARY KEY (({}), {})",
            self.partition_key.join(", "),
            self.clustering_key
        );
        let _ = write!(
            cql,
            ") WITH CLUSTERING ORDER BY ({} {})",
            self.clustering_key,
            self.clustering_order.as_cql()
        );
        cql
    }
}

/// A validated `keyspace.table` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedTable {
    keyspace: String,
    table: String,
}

impl QualifiedTable {
    /// Validate and combine a keyspace and table name.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if either name is not a plain CQL
    /// identifier (ASCII letter first, then letters, digits or `_`, at most
    /// 48 characters).
    pub fn new(keyspace: &str, table: &str) -> Result<Self, DbError> {
        validate_identifier("keyspace", keyspace)?;
        validate_identifier("table", table)?;
        Ok(Self {
            keyspace: keyspace.to_owned(),
            table: table.to_owned(),
        })
    }

    /// `CREATE KEYSPACE IF NOT EXISTS` with `SimpleStrategy` replication.
    pub fn create_keyspace_cql(&self, replication_factor: u32) -> String {
        format!(
            "CREATE KEYSPACE IF NOT EXISTS {} WITH REPLICATION = {{ 'class': 'SimpleStrategy', 'replication_factor': {replication_factor} }}",
            self.keyspace
        )
    }

    /// `INSERT` of one position row.
    ///
    /// With `server_time` the clustering value is generated by the store
    /// (`now()`) and the statement binds five values; otherwise it binds six
    /// with the timestamp third.
    pub fn insert_cql(&self, server_time: bool) -> String {
        let ts = if server_time { "now()" } else { "?" };
        format!(
            "INSERT INTO {self} (bird_id, bucket_date, ts, latitude, longitude, species) VALUES (?, ?, {ts}, ?, ?, ?)"
        )
    }

    /// `SELECT DISTINCT` over the partition key.
    pub fn select_distinct_cql(&self) -> String {
        format!("SELECT DISTINCT bird_id, bucket_date FROM {self}")
    }

    /// Newest-first rows of one partition, bounded by a bound `LIMIT`.
    pub fn select_latest_cql(&self) -> String {
        format!(
            "SELECT bird_id, bucket_date, ts, species, latitude, longitude FROM {self} WHERE bird_id = ? AND bucket_date = ? LIMIT ?"
        )
    }
}

impl core::fmt::Display for QualifiedTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}", self.keyspace, self.table)
    }
}

/// Check that `name` is a plain, unquoted CQL identifier.
///
/// # Errors
///
/// Returns [`DbError::Config`] naming `what` if the identifier is invalid.
pub fn validate_identifier(what: &str, name: &str) -> Result<(), DbError> {
    let mut chars = name.chars();
    let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    let rest_valid = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !starts_with_letter || !rest_valid || name.len() > MAX_IDENTIFIER_LEN {
        return Err(DbError::Config(format!("invalid {what} name: {name:?}")));
    }
    Ok(())
}
