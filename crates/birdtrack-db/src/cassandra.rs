//! Driver-backed position store.
//!
//! Talks to any CQL-compatible wide-column cluster (Apache Cassandra,
//! `ScyllaDB`) through the [`scylla`] client. Statements are prepared once per
//! store and each one runs at the level chosen by its [`ConsistencyPolicy`].
//!
//! Table names are fully qualified in every statement, so the session never
//! needs a current keyspace and schema setup can run on the same session as
//! the traffic that follows it.

use std::collections::BTreeSet;

use birdtrack_types::{
    BirdId, Coordinates, NewPosition, PositionRecord, QueryTrace, TimeUuid, TraceEvent, TraceSink,
};
use chrono::NaiveDate;
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::response::query_result::QueryResult;
use scylla::serialize::row::SerializeRow;
use scylla::statement::prepared::PreparedStatement;
use scylla::value::CqlTimeuuid;
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::consistency::{ConsistencyLevel, ConsistencyPolicy};
use crate::error::DbError;
use crate::schema::{POSITION_TABLE, QualifiedTable};
use crate::store::PositionStore;

/// Default CQL native protocol port.
const DEFAULT_PORT: u16 = 9042;

/// Default keyspace replication factor.
const DEFAULT_REPLICATION_FACTOR: u32 = 3;

/// Connection and schema settings for a [`CassandraStore`].
#[derive(Debug, Clone)]
pub struct CassandraConfig {
    /// Contact point host names or addresses.
    pub contact_points: Vec<String>,
    /// Native protocol port shared by every contact point.
    pub port: u16,
    /// Keyspace holding the position table.
    pub keyspace: String,
    /// Position table name.
    pub table: String,
    /// Replication factor applied when the keyspace is created.
    pub replication_factor: u32,
    /// Consistency level for each kind of statement.
    pub consistency: ConsistencyPolicy,
}

impl CassandraConfig {
    /// Create a configuration with default port, replication and consistency.
    pub fn new(contact_points: Vec<String>, keyspace: &str, table: &str) -> Self {
        Self {
            contact_points,
            port: DEFAULT_PORT,
            keyspace: keyspace.to_owned(),
            table: table.to_owned(),
            replication_factor: DEFAULT_REPLICATION_FACTOR,
            consistency: ConsistencyPolicy::default(),
        }
    }

    /// Set the native protocol port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the keyspace replication factor.
    #[must_use]
    pub const fn with_replication_factor(mut self, factor: u32) -> Self {
        self.replication_factor = factor;
        self
    }

    /// Set the consistency policy.
    #[must_use]
    pub const fn with_consistency(mut self, consistency: ConsistencyPolicy) -> Self {
        self.consistency = consistency;
        self
    }

    /// Contact points as `host:port` strings.
    pub fn known_nodes(&self) -> Vec<String> {
        self.contact_points
            .iter()
            .map(|host| format!("{}:{}", host.trim(), self.port))
            .collect()
    }
}

/// Statements used by the data path, prepared on first use.
struct Statements {
    insert_server_time: PreparedStatement,
    insert_client_time: PreparedStatement,
    select_distinct: PreparedStatement,
    select_latest: PreparedStatement,
}

/// Position store backed by a live CQL cluster.
pub struct CassandraStore {
    session: Session,
    table: QualifiedTable,
    replication_factor: u32,
    consistency: ConsistencyPolicy,
    statements: OnceCell<Statements>,
}

impl CassandraStore {
    /// Connect to the cluster.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the keyspace or table name is invalid.
    /// Returns [`DbError::Connect`] if no contact point can be reached.
    pub async fn connect(config: &CassandraConfig) -> Result<Self, DbError> {
        if config.contact_points.is_empty() {
            return Err(DbError::Config(String::from(
                "at least one contact point is required",
            )));
        }
        let table = QualifiedTable::new(&config.keyspace, &config.table)?;
        let nodes = config.known_nodes();

        let session = SessionBuilder::new().known_nodes(&nodes).build().await?;

        tracing::info!(nodes = ?nodes, table = %table, "Connected to Cassandra");
        Ok(Self {
            session,
            table,
            replication_factor: config.replication_factor,
            consistency: config.consistency,
            statements: OnceCell::new(),
        })
    }

    /// Prepare `cql` at the given consistency level.
    async fn prepare(&self, cql: String, level: ConsistencyLevel) -> Result<PreparedStatement, DbError> {
        let mut statement = self.session.prepare(cql).await?;
        statement.set_consistency(level.to_driver());
        Ok(statement)
    }

    async fn statements(&self) -> Result<&Statements, DbError> {
        self.statements
            .get_or_try_init(|| async {
                let policy = self.consistency;
                Ok::<_, DbError>(Statements {
                    insert_server_time: self.prepare(self.table.insert_cql(true), policy.write).await?,
                    insert_client_time: self.prepare(self.table.insert_cql(false), policy.write).await?,
                    select_distinct: self
                        .prepare(self.table.select_distinct_cql(), policy.discovery)
                        .await?,
                    select_latest: self
                        .prepare(self.table.select_latest_cql(), policy.latest)
                        .await?,
                })
            })
            .await
    }

    /// Execute a prepared statement, tracing it when a sink is supplied.
    async fn execute(
        &self,
        operation: &str,
        statement: &PreparedStatement,
        values: impl SerializeRow,
        trace: Option<&mut dyn TraceSink>,
    ) -> Result<QueryResult, DbError> {
        let Some(sink) = trace else {
            return Ok(self.session.execute_unpaged(statement, values).await?);
        };

        let mut traced = statement.clone();
        traced.set_tracing(true);
        let result = self.session.execute_unpaged(&traced, values).await?;
        let query_trace = self.fetch_trace(operation, &result).await?;
        sink.append(&query_trace)?;
        Ok(result)
    }

    /// Load the execution trace recorded for `result`.
    async fn fetch_trace(&self, operation: &str, result: &QueryResult) -> Result<QueryTrace, DbError> {
        let Some(session_id) = result.tracing_id() else {
            tracing::warn!(operation, "Traced statement returned no tracing session");
            return Ok(QueryTrace::new(operation, None, Vec::new()));
        };

        let info = self.session.get_tracing_info(&session_id).await?;
        let events = info
            .events
            .iter()
            .map(|event| {
                TraceEvent::new(
                    event.source_elapsed,
                    event.activity.clone().unwrap_or_default(),
                )
            })
            .collect();
        Ok(QueryTrace::new(operation, Some(session_id), events))
    }
}

impl PositionStore for CassandraStore {
    async fn ensure_schema(&self) -> Result<(), DbError> {
        let policy = self.consistency;

        let create_keyspace = self
            .prepare(
                self.table.create_keyspace_cql(self.replication_factor),
                policy.keyspace_ddl,
            )
            .await?;
        let mut keyspace_trace: Vec<QueryTrace> = Vec::new();
        self.execute(
            "create_keyspace",
            &create_keyspace,
            (),
            Some(&mut keyspace_trace as &mut dyn TraceSink),
        )
        .await?;
        for trace in &keyspace_trace {
            tracing::debug!(
                session = ?trace.session_id,
                events = trace.events.len(),
                trace = %trace.render(),
                "Keyspace creation trace"
            );
        }

        let create_table = self
            .prepare(POSITION_TABLE.create_cql(&self.table), policy.table_ddl)
            .await?;
        self.execute("create_table", &create_table, (), None).await?;

        tracing::info!(
            table = %self.table,
            replication_factor = self.replication_factor,
            "Schema ensured"
        );
        Ok(())
    }

    async fn write_position(
        &self,
        position: &NewPosition,
        trace: Option<&mut dyn TraceSink>,
    ) -> Result<(), DbError> {
        let statements = self.statements().await?;
        let bird_id = position.bird_id.as_str();
        let species = position.species.as_str();
        let Coordinates {
            latitude,
            longitude,
        } = position.coordinates;

        match position.observed_at {
            None => {
                self.execute(
                    "insert",
                    &statements.insert_server_time,
                    (bird_id, position.bucket_date, latitude, longitude, species),
                    trace,
                )
                .await?;
            }
            Some(observed_at) => {
                let ts = CqlTimeuuid::from(observed_at.into_inner());
                self.execute(
                    "insert",
                    &statements.insert_client_time,
                    (bird_id, position.bucket_date, ts, latitude, longitude, species),
                    trace,
                )
                .await?;
            }
        }

        tracing::debug!(bird_id, bucket_date = %position.bucket_date, "Position written");
        Ok(())
    }

    async fn list_known_birds(&self) -> Result<Vec<BirdId>, DbError> {
        let statements = self.statements().await?;
        let result = self
            .execute("select_distinct", &statements.select_distinct, (), None)
            .await?;
        let rows = result.into_rows_result()?;

        let mut birds = BTreeSet::new();
        for row in rows.rows::<(String, NaiveDate)>()? {
            let (bird_id, _bucket_date) = row?;
            birds.insert(BirdId::from(bird_id));
        }

        tracing::debug!(count = birds.len(), "Known birds discovered");
        Ok(birds.into_iter().collect())
    }

    async fn get_latest(
        &self,
        bird_id: &BirdId,
        bucket_date: NaiveDate,
        limit: u32,
        trace: Option<&mut dyn TraceSink>,
    ) -> Result<Vec<PositionRecord>, DbError> {
        let statements = self.statements().await?;
        let limit = i32::try_from(limit)
            .map_err(|e| DbError::Config(format!("read limit {limit} out of range: {e}")))?;
        let result = self
            .execute(
                "select_latest",
                &statements.select_latest,
                (bird_id.as_str(), bucket_date, limit),
                trace,
            )
            .await?;
        let rows = result.into_rows_result()?;

        let mut records = Vec::new();
        for row in rows.rows::<(String, NaiveDate, CqlTimeuuid, String, f64, f64)>()? {
            let (id, date, ts, species, latitude, longitude) = row?;
            let observed_at = TimeUuid::from_uuid(Uuid::from(ts))
                .ok_or_else(|| DbError::InvalidRow(format!("ts of {id} is not a time UUID")))?;
            records.push(PositionRecord {
                bird_id: BirdId::from(id),
                bucket_date: date,
                observed_at,
                species,
                latitude,
                longitude,
            });
        }
        Ok(records)
    }
}
