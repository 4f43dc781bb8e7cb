//! Postgres repository implementation using Diesel.
//!
//! ## Features
//!
//! - Connection pooling with r2d2
//! - Serializable ingestion transactions with chunked multi-row inserts
//! - Snapshot-consistent listings (read-only, repeatable-read transactions)
//! - Connection health monitoring
//! - Automatic migration execution
//!
//! Failed operations are never retried here. A transaction aborted by the
//! server surfaces as a retryable [`RepositoryError::ConnectivityError`] and the
//! caller decides whether to run it again.
//!
//! ## Configuration
//!
//! See [`PostgresConfig`](crate::db::PostgresConfig) for the environment
//! variables understood by `PostgresConfig::from_env`.

use async_trait::async_trait;
use diesel::dsl::{count_star, max};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task;

use crate::api::{
    ImportSummary, NewSatellite, Satellite, SatelliteFields, SatelliteFilter, SatelliteId,
    Scenario, ScenarioFields, ScenarioId,
};
use crate::db::config::{clamp_bulk_insert_rows, PostgresConfig};
use crate::db::repository::{
    ErrorContext, RepositoryError, RepositoryResult, SatelliteRepository, ScenarioRepository,
};
use crate::models::validation::{
    shell_shrink_error, validate_import_rows, validate_slot, ShellBounds,
};

mod models;
mod schema;

use models::*;
use schema::*;

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

/// Pool health statistics.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Number of connections currently in use
    pub connections_in_use: u32,
    /// Number of idle connections
    pub idle_connections: u32,
    /// Total number of connections in the pool
    pub total_connections: u32,
    /// Maximum pool size
    pub max_size: u32,
    /// Total operations executed
    pub total_queries: u64,
    /// Total failed operations
    pub failed_queries: u64,
}

/// Diesel-backed repository for Postgres.
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
    // Metrics counters
    total_queries: Arc<AtomicU64>,
    failed_queries: Arc<AtomicU64>,
}

impl PostgresRepository {
    /// Create a new repository and run pending migrations.
    ///
    /// This blocks while the pool connects; async callers should go through
    /// [`RepositoryFactory::create_postgres`](crate::db::RepositoryFactory::create_postgres).
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true)
            .build(manager)
            .map_err(|e| {
                RepositoryError::connectivity_with_context(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        {
            let mut conn = pool.get().map_err(|e| {
                RepositoryError::connectivity_with_context(
                    e.to_string(),
                    ErrorContext::new("get_connection_for_migrations"),
                )
            })?;
            Self::run_migrations(&mut conn)?;
        }

        log::info!(
            "Postgres repository ready (pool max={}, bulk insert rows={})",
            config.max_pool_size,
            config.bulk_insert_chunk_rows
        );

        Ok(Self {
            pool,
            config,
            total_queries: Arc::new(AtomicU64::new(0)),
            failed_queries: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Run pending database migrations.
    fn run_migrations(conn: &mut PgConnection) -> RepositoryResult<()> {
        let applied = conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Migration failed: {}", e),
                ErrorContext::new("run_migrations"),
            )
        })?;
        if !applied.is_empty() {
            log::info!("Applied {} database migration(s)", applied.len());
        }
        Ok(())
    }

    /// Run a blocking database operation on a pooled connection.
    ///
    /// The closure runs on the blocking thread pool. Errors are tagged with
    /// `operation` unless they already name one.
    async fn with_conn<T, F>(&self, operation: &'static str, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        let total_queries = self.total_queries.clone();
        let failed_queries = self.failed_queries.clone();

        task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| {
                failed_queries.fetch_add(1, Ordering::Relaxed);
                RepositoryError::connectivity_with_context(
                    e.to_string(),
                    ErrorContext::new(operation).with_details("pool_error"),
                )
            })?;

            total_queries.fetch_add(1, Ordering::Relaxed);
            f(&mut conn).map_err(|e| {
                failed_queries.fetch_add(1, Ordering::Relaxed);
                e.with_operation(operation)
            })
        })
        .await
        .map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new(operation),
            )
        })?
    }

    /// Get pool health statistics.
    pub fn get_pool_stats(&self) -> PoolStats {
        let state = self.pool.state();
        PoolStats {
            connections_in_use: state.connections - state.idle_connections,
            idle_connections: state.idle_connections,
            total_connections: state.connections,
            max_size: self.config.max_pool_size,
            total_queries: self.total_queries.load(Ordering::Relaxed),
            failed_queries: self.failed_queries.load(Ordering::Relaxed),
        }
    }

    /// Check if the database connection is healthy.
    pub async fn is_healthy(&self) -> bool {
        self.health_check().await.unwrap_or(false)
    }

    /// Get detailed health information.
    ///
    /// Returns a tuple of (is_healthy, latency_ms, error_message).
    pub async fn health_check_detailed(&self) -> (bool, Option<u64>, Option<String>) {
        let start = Instant::now();
        match self.health_check().await {
            Ok(true) => (true, Some(start.elapsed().as_millis() as u64), None),
            Ok(false) => (
                false,
                Some(start.elapsed().as_millis() as u64),
                Some("Health check returned false".to_string()),
            ),
            Err(e) => (
                false,
                Some(start.elapsed().as_millis() as u64),
                Some(e.to_string()),
            ),
        }
    }
}

fn map_diesel_error(err: diesel::result::Error) -> RepositoryError {
    RepositoryError::from(err)
}

/// Lock a scenario row and return its shell, or fail if it is missing.
fn lock_owner_shell(
    conn: &mut PgConnection,
    operation: &str,
    scenario_id: ScenarioId,
) -> RepositoryResult<ShellBounds> {
    let shell: Option<(i32, i32)> = scenarios::table
        .find(scenario_id.0)
        .select((scenarios::n_planes, scenarios::n_sats_per_plane))
        .for_share()
        .first(conn)
        .optional()
        .map_err(map_diesel_error)?;

    shell
        .map(|(n_planes, n_sats_per_plane)| ShellBounds {
            n_planes,
            n_sats_per_plane,
        })
        .ok_or_else(|| RepositoryError::missing_owner(operation, scenario_id))
}

fn scenario_exists(conn: &mut PgConnection, scenario_id: ScenarioId) -> RepositoryResult<bool> {
    diesel::select(diesel::dsl::exists(scenarios::table.find(scenario_id.0)))
        .get_result(conn)
        .map_err(map_diesel_error)
}

fn load_satellites(
    conn: &mut PgConnection,
    scenario_id: Option<ScenarioId>,
) -> RepositoryResult<Vec<Satellite>> {
    let mut query = satellites::table
        .select(SatelliteRow::as_select())
        .order((
            satellites::plane_index.asc(),
            satellites::sat_index_in_plane.asc(),
            satellites::id.asc(),
        ))
        .into_boxed();
    if let Some(id) = scenario_id {
        query = query.filter(satellites::scenario_id.eq(id.0));
    }

    let rows = query
        .load::<SatelliteRow>(conn)
        .map_err(map_diesel_error)?;
    Ok(rows.into_iter().map(Satellite::from).collect())
}

#[async_trait]
impl ScenarioRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn("health_check", |conn| {
            sql_query("SELECT 1")
                .execute(conn)
                .map(|_| true)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn store_scenario_with_satellites(
        &self,
        scenario: &ScenarioFields,
        satellites: &[SatelliteFields],
    ) -> RepositoryResult<ImportSummary> {
        const OP: &str = "store_scenario_with_satellites";
        validate_import_rows(scenario, satellites, OP)?;

        let new_scenario = NewScenarioRow::from(scenario);
        let satellites = satellites.to_vec();
        let chunk_size = clamp_bulk_insert_rows(self.config.bulk_insert_chunk_rows);

        self.with_conn(OP, move |conn| {
            conn.build_transaction()
                .serializable()
                .run::<_, RepositoryError, _>(|tx| {
                    let scenario_id: i64 = diesel::insert_into(scenarios::table)
                        .values(&new_scenario)
                        .returning(scenarios::id)
                        .get_result(tx)?;
                    let scenario_id = ScenarioId(scenario_id);

                    let rows: Vec<NewSatelliteRow> = satellites
                        .iter()
                        .map(|fields| NewSatelliteRow::new(scenario_id, fields))
                        .collect();

                    let mut written = 0usize;
                    for chunk in rows.chunks(chunk_size) {
                        written += diesel::insert_into(satellites::table)
                            .values(chunk)
                            .execute(tx)?;
                        log::debug!(
                            "Scenario {}: inserted {}/{} satellites",
                            scenario_id,
                            written,
                            rows.len()
                        );
                    }

                    Ok(ImportSummary {
                        scenario_id,
                        satellites_count: written,
                    })
                })
        })
        .await
    }

    async fn create_scenario(&self, scenario: &ScenarioFields) -> RepositoryResult<Scenario> {
        let row = NewScenarioRow::from(scenario);
        self.with_conn("create_scenario", move |conn| {
            let inserted = diesel::insert_into(scenarios::table)
                .values(&row)
                .returning(ScenarioRow::as_returning())
                .get_result::<ScenarioRow>(conn)
                .map_err(map_diesel_error)?;
            Ok(Scenario::from(inserted))
        })
        .await
    }

    async fn get_scenario(&self, scenario_id: ScenarioId) -> RepositoryResult<Scenario> {
        self.with_conn("get_scenario", move |conn| {
            scenarios::table
                .find(scenario_id.0)
                .select(ScenarioRow::as_select())
                .first::<ScenarioRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(Scenario::from)
                .ok_or_else(|| RepositoryError::scenario_not_found("get_scenario", scenario_id))
        })
        .await
    }

    async fn list_scenarios_with_counts(&self) -> RepositoryResult<Vec<(Scenario, i64)>> {
        self.with_conn("list_scenarios", |conn| {
            conn.build_transaction()
                .read_only()
                .repeatable_read()
                .run::<_, RepositoryError, _>(|tx| {
                    let rows = scenarios::table
                        .select(ScenarioRow::as_select())
                        .order(scenarios::id.desc())
                        .load::<ScenarioRow>(tx)?;

                    let counts: HashMap<i64, i64> = satellites::table
                        .group_by(satellites::scenario_id)
                        .select((satellites::scenario_id, count_star()))
                        .load::<(i64, i64)>(tx)?
                        .into_iter()
                        .collect();

                    Ok(rows
                        .into_iter()
                        .map(|row| {
                            let count = counts.get(&row.id).copied().unwrap_or(0);
                            (Scenario::from(row), count)
                        })
                        .collect())
                })
        })
        .await
    }

    async fn count_satellites(&self, scenario_id: ScenarioId) -> RepositoryResult<i64> {
        self.with_conn("count_satellites", move |conn| {
            conn.build_transaction()
                .read_only()
                .repeatable_read()
                .run::<_, RepositoryError, _>(|tx| {
                    if !scenario_exists(tx, scenario_id)? {
                        return Err(RepositoryError::scenario_not_found(
                            "count_satellites",
                            scenario_id,
                        ));
                    }
                    Ok(satellites::table
                        .filter(satellites::scenario_id.eq(scenario_id.0))
                        .count()
                        .get_result::<i64>(tx)?)
                })
        })
        .await
    }

    async fn update_scenario(
        &self,
        scenario_id: ScenarioId,
        scenario: &ScenarioFields,
    ) -> RepositoryResult<Scenario> {
        const OP: &str = "update_scenario";
        let row = NewScenarioRow::from(scenario);
        let shell = ShellBounds::of(scenario);

        self.with_conn(OP, move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| {
                let locked: Option<i64> = scenarios::table
                    .find(scenario_id.0)
                    .select(scenarios::id)
                    .for_update()
                    .first(tx)
                    .optional()?;
                if locked.is_none() {
                    return Err(RepositoryError::scenario_not_found(OP, scenario_id));
                }

                let (max_plane, max_slot): (Option<i32>, Option<i32>) = satellites::table
                    .filter(satellites::scenario_id.eq(scenario_id.0))
                    .select((
                        max(satellites::plane_index),
                        max(satellites::sat_index_in_plane),
                    ))
                    .first(tx)?;
                if let Some(err) = shell_shrink_error(OP, shell, max_plane, max_slot) {
                    return Err(err);
                }

                let updated = diesel::update(scenarios::table.find(scenario_id.0))
                    .set(&row)
                    .returning(ScenarioRow::as_returning())
                    .get_result::<ScenarioRow>(tx)?;
                Ok(Scenario::from(updated))
            })
        })
        .await
    }

    async fn delete_scenario(&self, scenario_id: ScenarioId) -> RepositoryResult<usize> {
        const OP: &str = "delete_scenario";
        self.with_conn(OP, move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| {
                let locked: Option<i64> = scenarios::table
                    .find(scenario_id.0)
                    .select(scenarios::id)
                    .for_update()
                    .first(tx)
                    .optional()?;
                if locked.is_none() {
                    return Err(RepositoryError::scenario_not_found(OP, scenario_id));
                }

                // Satellites go with the scenario through ON DELETE CASCADE.
                let owned = satellites::table
                    .filter(satellites::scenario_id.eq(scenario_id.0))
                    .count()
                    .get_result::<i64>(tx)?;
                diesel::delete(scenarios::table.find(scenario_id.0)).execute(tx)?;
                Ok(owned as usize)
            })
        })
        .await
    }
}

#[async_trait]
impl SatelliteRepository for PostgresRepository {
    async fn create_satellite(&self, satellite: &NewSatellite) -> RepositoryResult<Satellite> {
        const OP: &str = "create_satellite";
        let satellite = satellite.clone();
        self.with_conn(OP, move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| {
                let shell = lock_owner_shell(tx, OP, satellite.scenario_id)?;
                validate_slot(&satellite.fields, shell, OP)?;

                let inserted = diesel::insert_into(satellites::table)
                    .values(&NewSatelliteRow::from(&satellite))
                    .returning(SatelliteRow::as_returning())
                    .get_result::<SatelliteRow>(tx)?;
                Ok(Satellite::from(inserted))
            })
        })
        .await
    }

    async fn get_satellite(&self, satellite_id: SatelliteId) -> RepositoryResult<Satellite> {
        self.with_conn("get_satellite", move |conn| {
            satellites::table
                .find(satellite_id.0)
                .select(SatelliteRow::as_select())
                .first::<SatelliteRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(Satellite::from)
                .ok_or_else(|| RepositoryError::satellite_not_found("get_satellite", satellite_id))
        })
        .await
    }

    async fn find_satellite(
        &self,
        scenario_id: ScenarioId,
        sat_id: &str,
    ) -> RepositoryResult<Satellite> {
        let sat_id = sat_id.to_string();
        self.with_conn("find_satellite", move |conn| {
            satellites::table
                .filter(satellites::scenario_id.eq(scenario_id.0))
                .filter(satellites::sat_id.eq(&sat_id))
                .select(SatelliteRow::as_select())
                .first::<SatelliteRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(Satellite::from)
                .ok_or_else(|| {
                    RepositoryError::not_found_with_context(
                        format!("Satellite '{}' not found in scenario {}", sat_id, scenario_id),
                        ErrorContext::new("find_satellite")
                            .with_entity("satellite")
                            .with_entity_id(&sat_id),
                    )
                })
        })
        .await
    }

    async fn list_satellites(&self, filter: SatelliteFilter) -> RepositoryResult<Vec<Satellite>> {
        self.with_conn("list_satellites", move |conn| {
            load_satellites(conn, filter.scenario_id)
        })
        .await
    }

    async fn get_satellites_for_scenario(
        &self,
        scenario_id: ScenarioId,
    ) -> RepositoryResult<Vec<Satellite>> {
        const OP: &str = "get_satellites_for_scenario";
        self.with_conn(OP, move |conn| {
            conn.build_transaction()
                .read_only()
                .repeatable_read()
                .run::<_, RepositoryError, _>(|tx| {
                    if !scenario_exists(tx, scenario_id)? {
                        return Err(RepositoryError::scenario_not_found(OP, scenario_id));
                    }
                    load_satellites(tx, Some(scenario_id))
                })
        })
        .await
    }

    async fn update_satellite(
        &self,
        satellite_id: SatelliteId,
        satellite: &NewSatellite,
    ) -> RepositoryResult<Satellite> {
        const OP: &str = "update_satellite";
        let satellite = satellite.clone();
        self.with_conn(OP, move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| {
                let current: Option<i64> = satellites::table
                    .find(satellite_id.0)
                    .select(satellites::id)
                    .for_update()
                    .first(tx)
                    .optional()?;
                if current.is_none() {
                    return Err(RepositoryError::satellite_not_found(OP, satellite_id));
                }

                let shell = lock_owner_shell(tx, OP, satellite.scenario_id)?;
                validate_slot(&satellite.fields, shell, OP)?;

                let updated = diesel::update(satellites::table.find(satellite_id.0))
                    .set(&NewSatelliteRow::from(&satellite))
                    .returning(SatelliteRow::as_returning())
                    .get_result::<SatelliteRow>(tx)?;
                Ok(Satellite::from(updated))
            })
        })
        .await
    }

    async fn delete_satellite(&self, satellite_id: SatelliteId) -> RepositoryResult<()> {
        self.with_conn("delete_satellite", move |conn| {
            let deleted = diesel::delete(satellites::table.find(satellite_id.0))
                .execute(conn)
                .map_err(map_diesel_error)?;
            if deleted == 0 {
                return Err(RepositoryError::satellite_not_found(
                    "delete_satellite",
                    satellite_id,
                ));
            }
            Ok(())
        })
        .await
    }
}
