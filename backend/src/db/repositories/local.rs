//! In-memory local repository implementation.
//!
//! This module provides a local implementation of the repository traits
//! suitable for unit testing and local development. All data lives in ordered
//! maps behind a single lock, which gives the same all-or-nothing visibility
//! as a database transaction: an ingestion stages and checks every row first
//! and publishes them under one write guard.
//!
//! Two secondary indexes mirror the Postgres ones: `(scenario, sat_id)` for
//! lookups by external identifier and `(scenario, plane, slot, id)` for the
//! ordered satellite set of a scenario.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;
use std::sync::Arc;

use crate::api::*;
use crate::db::repository::*;
use crate::models::validation::{
    shell_shrink_error, validate_import_rows, validate_slot, ShellBounds,
};

/// In-memory local repository.
///
/// # Example
/// ```
/// use constellation_store::db::repositories::LocalRepository;
///
/// let repo = LocalRepository::new();
/// assert_eq!(repo.scenario_count(), 0);
/// ```
#[derive(Clone)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

type SlotKey = (ScenarioId, i32, i32, SatelliteId);

struct LocalData {
    scenarios: BTreeMap<ScenarioId, ScenarioFields>,
    satellites: BTreeMap<SatelliteId, Satellite>,

    // Secondary indexes
    by_sat_id: BTreeMap<(ScenarioId, String), SatelliteId>,
    by_slot: BTreeSet<SlotKey>,

    // ID counters
    next_scenario_id: i64,
    next_satellite_id: i64,

    // Connection health
    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            scenarios: BTreeMap::new(),
            satellites: BTreeMap::new(),
            by_sat_id: BTreeMap::new(),
            by_slot: BTreeSet::new(),
            next_scenario_id: 1,
            next_satellite_id: 1,
            is_healthy: true,
        }
    }
}

fn slot_key(satellite: &Satellite) -> SlotKey {
    (
        satellite.scenario_id,
        satellite.fields.plane_index,
        satellite.fields.sat_index_in_plane,
        satellite.id,
    )
}

fn scenario_slots(scenario_id: ScenarioId) -> RangeInclusive<SlotKey> {
    (scenario_id, i32::MIN, i32::MIN, SatelliteId(i64::MIN))
        ..=(scenario_id, i32::MAX, i32::MAX, SatelliteId(i64::MAX))
}

impl LocalData {
    fn check_health(&self, operation: &str) -> RepositoryResult<()> {
        if !self.is_healthy {
            return Err(RepositoryError::connectivity_with_context(
                "Store is not reachable",
                ErrorContext::new(operation),
            ));
        }
        Ok(())
    }

    fn scenario(&self, operation: &str, id: ScenarioId) -> RepositoryResult<&ScenarioFields> {
        self.scenarios
            .get(&id)
            .ok_or_else(|| RepositoryError::scenario_not_found(operation, id))
    }

    /// Slot index entries of one scenario, in (plane, slot, id) order.
    fn owned_slots(&self, scenario_id: ScenarioId) -> impl DoubleEndedIterator<Item = &SlotKey> {
        self.by_slot.range(scenario_slots(scenario_id))
    }

    fn owned_count(&self, scenario_id: ScenarioId) -> usize {
        self.owned_slots(scenario_id).count()
    }

    /// The satellites of one scenario, ordered by slot.
    fn owned_sorted(&self, scenario_id: ScenarioId) -> Vec<Satellite> {
        let owned: Vec<Satellite> = self
            .owned_slots(scenario_id)
            .filter_map(|(_, _, _, id)| self.satellites.get(id).cloned())
            .collect();
        owned
    }

    fn lookup_sat_id(&self, scenario_id: ScenarioId, sat_id: &str) -> Option<SatelliteId> {
        self.by_sat_id
            .get(&(scenario_id, sat_id.to_string()))
            .copied()
    }

    fn sorted(mut satellites: Vec<Satellite>) -> Vec<Satellite> {
        satellites.sort_by_key(|s| (s.fields.plane_index, s.fields.sat_index_in_plane, s.id));
        satellites
    }

    /// Check a satellite row against its owner: owner exists, slot inside the
    /// shell, `sat_id` unused by any other satellite of that owner.
    fn check_satellite(
        &self,
        operation: &str,
        satellite: &NewSatellite,
        existing: Option<SatelliteId>,
    ) -> RepositoryResult<()> {
        let owner = self
            .scenarios
            .get(&satellite.scenario_id)
            .ok_or_else(|| RepositoryError::missing_owner(operation, satellite.scenario_id))?;
        validate_slot(&satellite.fields, ShellBounds::of(owner), operation)?;

        match self.lookup_sat_id(satellite.scenario_id, &satellite.fields.sat_id) {
            Some(holder) if Some(holder) != existing => Err(RepositoryError::duplicate_sat_id(
                operation,
                satellite.scenario_id,
                &satellite.fields.sat_id,
            )),
            _ => Ok(()),
        }
    }

    fn insert_satellite(&mut self, satellite: Satellite) {
        self.by_sat_id.insert(
            (satellite.scenario_id, satellite.fields.sat_id.clone()),
            satellite.id,
        );
        self.by_slot.insert(slot_key(&satellite));
        self.satellites.insert(satellite.id, satellite);
    }

    fn remove_satellite(&mut self, id: SatelliteId) -> Option<Satellite> {
        let removed = self.satellites.remove(&id)?;
        self.by_sat_id
            .remove(&(removed.scenario_id, removed.fields.sat_id.clone()));
        self.by_slot.remove(&slot_key(&removed));
        Some(removed)
    }

    fn allocate_scenario_id(&mut self) -> ScenarioId {
        let id = ScenarioId(self.next_scenario_id);
        self.next_scenario_id += 1;
        id
    }

    fn allocate_satellite_id(&mut self) -> SatelliteId {
        let id = SatelliteId(self.next_satellite_id);
        self.next_satellite_id += 1;
        id
    }
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
        }
    }

    /// Set the health status for testing connection failures.
    ///
    /// While unhealthy every operation fails with a retryable
    /// [`RepositoryError::ConnectivityError`].
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    /// Clear all data from the repository.
    pub fn clear(&self) {
        let mut data = self.data.write();
        *data = LocalData {
            is_healthy: data.is_healthy,
            ..Default::default()
        };
    }

    /// Get the number of scenarios stored.
    pub fn scenario_count(&self) -> usize {
        self.data.read().scenarios.len()
    }

    /// Get the number of satellites stored across all scenarios.
    pub fn satellite_count(&self) -> usize {
        self.data.read().satellites.len()
    }

    /// Check if a scenario exists.
    pub fn has_scenario(&self, scenario_id: ScenarioId) -> bool {
        self.data.read().scenarios.contains_key(&scenario_id)
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScenarioRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.data.read().is_healthy)
    }

    async fn store_scenario_with_satellites(
        &self,
        scenario: &ScenarioFields,
        satellites: &[SatelliteFields],
    ) -> RepositoryResult<ImportSummary> {
        const OP: &str = "store_scenario_with_satellites";
        let mut data = self.data.write();
        data.check_health(OP)?;

        // Stage: check every row before anything is published.
        validate_import_rows(scenario, satellites, OP)?;

        // Publish under the same guard.
        let scenario_id = data.allocate_scenario_id();
        data.scenarios.insert(scenario_id, scenario.clone());
        for fields in satellites {
            let id = data.allocate_satellite_id();
            data.insert_satellite(Satellite {
                id,
                scenario_id,
                fields: fields.clone(),
            });
        }

        log::debug!(
            "Stored scenario {} with {} satellites in memory",
            scenario_id,
            satellites.len()
        );
        Ok(ImportSummary {
            scenario_id,
            satellites_count: satellites.len(),
        })
    }

    async fn create_scenario(&self, scenario: &ScenarioFields) -> RepositoryResult<Scenario> {
        let mut data = self.data.write();
        data.check_health("create_scenario")?;
        let id = data.allocate_scenario_id();
        data.scenarios.insert(id, scenario.clone());
        Ok(Scenario {
            id,
            fields: scenario.clone(),
        })
    }

    async fn get_scenario(&self, scenario_id: ScenarioId) -> RepositoryResult<Scenario> {
        let data = self.data.read();
        data.check_health("get_scenario")?;
        let fields = data.scenario("get_scenario", scenario_id)?.clone();
        Ok(Scenario {
            id: scenario_id,
            fields,
        })
    }

    async fn list_scenarios_with_counts(&self) -> RepositoryResult<Vec<(Scenario, i64)>> {
        let data = self.data.read();
        data.check_health("list_scenarios")?;

        let listed: Vec<(Scenario, i64)> = data
            .scenarios
            .iter()
            .rev()
            .map(|(id, fields)| {
                (
                    Scenario {
                        id: *id,
                        fields: fields.clone(),
                    },
                    data.owned_count(*id) as i64,
                )
            })
            .collect();
        Ok(listed)
    }

    async fn count_satellites(&self, scenario_id: ScenarioId) -> RepositoryResult<i64> {
        let data = self.data.read();
        data.check_health("count_satellites")?;
        data.scenario("count_satellites", scenario_id)?;
        let count = data.owned_count(scenario_id) as i64;
        Ok(count)
    }

    async fn update_scenario(
        &self,
        scenario_id: ScenarioId,
        scenario: &ScenarioFields,
    ) -> RepositoryResult<Scenario> {
        const OP: &str = "update_scenario";
        let mut data = self.data.write();
        data.check_health(OP)?;
        data.scenario(OP, scenario_id)?;

        // Slot entries are ordered by plane, so the last one holds the highest plane.
        let max_plane = data.owned_slots(scenario_id).next_back().map(|k| k.1);
        let max_slot = data.owned_slots(scenario_id).map(|k| k.2).max();
        if let Some(err) = shell_shrink_error(OP, ShellBounds::of(scenario), max_plane, max_slot) {
            return Err(err);
        }

        data.scenarios.insert(scenario_id, scenario.clone());
        Ok(Scenario {
            id: scenario_id,
            fields: scenario.clone(),
        })
    }

    async fn delete_scenario(&self, scenario_id: ScenarioId) -> RepositoryResult<usize> {
        let mut data = self.data.write();
        data.check_health("delete_scenario")?;
        if data.scenarios.remove(&scenario_id).is_none() {
            return Err(RepositoryError::scenario_not_found(
                "delete_scenario",
                scenario_id,
            ));
        }
        let owned: Vec<SatelliteId> = data.owned_slots(scenario_id).map(|k| k.3).collect();
        for id in &owned {
            data.remove_satellite(*id);
        }
        Ok(owned.len())
    }
}

#[async_trait]
impl SatelliteRepository for LocalRepository {
    async fn create_satellite(&self, satellite: &NewSatellite) -> RepositoryResult<Satellite> {
        const OP: &str = "create_satellite";
        let mut data = self.data.write();
        data.check_health(OP)?;
        data.check_satellite(OP, satellite, None)?;

        let id = data.allocate_satellite_id();
        let row = Satellite {
            id,
            scenario_id: satellite.scenario_id,
            fields: satellite.fields.clone(),
        };
        data.insert_satellite(row.clone());
        Ok(row)
    }

    async fn get_satellite(&self, satellite_id: SatelliteId) -> RepositoryResult<Satellite> {
        let data = self.data.read();
        data.check_health("get_satellite")?;
        let found = data.satellites.get(&satellite_id).cloned();
        found.ok_or_else(|| RepositoryError::satellite_not_found("get_satellite", satellite_id))
    }

    async fn find_satellite(
        &self,
        scenario_id: ScenarioId,
        sat_id: &str,
    ) -> RepositoryResult<Satellite> {
        let data = self.data.read();
        data.check_health("find_satellite")?;
        let found = data
            .lookup_sat_id(scenario_id, sat_id)
            .and_then(|id| data.satellites.get(&id).cloned());
        found.ok_or_else(|| {
            RepositoryError::not_found_with_context(
                format!("Satellite '{}' not found in scenario {}", sat_id, scenario_id),
                ErrorContext::new("find_satellite")
                    .with_entity("satellite")
                    .with_entity_id(sat_id),
            )
        })
    }

    async fn list_satellites(&self, filter: SatelliteFilter) -> RepositoryResult<Vec<Satellite>> {
        let data = self.data.read();
        data.check_health("list_satellites")?;
        let rows = match filter.scenario_id {
            Some(scenario_id) => data.owned_sorted(scenario_id),
            None => LocalData::sorted(data.satellites.values().cloned().collect()),
        };
        Ok(rows)
    }

    async fn get_satellites_for_scenario(
        &self,
        scenario_id: ScenarioId,
    ) -> RepositoryResult<Vec<Satellite>> {
        let data = self.data.read();
        data.check_health("get_satellites_for_scenario")?;
        data.scenario("get_satellites_for_scenario", scenario_id)?;
        let rows = data.owned_sorted(scenario_id);
        Ok(rows)
    }

    async fn update_satellite(
        &self,
        satellite_id: SatelliteId,
        satellite: &NewSatellite,
    ) -> RepositoryResult<Satellite> {
        const OP: &str = "update_satellite";
        let mut data = self.data.write();
        data.check_health(OP)?;
        if !data.satellites.contains_key(&satellite_id) {
            return Err(RepositoryError::satellite_not_found(OP, satellite_id));
        }
        data.check_satellite(OP, satellite, Some(satellite_id))?;

        let row = Satellite {
            id: satellite_id,
            scenario_id: satellite.scenario_id,
            fields: satellite.fields.clone(),
        };
        data.remove_satellite(satellite_id);
        data.insert_satellite(row.clone());
        Ok(row)
    }

    async fn delete_satellite(&self, satellite_id: SatelliteId) -> RepositoryResult<()> {
        let mut data = self.data.write();
        data.check_health("delete_satellite")?;
        match data.remove_satellite(satellite_id) {
            Some(_) => Ok(()),
            None => Err(RepositoryError::satellite_not_found(
                "delete_satellite",
                satellite_id,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(n_planes: i32, n_sats_per_plane: i32) -> ScenarioFields {
        ScenarioFields {
            name: "test".to_string(),
            epoch: "1 Jan 2025 00:00:00.000".to_string(),
            start_time: "1 Jan 2025 00:00:00.000".to_string(),
            end_time: "2 Jan 2025 00:00:00.000".to_string(),
            alt_km: 550.0,
            inc_deg: 53.0,
            n_planes,
            n_sats_per_plane,
            sensor_config: None,
        }
    }

    fn sat(plane: i32, slot: i32) -> SatelliteFields {
        SatelliteFields {
            sat_id: format!("SAT-{}-{}", plane, slot),
            stk_name: format!("Sat_{}_{}", plane, slot),
            plane_index: plane,
            sat_index_in_plane: slot,
            alt_km: 550.0,
            sma_km: 6928.137,
            ecc: 0.0,
            inc_deg: 53.0,
            raan_deg: 0.0,
            argp_deg: 0.0,
            ta_deg: 0.0,
        }
    }

    #[tokio::test]
    async fn test_health_check() {
        let repo = LocalRepository::new();
        assert!(repo.health_check().await.unwrap());

        repo.set_healthy(false);
        assert!(!repo.health_check().await.unwrap());
        let err = repo.create_scenario(&shell(1, 1)).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_store_orders_satellites_by_slot() {
        let repo = LocalRepository::new();
        let summary = repo
            .store_scenario_with_satellites(
                &shell(2, 2),
                &[sat(1, 1), sat(0, 1), sat(1, 0), sat(0, 0)],
            )
            .await
            .unwrap();
        assert_eq!(summary.satellites_count, 4);

        let slots: Vec<_> = repo
            .get_satellites_for_scenario(summary.scenario_id)
            .await
            .unwrap()
            .iter()
            .map(|s| s.fields.slot())
            .collect();
        assert_eq!(slots, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }

    #[tokio::test]
    async fn test_rejected_store_leaves_nothing() {
        let repo = LocalRepository::new();
        let err = repo
            .store_scenario_with_satellites(&shell(1, 2), &[sat(0, 0), sat(1, 0)])
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError { .. }));
        assert_eq!(err.context().record_index, Some(1));
        assert_eq!(repo.scenario_count(), 0);
        assert_eq!(repo.satellite_count(), 0);

        let mut dup = sat(0, 1);
        dup.sat_id = "SAT-0-0".to_string();
        let err = repo
            .store_scenario_with_satellites(&shell(1, 2), &[sat(0, 0), dup])
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ConstraintViolation { .. }));
        assert_eq!(repo.scenario_count(), 0);
    }

    #[tokio::test]
    async fn test_list_is_newest_first_with_counts() {
        let repo = LocalRepository::new();
        let first = repo
            .store_scenario_with_satellites(&shell(1, 2), &[sat(0, 0), sat(0, 1)])
            .await
            .unwrap();
        let second = repo.create_scenario(&shell(1, 1)).await.unwrap();

        let listed = repo.list_scenarios_with_counts().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].0.id, second.id);
        assert_eq!(listed[0].1, 0);
        assert_eq!(listed[1].0.id, first.scenario_id);
        assert_eq!(listed[1].1, 2);
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let repo = LocalRepository::new();
        let summary = repo
            .store_scenario_with_satellites(&shell(1, 2), &[sat(0, 0), sat(0, 1)])
            .await
            .unwrap();
        let sats = repo
            .get_satellites_for_scenario(summary.scenario_id)
            .await
            .unwrap();

        assert_eq!(repo.delete_scenario(summary.scenario_id).await.unwrap(), 2);
        for s in sats {
            assert!(repo.get_satellite(s.id).await.unwrap_err().is_not_found());
        }
        assert!(repo
            .delete_scenario(summary.scenario_id)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_update_scenario_cannot_strand_satellites() {
        let repo = LocalRepository::new();
        let summary = repo
            .store_scenario_with_satellites(&shell(2, 2), &[sat(1, 1)])
            .await
            .unwrap();
        let err = repo
            .update_scenario(summary.scenario_id, &shell(1, 2))
            .await
            .unwrap_err();
        assert_eq!(err.context().field.as_deref(), Some("n_planes"));

        let grown = repo
            .update_scenario(summary.scenario_id, &shell(3, 3))
            .await
            .unwrap();
        assert_eq!(grown.fields.n_planes, 3);
    }

    #[tokio::test]
    async fn test_satellite_constraints() {
        let repo = LocalRepository::new();
        let scenario = repo.create_scenario(&shell(1, 2)).await.unwrap();

        let missing = NewSatellite {
            scenario_id: ScenarioId(999),
            fields: sat(0, 0),
        };
        let err = repo.create_satellite(&missing).await.unwrap_err();
        assert!(matches!(err, RepositoryError::ConstraintViolation { .. }));

        let first = repo
            .create_satellite(&NewSatellite {
                scenario_id: scenario.id,
                fields: sat(0, 0),
            })
            .await
            .unwrap();

        let mut dup = sat(0, 1);
        dup.sat_id = first.fields.sat_id.clone();
        let err = repo
            .create_satellite(&NewSatellite {
                scenario_id: scenario.id,
                fields: dup,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ConstraintViolation { .. }));

        // Re-saving a satellite with its own sat_id is not a duplicate.
        let mut moved = first.fields.clone();
        moved.sat_index_in_plane = 1;
        let updated = repo
            .update_satellite(
                first.id,
                &NewSatellite {
                    scenario_id: scenario.id,
                    fields: moved,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.fields.slot(), (0, 1));
    }

    #[tokio::test]
    async fn test_unknown_scenario_filter_is_empty() {
        let repo = LocalRepository::new();
        let listed = repo
            .list_satellites(SatelliteFilter::for_scenario(ScenarioId(42)))
            .await
            .unwrap();
        assert!(listed.is_empty());
        assert!(repo
            .get_satellites_for_scenario(ScenarioId(42))
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_indexes_follow_moves_and_deletes() {
        let repo = LocalRepository::new();
        let a = repo.create_scenario(&shell(2, 2)).await.unwrap();
        let b = repo.create_scenario(&shell(2, 2)).await.unwrap();

        let row = repo
            .create_satellite(&NewSatellite {
                scenario_id: a.id,
                fields: sat(1, 1),
            })
            .await
            .unwrap();
        let found = repo.find_satellite(a.id, "SAT-1-1").await.unwrap();
        assert_eq!(found.id, row.id);

        // Move to another scenario under a new sat_id and slot.
        let mut fields = sat(0, 1);
        fields.sat_id = "MOVED".to_string();
        repo.update_satellite(
            row.id,
            &NewSatellite {
                scenario_id: b.id,
                fields,
            },
        )
        .await
        .unwrap();

        assert!(repo.find_satellite(a.id, "SAT-1-1").await.unwrap_err().is_not_found());
        assert_eq!(repo.find_satellite(b.id, "MOVED").await.unwrap().id, row.id);
        assert_eq!(repo.count_satellites(a.id).await.unwrap(), 0);
        assert_eq!(repo.count_satellites(b.id).await.unwrap(), 1);

        // The old sat_id is free again in the first scenario.
        repo.create_satellite(&NewSatellite {
            scenario_id: a.id,
            fields: sat(1, 1),
        })
        .await
        .unwrap();

        // Shrink checks only see the owning scenario's slots.
        let err = repo.update_scenario(a.id, &shell(1, 2)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError { .. }));
        repo.update_scenario(b.id, &shell(1, 2)).await.unwrap();

        repo.delete_satellite(row.id).await.unwrap();
        assert!(repo.find_satellite(b.id, "MOVED").await.unwrap_err().is_not_found());
        assert!(repo
            .get_satellites_for_scenario(b.id)
            .await
            .unwrap()
            .is_empty());

        assert_eq!(repo.delete_scenario(a.id).await.unwrap(), 1);
        assert!(repo.find_satellite(a.id, "SAT-1-1").await.unwrap_err().is_not_found());
        assert_eq!(repo.satellite_count(), 0);
    }
}
