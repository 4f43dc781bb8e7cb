//! Integration tests for the query service: listings, lookups and CRUD.

mod support;

use std::sync::Arc;

use constellation_store::api::{
    NewSatellite, SatelliteFilter, SatelliteId, SatellitePatch, ScenarioId, ScenarioPatch,
};
use constellation_store::db::repositories::LocalRepository;
use constellation_store::db::RepositoryError;
use constellation_store::services::{IngestionPipeline, QueryService};

use support::full_shell_document;

async fn seeded(shells: &[(&str, i64, i64)]) -> (QueryService, Vec<ScenarioId>) {
    let repo = Arc::new(LocalRepository::new());
    let pipeline = IngestionPipeline::new(repo.clone());
    let mut ids = Vec::new();
    for (name, planes, per_plane) in shells {
        let summary = pipeline
            .import_value(full_shell_document(name, *planes, *per_plane))
            .await
            .unwrap();
        ids.push(summary.scenario_id);
    }
    (QueryService::new(repo), ids)
}

#[tokio::test]
async fn test_list_reports_owned_counts_newest_first() {
    let (query, ids) = seeded(&[("alpha", 2, 2), ("beta", 3, 5), ("gamma", 1, 1)]).await;

    let listed = query.list_scenarios().await.unwrap();
    let names: Vec<&str> = listed.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["gamma", "beta", "alpha"]);

    for summary in &listed {
        let owned = query
            .list_satellites(SatelliteFilter::for_scenario(summary.id))
            .await
            .unwrap();
        assert_eq!(summary.satellites_count, owned.len() as i64);
    }
    assert_eq!(listed[1].id, ids[1]);
    assert_eq!(listed[1].satellites_count, 15);
}

#[tokio::test]
async fn test_counts_follow_satellite_mutations() {
    let (query, ids) = seeded(&[("counted", 2, 2)]).await;
    let sats = query.get_satellites_of_scenario(ids[0]).await.unwrap();

    query.delete_satellite(sats[0].id).await.unwrap();
    let listed = query.list_scenarios().await.unwrap();
    assert_eq!(listed[0].satellites_count, 3);
    assert_eq!(query.get_scenario(ids[0]).await.unwrap().satellites_count, 3);
}

#[tokio::test]
async fn test_delete_scenario_cascades_to_satellites() {
    let (query, ids) = seeded(&[("doomed", 2, 3), ("survivor", 1, 2)]).await;
    let doomed: Vec<SatelliteId> = query
        .get_satellites_of_scenario(ids[0])
        .await
        .unwrap()
        .iter()
        .map(|s| s.id)
        .collect();

    let removed = query.delete_scenario(ids[0]).await.unwrap();
    assert_eq!(removed, 6);

    for id in doomed {
        let err = query.get_satellite(id).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }
    assert!(query.get_scenario(ids[0]).await.unwrap_err().is_not_found());
    assert!(query
        .get_satellites_of_scenario(ids[0])
        .await
        .unwrap_err()
        .is_not_found());

    let rest = query.list_satellites(SatelliteFilter::all()).await.unwrap();
    assert_eq!(rest.len(), 2);
    assert!(rest.iter().all(|s| s.scenario_id == ids[1]));
}

#[tokio::test]
async fn test_unknown_identifiers_are_not_found() {
    let (query, _ids) = seeded(&[]).await;
    let missing = ScenarioId::new(404);

    assert!(query.get_scenario(missing).await.unwrap_err().is_not_found());
    assert!(query.delete_scenario(missing).await.unwrap_err().is_not_found());
    assert!(query
        .get_satellite(SatelliteId::new(404))
        .await
        .unwrap_err()
        .is_not_found());

    let err = query.get_scenario(missing).await.unwrap_err();
    assert_eq!(err.context().entity_id.as_deref(), Some("404"));
}

#[tokio::test]
async fn test_filter_by_scenario() {
    let (query, ids) = seeded(&[("one", 1, 3), ("two", 2, 1)]).await;

    let one = query
        .list_satellites(SatelliteFilter::for_scenario(ids[0]))
        .await
        .unwrap();
    assert_eq!(one.len(), 3);
    assert!(one.iter().all(|s| s.scenario_id == ids[0]));

    let none = query
        .list_satellites(SatelliteFilter::for_scenario(ScenarioId::new(999)))
        .await
        .unwrap();
    assert!(none.is_empty());

    let all = query.list_satellites(SatelliteFilter::all()).await.unwrap();
    assert_eq!(all.len(), 5);
}

#[tokio::test]
async fn test_find_satellite_by_external_id() {
    let (query, ids) = seeded(&[("a", 2, 2), ("b", 2, 2)]).await;

    let in_a = query.find_satellite(ids[0], "P1S0").await.unwrap();
    let in_b = query.find_satellite(ids[1], "P1S0").await.unwrap();
    assert_ne!(in_a.id, in_b.id);
    assert_eq!(in_a.fields.slot(), (1, 0));
    assert_eq!(in_a.fields.stk_name, "Sat_P1S0");

    assert!(query
        .find_satellite(ids[0], "P9S9")
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn test_create_satellite_enforces_owner_rules() {
    let (query, ids) = seeded(&[("partial", 2, 2)]).await;
    let template = query.find_satellite(ids[0], "P0S0").await.unwrap();

    // Taken sat_id
    let err = query
        .create_satellite(&NewSatellite {
            scenario_id: ids[0],
            fields: template.fields.clone(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::ConstraintViolation { .. }));

    // Missing owner
    let mut fields = template.fields.clone();
    fields.sat_id = "FRESH".to_string();
    let err = query
        .create_satellite(&NewSatellite {
            scenario_id: ScenarioId::new(77),
            fields: fields.clone(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::ConstraintViolation { .. }));

    // Outside the shell
    fields.plane_index = 2;
    let err = query
        .create_satellite(&NewSatellite {
            scenario_id: ids[0],
            fields,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::ValidationError { .. }));
    assert_eq!(err.context().field.as_deref(), Some("plane_index"));
}

#[tokio::test]
async fn test_patch_satellite_keeps_unchanged_fields() {
    let (query, ids) = seeded(&[("patched", 1, 2)]).await;
    let sat = query.find_satellite(ids[0], "P0S1").await.unwrap();

    let patched = query
        .patch_satellite(
            sat.id,
            SatellitePatch {
                stk_name: Some("Renamed".to_string()),
                ta_deg: Some(42.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(patched.fields.stk_name, "Renamed");
    assert_eq!(patched.fields.ta_deg, 42.0);
    assert_eq!(patched.fields.sat_id, "P0S1");
    assert_eq!(patched.fields.sma_km, sat.fields.sma_km);
    assert_eq!(patched.scenario_id, ids[0]);
}

#[tokio::test]
async fn test_shrinking_shell_below_owned_slots_is_rejected() {
    let (query, ids) = seeded(&[("shrink", 3, 3)]).await;

    let err = query
        .patch_scenario(
            ids[0],
            ScenarioPatch {
                n_planes: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::ValidationError { .. }));
    assert_eq!(query.get_scenario(ids[0]).await.unwrap().scenario.fields.n_planes, 3);

    let grown = query
        .patch_scenario(
            ids[0],
            ScenarioPatch {
                n_planes: Some(4),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(grown.fields.n_planes, 4);
}

#[tokio::test]
async fn test_update_scenario_replaces_every_attribute() {
    let (query, ids) = seeded(&[("before", 1, 1)]).await;
    let mut fields = query.get_scenario(ids[0]).await.unwrap().scenario.fields;
    fields.name = "after".to_string();
    fields.sensor_config = None;
    fields.alt_km = 1200.0;

    let updated = query.update_scenario(ids[0], &fields).await.unwrap();
    assert_eq!(updated.fields, fields);
    assert_eq!(query.get_scenario(ids[0]).await.unwrap().scenario, updated);
}
