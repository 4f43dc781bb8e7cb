//! Concurrent ingestion and reads against one shared repository.

mod support;

use std::sync::Arc;

use constellation_store::api::SatelliteFilter;
use constellation_store::db::repositories::LocalRepository;
use constellation_store::services::{IngestionPipeline, QueryService};

use support::full_shell_document;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_imports_are_independent() {
    let repo = Arc::new(LocalRepository::new());
    let pipeline = IngestionPipeline::new(repo.clone());

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move {
                pipeline
                    .import_value(full_shell_document(&format!("parallel-{}", i), 4, 6))
                    .await
            })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        let summary = handle.await.unwrap().unwrap();
        assert_eq!(summary.satellites_count, 24);
        ids.push(summary.scenario_id);
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 16);
    assert_eq!(repo.satellite_count(), 16 * 24);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_never_observe_partial_satellite_sets() {
    let repo = Arc::new(LocalRepository::new());
    let pipeline = IngestionPipeline::new(repo.clone());
    let query = QueryService::new(repo.clone());

    let writer = tokio::spawn(async move {
        for i in 0..20 {
            pipeline
                .import_value(full_shell_document(&format!("w{}", i), 5, 8))
                .await
                .unwrap();
        }
    });

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let query = query.clone();
            tokio::spawn(async move {
                for _ in 0..50 {
                    for summary in query.list_scenarios().await.unwrap() {
                        assert_eq!(summary.satellites_count, 40);
                        let sats = query.get_satellites_of_scenario(summary.id).await.unwrap();
                        assert_eq!(sats.len(), 40);
                    }
                    let all = query.list_satellites(SatelliteFilter::all()).await.unwrap();
                    assert_eq!(all.len() % 40, 0);
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }
    assert_eq!(repo.scenario_count(), 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failed_imports_interleaved_with_good_ones() {
    let repo = Arc::new(LocalRepository::new());
    let pipeline = IngestionPipeline::new(repo.clone());

    let handles: Vec<_> = (0..12)
        .map(|i| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move {
                let mut doc = full_shell_document(&format!("mixed-{}", i), 2, 2);
                if i % 3 == 0 {
                    doc["satellites"][3]["planeIndex"] = serde_json::json!(7);
                }
                pipeline.import_value(doc).await.is_ok()
            })
        })
        .collect();

    let mut stored = 0;
    for handle in handles {
        if handle.await.unwrap() {
            stored += 1;
        }
    }
    assert_eq!(stored, 8);
    assert_eq!(repo.scenario_count(), 8);
    assert_eq!(repo.satellite_count(), 8 * 4);
}
