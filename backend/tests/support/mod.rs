#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use serde_json::{json, Value};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// Restores the previous values on unwind and serializes access to the
/// process-global environment across parallel tests.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

// ============================================================================
// Document fixtures
// ============================================================================

/// One satellite entry in document form.
pub fn satellite_json(sat_id: &str, plane: i64, slot: i64) -> Value {
    json!({
        "satId": sat_id,
        "stkName": format!("Sat_{}", sat_id),
        "planeIndex": plane,
        "satIndexInPlane": slot,
        "orbit": {
            "altKm": 550.0,
            "smaKm": 6928.137,
            "ecc": 0.0001,
            "incDeg": 53.0,
            "raanDeg": (plane as f64 * 30.0) % 360.0,
            "argpDeg": 0.0,
            "taDeg": (slot as f64 * 15.0) % 360.0
        }
    })
}

/// Satellite id for a slot, `P<plane>S<slot>`.
pub fn sat_id(plane: i64, slot: i64) -> String {
    format!("P{}S{}", plane, slot)
}

/// A valid document for a `planes` x `per_plane` shell containing every slot.
///
/// Satellites are listed in reverse slot order so tests can check that reads
/// return them sorted.
pub fn full_shell_document(name: &str, planes: i64, per_plane: i64) -> Value {
    let mut satellites = Vec::new();
    for plane in (0..planes).rev() {
        for slot in (0..per_plane).rev() {
            satellites.push(satellite_json(&sat_id(plane, slot), plane, slot));
        }
    }
    document_with(name, planes, per_plane, satellites)
}

/// A document with the given shell and satellite list.
pub fn document_with(name: &str, planes: i64, per_plane: i64, satellites: Vec<Value>) -> Value {
    json!({
        "meta": {
            "scenario": name,
            "epoch": "1 Jan 2025 00:00:00.000 UTCG",
            "timePeriod": {
                "start": "1 Jan 2025 00:00:00.000",
                "end": "2 Jan 2025 00:00:00.000"
            },
            "constellation": {
                "altKm": 550.0,
                "incDeg": 53.0,
                "nPlanes": planes,
                "nSatsPerPlane": per_plane
            },
            "sensor": { "fovDeg": 30.0, "bands": ["vis", "nir"] }
        },
        "satellites": satellites
    })
}
