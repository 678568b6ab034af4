#![allow(dead_code)]

use std::sync::Arc;

use stepwise::jobs::JobRegistry;
use stepwise::store::{MemoryStore, Store};

pub use stepwise_test_utils::builders;
pub use stepwise_test_utils::{init_tracing, with_timeout};

/// A one-degree square at the equator, as a GeoJSON Feature.
pub const SQUARE_FEATURE: &str = r#"{
  "type": "Feature",
  "properties": {},
  "geometry": {
    "type": "Polygon",
    "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 1], [0, 0]]]
  }
}"#;

/// Fresh in-memory store plus the built-in job registry wired to it.
pub fn memory_stack() -> (MemoryStore, Arc<dyn Store>, Arc<JobRegistry>) {
    let store = MemoryStore::new();
    let shared: Arc<dyn Store> = Arc::new(store.clone());
    let registry = Arc::new(JobRegistry::with_builtin_jobs(shared.clone()));
    (store, shared, registry)
}
