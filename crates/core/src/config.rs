use crate::ResourceId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResourceStart {
    pub resource: ResourceId,
    pub amount: f64,
}

/// Immutable per-run configuration, shared read-only across state clones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Simulated duration in seconds; None runs unbounded.
    pub duration: Option<f64>,
    pub target_count: u32,
    /// Divides slot durations; 1.0 is unmodified.
    pub speed: f64,
    /// Minimum slot duration, used when an ability declares no cast time.
    pub base_slot: f64,
    pub history_len: usize,
    /// Optional-modifier switches, queried by `cfg.<flag>` conditions and by
    /// abilities gated through `enabled_by`.
    #[serde(default)]
    pub flags: HashMap<String, bool>,
    /// Overrides for catalog starting resource levels.
    #[serde(default)]
    pub resource_start: Vec<ResourceStart>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            duration: Some(300.0),
            target_count: 1,
            speed: 1.0,
            base_slot: 1.5,
            history_len: 8,
            flags: HashMap::new(),
            resource_start: Vec::new(),
        }
    }
}

impl RunConfig {
    pub fn flag(&self, name: &str) -> bool {
        self.flags
            .get(&crate::normalize(name))
            .copied()
            .unwrap_or(false)
    }
}
