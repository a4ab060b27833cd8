use crate::PolicyError;
use rotasim_core::{AbilityId, SimState};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DecisionKind {
    SlotFilling,
    OffSlot,
}

/// A policy's answer for one decision point. Ephemeral, not retained in state.
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    pub ability: AbilityId,
    pub kind: DecisionKind,
    pub rationale: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DecisionRecord {
    pub step: u32,
    pub time: f64,
    pub pre: SimState,
    pub post: SimState,
    pub ability: AbilityId,
    pub kind: DecisionKind,
    pub slot_time: f64,
    pub score_before: f64,
    pub score_after: f64,
    pub event_count: usize,
    pub rationale: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RunSummary {
    pub decisions: u32,
    pub off_slot_actions: u32,
    pub simulated: f64,
    pub total_score: f64,
}

/// The canonical run artifact consumed by downstream tooling.
#[derive(Debug, Clone, Serialize)]
pub struct Trace {
    pub records: Vec<DecisionRecord>,
    pub summary: RunSummary,
}

impl Trace {
    pub fn to_json(&self) -> Result<String, PolicyError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
