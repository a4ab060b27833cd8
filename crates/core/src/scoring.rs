use crate::{AbilityId, Catalog, EffectId, RunConfig};

/// Precomputed score and timing tables, built once per run from the catalog
/// and configuration and passed by reference into every scoring call. There
/// is deliberately no shared mutable scoring state anywhere.
#[derive(Debug, Clone)]
pub struct ScoringContext {
    ability_score: Vec<f64>,
    tick_score: Vec<f64>,
    slot_time: Vec<f64>,
}

impl ScoringContext {
    pub fn new(catalog: &Catalog, config: &RunConfig) -> Self {
        let targets = config.target_count.max(1) as f64;
        let speed = if config.speed > 0.0 { config.speed } else { 1.0 };
        let ability_score = catalog
            .abilities
            .iter()
            .map(|def| {
                if def.aoe {
                    def.base_score * targets
                } else {
                    def.base_score
                }
            })
            .collect();
        let tick_score = catalog
            .effects
            .iter()
            .map(|def| {
                if def.per_target {
                    def.tick_score * targets
                } else {
                    def.tick_score
                }
            })
            .collect();
        let slot_time = catalog
            .abilities
            .iter()
            .map(|def| {
                if def.off_slot {
                    0.0
                } else {
                    def.cast_time.max(config.base_slot) / speed
                }
            })
            .collect();
        Self {
            ability_score,
            tick_score,
            slot_time,
        }
    }

    pub fn ability_score(&self, id: AbilityId) -> f64 {
        self.ability_score.get(id.index()).copied().unwrap_or(0.0)
    }

    pub fn tick_score(&self, id: EffectId) -> f64 {
        self.tick_score.get(id.index()).copied().unwrap_or(0.0)
    }

    /// Seconds the ability occupies the decision slot; 0 for off-slot.
    pub fn slot_time(&self, id: AbilityId) -> f64 {
        self.slot_time.get(id.index()).copied().unwrap_or(0.0)
    }
}
