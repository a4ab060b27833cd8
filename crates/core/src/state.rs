use crate::{
    AbilityId, Catalog, EffectId, EffectKind, ResourceId, RunConfig,
};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;

pub(crate) const EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct ChargeState {
    pub current: u32,
    pub recharge_remaining: f64,
}

/// The single mutable entity advanced through time. Cloning yields a deep,
/// independent snapshot; only the catalog and run configuration are shared,
/// and both are read-only for the run's lifetime.
#[derive(Debug, Clone, Serialize)]
pub struct SimState {
    pub time: f64,
    pub horizon: Option<f64>,
    pub resources: Vec<f64>,
    pub buffs: Vec<f64>,
    pub debuffs: Vec<f64>,
    pub dots: Vec<f64>,
    pub stacks: Vec<u32>,
    pub cooldowns: Vec<f64>,
    pub charges: Vec<ChargeState>,
    pub proc_accum: Vec<f64>,
    pub score_total: f64,
    /// Most recent action first, capped at `config.history_len`.
    pub history: VecDeque<AbilityId>,
    #[serde(skip)]
    pub catalog: Arc<Catalog>,
    #[serde(skip)]
    pub config: Arc<RunConfig>,
}

impl SimState {
    pub fn new(catalog: Arc<Catalog>, config: Arc<RunConfig>) -> Self {
        let mut resources: Vec<f64> = catalog
            .resources
            .iter()
            .map(|def| def.start.clamp(0.0, def.cap))
            .collect();
        for over in &config.resource_start {
            if let Some(def) = catalog.resource(over.resource) {
                resources[over.resource.index()] = over.amount.clamp(0.0, def.cap);
            }
        }
        let effect_count = catalog.effects.len();
        let charges = catalog
            .abilities
            .iter()
            .map(|def| match def.charges {
                Some(charge) => ChargeState {
                    current: charge.max,
                    recharge_remaining: 0.0,
                },
                None => ChargeState {
                    current: 0,
                    recharge_remaining: 0.0,
                },
            })
            .collect();
        Self {
            time: 0.0,
            horizon: config.duration,
            resources,
            buffs: vec![0.0; effect_count],
            debuffs: vec![0.0; effect_count],
            dots: vec![0.0; effect_count],
            stacks: vec![0; effect_count],
            cooldowns: vec![0.0; catalog.abilities.len()],
            charges,
            proc_accum: vec![0.0; catalog.procs.len()],
            score_total: 0.0,
            history: VecDeque::new(),
            catalog,
            config,
        }
    }

    pub fn resource(&self, id: ResourceId) -> f64 {
        self.resources.get(id.index()).copied().unwrap_or(0.0)
    }

    /// Remaining duration routed through the effect's declared kind.
    pub fn remaining(&self, id: EffectId) -> f64 {
        let Some(def) = self.catalog.effect(id) else {
            return 0.0;
        };
        let table = match def.kind {
            EffectKind::Buff => &self.buffs,
            EffectKind::Debuff => &self.debuffs,
            EffectKind::Dot => &self.dots,
        };
        table.get(id.index()).copied().unwrap_or(0.0)
    }

    pub fn effect_active(&self, id: EffectId) -> bool {
        self.remaining(id) > 0.0
    }

    pub fn stack_count(&self, id: EffectId) -> u32 {
        self.stacks.get(id.index()).copied().unwrap_or(0)
    }

    pub fn cooldown_remaining(&self, id: AbilityId) -> f64 {
        let Some(def) = self.catalog.ability(id) else {
            return 0.0;
        };
        if def.charges.is_some() {
            let slot = self.charges[id.index()];
            if slot.current > 0 {
                0.0
            } else {
                slot.recharge_remaining
            }
        } else {
            self.cooldowns.get(id.index()).copied().unwrap_or(0.0)
        }
    }

    pub fn cooldown_ready(&self, id: AbilityId) -> bool {
        self.cooldown_remaining(id) <= EPS
    }

    pub fn charge_count(&self, id: AbilityId) -> u32 {
        self.charges.get(id.index()).map(|c| c.current).unwrap_or(0)
    }

    /// Whole charges plus recharge progress on the next one.
    pub fn charges_fractional(&self, id: AbilityId) -> f64 {
        let Some(def) = self.catalog.ability(id) else {
            return 0.0;
        };
        let Some(charge) = def.charges else {
            return 0.0;
        };
        let slot = self.charges[id.index()];
        if slot.current >= charge.max {
            return charge.max as f64;
        }
        let progress = if charge.recharge > 0.0 {
            1.0 - slot.recharge_remaining / charge.recharge
        } else {
            0.0
        };
        slot.current as f64 + progress.clamp(0.0, 1.0)
    }

    /// Seconds until every charge is back.
    pub fn full_recharge_time(&self, id: AbilityId) -> f64 {
        let Some(def) = self.catalog.ability(id) else {
            return 0.0;
        };
        let Some(charge) = def.charges else {
            return 0.0;
        };
        let slot = self.charges[id.index()];
        if slot.current >= charge.max {
            return 0.0;
        }
        let pending = charge.max - slot.current - 1;
        slot.recharge_remaining + pending as f64 * charge.recharge
    }

    /// History lookback, 1-based: `prev(1)` is the most recent action.
    pub fn prev(&self, back: usize) -> Option<AbilityId> {
        if back == 0 {
            return None;
        }
        self.history.get(back - 1).copied()
    }

    pub fn time_left(&self) -> Option<f64> {
        self.horizon.map(|h| (h - self.time).max(0.0))
    }

    /// Product of active buff/debuff score multipliers.
    pub fn score_multiplier(&self) -> f64 {
        let mut mult = 1.0;
        for (idx, def) in self.catalog.effects.iter().enumerate() {
            if def.score_mult == 1.0 {
                continue;
            }
            let remaining = match def.kind {
                EffectKind::Buff => self.buffs[idx],
                EffectKind::Debuff => self.debuffs[idx],
                EffectKind::Dot => continue,
            };
            if remaining > 0.0 {
                mult *= def.score_mult;
            }
        }
        mult
    }
}
