use crate::{Decision, DecisionKind};
use rayon::prelude::*;
use rotasim_core::{AbilityId, EventBus, ScoringContext, SimState};
use serde::{Deserialize, Serialize};

/// Tuning knobs for the bounded lookahead. Depth and discount are domain
/// tuning parameters, exposed here rather than hardcoded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RolloutConfig {
    /// Continuation steps evaluated with a one-ply lookahead before the
    /// heuristic degrades to pure greedy.
    pub lookahead_steps: u32,
    /// Hard cap on continuation steps.
    pub max_steps: u32,
    /// Seconds of simulated continuation per candidate.
    pub horizon: f64,
    /// Per-step multiplicative discount; near-term continuation dominates.
    pub discount: f64,
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            lookahead_steps: 6,
            max_steps: 24,
            horizon: 20.0,
            discount: 0.9,
        }
    }
}

/// Picks the action maximizing immediate plus discounted continuation score.
/// The continuation exists to value setup actions whose payoff lands several
/// steps later, which a one-step greedy evaluator misses.
#[derive(Debug, Clone)]
pub struct RolloutPolicy {
    pub config: RolloutConfig,
}

impl Default for RolloutPolicy {
    fn default() -> Self {
        Self {
            config: RolloutConfig::default(),
        }
    }
}

impl RolloutPolicy {
    pub fn new(config: RolloutConfig) -> Self {
        Self { config }
    }

    pub fn decide(&self, state: &SimState, scoring: &ScoringContext) -> Decision {
        match self.best_action(state, scoring) {
            Some((ability, total)) => {
                let off_slot = state
                    .catalog
                    .ability(ability)
                    .map(|def| def.off_slot)
                    .unwrap_or(false);
                Decision {
                    ability,
                    kind: if off_slot {
                        DecisionKind::OffSlot
                    } else {
                        DecisionKind::SlotFilling
                    },
                    rationale: Some(format!("rollout total {total:.3}")),
                }
            }
            None => Decision {
                ability: state.catalog.filler,
                kind: DecisionKind::SlotFilling,
                rationale: None,
            },
        }
    }

    /// Scores every available action from its own cloned state. The
    /// candidates are independent read-only explorations of a shared
    /// snapshot, so they fan out across threads; ties break by evaluation
    /// order.
    pub fn best_action(
        &self,
        state: &SimState,
        scoring: &ScoringContext,
    ) -> Option<(AbilityId, f64)> {
        let candidates = state.available_actions();
        let totals: Vec<(AbilityId, f64)> = candidates
            .par_iter()
            .map(|&ability| (ability, self.action_total(state, ability, scoring)))
            .collect();
        totals
            .into_iter()
            .reduce(|best, item| if item.1 > best.1 { item } else { best })
    }

    /// Immediate score of `ability` plus the discounted projection of the
    /// continuation after it, honoring off-slot triggers exactly as the live
    /// simulation would.
    pub fn action_total(
        &self,
        state: &SimState,
        ability: AbilityId,
        scoring: &ScoringContext,
    ) -> f64 {
        let mut events = EventBus::default();
        let mut sim = state.clone();
        let base = sim.score_total;
        if !sim.apply_action(ability, scoring, &mut events) {
            return f64::NEG_INFINITY;
        }
        sim.advance_time(scoring.slot_time(ability), scoring, &mut events);
        let mut total = sim.score_total - base;

        let stop_time = state.time + self.config.horizon;
        let mut factor = 1.0;
        for step in 0..self.config.max_steps {
            if sim.time >= stop_time {
                break;
            }
            if let Some(horizon) = sim.horizon {
                if sim.time >= horizon {
                    break;
                }
            }
            let before = sim.score_total;
            sim.check_triggers(scoring, &mut events);
            let next = if step < self.config.lookahead_steps {
                self.pick_one_ply(&sim, scoring)
            } else {
                self.pick_greedy(&sim, scoring)
            };
            let Some(next) = next else {
                break;
            };
            if !sim.apply_action(next, scoring, &mut events) {
                break;
            }
            sim.advance_time(scoring.slot_time(next), scoring, &mut events);
            factor *= self.config.discount;
            total += (sim.score_total - before) * factor;
        }
        total
    }

    /// Greedy pick that also weighs the best following action.
    fn pick_one_ply(&self, state: &SimState, scoring: &ScoringContext) -> Option<AbilityId> {
        let mut best: Option<(f64, AbilityId)> = None;
        for ability in state.available_actions() {
            let Some((delta, after)) = self.step_delta(state, ability, scoring) else {
                continue;
            };
            let follow = self
                .best_immediate(&after, scoring)
                .map(|(d, _)| d)
                .unwrap_or(0.0);
            let value = delta + self.config.discount * follow;
            if best.map_or(true, |(bv, _)| value > bv) {
                best = Some((value, ability));
            }
        }
        best.map(|(_, ability)| ability)
    }

    fn pick_greedy(&self, state: &SimState, scoring: &ScoringContext) -> Option<AbilityId> {
        self.best_immediate(state, scoring)
            .map(|(_, ability)| ability)
    }

    fn best_immediate(
        &self,
        state: &SimState,
        scoring: &ScoringContext,
    ) -> Option<(f64, AbilityId)> {
        let mut best: Option<(f64, AbilityId)> = None;
        for ability in state.available_actions() {
            let Some((delta, _)) = self.step_delta(state, ability, scoring) else {
                continue;
            };
            if best.map_or(true, |(bd, _)| delta > bd) {
                best = Some((delta, ability));
            }
        }
        best
    }

    /// Score accrued by applying an ability and living through its slot.
    fn step_delta(
        &self,
        state: &SimState,
        ability: AbilityId,
        scoring: &ScoringContext,
    ) -> Option<(f64, SimState)> {
        let mut events = EventBus::default();
        let mut sim = state.clone();
        let before = sim.score_total;
        if !sim.apply_action(ability, scoring, &mut events) {
            return None;
        }
        sim.advance_time(scoring.slot_time(ability), scoring, &mut events);
        Some((sim.score_total - before, sim))
    }
}
