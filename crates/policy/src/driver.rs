use crate::{
    Decision, DecisionKind, DecisionRecord, PolicyError, PriorityPolicy, RolloutPolicy,
    RunSummary, Trace,
};
use rotasim_core::{
    Catalog, Event, EventBus, RunConfig, ScoringContext, SimState, TRIGGER_REPEAT_CAP,
};
use std::sync::Arc;

/// Anything that can fill a decision slot.
pub trait Policy {
    fn decide(
        &mut self,
        state: &SimState,
        scoring: &ScoringContext,
        events: &mut EventBus,
    ) -> Decision;
}

impl Policy for PriorityPolicy {
    fn decide(
        &mut self,
        state: &SimState,
        _scoring: &ScoringContext,
        events: &mut EventBus,
    ) -> Decision {
        PriorityPolicy::decide(self, state, events)
    }
}

impl Policy for RolloutPolicy {
    fn decide(
        &mut self,
        state: &SimState,
        scoring: &ScoringContext,
        _events: &mut EventBus,
    ) -> Decision {
        RolloutPolicy::decide(self, state, scoring)
    }
}

/// Owns one evolving state and drives it through strictly sequential
/// decision points, recording the canonical trace.
#[derive(Debug)]
pub struct Simulator {
    pub state: SimState,
    pub scoring: ScoringContext,
    pub events: EventBus,
}

impl Simulator {
    pub fn new(catalog: Arc<Catalog>, config: Arc<RunConfig>) -> Result<Self, PolicyError> {
        catalog.validate()?;
        let scoring = ScoringContext::new(&catalog, &config);
        Ok(Self {
            state: SimState::new(catalog, config),
            scoring,
            events: EventBus::default(),
        })
    }

    /// Runs the policy until the horizon is reached or `max_decisions`
    /// records exist. The simulator always produces a next state: an
    /// unavailable choice degrades to the filler rather than halting.
    pub fn run<P: Policy>(&mut self, policy: &mut P, max_decisions: u32) -> Trace {
        let mut records: Vec<DecisionRecord> = Vec::new();
        let mut step = 0u32;
        let mut off_slot_actions = 0u32;

        'outer: while (records.len() as u32) < max_decisions {
            if let Some(horizon) = self.state.horizon {
                if self.state.time >= horizon {
                    break;
                }
            }

            // Off-slot preemption pass, one record per fire.
            let mut fires = 0u32;
            while fires < TRIGGER_REPEAT_CAP {
                let Some(ability) = self.state.next_trigger() else {
                    break;
                };
                let pre = self.state.clone();
                if !self
                    .state
                    .apply_action(ability, &self.scoring, &mut self.events)
                {
                    break;
                }
                self.events.push(Event::TriggerFired { ability });
                let event_count = self.events.drain().count();
                records.push(DecisionRecord {
                    step,
                    time: pre.time,
                    score_before: pre.score_total,
                    score_after: self.state.score_total,
                    pre,
                    post: self.state.clone(),
                    ability,
                    kind: DecisionKind::OffSlot,
                    slot_time: 0.0,
                    event_count,
                    rationale: Some("trigger".to_string()),
                });
                step += 1;
                fires += 1;
                off_slot_actions += 1;
                if records.len() as u32 >= max_decisions {
                    break 'outer;
                }
            }
            if fires >= TRIGGER_REPEAT_CAP && self.state.next_trigger().is_some() {
                self.events.push(Event::TriggerCapHit { fired: fires });
            }

            let decision = policy.decide(&self.state, &self.scoring, &mut self.events);
            let pre = self.state.clone();
            let mut ability = decision.ability;
            if !self
                .state
                .apply_action(ability, &self.scoring, &mut self.events)
            {
                ability = self.state.catalog.filler;
                self.state
                    .apply_action(ability, &self.scoring, &mut self.events);
            }
            let slot_time = self.scoring.slot_time(ability);
            if slot_time > 0.0 {
                self.state
                    .advance_time(slot_time, &self.scoring, &mut self.events);
            }
            let kind = if slot_time > 0.0 {
                DecisionKind::SlotFilling
            } else {
                DecisionKind::OffSlot
            };
            if kind == DecisionKind::OffSlot {
                off_slot_actions += 1;
            }
            let event_count = self.events.drain().count();
            records.push(DecisionRecord {
                step,
                time: pre.time,
                score_before: pre.score_total,
                score_after: self.state.score_total,
                pre,
                post: self.state.clone(),
                ability,
                kind,
                slot_time,
                event_count,
                rationale: decision.rationale,
            });
            step += 1;
        }

        Trace {
            summary: RunSummary {
                decisions: records.len() as u32,
                off_slot_actions,
                simulated: self.state.time,
                total_score: self.state.score_total,
            },
            records,
        }
    }
}
