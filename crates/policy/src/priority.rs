use crate::{Decision, DecisionKind, RuleEntry, RuleSet, SubListMode};
use rotasim_core::{
    condition_holds, evaluate, normalize, AbilityId, Event, EventBus, SimState,
};
use std::collections::HashMap;

/// Cycle guard for nested sub-list references.
pub const MAX_SUBLIST_DEPTH: usize = 8;

/// Interprets an ordered rule list against the current state. Variables are
/// recomputed fresh at every decision point, so arbitrary state changes
/// between calls can never leave a stale binding behind.
#[derive(Debug, Clone)]
pub struct PriorityPolicy {
    rules: RuleSet,
}

impl PriorityPolicy {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn decide(&self, state: &SimState, events: &mut EventBus) -> Decision {
        let available = state.available_actions();
        let mut vars = HashMap::new();
        let entry = self.rules.entry.clone();
        match self.scan(&entry, state, &available, &mut vars, 0, events) {
            Some((ability, rationale)) => {
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
                    rationale: Some(rationale),
                }
            }
            None => Decision {
                ability: state.catalog.filler,
                kind: DecisionKind::SlotFilling,
                rationale: None,
            },
        }
    }

    fn scan(
        &self,
        list_name: &str,
        state: &SimState,
        available: &[AbilityId],
        vars: &mut HashMap<String, f64>,
        depth: usize,
        events: &mut EventBus,
    ) -> Option<(AbilityId, String)> {
        if depth > MAX_SUBLIST_DEPTH {
            events.push(Event::RuleDepthExceeded {
                list: list_name.to_string(),
            });
            return None;
        }
        let entries = self.rules.list(list_name)?;
        for (index, entry) in entries.iter().enumerate() {
            match entry {
                RuleEntry::Variable {
                    name,
                    expr,
                    condition,
                } => {
                    if condition_holds(condition, state, vars) {
                        if let Some(value) = evaluate(expr, state, vars).as_number() {
                            vars.insert(normalize(name), value);
                        }
                    }
                }
                RuleEntry::Action { ability, condition } => {
                    if state.catalog.ability(*ability).is_none() {
                        events.push(Event::RuleSkipped {
                            list: list_name.to_string(),
                            index,
                        });
                        continue;
                    }
                    if condition_holds(condition, state, vars) && available.contains(ability) {
                        return Some((*ability, format!("{list_name}[{index}]")));
                    }
                }
                RuleEntry::SubList {
                    name,
                    mode,
                    condition,
                } => {
                    if !condition_holds(condition, state, vars) {
                        continue;
                    }
                    match mode {
                        SubListMode::Exclusive => {
                            return self.scan(name, state, available, vars, depth + 1, events);
                        }
                        SubListMode::Fallthrough => {
                            if let Some(hit) =
                                self.scan(name, state, available, vars, depth + 1, events)
                            {
                                return Some(hit);
                            }
                        }
                    }
                }
            }
        }
        None
    }
}
