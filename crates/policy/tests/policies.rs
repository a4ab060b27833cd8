use rotasim_policy::{
    DecisionKind, PriorityPolicy, RolloutPolicy, RuleEntry, RuleSet, Simulator, SubListMode,
};
use rotasim_core::{
    AbilityDef, AbilityId, BinaryOp, Catalog, EffectApplication, EffectDef, EffectKind,
    EventBus, Expr, ResourceDef, ResourceDelta, ResourceId, ResourceStart, RunConfig,
    ScoringContext, SimState,
};
use std::sync::Arc;

const STRIKE: AbilityId = AbilityId(0);
const EVISCERATE: AbilityId = AbilityId(1);

fn plain_ability(name: &str, base_score: f64) -> AbilityDef {
    AbilityDef {
        name: name.to_string(),
        base_score,
        cost: vec![],
        gain: vec![],
        cooldown: 0.0,
        charges: None,
        cast_time: 0.0,
        off_slot: false,
        aoe: false,
        applies: vec![],
        stack_ops: vec![],
        requires_stacks: None,
        enabled_by: None,
    }
}

fn energy_catalog() -> Catalog {
    let mut eviscerate = plain_ability("eviscerate", 50.0);
    eviscerate.cost = vec![ResourceDelta {
        resource: ResourceId(0),
        amount: 40.0,
    }];
    Catalog {
        resources: vec![ResourceDef {
            name: "energy".to_string(),
            cap: 100.0,
            start: 100.0,
            regen_per_sec: 0.0,
        }],
        effects: vec![],
        abilities: vec![plain_ability("strike", 10.0), eviscerate],
        procs: vec![],
        triggers: vec![],
        filler: STRIKE,
    }
}

fn setup_catalog() -> Catalog {
    let mut smash = plain_ability("smash", 40.0);
    smash.cooldown = 6.0;
    let mut empower = plain_ability("empower", 0.0);
    empower.cooldown = 30.0;
    empower.applies = vec![EffectApplication {
        effect: rotasim_core::EffectId(0),
        duration: 12.0,
        stacks: 0,
        extend: false,
    }];
    Catalog {
        resources: vec![],
        effects: vec![EffectDef {
            name: "power".to_string(),
            kind: EffectKind::Buff,
            max_stacks: 1,
            tick_interval: 0.0,
            tick_score: 0.0,
            score_mult: 3.0,
            per_target: false,
            on_expire: None,
        }],
        abilities: vec![plain_ability("strike", 10.0), smash, empower],
        procs: vec![],
        triggers: vec![],
        filler: STRIKE,
    }
}

fn state_for(catalog: Catalog, config: RunConfig) -> (SimState, ScoringContext) {
    let catalog = Arc::new(catalog);
    catalog.validate().expect("valid catalog");
    let config = Arc::new(config);
    let scoring = ScoringContext::new(&catalog, &config);
    (SimState::new(catalog, config), scoring)
}

fn always_action(ability: AbilityId) -> RuleEntry {
    RuleEntry::Action {
        ability,
        condition: Expr::Bool(true),
    }
}

fn ident(name: &str) -> Expr {
    Expr::Ident(name.to_string())
}

fn ge(left: Expr, right: f64) -> Expr {
    Expr::Binary {
        left: Box::new(left),
        op: BinaryOp::Ge,
        right: Box::new(Expr::Number(right)),
    }
}

#[test]
fn first_matching_rule_wins() {
    let (state, _) = state_for(energy_catalog(), RunConfig::default());
    let rules = RuleSet::single(vec![always_action(EVISCERATE), always_action(STRIKE)]);
    rules.validate(&state.catalog).expect("valid rules");
    let policy = PriorityPolicy::new(rules);
    let mut events = EventBus::default();
    let decision = policy.decide(&state, &mut events);
    assert_eq!(decision.ability, EVISCERATE);
    assert_eq!(decision.kind, DecisionKind::SlotFilling);
    assert_eq!(decision.rationale.as_deref(), Some("default[0]"));
}

#[test]
fn unavailable_ability_falls_through_to_later_rules() {
    let config = RunConfig {
        resource_start: vec![ResourceStart {
            resource: ResourceId(0),
            amount: 20.0,
        }],
        ..RunConfig::default()
    };
    let (state, _) = state_for(energy_catalog(), config);
    let rules = RuleSet::single(vec![always_action(EVISCERATE), always_action(STRIKE)]);
    let policy = PriorityPolicy::new(rules);
    let mut events = EventBus::default();
    assert_eq!(policy.decide(&state, &mut events).ability, STRIKE);
}

#[test]
fn fallthrough_sublist_returns_control_to_the_caller() {
    let (state, _) = state_for(energy_catalog(), RunConfig::default());
    let rules = RuleSet {
        lists: vec![
            rotasim_policy::NamedList {
                name: "default".to_string(),
                entries: vec![
                    RuleEntry::SubList {
                        name: "burst".to_string(),
                        mode: SubListMode::Fallthrough,
                        condition: Expr::Bool(true),
                    },
                    always_action(STRIKE),
                ],
            },
            rotasim_policy::NamedList {
                name: "burst".to_string(),
                entries: vec![RuleEntry::Action {
                    ability: EVISCERATE,
                    condition: Expr::Bool(false),
                }],
            },
        ],
        entry: "default".to_string(),
    };
    rules.validate(&state.catalog).expect("valid rules");
    let policy = PriorityPolicy::new(rules);
    let mut events = EventBus::default();
    let decision = policy.decide(&state, &mut events);
    assert_eq!(decision.ability, STRIKE);
    assert_eq!(decision.rationale.as_deref(), Some("default[1]"));
}

#[test]
fn exclusive_sublist_never_returns_to_the_caller() {
    let (state, _) = state_for(energy_catalog(), RunConfig::default());
    let rules = RuleSet {
        lists: vec![
            rotasim_policy::NamedList {
                name: "default".to_string(),
                entries: vec![
                    RuleEntry::SubList {
                        name: "burst".to_string(),
                        mode: SubListMode::Exclusive,
                        condition: Expr::Bool(true),
                    },
                    always_action(EVISCERATE),
                ],
            },
            rotasim_policy::NamedList {
                name: "burst".to_string(),
                entries: vec![RuleEntry::Action {
                    ability: EVISCERATE,
                    condition: Expr::Bool(false),
                }],
            },
        ],
        entry: "default".to_string(),
    };
    let policy = PriorityPolicy::new(rules);
    let mut events = EventBus::default();
    // Nothing fired inside the exclusive branch, so the caller's remaining
    // entries are never scanned and the filler is chosen.
    let decision = policy.decide(&state, &mut events);
    assert_eq!(decision.ability, STRIKE);
    assert_eq!(decision.rationale, None);
}

#[test]
fn variables_are_recomputed_every_decision_point() {
    let (mut state, scoring) = state_for(energy_catalog(), RunConfig::default());
    let rules = RuleSet::single(vec![
        RuleEntry::Variable {
            name: "pool".to_string(),
            expr: ident("resource.energy"),
            condition: Expr::Bool(true),
        },
        RuleEntry::Action {
            ability: EVISCERATE,
            condition: ge(ident("pool"), 100.0),
        },
        always_action(STRIKE),
    ]);
    let policy = PriorityPolicy::new(rules);
    let mut events = EventBus::default();

    let first = policy.decide(&state, &mut events);
    assert_eq!(first.ability, EVISCERATE);
    state.apply_action(EVISCERATE, &scoring, &mut events);

    // Energy dropped to 60, so the same list now resolves differently.
    let second = policy.decide(&state, &mut events);
    assert_eq!(second.ability, STRIKE);
}

#[test]
fn cyclic_sublists_degrade_to_the_filler() {
    let (state, _) = state_for(energy_catalog(), RunConfig::default());
    let rules = RuleSet {
        lists: vec![rotasim_policy::NamedList {
            name: "default".to_string(),
            entries: vec![RuleEntry::SubList {
                name: "default".to_string(),
                mode: SubListMode::Fallthrough,
                condition: Expr::Bool(true),
            }],
        }],
        entry: "default".to_string(),
    };
    let policy = PriorityPolicy::new(rules);
    let mut events = EventBus::default();
    assert_eq!(policy.decide(&state, &mut events).ability, STRIKE);
}

#[test]
fn unknown_ability_rule_is_skipped_not_fatal() {
    let (state, _) = state_for(energy_catalog(), RunConfig::default());
    let rules = RuleSet::single(vec![always_action(AbilityId(99)), always_action(EVISCERATE)]);
    let policy = PriorityPolicy::new(rules);
    let mut events = EventBus::default();
    assert_eq!(policy.decide(&state, &mut events).ability, EVISCERATE);
}

#[test]
fn rollout_values_setup_actions_a_greedy_pick_misses() {
    let (state, scoring) = state_for(setup_catalog(), RunConfig::default());
    let rollout = RolloutPolicy::default();
    let empower = AbilityId(2);
    let smash = AbilityId(1);

    let (best, _) = rollout.best_action(&state, &scoring).expect("candidates");
    assert_eq!(best, empower);
    assert!(
        rollout.action_total(&state, empower, &scoring)
            > rollout.action_total(&state, smash, &scoring)
    );
}

#[test]
fn rollout_total_of_the_winner_bounds_every_candidate() {
    let (state, scoring) = state_for(setup_catalog(), RunConfig::default());
    let rollout = RolloutPolicy::default();
    let (_, best_total) = rollout.best_action(&state, &scoring).expect("candidates");
    for ability in state.available_actions() {
        assert!(best_total >= rollout.action_total(&state, ability, &scoring) - 1e-9);
    }
}

#[test]
fn rollout_ties_break_by_evaluation_order() {
    let catalog = Catalog {
        resources: vec![],
        effects: vec![],
        abilities: vec![plain_ability("strike", 10.0), plain_ability("jab", 10.0)],
        procs: vec![],
        triggers: vec![],
        filler: STRIKE,
    };
    let (state, scoring) = state_for(catalog, RunConfig::default());
    let rollout = RolloutPolicy::default();
    let (best, _) = rollout.best_action(&state, &scoring).expect("candidates");
    assert_eq!(best, STRIKE);
}

#[test]
fn driver_fills_every_slot_until_the_horizon() {
    let config = RunConfig {
        duration: Some(30.0),
        ..RunConfig::default()
    };
    let mut sim = Simulator::new(Arc::new(energy_catalog()), Arc::new(config)).expect("simulator");
    let mut policy = PriorityPolicy::new(RuleSet::single(vec![always_action(STRIKE)]));
    let trace = sim.run(&mut policy, 1000);

    // 30 seconds of 1.5 second slots.
    assert_eq!(trace.records.len(), 20);
    assert!(trace
        .records
        .iter()
        .all(|record| record.kind == DecisionKind::SlotFilling));
    assert!((trace.summary.simulated - 30.0).abs() < 1e-9);
    assert_eq!(trace.summary.total_score, 200.0);
    for pair in trace.records.windows(2) {
        assert_eq!(pair[0].post.time, pair[1].pre.time);
    }
}

#[test]
fn driver_records_off_slot_preemptions() {
    let mut catalog = setup_catalog();
    // Make the buff cast instant and trigger-driven.
    catalog.abilities[2].off_slot = true;
    catalog.triggers = vec![rotasim_core::TriggerDef {
        ability: AbilityId(2),
        condition: Expr::Unary {
            op: rotasim_core::UnaryOp::Not,
            expr: Box::new(ident("buff.power.up")),
        },
    }];
    let config = RunConfig {
        duration: Some(12.0),
        ..RunConfig::default()
    };
    let mut sim = Simulator::new(Arc::new(catalog), Arc::new(config)).expect("simulator");
    let mut policy = PriorityPolicy::new(RuleSet::single(vec![always_action(STRIKE)]));
    let trace = sim.run(&mut policy, 1000);

    let first = &trace.records[0];
    assert_eq!(first.ability, AbilityId(2));
    assert_eq!(first.kind, DecisionKind::OffSlot);
    assert_eq!(first.slot_time, 0.0);
    assert_eq!(first.time, 0.0);
    assert_eq!(trace.summary.off_slot_actions, 1);
}

#[test]
fn stalled_rules_degrade_to_the_filler_and_never_halt() {
    let config = RunConfig {
        duration: Some(15.0),
        ..RunConfig::default()
    };
    let mut sim = Simulator::new(Arc::new(energy_catalog()), Arc::new(config)).expect("simulator");
    let mut policy = PriorityPolicy::new(RuleSet::single(vec![RuleEntry::Action {
        ability: EVISCERATE,
        condition: Expr::Bool(false),
    }]));
    let trace = sim.run(&mut policy, 1000);
    assert_eq!(trace.records.len(), 10);
    assert!(trace.records.iter().all(|record| record.ability == STRIKE));
}

#[test]
fn rollout_policy_drives_a_full_run() {
    let config = RunConfig {
        duration: Some(30.0),
        ..RunConfig::default()
    };
    let mut sim = Simulator::new(Arc::new(setup_catalog()), Arc::new(config)).expect("simulator");
    let mut policy = RolloutPolicy::default();
    let trace = sim.run(&mut policy, 1000);

    assert!(!trace.records.is_empty());
    assert_eq!(trace.summary.total_score, sim.state.score_total);
    // The setup buff should have been cast somewhere in the run.
    assert!(trace
        .records
        .iter()
        .any(|record| record.ability == AbilityId(2)));
}
