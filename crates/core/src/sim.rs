use crate::state::EPS;
use crate::{
    AbilityId, EffectId, EffectKind, Event, EventBus, ExpiryEffect, ScoringContext, SimState,
    StackOp,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Hard bound on off-slot trigger fires per decision point.
pub const TRIGGER_REPEAT_CAP: u32 = 4;

impl SimState {
    /// Ticks every timed field down by `dt`, folding periodic effects in as
    /// their expected value over the interval. Expiry side effects fire
    /// exactly once, when a timer crosses zero.
    pub fn advance_time(&mut self, dt: f64, scoring: &ScoringContext, events: &mut EventBus) {
        if dt <= 0.0 {
            return;
        }
        let catalog = Arc::clone(&self.catalog);
        let mult = self.score_multiplier();

        // Dot accrual over the active overlap, before remaining time ticks down.
        for (idx, def) in catalog.effects.iter().enumerate() {
            if def.kind != EffectKind::Dot || def.tick_interval <= 0.0 {
                continue;
            }
            let active = self.dots[idx].min(dt);
            if active > 0.0 {
                let ticks = active / def.tick_interval;
                self.score_total += scoring.tick_score(EffectId(idx as u16)) * ticks * mult;
            }
        }

        for (idx, def) in catalog.resources.iter().enumerate() {
            if def.regen_per_sec != 0.0 {
                self.resources[idx] =
                    (self.resources[idx] + def.regen_per_sec * dt).clamp(0.0, def.cap);
            }
        }

        for (idx, proc) in catalog.procs.iter().enumerate() {
            let gated = match proc.while_active {
                Some(effect) => self.effect_active(effect),
                None => true,
            };
            if !gated {
                continue;
            }
            self.proc_accum[idx] += proc.rate_per_sec * dt;
            while self.proc_accum[idx] >= 1.0 {
                self.proc_accum[idx] -= 1.0;
                self.grant_stacks(proc.grants, proc.stacks);
                events.push(Event::ProcFired {
                    effect: proc.grants,
                    stacks: proc.stacks,
                });
            }
        }

        for (idx, def) in catalog.abilities.iter().enumerate() {
            let Some(charge) = def.charges else {
                continue;
            };
            let slot = &mut self.charges[idx];
            let mut left = dt;
            while left > 0.0 && slot.current < charge.max {
                if slot.recharge_remaining > left {
                    slot.recharge_remaining -= left;
                    break;
                }
                left -= slot.recharge_remaining;
                slot.current += 1;
                slot.recharge_remaining = if slot.current < charge.max {
                    charge.recharge
                } else {
                    0.0
                };
            }
        }

        for value in &mut self.cooldowns {
            *value = (*value - dt).max(0.0);
        }

        let mut expired = Vec::new();
        for (idx, def) in catalog.effects.iter().enumerate() {
            let table = match def.kind {
                EffectKind::Buff => &mut self.buffs,
                EffectKind::Debuff => &mut self.debuffs,
                EffectKind::Dot => &mut self.dots,
            };
            let before = table[idx];
            if before <= 0.0 {
                continue;
            }
            let after = (before - dt).max(0.0);
            table[idx] = after;
            if after == 0.0 {
                expired.push(EffectId(idx as u16));
            }
        }
        for effect in expired {
            if let Some(on_expire) = catalog.effects[effect.index()].on_expire.as_ref() {
                self.apply_expiry(on_expire);
            }
            events.push(Event::EffectExpired { effect });
        }

        self.time += dt;
    }

    /// Applies an ability's full side effects without advancing time. Illegal
    /// requests are no-ops: stale policy evaluation must never corrupt state.
    pub fn apply_action(
        &mut self,
        ability: AbilityId,
        scoring: &ScoringContext,
        events: &mut EventBus,
    ) -> bool {
        if !self.is_available(ability) {
            events.push(Event::ActionRejected { ability });
            return false;
        }
        let catalog = Arc::clone(&self.catalog);
        let def = &catalog.abilities[ability.index()];
        let mult = self.score_multiplier();

        for delta in &def.cost {
            let idx = delta.resource.index();
            let cap = catalog.resources[idx].cap;
            self.resources[idx] = (self.resources[idx] - delta.amount).clamp(0.0, cap);
        }
        for delta in &def.gain {
            let idx = delta.resource.index();
            let cap = catalog.resources[idx].cap;
            self.resources[idx] = (self.resources[idx] + delta.amount).clamp(0.0, cap);
        }

        if let Some(charge) = def.charges {
            let slot = &mut self.charges[ability.index()];
            slot.current = slot.current.saturating_sub(1);
            if slot.recharge_remaining <= 0.0 {
                slot.recharge_remaining = charge.recharge;
            }
        } else if def.cooldown > 0.0 {
            self.cooldowns[ability.index()] = def.cooldown;
        }

        for app in &def.applies {
            let effect_def = &catalog.effects[app.effect.index()];
            let table = match effect_def.kind {
                EffectKind::Buff => &mut self.buffs,
                EffectKind::Debuff => &mut self.debuffs,
                EffectKind::Dot => &mut self.dots,
            };
            let idx = app.effect.index();
            if app.extend {
                table[idx] += app.duration;
            } else {
                table[idx] = table[idx].max(app.duration);
            }
            if app.stacks > 0 {
                self.grant_stacks(app.effect, app.stacks);
            }
            let remaining = match effect_def.kind {
                EffectKind::Buff => self.buffs[idx],
                EffectKind::Debuff => self.debuffs[idx],
                EffectKind::Dot => self.dots[idx],
            };
            events.push(Event::EffectApplied {
                effect: app.effect,
                remaining,
            });
        }

        for op in &def.stack_ops {
            self.apply_stack_op(op);
        }

        let score = scoring.ability_score(ability) * mult;
        if score != 0.0 {
            self.score_total += score;
        }

        self.history.push_front(ability);
        self.history.truncate(self.config.history_len);

        events.push(Event::ActionApplied {
            ability,
            score,
            off_slot: def.off_slot,
        });
        true
    }

    pub fn is_available(&self, ability: AbilityId) -> bool {
        let Some(def) = self.catalog.ability(ability) else {
            return false;
        };
        if let Some(flag) = def.enabled_by.as_deref() {
            if !self.config.flag(flag) {
                return false;
            }
        }
        for delta in &def.cost {
            if self.resource(delta.resource) + EPS < delta.amount {
                return false;
            }
        }
        if def.charges.is_some() {
            if self.charge_count(ability) == 0 {
                return false;
            }
        } else if self.cooldowns[ability.index()] > EPS {
            return false;
        }
        if let Some(req) = def.requires_stacks {
            if self.stack_count(req.effect) < req.at_least {
                return false;
            }
        }
        true
    }

    /// Legal actions in catalog order. The filler passes every gate by
    /// construction, so the result is never empty.
    pub fn available_actions(&self) -> Vec<AbilityId> {
        self.catalog
            .ability_ids()
            .filter(|id| self.is_available(*id))
            .collect()
    }

    /// First off-slot trigger whose condition currently holds.
    pub fn next_trigger(&self) -> Option<AbilityId> {
        let vars = HashMap::new();
        for trigger in &self.catalog.triggers {
            if crate::condition_holds(&trigger.condition, self, &vars)
                && self.is_available(trigger.ability)
            {
                return Some(trigger.ability);
            }
        }
        None
    }

    /// Runs the ordered off-slot trigger pass for one decision point. Firing
    /// must be self-clearing; the repeat cap bounds malformed trigger lists,
    /// after which remaining fires are skipped for this point only.
    pub fn check_triggers(
        &mut self,
        scoring: &ScoringContext,
        events: &mut EventBus,
    ) -> Vec<AbilityId> {
        let mut fired = Vec::new();
        while let Some(ability) = self.next_trigger() {
            if fired.len() as u32 >= TRIGGER_REPEAT_CAP {
                events.push(Event::TriggerCapHit {
                    fired: fired.len() as u32,
                });
                break;
            }
            if !self.apply_action(ability, scoring, events) {
                break;
            }
            events.push(Event::TriggerFired { ability });
            fired.push(ability);
        }
        fired
    }

    fn grant_stacks(&mut self, effect: EffectId, count: u32) {
        let Some(max) = self.catalog.effect(effect).map(|def| def.max_stacks) else {
            return;
        };
        let idx = effect.index();
        self.stacks[idx] = (self.stacks[idx] + count).min(max);
    }

    fn apply_stack_op(&mut self, op: &StackOp) {
        match op {
            StackOp::Add { effect, count } => self.grant_stacks(*effect, *count),
            StackOp::Remove { effect, count } => {
                let idx = effect.index();
                self.stacks[idx] = self.stacks[idx].saturating_sub(*count);
            }
            StackOp::Set { effect, count } => {
                let max = self
                    .catalog
                    .effect(*effect)
                    .map(|def| def.max_stacks)
                    .unwrap_or(0);
                self.stacks[effect.index()] = (*count).min(max);
            }
            StackOp::Clear { effect } => {
                self.stacks[effect.index()] = 0;
            }
        }
    }

    fn apply_expiry(&mut self, expiry: &ExpiryEffect) {
        match expiry {
            ExpiryEffect::GrantResource { resource, amount } => {
                let idx = resource.index();
                let cap = self.catalog.resources[idx].cap;
                self.resources[idx] = (self.resources[idx] + amount).clamp(0.0, cap);
            }
            ExpiryEffect::AddStacks { effect, count } => {
                self.grant_stacks(*effect, *count);
            }
            ExpiryEffect::ClearStacks { effect } => {
                self.stacks[effect.index()] = 0;
            }
        }
    }
}
