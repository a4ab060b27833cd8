use crate::{AbilityId, EffectId, Expr, ResourceId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("ability index {0} out of range")]
    UnknownAbility(u16),
    #[error("effect index {0} out of range")]
    UnknownEffect(u16),
    #[error("resource index {0} out of range")]
    UnknownResource(u8),
    #[error("filler ability {0:?} must be free of costs, cooldowns and gates")]
    FillerNotFree(AbilityId),
    #[error("off-slot trigger references slot-filling ability {0:?}")]
    TriggerNotOffSlot(AbilityId),
    #[error("catalog has no abilities")]
    Empty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDef {
    pub name: String,
    pub cap: f64,
    #[serde(default)]
    pub start: f64,
    #[serde(default)]
    pub regen_per_sec: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EffectKind {
    Buff,
    Debuff,
    Dot,
}

/// Discrete state change fired once when a timed effect runs out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExpiryEffect {
    GrantResource { resource: ResourceId, amount: f64 },
    AddStacks { effect: EffectId, count: u32 },
    ClearStacks { effect: EffectId },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectDef {
    pub name: String,
    pub kind: EffectKind,
    #[serde(default = "default_max_stacks")]
    pub max_stacks: u32,
    /// Seconds between ticks; 0 means the effect does not tick.
    #[serde(default)]
    pub tick_interval: f64,
    #[serde(default)]
    pub tick_score: f64,
    /// Multiplier applied to direct scores and dot accrual while active.
    #[serde(default = "default_mult")]
    pub score_mult: f64,
    /// Ticking effects marked per-target scale accrual by the target count.
    #[serde(default)]
    pub per_target: bool,
    #[serde(default)]
    pub on_expire: Option<ExpiryEffect>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChargeDef {
    pub max: u32,
    pub recharge: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResourceDelta {
    pub resource: ResourceId,
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EffectApplication {
    pub effect: EffectId,
    pub duration: f64,
    #[serde(default)]
    pub stacks: u32,
    /// Add to the remaining time instead of refreshing to `duration`.
    #[serde(default)]
    pub extend: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum StackOp {
    Add { effect: EffectId, count: u32 },
    Remove { effect: EffectId, count: u32 },
    Set { effect: EffectId, count: u32 },
    Clear { effect: EffectId },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StackRequirement {
    pub effect: EffectId,
    pub at_least: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbilityDef {
    pub name: String,
    #[serde(default)]
    pub base_score: f64,
    #[serde(default)]
    pub cost: Vec<ResourceDelta>,
    #[serde(default)]
    pub gain: Vec<ResourceDelta>,
    #[serde(default)]
    pub cooldown: f64,
    #[serde(default)]
    pub charges: Option<ChargeDef>,
    /// Seconds the slot takes; 0 falls back to the configured base slot.
    #[serde(default)]
    pub cast_time: f64,
    /// Off-slot abilities apply without consuming the decision slot.
    #[serde(default)]
    pub off_slot: bool,
    /// Direct score scales with the configured target count.
    #[serde(default)]
    pub aoe: bool,
    #[serde(default)]
    pub applies: Vec<EffectApplication>,
    #[serde(default)]
    pub stack_ops: Vec<StackOp>,
    #[serde(default)]
    pub requires_stacks: Option<StackRequirement>,
    /// Config flag gating this ability; absent means always enabled.
    #[serde(default)]
    pub enabled_by: Option<String>,
}

/// Expected-value proc: a fractional accumulator that grants discrete stacks
/// once it crosses 1.0, so long-run value is exact without randomness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcDef {
    pub name: String,
    pub grants: EffectId,
    #[serde(default = "default_proc_stacks")]
    pub stacks: u32,
    pub rate_per_sec: f64,
    #[serde(default)]
    pub while_active: Option<EffectId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerDef {
    pub ability: AbilityId,
    pub condition: Expr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub resources: Vec<ResourceDef>,
    pub effects: Vec<EffectDef>,
    pub abilities: Vec<AbilityDef>,
    #[serde(default)]
    pub procs: Vec<ProcDef>,
    #[serde(default)]
    pub triggers: Vec<TriggerDef>,
    /// Always-available fallback so policies never stall.
    pub filler: AbilityId,
}

impl Catalog {
    pub fn ability(&self, id: AbilityId) -> Option<&AbilityDef> {
        self.abilities.get(id.index())
    }

    pub fn effect(&self, id: EffectId) -> Option<&EffectDef> {
        self.effects.get(id.index())
    }

    pub fn resource(&self, id: ResourceId) -> Option<&ResourceDef> {
        self.resources.get(id.index())
    }

    pub fn ability_by_name(&self, name: &str) -> Option<AbilityId> {
        let key = crate::normalize(name);
        self.abilities
            .iter()
            .position(|def| crate::normalize(&def.name) == key)
            .map(|idx| AbilityId(idx as u16))
    }

    pub fn effect_by_name(&self, name: &str) -> Option<EffectId> {
        let key = crate::normalize(name);
        self.effects
            .iter()
            .position(|def| crate::normalize(&def.name) == key)
            .map(|idx| EffectId(idx as u16))
    }

    pub fn resource_by_name(&self, name: &str) -> Option<ResourceId> {
        let key = crate::normalize(name);
        self.resources
            .iter()
            .position(|def| crate::normalize(&def.name) == key)
            .map(|idx| ResourceId(idx as u8))
    }

    pub fn ability_ids(&self) -> impl Iterator<Item = AbilityId> + '_ {
        (0..self.abilities.len()).map(|idx| AbilityId(idx as u16))
    }

    /// Load-time strictness; run-time evaluation never aborts.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.abilities.is_empty() {
            return Err(CatalogError::Empty);
        }
        for def in &self.abilities {
            for delta in def.cost.iter().chain(def.gain.iter()) {
                self.check_resource(delta.resource)?;
            }
            for app in &def.applies {
                self.check_effect(app.effect)?;
            }
            for op in &def.stack_ops {
                let effect = match op {
                    StackOp::Add { effect, .. }
                    | StackOp::Remove { effect, .. }
                    | StackOp::Set { effect, .. }
                    | StackOp::Clear { effect } => *effect,
                };
                self.check_effect(effect)?;
            }
            if let Some(req) = def.requires_stacks {
                self.check_effect(req.effect)?;
            }
        }
        for def in &self.effects {
            match def.on_expire {
                Some(ExpiryEffect::GrantResource { resource, .. }) => {
                    self.check_resource(resource)?;
                }
                Some(ExpiryEffect::AddStacks { effect, .. })
                | Some(ExpiryEffect::ClearStacks { effect }) => {
                    self.check_effect(effect)?;
                }
                None => {}
            }
        }
        for proc in &self.procs {
            self.check_effect(proc.grants)?;
            if let Some(effect) = proc.while_active {
                self.check_effect(effect)?;
            }
        }
        for trigger in &self.triggers {
            let def = self
                .ability(trigger.ability)
                .ok_or(CatalogError::UnknownAbility(trigger.ability.0))?;
            if !def.off_slot {
                return Err(CatalogError::TriggerNotOffSlot(trigger.ability));
            }
        }
        let filler = self
            .ability(self.filler)
            .ok_or(CatalogError::UnknownAbility(self.filler.0))?;
        let free = filler.cost.is_empty()
            && filler.cooldown == 0.0
            && filler.charges.is_none()
            && filler.requires_stacks.is_none()
            && filler.enabled_by.is_none()
            && !filler.off_slot;
        if !free {
            return Err(CatalogError::FillerNotFree(self.filler));
        }
        Ok(())
    }

    fn check_resource(&self, id: ResourceId) -> Result<(), CatalogError> {
        if self.resource(id).is_none() {
            return Err(CatalogError::UnknownResource(id.0));
        }
        Ok(())
    }

    fn check_effect(&self, id: EffectId) -> Result<(), CatalogError> {
        if self.effect(id).is_none() {
            return Err(CatalogError::UnknownEffect(id.0));
        }
        Ok(())
    }
}

fn default_max_stacks() -> u32 {
    1
}

fn default_mult() -> f64 {
    1.0
}

fn default_proc_stacks() -> u32 {
    1
}
