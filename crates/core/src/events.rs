use crate::{AbilityId, EffectId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Event {
    ActionApplied {
        ability: AbilityId,
        score: f64,
        off_slot: bool,
    },
    ActionRejected { ability: AbilityId },
    EffectApplied {
        effect: EffectId,
        remaining: f64,
    },
    EffectExpired { effect: EffectId },
    ProcFired {
        effect: EffectId,
        stacks: u32,
    },
    TriggerFired { ability: AbilityId },
    TriggerCapHit { fired: u32 },
    RuleSkipped {
        list: String,
        index: usize,
    },
    RuleDepthExceeded { list: String },
}

#[derive(Debug, Default)]
pub struct EventBus {
    queue: Vec<Event>,
}

impl EventBus {
    pub fn push(&mut self, event: Event) {
        self.queue.push(event);
    }

    pub fn drain(&mut self) -> impl Iterator<Item = Event> + '_ {
        self.queue.drain(..)
    }
}
