use serde::{Deserialize, Serialize};

/// Index into the catalog's ability table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AbilityId(pub u16);

/// Index into the catalog's resource table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ResourceId(pub u8);

/// Index into the catalog's effect table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EffectId(pub u16);

impl AbilityId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl ResourceId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl EffectId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}
