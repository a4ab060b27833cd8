use crate::PolicyError;
use rotasim_core::{AbilityId, Catalog, Expr};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SubListMode {
    /// Control returns to the caller's scan when nothing in the sub-list fires.
    Fallthrough,
    /// Control transfers into the sub-list and never returns.
    Exclusive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RuleEntry {
    Action {
        ability: AbilityId,
        #[serde(default = "always")]
        condition: Expr,
    },
    Variable {
        name: String,
        expr: Expr,
        #[serde(default = "always")]
        condition: Expr,
    },
    SubList {
        name: String,
        mode: SubListMode,
        #[serde(default = "always")]
        condition: Expr,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedList {
    pub name: String,
    pub entries: Vec<RuleEntry>,
}

/// An externally authored, already-parsed priority list. Immutable once
/// loaded; policies reference it, never mutate it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSet {
    pub lists: Vec<NamedList>,
    #[serde(default = "default_entry")]
    pub entry: String,
}

impl RuleSet {
    pub fn single(entries: Vec<RuleEntry>) -> Self {
        Self {
            lists: vec![NamedList {
                name: default_entry(),
                entries,
            }],
            entry: default_entry(),
        }
    }

    pub fn list(&self, name: &str) -> Option<&[RuleEntry]> {
        let key = rotasim_core::normalize(name);
        self.lists
            .iter()
            .find(|list| rotasim_core::normalize(&list.name) == key)
            .map(|list| list.entries.as_slice())
    }

    /// Structural checks only; unresolvable conditions and unknown abilities
    /// still degrade to "rule does not fire" at evaluation time.
    pub fn validate(&self, catalog: &Catalog) -> Result<(), PolicyError> {
        if self.list(&self.entry).is_none() {
            return Err(PolicyError::MissingEntryList);
        }
        for list in &self.lists {
            for entry in &list.entries {
                if let RuleEntry::SubList { name, .. } = entry {
                    if self.list(name).is_none() {
                        return Err(PolicyError::UnknownList(name.clone()));
                    }
                }
                if let RuleEntry::Action { ability, .. } = entry {
                    if catalog.ability(*ability).is_none() {
                        return Err(PolicyError::Catalog(
                            rotasim_core::CatalogError::UnknownAbility(ability.0),
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

fn always() -> Expr {
    Expr::Bool(true)
}

fn default_entry() -> String {
    "default".to_string()
}
