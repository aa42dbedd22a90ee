//! Host item records as seen by the flag synchronizer.

use crate::store::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One damage formula on an item, e.g. `1d8 + @mod` kinetic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamagePart {
    pub formula: String,
    pub damage_type: String,
}

/// The data record of an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemData {
    pub id: ItemId,
    pub name: String,
    /// Item category, e.g. `weapon` or `power`.
    #[serde(rename = "type")]
    pub category: String,
    #[serde(default)]
    pub damage_parts: Vec<DamagePart>,
    /// Module flags, keyed by flag scope.
    #[serde(default)]
    pub flags: Map<String, Value>,
}

impl ItemData {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: ItemId::new(),
            name: name.into(),
            category: category.into(),
            damage_parts: Vec::new(),
            flags: Map::new(),
        }
    }

    /// Add a damage formula.
    pub fn with_damage(mut self, formula: impl Into<String>, damage_type: impl Into<String>) -> Self {
        self.damage_parts.push(DamagePart {
            formula: formula.into(),
            damage_type: damage_type.into(),
        });
        self
    }

    /// Set the raw flag blob stored under `scope`.
    pub fn with_flags(mut self, scope: impl Into<String>, flags: Value) -> Self {
        self.flags.insert(scope.into(), flags);
        self
    }

    /// Number of damage formulas on the item.
    pub fn damage_formula_count(&self) -> usize {
        self.damage_parts.len()
    }

    /// Raw flag blob stored under `scope`.
    pub fn flag_scope(&self, scope: &str) -> Option<&Value> {
        self.flags.get(scope)
    }
}

/// An item whose module flags can be read and written.
///
/// `update_flags` must also refresh the item's in-memory data once the
/// write has been accepted.
#[async_trait]
pub trait FlaggedItem: Send {
    /// The item's data record, `None` if the host has not loaded one.
    fn data(&self) -> Option<&ItemData>;

    fn data_mut(&mut self) -> Option<&mut ItemData>;

    /// Persist `flags` under `scope` on the item's record.
    async fn update_flags(&mut self, scope: &str, flags: Value) -> Result<(), StoreError>;
}
