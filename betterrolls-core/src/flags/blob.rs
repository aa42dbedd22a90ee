//! The per-item configuration blob and its merge rules.
//!
//! Every flag is optional at every level so the same types describe both a
//! schema's defaults and a partial, possibly stale, stored blob. Merging is
//! field by field: the stored side wins, the defaults fill whatever it lacks.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Type marker stored next to every flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlagKind {
    Boolean,
    String,
    Array,
}

/// Merge a stored value over a default.
pub trait Merge {
    fn merge(self, stored: Self) -> Self;
}

impl<T: Merge> Merge for Option<T> {
    fn merge(self, stored: Self) -> Self {
        match (self, stored) {
            (Some(default), Some(stored)) => Some(default.merge(stored)),
            (default, stored) => stored.or(default),
        }
    }
}

/// A quick-roll toggle with separate values for normal and alt rolls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleFlag {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<FlagKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_value: Option<bool>,
    /// Free-text label, only used by `quickOther`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ToggleFlag {
    /// A boolean toggle with the same default for normal and alt rolls.
    pub fn boolean(enabled: bool) -> Self {
        Self {
            kind: Some(FlagKind::Boolean),
            value: Some(enabled),
            alt_value: Some(enabled),
            context: None,
            extra: Map::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn enabled(&self, alt: bool) -> bool {
        let value = if alt { self.alt_value } else { self.value };
        value.unwrap_or(false)
    }
}

impl Merge for ToggleFlag {
    fn merge(self, stored: Self) -> Self {
        Self {
            kind: stored.kind.or(self.kind),
            value: stored.value.or(self.value),
            alt_value: stored.alt_value.or(self.alt_value),
            context: stored.context.or(self.context),
            extra: merge_maps(self.extra, stored.extra),
        }
    }
}

/// A free-text flag such as a crit range override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextFlag {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<FlagKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TextFlag {
    pub fn empty() -> Self {
        Self {
            kind: Some(FlagKind::String),
            value: Some(String::new()),
            extra: Map::new(),
        }
    }

    /// The value, `None` when unset or blank.
    pub fn get(&self) -> Option<&str> {
        self.value.as_deref().filter(|v| !v.trim().is_empty())
    }
}

impl Merge for TextFlag {
    fn merge(self, stored: Self) -> Self {
        Self {
            kind: stored.kind.or(self.kind),
            value: stored.value.or(self.value),
            extra: merge_maps(self.extra, stored.extra),
        }
    }
}

/// Which resources an item use consumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChargeToggles {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<bool>,
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub uses: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChargeToggles {
    pub fn all(enabled: bool) -> Self {
        Self {
            quantity: Some(enabled),
            uses: Some(enabled),
            resource: Some(enabled),
            extra: Map::new(),
        }
    }
}

impl Merge for ChargeToggles {
    fn merge(self, stored: Self) -> Self {
        Self {
            quantity: stored.quantity.or(self.quantity),
            uses: stored.uses.or(self.uses),
            resource: stored.resource.or(self.resource),
            extra: merge_maps(self.extra, stored.extra),
        }
    }
}

/// Charge consumption toggles for normal and alt rolls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargesFlag {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<FlagKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ChargeToggles>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_value: Option<ChargeToggles>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChargesFlag {
    pub fn new(value: ChargeToggles, alt_value: ChargeToggles) -> Self {
        Self {
            kind: Some(FlagKind::Boolean),
            value: Some(value),
            alt_value: Some(alt_value),
            extra: Map::new(),
        }
    }
}

impl Merge for ChargesFlag {
    fn merge(self, stored: Self) -> Self {
        Self {
            kind: stored.kind.or(self.kind),
            value: self.value.merge(stored.value),
            alt_value: self.alt_value.merge(stored.alt_value),
            extra: merge_maps(self.extra, stored.extra),
        }
    }
}

/// Per-damage-formula toggles and context labels.
///
/// After reconciliation every array has one slot per damage formula.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageFlag {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<FlagKind>,
    #[serde(
        default,
        deserialize_with = "nullable_toggles",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<Vec<bool>>,
    #[serde(
        default,
        deserialize_with = "nullable_toggles",
        skip_serializing_if = "Option::is_none"
    )]
    pub alt_value: Option<Vec<bool>>,
    #[serde(
        default,
        deserialize_with = "nullable_labels",
        skip_serializing_if = "Option::is_none"
    )]
    pub context: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DamageFlag {
    /// Empty arrays, sized later against the item's formulas.
    pub fn array() -> Self {
        Self {
            kind: Some(FlagKind::Array),
            value: Some(Vec::new()),
            alt_value: Some(Vec::new()),
            context: Some(Vec::new()),
            extra: Map::new(),
        }
    }

    /// Size every array to `formula_count`. New toggles are enabled and new
    /// labels blank; slots past the end are dropped.
    pub fn resize(&mut self, formula_count: usize) {
        resize_slots(&mut self.value, formula_count, true);
        resize_slots(&mut self.alt_value, formula_count, true);
        resize_slots(&mut self.context, formula_count, String::new());
    }

    /// Toggles for normal or alt rolls.
    pub fn toggles(&self, alt: bool) -> &[bool] {
        let toggles = if alt { &self.alt_value } else { &self.value };
        toggles.as_deref().unwrap_or(&[])
    }

    /// Context label of one formula, `None` when blank.
    pub fn context_for(&self, index: usize) -> Option<&str> {
        self.context
            .as_ref()
            .and_then(|c| c.get(index))
            .map(String::as_str)
            .filter(|c| !c.is_empty())
    }
}

impl Merge for DamageFlag {
    // Arrays are replaced wholesale, never merged element-wise.
    fn merge(self, stored: Self) -> Self {
        Self {
            kind: stored.kind.or(self.kind),
            value: stored.value.or(self.value),
            alt_value: stored.alt_value.or(self.alt_value),
            context: stored.context.or(self.context),
            extra: merge_maps(self.extra, stored.extra),
        }
    }
}

/// Resize `slots` to exactly `len`, creating it if absent.
pub fn resize_slots<T: Clone>(slots: &mut Option<Vec<T>>, len: usize, fill: T) {
    slots.get_or_insert_with(Vec::new).resize(len, fill);
}

// Stored arrays may contain holes; a hole reads as the slot default.
fn nullable_toggles<'de, D>(deserializer: D) -> Result<Option<Vec<bool>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<Option<bool>>> = Option::deserialize(deserializer)?;
    Ok(raw.map(|slots| slots.into_iter().map(|s| s.unwrap_or(true)).collect()))
}

fn nullable_labels<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<Option<String>>> = Option::deserialize(deserializer)?;
    Ok(raw.map(|slots| slots.into_iter().map(Option::unwrap_or_default).collect()))
}

/// The module's flags on one item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationBlob {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crit_range: Option<TextFlag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crit_damage: Option<TextFlag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_desc: Option<ToggleFlag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_attack: Option<ToggleFlag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_save: Option<ToggleFlag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_check: Option<ToggleFlag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_damage: Option<DamageFlag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_versatile: Option<ToggleFlag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_properties: Option<ToggleFlag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_charges: Option<ChargesFlag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_template: Option<ToggleFlag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_other: Option<ToggleFlag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_flavor: Option<ToggleFlag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_prompt: Option<ToggleFlag>,
    /// Keys this crate does not model, carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConfigurationBlob {
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl Merge for ConfigurationBlob {
    fn merge(self, stored: Self) -> Self {
        Self {
            crit_range: self.crit_range.merge(stored.crit_range),
            crit_damage: self.crit_damage.merge(stored.crit_damage),
            quick_desc: self.quick_desc.merge(stored.quick_desc),
            quick_attack: self.quick_attack.merge(stored.quick_attack),
            quick_save: self.quick_save.merge(stored.quick_save),
            quick_check: self.quick_check.merge(stored.quick_check),
            quick_damage: self.quick_damage.merge(stored.quick_damage),
            quick_versatile: self.quick_versatile.merge(stored.quick_versatile),
            quick_properties: self.quick_properties.merge(stored.quick_properties),
            quick_charges: self.quick_charges.merge(stored.quick_charges),
            quick_template: self.quick_template.merge(stored.quick_template),
            quick_other: self.quick_other.merge(stored.quick_other),
            quick_flavor: self.quick_flavor.merge(stored.quick_flavor),
            quick_prompt: self.quick_prompt.merge(stored.quick_prompt),
            extra: merge_maps(self.extra, stored.extra),
        }
    }
}

/// Keys a flag type does not model, merged key by key with the stored side winning.
fn merge_maps(mut default: Map<String, Value>, stored: Map<String, Value>) -> Map<String, Value> {
    for (key, stored_value) in stored {
        let merged = match default.remove(&key) {
            Some(d) => merge_json(d, stored_value),
            None => stored_value,
        };
        default.insert(key, merged);
    }
    default
}

/// Recursive merge for untyped values: objects merge key by key, anything
/// else is replaced by the stored side.
fn merge_json(default: Value, stored: Value) -> Value {
    match (default, stored) {
        (Value::Object(default), Value::Object(stored)) => {
            Value::Object(merge_maps(default, stored))
        }
        (_, stored) => stored,
    }
}
