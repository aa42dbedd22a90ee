//! Option declarations and the typed values they decode into.

use crate::dice::Advantage;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Every user-configurable option this module declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SettingKey {
    DiceEnabled,
    D20Mode,
    QueryAdvantageEnabled,
    RollButtonsEnabled,
    ImageButtonEnabled,
    AltSecondaryEnabled,
    QuickDefaultDescriptionEnabled,
    DefaultRollArt,
    RollTitlePlacement,
    DamageTitlePlacement,
    DamageContextPlacement,
    DamageRollPlacement,
    ContextReplacesTitle,
    ContextReplacesDamage,
    CritBehavior,
    CritString,
    ChatDamageButtonsEnabled,
    PlayRollSounds,
    HideDc,
}

impl SettingKey {
    pub const ALL: [SettingKey; 19] = [
        SettingKey::DiceEnabled,
        SettingKey::D20Mode,
        SettingKey::QueryAdvantageEnabled,
        SettingKey::RollButtonsEnabled,
        SettingKey::ImageButtonEnabled,
        SettingKey::AltSecondaryEnabled,
        SettingKey::QuickDefaultDescriptionEnabled,
        SettingKey::DefaultRollArt,
        SettingKey::RollTitlePlacement,
        SettingKey::DamageTitlePlacement,
        SettingKey::DamageContextPlacement,
        SettingKey::DamageRollPlacement,
        SettingKey::ContextReplacesTitle,
        SettingKey::ContextReplacesDamage,
        SettingKey::CritBehavior,
        SettingKey::CritString,
        SettingKey::ChatDamageButtonsEnabled,
        SettingKey::PlayRollSounds,
        SettingKey::HideDc,
    ];

    /// The storage key, as the host settings store sees it.
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::DiceEnabled => "diceEnabled",
            SettingKey::D20Mode => "d20Mode",
            SettingKey::QueryAdvantageEnabled => "queryAdvantageEnabled",
            SettingKey::RollButtonsEnabled => "rollButtonsEnabled",
            SettingKey::ImageButtonEnabled => "imageButtonEnabled",
            SettingKey::AltSecondaryEnabled => "altSecondaryEnabled",
            SettingKey::QuickDefaultDescriptionEnabled => "quickDefaultDescriptionEnabled",
            SettingKey::DefaultRollArt => "defaultRollArt",
            SettingKey::RollTitlePlacement => "rollTitlePlacement",
            SettingKey::DamageTitlePlacement => "damageTitlePlacement",
            SettingKey::DamageContextPlacement => "damageContextPlacement",
            SettingKey::DamageRollPlacement => "damageRollPlacement",
            SettingKey::ContextReplacesTitle => "contextReplacesTitle",
            SettingKey::ContextReplacesDamage => "contextReplacesDamage",
            SettingKey::CritBehavior => "critBehavior",
            SettingKey::CritString => "critString",
            SettingKey::ChatDamageButtonsEnabled => "chatDamageButtonsEnabled",
            SettingKey::PlayRollSounds => "playRollSounds",
            SettingKey::HideDc => "hideDC",
        }
    }

    /// Look up a declared option by its storage key.
    pub fn from_key(key: &str) -> Option<SettingKey> {
        SettingKey::ALL.iter().copied().find(|k| k.as_str() == key)
    }

    /// The full declaration of this option.
    pub fn spec(&self) -> OptionSpec {
        let (domain, default) = match self {
            SettingKey::DiceEnabled
            | SettingKey::RollButtonsEnabled
            | SettingKey::ImageButtonEnabled
            | SettingKey::AltSecondaryEnabled
            | SettingKey::ChatDamageButtonsEnabled
            | SettingKey::PlayRollSounds => (OptionDomain::Boolean, json!(true)),
            SettingKey::QueryAdvantageEnabled
            | SettingKey::QuickDefaultDescriptionEnabled
            | SettingKey::ContextReplacesTitle
            | SettingKey::ContextReplacesDamage => (OptionDomain::Boolean, json!(false)),
            SettingKey::D20Mode => (OptionDomain::IntegerChoice(D20_MODE_CHOICES), json!(2)),
            SettingKey::DefaultRollArt => (OptionDomain::StringChoice(ROLL_ART_CHOICES), json!("actor")),
            SettingKey::RollTitlePlacement => {
                (OptionDomain::StringChoice(TITLE_PLACEMENT_CHOICES), json!("1"))
            }
            SettingKey::DamageTitlePlacement
            | SettingKey::DamageContextPlacement
            | SettingKey::DamageRollPlacement => {
                (OptionDomain::StringChoice(PLACEMENT_CHOICES), json!("1"))
            }
            SettingKey::CritBehavior => (OptionDomain::StringChoice(CRIT_BEHAVIOR_CHOICES), json!("1")),
            SettingKey::CritString => (OptionDomain::Text, json!("Crit")),
            SettingKey::HideDc => (OptionDomain::StringChoice(HIDE_DC_CHOICES), json!("0")),
        };

        OptionSpec {
            key: *self,
            scope: OptionScope::World,
            config: true,
            domain,
            default,
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const D20_MODE_CHOICES: &[(i64, &str)] = &[
    (1, "brsw5e.d20Mode.choices.1"),
    (2, "brsw5e.d20Mode.choices.2"),
    (3, "brsw5e.d20Mode.choices.3"),
];

const ROLL_ART_CHOICES: &[(&str, &str)] = &[("actor", "Actor"), ("token", "Token")];

const TITLE_PLACEMENT_CHOICES: &[(&str, &str)] = &[
    ("0", "brsw5e.damageRollPlacement.choices.0"),
    ("1", "brsw5e.damageRollPlacement.choices.1"),
];

const PLACEMENT_CHOICES: &[(&str, &str)] = &[
    ("0", "brsw5e.damageRollPlacement.choices.0"),
    ("1", "brsw5e.damageRollPlacement.choices.1"),
    ("2", "brsw5e.damageRollPlacement.choices.2"),
    ("3", "brsw5e.damageRollPlacement.choices.3"),
];

const CRIT_BEHAVIOR_CHOICES: &[(&str, &str)] = &[
    ("0", "brsw5e.critBehavior.choices.0"),
    ("1", "brsw5e.critBehavior.choices.1"),
    ("2", "brsw5e.critBehavior.choices.2"),
    ("3", "brsw5e.critBehavior.choices.3"),
];

const HIDE_DC_CHOICES: &[(&str, &str)] = &[
    ("0", "brsw5e.hideDC.choices.0"),
    ("1", "brsw5e.hideDC.choices.1"),
    ("2", "brsw5e.hideDC.choices.2"),
];

/// Where an option is stored on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionScope {
    World,
    Client,
}

/// The set of values an option accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionDomain {
    Boolean,
    /// Integer choices with their label keys.
    IntegerChoice(&'static [(i64, &'static str)]),
    /// String choices with their label keys.
    StringChoice(&'static [(&'static str, &'static str)]),
    /// Any string.
    Text,
}

impl OptionDomain {
    /// Whether `value` lies in this domain.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            OptionDomain::Boolean => value.is_boolean(),
            OptionDomain::IntegerChoice(choices) => value
                .as_i64()
                .map(|n| choices.iter().any(|(choice, _)| *choice == n))
                .unwrap_or(false),
            OptionDomain::StringChoice(choices) => value
                .as_str()
                .map(|s| choices.iter().any(|(choice, _)| *choice == s))
                .unwrap_or(false),
            OptionDomain::Text => value.is_string(),
        }
    }
}

/// A declared option.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionSpec {
    pub key: SettingKey,
    pub scope: OptionScope,
    /// Shown in the host's settings UI.
    pub config: bool,
    pub domain: OptionDomain,
    pub default: Value,
}

impl OptionSpec {
    /// Localization key of the option label.
    pub fn name_key(&self) -> String {
        format!("brsw5e.{}.name", self.key)
    }

    /// Localization key of the option hint.
    pub fn hint_key(&self) -> String {
        format!("brsw5e.{}.hint", self.key)
    }
}

// ============================================================================
// Typed values
// ============================================================================

/// How many d20s an attack or check rolls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum D20Mode {
    /// One die, upgraded to two with advantage or disadvantage.
    Single,
    #[default]
    Dual,
    Triple,
}

impl D20Mode {
    /// Number of d20s a check rolls under this mode.
    ///
    /// Elven accuracy raises an advantaged roll to three dice.
    pub fn d20_count(self, advantage: Advantage, elven_accuracy: bool) -> u32 {
        let count = match (self, advantage) {
            (D20Mode::Single, Advantage::Normal) => 1,
            (D20Mode::Single, _) | (D20Mode::Dual, _) => 2,
            (D20Mode::Triple, _) => 3,
        };

        if elven_accuracy && advantage == Advantage::Advantage {
            count.max(3)
        } else {
            count
        }
    }
}

impl TryFrom<u8> for D20Mode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(D20Mode::Single),
            2 => Ok(D20Mode::Dual),
            3 => Ok(D20Mode::Triple),
            other => Err(format!("invalid d20 mode: {other}")),
        }
    }
}

impl From<D20Mode> for u8 {
    fn from(mode: D20Mode) -> Self {
        match mode {
            D20Mode::Single => 1,
            D20Mode::Dual => 2,
            D20Mode::Triple => 3,
        }
    }
}

/// Which image represents the roller on a chat card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RollArt {
    #[default]
    Actor,
    Token,
}

/// Placement of the roll title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TitlePlacement {
    #[serde(rename = "0")]
    Hidden,
    #[default]
    #[serde(rename = "1")]
    Above,
}

/// Placement of damage titles, context labels and damage rolls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Placement {
    #[serde(rename = "0")]
    Hidden,
    #[default]
    #[serde(rename = "1")]
    Above,
    #[serde(rename = "2")]
    BelowInside,
    #[serde(rename = "3")]
    BelowOutside,
}

/// Extra damage applied on a critical hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CritBehavior {
    #[serde(rename = "0")]
    NoExtraDamage,
    #[default]
    #[serde(rename = "1")]
    RollCritDice,
    #[serde(rename = "2")]
    RollBaseMaxCrit,
    #[serde(rename = "3")]
    MaxBaseAndCrit,
}

/// Who gets to see save DCs on chat cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HideDc {
    #[default]
    #[serde(rename = "0")]
    Never,
    #[serde(rename = "1")]
    NpcsOnly,
    #[serde(rename = "2")]
    Always,
}

/// The host-global roll visibility mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RollMode {
    #[default]
    #[serde(rename = "publicroll", alias = "public")]
    Public,
    /// Visible to the roller and game masters.
    #[serde(rename = "gmroll", alias = "private")]
    Private,
    /// Visible to game masters only, hidden from the roller.
    #[serde(rename = "blindroll", alias = "blind")]
    Blind,
    #[serde(rename = "selfroll", alias = "self")]
    SelfOnly,
}
