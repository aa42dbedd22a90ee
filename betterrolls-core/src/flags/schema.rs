//! Default flag shapes per item category.

use super::blob::{ChargeToggles, ChargesFlag, ConfigurationBlob, DamageFlag, TextFlag, ToggleFlag};

/// The default configuration blob of one item category.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagSchema {
    category: &'static str,
    defaults: ConfigurationBlob,
}

impl FlagSchema {
    pub fn category(&self) -> &'static str {
        self.category
    }

    /// Shared defaults. Clone before modifying.
    pub fn defaults(&self) -> &ConfigurationBlob {
        &self.defaults
    }

    /// Whether items of this category carry per-formula damage arrays.
    pub fn has_damage_arrays(&self) -> bool {
        self.defaults.quick_damage.is_some()
    }
}

fn toggle(enabled: bool) -> Option<ToggleFlag> {
    Some(ToggleFlag::boolean(enabled))
}

fn charges(value: ChargeToggles, alt_value: ChargeToggles) -> Option<ChargesFlag> {
    Some(ChargesFlag::new(value, alt_value))
}

fn usable_item(desc: bool, charges_flag: Option<ChargesFlag>) -> ConfigurationBlob {
    ConfigurationBlob {
        crit_range: Some(TextFlag::empty()),
        crit_damage: Some(TextFlag::empty()),
        quick_desc: toggle(desc),
        quick_attack: toggle(true),
        quick_save: toggle(true),
        quick_damage: Some(DamageFlag::array()),
        quick_properties: toggle(true),
        quick_charges: charges_flag,
        quick_template: toggle(true),
        quick_other: Some(ToggleFlag::boolean(true).with_context("")),
        quick_flavor: toggle(true),
        quick_prompt: toggle(false),
        ..Default::default()
    }
}

lazy_static::lazy_static! {
    static ref SCHEMAS: Vec<FlagSchema> = vec![
        FlagSchema {
            category: "weapon",
            defaults: ConfigurationBlob {
                quick_versatile: toggle(false),
                ..usable_item(
                    false,
                    charges(ChargeToggles::all(false), ChargeToggles::all(false)),
                )
            },
        },
        FlagSchema {
            category: "power",
            defaults: ConfigurationBlob {
                quick_properties: None,
                ..usable_item(
                    true,
                    charges(ChargeToggles::all(true), ChargeToggles::all(true)),
                )
            },
        },
        FlagSchema {
            category: "feat",
            defaults: usable_item(
                true,
                charges(ChargeToggles::all(true), ChargeToggles::all(true)),
            ),
        },
        FlagSchema {
            category: "consumable",
            defaults: usable_item(
                true,
                charges(
                    ChargeToggles {
                        quantity: Some(true),
                        uses: Some(true),
                        resource: Some(false),
                        ..Default::default()
                    },
                    ChargeToggles::all(true),
                ),
            ),
        },
        FlagSchema {
            category: "equipment",
            defaults: ConfigurationBlob {
                quick_desc: toggle(true),
                quick_properties: toggle(true),
                quick_charges: charges(ChargeToggles::all(false), ChargeToggles::all(false)),
                quick_other: Some(ToggleFlag::boolean(true).with_context("")),
                quick_flavor: toggle(true),
                quick_prompt: toggle(false),
                ..Default::default()
            },
        },
        FlagSchema {
            category: "tool",
            defaults: ConfigurationBlob {
                quick_desc: toggle(false),
                quick_check: toggle(true),
                quick_properties: toggle(true),
                quick_flavor: toggle(true),
                quick_prompt: toggle(false),
                ..Default::default()
            },
        },
    ];
}

/// Lookup of flag schemas by item category.
pub struct FlagSchemaCatalog;

impl FlagSchemaCatalog {
    /// The schema for `category`, `None` if items of that category carry no flags.
    pub fn schema_for(category: &str) -> Option<&'static FlagSchema> {
        SCHEMAS.iter().find(|s| s.category == category)
    }

    /// All participating categories.
    pub fn categories() -> impl Iterator<Item = &'static str> {
        SCHEMAS.iter().map(|s| s.category)
    }
}
