//! The settings registry and its snapshot.

use super::options::{
    CritBehavior, D20Mode, HideDc, OptionSpec, Placement, RollArt, RollMode, SettingKey,
    TitlePlacement,
};
use crate::store::{SettingsStore, StoreError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Namespace of host-global settings such as the roll mode.
pub const CORE_NAMESPACE: &str = "core";

/// Errors from settings operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Unknown option: {0}")]
    UnknownOption(String),

    #[error("Value {value} is not valid for option {key}")]
    InvalidValue { key: SettingKey, value: Value },

    #[error("Settings are already registered")]
    AlreadyRegistered,

    #[error("Settings have not been registered")]
    NotRegistered,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Host-facing identifiers for this module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleConfig {
    /// Namespace the options are stored under.
    pub namespace: String,

    /// Flag scope on item records.
    pub flag_scope: String,

    /// Sound played for dice when nothing else supplies one.
    pub dice_sound: String,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            namespace: "betterrollssw5e".to_string(),
            flag_scope: "betterRollsSW5e".to_string(),
            dice_sound: "sounds/dice.wav".to_string(),
        }
    }
}

impl ModuleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the settings namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the item flag scope.
    pub fn with_flag_scope(mut self, scope: impl Into<String>) -> Self {
        self.flag_scope = scope.into();
        self
    }

    /// Set the fallback dice sound.
    pub fn with_dice_sound(mut self, sound: impl Into<String>) -> Self {
        self.dice_sound = sound.into();
        self
    }
}

/// Current value of every declared option, keyed by storage key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SettingsSnapshot(BTreeMap<String, Value>);

impl SettingsSnapshot {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.0
    }
}

/// Registry of every declared option, reading through the host store.
pub struct Settings {
    config: ModuleConfig,
    store: Arc<dyn SettingsStore>,
    declared: BTreeMap<SettingKey, OptionSpec>,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("config", &self.config)
            .field("declared", &self.declared.len())
            .finish()
    }
}

impl Settings {
    /// Declare every option against `store` with the default module config.
    pub fn register(store: Arc<dyn SettingsStore>) -> Self {
        Self::register_with(ModuleConfig::default(), store)
    }

    /// Declare every option against `store`.
    pub fn register_with(config: ModuleConfig, store: Arc<dyn SettingsStore>) -> Self {
        let declared: BTreeMap<_, _> = SettingKey::ALL.iter().map(|k| (*k, k.spec())).collect();
        debug!(
            namespace = %config.namespace,
            options = declared.len(),
            "registered settings"
        );

        Self {
            config,
            store,
            declared,
        }
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    /// All declared options.
    pub fn declared(&self) -> impl Iterator<Item = &OptionSpec> {
        self.declared.values()
    }

    /// Current value of a declared option by storage key.
    pub fn get(&self, key: &str) -> Result<Value, SettingsError> {
        let key = SettingKey::from_key(key)
            .ok_or_else(|| SettingsError::UnknownOption(key.to_string()))?;
        Ok(self.value(key))
    }

    /// Current value of `key`, or its default when unset or out of domain.
    pub fn value(&self, key: SettingKey) -> Value {
        let spec = self.spec(key);
        match self.store.read(&self.config.namespace, key.as_str()) {
            Some(value) if spec.domain.accepts(&value) => value,
            Some(value) => {
                warn!(option = %key, %value, "stored value outside option domain, using default");
                spec.default
            }
            None => spec.default,
        }
    }

    /// Validate and persist a new value for a declared option.
    pub async fn set(&self, key: &str, value: Value) -> Result<(), SettingsError> {
        let key = SettingKey::from_key(key)
            .ok_or_else(|| SettingsError::UnknownOption(key.to_string()))?;
        if !self.spec(key).domain.accepts(&value) {
            return Err(SettingsError::InvalidValue { key, value });
        }

        self.store
            .write(&self.config.namespace, key.as_str(), value)
            .await?;
        Ok(())
    }

    /// Every declared option with its current value.
    pub fn snapshot(&self) -> SettingsSnapshot {
        SettingsSnapshot(
            self.declared
                .keys()
                .map(|key| (key.as_str().to_string(), self.value(*key)))
                .collect(),
        )
    }

    fn spec(&self, key: SettingKey) -> OptionSpec {
        self.declared.get(&key).cloned().unwrap_or_else(|| key.spec())
    }

    fn typed<T: DeserializeOwned + Default>(&self, key: SettingKey) -> T {
        serde_json::from_value(self.value(key)).unwrap_or_else(|e| {
            warn!(option = %key, error = %e, "option value did not decode");
            T::default()
        })
    }

    pub fn dice_enabled(&self) -> bool {
        self.typed(SettingKey::DiceEnabled)
    }

    pub fn d20_mode(&self) -> D20Mode {
        self.typed(SettingKey::D20Mode)
    }

    pub fn query_advantage_enabled(&self) -> bool {
        self.typed(SettingKey::QueryAdvantageEnabled)
    }

    pub fn roll_buttons_enabled(&self) -> bool {
        self.typed(SettingKey::RollButtonsEnabled)
    }

    pub fn image_button_enabled(&self) -> bool {
        self.typed(SettingKey::ImageButtonEnabled)
    }

    pub fn alt_secondary_enabled(&self) -> bool {
        self.typed(SettingKey::AltSecondaryEnabled)
    }

    pub fn quick_default_description_enabled(&self) -> bool {
        self.typed(SettingKey::QuickDefaultDescriptionEnabled)
    }

    pub fn default_roll_art(&self) -> RollArt {
        self.typed(SettingKey::DefaultRollArt)
    }

    pub fn roll_title_placement(&self) -> TitlePlacement {
        self.typed(SettingKey::RollTitlePlacement)
    }

    pub fn damage_title_placement(&self) -> Placement {
        self.typed(SettingKey::DamageTitlePlacement)
    }

    pub fn damage_context_placement(&self) -> Placement {
        self.typed(SettingKey::DamageContextPlacement)
    }

    pub fn damage_roll_placement(&self) -> Placement {
        self.typed(SettingKey::DamageRollPlacement)
    }

    pub fn context_replaces_title(&self) -> bool {
        self.typed(SettingKey::ContextReplacesTitle)
    }

    pub fn context_replaces_damage(&self) -> bool {
        self.typed(SettingKey::ContextReplacesDamage)
    }

    pub fn crit_behavior(&self) -> CritBehavior {
        self.typed(SettingKey::CritBehavior)
    }

    pub fn crit_string(&self) -> String {
        self.typed(SettingKey::CritString)
    }

    pub fn chat_damage_buttons_enabled(&self) -> bool {
        self.typed(SettingKey::ChatDamageButtonsEnabled)
    }

    pub fn play_roll_sounds(&self) -> bool {
        self.typed(SettingKey::PlayRollSounds)
    }

    pub fn hide_dc(&self) -> HideDc {
        self.typed(SettingKey::HideDc)
    }

    /// The host-global roll visibility mode. Unset or unrecognized means public.
    pub fn roll_mode(&self) -> RollMode {
        self.store
            .read(CORE_NAMESPACE, "rollMode")
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }

    /// The dice sound to attach to a chat message, if this module should play one.
    ///
    /// Returns `None` when roll sounds are off or when 3D dice or a Maestro
    /// track already provide a sound.
    pub fn dice_sound(&self, has_3d_dice_sound: bool, has_maestro_sound: bool) -> Option<&str> {
        if self.play_roll_sounds() && !has_3d_dice_sound && !has_maestro_sound {
            Some(&self.config.dice_sound)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySettingsStore;
    use serde_json::json;

    fn settings_with(store: MemorySettingsStore) -> Settings {
        Settings::register(Arc::new(store))
    }

    #[test]
    fn test_defaults_when_unset() {
        let settings = settings_with(MemorySettingsStore::new());

        assert!(settings.dice_enabled());
        assert_eq!(settings.d20_mode(), D20Mode::Dual);
        assert!(!settings.query_advantage_enabled());
        assert_eq!(settings.default_roll_art(), RollArt::Actor);
        assert_eq!(settings.roll_title_placement(), TitlePlacement::Above);
        assert_eq!(settings.damage_roll_placement(), Placement::Above);
        assert_eq!(settings.crit_behavior(), CritBehavior::RollCritDice);
        assert_eq!(settings.crit_string(), "Crit");
        assert_eq!(settings.hide_dc(), HideDc::Never);
        assert_eq!(settings.roll_mode(), RollMode::Public);
    }

    #[test]
    fn test_stored_values_win() {
        let store = MemorySettingsStore::new()
            .with_value("betterrollssw5e", "d20Mode", 3)
            .with_value("betterrollssw5e", "critBehavior", "3")
            .with_value("betterrollssw5e", "damageContextPlacement", "2")
            .with_value("betterrollssw5e", "contextReplacesDamage", true);
        let settings = settings_with(store);

        assert_eq!(settings.d20_mode(), D20Mode::Triple);
        assert_eq!(settings.crit_behavior(), CritBehavior::MaxBaseAndCrit);
        assert_eq!(settings.damage_context_placement(), Placement::BelowInside);
        assert!(settings.context_replaces_damage());
    }

    #[test]
    fn test_out_of_domain_value_falls_back_to_default() {
        let store = MemorySettingsStore::new()
            .with_value("betterrollssw5e", "d20Mode", 7)
            .with_value("betterrollssw5e", "playRollSounds", "yes");
        let settings = settings_with(store);

        assert_eq!(settings.d20_mode(), D20Mode::Dual);
        assert!(settings.play_roll_sounds());
        assert_eq!(settings.get("d20Mode").unwrap(), json!(2));
    }

    #[test]
    fn test_get_unknown_option() {
        let settings = settings_with(MemorySettingsStore::new());
        let err = settings.get("diceEnabeld").unwrap_err();
        assert!(matches!(err, SettingsError::UnknownOption(ref k) if k == "diceEnabeld"));
    }

    #[tokio::test]
    async fn test_set_validates_domain() {
        let settings = settings_with(MemorySettingsStore::new());

        settings.set("hideDC", json!("2")).await.unwrap();
        assert_eq!(settings.hide_dc(), HideDc::Always);

        let err = settings.set("hideDC", json!("5")).await.unwrap_err();
        assert!(matches!(
            err,
            SettingsError::InvalidValue {
                key: SettingKey::HideDc,
                ..
            }
        ));
        assert_eq!(settings.hide_dc(), HideDc::Always);

        let err = settings.set("nope", json!(true)).await.unwrap_err();
        assert!(matches!(err, SettingsError::UnknownOption(_)));
    }

    #[tokio::test]
    async fn test_snapshot_tracks_latest_values() {
        let settings = settings_with(MemorySettingsStore::new());
        settings.set("critString", json!("Critical")).await.unwrap();

        let snapshot = settings.snapshot();
        assert_eq!(snapshot.len(), SettingKey::ALL.len());
        for key in SettingKey::ALL {
            assert!(snapshot.get(key.as_str()).is_some(), "missing {key}");
        }
        assert_eq!(snapshot.get("critString"), Some(&json!("Critical")));
        assert_eq!(snapshot.get("diceEnabled"), Some(&json!(true)));

        // Snapshots are not cached
        settings.set("diceEnabled", json!(false)).await.unwrap();
        assert_eq!(snapshot.get("diceEnabled"), Some(&json!(true)));
        assert_eq!(settings.snapshot().get("diceEnabled"), Some(&json!(false)));
    }

    #[test]
    fn test_roll_mode_from_core_namespace() {
        let store = MemorySettingsStore::new().with_value(CORE_NAMESPACE, "rollMode", "blindroll");
        assert_eq!(settings_with(store).roll_mode(), RollMode::Blind);

        let store = MemorySettingsStore::new().with_value(CORE_NAMESPACE, "rollMode", "roll");
        assert_eq!(settings_with(store).roll_mode(), RollMode::Public);
    }

    #[test]
    fn test_dice_sound() {
        let settings = settings_with(MemorySettingsStore::new());
        assert_eq!(settings.dice_sound(false, false), Some("sounds/dice.wav"));
        assert_eq!(settings.dice_sound(true, false), None);
        assert_eq!(settings.dice_sound(false, true), None);

        let store =
            MemorySettingsStore::new().with_value("betterrollssw5e", "playRollSounds", false);
        assert_eq!(settings_with(store).dice_sound(false, false), None);
    }

    #[test]
    fn test_custom_namespace() {
        let store = MemorySettingsStore::new().with_value("brsw5e-dev", "critString", "Boom");
        let settings = Settings::register_with(
            ModuleConfig::new().with_namespace("brsw5e-dev"),
            Arc::new(store),
        );
        assert_eq!(settings.crit_string(), "Boom");
    }
}
