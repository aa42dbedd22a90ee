//! User-configurable options.
//!
//! Options are declared once against a host [`SettingsStore`] and read back
//! through typed accessors on [`Settings`]. A process-wide handle is
//! available through [`init`], [`global`] and [`teardown`] for hosts that
//! do not want to thread the registry through every call.

mod options;
mod registry;

pub use options::{
    CritBehavior, D20Mode, HideDc, OptionDomain, OptionScope, OptionSpec, Placement, RollArt,
    RollMode, SettingKey, TitlePlacement,
};
pub use registry::{ModuleConfig, Settings, SettingsError, SettingsSnapshot, CORE_NAMESPACE};

use crate::store::SettingsStore;
use once_cell::sync::Lazy;
use std::sync::{Arc, PoisonError, RwLock};

static GLOBAL: Lazy<RwLock<Option<Arc<Settings>>>> = Lazy::new(|| RwLock::new(None));

/// Register the process-wide settings. Fails if already registered.
pub fn init(config: ModuleConfig, store: Arc<dyn SettingsStore>) -> Result<Arc<Settings>, SettingsError> {
    let mut slot = GLOBAL.write().unwrap_or_else(PoisonError::into_inner);
    if slot.is_some() {
        return Err(SettingsError::AlreadyRegistered);
    }

    let settings = Arc::new(Settings::register_with(config, store));
    *slot = Some(Arc::clone(&settings));
    Ok(settings)
}

/// The process-wide settings registered by [`init`].
pub fn global() -> Result<Arc<Settings>, SettingsError> {
    GLOBAL
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
        .ok_or(SettingsError::NotRegistered)
}

/// Drop the process-wide settings so [`init`] can run again.
pub fn teardown() -> Option<Arc<Settings>> {
    GLOBAL.write().unwrap_or_else(PoisonError::into_inner).take()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySettingsStore;

    // The only test in this crate touching the global slot.
    #[test]
    fn test_global_lifecycle() {
        teardown();
        assert!(matches!(global(), Err(SettingsError::NotRegistered)));

        let settings = init(ModuleConfig::new(), Arc::new(MemorySettingsStore::new())).unwrap();
        assert!(Arc::ptr_eq(&settings, &global().unwrap()));

        let again = init(ModuleConfig::new(), Arc::new(MemorySettingsStore::new()));
        assert!(matches!(again, Err(SettingsError::AlreadyRegistered)));

        assert!(teardown().is_some());
        assert!(global().is_err());
        assert!(init(ModuleConfig::new(), Arc::new(MemorySettingsStore::new())).is_ok());
        teardown();
    }
}
