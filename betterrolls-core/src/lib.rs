//! Extended roll configuration for a virtual tabletop.
//!
//! This crate provides:
//! - A settings registry with typed accessors and a flat snapshot
//! - Per-item flag reconciliation against category schemas and damage formulas
//! - A dice pool that batches the dice of one action for a 3D dice sink
//!
//! The host (item storage, settings storage, dice renderer) is reached
//! through the [`SettingsStore`], [`FlaggedItem`], [`DiceHost`] and
//! [`DiceSink`] traits.
//!
//! # Quick Start
//!
//! ```ignore
//! use betterrolls_core::{
//!     DiceHost, DicePool, FlagSynchronizer, FlaggedItem, Roll, Settings, SettingsStore,
//!     SyncOptions,
//! };
//! use std::sync::Arc;
//!
//! async fn attack(
//!     item: &mut impl FlaggedItem,
//!     host: Arc<dyn DiceHost>,
//!     store: Arc<dyn SettingsStore>,
//!     attack_roll: Roll,
//!     damage_rolls: Vec<Roll>,
//! ) -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Arc::new(Settings::register(store));
//!     let Some(flags) = FlagSynchronizer::default()
//!         .ensure(item, SyncOptions::default())
//!         .await?
//!     else {
//!         return Ok(());
//!     };
//!
//!     let mut pool = DicePool::new(host, settings);
//!     pool.push([&attack_roll]);
//!     if let Some(damage) = &flags.quick_damage {
//!         let enabled = damage_rolls
//!             .iter()
//!             .zip(damage.toggles(false))
//!             .filter(|(_, on)| **on)
//!             .map(|(roll, _)| roll);
//!         pool.push(enabled);
//!     }
//!     pool.flush().await;
//!     Ok(())
//! }
//! ```

pub mod dice;
pub mod flags;
pub mod item;
pub mod pool;
pub mod settings;
pub mod store;
pub mod testing;

// Primary public API
pub use dice::{Advantage, DiceTerm, Roll};
pub use flags::{ConfigurationBlob, FlagError, FlagSchemaCatalog, FlagSynchronizer, SyncOptions};
pub use item::{FlaggedItem, ItemData};
pub use pool::{DiceHost, DicePool, DiceSink, UserId, WhisperData};
pub use settings::{ModuleConfig, Settings, SettingsError, SettingsSnapshot};
pub use store::{JsonFileSettingsStore, MemorySettingsStore, SettingsStore, StoreError};
pub use testing::{MockItem, RecordingSink, TestHarness};
