//! Per-item configuration flags.
//!
//! - [`schema`]: the default flag shape for each item category
//! - [`blob`]: the flag model and its merge rules
//! - [`sync`]: reconciling and persisting one item's flags

pub mod blob;
pub mod schema;
pub mod sync;

pub use blob::{
    ChargeToggles, ChargesFlag, ConfigurationBlob, DamageFlag, FlagKind, Merge, TextFlag,
    ToggleFlag,
};
pub use schema::{FlagSchema, FlagSchemaCatalog};
pub use sync::{FlagError, FlagSynchronizer, SyncOptions};
