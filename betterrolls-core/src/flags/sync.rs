//! Reconciling an item's stored flags against its schema.

use super::blob::{ConfigurationBlob, DamageFlag, Merge};
use super::schema::{FlagSchema, FlagSchemaCatalog};
use crate::item::{FlaggedItem, ItemId};
use crate::settings::ModuleConfig;
use crate::store::StoreError;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Errors from flag synchronization.
#[derive(Debug, Error)]
pub enum FlagError {
    #[error("Item has no data record")]
    ItemDataMissing,

    #[error("Stored flags on item {item} are malformed: {source}")]
    MalformedBlob {
        item: ItemId,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not encode flags: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Options for [`FlagSynchronizer::ensure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Persist the reconciled flags. When false only the in-memory item is updated.
    pub commit: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self { commit: true }
    }
}

impl SyncOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the item in memory only; the caller persists later.
    pub fn deferred() -> Self {
        Self { commit: false }
    }

    pub fn with_commit(mut self, commit: bool) -> Self {
        self.commit = commit;
        self
    }
}

/// Brings an item's module flags in line with its schema and damage formulas.
///
/// Not safe to run twice at once on the same item: both runs would read the
/// same stored flags and the later write wins. The `&mut` borrow of the item
/// keeps a single caller from doing so.
#[derive(Debug, Clone)]
pub struct FlagSynchronizer {
    scope: String,
}

impl Default for FlagSynchronizer {
    fn default() -> Self {
        Self::from_config(&ModuleConfig::default())
    }
}

impl FlagSynchronizer {
    /// A synchronizer writing under the given flag scope.
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
        }
    }

    pub fn from_config(config: &ModuleConfig) -> Self {
        Self::new(config.flag_scope.clone())
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Merge `stored` over the schema defaults and size the damage arrays.
    pub fn reconcile(
        schema: &FlagSchema,
        stored: ConfigurationBlob,
        formula_count: usize,
    ) -> ConfigurationBlob {
        let mut merged = schema.defaults().clone().merge(stored);
        if schema.has_damage_arrays() {
            merged
                .quick_damage
                .get_or_insert_with(DamageFlag::array)
                .resize(formula_count);
        }
        merged
    }

    /// Reconcile the item's flags, persisting them if they changed.
    ///
    /// Returns `Ok(None)` for item categories without a schema; nothing is
    /// touched in that case.
    pub async fn ensure<I>(
        &self,
        item: &mut I,
        options: SyncOptions,
    ) -> Result<Option<ConfigurationBlob>, FlagError>
    where
        I: FlaggedItem + ?Sized,
    {
        let data = item.data().ok_or(FlagError::ItemDataMissing)?;
        let Some(schema) = FlagSchemaCatalog::schema_for(&data.category) else {
            debug!(item = %data.id, category = %data.category, "no flag schema, skipping");
            return Ok(None);
        };

        let item_id = data.id;
        let stored_raw = data.flag_scope(&self.scope).cloned();
        // A null scope reads as no flags at all
        let stored = match &stored_raw {
            None | Some(Value::Null) => ConfigurationBlob::default(),
            Some(raw) => ConfigurationBlob::from_value(raw.clone())
                .map_err(|source| FlagError::MalformedBlob { item: item_id, source })?,
        };

        let merged = Self::reconcile(schema, stored, data.damage_formula_count());
        let merged_raw = merged.to_value()?;
        let changed = stored_raw.as_ref() != Some(&merged_raw);

        if !options.commit {
            if let Some(data) = item.data_mut() {
                data.flags.insert(self.scope.clone(), merged_raw);
            }
            debug!(item = %item_id, changed, "reconciled flags in memory");
        } else if changed {
            item.update_flags(&self.scope, merged_raw).await?;
            debug!(item = %item_id, "persisted reconciled flags");
        } else {
            debug!(item = %item_id, "flags already up to date");
        }

        Ok(Some(merged))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemData;
    use crate::testing::MockItem;
    use serde_json::json;

    const SCOPE: &str = "betterRollsSW5e";

    fn blaster(formulas: usize) -> ItemData {
        (0..formulas).fold(ItemData::new("Blaster Pistol", "weapon"), |item, i| {
            item.with_damage(format!("1d{}", 4 + 2 * i), "energy")
        })
    }

    #[tokio::test]
    async fn test_fresh_item_gets_defaults() {
        let mut item = MockItem::new(blaster(2));
        let sync = FlagSynchronizer::default();

        let blob = sync
            .ensure(&mut item, SyncOptions::default())
            .await
            .unwrap()
            .unwrap();

        let damage = blob.quick_damage.as_ref().unwrap();
        assert_eq!(damage.toggles(false), &[true, true]);
        assert_eq!(damage.toggles(true), &[true, true]);
        assert_eq!(item.write_count(), 1);
        assert_eq!(item.stored_flags(SCOPE), Some(blob.to_value().unwrap()));
    }

    #[tokio::test]
    async fn test_grow_defaults_new_slots_to_enabled() {
        let data = blaster(3).with_flags(
            SCOPE,
            json!({ "quickDamage": { "type": "Array", "value": [true, false], "altValue": [false, false] } }),
        );
        let mut item = MockItem::new(data);

        let blob = FlagSynchronizer::default()
            .ensure(&mut item, SyncOptions::default())
            .await
            .unwrap()
            .unwrap();

        let damage = blob.quick_damage.unwrap();
        assert_eq!(damage.value, Some(vec![true, false, true]));
        assert_eq!(damage.alt_value, Some(vec![false, false, true]));
    }

    #[tokio::test]
    async fn test_shrink_truncates() {
        let data = blaster(1).with_flags(
            SCOPE,
            json!({ "quickDamage": { "value": [true, false, true], "context": ["a", "b", "c"] } }),
        );
        let mut item = MockItem::new(data);

        let blob = FlagSynchronizer::default()
            .ensure(&mut item, SyncOptions::default())
            .await
            .unwrap()
            .unwrap();

        let damage = blob.quick_damage.unwrap();
        assert_eq!(damage.value, Some(vec![true]));
        assert_eq!(damage.context, Some(vec!["a".to_string()]));
    }

    #[tokio::test]
    async fn test_stored_toggle_wins() {
        let data = blaster(0).with_flags(SCOPE, json!({ "quickDesc": { "value": true } }));
        let mut item = MockItem::new(data);

        let blob = FlagSynchronizer::default()
            .ensure(&mut item, SyncOptions::default())
            .await
            .unwrap()
            .unwrap();

        let desc = blob.quick_desc.unwrap();
        assert_eq!(desc.value, Some(true));
        assert_eq!(desc.alt_value, Some(false));
    }

    #[tokio::test]
    async fn test_second_ensure_is_a_no_op() {
        let mut item = MockItem::new(blaster(2));
        let sync = FlagSynchronizer::default();

        let first = sync.ensure(&mut item, SyncOptions::default()).await.unwrap();
        let second = sync.ensure(&mut item, SyncOptions::default()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(item.write_count(), 1);
    }

    #[tokio::test]
    async fn test_no_schema_touches_nothing() {
        let data = ItemData::new("Credits", "loot").with_flags(SCOPE, json!({ "junk": 1 }));
        let mut item = MockItem::new(data.clone());

        let result = FlagSynchronizer::default()
            .ensure(&mut item, SyncOptions::default())
            .await
            .unwrap();

        assert!(result.is_none());
        assert_eq!(item.write_count(), 0);
        assert_eq!(item.data(), Some(&data));
    }

    #[tokio::test]
    async fn test_missing_data_is_an_error() {
        let mut item = MockItem::without_data();
        let err = FlagSynchronizer::default()
            .ensure(&mut item, SyncOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FlagError::ItemDataMissing));
    }

    #[tokio::test]
    async fn test_deferred_updates_memory_only() {
        let mut item = MockItem::new(blaster(1));

        let blob = FlagSynchronizer::default()
            .ensure(&mut item, SyncOptions::deferred())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(item.write_count(), 0);
        assert_eq!(item.stored_flags(SCOPE), Some(blob.to_value().unwrap()));
    }

    #[tokio::test]
    async fn test_storage_failure_propagates() {
        let mut item = MockItem::new(blaster(1)).failing_writes("database is read-only");

        let err = FlagSynchronizer::default()
            .ensure(&mut item, SyncOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, FlagError::Storage(StoreError::Rejected(ref m)) if m == "database is read-only"));
        assert_eq!(err.to_string(), "Write rejected: database is read-only");
        assert_eq!(item.stored_flags(SCOPE), None);
    }

    #[tokio::test]
    async fn test_malformed_stored_blob() {
        let data = blaster(1).with_flags(SCOPE, json!({ "quickAttack": { "value": 3 } }));
        let mut item = MockItem::new(data);

        let err = FlagSynchronizer::default()
            .ensure(&mut item, SyncOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FlagError::MalformedBlob { .. }));
        assert_eq!(item.write_count(), 0);
    }

    #[tokio::test]
    async fn test_null_scope_reads_as_empty() {
        let data = blaster(1).with_flags(SCOPE, json!(null));
        let mut item = MockItem::new(data);

        let blob = FlagSynchronizer::default()
            .ensure(&mut item, SyncOptions::default())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(blob.quick_damage.unwrap().value, Some(vec![true]));
        assert_eq!(item.write_count(), 1);
        assert!(item.stored_flags(SCOPE).unwrap().is_object());
    }

    #[tokio::test]
    async fn test_nested_unknown_keys_survive_ensure() {
        let data = blaster(1).with_flags(
            SCOPE,
            json!({
                "quickAttack": { "type": "Boolean", "value": true, "altValue": false, "label": "keep me" },
                "quickCharges": { "value": { "use": true, "ammo": true } },
                "quickDamage": { "value": [false], "note": "x" }
            }),
        );
        let mut item = MockItem::new(data);
        let sync = FlagSynchronizer::default();

        sync.ensure(&mut item, SyncOptions::default()).await.unwrap();
        let stored = item.stored_flags(SCOPE).unwrap();
        assert_eq!(stored["quickAttack"]["label"], json!("keep me"));
        assert_eq!(stored["quickAttack"]["altValue"], json!(false));
        assert_eq!(stored["quickCharges"]["value"]["ammo"], json!(true));
        assert_eq!(stored["quickCharges"]["value"]["quantity"], json!(false));
        assert_eq!(stored["quickDamage"]["note"], json!("x"));
        assert_eq!(stored["quickDamage"]["value"], json!([false]));
        assert_eq!(item.write_count(), 1);

        // Nothing left to fill in, so the next pass is a no-op
        sync.ensure(&mut item, SyncOptions::default()).await.unwrap();
        assert_eq!(item.write_count(), 1);
    }

    #[tokio::test]
    async fn test_custom_scope() {
        let mut item = MockItem::new(blaster(1));
        let sync = FlagSynchronizer::new("brDev");

        sync.ensure(&mut item, SyncOptions::default()).await.unwrap();
        assert!(item.stored_flags("brDev").is_some());
        assert!(item.stored_flags(SCOPE).is_none());
    }
}
