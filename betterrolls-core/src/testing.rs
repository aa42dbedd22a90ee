//! In-memory host doubles for tests.
//!
//! - `MockItem` for flag synchronization without a real item store
//! - `RecordingSink` / `MockHost` for dice pools without a 3D dice renderer
//! - `TestHarness` wiring settings, host and sink together

use crate::dice::Roll;
use crate::item::{FlaggedItem, ItemData};
use crate::pool::{DiceHost, DicePool, DiceSink, SinkError, UserId};
use crate::settings::{RollMode, Settings, CORE_NAMESPACE};
use crate::store::{MemorySettingsStore, SettingsStore, StoreError};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};

/// An item held in memory that records every flag write.
#[derive(Debug, Default)]
pub struct MockItem {
    data: Option<ItemData>,
    writes: Vec<(String, Value)>,
    failure: Option<String>,
}

impl MockItem {
    pub fn new(data: ItemData) -> Self {
        Self {
            data: Some(data),
            ..Default::default()
        }
    }

    /// An item the host never loaded a data record for.
    pub fn without_data() -> Self {
        Self::default()
    }

    /// Reject every write with `reason`.
    pub fn failing_writes(mut self, reason: impl Into<String>) -> Self {
        self.failure = Some(reason.into());
        self
    }

    /// Every accepted write as `(scope, flags)`.
    pub fn writes(&self) -> &[(String, Value)] {
        &self.writes
    }

    pub fn write_count(&self) -> usize {
        self.writes.len()
    }

    /// Flags currently on the in-memory record under `scope`.
    pub fn stored_flags(&self, scope: &str) -> Option<Value> {
        self.data.as_ref()?.flag_scope(scope).cloned()
    }
}

#[async_trait]
impl FlaggedItem for MockItem {
    fn data(&self) -> Option<&ItemData> {
        self.data.as_ref()
    }

    fn data_mut(&mut self) -> Option<&mut ItemData> {
        self.data.as_mut()
    }

    async fn update_flags(&mut self, scope: &str, flags: Value) -> Result<(), StoreError> {
        if let Some(reason) = &self.failure {
            return Err(StoreError::Rejected(reason.clone()));
        }

        if let Some(data) = self.data.as_mut() {
            data.flags.insert(scope.to_string(), flags.clone());
        }
        self.writes.push((scope.to_string(), flags));
        Ok(())
    }
}

/// One call received by a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct ShownRoll {
    pub roll: Roll,
    pub user: UserId,
    pub synchronize: bool,
    pub whisper: Option<Vec<UserId>>,
    pub blind: bool,
}

/// A dice sink that remembers what it was asked to show.
#[derive(Debug, Default)]
pub struct RecordingSink {
    shown: Mutex<Vec<ShownRoll>>,
    failure: Mutex<Option<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every following call with `reason`.
    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = Some(reason.into());
    }

    pub fn shown(&self) -> Vec<ShownRoll> {
        self.shown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl DiceSink for RecordingSink {
    async fn show_for_roll(
        &self,
        roll: &Roll,
        user: UserId,
        synchronize: bool,
        whisper: Option<&[UserId]>,
        blind: bool,
    ) -> Result<(), SinkError> {
        let failure = self
            .failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(reason) = failure {
            return Err(SinkError::Failed(reason));
        }

        self.shown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ShownRoll {
                roll: roll.clone(),
                user,
                synchronize,
                whisper: whisper.map(<[UserId]>::to_vec),
                blind,
            });
        Ok(())
    }
}

/// A host with one acting user, one game master and an optional sink.
#[derive(Debug)]
pub struct MockHost {
    pub user: UserId,
    pub game_masters: Vec<UserId>,
    sink: Option<Arc<RecordingSink>>,
}

impl MockHost {
    pub fn new(sink: Option<Arc<RecordingSink>>) -> Self {
        Self {
            user: UserId::new(),
            game_masters: vec![UserId::new()],
            sink,
        }
    }
}

impl DiceHost for MockHost {
    fn current_user(&self) -> UserId {
        self.user
    }

    fn game_masters(&self) -> Vec<UserId> {
        self.game_masters.clone()
    }

    fn dice_sink(&self) -> Option<Arc<dyn DiceSink>> {
        self.sink.clone().map(|s| s as Arc<dyn DiceSink>)
    }
}

/// Settings, host and sink wired together for pool and settings tests.
pub struct TestHarness {
    pub store: Arc<MemorySettingsStore>,
    pub sink: Arc<RecordingSink>,
    pub host: Arc<MockHost>,
    settings: Arc<Settings>,
}

impl TestHarness {
    /// A harness whose host has a recording dice sink installed.
    pub fn new() -> Self {
        let sink = Arc::new(RecordingSink::new());
        Self::build(Arc::clone(&sink), Some(sink))
    }

    /// A harness whose host has no dice sink.
    pub fn without_sink() -> Self {
        Self::build(Arc::new(RecordingSink::new()), None)
    }

    fn build(sink: Arc<RecordingSink>, installed: Option<Arc<RecordingSink>>) -> Self {
        let store = Arc::new(MemorySettingsStore::new());
        let settings = Arc::new(Settings::register(store.clone()));
        let host = Arc::new(MockHost::new(installed));
        Self {
            store,
            sink,
            host,
            settings,
        }
    }

    pub fn settings(&self) -> Arc<Settings> {
        Arc::clone(&self.settings)
    }

    pub fn dice_host(&self) -> Arc<dyn DiceHost> {
        self.host.clone()
    }

    /// A fresh, empty dice pool.
    pub fn pool(&self) -> DicePool {
        DicePool::new(self.dice_host(), self.settings())
    }

    /// Change the host-global roll mode.
    pub async fn set_roll_mode(&self, mode: RollMode) -> Result<(), StoreError> {
        let value = serde_json::to_value(mode)?;
        self.store.write(CORE_NAMESPACE, "rollMode", value).await
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
