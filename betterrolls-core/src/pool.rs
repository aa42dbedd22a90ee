//! Pooling dice across the sub-rolls of one action.
//!
//! An attack and its damage are rolled separately but should animate as a
//! single event. A [`DicePool`] collects the dice of every sub-roll and
//! hands them to the host's 3D dice sink in one go.

use crate::dice::Roll;
use crate::settings::{RollMode, Settings};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

/// Unique identifier for a host user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error reported by a dice sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Dice animation failed: {0}")]
    Failed(String),
}

/// An external subsystem that animates dice.
#[async_trait]
pub trait DiceSink: Send + Sync {
    /// Animate `roll` for `user`. `whisper` limits who sees it; `blind`
    /// hides it from the roller.
    async fn show_for_roll(
        &self,
        roll: &Roll,
        user: UserId,
        synchronize: bool,
        whisper: Option<&[UserId]>,
        blind: bool,
    ) -> Result<(), SinkError>;
}

/// What the pool needs to know about the host at flush time.
pub trait DiceHost: Send + Sync {
    /// The user performing the action.
    fn current_user(&self) -> UserId;

    fn game_masters(&self) -> Vec<UserId>;

    /// The 3D dice sink, if one is installed right now.
    fn dice_sink(&self) -> Option<Arc<dyn DiceSink>>;
}

/// Visibility of a roll derived from the roll mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhisperData {
    pub roll_mode: RollMode,
    /// Users allowed to see the roll; `None` means everyone.
    pub whisper: Option<Vec<UserId>>,
    pub blind: bool,
}

impl WhisperData {
    pub fn for_roll_mode(roll_mode: RollMode, user: UserId, game_masters: &[UserId]) -> Self {
        let (whisper, blind) = match roll_mode {
            RollMode::Public => (None, false),
            RollMode::Private => {
                let mut recipients = game_masters.to_vec();
                if !recipients.contains(&user) {
                    recipients.push(user);
                }
                (Some(recipients), false)
            }
            RollMode::Blind => (Some(game_masters.to_vec()), true),
            RollMode::SelfOnly => (Some(vec![user]), false),
        };

        Self {
            roll_mode,
            whisper,
            blind,
        }
    }
}

/// Dice collected for one action.
///
/// Owned by a single action at a time. Construction is cheap, so creating
/// one per action is fine; a long-lived pool is reset by every flush.
pub struct DicePool {
    host: Arc<dyn DiceHost>,
    settings: Arc<Settings>,
    pool: Roll,
}

impl fmt::Debug for DicePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DicePool").field("pool", &self.pool).finish()
    }
}

impl DicePool {
    pub fn new(host: Arc<dyn DiceHost>, settings: Arc<Settings>) -> Self {
        Self {
            host,
            settings,
            pool: Roll::empty(),
        }
    }

    /// A pool seeded with the dice of `rolls`.
    pub fn with_rolls<'a>(
        host: Arc<dyn DiceHost>,
        settings: Arc<Settings>,
        rolls: impl IntoIterator<Item = &'a Roll>,
    ) -> Self {
        let mut pool = Self::new(host, settings);
        pool.push(rolls);
        pool
    }

    /// Pool `rolls` and flush them straight away.
    pub async fn create_and_flush<'a>(
        host: Arc<dyn DiceHost>,
        settings: Arc<Settings>,
        rolls: impl IntoIterator<Item = &'a Roll>,
    ) -> bool {
        Self::with_rolls(host, settings, rolls).flush().await
    }

    /// Add every die of each roll to the pool.
    pub fn push<'a>(&mut self, rolls: impl IntoIterator<Item = &'a Roll>) {
        for roll in rolls {
            self.pool.terms.extend(roll.dice().iter().cloned());
        }
    }

    /// Number of pooled dice.
    pub fn len(&self) -> usize {
        self.pool.die_count()
    }

    pub fn is_empty(&self) -> bool {
        !self.pool.has_dice()
    }

    /// Show the pooled dice and empty the pool.
    ///
    /// Returns whether any dice were pooled, counting individual die results:
    /// a term that carries no results does not make the pool worth showing.
    /// The pool is reset whether or not a sink is present, and a failing sink
    /// is only logged.
    pub async fn flush(&mut self) -> bool {
        let pool = std::mem::replace(&mut self.pool, Roll::empty());
        if !pool.has_dice() {
            return false;
        }

        let Some(sink) = self.host.dice_sink() else {
            debug!(dice = pool.die_count(), "no dice sink, dropping pooled dice");
            return true;
        };

        let user = self.host.current_user();
        let wd = WhisperData::for_roll_mode(
            self.settings.roll_mode(),
            user,
            &self.host.game_masters(),
        );

        match sink
            .show_for_roll(&pool, user, true, wd.whisper.as_deref(), wd.blind)
            .await
        {
            Ok(()) => debug!(dice = pool.die_count(), roll_mode = ?wd.roll_mode, "flushed dice pool"),
            Err(e) => warn!(error = %e, "dice sink rejected pooled dice"),
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::DiceTerm;
    use crate::testing::TestHarness;

    fn attack() -> Roll {
        Roll::new("1d20 + 5", 17).with_term(DiceTerm::keep_highest(20, [12, 4]))
    }

    fn damage() -> Roll {
        Roll::new("2d6 + 3", 10).with_term(DiceTerm::new(6, [3, 4]))
    }

    #[test]
    fn test_whisper_data_per_roll_mode() {
        let user = UserId::new();
        let gm = UserId::new();

        let public = WhisperData::for_roll_mode(RollMode::Public, user, &[gm]);
        assert_eq!(public.whisper, None);
        assert!(!public.blind);

        let private = WhisperData::for_roll_mode(RollMode::Private, user, &[gm]);
        assert_eq!(private.whisper, Some(vec![gm, user]));
        assert!(!private.blind);

        let blind = WhisperData::for_roll_mode(RollMode::Blind, user, &[gm]);
        assert_eq!(blind.whisper, Some(vec![gm]));
        assert!(blind.blind);

        let own = WhisperData::for_roll_mode(RollMode::SelfOnly, user, &[gm]);
        assert_eq!(own.whisper, Some(vec![user]));
    }

    #[test]
    fn test_private_roll_by_gm_lists_them_once() {
        let gm = UserId::new();
        let wd = WhisperData::for_roll_mode(RollMode::Private, gm, &[gm]);
        assert_eq!(wd.whisper, Some(vec![gm]));
    }

    #[tokio::test]
    async fn test_flush_sends_everything_once() {
        let harness = TestHarness::new();
        let mut pool = harness.pool();

        pool.push([&attack(), &damage()]);
        assert_eq!(pool.len(), 4);

        assert!(pool.flush().await);
        assert!(pool.is_empty());
        assert!(!pool.flush().await);

        let shown = harness.sink.shown();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].roll.die_count(), 4);
        assert_eq!(shown[0].user, harness.host.user);
        assert!(shown[0].synchronize);
    }

    #[tokio::test]
    async fn test_rolls_without_dice() {
        let harness = TestHarness::new();
        let flat = Roll::new("5", 5);

        assert!(!DicePool::create_and_flush(harness.dice_host(), harness.settings(), [&flat]).await);
        assert!(harness.sink.shown().is_empty());
    }

    #[tokio::test]
    async fn test_terms_without_results_are_not_dice() {
        let harness = TestHarness::new();
        let hollow = Roll::new("0d6", 0).with_term(DiceTerm::new(6, Vec::new()));

        assert!(!DicePool::create_and_flush(harness.dice_host(), harness.settings(), [&hollow]).await);
        assert!(harness.sink.shown().is_empty());
    }

    #[tokio::test]
    async fn test_flush_without_sink_still_resets() {
        let harness = TestHarness::without_sink();
        let mut pool = harness.pool();
        pool.push([&damage()]);

        assert!(pool.flush().await);
        assert!(pool.is_empty());
        assert!(!pool.flush().await);
    }

    #[tokio::test]
    async fn test_blind_roll_reaches_sink_as_blind() {
        let harness = TestHarness::new();
        harness.set_roll_mode(RollMode::Blind).await.unwrap();

        assert!(DicePool::create_and_flush(harness.dice_host(), harness.settings(), [&attack()]).await);

        let shown = harness.sink.shown();
        assert!(shown[0].blind);
        assert_eq!(shown[0].whisper, Some(harness.host.game_masters.clone()));
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_fail_flush() {
        let harness = TestHarness::new();
        harness.sink.fail_with("renderer lost");
        let mut pool = harness.pool();
        pool.push([&attack()]);

        assert!(pool.flush().await);
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn test_pool_is_reusable() {
        let harness = TestHarness::new();
        let mut pool = DicePool::with_rolls(harness.dice_host(), harness.settings(), [&attack()]);
        assert!(pool.flush().await);

        pool.push([&damage()]);
        assert!(pool.flush().await);

        let shown = harness.sink.shown();
        assert_eq!(shown.len(), 2);
        assert_eq!(shown[1].roll.dice(), damage().dice());
    }
}
