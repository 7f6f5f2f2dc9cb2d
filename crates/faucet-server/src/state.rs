//! Shared deployment state behind a single writer.
//!
//! Every mutating request holds the deployment lock for the whole call,
//! including persistence, so calls are applied strictly one after another and
//! a failed write leaves both memory and disk at the pre-call state.

use crate::error::{FaucetError, FaucetResult};
use alloy::primitives::Address;
use faucet_core::{AccountView, Clock, Deployment, LogEntry};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info};

/// Capacity of the notification channel; slow subscribers skip older entries.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// JSON snapshot file holding the full deployment state
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Load the stored deployment, if a snapshot exists
    pub async fn load(&self) -> FaucetResult<Option<Deployment>> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(None);
        }

        let json = tokio::fs::read_to_string(&self.path).await?;
        let deployment = Deployment::from_snapshot(&json)?;
        info!(
            "Loaded state from {} ({} events)",
            self.path.display(),
            deployment.log().len()
        );
        Ok(Some(deployment))
    }

    /// Write the snapshot to a temporary file and move it into place
    pub async fn save(&self, deployment: &Deployment) -> FaucetResult<()> {
        let json = deployment.to_snapshot()?;
        let tmp_path = self.path.with_extension("json.tmp");

        tokio::fs::write(&tmp_path, json).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;

        debug!("Saved state to {}", self.path.display());
        Ok(())
    }
}

/// Application state shared by all request handlers
pub struct AppState {
    deployment: Mutex<Deployment>,
    clock: Arc<dyn Clock>,
    store: Option<SnapshotStore>,
    events: broadcast::Sender<LogEntry>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("store", &self.store)
            .field("subscribers", &self.events.receiver_count())
            .finish()
    }
}

impl AppState {
    /// Create new application state
    pub fn new(deployment: Deployment, clock: Arc<dyn Clock>, store: Option<SnapshotStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            deployment: Mutex::new(deployment),
            clock,
            store,
            events,
        }
    }

    /// Apply one mutating call and persist the result.
    ///
    /// The entry is published while the lock is still held, so subscribers
    /// see entries in sequence order.
    async fn commit<F, R>(&self, op: F) -> FaucetResult<(LogEntry, R)>
    where
        F: FnOnce(&mut Deployment, u64) -> faucet_core::Result<(LogEntry, R)>,
    {
        let mut deployment = self.deployment.lock().await;
        let before = self.store.as_ref().map(|_| deployment.clone());

        let (entry, output) = op(&mut deployment, self.clock.now())?;

        if let (Some(store), Some(before)) = (&self.store, before) {
            if let Err(e) = store.save(&deployment).await {
                error!("Failed to persist state, rolling back: {}", e);
                *deployment = before;
                return Err(e);
            }
        }

        // No subscribers is not an error
        let _ = self.events.send(entry.clone());
        drop(deployment);

        Ok((entry, output))
    }

    /// Claim tokens for `caller`, returning the account as of the claim
    pub async fn request_tokens(&self, caller: Address) -> FaucetResult<(LogEntry, AccountView)> {
        self.commit(|deployment, now| {
            let entry = deployment.request_tokens(caller, now)?;
            Ok((entry, deployment.account(caller, now)))
        })
        .await
    }

    /// Pause or unpause the faucet on behalf of `caller`
    pub async fn set_paused(&self, caller: Address, paused: bool) -> FaucetResult<LogEntry> {
        let (entry, ()) = self
            .commit(|deployment, now| Ok((deployment.set_paused(caller, paused, now)?, ())))
            .await?;
        Ok(entry)
    }

    /// Run a read-only query against the current state at the current time
    pub async fn read<R>(&self, query: impl FnOnce(&Deployment, u64) -> R) -> R {
        let deployment = self.deployment.lock().await;
        query(&deployment, self.clock.now())
    }

    pub async fn account(&self, address: Address) -> AccountView {
        self.read(|deployment, now| deployment.account(address, now))
            .await
    }

    pub async fn events_since(&self, sequence: u64) -> Vec<LogEntry> {
        self.read(|deployment, _| deployment.events_since(sequence).to_vec())
            .await
    }

    /// Receive every log entry committed from now on
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.events.subscribe()
    }

    /// Persist the current state, e.g. right after bootstrap
    pub async fn flush(&self) -> FaucetResult<()> {
        if let Some(store) = &self.store {
            let deployment = self.deployment.lock().await;
            store.save(&deployment).await?;
        }
        Ok(())
    }
}

/// Reject a snapshot that belongs to a different deployer than configured
pub fn ensure_deployer(deployment: &Deployment, expected: Address) -> FaucetResult<()> {
    if deployment.deployer() != expected {
        return Err(FaucetError::Internal(anyhow::anyhow!(
            "Stored state was deployed by {}, but configuration names {}",
            deployment.deployer(),
            expected
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use faucet_core::{EngineConfig, FaucetEvent, ManualClock, TokenMetadata, U256};

    const START: u64 = 1_700_000_000;

    fn deployer() -> Address {
        Address::repeat_byte(0x01)
    }

    fn user() -> Address {
        Address::repeat_byte(0x02)
    }

    fn fresh_deployment() -> Deployment {
        Deployment::bootstrap(deployer(), TokenMetadata::default(), EngineConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_claim_is_persisted() -> anyhow::Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let store = SnapshotStore::new(temp_dir.path().join("state.json"));
        let state = AppState::new(
            fresh_deployment(),
            Arc::new(ManualClock::new(START)),
            Some(store.clone()),
        );

        state.request_tokens(user()).await?;

        let reloaded = store.load().await?.expect("snapshot written");
        assert_eq!(reloaded.total_claimed(user()), EngineConfig::default().claim_amount);
        assert_eq!(reloaded.log().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_snapshot_loads_none() -> anyhow::Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let store = SnapshotStore::new(temp_dir.path().join("absent.json"));
        assert!(store.load().await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_rejected_claim_changes_nothing() {
        let clock = Arc::new(ManualClock::new(START));
        let state = AppState::new(fresh_deployment(), clock, None);

        state.request_tokens(user()).await.unwrap();
        let result = state.request_tokens(user()).await;

        assert!(matches!(
            result,
            Err(FaucetError::Rejected(faucet_core::Error::CooldownActive { .. }))
        ));
        assert_eq!(state.events_since(0).await.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_persistence_rolls_back() {
        // Parent directory does not exist, so every save fails
        let store = SnapshotStore::new("/nonexistent-dir/for/faucet/state.json");
        let state = AppState::new(fresh_deployment(), Arc::new(ManualClock::new(START)), Some(store));

        let result = state.request_tokens(user()).await;
        assert!(matches!(result, Err(FaucetError::Persistence(_))));

        let view = state.account(user()).await;
        assert_eq!(view.balance, U256::ZERO);
        assert_eq!(view.status.total_claimed, U256::ZERO);
        assert!(view.status.can_claim);
        assert!(state.events_since(0).await.is_empty());
    }

    #[tokio::test]
    async fn test_subscribers_receive_committed_events() {
        let state = AppState::new(fresh_deployment(), Arc::new(ManualClock::new(START)), None);
        let mut rx = state.subscribe();

        state.set_paused(deployer(), true).await.unwrap();
        // Rejected calls publish nothing
        assert!(state.set_paused(user(), false).await.is_err());
        state.set_paused(deployer(), false).await.unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.event, FaucetEvent::FaucetPaused { paused: true });
        assert_eq!(second.event, FaucetEvent::FaucetPaused { paused: false });
        assert_eq!(second.sequence, 1);
    }

    #[tokio::test]
    async fn test_claim_returns_account_as_committed() {
        let state = AppState::new(fresh_deployment(), Arc::new(ManualClock::new(START)), None);

        let (entry, view) = state.request_tokens(user()).await.unwrap();

        assert_eq!(entry.timestamp, START);
        assert_eq!(view.address, user());
        assert_eq!(view.balance, EngineConfig::default().claim_amount);
        assert_eq!(view.status.last_claim_at, Some(START));
        assert!(!view.status.can_claim);
    }

    #[tokio::test]
    async fn test_concurrent_commits_publish_in_sequence_order() {
        let state = Arc::new(AppState::new(
            fresh_deployment(),
            Arc::new(ManualClock::new(START)),
            None,
        ));
        let mut rx = state.subscribe();

        let mut handles = vec![];
        for i in 0..64u8 {
            let state = Arc::clone(&state);
            let account = Address::repeat_byte(0x10u8.wrapping_add(i));
            handles.push(tokio::spawn(async move { state.request_tokens(account).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        for expected in 0..64u64 {
            assert_eq!(rx.recv().await.unwrap().sequence, expected);
        }
    }

    #[tokio::test]
    async fn test_concurrent_claims_are_serialized() {
        let state = Arc::new(AppState::new(
            fresh_deployment(),
            Arc::new(ManualClock::new(START)),
            None,
        ));

        // The same account racing itself gets exactly one claim through
        let mut handles = vec![];
        for _ in 0..8 {
            let state = Arc::clone(&state);
            handles.push(tokio::spawn(async move { state.request_tokens(user()).await.is_ok() }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap() {
                successes += 1;
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(state.account(user()).await.balance, EngineConfig::default().claim_amount);
    }

    #[test]
    fn test_ensure_deployer() {
        let deployment = fresh_deployment();
        assert!(ensure_deployer(&deployment, deployer()).is_ok());
        assert!(ensure_deployer(&deployment, user()).is_err());
    }
}
