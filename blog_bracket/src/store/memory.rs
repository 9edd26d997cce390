//! In-memory storage implementations.

use super::{EntryDirectory, StoreError, StoreResult, TournamentStore, WinRecorder};
use crate::tournament::{Entry, EntryId, Tournament, TournamentId, UserId};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, AtomicI64, Ordering},
};
use tokio::sync::RwLock;

/// Tournament documents held in a map
#[derive(Debug)]
pub struct InMemoryTournamentStore {
    documents: RwLock<HashMap<TournamentId, Tournament>>,
    next_id: AtomicI64,
    /// When set, every write fails with [`StoreError::Backend`]
    failing: AtomicBool,
}

impl Default for InMemoryTournamentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTournamentStore {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
            failing: AtomicBool::new(false),
        }
    }

    /// Make every subsequent write fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Backend("store is refusing writes".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TournamentStore for InMemoryTournamentStore {
    async fn allocate_id(&self) -> StoreResult<TournamentId> {
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn insert(&self, tournament: &Tournament) -> StoreResult<()> {
        self.check_writable()?;
        let mut documents = self.documents.write().await;
        documents.insert(tournament.id, tournament.clone());
        Ok(())
    }

    async fn load(&self, id: TournamentId) -> StoreResult<Option<Tournament>> {
        let documents = self.documents.read().await;
        Ok(documents.get(&id).cloned())
    }

    async fn list_ids(&self) -> StoreResult<Vec<TournamentId>> {
        let documents = self.documents.read().await;
        let mut ids: Vec<_> = documents.keys().copied().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn save(&self, tournament: &Tournament) -> StoreResult<()> {
        self.check_writable()?;
        let mut documents = self.documents.write().await;
        let stored = documents
            .get_mut(&tournament.id)
            .ok_or(StoreError::Missing(tournament.id))?;

        if stored.version + 1 != tournament.version {
            return Err(StoreError::VersionConflict {
                id: tournament.id,
                expected: stored.version + 1,
            });
        }

        *stored = tournament.clone();
        Ok(())
    }

    async fn delete(&self, id: TournamentId) -> StoreResult<bool> {
        self.check_writable()?;
        let mut documents = self.documents.write().await;
        Ok(documents.remove(&id).is_some())
    }
}

/// Entries registered by hand
#[derive(Debug, Default)]
pub struct InMemoryEntryDirectory {
    entries: RwLock<HashMap<EntryId, Entry>>,
}

impl InMemoryEntryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, entry: Entry) {
        let mut entries = self.entries.write().await;
        entries.insert(entry.id, entry);
    }

    pub async fn remove(&self, id: EntryId) -> Option<Entry> {
        let mut entries = self.entries.write().await;
        entries.remove(&id)
    }
}

#[async_trait]
impl EntryDirectory for InMemoryEntryDirectory {
    async fn find_entry(&self, id: EntryId) -> StoreResult<Option<Entry>> {
        let entries = self.entries.read().await;
        Ok(entries.get(&id).copied())
    }
}

/// Win counters per user
#[derive(Debug, Default)]
pub struct InMemoryWinLedger {
    wins: RwLock<HashMap<UserId, u64>>,
}

impl InMemoryWinLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn wins_for(&self, user_id: UserId) -> u64 {
        let wins = self.wins.read().await;
        wins.get(&user_id).copied().unwrap_or(0)
    }

    /// Users ordered by win count, most wins first
    pub async fn leaderboard(&self) -> Vec<(UserId, u64)> {
        let wins = self.wins.read().await;
        let mut board: Vec<_> = wins.iter().map(|(&user, &count)| (user, count)).collect();
        board.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        board
    }
}

#[async_trait]
impl WinRecorder for InMemoryWinLedger {
    async fn record_win(&self, user_id: UserId) -> StoreResult<()> {
        let mut wins = self.wins.write().await;
        *wins.entry(user_id).or_insert(0) += 1;
        Ok(())
    }
}
