//! Tournament manager: spawns tournament actors and routes operations to them.

use super::{
    actor::{TournamentActor, TournamentHandle},
    messages::TournamentMessage,
};
use crate::{
    store::{EntryDirectory, TournamentStore, WinRecorder},
    tournament::{
        Caller, EntryId, ListQuery, Match, Missing, Registration, Tournament, TournamentConfig,
        TournamentError, TournamentId, TournamentPage, TournamentResult, TournamentStats, UserId,
        VoteOutcome,
    },
};
use chrono::{DateTime, Utc};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

/// Entry point for every tournament operation.
///
/// Actors are spawned lazily the first time a stored tournament is touched
/// and live until the tournament is deleted.
pub struct TournamentManager {
    store: Arc<dyn TournamentStore>,
    entries: Arc<dyn EntryDirectory>,
    wins: Arc<dyn WinRecorder>,

    /// Running actors by tournament id
    tournaments: Arc<RwLock<HashMap<TournamentId, TournamentHandle>>>,
}

impl TournamentManager {
    pub fn new(
        store: Arc<dyn TournamentStore>,
        entries: Arc<dyn EntryDirectory>,
        wins: Arc<dyn WinRecorder>,
    ) -> Self {
        Self {
            store,
            entries,
            wins,
            tournaments: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn spawn(&self, tournament: Tournament) -> TournamentHandle {
        let (actor, handle) = TournamentActor::new(tournament, self.store.clone(), self.wins.clone());
        tokio::spawn(actor.run());
        handle
    }

    /// Spawn actors for every stored tournament
    pub async fn load_existing_tournaments(&self) -> TournamentResult<usize> {
        let ids = self.store.list_ids().await?;
        let mut tournaments = self.tournaments.write().await;
        let mut loaded = 0;

        for id in ids {
            if tournaments.contains_key(&id) {
                continue;
            }
            if let Some(tournament) = self.store.load(id).await? {
                tournaments.insert(id, self.spawn(tournament));
                loaded += 1;
            }
        }

        log::info!("Loaded {} existing tournaments", loaded);
        Ok(loaded)
    }

    /// Handle for a tournament, spawning its actor from the store if needed
    async fn handle_for(&self, id: TournamentId) -> TournamentResult<TournamentHandle> {
        {
            let tournaments = self.tournaments.read().await;
            if let Some(handle) = tournaments.get(&id)
                && !handle.is_closed()
            {
                return Ok(handle.clone());
            }
        }

        let mut tournaments = self.tournaments.write().await;
        if let Some(handle) = tournaments.get(&id)
            && !handle.is_closed()
        {
            return Ok(handle.clone());
        }

        let tournament = self
            .store
            .load(id)
            .await?
            .ok_or(TournamentError::NotFound(Missing::Tournament(id)))?;
        let handle = self.spawn(tournament);
        tournaments.insert(id, handle.clone());
        Ok(handle)
    }

    pub async fn create_tournament(
        &self,
        config: TournamentConfig,
        creator_id: UserId,
        now: DateTime<Utc>,
    ) -> TournamentResult<Tournament> {
        config.validate()?;
        let id = self.store.allocate_id().await?;
        let tournament = Tournament::new(id, config, creator_id, now)?;
        self.store.insert(&tournament).await?;

        let handle = self.spawn(tournament.clone());
        self.tournaments.write().await.insert(id, handle);

        log::info!(
            "Created tournament {} '{}' ({} entries) by user {}",
            id,
            tournament.config.name,
            tournament.config.size.entries(),
            creator_id
        );
        Ok(tournament)
    }

    /// Register `entry_id`; the caller must own it
    pub async fn register_entry(
        &self,
        id: TournamentId,
        entry_id: EntryId,
        caller: Caller,
        now: DateTime<Utc>,
    ) -> TournamentResult<Tournament> {
        let handle = self.handle_for(id).await?;
        let entry = self.entries.find_entry(entry_id).await?;

        handle
            .request(|response| TournamentMessage::Register {
                entry_id,
                entry,
                caller,
                now,
                response,
            })
            .await
    }

    pub async fn withdraw_entry(
        &self,
        id: TournamentId,
        entry_id: EntryId,
        caller: Caller,
        now: DateTime<Utc>,
    ) -> TournamentResult<Registration> {
        let handle = self.handle_for(id).await?;
        handle
            .request(|response| TournamentMessage::Withdraw {
                entry_id,
                caller,
                now,
                response,
            })
            .await
    }

    pub async fn start_tournament(
        &self,
        id: TournamentId,
        caller: Caller,
        now: DateTime<Utc>,
    ) -> TournamentResult<Tournament> {
        let handle = self.handle_for(id).await?;
        handle
            .request(|response| TournamentMessage::Start {
                caller,
                now,
                response,
            })
            .await
    }

    /// Vote in a match; returns the match as it stands afterwards
    pub async fn vote(
        &self,
        id: TournamentId,
        match_index: usize,
        voter: UserId,
        pick: impl Into<String>,
        now: DateTime<Utc>,
    ) -> TournamentResult<Match> {
        self.cast_vote(id, match_index, voter, pick, now)
            .await
            .map(|(_, m)| m)
    }

    /// Like [`vote`](Self::vote), also reporting whether the vote was counted
    pub async fn cast_vote(
        &self,
        id: TournamentId,
        match_index: usize,
        voter: UserId,
        pick: impl Into<String>,
        now: DateTime<Utc>,
    ) -> TournamentResult<(VoteOutcome, Match)> {
        let handle = self.handle_for(id).await?;
        let pick = pick.into();
        handle
            .request(|response| TournamentMessage::Vote {
                match_index,
                voter,
                pick,
                now,
                response,
            })
            .await
    }

    pub async fn reset_match_votes(
        &self,
        id: TournamentId,
        match_index: usize,
        caller: Caller,
        now: DateTime<Utc>,
    ) -> TournamentResult<Match> {
        let handle = self.handle_for(id).await?;
        handle
            .request(|response| TournamentMessage::ResetVotes {
                match_index,
                caller,
                now,
                response,
            })
            .await
    }

    pub async fn get_tournament(
        &self,
        id: TournamentId,
        now: DateTime<Utc>,
    ) -> TournamentResult<Tournament> {
        let handle = self.handle_for(id).await?;
        handle
            .request(|response| TournamentMessage::Get { now, response })
            .await
    }

    /// Every stored tournament, swept, newest first
    async fn all_tournaments(&self, now: DateTime<Utc>) -> TournamentResult<Vec<Tournament>> {
        let ids = self.store.list_ids().await?;
        let mut all = Vec::with_capacity(ids.len());

        for id in ids {
            match self.get_tournament(id, now).await {
                Ok(tournament) => all.push(tournament),
                // Deleted between listing and reading
                Err(TournamentError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(all)
    }

    pub async fn list_tournaments(
        &self,
        now: DateTime<Utc>,
        query: &ListQuery,
    ) -> TournamentResult<TournamentPage> {
        let mut all = self.all_tournaments(now).await?;
        if let Some(status) = query.status {
            all.retain(|t| t.status == status);
        }
        Ok(TournamentPage::paginate(all, query.page, query.limit))
    }

    pub async fn tournament_stats(&self, now: DateTime<Utc>) -> TournamentResult<TournamentStats> {
        let mut stats = TournamentStats::default();
        for tournament in self.all_tournaments(now).await? {
            stats.count(tournament.status);
        }
        Ok(stats)
    }

    /// Stop the tournament's actor and remove it from the store. Administrators only.
    pub async fn delete_tournament(&self, id: TournamentId, caller: Caller) -> TournamentResult<()> {
        caller.require_admin("delete a tournament")?;

        let mut tournaments = self.tournaments.write().await;
        if let Some(handle) = tournaments.remove(&id)
            && let Err(e) = handle.close().await
        {
            log::debug!("Tournament {} actor already stopped: {}", id, e);
        }

        if !self.store.delete(id).await? {
            return Err(TournamentError::NotFound(Missing::Tournament(id)));
        }
        drop(tournaments);

        log::info!("Deleted tournament {} by user {}", id, caller.user_id);
        Ok(())
    }

    /// Run the lazy sweep on every running actor. Returns how many tournaments changed.
    pub async fn sweep_all(&self, now: DateTime<Utc>) -> usize {
        let handles: Vec<TournamentHandle> = {
            let tournaments = self.tournaments.read().await;
            tournaments.values().cloned().collect()
        };

        let mut changed = 0;
        for handle in handles {
            match handle
                .request(|response| TournamentMessage::Sweep { now, response })
                .await
            {
                Ok(true) => changed += 1,
                Ok(false) => {}
                Err(e) => log::warn!(
                    "Sweep of tournament {} failed: {}",
                    handle.tournament_id(),
                    e
                ),
            }
        }

        if changed > 0 {
            log::debug!("Sweep changed {} tournaments", changed);
        }
        changed
    }

    /// Number of running tournament actors
    pub async fn tournament_count(&self) -> usize {
        let tournaments = self.tournaments.read().await;
        tournaments.len()
    }
}
