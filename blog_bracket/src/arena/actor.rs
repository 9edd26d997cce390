//! Tournament actor: the single writer for one tournament.

use super::messages::{Reply, TournamentMessage};
use crate::{
    store::{StoreError, TournamentStore, WinRecorder},
    tournament::{
        Champion, Match, Missing, Tournament, TournamentError, TournamentId, TournamentResult,
    },
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

const MAILBOX_CAPACITY: usize = 100;

/// Handle for sending messages to a tournament actor
#[derive(Clone, Debug)]
pub struct TournamentHandle {
    sender: mpsc::Sender<TournamentMessage>,
    tournament_id: TournamentId,
}

impl TournamentHandle {
    pub fn new(sender: mpsc::Sender<TournamentMessage>, tournament_id: TournamentId) -> Self {
        Self {
            sender,
            tournament_id,
        }
    }

    pub fn tournament_id(&self) -> TournamentId {
        self.tournament_id
    }

    pub async fn send(&self, message: TournamentMessage) -> TournamentResult<()> {
        self.sender
            .send(message)
            .await
            .map_err(|_| TournamentError::Unavailable(self.tournament_id))
    }

    /// Send a message built around a fresh reply channel and wait for the answer
    pub async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> TournamentMessage,
    ) -> TournamentResult<T> {
        let (tx, rx) = oneshot::channel();
        self.send(build(tx)).await?;
        rx.await
            .map_err(|_| TournamentError::Unavailable(self.tournament_id))?
    }

    /// Stop the actor after it drains earlier messages
    pub async fn close(&self) -> TournamentResult<()> {
        let (tx, rx) = oneshot::channel();
        self.send(TournamentMessage::Close { response: tx }).await?;
        rx.await
            .map_err(|_| TournamentError::Unavailable(self.tournament_id))
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Actor owning the committed snapshot of one tournament.
///
/// Every message is handled to completion before the next one is read, so
/// operations on a tournament never interleave. An operation works on a
/// copy of the snapshot; the copy replaces the snapshot only after the
/// store accepted it.
pub struct TournamentActor {
    id: TournamentId,
    state: Tournament,
    inbox: mpsc::Receiver<TournamentMessage>,
    store: Arc<dyn TournamentStore>,
    wins: Arc<dyn WinRecorder>,
    is_closed: bool,
}

impl TournamentActor {
    pub fn new(
        state: Tournament,
        store: Arc<dyn TournamentStore>,
        wins: Arc<dyn WinRecorder>,
    ) -> (Self, TournamentHandle) {
        let (sender, inbox) = mpsc::channel(MAILBOX_CAPACITY);
        let id = state.id;

        let actor = Self {
            id,
            state,
            inbox,
            store,
            wins,
            is_closed: false,
        };

        (actor, TournamentHandle::new(sender, id))
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        log::debug!("Tournament {} actor starting", self.id);

        while let Some(message) = self.inbox.recv().await {
            self.handle_message(message).await;
            if self.is_closed {
                break;
            }
        }

        log::debug!("Tournament {} actor stopped", self.id);
    }

    async fn handle_message(&mut self, message: TournamentMessage) {
        match message {
            TournamentMessage::Get { now, response } => {
                let result = self.apply(now, |_| Ok(())).await;
                let _ = response.send(result.map(|()| self.state.clone()));
            }

            TournamentMessage::Register {
                entry_id,
                entry,
                caller,
                now,
                response,
            } => {
                let result = self
                    .apply(now, |t| {
                        t.register_entry(entry_id, entry.as_ref(), caller, now)
                    })
                    .await;
                let _ = response.send(result.map(|()| self.state.clone()));
            }

            TournamentMessage::Withdraw {
                entry_id,
                caller,
                now,
                response,
            } => {
                let result = self
                    .apply(now, |t| t.withdraw_entry(entry_id, caller))
                    .await;
                let _ = response.send(result);
            }

            TournamentMessage::Start {
                caller,
                now,
                response,
            } => {
                let result = self.apply(now, |t| t.start(caller, now)).await;
                let _ = response.send(result.map(|()| self.state.clone()));
            }

            TournamentMessage::Vote {
                match_index,
                voter,
                pick,
                now,
                response,
            } => {
                let result = self
                    .apply(now, |t| t.vote(match_index, voter, &pick, now))
                    .await
                    .and_then(|outcome| Ok((outcome, self.match_at(match_index)?)));
                let _ = response.send(result);
            }

            TournamentMessage::ResetVotes {
                match_index,
                caller,
                now,
                response,
            } => {
                let result = self
                    .apply(now, |t| t.reset_match_votes(match_index, caller, now))
                    .await
                    .and_then(|()| self.match_at(match_index));
                let _ = response.send(result);
            }

            TournamentMessage::Sweep { now, response } => {
                let before = self.state.version;
                let result = self.apply(now, |_| Ok(())).await;
                let _ = response.send(result.map(|()| self.state.version != before));
            }

            TournamentMessage::Close { response } => {
                self.is_closed = true;
                let _ = response.send(());
            }
        }
    }

    fn match_at(&self, index: usize) -> TournamentResult<Match> {
        self.state
            .matches
            .get(index)
            .cloned()
            .ok_or(TournamentError::NotFound(Missing::Match(index)))
    }

    /// Sweep a copy of the snapshot, run `op` on it, sweep again, and commit
    /// the copy if it differs from the snapshot. Nothing is kept when `op` or
    /// the store fails.
    async fn apply<T>(
        &mut self,
        now: DateTime<Utc>,
        op: impl FnOnce(&mut Tournament) -> TournamentResult<T>,
    ) -> TournamentResult<T> {
        let mut draft = self.state.clone();
        let settled = draft.sweep(now);
        let value = op(&mut draft)?;
        let cascaded = draft.sweep(now);
        let champion = settled.champion().or(cascaded.champion());

        if draft != self.state {
            draft.version = self.state.version + 1;
            draft.updated_at = now;

            if let Err(e) = self.store.save(&draft).await {
                log::error!("Tournament {}: failed to persist update: {}", self.id, e);
                if matches!(e, StoreError::VersionConflict { .. }) {
                    self.reload().await;
                }
                return Err(e.into());
            }

            self.state = draft;
        }

        if let Some(champion) = champion {
            self.signal_win(champion).await;
        }

        Ok(value)
    }

    /// Replace the snapshot with whatever the store holds now
    async fn reload(&mut self) {
        match self.store.load(self.id).await {
            Ok(Some(fresh)) => {
                log::info!(
                    "Tournament {}: reloaded version {} from store",
                    self.id,
                    fresh.version
                );
                self.state = fresh;
            }
            Ok(None) => log::warn!("Tournament {}: gone from store", self.id),
            Err(e) => log::error!("Tournament {}: reload failed: {}", self.id, e),
        }
    }

    /// Best-effort win increment for the champion's owner
    async fn signal_win(&self, champion: Champion) {
        let Some(owner_id) = champion.owner_id else {
            log::warn!(
                "Tournament {}: champion entry {} has no registered owner",
                self.id,
                champion.entry_id
            );
            return;
        };

        if let Err(e) = self.wins.record_win(owner_id).await {
            log::warn!(
                "Tournament {}: failed to record win for user {}: {}",
                self.id,
                owner_id,
                e
            );
        }
    }
}
