//! Bracket construction: pairing slots into timed matches.

use super::{
    errors::{TournamentError, TournamentResult},
    models::{EntryId, Match, MatchStatus, SchedulePolicy, Tournament, TournamentStatus},
};
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::BTreeSet;

/// Pair `slots` in order, (0, 1), (2, 3), ..., into matches of `round`.
///
/// With [`SchedulePolicy::Serial`] pair `i` opens at `now + i * duration`;
/// with [`SchedulePolicy::Concurrent`] every pair opens at `now`. A trailing
/// unpaired slot is ignored; full brackets never produce one. A window that
/// cannot be represented fails with `InvalidDuration`.
pub fn pair_round(
    round: u32,
    slots: &[EntryId],
    now: DateTime<Utc>,
    duration: TimeDelta,
    schedule: SchedulePolicy,
) -> TournamentResult<Vec<Match>> {
    slots
        .chunks_exact(2)
        .enumerate()
        .map(|(i, pair)| {
            let offset = match schedule {
                SchedulePolicy::Serial => {
                    i32::try_from(i).ok().and_then(|i| duration.checked_mul(i))
                }
                SchedulePolicy::Concurrent => Some(TimeDelta::zero()),
            };
            let (starts_at, ends_at) = offset
                .and_then(|offset| now.checked_add_signed(offset))
                .and_then(|start| Some((start, start.checked_add_signed(duration)?)))
                .ok_or(TournamentError::InvalidDuration(duration.num_seconds()))?;

            Ok(Match {
                round,
                slot_a: pair[0],
                slot_b: pair[1],
                votes_a: 0,
                votes_b: 0,
                voters: BTreeSet::new(),
                starts_at,
                ends_at,
                status: MatchStatus::Scheduled,
                winner: None,
            })
        })
        .collect()
}

/// Build round one from the registered entries and activate the tournament.
pub fn start(tournament: &mut Tournament, now: DateTime<Utc>) -> TournamentResult<()> {
    if tournament.status != TournamentStatus::Draft {
        return Err(TournamentError::invalid_state(
            TournamentStatus::Draft,
            tournament.status,
        ));
    }

    let needed = tournament.config.size.entries();
    if tournament.entries.len() != needed {
        return Err(TournamentError::NotFull {
            needed,
            current: tournament.entries.len(),
        });
    }

    let slots: Vec<EntryId> = tournament.entries.iter().map(|r| r.entry_id).collect();
    tournament.matches = pair_round(
        1,
        &slots,
        now,
        tournament.config.match_duration(),
        tournament.config.schedule,
    )?;
    tournament.status = TournamentStatus::Active;
    tournament.started_at = Some(now);

    log::info!(
        "Tournament {} '{}' started with {} first-round matches",
        tournament.id,
        tournament.config.name,
        tournament.matches.len()
    );

    Ok(())
}
