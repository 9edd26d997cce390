//! Round advancement.
//!
//! Looks only at match `round`, `status` and `winner`. Safe to run on every
//! read: a round that already has a successor is skipped, and a completed
//! tournament is never completed again.

use super::{
    builder::pair_round,
    models::{EntryId, MatchStatus, Tournament, TournamentStatus, UserId},
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// The tournament winner, reported for the external win counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Champion {
    pub entry_id: EntryId,
    /// Owner of the winning entry, if it is still registered
    pub owner_id: Option<UserId>,
}

/// A single advancement step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advancement {
    /// Round `round` was appended with `matches` matches
    RoundCreated { round: u32, matches: usize },
    /// Exactly one winner remained
    Completed(Champion),
}

/// Match indices grouped by round, rounds ascending, matches in creation order
fn rounds(tournament: &Tournament) -> BTreeMap<u32, Vec<usize>> {
    let mut rounds: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for (index, m) in tournament.matches.iter().enumerate() {
        rounds.entry(m.round).or_default().push(index);
    }
    rounds
}

/// Apply at most one advancement: the lowest fully finished round that has
/// not been advanced yet.
pub fn advance_once(tournament: &mut Tournament, now: DateTime<Utc>) -> Option<Advancement> {
    let rounds = rounds(tournament);

    for (&round, indices) in &rounds {
        let finished = indices
            .iter()
            .all(|&i| tournament.matches[i].status == MatchStatus::Finished);
        if !finished || rounds.contains_key(&(round + 1)) {
            continue;
        }

        let winners: Vec<EntryId> = indices
            .iter()
            .filter_map(|&i| tournament.matches[i].winner)
            .collect();

        match winners.as_slice() {
            [] => continue,
            [champion] => {
                if tournament.status == TournamentStatus::Completed {
                    continue;
                }
                return Some(complete(tournament, *champion, now));
            }
            _ => {
                let next = match pair_round(
                    round + 1,
                    &winners,
                    now,
                    tournament.config.match_duration(),
                    tournament.config.schedule,
                ) {
                    Ok(next) => next,
                    Err(e) => {
                        log::error!(
                            "Tournament {}: cannot schedule round {}: {}",
                            tournament.id,
                            round + 1,
                            e
                        );
                        return None;
                    }
                };
                let count = next.len();
                tournament.matches.extend(next);

                log::info!(
                    "Tournament {}: round {} finished, created round {} with {} matches",
                    tournament.id,
                    round,
                    round + 1,
                    count
                );

                return Some(Advancement::RoundCreated {
                    round: round + 1,
                    matches: count,
                });
            }
        }
    }

    None
}

fn complete(tournament: &mut Tournament, champion: EntryId, now: DateTime<Utc>) -> Advancement {
    tournament.status = TournamentStatus::Completed;
    tournament.winner = Some(champion);
    tournament.completed_at = Some(now);

    let owner_id = tournament
        .entries
        .iter()
        .find(|r| r.entry_id == champion)
        .map(|r| r.owner_id);

    log::info!(
        "Tournament {} '{}' completed, champion entry {}",
        tournament.id,
        tournament.config.name,
        champion
    );

    Advancement::Completed(Champion {
        entry_id: champion,
        owner_id,
    })
}

/// Advance repeatedly until no round is eligible.
pub fn try_advance(tournament: &mut Tournament, now: DateTime<Utc>) -> Vec<Advancement> {
    let mut steps = Vec::new();
    while let Some(step) = advance_once(tournament, now) {
        steps.push(step);
    }
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::{
        builder,
        models::{BracketSize, Registration, TournamentConfig},
    };
    use chrono::TimeDelta;

    fn started(size: BracketSize, now: DateTime<Utc>) -> Tournament {
        let mut t = Tournament::new(1, TournamentConfig::new("Cup", size), 1, now).unwrap();
        t.entries = (1..=size.entries() as i64)
            .map(|i| Registration {
                entry_id: i * 10,
                owner_id: i,
                registered_at: now,
            })
            .collect();
        builder::start(&mut t, now).unwrap();
        t
    }

    fn finish_all(t: &mut Tournament, now: DateTime<Utc>) {
        for m in &mut t.matches {
            m.resolve_if_elapsed(now.max(m.ends_at));
        }
    }

    #[test]
    fn test_unfinished_round_does_not_advance() {
        let now = Utc::now();
        let mut t = started(BracketSize::Four, now);
        let ends_at = t.matches[0].ends_at;
        t.matches[0].resolve_if_elapsed(ends_at);

        assert!(try_advance(&mut t, now).is_empty());
        assert_eq!(t.matches.len(), 2);
    }

    #[test]
    fn test_finished_round_creates_next_round_once() {
        let now = Utc::now();
        let mut t = started(BracketSize::Eight, now);
        finish_all(&mut t, now);
        let later = now + TimeDelta::hours(1);

        let steps = try_advance(&mut t, later);
        assert_eq!(
            steps,
            vec![Advancement::RoundCreated {
                round: 2,
                matches: 2
            }]
        );
        assert_eq!(t.matches.len(), 6);
        assert_eq!(t.matches[4].starts_at, later);

        assert!(try_advance(&mut t, later).is_empty());
        assert_eq!(t.matches.len(), 6);
    }

    #[test]
    fn test_next_round_pairs_winners_in_bracket_order() {
        let now = Utc::now();
        let mut t = started(BracketSize::Eight, now);
        // Round one: slots (10,20) (30,40) (50,60) (70,80); B wins the 2nd and 4th
        t.matches[1].votes_b = 1;
        t.matches[3].votes_b = 2;
        finish_all(&mut t, now);
        try_advance(&mut t, now);

        let round_two: Vec<_> = t.matches.iter().filter(|m| m.round == 2).collect();
        assert_eq!((round_two[0].slot_a, round_two[0].slot_b), (10, 40));
        assert_eq!((round_two[1].slot_a, round_two[1].slot_b), (50, 80));
    }

    #[test]
    fn test_final_completes_tournament_with_owner() {
        let now = Utc::now();
        let mut t = started(BracketSize::Four, now);
        finish_all(&mut t, now);
        try_advance(&mut t, now);
        finish_all(&mut t, now);

        let steps = try_advance(&mut t, now);
        assert_eq!(
            steps,
            vec![Advancement::Completed(Champion {
                entry_id: 10,
                owner_id: Some(1)
            })]
        );
        assert_eq!(t.status, TournamentStatus::Completed);
        assert_eq!(t.winner, Some(10));
        assert_eq!(t.completed_at, Some(now));

        assert!(try_advance(&mut t, now + TimeDelta::hours(1)).is_empty());
        assert_eq!(t.completed_at, Some(now));
    }

    #[test]
    fn test_advancement_ignores_rounds_in_progress() {
        let now = Utc::now();
        let mut t = started(BracketSize::Eight, now);
        finish_all(&mut t, now);
        try_advance(&mut t, now);
        // Round 2 only half done
        let idx = t.matches.iter().position(|m| m.round == 2).unwrap();
        let end = t.matches[idx].ends_at;
        t.matches[idx].resolve_if_elapsed(end);

        assert!(try_advance(&mut t, end).is_empty());
        assert_eq!(t.matches.iter().filter(|m| m.round == 3).count(), 0);
    }

    #[test]
    fn test_draft_has_nothing_to_advance() {
        let now = Utc::now();
        let mut t = Tournament::new(1, TournamentConfig::new("Cup", BracketSize::Four), 1, now)
            .unwrap();
        assert!(try_advance(&mut t, now).is_empty());
        assert_eq!(t.status, TournamentStatus::Draft);
    }
}
