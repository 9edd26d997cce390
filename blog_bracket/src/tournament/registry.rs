//! Entry registration while a tournament is still a draft.

use super::{
    errors::{Missing, TournamentError, TournamentResult},
    models::{Caller, Entry, EntryId, Registration, Tournament, TournamentStatus, UserId},
};
use chrono::{DateTime, Utc};

fn require_draft(tournament: &Tournament) -> TournamentResult<()> {
    if tournament.status != TournamentStatus::Draft {
        return Err(TournamentError::invalid_state(
            TournamentStatus::Draft,
            tournament.status,
        ));
    }
    Ok(())
}

/// Register `entry_id` on behalf of `owner`.
///
/// `entry` is the directory lookup for `entry_id`, done by the caller before
/// entering the tournament's exclusive region. Checks run in a fixed order:
/// capacity, existence, ownership, duplicate entry, duplicate owner.
pub fn register(
    tournament: &mut Tournament,
    entry_id: EntryId,
    entry: Option<&Entry>,
    owner: UserId,
    now: DateTime<Utc>,
) -> TournamentResult<()> {
    require_draft(tournament)?;

    let size = tournament.config.size.entries();
    if tournament.entries.len() >= size {
        return Err(TournamentError::Capacity { size });
    }

    let entry = entry
        .filter(|e| e.id == entry_id)
        .ok_or(TournamentError::NotFound(Missing::Entry(entry_id)))?;

    if entry.owner_id != owner {
        return Err(TournamentError::Forbidden(
            "you can only register your own entry".to_string(),
        ));
    }

    if tournament.entries.iter().any(|r| r.entry_id == entry_id) {
        return Err(TournamentError::Duplicate(entry_id));
    }

    if tournament.entries.iter().any(|r| r.owner_id == owner) {
        return Err(TournamentError::DuplicateOwner(owner));
    }

    tournament.entries.push(Registration {
        entry_id,
        owner_id: owner,
        registered_at: now,
    });

    Ok(())
}

/// Remove a registration before the bracket is built.
///
/// Allowed for the entry's owner or an administrator. Remaining entries keep
/// their relative order.
pub fn withdraw(
    tournament: &mut Tournament,
    entry_id: EntryId,
    caller: Caller,
) -> TournamentResult<Registration> {
    require_draft(tournament)?;

    let position = tournament
        .entries
        .iter()
        .position(|r| r.entry_id == entry_id)
        .ok_or(TournamentError::NotFound(Missing::Registration(entry_id)))?;

    if tournament.entries[position].owner_id != caller.user_id && !caller.is_admin {
        return Err(TournamentError::Forbidden(
            "only the entry owner or an administrator may withdraw it".to_string(),
        ));
    }

    Ok(tournament.entries.remove(position))
}
