//! Last-writer-wins reconciliation of local and remote collections

use std::collections::HashMap;

use crate::models::{sort_newest_first, JournalEntry, SyncStatus};

/// Merge the remote collection into the local one.
///
/// - Local entries with unsynced changes (`pending` or `error`) are kept
///   verbatim whatever the remote says.
/// - Otherwise, when the remote copy (matched by `remote_id`) has a strictly
///   newer `last_modified`, it replaces the local entry wholesale; if not, the
///   local entry is kept and marked synced.
/// - Remote entries without a local counterpart are appended. A remote entry
///   whose local id matches a local entry that never learned its remote id
///   backfills that id instead of duplicating the entry.
///
/// The result is sorted newest first.
pub fn merge_entries(local: Vec<JournalEntry>, remote: Vec<JournalEntry>) -> Vec<JournalEntry> {
    let mut remote_slots: Vec<Option<JournalEntry>> = remote.into_iter().map(Some).collect();
    let remote_index: HashMap<String, usize> = remote_slots
        .iter()
        .enumerate()
        .filter_map(|(index, slot)| {
            slot.as_ref()
                .and_then(|entry| entry.remote_id.clone())
                .map(|remote_id| (remote_id, index))
        })
        .collect();

    let mut merged = Vec::with_capacity(local.len() + remote_slots.len());
    for mut entry in local {
        let counterpart = entry
            .remote_id
            .as_ref()
            .and_then(|remote_id| remote_index.get(remote_id))
            .and_then(|&index| remote_slots[index].take());

        let Some(mut remote_copy) = counterpart else {
            merged.push(entry);
            continue;
        };

        if entry.sync_status.is_unsynced() {
            merged.push(entry);
        } else if is_newer(&remote_copy, &entry) {
            tracing::debug!("Remote copy of entry {} is newer; taking it", entry.id);
            remote_copy.id = entry.id;
            remote_copy.sync_status = SyncStatus::Synced;
            merged.push(remote_copy);
        } else {
            entry.sync_status = SyncStatus::Synced;
            merged.push(entry);
        }
    }

    for remote_entry in remote_slots.into_iter().flatten() {
        match merged.iter_mut().find(|entry| entry.id == remote_entry.id) {
            Some(existing) if existing.remote_id.is_none() => {
                existing.remote_id = remote_entry.remote_id;
            }
            Some(existing) => {
                tracing::warn!(
                    "Remote documents {:?} and {:?} both claim entry {}; keeping the first",
                    existing.remote_id,
                    remote_entry.remote_id,
                    existing.id
                );
            }
            None => merged.push(remote_entry),
        }
    }

    sort_newest_first(&mut merged);
    merged
}

fn is_newer(candidate: &JournalEntry, current: &JournalEntry) -> bool {
    candidate.last_modified.unwrap_or(i64::MIN) > current.last_modified.unwrap_or(i64::MIN)
}
