//! Collection comparison and merge policies.

use std::collections::HashSet;

use serde::Serialize;

use crate::config::EquivalenceMode;
use crate::models::{Quote, QuoteId};

/// Records that differ between the two sides of a sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictReport {
    /// Local records missing from, or different on, the remote
    pub local_changes: Vec<Quote>,
    /// Remote records missing from, or different in, the local collection
    pub server_changes: Vec<Quote>,
}

impl ConflictReport {
    pub fn between(local: &[Quote], remote: &[Quote]) -> Self {
        Self {
            local_changes: detect_changes(local, remote),
            server_changes: detect_changes(remote, local),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.local_changes.is_empty() && self.server_changes.is_empty()
    }
}

/// Whether two collections hold the same `(text, category)` projections.
pub fn collections_equivalent(local: &[Quote], remote: &[Quote], mode: EquivalenceMode) -> bool {
    if local.len() != remote.len() {
        return false;
    }

    match mode {
        EquivalenceMode::Ordered => projected_json(local) == projected_json(remote),
        EquivalenceMode::Unordered => {
            let mut left = local.iter().map(Quote::projection).collect::<Vec<_>>();
            let mut right = remote.iter().map(Quote::projection).collect::<Vec<_>>();
            left.sort_unstable();
            right.sort_unstable();
            left == right
        }
    }
}

fn projected_json(quotes: &[Quote]) -> String {
    let projection = quotes.iter().map(Quote::projection).collect::<Vec<_>>();
    serde_json::to_string(&projection).unwrap_or_default()
}

/// The record in `others` that stands for `quote`: same id when `quote` has
/// one, otherwise the first record with the same text.
fn counterpart<'a>(quote: &Quote, others: &'a [Quote]) -> Option<&'a Quote> {
    match quote.id {
        Some(id) => others.iter().find(|other| other.id == Some(id)),
        None => others.iter().find(|other| other.text == quote.text),
    }
}

/// Records of `source` with no counterpart in `target`, or whose counterpart
/// has different text or category.
pub fn detect_changes(source: &[Quote], target: &[Quote]) -> Vec<Quote> {
    source
        .iter()
        .filter(|quote| counterpart(quote, target).is_none_or(|other| !other.same_content(quote)))
        .cloned()
        .collect()
}

/// Union by text, local records first; the first occurrence of a text wins.
///
/// A record whose id already appeared earlier in the union loses it, so the
/// result never holds two records with the same id.
pub fn merge_by_text(local: &[Quote], remote: &[Quote]) -> Vec<Quote> {
    let mut seen_texts = HashSet::new();
    let mut seen_ids = HashSet::new();
    local
        .iter()
        .chain(remote)
        .filter(|quote| seen_texts.insert(quote.text.as_str()))
        .map(|quote| {
            let mut quote = quote.clone();
            if quote.id.is_some_and(|id| !seen_ids.insert(id)) {
                quote.id = None;
            }
            quote
        })
        .collect()
}

/// Union by id where the later `last_updated` wins and ties go to the remote.
///
/// A local record without an id takes the place of a remote record with the
/// same content, but only while that remote id is not held by another local
/// record or already linked; otherwise it stays id-less so it gets pushed.
/// Remote-only records are appended in remote order. Ids in the result are
/// unique.
pub fn merge_newest_by_id(local: &[Quote], remote: &[Quote]) -> Vec<Quote> {
    let held = local
        .iter()
        .filter_map(|quote| quote.id)
        .collect::<HashSet<QuoteId>>();
    let mut taken = HashSet::new();
    let mut merged = Vec::with_capacity(local.len().max(remote.len()));

    for quote in local {
        match quote.id {
            Some(id) if !taken.insert(id) => {
                tracing::warn!("Local collection repeats id {id}; pushing the copy as new");
                merged.push(Quote {
                    id: None,
                    ..quote.clone()
                });
            }
            Some(_) => match counterpart(quote, remote) {
                Some(theirs) if theirs.last_updated >= quote.last_updated => {
                    merged.push(theirs.clone());
                }
                _ => merged.push(quote.clone()),
            },
            None => {
                let linked = remote.iter().find(|theirs| {
                    theirs.same_content(quote)
                        && theirs
                            .id
                            .is_some_and(|id| !held.contains(&id) && !taken.contains(&id))
                });
                match linked {
                    Some(theirs) => {
                        taken.extend(theirs.id);
                        merged.push(theirs.clone());
                    }
                    None => merged.push(quote.clone()),
                }
            }
        }
    }

    for theirs in remote {
        let present = match theirs.id {
            Some(id) => !taken.insert(id),
            None => merged.iter().any(|quote| quote.same_content(theirs)),
        };
        if !present {
            merged.push(theirs.clone());
        }
    }

    merged
}

/// Give id-less records in `resolved` the id of a remote record with the same
/// content, unless that id is already taken.
pub fn adopt_remote_ids(resolved: &mut [Quote], remote: &[Quote]) {
    for index in 0..resolved.len() {
        if resolved[index].id.is_some() {
            continue;
        }
        let candidate = remote
            .iter()
            .filter(|theirs| theirs.same_content(&resolved[index]))
            .find_map(|theirs| theirs.id)
            .filter(|id| !resolved.iter().any(|quote| quote.id == Some(*id)));
        resolved[index].id = candidate;
    }
}

/// Copy ids from push echoes onto the records at `indices`.
///
/// An echoed id already present in the collection is ignored so ids stay
/// unique.
pub fn adopt_server_ids(records: &mut [Quote], indices: &[usize], echoes: &[Quote]) {
    for (&index, echo) in indices.iter().zip(echoes) {
        let Some(id) = echo.id else {
            continue;
        };
        if records[index].id.is_some() {
            continue;
        }
        if records.iter().any(|quote| quote.id == Some(id)) {
            tracing::warn!("Remote assigned duplicate id {id}; keeping quote unsynced");
            continue;
        }
        records[index].id = Some(id);
    }
}

/// Keep `last_updated` from going backwards for records that already existed.
pub fn carry_forward_timestamps(resolved: &mut [Quote], previous: &[Quote]) {
    for quote in resolved.iter_mut() {
        let Some(id) = quote.id else {
            continue;
        };
        if let Some(before) = previous.iter().find(|old| old.id == Some(id)) {
            quote.last_updated = quote.last_updated.max(before.last_updated);
        }
    }
}

/// Records in `current` that were not part of the snapshot a cycle started from.
pub fn concurrent_additions(current: &[Quote], snapshot: &[Quote]) -> Vec<Quote> {
    current
        .iter()
        .filter(|quote| !snapshot.contains(quote))
        .cloned()
        .collect()
}
