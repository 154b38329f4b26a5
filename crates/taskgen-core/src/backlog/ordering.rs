//! Reordering and grouping of a stored backlog.
//!
//! These functions operate on an in-memory copy of one backlog's items. The
//! service layer loads the items, applies one of these operations, and
//! persists the touched fields in a single transaction. A rejected operation
//! leaves the items untouched.

use std::collections::HashSet;

use thiserror::Error;
use uuid::Uuid;

use taskgen_db::models::Task;

/// Why a proposed ordering was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReorderError {
    #[error("at least one task ID is required")]
    Empty,

    #[error("task {0} appears more than once in the new order")]
    Duplicate(Uuid),

    #[error("task {0} does not belong to this backlog")]
    Unknown(Uuid),

    #[error("new order omits {} task(s) of this backlog", .0.len())]
    Missing(Vec<Uuid>),
}

/// Why a grouping request was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GroupError {
    #[error("at least one task ID is required")]
    Empty,

    #[error("{} task(s) do not belong to this backlog", .0.len())]
    Unknown(Vec<Uuid>),
}

/// Check that `proposed` lists every ID in `current` exactly once and
/// nothing else.
pub fn check_permutation(current: &[Uuid], proposed: &[Uuid]) -> Result<(), ReorderError> {
    if proposed.is_empty() {
        return Err(ReorderError::Empty);
    }

    let known: HashSet<Uuid> = current.iter().copied().collect();
    let mut seen: HashSet<Uuid> = HashSet::with_capacity(proposed.len());
    for id in proposed {
        if !known.contains(id) {
            return Err(ReorderError::Unknown(*id));
        }
        if !seen.insert(*id) {
            return Err(ReorderError::Duplicate(*id));
        }
    }

    let missing: Vec<Uuid> = current
        .iter()
        .filter(|id| !seen.contains(id))
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(ReorderError::Missing(missing));
    }

    Ok(())
}

/// Set each item's `sort_order` to its position in `order` and sort the
/// slice to match.
pub fn reorder_items(items: &mut [Task], order: &[Uuid]) -> Result<(), ReorderError> {
    let current: Vec<Uuid> = items.iter().map(|t| t.id).collect();
    check_permutation(&current, order)?;

    for item in items.iter_mut() {
        // check_permutation guarantees presence.
        if let Some(pos) = order.iter().position(|id| *id == item.id) {
            item.sort_order = pos as i32;
        }
    }
    items.sort_by_key(|t| t.sort_order);
    Ok(())
}

/// Set `group_name` on the named items. Other items and all other fields
/// are left as they were. Returns how many items were named.
pub fn group_items(items: &mut [Task], ids: &[Uuid], group_name: &str) -> Result<usize, GroupError> {
    if ids.is_empty() {
        return Err(GroupError::Empty);
    }

    let selected: HashSet<Uuid> = ids.iter().copied().collect();
    let known: HashSet<Uuid> = items.iter().map(|t| t.id).collect();
    let mut unknown: Vec<Uuid> = selected.difference(&known).copied().collect();
    if !unknown.is_empty() {
        unknown.sort();
        return Err(GroupError::Unknown(unknown));
    }

    for item in items.iter_mut().filter(|t| selected.contains(&t.id)) {
        item.group_name = group_name.to_string();
    }
    Ok(selected.len())
}

/// True if the items' sort orders are exactly `0..len` in slice order.
pub fn is_contiguous(items: &[Task]) -> bool {
    items
        .iter()
        .enumerate()
        .all(|(i, t)| t.sort_order == i as i32)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
