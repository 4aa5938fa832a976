//! Child-order reconciliation against a mirror tree.
//!
//! The producing side diffs the current child ids of a parent against the
//! desired ones and ships the edit script as a base64 batch. The consuming
//! side (the native DOM binding, or any mirror [`Tree`]) applies it here:
//!
//! - `Remove` carries a source index; it lands at that index shifted by the
//!   inserts and removes already applied, and only if the slot holds the
//!   named element.
//! - `Insert` places the element at its destination index. A move is an
//!   Insert at the new slot plus a Remove of the old one.
//!
//! Ops are played on a working copy of the child list (the fragment) and
//! committed in one step. Ops naming an element the mirror does not know,
//! or a Remove whose slot holds another element, are skipped; the rest of
//! the batch still applies.

use rustc_hash::FxHashSet;

use crate::algo::{OpKind, decode_batch, edit_script, encode_batch};
use crate::error::{ZuiError, ZuiResult};
use crate::id::ElementId;
use crate::node::Tree;

/// Outcome of [`apply_batch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyStats {
    pub applied: usize,
    pub skipped: usize,
}

impl ApplyStats {
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.skipped == 0
    }
}

/// Batch turning `parent`'s current children into `desired`.
pub fn diff_children(tree: &Tree, parent: &ElementId, desired: &[ElementId]) -> ZuiResult<String> {
    if !tree.contains(parent) {
        return Err(ZuiError::UnknownElement(parent.clone()));
    }
    encode_batch(&edit_script(tree.children(parent), desired))
}

/// Apply a batch to `parent`'s children.
pub fn apply_batch(tree: &mut Tree, parent: &ElementId, batch: &str) -> ZuiResult<ApplyStats> {
    if !tree.contains(parent) {
        return Err(ZuiError::UnknownElement(parent.clone()));
    }
    let ops = decode_batch(batch)?;
    let mut fragment: Vec<ElementId> = tree.children(parent).to_vec();
    let mut stats = ApplyStats::default();

    let mut offset: isize = 0;

    for op in &ops {
        if !tree.contains(&op.id) {
            tracing::debug!(parent = %parent, element = %op.id, op = op.op.as_str(), "no such element, op skipped");
            stats.skipped += 1;
            continue;
        }
        match op.op {
            OpKind::Remove => {
                let pos = op.index as isize + offset;
                let matches = usize::try_from(pos)
                    .ok()
                    .filter(|&p| fragment.get(p) == Some(&op.id));
                let Some(pos) = matches else {
                    tracing::debug!(parent = %parent, element = %op.id, index = op.index, "remove slot mismatch, op skipped");
                    stats.skipped += 1;
                    continue;
                };
                fragment.remove(pos);
                offset -= 1;
            }
            OpKind::Insert => {
                let at = op.index.min(fragment.len());
                fragment.insert(at, op.id.clone());
                offset += 1;
            }
        }
        stats.applied += 1;
    }

    // A skipped Remove can leave a moved element listed twice.
    let mut seen = FxHashSet::default();
    fragment.retain(|c| seen.insert(c.clone()));

    tree.set_children(parent, fragment)?;
    Ok(stats)
}
