//! Filtered, writable views over a canonical collection.
//!
//! Reading keeps the records matching a predicate in canonical order. Writing
//! merges a whole new view back: records that were in the old view but are
//! missing from the new one are removed, the rest are replaced in place by id
//! or appended.

use std::collections::HashSet;

use uuid::Uuid;

use crate::model::Identified;

pub fn filtered<R, P>(canonical: &[R], predicate: P) -> Vec<R>
where
  R: Identified + Clone,
  P: Fn(&R) -> bool,
{
  canonical
    .iter()
    .filter(|record| predicate(*record))
    .cloned()
    .collect()
}

/// Returns `true` when the canonical collection changed.
pub fn merge_filtered<R, P>(canonical: &mut Vec<R>, predicate: P, new_values: Vec<R>) -> bool
where
  R: Identified + Clone + PartialEq,
  P: Fn(&R) -> bool,
{
  let keep: HashSet<Uuid> = new_values.iter().map(Identified::id).collect();
  let pruned: HashSet<Uuid> = canonical
    .iter()
    .filter(|record| predicate(*record) && !keep.contains(&record.id()))
    .map(Identified::id)
    .collect();

  let before = canonical.len();
  canonical.retain(|record| !pruned.contains(&record.id()));
  let mut changed = canonical.len() != before;

  for record in new_values {
    match canonical.iter_mut().find(|existing| existing.id() == record.id()) {
      Some(existing) => {
        if *existing != record {
          *existing = record;
          changed = true;
        }
      }
      None => {
        canonical.push(record);
        changed = true;
      }
    }
  }

  changed
}
