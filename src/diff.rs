//! Change detection between two polls
//!
//! Items carry no identity beyond their values. An object is recognized
//! across polls by kind, host name and service name; any other field
//! differing means the object changed. Old and new items are only paired
//! when the identity is unambiguous on both sides.

use std::collections::{HashMap, HashSet};

use crate::item::{Item, ItemKind};

type Identity<'a> = (ItemKind, &'a str, &'a str);

fn identity(item: &Item) -> Identity<'_> {
    (item.kind(), item.host_name(), item.service_name())
}

/// Display names are not unique, so one identity can hold several items
fn by_identity<'a>(items: impl Iterator<Item = &'a Item>) -> HashMap<Identity<'a>, Vec<&'a Item>> {
    let mut grouped: HashMap<Identity<'a>, Vec<&'a Item>> = HashMap::new();
    for item in items {
        grouped.entry(identity(item)).or_default().push(item);
    }
    grouped
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateDiff {
    /// Objects that were not present in the previous poll
    pub appeared: Vec<Item>,

    /// Objects that are gone in the current poll
    pub vanished: Vec<Item>,

    /// `(previous, current)` for objects whose state, flags or output changed
    pub changed: Vec<(Item, Item)>,
}

impl StateDiff {
    pub fn between<'a>(
        previous: impl IntoIterator<Item = &'a Item>,
        current: impl IntoIterator<Item = &'a Item>,
    ) -> Self {
        let previous: HashSet<&Item> = previous.into_iter().collect();
        let current: HashSet<&Item> = current.into_iter().collect();

        // Unchanged items cancel out; only the symmetric difference matters.
        let before = by_identity(previous.difference(&current).copied());
        let after = by_identity(current.difference(&previous).copied());

        let mut diff = StateDiff::default();

        for (key, new_items) in &after {
            match (before.get(key).map(Vec::as_slice), new_items.as_slice()) {
                (Some([old]), [item]) => diff.changed.push(((*old).clone(), (*item).clone())),
                _ => diff.appeared.extend(new_items.iter().map(|item| (*item).clone())),
            }
        }

        for (key, old_items) in &before {
            let paired = matches!(
                (old_items.as_slice(), after.get(key).map(Vec::as_slice)),
                ([_], Some([_]))
            );
            if !paired {
                diff.vanished.extend(old_items.iter().map(|item| (*item).clone()));
            }
        }

        diff.appeared.sort();
        diff.vanished.sort();
        diff.changed.sort_by(|a, b| a.1.cmp(&b.1));
        diff
    }

    pub fn is_empty(&self) -> bool {
        self.appeared.is_empty() && self.vanished.is_empty() && self.changed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.appeared.len() + self.vanished.len() + self.changed.len()
    }
}
