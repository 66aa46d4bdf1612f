//! Rebuilding the tree from stored records.
//!
//! The manifest order is not trusted: records are inserted breadth-first from
//! the root, so every zone's parent is present before the zone itself.

use std::collections::VecDeque;

use pz_storage::{Manifest, StorageError, StorageResult, ZoneRecord, ZoneStore};
use pz_zone::{Zone, zone_key};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::tree::ZoneTree;

/// Load every zone listed in `manifest` from `store`.
pub(crate) fn load_tree<S: ZoneStore + ?Sized>(
    store: &S,
    manifest: &Manifest,
) -> StorageResult<ZoneTree> {
    let mut seen = FxHashSet::default();
    let mut records = Vec::with_capacity(manifest.zones.len());

    for name in &manifest.zones {
        if !seen.insert(zone_key(name)) {
            tracing::warn!("Manifest lists zone {name} more than once");
            continue;
        }
        records.push(store.load_record(name)?);
    }

    build_tree(records)
}

/// Assemble a tree from records in any order.
pub(crate) fn build_tree(records: Vec<ZoneRecord>) -> StorageResult<ZoneTree> {
    let mut root: Option<Zone> = None;
    let mut pending: FxHashMap<String, Zone> = FxHashMap::default();
    // parent key -> child keys
    let mut children: FxHashMap<String, Vec<String>> = FxHashMap::default();

    for record in records {
        let zone = record.into_zone()?;
        let key = zone.key();

        match zone.parent() {
            None => {
                if let Some(existing) = &root {
                    return Err(StorageError::MalformedRecord {
                        key,
                        reason: format!("second root zone (already have {})", existing.name()),
                    });
                }
                root = Some(zone);
            }
            Some(parent) => {
                children.entry(zone_key(parent)).or_default().push(key.clone());
                if pending.insert(key.clone(), zone).is_some() {
                    return Err(StorageError::MalformedRecord {
                        key,
                        reason: "duplicate zone".to_owned(),
                    });
                }
            }
        }
    }

    let Some(root) = root else {
        return Err(StorageError::MalformedRecord {
            key: Manifest::KEY.to_owned(),
            reason: "no root zone".to_owned(),
        });
    };

    if pending.contains_key(&root.key()) {
        return Err(StorageError::MalformedRecord {
            key: root.key(),
            reason: "duplicate zone".to_owned(),
        });
    }

    let mut queue = VecDeque::from([root.key()]);
    let mut tree = ZoneTree::new(root);

    while let Some(parent) = queue.pop_front() {
        let Some(mut keys) = children.remove(&parent) else {
            continue;
        };
        keys.sort();
        for key in keys {
            if let Some(zone) = pending.remove(&key) {
                tree.insert(zone);
                queue.push_back(key);
            }
        }
    }

    // Whatever is left has a parent that is missing or lies on a cycle.
    let mut orphans: Vec<&String> = pending.keys().collect();
    orphans.sort();
    if let Some(&first) = orphans.first() {
        return Err(StorageError::MalformedRecord {
            key: first.clone(),
            reason: unreachable_reason(&pending, first),
        });
    }

    Ok(tree)
}

/// Follow parents through the unplaced zones until the chain leaves them or
/// comes back on itself.
fn unreachable_reason(pending: &FxHashMap<String, Zone>, start: &str) -> String {
    let mut visited = FxHashSet::default();
    let mut current = start.to_owned();

    loop {
        if !visited.insert(current.clone()) {
            return format!("zone {current} is part of a parent cycle");
        }
        let Some(parent) = pending.get(&current).and_then(Zone::parent) else {
            return format!("unknown parent {current}");
        };
        let parent = zone_key(parent);
        if !pending.contains_key(&parent) {
            return format!("unknown parent {parent}");
        }
        current = parent;
    }
}
