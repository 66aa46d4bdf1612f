//! In-memory zone tree.
//!
//! Zones are indexed by lowercased name. The root is held separately so it
//! can never be removed from the index, and every other zone refers to its
//! parent by name.

use std::cmp::Ordering;

use pz_storage::Manifest;
use pz_zone::{BlockPos, Zone, ZoneLookup, zone_key};
use rustc_hash::{FxHashMap, FxHashSet};

/// The full zone set.
#[derive(Debug, Clone)]
pub(crate) struct ZoneTree {
    root: Zone,
    root_key: String,
    /// Every non-root zone, by key.
    zones: FxHashMap<String, Zone>,
}

impl ZoneTree {
    pub(crate) fn new(root: Zone) -> Self {
        let root_key = root.key();
        Self {
            root,
            root_key,
            zones: FxHashMap::default(),
        }
    }

    pub(crate) fn root(&self) -> &Zone {
        &self.root
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Zone> {
        let key = zone_key(name);
        if key == self.root_key {
            Some(&self.root)
        } else {
            self.zones.get(&key)
        }
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Zone> {
        let key = zone_key(name);
        if key == self.root_key {
            Some(&mut self.root)
        } else {
            self.zones.get_mut(&key)
        }
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.zones.len() + 1
    }

    /// Insert a non-root zone. The caller has checked that the key is free.
    pub(crate) fn insert(&mut self, zone: Zone) {
        self.zones.insert(zone.key(), zone);
    }

    /// Remove a non-root zone.
    pub(crate) fn remove(&mut self, name: &str) -> Option<Zone> {
        self.zones.remove(&zone_key(name))
    }

    /// Direct children of `name`, sorted by key.
    pub(crate) fn children(&self, name: &str) -> Vec<&Zone> {
        let key = zone_key(name);
        let mut children: Vec<&Zone> = self
            .zones
            .values()
            .filter(|z| z.parent().is_some_and(|p| zone_key(p) == key))
            .collect();
        children.sort_by_key(|z| z.key());
        children
    }

    /// Whether `candidate` is `ancestor` or lies below it.
    pub(crate) fn is_descendant_or_self(&self, ancestor: &str, candidate: &str) -> bool {
        let ancestor = zone_key(ancestor);
        let mut current = self.get(candidate);

        for _ in 0..=self.len() {
            let Some(zone) = current else {
                return false;
            };
            if zone.key() == ancestor {
                return true;
            }
            current = zone.parent().and_then(|p| self.get(p));
        }
        false
    }

    /// Most specific zone containing `pos` in `world`.
    ///
    /// Descends one level at a time from the root. Among siblings that all
    /// contain the point, the one with the smallest lateral area wins, then
    /// the lowest key. Each zone is visited at most once.
    pub(crate) fn resolve(&self, pos: BlockPos, world: &str) -> &Zone {
        let mut current = &self.root;
        let mut visited = FxHashSet::default();
        visited.insert(current.key());

        loop {
            let best = self
                .children(current.name())
                .into_iter()
                .filter(|z| z.contains(pos, world))
                .min_by(|a, b| compare_specificity(a, b));

            match best {
                Some(zone) if visited.insert(zone.key()) => current = zone,
                _ => return current,
            }
        }
    }

    /// Every zone, parents before children, siblings sorted by key.
    pub(crate) fn ordered(&self) -> Vec<&Zone> {
        let mut out = Vec::with_capacity(self.len());
        let mut seen = FxHashSet::default();
        out.push(&self.root);
        seen.insert(self.root_key.clone());

        let mut cursor = 0;
        while cursor < out.len() {
            let parent: &Zone = out[cursor];
            for child in self.children(parent.name()) {
                if seen.insert(child.key()) {
                    out.push(child);
                }
            }
            cursor += 1;
        }

        // Unreachable zones only exist if an invariant was broken; keep them
        // listed so they are not silently dropped from storage.
        let mut stragglers: Vec<&Zone> = self
            .zones
            .values()
            .filter(|z| !seen.contains(&z.key()))
            .collect();
        stragglers.sort_by_key(|z| z.key());
        out.extend(stragglers);

        out
    }

    /// Zone names, parents first.
    pub(crate) fn names(&self) -> Vec<String> {
        self.ordered()
            .into_iter()
            .map(|z| z.name().to_owned())
            .collect()
    }

    pub(crate) fn manifest(&self) -> Manifest {
        Manifest::new(self.names())
    }
}

fn compare_specificity(a: &Zone, b: &Zone) -> Ordering {
    a.area2()
        .cmp(&b.area2())
        .then_with(|| a.key().cmp(&b.key()))
}

impl ZoneLookup for ZoneTree {
    fn zone(&self, name: &str) -> Option<&Zone> {
        self.get(name)
    }

    fn zone_count(&self) -> usize {
        self.len()
    }
}
