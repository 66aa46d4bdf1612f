//! The zone registry.

use parking_lot::RwLock;
use pz_storage::{FsZoneStore, MutationBuffer, ZoneRecord, ZoneStore};
use pz_zone::{BlockPos, EVERYWHERE, Flag, Polygon, State, Zone};

use crate::config::RegistryConfig;
use crate::error::{RegistryError, RegistryResult};
use crate::load::load_tree;
use crate::queue::PersistQueue;
use crate::tree::ZoneTree;

/// Name-indexed zone tree backed by a [`ZoneStore`].
///
/// Queries take a read lock and return owned snapshots. Mutations take the
/// write lock, change the tree, and collect the store writes they imply in a
/// [`MutationBuffer`]. Before releasing the lock the writer takes a ticket in
/// the persist queue; the buffer is applied once the lock is gone and every
/// earlier ticket is done. Writes reach the store in mutation order, and
/// neither readers nor other writers wait on I/O to use the tree.
pub struct ZoneRegistry<S: ZoneStore = FsZoneStore> {
    pub(crate) tree: RwLock<ZoneTree>,
    persist: PersistQueue,
    store: S,
    config: RegistryConfig,
}

impl ZoneRegistry<FsZoneStore> {
    /// Open the filesystem store at `config.data_dir`.
    pub fn from_config(config: RegistryConfig) -> RegistryResult<Self> {
        let store = FsZoneStore::open(config.data_dir.clone());
        Self::open(store, config)
    }
}

impl<S: ZoneStore> ZoneRegistry<S> {
    /// Load every zone from `store`, or bootstrap the root zone if the store
    /// has no manifest yet.
    pub fn open(store: S, config: RegistryConfig) -> RegistryResult<Self> {
        let tree = match store.load_manifest()? {
            Some(manifest) => {
                let tree = load_tree(&store, &manifest)?;
                tracing::info!("Loaded {} zones", tree.len());
                tree
            }
            None => {
                let root = Zone::root(EVERYWHERE, EVERYWHERE, config.root_flags)?;
                let tree = ZoneTree::new(root);

                store.save_record(&ZoneRecord::from_zone(tree.root()))?;
                store.save_manifest(&tree.manifest())?;
                tracing::info!("Bootstrapped root zone {EVERYWHERE}");
                tree
            }
        };

        Ok(Self {
            tree: RwLock::new(tree),
            persist: PersistQueue::new(),
            store,
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run `f` against the tree under the write lock, then persist whatever
    /// it buffered.
    ///
    /// If `f` fails nothing is persisted. A persistence failure is returned,
    /// but the in-memory change stays applied.
    fn write<T>(
        &self,
        f: impl FnOnce(&mut ZoneTree, &mut MutationBuffer) -> RegistryResult<T>,
    ) -> RegistryResult<T> {
        let mut tree = self.tree.write();
        let mut buffer = MutationBuffer::new();
        let value = f(&mut *tree, &mut buffer)?;
        self.flush(tree, buffer)?;
        Ok(value)
    }

    /// Take a persist ticket, release `guard`, then apply `buffer` once the
    /// ticket's turn comes.
    fn flush<G>(&self, guard: G, buffer: MutationBuffer) -> RegistryResult<()> {
        if buffer.is_empty() {
            drop(guard);
            return Ok(());
        }

        let ticket = self.persist.ticket();
        drop(guard);

        ticket.wait();
        buffer.apply(&self.store)?;
        Ok(())
    }

    /// Mutate a single zone and persist its record. Returns the updated zone.
    pub(crate) fn update(
        &self,
        name: &str,
        f: impl FnOnce(&mut Zone) -> RegistryResult<()>,
    ) -> RegistryResult<Zone> {
        self.write(|tree, buffer| {
            let zone = tree
                .get_mut(name)
                .ok_or_else(|| RegistryError::UnknownZone(name.to_owned()))?;
            f(zone)?;
            buffer.put_record(ZoneRecord::from_zone(zone));
            Ok(zone.clone())
        })
    }

    /// Register a new zone under `parent`.
    ///
    /// The zone starts with no vertices, the configured default band, and
    /// every flag inheriting. Its record and the manifest are persisted.
    pub fn create(&self, name: &str, world: &str, parent: &str) -> RegistryResult<Zone> {
        self.write(|tree, buffer| {
            if tree.contains(name) {
                return Err(RegistryError::DuplicateName(name.to_owned()));
            }
            let parent = tree
                .get(parent)
                .ok_or_else(|| RegistryError::UnknownParent(parent.to_owned()))?
                .name()
                .to_owned();

            let mut zone = Zone::new(name, world, parent)?;
            zone.set_band(self.config.default_band);

            buffer.put_record(ZoneRecord::from_zone(&zone));
            tree.insert(zone.clone());
            buffer.put_manifest(tree.manifest());

            tracing::info!(
                "Created zone {} in world {} under {}",
                zone.name(),
                zone.world(),
                zone.parent().unwrap_or_default()
            );
            Ok(zone)
        })
    }

    /// Remove a zone, moving its children up to its parent.
    ///
    /// Returns `Ok(false)` if no such zone exists.
    pub fn delete(&self, name: &str) -> RegistryResult<bool> {
        self.write(|tree, buffer| {
            let Some(target) = tree.get(name) else {
                return Ok(false);
            };
            let Some(parent) = target.parent().map(str::to_owned) else {
                return Err(RegistryError::RootImmutable(target.name().to_owned()));
            };

            let children: Vec<String> = tree
                .children(name)
                .into_iter()
                .map(|z| z.name().to_owned())
                .collect();

            for child in &children {
                if let Some(zone) = tree.get_mut(child) {
                    zone.set_parent(parent.as_str())?;
                    buffer.put_record(ZoneRecord::from_zone(zone));
                }
            }

            if let Some(removed) = tree.remove(name) {
                buffer.delete_record(removed.key());
                tracing::info!(
                    "Deleted zone {}, moved {} children to {parent}",
                    removed.name(),
                    children.len()
                );
            }
            buffer.put_manifest(tree.manifest());
            Ok(true)
        })
    }

    /// Move `name` under `parent`.
    ///
    /// Rejects the root, unknown zones, and any parent that is `name` itself
    /// or one of its descendants.
    pub fn set_parent(&self, name: &str, parent: &str) -> RegistryResult<()> {
        self.write(|tree, buffer| {
            let zone = tree
                .get(name)
                .ok_or_else(|| RegistryError::UnknownZone(name.to_owned()))?;
            if zone.is_root() {
                return Err(RegistryError::RootImmutable(zone.name().to_owned()));
            }
            let new_parent = tree
                .get(parent)
                .ok_or_else(|| RegistryError::UnknownParent(parent.to_owned()))?
                .name()
                .to_owned();

            if tree.is_descendant_or_self(name, &new_parent) {
                return Err(RegistryError::CycleDetected {
                    zone: name.to_owned(),
                    parent: new_parent,
                });
            }

            let zone = tree
                .get_mut(name)
                .ok_or_else(|| RegistryError::UnknownZone(name.to_owned()))?;
            zone.set_parent(new_parent.as_str())?;
            buffer.put_record(ZoneRecord::from_zone(zone));
            tracing::info!("Moved zone {} under {new_parent}", zone.name());

            buffer.put_manifest(tree.manifest());
            Ok(())
        })
    }

    /// Snapshot of the zone named `name`.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Zone> {
        self.tree.read().get(name).cloned()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tree.read().contains(name)
    }

    /// Every zone name, parents before children.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        self.tree.read().names()
    }

    /// Names of the direct children of `name`, sorted.
    pub fn children(&self, name: &str) -> RegistryResult<Vec<String>> {
        let tree = self.tree.read();
        if !tree.contains(name) {
            return Err(RegistryError::UnknownZone(name.to_owned()));
        }
        Ok(tree
            .children(name)
            .into_iter()
            .map(|z| z.name().to_owned())
            .collect())
    }

    #[must_use]
    pub fn root(&self) -> Zone {
        self.tree.read().root().clone()
    }

    /// Number of zones, including the root.
    #[must_use]
    pub fn zone_count(&self) -> usize {
        self.tree.read().len()
    }

    /// The most specific zone containing `pos` in `world`. Never fails: the
    /// root contains everything.
    #[must_use]
    pub fn resolve_containing(&self, pos: BlockPos, world: &str) -> Zone {
        self.tree.read().resolve(pos, world).clone()
    }

    /// Effective state of `flag` on `name`, never `Inherit`.
    pub fn flag_state(&self, name: &str, flag: Flag) -> RegistryResult<State> {
        let tree = self.tree.read();
        let zone = tree
            .get(name)
            .ok_or_else(|| RegistryError::UnknownZone(name.to_owned()))?;
        Ok(zone.resolve_flag(flag, &*tree))
    }

    /// Effective state of `flag` at `pos`, from the zone containing it.
    #[must_use]
    pub fn flag_at(&self, pos: BlockPos, world: &str, flag: Flag) -> State {
        let tree = self.tree.read();
        tree.resolve(pos, world).resolve_flag(flag, &*tree)
    }

    pub fn set_flag(&self, name: &str, flag: Flag, state: State) -> RegistryResult<()> {
        self.update(name, |zone| {
            zone.set_flag(flag, state)?;
            tracing::debug!("Set {flag} to {state} on {}", zone.name());
            Ok(())
        })
        .map(drop)
    }

    pub fn set_ceiling(&self, name: &str, ceiling: i32) -> RegistryResult<()> {
        self.update(name, |zone| {
            zone.set_ceiling(ceiling)?;
            tracing::debug!("Set ceiling of {} to {ceiling}", zone.name());
            Ok(())
        })
        .map(drop)
    }

    pub fn set_floor(&self, name: &str, floor: i32) -> RegistryResult<()> {
        self.update(name, |zone| {
            zone.set_floor(floor)?;
            tracing::debug!("Set floor of {} to {floor}", zone.name());
            Ok(())
        })
        .map(drop)
    }

    /// Append a vertex to the zone's polygon. No-op on the root.
    pub fn add_point(&self, name: &str, x: i32, z: i32) -> RegistryResult<()> {
        self.update(name, |zone| {
            zone.add_point(x, z);
            Ok(())
        })
        .map(drop)
    }

    pub fn reset_geometry(&self, name: &str) -> RegistryResult<()> {
        self.update(name, |zone| {
            zone.reset_geometry();
            tracing::debug!("Cleared geometry of {}", zone.name());
            Ok(())
        })
        .map(drop)
    }

    /// Replace the zone's polygon. Returns the updated zone.
    pub fn set_polygon(&self, name: &str, polygon: Polygon) -> RegistryResult<Zone> {
        self.update(name, |zone| {
            zone.set_polygon(polygon);
            tracing::debug!(
                "Set {} vertices on {}",
                zone.polygon().len(),
                zone.name()
            );
            Ok(())
        })
    }

    pub fn set_greeting(&self, name: &str, greeting: Option<String>) -> RegistryResult<()> {
        self.update(name, |zone| {
            zone.set_greeting(greeting);
            Ok(())
        })
        .map(drop)
    }

    pub fn set_farewell(&self, name: &str, farewell: Option<String>) -> RegistryResult<()> {
        self.update(name, |zone| {
            zone.set_farewell(farewell);
            Ok(())
        })
        .map(drop)
    }

    /// Write the current record of `name` again.
    pub fn persist_zone(&self, name: &str) -> RegistryResult<()> {
        let tree = self.tree.read();
        let zone = tree
            .get(name)
            .ok_or_else(|| RegistryError::UnknownZone(name.to_owned()))?;

        let mut buffer = MutationBuffer::new();
        buffer.put_record(ZoneRecord::from_zone(zone));
        tracing::debug!("Persisting zone {}", zone.name());
        self.flush(tree, buffer)
    }

    /// Write the current manifest again.
    pub fn persist_manifest(&self) -> RegistryResult<()> {
        let tree = self.tree.read();
        let mut buffer = MutationBuffer::new();
        buffer.put_manifest(tree.manifest());
        tracing::debug!("Persisting manifest");
        self.flush(tree, buffer)
    }
}
