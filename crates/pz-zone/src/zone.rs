//! The zone entity.
//!
//! A zone is a node in a tree rooted at the distinguished "everywhere" zone.
//! Parents are referenced by name and resolved through a [`ZoneLookup`], so a
//! zone never owns or points at another zone directly.

use std::collections::HashMap;
use std::hash::BuildHasher;

use crate::error::{ZoneError, ZoneResult};
use crate::flag::{Flag, FlagTable, State};
use crate::geometry::{BlockPos, Polygon, Vertex, VerticalBand};

/// Name of the bootstrap root zone, and the world sentinel matching any world.
pub const EVERYWHERE: &str = "everywhere";

/// Longest accepted zone name.
pub const MAX_NAME_LEN: usize = 64;

/// Registry key for a zone name. Names compare case-insensitively.
#[must_use]
pub fn zone_key(name: &str) -> String {
    name.to_ascii_lowercase()
}

/// Check that `name` is usable as a zone name and record key.
pub fn validate_name(name: &str) -> ZoneResult<()> {
    let valid = !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');

    if valid {
        Ok(())
    } else {
        Err(ZoneError::InvalidName(name.to_owned()))
    }
}

/// Name-indexed access to zones, used to walk parent chains.
pub trait ZoneLookup {
    /// Zone with the given name (case-insensitive).
    fn zone(&self, name: &str) -> Option<&Zone>;

    /// Number of zones reachable through this lookup.
    fn zone_count(&self) -> usize;
}

impl<S: BuildHasher> ZoneLookup for HashMap<String, Zone, S> {
    fn zone(&self, name: &str) -> Option<&Zone> {
        self.get(&zone_key(name))
    }

    fn zone_count(&self) -> usize {
        self.len()
    }
}

/// A named, vertically bounded polygonal region.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Zone {
    name: String,
    world: String,
    /// `None` only for the root.
    parent: Option<String>,
    polygon: Polygon,
    band: VerticalBand,
    flags: FlagTable,
    greeting: Option<String>,
    farewell: Option<String>,
}

impl Zone {
    /// Create a root zone. Every flag must be concrete.
    pub fn root(name: impl Into<String>, world: impl Into<String>, flags: FlagTable) -> ZoneResult<Self> {
        let name = name.into();
        validate_name(&name)?;
        if let Some(flag) = flags.first_inherit() {
            return Err(ZoneError::InheritOnRoot(flag));
        }

        Ok(Self {
            name,
            world: world.into(),
            parent: None,
            polygon: Polygon::new(),
            band: VerticalBand::default(),
            flags,
            greeting: None,
            farewell: None,
        })
    }

    /// Create a child zone with an empty polygon, the default band, and every
    /// flag inheriting from `parent`.
    pub fn new(
        name: impl Into<String>,
        world: impl Into<String>,
        parent: impl Into<String>,
    ) -> ZoneResult<Self> {
        let name = name.into();
        validate_name(&name)?;

        Ok(Self {
            name,
            world: world.into(),
            parent: Some(parent.into()),
            polygon: Polygon::new(),
            band: VerticalBand::default(),
            flags: FlagTable::inheriting(),
            greeting: None,
            farewell: None,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lowercased name, used as the registry and record key.
    #[must_use]
    pub fn key(&self) -> String {
        zone_key(&self.name)
    }

    #[must_use]
    pub fn world(&self) -> &str {
        &self.world
    }

    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    #[must_use]
    pub fn polygon(&self) -> &Polygon {
        &self.polygon
    }

    #[must_use]
    pub fn band(&self) -> VerticalBand {
        self.band
    }

    #[must_use]
    pub fn floor(&self) -> i32 {
        self.band.floor()
    }

    #[must_use]
    pub fn ceiling(&self) -> i32 {
        self.band.ceiling()
    }

    #[must_use]
    pub fn flags(&self) -> &FlagTable {
        &self.flags
    }

    #[must_use]
    pub fn greeting(&self) -> Option<&str> {
        self.greeting.as_deref()
    }

    #[must_use]
    pub fn farewell(&self) -> Option<&str> {
        self.farewell.as_deref()
    }

    /// Append a vertex. The root has no polygon, so this is a no-op there.
    pub fn add_point(&mut self, x: i32, z: i32) {
        if self.is_root() {
            return;
        }
        self.polygon.push(Vertex::new(x, z));
    }

    /// Clear the vertex sequence.
    pub fn reset_geometry(&mut self) {
        self.polygon.clear();
    }

    /// Replace the vertex sequence. No-op on the root.
    pub fn set_polygon(&mut self, polygon: Polygon) {
        if self.is_root() {
            return;
        }
        self.polygon = polygon;
    }

    pub fn set_ceiling(&mut self, ceiling: i32) -> ZoneResult<()> {
        self.band = self.band.with_ceiling(ceiling)?;
        Ok(())
    }

    pub fn set_floor(&mut self, floor: i32) -> ZoneResult<()> {
        self.band = self.band.with_floor(floor)?;
        Ok(())
    }

    pub fn set_band(&mut self, band: VerticalBand) {
        self.band = band;
    }

    /// Store `state` for `flag`. Descendants pick the change up lazily when
    /// they resolve an inherited flag.
    pub fn set_flag(&mut self, flag: Flag, state: State) -> ZoneResult<()> {
        if self.is_root() && state == State::Inherit {
            return Err(ZoneError::InheritOnRoot(flag));
        }
        self.flags.set(flag, state);
        Ok(())
    }

    /// Locally stored state, possibly `Inherit`.
    #[must_use]
    pub fn flag(&self, flag: Flag) -> State {
        self.flags.get(flag)
    }

    /// Effective state of `flag`, following `Inherit` up the parent chain.
    ///
    /// Never returns `Inherit`. The walk takes at most one step per zone in
    /// `lookup`; a chain that ends without a concrete state resolves to `Off`.
    #[must_use]
    pub fn resolve_flag<L: ZoneLookup + ?Sized>(&self, flag: Flag, lookup: &L) -> State {
        let mut current = self;

        for _ in 0..=lookup.zone_count() {
            let state = current.flags.get(flag);
            if state.is_concrete() {
                return state;
            }

            match current.parent.as_deref().and_then(|p| lookup.zone(p)) {
                Some(parent) => current = parent,
                None => break,
            }
        }

        State::Off
    }

    /// Point this zone at a new parent. Rejected on the root.
    ///
    /// The flag table is total, so every flag never set explicitly keeps
    /// inheriting from whichever parent is current.
    pub fn set_parent(&mut self, parent: impl Into<String>) -> ZoneResult<()> {
        if self.is_root() {
            return Err(ZoneError::RootHasNoParent);
        }
        self.parent = Some(parent.into());
        Ok(())
    }

    pub fn set_greeting(&mut self, greeting: Option<String>) {
        self.greeting = greeting;
    }

    pub fn set_farewell(&mut self, farewell: Option<String>) {
        self.farewell = farewell;
    }

    /// Whether the block at lateral `(x, z)` and height `y` in `world` lies in
    /// this zone. The root contains everything.
    #[must_use]
    pub fn contains_point(&self, x: i32, z: i32, y: i32, world: &str) -> bool {
        if self.is_root() {
            return true;
        }

        self.polygon.contains(x, z)
            && self.band.contains(y)
            && (self.world == world || self.world == EVERYWHERE)
    }

    #[must_use]
    pub fn contains(&self, pos: BlockPos, world: &str) -> bool {
        self.contains_point(pos.x, pos.z, pos.y, world)
    }

    /// Twice the lateral area of the polygon.
    #[must_use]
    pub fn area2(&self) -> u128 {
        self.polygon.area2()
    }
}
