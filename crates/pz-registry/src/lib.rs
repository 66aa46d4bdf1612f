//! Zone registry for PolyZones.
//!
//! Owns the zone tree, answers "which zone is this block in" and "is this
//! flag on here", and keeps a [`ZoneStore`](pz_storage::ZoneStore) in sync
//! with every change.
//!
//! ```
//! use pz_registry::{RegistryConfig, ZoneRegistry};
//! use pz_storage::MemoryZoneStore;
//! use pz_zone::{BlockPos, EVERYWHERE, Flag, State};
//!
//! let registry = ZoneRegistry::open(MemoryZoneStore::new(), RegistryConfig::default()).unwrap();
//! registry.create("arena", "world", EVERYWHERE).unwrap();
//! for (x, z) in [(0, 0), (16, 0), (16, 16), (0, 16)] {
//!     registry.add_point("arena", x, z).unwrap();
//! }
//! registry.set_flag("arena", Flag::Pvp, State::On).unwrap();
//!
//! let pos = BlockPos::new(8, 64, 8);
//! assert_eq!(registry.resolve_containing(pos, "world").name(), "arena");
//! assert_eq!(registry.flag_at(pos, "world", Flag::Pvp), State::On);
//! assert_eq!(registry.flag_state("arena", Flag::Healing).unwrap(), State::Off);
//! ```

mod config;
mod error;
mod load;
mod queue;
mod registry;
mod session;
mod transition;
mod tree;

pub use config::{DEFAULT_DATA_DIR, RegistryConfig, default_root_flags};
pub use error::{RegistryError, RegistryResult};
pub use registry::ZoneRegistry;
pub use session::{EditSession, EditSessions};
pub use transition::ZoneTransition;
