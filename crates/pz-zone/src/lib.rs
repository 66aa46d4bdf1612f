//! PolyZones zone model.
//!
//! Zones are vertical prisms over a 2D polygon, arranged in a tree rooted at
//! the "everywhere" zone. Each zone carries a table of policy [`Flag`]s whose
//! [`State`] is `On`, `Off`, or `Inherit` from the parent.
//!
//! ```
//! use pz_zone::{EVERYWHERE, Flag, FlagTable, State, Zone};
//!
//! let root = Zone::root(EVERYWHERE, EVERYWHERE, FlagTable::with_overrides(State::Off, &[])).unwrap();
//! let mut spawn = Zone::new("spawn", "world", root.name()).unwrap();
//! spawn.add_point(0, 0);
//! spawn.add_point(32, 0);
//! spawn.add_point(32, 32);
//! spawn.add_point(0, 32);
//! spawn.set_flag(Flag::Sanctuary, State::On).unwrap();
//!
//! assert!(spawn.contains_point(16, 16, 64, "world"));
//! assert!(!spawn.contains_point(16, 16, 64, "nether"));
//! ```

mod error;
mod flag;
mod geometry;
mod zone;

pub use error::{ZoneError, ZoneResult};
pub use flag::{Flag, FlagTable, ParseTokenError, State};
pub use geometry::{BlockPos, DEFAULT_CEILING, DEFAULT_FLOOR, Polygon, Vertex, VerticalBand};
pub use zone::{EVERYWHERE, MAX_NAME_LEN, Zone, ZoneLookup, validate_name, zone_key};
