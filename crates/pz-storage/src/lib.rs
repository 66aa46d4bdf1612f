//! Durable storage for PolyZones.
//!
//! Each zone is persisted as an independent, versioned JSON record keyed by
//! its lowercased name, alongside a manifest listing every zone name.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  ZoneRegistry (pz-registry)                                         │
//! │    - Mutates zones under its lock                                   │
//! │    - Emits a MutationBuffer per operation                           │
//! └─────────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  ZoneStore                                                          │
//! │    - FsZoneStore: zones.json + zones/<key>.json, write-rename       │
//! │    - MemoryZoneStore: same documents, in memory                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use pz_storage::{MemoryZoneStore, ZoneRecord, ZoneStore};
//! use pz_zone::{EVERYWHERE, Zone};
//!
//! let store = MemoryZoneStore::new();
//! let zone = Zone::new("spawn", "world", EVERYWHERE).unwrap();
//!
//! store.save_record(&ZoneRecord::from_zone(&zone)).unwrap();
//! let loaded = store.load_record("spawn").unwrap().into_zone().unwrap();
//! assert_eq!(loaded, zone);
//! ```

mod buffer;
mod error;
mod keys;
mod record;
mod store;

pub use buffer::{Mutation, MutationBuffer};
pub use error::{StorageError, StorageResult};
pub use keys::{MANIFEST_FILE, RECORD_DIR, manifest_path, record_key, record_path};
pub use record::{Manifest, PointRecord, SCHEMA_VERSION, ZoneRecord};
pub use store::{FsZoneStore, MemoryZoneStore, ZoneStore};
