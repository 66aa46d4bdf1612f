//! Zone record and manifest schema.
//!
//! Both documents are JSON objects carrying a `version` field. Decoding reads
//! the version first, so a document written by a newer schema is reported as
//! [`StorageError::UnsupportedVersion`] instead of a confusing parse error.
//!
//! Records store each zone's *local* flag states (including `INHERIT`), so
//! saving and loading reproduces the zone exactly.

use std::collections::BTreeMap;

use pz_zone::{Flag, Polygon, State, Vertex, VerticalBand, Zone, zone_key};
use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

/// Current schema version for records and the manifest.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Deserialize)]
struct VersionHeader {
    version: u32,
}

fn check_version(key: &str, bytes: &[u8]) -> StorageResult<()> {
    let header: VersionHeader =
        serde_json::from_slice(bytes).map_err(|e| StorageError::malformed(key, e))?;
    if header.version != SCHEMA_VERSION {
        return Err(StorageError::UnsupportedVersion {
            key: key.to_owned(),
            found: header.version,
            expected: SCHEMA_VERSION,
        });
    }
    Ok(())
}

/// One polygon vertex. `y` holds the lateral `z` coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointRecord {
    pub x: i32,
    pub y: i32,
}

/// Durable form of a single zone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneRecord {
    pub version: u32,
    pub name: String,
    /// `None` for the root.
    pub parent: Option<String>,
    pub world: String,
    #[serde(default)]
    pub greeting: Option<String>,
    #[serde(default)]
    pub farewell: Option<String>,
    pub ceiling: i32,
    pub floor: i32,
    pub point_count: usize,
    pub points: Vec<PointRecord>,
    pub flags: BTreeMap<Flag, State>,
}

impl ZoneRecord {
    /// Capture the complete state of `zone`.
    #[must_use]
    pub fn from_zone(zone: &Zone) -> Self {
        let points: Vec<_> = zone
            .polygon()
            .vertices()
            .iter()
            .map(|v| PointRecord { x: v.x, y: v.z })
            .collect();

        Self {
            version: SCHEMA_VERSION,
            name: zone.name().to_owned(),
            parent: zone.parent().map(str::to_owned),
            world: zone.world().to_owned(),
            greeting: zone.greeting().map(str::to_owned),
            farewell: zone.farewell().map(str::to_owned),
            ceiling: zone.ceiling(),
            floor: zone.floor(),
            point_count: points.len(),
            points,
            flags: zone.flags().iter().collect(),
        }
    }

    /// Record key (lowercased zone name).
    #[must_use]
    pub fn key(&self) -> String {
        zone_key(&self.name)
    }

    /// Rebuild the zone, validating every invariant a live zone holds.
    pub fn into_zone(self) -> StorageResult<Zone> {
        let key = self.key();

        if self.point_count != self.points.len() {
            return Err(StorageError::malformed(
                &key,
                format!(
                    "point_count is {} but {} points are stored",
                    self.point_count,
                    self.points.len()
                ),
            ));
        }

        let band =
            VerticalBand::new(self.floor, self.ceiling).map_err(|e| StorageError::malformed(&key, e))?;

        if let Some(missing) = Flag::ALL.into_iter().find(|f| !self.flags.contains_key(f)) {
            return Err(StorageError::malformed(&key, format!("missing flag {missing}")));
        }

        let mut zone = match self.parent {
            None => {
                let table = pz_zone::FlagTable::with_overrides(State::Off, &flag_pairs(&self.flags));
                Zone::root(self.name, self.world, table)
            }
            Some(parent) => Zone::new(self.name, self.world, parent),
        }
        .map_err(|e| StorageError::malformed(&key, e))?;

        for (&flag, &state) in &self.flags {
            zone.set_flag(flag, state)
                .map_err(|e| StorageError::malformed(&key, e))?;
        }

        zone.set_band(band);
        zone.set_polygon(
            self.points
                .iter()
                .map(|p| Vertex::new(p.x, p.y))
                .collect::<Polygon>(),
        );
        zone.set_greeting(self.greeting);
        zone.set_farewell(self.farewell);

        Ok(zone)
    }

    /// Serialize to pretty JSON.
    pub fn encode(&self) -> StorageResult<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|source| StorageError::Json {
            key: self.key(),
            source,
        })
    }

    /// Parse a record stored under `key`.
    pub fn decode(key: &str, bytes: &[u8]) -> StorageResult<Self> {
        check_version(key, bytes)?;
        let record: Self =
            serde_json::from_slice(bytes).map_err(|e| StorageError::malformed(key, e))?;

        if record.key() != key {
            return Err(StorageError::malformed(
                key,
                format!("record names zone {:?}", record.name),
            ));
        }
        Ok(record)
    }
}

fn flag_pairs(flags: &BTreeMap<Flag, State>) -> Vec<(Flag, State)> {
    flags.iter().map(|(&f, &s)| (f, s)).collect()
}

/// Ordered list of every persisted zone name.
///
/// Written parents-first, though loading does not rely on the order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    pub zones: Vec<String>,
}

impl Manifest {
    /// Key used in errors about the manifest.
    pub const KEY: &'static str = "manifest";

    #[must_use]
    pub fn new(zones: Vec<String>) -> Self {
        Self {
            version: SCHEMA_VERSION,
            zones,
        }
    }

    pub fn encode(&self) -> StorageResult<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|source| StorageError::Json {
            key: Self::KEY.to_owned(),
            source,
        })
    }

    pub fn decode(bytes: &[u8]) -> StorageResult<Self> {
        check_version(Self::KEY, bytes)?;
        serde_json::from_slice(bytes).map_err(|e| StorageError::malformed(Self::KEY, e))
    }
}

#[cfg(test)]
mod tests {
    use pz_zone::{EVERYWHERE, FlagTable};

    use super::*;

    fn sample_zone() -> Zone {
        let mut zone = Zone::new("Market", "world", EVERYWHERE).unwrap();
        zone.add_point(0, 0);
        zone.add_point(20, 0);
        zone.add_point(10, 15);
        zone.set_floor(60).unwrap();
        zone.set_ceiling(90).unwrap();
        zone.set_flag(Flag::Pvp, State::Off).unwrap();
        zone.set_flag(Flag::Mobs, State::On).unwrap();
        zone.set_greeting(Some("Welcome to the market".into()));
        zone
    }

    #[test]
    fn test_zone_survives_encode_decode() {
        let zone = sample_zone();
        let bytes = ZoneRecord::from_zone(&zone).encode().unwrap();

        let decoded = ZoneRecord::decode("market", &bytes).unwrap().into_zone().unwrap();
        assert_eq!(decoded, zone);
        assert_eq!(decoded.flag(Flag::Fire), State::Inherit);
    }

    #[test]
    fn test_root_record() {
        let root = Zone::root(EVERYWHERE, EVERYWHERE, FlagTable::with_overrides(State::On, &[])).unwrap();
        let record = ZoneRecord::from_zone(&root);
        assert_eq!(record.parent, None);
        assert_eq!(record.point_count, 0);

        assert_eq!(record.into_zone().unwrap(), root);
    }

    #[test]
    fn test_record_schema_fields() {
        let record = ZoneRecord::from_zone(&sample_zone());
        let value: serde_json::Value = serde_json::from_slice(&record.encode().unwrap()).unwrap();

        assert_eq!(value["version"], 1);
        assert_eq!(value["parent"], EVERYWHERE);
        assert_eq!(value["point_count"], 3);
        assert_eq!(value["points"][2]["y"], 15);
        assert_eq!(value["flags"]["PVP"], "OFF");
        assert_eq!(value["flags"]["TNT"], "INHERIT");
        assert_eq!(value["farewell"], serde_json::Value::Null);
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let bytes = br#"{"version":1,"name":"a","parent":"everywhere","world":"w"}"#;
        assert!(matches!(
            ZoneRecord::decode("a", bytes),
            Err(StorageError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn test_missing_flag_is_malformed() {
        let mut record = ZoneRecord::from_zone(&sample_zone());
        record.flags.remove(&Flag::Creeper);

        let err = record.into_zone().unwrap_err();
        assert!(matches!(err, StorageError::MalformedRecord { reason, .. } if reason.contains("CREEPER")));
    }

    #[test]
    fn test_point_count_mismatch_is_malformed() {
        let mut record = ZoneRecord::from_zone(&sample_zone());
        record.point_count = 7;
        assert!(matches!(
            record.into_zone(),
            Err(StorageError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn test_inverted_band_is_malformed() {
        let mut record = ZoneRecord::from_zone(&sample_zone());
        record.floor = 100;
        record.ceiling = 10;
        assert!(record.into_zone().is_err());
    }

    #[test]
    fn test_root_with_inherit_is_malformed() {
        let mut record = ZoneRecord::from_zone(&sample_zone());
        record.parent = None;
        assert!(matches!(
            record.into_zone(),
            Err(StorageError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn test_key_mismatch_is_malformed() {
        let bytes = ZoneRecord::from_zone(&sample_zone()).encode().unwrap();
        assert!(ZoneRecord::decode("bazaar", &bytes).is_err());
    }

    #[test]
    fn test_future_version_is_detected() {
        let bytes = br#"{"version":2,"zones":["everywhere"]}"#;
        assert!(matches!(
            Manifest::decode(bytes),
            Err(StorageError::UnsupportedVersion { found: 2, expected: 1, .. })
        ));
    }

    #[test]
    fn test_legacy_flag_token() {
        let mut value: serde_json::Value =
            serde_json::from_slice(&ZoneRecord::from_zone(&sample_zone()).encode().unwrap()).unwrap();
        let flags = value["flags"].as_object_mut().unwrap();
        let state = flags.remove("LIGHTNING").unwrap();
        flags.insert("LIGHTENING".into(), state);

        let record = ZoneRecord::decode("market", &serde_json::to_vec(&value).unwrap()).unwrap();
        assert!(record.flags.contains_key(&Flag::Lightning));
    }
}
