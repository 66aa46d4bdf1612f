//! Registry configuration.

use std::path::PathBuf;
use std::str::FromStr;

use pz_zone::{DEFAULT_CEILING, DEFAULT_FLOOR, Flag, FlagTable, State, VerticalBand};

/// Data directory used when `POLYZONES_DIR` is unset.
pub const DEFAULT_DATA_DIR: &str = "polyzones";

/// Flags of the bootstrap root zone.
///
/// Healing, PvP and sanctuary are off, mobs are on. The remaining world
/// hazards (fire, lightning, creepers, TNT) keep vanilla behavior, which is on.
#[must_use]
pub fn default_root_flags() -> FlagTable {
    FlagTable::with_overrides(
        State::On,
        &[
            (Flag::Healing, State::Off),
            (Flag::Mobs, State::On),
            (Flag::Pvp, State::Off),
            (Flag::Sanctuary, State::Off),
        ],
    )
}

/// Configuration for a [`ZoneRegistry`](crate::ZoneRegistry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Directory holding the manifest and zone records.
    pub data_dir: PathBuf,
    /// Vertical band given to newly created zones.
    pub default_band: VerticalBand,
    /// Flags of the root zone when bootstrapping an empty store.
    pub root_flags: FlagTable,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            default_band: VerticalBand::default(),
            root_flags: default_root_flags(),
        }
    }
}

impl RegistryConfig {
    /// Read configuration from the environment.
    ///
    /// - `POLYZONES_DIR`: data directory (default `polyzones`)
    /// - `POLYZONES_DEFAULT_FLOOR`: floor of new zones (default 0)
    /// - `POLYZONES_DEFAULT_CEILING`: ceiling of new zones (default 128)
    #[must_use]
    pub fn from_env() -> Self {
        let data_dir = std::env::var("POLYZONES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR));

        let floor = env_or("POLYZONES_DEFAULT_FLOOR", DEFAULT_FLOOR);
        let ceiling = env_or("POLYZONES_DEFAULT_CEILING", DEFAULT_CEILING);

        let default_band = VerticalBand::new(floor, ceiling).unwrap_or_else(|e| {
            tracing::warn!("Ignoring configured default band: {e}");
            VerticalBand::default()
        });

        Self {
            data_dir,
            default_band,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    #[must_use]
    pub fn with_default_band(mut self, band: VerticalBand) -> Self {
        self.default_band = band;
        self
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
