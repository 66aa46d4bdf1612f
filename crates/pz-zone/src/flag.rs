//! Policy flags and their tri-state values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A boolean policy attached to every zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum Flag {
    Pvp = 0,
    Sanctuary = 1,
    Healing = 2,
    Mobs = 3,
    Fire = 4,
    #[serde(alias = "LIGHTENING")]
    Lightning = 5,
    Creeper = 6,
    Tnt = 7,
}

impl Flag {
    /// Number of flag kinds.
    pub const COUNT: usize = 8;

    /// Every flag kind, in table order.
    pub const ALL: [Flag; Self::COUNT] = [
        Flag::Pvp,
        Flag::Sanctuary,
        Flag::Healing,
        Flag::Mobs,
        Flag::Fire,
        Flag::Lightning,
        Flag::Creeper,
        Flag::Tnt,
    ];

    /// Upper-case token used in records and commands.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pvp => "PVP",
            Self::Sanctuary => "SANCTUARY",
            Self::Healing => "HEALING",
            Self::Mobs => "MOBS",
            Self::Fire => "FIRE",
            Self::Lightning => "LIGHTNING",
            Self::Creeper => "CREEPER",
            Self::Tnt => "TNT",
        }
    }

    #[inline]
    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized flag or state token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} {token:?}")]
pub struct ParseTokenError {
    kind: &'static str,
    token: String,
}

impl FromStr for Flag {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        if upper == "LIGHTENING" {
            return Ok(Self::Lightning);
        }
        Self::ALL
            .into_iter()
            .find(|flag| flag.as_str() == upper)
            .ok_or_else(|| ParseTokenError {
                kind: "flag",
                token: s.to_owned(),
            })
    }
}

/// Stored value of a flag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum State {
    On,
    Off,
    /// Defer to the parent's resolved state.
    #[default]
    Inherit,
}

impl State {
    /// Boolean value of a concrete state, `None` for `Inherit`.
    #[must_use]
    pub const fn as_bool(self) -> Option<bool> {
        match self {
            Self::On => Some(true),
            Self::Off => Some(false),
            Self::Inherit => None,
        }
    }

    #[must_use]
    pub const fn is_concrete(self) -> bool {
        !matches!(self, Self::Inherit)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
            Self::Inherit => "INHERIT",
        }
    }
}

impl From<bool> for State {
    fn from(value: bool) -> Self {
        if value { Self::On } else { Self::Off }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for State {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ON" | "TRUE" => Ok(Self::On),
            "OFF" | "FALSE" => Ok(Self::Off),
            "INHERIT" => Ok(Self::Inherit),
            _ => Err(ParseTokenError {
                kind: "state",
                token: s.to_owned(),
            }),
        }
    }
}

/// Total mapping from every [`Flag`] to a [`State`].
///
/// A fresh table is all `Inherit`, so a newly created zone inherits
/// everything from its parent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FlagTable {
    states: [State; Flag::COUNT],
}

impl FlagTable {
    /// Table with every flag set to `Inherit`.
    #[must_use]
    pub fn inheriting() -> Self {
        Self::default()
    }

    /// Table with every flag set to `fill`, then overridden by `overrides`.
    #[must_use]
    pub fn with_overrides(fill: State, overrides: &[(Flag, State)]) -> Self {
        let mut table = Self {
            states: [fill; Flag::COUNT],
        };
        for &(flag, state) in overrides {
            table.set(flag, state);
        }
        table
    }

    #[inline]
    #[must_use]
    pub const fn get(&self, flag: Flag) -> State {
        self.states[flag.index()]
    }

    #[inline]
    pub fn set(&mut self, flag: Flag, state: State) {
        self.states[flag.index()] = state;
    }

    /// Iterate `(flag, state)` pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (Flag, State)> + '_ {
        Flag::ALL.into_iter().map(|flag| (flag, self.get(flag)))
    }

    /// First flag stored as `Inherit`, if any.
    #[must_use]
    pub fn first_inherit(&self) -> Option<Flag> {
        self.iter()
            .find(|(_, state)| *state == State::Inherit)
            .map(|(flag, _)| flag)
    }
}
