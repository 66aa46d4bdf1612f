//! Movement between zones.

use pz_storage::ZoneStore;
use pz_zone::BlockPos;

use crate::registry::ZoneRegistry;

/// Result of moving from one zone into another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneTransition {
    /// Zone that was left.
    pub left: String,
    /// Zone that was entered.
    pub entered: String,
    /// Farewell of the zone that was left.
    pub farewell: Option<String>,
    /// Greeting of the zone that was entered.
    pub greeting: Option<String>,
}

impl<S: ZoneStore> ZoneRegistry<S> {
    /// Compare the zones containing `from` and `to` in `world`.
    ///
    /// Returns `None` when both positions resolve to the same zone.
    #[must_use]
    pub fn transition(&self, from: BlockPos, to: BlockPos, world: &str) -> Option<ZoneTransition> {
        let tree = self.tree.read();
        let left = tree.resolve(from, world);
        let entered = tree.resolve(to, world);

        if left.key() == entered.key() {
            return None;
        }

        Some(ZoneTransition {
            left: left.name().to_owned(),
            entered: entered.name().to_owned(),
            farewell: left.farewell().map(str::to_owned),
            greeting: entered.greeting().map(str::to_owned),
        })
    }
}
