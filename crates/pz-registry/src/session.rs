//! Per-editor vertex selections.
//!
//! An editor picks a zone, toggles vertices on and off, and commits the
//! selection as the zone's new polygon. Nothing reaches the zone until
//! [`EditSessions::save`].

use parking_lot::Mutex;
use pz_storage::ZoneStore;
use pz_zone::{Polygon, Vertex, Zone};
use rustc_hash::FxHashMap;

use crate::error::{RegistryError, RegistryResult};
use crate::registry::ZoneRegistry;

/// A pending selection for one zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    pub zone: String,
    pub points: Vec<Vertex>,
}

/// Active edit sessions, keyed by editor id.
#[derive(Debug, Default)]
pub struct EditSessions {
    sessions: Mutex<FxHashMap<String, EditSession>>,
}

impl EditSessions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start editing `zone`, seeded with its current vertices.
    pub fn begin<S: ZoneStore>(
        &self,
        registry: &ZoneRegistry<S>,
        editor: &str,
        zone: &str,
    ) -> RegistryResult<EditSession> {
        let mut sessions = self.sessions.lock();
        if let Some(existing) = sessions.get(editor) {
            tracing::debug!("{editor} is already editing {}", existing.zone);
            return Err(RegistryError::SessionActive(editor.to_owned()));
        }

        let zone = registry
            .lookup(zone)
            .ok_or_else(|| RegistryError::UnknownZone(zone.to_owned()))?;
        if zone.is_root() {
            return Err(RegistryError::RootImmutable(zone.name().to_owned()));
        }

        let session = EditSession {
            zone: zone.name().to_owned(),
            points: zone.polygon().vertices().to_vec(),
        };
        sessions.insert(editor.to_owned(), session.clone());
        tracing::debug!("{editor} started editing {}", zone.name());
        Ok(session)
    }

    /// Add `(x, z)` to the selection, or remove it if already selected.
    /// Returns whether the point is now selected.
    pub fn toggle_point(&self, editor: &str, x: i32, z: i32) -> RegistryResult<bool> {
        let mut sessions = self.sessions.lock();
        let session = sessions
            .get_mut(editor)
            .ok_or_else(|| RegistryError::NoSession(editor.to_owned()))?;

        let vertex = Vertex::new(x, z);
        if let Some(index) = session.points.iter().position(|&v| v == vertex) {
            session.points.remove(index);
            Ok(false)
        } else {
            session.points.push(vertex);
            Ok(true)
        }
    }

    /// Drop every selected point, keeping the session open.
    pub fn reset(&self, editor: &str) -> RegistryResult<()> {
        let mut sessions = self.sessions.lock();
        let session = sessions
            .get_mut(editor)
            .ok_or_else(|| RegistryError::NoSession(editor.to_owned()))?;
        session.points.clear();
        Ok(())
    }

    /// Commit the selection as the zone's polygon and end the session.
    ///
    /// The session ends even if the commit fails.
    pub fn save<S: ZoneStore>(
        &self,
        registry: &ZoneRegistry<S>,
        editor: &str,
    ) -> RegistryResult<Zone> {
        let session = self
            .sessions
            .lock()
            .remove(editor)
            .ok_or_else(|| RegistryError::NoSession(editor.to_owned()))?;

        let polygon: Polygon = session.points.into_iter().collect();
        let zone = registry.set_polygon(&session.zone, polygon)?;
        tracing::info!(
            "{editor} saved {} vertices on {}",
            zone.polygon().len(),
            zone.name()
        );
        Ok(zone)
    }

    /// End the session without touching the zone.
    pub fn cancel(&self, editor: &str) -> RegistryResult<EditSession> {
        self.sessions
            .lock()
            .remove(editor)
            .ok_or_else(|| RegistryError::NoSession(editor.to_owned()))
    }

    /// Snapshot of the editor's session, if any.
    #[must_use]
    pub fn active(&self, editor: &str) -> Option<EditSession> {
        self.sessions.lock().get(editor).cloned()
    }

    #[must_use]
    pub fn is_editing(&self, editor: &str) -> bool {
        self.sessions.lock().contains_key(editor)
    }
}
