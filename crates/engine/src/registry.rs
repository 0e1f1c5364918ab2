//! Registry mapping character identities to their active engine.
//!
//! The registry is an explicit value owned by whatever component manages
//! open documents; there is no process-global table. At most one engine
//! runs per character: opening a second view onto the same character reuses
//! the existing engine instead of spawning a duplicate worker.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use sheet_core::CharacterId;

use crate::handle::EngineHandle;

/// Cheaply cloneable table of running engines, keyed by character identity.
#[derive(Clone, Default)]
pub struct EngineRegistry {
    inner: Arc<Mutex<HashMap<CharacterId, EngineHandle>>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The engine for a character, if one is running.
    pub fn get(&self, character: CharacterId) -> Option<EngineHandle> {
        match self.inner.lock() {
            Ok(map) => map.get(&character).cloned(),
            Err(poisoned) => poisoned.into_inner().get(&character).cloned(),
        }
    }

    /// Registers a handle unless one already exists for the character, in
    /// which case the existing handle is returned and the new one dropped.
    pub(crate) fn register_or_existing(
        &self,
        character: CharacterId,
        handle: EngineHandle,
    ) -> (EngineHandle, bool) {
        let mut map = match self.inner.lock() {
            Ok(map) => map,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(existing) = map.get(&character) {
            debug!(character = character.0, "reusing existing engine");
            (existing.clone(), false)
        } else {
            map.insert(character, handle.clone());
            (handle, true)
        }
    }

    /// Removes a character's engine entry. Called by the worker on shutdown.
    pub(crate) fn deregister(&self, character: CharacterId) {
        let mut map = match self.inner.lock() {
            Ok(map) => map,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.remove(&character);
        debug!(character = character.0, "engine deregistered");
    }

    /// Waits until the character's engine is idle. Returns `None` right away
    /// when no engine is registered; the reentrancy guard in
    /// [`EngineHandle::wait_until_idle`] keeps the engine's own worker from
    /// deadlocking here.
    pub async fn wait_until_idle(&self, character: CharacterId) -> Option<EngineHandle> {
        let handle = self.get(character)?;
        handle.wait_until_idle().await;
        Some(handle)
    }
}
