//! Engine spawn orchestration.
//!
//! Wires the shared flags, the shutdown channel, and the worker task
//! together, and registers the resulting handle. The engine's lifetime is
//! bound to the character's interactive view: spawn when the view is first
//! shown, shut down when it is disposed.

use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::watch;

use sheet_core::Character;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::handle::EngineHandle;
use crate::registry::EngineRegistry;
use crate::shared::EngineShared;
use crate::worker::ValidationWorker;

pub struct Engine;

impl Engine {
    /// Spawns a validation engine for the character and registers it.
    ///
    /// If an engine is already running for this character, the existing
    /// handle is returned and no new worker is spawned. The engine starts
    /// dirty, so the first pass begins immediately; callers that must not
    /// paint unvalidated rows should `wait_until_idle` before first use.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        registry: &EngineRegistry,
        character: Arc<RwLock<Character>>,
        repaint: impl Fn() + Send + Sync + 'static,
        config: EngineConfig,
    ) -> Result<EngineHandle> {
        let character_id = {
            let guard = character.read().map_err(|_| EngineError::LockPoisoned)?;
            guard.id
        };

        let shared = Arc::new(EngineShared::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker_slot = Arc::new(Mutex::new(None));

        let handle = EngineHandle::new(
            character_id,
            Arc::clone(&character),
            Arc::clone(&shared),
            Arc::new(shutdown_tx),
            Arc::clone(&worker_slot),
            config.clone(),
        );

        let (handle, registered) = registry.register_or_existing(character_id, handle);
        if registered {
            let worker = ValidationWorker::new(
                character_id,
                character,
                Arc::clone(&shared),
                registry.clone(),
                Arc::new(repaint),
                shutdown_rx,
                config,
            );
            shared.mark_dirty();
            let join = tokio::spawn(crate::shared::WORKER_CHARACTER.scope(character_id, worker.run()));
            if let Ok(mut slot) = worker_slot.lock() {
                *slot = Some(join);
            }
        }
        Ok(handle)
    }
}
