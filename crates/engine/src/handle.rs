//! Client-facing handle to a running engine.
//!
//! Edit paths, views, and the registry all hold clones of [`EngineHandle`].
//! The handle is the only supported way to touch the shared character model:
//! `edit` takes the write lock, applies the mutation, and fires the dirty
//! signal; `read` is what the rendering layer uses to pull row verdicts.

use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use sheet_core::{Character, CharacterId};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::shared::EngineShared;

/// Cloneable façade over one character's validation engine.
#[derive(Clone)]
pub struct EngineHandle {
    character_id: CharacterId,
    character: Arc<RwLock<Character>>,
    shared: Arc<EngineShared>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
    config: EngineConfig,
}

impl EngineHandle {
    pub(crate) fn new(
        character_id: CharacterId,
        character: Arc<RwLock<Character>>,
        shared: Arc<EngineShared>,
        shutdown_tx: Arc<watch::Sender<bool>>,
        worker: Arc<Mutex<Option<JoinHandle<()>>>>,
        config: EngineConfig,
    ) -> Self {
        Self {
            character_id,
            character,
            shared,
            shutdown_tx,
            worker,
            config,
        }
    }

    pub fn character_id(&self) -> CharacterId {
        self.character_id
    }

    /// Fire-and-forget dirty signal. Callable from any thread; idempotent.
    ///
    /// Every mutation site that changes an attribute value, a row list, or a
    /// row field consumed by features or prerequisites must call this (or go
    /// through [`EngineHandle::edit`], which does).
    pub fn mark_for_update(&self) {
        self.shared.mark_dirty();
    }

    /// Applies a mutation to the character under the write lock and marks
    /// the engine dirty.
    pub fn edit<R>(&self, f: impl FnOnce(&mut Character) -> R) -> Result<R> {
        let result = {
            let mut guard = self
                .character
                .write()
                .map_err(|_| EngineError::LockPoisoned)?;
            f(&mut guard)
        };
        self.mark_for_update();
        Ok(result)
    }

    /// Reads the character, including the engine-published verdicts and
    /// feature map.
    pub fn read<R>(&self, f: impl FnOnce(&Character) -> R) -> Result<R> {
        let guard = self
            .character
            .read()
            .map_err(|_| EngineError::LockPoisoned)?;
        Ok(f(&guard))
    }

    /// Whether the engine has no pending work and no pass in flight.
    pub fn is_idle(&self) -> bool {
        self.shared.is_idle()
    }

    /// Blocks the calling task until the engine is idle, i.e. the current
    /// edit generation has been fully validated and published.
    ///
    /// Returns immediately when called from the engine's own worker task;
    /// waiting there would deadlock the tick loop.
    pub async fn wait_until_idle(&self) {
        if crate::shared::is_worker_for(self.character_id) {
            return;
        }
        while !self.shared.is_idle() {
            sleep(self.config.wait_poll).await;
        }
    }

    /// Signals the worker to stop and waits for it to terminate. The worker
    /// deregisters itself on the way out. Safe to call more than once.
    pub async fn shutdown(&self) -> Result<()> {
        let _ = self.shutdown_tx.send(true);
        let worker = {
            let mut slot = self.worker.lock().map_err(|_| EngineError::LockPoisoned)?;
            slot.take()
        };
        if let Some(worker) = worker {
            worker.await.map_err(EngineError::WorkerJoin)?;
        }
        Ok(())
    }
}
