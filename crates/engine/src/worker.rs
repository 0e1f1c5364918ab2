//! Background validation worker.
//!
//! One worker task runs per open character document. Each tick it atomically
//! claims the pending dirty signal, runs a full pass (feature map rebuild +
//! prerequisite evaluation over every row), and publishes the buffered
//! verdicts in a single short write-lock section. Staleness is checked after
//! every row; a stale pass is discarded wholesale and retried, so a
//! published result never mixes two edit generations.

use std::sync::{Arc, RwLock};

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use sheet_core::{
    apply_verdicts, collect_row, evaluate_row, Character, CharacterId, FeatureMap, Verdict,
};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::registry::EngineRegistry;
use crate::shared::EngineShared;

/// How a pass ended when it did not fail outright.
enum PassOutcome {
    /// Full pass published. `changed` reports whether any verdict moved.
    Completed { changed: bool },
    /// A fresh dirty signal (or shutdown) was observed mid-pass; nothing was
    /// published. The pending dirty flag drives the restart.
    Aborted,
}

pub(crate) struct ValidationWorker {
    character_id: CharacterId,
    character: Arc<RwLock<Character>>,
    shared: Arc<EngineShared>,
    registry: EngineRegistry,
    repaint: Arc<dyn Fn() + Send + Sync>,
    shutdown_rx: watch::Receiver<bool>,
    config: EngineConfig,
}

impl ValidationWorker {
    pub(crate) fn new(
        character_id: CharacterId,
        character: Arc<RwLock<Character>>,
        shared: Arc<EngineShared>,
        registry: EngineRegistry,
        repaint: Arc<dyn Fn() + Send + Sync>,
        shutdown_rx: watch::Receiver<bool>,
        config: EngineConfig,
    ) -> Self {
        Self {
            character_id,
            character,
            shared,
            registry,
            repaint,
            shutdown_rx,
            config,
        }
    }

    /// Main worker loop. Runs until the owning view signals shutdown, then
    /// deregisters and terminates without completing any in-flight pass.
    pub(crate) async fn run(mut self) {
        info!(character = self.character_id.0, "validation worker started");

        loop {
            if *self.shutdown_rx.borrow() {
                break;
            }

            // Claim processing before clearing the flag so wait_until_idle
            // never observes the gap between the two as idle.
            self.shared.set_processing(true);
            if !self.shared.take_need_update() {
                self.shared.set_processing(false);
                tokio::select! {
                    _ = self.shutdown_rx.changed() => {}
                    _ = sleep(self.config.idle_poll) => {}
                }
                continue;
            }

            let generation = self.shared.generation();
            match self.run_pass(generation) {
                Ok(PassOutcome::Completed { changed }) => {
                    self.shared.set_processing(false);
                    if changed {
                        (self.repaint)();
                    }
                }
                Ok(PassOutcome::Aborted) => {
                    // The dirty signal that caused the abort is still set
                    // (or shutdown is pending); the next tick restarts a
                    // full pass immediately.
                    debug!(
                        character = self.character_id.0,
                        generation, "pass aborted, restarting"
                    );
                }
                Err(EngineError::LockPoisoned) => {
                    // A poisoned lock never heals; retrying would spin on
                    // the same failure forever. The owning view has to be
                    // torn down, so stop and deregister.
                    error!(
                        character = self.character_id.0,
                        "character model lock poisoned, stopping worker"
                    );
                    break;
                }
                Err(error) => {
                    warn!(
                        character = self.character_id.0,
                        %error,
                        "validation pass failed, retrying"
                    );
                    self.shared.set_need_update();
                    tokio::select! {
                        _ = self.shutdown_rx.changed() => {}
                        _ = sleep(self.config.retry_backoff) => {}
                    }
                }
            }
        }

        self.shared.set_processing(false);
        self.registry.deregister(self.character_id);
        info!(character = self.character_id.0, "validation worker stopped");
    }

    /// Whether the pass begun at `generation` can no longer publish.
    fn stale(&self, generation: u64) -> bool {
        self.shared.generation() != generation || *self.shutdown_rx.borrow()
    }

    /// One full pass: snapshot, rebuild the feature map, evaluate every row,
    /// then commit verdicts and the map under one write lock. Staleness is
    /// re-checked after every row and once more inside the commit lock.
    fn run_pass(&self, generation: u64) -> Result<PassOutcome, EngineError> {
        let snapshot = {
            let guard = self
                .character
                .read()
                .map_err(|_| EngineError::LockPoisoned)?;
            guard.clone()
        };
        if self.stale(generation) {
            return Ok(PassOutcome::Aborted);
        }

        let mut map = FeatureMap::default();
        for row in snapshot.all_rows() {
            collect_row(&mut map, row);
            if self.stale(generation) {
                return Ok(PassOutcome::Aborted);
            }
        }

        let mut verdicts: Vec<Verdict> = Vec::new();
        for row in snapshot.all_rows() {
            verdicts.push(evaluate_row(&snapshot, &map, row));
            if self.stale(generation) {
                return Ok(PassOutcome::Aborted);
            }
        }

        let mut live = self
            .character
            .write()
            .map_err(|_| EngineError::LockPoisoned)?;
        if self.stale(generation) {
            return Ok(PassOutcome::Aborted);
        }
        let changed = apply_verdicts(&mut live, &verdicts);
        live.set_feature_map(map);
        Ok(PassOutcome::Completed { changed })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use sheet_core::{AttributeId, NumericCriteria, Prereq, PrereqList, Row};

    use super::*;
    use crate::config::EngineConfig;
    use crate::registry::EngineRegistry;

    fn broadsword_character() -> Character {
        let mut character = Character::new("Duelist");
        character.set_base_attribute(AttributeId::Dx, 10);
        character.skills =
            vec![
                Row::skill("Broadsword", 4, 12).with_prereqs(PrereqList::all_of(vec![
                    Prereq::Attribute {
                        has: true,
                        which: AttributeId::Dx,
                        combined_with: None,
                        qualifier: NumericCriteria::at_least(12.0),
                    },
                ])),
            ];
        character
    }

    fn worker_for(
        character: Arc<RwLock<Character>>,
        shared: Arc<EngineShared>,
    ) -> (ValidationWorker, watch::Sender<bool>) {
        let id = character.read().unwrap().id;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = ValidationWorker::new(
            id,
            character,
            shared,
            EngineRegistry::new(),
            Arc::new(|| {}),
            shutdown_rx,
            EngineConfig::default(),
        );
        (worker, shutdown_tx)
    }

    #[test]
    fn dirty_signal_during_a_pass_discards_all_buffered_verdicts() {
        let character = Arc::new(RwLock::new(broadsword_character()));
        let shared = Arc::new(EngineShared::default());
        shared.mark_dirty();
        let generation = shared.generation();
        let (worker, _shutdown_tx) = worker_for(Arc::clone(&character), Arc::clone(&shared));

        // Park a reader on the model so the pass can evaluate every row but
        // cannot enter its commit section until the dirty signal below has
        // landed.
        let (parked_tx, parked_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let model = Arc::clone(&character);
        let blocker = thread::spawn(move || {
            let guard = model.read().unwrap();
            parked_tx.send(()).unwrap();
            release_rx.recv().unwrap();
            drop(guard);
        });
        parked_rx.recv().unwrap();

        let pass = thread::spawn(move || worker.run_pass(generation));
        thread::sleep(Duration::from_millis(50));
        shared.mark_dirty();
        release_tx.send(()).unwrap();

        let outcome = pass.join().unwrap().unwrap();
        assert!(matches!(outcome, PassOutcome::Aborted));
        blocker.join().unwrap();

        // The tainted pass published nothing: the row still carries its
        // default verdict and no feature map reached the model.
        let guard = character.read().unwrap();
        assert!(guard.skills[0].is_satisfied());
        assert!(guard.skills[0].reason_text().is_empty());
        assert!(guard.feature_map().is_empty());
    }

    #[test]
    fn pass_with_an_unmoved_generation_publishes() {
        let character = Arc::new(RwLock::new(broadsword_character()));
        let shared = Arc::new(EngineShared::default());
        shared.mark_dirty();
        let generation = shared.generation();
        let (worker, _shutdown_tx) = worker_for(Arc::clone(&character), shared);

        let outcome = worker.run_pass(generation).unwrap();
        assert!(matches!(outcome, PassOutcome::Completed { changed: true }));

        let guard = character.read().unwrap();
        assert!(!guard.skills[0].is_satisfied());
        assert!(guard.skills[0].reason_text().contains("DX"));
    }
}
