//! State shared between the worker task and every handle clone.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use sheet_core::CharacterId;

tokio::task_local! {
    /// Set for the whole lifetime of a validation worker task, so
    /// `wait_until_idle` can recognize a call made from the engine's own
    /// worker and return instead of deadlocking the tick loop.
    pub(crate) static WORKER_CHARACTER: CharacterId;
}

/// Whether the currently running task is the validation worker for the
/// given character.
pub(crate) fn is_worker_for(character: CharacterId) -> bool {
    WORKER_CHARACTER
        .try_with(|id| *id == character)
        .unwrap_or(false)
}

/// Lock-free engine state. Dirty signals are fire-and-forget stores from any
/// thread; the worker reads and clears them on its own schedule.
#[derive(Debug, Default)]
pub(crate) struct EngineShared {
    /// Set by `mark_for_update`, cleared by the worker tick.
    need_update: AtomicBool,
    /// True while the worker is inside a pass.
    processing: AtomicBool,
    /// Bumped on every dirty signal. A pass is valid only if this value is
    /// unchanged from the pass's start through its publish.
    generation: AtomicU64,
}

impl EngineShared {
    /// Records an edit: bump the generation first so an in-flight pass
    /// observing the flag is guaranteed to also see a new generation.
    pub(crate) fn mark_dirty(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.need_update.store(true, Ordering::SeqCst);
    }

    pub(crate) fn take_need_update(&self) -> bool {
        self.need_update.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn set_need_update(&self) {
        self.need_update.store(true, Ordering::SeqCst);
    }

    pub(crate) fn set_processing(&self, value: bool) {
        self.processing.store(value, Ordering::SeqCst);
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub(crate) fn is_idle(&self) -> bool {
        !self.processing.load(Ordering::SeqCst) && !self.need_update.load(Ordering::SeqCst)
    }
}
