use serde::Serialize;

use crate::report::ErrorReporter;
use crate::selection::SelectionStore;
use crate::types::{ErrorInfo, Palette, RawCandidate};
use crate::validate::validate_batch;

/// Lifecycle phase of the single in-flight generation.
///
/// `Idle` is both the initial phase and the phase every terminal transition
/// settles back into: `Stopped` and `Failed` are transient, observable for
/// exactly one published snapshot before `settle` returns the machine to
/// `Idle` (carrying `last_error` in the failed case).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Generating,
    Stopped,
    Failed,
}

/// Immutable view of the machine published to observers after every
/// transition, so presentation layers assert on emitted values instead of
/// peeking at live fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateSnapshot {
    pub phase: Phase,
    pub palettes: Vec<Palette>,
    pub selected_index: Option<usize>,
    pub last_error: Option<ErrorInfo>,
}

/// Rejected `begin` while a generation is already in flight. The caller's
/// state is untouched: nothing is queued and nothing is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlreadyGenerating;

impl std::fmt::Display for AlreadyGenerating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "a generation is already in flight")
    }
}

impl std::error::Error for AlreadyGenerating {}

/// Result of feeding one snapshot batch through the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOutcome {
    /// Batch validated and applied; still generating.
    Applied { kept: usize, dropped: usize },
    /// Batch applied, then the pending stop request was honored.
    Stopped { kept: usize, dropped: usize },
    /// Machine is not generating; the batch was discarded untouched.
    Ignored,
}

/// The generation state machine. All mutation happens through the intent
/// and stream-event methods below, which the controller invokes from a
/// single serialized task.
#[derive(Debug, Clone)]
pub struct GenerationMachine {
    phase: Phase,
    palettes: Vec<Palette>,
    selection: SelectionStore,
    errors: ErrorReporter,
    stop_requested: bool,
}

impl GenerationMachine {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            palettes: Vec::new(),
            selection: SelectionStore::new(),
            errors: ErrorReporter::new(),
            stop_requested: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn palettes(&self) -> &[Palette] {
        &self.palettes
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selection.selected()
    }

    pub fn last_error(&self) -> Option<&ErrorInfo> {
        self.errors.last()
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            phase: self.phase,
            palettes: self.palettes.clone(),
            selected_index: self.selection.selected(),
            last_error: self.errors.last().cloned(),
        }
    }

    /// Enters `Generating`. Clears the last error, the selection, the
    /// palette list, and any stale stop request from a prior run.
    pub fn begin(&mut self) -> Result<(), AlreadyGenerating> {
        if self.phase == Phase::Generating {
            return Err(AlreadyGenerating);
        }
        self.errors.clear();
        self.selection.clear();
        self.palettes.clear();
        self.stop_requested = false;
        self.phase = Phase::Generating;
        Ok(())
    }

    /// Arms the cooperative stop flag. No-op unless generating; the flag is
    /// consulted only after the in-flight batch has been fully applied.
    /// Returns whether the request armed the flag.
    pub fn request_stop(&mut self) -> bool {
        if self.phase != Phase::Generating {
            return false;
        }
        self.stop_requested = true;
        true
    }

    /// Validates a batch and replaces the palette list wholesale (each
    /// snapshot carries the cumulative candidate set, so no merging), then
    /// consults the stop flag. Batches arriving outside `Generating` are
    /// ignored, which covers an adapter erroneously delivering past a stop.
    pub fn apply_snapshot(&mut self, batch: &[RawCandidate]) -> SnapshotOutcome {
        if self.phase != Phase::Generating {
            return SnapshotOutcome::Ignored;
        }
        let kept = validate_batch(batch);
        let dropped = batch.len() - kept.len();
        let kept_count = kept.len();
        self.palettes = kept;
        if self.stop_requested {
            self.phase = Phase::Stopped;
            return SnapshotOutcome::Stopped {
                kept: kept_count,
                dropped,
            };
        }
        SnapshotOutcome::Applied {
            kept: kept_count,
            dropped,
        }
    }

    /// Normal end of stream.
    pub fn complete(&mut self) {
        if self.phase == Phase::Generating {
            self.phase = Phase::Idle;
        }
    }

    /// Stream failure: records the error and enters the transient `Failed`
    /// phase. Palettes from the last applied snapshot are retained.
    pub fn fail(&mut self, info: ErrorInfo) {
        if self.phase != Phase::Generating {
            return;
        }
        self.errors.record(info);
        self.phase = Phase::Failed;
    }

    /// Settles a transient terminal phase back to `Idle` so the machine is
    /// submittable again. `last_error` survives settling.
    pub fn settle(&mut self) {
        if matches!(self.phase, Phase::Stopped | Phase::Failed) {
            self.phase = Phase::Idle;
        }
    }

    /// Selection intent; silently ignores out-of-range indices.
    pub fn select(&mut self, index: usize) -> bool {
        self.selection.select(index, self.palettes.len())
    }

    pub fn acknowledge_error(&mut self) {
        self.errors.acknowledge();
    }
}

impl Default for GenerationMachine {
    fn default() -> Self {
        Self::new()
    }
}
