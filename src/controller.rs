use serde_json::json;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use crate::events::{Event, EventKind, EventSink, MultiSink};
use crate::instructions::build_instructions;
use crate::machine::{GenerationMachine, SnapshotOutcome, StateSnapshot};
use crate::providers::http::ServiceError;
use crate::providers::PaletteSource;
use crate::types::{ErrorInfo, GenerationRequest};

/// Observer of published state snapshots. Presentation layers subscribe one
/// of these instead of inspecting live controller fields.
pub trait StateSink: Send {
    fn publish(&mut self, snapshot: &StateSnapshot) -> anyhow::Result<()>;
}

/// Forwards snapshots into an unbounded channel for a single consumer.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<StateSnapshot>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StateSnapshot>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl StateSink for ChannelSink {
    fn publish(&mut self, snapshot: &StateSnapshot) -> anyhow::Result<()> {
        // A departed consumer is not the controller's problem.
        let _ = self.tx.send(snapshot.clone());
        Ok(())
    }
}

/// Clonable handle for requesting a cooperative stop from outside the
/// generation task (a signal handler, a UI thread). The request is honored
/// only after the in-flight snapshot has been fully applied.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: watch::Sender<bool>,
}

impl StopHandle {
    pub fn request_stop(&self) {
        let _ = self.tx.send(true);
    }
}

/// `start` rejected without touching state: exactly one generation may be in
/// flight, and a second request is refused, not queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartError {
    AlreadyGenerating,
}

impl std::fmt::Display for StartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyGenerating => write!(f, "a generation is already in flight"),
        }
    }
}

impl std::error::Error for StartError {}

/// How a generation run ended. A failed stream is an outcome, not a caller
/// error: the machine settles back to `Idle` with `last_error` populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Stopped,
    Failed,
}

/// Owns the generation state machine and drives one session at a time.
/// Constructed once per running process and passed to collaborators; all
/// state mutation happens on this single task, serialized by the session's
/// sequential delivery contract.
pub struct GenerationController {
    machine: GenerationMachine,
    events: MultiSink,
    subscribers: Vec<Box<dyn StateSink>>,
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
}

impl GenerationController {
    pub fn new() -> Self {
        Self::with_events(MultiSink::new())
    }

    pub fn with_events(events: MultiSink) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            machine: GenerationMachine::new(),
            events,
            subscribers: Vec::new(),
            stop_tx,
            stop_rx,
        }
    }

    pub fn subscribe(&mut self, sink: Box<dyn StateSink>) {
        self.subscribers.push(sink);
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: self.stop_tx.clone(),
        }
    }

    pub fn state(&self) -> StateSnapshot {
        self.machine.snapshot()
    }

    /// Direct stop intent for same-task callers; no-op unless generating.
    pub fn request_stop(&mut self) {
        self.machine.request_stop();
    }

    /// Selection intent; silently ignores out-of-range indices.
    pub fn select(&mut self, index: usize) {
        if self.machine.select(index) {
            self.publish();
        }
    }

    pub fn acknowledge_error(&mut self) {
        self.machine.acknowledge_error();
        self.publish();
    }

    /// Runs one full generation: opens a session, applies cumulative
    /// snapshots as they arrive, honors stop requests cooperatively, and
    /// settles terminal phases back to `Idle` before returning.
    pub async fn start(
        &mut self,
        source: &dyn PaletteSource,
        request: &GenerationRequest,
    ) -> Result<RunOutcome, StartError> {
        self.machine
            .begin()
            .map_err(|_| StartError::AlreadyGenerating)?;
        let _ = self.stop_tx.send(false);
        let run_id = Uuid::new_v4().to_string();
        let mut seq = 0u32;
        self.emit(
            &run_id,
            seq,
            EventKind::GenerationStart,
            json!({"prompt": request.prompt(), "limit": request.limit()}),
        );
        self.publish();

        let instructions = build_instructions(request.limit());
        let mut stream = match source.open(&instructions, request.prompt()).await {
            Ok(s) => s,
            Err(e) => return Ok(self.finish_failed(&run_id, seq, e)),
        };

        loop {
            match stream.next_snapshot().await {
                Some(Ok(batch)) => {
                    seq += 1;
                    let stop_flagged = *self.stop_rx.borrow();
                    if stop_flagged {
                        self.machine.request_stop();
                        self.emit(&run_id, seq, EventKind::StopRequested, json!({}));
                    }
                    let outcome = self.machine.apply_snapshot(&batch);
                    match outcome {
                        SnapshotOutcome::Applied { kept, dropped } => {
                            self.emit(
                                &run_id,
                                seq,
                                EventKind::SnapshotApplied,
                                json!({"kept": kept, "dropped": dropped}),
                            );
                            self.publish();
                        }
                        SnapshotOutcome::Stopped { kept, dropped } => {
                            self.emit(
                                &run_id,
                                seq,
                                EventKind::SnapshotApplied,
                                json!({"kept": kept, "dropped": dropped}),
                            );
                            self.emit(&run_id, seq, EventKind::GenerationStopped, json!({}));
                            // Stopped is observable for one snapshot, then
                            // the machine settles back to Idle. Dropping the
                            // stream releases the session.
                            self.publish();
                            self.machine.settle();
                            self.publish();
                            return Ok(RunOutcome::Stopped);
                        }
                        SnapshotOutcome::Ignored => {}
                    }
                }
                Some(Err(e)) => return Ok(self.finish_failed(&run_id, seq, e)),
                None => {
                    self.machine.complete();
                    self.emit(&run_id, seq, EventKind::GenerationComplete, json!({}));
                    self.publish();
                    return Ok(RunOutcome::Completed);
                }
            }
        }
    }

    fn finish_failed(&mut self, run_id: &str, seq: u32, err: anyhow::Error) -> RunOutcome {
        let info = error_info_from(&err);
        self.emit(
            run_id,
            seq,
            EventKind::GenerationFailed,
            json!({"kind": info.kind, "message": info.message}),
        );
        self.machine.fail(info);
        self.publish();
        self.machine.settle();
        self.publish();
        RunOutcome::Failed
    }

    fn emit(&mut self, run_id: &str, seq: u32, kind: EventKind, data: serde_json::Value) {
        if let Err(e) = self
            .events
            .emit(Event::new(run_id.to_string(), seq, kind, data))
        {
            eprintln!("WARN: failed to emit generation event: {e}");
        }
    }

    fn publish(&mut self) {
        let snapshot = self.machine.snapshot();
        for sink in &mut self.subscribers {
            if let Err(e) = sink.publish(&snapshot) {
                eprintln!("WARN: failed to publish state snapshot: {e}");
            }
        }
    }
}

impl Default for GenerationController {
    fn default() -> Self {
        Self::new()
    }
}

fn error_info_from(err: &anyhow::Error) -> ErrorInfo {
    match err.downcast_ref::<ServiceError>() {
        Some(service) => ErrorInfo::service_failure(service.to_string()),
        None => ErrorInfo::service_failure(format!("{err:#}")),
    }
}
