mod cli_args;

mod cli_dispatch;

mod clock;

mod controller;

mod events;

mod instructions;

mod machine;

mod provider_runtime;

pub mod providers;

mod report;

mod selection;

mod types;

mod validate;

pub use cli_dispatch::run_cli;

pub use controller::{
    ChannelSink, GenerationController, RunOutcome, StartError, StateSink, StopHandle,
};

pub use events::{Event, EventKind, EventSink, JsonlFileSink, MultiSink};

pub use instructions::build_instructions;

pub use machine::{
    AlreadyGenerating, GenerationMachine, Phase, SnapshotOutcome, StateSnapshot,
};

pub use report::ErrorReporter;

pub use selection::SelectionStore;

pub use types::{
    ErrorInfo, ErrorKind, GenerationRequest, Palette, RawCandidate, RequestError, LIMIT_MAX,
    LIMIT_MIN,
};

pub use validate::{validate_batch, validate_candidate};
