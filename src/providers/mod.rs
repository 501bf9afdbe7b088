pub mod http;
pub mod mock;
pub mod ollama;
pub mod openai_compat;
pub mod partial;

use async_trait::async_trait;

use crate::types::RawCandidate;

/// One delivery unit from a generation session: the cumulative set of raw
/// candidates known at this point in the stream.
pub type Snapshot = Vec<RawCandidate>;

/// An open generation session. Snapshots are delivered strictly one at a
/// time, in order; `None` means the service finished normally. Dropping the
/// stream cancels further delivery and releases the underlying connection
/// (already-delivered snapshots are unaffected).
#[async_trait]
pub trait SnapshotStream: Send {
    async fn next_snapshot(&mut self) -> Option<anyhow::Result<Snapshot>>;
}

/// A backend that can open generation sessions. `instructions` carries the
/// static guidance (with the embedded limit); `prompt` is the user's theme.
#[async_trait]
pub trait PaletteSource: Send + Sync {
    async fn open(
        &self,
        instructions: &str,
        prompt: &str,
    ) -> anyhow::Result<Box<dyn SnapshotStream>>;
}
