use async_trait::async_trait;

use crate::providers::http::{ServiceError, ServiceErrorKind};
use crate::providers::{PaletteSource, Snapshot, SnapshotStream};
use crate::types::RawCandidate;

/// One scripted delivery from a [`ScriptedSource`] session.
#[derive(Debug, Clone)]
pub enum ScriptedStep {
    Batch(Vec<RawCandidate>),
    Fail(ServiceErrorKind, String),
}

/// Replays a fixed sequence of snapshot batches (optionally ending in a
/// failure) with no network involved. Used by tests and `--provider mock`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    steps: Vec<ScriptedStep>,
}

impl ScriptedSource {
    pub fn new(steps: Vec<ScriptedStep>) -> Self {
        Self { steps }
    }

    /// A small canned run: one incomplete early snapshot, then a cumulative
    /// snapshot of `limit` complete palettes derived from the prompt.
    pub fn canned(prompt: &str, limit: u8) -> Self {
        let early = vec![RawCandidate {
            id: Some(1),
            name: None,
            colors: Some(vec![Some("#1B2A4A".to_string())]),
        }];
        let full = (1..=i64::from(limit))
            .map(|id| RawCandidate {
                id: Some(id),
                name: Some(format!("{prompt} #{id}")),
                colors: Some(vec![
                    Some(format!("#{:02X}2A4A", (id * 37) % 256)),
                    Some(format!("#C9{:02X}6B", (id * 53) % 256)),
                    Some(format!("#F2E9{:02X}", (id * 71) % 256)),
                ]),
            })
            .collect::<Vec<_>>();
        Self::new(vec![ScriptedStep::Batch(early), ScriptedStep::Batch(full)])
    }
}

#[async_trait]
impl PaletteSource for ScriptedSource {
    async fn open(
        &self,
        _instructions: &str,
        _prompt: &str,
    ) -> anyhow::Result<Box<dyn SnapshotStream>> {
        Ok(Box::new(ScriptedStream {
            steps: self.steps.clone().into_iter().collect(),
        }))
    }
}

struct ScriptedStream {
    steps: std::collections::VecDeque<ScriptedStep>,
}

#[async_trait]
impl SnapshotStream for ScriptedStream {
    async fn next_snapshot(&mut self) -> Option<anyhow::Result<Snapshot>> {
        match self.steps.pop_front()? {
            ScriptedStep::Batch(batch) => Some(Ok(batch)),
            ScriptedStep::Fail(kind, message) => {
                Some(Err(ServiceError::new(kind, message).into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ScriptedSource, ScriptedStep};
    use crate::providers::http::ServiceErrorKind;
    use crate::providers::PaletteSource;
    use crate::types::RawCandidate;

    #[tokio::test]
    async fn replays_batches_in_order_then_ends() {
        let source = ScriptedSource::new(vec![
            ScriptedStep::Batch(vec![RawCandidate::default()]),
            ScriptedStep::Batch(vec![]),
        ]);
        let mut stream = source.open("i", "p").await.expect("open");
        let first = stream.next_snapshot().await.expect("some").expect("ok");
        assert_eq!(first.len(), 1);
        let second = stream.next_snapshot().await.expect("some").expect("ok");
        assert!(second.is_empty());
        assert!(stream.next_snapshot().await.is_none());
    }

    #[tokio::test]
    async fn failure_step_raises_typed_error() {
        let source = ScriptedSource::new(vec![ScriptedStep::Fail(
            ServiceErrorKind::Server,
            "backend gone".to_string(),
        )]);
        let mut stream = source.open("i", "p").await.expect("open");
        let err = stream
            .next_snapshot()
            .await
            .expect("some")
            .expect_err("err");
        assert!(err.to_string().contains("backend gone"));
    }

    #[tokio::test]
    async fn canned_run_ends_with_complete_palettes() {
        let source = ScriptedSource::canned("sunset", 3);
        let mut stream = source.open("i", "sunset").await.expect("open");
        let _early = stream.next_snapshot().await.expect("some").expect("ok");
        let full = stream.next_snapshot().await.expect("some").expect("ok");
        assert_eq!(full.len(), 3);
        assert!(full.iter().all(|c| c.id.is_some() && c.name.is_some()));
    }
}
