use crossbeam_channel::Sender;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Idle,
    ExtractingTags,
    DecodingSource,
    EncodingTarget,
    Done,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Idle => "",
            Stage::ExtractingTags => "Extracting tags",
            Stage::DecodingSource => "Decode source",
            Stage::EncodingTarget => "Encode target",
            Stage::Done => "Done",
        }
    }
}

/// What one worker slot is doing right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub slot: usize,
    pub source: Option<PathBuf>,
    pub destination: Option<PathBuf>,
    pub stage: Stage,
    pub error: Option<String>,
}

impl ProgressEvent {
    pub fn idle(slot: usize) -> Self {
        Self {
            slot,
            source: None,
            destination: None,
            stage: Stage::Idle,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.error.is_some() || self.stage == Stage::Done
    }

    pub fn error_message(&self) -> Option<String> {
        let err = self.error.as_deref()?;
        let source = self
            .source
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        Some(format!("{source} ERROR: {err}"))
    }
}

/// Publishes events for a single worker slot.
#[derive(Debug, Clone)]
pub struct Reporter {
    slot: usize,
    tx: Sender<ProgressEvent>,
}

impl Reporter {
    pub fn new(slot: usize, tx: Sender<ProgressEvent>) -> Self {
        Self { slot, tx }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn idle(&self) {
        self.publish(ProgressEvent::idle(self.slot));
    }

    pub fn stage(&self, source: &Path, destination: Option<&Path>, stage: Stage) {
        self.publish(ProgressEvent {
            slot: self.slot,
            source: Some(source.to_path_buf()),
            destination: destination.map(Path::to_path_buf),
            stage,
            error: None,
        });
    }

    pub fn failed(&self, source: &Path, destination: Option<&Path>, stage: Stage, error: String) {
        self.publish(ProgressEvent {
            slot: self.slot,
            source: Some(source.to_path_buf()),
            destination: destination.map(Path::to_path_buf),
            stage,
            error: Some(error),
        });
    }

    fn publish(&self, event: ProgressEvent) {
        // The supervisor outlives every worker; a closed channel only happens in teardown.
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn reporter_tags_events_with_its_slot() {
        let (tx, rx) = unbounded();
        let reporter = Reporter::new(3, tx);
        reporter.idle();
        reporter.stage(Path::new("/in/a.flac"), None, Stage::ExtractingTags);
        reporter.failed(
            Path::new("/in/a.flac"),
            Some(Path::new("/out/a.mp3")),
            Stage::ExtractingTags,
            "boom".to_string(),
        );
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.slot == 3));
        assert_eq!(events[0], ProgressEvent::idle(3));
        assert!(!events[1].is_terminal());
        assert!(events[2].is_terminal());
        assert_eq!(
            events[2].error_message().as_deref(),
            Some("/in/a.flac ERROR: boom")
        );
    }

    #[test]
    fn only_idle_has_empty_label() {
        assert_eq!(Stage::Idle.label(), "");
        assert_eq!(Stage::DecodingSource.label(), "Decode source");
        assert_eq!(Stage::EncodingTarget.label(), "Encode target");
    }
}
