use crate::layout::{ensure_parent_dir, Layout};
use crate::progress::{Reporter, Stage};
use crate::stages::{StageError, Stages};
use crate::tags::REQUIRED_TAGS;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempPath;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0:#}")]
    Destination(anyhow::Error),
    #[error("extract tags: {0}")]
    ExtractTags(StageError),
    #[error("create temp file: {0}")]
    TempFile(io::Error),
    #[error("decode: {0}")]
    Decode(StageError),
    #[error("required tag {tag} missing on {}", .path.display())]
    MissingTag { tag: &'static str, path: PathBuf },
    #[error("{0:#}")]
    OutputDir(anyhow::Error),
    #[error("encode: {0}")]
    Encode(StageError),
    #[error("move output to {}: {source}", .path.display())]
    Persist { path: PathBuf, source: io::Error },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Converted,
    Failed,
}

/// Runs extract → decode → encode for one source file.
pub struct Converter {
    layout: Layout,
    stages: Arc<dyn Stages>,
    temp_dir: Option<PathBuf>,
}

struct Item<'a> {
    source: &'a Path,
    destination: Option<PathBuf>,
    stage: Stage,
    reporter: &'a Reporter,
}

impl Item<'_> {
    fn enter(&mut self, stage: Stage) {
        self.stage = stage;
        self.reporter
            .stage(self.source, self.destination.as_deref(), stage);
    }
}

impl Converter {
    pub fn new(layout: Layout, stages: Arc<dyn Stages>) -> Self {
        Self {
            layout,
            stages,
            temp_dir: None,
        }
    }

    pub fn with_temp_dir(mut self, temp_dir: Option<PathBuf>) -> Self {
        self.temp_dir = temp_dir;
        self
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn convert(&self, source: &Path, reporter: &Reporter) -> Outcome {
        let mut item = Item {
            source,
            destination: None,
            stage: Stage::ExtractingTags,
            reporter,
        };
        match self.process(&mut item) {
            Ok(()) => {
                item.enter(Stage::Done);
                tracing::info!(
                    slot = reporter.slot(),
                    source = %source.display(),
                    "converted"
                );
                Outcome::Converted
            }
            Err(err) => {
                tracing::warn!(
                    slot = reporter.slot(),
                    source = %source.display(),
                    stage = item.stage.label(),
                    error = %err,
                    "conversion failed"
                );
                reporter.failed(
                    source,
                    item.destination.as_deref(),
                    item.stage,
                    err.to_string(),
                );
                Outcome::Failed
            }
        }
    }

    fn process(&self, item: &mut Item<'_>) -> Result<(), PipelineError> {
        let destination = self
            .layout
            .destination_for(item.source)
            .map_err(PipelineError::Destination)?;
        item.destination = Some(destination.clone());

        item.enter(Stage::ExtractingTags);
        let tags = self
            .stages
            .extract_tags(item.source)
            .map_err(PipelineError::ExtractTags)?;

        item.enter(Stage::DecodingSource);
        // Removed when dropped, on every return below.
        let artifact = self.temp_artifact().map_err(PipelineError::TempFile)?;
        self.stages
            .decode(item.source, &artifact)
            .map_err(PipelineError::Decode)?;

        item.enter(Stage::EncodingTarget);
        if let Some(tag) = tags.first_missing(&REQUIRED_TAGS) {
            return Err(PipelineError::MissingTag {
                tag,
                path: item.source.to_path_buf(),
            });
        }
        ensure_parent_dir(&destination).map_err(PipelineError::OutputDir)?;
        // Staged beside the destination; renamed into place only after encode succeeds.
        let staged = staging_path(&destination).map_err(PipelineError::TempFile)?;
        self.stages
            .encode(&artifact, &staged, &tags)
            .map_err(PipelineError::Encode)?;
        staged
            .persist(&destination)
            .map_err(|err| PipelineError::Persist {
                path: destination.clone(),
                source: err.error,
            })?;
        Ok(())
    }

    fn temp_artifact(&self) -> io::Result<TempPath> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("flacjack-").suffix(".wav");
        let file = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        Ok(file.into_temp_path())
    }
}

fn staging_path(destination: &Path) -> io::Result<TempPath> {
    let dir = destination.parent().unwrap_or(Path::new("."));
    let file = tempfile::Builder::new()
        .prefix(".flacjack-")
        .suffix(".mp3.part")
        .tempfile_in(dir)?;
    Ok(file.into_temp_path())
}
