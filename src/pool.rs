use crate::discovery::{discover, DiscoveryReport};
use crate::pipeline::Converter;
use crate::progress::{ProgressEvent, Reporter};
use crate::queue::{work_queue, WorkItem};
use crate::status::{StatusBoard, StatusSurface};
use anyhow::{Context, Result};
use crossbeam_channel::{select, unbounded, Receiver, Sender};
use std::sync::Arc;
use std::thread;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub discovery: DiscoveryReport,
    pub converted: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

struct Worker {
    slot: usize,
    converter: Arc<Converter>,
    queue: Receiver<WorkItem>,
    reporter: Reporter,
    done: Sender<usize>,
}

impl Worker {
    fn run(self) {
        self.reporter.idle();
        let mut processed = 0usize;
        while let Ok(item) = self.queue.recv() {
            self.converter.convert(&item, &self.reporter);
            processed += 1;
            self.reporter.idle();
        }
        tracing::debug!(slot = self.slot, processed, "worker finished");
        let _ = self.done.send(self.slot);
    }
}

pub fn run(
    converter: Arc<Converter>,
    workers: usize,
    surface: &mut dyn StatusSurface,
) -> Result<RunSummary> {
    anyhow::ensure!(workers > 0, "at least one worker is required");
    let (work_tx, work_rx) = work_queue();
    let (progress_tx, progress_rx) = unbounded();
    let (done_tx, done_rx) = unbounded();

    let layout = converter.layout().clone();
    let producer = thread::Builder::new()
        .name("discovery".to_string())
        .spawn(move || discover(&layout, work_tx))
        .context("spawn discovery thread")?;

    let mut handles = Vec::with_capacity(workers);
    for slot in 0..workers {
        let worker = Worker {
            slot,
            converter: Arc::clone(&converter),
            queue: work_rx.clone(),
            reporter: Reporter::new(slot, progress_tx.clone()),
            done: done_tx.clone(),
        };
        let handle = thread::Builder::new()
            .name(format!("worker-{slot}"))
            .spawn(move || worker.run())
            .with_context(|| format!("spawn worker {slot}"))?;
        handles.push(handle);
    }
    drop(work_rx);
    drop(progress_tx);
    drop(done_tx);

    let board = supervise(&progress_rx, &done_rx, workers, surface);
    surface.finish();

    for handle in handles {
        if handle.join().is_err() {
            tracing::error!("worker thread panicked");
        }
    }
    let discovery = producer
        .join()
        .map_err(|_| anyhow::anyhow!("discovery thread panicked"))?;

    Ok(RunSummary {
        discovery,
        converted: board.converted(),
        failed: board.failed(),
        errors: board.into_errors(),
    })
}

pub fn supervise(
    progress: &Receiver<ProgressEvent>,
    done: &Receiver<usize>,
    workers: usize,
    surface: &mut dyn StatusSurface,
) -> StatusBoard {
    let mut board = StatusBoard::new();
    let mut live = workers;
    while live > 0 {
        select! {
            recv(progress) -> msg => match msg {
                Ok(event) => {
                    board.apply(event);
                    surface.draw(&board.view());
                }
                Err(_) => break,
            },
            recv(done) -> msg => match msg {
                Ok(slot) => {
                    live -= 1;
                    tracing::debug!(slot, live, "worker done");
                }
                Err(_) => break,
            },
        }
    }
    // Workers publish their last idle event before signalling done.
    for event in progress.try_iter() {
        board.apply(event);
        surface.draw(&board.view());
    }
    board
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Layout;
    use crate::pipeline::tests::{FakeStages, FULL_TAGS};
    use crate::progress::Stage;
    use crate::status::StatusView;
    use anyhow::Result;
    use std::fs;
    use tempfile::tempdir;

    #[derive(Default)]
    struct Frames(Vec<StatusView>);

    impl StatusSurface for Frames {
        fn draw(&mut self, view: &StatusView) {
            self.0.push(view.clone());
        }
    }

    #[test]
    fn supervise_stops_after_all_workers_report_done() {
        let (progress_tx, progress_rx) = unbounded();
        let (done_tx, done_rx) = unbounded();
        for slot in 0..3 {
            progress_tx.send(ProgressEvent::idle(slot)).unwrap();
            done_tx.send(slot).unwrap();
        }
        let mut frames = Frames::default();
        let board = supervise(&progress_rx, &done_rx, 3, &mut frames);
        assert_eq!(board.view().lines.len(), 3);
        assert_eq!(frames.0.last().map(|v| v.lines.len()), Some(3));
    }

    #[test]
    fn run_converts_every_item_once() -> Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("flac");
        let output = dir.path().join("mp3");
        for i in 0..7 {
            let path = input.join(format!("disc{}/track{i}.flac", i % 2));
            fs::create_dir_all(path.parent().unwrap())?;
            fs::write(&path, b"fLaC")?;
        }
        let stages = Arc::new(FakeStages::with_tags(FULL_TAGS));
        let converter = Arc::new(Converter::new(Layout::new(&input, &output), stages.clone()));
        let mut frames = Frames::default();
        let summary = run(converter, 3, &mut frames)?;

        assert_eq!(summary.discovery.queued, 7);
        assert_eq!(summary.converted, 7);
        assert_eq!(summary.failed, 0);
        let encoded = stages
            .stages_called()
            .into_iter()
            .filter(|s| *s == Stage::EncodingTarget)
            .count();
        assert_eq!(encoded, 7);
        let last = frames.0.last().expect("at least one frame");
        assert_eq!(last.lines.len(), 3);
        assert!(last.lines.iter().all(|l| l.stage == Stage::Idle));
        Ok(())
    }
}
