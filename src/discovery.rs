use crate::layout::Layout;
use crate::queue::WorkItem;
use crossbeam_channel::Sender;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub queued: usize,
    pub already_converted: usize,
    pub errors: usize,
}

/// Walks the input root and queues every source file without a converted
/// counterpart. Takes the sender by value: returning closes the queue, which
/// is how workers learn there is no more work.
pub fn discover(layout: &Layout, queue: Sender<WorkItem>) -> DiscoveryReport {
    let mut report = DiscoveryReport::default();
    let root = layout.input_root();
    tracing::info!(root = %root.display(), "scanning for source files");

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                tracing::error!(root = %root.display(), error = %err, "failed to read input root");
                report.errors += 1;
                break;
            }
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable entry");
                report.errors += 1;
                continue;
            }
        };
        if entry.file_type().is_dir() || !layout.is_source(entry.path()) {
            continue;
        }
        let destination = match layout.destination_for(entry.path()) {
            Ok(destination) => destination,
            Err(err) => {
                tracing::warn!(path = %entry.path().display(), error = %err, "skipping source");
                report.errors += 1;
                continue;
            }
        };
        if destination.exists() {
            report.already_converted += 1;
            continue;
        }
        if queue.send(entry.into_path()).is_err() {
            tracing::warn!("no workers left, stopping scan");
            break;
        }
        report.queued += 1;
    }

    tracing::info!(
        queued = report.queued,
        already_converted = report.already_converted,
        errors = report.errors,
        "scan complete"
    );
    report
}
