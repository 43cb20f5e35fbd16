use crossbeam_channel::{bounded, Receiver, Sender};
use std::path::PathBuf;

/// Discovery runs ahead of the workers by at most this many files.
pub const WORK_QUEUE_CAPACITY: usize = 100;

/// An absolute source path believed to need conversion.
pub type WorkItem = PathBuf;

pub fn work_queue() -> (Sender<WorkItem>, Receiver<WorkItem>) {
    bounded(WORK_QUEUE_CAPACITY)
}
