use std::path::PathBuf;

use crate::FileStatus;

/// Events sent from the pipeline workers to the progress reporter
#[derive(Clone, Debug)]
pub enum ProgressMessage {
    Started { total: usize },
    FileDone { path: PathBuf, status: FileStatus },
    Finished,
}
