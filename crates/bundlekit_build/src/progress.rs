//! Coarse progress reporting for long-running tasks.

use std::sync::Arc;

/// Progress information emitted during a build.
///
/// Bulk tasks (packaging, hashing, copying) emit one event per file. Other
/// tasks emit a single event when they start.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildProgress {
    /// Name of the running task.
    pub task: &'static str,
    /// File currently being processed, if the task works file by file.
    pub current_file: Option<String>,
    /// 1-based index of the current file.
    pub current: u32,
    /// Total number of files the task will process.
    pub total: u32,
}

impl BuildProgress {
    /// Event marking the start of a task.
    pub fn started(task: &'static str) -> Self {
        Self {
            task,
            current_file: None,
            current: 0,
            total: 0,
        }
    }

    pub fn file(task: &'static str, file: impl Into<String>, current: u32, total: u32) -> Self {
        Self {
            task,
            current_file: Some(file.into()),
            current,
            total,
        }
    }
}

pub type ProgressCallback = Arc<dyn Fn(BuildProgress) + Send + Sync>;
