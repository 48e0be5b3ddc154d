//! Task lifecycle types shared by the queue and its consumers.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crossbeam_utils::atomic::AtomicCell;
use serde::{Deserialize, Serialize};

use crate::cache::types::CacheError;

/// Lifecycle state of a background task.
///
/// Transitions: `Idle -> Starting -> Running -> {Finished | Cancelling ->
/// terminal | Failed}`. Terminal states are observable only transiently;
/// the queue reaps a task's record once its terminal event has fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    /// Queued, not yet picked up by a worker.
    Idle,
    /// Picked up by a worker, about to run.
    Starting,
    /// The task body is executing.
    Running,
    /// Cancellation requested while running; waiting for the body to
    /// observe the flag.
    Cancelling,
    /// The task body returned a value.
    Finished,
    /// The task body returned an error.
    Failed,
}

/// Shared per-task state: cancellation flag, progress, and lifecycle state.
///
/// A reference is handed to the task body so loaders can report progress and
/// observe cooperative cancellation; the queue never forcibly terminates a
/// running body.
#[derive(Debug)]
pub struct TaskContext {
    task_id: String,
    cancelled: AtomicBool,
    progress: AtomicU32,
    state: AtomicCell<TaskState>,
}

impl TaskContext {
    pub(crate) fn new(task_id: String) -> Self {
        Self {
            task_id,
            cancelled: AtomicBool::new(false),
            progress: AtomicU32::new(0.0f32.to_bits()),
            state: AtomicCell::new(TaskState::Idle),
        }
    }

    /// The unique id of this task.
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Report progress, clamped to `[0, 1]`.
    pub fn set_progress(&self, progress: f32) {
        let clamped = progress.clamp(0.0, 1.0);
        self.progress.store(clamped.to_bits(), Ordering::Relaxed);
    }

    /// The most recently reported progress in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        f32::from_bits(self.progress.load(Ordering::Relaxed))
    }

    /// True once cancellation has been requested. Task bodies are expected
    /// to poll this and stop promptly.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub(crate) fn request_cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
        if self.state.load() == TaskState::Running {
            self.state.store(TaskState::Cancelling);
        }
    }

    pub(crate) fn state(&self) -> TaskState {
        self.state.load()
    }

    pub(crate) fn set_state(&self, state: TaskState) {
        self.state.store(state);
    }
}

/// Payload for task cancellation events.
#[derive(Debug, Clone)]
pub struct TaskEventArgs {
    /// The id of the task the event concerns.
    pub task_id: String,
}

/// Payload for task failure events.
#[derive(Debug, Clone)]
pub struct TaskFailedArgs {
    /// The id of the failed task.
    pub task_id: String,
    /// The error the task body returned.
    pub error: CacheError,
}

/// Payload for task completion events.
#[derive(Debug)]
pub struct TaskCompleteArgs<R> {
    /// The id of the completed task.
    pub task_id: String,
    /// The value the task body produced.
    pub result: R,
}
