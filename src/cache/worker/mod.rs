//! Background task scheduling for asynchronous cache loads.

pub mod task_queue;
pub mod types;

pub use task_queue::TaskQueue;
pub use types::{TaskCompleteArgs, TaskContext, TaskEventArgs, TaskFailedArgs, TaskState};
