//! Worker-thread task queue with cooperative cancellation and progress.
//!
//! A fixed pool of worker threads drains a crossbeam channel of queued task
//! bodies. Each live task is tracked in a concurrent table keyed by task id;
//! the table entry is the deduplication slot, so starting a second task with
//! a live id fails with [`CacheError::TaskExists`]. Every started task fires
//! exactly one terminal event: completed, cancelled, or failed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, unbounded};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use log::{debug, trace};

use crate::cache::events::Event;
use crate::cache::types::CacheError;
use crate::cache::worker::types::{
    TaskCompleteArgs, TaskContext, TaskEventArgs, TaskFailedArgs, TaskState,
};

type TaskBody<R> = Box<dyn FnOnce(&TaskContext) -> Result<R, CacheError> + Send + 'static>;

struct QueuedTask<R> {
    context: Arc<TaskContext>,
    body: TaskBody<R>,
}

/// Terminal event channels fired by the queue's worker threads.
pub struct TaskQueueEvents<R> {
    /// Fired when a task body returns a value.
    pub completed: Event<TaskCompleteArgs<R>>,
    /// Fired when a task is cancelled before or during execution.
    pub cancelled: Event<TaskEventArgs>,
    /// Fired when a task body returns an error.
    pub failed: Event<TaskFailedArgs>,
}

impl<R> Default for TaskQueueEvents<R> {
    fn default() -> Self {
        Self {
            completed: Event::new(),
            cancelled: Event::new(),
            failed: Event::new(),
        }
    }
}

impl<R> Clone for TaskQueueEvents<R> {
    fn clone(&self) -> Self {
        Self {
            completed: self.completed.clone(),
            cancelled: self.cancelled.clone(),
            failed: self.failed.clone(),
        }
    }
}

/// A thread-pool scheduler for background cache loads.
///
/// The queue is unbounded, so `start` never blocks the caller. Cancellation
/// is cooperative: a running body is expected to observe
/// [`TaskContext::is_cancelled`] and return promptly. Dropping the queue
/// signals shutdown and joins the workers; tasks still queued at shutdown
/// are dropped without events.
pub struct TaskQueue<R: Send + 'static> {
    sender: Option<Sender<QueuedTask<R>>>,
    tasks: Arc<DashMap<String, Arc<TaskContext>>>,
    events: TaskQueueEvents<R>,
    shutdown: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

impl<R: Send + 'static> TaskQueue<R> {
    /// Create a queue backed by `workers` threads.
    pub fn new(workers: usize) -> Result<Self, CacheError> {
        if workers == 0 {
            return Err(CacheError::invalid_configuration(
                "task queue needs at least one worker thread",
            ));
        }

        let (sender, receiver) = unbounded::<QueuedTask<R>>();
        let tasks: Arc<DashMap<String, Arc<TaskContext>>> = Arc::new(DashMap::new());
        let events = TaskQueueEvents::default();
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::with_capacity(workers);
        for index in 0..workers {
            let receiver = receiver.clone();
            let tasks = Arc::clone(&tasks);
            let events = events.clone();
            let shutdown = Arc::clone(&shutdown);
            let handle = std::thread::Builder::new()
                .name(format!("cascara-worker-{}", index))
                .spawn(move || run_worker(receiver, tasks, events, shutdown))
                .map_err(|e| {
                    CacheError::storage_error(format!("failed to spawn worker thread: {}", e))
                })?;
            handles.push(handle);
        }

        Ok(Self {
            sender: Some(sender),
            tasks,
            events,
            shutdown,
            workers: handles,
        })
    }

    /// The terminal event channels consumers subscribe to.
    pub fn events(&self) -> &TaskQueueEvents<R> {
        &self.events
    }

    /// Schedule a task body under the given id.
    ///
    /// Fails with [`CacheError::TaskExists`] if a task with the same id is
    /// already live (queued or running).
    pub fn start<F>(&self, task_id: impl Into<String>, body: F) -> Result<(), CacheError>
    where
        F: FnOnce(&TaskContext) -> Result<R, CacheError> + Send + 'static,
    {
        let task_id = task_id.into();
        let Some(sender) = &self.sender else {
            return Err(CacheError::QueueShutdown);
        };

        let context = Arc::new(TaskContext::new(task_id.clone()));
        match self.tasks.entry(task_id.clone()) {
            Entry::Occupied(_) => return Err(CacheError::TaskExists(task_id)),
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&context));
            }
        }

        trace!("task queue: scheduling task {}", task_id);
        let queued = QueuedTask {
            context,
            body: Box::new(body),
        };
        if sender.send(queued).is_err() {
            self.tasks.remove(&task_id);
            return Err(CacheError::QueueShutdown);
        }
        Ok(())
    }

    /// Request cancellation of a queued or running task.
    pub fn cancel(&self, task_id: &str) -> Result<(), CacheError> {
        match self.tasks.get(task_id) {
            Some(context) => {
                debug!("task queue: cancelling task {}", task_id);
                context.request_cancel();
                Ok(())
            }
            None => Err(CacheError::TaskNotFound(task_id.to_string())),
        }
    }

    /// Request cancellation only if the task has not started running.
    pub fn cancel_queued(&self, task_id: &str) -> Result<(), CacheError> {
        match self.tasks.get(task_id) {
            Some(context) => {
                if context.state() == TaskState::Idle {
                    debug!("task queue: cancelling queued task {}", task_id);
                    context.request_cancel();
                }
                Ok(())
            }
            None => Err(CacheError::TaskNotFound(task_id.to_string())),
        }
    }

    /// Progress of a live task in `[0, 1]`.
    pub fn task_progress(&self, task_id: &str) -> Result<f32, CacheError> {
        match self.tasks.get(task_id) {
            Some(context) => Ok(context.progress()),
            None => Err(CacheError::TaskNotFound(task_id.to_string())),
        }
    }

    /// Lifecycle state of a live task.
    pub fn task_state(&self, task_id: &str) -> Result<TaskState, CacheError> {
        match self.tasks.get(task_id) {
            Some(context) => Ok(context.state()),
            None => Err(CacheError::TaskNotFound(task_id.to_string())),
        }
    }

    /// Number of live (queued or running) tasks.
    pub fn live_tasks(&self) -> usize {
        self.tasks.len()
    }
}

impl<R: Send + 'static> Drop for TaskQueue<R> {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        // Closing the channel wakes workers blocked in recv.
        self.sender.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

fn run_worker<R: Send + 'static>(
    receiver: Receiver<QueuedTask<R>>,
    tasks: Arc<DashMap<String, Arc<TaskContext>>>,
    events: TaskQueueEvents<R>,
    shutdown: Arc<AtomicBool>,
) {
    while let Ok(task) = receiver.recv() {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }

        let context = task.context;
        let task_id = context.task_id().to_string();

        if context.is_cancelled() {
            trace!("task queue: task {} cancelled before start", task_id);
            tasks.remove(&task_id);
            events.cancelled.notify(&TaskEventArgs { task_id });
            continue;
        }

        context.set_state(TaskState::Starting);
        context.set_state(TaskState::Running);
        let outcome = (task.body)(&context);

        if context.is_cancelled() {
            debug!("task queue: task {} observed cancellation", task_id);
            tasks.remove(&task_id);
            events.cancelled.notify(&TaskEventArgs { task_id });
            continue;
        }

        match outcome {
            Ok(result) => {
                context.set_state(TaskState::Finished);
                context.set_progress(1.0);
                tasks.remove(&task_id);
                events.completed.notify(&TaskCompleteArgs { task_id, result });
            }
            Err(error) => {
                debug!("task queue: task {} failed: {}", task_id, error);
                context.set_state(TaskState::Failed);
                tasks.remove(&task_id);
                events.failed.notify(&TaskFailedArgs { task_id, error });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn recv_one<T>(receiver: &crossbeam_channel::Receiver<T>) -> T {
        receiver
            .recv_timeout(Duration::from_secs(5))
            .expect("event within timeout")
    }

    #[test]
    fn zero_workers_is_invalid_configuration() {
        assert!(matches!(
            TaskQueue::<()>::new(0),
            Err(CacheError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn completed_task_fires_completed_event_and_is_reaped() {
        let queue = TaskQueue::<u32>::new(1).expect("valid worker count");
        let (tx, rx) = crossbeam_channel::unbounded();
        queue.events().completed.subscribe(move |args| {
            let _ = tx.send((args.task_id.clone(), args.result));
        });

        queue
            .start("t1", |context| {
                context.set_progress(0.5);
                Ok(42)
            })
            .expect("fresh task id");

        let (id, result) = recv_one(&rx);
        assert_eq!(id, "t1");
        assert_eq!(result, 42);
        assert!(matches!(
            queue.task_state("t1"),
            Err(CacheError::TaskNotFound(_))
        ));
    }

    #[test]
    fn failed_task_fires_failed_event() {
        let queue = TaskQueue::<u32>::new(1).expect("valid worker count");
        let (tx, rx) = crossbeam_channel::unbounded();
        queue.events().failed.subscribe(move |args| {
            let _ = tx.send(args.error.clone());
        });

        queue
            .start("t1", |_| Err(CacheError::load_failed("no value")))
            .expect("fresh task id");

        assert!(matches!(recv_one(&rx), CacheError::LoadFailed(_)));
        assert_eq!(queue.live_tasks(), 0);
    }

    #[test]
    fn duplicate_task_id_is_rejected_while_live() {
        let queue = TaskQueue::<()>::new(1).expect("valid worker count");
        let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(0);
        let (done_tx, done_rx) = crossbeam_channel::unbounded();
        queue.events().completed.subscribe(move |_| {
            let _ = done_tx.send(());
        });

        queue
            .start("dup", move |_| {
                let _ = release_rx.recv();
                Ok(())
            })
            .expect("fresh task id");

        assert!(matches!(
            queue.start("dup", |_| Ok(())),
            Err(CacheError::TaskExists(_))
        ));

        release_tx.send(()).expect("worker is waiting");
        recv_one(&done_rx);

        // Terminal tasks free their id.
        queue.start("dup", |_| Ok(())).expect("id was freed");
    }

    #[test]
    fn running_task_observes_cooperative_cancellation() {
        let queue = TaskQueue::<()>::new(1).expect("valid worker count");
        let (started_tx, started_rx) = crossbeam_channel::unbounded();
        let (cancelled_tx, cancelled_rx) = crossbeam_channel::unbounded();
        queue.events().cancelled.subscribe(move |args| {
            let _ = cancelled_tx.send(args.task_id.clone());
        });

        queue
            .start("slow", move |context| {
                let _ = started_tx.send(());
                while !context.is_cancelled() {
                    std::thread::sleep(Duration::from_millis(1));
                }
                Ok(())
            })
            .expect("fresh task id");

        recv_one(&started_rx);
        queue.cancel("slow").expect("task is live");
        assert_eq!(recv_one(&cancelled_rx), "slow");
        assert_eq!(queue.live_tasks(), 0);
    }

    #[test]
    fn queued_task_can_be_cancelled_before_running() {
        let queue = TaskQueue::<()>::new(1).expect("valid worker count");
        let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(0);
        let (cancelled_tx, cancelled_rx) = crossbeam_channel::unbounded();
        queue.events().cancelled.subscribe(move |args| {
            let _ = cancelled_tx.send(args.task_id.clone());
        });

        // Occupy the single worker so the next task stays queued.
        queue
            .start("blocker", move |_| {
                let _ = release_rx.recv();
                Ok(())
            })
            .expect("fresh task id");
        queue.start("queued", |_| Ok(())).expect("fresh task id");

        assert_eq!(
            queue.task_state("queued").expect("task is live"),
            TaskState::Idle
        );
        queue.cancel_queued("queued").expect("task is live");
        release_tx.send(()).expect("worker is waiting");

        assert_eq!(recv_one(&cancelled_rx), "queued");
    }

    #[test]
    fn cancel_unknown_task_reports_not_found() {
        let queue = TaskQueue::<()>::new(1).expect("valid worker count");
        assert!(matches!(
            queue.cancel("missing"),
            Err(CacheError::TaskNotFound(_))
        ));
        assert!(matches!(
            queue.task_progress("missing"),
            Err(CacheError::TaskNotFound(_))
        ));
    }
}
