//! Polling of asynchronous controller tasks.
//!
//! # Design
//! Mutating calls return a `Task` handle. `TaskTracker::await_done` polls
//! `vdc/tasks/{id}.json` until the task reaches the awaited state, the
//! controller reports it failed, or the deadline passes. Time is read and
//! spent through a `Clock` so tests can drive the loop without sleeping.

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::client::Client;
use crate::error::{ApiError, Result};
use crate::types::NamedResource;

/// Shortest pause between two polls of the same task.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub fn task_path(id: &str) -> String {
    format!("vdc/tasks/{id}.json")
}

/// Lifecycle state of a controller task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskState {
    #[default]
    Pending,
    Ready,
    Error,
    Unknown(String),
}

impl From<String> for TaskState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => TaskState::Pending,
            "ready" => TaskState::Ready,
            "error" => TaskState::Error,
            _ => TaskState::Unknown(s),
        }
    }
}

impl From<TaskState> for String {
    fn from(state: TaskState) -> Self {
        state.to_string()
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Pending => f.write_str("pending"),
            TaskState::Ready => f.write_str("ready"),
            TaskState::Error => f.write_str("error"),
            TaskState::Unknown(s) => f.write_str(s),
        }
    }
}

/// Handle to an asynchronous operation on the controller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: TaskState,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub description: String,
    /// The resource the task operates on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<NamedResource>,
    #[serde(default)]
    pub op_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
}

/// Source of time for the polling loop.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

pub struct TaskTracker {
    client: Client,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
}

impl fmt::Debug for TaskTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskTracker")
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl TaskTracker {
    pub fn new(client: Client) -> Self {
        let poll_interval = client.config().poll_interval.max(MIN_POLL_INTERVAL);
        let clock = client.clock();
        Self {
            client,
            clock,
            poll_interval,
        }
    }

    /// Intervals below `MIN_POLL_INTERVAL` are raised to it.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    pub fn query(&self, task_id: &str) -> Result<Task> {
        self.client.get(&task_path(task_id))
    }

    /// Poll the task until it reaches `terminal`, fails, or `timeout`
    /// elapses. The task is always queried at least once, and a sleep never
    /// runs past the deadline. A timeout too large to represent as an
    /// `Instant` means no deadline.
    pub fn await_done(&self, task_id: &str, terminal: TaskState, timeout: Duration) -> Result<Task> {
        let start = self.clock.now();
        let deadline = start.checked_add(timeout);

        loop {
            let task = self.query(task_id)?;
            debug!(task_id, state = %task.state, "polled task");

            if task.state == terminal {
                return Ok(task);
            }
            if task.state == TaskState::Error {
                warn!(task_id, message = %task.message, "task failed");
                return Err(ApiError::TaskFailed {
                    task_id: task_id.to_string(),
                    message: task.message,
                });
            }

            let now = self.clock.now();
            let pause = match deadline {
                Some(deadline) if now >= deadline => {
                    let waited = now.duration_since(start);
                    warn!(task_id, ?waited, "task did not complete in time");
                    return Err(ApiError::TaskTimeout {
                        task_id: task_id.to_string(),
                        waited,
                    });
                }
                Some(deadline) => self.poll_interval.min(deadline - now),
                None => self.poll_interval,
            };
            self.clock.sleep(pause);
        }
    }
}
