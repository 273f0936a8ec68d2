//! Tracks in-flight tasks and resolves their futures.
//!
//! Each map operation goes through a single `DashMap` entry, so register,
//! append and remove are critical sections with respect to each other.
//! Promises are resolved only after the entry guard is released.

use crate::base::context::classify_io_error;
use crate::base::neterror::NetError;
use crate::http::response::HttpResponse;
use crate::session::promise::Promise;
use crate::session::transport::{DataDisposition, TaskId, TaskOutcome, TransportResponse};
use bytes::{Bytes, BytesMut};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// State of one in-flight request.
pub struct PendingTask {
    pub id: TaskId,
    /// `None` until the first chunk arrives, then append-only.
    pub received: Option<BytesMut>,
    pub promise: Promise<HttpResponse>,
}

impl PendingTask {
    pub fn new(id: TaskId, promise: Promise<HttpResponse>) -> Self {
        Self {
            id,
            received: None,
            promise,
        }
    }

    fn append(&mut self, chunk: &[u8]) {
        self.received
            .get_or_insert_with(|| BytesMut::with_capacity(chunk.len()))
            .extend_from_slice(chunk);
    }
}

/// Map from task id to pending state for one session.
#[derive(Default)]
pub struct TaskRegistry {
    tasks: DashMap<TaskId, PendingTask>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a task. Must happen before the transport is resumed.
    pub fn register(&self, id: TaskId, promise: Promise<HttpResponse>) {
        if let Some(previous) = self.tasks.insert(id, PendingTask::new(id, promise)) {
            // Ids are reused only after retirement; a live duplicate is stale.
            tracing::warn!(task = %id, "Replacing stale registry entry");
            previous
                .promise
                .fail(NetError::Runtime(format!("{id} was reused while pending")));
        }
        tracing::debug!(task = %id, "Registered task");
    }

    /// Append a chunk, or tell the transport to abort stale work.
    pub fn on_data(&self, id: TaskId, chunk: &Bytes) -> DataDisposition {
        match self.tasks.entry(id) {
            Entry::Vacant(_) => {
                tracing::trace!(task = %id, len = chunk.len(), "Discarding data for unknown task");
                DataDisposition::Continue
            }
            Entry::Occupied(entry) if entry.get().promise.is_completed() => {
                entry.remove();
                tracing::debug!(task = %id, "Discarding data for resolved task, aborting");
                DataDisposition::Cancel
            }
            Entry::Occupied(mut entry) => {
                entry.get_mut().append(chunk);
                DataDisposition::Continue
            }
        }
    }

    /// Remove the task and resolve its future from `outcome`.
    ///
    /// The entry is removed even when the future was already resolved.
    pub fn on_completion(&self, id: TaskId, outcome: TaskOutcome) {
        let Some((_, task)) = self.tasks.remove(&id) else {
            tracing::trace!(task = %id, "Completion for unknown task");
            return;
        };

        if task.promise.is_completed() {
            tracing::debug!(task = %id, "Released already-resolved task");
            return;
        }

        let result = match outcome {
            Err(e) => {
                let error = classify_io_error(e, Some(format!("{id} failed in transport")));
                tracing::debug!(task = %id, error = %error, "Task failed");
                Err(error)
            }
            Ok(TransportResponse::Http(head)) => {
                tracing::debug!(task = %id, status = head.status, "Task completed");
                let data = task.received.map(BytesMut::freeze);
                Ok(HttpResponse::from_head(head, data))
            }
            Ok(TransportResponse::Unsupported(description)) => {
                tracing::debug!(task = %id, response = %description, "Unsupported response");
                Err(NetError::UnsupportedResponse(description))
            }
        };

        task.promise.resolve(result);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }
}
