//! In-process registry of running predictions.
//!
//! A run registers itself under its execution id and receives an [`ExecutionHandle`]. Aborting
//! the id cancels the handle's token; dropping the handle (the run finished) deregisters it.
//!
//! In main mode the server's registry is reached through `AbortCoordinator::local_registry()`;
//! code that starts a prediction registers there and drives the work with [`ExecutionHandle::run`].

use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use ts_rs::TS;
use uuid::Uuid;

/// Composite identity of one prediction run: the chatflow being executed and the chat session
/// it answers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
pub struct ExecutionKey {
    pub chatflow_id: Uuid,
    pub chat_id: String,
}

impl ExecutionKey {
    pub fn new(chatflow_id: Uuid, chat_id: impl Into<String>) -> Self {
        Self {
            chatflow_id,
            chat_id: chat_id.into(),
        }
    }

    /// The string id used by the registry and on the event queue.
    pub fn execution_id(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for ExecutionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.chatflow_id, self.chat_id)
    }
}

/// How a registered run ended.
#[derive(Debug, PartialEq, Eq)]
pub enum RunOutcome<T> {
    Completed(T),
    Cancelled,
}

struct RegisteredExecution {
    generation: u64,
    token: CancellationToken,
}

#[derive(Default)]
struct RegistryInner {
    executions: DashMap<String, RegisteredExecution>,
    next_generation: AtomicU64,
}

#[derive(Clone, Default)]
pub struct ExecutionRegistry {
    inner: Arc<RegistryInner>,
}

impl ExecutionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a run. A previous entry under the same id is replaced and can no longer be
    /// aborted through the registry.
    pub fn register(&self, execution_id: impl Into<String>) -> ExecutionHandle {
        let execution_id = execution_id.into();
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();

        let replaced = self.inner.executions.insert(
            execution_id.clone(),
            RegisteredExecution {
                generation,
                token: token.clone(),
            },
        );
        if replaced.is_some() {
            tracing::warn!(
                execution_id = %execution_id,
                "Execution registered twice, previous run is no longer abortable"
            );
        }

        ExecutionHandle {
            execution_id,
            generation,
            token,
            registry: self.clone(),
        }
    }

    /// Cancel and remove the run registered under `execution_id`.
    ///
    /// Returns `false` when nothing is registered (never started, already finished or already
    /// aborted).
    pub fn abort(&self, execution_id: &str) -> bool {
        match self.inner.executions.remove(execution_id) {
            Some((_, execution)) => {
                execution.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancellation token of the run registered under `execution_id`, if any.
    pub fn lookup(&self, execution_id: &str) -> Option<CancellationToken> {
        self.inner
            .executions
            .get(execution_id)
            .map(|execution| execution.token.clone())
    }

    pub fn is_registered(&self, execution_id: &str) -> bool {
        self.inner.executions.contains_key(execution_id)
    }

    pub fn len(&self) -> usize {
        self.inner.executions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.executions.is_empty()
    }

    fn release(&self, execution_id: &str, generation: u64) {
        self.inner
            .executions
            .remove_if(execution_id, |_, execution| execution.generation == generation);
    }
}

/// Registration of one running execution. Dropping it removes the registry entry.
pub struct ExecutionHandle {
    execution_id: String,
    generation: u64,
    token: CancellationToken,
    registry: ExecutionRegistry,
}

impl ExecutionHandle {
    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Token for work that wants to observe cancellation itself (e.g. streaming loops).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Drive `work` until it finishes or the execution is aborted, then deregister.
    pub async fn run<F, T>(self, work: F) -> RunOutcome<T>
    where
        F: Future<Output = T>,
    {
        let outcome = tokio::select! {
            biased;
            _ = self.token.cancelled() => RunOutcome::Cancelled,
            output = work => RunOutcome::Completed(output),
        };

        match outcome {
            RunOutcome::Cancelled => {
                tracing::info!(execution_id = %self.execution_id, "Execution cancelled")
            }
            RunOutcome::Completed(_) => {
                tracing::debug!(execution_id = %self.execution_id, "Execution completed")
            }
        }

        outcome
    }
}

impl Drop for ExecutionHandle {
    fn drop(&mut self) {
        self.registry.release(&self.execution_id, self.generation);
    }
}
