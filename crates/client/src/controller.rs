// Async driver that binds a `TodoList` to a `TodoService`.
//
// All list mutations happen under a short synchronous lock that is never
// held across an await. Every change publishes a fresh `ListSnapshot` on a
// watch channel so renderers only ever see settled states.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use donelist_common::{
    error::MutationError,
    service::TodoService,
    types::{Session, Todo, TodoChange, TodoId},
};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    list::{ListSnapshot, PlaceholderId, TodoList},
    reconciler::Resolution,
    session::SessionProvider,
};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Upper bound on a single service call. Expiry counts as a network
    /// failure and is never retried automatically.
    pub request_timeout: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self { request_timeout: DEFAULT_REQUEST_TIMEOUT }
    }
}

/// A create shown optimistically, with the task that settles it.
pub struct PendingCreation {
    pub placeholder: PlaceholderId,
    pub task: JoinHandle<Result<Todo, MutationError>>,
}

pub struct TodoController<S: TodoService, P: SessionProvider> {
    inner: Arc<Inner<S, P>>,
}

impl<S: TodoService, P: SessionProvider> Clone for TodoController<S, P> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

struct Inner<S, P> {
    service: S,
    sessions: P,
    config: ControllerConfig,
    list: Mutex<TodoList>,
    snapshot_tx: watch::Sender<ListSnapshot>,
}

impl<S: TodoService, P: SessionProvider> TodoController<S, P> {
    pub fn new(service: S, sessions: P, config: ControllerConfig) -> Self {
        let (snapshot_tx, _) = watch::channel(ListSnapshot::default());
        Self {
            inner: Arc::new(Inner {
                service,
                sessions,
                config,
                list: Mutex::new(TodoList::default()),
                snapshot_tx,
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ListSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> ListSnapshot {
        self.inner.snapshot_tx.borrow().clone()
    }

    fn with_list<R>(&self, f: impl FnOnce(&mut TodoList) -> R) -> R {
        let mut list = self.inner.list.lock().unwrap_or_else(PoisonError::into_inner);
        let result = f(&mut list);
        self.inner.snapshot_tx.send_replace(list.snapshot());
        result
    }

    /// Fetch the session for one call, surfacing `Unauthenticated` when
    /// signed out. Nothing else in the list is touched.
    fn require_session(&self, operation: &'static str) -> Result<Session, MutationError> {
        match self.inner.sessions.current() {
            Some(session) => Ok(session),
            None => {
                warn!(operation, "rejected mutation without a session");
                let error = MutationError::Unauthenticated;
                self.with_list(|list| list.set_error(&error));
                Err(error)
            }
        }
    }

    async fn within_deadline<T>(
        &self,
        operation: &'static str,
        request: impl Future<Output = Result<T, MutationError>>,
    ) -> Result<T, MutationError> {
        let limit = self.inner.config.request_timeout;
        match tokio::time::timeout(limit, request).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(operation, timeout_ms = limit.as_millis() as u64, "request timed out");
                Err(MutationError::network(format!(
                    "{operation} timed out after {}ms",
                    limit.as_millis()
                )))
            }
        }
    }

    /// Replace the list with the caller's todos as the service sees them.
    pub async fn reload(&self) -> Result<(), MutationError> {
        let session = self.require_session("list")?;
        match self.within_deadline("list", self.inner.service.list(&session)).await {
            Ok(todos) => {
                debug!(count = todos.len(), "todo list reloaded");
                self.with_list(|list| list.replace_all(todos));
                Ok(())
            }
            Err(error) => {
                warn!(error = %error, "todo list reload failed");
                self.with_list(|list| list.set_error(&error));
                Err(error)
            }
        }
    }

    /// Flip `id` immediately and reconcile once the service answers.
    ///
    /// The returned task yields how the response was applied. Rapid repeat
    /// toggles are allowed; only the newest request can settle the display.
    pub fn toggle(&self, id: TodoId) -> Result<JoinHandle<Resolution>, MutationError> {
        let session = self.require_session("toggle")?;
        let ticket = self.with_list(|list| {
            list.begin_toggle(id).inspect_err(|error| list.set_error(error))
        })?;
        debug!(todo_id = %id, generation = ticket.generation, predicted = ticket.predicted, "toggle issued");

        let controller = self.clone();
        Ok(tokio::spawn(async move {
            let outcome =
                controller.within_deadline("toggle", controller.inner.service.toggle(&session, id)).await;
            let resolution =
                controller.with_list(|list| list.resolve_toggle(id, ticket.generation, outcome));
            match &resolution {
                Resolution::Confirmed { completed, overridden: true } => {
                    info!(todo_id = %id, completed, "service overrode predicted completion");
                }
                Resolution::Reverted { error, .. } => {
                    warn!(todo_id = %id, error = %error, "toggle reverted");
                }
                Resolution::Stale => {
                    debug!(todo_id = %id, generation = ticket.generation, "discarded stale toggle response");
                }
                Resolution::Confirmed { .. } => {}
            }
            resolution
        }))
    }

    /// Append a placeholder for `title` and create it remotely.
    ///
    /// Blank titles fail with `ValidationFailed` before any request is made.
    pub fn create(&self, title: &str) -> Result<PendingCreation, MutationError> {
        let session = self.require_session("create")?;
        let pending = self.with_list(|list| list.begin_create(title))?;
        let placeholder = pending.placeholder;
        debug!(%placeholder, "create issued");

        let controller = self.clone();
        let task = tokio::spawn(async move {
            let outcome = controller
                .within_deadline("create", controller.inner.service.create(&session, &pending.title))
                .await;
            if let Err(error) = &outcome {
                warn!(%placeholder, error = %error, "create failed; placeholder removed");
            }
            controller.with_list(|list| list.complete_create(placeholder, outcome.clone()));
            outcome
        });
        Ok(PendingCreation { placeholder, task })
    }

    /// Hide `id` immediately and delete it remotely, restoring it on failure.
    ///
    /// Rows that are not listed locally are still sent; the service decides
    /// whether the caller may remove them.
    pub fn delete(&self, id: TodoId) -> Result<JoinHandle<Result<(), MutationError>>, MutationError> {
        let session = self.require_session("delete")?;
        let hidden = self.with_list(|list| list.begin_remove(id));
        debug!(todo_id = %id, hidden, "delete issued");

        let controller = self.clone();
        Ok(tokio::spawn(async move {
            let outcome =
                controller.within_deadline("delete", controller.inner.service.delete(&session, id)).await;
            if let Err(error) = &outcome {
                warn!(todo_id = %id, error = %error, "delete failed");
            }
            controller.with_list(|list| list.complete_remove(id, hidden, outcome.clone()));
            outcome
        }))
    }

    /// Apply one change-feed event for the signed-in user.
    ///
    /// Events about other users' rows are ignored. When the session carries
    /// no user id, only rows already listed are followed. Returns true when
    /// the event asks for a full reload.
    pub fn apply_change(&self, change: TodoChange) -> bool {
        let Some(session) = self.inner.sessions.current() else {
            return false;
        };
        let identity_known = !session.user_id.as_uuid().is_nil();
        if identity_known && change.owner_id().is_some_and(|owner| owner != session.user_id) {
            return false;
        }
        self.with_list(|list| {
            if !identity_known && change.todo_id().is_some_and(|id| !list.tracks(id)) {
                return false;
            }
            list.apply_change(change)
        })
    }

    /// Consume `changes` until the feed closes.
    pub fn spawn_change_listener(
        &self,
        mut changes: broadcast::Receiver<TodoChange>,
    ) -> JoinHandle<()> {
        let controller = self.clone();
        tokio::spawn(async move {
            loop {
                let reload = match changes.recv().await {
                    Ok(change) => controller.apply_change(change),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "change feed lagged; reloading");
                        true
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("change feed closed");
                        break;
                    }
                };
                if reload {
                    // Failures are already surfaced through the list error.
                    let _ = controller.reload().await;
                }
            }
        })
    }
}
