// In-memory todo store: the authoritative side of the mutation contract.
//
// Every operation re-checks the caller against the row it touches:
// - reads and toggles match on (id, owner_id = caller)
// - ownership mismatch and absence collapse into `NotFoundOrForbidden`
// - toggles negate under the write lock, never from a client-supplied value
// - deletes check the caller's role before the row is looked up
//
// Accepted mutations are published on a broadcast change feed.

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::Utc;
use donelist_common::{
    error::MutationError,
    service::TodoService,
    types::{Session, Todo, TodoChange, TodoId},
    validation::normalize_title,
};
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

const CHANGE_FEED_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct TodoStore {
    rows: Arc<RwLock<HashMap<TodoId, Todo>>>,
    changes: broadcast::Sender<TodoChange>,
    write_delay: Duration,
}

impl Default for TodoStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TodoStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self { rows: Arc::new(RwLock::new(HashMap::new())), changes, write_delay: Duration::ZERO }
    }

    /// Delay every write by `delay` before it takes the lock.
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = delay;
        self
    }

    /// Subscribe to accepted mutations. Lagging subscribers should reload.
    pub fn subscribe(&self) -> broadcast::Receiver<TodoChange> {
        self.changes.subscribe()
    }

    /// Ask every subscriber to drop cached state and reload.
    pub fn invalidate(&self) {
        self.publish(TodoChange::Invalidated);
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    fn publish(&self, change: TodoChange) {
        // No subscribers is not an error.
        let _ = self.changes.send(change);
    }

    async fn simulate_latency(&self) {
        if !self.write_delay.is_zero() {
            tokio::time::sleep(self.write_delay).await;
        }
    }
}

impl TodoService for TodoStore {
    async fn list(&self, session: &Session) -> Result<Vec<Todo>, MutationError> {
        let rows = self.rows.read().await;
        let mut todos: Vec<Todo> =
            rows.values().filter(|todo| todo.owner_id == session.user_id).cloned().collect();
        todos.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(todos)
    }

    async fn create(&self, session: &Session, title: &str) -> Result<Todo, MutationError> {
        let title = normalize_title(title)?;
        self.simulate_latency().await;

        let now = Utc::now();
        let todo = Todo {
            id: TodoId::new_v4(),
            owner_id: session.user_id,
            title,
            completed: false,
            created_at: now,
            updated_at: now,
        };

        self.rows.write().await.insert(todo.id, todo.clone());
        debug!(todo_id = %todo.id, owner_id = %todo.owner_id, "todo created");
        self.publish(TodoChange::Upserted { todo: todo.clone() });
        Ok(todo)
    }

    async fn toggle(&self, session: &Session, id: TodoId) -> Result<Todo, MutationError> {
        self.simulate_latency().await;

        let todo = {
            let mut rows = self.rows.write().await;
            let row = rows
                .get_mut(&id)
                .filter(|row| row.owner_id == session.user_id)
                .ok_or(MutationError::NotFoundOrForbidden)?;
            row.completed = !row.completed;
            row.updated_at = Utc::now();
            row.clone()
        };

        debug!(todo_id = %id, completed = todo.completed, "todo toggled");
        self.publish(TodoChange::Upserted { todo: todo.clone() });
        Ok(todo)
    }

    async fn delete(&self, session: &Session, id: TodoId) -> Result<(), MutationError> {
        if !session.role.is_admin() {
            return Err(MutationError::Forbidden);
        }
        self.simulate_latency().await;

        let removed =
            self.rows.write().await.remove(&id).ok_or(MutationError::NotFoundOrForbidden)?;

        debug!(todo_id = %id, "todo deleted");
        self.publish(TodoChange::Deleted { id, owner_id: removed.owner_id });
        Ok(())
    }
}
