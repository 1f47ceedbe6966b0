// Client-side todo list with optimistic insertion and removal.
//
// Entries are keyed either by a locally minted placeholder (a create that
// has not been confirmed yet) or by the server-assigned id. The two key
// spaces never overlap: placeholders render as `temp-<n>`, which never
// parses as a `TodoId`.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use donelist_common::{
    error::MutationError,
    types::{Todo, TodoChange, TodoId},
    validation::normalize_title,
};
use serde::{Serialize, Serializer};

use crate::reconciler::{Generation, Resolution, ToggleReconciler, ToggleTicket};

/// Locally unique id for an unconfirmed create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaceholderId(u64);

impl fmt::Display for PlaceholderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "temp-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKey {
    Placeholder(PlaceholderId),
    Confirmed(TodoId),
}

impl EntryKey {
    pub fn todo_id(self) -> Option<TodoId> {
        match self {
            Self::Confirmed(id) => Some(id),
            Self::Placeholder(_) => None,
        }
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Placeholder(id) => id.fmt(f),
            Self::Confirmed(id) => id.fmt(f),
        }
    }
}

impl Serialize for EntryKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Render-ready projection of one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TodoView {
    pub key: EntryKey,
    pub title: String,
    pub completed: bool,
    /// A toggle or create for this entry is awaiting the service.
    pub busy: bool,
    pub created_at: DateTime<Utc>,
}

/// Render-ready projection of the whole list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListSnapshot {
    pub items: Vec<TodoView>,
    pub error: Option<String>,
}

/// A create that has been shown optimistically and must now be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCreate {
    pub placeholder: PlaceholderId,
    pub title: String,
}

#[derive(Debug, Clone)]
struct Placeholder {
    id: PlaceholderId,
    title: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct ConfirmedEntry {
    todo: Todo,
    toggle: ToggleReconciler,
}

impl ConfirmedEntry {
    fn new(todo: Todo) -> Self {
        let toggle = ToggleReconciler::new(todo.completed);
        Self { todo, toggle }
    }

    fn absorb(&mut self, todo: Todo) -> bool {
        let changed = self.toggle.apply_authoritative(todo.completed) || self.todo.title != todo.title;
        self.todo = todo;
        changed
    }
}

#[derive(Debug, Clone)]
enum Entry {
    Placeholder(Placeholder),
    Confirmed(ConfirmedEntry),
}

impl Entry {
    fn key(&self) -> EntryKey {
        match self {
            Self::Placeholder(p) => EntryKey::Placeholder(p.id),
            Self::Confirmed(c) => EntryKey::Confirmed(c.todo.id),
        }
    }

    fn view(&self) -> TodoView {
        match self {
            Self::Placeholder(p) => TodoView {
                key: EntryKey::Placeholder(p.id),
                title: p.title.clone(),
                completed: false,
                busy: true,
                created_at: p.created_at,
            },
            Self::Confirmed(c) => TodoView {
                key: EntryKey::Confirmed(c.todo.id),
                title: c.todo.title.clone(),
                completed: c.toggle.displayed(),
                busy: c.toggle.is_busy(),
                created_at: c.todo.created_at,
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TodoList {
    entries: Vec<Entry>,
    /// Optimistically removed rows awaiting the service, with their index.
    removed: HashMap<TodoId, (usize, ConfirmedEntry)>,
    next_placeholder: u64,
    last_error: Option<String>,
}

impl TodoList {
    pub fn new(todos: Vec<Todo>) -> Self {
        let mut list = Self::default();
        list.replace_all(todos);
        list
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> Vec<EntryKey> {
        self.entries.iter().map(Entry::key).collect()
    }

    pub fn view(&self, key: EntryKey) -> Option<TodoView> {
        self.position(key).map(|index| self.entries[index].view())
    }

    pub fn snapshot(&self) -> ListSnapshot {
        ListSnapshot {
            items: self.entries.iter().map(Entry::view).collect(),
            error: self.last_error.clone(),
        }
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Surface a failure. Only the most recent message is kept.
    pub fn set_error(&mut self, error: &MutationError) {
        self.last_error = Some(error.user_message());
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    fn position(&self, key: EntryKey) -> Option<usize> {
        self.entries.iter().position(|entry| entry.key() == key)
    }

    fn confirmed_mut(&mut self, id: TodoId) -> Option<&mut ConfirmedEntry> {
        self.entries.iter_mut().find_map(|entry| match entry {
            Entry::Confirmed(c) if c.todo.id == id => Some(c),
            _ => None,
        })
    }

    // ── Reload ─────────────────────────────────────────────────────

    /// Replace confirmed rows with a fresh listing, in the listing's order.
    ///
    /// Each surviving row goes through the same authority-wins path as a
    /// pushed change. Placeholders are kept after the listed rows, and rows
    /// with a delete in flight stay hidden.
    pub fn replace_all(&mut self, todos: Vec<Todo>) {
        let mut previous: HashMap<TodoId, ConfirmedEntry> = HashMap::new();
        let mut placeholders = Vec::new();
        for entry in self.entries.drain(..) {
            match entry {
                Entry::Confirmed(c) => {
                    previous.insert(c.todo.id, c);
                }
                Entry::Placeholder(p) => placeholders.push(Entry::Placeholder(p)),
            }
        }

        for todo in todos {
            if self.removed.contains_key(&todo.id) {
                continue;
            }
            let entry = match previous.remove(&todo.id) {
                Some(mut existing) => {
                    existing.absorb(todo);
                    existing
                }
                None => ConfirmedEntry::new(todo),
            };
            self.entries.push(Entry::Confirmed(entry));
        }
        self.entries.extend(placeholders);
    }

    // ── Create ─────────────────────────────────────────────────────

    /// Validate `title` and append a placeholder for it.
    ///
    /// Validation failures touch nothing but `last_error`.
    pub fn begin_create(&mut self, title: &str) -> Result<PendingCreate, MutationError> {
        let title = match normalize_title(title) {
            Ok(title) => title,
            Err(error) => {
                self.set_error(&error);
                return Err(error);
            }
        };
        self.next_placeholder += 1;
        let placeholder = PlaceholderId(self.next_placeholder);
        self.entries.push(Entry::Placeholder(Placeholder {
            id: placeholder,
            title: title.clone(),
            created_at: Utc::now(),
        }));
        self.clear_error();
        Ok(PendingCreate { placeholder, title })
    }

    /// Swap the placeholder for the confirmed row, or drop it on failure.
    ///
    /// Returns false when the placeholder was already gone; the call is then
    /// a no-op so a placeholder is never removed twice.
    pub fn complete_create(
        &mut self,
        placeholder: PlaceholderId,
        outcome: Result<Todo, MutationError>,
    ) -> bool {
        let Some(index) = self.position(EntryKey::Placeholder(placeholder)) else {
            return false;
        };
        match outcome {
            Ok(todo) => {
                // The change feed may have delivered the row first.
                let mut index = index;
                let duplicate = self
                    .position(EntryKey::Confirmed(todo.id))
                    .map(|at| (at, self.entries.remove(at)));
                let confirmed = match duplicate {
                    Some((at, Entry::Confirmed(mut existing))) => {
                        if at < index {
                            index -= 1;
                        }
                        existing.absorb(todo);
                        existing
                    }
                    _ => ConfirmedEntry::new(todo),
                };
                self.entries[index] = Entry::Confirmed(confirmed);
            }
            Err(error) => {
                self.entries.remove(index);
                self.set_error(&error);
            }
        }
        true
    }

    // ── Toggle ─────────────────────────────────────────────────────

    /// Show the negated value for `id` and hand back the request ticket.
    pub fn begin_toggle(&mut self, id: TodoId) -> Result<ToggleTicket, MutationError> {
        let ticket = match self.confirmed_mut(id) {
            Some(entry) => entry.toggle.begin_toggle(),
            None => return Err(MutationError::NotFoundOrForbidden),
        };
        self.clear_error();
        Ok(ticket)
    }

    /// Settle a toggle request. Responses for rows that are no longer
    /// listed are treated as stale.
    pub fn resolve_toggle(
        &mut self,
        id: TodoId,
        generation: Generation,
        outcome: Result<Todo, MutationError>,
    ) -> Resolution {
        let Some(entry) = self.confirmed_mut(id) else {
            return Resolution::Stale;
        };
        let resolution = match outcome {
            Ok(todo) => {
                let resolution = entry.toggle.resolve(generation, Ok(todo.completed));
                if !resolution.is_stale() {
                    entry.todo = todo;
                }
                resolution
            }
            Err(error) => entry.toggle.resolve(generation, Err(error)),
        };
        match &resolution {
            Resolution::Reverted { error, .. } => self.set_error(error),
            Resolution::Confirmed { .. } => self.clear_error(),
            Resolution::Stale => {}
        }
        resolution
    }

    // ── Delete ─────────────────────────────────────────────────────

    /// Hide `id` until the service answers.
    ///
    /// Returns false when the row is not listed here. The delete still goes
    /// out: an admin may remove rows owned by someone else, and only the
    /// service decides whether that is allowed.
    pub fn begin_remove(&mut self, id: TodoId) -> bool {
        self.clear_error();
        let Some(index) = self.position(EntryKey::Confirmed(id)) else {
            return false;
        };
        if let Entry::Confirmed(entry) = self.entries.remove(index) {
            self.removed.insert(id, (index, entry));
        }
        true
    }

    /// Settle a delete started with [`TodoList::begin_remove`].
    ///
    /// `hidden` is what `begin_remove` returned. Only a row hidden by this
    /// delete is put back on failure.
    pub fn complete_remove(&mut self, id: TodoId, hidden: bool, outcome: Result<(), MutationError>) {
        let restore = if hidden { self.removed.remove(&id) } else { None };
        match outcome {
            Ok(()) => self.clear_error(),
            Err(error) => {
                if let Some((index, entry)) = restore {
                    let index = index.min(self.entries.len());
                    self.entries.insert(index, Entry::Confirmed(entry));
                }
                self.set_error(&error);
            }
        }
    }

    /// Whether `id` is listed or hidden by a delete in flight.
    pub fn tracks(&self, id: TodoId) -> bool {
        self.removed.contains_key(&id) || self.position(EntryKey::Confirmed(id)).is_some()
    }

    // ── Change feed ────────────────────────────────────────────────

    /// Apply a pushed change. Returns true when the caller should reload.
    pub fn apply_change(&mut self, change: TodoChange) -> bool {
        match change {
            TodoChange::Upserted { todo } => {
                if let Some((_, hidden)) = self.removed.get_mut(&todo.id) {
                    hidden.absorb(todo);
                } else if let Some(entry) = self.confirmed_mut(todo.id) {
                    entry.absorb(todo);
                } else {
                    self.entries.insert(0, Entry::Confirmed(ConfirmedEntry::new(todo)));
                }
                false
            }
            TodoChange::Deleted { id, .. } => {
                self.removed.remove(&id);
                if let Some(index) = self.position(EntryKey::Confirmed(id)) {
                    self.entries.remove(index);
                }
                false
            }
            TodoChange::Invalidated => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use donelist_common::types::UserId;

    use super::*;

    fn todo(title: &str, completed: bool) -> Todo {
        let now = Utc::now();
        Todo {
            id: TodoId::new_v4(),
            owner_id: UserId::new_v4(),
            title: title.into(),
            completed,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn placeholder_keys_render_as_temp_ids() {
        let mut list = TodoList::default();
        let first = list.begin_create("a").expect("valid title");
        let second = list.begin_create("b").expect("valid title");

        assert_eq!(first.placeholder.to_string(), "temp-1");
        assert_eq!(second.placeholder.to_string(), "temp-2");
        assert!(first.placeholder.to_string().parse::<TodoId>().is_err());
    }

    #[test]
    fn begin_create_appends_a_busy_placeholder_with_trimmed_title() {
        let existing = todo("existing", false);
        let mut list = TodoList::new(vec![existing.clone()]);

        let pending = list.begin_create("  Buy milk ").expect("valid title");

        assert_eq!(pending.title, "Buy milk");
        let snapshot = list.snapshot();
        assert_eq!(snapshot.items.len(), 2);
        let last = &snapshot.items[1];
        assert_eq!(last.key, EntryKey::Placeholder(pending.placeholder));
        assert_eq!(last.title, "Buy milk");
        assert!(!last.completed);
        assert!(last.busy);
    }

    #[test]
    fn blank_title_changes_nothing_but_the_error() {
        let mut list = TodoList::new(vec![todo("a", false)]);
        let before = list.keys();

        let error = list.begin_create("   ").expect_err("blank title must be rejected");

        assert!(matches!(error, MutationError::ValidationFailed(_)));
        assert_eq!(list.keys(), before);
        assert_eq!(list.last_error(), Some("Todo title cannot be empty."));
    }

    #[test]
    fn confirmed_create_replaces_placeholder_in_place() {
        let mut list = TodoList::new(vec![todo("a", false)]);
        let pending = list.begin_create("new").expect("valid title");
        list.begin_create("later").expect("valid title");
        let confirmed = todo("new", false);

        assert!(list.complete_create(pending.placeholder, Ok(confirmed.clone())));

        let keys = list.keys();
        assert_eq!(keys.len(), 3);
        assert_eq!(keys[1], EntryKey::Confirmed(confirmed.id));
        assert!(!keys.contains(&EntryKey::Placeholder(pending.placeholder)));
    }

    #[test]
    fn failed_create_removes_placeholder_and_surfaces_error() {
        let mut list = TodoList::default();
        let pending = list.begin_create("new").expect("valid title");

        list.complete_create(pending.placeholder, Err(MutationError::network("refused")));

        assert!(list.is_empty());
        assert_eq!(list.last_error(), Some("Could not reach the server. Please try again."));
    }

    #[test]
    fn placeholder_is_removed_at_most_once() {
        let mut list = TodoList::default();
        let pending = list.begin_create("new").expect("valid title");
        let confirmed = todo("new", false);

        assert!(list.complete_create(pending.placeholder, Ok(confirmed.clone())));
        assert!(!list.complete_create(pending.placeholder, Err(MutationError::Forbidden)));

        assert_eq!(list.keys(), vec![EntryKey::Confirmed(confirmed.id)]);
        assert_eq!(list.last_error(), None);
    }

    #[test]
    fn create_confirmation_dedupes_row_already_pushed_by_feed() {
        let mut list = TodoList::default();
        let pending = list.begin_create("new").expect("valid title");
        let confirmed = todo("new", false);

        list.apply_change(TodoChange::Upserted { todo: confirmed.clone() });
        list.complete_create(pending.placeholder, Ok(confirmed.clone()));

        assert_eq!(list.keys(), vec![EntryKey::Confirmed(confirmed.id)]);
    }

    #[test]
    fn toggle_on_unknown_row_fails_without_touching_the_list() {
        let mut list = TodoList::new(vec![todo("a", false)]);
        let before = list.snapshot();

        let error = list.begin_toggle(TodoId::new_v4()).expect_err("unknown id");

        assert_eq!(error, MutationError::NotFoundOrForbidden);
        assert_eq!(list.snapshot(), before);
    }

    #[test]
    fn reverted_toggle_sets_error_and_confirmed_clears_it() {
        let row = todo("a", false);
        let mut list = TodoList::new(vec![row.clone()]);

        let ticket = list.begin_toggle(row.id).expect("listed row");
        list.resolve_toggle(row.id, ticket.generation, Err(MutationError::NotFoundOrForbidden));
        assert_eq!(list.last_error(), Some("That todo is no longer available to you."));
        assert!(!list.snapshot().items[0].completed);

        let ticket = list.begin_toggle(row.id).expect("listed row");
        let mut server_row = row.clone();
        server_row.completed = true;
        list.resolve_toggle(row.id, ticket.generation, Ok(server_row));
        assert_eq!(list.last_error(), None);
        assert!(list.snapshot().items[0].completed);
    }

    #[test]
    fn failed_remove_restores_row_at_original_index() {
        let rows = vec![todo("a", false), todo("b", false), todo("c", false)];
        let mut list = TodoList::new(rows.clone());

        assert!(list.begin_remove(rows[1].id));
        assert_eq!(list.len(), 2);
        list.complete_remove(rows[1].id, true, Err(MutationError::Forbidden));

        assert_eq!(list.keys()[1], EntryKey::Confirmed(rows[1].id));
        assert_eq!(list.last_error(), Some("You do not have permission to do that."));
    }

    #[test]
    fn restore_index_is_clamped_when_list_shrank() {
        let rows = vec![todo("a", false), todo("b", false), todo("c", false)];
        let mut list = TodoList::new(rows.clone());

        assert!(list.begin_remove(rows[2].id));
        list.apply_change(TodoChange::Deleted { id: rows[0].id, owner_id: rows[0].owner_id });
        list.complete_remove(rows[2].id, true, Err(MutationError::network("reset")));

        assert_eq!(list.keys(), vec![EntryKey::Confirmed(rows[1].id), EntryKey::Confirmed(rows[2].id)]);
    }

    #[test]
    fn remove_of_unlisted_row_hides_nothing_and_restores_nothing() {
        let rows = vec![todo("a", false)];
        let mut list = TodoList::new(rows.clone());
        let foreign = TodoId::new_v4();

        assert!(!list.begin_remove(foreign));
        assert!(!list.tracks(foreign));
        list.complete_remove(foreign, false, Err(MutationError::NotFoundOrForbidden));

        assert_eq!(list.keys(), vec![EntryKey::Confirmed(rows[0].id)]);
        assert_eq!(list.last_error(), Some("That todo is no longer available to you."));
    }

    #[test]
    fn repeated_remove_does_not_restore_the_first_hide() {
        let rows = vec![todo("a", false), todo("b", false)];
        let mut list = TodoList::new(rows.clone());

        assert!(list.begin_remove(rows[0].id));
        assert!(!list.begin_remove(rows[0].id));
        list.complete_remove(rows[0].id, false, Err(MutationError::NotFoundOrForbidden));
        assert_eq!(list.keys(), vec![EntryKey::Confirmed(rows[1].id)]);
        assert!(list.tracks(rows[0].id));

        list.complete_remove(rows[0].id, true, Ok(()));
        assert!(!list.tracks(rows[0].id));
        assert_eq!(list.last_error(), None);
    }

    #[test]
    fn starting_toggle_or_remove_clears_previous_error() {
        let rows = vec![todo("a", false), todo("b", false)];
        let mut list = TodoList::new(rows.clone());

        list.set_error(&MutationError::Forbidden);
        list.begin_toggle(rows[0].id).expect("listed row");
        assert_eq!(list.last_error(), None);

        list.set_error(&MutationError::network("reset"));
        assert!(list.begin_remove(rows[1].id));
        assert_eq!(list.last_error(), None);
    }

    #[test]
    fn failed_toggle_start_keeps_its_own_error_path() {
        let mut list = TodoList::new(vec![todo("a", false)]);
        list.set_error(&MutationError::Forbidden);

        list.begin_toggle(TodoId::new_v4()).expect_err("unknown id");

        assert_eq!(list.last_error(), Some("You do not have permission to do that."));
    }

    #[test]
    fn upsert_overrides_pending_prediction() {
        let row = todo("a", false);
        let mut list = TodoList::new(vec![row.clone()]);
        let ticket = list.begin_toggle(row.id).expect("listed row");

        let mut pushed = row.clone();
        pushed.completed = false;
        pushed.title = "renamed".into();
        list.apply_change(TodoChange::Upserted { todo: pushed });

        let view = list.view(EntryKey::Confirmed(row.id)).expect("row stays listed");
        assert!(!view.completed);
        assert!(!view.busy);
        assert_eq!(view.title, "renamed");

        let mut late = row.clone();
        late.completed = true;
        assert!(list.resolve_toggle(row.id, ticket.generation, Ok(late)).is_stale());
        assert!(!list.snapshot().items[0].completed);
    }

    #[test]
    fn upsert_for_unknown_row_is_prepended() {
        let mut list = TodoList::new(vec![todo("old", false)]);
        let fresh = todo("fresh", false);

        assert!(!list.apply_change(TodoChange::Upserted { todo: fresh.clone() }));

        assert_eq!(list.keys()[0], EntryKey::Confirmed(fresh.id));
    }

    #[test]
    fn invalidation_requests_a_reload() {
        let mut list = TodoList::default();
        assert!(list.apply_change(TodoChange::Invalidated));
    }

    #[test]
    fn reload_keeps_placeholders_and_hidden_rows() {
        let rows = vec![todo("a", false), todo("b", false)];
        let mut list = TodoList::new(rows.clone());
        let pending = list.begin_create("draft").expect("valid title");
        assert!(list.begin_remove(rows[0].id));

        let added = todo("from elsewhere", true);
        list.replace_all(vec![added.clone(), rows[0].clone(), rows[1].clone()]);

        assert_eq!(list.keys(), vec![
            EntryKey::Confirmed(added.id),
            EntryKey::Confirmed(rows[1].id),
            EntryKey::Placeholder(pending.placeholder),
        ]);
    }

    #[test]
    fn reload_applies_server_values_to_pending_toggles() {
        let row = todo("a", false);
        let mut list = TodoList::new(vec![row.clone()]);
        let ticket = list.begin_toggle(row.id).expect("listed row");

        list.replace_all(vec![row.clone()]);

        let view = list.view(EntryKey::Confirmed(row.id)).expect("row stays listed");
        assert!(!view.completed);
        assert!(!view.busy);
        assert!(list.resolve_toggle(row.id, ticket.generation, Ok(row)).is_stale());
    }

    #[test]
    fn snapshot_serializes_keys_as_strings() {
        let mut list = TodoList::default();
        list.begin_create("x").expect("valid title");

        let value = serde_json::to_value(list.snapshot()).expect("snapshot should serialize");

        assert_eq!(value["items"][0]["key"], "temp-1");
        assert_eq!(value["items"][0]["busy"], true);
    }
}
