// donelist-client: optimistic todo list reconciled against a mutation service.

pub mod config;
pub mod controller;
pub mod http;
pub mod list;
pub mod reconciler;
pub mod session;

pub use controller::{ControllerConfig, PendingCreation, TodoController};
pub use list::{EntryKey, ListSnapshot, PlaceholderId, TodoList, TodoView};
pub use reconciler::{Generation, Resolution, ToggleReconciler, ToggleState};
pub use session::{SessionProvider, SharedSession};
