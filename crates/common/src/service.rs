// The Remote Mutation Service contract.
//
// Implemented in-process by the relay's store and over HTTP by the client's
// transport. Every call carries the caller's session explicitly; services
// must re-authorize on each call and fail closed.

use std::future::Future;

use crate::{
    error::MutationError,
    types::{Session, Todo, TodoId},
};

pub trait TodoService: Send + Sync + 'static {
    /// Todos owned by the caller, newest first.
    fn list(
        &self,
        session: &Session,
    ) -> impl Future<Output = Result<Vec<Todo>, MutationError>> + Send;

    /// Create a todo owned by the caller.
    ///
    /// Errors: `Unauthenticated`, `ValidationFailed`.
    fn create(
        &self,
        session: &Session,
        title: &str,
    ) -> impl Future<Output = Result<Todo, MutationError>> + Send;

    /// Negate `completed` in place and return the canonical row.
    ///
    /// Not idempotent: every successful call flips the value, so callers
    /// must not retry a timed-out toggle blindly.
    ///
    /// Errors: `Unauthenticated`, `NotFoundOrForbidden`.
    fn toggle(
        &self,
        session: &Session,
        id: TodoId,
    ) -> impl Future<Output = Result<Todo, MutationError>> + Send;

    /// Delete a todo. Privileged callers only.
    ///
    /// Errors: `Unauthenticated`, `Forbidden`, `NotFoundOrForbidden`.
    fn delete(
        &self,
        session: &Session,
        id: TodoId,
    ) -> impl Future<Output = Result<(), MutationError>> + Send;
}
