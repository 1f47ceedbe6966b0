// REST API for todos. Every route sits behind bearer auth; destructive
// routes additionally require the admin role.

pub mod todos;

use std::sync::Arc;

use axum::{
    extract::{Extension, Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use donelist_common::{error::MutationError, protocol::api::TODOS_PATH};

use crate::{
    auth::{
        jwt::JwtAccessTokenService,
        middleware::{require_bearer_auth, AuthenticatedUser},
    },
    error::{ErrorCode, RelayError},
    store::TodoStore,
};

#[derive(Clone)]
pub struct ApiState {
    pub store: TodoStore,
}

#[derive(Debug)]
pub struct ApiError(MutationError);

impl From<MutationError> for ApiError {
    fn from(error: MutationError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = ErrorCode::from(&self.0);
        match self.0 {
            MutationError::ValidationFailed(message) => RelayError::new(code, message),
            MutationError::Forbidden => RelayError::new(code, "caller lacks required role"),
            MutationError::NotFoundOrForbidden => RelayError::new(code, "todo not found"),
            MutationError::NetworkOrTimeout(detail) => {
                tracing::error!(detail = %detail, "todo api internal error");
                RelayError::from_code(code)
            }
            MutationError::Unauthenticated => RelayError::from_code(code),
        }
        .into_response()
    }
}

pub fn router(store: TodoStore, jwt_service: Arc<JwtAccessTokenService>) -> Router {
    let state = ApiState { store };
    let admin_layer = middleware::from_fn(require_admin_role);

    Router::new()
        .route(TODOS_PATH, get(todos::list_todos).post(todos::create_todo))
        .route("/v1/todos/{id}/toggle", post(todos::toggle_todo))
        .route("/v1/todos/{id}", delete(todos::delete_todo).route_layer(admin_layer))
        .with_state(state)
        .route_layer(middleware::from_fn_with_state(jwt_service, require_bearer_auth))
}

async fn require_admin_role(
    Extension(user): Extension<AuthenticatedUser>,
    request: Request,
    next: Next,
) -> Response {
    if !user.role.is_admin() {
        return ApiError::from(MutationError::Forbidden).into_response();
    }
    next.run(request).await
}
