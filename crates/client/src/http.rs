// `TodoService` over the relay's REST API.

use donelist_common::{
    error::MutationError,
    protocol::api::{
        todo_path, toggle_path, CreateTodoRequest, ErrorCode, ErrorEnvelope, TodoEnvelope,
        TodosEnvelope, TODOS_PATH,
    },
    service::TodoService,
    types::{Session, Todo, TodoId},
};
use reqwest::{Client, RequestBuilder, Response};
use tracing::debug;
use url::Url;

#[derive(Debug, Clone)]
pub struct HttpTodoService {
    client: Client,
    base_url: Url,
}

impl HttpTodoService {
    pub fn new(base_url: Url) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, MutationError> {
        self.base_url
            .join(path)
            .map_err(|error| MutationError::network(format!("invalid endpoint `{path}`: {error}")))
    }

    /// The bearer token is required; an absent token fails closed before
    /// any request is built.
    fn authorized(
        &self,
        request: RequestBuilder,
        session: &Session,
    ) -> Result<RequestBuilder, MutationError> {
        match session.access_token.as_deref() {
            Some(token) if !token.trim().is_empty() => Ok(request.bearer_auth(token)),
            _ => Err(MutationError::Unauthenticated),
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, MutationError> {
        let response = request
            .send()
            .await
            .map_err(|error| MutationError::network(error.to_string()))?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }
}

async fn error_from_response(response: Response) -> MutationError {
    let status = response.status().as_u16();
    match response.json::<ErrorEnvelope>().await {
        Ok(envelope) => {
            let code = ErrorCode::parse(&envelope.error.code)
                .unwrap_or_else(|| ErrorCode::from_status(status));
            debug!(
                status,
                code = code.as_str(),
                request_id = envelope.error.request_id.as_deref().unwrap_or("-"),
                "relay rejected request"
            );
            code.into_mutation_error(envelope.error.message)
        }
        Err(_) => {
            let code = ErrorCode::from_status(status);
            code.into_mutation_error(format!("HTTP {status}: {}", code.default_message()))
        }
    }
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, MutationError> {
    response
        .json::<T>()
        .await
        .map_err(|error| MutationError::network(format!("malformed response body: {error}")))
}

impl TodoService for HttpTodoService {
    async fn list(&self, session: &Session) -> Result<Vec<Todo>, MutationError> {
        let request = self.authorized(self.client.get(self.endpoint(TODOS_PATH)?), session)?;
        let response = self.send(request).await?;
        Ok(decode::<TodosEnvelope>(response).await?.todos)
    }

    async fn create(&self, session: &Session, title: &str) -> Result<Todo, MutationError> {
        let body = CreateTodoRequest { title: title.to_string() };
        let request =
            self.authorized(self.client.post(self.endpoint(TODOS_PATH)?).json(&body), session)?;
        let response = self.send(request).await?;
        Ok(decode::<TodoEnvelope>(response).await?.todo)
    }

    async fn toggle(&self, session: &Session, id: TodoId) -> Result<Todo, MutationError> {
        let request =
            self.authorized(self.client.post(self.endpoint(&toggle_path(id))?), session)?;
        let response = self.send(request).await?;
        Ok(decode::<TodoEnvelope>(response).await?.todo)
    }

    async fn delete(&self, session: &Session, id: TodoId) -> Result<(), MutationError> {
        let request =
            self.authorized(self.client.delete(self.endpoint(&todo_path(id))?), session)?;
        self.send(request).await?;
        Ok(())
    }
}
