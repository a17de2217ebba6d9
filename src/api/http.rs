//! HTTP adapter - `ANY /api/{*path}` into the dispatcher

use axum::{
    body::to_bytes,
    extract::{FromRequest, Multipart, Path, Query, Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::TypedError;

use super::connection::{Connection, SessionChange, Transport};
use super::cookie;
use super::dispatcher::Reply;
use super::state::Server;

const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Writes JSON responses and applies session cookie changes
#[derive(Debug, Clone)]
pub struct HttpReply {
    cookie_name: String,
    max_age_secs: u64,
}

impl HttpReply {
    pub fn new(cookie_name: impl Into<String>, max_age_secs: u64) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            max_age_secs,
        }
    }

    fn with_cookie(&self, connection: &Connection, mut response: Response) -> Response {
        let cookie = match connection.session_change() {
            Some(SessionChange::Set(session)) => {
                cookie::set(&self.cookie_name, session.id(), self.max_age_secs)
            }
            Some(SessionChange::Cleared) => cookie::clear(&self.cookie_name),
            None => return response,
        };

        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => warn!("Refusing to write malformed session cookie: {}", e),
        }

        response
    }
}

impl Reply for HttpReply {
    type Output = Response;

    fn respond(&self, connection: &Connection, payload: Value) -> Response {
        self.with_cookie(connection, (StatusCode::OK, Json(payload)).into_response())
    }

    fn fail(&self, connection: &Connection, error: TypedError) -> Response {
        self.with_cookie(connection, error.into_response())
    }
}

/// Resolve the route, collect params, attach the session and dispatch
pub async fn handle_action(
    State(server): State<Server>,
    Path(path): Path<String>,
    request: Request,
) -> Response {
    let method = request.method().clone();
    let session = server.session_from_headers(request.headers()).await;
    let reply = HttpReply::new(
        server.sessions.cookie_name(),
        server.sessions.ttl().as_secs(),
    );
    let connection_id = Uuid::new_v4().to_string();

    let Some((action, route_params)) = server.registry.resolve_http(&method, &path) else {
        let requested = format!("{} /{}", method, path);
        let mut connection =
            Connection::new(connection_id, Transport::Http, Map::new(), server.sessions.clone());

        return server
            .dispatcher
            .handle(None, &requested, &mut connection, &reply)
            .await;
    };

    let (raw_params, rejected) = match collect_params(request).await {
        Ok(mut params) => {
            params.extend(route_params);
            (params, None)
        }
        Err(error) => {
            debug!(action = action.name(), "Rejected request body: {}", error);
            (route_params, Some(error))
        }
    };

    let mut connection = Connection::new(
        connection_id,
        Transport::Http,
        raw_params,
        server.sessions.clone(),
    )
    .with_session(session);

    if let Some(error) = rejected {
        return server.dispatcher.reject(&action, &connection, error, &reply);
    }

    server
        .dispatcher
        .handle(Some(&action), action.name(), &mut connection, &reply)
        .await
}

/// Query string params, overlaid by body params for non-GET requests
async fn collect_params(request: Request) -> Result<Map<String, Value>, TypedError> {
    let mut params = parse_query(request.uri())?;

    if request.method() != Method::GET && request.method() != Method::HEAD {
        params.extend(parse_body(request).await?);
    }

    Ok(params)
}

fn parse_query(uri: &axum::http::Uri) -> Result<Map<String, Value>, TypedError> {
    let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(uri)
        .map_err(|e| TypedError::precondition(format!("Invalid query string: {}", e)))?;

    Ok(into_params(pairs))
}

fn into_params(pairs: Vec<(String, String)>) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect()
}

async fn parse_body(request: Request) -> Result<Map<String, Value>, TypedError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        return parse_multipart(request).await;
    }

    if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(pairs) = Form::<Vec<(String, String)>>::from_request(request, &())
            .await
            .map_err(|e| TypedError::precondition(format!("Invalid form body: {}", e)))?;

        return Ok(into_params(pairs));
    }

    let bytes = to_bytes(request.into_body(), MAX_BODY_BYTES)
        .await
        .map_err(|e| TypedError::precondition(format!("Failed to read request body: {}", e)))?;

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }

    let is_json = content_type.is_empty()
        || content_type.starts_with("application/json")
        || content_type.contains("+json");

    if !is_json {
        return Err(TypedError::precondition(format!(
            "Unsupported content type '{}'",
            content_type
        )));
    }

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(TypedError::precondition("JSON body must be an object")),
        Err(e) => Err(TypedError::precondition(format!("Invalid JSON body: {}", e))),
    }
}

/// Every named part becomes a string param; file parts are read as text
async fn parse_multipart(request: Request) -> Result<Map<String, Value>, TypedError> {
    let invalid = |e: &dyn std::fmt::Display| {
        TypedError::precondition(format!("Invalid multipart body: {}", e))
    };

    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| invalid(&e))?;
    let mut params = Map::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| invalid(&e))? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        let text = field.text().await.map_err(|e| invalid(&e))?;
        params.insert(name, Value::String(text));
    }

    Ok(params)
}
