//! A scripted stand-in for the API server, for tests that exercise real client calls.

use std::collections::VecDeque;
use std::convert::Infallible;
use std::sync::{Arc, Mutex, PoisonError};

use kube::client::Body;
use serde_json::{Value, json};

use crate::Client;

pub const NAMESPACE: &str = "default";

/// Answers requests in order from a queue of canned `(status, body)` pairs and records
/// every request as `METHOD /path`. An exhausted queue answers 500.
#[derive(Clone, Default)]
pub struct ScriptedServer {
    responses: Arc<Mutex<VecDeque<(u16, Value)>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl ScriptedServer {
    pub fn new(responses: impl IntoIterator<Item = (u16, Value)>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into_iter().collect())),
            requests: Default::default(),
        }
    }

    /// A client whose traffic goes to this server. Must be called inside a tokio runtime.
    pub fn client(&self) -> Client {
        let server = self.clone();
        let service = tower::service_fn(move |request: http::Request<Body>| {
            let response = server.respond(&request);
            async move { Ok::<_, Infallible>(response) }
        });
        Client::new("test", kube::Client::new(service, NAMESPACE))
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn respond(&self, request: &http::Request<Body>) -> http::Response<Body> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(format!("{} {}", request.method(), request.uri().path()));
        let (code, body) = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| (500, status(500, "InternalError")));
        let mut response = http::Response::new(Body::from(body.to_string().into_bytes()));
        *response.status_mut() =
            http::StatusCode::from_u16(code).unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);
        response
    }
}

/// A `meta/v1 Status` failure body.
pub fn status(code: u16, reason: &str) -> Value {
    json!({
        "kind": "Status",
        "apiVersion": "v1",
        "metadata": {},
        "status": "Failure",
        "message": format!("{reason} ({code})"),
        "reason": reason,
        "code": code
    })
}

pub fn not_found() -> (u16, Value) {
    (404, status(404, "NotFound"))
}

pub fn conflict() -> (u16, Value) {
    (409, status(409, "Conflict"))
}
