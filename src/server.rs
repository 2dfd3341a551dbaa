// src/server.rs
// A small REST server exposing the local flashcard database over the same
// routes the remote API offers.

use std::io::Read;
use std::net::SocketAddr;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tiny_http::{Header, Method, Request, Response, Server};

use crate::deck::NewFlashcard;
use crate::review::Confidence;
use crate::storage::db::StoreError;
use crate::storage::FlashcardDb;

#[derive(Debug, Error)]
#[error("could not listen on {addr}: {reason}")]
pub struct BindError {
    pub addr: String,
    pub reason: String,
}

#[derive(Deserialize)]
struct ReviewBody {
    confidence: i64,
}

struct Reply {
    status: u16,
    body: Value,
}

impl Reply {
    fn ok(body: Value) -> Self {
        Reply { status: 200, body }
    }

    fn error(status: u16, detail: impl Into<String>) -> Self {
        Reply { status, body: json!({ "detail": detail.into() }) }
    }
}

impl From<StoreError> for Reply {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::CardNotFound(_) => Reply::error(404, "Flashcard not found"),
            other => {
                log::error!("Database failure while serving request: {}", other);
                Reply::error(500, "Internal server error")
            }
        }
    }
}

pub struct ApiServer {
    server: Server,
    db: Arc<FlashcardDb>,
    token: Option<String>,
}

impl ApiServer {
    /// Binds `addr` (e.g. `127.0.0.1:8080`; port 0 picks a free port).
    /// With a token set, every request must carry `Authorization: Bearer <token>`.
    pub fn bind(addr: &str, db: Arc<FlashcardDb>, token: Option<String>) -> Result<Self, BindError> {
        let server = Server::http(addr).map_err(|e| BindError {
            addr: addr.to_string(),
            reason: e.to_string(),
        })?;
        Ok(ApiServer { server, db, token })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Serves requests one at a time until the process ends.
    pub fn run(&self) {
        if let Some(addr) = self.local_addr() {
            log::info!("Serving flashcards on http://{}/", addr);
        }
        for request in self.server.incoming_requests() {
            self.handle(request);
        }
    }

    fn handle(&self, mut request: Request) {
        let method = request.method().clone();
        let url = request.url().to_string();
        let reply = self.route(&mut request, &method, &url);
        log::info!("{} {} -> {}", method, url, reply.status);

        let mut response = Response::from_string(reply.body.to_string()).with_status_code(reply.status);
        if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
            response = response.with_header(header);
        }
        if let Err(e) = request.respond(response) {
            log::warn!("Failed to send response for {}: {}", url, e);
        }
    }

    fn authorized(&self, request: &Request) -> bool {
        let Some(token) = &self.token else {
            return true;
        };
        request
            .headers()
            .iter()
            .find(|h| h.field.equiv("Authorization"))
            .and_then(|h| h.value.as_str().strip_prefix("Bearer "))
            .map_or(false, |given| given == token)
    }

    fn route(&self, request: &mut Request, method: &Method, url: &str) -> Reply {
        if !self.authorized(request) {
            return Reply::error(401, "Invalid token");
        }

        let (path, query) = url.split_once('?').unwrap_or((url, ""));
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        let result = match (method, segments.as_slice()) {
            (Method::Get, ["api", "flashcards"]) => self.list(query_param(query, "subject").as_deref()),
            (Method::Post, ["api", "flashcards"]) => self.create(request),
            (Method::Delete, ["api", "flashcards", id]) => self.delete(&decode(id)),
            (Method::Post, ["api", "flashcards", id, "review"]) => self.review(request, &decode(id)),
            (Method::Get, ["api", "study", "analytics"]) => self.analytics(),
            _ => return Reply::error(404, "Not Found"),
        };
        result.unwrap_or_else(Reply::from)
    }

    fn list(&self, subject: Option<&str>) -> Result<Reply, StoreError> {
        let cards = self.db.cards(subject)?;
        Ok(Reply::ok(json!(cards)))
    }

    fn create(&self, request: &mut Request) -> Result<Reply, StoreError> {
        let card = match read_json::<NewFlashcard>(request) {
            Ok(card) => card,
            Err(reply) => return Ok(reply),
        };
        match card.validate() {
            Ok(card) => Ok(Reply::ok(json!(self.db.insert(card)?))),
            Err(e) => Ok(Reply::error(422, e.to_string())),
        }
    }

    fn delete(&self, id: &str) -> Result<Reply, StoreError> {
        if self.db.remove(id)? {
            Ok(Reply::ok(json!({ "message": "Flashcard deleted" })))
        } else {
            Ok(Reply::error(404, "Flashcard not found"))
        }
    }

    fn review(&self, request: &mut Request, id: &str) -> Result<Reply, StoreError> {
        let body = match read_json::<ReviewBody>(request) {
            Ok(body) => body,
            Err(reply) => return Ok(reply),
        };
        let confidence = match Confidence::try_from(body.confidence) {
            Ok(c) => c,
            Err(e) => return Ok(Reply::error(422, e.to_string())),
        };
        let card = self.db.record_review(id, confidence)?;
        Ok(Reply::ok(json!({
            "message": "Review recorded",
            "times_reviewed": card.times_reviewed,
            "confidence_level": card.confidence_level,
        })))
    }

    fn analytics(&self) -> Result<Reply, StoreError> {
        let stats = self.db.summary()?;
        Ok(Reply::ok(json!({ "flashcard_stats": stats })))
    }
}

/// Largest request body accepted, in bytes.
const MAX_BODY_BYTES: usize = 64 * 1024;

fn read_json<T: for<'de> Deserialize<'de>>(request: &mut Request) -> Result<T, Reply> {
    let too_large = || Reply::error(413, format!("Request body exceeds {} bytes", MAX_BODY_BYTES));
    if request.body_length().map_or(false, |len| len > MAX_BODY_BYTES) {
        return Err(too_large());
    }

    let mut body = String::new();
    let limit = MAX_BODY_BYTES as u64 + 1;
    if let Err(e) = request.as_reader().take(limit).read_to_string(&mut body) {
        return Err(Reply::error(400, format!("Could not read body: {}", e)));
    }
    if body.len() > MAX_BODY_BYTES {
        return Err(too_large());
    }
    serde_json::from_str(&body).map_err(|e| Reply::error(422, e.to_string()))
}

fn decode(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

fn query_param(query: &str, key: &str) -> Option<String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| decode(&v.replace('+', " ")))
        .filter(|v| !v.is_empty())
}
