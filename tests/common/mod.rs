//! Shared fixtures: a scripted transport and audit feed page builders.
#![allow(dead_code)]

use cato_audit_feed::audit_api::{HttpRequest, HttpResponse, Transport, TransportError};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays canned responses in order and records every request it sees.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, status: u16, body: impl Into<String>) -> Self {
        self.push(Ok(HttpResponse::new(status, body)))
    }

    pub fn respond_json(self, body: Value) -> Self {
        self.respond(200, body.to_string())
    }

    pub fn fail(self, message: &str) -> Self {
        self.push(Err(TransportError(message.to_string())))
    }

    pub fn rate_limited(mut self, times: usize) -> Self {
        for _ in 0..times {
            self = self.respond(429, "Too Many Requests");
        }
        self
    }

    fn push(self, response: Result<HttpResponse, TransportError>) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// GraphQL variables of every request sent
    pub fn variables(&self) -> Vec<Value> {
        self.requests()
            .iter()
            .map(|r| {
                let body: Value = serde_json::from_str(&r.body).unwrap();
                body["variables"].clone()
            })
            .collect()
    }
}

impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError("script exhausted".to_string())))
    }
}

/// One `fieldsMap` record stamped with `time`
pub fn record(time: i64, fields: Value) -> Value {
    json!({ "time": time, "fieldsMap": fields })
}

/// A complete `auditFeed` response body
pub fn page(records: Vec<Value>, marker: &str, has_more: bool) -> Value {
    json!({
        "data": {
            "auditFeed": {
                "marker": marker,
                "fetchedCount": records.len(),
                "hasMore": has_more,
                "accounts": [{ "id": "4242", "records": records }]
            }
        }
    })
}

/// `count` simple records starting at `first_id`
pub fn records(first_id: usize, count: usize) -> Vec<Value> {
    (first_id..first_id + count)
        .map(|id| {
            record(
                1_700_000_000_000 + id as i64,
                json!({ "event.id": id.to_string(), "event_type": "Login" }),
            )
        })
        .collect()
}
