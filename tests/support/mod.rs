//! Shared test helpers: a recording transport with queued responses.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use bitrix_mcp::client::{ClientError, Params, Transport};
use bitrix_mcp::tools::AppContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Call,
    GetAll,
}

/// One request seen by the stub.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub kind: CallKind,
    pub method: String,
    pub params: Value,
}

/// Transport that records every request and answers from a queue.
/// An empty queue answers with an empty response.
#[derive(Default)]
pub struct StubTransport {
    calls: Mutex<Vec<RecordedCall>>,
    responses: Mutex<VecDeque<Result<Vec<Value>, ClientError>>>,
}

impl StubTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A stub whose first request returns `items`.
    pub fn returning(items: Vec<Value>) -> Arc<Self> {
        let stub = Self::new();
        stub.push_ok(items);
        stub
    }

    /// A stub whose first request fails with `err`.
    pub fn failing(err: ClientError) -> Arc<Self> {
        let stub = Self::new();
        stub.push_err(err);
        stub
    }

    pub fn push_ok(&self, items: Vec<Value>) {
        self.responses.lock().unwrap().push_back(Ok(items));
    }

    pub fn push_err(&self, err: ClientError) {
        self.responses.lock().unwrap().push_back(Err(err));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// The single recorded request; panics unless exactly one was made.
    pub fn only_call(&self) -> RecordedCall {
        let calls = self.calls();
        assert_eq!(calls.len(), 1, "expected exactly one call, got {:?}", calls);
        calls.into_iter().next().unwrap()
    }

    fn answer(
        &self,
        kind: CallKind,
        method: &str,
        params: Params,
    ) -> Result<Vec<Value>, ClientError> {
        self.calls.lock().unwrap().push(RecordedCall {
            kind,
            method: method.to_string(),
            params: Value::Object(params),
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn call(&self, method: &str, params: Params) -> Result<Vec<Value>, ClientError> {
        self.answer(CallKind::Call, method, params)
    }

    async fn get_all(&self, method: &str, params: Params) -> Result<Vec<Value>, ClientError> {
        self.answer(CallKind::GetAll, method, params)
    }
}

/// An application context bound to `stub`.
pub fn context(stub: &Arc<StubTransport>) -> AppContext {
    AppContext::new(stub.clone())
}

pub fn api_error(code: &str, description: &str) -> ClientError {
    ClientError::Api {
        code: code.to_string(),
        description: description.to_string(),
    }
}
