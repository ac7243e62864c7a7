use super::transport::{HttpRequest, HttpResponse, Method, Transport};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory backend: canned responses keyed by method and path, plus a log
/// of everything sent.
#[derive(Clone, Default)]
pub struct FakeTransport {
    routes: Arc<Mutex<HashMap<(Method, String), HttpResponse>>>,
    sent: Arc<Mutex<Vec<HttpRequest>>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, method: Method, path: &str, status: u16, body: Value) {
        self.respond_raw(method, path, status, body.to_string().into_bytes());
    }

    pub fn respond_raw(&self, method: Method, path: &str, status: u16, body: Vec<u8>) {
        self.routes
            .lock()
            .expect("routes lock")
            .insert((method, path.to_string()), HttpResponse { status, body });
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.sent.lock().expect("sent lock").clone()
    }
}

impl Transport for FakeTransport {
    fn send(&self, req: &HttpRequest) -> Result<HttpResponse, String> {
        self.sent.lock().expect("sent lock").push(req.clone());
        self.routes
            .lock()
            .expect("routes lock")
            .get(&(req.method, req.path.clone()))
            .cloned()
            .ok_or_else(|| format!("connection refused: {} {}", req.method.as_str(), req.path))
    }
}
