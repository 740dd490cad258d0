//! Test doubles for the dispatch layer and the flow client.

use super::{DispatchError, Transport};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// Transport that answers from a fixed table and records every call.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: HashMap<String, Result<Value, DispatchError>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl ScriptedTransport {
    /// Answer `url` with `response`. Unrouted URLs fail as transport errors.
    pub fn route(mut self, url: &str, response: Result<Value, DispatchError>) -> Self {
        self.routes.insert(url.to_string(), response);
        self
    }

    pub fn called_urls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    pub fn bodies(&self) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, body)| body.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, DispatchError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), body.clone()));
        self.routes.get(url).cloned().unwrap_or_else(|| {
            Err(DispatchError::Transport {
                url: url.to_string(),
                reason: "no route".to_string(),
            })
        })
    }
}

/// A flow run response carrying `text` at the result path.
pub fn flow_response(text: Value) -> Value {
    json!({"outputs": [{"outputs": [{"results": {"text": {"text": text}}}]}]})
}

/// Run URL of the flow called `name` on the test host.
pub fn run_url(name: &str) -> String {
    format!("http://langflow:7860/api/v1/run/{}", name)
}

/// One request as received by [`CannedServer`].
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl ReceivedRequest {
    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

type Responder = dyn Fn(&str, &str) -> (u16, &'static str) + Send + Sync;

/// Local HTTP/1.1 server answering every request from a fixed function of
/// method and path. Each connection serves one request and is closed.
pub struct CannedServer {
    base_url: String,
    received: Arc<Mutex<Vec<ReceivedRequest>>>,
}

impl CannedServer {
    pub async fn start<F>(respond: F) -> Self
    where
        F: Fn(&str, &str) -> (u16, &'static str) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let received = Arc::new(Mutex::new(Vec::new()));
        let respond: Arc<Responder> = Arc::new(respond);

        let log = Arc::clone(&received);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let log = Arc::clone(&log);
                let respond = Arc::clone(&respond);
                tokio::spawn(async move {
                    let _ = serve_one(stream, &log, respond.as_ref()).await;
                });
            }
        });

        Self { base_url, received }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn requests(&self) -> Vec<ReceivedRequest> {
        self.received.lock().unwrap().clone()
    }
}

async fn serve_one(
    stream: TcpStream,
    log: &Mutex<Vec<ReceivedRequest>>,
    respond: &Responder,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((key, value)) = line.split_once(':') {
            headers.push((key.trim().to_string(), value.trim().to_string()));
        }
    }

    let length = headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).await?;

    let (status, reply) = respond(&method, &path);
    log.lock().unwrap().push(ReceivedRequest {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&body).to_string(),
    });

    let response = format!(
        "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reply.len(),
        reply
    );
    let mut stream = reader.into_inner();
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}
