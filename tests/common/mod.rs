#![allow(dead_code)]

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::field::{Field, Visit};
use tracing::{Dispatch, Event, Subscriber};
use tracing_subscriber::layer::{Context as LayerContext, Layer, SubscriberExt};
use waypost::{Config, Server};

// ── Log capture ───────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default)]
pub struct Record {
    pub message: String,
    pub fields: HashMap<String, String>,
}

/// Collects every event into memory.
#[derive(Clone, Default)]
pub struct Capture {
    records: Arc<Mutex<Vec<Record>>>,
}

impl Capture {
    pub fn dispatch(&self) -> Dispatch {
        Dispatch::new(tracing_subscriber::registry().with(self.clone()))
    }

    pub fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }

    /// `(uri, status)` of every per-request log record, in order.
    pub fn requests(&self) -> Vec<(String, String)> {
        self.records()
            .into_iter()
            .filter(|r| r.message == "request")
            .map(|r| (r.fields["uri"].clone(), r.fields["status"].clone()))
            .collect()
    }
}

impl<S: Subscriber> Layer<S> for Capture {
    fn on_event(&self, event: &Event<'_>, _ctx: LayerContext<'_, S>) {
        let mut visitor = RecordVisitor(Record::default());
        event.record(&mut visitor);
        self.records.lock().unwrap().push(visitor.0);
    }
}

struct RecordVisitor(Record);

impl Visit for RecordVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.fields.insert(field.name().to_owned(), value.to_owned());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let value = format!("{value:?}");
        if field.name() == "message" {
            self.0.message = value;
        } else {
            self.0.fields.insert(field.name().to_owned(), value);
        }
    }
}

// ── Server helpers ────────────────────────────────────────────────────────────

pub fn server(capture: &Capture) -> Server {
    Server::new(Config::new("127.0.0.1:0", "unused"), capture.dispatch())
}

/// Starts `server` and waits until it is bound.
pub async fn start(server: &Server) -> SocketAddr {
    server.on_start().unwrap();
    for _ in 0..200 {
        if let Some(addr) = server.listener_addr() {
            return addr;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("server never started, state = {}", server.state());
}

// ── Raw HTTP/1.1 client ───────────────────────────────────────────────────────

pub struct Reply {
    pub status: u16,
    pub body: String,
}

/// Sends one request on a fresh connection and reads until the server closes it.
pub async fn send(addr: SocketAddr, method: &str, path: &str) -> Reply {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "{method} {path} HTTP/1.1\r\nhost: localhost\r\nconnection: close\r\ncontent-length: 0\r\n\r\n"
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let text = String::from_utf8_lossy(&raw).into_owned();

    let status = text
        .split(' ')
        .nth(1)
        .and_then(|code| code.parse().ok())
        .unwrap_or_else(|| panic!("malformed response: {text:?}"));
    let body = text
        .split_once("\r\n\r\n")
        .map(|(_, body)| body.to_owned())
        .unwrap_or_default();
    Reply { status, body }
}

pub async fn get(addr: SocketAddr, path: &str) -> Reply {
    send(addr, "GET", path).await
}
