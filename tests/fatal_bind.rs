//! A bind failure ends the process, so it is checked from a child process:
//! the parent re-runs this test binary with only `taken_port_child` selected.

use std::process::Command;
use std::time::Duration;

use waypost::{Config, Server};

const CHILD_VAR: &str = "WAYPOST_FATAL_BIND_CHILD";

#[tokio::test]
async fn taken_port_child() {
    if std::env::var_os(CHILD_VAR).is_none() {
        return;
    }

    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = taken.local_addr().unwrap();
    let logger = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .finish();

    let server = Server::new(Config::new(addr.to_string(), ""), logger);
    server.on_start().unwrap();

    // The serve task exits the process long before this ends.
    tokio::time::sleep(Duration::from_secs(10)).await;
}

#[test]
fn bind_failure_logs_fatal_and_exits_with_status_1() {
    let output = Command::new(std::env::current_exe().unwrap())
        .args(["taken_port_child", "--exact", "--nocapture", "--test-threads=1"])
        .env(CHILD_VAR, "1")
        .output()
        .unwrap();

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(1), "child stderr:\n{stderr}");
    assert!(stderr.contains("failed to start server"), "child stderr:\n{stderr}");
    assert!(stderr.contains("fatal=true"), "child stderr:\n{stderr}");
    assert!(stderr.contains("127.0.0.1:"), "child stderr:\n{stderr}");
}
