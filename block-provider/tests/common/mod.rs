//! Test doubles for the backends: a fake command line tool replaying canned
//! output, and a fake json-rpc server on a unix domain socket.

#![allow(dead_code)]

use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::{
    fs,
    os::unix::fs::{symlink, PermissionsExt},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tempfile::TempDir;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::UnixListener,
    task::JoinHandle,
};

const FAKE_TOOL: &str = r#"#!/bin/sh
dir=$(dirname "$0")
printf '%s\n' "$*" >> "$dir/calls"
if [ -f "$dir/stdout" ]; then cat "$dir/stdout"; fi
if [ -f "$dir/stderr" ]; then cat "$dir/stderr" >&2; fi
if [ -f "$dir/status" ]; then exit "$(cat "$dir/status")"; fi
exit 0
"#;

/// The script is written once and linked into every fake tool directory,
/// an executable still open for writing can't be spawned.
static SCRIPT: Lazy<(TempDir, PathBuf)> = Lazy::new(|| {
    let dir = tempfile::tempdir().expect("script dir");
    let path = dir.path().join("fake-tool");
    fs::write(&path, FAKE_TOOL).expect("write script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
        .expect("chmod script");
    (dir, path)
});

/// A command line tool which records its arguments and prints the output
/// set with `reply`.
pub struct FakeTool {
    dir: TempDir,
    path: PathBuf,
}

impl FakeTool {
    pub fn new(name: &str) -> Self {
        let dir = tempfile::tempdir().expect("tool dir");
        let path = dir.path().join(name);
        symlink(&SCRIPT.1, &path).expect("link tool");
        Self {
            dir,
            path,
        }
    }

    pub fn path(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    /// Output and exit status of every following invocation.
    pub fn reply(&self, stdout: &str, stderr: &str, status: i32) {
        let dir = self.dir.path();
        fs::write(dir.join("stdout"), stdout).expect("write stdout");
        fs::write(dir.join("stderr"), stderr).expect("write stderr");
        fs::write(dir.join("status"), status.to_string())
            .expect("write status");
    }

    /// Arguments of each invocation so far, joined by spaces.
    pub fn calls(&self) -> Vec<String> {
        read_lines(&self.dir.path().join("calls"))
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .map(|text| text.lines().map(String::from).collect())
        .unwrap_or_default()
}

pub type RpcResult = Result<Value, (i32, String)>;

/// A json-rpc server answering every request with the reply of `handler`.
/// Connections closed without a request, as made by the reachability check
/// of the client, are ignored.
pub struct FakeRpc {
    dir: TempDir,
    calls: Arc<Mutex<Vec<(String, Value)>>>,
    server: JoinHandle<()>,
}

impl FakeRpc {
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&str, &Value) -> RpcResult + Send + Sync + 'static,
    {
        let dir = tempfile::tempdir().expect("socket dir");
        let listener =
            UnixListener::bind(dir.path().join("spdk.sock")).expect("bind");
        let calls = Arc::new(Mutex::new(Vec::new()));

        let recorded = calls.clone();
        let server = tokio::spawn(async move {
            loop {
                let (mut stream, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => return,
                };
                let mut buf = Vec::new();
                if stream.read_to_end(&mut buf).await.is_err() || buf.is_empty()
                {
                    continue;
                }

                let request: Value =
                    serde_json::from_slice(&buf).expect("request json");
                let method = request["method"].as_str().unwrap_or_default();
                let params = request["params"].clone();
                recorded
                    .lock()
                    .unwrap()
                    .push((method.to_string(), params.clone()));

                let reply = match handler(method, &params) {
                    Ok(result) => json!({
                        "jsonrpc": "2.0",
                        "id": request["id"],
                        "result": result,
                    }),
                    Err((code, message)) => json!({
                        "jsonrpc": "2.0",
                        "id": request["id"],
                        "error": { "code": code, "message": message },
                    }),
                };
                let reply = serde_json::to_vec(&reply).expect("reply json");
                let _ = stream.write_all(&reply).await;
                let _ = stream.shutdown().await;
            }
        });

        Self {
            dir,
            calls,
            server,
        }
    }

    /// Server answering every method with a `true` result.
    pub fn ok() -> Self {
        Self::start(|_, _| Ok(Value::Bool(true)))
    }

    pub fn socket(&self) -> String {
        self.dir.path().join("spdk.sock").to_string_lossy().into_owned()
    }

    /// Method and parameters of each request so far.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.calls().into_iter().map(|(method, _)| method).collect()
    }
}

impl Drop for FakeRpc {
    fn drop(&mut self) {
        self.server.abort();
    }
}
