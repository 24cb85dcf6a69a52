//! Unit tests of the client against a one-shot server.

use super::*;
use nix::errno::Errno;
use serde_json::json;
use std::{fs, io::ErrorKind, path::PathBuf};
use tokio::net::UnixListener;

/// Start a server on a socket unique to `name`, which answers the first
/// request with the bytes returned by `respond` and then goes away.
fn serve<F>(name: &str, respond: F) -> PathBuf
where
    F: FnOnce(Request) -> Vec<u8> + Send + 'static,
{
    let sock = PathBuf::from(format!("/tmp/jsonrpc-ut.sock.{}", name));
    let _ = fs::remove_file(&sock);
    let listener = UnixListener::bind(&sock).unwrap();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await.unwrap();
        let request: Request = serde_json::from_slice(&raw).unwrap();
        let reply = respond(request);
        stream.write_all(&reply).await.unwrap();
    });

    sock
}

async fn call_at<R>(sock: PathBuf, method: &str) -> Result<R, Error>
where
    R: 'static + DeserializeOwned + Send,
{
    let result = call(sock.to_str().unwrap(), method, Some(json!({}))).await;
    let _ = fs::remove_file(&sock);
    result
}

fn encode(response: Response) -> Vec<u8> {
    serde_json::to_vec(&response).unwrap()
}

fn success(result: Value) -> Vec<u8> {
    encode(Response {
        jsonrpc: Some(VERSION.to_string()),
        id: json!(REQUEST_ID),
        result: Some(result),
        error: None,
    })
}

#[tokio::test]
async fn request_and_result() {
    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Volume {
        name: String,
        size: i64,
        thin: bool,
    }

    let volume = Volume {
        name: "lvol0".to_string(),
        size: -4096,
        thin: true,
    };

    let sock = serve("request_and_result", |request| {
        assert_eq!(request.jsonrpc, "2.0");
        assert_eq!(request.id, 0);
        assert_eq!(request.method, "resize");

        // echo the volume back, grown and no longer thin
        let mut volume: Volume =
            serde_json::from_value(request.params.unwrap()).unwrap();
        volume.size = -volume.size;
        volume.thin = !volume.thin;
        success(serde_json::to_value(volume).unwrap())
    });

    let reply: Volume =
        call(sock.to_str().unwrap(), "resize", Some(&volume)).await.unwrap();
    let _ = fs::remove_file(&sock);

    assert_eq!(
        reply,
        Volume {
            name: "lvol0".to_string(),
            size: 4096,
            thin: false,
        }
    );
}

#[tokio::test]
async fn no_params() {
    let sock = serve("no_params", |request| {
        assert!(request.params.is_none());
        success(json!(["a", "b"]))
    });

    let reply: Vec<String> =
        call(sock.to_str().unwrap(), "list", None::<()>).await.unwrap();
    let _ = fs::remove_file(&sock);
    assert_eq!(reply, vec!["a", "b"]);
}

#[tokio::test]
async fn malformed_reply() {
    let sock = serve("malformed_reply", |_| {
        br#"{"id": 0, "jsonrpc": "2.0", result: {}"#.to_vec()
    });

    let result: Result<(), Error> = call_at(sock, "method").await;
    assert!(matches!(result, Err(Error::ParseError { .. })));
}

#[tokio::test]
async fn no_server() {
    let result: Result<(), Error> =
        call("/no/such/dir/spdk.sock", "method", None::<()>).await;

    match result {
        Err(Error::ConnectError {
            sock,
            source,
        }) => {
            assert_eq!(sock, "/no/such/dir/spdk.sock");
            assert_eq!(source.kind(), ErrorKind::NotFound);
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(connect("/no/such/dir/spdk.sock").await.is_err());
}

#[tokio::test]
async fn version_mismatch() {
    let sock = serve("version_mismatch", |_| {
        encode(Response {
            jsonrpc: Some("1.0".to_string()),
            id: json!(0),
            ..Default::default()
        })
    });

    let result: Result<(), Error> = call_at(sock, "method").await;
    assert!(matches!(result, Err(Error::InvalidVersion {})));
}

#[tokio::test]
async fn version_omitted() {
    let sock = serve("version_omitted", |_| {
        br#"{"id": 0, "result": "done"}"#.to_vec()
    });

    let result: String = call_at(sock, "method").await.unwrap();
    assert_eq!(result, "done");
}

#[tokio::test]
async fn reply_id_mismatch() {
    let sock = serve("reply_id_mismatch", |_| {
        encode(Response {
            jsonrpc: Some(VERSION.to_string()),
            id: json!("12"),
            result: Some(json!("done")),
            error: None,
        })
    });

    let result: Result<String, Error> = call_at(sock, "method").await;
    assert!(matches!(result, Err(Error::InvalidReplyId {})));
}

#[tokio::test]
async fn result_of_wrong_type() {
    let sock = serve("result_of_wrong_type", |_| success(json!("surprise")));

    let result: Result<(), Error> = call_at(sock, "method").await;
    assert!(matches!(result, Err(Error::ParseError { .. })));
}

#[tokio::test]
async fn result_omitted() {
    let sock = serve("result_omitted", |_| {
        encode(Response {
            jsonrpc: Some(VERSION.to_string()),
            id: json!(0),
            ..Default::default()
        })
    });

    let result: Result<(), Error> = call_at(sock, "method").await;
    result.unwrap();
}

#[tokio::test]
async fn error_object() {
    let sock = serve("error_object", |_| {
        encode(Response {
            jsonrpc: Some(VERSION.to_string()),
            id: json!(0),
            result: None,
            error: Some(RpcError {
                code: -(Errno::ENOENT as i32),
                message: "No such file or directory".to_string(),
                data: None,
            }),
        })
    });

    let error = call_at::<()>(sock, "method").await.unwrap_err();
    assert!(error.is_not_found());
    assert_eq!(error.errno(), Some(Errno::ENOENT));
    match error {
        Error::RpcError {
            code,
            raw,
            msg,
        } => {
            assert_eq!(code, RpcCode::NotFound);
            assert_eq!(raw, -2);
            assert_eq!(msg, "No such file or directory");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn error_codes() {
    assert_eq!(RpcCode::from_raw(-32700), RpcCode::ParseError);
    assert_eq!(RpcCode::from_raw(-32601), RpcCode::MethodNotFound);
    assert_eq!(RpcCode::from_raw(-32602), RpcCode::InvalidParams);
    assert_eq!(RpcCode::from_raw(-(Errno::ENXIO as i32)), RpcCode::NotFound);
    assert_eq!(
        RpcCode::from_raw(-(Errno::EEXIST as i32)),
        RpcCode::AlreadyExists
    );
    assert_eq!(RpcCode::from_raw(-(Errno::EBUSY as i32)), RpcCode::Busy);
    assert_eq!(
        RpcCode::from_raw(-(Errno::ENOSPC as i32)),
        RpcCode::InternalError
    );
    assert_eq!(RpcCode::from_raw(-32099), RpcCode::InternalError);
    for errno in [Errno::EPERM, Errno::EINVAL, Errno::ENOMEM] {
        assert_eq!(error::errno_of(-(errno as i32)), Some(errno));
        assert_eq!(RpcCode::from_raw(-(errno as i32)), RpcCode::InternalError);
    }
    assert_eq!(error::errno_of(-32099), None);
}
