//! Client side of json-rpc 2.0 (https://www.jsonrpc.org/specification)
//! over a unix domain socket.
//!
//! Every call opens its own connection: the request is written, the write
//! half is shut down and the reply is read until the server closes.

pub mod error;
#[cfg(test)]
mod test;

use self::error::{Error, RpcCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::UnixStream,
};
use tracing::trace;

/// Protocol version sent with, and expected in, every message.
pub const VERSION: &str = "2.0";
/// Id of every request, there is a single request per connection.
pub const REQUEST_ID: u64 = 0;

/// Request sent to the server.
#[derive(Debug, Serialize, Deserialize)]
pub struct Request<'a> {
    pub jsonrpc: &'a str,
    pub id: u64,
    pub method: &'a str,
    /// Omitted altogether when the method takes no arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Reply of the server. Exactly one of `result` and `error` is expected,
/// a missing version is tolerated.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

/// Error object of a failed call.
#[derive(Debug, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

async fn open(sock_path: &str) -> Result<UnixStream, Error> {
    UnixStream::connect(sock_path)
        .await
        .map_err(|source| Error::ConnectError {
            sock: sock_path.to_string(),
            source,
        })
}

/// Check that a json-rpc server is listening on the socket. The connection
/// is closed again without sending a request.
pub async fn connect(sock_path: &str) -> Result<(), Error> {
    drop(open(sock_path).await?);
    trace!("json-rpc server at {} is reachable", sock_path);
    Ok(())
}

/// Invoke `method` with `args` and decode its result as `R`. A method
/// without a result decodes as json `null`, e.g. into `()`.
pub async fn call<A, R>(
    sock_path: &str,
    method: &str,
    args: Option<A>,
) -> Result<R, Error>
where
    A: Serialize,
    R: 'static + DeserializeOwned + Send,
{
    let request = Request {
        jsonrpc: VERSION,
        id: REQUEST_ID,
        method,
        params: args.map(serde_json::to_value).transpose()?,
    };
    let payload = serde_json::to_vec(&request)?;
    trace!(
        "json-rpc request to {}: {}",
        sock_path,
        String::from_utf8_lossy(&payload)
    );

    let reply = exchange(sock_path, &payload).await?;
    decode_reply(&reply)
}

/// Send `payload` on a new connection and collect everything the server
/// writes back before closing it.
async fn exchange(
    sock_path: &str,
    payload: &[u8],
) -> Result<Vec<u8>, Error> {
    let mut stream = open(sock_path).await?;
    stream.write_all(payload).await?;
    // the end of the request is signalled by closing our side
    stream.shutdown().await?;

    let mut reply = Vec::new();
    stream.read_to_end(&mut reply).await?;
    Ok(reply)
}

fn decode_reply<R: DeserializeOwned>(raw: &[u8]) -> Result<R, Error> {
    trace!("json-rpc reply: {}", String::from_utf8_lossy(raw));

    let Response {
        jsonrpc,
        id,
        result,
        error,
    } = serde_json::from_slice(raw)?;

    match jsonrpc.as_deref() {
        None | Some(VERSION) => (),
        Some(_) => return Err(Error::InvalidVersion {}),
    }
    if id.as_u64() != Some(REQUEST_ID) {
        return Err(Error::InvalidReplyId {});
    }
    if let Some(RpcError {
        code,
        message,
        ..
    }) = error
    {
        return Err(Error::RpcError {
            code: RpcCode::from_raw(code),
            raw: code,
            msg: message,
        });
    }

    Ok(serde_json::from_value(result.unwrap_or(Value::Null))?)
}
