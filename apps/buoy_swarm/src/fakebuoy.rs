//! Scripted buoy server for tests.
//!
//! Answers each call through the supplied script (`None` = never reply)
//! and hands back everything it saw when the client side goes away.

use buoyproto::{CallFrame, ReplyFrame};
use buoysock::JsonReader;
use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;

pub fn spawn<S, F>(stream: S, script: F) -> JoinHandle<Vec<(String, Value)>>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    F: Fn(&str, &Value) -> Option<Value> + Send + 'static,
{
    tokio::spawn(async move {
        let (rd, mut wr) = tokio::io::split(stream);
        let mut reader = JsonReader::new(rd);
        let mut seen = Vec::new();

        while let Ok(Some(call)) = reader.read_frame::<CallFrame>().await {
            seen.push((call.name.clone(), call.params.clone()));
            let Some(body) = script(&call.name, &call.params) else {
                continue;
            };
            let reply = ReplyFrame {
                seq: call.seq,
                body,
            };
            let mut line = serde_json::to_string(&reply).expect("encode reply");
            line.push('\n');
            if wr.write_all(line.as_bytes()).await.is_err() {
                break;
            }
        }

        seen
    })
}

/// Script where every operation succeeds.
pub fn happy(name: &str, _params: &Value) -> Option<Value> {
    match name {
        buoyproto::REQ_JOIN => Some(json!({"peerId": "peer-0"})),
        buoyproto::REQ_FETCH_ROOMS => Some(json!([{"id": "lobby"}, {"id": "annex"}])),
        _ => Some(json!({})),
    }
}
