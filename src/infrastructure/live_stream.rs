// Chunked NDJSON streaming of live updates
use crate::application::live_board::LiveUpdate;
use axum::body::Body;
use axum::http::{header, Response, StatusCode};
use axum::response::IntoResponse;
use bytes::{BufMut, Bytes, BytesMut};
use futures::stream::Stream;
use futures::StreamExt;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

/// Create a chunked NDJSON streaming response, one JSON document per line
pub fn ndjson_stream<S, T>(stream: S) -> Result<Response<Body>, StatusCode>
where
    S: Stream<Item = T> + Send + 'static,
    T: Serialize + Send + 'static,
{
    let byte_stream = stream.map(|item| serialize_line(&item));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(byte_stream))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

fn serialize_line<T: Serialize>(item: &T) -> Result<Bytes, std::io::Error> {
    let json = serde_json::to_vec(item)?;

    let mut line = BytesMut::with_capacity(json.len() + 1);
    line.put_slice(&json);
    line.put_u8(b'\n');
    Ok(line.freeze())
}

/// Follow a live update channel. Followers that fall behind skip the
/// updates they missed instead of ending the stream.
pub fn follow_updates(rx: broadcast::Receiver<LiveUpdate>) -> impl Stream<Item = LiveUpdate> {
    let mut updates = BroadcastStream::new(rx);
    async_stream::stream! {
        while let Some(item) = updates.next().await {
            match item {
                Ok(update) => yield update,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!("Live follower lagged, skipped {} updates", skipped);
                }
            }
        }
    }
}

pub fn stream_from_receiver(rx: broadcast::Receiver<LiveUpdate>) -> impl IntoResponse {
    match ndjson_stream(follow_updates(rx)) {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_line_is_newline_terminated() {
        let line = serialize_line(&json!({ "type": "occupancy", "count": 3 })).unwrap();
        assert!(line.ends_with(b"\n"));
        assert_eq!(line.iter().filter(|b| **b == b'\n').count(), 1);
    }

    #[tokio::test]
    async fn test_follow_updates() {
        let (tx, rx) = broadcast::channel(4);
        let updates = follow_updates(rx);

        tx.send(LiveUpdate::Occupancy { count: 7.0, label: "9:05".to_string() })
            .unwrap();
        drop(tx);

        let collected: Vec<LiveUpdate> = updates.collect().await;
        assert_eq!(
            collected,
            vec![LiveUpdate::Occupancy { count: 7.0, label: "9:05".to_string() }]
        );
    }

    #[tokio::test]
    async fn test_ndjson_body() {
        let items = futures::stream::iter(vec![json!({ "a": 1 }), json!({ "b": 2 })]);
        let response = ndjson_stream(items).unwrap();

        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/x-ndjson");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"{\"a\":1}\n{\"b\":2}\n");
    }
}
