use std::time::Duration;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::time::Instant;

use crate::{
    error::ConnectError,
    sse::frame::{Frame, FrameStream},
};

/// One opened event stream, read until it fails or ends.
///
/// Any received byte counts as activity, the stream is dead after `idle_timeout` without data.
#[derive(Debug)]
pub(crate) struct Connection<S> {
    frames: FrameStream<S>,
    idle_timeout: Duration,
}

impl<S, E> Connection<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    pub fn new(body: S, idle_timeout: Duration) -> Self {
        Self {
            frames: FrameStream::new(body),
            idle_timeout,
        }
    }

    /// Next json payload, `Ok(None)` when the body ended
    pub async fn next_payload(&mut self) -> Result<Option<serde_json::Value>, ConnectError> {
        loop {
            let deadline = self.frames.last_activity() + self.idle_timeout;

            match tokio::time::timeout_at(deadline, self.frames.next()).await {
                Ok(Some(Ok(Frame::Heartbeat(comment)))) => {
                    log::trace!("Received heartbeat {:?}", comment);
                }
                Ok(Some(Ok(Frame::Data(value)))) => return Ok(Some(value)),
                Ok(Some(Err(source))) => return Err(ConnectError::ConnectionLost { source }),
                Ok(None) => return Ok(None),
                Err(_) => {
                    // an incomplete line may have arrived meanwhile
                    if self.frames.last_activity() + self.idle_timeout > Instant::now() {
                        log::trace!("Idle deadline moved by partial data");
                        continue;
                    }

                    return Err(ConnectError::Timeout {
                        idle: self.idle_timeout,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use futures_util::stream::{self, BoxStream};
    use serde_json::json;
    use tokio::sync::mpsc;

    type Chunk = Result<Bytes, std::io::Error>;

    const IDLE: Duration = Duration::from_secs(35);

    fn channel_body() -> (mpsc::UnboundedSender<Chunk>, BoxStream<'static, Chunk>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let body = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|chunk| (chunk, rx))
        })
        .boxed();
        (tx, body)
    }

    fn chunk(data: &'static [u8]) -> Chunk {
        Ok(Bytes::from_static(data))
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeats_keep_connection_alive() {
        let (tx, body) = channel_body();
        let mut connection = Connection::new(body, IDLE);
        let start = Instant::now();

        tokio::spawn(async move {
            for _ in 0..5 {
                tokio::time::sleep(Duration::from_secs(30)).await;
                tx.send(chunk(b":ping\n")).unwrap();
            }
            tokio::time::sleep(Duration::from_secs(30)).await;
            tx.send(chunk(b"data: {\"type\": \"ping\", \"counter\": 6}\n"))
                .unwrap();
        });

        let payload = connection.next_payload().await.unwrap();

        assert_eq!(payload, Some(json!({"type": "ping", "counter": 6})));
        assert!(Instant::now() - start >= Duration::from_secs(180));
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_stream_times_out() {
        let (_tx, body) = channel_body();
        let mut connection = Connection::new(body, IDLE);
        let start = Instant::now();

        let err = connection.next_payload().await.unwrap_err();

        assert!(matches!(err, ConnectError::Timeout { idle } if idle == IDLE));
        let elapsed = Instant::now() - start;
        assert!(elapsed >= IDLE && elapsed < IDLE + Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_line_extends_deadline() {
        let (tx, body) = channel_body();
        let mut connection = Connection::new(body, IDLE);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(20)).await;
            tx.send(chunk(b"data: {\"a\"")).unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            tx.send(chunk(b": 1}\n")).unwrap();
        });

        let payload = connection.next_payload().await.unwrap();
        assert_eq!(payload, Some(json!({"a": 1})));
    }

    #[tokio::test]
    async fn test_malformed_payload_loses_connection() {
        let body = stream::iter(vec![chunk(b"data: {oops\n")]);
        let mut connection = Connection::new(body, IDLE);

        let err = connection.next_payload().await.unwrap_err();
        assert!(matches!(err, ConnectError::ConnectionLost { .. }));
    }

    #[tokio::test]
    async fn test_body_end() {
        let body = stream::iter(vec![chunk(b":hi\n")]);
        let mut connection = Connection::new(body, IDLE);

        assert!(connection.next_payload().await.unwrap().is_none());
    }
}
