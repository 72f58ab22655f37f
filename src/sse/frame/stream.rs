use std::{pin::Pin, task::Poll};

use bytes::Bytes;
use futures_util::{ready, Stream, StreamExt};
use tokio::time::Instant;

use super::{buffer::LineBuffer, decode_line, Frame, FrameError};

/// Decoded frame stream over a chunked byte stream, like an HTTP response body.
///
/// Chunk boundaries never change the output: bytes after the last line terminator of a chunk are
/// kept and prefixed to the next chunk. An invalid line yields one error item, reading may
/// continue after it. The trailing incomplete line is dropped when the byte stream ends.
#[derive(Debug)]
pub struct FrameStream<S> {
    inner: S,
    buffer: LineBuffer,
    last_activity: Instant,
}

impl<S> FrameStream<S> {
    /// Wrap a byte stream
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            buffer: LineBuffer::default(),
            last_activity: Instant::now(),
        }
    }

    /// When bytes were last received, or when the stream was created if none yet
    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }
}

impl<S, E> Stream for FrameStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Item = Result<Frame, FrameError>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        loop {
            while let Some(line) = self.buffer.next_line() {
                match decode_line(&line) {
                    Ok(Some(frame)) => return Poll::Ready(Some(Ok(frame))),
                    Ok(None) => continue,
                    Err(e) => {
                        log::trace!("Decode line failed: {}", e);
                        return Poll::Ready(Some(Err(FrameError::Decode { source: e })));
                    }
                }
            }

            match ready!(self.inner.poll_next_unpin(cx)) {
                Some(Ok(chunk)) => {
                    log::trace!("Received {} bytes", chunk.len());
                    self.last_activity = Instant::now();
                    self.buffer.put(&chunk);
                }
                Some(Err(e)) => {
                    return Poll::Ready(Some(Err(FrameError::Transport { source: e.into() })));
                }
                None => {
                    if self.buffer.pending() > 0 {
                        log::trace!(
                            "Stream ended, drop {} bytes of incomplete line",
                            self.buffer.pending()
                        );
                    }
                    return Poll::Ready(None);
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use futures_util::stream;
    use serde_json::json;

    type Chunk = Result<Bytes, std::io::Error>;

    static SAMPLE: &[u8] = b":connected\n\
        data: {\"type\":\"system\",\"subType\":\"STREAM_START\",\"code\":200,\"message\":\"Stream Starting.\"}\r\n\
        \r\n\
        data: {\"type\":\"ping\",\"counter\":1}\r\
        \r\
        :keep-alive\n\
        event: message\n\
        data: {\"type\":\"presence\",\"subType\":\"enterLocation\",\"text\":\"caf\xc3\xa9 \xe2\x98\x95\"}\n\n";

    fn chunks_of(parts: Vec<&[u8]>) -> impl Stream<Item = Chunk> + Unpin {
        stream::iter(
            parts
                .into_iter()
                .map(|p| Ok(Bytes::copy_from_slice(p)))
                .collect::<Vec<Chunk>>(),
        )
    }

    async fn collect(parts: Vec<&[u8]>) -> Vec<Frame> {
        FrameStream::new(chunks_of(parts))
            .map(|item| item.unwrap())
            .collect()
            .await
    }

    fn expected() -> Vec<Frame> {
        vec![
            Frame::Heartbeat("connected".to_string()),
            Frame::Data(json!({
                "type": "system",
                "subType": "STREAM_START",
                "code": 200,
                "message": "Stream Starting.",
            })),
            Frame::Data(json!({"type": "ping", "counter": 1})),
            Frame::Heartbeat("keep-alive".to_string()),
            Frame::Data(json!({
                "type": "presence",
                "subType": "enterLocation",
                "text": "café ☕",
            })),
        ]
    }

    #[tokio::test]
    async fn test_single_chunk() {
        assert_eq!(collect(vec![SAMPLE]).await, expected());
    }

    #[tokio::test]
    async fn test_every_two_way_split_gives_same_frames() {
        for at in 0..=SAMPLE.len() {
            let (a, b) = SAMPLE.split_at(at);
            assert_eq!(collect(vec![a, b]).await, expected(), "split at {}", at);
        }
    }

    #[tokio::test]
    async fn test_byte_by_byte_gives_same_frames() {
        let parts = SAMPLE.chunks(1).collect();
        assert_eq!(collect(parts).await, expected());
    }

    #[tokio::test]
    async fn test_uneven_chunks_give_same_frames() {
        for size in [2, 3, 7, 13, 64] {
            let parts = SAMPLE.chunks(size).collect();
            assert_eq!(collect(parts).await, expected(), "chunk size {}", size);
        }
    }

    #[tokio::test]
    async fn test_invalid_json_is_reported_and_next_frame_still_decodes() {
        let mut frames = FrameStream::new(chunks_of(vec![
            &b"data: {\"type\": \"pi"[..],
            &b"ng\",}\n"[..],
            &b"data: {\"type\": \"ping\", \"counter\": 2}\n"[..],
        ]));

        let err = frames.next().await.unwrap().unwrap_err();
        assert!(matches!(err, FrameError::Decode { .. }));

        let frame = frames.next().await.unwrap().unwrap();
        assert_eq!(frame, Frame::Data(json!({"type": "ping", "counter": 2})));

        assert!(frames.next().await.is_none());
    }

    #[tokio::test]
    async fn test_transport_error_is_reported() {
        let parts: Vec<Chunk> = vec![
            Ok(Bytes::from_static(b":hi\n")),
            Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "payload truncated",
            )),
        ];
        let mut frames = FrameStream::new(stream::iter(parts));

        assert_eq!(
            frames.next().await.unwrap().unwrap(),
            Frame::Heartbeat("hi".to_string())
        );
        assert!(matches!(
            frames.next().await.unwrap().unwrap_err(),
            FrameError::Transport { .. }
        ));
    }

    #[tokio::test]
    async fn test_incomplete_last_line_is_dropped() {
        let frames = collect(vec![&b"data: {\"a\": 1}\ndata: {\"b\":"[..]]).await;
        assert_eq!(frames, vec![Frame::Data(json!({"a": 1}))]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_activity_tracks_chunks() {
        let created = Instant::now();
        let parts: Vec<Chunk> = vec![Ok(Bytes::from_static(b"data: {\"a\": 1}\n"))];
        let delayed = stream::iter(parts).then(|chunk| async move {
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            chunk
        });
        let mut frames = FrameStream::new(Box::pin(delayed));

        assert_eq!(frames.last_activity(), created);
        frames.next().await.unwrap().unwrap();
        let moved = frames.last_activity() - created;
        assert!(moved >= std::time::Duration::from_secs(5));
        assert!(moved < std::time::Duration::from_secs(6));
    }
}
