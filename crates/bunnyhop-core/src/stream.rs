//! Streaming adapters so a large message body never has to sit fully in
//! memory (spec.md §4.8, §9 "stream backpressure").
//!
//! Both directions share one idea: a bounded [`tokio::sync::mpsc`] channel is
//! the backpressure mechanism. A slow consumer stalls the channel's reader
//! task (which stops asking the broker for more via `basic.qos`'s prefetch),
//! and a slow publisher source stalls the writer loop that drains it onto
//! the wire.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::io::StreamReader;

/// A chunked source for a published message body: anything that can be
/// driven as a `Stream` of byte chunks with a declared total size. Built
/// from an in-memory `Bytes` for small messages, or from an
/// `AsyncRead`-wrapping adapter for large ones.
pub struct BodySource {
    pub(crate) body_size: u64,
    pub(crate) chunks: Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>,
}

impl BodySource {
    /// Wrap a single in-memory buffer as a one-chunk source.
    #[must_use]
    pub fn from_bytes(body: Bytes) -> Self {
        let body_size = body.len() as u64;
        Self { body_size, chunks: Box::pin(futures::stream::once(async move { Ok(body) })) }
    }

    /// Wrap an already-chunked stream with a known total size. Callers
    /// reading from a file or another source can hand in their own chunker;
    /// `body_size` must match the sum of the yielded chunk lengths, since
    /// the header frame declares it up front and the receiver uses it to
    /// know when the content sequence ends.
    #[must_use]
    pub fn from_stream<St>(body_size: u64, chunks: St) -> Self
    where
        St: Stream<Item = std::io::Result<Bytes>> + Send + 'static,
    {
        Self { body_size, chunks: Box::pin(chunks) }
    }

    /// The declared total body size, sent in the content-header frame.
    #[must_use]
    pub fn body_size(&self) -> u64 {
        self.body_size
    }
}

/// Split a body into frame-sized chunks, each no larger than `frame_max`
/// minus the frame envelope, the way [`crate::publish::PublishChannel`]
/// serializes a `BodySource` onto the wire.
pub(crate) fn chunk_for_frame(mut bytes: Bytes, max_chunk: usize) -> Vec<Bytes> {
    if bytes.is_empty() {
        return Vec::new();
    }
    let mut chunks = Vec::with_capacity(bytes.len().div_ceil(max_chunk.max(1)));
    while !bytes.is_empty() {
        let take = bytes.len().min(max_chunk.max(1));
        chunks.push(bytes.split_to(take));
    }
    chunks
}

/// The consumer-side counterpart: a bounded channel of body chunks exposed
/// both as a [`Stream`] and, via [`tokio_util::io::StreamReader`], as an
/// [`tokio::io::AsyncRead`]. [`crate::consume::ConsumeChannel`]'s content
/// handler pushes chunks in as `basic.deliver`'s body frames arrive; the
/// channel's bounded capacity is the backpressure, the receiving task
/// naturally stalls on `send` once the reader falls behind.
pub struct DeliveryBody {
    receiver: mpsc::Receiver<std::io::Result<Bytes>>,
}

impl DeliveryBody {
    pub(crate) fn channel(high_water_mark: usize) -> (mpsc::Sender<std::io::Result<Bytes>>, Self) {
        let (tx, rx) = mpsc::channel(high_water_mark.max(1));
        (tx, Self { receiver: rx })
    }

    /// Expose this body as an [`tokio::io::AsyncRead`].
    #[must_use]
    pub fn into_async_read(self) -> StreamReader<Self, Bytes> {
        StreamReader::new(self)
    }
}

impl Stream for DeliveryBody {
    type Item = std::io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_for_frame_splits_on_the_boundary() {
        let chunks = chunk_for_frame(Bytes::from_static(b"abcdefghij"), 4);
        assert_eq!(chunks, vec![Bytes::from_static(b"abcd"), Bytes::from_static(b"efgh"), Bytes::from_static(b"ij")]);
    }

    #[test]
    fn chunk_for_frame_of_empty_body_yields_nothing() {
        assert!(chunk_for_frame(Bytes::new(), 10).is_empty());
    }

    #[tokio::test]
    async fn delivery_body_streams_chunks_in_order() {
        let (tx, body) = DeliveryBody::channel(4);
        tx.send(Ok(Bytes::from_static(b"a"))).await.unwrap();
        tx.send(Ok(Bytes::from_static(b"b"))).await.unwrap();
        drop(tx);

        let mut body = body;
        let first = futures::StreamExt::next(&mut body).await.unwrap().unwrap();
        let second = futures::StreamExt::next(&mut body).await.unwrap().unwrap();
        assert_eq!(first, Bytes::from_static(b"a"));
        assert_eq!(second, Bytes::from_static(b"b"));
        assert!(futures::StreamExt::next(&mut body).await.is_none());
    }
}
