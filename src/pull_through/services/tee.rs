//! Stream adapter that copies an upstream body into the object store.

use crate::pull_through::ports::{ByteStream, ObjectStore, ObjectWriter, UpstreamResponse};
use bytes::Bytes;
use futures::StreamExt;

/// Opens a finished object, treating store failures as a miss.
pub(crate) async fn open_cached<S>(store: &S, cache_key: &str) -> Option<ByteStream>
where
    S: ObjectStore + ?Sized,
{
    match store.get(cache_key).await {
        Ok(Some(body)) => {
            tracing::debug!(cache_key, "serving cached object");
            Some(body)
        }
        Ok(None) => None,
        Err(err) => {
            tracing::warn!(cache_key, error = %err, "object store read failed, falling back to upstream");
            None
        }
    }
}

/// Streams `response` to the caller while caching it under `cache_key`.
///
/// Returns the body and whether a cache write was started. When no writer
/// can be opened the upstream body is passed through unchanged.
pub(crate) async fn stream_and_cache<S>(
    store: &S,
    cache_key: &str,
    response: UpstreamResponse,
) -> (ByteStream, bool)
where
    S: ObjectStore + ?Sized,
{
    match store.create_writer(cache_key).await {
        Ok(writer) => (
            tee_into_store(
                response.body,
                writer,
                cache_key.to_owned(),
                response.content_length,
            ),
            true,
        ),
        Err(err) => {
            tracing::warn!(cache_key, error = %err, "could not open cache writer, serving uncached");
            (response.body, false)
        }
    }
}

/// Wraps `upstream` so every chunk handed to the consumer is also written to
/// `writer`.
///
/// The object is committed only when the upstream ends cleanly and, if
/// `expected_len` is known, the byte count matches it. Upstream errors,
/// length mismatches and an early drop by the consumer all discard the
/// partial object. Store failures are logged and stop the copy while the
/// consumer keeps receiving bytes.
pub(crate) fn tee_into_store(
    upstream: ByteStream,
    writer: Box<dyn ObjectWriter>,
    cache_key: String,
    expected_len: Option<u64>,
) -> ByteStream {
    let state = TeeState {
        upstream,
        writer: Some(writer),
        cache_key,
        expected_len,
        written: 0,
        finished: false,
    };
    futures::stream::unfold(state, next_chunk).boxed()
}

struct TeeState {
    upstream: ByteStream,
    writer: Option<Box<dyn ObjectWriter>>,
    cache_key: String,
    expected_len: Option<u64>,
    written: u64,
    finished: bool,
}

async fn next_chunk(mut tee: TeeState) -> Option<(std::io::Result<Bytes>, TeeState)> {
    if tee.finished {
        return None;
    }
    match tee.upstream.next().await {
        Some(Ok(chunk)) => {
            tee.written = tee
                .written
                .saturating_add(u64::try_from(chunk.len()).unwrap_or(u64::MAX));
            tee.write_through(chunk.clone()).await;
            Some((Ok(chunk), tee))
        }
        Some(Err(err)) => {
            tee.finished = true;
            tracing::warn!(cache_key = %tee.cache_key, error = %err, "upstream body failed");
            tee.discard().await;
            Some((Err(err), tee))
        }
        None => {
            tee.finish().await;
            None
        }
    }
}

impl TeeState {
    async fn write_through(&mut self, chunk: Bytes) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        if let Err(err) = writer.write(chunk).await {
            tracing::warn!(
                cache_key = %self.cache_key,
                error = %err,
                "cache write failed, continuing without caching"
            );
            self.discard().await;
        }
    }

    async fn discard(&mut self) {
        let Some(writer) = self.writer.take() else {
            return;
        };
        if let Err(err) = writer.abort().await {
            tracing::warn!(cache_key = %self.cache_key, error = %err, "failed to discard partial object");
        }
    }

    async fn finish(&mut self) {
        let Some(writer) = self.writer.take() else {
            return;
        };
        if let Some(expected) = self.expected_len.filter(|expected| *expected != self.written) {
            tracing::warn!(
                cache_key = %self.cache_key,
                expected,
                written = self.written,
                "upstream length mismatch, discarding partial object"
            );
            if let Err(err) = writer.abort().await {
                tracing::warn!(cache_key = %self.cache_key, error = %err, "failed to discard partial object");
            }
            return;
        }
        match writer.commit().await {
            Ok(()) => tracing::info!(cache_key = %self.cache_key, bytes = self.written, "cached upstream object"),
            Err(err) => tracing::warn!(cache_key = %self.cache_key, error = %err, "cache commit failed"),
        }
    }
}

impl Drop for TeeState {
    fn drop(&mut self) {
        if self.writer.is_some() {
            tracing::debug!(
                cache_key = %self.cache_key,
                written = self.written,
                "consumer dropped stream, discarding partial object"
            );
        }
    }
}
