//! SSE response body to record stream adapter.
//!
//! A reqwest response body arrives as arbitrarily sized byte chunks with
//! no respect for record boundaries. A background task feeds the chunks
//! through an [`SseDecoder`] and forwards each completed record over a
//! bounded channel, so the consumer sees whole records only.

use futures::StreamExt;
use reqwest::Response;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::sse_parser::{SseDecoder, SseRecord};

use super::error::{ClientError, Result};

/// Stream of decoded SSE records from one run.
pub type RunRecordStream = ReceiverStream<Result<SseRecord>>;

const RECORD_CHANNEL_CAPACITY: usize = 32;

/// Convert a streaming HTTP response into a stream of SSE records.
///
/// The stream ends when the body ends. A transport error mid-body is
/// yielded as the final item; whether an end without a terminal event is
/// an error is for the consumer to decide.
pub(crate) fn into_record_stream(response: Response) -> RunRecordStream {
    let (tx, rx) = mpsc::channel(RECORD_CHANNEL_CAPACITY);
    tokio::spawn(pump_records(response, tx));
    ReceiverStream::new(rx)
}

async fn pump_records(response: Response, tx: mpsc::Sender<Result<SseRecord>>) {
    let mut body = response.bytes_stream();
    let mut decoder = SseDecoder::new();

    while let Some(chunk) = body.next().await {
        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = tx.send(Err(ClientError::Http(e))).await;
                return;
            }
        };

        for record in decoder.push(&bytes) {
            if tx.send(Ok(record)).await.is_err() {
                // Receiver dropped; stop reading the body.
                return;
            }
        }
    }

    if !decoder.remainder().is_empty() {
        debug!(
            held_back = decoder.remainder().len(),
            "stream ended inside an unterminated sse record"
        );
    }
}
