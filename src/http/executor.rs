use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::http::builder::{HeaderPolicy, build_wire_request};
use crate::http::client::Transport;
use crate::state::item::ItemId;
use crate::state::request::RequestDocument;
use crate::state::result::{ExecutionResult, Outcome};

pub const CANCELLED_MESSAGE: &str = "cancelled";

#[derive(Debug)]
pub enum ExecutionEvent {
    Finished {
        request_id: ItemId,
        result: ExecutionResult,
    },
}

/// Runs requests through a transport and records every attempt as an
/// [`ExecutionResult`]. Nothing escapes as an error: assembly failures,
/// transport failures and cancellation all come back as `Outcome::Failure`.
#[derive(Debug, Clone)]
pub struct ExecutionRecorder<T> {
    transport: T,
    header_policy: HeaderPolicy,
}

impl<T: Transport> ExecutionRecorder<T> {
    pub fn new(transport: T, header_policy: HeaderPolicy) -> Self {
        Self { transport, header_policy }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn execute(&self, doc: &RequestDocument) -> ExecutionResult {
        self.execute_with_cancel(doc, &CancellationToken::new()).await
    }

    pub async fn execute_with_cancel(
        &self,
        doc: &RequestDocument,
        cancel: &CancellationToken,
    ) -> ExecutionResult {
        let wire = match build_wire_request(doc, self.header_policy) {
            Ok(wire) => wire,
            Err(err) => {
                tracing::warn!(event = "execute.assembly_failed", request = %doc.id(), error = %err);
                return ExecutionResult::immediate_failure(err.to_string());
            }
        };
        if cancel.is_cancelled() {
            return ExecutionResult::immediate_failure(CANCELLED_MESSAGE);
        }

        let body = doc.outgoing_body().map(Bytes::copy_from_slice);
        if body.is_some() && !wire.method.allows_body() {
            tracing::warn!(
                event = "execute.unusual_body",
                request = %doc.id(),
                method = wire.method.as_str(),
                "sending a body with a method that does not usually carry one"
            );
        }
        tracing::info!(
            event = "execute.start",
            request = %doc.id(),
            method = wire.method.as_str(),
            url = %wire.url,
            body_bytes = body.as_ref().map_or(0, Bytes::len),
        );

        let start = Utc::now();
        let outcome = tokio::select! {
            res = self.transport.send(&wire, body) => match res {
                Ok(response) => Outcome::Success {
                    body: response.body.to_vec(),
                    response: response.head,
                },
                Err(err) => Outcome::failure(err.message),
            },
            _ = cancel.cancelled() => Outcome::failure(CANCELLED_MESSAGE),
        };
        let result = ExecutionResult::new(start, Utc::now(), outcome);

        let elapsed_ms = result.elapsed().num_milliseconds();
        match result.outcome() {
            Outcome::Success { response, body } => tracing::info!(
                event = "execute.finish",
                request = %doc.id(),
                status = response.status,
                size = body.len(),
                elapsed_ms,
            ),
            Outcome::Failure { message } => tracing::warn!(
                event = "execute.failed",
                request = %doc.id(),
                error = %message,
                elapsed_ms,
            ),
        }
        result
    }
}

/// Execute `snapshot` and deliver the result on `tx`. The document is owned, so
/// later edits to the original never reach an in-flight send.
pub async fn execute_and_send<T: Transport>(
    recorder: Arc<ExecutionRecorder<T>>,
    snapshot: RequestDocument,
    tx: UnboundedSender<ExecutionEvent>,
    cancel: CancellationToken,
) {
    let result = recorder.execute_with_cancel(&snapshot, &cancel).await;
    let _ = tx.send(ExecutionEvent::Finished {
        request_id: snapshot.id(),
        result,
    });
}

pub fn spawn_execution<T: Transport + 'static>(
    recorder: Arc<ExecutionRecorder<T>>,
    snapshot: RequestDocument,
    tx: UnboundedSender<ExecutionEvent>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(execute_and_send(recorder, snapshot, tx, cancel))
}
