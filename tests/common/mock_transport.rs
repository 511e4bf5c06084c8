//! Scripted stream transport for event stream integration tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::StreamExt;

use leilao_lib::stream::{ChunkStream, StreamTransport, TransportError};

type ChunkSender = mpsc::UnboundedSender<Result<Vec<u8>, TransportError>>;

/// A transport whose connections are driven by the test.
///
/// Every `open` creates a fresh in-memory connection; chunks pushed with
/// [`MockStreamTransport::send`] go to the most recent one.
#[derive(Clone, Default)]
pub struct MockStreamTransport {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    opens: AtomicUsize,
    urls: Mutex<Vec<String>>,
    last_event_ids: Mutex<Vec<Option<String>>>,
    current: Mutex<Option<ChunkSender>>,
    failures: Mutex<VecDeque<TransportError>>,
}

impl MockStreamTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(&self) -> Arc<dyn StreamTransport> {
        Arc::new(self.clone())
    }

    /// The next `open` calls fail with these errors, in order.
    pub fn fail_next_opens(&self, errors: impl IntoIterator<Item = TransportError>) {
        self.inner
            .failures
            .lock()
            .expect("failures lock")
            .extend(errors);
    }

    pub fn opens(&self) -> usize {
        self.inner.opens.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.inner.urls.lock().expect("urls lock").clone()
    }

    /// `Last-Event-ID` passed to each `open`, in order.
    pub fn last_event_ids(&self) -> Vec<Option<String>> {
        self.inner
            .last_event_ids
            .lock()
            .expect("last event ids lock")
            .clone()
    }

    /// Push raw bytes to the live connection. Returns false when none is open.
    pub fn send(&self, chunk: impl AsRef<[u8]>) -> bool {
        let current = self.inner.current.lock().expect("current lock");
        match current.as_ref() {
            Some(tx) => tx.unbounded_send(Ok(chunk.as_ref().to_vec())).is_ok(),
            None => false,
        }
    }

    /// Push one complete event frame.
    pub fn send_event(&self, kind: &str, data: &str) -> bool {
        self.send(format!("event: {kind}\ndata: {data}\n\n"))
    }

    /// Fail the live connection mid-stream.
    pub fn break_stream(&self, message: &str) -> bool {
        let current = self.inner.current.lock().expect("current lock");
        match current.as_ref() {
            Some(tx) => tx
                .unbounded_send(Err(TransportError::Stream(message.to_string())))
                .is_ok(),
            None => false,
        }
    }

    /// End the live connection as if the server closed it.
    pub fn end_stream(&self) {
        self.inner.current.lock().expect("current lock").take();
    }

    /// Wait until `open` has been called at least `count` times.
    pub async fn wait_for_opens(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.opens() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("timed out waiting for stream opens");
    }
}

#[async_trait]
impl StreamTransport for MockStreamTransport {
    async fn open(
        &self,
        url: &str,
        last_event_id: Option<&str>,
    ) -> Result<ChunkStream, TransportError> {
        self.inner.urls.lock().expect("urls lock").push(url.to_string());
        self.inner
            .last_event_ids
            .lock()
            .expect("last event ids lock")
            .push(last_event_id.map(str::to_string));

        let failure = self.inner.failures.lock().expect("failures lock").pop_front();
        if let Some(error) = failure {
            self.inner.opens.fetch_add(1, Ordering::SeqCst);
            return Err(error);
        }

        let (tx, rx) = mpsc::unbounded();
        *self.inner.current.lock().expect("current lock") = Some(tx);
        self.inner.opens.fetch_add(1, Ordering::SeqCst);
        Ok(rx.boxed())
    }
}
