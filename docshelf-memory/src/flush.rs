//! Hydration and the single-writer flush task of file-backed collections.
//!
//! Every mutation of a persistent collection enqueues a full snapshot while
//! the store's write lock is held, so the queue is in logical order. One task
//! per collection drains the queue, skipping straight to the newest snapshot
//! before each write; the last mutation is therefore always the last write.

use futures::future::{BoxFuture, FutureExt, Shared};
use mea::rwlock::RwLock;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use docshelf_core::{
    backend::PersistenceBackend,
    document::Document,
    error::{DocumentStoreError, DocumentStoreResult},
};

use crate::store::MemoryStore;

/// Outcome of a collection's hydration, resolved once and shared by every waiter.
pub(crate) type Readiness = Shared<BoxFuture<'static, DocumentStoreResult<()>>>;

/// Readiness of a collection that has nothing to load.
pub(crate) fn ready_now() -> Readiness {
    futures::future::ready(Ok(())).boxed().shared()
}

/// Loads the backend's snapshot into `store` on a background task.
pub(crate) fn spawn_hydration(
    collection: String,
    store: Arc<RwLock<MemoryStore>>,
    backend: Arc<dyn PersistenceBackend>,
) -> Readiness {
    tokio::spawn(hydrate(collection, store, backend))
        .map(|joined| {
            joined.unwrap_or_else(|err| {
                Err(DocumentStoreError::Persistence(format!("hydration task failed: {err}")))
            })
        })
        .boxed()
        .shared()
}

async fn hydrate(
    collection: String,
    store: Arc<RwLock<MemoryStore>>,
    backend: Arc<dyn PersistenceBackend>,
) -> DocumentStoreResult<()> {
    let documents = backend.load().await?;
    let mut store = store.write().await;
    let mut loaded = 0usize;

    for document in documents {
        match store.insert_document(document) {
            Ok(_) => loaded += 1,
            Err(err) => warn!(collection = %collection, error = %err, "skipping persisted document"),
        }
    }

    debug!(collection = %collection, documents = loaded, "hydrated collection");

    Ok(())
}

struct FlushRequest {
    sequence: u64,
    documents: Vec<Document>,
}

/// Handle to a collection's flush task. The task stops once the handle is dropped.
#[derive(Debug)]
pub(crate) struct FlushWriter {
    sender: mpsc::UnboundedSender<FlushRequest>,
    written: watch::Receiver<u64>,
    scheduled: AtomicU64,
}

impl FlushWriter {
    pub(crate) fn spawn(
        collection: String,
        backend: Arc<dyn PersistenceBackend>,
        ready: Readiness,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (written_tx, written) = watch::channel(0);

        tokio::spawn(run(collection, backend, ready, receiver, written_tx));

        Self {
            sender,
            written,
            scheduled: AtomicU64::new(0),
        }
    }

    /// Enqueues a snapshot. Callers hold the store's write lock.
    pub(crate) fn schedule(&self, documents: Vec<Document>) {
        let sequence = self.scheduled.fetch_add(1, Ordering::SeqCst) + 1;

        if self
            .sender
            .send(FlushRequest { sequence, documents })
            .is_err()
        {
            warn!(sequence, "flush writer has stopped, snapshot discarded");
        }
    }

    /// Waits until every snapshot scheduled so far has been written or discarded.
    pub(crate) async fn wait(&self) {
        let target = self.scheduled.load(Ordering::SeqCst);
        let mut written = self.written.clone();

        // An error means the task is gone and nothing more will be written.
        let _ = written.wait_for(|sequence| *sequence >= target).await;
    }
}

async fn run(
    collection: String,
    backend: Arc<dyn PersistenceBackend>,
    ready: Readiness,
    mut receiver: mpsc::UnboundedReceiver<FlushRequest>,
    written: watch::Sender<u64>,
) {
    // Writing before the file has been read would clobber it.
    let hydrated = ready.await;
    if let Err(err) = &hydrated {
        warn!(collection = %collection, error = %err, "hydration failed, flushes will be discarded");
    }

    while let Some(mut request) = receiver.recv().await {
        while let Ok(newer) = receiver.try_recv() {
            request = newer;
        }

        if hydrated.is_ok() {
            match backend.flush(&request.documents).await {
                Ok(()) => debug!(
                    collection = %collection,
                    sequence = request.sequence,
                    documents = request.documents.len(),
                    "flushed collection"
                ),
                Err(err) => warn!(
                    collection = %collection,
                    sequence = request.sequence,
                    error = %err,
                    "flush failed, snapshot discarded"
                ),
            }
        }

        written.send_replace(request.sequence);
    }
}
