use futures_util::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

/// Debounces events as long as it is busy.
///
/// Instead of waiting for a fixed period of time, events are coalesced for as long as the handler
/// is working on the previous one. Only the most recent event pushed during that time is handled
/// next, once the running handler finished. A running handler is never cancelled.
pub struct BusyDebouncer<T>
where
    T: Send + 'static,
{
    inner: Inner<T>,
}

struct Inner<T>
where
    T: Send + 'static,
{
    notify: Arc<Notify>,
    data: Arc<Mutex<Option<T>>>,
}

impl<T> Default for Inner<T>
where
    T: Send + 'static,
{
    fn default() -> Self {
        Self {
            notify: Default::default(),
            data: Default::default(),
        }
    }
}

impl<T> BusyDebouncer<T>
where
    T: Send + 'static,
{
    /// Create a new debouncer, handling events with exclusive access to `context`.
    pub fn new<C, F>(context: C, handler: F) -> Self
    where
        C: Send + 'static,
        for<'a> F: Fn(&'a mut C, T) -> BoxFuture<'a, ()> + Send + 'static,
    {
        let inner = Inner::default();

        let notify = inner.notify.clone();
        let data = inner.data.clone();
        tokio::spawn(async move {
            let mut context = context;
            loop {
                notify.notified().await;
                let next = data.lock().await.take();
                match next {
                    Some(event) => handler(&mut context, event).await,
                    None => break,
                }
            }
            tracing::trace!("debouncer stopped");
        });

        Self { inner }
    }

    /// Push a new event.
    ///
    /// Returns immediately. The event is handled now, after the running handler, or never if
    /// another event is pushed before that.
    pub async fn push(&self, event: T) {
        self.inner.send(Some(event)).await;
    }
}

impl<T> Inner<T>
where
    T: Send + 'static,
{
    async fn send(&self, msg: Option<T>) {
        *self.data.lock().await = msg;
        self.notify.notify_one();
    }
}

impl<T> Drop for BusyDebouncer<T>
where
    T: Send + 'static,
{
    fn drop(&mut self) {
        let dropping = std::mem::take(&mut self.inner);
        tokio::spawn(async move { dropping.send(None).await });
    }
}
