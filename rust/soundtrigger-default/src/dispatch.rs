//! Callback delivery thread.
//!
//! Server-initiated callbacks never run on the caller's thread. They are
//! queued to a dedicated `soundtrigger-callbacks` thread that drives a
//! current-thread tokio runtime and runs jobs in submission order.

use std::io;
use std::thread::JoinHandle;

use tokio::sync::mpsc;
use tracing::{debug, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

pub(crate) struct CallbackDispatcher {
    tx: Option<mpsc::UnboundedSender<Job>>,
    thread: Option<JoinHandle<()>>,
}

impl CallbackDispatcher {
    pub(crate) fn spawn() -> io::Result<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let rt = tokio::runtime::Builder::new_current_thread().build()?;

        let thread = std::thread::Builder::new()
            .name("soundtrigger-callbacks".to_owned())
            .spawn(move || {
                rt.block_on(async move {
                    while let Some(job) = rx.recv().await {
                        job();
                    }
                });
                debug!("callback dispatcher stopped");
            })?;

        Ok(Self {
            tx: Some(tx),
            thread: Some(thread),
        })
    }

    /// Queue `job`. Returns false if the dispatcher has shut down.
    pub(crate) fn deliver(&self, job: impl FnOnce() + Send + 'static) -> bool {
        match &self.tx {
            Some(tx) => tx.send(Box::new(job)).is_ok(),
            None => false,
        }
    }
}

impl Drop for CallbackDispatcher {
    fn drop(&mut self) {
        // Closing the channel lets the thread drain queued jobs and exit.
        self.tx.take();
        if let Some(thread) = self.thread.take() {
            if thread.thread().id() == std::thread::current().id() {
                return;
            }
            if thread.join().is_err() {
                warn!("callback dispatcher panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn jobs_run_off_thread_in_order() {
        let dispatcher = CallbackDispatcher::spawn().unwrap();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let caller = std::thread::current().id();

        for i in 0..5 {
            let seen = seen.clone();
            assert!(dispatcher.deliver(move || {
                assert_ne!(std::thread::current().id(), caller);
                seen.lock().push(i);
            }));
        }

        // Drop drains the queue before joining.
        drop(dispatcher);
        assert_eq!(*seen.lock(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn runs_on_named_thread() {
        let dispatcher = CallbackDispatcher::spawn().unwrap();
        let named = Arc::new(AtomicU32::new(0));
        let flag = named.clone();
        dispatcher.deliver(move || {
            if std::thread::current().name() == Some("soundtrigger-callbacks") {
                flag.store(1, Ordering::SeqCst);
            }
        });
        drop(dispatcher);
        assert_eq!(named.load(Ordering::SeqCst), 1);
    }
}
