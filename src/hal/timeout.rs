use super::{ControlCommand, Link, Transport, TransportError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;

type Reply = Result<(), TransportError>;

/// Transport wrapper that bounds every call with a timeout.
///
/// Calls run on the runtime's blocking pool, one at a time. A call that does not return
/// within `timeout` (plus the command's own hold time) fails with [`TransportError::Timeout`].
/// A control command still waiting for the transport when a newer call is made is discarded
/// instead of being delivered late, so a landing never queues behind stale set-points.
pub struct TimedTransport<T> {
    inner: Arc<Mutex<T>>,
    latest: Arc<AtomicU64>,
    runtime: Handle,
    timeout: Duration,
}

impl<T> TimedTransport<T>
where
    T: Transport + Link + Send + 'static,
{
    pub fn new(transport: T, timeout: Duration, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(Mutex::new(transport)),
            latest: Arc::new(AtomicU64::new(0)),
            runtime,
            timeout,
        }
    }

    fn call<F>(&mut self, hold: Duration, supersedable: bool, f: F) -> Reply
    where
        F: FnOnce(&mut T) -> Reply + Send + 'static,
    {
        let id = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = self.inner.clone();
        let latest = self.latest.clone();

        let task = self.runtime.spawn_blocking(move || {
            let mut transport = match inner.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            // The caller already gave up on this one and moved on
            if supersedable && latest.load(Ordering::SeqCst) != id {
                return Err(TransportError::Timeout);
            }
            f(&mut transport)
        });

        let limit = self.timeout + hold;
        self.runtime.block_on(async move {
            match tokio::time::timeout(limit, task).await {
                Ok(Ok(reply)) => reply,
                Ok(Err(join_error)) => Err(TransportError::Link(join_error.to_string())),
                Err(_) => Err(TransportError::Timeout),
            }
        })
    }
}

impl<T> Transport for TimedTransport<T>
where
    T: Transport + Link + Send + 'static,
{
    fn send_control(&mut self, command: &ControlCommand) -> Result<(), TransportError> {
        let command = *command;
        let hold = Duration::from_millis(command.duration_ms.into());
        self.call(hold, true, move |transport| transport.send_control(&command))
    }

    fn send_takeoff(&mut self) -> Result<(), TransportError> {
        self.call(Duration::ZERO, false, |transport| transport.send_takeoff())
    }

    fn send_landing(&mut self) -> Result<(), TransportError> {
        self.call(Duration::ZERO, false, |transport| transport.send_landing())
    }
}

impl<T> Link for TimedTransport<T>
where
    T: Transport + Link + Send + 'static,
{
    fn open(&mut self) -> Result<(), TransportError> {
        self.call(Duration::ZERO, false, |transport| transport.open())
    }

    fn close(&mut self) {
        let reply = self.call(Duration::ZERO, false, |transport| {
            transport.close();
            Ok(())
        });
        if let Err(error) = reply {
            log::warn!("closing link failed: {}", error);
        }
    }
}
