//! Server lifecycle: `Created → Starting → Running → Stopping → Stopped`.
//!
//! `start` returns as soon as the serve task is spawned. The task binds the
//! address, moves the state to `Running`, and serves until a stop is
//! requested. `stop` signals the task and waits, up to a deadline, for it to
//! finish draining. There is no way back from `Stopped`.

use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::instrument::WithSubscriber;
use tracing::{Dispatch, debug, error, info};

use crate::engine::Engine;
use crate::error::ServerError;

/// Where a server is in its lifecycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum State {
    Created,
    Starting,
    Running,
    Stopping,
    Stopped,
}

impl State {
    fn as_str(self) -> &'static str {
        match self {
            Self::Created  => "created",
            Self::Starting => "starting",
            Self::Running  => "running",
            Self::Stopping => "stopping",
            Self::Stopped  => "stopped",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Channels shared between the controller and one serve task.
#[derive(Clone)]
struct Handle {
    /// Flipped to `true` to ask the serve task to stop.
    stop: Arc<watch::Sender<bool>>,
    /// Flipped to `true` by the serve task once every connection drained.
    done: watch::Receiver<bool>,
}

enum Phase {
    Created,
    Starting(Handle),
    Running(Handle, SocketAddr),
    Stopping(Handle),
    Stopped,
}

impl Phase {
    fn state(&self) -> State {
        match self {
            Self::Created => State::Created,
            Self::Starting(_) => State::Starting,
            Self::Running(..) => State::Running,
            Self::Stopping(_) => State::Stopping,
            Self::Stopped => State::Stopped,
        }
    }
}

#[derive(Clone)]
pub(crate) struct Lifecycle {
    phase: Arc<Mutex<Phase>>,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self { phase: Arc::new(Mutex::new(Phase::Created)) }
    }

    pub(crate) fn state(&self) -> State {
        self.lock().state()
    }

    pub(crate) fn local_addr(&self) -> Option<SocketAddr> {
        match &*self.lock() {
            Phase::Running(_, addr) => Some(*addr),
            _ => None,
        }
    }

    /// Spawns the serve task on the current tokio runtime.
    ///
    /// A bind failure, or a listener failure while serving, is fatal: it is
    /// logged through `logger` and the process exits with status 1. Neither
    /// applies once a stop has been requested.
    pub(crate) fn start(&self, engine: Engine, addr: String, logger: Dispatch) -> Result<(), ServerError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| ServerError::NoRuntime)?;

        let (stop_tx, stop_rx) = watch::channel(false);
        let (done_tx, done_rx) = watch::channel(false);
        {
            let mut phase = self.lock();
            if !matches!(*phase, Phase::Created) {
                return Err(ServerError::InvalidState { op: "start", state: phase.state().as_str() });
            }
            *phase = Phase::Starting(Handle { stop: Arc::new(stop_tx), done: done_rx });
        }

        tracing::dispatcher::with_default(&logger, || info!(addr = %addr, "server starting"));

        let lifecycle = self.clone();
        let task = async move {
            let stop_requested = || *stop_rx.borrow();

            match TcpListener::bind(&addr).await {
                Ok(listener) => {
                    if let Ok(local) = listener.local_addr() {
                        lifecycle.mark_running(local);
                    }

                    let mut stop = stop_rx.clone();
                    let shutdown = async move {
                        // An error means the controller is gone; stop either way.
                        let _ = stop.wait_for(|stop| *stop).await;
                    };
                    if let Err(source) = engine.serve(listener, shutdown).await {
                        let err = ServerError::Accept(source);
                        if !stop_requested() {
                            error!(fatal = true, error = %err, "server stopped accepting connections");
                            std::process::exit(1);
                        }
                        debug!(error = %err, "listener failed during shutdown");
                    }
                }
                Err(source) => {
                    let err = ServerError::Bind { addr, source };
                    if !stop_requested() {
                        error!(fatal = true, error = %err, "failed to start server");
                        std::process::exit(1);
                    }
                    debug!(error = %err, "stop requested before bind completed");
                }
            }

            lifecycle.mark_stopped();
            let _ = done_tx.send(true);
        };
        runtime.spawn(task.with_subscriber(logger));
        Ok(())
    }

    /// Requests a stop and waits for the drain until `deadline`.
    ///
    /// Safe to call from several tasks at once; every caller waits on the
    /// same drain.
    pub(crate) async fn stop(&self, deadline: Instant) -> Result<(), ServerError> {
        let handle = {
            let mut phase = self.lock();
            match &*phase {
                Phase::Created => {
                    *phase = Phase::Stopped;
                    return Ok(());
                }
                Phase::Stopped => return Ok(()),
                Phase::Stopping(handle) => handle.clone(),
                Phase::Starting(handle) | Phase::Running(handle, _) => {
                    let handle = handle.clone();
                    *phase = Phase::Stopping(handle.clone());
                    handle
                }
            }
        };

        handle.stop.send_replace(true);

        if Instant::now() >= deadline {
            return Err(ServerError::DeadlineExceeded);
        }

        let mut done = handle.done.clone();
        let drained = tokio::time::timeout_at(deadline, async move {
            // An error means the serve task ended without reporting, which
            // only happens if it panicked; nothing is left to drain.
            let _ = done.wait_for(|done| *done).await;
        })
        .await;
        if drained.is_err() {
            return Err(ServerError::DeadlineExceeded);
        }

        self.mark_stopped();
        Ok(())
    }

    fn mark_running(&self, addr: SocketAddr) {
        let mut phase = self.lock();
        if let Phase::Starting(handle) = &*phase {
            let handle = handle.clone();
            *phase = Phase::Running(handle, addr);
        }
    }

    /// Called once the serve task has drained, whether or not anyone is
    /// still waiting in `stop`.
    fn mark_stopped(&self) {
        let mut phase = self.lock();
        if matches!(*phase, Phase::Stopping(_)) {
            *phase = Phase::Stopped;
        }
    }

    // Every transition is a single assignment, so a poisoned lock still holds
    // a valid phase.
    fn lock(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
