//! Structures to keep the process alive until some event occurs

use futures::channel::mpsc::{channel, Receiver, Sender};
use futures::{pin_mut, select, FutureExt, SinkExt, StreamExt};
use std::fmt;
use tokio::signal::ctrl_c;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, error, warn};

/// Reason why the heart stopped beating
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeathReason {
    /// Internal kill signal has been sent
    Killed(String),
    /// SIGINT, SIGTERM or other process-external cause
    Terminated,
}

impl fmt::Display for DeathReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeathReason::Killed(reason) => write!(f, "Killed ({})", reason),
            DeathReason::Terminated => write!(f, "Terminated due to external signal"),
        }
    }
}

/// Lifecycle management struct that can be used to keep the application alive
pub struct Heart {
    rx: Receiver<String>,
}

impl Heart {
    /// Creates a new heart and linked stone
    pub fn new() -> (Self, HeartStone) {
        let (tx, rx) = channel(2);
        (Self { rx }, HeartStone { remote: tx })
    }

    /// Creates a new heart and discards the linked stone, it only dies from external signals
    pub fn without_heart_stone() -> Self {
        Self::new().0
    }

    /// Future that waits until the heart dies for the returned reason
    pub async fn death(&mut self) -> DeathReason {
        debug!("Heart starts beating");

        let rx = &mut self.rx;
        let killed = async move {
            match rx.next().await {
                Some(reason) => DeathReason::Killed(reason),
                // All stones are gone, only external signals remain
                None => futures::future::pending().await,
            }
        }
        .fuse();
        let terminated = Self::termination_signal().fuse();

        pin_mut!(killed, terminated);

        select! {
            reason = killed => reason,
            reason = terminated => reason,
        }
    }

    async fn termination_signal() -> DeathReason {
        let sigterm = async {
            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    warn!(error = %e, "Unable to listen for SIGTERM");
                    futures::future::pending::<()>().await;
                }
            }
        }
        .fuse();
        let interrupt = ctrl_c().fuse();

        pin_mut!(sigterm, interrupt);

        select! {
            _ = sigterm => {},
            _ = interrupt => {},
        };

        DeathReason::Terminated
    }
}

/// Remote controller for the heart
#[derive(Clone)]
pub struct HeartStone {
    remote: Sender<String>,
}

impl HeartStone {
    /// Kill the associated heart
    pub async fn kill(&mut self, reason: String) {
        if let Err(e) = self.remote.send(reason).await {
            error!(error = %e, "Failed to interact with Heart");
        }
    }
}
