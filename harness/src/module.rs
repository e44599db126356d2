use super::{DeathReason, Heart};
use async_trait::async_trait;
use futures::lock::Mutex;
use jatsl::{JobScheduler, State, StatusServer};
use library::BoxedError;
use std::any::type_name;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument};

/// Reason why a [`Module`] stopped
#[derive(Debug, Error)]
pub enum ModuleTerminationReason {
    /// Bus connection could not be established
    #[error("unable to connect to the bus")]
    ConnectionFailed(#[source] BoxedError),
    /// Services could not be scheduled
    #[error("error while scheduling services")]
    OperationalError(#[source] BoxedError),
    /// [`Heart`] provided by module died
    #[error("heart provided by module died: {0}")]
    HeartDied(DeathReason),
    /// Services were scheduled without handing over a [`Heart`]
    #[error("module exited without a heart")]
    ExitedNormally,
    /// Connecting to the bus took longer than allowed
    #[error("timeout while connecting to the bus")]
    Timeout,
}

impl ModuleTerminationReason {
    /// Whether the module ended because something went wrong
    pub fn is_failure(&self) -> bool {
        !matches!(
            self,
            ModuleTerminationReason::HeartDied(_) | ModuleTerminationReason::ExitedNormally
        )
    }
}

/// Set of services sharing one bus connection
///
/// The [`ModuleRunner`] owns the connection. It is opened before [`Module::run`], handed to it by
/// reference and released once every scheduled job has terminated, regardless of how the module
/// ended.
#[async_trait]
pub trait Module {
    /// Connection handle shared by the services of this module
    type Bus: Send + Sync;

    /// Opens the bus connection and verifies that it is usable
    async fn connect(&self) -> Result<Self::Bus, BoxedError>;

    /// Schedules the services of this module on the given scheduler
    ///
    /// Returning `Some(_)` keeps the module alive until the [`Heart`] dies, `None` shuts it down
    /// right away.
    async fn run(
        &mut self,
        bus: &Self::Bus,
        scheduler: &JobScheduler,
    ) -> Result<Option<Heart>, BoxedError>;

    /// Called before the scheduled jobs are terminated
    async fn pre_shutdown(&mut self, _scheduler: &JobScheduler) {}
}

/// Drives a [`Module`] through connecting, running and shutting down
pub struct ModuleRunner {
    connect_timeout: Duration,
    shutdown_timeout: Duration,
    status_server_port: Option<u16>,
}

impl ModuleRunner {
    /// Creates a new instance using default timeouts and enabling the status server
    pub fn new_with_status_server(status_server_port: u16) -> Self {
        Self {
            status_server_port: Some(status_server_port),
            ..Default::default()
        }
    }
}

impl Default for ModuleRunner {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(60),
            shutdown_timeout: Duration::from_secs(5),
            status_server_port: None,
        }
    }
}

impl ModuleRunner {
    /// Executes a [`Module`] until it exits, releasing its bus connection afterwards
    #[instrument(skip(self, module), fields(module_name = type_name::<M>()))]
    pub async fn run<M: Module + Send + Sync>(&self, mut module: M) -> ModuleTerminationReason {
        let scheduler = JobScheduler::default();

        let status_state = match self.status_server_port {
            Some(port) => {
                info!(port, "Spawning status server");
                let (status_state, status_server) = StatusServer::new(&scheduler, port);
                scheduler.spawn_job(status_server).await;
                Some(status_state)
            }
            None => None,
        };

        info!("Connecting to bus");
        let (bus, mut reason) = match timeout(self.connect_timeout, module.connect()).await {
            Ok(Ok(bus)) => (Some(bus), ModuleTerminationReason::ExitedNormally),
            Ok(Err(error)) => (None, ModuleTerminationReason::ConnectionFailed(error)),
            Err(_) => (None, ModuleTerminationReason::Timeout),
        };

        if let Some(bus) = &bus {
            reason = self
                .operate(&mut module, bus, &scheduler, &status_state)
                .await;
        }

        if let Some(state) = status_state {
            *state.lock().await = State::Shutdown;
        }
        module.pre_shutdown(&scheduler).await;

        info!("Terminating remaining jobs");
        scheduler.terminate_jobs(self.shutdown_timeout).await;

        if bus.is_some() {
            drop(bus);
            debug!("Released bus connection");
        }

        if reason.is_failure() {
            error!(%reason, "Module terminated with an error");
        } else {
            info!(%reason, "Module exited");
        }

        reason
    }

    async fn operate<M: Module + Send + Sync>(
        &self,
        module: &mut M,
        bus: &M::Bus,
        scheduler: &JobScheduler,
        status_state: &Option<Arc<Mutex<State>>>,
    ) -> ModuleTerminationReason {
        let heart = match module.run(bus, scheduler).await {
            Ok(heart) => heart,
            Err(error) => return ModuleTerminationReason::OperationalError(error),
        };

        if let Some(state) = status_state {
            *state.lock().await = State::Running;
        }

        match heart {
            Some(mut heart) => {
                debug!("Services scheduled, waiting for heart to die");
                ModuleTerminationReason::HeartDied(heart.death().await)
            }
            None => ModuleTerminationReason::ExitedNormally,
        }
    }
}
