// src/control/runtime.rs

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use crate::errors::{CoplanError, Result};
use crate::job::RunArtifact;
use crate::sim::{AcceptanceOracle, DurationOracle};

use super::core::ControlLoop;

/// Async shell around [`ControlLoop`].
///
/// The loop itself is synchronous and CPU bound (every re-plan is a solve),
/// so it runs on a blocking thread. This struct handles the IO: Ctrl-C and
/// writing the run artifact.
pub struct Runtime<D, A> {
    core: ControlLoop<D, A>,
    output: Option<PathBuf>,
    shutdown: Arc<AtomicBool>,
}

impl<D, A> fmt::Debug for Runtime<D, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

impl<D, A> Runtime<D, A>
where
    D: DurationOracle + Send + 'static,
    A: AcceptanceOracle + Send + 'static,
{
    pub fn new(core: ControlLoop<D, A>, output: Option<PathBuf>) -> Self {
        Self {
            core,
            output,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag checked between ticks; raising it stops the run with
    /// [`CoplanError::Interrupted`].
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Run the job to completion and write the artifact if an output path
    /// was given.
    pub async fn run(self) -> Result<RunArtifact> {
        info!("coplan runtime started");

        let signal_flag = Arc::clone(&self.shutdown);
        let signal = tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("shutdown requested");
            signal_flag.store(true, Ordering::SeqCst);
        });

        let stop = Arc::clone(&self.shutdown);
        let mut core = self.core;
        let joined = tokio::task::spawn_blocking(move || core.run_until(&stop)).await;
        signal.abort();

        let artifact = joined.map_err(|e| CoplanError::Other(e.into()))??;

        if let Some(path) = &self.output {
            tokio::fs::write(path, artifact.to_json()?).await?;
            info!(path = %path.display(), "run artifact written");
        }

        info!("runtime exiting");
        Ok(artifact)
    }
}
