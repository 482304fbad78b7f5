//! Single-flight export pipeline.
//!
//! Wraps the strategy chosen at startup. At most one export runs at a time;
//! a second request while one is in flight fails with [`ExportError::Busy`]
//! rather than queueing.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use sticker_core::ComposedScene;

use crate::capture::{CaptureStrategy, ExportReceipt, RuntimeTarget};
use crate::error::{ExportError, ExportResult};

/// Pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportState {
    /// Ready for a new export.
    Idle,
    /// An export is capturing or delivering.
    Capturing,
}

/// Runs exports through one [`CaptureStrategy`].
pub struct ExportPipeline {
    strategy: Box<dyn CaptureStrategy>,
    in_flight: AtomicBool,
}

impl std::fmt::Debug for ExportPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportPipeline")
            .field("target", &self.strategy.target())
            .field("state", &self.state())
            .finish()
    }
}

/// Clears the in-flight flag on every exit path.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ExportPipeline {
    /// Create a pipeline around `strategy`.
    #[must_use]
    pub fn new(strategy: Box<dyn CaptureStrategy>) -> Self {
        Self {
            strategy,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Runtime of the wrapped strategy.
    #[must_use]
    pub fn target(&self) -> RuntimeTarget {
        self.strategy.target()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ExportState {
        if self.in_flight.load(Ordering::Acquire) {
            ExportState::Capturing
        } else {
            ExportState::Idle
        }
    }

    /// Capture `scene` and deliver it.
    ///
    /// The scene is read once; callers typically pass a snapshot so gestures
    /// arriving during the export do not affect it. Session state is never
    /// touched, whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Busy`] if another export is running, or the
    /// capture, permission or delivery error that ended this one.
    pub async fn export(&self, scene: &ComposedScene) -> ExportResult<ExportReceipt> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("Export requested while another is in progress");
            return Err(ExportError::Busy);
        }
        let _guard = InFlight(&self.in_flight);

        let target = self.strategy.target();
        tracing::debug!("Starting {target:?} export");

        let result = match self.strategy.capture(scene).await {
            Ok(artifact) => self.strategy.deliver(artifact).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(receipt) => tracing::info!(
                "Exported {}x{} image to {}",
                receipt.width,
                receipt.height,
                receipt.location
            ),
            Err(e) => tracing::error!("{target:?} export failed: {e}"),
        }
        result
    }
}
