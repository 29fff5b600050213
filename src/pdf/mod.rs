//! PDF rendering through a headless browser.
//!
//! [`PdfBackend`] is the seam the pipeline depends on. [`ChromePdfRenderer`]
//! is the default implementation: one headless Chrome per call, driven
//! through the states of [`RenderState`].

mod chrome;

pub use chrome::ChromePdfRenderer;

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Turns a complete HTML document into PDF bytes.
#[async_trait]
pub trait PdfBackend: Send + Sync {
    async fn render_pdf(&self, html: &str) -> Result<Vec<u8>>;
}

/// Settings for [`ChromePdfRenderer`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfOptions {
    /// Budget shared by engine start and page load; also bounds post-processing.
    pub load_timeout_ms: u64,
    pub print_timeout_ms: u64,
    /// Pause after the page reports it has loaded.
    pub settle_after_load_ms: u64,
    /// Pause after the fixup script ran.
    pub settle_after_script_ms: u64,
    /// Chrome binary; autodetected when unset.
    pub chrome_path: Option<PathBuf>,
    /// Page margin on every side, in centimetres.
    pub margin_cm: f64,
    /// Directory for the temporary HTML file; the system temp dir when unset.
    pub work_dir: Option<PathBuf>,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            load_timeout_ms: 120_000,
            print_timeout_ms: 120_000,
            settle_after_load_ms: 2_000,
            settle_after_script_ms: 1_000,
            chrome_path: None,
            margin_cm: 2.0,
            work_dir: None,
        }
    }
}

/// Lifecycle of a single PDF render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    Idle,
    EngineStarting,
    PageLoading,
    PostProcessing,
    Printing,
    Done,
    Failed,
}

impl RenderState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RenderState::Done | RenderState::Failed)
    }

    /// Whether a render may move from `self` to `next`.
    pub fn can_transition_to(self, next: RenderState) -> bool {
        use RenderState::*;
        match (self, next) {
            (Idle, EngineStarting)
            | (EngineStarting, PageLoading)
            | (PageLoading, PostProcessing)
            | (PostProcessing, Printing)
            | (Printing, Done) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Moves to `next`, refusing transitions the lifecycle does not allow.
    pub fn advance(&mut self, next: RenderState) -> Result<()> {
        if !self.can_transition_to(next) {
            return Err(Error::RenderEngine(format!(
                "invalid render state transition {} -> {}",
                self, next
            )));
        }
        log::debug!("pdf render: {} -> {}", self, next);
        *self = next;
        Ok(())
    }
}

impl fmt::Display for RenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RenderState::Idle => "idle",
            RenderState::EngineStarting => "engine-starting",
            RenderState::PageLoading => "page-loading",
            RenderState::PostProcessing => "post-processing",
            RenderState::Printing => "printing",
            RenderState::Done => "done",
            RenderState::Failed => "failed",
        };
        f.write_str(name)
    }
}
