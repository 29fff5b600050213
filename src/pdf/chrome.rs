use super::{PdfBackend, PdfOptions, RenderState};
use crate::error::{Error, Result};
use async_trait::async_trait;
use headless_chrome::browser::tab::{RequestInterceptor, RequestPausedDecision};
use headless_chrome::browser::transport::{SessionId, Transport};
use headless_chrome::protocol::cdp::Fetch::events::RequestPausedEvent;
use headless_chrome::protocol::cdp::Fetch::FailRequest;
use headless_chrome::protocol::cdp::Network::{ErrorReason, ResourceType};
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const FIXUP_SCRIPT: &str = include_str!("fixup.js");

const A4_WIDTH_IN: f64 = 8.27;
const A4_HEIGHT_IN: f64 = 11.69;
const CM_PER_INCH: f64 = 2.54;

static CHROME_ARGS: [&str; 5] = [
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--no-first-run",
    "--no-zygote",
    "--force-color-profile=srgb",
];

/// Prints HTML with a headless Chrome started for each call.
#[derive(Debug, Clone, Default)]
pub struct ChromePdfRenderer {
    options: PdfOptions,
}

/// Running browser plus its single tab. Dropping it kills the browser.
struct Engine {
    _browser: Browser,
    tab: Arc<Tab>,
}

impl Drop for Engine {
    fn drop(&mut self) {
        log::debug!("releasing headless engine");
    }
}

impl ChromePdfRenderer {
    pub fn new(options: PdfOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PdfOptions {
        &self.options
    }

    fn work_dir(&self) -> PathBuf {
        self.options
            .work_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    fn print_options(&self) -> PrintToPdfOptions {
        let margin = self.options.margin_cm / CM_PER_INCH;
        PrintToPdfOptions {
            landscape: Some(false),
            display_header_footer: Some(false),
            print_background: Some(true),
            scale: Some(1.0),
            paper_width: Some(A4_WIDTH_IN),
            paper_height: Some(A4_HEIGHT_IN),
            margin_top: Some(margin),
            margin_bottom: Some(margin),
            margin_left: Some(margin),
            margin_right: Some(margin),
            prefer_css_page_size: Some(true),
            ..Default::default()
        }
    }

    async fn run(&self, html: &str, state: &mut RenderState) -> Result<Vec<u8>> {
        let load_timeout = self.options.load_timeout_ms;
        let load_deadline = Instant::now() + Duration::from_millis(load_timeout);

        state.advance(RenderState::EngineStarting)?;
        let launch = self.launch_options()?;
        let engine = blocking_stage("engine start", load_timeout, load_deadline, move || {
            let browser = Browser::new(launch).map_err(engine_error("engine start"))?;
            let tab = browser.new_tab().map_err(engine_error("engine start"))?;
            Ok(Engine {
                _browser: browser,
                tab,
            })
        })
        .await?;

        state.advance(RenderState::PageLoading)?;
        let page = crate::scratch_file(&self.work_dir(), "html")?;
        tokio::fs::write(page.path(), html).await?;
        let url = format!("file://{}", page.path().display());

        let tab = Arc::clone(&engine.tab);
        let nav_timeout = Duration::from_millis(load_timeout);
        blocking_stage("page load", load_timeout, load_deadline, move || {
            tab.set_default_timeout(nav_timeout);
            tab.enable_fetch(None, None)
                .map_err(engine_error("page load"))?;
            tab.enable_request_interception(block_styles_and_fonts())
                .map_err(engine_error("page load"))?;
            tab.navigate_to(&url)
                .map_err(engine_error("page load"))?
                .wait_until_navigated()
                .map_err(engine_error("page load"))?;
            Ok(())
        })
        .await?;
        tokio::time::sleep(Duration::from_millis(self.options.settle_after_load_ms)).await;

        state.advance(RenderState::PostProcessing)?;
        let tab = Arc::clone(&engine.tab);
        let script_deadline = Instant::now() + Duration::from_millis(load_timeout);
        let flagged = blocking_stage("post-processing", load_timeout, script_deadline, move || {
            let result = tab
                .evaluate(FIXUP_SCRIPT, false)
                .map_err(engine_error("post-processing"))?;
            Ok(result.value.and_then(|v| v.as_u64()).unwrap_or(0))
        })
        .await?;
        log::debug!("fixup script flagged {} visual element(s)", flagged);
        tokio::time::sleep(Duration::from_millis(self.options.settle_after_script_ms)).await;

        state.advance(RenderState::Printing)?;
        let tab = Arc::clone(&engine.tab);
        let print_options = self.print_options();
        let print_timeout = self.options.print_timeout_ms;
        let print_deadline = Instant::now() + Duration::from_millis(print_timeout);
        let pdf = blocking_stage("printing", print_timeout, print_deadline, move || {
            tab.print_to_pdf(Some(print_options))
                .map_err(engine_error("printing"))
        })
        .await?;

        drop(engine);
        if let Err(e) = page.close() {
            log::warn!("failed to remove temporary page: {}", e);
        }

        if !pdf.starts_with(b"%PDF") {
            return Err(Error::RenderEngine(
                "printed output is not a PDF document".to_string(),
            ));
        }
        state.advance(RenderState::Done)?;
        Ok(pdf)
    }

    fn launch_options(&self) -> Result<LaunchOptions<'static>> {
        LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .window_size(Some((1920, 1080)))
            .path(self.options.chrome_path.clone())
            .args(CHROME_ARGS.iter().map(|arg| OsStr::new(*arg)).collect())
            .idle_browser_timeout(Duration::from_millis(
                self.options.load_timeout_ms.max(self.options.print_timeout_ms),
            ))
            .build()
            .map_err(|e| Error::RenderEngine(format!("invalid launch options: {}", e)))
    }
}

#[async_trait]
impl PdfBackend for ChromePdfRenderer {
    async fn render_pdf(&self, html: &str) -> Result<Vec<u8>> {
        let mut state = RenderState::Idle;
        let result = self.run(html, &mut state).await;
        match result {
            Ok(pdf) => {
                log::info!("rendered PDF ({} bytes)", pdf.len());
                Ok(pdf)
            }
            Err(e) => {
                let failed_in = state;
                // Failed is reachable from every state the run can stop in
                let _ = state.advance(RenderState::Failed);
                log::warn!("PDF render failed while {}: {}", failed_in, e);
                Err(e)
            }
        }
    }
}

fn block_styles_and_fonts() -> Arc<dyn RequestInterceptor + Send + Sync> {
    Arc::new(
        |_transport: Arc<Transport>, _session: SessionId, event: RequestPausedEvent| {
            match event.params.resource_Type {
                ResourceType::Stylesheet | ResourceType::Font => {
                    RequestPausedDecision::Fail(FailRequest {
                        request_id: event.params.request_id,
                        error_reason: ErrorReason::BlockedByClient,
                    })
                }
                _ => RequestPausedDecision::Continue(None),
            }
        },
    )
}

fn engine_error<E: Display>(stage: &'static str) -> impl Fn(E) -> Error {
    move |e| Error::RenderEngine(format!("{}: {}", stage, e))
}

/// Runs blocking engine work off the runtime, bounded by `deadline`.
///
/// On expiry the worker is abandoned; it unwinds once the engine it talks
/// to is dropped.
async fn blocking_stage<T, F>(
    stage: &'static str,
    timeout_ms: u64,
    deadline: Instant,
    work: F,
) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let handle = tokio::task::spawn_blocking(work);
    match tokio::time::timeout_at(deadline, handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join)) => Err(Error::RenderEngine(format!("{} worker failed: {}", stage, join))),
        Err(_) => Err(Error::RenderTimeout { stage, timeout_ms }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_options_use_a4_and_margins() {
        let renderer = ChromePdfRenderer::default();
        let options = renderer.print_options();
        assert_eq!(options.paper_width, Some(8.27));
        assert_eq!(options.paper_height, Some(11.69));
        let margin = options.margin_top.unwrap();
        assert!((margin - 0.7874).abs() < 1e-3);
        assert_eq!(options.print_background, Some(true));
        assert_eq!(options.prefer_css_page_size, Some(true));
        assert_eq!(options.display_header_footer, Some(false));
    }

    #[test]
    fn test_fixup_script_is_an_expression() {
        assert!(FIXUP_SCRIPT.trim_start().starts_with("(() => {"));
        assert!(FIXUP_SCRIPT.trim_end().ends_with("})()"));
        assert!(FIXUP_SCRIPT.contains("return flagged;"));
    }

    #[tokio::test]
    async fn test_stage_timeout_reports_stage() {
        let deadline = Instant::now() + Duration::from_millis(20);
        let err = blocking_stage("printing", 20, deadline, || {
            std::thread::sleep(Duration::from_millis(300));
            Ok(())
        })
        .await
        .unwrap_err();
        match &err {
            Error::RenderTimeout { stage, timeout_ms } => {
                assert_eq!(*stage, "printing");
                assert_eq!(*timeout_ms, 20);
                assert!(err.to_string().contains("retry with the docx format"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_browser_binary_is_engine_error() {
        let renderer = ChromePdfRenderer::new(PdfOptions {
            chrome_path: Some(PathBuf::from("/nonexistent/chrome-binary")),
            load_timeout_ms: 5_000,
            ..PdfOptions::default()
        });
        let err = renderer.render_pdf("<p>x</p>").await.unwrap_err();
        assert!(matches!(err, Error::RenderEngine(_)), "{}", err);
    }
}
