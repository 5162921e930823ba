//! JS-rendered page fetching with a load-versus-deadline race.
//!
//! A [`RenderContext`] loads a page in a scripting-capable engine and reports
//! the outcome once through a [`LoadSignal`]. [`RenderedFetcher`] races that
//! report against a deadline; a shared [`ResolveGuard`] makes sure only the
//! first of the two ever takes effect.

use crate::cardmarket::fetcher::{PageFetcher, USER_AGENT};
use crate::cardmarket::models::FetchResult;
use crate::error::ResolutionError;
use anyhow::Context;
use async_trait::async_trait;
use fantoccini::wd::TimeoutConfiguration;
use fantoccini::{Client, ClientBuilder};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Default deadline for a rendered page load.
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(20);

/// Extra time the browser gets past the fetch deadline, so the fetcher's own
/// timer always reports the timeout.
const PAGE_LOAD_SLACK: Duration = Duration::from_secs(5);

const OUTER_HTML_SCRIPT: &str = "return document.documentElement.outerHTML;";

/// "Already resolved" flag shared by the load signal and the deadline.
#[derive(Debug, Default)]
pub struct ResolveGuard {
    resolved: AtomicBool,
}

impl ResolveGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the outcome. Returns true only for the first caller.
    pub fn try_resolve(&self) -> bool {
        !self.resolved.swap(true, Ordering::AcqRel)
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::Acquire)
    }
}

/// Outcome reported by a render context.
#[derive(Debug)]
pub enum LoadEvent {
    /// Page finished loading; `markup` is the serialized document as the
    /// engine transported it.
    Complete { url: String, markup: Value },
    /// Main-frame failure.
    Failed(ResolutionError),
}

/// One-shot reporting handle given to a render context for a single load.
#[derive(Clone)]
pub struct LoadSignal {
    guard: Arc<ResolveGuard>,
    tx: Arc<Mutex<Option<oneshot::Sender<LoadEvent>>>>,
}

impl LoadSignal {
    fn new(guard: Arc<ResolveGuard>, tx: oneshot::Sender<LoadEvent>) -> Self {
        Self { guard, tx: Arc::new(Mutex::new(Some(tx))) }
    }

    /// Reports load completion. Returns false if the load was already resolved.
    pub fn complete(&self, url: impl Into<String>, markup: Value) -> bool {
        self.deliver(LoadEvent::Complete { url: url.into(), markup })
    }

    /// Reports a main-frame failure. Returns false if already resolved.
    pub fn fail(&self, error: ResolutionError) -> bool {
        self.deliver(LoadEvent::Failed(error))
    }

    fn deliver(&self, event: LoadEvent) -> bool {
        if !self.guard.try_resolve() {
            debug!("Dropping render event after resolution: {:?}", event_name(&event));
            return false;
        }

        match self.tx.lock().ok().and_then(|mut tx| tx.take()) {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }
}

fn event_name(event: &LoadEvent) -> &'static str {
    match event {
        LoadEvent::Complete { .. } => "complete",
        LoadEvent::Failed(_) => "failed",
    }
}

/// A scripting-capable page renderer.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Starts loading `url`. The outcome must be reported through `signal`.
    async fn start(&self, url: &str, signal: LoadSignal) -> Result<(), ResolutionError>;

    /// Stops any pending load.
    ///
    /// Must return without waiting on the engine: it runs on the deadline
    /// path and when an in-flight fetch is dropped.
    fn cancel(&self);
}

/// Cancels the render context if the fetch is dropped before either side
/// claimed the outcome.
struct CancelOnDrop<'a, C: RenderContext> {
    context: &'a C,
    guard: Arc<ResolveGuard>,
}

impl<C: RenderContext> Drop for CancelOnDrop<'_, C> {
    fn drop(&mut self) {
        if self.guard.try_resolve() {
            debug!("Render abandoned, cancelling load");
            self.context.cancel();
        }
    }
}

/// Page fetcher backed by a render context, bounded by a deadline.
pub struct RenderedFetcher<C> {
    context: C,
    timeout: Duration,
}

impl<C: RenderContext> RenderedFetcher<C> {
    pub fn new(context: C) -> Self {
        Self::with_timeout(context, DEFAULT_RENDER_TIMEOUT)
    }

    pub fn with_timeout(context: C, timeout: Duration) -> Self {
        Self { context, timeout }
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn into_context(self) -> C {
        self.context
    }

    fn finish(&self, event: LoadEvent) -> Result<FetchResult, ResolutionError> {
        match event {
            LoadEvent::Complete { url, markup } => {
                let html = decode_markup(markup)?;
                debug!("Rendered {} ({} bytes)", url, html.len());
                Ok(FetchResult::new(html, url))
            }
            LoadEvent::Failed(error) => Err(error),
        }
    }
}

#[async_trait]
impl<C: RenderContext> PageFetcher for RenderedFetcher<C> {
    async fn fetch(&self, url: &str) -> Result<FetchResult, ResolutionError> {
        let guard = Arc::new(ResolveGuard::new());
        let (tx, mut rx) = oneshot::channel();

        debug!("Rendering {}", url);
        self.context.start(url, LoadSignal::new(guard.clone(), tx)).await?;
        let _abandon = CancelOnDrop { context: &self.context, guard: guard.clone() };

        let closed = || ResolutionError::Network("render context closed before load".to_string());

        tokio::select! {
            event = &mut rx => event.map_err(|_| closed()).and_then(|e| self.finish(e)),
            _ = tokio::time::sleep(self.timeout) => {
                if guard.try_resolve() {
                    warn!("Render of {} timed out after {:?}", url, self.timeout);
                    self.context.cancel();
                    Err(ResolutionError::timeout(self.timeout))
                } else {
                    // Completion claimed the guard first; its event is in flight.
                    rx.await.map_err(|_| closed()).and_then(|e| self.finish(e))
                }
            }
        }
    }
}

/// Converts the transported document value into markup.
fn decode_markup(markup: Value) -> Result<String, ResolutionError> {
    let html = match markup {
        Value::String(raw) => unescape_markup(&raw),
        Value::Null => String::new(),
        other => {
            warn!("Unexpected markup value type: {}", other);
            String::new()
        }
    };

    if html.trim().is_empty() || html == "null" {
        return Err(ResolutionError::EmptyBody);
    }
    Ok(html)
}

/// Undoes the string-literal encoding some engines apply to serialized markup.
///
/// Input that is not a quoted literal is returned unchanged.
pub fn unescape_markup(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.len() < 2 || !trimmed.starts_with('"') || !trimmed.ends_with('"') {
        return raw.to_string();
    }

    match serde_json::from_str::<String>(trimmed) {
        Ok(decoded) => decoded,
        Err(e) => {
            trace!("Markup is not a valid JSON literal ({}), using fallback unescape", e);
            trimmed[1..trimmed.len() - 1]
                .replace("\\u003C", "<")
                .replace("\\\"", "\"")
                .replace("\\n", "\n")
        }
    }
}

/// Render context driving a browser through WebDriver.
pub struct WebDriverContext {
    client: Client,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl WebDriverContext {
    /// Connects to a WebDriver server and opens a headless session whose
    /// page loads are abandoned shortly after `deadline`.
    pub async fn connect(webdriver_url: &str, deadline: Duration) -> anyhow::Result<Self> {
        let mut caps = serde_json::Map::new();
        caps.insert(
            "goog:chromeOptions".to_string(),
            json!({ "args": ["--headless=new", format!("--user-agent={}", USER_AGENT)] }),
        );
        caps.insert(
            "moz:firefoxOptions".to_string(),
            json!({
                "args": ["-headless"],
                "prefs": { "general.useragent.override": USER_AGENT }
            }),
        );

        let mut builder = ClientBuilder::native();
        builder.capabilities(caps);
        let client = builder
            .connect(webdriver_url)
            .await
            .with_context(|| format!("Failed to connect to WebDriver at {}", webdriver_url))?;

        debug!("Connected to WebDriver at {}", webdriver_url);

        let page_load = deadline + PAGE_LOAD_SLACK;
        let timeouts = TimeoutConfiguration::new(None, Some(page_load), None);
        if let Err(e) = client.update_timeouts(timeouts).await {
            warn!("Failed to set WebDriver page-load timeout: {}", e);
        }

        Ok(Self { client, pending: Mutex::new(None) })
    }

    /// Ends the WebDriver session.
    pub async fn close(self) -> anyhow::Result<()> {
        self.client.close().await.context("Failed to close WebDriver session")
    }
}

#[async_trait]
impl RenderContext for WebDriverContext {
    async fn start(&self, url: &str, signal: LoadSignal) -> Result<(), ResolutionError> {
        let client = self.client.clone();
        let url = url.to_string();

        let handle = tokio::spawn(async move {
            // goto returns once the document reports load-complete
            if let Err(e) = client.goto(&url).await {
                signal.fail(ResolutionError::Network(e.to_string()));
                return;
            }

            let final_url = match client.current_url().await {
                Ok(current) => current.to_string(),
                Err(_) => url,
            };

            match client.execute(OUTER_HTML_SCRIPT, vec![]).await {
                Ok(markup) => signal.complete(final_url, markup),
                Err(e) => signal.fail(ResolutionError::Network(e.to_string())),
            };
        });

        if let Ok(mut pending) = self.pending.lock() {
            if let Some(previous) = pending.replace(handle) {
                previous.abort();
            }
        }
        Ok(())
    }

    fn cancel(&self) {
        let pending = self.pending.lock().ok().and_then(|mut p| p.take());
        if let Some(handle) = pending {
            handle.abort();
        }

        // Queued behind the running navigation; bounded by the page-load timeout.
        let client = self.client.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(e) = client.execute("window.stop();", vec![]).await {
                        debug!("window.stop() failed: {}", e);
                    }
                });
            }
            Err(_) => debug!("No runtime available to stop the page load"),
        }
    }
}
