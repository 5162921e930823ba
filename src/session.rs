//! Single-consumer lookup session with an explicit state machine.
//!
//! Submitting a tag moves the session to `Loading` and abandons any pending
//! lookup; the resolution's terminal state is published exactly once, and
//! only if no newer tag was submitted in the meantime.

use crate::cardmarket::{CardData, PageFetcher, Resolver};
use crate::error::ResolutionError;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Observable state of a lookup session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LookupState {
    #[default]
    Idle,
    Loading { tag: String },
    Succeeded(CardData),
    Failed(ResolutionError),
}

impl LookupState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LookupState::Loading { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LookupState::Succeeded(_) | LookupState::Failed(_))
    }
}

#[derive(Default)]
struct Pending {
    generation: u64,
    task: Option<JoinHandle<()>>,
    /// Aborted tasks that may still hold the resolver
    abandoned: Vec<JoinHandle<()>>,
}

impl Pending {
    fn abandon_current(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            self.abandoned.push(task);
        }
        self.abandoned.retain(|task| !task.is_finished());
    }
}

/// Drives resolutions for one consumer.
pub struct LookupSession<F> {
    resolver: Arc<Resolver<F>>,
    state: watch::Sender<LookupState>,
    pending: Arc<Mutex<Pending>>,
}

impl<F: PageFetcher + 'static> LookupSession<F> {
    pub fn new(resolver: Resolver<F>) -> Self {
        let (state, _) = watch::channel(LookupState::Idle);
        Self { resolver: Arc::new(resolver), state, pending: Arc::new(Mutex::new(Pending::default())) }
    }

    /// Returns the current state.
    pub fn state(&self) -> LookupState {
        self.state.borrow().clone()
    }

    /// Subscribes to state transitions.
    pub fn subscribe(&self) -> watch::Receiver<LookupState> {
        self.state.subscribe()
    }

    /// Starts resolving `tag`, abandoning any lookup still in flight.
    pub fn submit(&self, tag: impl Into<String>) {
        let tag = tag.into();
        let mut pending = match self.pending.lock() {
            Ok(pending) => pending,
            Err(poisoned) => poisoned.into_inner(),
        };

        if pending.task.is_some() {
            debug!("Abandoning previous lookup");
        }
        pending.abandon_current();

        pending.generation += 1;
        let generation = pending.generation;
        self.state.send_replace(LookupState::Loading { tag: tag.clone() });

        let resolver = self.resolver.clone();
        let state = self.state.clone();
        let shared = self.pending.clone();

        pending.task = Some(tokio::spawn(async move {
            let outcome = match resolver.resolve(&tag).await {
                Ok(card) => LookupState::Succeeded(card),
                Err(e) => LookupState::Failed(e),
            };

            let Ok(pending) = shared.lock() else { return };
            if pending.generation == generation {
                state.send_replace(outcome);
            } else {
                debug!("Discarding stale result for {}", tag);
            }
        }));
    }

    /// Abandons the in-flight lookup, if any, and returns to `Idle`.
    pub fn cancel(&self) {
        let mut pending = match self.pending.lock() {
            Ok(pending) => pending,
            Err(poisoned) => poisoned.into_inner(),
        };
        pending.abandon_current();
        pending.generation += 1;
        self.state.send_replace(LookupState::Idle);
    }

    /// Stops the session and hands back its resolver.
    ///
    /// Returns `None` if the resolver is still shared elsewhere.
    pub async fn into_resolver(self) -> Option<Resolver<F>> {
        let tasks = {
            let mut pending = match self.pending.lock() {
                Ok(pending) => pending,
                Err(poisoned) => poisoned.into_inner(),
            };
            pending.abandon_current();
            std::mem::take(&mut pending.abandoned)
        };
        for task in tasks {
            let _ = task.await;
        }
        Arc::try_unwrap(self.resolver).ok()
    }

    /// Waits until the session reaches a terminal state and returns it.
    pub async fn wait_terminal(&self) -> LookupState {
        let mut rx = self.subscribe();
        match rx.wait_for(|s| s.is_terminal() || *s == LookupState::Idle).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cardmarket::render::LoadSignal;
    use crate::cardmarket::{FetchResult, RenderContext, RenderedFetcher};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const PRODUCT_PAGE: &str = r#"<html><head><title>Card | Cardmarket</title></head><body>
        <h1>{name}</h1>
        <dl><dt>From</dt><dd>1,00 €</dd><dt>Price Trend</dt><dd><span>2,00 €</span></dd></dl>
    </body></html>"#;

    /// Serves a product page named after the tag, after a tag-dependent delay.
    struct SlowFetcher;

    #[async_trait]
    impl PageFetcher for SlowFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchResult, ResolutionError> {
            let (delay, name) = if url.contains("searchString=slow") {
                (Duration::from_secs(10), "Slow Card")
            } else {
                (Duration::from_secs(1), "Fast Card")
            };
            tokio::time::sleep(delay).await;
            Ok(FetchResult::new(PRODUCT_PAGE.replace("{name}", name), url))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_transitions_to_succeeded() {
        let session = LookupSession::new(Resolver::new(SlowFetcher));
        assert_eq!(session.state(), LookupState::Idle);

        session.submit("fast");
        assert_eq!(session.state(), LookupState::Loading { tag: "fast".to_string() });

        match session.wait_terminal().await {
            LookupState::Succeeded(card) => assert_eq!(card.name, "Fast Card"),
            other => panic!("unexpected state: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_tag_fails() {
        let session = LookupSession::new(Resolver::new(SlowFetcher));
        session.submit("   ");
        assert_eq!(session.wait_terminal().await, LookupState::Failed(ResolutionError::InvalidInput));
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_submit_abandons_previous() {
        let session = LookupSession::new(Resolver::new(SlowFetcher));
        let mut rx = session.subscribe();

        session.submit("slow");
        session.submit("fast");

        match session.wait_terminal().await {
            LookupState::Succeeded(card) => assert_eq!(card.name, "Fast Card"),
            other => panic!("unexpected state: {:?}", other),
        }

        // The abandoned lookup never publishes
        rx.borrow_and_update();
        tokio::time::sleep(Duration::from_secs(30)).await;
        match session.state() {
            LookupState::Succeeded(card) => assert_eq!(card.name, "Fast Card"),
            other => panic!("unexpected state: {:?}", other),
        }
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_returns_to_idle() {
        let session = LookupSession::new(Resolver::new(SlowFetcher));
        session.submit("slow");
        assert!(session.state().is_loading());

        session.cancel();
        assert_eq!(session.state(), LookupState::Idle);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(session.state(), LookupState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_into_resolver_after_abandoned_lookup() {
        let session = LookupSession::new(Resolver::new(SlowFetcher));
        session.submit("slow");

        let resolver = session.into_resolver().await;
        assert!(resolver.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_into_resolver_after_several_abandoned_lookups() {
        let session = LookupSession::new(Resolver::new(SlowFetcher));
        session.submit("slow");
        session.submit("slow-again");
        session.submit("fast");
        session.cancel();
        session.submit("slow-once-more");

        assert!(session.into_resolver().await.is_some());
    }

    /// Render context that counts cancellations and completes loads after a
    /// tag-dependent delay.
    struct CountingContext {
        cancels: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RenderContext for CountingContext {
        async fn start(&self, url: &str, signal: LoadSignal) -> Result<(), ResolutionError> {
            let (delay, name) = if url.contains("searchString=slow") {
                (Duration::from_secs(10), "Slow Card")
            } else {
                (Duration::from_secs(1), "Fast Card")
            };
            let url = url.to_string();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                signal.complete(url, Value::String(PRODUCT_PAGE.replace("{name}", name)));
            });
            Ok(())
        }

        fn cancel(&self) {
            self.cancels.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_render_is_cancelled() {
        let cancels = Arc::new(AtomicUsize::new(0));
        let fetcher = RenderedFetcher::new(CountingContext { cancels: cancels.clone() });
        let session = LookupSession::new(Resolver::new(fetcher));

        session.submit("slow");
        tokio::time::sleep(Duration::from_millis(100)).await;
        session.submit("fast");

        match session.wait_terminal().await {
            LookupState::Succeeded(card) => assert_eq!(card.name, "Fast Card"),
            other => panic!("unexpected state: {:?}", other),
        }
        // Only the abandoned load is cancelled
        assert_eq!(cancels.load(Ordering::SeqCst), 1);
    }
}
