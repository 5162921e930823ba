//! Interactive mode: tags read line by line, each one superseding the last.

use crate::cardmarket::{PageFetcher, Resolver};
use crate::commands::lookup::{close_rendered, direct_fetcher, normalize_tag, rendered_fetcher};
use crate::config::{Config, FetchStrategy};
use crate::format::Formatter;
use crate::session::{LookupSession, LookupState};
use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

/// Reads tags from a line-oriented input and prints every state transition.
pub struct InteractiveCommand {
    config: Config,
}

impl InteractiveCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Runs against stdin and stdout until end of input.
    pub async fn execute(&self) -> Result<()> {
        let reader = BufReader::new(tokio::io::stdin());
        let mut writer = tokio::io::stdout();

        match self.config.fetcher {
            FetchStrategy::Direct => {
                let session = LookupSession::new(Resolver::new(direct_fetcher(&self.config)?));
                self.run(&session, reader, &mut writer).await
            }
            FetchStrategy::Rendered => {
                let fetcher = rendered_fetcher(&self.config).await?;
                let session = LookupSession::new(Resolver::new(fetcher));
                let result = self.run(&session, reader, &mut writer).await;
                match session.into_resolver().await {
                    Some(resolver) => close_rendered(resolver).await,
                    None => warn!("WebDriver session still in use, leaving it open"),
                }
                result
            }
        }
    }

    /// Drives `session` from `reader`, writing rendered states to `writer`.
    ///
    /// Returns once input is exhausted and the last lookup has settled.
    pub async fn run<F, R, W>(
        &self,
        session: &LookupSession<F>,
        reader: R,
        writer: &mut W,
    ) -> Result<()>
    where
        F: PageFetcher + 'static,
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let formatter = Formatter::new(self.config.format);
        let mut lines = reader.lines();
        let mut states = session.subscribe();
        let mut input_open = true;
        let mut current = String::new();

        loop {
            tokio::select! {
                line = lines.next_line(), if input_open => match line? {
                    Some(line) => {
                        current = normalize_tag(&line);
                        session.submit(current.clone());
                    }
                    None => {
                        debug!("End of input");
                        input_open = false;
                    }
                },
                changed = states.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = states.borrow_and_update().clone();
                    if let Some(text) = render_state(&formatter, &current, &state) {
                        writer.write_all(text.as_bytes()).await?;
                        writer.write_all(b"\n").await?;
                        writer.flush().await?;
                    }
                }
            }

            let pending = session.state().is_loading() || states.has_changed().unwrap_or(false);
            if !input_open && !pending {
                break;
            }
        }

        Ok(())
    }
}

fn render_state(formatter: &Formatter, tag: &str, state: &LookupState) -> Option<String> {
    match state {
        LookupState::Idle => None,
        LookupState::Loading { tag } => Some(format!("Loading {}...", tag)),
        LookupState::Succeeded(card) => Some(formatter.format_card(tag, card)),
        LookupState::Failed(e) => Some(formatter.format_error(tag, e)),
    }
}
