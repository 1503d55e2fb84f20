use crate::cards::CardHandle;
use crate::error::OpenError;

use super::{Anchor, Board, Severity};

const COPIED: &str = "Text copied!";
const COPY_FAILED: &str = "Failed to copy text";
const SEVERAL_LINKS: &str = "Opening several links; the host may block all but the first";
const LINKS_BLOCKED: &str = "The host blocked opening links. Allow pop-ups to open every link.";
const LINKS_FAILED: &str = "An error occurred while opening links.";

impl Board {
    /// Copies the card text, with placeholders resolved, to the clipboard.
    pub fn copy_card(&mut self, handle: CardHandle, anchor: Option<Anchor>) -> bool {
        let Some(text) = self.resolve_card_text(handle) else {
            return false;
        };
        match self.services.clipboard.write_text(&text) {
            Ok(()) => {
                tracing::debug!(%handle, bytes = text.len(), "card text copied");
                self.notify(Severity::Success, COPIED, anchor);
                true
            }
            Err(err) => {
                tracing::warn!(%handle, error = %err, "clipboard write failed");
                self.notify(Severity::Error, COPY_FAILED, anchor);
                false
            }
        }
    }

    /// Opens every URL on the card in order. A failing URL is reported and
    /// the rest are still attempted. Returns whether all of them opened.
    pub fn open_urls(&mut self, handle: CardHandle) -> bool {
        let Some(urls) = self.store.get(handle).map(|card| card.urls().to_vec()) else {
            return false;
        };
        if urls.is_empty() {
            return false;
        }
        if urls.len() > 1 {
            self.notify(Severity::Warning, SEVERAL_LINKS, None);
        }

        let mut all_opened = true;
        for url in &urls {
            match self.services.opener.open(url) {
                Ok(()) => tracing::debug!(%handle, url, "link opened"),
                Err(OpenError::Blocked(_)) => {
                    tracing::warn!(%handle, url, "link blocked by host");
                    self.notify(Severity::Error, LINKS_BLOCKED, None);
                    all_opened = false;
                }
                Err(err) => {
                    tracing::warn!(%handle, url, error = %err, "opening link failed");
                    self.notify(Severity::Error, LINKS_FAILED, None);
                    all_opened = false;
                }
            }
        }
        all_opened
    }

    /// Title activation: copy the text, then open the card's links.
    pub fn activate(&mut self, handle: CardHandle, anchor: Option<Anchor>) -> bool {
        let copied = self.copy_card(handle, anchor);
        let has_links = self
            .store
            .get(handle)
            .is_some_and(|card| !card.urls().is_empty());
        if has_links {
            self.open_urls(handle);
        }
        copied
    }
}
