use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use time::macros::format_description;

use crate::cards::{Card, CardFields, CardHandle, CardPatch};
use crate::config::{AppConfig, ThemeName};
use crate::error::{ImportError, SessionError};
use crate::host::{
    default_renderer, Clipboard, MarkdownRenderer, SystemClipboard, SystemOpener, UrlOpener,
};
use crate::placeholders::{Clock, PlaceholderRegistry, SystemClock};
use crate::search::{CardQuery, QueryOutcome, TagCloud};
use crate::session::{CommitOutcome, EditSession};
use crate::storage::{KeyValueStore, CARDS_KEY, THEME_KEY};
use crate::store::{CardStore, PersistedSnapshot};

mod actions;
mod debounce;
mod events;

pub use debounce::Debouncer;
pub use events::{Anchor, BoardEvent, EventBus, Notification, Severity};

const LOAD_FAILED: &str = "Failed to load saved cards";
const SAVE_FAILED: &str = "Failed to save cards";
const IMPORT_OK: &str = "Import completed successfully!";
const IMPORT_FAILED: &str = "Import failed";
const RENDERER_MISSING: &str = "Markdown renderer is not available; cards will show raw text";

/// Collaborators the board calls out to.
pub struct Services {
    pub storage: Arc<dyn KeyValueStore>,
    pub clipboard: Arc<dyn Clipboard>,
    pub opener: Arc<dyn UrlOpener>,
    pub clock: Arc<dyn Clock>,
    pub renderer: Option<Box<dyn MarkdownRenderer>>,
}

impl Services {
    /// Host clipboard, launcher, clock and (if enabled) markdown renderer.
    pub fn host(storage: Arc<dyn KeyValueStore>, markdown: bool) -> Self {
        Self {
            storage,
            clipboard: Arc::new(SystemClipboard),
            opener: Arc::new(SystemOpener),
            clock: Arc::new(SystemClock),
            renderer: default_renderer(markdown),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BoardOptions {
    pub debounce: Duration,
    pub default_theme: ThemeName,
    pub export_dir: PathBuf,
    pub export_on_save: bool,
    pub pretty_export: bool,
}

impl BoardOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            debounce: config.debounce(),
            default_theme: config.theme,
            export_dir: config.export.directory.clone(),
            export_on_save: config.export.on_save,
            pretty_export: config.export.pretty,
        }
    }
}

impl Default for BoardOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Declined,
    Missing,
}

/// The card board: owns the collection and keeps the tag cloud and
/// visibility in step with it.
///
/// Mutations mark the derived views stale; they are rebuilt once the
/// debounce window has passed since the last mutation ([`Board::poll`]) or
/// on demand ([`Board::settle`]). Failures at the collaborator boundary are
/// reported as [`Notification`]s, never propagated as panics.
pub struct Board {
    store: CardStore,
    query: CardQuery,
    cloud: TagCloud,
    outcome: QueryOutcome,
    recompute: Debouncer,
    session: EditSession,
    placeholders: PlaceholderRegistry,
    services: Services,
    events: EventBus,
    options: BoardOptions,
    theme: ThemeName,
}

impl Board {
    /// Builds the board, restores the theme and saved cards, and settles the
    /// derived views.
    pub fn open(options: BoardOptions, services: Services) -> Self {
        let placeholders =
            PlaceholderRegistry::builtin(services.clock.clone(), services.clipboard.clone());
        let mut board = Self {
            store: CardStore::new(),
            query: CardQuery::default(),
            cloud: TagCloud::default(),
            outcome: QueryOutcome::default(),
            recompute: Debouncer::new(options.debounce),
            session: EditSession::new(),
            placeholders,
            services,
            events: EventBus::default(),
            theme: options.default_theme,
            options,
        };
        board.theme = board.stored_theme();
        if board.services.renderer.is_none() {
            tracing::warn!("markdown renderer unavailable");
            board.notify(Severity::Error, RENDERER_MISSING, None);
        }
        board.load_saved_cards();
        board.settle();
        board
    }

    pub fn subscribe(&mut self) -> Receiver<BoardEvent> {
        self.events.subscribe()
    }

    pub fn store(&self) -> &CardStore {
        &self.store
    }

    pub fn cards(&self) -> &[Card] {
        self.store.cards()
    }

    pub fn card(&self, handle: CardHandle) -> Option<&Card> {
        self.store.get(handle)
    }

    pub fn handle_at(&self, index: usize) -> Option<CardHandle> {
        self.store.handle_at(index)
    }

    pub fn query(&self) -> &CardQuery {
        &self.query
    }

    /// Last settled tag cloud.
    pub fn tag_cloud(&self) -> &TagCloud {
        &self.cloud
    }

    /// Last evaluated visibility.
    pub fn visibility(&self) -> &QueryOutcome {
        &self.outcome
    }

    pub fn is_stale(&self) -> bool {
        self.recompute.is_pending()
    }

    pub fn placeholders(&self) -> &PlaceholderRegistry {
        &self.placeholders
    }

    pub fn theme(&self) -> ThemeName {
        self.theme
    }

    pub fn renderer_available(&self) -> bool {
        self.services.renderer.is_some()
    }

    pub fn edit_session(&self) -> &EditSession {
        &self.session
    }

    pub fn create_card(&mut self, fields: Option<CardFields>) -> CardHandle {
        let handle = self.store.create(fields);
        self.mark_stale();
        handle
    }

    pub fn update_card(&mut self, handle: CardHandle, patch: CardPatch) -> bool {
        let updated = self.store.update(handle, patch);
        if updated {
            self.mark_stale();
        }
        updated
    }

    /// Deletes after `confirm` approves. Voids an edit session on the card
    /// and saves.
    pub fn delete_card<F>(&mut self, handle: CardHandle, confirm: F) -> DeleteOutcome
    where
        F: FnOnce(&Card) -> bool,
    {
        let Some(card) = self.store.get(handle) else {
            return DeleteOutcome::Missing;
        };
        if !confirm(card) {
            tracing::debug!(%handle, "delete declined");
            return DeleteOutcome::Declined;
        }
        self.store.delete(handle);
        self.session.invalidate(handle);
        self.mark_stale();
        self.persist();
        DeleteOutcome::Deleted
    }

    pub fn set_search(&mut self, text: impl Into<String>) {
        self.query.set_search_text(text);
        self.mark_stale();
    }

    /// Flips one tag filter and re-evaluates every card immediately.
    pub fn toggle_tag(&mut self, tag: &str) -> bool {
        let active = self.query.toggle_tag(tag);
        tracing::debug!(tag, active, "tag filter toggled");
        self.reevaluate();
        active
    }

    pub fn clear_filters(&mut self) {
        self.query.clear();
        self.reevaluate();
    }

    pub fn poll(&mut self) -> bool {
        self.poll_at(Instant::now())
    }

    /// Rebuilds the derived views if the debounce window has elapsed at `now`.
    pub fn poll_at(&mut self, now: Instant) -> bool {
        if self.recompute.take_due(now) {
            self.refresh();
            true
        } else {
            false
        }
    }

    /// Rebuilds any pending derived views right away.
    pub fn settle(&mut self) -> bool {
        if self.recompute.take() {
            self.refresh();
            true
        } else {
            false
        }
    }

    pub fn begin_edit(&mut self, handle: CardHandle) -> Result<bool, SessionError> {
        self.session.open(&self.store, handle)
    }

    pub fn edit_buffer(&self) -> Option<&str> {
        self.session.buffer()
    }

    pub fn set_edit_buffer(&mut self, text: impl Into<String>) -> Result<(), SessionError> {
        self.session.set_buffer(text)
    }

    /// Commits the open edit and saves. A voided session writes nothing.
    pub fn commit_edit(&mut self) -> Result<CommitOutcome, SessionError> {
        let outcome = self.session.commit(&mut self.store)?;
        match outcome {
            CommitOutcome::Written(handle) => {
                tracing::info!(%handle, "card edit committed");
                self.mark_stale();
                self.persist();
            }
            CommitOutcome::Voided(handle) => {
                tracing::debug!(%handle, "commit skipped for deleted card");
            }
        }
        Ok(outcome)
    }

    pub fn discard_edit(&mut self) -> Result<(), SessionError> {
        self.session.discard()
    }

    /// Card text with placeholders resolved. The stored text is untouched.
    pub fn resolve_card_text(&self, handle: CardHandle) -> Option<String> {
        self.store
            .get(handle)
            .map(|card| self.placeholders.substitute(card.text()))
    }

    pub fn render_card(&self, handle: CardHandle) -> Option<String> {
        let renderer = self.services.renderer.as_ref()?;
        self.store
            .get(handle)
            .map(|card| renderer.render(card.text()))
    }

    /// Writes the snapshot to the key-value store, plus a dated export file
    /// when configured. Returns the export path if one was written.
    pub fn save(&self) -> Result<Option<PathBuf>> {
        let json = self
            .store
            .serialize()
            .to_json(false)
            .context("serialising cards")?;
        self.services
            .storage
            .set(CARDS_KEY, &json)
            .context("saving cards")?;
        tracing::info!(count = self.store.len(), "cards saved");
        if self.options.export_on_save {
            return self.export().map(Some);
        }
        Ok(None)
    }

    pub fn export_json(&self) -> Result<String> {
        self.store
            .serialize()
            .to_json(self.options.pretty_export)
            .context("serialising cards for export")
    }

    pub fn export(&self) -> Result<PathBuf> {
        self.export_to(&self.options.export_dir)
    }

    /// Writes `cards_YYYY-MM-DD.json` into `dir`.
    pub fn export_to(&self, dir: &Path) -> Result<PathBuf> {
        let date = self
            .services
            .clock
            .now()
            .date()
            .format(format_description!("[year]-[month]-[day]"))
            .context("formatting export date")?;
        fs::create_dir_all(dir)
            .with_context(|| format!("creating export directory {}", dir.display()))?;
        let path = dir.join(format!("cards_{date}.json"));
        fs::write(&path, self.export_json()?)
            .with_context(|| format!("writing export {}", path.display()))?;
        tracing::info!(path = %path.display(), count = self.store.len(), "cards exported");
        Ok(path)
    }

    /// Replaces the collection with the decoded document and saves it.
    /// Malformed input leaves the current collection untouched.
    pub fn import_json(&mut self, raw: &str) -> Result<usize, ImportError> {
        let snapshot = match PersistedSnapshot::from_json(raw) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(error = %err, "import rejected");
                self.notify(Severity::Error, IMPORT_FAILED, None);
                return Err(err);
            }
        };
        let count = snapshot.len();
        self.store.load(snapshot);
        self.mark_stale();
        self.persist();
        tracing::info!(count, "cards imported");
        self.notify(Severity::Success, IMPORT_OK, None);
        Ok(count)
    }

    pub fn import_file(&mut self, path: &Path) -> Result<usize> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) => {
                self.notify(Severity::Error, IMPORT_FAILED, None);
                return Err(err).with_context(|| format!("reading import {}", path.display()));
            }
        };
        self.import_json(&raw)
            .with_context(|| format!("importing {}", path.display()))
    }

    pub fn toggle_theme(&mut self) -> Result<ThemeName> {
        let next = self.theme.toggled();
        self.services
            .storage
            .set(THEME_KEY, &next.to_string())
            .context("saving theme preference")?;
        tracing::info!(from = %self.theme, to = %next, "theme changed");
        self.theme = next;
        Ok(next)
    }

    pub(crate) fn notify(&mut self, severity: Severity, message: &str, anchor: Option<Anchor>) {
        self.events.publish(BoardEvent::Notify(
            Notification::new(severity, message).anchored(anchor),
        ));
    }

    fn persist(&mut self) -> bool {
        match self.save() {
            Ok(_) => true,
            Err(err) => {
                tracing::error!(error = ?err, "saving cards failed");
                self.notify(Severity::Error, SAVE_FAILED, None);
                false
            }
        }
    }

    fn mark_stale(&mut self) {
        self.recompute.mark(Instant::now());
    }

    fn refresh(&mut self) {
        self.cloud = TagCloud::build(self.store.cards());
        tracing::debug!(tags = self.cloud.len(), "tag cloud rebuilt");
        self.events
            .publish(BoardEvent::TagCloudRefreshed(self.cloud.clone()));
        self.reevaluate();
    }

    fn reevaluate(&mut self) {
        self.outcome = self.query.evaluate(self.store.cards());
        tracing::debug!(
            visible = self.outcome.visible,
            total = self.outcome.total(),
            "visibility evaluated"
        );
        self.events
            .publish(BoardEvent::VisibilityChanged(self.outcome.clone()));
    }

    fn stored_theme(&self) -> ThemeName {
        match self.services.storage.get(THEME_KEY) {
            Ok(Some(raw)) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(theme = %raw, "unknown stored theme, using default");
                self.options.default_theme
            }),
            Ok(None) => self.options.default_theme,
            Err(err) => {
                tracing::warn!(error = ?err, "reading theme preference failed");
                self.options.default_theme
            }
        }
    }

    fn load_saved_cards(&mut self) {
        let raw = match self.services.storage.get(CARDS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(err) => {
                tracing::error!(error = ?err, "reading saved cards failed");
                self.notify(Severity::Error, LOAD_FAILED, None);
                return;
            }
        };
        match PersistedSnapshot::from_json(&raw) {
            Ok(snapshot) => {
                tracing::info!(count = snapshot.len(), "saved cards loaded");
                self.store.load(snapshot);
                self.mark_stale();
            }
            Err(err) => {
                tracing::error!(error = %err, "saved cards are malformed");
                self.notify(Severity::Error, LOAD_FAILED, None);
            }
        }
    }
}
