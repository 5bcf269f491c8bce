//! Session controller
//!
//! Owns everything a browsing session needs: the active system and its
//! catalog, the selection, the latest conflict result and the search state.
//! Every selection change re-runs the conflict check before returning, so
//! the result always describes the selection as it is now.
//!
//! # State Flow
//!
//! ```text
//! Idle ──toggle──▶ Selecting ──check──▶ Resolved{conflict}
//!  ▲                  │  ▲                     │
//!  │                  │  └──────toggle─────────┘
//!  └──empty / clear───┴────────────────────────┘
//! ```
//!
//! There is no terminal state and nothing is persisted.

use serde::{Serialize, Serializer};
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::catalog::CatalogTree;
use crate::config::AppConfig;
use crate::error::{ComposerError, Result};
use crate::logic::{self, CommandOptions, ConflictResult, EvaluationOptions, SuggestionSet};
use crate::module::{Module, ModuleClassifier, RawModule};
use crate::provider::CatalogProvider;
use crate::selection::{SelectionSet, ToggleOutcome};

/// Where the session is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// Nothing selected
    #[default]
    Idle,
    /// The selection changed and has not been checked yet
    Selecting,
    /// The selection was checked
    Resolved { conflict: bool },
}

impl SessionState {
    pub const fn description(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Selecting => "Selecting",
            Self::Resolved { conflict: false } => "Resolved (loadable)",
            Self::Resolved { conflict: true } => "Resolved (conflict)",
        }
    }

    /// Short name used in JSON output
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Selecting => "selecting",
            Self::Resolved { .. } => "resolved",
        }
    }

    fn can_move_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Idle, Self::Selecting)
                | (Self::Selecting, Self::Resolved { .. })
                | (Self::Selecting, Self::Idle)
                | (Self::Resolved { .. }, Self::Selecting)
                | (Self::Resolved { .. }, Self::Idle)
        )
    }
}

// The conflict flag is reported next to the state, so only the name is written
impl Serialize for SessionState {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur during state transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionTransitionError {
    #[error("Cannot move from {from} to {to}")]
    Invalid { from: SessionState, to: SessionState },
}

impl From<SessionTransitionError> for ComposerError {
    fn from(err: SessionTransitionError) -> Self {
        ComposerError::SessionTransition(err.to_string())
    }
}

/// Trailing-edge debounce: fires once the input has been quiet for `window`
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Register input at `now`, pushing the deadline out
    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Drop a pending deadline without firing
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// True once per burst, when the deadline has passed
    pub fn ready(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// A dispatched search; only the newest ticket's response is applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    pub id: u64,
    pub system: String,
    pub query: String,
}

#[derive(Debug)]
struct SearchState {
    debouncer: Debouncer,
    query: String,
    /// Bumped on every dispatch, query edit and system switch; a response
    /// is applied only if its ticket carries the current value
    generation: u64,
    results: Option<CatalogTree>,
}

/// Tunables for a session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub evaluation: EvaluationOptions,
    pub command: CommandOptions,
    pub search_debounce: Duration,
    pub classifier: ModuleClassifier,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl SessionOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            evaluation: config.evaluation_options(),
            command: config.command,
            search_debounce: config.search_debounce(),
            classifier: config.classifier(),
        }
    }
}

/// Snapshot handed to the render layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub state: SessionState,
    pub system: Option<String>,
    pub selected: Vec<Module>,
    pub conflict: bool,
    pub message: String,
    pub suggestions: Option<SuggestionSet>,
    /// Load command, present when the selection is non-empty and loadable
    pub command: Option<String>,
    /// Soft failure shown to the user (catalog or suggestion problems)
    pub notice: Option<String>,
}

/// Drives one browsing session against a catalog provider
#[derive(Debug)]
pub struct SessionController<P: CatalogProvider> {
    provider: P,
    options: SessionOptions,
    system: Option<String>,
    catalog: Option<CatalogTree>,
    selection: SelectionSet,
    result: ConflictResult,
    state: SessionState,
    notice: Option<String>,
    search: SearchState,
}

impl<P: CatalogProvider> SessionController<P> {
    pub fn new(provider: P, options: SessionOptions) -> Self {
        let debouncer = Debouncer::new(options.search_debounce);
        Self {
            provider,
            options,
            system: None,
            catalog: None,
            selection: SelectionSet::new(),
            result: ConflictResult::loadable(),
            state: SessionState::Idle,
            notice: None,
            search: SearchState {
                debouncer,
                query: String::new(),
                generation: 0,
                results: None,
            },
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn result(&self) -> &ConflictResult {
        &self.result
    }

    pub fn catalog(&self) -> Option<&CatalogTree> {
        self.catalog.as_ref()
    }

    pub fn system(&self) -> Option<&str> {
        self.system.as_deref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Switch to `system`, loading its catalog and clearing the selection.
    ///
    /// Searches still in flight for the previous system are discarded when
    /// they complete. On failure the session stays usable with no catalog,
    /// an empty search result and a notice describing the problem.
    pub fn select_system(&mut self, system: &str) -> Result<()> {
        self.clear_all();
        self.system = Some(system.to_string());
        self.search.query.clear();
        self.search.debouncer.cancel();
        self.search.generation += 1;

        match self.provider.get_catalog(system) {
            Ok(tree) => {
                tracing::info!("Session switched to {} ({} modules)", system, tree.len());
                self.search.results = Some(tree.clone());
                self.catalog = Some(tree);
                self.notice = None;
                Ok(())
            }
            Err(e) => {
                self.catalog = None;
                self.search.results = Some(CatalogTree::with_classifier(self.options.classifier.clone()));
                self.notice = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Add or remove a module, then re-check the selection
    pub fn toggle_module(&mut self, module: Module) -> Result<ToggleOutcome> {
        self.transition_to(SessionState::Selecting)?;
        let outcome = self.selection.toggle(module);
        tracing::debug!("Toggle {:?}: {} selected", outcome, self.selection.len());
        self.resolve()?;
        Ok(outcome)
    }

    /// Add a module unless an equal one is already selected, then re-check.
    ///
    /// Returns false if the selection already held it. Batch input such as
    /// a conflict request goes through here so a repeated entry stays in.
    pub fn add_module(&mut self, module: Module) -> Result<bool> {
        self.transition_to(SessionState::Selecting)?;
        let added = self.selection.add(module);
        tracing::debug!("Add (new: {}): {} selected", added, self.selection.len());
        self.resolve()?;
        Ok(added)
    }

    /// Validate a raw record and toggle it.
    ///
    /// # Errors
    ///
    /// `InvalidModule` if the record is malformed; nothing changes.
    pub fn toggle_raw(&mut self, raw: RawModule) -> Result<ToggleOutcome> {
        let module = self.options.classifier.classify(raw)?;
        self.toggle_module(module)
    }

    /// Empty the selection and return to `Idle`
    pub fn clear_all(&mut self) {
        self.selection.clear();
        self.result = ConflictResult::loadable();
        self.state = SessionState::Idle;
    }

    /// Move to `target` if the transition is allowed
    pub fn transition_to(&mut self, target: SessionState) -> std::result::Result<SessionState, SessionTransitionError> {
        if !self.state.can_move_to(target) {
            return Err(SessionTransitionError::Invalid {
                from: self.state,
                to: target,
            });
        }
        self.state = target;
        Ok(target)
    }

    fn resolve(&mut self) -> Result<()> {
        if self.selection.is_empty() {
            self.result = ConflictResult::loadable();
            self.transition_to(SessionState::Idle)?;
            return Ok(());
        }

        self.result = logic::evaluate(
            self.selection.as_slice(),
            self.catalog.as_ref(),
            &self.options.evaluation,
        );
        if self.result.conflict {
            tracing::info!("Selection conflicts: {}", self.result.message);
        }
        self.transition_to(SessionState::Resolved {
            conflict: self.result.conflict,
        })?;
        Ok(())
    }

    /// Load command for the current selection, if it is loadable
    pub fn command(&self) -> Option<String> {
        if self.selection.is_empty() || self.result.conflict {
            return None;
        }
        logic::build_with(self.selection.as_slice(), &self.options.command).ok()
    }

    pub fn view(&self) -> SessionView {
        let notice = self
            .notice
            .clone()
            .or_else(|| self.result.suggestion_error.clone());
        SessionView {
            state: self.state,
            system: self.system.clone(),
            selected: self.selection.as_slice().to_vec(),
            conflict: self.result.conflict,
            message: self.result.message.clone(),
            suggestions: self.result.suggestions.clone(),
            command: self.command(),
            notice,
        }
    }

    // =========================================================================
    // Search
    // =========================================================================

    pub fn query(&self) -> &str {
        &self.search.query
    }

    /// Latest applied search result
    pub fn search_results(&self) -> Option<&CatalogTree> {
        self.search.results.as_ref()
    }

    /// Record new search text; the query is dispatched after the debounce window.
    ///
    /// A ticket issued for earlier text is stale from here on.
    pub fn set_query(&mut self, query: &str, now: Instant) {
        self.search.query = query.to_string();
        self.search.generation += 1;
        self.search.debouncer.trigger(now);
    }

    /// Issue a ticket if the debounce window has elapsed
    pub fn poll_search(&mut self, now: Instant) -> Option<SearchTicket> {
        if !self.search.debouncer.ready(now) {
            return None;
        }
        let system = self.system.clone()?;
        self.search.generation += 1;
        Some(SearchTicket {
            id: self.search.generation,
            system,
            query: self.search.query.clone(),
        })
    }

    /// Apply a search response. Returns false if the ticket is stale.
    pub fn complete_search(&mut self, ticket: &SearchTicket, response: Result<CatalogTree>) -> bool {
        if ticket.id != self.search.generation || self.system.as_deref() != Some(ticket.system.as_str()) {
            tracing::debug!(
                "Dropping stale search response #{} for {} (current #{})",
                ticket.id,
                ticket.system,
                self.search.generation
            );
            return false;
        }

        match response {
            Ok(tree) => {
                self.search.results = Some(tree);
                self.notice = None;
            }
            Err(e) => {
                tracing::warn!("Search failed: {}", e);
                self.search.results = Some(CatalogTree::with_classifier(self.options.classifier.clone()));
                self.notice = Some(e.to_string());
            }
        }
        true
    }

    /// Poll, run the search through the provider and apply it
    pub fn run_search(&mut self, now: Instant) -> bool {
        match self.poll_search(now) {
            Some(ticket) => {
                let response = self.provider.search(&ticket.system, &ticket.query);
                self.complete_search(&ticket, response)
            }
            None => false,
        }
    }
}
