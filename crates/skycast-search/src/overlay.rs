//! Search overlay state machine.
//!
//! All transitions are synchronous; the only asynchronous input is
//! [`LookupOutcome`], which the event loop pulls with
//! [`SearchOverlay::next_outcome`] and feeds back through
//! [`SearchOverlay::apply_outcome`].

use crate::debounce::{Debouncer, LookupOutcome, QueryChange};
use crate::favorites::FavoritesStore;
use crate::geocode::Geocoder;
use crate::history::HistoryStore;
use crate::persist::StoreState;
use crate::types::City;
use skycast_core::SearchConfig;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayMode {
    /// Overlay closed
    Idle,
    /// Open and unfocused: current city and favorites
    BrowsingDefault,
    /// Focused with text: loading, results or "nothing found"
    TypingQuery,
    /// Focused without text: history or "history is empty"
    BrowsingHistory,
}

/// Ephemeral per-opening state
#[derive(Debug, Clone, Default)]
pub struct SearchSession {
    pub query: String,
    pub focused: bool,
    pub results: Vec<City>,
    pub searching: bool,
}

/// A city row with its star state
#[derive(Debug, Clone, PartialEq)]
pub struct CityRow {
    pub city: City,
    pub favorite: bool,
}

/// What the renderer should draw
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayView {
    Hidden,
    Default {
        current_city: String,
        favorites: Vec<CityRow>,
    },
    Searching,
    Results(Vec<CityRow>),
    NoResults,
    History(Vec<String>),
    EmptyHistory,
}

/// What the user picked before the overlay closed
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    City(City),
    Label(String),
}

impl Selection {
    pub fn label(&self) -> String {
        match self {
            Selection::City(city) => city.label(),
            Selection::Label(label) => label.clone(),
        }
    }
}

pub struct SearchOverlay {
    current_city: String,
    session: Option<SearchSession>,
    favorites: Arc<FavoritesStore>,
    history: Arc<HistoryStore>,
    debouncer: Debouncer,
    outcomes: mpsc::UnboundedReceiver<LookupOutcome>,
}

impl SearchOverlay {
    pub fn new(
        current_city: impl Into<String>,
        geocoder: Arc<dyn Geocoder>,
        config: &SearchConfig,
        favorites: Arc<FavoritesStore>,
        history: Arc<HistoryStore>,
    ) -> Self {
        let (debouncer, outcomes) = Debouncer::from_config(geocoder, config);
        Self::with_debouncer(current_city, debouncer, outcomes, favorites, history)
    }

    pub fn with_debouncer(
        current_city: impl Into<String>,
        debouncer: Debouncer,
        outcomes: mpsc::UnboundedReceiver<LookupOutcome>,
        favorites: Arc<FavoritesStore>,
        history: Arc<HistoryStore>,
    ) -> Self {
        Self {
            current_city: current_city.into(),
            session: None,
            favorites,
            history,
            debouncer,
            outcomes,
        }
    }

    pub fn mode(&self) -> OverlayMode {
        match &self.session {
            None => OverlayMode::Idle,
            Some(s) if !s.focused => OverlayMode::BrowsingDefault,
            Some(s) if s.query.trim().is_empty() => OverlayMode::BrowsingHistory,
            Some(_) => OverlayMode::TypingQuery,
        }
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&SearchSession> {
        self.session.as_ref()
    }

    pub fn open(&mut self) {
        if self.session.is_none() {
            tracing::debug!("Search overlay opened");
            self.session = Some(SearchSession::default());
        }
    }

    /// Discard the session and any pending lookup
    pub fn close(&mut self) {
        self.debouncer.cancel();
        if self.session.take().is_some() {
            tracing::debug!("Search overlay closed");
        }
    }

    /// The shell's single open/close control
    pub fn toggle_visibility(&mut self) {
        if self.is_open() {
            self.close();
        } else {
            self.open();
        }
    }

    pub fn focus(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.focused = true;
        }
    }

    /// Drop focus but keep the typed text
    pub fn blur(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.focused = false;
        }
    }

    /// Clear text and results and leave the input
    pub fn cancel(&mut self) {
        self.debouncer.cancel();
        if let Some(session) = self.session.as_mut() {
            *session = SearchSession::default();
        }
    }

    /// Called on every keystroke with the full input text
    pub fn set_query(&mut self, text: &str) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.query = text.to_string();

        match self.debouncer.on_query_change(text) {
            QueryChange::Cleared => {
                session.results.clear();
                session.searching = false;
            }
            QueryChange::Scheduled(_) => {
                session.searching = true;
            }
        }
    }

    /// Wait for the next finished lookup, current or not
    pub async fn next_outcome(&mut self) -> Option<LookupOutcome> {
        self.outcomes.recv().await
    }

    /// Apply a lookup result if it still belongs to the visible query.
    ///
    /// Returns `false` for stale outcomes, which are dropped.
    pub fn apply_outcome(&mut self, outcome: LookupOutcome) -> bool {
        let LookupOutcome { seq, query, result } = outcome;

        let Some(session) = self.session.as_mut() else {
            tracing::debug!(seq, "Dropping lookup result for closed overlay");
            return false;
        };
        if !self.debouncer.is_current(seq) || session.query.trim() != query {
            tracing::debug!(seq, query = %query, "Dropping stale lookup result");
            return false;
        }
        self.debouncer.complete(seq);

        session.searching = false;
        session.results = match result {
            Ok(cities) => cities,
            Err(e) => {
                tracing::warn!(query = %query, "City search failed: {}", e);
                Vec::new()
            }
        };
        true
    }

    /// Pick a row from the search results
    pub fn select_result(&mut self, index: usize) -> Option<Selection> {
        if self.mode() != OverlayMode::TypingQuery {
            return None;
        }
        let city = self.session.as_ref()?.results.get(index)?.clone();
        Some(self.select(Selection::City(city)))
    }

    /// Pick a row from the favorites list
    pub fn select_favorite(&mut self, index: usize) -> Option<Selection> {
        if self.mode() != OverlayMode::BrowsingDefault {
            return None;
        }
        let city = self.favorites.snapshot().get(index)?.clone();
        Some(self.select(Selection::City(city)))
    }

    /// Pick a row from the history list
    pub fn select_history(&mut self, index: usize) -> Option<Selection> {
        if self.mode() != OverlayMode::BrowsingHistory {
            return None;
        }
        let label = self.history.snapshot().get(index)?.clone();
        Some(self.select(Selection::Label(label)))
    }

    /// Record the selection and close the overlay
    pub fn select(&mut self, selection: Selection) -> Selection {
        let label = selection.label();
        self.history.record(&label);
        if let Selection::City(city) = &selection {
            tracing::info!(
                latitude = city.latitude,
                longitude = city.longitude,
                "Selected city: {}",
                label
            );
        } else {
            tracing::info!("Selected history entry: {}", label);
        }
        self.close();
        selection
    }

    /// Star control on a city row. Never selects the row.
    ///
    /// Returns whether the city is now a favorite. Returns `None` without
    /// changing anything while favorites are still loading, since the row's
    /// star could not reflect the outcome yet.
    pub fn toggle_favorite(&mut self, city: &City) -> Option<bool> {
        if self.favorites.state() != StoreState::Ready {
            tracing::debug!("Ignoring star toggle before favorites are loaded");
            return None;
        }
        self.favorites.toggle(city)
    }

    /// Star control on the n-th visible row (results or favorites).
    /// `None` when there is no such row or favorites are still loading.
    pub fn toggle_favorite_at(&mut self, index: usize) -> Option<bool> {
        let city = match self.mode() {
            OverlayMode::TypingQuery => self.session.as_ref()?.results.get(index)?.clone(),
            OverlayMode::BrowsingDefault => self.favorites.snapshot().get(index)?.clone(),
            OverlayMode::Idle | OverlayMode::BrowsingHistory => return None,
        };
        self.toggle_favorite(&city)
    }

    pub fn view(&self) -> OverlayView {
        let Some(session) = &self.session else {
            return OverlayView::Hidden;
        };

        match self.mode() {
            OverlayMode::Idle => OverlayView::Hidden,
            OverlayMode::BrowsingDefault => OverlayView::Default {
                current_city: self.current_city.clone(),
                favorites: self
                    .favorites
                    .snapshot()
                    .into_iter()
                    .map(|city| CityRow { city, favorite: true })
                    .collect(),
            },
            OverlayMode::TypingQuery if session.searching => OverlayView::Searching,
            OverlayMode::TypingQuery if session.results.is_empty() => OverlayView::NoResults,
            OverlayMode::TypingQuery => OverlayView::Results(
                session
                    .results
                    .iter()
                    .map(|city| CityRow {
                        favorite: self.favorites.is_favorite(city),
                        city: city.clone(),
                    })
                    .collect(),
            ),
            OverlayMode::BrowsingHistory => {
                let entries = self.history.snapshot();
                if entries.is_empty() {
                    OverlayView::EmptyHistory
                } else {
                    OverlayView::History(entries)
                }
            }
        }
    }
}
