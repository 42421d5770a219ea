//! City search for Skycast
//!
//! Debounced geocoding lookups, persisted favorites and search history, and
//! the state machine behind the search overlay.

pub mod debounce;
pub mod error_mapping;
pub mod favorites;
pub mod geocode;
pub mod history;
pub mod overlay;
pub mod persist;
pub mod storage;
pub mod types;

pub use debounce::{schedule, CancelToken, Debouncer, LookupOutcome, QueryChange};
pub use favorites::FavoritesStore;
pub use geocode::{Geocoder, GeocodingClient};
pub use history::{HistoryStore, HISTORY_LIMIT};
pub use overlay::{CityRow, OverlayMode, OverlayView, SearchOverlay, SearchSession, Selection};
pub use persist::{PersistedList, StoreState};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use types::{to_city, City, GeocodeError};
