use crate::persist::{PersistedList, StoreState};
use crate::storage::KeyValueStore;
use crate::types::City;
use std::sync::Arc;

pub const FAVORITES_KEY: &str = "weather.favorite_cities";

/// User-curated cities, in the order they were starred
pub struct FavoritesStore {
    list: PersistedList<City>,
}

impl FavoritesStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            list: PersistedList::new(FAVORITES_KEY, store, dedup_by_place),
        }
    }

    pub async fn load(&self) {
        self.list.load().await;
    }

    pub fn state(&self) -> StoreState {
        self.list.state()
    }

    pub fn is_favorite(&self, city: &City) -> bool {
        self.list.read(|cities| cities.iter().any(|c| c.same_place(city)))
    }

    /// Remove the city if starred, append it otherwise.
    ///
    /// Returns whether the city is now a favorite, or `None` when the store
    /// is still loading and the toggle was queued. The outcome of a queued
    /// toggle depends on what load finds, so it is not guessed here.
    pub fn toggle(&self, city: &City) -> Option<bool> {
        let city = city.clone();
        self.list.update(move |cities| {
            if let Some(pos) = cities.iter().position(|c| c.same_place(&city)) {
                let removed = cities.remove(pos);
                tracing::debug!("Removed favorite: {}", removed.label());
                false
            } else {
                tracing::debug!("Added favorite: {}", city.label());
                cities.push(city);
                true
            }
        })
    }

    pub fn snapshot(&self) -> Vec<City> {
        self.list.snapshot()
    }

    pub fn len(&self) -> usize {
        self.list.read(<[City]>::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub async fn flush(&self) {
        self.list.flush().await;
    }
}

fn dedup_by_place(cities: &mut Vec<City>) {
    let mut seen: Vec<City> = Vec::with_capacity(cities.len());
    cities.retain(|city| {
        if seen.iter().any(|c| c.same_place(city)) {
            false
        } else {
            seen.push(city.clone());
            true
        }
    });
}
