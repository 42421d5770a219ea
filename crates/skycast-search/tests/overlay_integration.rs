//! End-to-end overlay scenarios against a mock geocoding server and
//! file-backed stores.

use std::sync::Arc;

use skycast_core::SearchConfig;
use skycast_search::{
    FavoritesStore, FileStore, GeocodingClient, HistoryStore, KeyValueStore, OverlayMode,
    OverlayView, SearchOverlay, HISTORY_LIMIT,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct App {
    overlay: SearchOverlay,
    favorites: Arc<FavoritesStore>,
    history: Arc<HistoryStore>,
}

/// Build stores and overlay the way the binary does, loading before use
async fn start(data_dir: &std::path::Path, config: &SearchConfig) -> App {
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(data_dir).unwrap());
    let favorites = Arc::new(FavoritesStore::new(store.clone()));
    let history = Arc::new(HistoryStore::new(store));
    favorites.load().await;
    history.load().await;

    let geocoder = Arc::new(GeocodingClient::new(config).unwrap());
    let overlay = SearchOverlay::new("Москва", geocoder, config, favorites.clone(), history.clone());
    App {
        overlay,
        favorites,
        history,
    }
}

async fn shutdown(app: App) {
    app.favorites.flush().await;
    app.history.flush().await;
}

fn fast_config(server: &MockServer) -> SearchConfig {
    SearchConfig {
        api_key: Some("test-key".into()),
        base_url: format!("{}/geo/1.0/direct", server.uri()),
        debounce_ms: 50,
        ..SearchConfig::default()
    }
}

async fn mount_paris(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .and(query_param("q", "Paris"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {
                "name": "Paris",
                "local_names": { "ru": "Париж" },
                "country": "FR",
                "state": "Ile-de-France",
                "lat": 48.8589,
                "lon": 2.32
            }
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_missing_credential_shows_empty_state() {
    let dir = tempfile::tempdir().unwrap();
    let config = SearchConfig {
        api_key: None,
        debounce_ms: 20,
        ..SearchConfig::default()
    };
    let mut app = start(dir.path(), &config).await;

    app.overlay.open();
    app.overlay.focus();
    app.overlay.set_query("Berlin");
    let outcome = app.overlay.next_outcome().await.unwrap();
    assert!(outcome.result.as_ref().unwrap().is_empty());
    assert!(app.overlay.apply_outcome(outcome));

    assert_eq!(app.overlay.view(), OverlayView::NoResults);
}

#[tokio::test]
async fn test_starred_result_survives_restart() {
    let mock_server = MockServer::start().await;
    mount_paris(&mock_server).await;
    let dir = tempfile::tempdir().unwrap();
    let config = fast_config(&mock_server);

    let mut app = start(dir.path(), &config).await;
    app.overlay.open();
    app.overlay.focus();
    app.overlay.set_query("Paris");
    let outcome = app.overlay.next_outcome().await.unwrap();
    assert!(app.overlay.apply_outcome(outcome));
    assert_eq!(app.overlay.toggle_favorite_at(0), Some(true));
    app.overlay.close();
    shutdown(app).await;

    let mut restarted = start(dir.path(), &config).await;
    restarted.overlay.open();
    assert_eq!(restarted.overlay.mode(), OverlayMode::BrowsingDefault);
    let OverlayView::Default { current_city, favorites } = restarted.overlay.view() else {
        unreachable!("expected default view");
    };
    assert_eq!(current_city, "Москва");
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].city.title(), "Париж, Ile-de-France");
    assert!(favorites[0].favorite);
}

#[tokio::test]
async fn test_history_selection_survives_restart() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = fast_config(&mock_server);

    let app = start(dir.path(), &config).await;
    for i in 0..HISTORY_LIMIT {
        app.history.record(&format!("city-{i}"));
    }
    app.history.record("London");
    shutdown(app).await;

    let mut app = start(dir.path(), &config).await;
    let before = app.history.snapshot();
    assert_eq!(before.len(), HISTORY_LIMIT);
    assert_eq!(before[0], "London");

    app.overlay.open();
    app.overlay.focus();
    // Pick "London" again from history
    let selection = app.overlay.select_history(0).unwrap();
    assert_eq!(selection.label(), "London");
    assert_eq!(app.overlay.mode(), OverlayMode::Idle);
    shutdown(app).await;

    let restarted = start(dir.path(), &config).await;
    let after = restarted.history.snapshot();
    assert_eq!(after, before);
    assert_eq!(after.iter().filter(|e| *e == "London").count(), 1);
}

#[tokio::test]
async fn test_selecting_result_records_label() {
    let mock_server = MockServer::start().await;
    mount_paris(&mock_server).await;
    let dir = tempfile::tempdir().unwrap();
    let config = fast_config(&mock_server);

    let mut app = start(dir.path(), &config).await;
    app.overlay.open();
    app.overlay.focus();
    app.overlay.set_query("Paris");
    let outcome = app.overlay.next_outcome().await.unwrap();
    assert!(app.overlay.apply_outcome(outcome));

    let selection = app.overlay.select_result(0).unwrap();
    assert_eq!(selection.label(), "Париж, Ile-de-France, FR");
    assert!(!app.overlay.is_open());
    assert_eq!(app.history.snapshot(), vec!["Париж, Ile-de-France, FR"]);
}

#[tokio::test]
async fn test_corrupted_files_start_empty() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("weather.favorite_cities.json"), "not json").unwrap();
    std::fs::write(dir.path().join("weather.search_history.json"), "{\"a\":1}").unwrap();

    let config = SearchConfig::default();
    let app = start(dir.path(), &config).await;
    assert!(app.favorites.is_empty());
    assert_eq!(app.history.entries_len(), 0);

    // New data replaces the unreadable files
    app.history.record("Oslo");
    shutdown(app).await;
    let restarted = start(dir.path(), &config).await;
    assert_eq!(restarted.history.snapshot(), vec!["Oslo"]);
}
