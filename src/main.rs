use std::sync::Arc;

use anyhow::{Context, Result};
use skycast_core::AppError;
use skycast_search::{
    FavoritesStore, FileStore, GeocodingClient, HistoryStore, KeyValueStore, OverlayView,
    SearchOverlay,
};
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
Commands:
  open | close | toggle     show or hide the search overlay
  focus | blur | cancel     search field focus
  type <text>               replace the search text (empty clears it)
  select <n>                pick the n-th visible row
  star <n>                  toggle favorite on the n-th visible row
  show                      redraw the overlay
  quit                      exit";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize core
    skycast_core::init()?;

    // Create and initialize application
    let mut app = skycast_core::App::new()?;
    app.initialize()?;
    let config = app.shared_config();

    let store: Arc<dyn KeyValueStore> = Arc::new(
        FileStore::new(&config.storage.data_dir).context("Failed to open data directory")?,
    );
    let favorites = Arc::new(FavoritesStore::new(store.clone()));
    let history = Arc::new(HistoryStore::new(store));
    tokio::join!(favorites.load(), history.load());

    let geocoder = Arc::new(
        GeocodingClient::new(&config.search).map_err(|e| anyhow::anyhow!(AppError::from(e)))?,
    );
    if !geocoder.is_configured() {
        println!("City search is disabled until an API key is configured.");
    }

    let mut overlay = SearchOverlay::new(
        config.current_city.clone(),
        geocoder,
        &config.search,
        favorites.clone(),
        history.clone(),
    );

    tracing::info!("Skycast started");
    println!("Skycast - city search");
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    break;
                };
                if !handle_command(&mut overlay, line.trim_end()) {
                    break;
                }
                render(&overlay);
            }
            Some(outcome) = overlay.next_outcome() => {
                let failure = outcome.result.as_ref().err().map(user_message);
                if overlay.apply_outcome(outcome) {
                    if let Some(message) = failure {
                        println!("  ! {message}");
                    }
                    render(&overlay);
                }
            }
        }
    }

    // Graceful shutdown
    overlay.close();
    tokio::join!(favorites.flush(), history.flush());
    app.shutdown()?;

    Ok(())
}

fn user_message(e: &skycast_search::GeocodeError) -> &'static str {
    match e {
        skycast_search::GeocodeError::Network(n) => n.user_message(),
        skycast_search::GeocodeError::Client(_) => "City search is unavailable.",
    }
}

/// Returns false when the shell should exit
fn handle_command(overlay: &mut SearchOverlay, line: &str) -> bool {
    let (command, arg) = match line.split_once(' ') {
        Some((command, arg)) => (command, arg),
        None => (line, ""),
    };

    match command {
        "open" => overlay.open(),
        "close" => overlay.close(),
        "toggle" => overlay.toggle_visibility(),
        "focus" => overlay.focus(),
        "blur" => overlay.blur(),
        "cancel" => overlay.cancel(),
        "type" => overlay.set_query(arg),
        "select" => match parse_row(arg) {
            Some(index) => select_row(overlay, index),
            None => println!("  usage: select <n>"),
        },
        "star" => match parse_row(arg).and_then(|i| overlay.toggle_favorite_at(i)) {
            Some(true) => println!("  ★ added to favorites"),
            Some(false) => println!("  ☆ removed from favorites"),
            None => println!("  nothing to star there"),
        },
        "show" | "" => {}
        "quit" | "exit" => return false,
        "help" => println!("{HELP}"),
        other => println!("  unknown command: {other} (try help)"),
    }
    true
}

fn parse_row(arg: &str) -> Option<usize> {
    arg.trim().parse::<usize>().ok()?.checked_sub(1)
}

fn select_row(overlay: &mut SearchOverlay, index: usize) {
    let selection = match overlay.view() {
        OverlayView::Default { .. } => overlay.select_favorite(index),
        OverlayView::Results(_) => overlay.select_result(index),
        OverlayView::History(_) => overlay.select_history(index),
        _ => None,
    };
    match selection {
        Some(selection) => println!("  selected: {}", selection.label()),
        None => println!("  no such row"),
    }
}

fn render(overlay: &SearchOverlay) {
    let query = overlay
        .session()
        .map(|s| s.query.as_str())
        .unwrap_or_default();

    match overlay.view() {
        OverlayView::Hidden => println!("[overlay closed]"),
        OverlayView::Default {
            current_city,
            favorites,
        } => {
            println!("[search: {query}]");
            println!("Current city");
            println!("  ⌖ {current_city}");
            if !favorites.is_empty() {
                println!("Favorite cities");
                for (i, row) in favorites.iter().enumerate() {
                    println!("  {}. ★ {} ({})", i + 1, row.city.title(), row.city.country);
                }
            }
        }
        OverlayView::Searching => {
            println!("[search: {query}]");
            println!("  Searching for cities...");
        }
        OverlayView::Results(rows) => {
            println!("[search: {query}]");
            println!("Search results");
            for (i, row) in rows.iter().enumerate() {
                let star = if row.favorite { "★" } else { "☆" };
                println!("  {}. {} ({}) {}", i + 1, row.city.title(), row.city.country, star);
            }
        }
        OverlayView::NoResults => {
            println!("[search: {query}]");
            println!("  No cities found");
        }
        OverlayView::History(entries) => {
            println!("[search: ]");
            println!("Search history");
            for (i, entry) in entries.iter().enumerate() {
                println!("  {}. {}", i + 1, entry);
            }
        }
        OverlayView::EmptyHistory => {
            println!("[search: ]");
            println!("  Search history is empty");
        }
    }
}
