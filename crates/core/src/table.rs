//! Search, sort and pagination for game tables

use std::cmp::Ordering;

use serde::Serialize;

use crate::models::{Game, SortColumn, SortOrder, TableViewState, DEFAULT_ITEMS_PER_PAGE};

/// One page of a filtered and sorted game list
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GamePage {
    pub games: Vec<Game>,
    /// Games matching the search, across all pages
    pub total_items: usize,
    pub total_pages: u32,
    /// Zero-based index of the first game on this page
    pub start_index: usize,
    /// Exclusive, clamped to `total_items`
    pub end_index: usize,
}

/// Case-insensitive name match, or appid substring match
pub fn matches_search(game: &Game, search_term: &str) -> bool {
    if search_term.is_empty() {
        return true;
    }
    game.name.to_lowercase().contains(&search_term.to_lowercase())
        || game.appid.to_string().contains(search_term)
}

pub fn filter_games<'a>(games: &'a [Game], search_term: &str) -> Vec<&'a Game> {
    games.iter().filter(|g| matches_search(g, search_term)).collect()
}

fn compare(a: &Game, b: &Game, column: SortColumn) -> Ordering {
    match column {
        SortColumn::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        SortColumn::Appid => a.appid.cmp(&b.appid),
        SortColumn::Playtime => a.playtime_forever.cmp(&b.playtime_forever),
        SortColumn::PlaytimeWindows => a
            .playtime_windows_forever
            .unwrap_or(0)
            .cmp(&b.playtime_windows_forever.unwrap_or(0)),
        SortColumn::PlaytimeMac => a
            .playtime_mac_forever
            .unwrap_or(0)
            .cmp(&b.playtime_mac_forever.unwrap_or(0)),
        SortColumn::PlaytimeLinux => a
            .playtime_linux_forever
            .unwrap_or(0)
            .cmp(&b.playtime_linux_forever.unwrap_or(0)),
        SortColumn::PlaytimeDeck => a
            .playtime_deck_forever
            .unwrap_or(0)
            .cmp(&b.playtime_deck_forever.unwrap_or(0)),
        SortColumn::LastPlayed => a.last_played().cmp(&b.last_played()),
    }
}

/// Stable sort; equal keys keep their incoming order
pub fn sort_games(games: &mut [&Game], column: SortColumn, order: SortOrder) {
    games.sort_by(|a, b| {
        let ordering = compare(a, b, column);
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

pub fn total_pages(total_items: usize, items_per_page: u32) -> u32 {
    let per_page = items_per_page.max(1) as usize;
    total_items.div_ceil(per_page) as u32
}

/// Apply a table view to `games`
pub fn page(games: &[Game], view: &TableViewState) -> GamePage {
    let mut rows = filter_games(games, &view.search_term);
    sort_games(&mut rows, view.sort_by, view.sort_order);

    let per_page = if view.items_per_page == 0 {
        DEFAULT_ITEMS_PER_PAGE
    } else {
        view.items_per_page
    } as usize;
    let total_items = rows.len();
    let start_index = (view.current_page.max(1) as usize - 1) * per_page;
    let end_index = (start_index + per_page).min(total_items);

    let games = rows
        .into_iter()
        .skip(start_index)
        .take(per_page)
        .cloned()
        .collect();

    GamePage {
        games,
        total_items,
        total_pages: total_pages(total_items, per_page as u32),
        start_index,
        end_index,
    }
}
