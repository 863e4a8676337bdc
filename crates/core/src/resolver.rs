//! Common-games resolution: which games do the user and all reachable friends own?
//!
//! Friends are fetched one at a time. Steam's rate limiter punishes bursts,
//! and a rate-limit answer for one friend means every later call fails too,
//! so the first RateLimited error aborts the whole batch.

use std::collections::HashSet;

use crate::error::{ClassifiedError, PlayTogetherError, Result};
use crate::messages::CommonGamesResult;
use crate::models::Game;
use crate::steam::SteamApi;

/// Result of fetching one friend's library
enum FriendStep {
    Continue(FriendLibrary),
    AbortBatch(PlayTogetherError),
}

enum FriendLibrary {
    Public(Vec<Game>),
    Private,
}

/// Drop repeated ids, keeping first-occurrence order
pub fn dedup_friend_ids(friend_ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    friend_ids
        .iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

async fn fetch_friend<A: SteamApi + ?Sized>(api: &A, friend_id: &str, api_key: &str) -> FriendStep {
    match api.owned_games(friend_id, api_key).await {
        Ok(owned) => {
            let games = owned.into_games();
            // An empty list is indistinguishable from a private profile
            if games.is_empty() {
                FriendStep::Continue(FriendLibrary::Private)
            } else {
                FriendStep::Continue(FriendLibrary::Public(games))
            }
        }
        Err(e) if e.is_rate_limited() => FriendStep::AbortBatch(e),
        Err(e) => {
            tracing::debug!(friend = %friend_id, error = %e, "Skipping friend with inaccessible library");
            FriendStep::Continue(FriendLibrary::Private)
        }
    }
}

/// Games from `primary` owned by every friend list, sorted by name (case-insensitive)
pub fn intersect_libraries(primary: &[Game], friend_libraries: &[Vec<Game>]) -> Vec<Game> {
    let friend_sets: Vec<HashSet<u64>> = friend_libraries
        .iter()
        .map(|games| games.iter().map(|g| g.appid).collect())
        .collect();

    let mut common: Vec<Game> = primary
        .iter()
        .filter(|game| friend_sets.iter().all(|set| set.contains(&game.appid)))
        .cloned()
        .collect();

    sort_by_name(&mut common);
    common
}

pub(crate) fn sort_by_name(games: &mut [Game]) {
    games.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then(a.appid.cmp(&b.appid))
    });
}

/// Resolve the games `primary_id` has in common with every friend whose library is visible.
///
/// Friends with private or empty libraries, or whose fetch failed for any
/// reason other than a rate limit, are reported in `private_friends` and left
/// out of the intersection.
pub async fn resolve_common_games<A: SteamApi + ?Sized>(
    api: &A,
    primary_id: &str,
    friend_ids: &[String],
    api_key: &str,
) -> Result<CommonGamesResult> {
    let primary_games = api.owned_games(primary_id, api_key).await?.into_games();
    if primary_games.is_empty() {
        return Ok(CommonGamesResult {
            message: "No games found in your library".to_string(),
            ..Default::default()
        });
    }

    let friend_ids = dedup_friend_ids(friend_ids);
    let mut public_friends = Vec::new();
    let mut private_friends = Vec::new();
    let mut friend_libraries = Vec::new();

    for friend_id in &friend_ids {
        match fetch_friend(api, friend_id, api_key).await {
            FriendStep::AbortBatch(e) => {
                tracing::warn!(friend = %friend_id, "Rate limited while resolving common games, aborting batch");
                return Err(e);
            }
            FriendStep::Continue(FriendLibrary::Public(games)) => {
                public_friends.push(friend_id.clone());
                friend_libraries.push(games);
            }
            FriendStep::Continue(FriendLibrary::Private) => {
                private_friends.push(friend_id.clone());
            }
        }
    }

    if friend_libraries.is_empty() {
        return Ok(CommonGamesResult {
            common_games: Vec::new(),
            public_friends,
            private_friends,
            message: "No friends with public profiles found".to_string(),
        });
    }

    let common_games = intersect_libraries(&primary_games, &friend_libraries);
    let message = format!(
        "Found {} common games with {} friends",
        common_games.len(),
        public_friends.len()
    );

    Ok(CommonGamesResult {
        common_games,
        public_friends,
        private_friends,
        message,
    })
}

impl CommonGamesResult {
    /// Soft failure describing excluded friends, `None` when everyone was included
    pub fn partial_failure(&self) -> Option<ClassifiedError> {
        let excluded = self.private_friends.len();
        if excluded == 0 {
            return None;
        }
        let plural = if excluded == 1 { "" } else { "s" };
        Some(ClassifiedError {
            kind: crate::error::ErrorKind::PartialFailure,
            message: format!("{} friend{} excluded from common games", excluded, plural),
            user_message: format!(
                "{} friend{} couldn't be included (private profile{})",
                excluded, plural, plural
            ),
            status_code: 200,
            retry_after_seconds: None,
        })
    }
}
