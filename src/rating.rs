use serde::Deserialize;
use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::http::{HttpFetch, TransportError};

#[derive(Debug, Error)]
pub enum RatingError {
    #[error("no Codeforces handle configured")]
    MissingHandle,
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("unexpected Codeforces response: {0}")]
    Unexpected(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeforcesRating {
    pub rating: Option<i64>,
    pub rank: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    status: String,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    result: Vec<UserInfo>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    #[serde(default)]
    rating: Option<i64>,
    #[serde(default)]
    rank: Option<String>,
}

pub fn fetch_codeforces_rating<T: HttpFetch>(
    transport: &T,
    endpoint: &Url,
    handle: &str,
) -> Result<CodeforcesRating, RatingError> {
    let handle = handle.trim();
    if handle.is_empty() {
        return Err(RatingError::MissingHandle);
    }
    let mut url = endpoint.clone();
    url.query_pairs_mut().append_pair("handles", handle);
    let body = transport.get_text(&url)?;
    let response: UserInfoResponse =
        serde_json::from_str(&body).map_err(|err| RatingError::Unexpected(err.to_string()))?;
    if response.status != "OK" {
        return Err(RatingError::Unexpected(
            response.comment.unwrap_or(response.status),
        ));
    }
    let user = response
        .result
        .into_iter()
        .next()
        .ok_or_else(|| RatingError::Unexpected("empty result".to_string()))?;
    Ok(CodeforcesRating {
        rating: user.rating,
        rank: user.rank,
    })
}

pub fn rating_line(result: &Result<CodeforcesRating, RatingError>) -> String {
    match result {
        Ok(user) => {
            let rating = user
                .rating
                .map(|value| value.to_string())
                .unwrap_or_else(|| "N/A".to_string());
            let rank = user.rank.as_deref().unwrap_or("Unranked");
            format!("CF: {rating} ({rank})")
        }
        Err(RatingError::Transport(err)) => {
            warn!(error = %err, "codeforces rating request failed");
            "CF: Offline".to_string()
        }
        Err(err) => {
            warn!(error = %err, "codeforces rating unavailable");
            "CF: Error".to_string()
        }
    }
}
