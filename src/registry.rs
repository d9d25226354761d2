use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;
use tracing::warn;

use crate::contest::{Contest, ContestId};
use crate::sanitize::{SafeName, sanitize};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("contest {0} is not in the current listing")]
pub struct LookupError(pub ContestId);

/// Contests of one fetch keyed by id, in feed order. Replaced wholesale by
/// the next fetch.
#[derive(Debug, Clone, Default)]
pub struct ContestRegistry {
    order: Vec<ContestId>,
    by_id: HashMap<ContestId, Contest>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContestRow {
    pub key: ContestId,
    pub event: String,
    pub site: String,
    pub starts_in: TimeDelta,
    pub safe_name: SafeName,
}

impl ContestRegistry {
    pub fn build(contests: Vec<Contest>) -> Self {
        let mut order = Vec::with_capacity(contests.len());
        let mut by_id = HashMap::with_capacity(contests.len());
        for contest in contests {
            if by_id.contains_key(&contest.id) {
                warn!(id = %contest.id, "duplicate contest id in listing; keeping first");
                continue;
            }
            order.push(contest.id.clone());
            by_id.insert(contest.id.clone(), contest);
        }
        Self { order, by_id }
    }

    pub fn lookup(&self, id: &ContestId) -> Result<&Contest, LookupError> {
        self.by_id
            .get(id)
            .ok_or_else(|| LookupError(id.clone()))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contests(&self) -> impl Iterator<Item = &Contest> {
        self.order.iter().filter_map(|id| self.by_id.get(id))
    }

    pub fn row_key(&self, index: usize) -> Option<&ContestId> {
        self.order.get(index)
    }

    pub fn rows(&self, now: DateTime<Utc>) -> Vec<ContestRow> {
        self.contests()
            .map(|contest| ContestRow {
                key: contest.id.clone(),
                event: contest.event_name.clone(),
                site: contest.site.clone(),
                starts_in: time_remaining(contest, now),
                safe_name: sanitize(&contest.event_name),
            })
            .collect()
    }
}

/// Signed time until start; negative once the contest has begun.
pub fn time_remaining(contest: &Contest, now: DateTime<Utc>) -> TimeDelta {
    contest.start_time - now
}
