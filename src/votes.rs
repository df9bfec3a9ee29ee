//! Vote ledger: one integer counter per `(category, nominee)` pair, keyed
//! `vote:{categorySlug}:{nomineeId}` in the shared store. Casting a vote is
//! a single atomic increment, so concurrent votes for the same nominee
//! cannot lose updates. There is no server-side duplicate protection; the
//! one-vote-per-category rule lives entirely in client-held state.

use serde::Serialize;

use crate::{
    database::KeyValueStore,
    error::{AppError, AppResult},
};

pub const VOTE_PREFIX: &str = "vote:";

/// Placeholder for a key segment that could not be recovered from a
/// malformed stored key. Kept in tally output so bad data stays visible.
const UNKNOWN_SEGMENT: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteKey {
    pub category_slug: String,
    pub nominee_id: String,
}

impl VoteKey {
    pub fn new(category_slug: &str, nominee_id: &str) -> AppResult<Self> {
        if category_slug.is_empty() {
            return Err(AppError::Validation("categorySlug is required".to_string()));
        }
        if nominee_id.is_empty() {
            return Err(AppError::Validation("nomineeId is required".to_string()));
        }

        Ok(Self {
            category_slug: category_slug.to_string(),
            nominee_id: nominee_id.to_string(),
        })
    }

    pub fn storage_key(&self) -> String {
        format!("{VOTE_PREFIX}{}:{}", self.category_slug, self.nominee_id)
    }

    /// Recovers the pair from a stored key. A key missing a segment still
    /// decodes, with `unknown` standing in for whatever is missing.
    pub fn decode(raw: &str) -> Self {
        let stripped = raw.strip_prefix(VOTE_PREFIX).unwrap_or(raw);

        let (category, nominee) = match stripped.split_once(':') {
            Some((category, nominee)) => (category, nominee),
            None => (stripped, ""),
        };

        Self {
            category_slug: non_empty_or_unknown(category),
            nominee_id: non_empty_or_unknown(nominee),
        }
    }
}

fn non_empty_or_unknown(segment: &str) -> String {
    if segment.is_empty() {
        UNKNOWN_SEGMENT.to_string()
    } else {
        segment.to_string()
    }
}

#[derive(Debug)]
pub struct CastOutcome {
    pub key: VoteKey,
    pub new_count: i64,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TallyEntry {
    pub category_slug: String,
    pub nominee_id: String,
    pub count: i64,
}

/// Casts one vote. Validation happens before any store access, so a
/// rejected call never mutates a counter. Deliberately not idempotent:
/// every accepted call increments.
pub async fn cast_vote(
    store: &dyn KeyValueStore,
    category_slug: &str,
    nominee_id: &str,
) -> AppResult<CastOutcome> {
    let key = VoteKey::new(category_slug, nominee_id)?;
    let new_count = store.increment(&key.storage_key()).await?;

    Ok(CastOutcome { key, new_count })
}

/// Enumerates every counter in the vote namespace and fetches the counts
/// in one batched call. All-or-nothing: any storage failure fails the
/// whole tally. Zero votes is an empty result, not an error.
pub async fn tally(store: &dyn KeyValueStore) -> AppResult<Vec<TallyEntry>> {
    let keys = store.scan_prefix(VOTE_PREFIX).await?;
    let counts = store.get_many(&keys).await?;

    Ok(keys
        .iter()
        .zip(counts)
        .map(|(raw, count)| {
            let key = VoteKey::decode(raw);
            TallyEntry {
                category_slug: key.category_slug,
                nominee_id: key.nominee_id,
                count: count.unwrap_or(0),
            }
        })
        .collect())
}
