//! Decrypt-then-filter search over protected fields.
//!
//! Envelopes are randomised, so storage cannot evaluate a substring predicate
//! over them. Storage narrows the candidate set with the non-protected
//! predicates ([`crate::store::CandidateFilter`]); this module opens every
//! candidate, applies the text predicate in memory, and only then sorts and
//! paginates.
//!
//! # Cost
//!
//! A text search performs one scrypt derivation and one AEAD open per
//! protected field of **every** candidate, regardless of the requested page
//! size. Latency grows linearly with the candidate count. This is the price of
//! non-deterministic encryption; do not replace it with a storage-level
//! `LIKE`, which would match nothing or require deterministic ciphertext.
//!
//! # Failure policy
//!
//! A candidate that fails to open is excluded from the result and counted in
//! [`Page::skipped`]; the search itself does not fail. Single-record reads
//! ([`crate::service::BookmarkVault::get`]) are strict instead.

use std::time::Instant;

use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use common::{protocol::Page, ServiceError};

use crate::crypto::{CipherError, MasterSecret};
use crate::record::{reveal, Bookmark, BookmarkMeta, SealedBookmark};

/// Errors from the search executor itself (not from individual records).
#[derive(Debug, Error)]
pub enum SearchError {
    /// A decrypt worker panicked or was cancelled.
    #[error("search worker failed: {0}")]
    Worker(String),
}

impl From<SearchError> for ServiceError {
    fn from(err: SearchError) -> Self {
        ServiceError::Internal(err.to_string())
    }
}

/// Offset/limit applied after filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub limit: usize,
    pub offset: usize,
}

/// Runs listings and text searches over a candidate set.
#[derive(Clone, Debug)]
pub struct SearchExecutor {
    secret: MasterSecret,
    concurrency: usize,
}

impl SearchExecutor {
    /// `concurrency` bounds how many blocking decrypt workers one call uses.
    pub fn new(secret: MasterSecret, concurrency: usize) -> Self {
        Self {
            secret,
            concurrency: concurrency.max(1),
        }
    }

    /// Produce one page from `candidates`.
    ///
    /// Without a search term the candidates are sorted and paginated first and
    /// only the page is opened. With a term every candidate is opened, filtered,
    /// sorted, and paginated; `total` counts the filtered set.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Worker`] only if a decrypt worker dies. Records
    /// that fail to open are skipped, not reported as errors.
    pub async fn execute(
        &self,
        candidates: Vec<SealedBookmark>,
        search: Option<&str>,
        window: PageWindow,
    ) -> Result<Page<Bookmark>, SearchError> {
        match search_term(search) {
            None => self.browse(candidates, window).await,
            Some(needle) => self.search(candidates, &needle, window).await,
        }
    }

    async fn browse(
        &self,
        mut candidates: Vec<SealedBookmark>,
        window: PageWindow,
    ) -> Result<Page<Bookmark>, SearchError> {
        let total = candidates.len();
        candidates.sort_by(|a, b| newest_first(&a.meta, &b.meta));
        let page = paginate(candidates, window);

        let (mut data, skipped) = self.reveal_all(page).await?;
        data.sort_by(|a, b| newest_first(&a.meta, &b.meta));

        debug!(total, returned = data.len(), skipped, "listing page served");
        Ok(Page {
            data,
            total,
            limit: window.limit,
            offset: window.offset,
            skipped,
        })
    }

    async fn search(
        &self,
        candidates: Vec<SealedBookmark>,
        needle: &str,
        window: PageWindow,
    ) -> Result<Page<Bookmark>, SearchError> {
        let started = Instant::now();
        let candidate_count = candidates.len();

        // Every candidate must resolve before anything is filtered or paged.
        let (revealed, skipped) = self.reveal_all(candidates).await?;

        let mut hits: Vec<Bookmark> = revealed
            .into_iter()
            .filter(|b| matches_text(b, needle))
            .collect();
        hits.sort_by(|a, b| newest_first(&a.meta, &b.meta));

        let total = hits.len();
        let data = paginate(hits, window);

        info!(
            candidates = candidate_count,
            matched = total,
            skipped,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "text search completed"
        );

        Ok(Page {
            data,
            total,
            limit: window.limit,
            offset: window.offset,
            skipped,
        })
    }

    /// Open `records` on the blocking pool. Failures are dropped and counted.
    /// Output order is unspecified.
    async fn reveal_all(
        &self,
        records: Vec<SealedBookmark>,
    ) -> Result<(Vec<Bookmark>, usize), SearchError> {
        if records.is_empty() {
            return Ok((Vec::new(), 0));
        }

        let chunk_size = records.len().div_ceil(self.concurrency);
        let mut remaining = records.into_iter();
        let mut workers = JoinSet::new();
        loop {
            let chunk: Vec<SealedBookmark> = remaining.by_ref().take(chunk_size).collect();
            if chunk.is_empty() {
                break;
            }
            let secret = self.secret.clone();
            workers.spawn_blocking(move || {
                chunk
                    .into_iter()
                    .map(|record| (record.meta.id, reveal(record, &secret)))
                    .collect::<Vec<(Uuid, Result<Bookmark, CipherError>)>>()
            });
        }

        let mut revealed = Vec::new();
        let mut skipped = 0;
        while let Some(joined) = workers.join_next().await {
            let outcomes = joined.map_err(|e| SearchError::Worker(e.to_string()))?;
            for (id, outcome) in outcomes {
                match outcome {
                    Ok(bookmark) => revealed.push(bookmark),
                    Err(e) => {
                        skipped += 1;
                        warn!(bookmark_id = %id, error = %e, "excluding bookmark that failed to decrypt");
                    }
                }
            }
        }
        Ok((revealed, skipped))
    }
}

/// Lower-cased search term, or `None` when there is nothing to search for.
fn search_term(search: Option<&str>) -> Option<String> {
    search
        .filter(|s| !s.trim().is_empty())
        .map(str::to_lowercase)
}

/// `needle` must already be lower-case.
fn matches_text(bookmark: &Bookmark, needle: &str) -> bool {
    [
        Some(bookmark.title.as_str()),
        bookmark.description.as_deref(),
        Some(bookmark.url.as_str()),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(needle))
}

/// Most recently updated first; id breaks ties so paging is stable.
fn newest_first(a: &BookmarkMeta, b: &BookmarkMeta) -> std::cmp::Ordering {
    b.updated_at
        .cmp(&a.updated_at)
        .then_with(|| a.id.cmp(&b.id))
}

fn paginate<T>(items: Vec<T>, window: PageWindow) -> Vec<T> {
    items
        .into_iter()
        .skip(window.offset)
        .take(window.limit)
        .collect()
}
