//! Persistence seam for sealed bookmarks.
//!
//! # Module invariants
//!
//! - **Storage only ever sees envelopes** for protected fields. Nothing in this
//!   module imports the cipher.
//! - **No text predicate.** [`CandidateFilter`] has no field for the search
//!   term; envelopes are not comparable, so a storage-level `LIKE` over them
//!   would silently return nothing useful.

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use common::{protocol::BookmarkQuery, ServiceError};

use crate::record::{BookmarkMeta, SealedBookmark, SealedPatch};

/// Errors surfaced by a [`BookmarkStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not complete the call.
    #[error("storage backend failed: {0}")]
    Backend(String),

    /// An insert collided with an existing id.
    #[error("duplicate bookmark id: {0}")]
    Duplicate(Uuid),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Backend(msg) => ServiceError::Storage(msg),
            StoreError::Duplicate(id) => ServiceError::Internal(format!("duplicate bookmark id {id}")),
        }
    }
}

/// Predicates over non-protected attributes, evaluated by storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFilter {
    pub owner_id: Uuid,
    /// Case-insensitive tag name.
    pub tag: Option<String>,
    pub collection_id: Option<Uuid>,
    pub favorite: Option<bool>,
    pub read: Option<bool>,
}

impl CandidateFilter {
    /// Everything owned by `owner_id`.
    pub fn owner(owner_id: Uuid) -> Self {
        Self {
            owner_id,
            tag: None,
            collection_id: None,
            favorite: None,
            read: None,
        }
    }

    /// Take the storage-answerable part of a listing query. The search term is
    /// left behind on purpose.
    pub fn from_query(owner_id: Uuid, query: &BookmarkQuery) -> Self {
        Self {
            owner_id,
            tag: query
                .tag
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_owned),
            collection_id: query.collection_id,
            favorite: query.favorite,
            read: query.read,
        }
    }

    /// Reference evaluation of the filter, for in-process stores.
    pub fn matches(&self, meta: &BookmarkMeta) -> bool {
        meta.owner_id == self.owner_id
            && self
                .tag
                .as_deref()
                .map_or(true, |tag| meta.tags.iter().any(|t| t.to_lowercase() == tag.to_lowercase()))
            && self.collection_id.map_or(true, |c| meta.collection_id == Some(c))
            && self.favorite.map_or(true, |f| meta.favorite == f)
            && self.read.map_or(true, |r| meta.read == r)
    }
}

/// Storage collaborator for sealed bookmarks.
///
/// Every lookup is scoped by owner; a record owned by someone else behaves as
/// if it did not exist.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookmarkStore: Send + Sync {
    /// Persist a new record.
    async fn insert(&self, record: SealedBookmark) -> Result<(), StoreError>;

    /// Fetch one record, or `None` if `owner_id` has no record `id`.
    async fn fetch(&self, owner_id: Uuid, id: Uuid) -> Result<Option<SealedBookmark>, StoreError>;

    /// Apply `patch` and return the stored result, or `None` if absent.
    async fn update(
        &self,
        owner_id: Uuid,
        id: Uuid,
        patch: SealedPatch,
    ) -> Result<Option<SealedBookmark>, StoreError>;

    /// Remove one record. Returns `false` if it did not exist.
    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<bool, StoreError>;

    /// Return every record matching `filter`, unpaginated and in no
    /// particular order.
    async fn candidates(&self, filter: &CandidateFilter) -> Result<Vec<SealedBookmark>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fixtures;

    #[test]
    fn from_query_drops_search_term() {
        let owner = Uuid::new_v4();
        let query = BookmarkQuery {
            search: Some("rust".into()),
            tag: Some("  Lang ".into()),
            favorite: Some(true),
            ..BookmarkQuery::default()
        };
        let filter = CandidateFilter::from_query(owner, &query);
        assert_eq!(filter.owner_id, owner);
        assert_eq!(filter.tag.as_deref(), Some("Lang"));
        assert_eq!(filter.favorite, Some(true));
        assert_eq!(filter.read, None);
    }

    #[test]
    fn blank_tag_is_no_filter() {
        let query = BookmarkQuery {
            tag: Some("   ".into()),
            ..BookmarkQuery::default()
        };
        assert_eq!(CandidateFilter::from_query(Uuid::nil(), &query).tag, None);
    }

    #[test]
    fn matches_checks_owner_and_flags() {
        let owner = Uuid::new_v4();
        let mut meta = fixtures::bookmark(owner, "a", 0).meta;
        meta.tags = vec!["Rust".into()];
        meta.favorite = true;

        assert!(CandidateFilter::owner(owner).matches(&meta));
        assert!(!CandidateFilter::owner(Uuid::new_v4()).matches(&meta));

        let mut f = CandidateFilter::owner(owner);
        f.tag = Some("rust".into());
        assert!(f.matches(&meta));
        f.tag = Some("go".into());
        assert!(!f.matches(&meta));

        let mut f = CandidateFilter::owner(owner);
        f.favorite = Some(false);
        assert!(!f.matches(&meta));

        let mut f = CandidateFilter::owner(owner);
        f.collection_id = Some(Uuid::new_v4());
        assert!(!f.matches(&meta));
    }

    #[test]
    fn store_errors_map_to_service_errors() {
        assert!(ServiceError::from(StoreError::Backend("down".into())).is_retryable());
        assert!(!ServiceError::from(StoreError::Duplicate(Uuid::nil())).is_retryable());
    }
}
