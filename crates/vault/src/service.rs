//! [`BookmarkVault`]: the plaintext-facing bookmark API over a sealed store.
//!
//! Callers hand in and receive plaintext. Everything that reaches the
//! [`BookmarkStore`] is sealed first, and everything read back is opened
//! before it is returned.
//!
//! Failure policy differs by path:
//! - [`BookmarkVault::get`] and [`BookmarkVault::update`] are strict: a record
//!   that cannot be opened fails the call with `Decryption`/`Encoding`.
//! - [`BookmarkVault::list`] is lenient: unreadable records are left out and
//!   counted in [`Page::skipped`].
//!
//! Ownership is not checked here beyond scoping every store call by the
//! `owner_id` the request layer authenticated.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use common::{
    protocol::{BookmarkPatch, BookmarkQuery, NewBookmark, Page},
    ServiceError,
};

use crate::config::Config;
use crate::crypto::{CipherError, MasterSecret};
use crate::record::{
    protect, protect_patch, reveal, Bookmark, BookmarkChanges, BookmarkMeta, SealedBookmark,
};
use crate::search::{PageWindow, SearchExecutor};
use crate::store::{BookmarkStore, CandidateFilter};

/// Page-size policy for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
        }
    }
}

impl PageLimits {
    /// Resolve the window for `query`: limit defaulted and clamped to
    /// `1..=max_limit`, offset defaulted to zero.
    pub fn window(&self, query: &BookmarkQuery) -> PageWindow {
        PageWindow {
            limit: query
                .limit
                .unwrap_or(self.default_limit)
                .clamp(1, self.max_limit.max(1)),
            offset: query.offset.unwrap_or(0),
        }
    }
}

/// Bookmark operations with transparent field encryption.
pub struct BookmarkVault<S> {
    store: S,
    secret: MasterSecret,
    search: SearchExecutor,
    limits: PageLimits,
}

impl<S: BookmarkStore> BookmarkVault<S> {
    pub fn new(store: S, secret: MasterSecret, search_concurrency: usize, limits: PageLimits) -> Self {
        Self {
            store,
            search: SearchExecutor::new(secret.clone(), search_concurrency),
            secret,
            limits,
        }
    }

    /// Build a vault from validated configuration, using the process-wide
    /// master secret.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Configuration`] if `ENCRYPTION_KEY` is missing
    /// or too short. Callers should treat this as fatal at startup.
    pub fn from_config(store: S, cfg: &Config) -> Result<Self, ServiceError> {
        let secret = cfg.master_secret()?;
        Ok(Self::new(
            store,
            secret,
            cfg.search_concurrency,
            PageLimits {
                default_limit: cfg.default_page_limit,
                max_limit: cfg.max_page_limit,
            },
        ))
    }

    /// Borrow the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Seal and store a new bookmark, returning it in plaintext.
    ///
    /// # Errors
    ///
    /// [`ServiceError::InvalidInput`] if title or url is empty;
    /// [`ServiceError::Storage`] if the store fails.
    pub async fn create(&self, owner_id: Uuid, input: NewBookmark) -> Result<Bookmark, ServiceError> {
        require_text("title", &input.title)?;
        require_text("url", &input.url)?;

        let now = Utc::now();
        let bookmark = Bookmark {
            meta: BookmarkMeta {
                id: Uuid::new_v4(),
                owner_id,
                collection_id: input.collection_id,
                tags: input.tags,
                favorite: input.favorite,
                read: input.read,
                created_at: now,
                updated_at: now,
            },
            title: input.title,
            url: input.url,
            description: input.description,
            image: input.image,
        };

        let to_seal = bookmark.clone();
        let sealed = self.with_secret(move |secret| protect(to_seal, secret)).await?;
        self.store.insert(sealed).await?;

        info!(bookmark_id = %bookmark.meta.id, owner_id = %owner_id, "bookmark created");
        Ok(bookmark)
    }

    /// Fetch one bookmark in plaintext.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`] if absent for this owner;
    /// [`ServiceError::Decryption`] or [`ServiceError::Encoding`] if any
    /// protected field cannot be opened. No partial record is ever returned.
    pub async fn get(&self, owner_id: Uuid, id: Uuid) -> Result<Bookmark, ServiceError> {
        let sealed = self
            .store
            .fetch(owner_id, id)
            .await?
            .ok_or_else(|| not_found(id))?;
        self.open_strict(sealed).await
    }

    /// Apply a partial update. Replaced protected fields get new envelopes.
    ///
    /// # Errors
    ///
    /// [`ServiceError::InvalidInput`] if a supplied title or url is empty;
    /// [`ServiceError::NotFound`] if absent; strict decryption errors on the
    /// updated record as for [`BookmarkVault::get`].
    pub async fn update(
        &self,
        owner_id: Uuid,
        id: Uuid,
        patch: BookmarkPatch,
    ) -> Result<Bookmark, ServiceError> {
        if let Some(title) = &patch.title {
            require_text("title", title)?;
        }
        if let Some(url) = &patch.url {
            require_text("url", url)?;
        }

        let changes = BookmarkChanges {
            title: patch.title,
            url: patch.url,
            description: patch.description,
            image: patch.image,
            tags: patch.tags,
            collection_id: patch.collection_id,
            favorite: patch.favorite,
            read: patch.read,
            updated_at: Some(Utc::now()),
        };
        let sealed_patch = self
            .with_secret(move |secret| protect_patch(changes, secret))
            .await?;

        let updated = self
            .store
            .update(owner_id, id, sealed_patch)
            .await?
            .ok_or_else(|| not_found(id))?;

        info!(bookmark_id = %id, owner_id = %owner_id, "bookmark updated");
        self.open_strict(updated).await
    }

    /// Delete one bookmark.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`] if absent for this owner.
    pub async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
        if !self.store.delete(owner_id, id).await? {
            return Err(not_found(id));
        }
        info!(bookmark_id = %id, owner_id = %owner_id, "bookmark deleted");
        Ok(())
    }

    /// List bookmarks matching `query`.
    ///
    /// Non-protected predicates are pushed to storage. A search term forces
    /// every candidate to be decrypted before paging; see [`crate::search`].
    ///
    /// # Errors
    ///
    /// [`ServiceError::Storage`] if the store fails; [`ServiceError::Internal`]
    /// if a decrypt worker dies.
    pub async fn list(&self, owner_id: Uuid, query: &BookmarkQuery) -> Result<Page<Bookmark>, ServiceError> {
        let filter = CandidateFilter::from_query(owner_id, query);
        let window = self.limits.window(query);
        let candidates = self.store.candidates(&filter).await?;

        let page = self
            .search
            .execute(candidates, query.search.as_deref(), window)
            .await?;
        if page.skipped > 0 {
            warn!(owner_id = %owner_id, skipped = page.skipped, "listing omitted undecryptable bookmarks");
        }
        Ok(page)
    }

    async fn open_strict(&self, sealed: SealedBookmark) -> Result<Bookmark, ServiceError> {
        let id = sealed.meta.id;
        self.with_secret(move |secret| reveal(sealed, secret))
            .await
            .map_err(|e| {
                warn!(bookmark_id = %id, error = %e, "bookmark could not be decrypted");
                e
            })
    }

    /// Run a cipher operation on the blocking pool; scrypt is deliberately slow.
    async fn with_secret<T, F>(&self, op: F) -> Result<T, ServiceError>
    where
        T: Send + 'static,
        F: FnOnce(&MasterSecret) -> Result<T, CipherError> + Send + 'static,
    {
        let secret = self.secret.clone();
        tokio::task::spawn_blocking(move || op(&secret))
            .await
            .map_err(|e| ServiceError::Internal(format!("cipher worker failed: {e}")))?
            .map_err(ServiceError::from)
    }
}

fn require_text(field: &str, value: &str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::InvalidInput(format!("{field} is required")));
    }
    Ok(())
}

fn not_found(id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("bookmark {id}"))
}
