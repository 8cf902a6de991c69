//! [`MemoryStore`]: in-process [`BookmarkStore`] keyed by bookmark id.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{BookmarkStore, CandidateFilter, StoreError};
use crate::record::{SealedBookmark, SealedPatch};

/// Thread-safe in-memory store.
///
/// Cloning is cheap; all clones share the same map. Holds only sealed records,
/// exactly as a database would.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<HashMap<Uuid, SealedBookmark>>>,
}

impl MemoryStore {
    /// Create a new, empty [`MemoryStore`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records across all owners.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Return `true` if no records are stored.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl BookmarkStore for MemoryStore {
    async fn insert(&self, record: SealedBookmark) -> Result<(), StoreError> {
        let mut map = self.inner.write().await;
        let id = record.meta.id;
        if map.contains_key(&id) {
            return Err(StoreError::Duplicate(id));
        }
        map.insert(id, record);
        Ok(())
    }

    async fn fetch(&self, owner_id: Uuid, id: Uuid) -> Result<Option<SealedBookmark>, StoreError> {
        let map = self.inner.read().await;
        Ok(map.get(&id).filter(|r| r.meta.owner_id == owner_id).cloned())
    }

    async fn update(
        &self,
        owner_id: Uuid,
        id: Uuid,
        patch: SealedPatch,
    ) -> Result<Option<SealedBookmark>, StoreError> {
        let mut map = self.inner.write().await;
        match map.get_mut(&id).filter(|r| r.meta.owner_id == owner_id) {
            Some(record) => {
                patch.apply_to(record);
                Ok(Some(record.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let mut map = self.inner.write().await;
        let owned = map.get(&id).is_some_and(|r| r.meta.owner_id == owner_id);
        if owned {
            map.remove(&id);
        }
        Ok(owned)
    }

    async fn candidates(&self, filter: &CandidateFilter) -> Result<Vec<SealedBookmark>, StoreError> {
        let map = self.inner.read().await;
        Ok(map
            .values()
            .filter(|r| filter.matches(&r.meta))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fixtures;

    /// Records here carry placeholder strings; the store never inspects them.
    fn sealed(owner: Uuid, title: &str) -> SealedBookmark {
        let b = fixtures::bookmark(owner, title, 0);
        SealedBookmark {
            meta: b.meta,
            title: format!("sealed:{title}"),
            url: "sealed:url".into(),
            description: None,
            image: None,
        }
    }

    #[tokio::test]
    async fn insert_and_fetch_scoped_by_owner() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let record = sealed(owner, "a");
        let id = record.meta.id;
        store.insert(record.clone()).await.unwrap();

        assert_eq!(store.fetch(owner, id).await.unwrap(), Some(record));
        assert_eq!(store.fetch(Uuid::new_v4(), id).await.unwrap(), None);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn duplicate_insert_rejected() {
        let store = MemoryStore::new();
        let record = sealed(Uuid::new_v4(), "a");
        store.insert(record.clone()).await.unwrap();
        assert!(matches!(
            store.insert(record).await.unwrap_err(),
            StoreError::Duplicate(_)
        ));
    }

    #[tokio::test]
    async fn update_applies_patch_for_owner_only() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let record = sealed(owner, "a");
        let id = record.meta.id;
        store.insert(record).await.unwrap();

        let patch = SealedPatch {
            read: Some(true),
            ..SealedPatch::default()
        };
        assert!(store
            .update(Uuid::new_v4(), id, patch.clone())
            .await
            .unwrap()
            .is_none());

        let updated = store.update(owner, id, patch).await.unwrap().unwrap();
        assert!(updated.meta.read);
    }

    #[tokio::test]
    async fn delete_respects_owner() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let record = sealed(owner, "a");
        let id = record.meta.id;
        store.insert(record).await.unwrap();

        assert!(!store.delete(Uuid::new_v4(), id).await.unwrap());
        assert!(store.delete(owner, id).await.unwrap());
        assert!(!store.delete(owner, id).await.unwrap());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn candidates_apply_filter() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let mut fav = sealed(owner, "fav");
        fav.meta.favorite = true;
        store.insert(fav).await.unwrap();
        store.insert(sealed(owner, "plain")).await.unwrap();
        store.insert(sealed(Uuid::new_v4(), "other")).await.unwrap();

        assert_eq!(store.candidates(&CandidateFilter::owner(owner)).await.unwrap().len(), 2);

        let mut filter = CandidateFilter::owner(owner);
        filter.favorite = Some(true);
        let hits = store.candidates(&filter).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "sealed:fav");
    }
}
