//! Bookmark records in their two states: plaintext in memory, sealed at rest.
//!
//! Protected fields (title, url, description, image) are the only fields that
//! differ between [`Bookmark`] and [`SealedBookmark`]. Everything in
//! [`BookmarkMeta`] stays in the clear so storage can filter and sort on it.

pub mod codec;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use codec::{protect, protect_patch, reveal};

/// The protected fields of a bookmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectedField {
    Title,
    Url,
    Description,
    Image,
}

impl ProtectedField {
    pub fn as_str(self) -> &'static str {
        match self {
            ProtectedField::Title => "title",
            ProtectedField::Url => "url",
            ProtectedField::Description => "description",
            ProtectedField::Image => "image",
        }
    }
}

/// Attributes stored in the clear and queryable by storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkMeta {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub collection_id: Option<Uuid>,
    pub tags: Vec<String>,
    #[serde(rename = "isFavorite")]
    pub favorite: bool,
    #[serde(rename = "isRead")]
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A bookmark with plaintext protected fields.
///
/// Only ever handed to callers after every protected field was opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    #[serde(flatten)]
    pub meta: BookmarkMeta,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub image: Option<String>,
}

/// A bookmark as persisted: protected fields hold envelopes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedBookmark {
    pub meta: BookmarkMeta,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub image: Option<String>,
}

/// A plaintext partial update, already validated by the service layer.
///
/// Outer `None` leaves a field unchanged; `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookmarkChanges {
    pub title: Option<String>,
    pub url: Option<String>,
    pub description: Option<Option<String>>,
    pub image: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub collection_id: Option<Option<Uuid>>,
    pub favorite: Option<bool>,
    pub read: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A sealed partial update. Protected values are fresh envelopes.
///
/// Outer `None` leaves a field unchanged; `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SealedPatch {
    pub title: Option<String>,
    pub url: Option<String>,
    pub description: Option<Option<String>>,
    pub image: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub collection_id: Option<Option<Uuid>>,
    pub favorite: Option<bool>,
    pub read: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SealedPatch {
    /// Apply this patch to a stored record. Envelopes are replaced whole.
    pub fn apply_to(self, record: &mut SealedBookmark) {
        if let Some(title) = self.title {
            record.title = title;
        }
        if let Some(url) = self.url {
            record.url = url;
        }
        if let Some(description) = self.description {
            record.description = description;
        }
        if let Some(image) = self.image {
            record.image = image;
        }
        if let Some(tags) = self.tags {
            record.meta.tags = tags;
        }
        if let Some(collection_id) = self.collection_id {
            record.meta.collection_id = collection_id;
        }
        if let Some(favorite) = self.favorite {
            record.meta.favorite = favorite;
        }
        if let Some(read) = self.read {
            record.meta.read = read;
        }
        if let Some(updated_at) = self.updated_at {
            record.meta.updated_at = updated_at;
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_replaces_only_supplied_fields() {
        let plain = fixtures::bookmark(Uuid::new_v4(), "Rust Guide", 0);
        let mut sealed = SealedBookmark {
            meta: plain.meta.clone(),
            title: "old-title".into(),
            url: "old-url".into(),
            description: Some("old-desc".into()),
            image: Some("old-image".into()),
        };

        SealedPatch {
            title: Some("new-title".into()),
            description: Some(None),
            favorite: Some(true),
            ..SealedPatch::default()
        }
        .apply_to(&mut sealed);

        assert_eq!(sealed.title, "new-title");
        assert_eq!(sealed.url, "old-url");
        assert_eq!(sealed.description, None);
        assert_eq!(sealed.image.as_deref(), Some("old-image"));
        assert!(sealed.meta.favorite);
        assert_eq!(sealed.meta.updated_at, plain.meta.updated_at);
    }

    #[test]
    fn bookmark_serialises_flat_with_wire_names() {
        let b = fixtures::bookmark(Uuid::new_v4(), "Go Tutorial", 5);
        let json = serde_json::to_value(&b).unwrap();
        assert_eq!(json["title"], "Go Tutorial");
        assert_eq!(json["isFavorite"], false);
        assert!(json.get("meta").is_none());
        assert!(json.get("ownerId").is_some());
    }

    #[test]
    fn field_names() {
        assert_eq!(ProtectedField::Title.as_str(), "title");
        assert_eq!(ProtectedField::Image.as_str(), "image");
    }
}
