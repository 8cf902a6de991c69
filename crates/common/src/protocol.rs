//! Request and response types exchanged with the request layer.
//!
//! Protected text travels through these types as plaintext. They never carry
//! envelopes; sealing happens below them, inside the vault crate.

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Write path
// ---------------------------------------------------------------------------

/// Body of a bookmark creation request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBookmark {
    /// Required, non-empty.
    pub title: String,
    /// Required, non-empty.
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Reference to an uploaded or remote image.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub collection_id: Option<Uuid>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub read: bool,
}

/// Body of a partial bookmark update.
///
/// Outer `None` means "leave unchanged". For nullable fields an inner `None`
/// (an explicit JSON `null`) clears the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub image: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<Option<Uuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorite: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<bool>,
}

/// Maps a present field (including `null`) to `Some(..)` so that an absent
/// field and an explicit `null` stay distinguishable.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ---------------------------------------------------------------------------
// Read path
// ---------------------------------------------------------------------------

/// Listing parameters for the bookmark collection of one owner.
///
/// Everything except `search` is answered by storage. `search` targets
/// protected fields and is evaluated after decryption.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkQuery {
    /// Case-insensitive substring matched against title, description and url.
    #[serde(default)]
    pub search: Option<String>,
    /// Case-insensitive tag name.
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub collection_id: Option<Uuid>,
    #[serde(default, rename = "isFavorite")]
    pub favorite: Option<bool>,
    #[serde(default, rename = "isRead")]
    pub read: Option<bool>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

/// One page of a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    /// With a search term, the number of readable matches. Without one, the
    /// number of candidates, readable or not.
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    /// Records left out because they could not be decrypted: every failing
    /// candidate for a text search, only those on this page for a plain
    /// listing.
    #[serde(default)]
    pub skipped: usize,
}
