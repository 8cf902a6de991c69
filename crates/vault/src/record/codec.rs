//! Record codec: seals protected fields on the write path and opens them on
//! the read path, one record at a time.

use tracing::debug;

use crate::crypto::{decrypt, encrypt, CipherError, MasterSecret};

use super::{Bookmark, BookmarkChanges, ProtectedField, SealedBookmark, SealedPatch};

/// Seal every protected field of `bookmark`. `None` fields stay `None`.
///
/// # Errors
///
/// Returns the first [`CipherError`] raised while sealing.
pub fn protect(bookmark: Bookmark, secret: &MasterSecret) -> Result<SealedBookmark, CipherError> {
    Ok(SealedBookmark {
        title: encrypt(&bookmark.title, secret)?,
        url: encrypt(&bookmark.url, secret)?,
        description: seal_optional(bookmark.description.as_deref(), secret)?,
        image: seal_optional(bookmark.image.as_deref(), secret)?,
        meta: bookmark.meta,
    })
}

/// Open every protected field of `sealed`.
///
/// All-or-nothing: if any field fails to open, the whole record fails and no
/// plaintext is returned.
///
/// # Errors
///
/// Returns [`CipherError::Encoding`] or [`CipherError::Decryption`] from the
/// first field that cannot be opened.
pub fn reveal(sealed: SealedBookmark, secret: &MasterSecret) -> Result<Bookmark, CipherError> {
    let id = sealed.meta.id;
    let open = |field: ProtectedField, value: &str| {
        decrypt(value, secret).map_err(|e| {
            debug!(bookmark_id = %id, field = field.as_str(), error = %e, "field failed to open");
            e
        })
    };

    let title = open(ProtectedField::Title, &sealed.title)?;
    let url = open(ProtectedField::Url, &sealed.url)?;
    let description = sealed
        .description
        .as_deref()
        .map(|v| open(ProtectedField::Description, v))
        .transpose()?;
    let image = sealed
        .image
        .as_deref()
        .map(|v| open(ProtectedField::Image, v))
        .transpose()?;

    Ok(Bookmark {
        meta: sealed.meta,
        title,
        url,
        description,
        image,
    })
}

/// Seal the protected values carried by a partial update.
///
/// Each supplied value gets a brand-new envelope; nothing is patched in place.
/// Non-protected changes are copied through untouched.
///
/// # Errors
///
/// Returns the first [`CipherError`] raised while sealing.
pub fn protect_patch(
    changes: BookmarkChanges,
    secret: &MasterSecret,
) -> Result<SealedPatch, CipherError> {
    Ok(SealedPatch {
        title: seal_optional(changes.title.as_deref(), secret)?,
        url: seal_optional(changes.url.as_deref(), secret)?,
        description: changes
            .description
            .map(|inner| seal_optional(inner.as_deref(), secret))
            .transpose()?,
        image: changes
            .image
            .map(|inner| seal_optional(inner.as_deref(), secret))
            .transpose()?,
        tags: changes.tags,
        collection_id: changes.collection_id,
        favorite: changes.favorite,
        read: changes.read,
        updated_at: changes.updated_at,
    })
}

fn seal_optional(value: Option<&str>, secret: &MasterSecret) -> Result<Option<String>, CipherError> {
    value.map(|v| encrypt(v, secret)).transpose()
}
