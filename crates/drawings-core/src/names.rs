//! Gallery name validation.
//!
//! Valid gallery names:
//! - Contain only `a-z`, `0-9` and `-`
//! - Do not contain consecutive hyphens (`--`)
//! - Do not start or end with `-`
//! - Are between 3 and 50 characters long
//! - Are not the reserved name `all`

use crate::error::{DrawingsError, DrawingsResult};

/// The default gallery; the only one whose drawings can be bumped.
pub const PUBLIC_GALLERY: &str = "public";

/// Pseudo-gallery indexing every drawing. Never a share target.
pub const ALL_GALLERY: &str = "all";

pub const MIN_NAME_LEN: usize = 3;
pub const MAX_NAME_LEN: usize = 50;

/// Validate a gallery name that drawings can be shared to.
///
/// # Examples
///
/// ```
/// use drawings_core::names::validate_gallery_name;
///
/// assert!(validate_gallery_name("my-gallery-1").is_ok());
/// assert!(validate_gallery_name("a--b").is_err());
/// assert!(validate_gallery_name("all").is_err());
/// ```
pub fn validate_gallery_name(name: &str) -> DrawingsResult<()> {
    let invalid = |reason: &str| {
        Err(DrawingsError::InvalidGalleryName {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    };

    if let Some(ch) = name
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
    {
        return invalid(&format!("contains forbidden character {ch:?}"));
    }
    if name.contains("--") {
        return invalid("must not contain '--'");
    }
    if name.starts_with('-') || name.ends_with('-') {
        return invalid("must not start or end with '-'");
    }
    if name.len() < MIN_NAME_LEN {
        return invalid("too short");
    }
    if name.len() > MAX_NAME_LEN {
        return invalid("too long");
    }
    if name == ALL_GALLERY {
        return invalid("reserved name");
    }
    Ok(())
}

/// Validate a gallery name for listing, where `all` is also accepted.
pub fn validate_listing_name(name: &str) -> DrawingsResult<()> {
    if name == ALL_GALLERY {
        return Ok(());
    }
    validate_gallery_name(name)
}

/// Turn free text typed into a gallery search box into a gallery name.
///
/// Lowercases, treats hyphens as spaces, trims, and joins the remaining
/// words with single hyphens. The result still has to be validated.
pub fn normalize_gallery_name(query: &str) -> String {
    query
        .to_lowercase()
        .replace('-', " ")
        .split(' ')
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Human-readable title: hyphens become spaces.
pub fn display_name(name: &str) -> String {
    name.replace('-', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_names() {
        assert!(validate_gallery_name("my-gallery-1").is_ok());
        assert!(validate_gallery_name("art").is_ok());
        assert!(validate_gallery_name(PUBLIC_GALLERY).is_ok());
        assert!(validate_gallery_name(&"a".repeat(50)).is_ok());
    }

    #[test]
    fn rejects_short_and_long() {
        assert!(validate_gallery_name("ab").is_err());
        assert!(validate_gallery_name("").is_err());
        assert!(validate_gallery_name(&"a".repeat(51)).is_err());
    }

    #[test]
    fn rejects_hyphen_misuse() {
        assert!(validate_gallery_name("a--b").is_err());
        assert!(validate_gallery_name("-ab").is_err());
        assert!(validate_gallery_name("ab-").is_err());
    }

    #[test]
    fn rejects_reserved_all() {
        let err = validate_gallery_name("all").unwrap_err();
        assert!(matches!(err, DrawingsError::InvalidGalleryName { .. }));
        assert!(validate_listing_name("all").is_ok());
    }

    #[test]
    fn rejects_uppercase_and_punctuation() {
        assert!(validate_gallery_name("Art").is_err());
        assert!(validate_gallery_name("my gallery").is_err());
        assert!(validate_gallery_name("art!").is_err());
        assert!(validate_gallery_name("my_gallery").is_err());
        assert!(validate_gallery_name("café").is_err());
    }

    #[test]
    fn normalizes_search_text() {
        assert_eq!(normalize_gallery_name("  My  Cool-Gallery "), "my-cool-gallery");
        assert_eq!(normalize_gallery_name("--a--b--"), "a-b");
        assert_eq!(normalize_gallery_name("   "), "");
    }

    #[test]
    fn display_name_uses_spaces() {
        assert_eq!(display_name("my-cool-gallery"), "my cool gallery");
    }
}
