//! Slug derivation for group URLs.

use slug::slugify;
use thiserror::Error;

/// Errors that can occur while generating a slug.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
}

/// Derive a URL slug from the provided human-readable text.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let candidate = slugify(input);
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Accept an explicit slug only when it is already in canonical form.
pub fn validate_slug(slug: &str) -> Result<String, SlugError> {
    let canonical = derive_slug(slug)?;
    if canonical != slug {
        return Err(SlugError::Unrepresentable {
            input: slug.to_string(),
        });
    }
    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_slug_from_title() {
        assert_eq!(derive_slug("Rust Notes!").expect("slug"), "rust-notes");
    }

    #[test]
    fn empty_title_is_rejected() {
        assert_eq!(derive_slug("   "), Err(SlugError::EmptyInput));
    }

    #[test]
    fn explicit_slug_must_be_canonical() {
        assert_eq!(validate_slug("test-slug").expect("slug"), "test-slug");
        assert!(validate_slug("Test Slug").is_err());
    }
}
