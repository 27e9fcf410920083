//! Post and comment invariants.

use imagesize::ImageType;

use crate::domain::error::DomainError;

/// Number of characters kept in a post's short display form.
pub const SHORT_TEXT_CHARS: usize = 15;

/// Truncate text to its first [`SHORT_TEXT_CHARS`] characters.
pub fn short_text(text: &str) -> String {
    text.chars().take(SHORT_TEXT_CHARS).collect()
}

/// Validate the body of a post, returning the text as it will be stored.
pub fn validate_post_text(text: &str) -> Result<String, DomainError> {
    if text.trim().is_empty() {
        return Err(DomainError::validation("post text must not be empty"));
    }
    Ok(text.to_string())
}

/// Comments with only whitespace are dropped rather than stored.
pub fn normalize_comment_text(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Check that an uploaded payload is a decodable image and report its format.
pub fn validate_image(bytes: &[u8]) -> Result<ImageType, DomainError> {
    if bytes.is_empty() {
        return Err(DomainError::validation("uploaded image is empty"));
    }

    let kind = imagesize::image_type(bytes)
        .map_err(|_| DomainError::validation("upload a valid image file"))?;
    let size = imagesize::blob_size(bytes)
        .map_err(|_| DomainError::validation("upload a valid image file"))?;
    if size.width == 0 || size.height == 0 {
        return Err(DomainError::validation("image has no visible pixels"));
    }

    Ok(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) const SMALL_GIF: &[u8] = &[
        0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
        0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
        0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
    ];

    #[test]
    fn short_text_keeps_first_fifteen_characters() {
        assert_eq!(short_text("Тестовый пост для проверки"), "Тестовый пост д");
        assert_eq!(short_text("short"), "short");
    }

    #[test]
    fn blank_post_text_is_rejected() {
        assert!(validate_post_text("   \n").is_err());
        assert_eq!(validate_post_text(" body ").expect("valid"), " body ");
    }

    #[test]
    fn blank_comment_is_dropped() {
        assert_eq!(normalize_comment_text("  "), None);
        assert_eq!(
            normalize_comment_text(" nice post ").as_deref(),
            Some("nice post")
        );
    }

    #[test]
    fn gif_payload_is_accepted() {
        assert!(matches!(validate_image(SMALL_GIF), Ok(ImageType::Gif)));
    }

    #[test]
    fn text_payload_is_rejected_as_image() {
        assert!(validate_image(b"definitely not an image").is_err());
        assert!(validate_image(&[]).is_err());
    }
}
