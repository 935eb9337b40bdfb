//! Selection-time item validation.

use orggist_core::UploadPolicy;

/// Why an item was rejected at selection time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidCause {
    UnsupportedType,
    TooLarge,
}

impl InvalidCause {
    /// User-facing message for this cause under the given policy.
    pub fn message(&self, policy: &UploadPolicy) -> String {
        match self {
            Self::UnsupportedType => "Unsupported file type".to_string(),
            Self::TooLarge => format!("File too large (max {}MB)", policy.max_size_mb()),
        }
    }
}

/// Classify a candidate item against the policy's content-kind allow-list and
/// size bound. Stateless; the policy is always passed in explicitly.
pub fn validate(kind: &str, size: u64, policy: &UploadPolicy) -> Result<(), InvalidCause> {
    if !policy.allowed_kinds.iter().any(|k| k == kind) {
        return Err(InvalidCause::UnsupportedType);
    }
    if size > policy.max_size_bytes {
        return Err(InvalidCause::TooLarge);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    #[test]
    fn test_valid_pdf_within_bound() {
        let policy = UploadPolicy::default();
        assert!(validate("application/pdf", 10 * MB, &policy).is_ok());
    }

    #[test]
    fn test_unsupported_kind() {
        let policy = UploadPolicy::default();
        assert_eq!(
            validate("image/png", 1 * MB, &policy),
            Err(InvalidCause::UnsupportedType)
        );
    }

    #[test]
    fn test_too_large() {
        let policy = UploadPolicy::default();
        assert_eq!(
            validate("application/pdf", 60 * MB, &policy),
            Err(InvalidCause::TooLarge)
        );
        assert_eq!(
            InvalidCause::TooLarge.message(&policy),
            "File too large (max 50MB)"
        );
    }

    #[test]
    fn test_exact_bound_is_valid() {
        let policy = UploadPolicy::default();
        assert!(validate("application/pdf", policy.max_size_bytes, &policy).is_ok());
    }

    #[test]
    fn test_type_checked_before_size() {
        let policy = UploadPolicy::default();
        // Both checks fail: the kind check wins, matching the selection UI.
        assert_eq!(
            validate("image/png", 60 * MB, &policy),
            Err(InvalidCause::UnsupportedType)
        );
    }
}
