//! Input validation for untrusted data.
//!
//! User IDs become storage path segments and creation IDs become document
//! keys, so both are restricted to a safe character set.

use url::Url;

use crate::error::{PipelineError, PipelineResult};

/// Maximum length for user IDs.
pub const MAX_USER_ID_LEN: usize = 128;
/// Maximum length for creation IDs.
pub const MAX_CREATION_ID_LEN: usize = 64;
/// Maximum length for refinement hints.
pub const MAX_REFINEMENT_HINT_LEN: usize = 500;

/// Check if a character is valid for IDs (ASCII alphanumeric, hyphen, or underscore).
fn is_valid_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Returns true if `id` is 1..=`max_len` safe characters.
#[must_use]
pub fn is_valid_id(id: &str, max_len: usize) -> bool {
    !id.is_empty() && id.len() <= max_len && id.chars().all(is_valid_id_char)
}

/// Validate the caller's identity.
///
/// # Errors
///
/// Returns [`PipelineError::Authentication`] for a blank ID and
/// [`PipelineError::InvalidInput`] for a malformed one.
pub fn validate_user_id(user_id: &str) -> PipelineResult<&str> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(PipelineError::Authentication);
    }
    if !is_valid_id(user_id, MAX_USER_ID_LEN) {
        return Err(PipelineError::InvalidInput(format!(
            "user id must be 1-{MAX_USER_ID_LEN} alphanumeric, '-' or '_' characters"
        )));
    }
    Ok(user_id)
}

/// Validate a creation ID.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidInput`] if the ID is malformed.
pub fn validate_creation_id(id: &str) -> PipelineResult<&str> {
    if is_valid_id(id, MAX_CREATION_ID_LEN) {
        Ok(id)
    } else {
        Err(PipelineError::InvalidInput(format!(
            "creation id must be 1-{MAX_CREATION_ID_LEN} alphanumeric, '-' or '_' characters"
        )))
    }
}

/// Trim a refinement hint; blank hints are dropped.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidInput`] if the hint is too long.
pub fn normalize_refinement_hint(hint: Option<&str>) -> PipelineResult<Option<String>> {
    let Some(hint) = hint.map(str::trim).filter(|h| !h.is_empty()) else {
        return Ok(None);
    };
    if hint.chars().count() > MAX_REFINEMENT_HINT_LEN {
        return Err(PipelineError::InvalidInput(format!(
            "refinement hint too long (max {MAX_REFINEMENT_HINT_LEN} characters)"
        )));
    }
    Ok(Some(hint.to_string()))
}

/// Validate a URL returned by storage: absolute, `http`/`https`, with a host.
///
/// # Errors
///
/// Returns [`PipelineError::MalformedUrl`] otherwise.
pub fn validate_asset_url(raw: &str) -> PipelineResult<Url> {
    let url = Url::parse(raw).map_err(|e| PipelineError::MalformedUrl(format!("{raw}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(PipelineError::MalformedUrl(format!(
            "{raw}: unsupported scheme '{}'",
            url.scheme()
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(PipelineError::MalformedUrl(format!("{raw}: missing host")));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id() {
        assert_eq!(validate_user_id(" user_42 ").expect("valid"), "user_42");
        assert!(matches!(
            validate_user_id("   "),
            Err(PipelineError::Authentication)
        ));
        assert!(matches!(
            validate_user_id("../etc"),
            Err(PipelineError::InvalidInput(_))
        ));
        assert!(validate_user_id(&"a".repeat(MAX_USER_ID_LEN + 1)).is_err());
    }

    #[test]
    fn test_creation_id() {
        assert!(validate_creation_id("3f2b6a0e-1c2d-4e5f-8a9b-0c1d2e3f4a5b").is_ok());
        assert!(validate_creation_id("").is_err());
        assert!(validate_creation_id("a/b").is_err());
    }

    #[test]
    fn test_refinement_hint() {
        assert_eq!(normalize_refinement_hint(None).expect("ok"), None);
        assert_eq!(normalize_refinement_hint(Some("  ")).expect("ok"), None);
        assert_eq!(
            normalize_refinement_hint(Some(" make it night ")).expect("ok"),
            Some("make it night".to_string())
        );
        let long = "x".repeat(MAX_REFINEMENT_HINT_LEN + 1);
        assert!(normalize_refinement_hint(Some(&long)).is_err());
    }

    #[test]
    fn test_asset_url() {
        assert!(validate_asset_url("https://cdn.example.com/a.png").is_ok());
        assert!(validate_asset_url("http://127.0.0.1:9474/assets/a.png").is_ok());
        assert!(validate_asset_url("not a url").is_err());
        assert!(validate_asset_url("/relative/path.png").is_err());
        assert!(validate_asset_url("ftp://cdn.example.com/a.png").is_err());
        assert!(validate_asset_url("file:///tmp/a.png").is_err());
    }
}
