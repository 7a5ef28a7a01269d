//! Domain input validation and cache key derivation

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum accepted length of a domain identifier
pub const MAX_DOMAIN_LENGTH: usize = 253;

/// Dot-separated labels of 1-63 alphanumerics/hyphens, no leading or trailing hyphen
static DOMAIN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(\.[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .unwrap_or_else(|e| unreachable!("static domain pattern failed to compile: {e}"))
});

/// Check whether `domain` looks like a domain identifier
///
/// The reputation site addresses domains in slug form (`vk-com` for `vk.com`),
/// so hyphens are read as label separators before matching. Both `vk.com`
/// and `vk-com` are accepted; empty strings, whitespace, slashes, schemes and
/// other punctuation are rejected.
#[must_use]
pub fn validate_domain(domain: &str) -> bool {
    if domain.is_empty() || domain.len() > MAX_DOMAIN_LENGTH {
        return false;
    }
    DOMAIN_REGEX.is_match(&domain.replace('-', "."))
}

/// Normalized cache key for a validated domain
#[inline]
#[must_use]
pub fn cache_key(domain: &str) -> String {
    format!("domain_{}", domain.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_slug_and_dotted_forms() {
        assert!(validate_domain("vk-com"));
        assert!(validate_domain("vk.com"));
        assert!(validate_domain("sub.example.co.uk"));
        assert!(validate_domain("a"));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(!validate_domain(""));
        assert!(!validate_domain("https://vk.com"));
        assert!(!validate_domain("vk com"));
        assert!(!validate_domain("vk..com"));
        assert!(!validate_domain("-vk.com"));
        assert!(!validate_domain("vk.com/"));
        assert!(!validate_domain("vk--com"));
        assert!(!validate_domain(&"a".repeat(300)));
    }

    #[test]
    fn cache_key_is_case_insensitive() {
        assert_eq!(cache_key("VK-com"), cache_key("vk-com"));
        assert_eq!(cache_key("vk-com"), "domain_vk-com");
    }
}
