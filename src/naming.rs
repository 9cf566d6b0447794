//! Deterministic logical-id derivation
//!
//! A logical id is a pure function of (kind prefix, relative path
//! segments, operation name, optional distinguishing text): each segment
//! is slugged then camel-cased, the pieces are concatenated, and the
//! distinguishing text contributes a short SHA-256 fingerprint suffix.
//! The short hash trades collision resistance for readable ids; that is
//! an accepted tradeoff.

use sha2::{Digest, Sha256};

/// Hex characters kept from the SHA-256 digest of distinguishing text.
pub const FINGERPRINT_LEN: usize = 8;

/// Logical-id prefixes, one per resource kind.
pub mod prefix {
    pub const FUNCTION: &str = "Func";
    pub const API_RESOURCE: &str = "ApiResource";
    pub const API_METHOD: &str = "ApiMethod";
    pub const CORS_METHOD: &str = "ApiMethodOptions";
    pub const API_AUTHORIZER: &str = "ApiAuthorizer";
    pub const EVENT_RULE: &str = "EventRule";
    pub const METHOD_PERMISSION: &str = "ApiMethodPermission";
    pub const RULE_PERMISSION: &str = "EventRulePermission";
}

/// Lowercase a name and collapse every non-alphanumeric run into a
/// single hyphen.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

/// Camel-case a name: split on non-alphanumeric boundaries and uppercase
/// the first letter of each word.
pub fn camelize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split(|c: char| !c.is_ascii_alphanumeric()) {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.extend(chars.map(|c| c.to_ascii_lowercase()));
        }
    }
    out
}

/// Short content fingerprint of a distinguishing string.
///
/// First `FINGERPRINT_LEN` hex characters of the SHA-256 digest; stable
/// across runs for identical input, distinct for distinct input.
pub fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..FINGERPRINT_LEN].to_string()
}

/// Derive a logical id from a kind prefix, relative path segments, an
/// optional operation name, and optional distinguishing text.
pub fn logical_id(
    kind_prefix: &str,
    segments: &[String],
    op_name: Option<&str>,
    distinguisher: Option<&str>,
) -> String {
    let mut id = String::from(kind_prefix);
    for segment in segments {
        id.push_str(&camelize(segment));
    }
    if let Some(op) = op_name {
        id.push_str(&camelize(op));
    }
    if let Some(text) = distinguisher {
        id.push_str(&fingerprint(text));
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Users"), "users");
        assert_eq!(slugify("heart_beat"), "heart-beat");
        assert_eq!(slugify("any_"), "any");
        assert_eq!(slugify("add.two--now"), "add-two-now");
        assert_eq!(slugify("__init__"), "init");
    }

    #[test]
    fn test_camelize() {
        assert_eq!(camelize("users"), "Users");
        assert_eq!(camelize("heart_beat"), "HeartBeat");
        assert_eq!(camelize("add-two"), "AddTwo");
        assert_eq!(camelize("v2"), "V2");
        assert_eq!(camelize(""), "");
    }

    #[test]
    fn test_logical_id_shape() {
        assert_eq!(
            logical_id(prefix::FUNCTION, &segments(&["rest", "users"]), Some("get"), None),
            "FuncRestUsersGet"
        );
        assert_eq!(
            logical_id(prefix::API_RESOURCE, &segments(&["rest", "users"]), None, None),
            "ApiResourceRestUsers"
        );
        assert_eq!(
            logical_id(
                prefix::FUNCTION,
                &segments(&["sched", "heart_beat"]),
                Some("handler"),
                None
            ),
            "FuncSchedHeartBeatHandler"
        );
    }

    #[test]
    fn test_logical_id_is_deterministic() {
        let path = segments(&["sched", "heart_beat"]);
        let a = logical_id(prefix::EVENT_RULE, &path, Some("handler"), Some("rate(1 minute)"));
        let b = logical_id(prefix::EVENT_RULE, &path, Some("handler"), Some("rate(1 minute)"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_distinguisher_changes_the_id() {
        let path = segments(&["sched", "heart_beat"]);
        let a = logical_id(prefix::EVENT_RULE, &path, Some("handler"), Some("rate(1 minute)"));
        let b = logical_id(
            prefix::EVENT_RULE,
            &path,
            Some("handler"),
            Some("cron(15 10 * * ? *)"),
        );
        assert_ne!(a, b);
        // Only the fingerprint suffix differs.
        let stem_len = a.len() - FINGERPRINT_LEN;
        assert_eq!(a[..stem_len], b[..b.len() - FINGERPRINT_LEN]);
    }

    #[test]
    fn test_fingerprint_is_short_hex() {
        let fp = fingerprint("rate(1 minute)");
        assert_eq!(fp.len(), FINGERPRINT_LEN);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(fp, fingerprint("rate(1 minute)"));
    }
}
