//! Content fingerprints used as result-cache keys.
//!
//! Short content is its own key. Longer content is reduced to a 32-bit
//! polynomial rolling hash (`h = h * 31 + unit`, wrapping), rendered in hex.
//! Two different long contents can share a fingerprint and therefore a cached
//! result; callers accept that as best-effort caching.
//!
//! Lengths and hashed units are UTF-16 code units so fingerprints match those
//! produced by browser front-ends for the same text.

/// Content at or below this many UTF-16 units is used verbatim as its key.
pub const VERBATIM_LIMIT: usize = 100;

/// Compute the cache key for `content`.
///
/// ```rust
/// use resonnet_core::fingerprint::fingerprint;
///
/// assert_eq!(fingerprint("short prompt"), "short prompt");
/// assert_eq!(fingerprint(&"a".repeat(200)), fingerprint(&"a".repeat(200)));
/// ```
pub fn fingerprint(content: &str) -> String {
    if content.encode_utf16().count() <= VERBATIM_LIMIT {
        return content.to_string();
    }
    render_hex(rolling_hash(content))
}

/// 32-bit signed rolling hash over the UTF-16 units of `content`.
pub fn rolling_hash(content: &str) -> i32 {
    content.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_mul(31).wrapping_add(i32::from(unit))
    })
}

/// Signed hexadecimal rendering: negative values keep a leading `-`.
fn render_hex(hash: i32) -> String {
    if hash < 0 {
        format!("-{:x}", hash.unsigned_abs())
    } else {
        format!("{:x}", hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_content_is_verbatim() {
        let text = "Write a summary of the attached report.";
        assert_eq!(fingerprint(text), text);
        assert_eq!(fingerprint(""), "");
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let at_limit = "x".repeat(VERBATIM_LIMIT);
        assert_eq!(fingerprint(&at_limit), at_limit);

        let over = "x".repeat(VERBATIM_LIMIT + 1);
        assert_ne!(fingerprint(&over), over);
    }

    #[test]
    fn test_known_hash_values() {
        assert_eq!(rolling_hash("a"), 97);
        assert_eq!(rolling_hash("ab"), 97 * 31 + 98);
        assert_eq!(render_hex(255), "ff");
        assert_eq!(render_hex(-255), "-ff");
        assert_eq!(render_hex(i32::MIN), "-80000000");
    }

    #[test]
    fn test_long_content_deterministic_and_distinct() {
        let a = "Describe the deployment pipeline in detail. ".repeat(4);
        let b = "Describe the deployment pipeline in detail! ".repeat(4);
        assert_eq!(fingerprint(&a), fingerprint(&a));
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_hash_wraps_instead_of_overflowing() {
        let long = "z".repeat(10_000);
        let fp = fingerprint(&long);
        assert!(fp.len() <= 9);
    }

    #[test]
    fn test_counts_utf16_units() {
        // 50 astral chars are 100 UTF-16 units: still verbatim.
        let emoji = "😀".repeat(50);
        assert_eq!(fingerprint(&emoji), emoji);
        let more = "😀".repeat(51);
        assert_ne!(fingerprint(&more), more);
    }
}
