//! Local redaction used when the detection service is unavailable.
//!
//! Heuristic, not a certified PII scrubber. Passes run in a fixed order, each
//! over the output of the previous one:
//! 1. email addresses
//! 2. `http`/`https` URLs
//! 3. long opaque tokens (>= 20 chars of `[A-Za-z0-9+/=_-]`)
//! 4. `key: value` / `key=value` secrets, rewritten as `key=<MASKED>`

use std::sync::OnceLock;

use regex::Regex;

/// Literal placeholder substituted for every redacted span.
pub const MASK_PLACEHOLDER: &str = "<MASKED>";

struct Patterns {
    email: Regex,
    url: Regex,
    long_token: Regex,
    secret_kv: Regex,
}

static PATTERNS: OnceLock<Patterns> = OnceLock::new();

fn patterns() -> &'static Patterns {
    PATTERNS.get_or_init(|| Patterns {
        email: Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")
            .expect("email pattern"),
        url: Regex::new(r"(?i)\bhttps?://\S+").expect("url pattern"),
        long_token: Regex::new(r"\b[A-Za-z0-9+/=_-]{20,}\b").expect("token pattern"),
        secret_kv: Regex::new(
            r"(?i)\b(password|secret|token|session|auth|credential)\b\s*[:=]\s*[^\s,;]+",
        )
        .expect("secret pattern"),
    })
}

/// Applies the four redaction passes. Text without matches comes back unchanged.
pub fn redact(text: &str) -> String {
    let p = patterns();
    let out = p.email.replace_all(text, MASK_PLACEHOLDER);
    let out = p.url.replace_all(&out, MASK_PLACEHOLDER);
    let out = p.long_token.replace_all(&out, MASK_PLACEHOLDER);
    let out = p
        .secret_kv
        .replace_all(&out, format!("${{1}}={MASK_PLACEHOLDER}").as_str());
    out.into_owned()
}
