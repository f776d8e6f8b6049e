//! Stable identity for the error class behind a log.
//!
//! `fingerprint(text) = sha256_hex(signature(normalize(text)))`.
//!
//! Normalization lowercases, drops `0x...` addresses and bare hex runs of 8+
//! characters (hashes, ids), collapses whitespace and trims.
//!
//! The signature comes from the first matching category, in this order:
//! 1. exception class (`...exception`, plus an adjacent `.java`/`.js`/`.ts`)
//! 2. JS runtime error (`typeerror`, `referenceerror`, `syntaxerror`)
//! 3. HTTP status 4xx/5xx, the bare code only
//! 4. database keyword
//! 5. network keyword
//! 6. first 120 characters of the normalized text
//!
//! Any standalone 400-599 number counts as a status, including the fraction
//! of a timestamp such as `10:00:00,503`. Two logs differing only in such a
//! timestamp can therefore get different fingerprints.
//!
//! The order is part of the cache identity. Reordering or editing a pattern
//! changes fingerprints of already stored records.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use sha2::{Digest, Sha256};

/// Length of the fallback signature, in characters.
pub const FALLBACK_SIGNATURE_CHARS: usize = 120;

/// Which rule produced a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureCategory {
    Exception,
    RuntimeError,
    HttpStatus,
    Database,
    Network,
    Fallback,
}

impl fmt::Display for SignatureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignatureCategory::Exception => "exception",
            SignatureCategory::RuntimeError => "runtime_error",
            SignatureCategory::HttpStatus => "http_status",
            SignatureCategory::Database => "database",
            SignatureCategory::Network => "network",
            SignatureCategory::Fallback => "fallback",
        };
        f.write_str(s)
    }
}

/// Substring of the normalized text that identifies the error class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub category: SignatureCategory,
    pub text: String,
}

struct Patterns {
    hex_address: Regex,
    hex_id: Regex,
    whitespace: Regex,
    /// Category rules in priority order.
    categories: [(SignatureCategory, Regex); 5],
}

static PATTERNS: OnceLock<Patterns> = OnceLock::new();

fn patterns() -> &'static Patterns {
    PATTERNS.get_or_init(|| Patterns {
        hex_address: Regex::new(r"0x[a-f0-9]+").expect("hex address pattern"),
        hex_id: Regex::new(r"\b[0-9a-f]{8,}\b").expect("hex id pattern"),
        whitespace: Regex::new(r"\s+").expect("whitespace pattern"),
        categories: [
            (
                SignatureCategory::Exception,
                Regex::new(r"\b[a-z]+exception\b(?:\.java|\.js|\.ts)?").expect("exception pattern"),
            ),
            (
                SignatureCategory::RuntimeError,
                Regex::new(r"(?:typeerror|referenceerror|syntaxerror)\b(?:\.js)?")
                    .expect("runtime error pattern"),
            ),
            (
                SignatureCategory::HttpStatus,
                Regex::new(r"\b(?:4\d\d|5\d\d)\b").expect("http status pattern"),
            ),
            (
                SignatureCategory::Database,
                Regex::new(r"mongoerror|sqlstate|duplicate key|constraint failed")
                    .expect("database pattern"),
            ),
            (
                SignatureCategory::Network,
                Regex::new(r"econnrefused|timeout|network unreachable|connection reset")
                    .expect("network pattern"),
            ),
        ],
    })
}

/// Lowercases, strips hex noise, collapses whitespace and trims.
pub fn normalize(text: &str) -> String {
    let p = patterns();
    let lower = text.to_lowercase();
    let no_addr = p.hex_address.replace_all(&lower, "");
    let no_ids = p.hex_id.replace_all(&no_addr, "");
    p.whitespace.replace_all(&no_ids, " ").trim().to_string()
}

/// Picks the signature of already normalized text.
pub fn extract_signature(normalized: &str) -> Signature {
    for (category, re) in &patterns().categories {
        if let Some(m) = re.find(normalized) {
            return Signature {
                category: *category,
                text: m.as_str().to_string(),
            };
        }
    }
    Signature {
        category: SignatureCategory::Fallback,
        text: normalized.chars().take(FALLBACK_SIGNATURE_CHARS).collect(),
    }
}

/// Normalizes `text` and returns its signature.
pub fn signature(text: &str) -> Signature {
    extract_signature(&normalize(text))
}

/// Lowercase hex SHA-256 (64 chars) of the signature of `text`.
pub fn fingerprint(text: &str) -> String {
    sha_hex(&signature(text).text)
}

fn sha_hex(s: &str) -> String {
    let mut h = Sha256::new();
    h.update(s.as_bytes());
    format!("{:x}", h.finalize())
}
