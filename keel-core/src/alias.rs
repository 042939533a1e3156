//! Alias synthesis for entities discovered on the registry.

use crate::types::{Alias, RemoteId};

/// Convert a display name into a CLI- and filesystem-safe alias.
///
/// Lowercases, turns spaces into hyphens, drops everything outside
/// `[a-z0-9_-]`, collapses repeated hyphens and trims hyphens at both ends.
/// `"Login Test (iOS)"` becomes `"login-test-ios"`.
pub fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.to_lowercase().chars() {
        let ch = if ch == ' ' { '-' } else { ch };
        if !(ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' || ch == '_') {
            continue;
        }
        if ch == '-' && out.ends_with('-') {
            continue;
        }
        out.push(ch);
    }
    out.trim_matches('-').to_string()
}

/// Base alias for a remote entity: the sanitized name, or
/// `<fallback_prefix>-<first 8 chars of id>` when the name sanitizes to nothing.
pub fn base_alias(name: &str, id: &RemoteId, fallback_prefix: &str) -> String {
    let sanitized = sanitize(name);
    if sanitized.is_empty() {
        format!("{fallback_prefix}-{}", id.short(8))
    } else {
        sanitized
    }
}

/// Return `base` if it is free, otherwise the first free `base-2`, `base-3`, …
pub fn ensure_unique(base: &str, is_taken: impl Fn(&Alias) -> bool) -> Alias {
    let candidate = Alias::from(base);
    if !is_taken(&candidate) {
        return candidate;
    }
    (2u32..)
        .map(|n| Alias::from(format!("{base}-{n}")))
        .find(|candidate| !is_taken(candidate))
        .unwrap_or_else(|| Alias::from(base))
}
