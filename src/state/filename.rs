//! Collision-free document names.

use std::path::Path;

/// Extension of profile documents, without the dot.
pub const PROFILE_EXTENSION: &str = "json";

/// Stem used when a title sanitizes to nothing.
const FALLBACK_STEM: &str = "profile";

/// Characters no supported filesystem accepts in a file name.
const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// File stem for a title.
///
/// Characters illegal in a file name become `_`, whitespace becomes `-`,
/// and letters are lowercased so stems compare equal on case-insensitive
/// filesystems.
pub fn sanitize(desired: &str) -> String {
    let sanitized: String = desired
        .trim()
        .chars()
        .flat_map(|c| {
            let mapped = if ILLEGAL_CHARS.contains(&c) || c.is_control() {
                '_'
            } else if c.is_whitespace() {
                '-'
            } else {
                c
            };
            mapped.to_lowercase()
        })
        .collect();

    if sanitized.trim().is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        sanitized
    }
}

/// Pick a file name for `desired` that is free in `directory`.
///
/// Tries `<sanitized>.json`, then `<sanitized>-1.json`, `<sanitized>-2.json`
/// and so on. Nothing is created on disk.
pub fn allocate(directory: &Path, desired: &str) -> String {
    allocate_with(desired, |candidate| directory.join(candidate).exists())
}

/// Same as [`allocate`], with the occupancy test supplied by the caller.
pub fn allocate_with(desired: &str, is_taken: impl Fn(&str) -> bool) -> String {
    let stem = sanitize(desired);

    let first = format!("{}.{}", stem, PROFILE_EXTENSION);
    if !is_taken(&first) {
        return first;
    }

    (1u32..)
        .map(|n| format!("{}-{}.{}", stem, n, PROFILE_EXTENSION))
        .find(|candidate| !is_taken(candidate))
        .unwrap_or(first)
}
