//! URL slugs for catalog entries.
//!
//! A slug is derived from the entry name alone. Only ASCII word characters
//! survive; whitespace and underscore runs become a single `-`.

/// Converts a plugin name into its URL slug.
///
/// Lowercases and trims the name, drops every character that is not an ASCII
/// letter, digit, underscore, whitespace or `-`, turns whitespace/underscore
/// runs into `-`, collapses repeated `-`, and strips leading and trailing `-`.
///
/// ```
/// assert_eq!(plugdb_core::name_to_slug("FG-DS 902"), "fg-ds-902");
/// ```
#[must_use]
pub fn name_to_slug(name: &str) -> String {
    let lowered = name.to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut pending_dash = false;

    for ch in lowered.trim().chars() {
        if ch.is_whitespace() || ch == '_' || ch == '-' {
            pending_dash = true;
        } else if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        }
        // anything else is dropped without breaking the current run
    }

    slug
}
