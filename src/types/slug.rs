/// Derives a normalized, URL-safe identifier from a display name.
///
/// Lowercase, alphanumeric, runs of anything else collapse to a single
/// hyphen, leading/trailing hyphens trimmed. Idempotent: slugifying a slug
/// returns it unchanged.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}
