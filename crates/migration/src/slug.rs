//! Role slugs derived from group names.

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Lowercase, hyphen separated, ASCII-only identifier for `name`.
///
/// Accents are stripped (`"Élite"` → `"elite"`), every run of other
/// characters becomes a single `-`, and leading/trailing separators are
/// dropped. Returns `None` when nothing usable is left.
#[must_use]
pub fn slugify(name: &str) -> Option<String> {
    let mut out = String::with_capacity(name.len());
    let mut pending_separator = false;

    for ch in name.nfkd() {
        if is_combining_mark(ch) {
            continue;
        }
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !out.is_empty() {
                out.push('-');
            }
            pending_separator = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }

    if out.is_empty() { None } else { Some(out) }
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn lowercases_simple_names() {
        assert_eq!(slugify("Admins").as_deref(), Some("admins"));
    }

    #[test]
    fn collapses_separators() {
        assert_eq!(
            slugify("  Super -- Admins_2 ").as_deref(),
            Some("super-admins-2")
        );
    }

    #[test]
    fn strips_accents() {
        assert_eq!(slugify("Élite Modérateurs").as_deref(), Some("elite-moderateurs"));
    }

    #[test]
    fn is_deterministic() {
        assert_eq!(slugify("Prozorov Family"), slugify("Prozorov Family"));
    }

    #[test]
    fn distinct_names_can_collide() {
        assert_eq!(slugify("Site Admins"), slugify("site-admins"));
    }

    #[test]
    fn empty_when_nothing_survives() {
        assert_eq!(slugify("!!!"), None);
        assert_eq!(slugify(""), None);
    }
}
