//! URL slugs for articles.
//!
//! Titles are transliterated to ASCII, stripped to `[a-z0-9-]` and joined
//! with dashes. Two articles in the same namespace never share a slug: later
//! duplicates get `-2`, `-3`, … in collection order. Top-level articles
//! (written at the site root) and nested ones (under `articles_base`) are
//! separate namespaces, since their URLs cannot collide. The top-level
//! namespace starts with [`RESERVED_ROOT_SLUGS`] taken, so an article can
//! never overwrite the landing page or shadow the `page/` listings.

use crate::articles::Article;
use std::collections::HashSet;

/// Slug used when a title has no ASCII-representable characters.
pub const FALLBACK_SLUG: &str = "untitled";

/// Convert a title to a URL slug.
///
/// ```text
/// "Hola Mundo"          → "hola-mundo"
/// "Análisis: 2024 ¿y?"  → "analisis-2024-y"
/// "  a   b  "           → "a-b"
/// ```
///
/// Existing dashes are kept. Returns an empty string when nothing survives;
/// callers substitute [`FALLBACK_SLUG`].
pub fn slugify(title: &str) -> String {
    let ascii = deunicode::deunicode(title);
    let kept: String = ascii
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect();
    kept.split_whitespace()
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Root names the build writes itself: `index.html` and `page/`.
pub const RESERVED_ROOT_SLUGS: &[&str] = &["index", "page"];

/// Tracks claimed slugs within one namespace.
#[derive(Debug, Default)]
pub struct SlugRegistry {
    seen: HashSet<String>,
}

impl SlugRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry where `names` are already taken.
    pub fn reserving(names: &[&str]) -> Self {
        Self {
            seen: names.iter().map(|n| n.to_string()).collect(),
        }
    }

    /// Claim `base` (or the first free `base-N`, N ≥ 2).
    pub fn claim(&mut self, base: &str) -> String {
        let base = if base.is_empty() { FALLBACK_SLUG } else { base };
        let mut candidate = base.to_string();
        let mut n = 1;
        while self.seen.contains(&candidate) {
            n += 1;
            candidate = format!("{base}-{n}");
        }
        self.seen.insert(candidate.clone());
        candidate
    }
}

/// Assign a unique slug to every article, in slice order.
pub fn assign_unique_slugs(articles: &mut [Article]) {
    let mut nested = SlugRegistry::new();
    let mut top_level = SlugRegistry::reserving(RESERVED_ROOT_SLUGS);
    for article in articles {
        let registry = if article.is_top_level {
            &mut top_level
        } else {
            &mut nested
        };
        article.slug = registry.claim(&slugify(&article.title));
    }
}
