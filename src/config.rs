//! `config.toml` loading.
//!
//! Handles loading, validating, and layering `config.toml`. The stock defaults
//! are the base layer; the project's `config.toml` is merged on top of them.
//! There is exactly one configuration value per build and it is passed
//! explicitly to every stage, never read from global state.
//!
//! ## Config File Location
//!
//! ```text
//! my-site/
//! ├── config.toml       # Site config (optional, overrides stock defaults)
//! ├── articles/         # One Markdown file per article
//! ├── assets/           # Stylesheets, scripts, images
//! └── favicon.ico       # Copied to the output root when present
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [site]
//! title = "My Site"
//! description = "Articles and notes."
//! origin = "https://example.com"   # No trailing slash
//! articles_base = "/articles"       # URL prefix for nested articles
//! locale = "en-US"
//! clean_urls = true                 # `/page/2` instead of `/page/2.html`
//! load_more_label = "Load more"
//! stylesheets = ["css/style.css"]   # Asset paths, resolved through the asset map
//! scripts = ["js/script.js"]
//! # google_tag_id = "G-XXXXXXX"     # Enables the analytics snippet and csp.json
//!
//! [paths]
//! assets = "assets"
//! articles = "articles"
//! cache_file = "hashes.json"
//! favicon = "favicon.ico"
//! csp_file = "csp.json"
//!
//! [pagination]
//! landing_size = 4                  # Articles on the landing page
//! page_size = 3                     # Articles per page after that
//!
//! [images]
//! prefix = "img/"                   # Only raster images under this prefix get variants
//! listing_variant = "sm"
//! article_variant = "md"
//! # tint = "#f4efe6"                # Desaturate + darken-blend over this colour
//!
//! [[images.variants]]
//! label = "sm"
//! width = 700
//! quality = 90
//!
//! [[images.variants]]
//! label = "md"
//! width = 1024
//! quality = 90
//!
//! [feed]
//! limit = 12
//!
//! [processing]
//! max_processes = 4                 # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early. Arrays (such as
//! `images.variants`) replace the default array as a whole.

use crate::imaging::Tint;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Everything `config.toml` can set.
///
/// Every field has a default, so a project only lists what it changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Site identity and URL layout.
    pub site: SiteInfo,
    /// Input and cache locations, relative to the project root.
    pub paths: PathsConfig,
    /// Landing and page sizes for article listings.
    pub pagination: PaginationConfig,
    /// Responsive image variants.
    pub images: ImagesConfig,
    /// RSS feed settings.
    pub feed: FeedConfig,
    /// Worker pool size for asset planning.
    pub processing: ProcessingConfig,
}

impl SiteConfig {
    /// Reject values the build cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let origin = &self.site.origin;
        if !(origin.starts_with("http://") || origin.starts_with("https://")) {
            return Err(ConfigError::Validation(
                "site.origin must start with http:// or https://".into(),
            ));
        }
        if origin.ends_with('/') {
            return Err(ConfigError::Validation(
                "site.origin must not end with '/'".into(),
            ));
        }
        if !self.site.articles_base.starts_with('/') || self.site.articles_base.ends_with('/') {
            return Err(ConfigError::Validation(
                "site.articles_base must start with '/' and not end with '/'".into(),
            ));
        }
        if let Some(id) = &self.site.google_tag_id
            && (id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'))
        {
            return Err(ConfigError::Validation(format!(
                "site.google_tag_id {id:?} must contain only letters, digits and '-'"
            )));
        }
        if self.pagination.landing_size == 0 {
            return Err(ConfigError::Validation(
                "pagination.landing_size must be at least 1".into(),
            ));
        }
        if self.pagination.page_size == 0 {
            return Err(ConfigError::Validation(
                "pagination.page_size must be at least 1".into(),
            ));
        }
        self.images.validate()
    }
}

/// Site identity and URL layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteInfo {
    pub title: String,
    pub description: String,
    /// Scheme and host, no trailing slash (e.g. `https://example.com`).
    pub origin: String,
    /// URL prefix under which nested articles are written.
    pub articles_base: String,
    /// BCP 47 tag used for `<html lang>`, the feed, and display dates.
    pub locale: String,
    /// Emit suffix-less URLs (`/page/2`). Files are always written as `.html`.
    pub clean_urls: bool,
    /// Text of the pagination link at the bottom of a listing.
    pub load_more_label: String,
    /// Stylesheets linked from every page, as asset-relative paths.
    pub stylesheets: Vec<String>,
    /// Scripts loaded (deferred) on every page, as asset-relative paths.
    pub scripts: Vec<String>,
    /// Google tag ID. When set, the gtag snippet is inlined and `csp.json` is written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_tag_id: Option<String>,
}

impl Default for SiteInfo {
    fn default() -> Self {
        Self {
            title: "My Site".to_string(),
            description: "Articles and notes.".to_string(),
            origin: "https://example.com".to_string(),
            articles_base: "/articles".to_string(),
            locale: "en-US".to_string(),
            clean_urls: true,
            load_more_label: "Load more".to_string(),
            stylesheets: vec!["css/style.css".to_string()],
            scripts: vec!["js/script.js".to_string()],
            google_tag_id: None,
        }
    }
}

impl SiteInfo {
    /// Suffix appended to generated page URLs.
    pub fn url_suffix(&self) -> &'static str {
        if self.clean_urls { "" } else { ".html" }
    }

    /// Language part of the locale (`es-ES` → `es`).
    pub fn language(&self) -> &str {
        self.locale.split(['-', '_']).next().unwrap_or("en")
    }
}

/// Input and cache locations, relative to the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub assets: String,
    pub articles: String,
    /// Persisted `relative path → hash` map for generic assets.
    pub cache_file: String,
    pub favicon: String,
    /// Where the CSP hash and header are written (not part of the site output).
    pub csp_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            assets: "assets".to_string(),
            articles: "articles".to_string(),
            cache_file: "hashes.json".to_string(),
            favicon: "favicon.ico".to_string(),
            csp_file: "csp.json".to_string(),
        }
    }
}

/// Landing and page sizes for article listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PaginationConfig {
    pub landing_size: usize,
    pub page_size: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            landing_size: 4,
            page_size: 3,
        }
    }
}

/// One responsive image tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariantSpec {
    /// Short label used in file names and the asset map (e.g. `"sm"`).
    pub label: String,
    /// Target width in pixels. Sources narrower than this are not enlarged.
    pub width: u32,
    /// AVIF encoding quality (1-100).
    pub quality: u32,
}

/// Image variant settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Asset-relative directory prefix whose JPEG/PNG files get variants.
    pub prefix: String,
    /// Variant used for listing thumbnails.
    pub listing_variant: String,
    /// Variant used as the article hero `src` and `og:image`.
    pub article_variant: String,
    /// Background colour for the desaturate + darken post-process.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tint: Option<String>,
    pub variants: Vec<VariantSpec>,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            prefix: "img/".to_string(),
            listing_variant: "sm".to_string(),
            article_variant: "md".to_string(),
            tint: None,
            variants: vec![
                VariantSpec {
                    label: "sm".to_string(),
                    width: 700,
                    quality: 90,
                },
                VariantSpec {
                    label: "md".to_string(),
                    width: 1024,
                    quality: 90,
                },
            ],
        }
    }
}

impl ImagesConfig {
    /// Variant list must be non-empty with unique, known labels.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.variants.is_empty() {
            return Err(ConfigError::Validation(
                "images.variants must not be empty".into(),
            ));
        }
        let mut seen = HashSet::new();
        for variant in &self.variants {
            if variant.label.is_empty() || variant.label.contains(['/', '.']) {
                return Err(ConfigError::Validation(format!(
                    "images.variants label {:?} must be non-empty and contain no '/' or '.'",
                    variant.label
                )));
            }
            if !seen.insert(variant.label.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "images.variants label {:?} is duplicated",
                    variant.label
                )));
            }
            if variant.width == 0 {
                return Err(ConfigError::Validation(format!(
                    "images.variants.{}.width must be non-zero",
                    variant.label
                )));
            }
            if !(1..=100).contains(&variant.quality) {
                return Err(ConfigError::Validation(format!(
                    "images.variants.{}.quality must be 1-100",
                    variant.label
                )));
            }
        }
        for (key, label) in [
            ("listing_variant", &self.listing_variant),
            ("article_variant", &self.article_variant),
        ] {
            if !seen.contains(label.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "images.{key} {label:?} is not one of images.variants"
                )));
            }
        }
        self.parsed_tint()?;
        Ok(())
    }

    /// Parse the configured tint colour, if any.
    pub fn parsed_tint(&self) -> Result<Option<Tint>, ConfigError> {
        self.tint
            .as_deref()
            .map(|hex| {
                Tint::from_hex(hex).ok_or_else(|| {
                    ConfigError::Validation(format!("images.tint {hex:?} is not a #rrggbb colour"))
                })
            })
            .transpose()
    }
}

/// RSS feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeedConfig {
    /// Maximum number of items in `rss.xml`.
    pub limit: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self { limit: 12 }
    }
}

/// Worker pool size for asset planning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel asset workers.
    /// When absent, defaults to the number of CPU cores.
    /// Requests above the core count are clamped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_processes: Option<usize>,
}

/// Number of rayon workers to start.
///
/// - `None`: every available core
/// - `Some(n)`: `min(n, cores)`
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// `SiteConfig::default()` as a TOML table.
///
/// User files are merged onto this layer.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Deep-merge two TOML values.
///
/// - Tables merge per key, the overlay winning on conflicts.
/// - Non-table values in overlay (arrays included) replace base values entirely.
/// - Base keys missing from the overlay survive.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read `<dir>/config.toml` without deserializing it.
///
/// `Ok(None)` when the file is absent.
/// A present but malformed file is an error.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Layer `overlay` over `base`, deserialize, validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given project root.
///
/// User keys override the stock defaults; unknown keys are an error.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// The stock `config.toml`, every key present and commented.
///
/// Printed by `quire gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# quire configuration
# ===================
# Every key is optional; delete what you don't change.
# Values shown below are the defaults. Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Site identity and URL layout
# ---------------------------------------------------------------------------
[site]
title = "My Site"
description = "Articles and notes."

# Scheme and host used for canonical URLs, the sitemap and the feed.
# No trailing slash.
origin = "https://example.com"

# URL prefix for nested (non top-level) articles.
articles_base = "/articles"

# Used for <html lang>, the feed language and display dates.
locale = "en-US"

# true: links look like /page/2, false: /page/2.html.
# Files are always written with the .html extension.
clean_urls = true

# Text of the pagination link at the bottom of listings.
load_more_label = "Load more"

# Asset-relative paths, rewritten to their content-hashed names.
stylesheets = ["css/style.css"]
scripts = ["js/script.js"]

# Inline the Google tag and write a CSP hash for it to csp.json.
# google_tag_id = "G-XXXXXXX"

# ---------------------------------------------------------------------------
# Paths (relative to the project root)
# ---------------------------------------------------------------------------
[paths]
assets = "assets"
articles = "articles"
cache_file = "hashes.json"
favicon = "favicon.ico"
csp_file = "csp.json"

# ---------------------------------------------------------------------------
# Pagination
# ---------------------------------------------------------------------------
[pagination]
# Articles shown on the landing page.
landing_size = 4
# Articles per page from /page/2 onwards.
page_size = 3

# ---------------------------------------------------------------------------
# Responsive images
# ---------------------------------------------------------------------------
[images]
# JPEG/PNG files under this asset prefix get responsive AVIF variants.
prefix = "img/"

# Variant used for listing thumbnails and for the article hero image.
listing_variant = "sm"
article_variant = "md"

# Desaturate and darken-blend every variant over this colour.
# tint = "#f4efe6"

# Each variant is resized to `width` (never enlarged) and encoded
# at `quality` (1-100). Defining variants replaces this whole list.
[[images.variants]]
label = "sm"
width = 700
quality = 90

[[images.variants]]
label = "md"
width = 1024
quality = 90

# ---------------------------------------------------------------------------
# Feed
# ---------------------------------------------------------------------------
[feed]
# Maximum number of articles in rss.xml.
limit = 12

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel asset workers.
# Leave unset to use every CPU core.
# max_processes = 4
"##
}
