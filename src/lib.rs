//! # Quire
//!
//! A static site generator for article-driven sites. Articles are markdown
//! files with TOML front matter; assets are copied under content-hashed names
//! so they can be served with far-future cache headers; images become AVIF
//! variants at configured widths.
//!
//! # Pipeline
//!
//! ```text
//! assets/    ──► assets    ──► AssetMap (source path → hashed output)
//! articles/  ──► articles  ──► Vec<Article> (newest first, unique slugs)
//!                              │
//!                              ├─► paginate ──► render ──► index.html, page/N.html, articles
//!                              └─► seo      ──► sitemap.xml, rss.xml, robots.txt, csp.json
//! ```
//!
//! Every HTML page references stylesheets, scripts and images by their source
//! path; [`render`] resolves them through the asset map, so a changed file
//! always gets a new URL.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`cache`] | Content hashes, hashed file names, the persisted hash cache |
//! | [`imaging`] | Image backend trait, pure-Rust backend, variant derivation |
//! | [`assets`] | Walks the assets tree, classifies, hashes, encodes and writes |
//! | [`articles`] | Front matter parsing, markdown rendering, ordering |
//! | [`slug`] | Transliterated slugs, unique per URL namespace |
//! | [`date`] | UTC timestamps: ISO parsing, RFC 2822/3339, display dates |
//! | [`paginate`] | Landing slice, numbered pages, site URLs |
//! | [`render`] | Maud templates for listings and article pages |
//! | [`seo`] | Sitemap, RSS, robots.txt, JSON-LD, CSP hash |
//! | [`site`] | Build orchestration, warnings, reports |
//! | [`config`] | `config.toml` loading, merging over stock defaults, validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Plan, Then Write
//!
//! The asset stage hashes and encodes every file in memory (in parallel on
//! the rayon pool) before creating a single output file. An undecodable image
//! aborts the build while the output directory is still empty, and the asset
//! map is assembled in one place in sorted order.
//!
//! ## AVIF-Only Variants
//!
//! Every image variant is AVIF. One modern format avoids `<picture>` fallbacks
//! and keeps file names predictable: `<base>.<label>.<hash>.avif`.
//!
//! ## Maud Over Template Engines
//!
//! HTML is generated with [Maud](https://maud.lambda.xyz/). Templates are
//! checked at compile time and interpolation is escaped by default; article
//! bodies and JSON-LD are the only raw inserts.

pub mod articles;
pub mod assets;
pub mod cache;
pub mod config;
pub mod date;
pub mod imaging;
pub mod output;
pub mod paginate;
pub mod render;
pub mod seo;
pub mod site;
pub mod slug;

#[cfg(test)]
pub(crate) mod test_helpers;
