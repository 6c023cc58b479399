//! Site assembly: runs every stage and writes the final output directory.
//!
//! ```text
//! <root>/assets    ──► process_assets ──► AssetMap ──┐
//! <root>/articles  ──► load_articles  ──► Vec<Article> ──► paginate ──► render
//!                                                    └──► sitemap, rss, robots
//! ```
//!
//! Output layout (clean URLs):
//!
//! ```text
//! dist/
//! ├── index.html
//! ├── page/2.html …
//! ├── articles/{slug}.html
//! ├── {slug}.html              # top-level articles
//! ├── sitemap.xml  rss.xml  robots.txt  favicon.ico
//! └── css/style.1a2b3c4d.css, img/cover.sm.0f0f0f0f.avif, …
//! ```
//!
//! The output directory is removed and recreated at the start of a build.
//! The hash cache and `csp.json` live in the project root, not in the output.

use crate::articles::{Article, ArticleError, load_articles};
use crate::assets::{AssetError, AssetEvent, enumerate_assets, process_assets};
use crate::cache::{CacheStats, HashCache};
use crate::config::{ConfigError, SiteConfig};
use crate::date::DateTimeUtc;
use crate::imaging::ImageBackend;
use crate::paginate::{SiteUrls, paginate};
use crate::render::{self, RenderContext};
use crate::seo::{self, AnalyticsCsp, FeedError};
use maud::Markup;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SiteError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),
    #[error("Article error: {0}")]
    Article(#[from] ArticleError),
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Refusing to clean output directory {0}: it contains the project root")]
    UnsafeOutput(PathBuf),
}

/// Non-fatal problems found while building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    MissingAssetsDir(PathBuf),
    MissingArticlesDir(PathBuf),
    MissingFavicon(PathBuf),
    /// The favicon exists but could not be copied into the output.
    FaviconNotCopied { path: PathBuf, error: String },
    /// CSP generation could not read the rendered landing page.
    MissingIndex(PathBuf),
    /// `google_tag_id` is set but no inline `gtag(` script was found.
    MissingAnalyticsSnippet(PathBuf),
    /// The CSP hash was computed but `csp.json` could not be written.
    CspNotWritten { path: PathBuf, error: String },
    /// Referenced by config or front matter, absent from the asset map.
    UnresolvedAsset(String),
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::MissingAssetsDir(p) => {
                write!(f, "assets directory {} not found, no assets copied", p.display())
            }
            Warning::MissingArticlesDir(p) => {
                write!(f, "articles directory {} not found, building with no articles", p.display())
            }
            Warning::MissingFavicon(p) => write!(f, "favicon {} not found", p.display()),
            Warning::FaviconNotCopied { path, error } => {
                write!(f, "favicon {} not copied: {}", path.display(), error)
            }
            Warning::CspNotWritten { path, error } => {
                write!(f, "CSP hash not written to {}: {}", path.display(), error)
            }
            Warning::MissingIndex(p) => {
                write!(f, "{} not found, CSP hash not generated", p.display())
            }
            Warning::MissingAnalyticsSnippet(p) => {
                write!(f, "no analytics snippet in {}, CSP hash not generated", p.display())
            }
            Warning::UnresolvedAsset(rel) => write!(f, "asset {} is referenced but missing", rel),
        }
    }
}

/// Knobs that don't belong in `config.toml`.
#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
    /// Load the persisted hash cache (`--no-cache` turns this off).
    pub use_cache: bool,
    /// Build date for sitemap `lastmod` and the feed's `lastBuildDate`.
    pub now: DateTimeUtc,
}

impl BuildOptions {
    pub fn new(use_cache: bool) -> Self {
        Self {
            use_cache,
            now: DateTimeUtc::now(),
        }
    }
}

/// What a build produced.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// All loaded articles, external and top-level included.
    pub articles: usize,
    /// Listing pages including the landing page.
    pub pages: usize,
    /// HTML files written, relative to the output root.
    pub html_files: Vec<String>,
    /// Entries in the asset map.
    pub assets: usize,
    pub stats: CacheStats,
    pub csp: Option<AnalyticsCsp>,
    pub warnings: Vec<Warning>,
}

/// What `check` found, without writing anything.
#[derive(Debug, Default)]
pub struct CheckReport {
    pub articles: usize,
    pub pages: usize,
    pub assets: usize,
    pub warnings: Vec<Warning>,
}

/// Run the full build from `root` into `dist`.
///
/// `events` receives asset progress; the sender is dropped once the asset
/// stage finishes so a listening printer thread can exit.
pub fn build(
    root: &Path,
    dist: &Path,
    config: &SiteConfig,
    backend: &impl ImageBackend,
    options: BuildOptions,
    events: Option<Sender<AssetEvent>>,
) -> Result<BuildReport, SiteError> {
    clean_output(root, dist)?;
    let mut report = BuildReport::default();

    // Assets
    let cache_path = root.join(&config.paths.cache_file);
    let mut cache = if options.use_cache {
        HashCache::load(&cache_path)
    } else {
        HashCache::empty()
    };
    let assets_root = root.join(&config.paths.assets);
    let outcome = process_assets(
        &assets_root,
        dist,
        &config.images,
        &mut cache,
        backend,
        events,
    )?;
    if assets_root.is_dir() {
        cache.save(&cache_path)?;
    }
    report.assets = outcome.map.len();
    report.stats = outcome.stats;
    report.warnings.extend(outcome.warnings);

    // Articles
    let articles = load_or_warn(&root.join(&config.paths.articles), &mut report.warnings)?;
    report.articles = articles.len();

    // Pages
    let urls = SiteUrls::from_site(&config.site);
    let ctx = RenderContext {
        site: &config.site,
        images: &config.images,
        urls: &urls,
        assets: &outcome.map,
        variants: &outcome.variants,
    };
    report
        .warnings
        .extend(render::unresolved_assets(&ctx, &articles));

    let pagination = paginate(
        &articles,
        config.pagination.landing_size,
        config.pagination.page_size,
        &urls,
    );
    report.pages = pagination.total_pages();

    write_html(dist, "index.html", render::render_landing(&ctx, &pagination))?;
    report.html_files.push("index.html".to_string());
    for page in &pagination.pages {
        let file = SiteUrls::page_file(page.number);
        write_html(dist, &file, render::render_listing_page(&ctx, page))?;
        report.html_files.push(file);
    }
    for article in articles.iter().filter(|a| !a.is_external()) {
        let file = urls.article_file(article);
        write_html(dist, &file, render::render_article(&ctx, article))?;
        report.html_files.push(file);
    }

    // Feeds
    write_output(
        dist,
        "sitemap.xml",
        &seo::sitemap_xml(&articles, report.pages, &urls, options.now),
    )?;
    write_output(
        dist,
        "rss.xml",
        &seo::rss_xml(&articles, &config.site, &urls, config.feed.limit, options.now)?,
    )?;
    write_output(dist, "robots.txt", &seo::robots_txt(&urls))?;

    // Favicon
    let favicon = root.join(&config.paths.favicon);
    if favicon.is_file() {
        let name = favicon.file_name().unwrap_or(favicon.as_os_str());
        if let Err(e) = fs::copy(&favicon, dist.join(name)) {
            report.warnings.push(Warning::FaviconNotCopied {
                path: favicon,
                error: e.to_string(),
            });
        }
    } else {
        report.warnings.push(Warning::MissingFavicon(favicon));
    }

    // CSP
    if config.site.google_tag_id.is_some() {
        let index = dist.join("index.html");
        match fs::read_to_string(&index) {
            Err(_) => report.warnings.push(Warning::MissingIndex(index)),
            Ok(html) => match seo::analytics_csp(&html) {
                None => report.warnings.push(Warning::MissingAnalyticsSnippet(index)),
                Some(csp) => {
                    let json = serde_json::to_string_pretty(&csp)?;
                    let path = root.join(&config.paths.csp_file);
                    match fs::write(&path, json) {
                        Ok(()) => report.csp = Some(csp),
                        Err(e) => report.warnings.push(Warning::CspNotWritten {
                            path,
                            error: e.to_string(),
                        }),
                    }
                }
            },
        }
    }

    Ok(report)
}

/// Validate a project without writing any output.
///
/// Parses every article, counts assets and pages, and reports the same
/// missing-directory and missing-asset warnings a build would.
pub fn check(root: &Path, config: &SiteConfig) -> Result<CheckReport, SiteError> {
    let mut report = CheckReport::default();

    let assets_root = root.join(&config.paths.assets);
    if assets_root.is_dir() {
        report.assets = enumerate_assets(&assets_root)
            .collect::<Result<Vec<_>, _>>()
            .map_err(AssetError::from)?
            .len();
    } else {
        report
            .warnings
            .push(Warning::MissingAssetsDir(assets_root.clone()));
    }

    let articles = load_or_warn(&root.join(&config.paths.articles), &mut report.warnings)?;
    report.articles = articles.len();

    let referenced = config
        .site
        .stylesheets
        .iter()
        .chain(&config.site.scripts)
        .map(String::as_str)
        .chain(articles.iter().filter_map(|a| a.image.as_deref()));
    let mut missing: Vec<&str> = Vec::new();
    for rel in referenced {
        if !assets_root.join(rel).is_file() && !missing.contains(&rel) {
            missing.push(rel);
        }
    }
    report.warnings.extend(
        missing
            .into_iter()
            .map(|rel| Warning::UnresolvedAsset(rel.to_string())),
    );

    let urls = SiteUrls::from_site(&config.site);
    report.pages = paginate(
        &articles,
        config.pagination.landing_size,
        config.pagination.page_size,
        &urls,
    )
    .total_pages();

    let favicon = root.join(&config.paths.favicon);
    if !favicon.is_file() {
        report.warnings.push(Warning::MissingFavicon(favicon));
    }
    Ok(report)
}

/// A missing articles directory becomes a warning and zero articles.
fn load_or_warn(dir: &Path, warnings: &mut Vec<Warning>) -> Result<Vec<Article>, ArticleError> {
    match load_articles(dir) {
        Ok(articles) => Ok(articles),
        Err(ArticleError::MissingDirectory(path)) => {
            warnings.push(Warning::MissingArticlesDir(path));
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

/// Remove and recreate the output directory.
fn clean_output(root: &Path, dist: &Path) -> Result<(), SiteError> {
    if dist.exists() {
        let dist_abs = dist.canonicalize()?;
        let inside = root
            .canonicalize()
            .map(|root_abs| root_abs.starts_with(&dist_abs))
            .unwrap_or(false);
        if inside {
            return Err(SiteError::UnsafeOutput(dist.to_path_buf()));
        }
        fs::remove_dir_all(dist)?;
    }
    fs::create_dir_all(dist)?;
    Ok(())
}

fn write_html(dist: &Path, rel: &str, markup: Markup) -> io::Result<()> {
    write_output(dist, rel, &markup.into_string())
}

fn write_output(dist: &Path, rel: &str, contents: &str) -> io::Result<()> {
    let path = dist.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)
}
