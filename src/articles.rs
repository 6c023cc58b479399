//! Article loading.
//!
//! Each `*.md` file directly inside the articles directory is one article:
//!
//! ```text
//! +++
//! title = "Hola Mundo"
//! date = 2024-06-15                  # TOML date/datetime or ISO string
//! author = "Ana"                     # optional
//! author_link = "https://ana.dev"    # optional, links the byline
//! description = "Short summary."     # optional, used for meta tags and RSS
//! image = "img/cover.jpg"            # optional, asset-relative
//! link = "https://elsewhere.com/x"   # optional, external article (no page)
//! top_level = false                  # optional, publish at /{slug}
//! +++
//!
//! Markdown body…
//! ```
//!
//! Files are read in file-name order and then stably sorted newest first, so
//! articles sharing a date keep their file-name order. Slugs are assigned
//! after sorting.

use crate::date::DateTimeUtc;
use crate::slug::assign_unique_slugs;
use pulldown_cmark::{Event, Options, Parser, html as md_html};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const FRONT_MATTER_FENCE: &str = "+++";

#[derive(Error, Debug)]
pub enum ArticleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Articles directory not found: {0}")]
    MissingDirectory(PathBuf),
    #[error("No +++ front matter block in {0}")]
    MissingFrontMatter(PathBuf),
    #[error("Invalid front matter in {path}: {source}")]
    FrontMatter {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Invalid date {value:?} in {path} (expected YYYY-MM-DD or YYYY-MM-DDTHH:MM:SSZ)")]
    InvalidDate { path: PathBuf, value: String },
}

/// A loaded article. Immutable once [`load_articles`] returns.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub slug: String,
    pub title: String,
    pub date: DateTimeUtc,
    pub author: Option<String>,
    pub author_link: Option<String>,
    pub description: Option<String>,
    /// Rendered HTML body.
    pub content: String,
    /// Words in the body text, for structured data.
    pub word_count: usize,
    /// Asset-relative path of the hero image.
    pub image: Option<String>,
    /// When set, the article lives elsewhere and no page is generated.
    pub external_link: Option<String>,
    /// Published at the site root and kept out of listings and the feed.
    pub is_top_level: bool,
    pub source: PathBuf,
}

impl Article {
    pub fn is_external(&self) -> bool {
        self.external_link.is_some()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FrontMatter {
    title: String,
    date: toml::Value,
    author: Option<String>,
    author_link: Option<String>,
    description: Option<String>,
    image: Option<String>,
    link: Option<String>,
    #[serde(default)]
    top_level: bool,
}

/// Load, sort and slug every article in `dir`.
pub fn load_articles(dir: &Path) -> Result<Vec<Article>, ArticleError> {
    if !dir.is_dir() {
        return Err(ArticleError::MissingDirectory(dir.to_path_buf()));
    }

    let mut md_files: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e.eq_ignore_ascii_case("md")) {
            md_files.push(path);
        }
    }
    md_files.sort();

    let mut articles = md_files
        .iter()
        .map(|path| {
            let text = fs::read_to_string(path)?;
            parse_article(path, &text)
        })
        .collect::<Result<Vec<_>, _>>()?;

    sort_newest_first(&mut articles);
    assign_unique_slugs(&mut articles);
    Ok(articles)
}

/// Stable sort by date, newest first.
pub fn sort_newest_first(articles: &mut [Article]) {
    articles.sort_by(|a, b| b.date.cmp(&a.date));
}

/// Parse one article file. The slug is left empty.
pub fn parse_article(path: &Path, text: &str) -> Result<Article, ArticleError> {
    let (front, body) = split_front_matter(text)
        .ok_or_else(|| ArticleError::MissingFrontMatter(path.to_path_buf()))?;

    let fm: FrontMatter = toml::from_str(front).map_err(|source| ArticleError::FrontMatter {
        path: path.to_path_buf(),
        source,
    })?;

    let date_text = match &fm.date {
        toml::Value::String(s) => s.clone(),
        toml::Value::Datetime(dt) => dt.to_string(),
        other => other.to_string(),
    };
    let date = DateTimeUtc::parse(&date_text).ok_or_else(|| ArticleError::InvalidDate {
        path: path.to_path_buf(),
        value: date_text.clone(),
    })?;

    let (content, word_count) = render_markdown(body);

    Ok(Article {
        slug: String::new(),
        title: fm.title,
        date,
        author: fm.author.filter(|s| !s.is_empty()),
        author_link: fm.author_link.filter(|s| !s.is_empty()),
        description: fm.description.filter(|s| !s.is_empty()),
        content,
        word_count,
        image: fm.image.filter(|s| !s.is_empty()),
        external_link: fm.link.filter(|s| !s.is_empty()),
        is_top_level: fm.top_level,
        source: path.to_path_buf(),
    })
}

/// Split `+++`-fenced front matter from the body.
fn split_front_matter(text: &str) -> Option<(&str, &str)> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let rest = text.strip_prefix(FRONT_MATTER_FENCE)?;
    let rest = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FRONT_MATTER_FENCE {
            let front = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Some((front, body));
        }
        offset += line.len();
    }
    None
}

/// Render Markdown to HTML and count the words of its text.
fn render_markdown(body: &str) -> (String, usize) {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let events: Vec<Event> = Parser::new_ext(body, options).collect();

    let word_count = events
        .iter()
        .map(|e| match e {
            Event::Text(t) | Event::Code(t) => t.split_whitespace().count(),
            _ => 0,
        })
        .sum();

    let mut html = String::new();
    md_html::push_html(&mut html, events.into_iter());
    (html, word_count)
}
