//! Shared test utilities for the quire test suite.
//!
//! Provides an [`Article`] builder, an in-memory PNG fixture, and small
//! filesystem helpers for building throwaway asset trees.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let article = ArticleBuilder::new("Hola Mundo")
//!     .slug("hola-mundo")
//!     .date(2024, 6, 15)
//!     .image("img/cover.jpg")
//!     .build();
//!
//! let tmp = TempDir::new().unwrap();
//! write_file(tmp.path(), "img/cover.png", &png_bytes(64, 48));
//! assert_eq!(list_files(tmp.path()), vec!["img/cover.png"]);
//! ```

use crate::articles::Article;
use crate::date::DateTimeUtc;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// =========================================================================
// Articles
// =========================================================================

/// Builder for [`Article`] values with sensible test defaults.
pub struct ArticleBuilder {
    article: Article,
}

impl ArticleBuilder {
    pub fn new(title: &str) -> Self {
        Self {
            article: Article {
                slug: String::new(),
                title: title.to_string(),
                date: DateTimeUtc::from_ymd(2024, 1, 1),
                author: None,
                author_link: None,
                description: None,
                content: format!("<p>{title}</p>\n"),
                word_count: 1,
                image: None,
                external_link: None,
                is_top_level: false,
                source: PathBuf::from(format!("{title}.md")),
            },
        }
    }

    pub fn slug(mut self, slug: &str) -> Self {
        self.article.slug = slug.to_string();
        self
    }

    pub fn date(mut self, year: u16, month: u8, day: u8) -> Self {
        self.article.date = DateTimeUtc::from_ymd(year, month, day);
        self
    }

    pub fn author(mut self, author: &str) -> Self {
        self.article.author = Some(author.to_string());
        self
    }

    pub fn author_link(mut self, link: &str) -> Self {
        self.article.author_link = Some(link.to_string());
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.article.description = Some(description.to_string());
        self
    }

    pub fn content(mut self, html: &str, word_count: usize) -> Self {
        self.article.content = html.to_string();
        self.article.word_count = word_count;
        self
    }

    pub fn image(mut self, rel: &str) -> Self {
        self.article.image = Some(rel.to_string());
        self
    }

    pub fn external(mut self, link: &str) -> Self {
        self.article.external_link = Some(link.to_string());
        self
    }

    pub fn top_level(mut self) -> Self {
        self.article.is_top_level = true;
        self
    }

    pub fn build(self) -> Article {
        self.article
    }
}

// =========================================================================
// Filesystem
// =========================================================================

/// A gradient PNG of the given size, encoded in memory.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 128])
    });
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// Write `bytes` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, bytes: &[u8]) -> PathBuf {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Every file under `root`, as sorted POSIX-style relative paths.
pub fn list_files(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(root)
                .unwrap()
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/")
        })
        .collect();
    files.sort();
    files
}
