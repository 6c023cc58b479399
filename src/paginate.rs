//! Landing slice and numbered listing pages.
//!
//! ```text
//! articles (top-level removed):  a0 a1 a2 a3 | a4 a5 a6 | a7 a8 a9
//!                                  landing   |  page 2  |  page 3
//! ```
//!
//! Page numbers start at 2 because the landing page is page 1. Navigation:
//!
//! | Page | prev | next | canonical |
//! |---|---|---|---|
//! | 2 | `/` | `/page/3` if it exists | `{origin}/page/2` |
//! | n | `/page/{n-1}` | `/page/{n+1}` if it exists | `{origin}/page/{n}` |
//!
//! The suffix (`""` or `".html"`) comes from [`SiteUrls`].

use crate::articles::Article;
use crate::config::SiteInfo;

/// URL settings shared by pagination, rendering and feeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteUrls {
    /// Scheme and host, no trailing slash.
    pub origin: String,
    /// `""` for clean URLs, `".html"` otherwise.
    pub suffix: String,
    /// Prefix of nested article URLs, e.g. `/articles`.
    pub articles_base: String,
}

impl SiteUrls {
    pub fn from_site(site: &SiteInfo) -> Self {
        Self {
            origin: site.origin.clone(),
            suffix: site.url_suffix().to_string(),
            articles_base: site.articles_base.clone(),
        }
    }

    /// Site-relative URL of listing page `number` (≥ 2).
    pub fn page_path(&self, number: usize) -> String {
        format!("/page/{}{}", number, self.suffix)
    }

    /// Output file of listing page `number`, relative to the output root.
    pub fn page_file(number: usize) -> String {
        format!("page/{}.html", number)
    }

    /// Absolute URL of a site-relative path.
    pub fn absolute(&self, path: &str) -> String {
        format!("{}{}", self.origin, path)
    }

    /// Link target of an article: the external link, or its site-relative URL.
    pub fn article_href(&self, article: &Article) -> String {
        match &article.external_link {
            Some(link) => link.clone(),
            None => self.article_path(article),
        }
    }

    /// Site-relative URL of an internal article.
    pub fn article_path(&self, article: &Article) -> String {
        if article.is_top_level {
            format!("/{}{}", article.slug, self.suffix)
        } else {
            format!("{}/{}{}", self.articles_base, article.slug, self.suffix)
        }
    }

    /// Absolute URL of an article (external links are returned unchanged).
    pub fn article_url(&self, article: &Article) -> String {
        match &article.external_link {
            Some(link) => link.clone(),
            None => self.absolute(&self.article_path(article)),
        }
    }

    /// Output file of an internal article, relative to the output root.
    pub fn article_file(&self, article: &Article) -> String {
        if article.is_top_level {
            format!("{}.html", article.slug)
        } else {
            format!(
                "{}/{}.html",
                self.articles_base.trim_start_matches('/'),
                article.slug
            )
        }
    }
}

/// One numbered listing page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<'a> {
    /// Page number, starting at 2.
    pub number: usize,
    pub articles: Vec<&'a Article>,
    pub prev_url: String,
    pub next_url: Option<String>,
    pub canonical_url: String,
}

/// Landing slice plus numbered pages.
#[derive(Debug, Clone, PartialEq)]
pub struct Pagination<'a> {
    pub landing: Vec<&'a Article>,
    /// `/page/2` when any page exists.
    pub landing_next: Option<String>,
    pub pages: Vec<Page<'a>>,
}

impl Pagination<'_> {
    /// Landing page plus numbered pages.
    pub fn total_pages(&self) -> usize {
        self.pages.len() + 1
    }
}

/// Split listing articles into the landing slice and numbered pages.
///
/// Top-level articles are excluded. A `page_size` of zero is treated as one;
/// config validation rejects it before this point.
pub fn paginate<'a>(
    articles: &'a [Article],
    landing_size: usize,
    page_size: usize,
    urls: &SiteUrls,
) -> Pagination<'a> {
    let listing: Vec<&'a Article> = articles.iter().filter(|a| !a.is_top_level).collect();
    let split = landing_size.min(listing.len());
    let (landing, remaining) = listing.split_at(split);

    let chunks: Vec<&[&'a Article]> = remaining.chunks(page_size.max(1)).collect();
    let count = chunks.len();

    let pages = chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| {
            let number = i + 2;
            Page {
                number,
                articles: chunk.to_vec(),
                prev_url: if i == 0 {
                    "/".to_string()
                } else {
                    urls.page_path(i + 1)
                },
                next_url: (i + 1 < count).then(|| urls.page_path(i + 3)),
                canonical_url: urls.absolute(&urls.page_path(number)),
            }
        })
        .collect::<Vec<_>>();

    Pagination {
        landing: landing.to_vec(),
        landing_next: (!pages.is_empty()).then(|| urls.page_path(2)),
        pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ArticleBuilder;

    fn urls(suffix: &str) -> SiteUrls {
        SiteUrls {
            origin: "https://example.com".to_string(),
            suffix: suffix.to_string(),
            articles_base: "/articles".to_string(),
        }
    }

    fn numbered(n: usize) -> Vec<Article> {
        (0..n)
            .map(|i| ArticleBuilder::new(&format!("a{i}")).slug(&format!("a{i}")).build())
            .collect()
    }

    fn slugs(list: &[&Article]) -> Vec<String> {
        list.iter().map(|a| a.slug.clone()).collect()
    }

    // =========================================================================
    // Slicing
    // =========================================================================

    #[test]
    fn ten_articles_landing_four_pages_of_three() {
        let articles = numbered(10);
        let p = paginate(&articles, 4, 3, &urls(""));

        assert_eq!(slugs(&p.landing), vec!["a0", "a1", "a2", "a3"]);
        assert_eq!(p.pages.len(), 2);
        assert_eq!(slugs(&p.pages[0].articles), vec!["a4", "a5", "a6"]);
        assert_eq!(slugs(&p.pages[1].articles), vec!["a7", "a8", "a9"]);
        assert_eq!(p.total_pages(), 3);
    }

    #[test]
    fn page_count_is_ceiling_of_remaining() {
        for n in 0..20 {
            let articles = numbered(n);
            let p = paginate(&articles, 4, 3, &urls(""));
            let expected = n.saturating_sub(4).div_ceil(3);
            assert_eq!(p.pages.len(), expected, "n = {n}");
            assert_eq!(p.landing.len(), n.min(4));
            if let Some(last) = p.pages.last() {
                assert!(!last.articles.is_empty() && last.articles.len() <= 3);
            }
        }
    }

    #[test]
    fn every_listing_article_appears_once_in_order() {
        let articles = numbered(11);
        let p = paginate(&articles, 4, 3, &urls(""));
        let mut all = slugs(&p.landing);
        for page in &p.pages {
            all.extend(slugs(&page.articles));
        }
        let expected: Vec<_> = articles.iter().map(|a| a.slug.clone()).collect();
        assert_eq!(all, expected);
    }

    #[test]
    fn fewer_than_landing_size_has_no_pages() {
        let articles = numbered(3);
        let p = paginate(&articles, 4, 3, &urls(""));
        assert_eq!(p.landing.len(), 3);
        assert!(p.pages.is_empty());
        assert!(p.landing_next.is_none());
    }

    #[test]
    fn exactly_landing_size_has_no_pages() {
        let articles = numbered(4);
        let p = paginate(&articles, 4, 3, &urls(""));
        assert!(p.pages.is_empty());
        assert!(p.landing_next.is_none());
    }

    #[test]
    fn empty_input() {
        let p = paginate(&[], 4, 3, &urls(""));
        assert!(p.landing.is_empty());
        assert!(p.pages.is_empty());
        assert_eq!(p.total_pages(), 1);
    }

    #[test]
    fn top_level_articles_are_excluded() {
        let mut articles = numbered(5);
        articles.insert(1, ArticleBuilder::new("About").slug("about").top_level().build());
        let p = paginate(&articles, 4, 3, &urls(""));
        assert_eq!(slugs(&p.landing), vec!["a0", "a1", "a2", "a3"]);
        assert_eq!(slugs(&p.pages[0].articles), vec!["a4"]);
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    #[test]
    fn navigation_links_for_two_pages() {
        let articles = numbered(10);
        let p = paginate(&articles, 4, 3, &urls(""));

        assert_eq!(p.landing_next.as_deref(), Some("/page/2"));

        let p2 = &p.pages[0];
        assert_eq!(p2.number, 2);
        assert_eq!(p2.prev_url, "/");
        assert_eq!(p2.next_url.as_deref(), Some("/page/3"));
        assert_eq!(p2.canonical_url, "https://example.com/page/2");

        let p3 = &p.pages[1];
        assert_eq!(p3.number, 3);
        assert_eq!(p3.prev_url, "/page/2");
        assert_eq!(p3.next_url, None);
        assert_eq!(p3.canonical_url, "https://example.com/page/3");
    }

    #[test]
    fn links_chain_across_many_pages() {
        let articles = numbered(4 + 3 * 5);
        let p = paginate(&articles, 4, 3, &urls(""));
        for (i, page) in p.pages.iter().enumerate() {
            assert_eq!(page.number, i + 2);
            if i > 0 {
                assert_eq!(page.prev_url, format!("/page/{}", i + 1));
            }
            match p.pages.get(i + 1) {
                Some(next) => assert_eq!(page.next_url, Some(format!("/page/{}", next.number))),
                None => assert_eq!(page.next_url, None),
            }
        }
    }

    #[test]
    fn html_suffix_applies_to_every_link() {
        let articles = numbered(10);
        let p = paginate(&articles, 4, 3, &urls(".html"));
        assert_eq!(p.landing_next.as_deref(), Some("/page/2.html"));
        assert_eq!(p.pages[0].next_url.as_deref(), Some("/page/3.html"));
        assert_eq!(p.pages[1].prev_url, "/page/2.html");
        assert_eq!(p.pages[1].canonical_url, "https://example.com/page/3.html");
    }

    // =========================================================================
    // SiteUrls
    // =========================================================================

    #[test]
    fn article_urls() {
        let u = urls("");
        let nested = ArticleBuilder::new("x").slug("hola").build();
        let top = ArticleBuilder::new("x").slug("about").top_level().build();
        let ext = ArticleBuilder::new("x")
            .slug("ext")
            .external("https://other.site/post")
            .build();

        assert_eq!(u.article_path(&nested), "/articles/hola");
        assert_eq!(u.article_file(&nested), "articles/hola.html");
        assert_eq!(u.article_url(&nested), "https://example.com/articles/hola");
        assert_eq!(u.article_path(&top), "/about");
        assert_eq!(u.article_file(&top), "about.html");
        assert_eq!(u.article_href(&ext), "https://other.site/post");
        assert_eq!(u.article_url(&ext), "https://other.site/post");
        assert_eq!(urls(".html").article_path(&nested), "/articles/hola.html");
        assert_eq!(SiteUrls::page_file(2), "page/2.html");
    }
}
