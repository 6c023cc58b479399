//! Sitemap, RSS feed, robots.txt, structured data and the analytics CSP hash.
//!
//! All functions here are pure: they take the final article list and return
//! strings or JSON values. Dates that would otherwise come from the clock
//! (`lastmod` of listing pages, `lastBuildDate`) are parameters.
//!
//! ## Inclusion rules
//!
//! | Artifact | Listing pages | Nested | Top-level | External link |
//! |---|---|---|---|---|
//! | `sitemap.xml` | yes | yes | yes | no |
//! | `rss.xml` | no | yes (newest `limit`) | no | no |
//! | JSON-LD `blogPost` | – | listed ones | – | listed ones (their URL) |

use crate::articles::Article;
use crate::config::SiteInfo;
use crate::date::DateTimeUtc;
use crate::paginate::SiteUrls;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rss::extension::dublincore::{self, DublinCoreExtension};
use rss::validation::Validate;
use rss::{ChannelBuilder, GuidBuilder, ItemBuilder};
use serde::Serialize;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("RSS validation failed: {0}")]
    Validation(String),
}

// =============================================================================
// Sitemap
// =============================================================================

/// `sitemap.xml`: root, every numbered page, and every internal article.
///
/// The root and pages use `today` as `lastmod`; articles use their own date.
pub fn sitemap_xml(
    articles: &[Article],
    total_pages: usize,
    urls: &SiteUrls,
    today: DateTimeUtc,
) -> String {
    let today = today.date_iso();
    let mut entries = vec![(urls.absolute("/"), today.clone())];
    entries.extend((2..=total_pages).map(|n| (urls.absolute(&urls.page_path(n)), today.clone())));
    entries.extend(
        articles
            .iter()
            .filter(|a| !a.is_external())
            .map(|a| (urls.article_url(a), a.date.date_iso())),
    );

    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for (loc, lastmod) in entries {
        let _ = writeln!(
            xml,
            "<url><loc>{}</loc><lastmod>{}</lastmod></url>",
            escape_xml(&loc),
            lastmod
        );
    }
    xml.push_str("</urlset>\n");
    xml
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

// =============================================================================
// RSS
// =============================================================================

/// Articles that belong in the feed, newest first, at most `limit`.
pub fn feed_articles(articles: &[Article], limit: usize) -> Vec<&Article> {
    let mut items: Vec<&Article> = articles
        .iter()
        .filter(|a| !a.is_external() && !a.is_top_level)
        .collect();
    items.sort_by(|a, b| b.date.cmp(&a.date));
    items.truncate(limit);
    items
}

/// RSS 2.0 feed with Dublin Core creators.
pub fn rss_xml(
    articles: &[Article],
    site: &SiteInfo,
    urls: &SiteUrls,
    limit: usize,
    now: DateTimeUtc,
) -> Result<String, FeedError> {
    let items: Vec<rss::Item> = feed_articles(articles, limit)
        .into_iter()
        .map(|a| article_to_rss_item(a, urls))
        .collect();

    let namespaces = BTreeMap::from([("dc".to_string(), dublincore::NAMESPACE.to_string())]);

    let channel = ChannelBuilder::default()
        .title(&site.title)
        .link(urls.absolute("/"))
        .description(&site.description)
        .language(Some(site.locale.clone()))
        .last_build_date(Some(now.to_rfc2822()))
        .generator(Some(format!("quire {}", env!("CARGO_PKG_VERSION"))))
        .namespaces(namespaces)
        .items(items)
        .build();

    channel
        .validate()
        .map_err(|e| FeedError::Validation(e.to_string()))?;
    Ok(channel.to_string())
}

fn article_to_rss_item(article: &Article, urls: &SiteUrls) -> rss::Item {
    let link = urls.article_url(article);
    let mut item = ItemBuilder::default()
        .title(Some(article.title.clone()))
        .link(Some(link.clone()))
        .guid(Some(GuidBuilder::default().permalink(true).value(link).build()))
        .description(article.description.clone())
        .pub_date(Some(article.date.to_rfc2822()))
        .build();

    if let Some(author) = &article.author {
        let mut dc = DublinCoreExtension::default();
        dc.set_creators(vec![author.clone()]);
        item.set_dublin_core_ext(dc);
    }
    item
}

// =============================================================================
// robots.txt
// =============================================================================

/// Allow everything and advertise the sitemap and feed.
pub fn robots_txt(urls: &SiteUrls) -> String {
    format!(
        "User-agent: *\nAllow: /\nSitemap: {}\nSitemap: {}\n",
        urls.absolute("/sitemap.xml"),
        urls.absolute("/rss.xml")
    )
}

// =============================================================================
// JSON-LD
// =============================================================================

/// `WebSite` + `Blog` graph for a listing page.
pub fn listing_jsonld(site: &SiteInfo, urls: &SiteUrls, listed: &[&Article]) -> Value {
    let home = urls.absolute("/");
    let posts: Vec<Value> = listed
        .iter()
        .map(|a| json!({ "@id": urls.article_url(a) }))
        .collect();
    json!([
        {
            "@context": "https://schema.org",
            "@type": "WebSite",
            "@id": home,
            "name": site.title,
            "url": home,
        },
        {
            "@context": "https://schema.org",
            "@type": "Blog",
            "name": site.title,
            "url": home,
            "description": site.description,
            "blogPost": posts,
        }
    ])
}

/// `BlogPosting` for an article page.
pub fn article_jsonld(
    article: &Article,
    site: &SiteInfo,
    urls: &SiteUrls,
    image_url: Option<&str>,
) -> Value {
    let author = match &article.author {
        Some(name) => {
            let mut person = json!({ "@type": "Person", "name": name });
            if let Some(link) = &article.author_link {
                person["url"] = json!(link);
            }
            person
        }
        None => json!({ "@type": "Organization", "name": site.title }),
    };
    let date = article.date.to_rfc3339();

    let mut posting = json!({
        "@context": "https://schema.org",
        "@type": "BlogPosting",
        "headline": article.title,
        "description": article.description.as_deref().unwrap_or(&article.title),
        "datePublished": date,
        "dateModified": date,
        "wordCount": article.word_count,
        "author": author,
        "publisher": {
            "@type": "Organization",
            "name": site.title,
            "logo": { "@type": "ImageObject", "url": urls.absolute("/favicon.png") },
        },
        "mainEntityOfPage": { "@type": "WebPage", "@id": urls.article_url(article) },
    });
    if let Some(url) = image_url {
        posting["image"] = json!(url);
    }
    posting
}

/// Serialize JSON-LD for inlining inside `<script>`.
///
/// `</` is escaped so article text can never close the script element.
pub fn jsonld_script_body(value: &Value) -> String {
    value.to_string().replace("</", "<\\/")
}

// =============================================================================
// CSP
// =============================================================================

/// Contents of `csp.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyticsCsp {
    /// `'sha256-…'` source expression for the inline snippet.
    #[serde(rename = "ga-snippet")]
    pub snippet_hash: String,
    /// Full `Content-Security-Policy` header value.
    #[serde(rename = "content-security-policy")]
    pub header: String,
}

/// Hash the first inline `<script>` that calls `gtag(`.
///
/// The body is trimmed before hashing, matching how the snippet is emitted.
/// Returns `None` when no such script exists.
pub fn analytics_csp(html: &str) -> Option<AnalyticsCsp> {
    let snippet = inline_scripts(html).find(|body| body.contains("gtag("))?;
    let digest = Sha256::digest(snippet.as_bytes());
    let hash = format!("'sha256-{}'", BASE64.encode(digest));

    let header = [
        "default-src 'self';".to_string(),
        format!(
            "script-src 'self' https://www.googletagmanager.com https://www.google-analytics.com {hash};"
        ),
        "connect-src 'self' https://*.google-analytics.com;".to_string(),
        "img-src 'self' https://www.google-analytics.com data:;".to_string(),
        "style-src 'self' 'unsafe-inline';".to_string(),
        "object-src 'none'; frame-ancestors 'none'; base-uri 'self';".to_string(),
    ]
    .join(" ");

    Some(AnalyticsCsp {
        snippet_hash: hash,
        header,
    })
}

/// Trimmed bodies of every `<script …>…</script>` element.
fn inline_scripts(html: &str) -> impl Iterator<Item = &str> {
    let mut rest = html;
    std::iter::from_fn(move || {
        let open = rest.find("<script")?;
        let after_open = &rest[open..];
        let tag_end = after_open.find('>')? + 1;
        let body_start = &after_open[tag_end..];
        let close = body_start.find("</script>")?;
        let body = body_start[..close].trim();
        rest = &body_start[close + "</script>".len()..];
        Some(body)
    })
}
