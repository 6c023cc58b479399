//! HTML rendering with maud.
//!
//! Every page shares [`base_document`]: the head carries the SEO tags
//! (canonical, Open Graph, Twitter), the feed link, pagination links, the
//! JSON-LD block and, when configured, the Google tag snippet. Stylesheets,
//! scripts and images are referenced by their source path and resolved
//! through the [`AssetMap`], so pages always point at content-hashed files.
//!
//! ## Page types
//!
//! | Renderer | Output | Listing layout |
//! |---|---|---|
//! | [`render_landing`] | `index.html` | first item featured |
//! | [`render_listing_page`] | `page/{n}.html` | regular items |
//! | [`render_article`] | article page | – |
//!
//! The class names (`landing-list`, `landing-item`, `load-more`,
//! `load-more-link`) are what the client-side "load more" script looks for.

use crate::articles::Article;
use crate::assets::{AssetMap, VariantIndex};
use crate::config::{ImagesConfig, SiteInfo};
use crate::paginate::{Page, Pagination, SiteUrls};
use crate::seo;
use crate::site::Warning;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use serde_json::Value;

/// Everything a renderer needs besides the page's own data.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub site: &'a SiteInfo,
    pub images: &'a ImagesConfig,
    pub urls: &'a SiteUrls,
    pub assets: &'a AssetMap,
    pub variants: &'a VariantIndex,
}

impl RenderContext<'_> {
    /// Root-relative URL of a hashed asset, or the unhashed path when the
    /// asset is not in the map.
    fn asset_url(&self, rel: &str) -> String {
        let resolved = self
            .assets
            .get(rel)
            .and_then(|out| out.single())
            .unwrap_or(rel);
        format!("/{}", resolved)
    }

    /// Root-relative URL of one image variant.
    fn variant_url(&self, rel: &str, label: &str) -> Option<String> {
        self.assets
            .get(rel)
            .and_then(|out| out.variant(label))
            .map(|p| format!("/{}", p))
    }

    /// `srcset` over every derived variant, in config order.
    ///
    /// Widths are the ones actually encoded. Variants capped to the same
    /// width by the no-upscale rule appear once.
    fn srcset(&self, rel: &str) -> Option<String> {
        let derived = self.variants.get(rel)?;
        let mut seen = Vec::new();
        let mut entries = Vec::new();
        for spec in &self.images.variants {
            let Some(info) = derived.iter().find(|i| i.label == spec.label) else {
                continue;
            };
            if seen.contains(&info.width) {
                continue;
            }
            seen.push(info.width);
            entries.push(format!("/{} {}w", info.path, info.width));
        }
        (!entries.is_empty()).then(|| entries.join(", "))
    }

    /// Absolute URL of an article's hero image, for `og:image` and JSON-LD.
    pub fn article_image_url(&self, article: &Article) -> Option<String> {
        let rel = article.image.as_deref()?;
        let path = self.variant_url(rel, &self.images.article_variant)?;
        Some(self.urls.absolute(&path))
    }
}

/// Asset references that the asset map cannot resolve.
///
/// Covers configured stylesheets and scripts and every article image. Each
/// missing path is reported once.
pub fn unresolved_assets(ctx: &RenderContext, articles: &[Article]) -> Vec<Warning> {
    let mut missing: Vec<String> = Vec::new();
    let mut check = |rel: &str, found: bool| {
        if !found && !missing.iter().any(|m| m == rel) {
            missing.push(rel.to_string());
        }
    };
    for rel in ctx.site.stylesheets.iter().chain(&ctx.site.scripts) {
        check(rel, ctx.assets.get(rel).and_then(|o| o.single()).is_some());
    }
    for rel in articles.iter().filter_map(|a| a.image.as_deref()) {
        let found = ctx
            .assets
            .get(rel)
            .and_then(|o| o.variant(&ctx.images.article_variant))
            .is_some();
        check(rel, found);
    }
    missing.into_iter().map(Warning::UnresolvedAsset).collect()
}

/// The Google tag bootstrap, inlined verbatim.
pub fn analytics_snippet(tag_id: &str) -> String {
    format!(
        "window.dataLayer = window.dataLayer || [];\
         function gtag(){{dataLayer.push(arguments);}}\
         gtag('js', new Date());\
         gtag('config', '{}');",
        tag_id
    )
}

// ============================================================================
// HTML Components
// ============================================================================

/// Per-page head metadata.
#[derive(Debug, Clone)]
pub struct HeadMeta {
    pub title: String,
    pub description: String,
    pub canonical: String,
    /// `website` for listings, `article` for article pages.
    pub og_type: &'static str,
    /// Absolute image URL for `og:image` / `twitter:image`.
    pub image: Option<String>,
    pub prev: Option<String>,
    pub next: Option<String>,
    pub jsonld: Value,
}

/// Renders the base HTML document structure
pub fn base_document(ctx: &RenderContext, head: &HeadMeta, content: Markup) -> Markup {
    let site = ctx.site;
    let twitter_card = if head.image.is_some() {
        "summary_large_image"
    } else {
        "summary"
    };
    html! {
        (DOCTYPE)
        html lang=(site.language()) {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (head.title) }
                meta name="description" content=(head.description);
                link rel="canonical" href=(head.canonical);

                meta property="og:type" content=(head.og_type);
                meta property="og:site_name" content=(site.title);
                meta property="og:title" content=(head.title);
                meta property="og:description" content=(head.description);
                meta property="og:url" content=(head.canonical);
                @if let Some(image) = &head.image {
                    meta property="og:image" content=(image);
                }
                meta name="twitter:card" content=(twitter_card);
                meta name="twitter:title" content=(head.title);
                meta name="twitter:description" content=(head.description);
                @if let Some(image) = &head.image {
                    meta name="twitter:image" content=(image);
                }

                link rel="alternate" type="application/rss+xml" title=(site.title) href="/rss.xml";
                link rel="icon" href="/favicon.ico";
                @if let Some(prev) = &head.prev {
                    link rel="prev" href=(prev);
                }
                @if let Some(next) = &head.next {
                    link rel="next" href=(next);
                }
                @for css in &site.stylesheets {
                    link rel="stylesheet" href=(ctx.asset_url(css));
                }
                @for js in &site.scripts {
                    script src=(ctx.asset_url(js)) defer {}
                }
                script type="application/ld+json" { (PreEscaped(seo::jsonld_script_body(&head.jsonld))) }
                @if let Some(id) = &site.google_tag_id {
                    script async src={ "https://www.googletagmanager.com/gtag/js?id=" (id) } {}
                    script { (PreEscaped(analytics_snippet(id))) }
                }
            }
            body {
                header.site-header {
                    a.site-title href="/" { (site.title) }
                }
                main { (content) }
            }
        }
    }
}

fn byline_date(ctx: &RenderContext, article: &Article) -> Markup {
    html! {
        p.date {
            time datetime=(article.date.date_iso()) {
                (article.date.format_display(ctx.site.language()))
            }
        }
    }
}

/// Renders one listing entry; the featured layout puts the text first.
fn listing_item(ctx: &RenderContext, article: &Article, featured: bool) -> Markup {
    let href = ctx.urls.article_href(article);
    let external = article.is_external();
    let thumb = article
        .image
        .as_deref()
        .and_then(|rel| ctx.variant_url(rel, &ctx.images.listing_variant));

    let image = html! {
        @if let Some(src) = &thumb {
            @if featured {
                img.landing-thumb-featured src=(src) alt=(article.title) fetchpriority="high" decoding="async";
            } @else {
                img.landing-thumb src=(src) alt=(article.title) loading="lazy" decoding="async";
            }
        }
    };
    let author = html! {
        @if let Some(author) = &article.author {
            p.article-author { (author) }
        }
    };

    html! {
        @if featured {
            li.landing-item-featured {
                a.landing-link-featured href=(href)
                    target=[external.then_some("_blank")]
                    rel=[external.then_some("noopener noreferrer")] {
                    div.landing-item-text-featured {
                        p.landing-title-featured { (article.title) }
                        div.landing-item-meta-featured {
                            (author)
                            (byline_date(ctx, article))
                        }
                    }
                    (image)
                }
            }
        } @else {
            li.landing-item {
                a.landing-link href=(href)
                    target=[external.then_some("_blank")]
                    rel=[external.then_some("noopener noreferrer")] {
                    (image)
                    div.landing-item-text {
                        p.landing-title { (article.title) }
                        div.landing-item-meta {
                            (byline_date(ctx, article))
                            (author)
                        }
                    }
                }
            }
        }
    }
}

/// Renders an article list plus the "load more" link.
pub fn render_listing(
    ctx: &RenderContext,
    articles: &[&Article],
    featured_first: bool,
    next_url: Option<&str>,
) -> Markup {
    html! {
        ul.landing-list {
            @for (i, article) in articles.iter().enumerate() {
                (listing_item(ctx, article, featured_first && i == 0))
            }
        }
        @if let Some(next) = next_url {
            div.load-more {
                a.load-more-link href=(next) { (ctx.site.load_more_label) }
                noscript { a href=(next) { (ctx.site.load_more_label) } }
            }
        }
    }
}

// ============================================================================
// Page Renderers
// ============================================================================

/// Renders `index.html`.
pub fn render_landing(ctx: &RenderContext, pagination: &Pagination) -> Markup {
    let head = HeadMeta {
        title: ctx.site.title.clone(),
        description: ctx.site.description.clone(),
        canonical: ctx.urls.absolute("/"),
        og_type: "website",
        image: None,
        prev: None,
        next: pagination.landing_next.clone(),
        jsonld: seo::listing_jsonld(ctx.site, ctx.urls, &pagination.landing),
    };
    let content = render_listing(
        ctx,
        &pagination.landing,
        true,
        pagination.landing_next.as_deref(),
    );
    base_document(ctx, &head, content)
}

/// Renders `page/{n}.html`.
pub fn render_listing_page(ctx: &RenderContext, page: &Page) -> Markup {
    let head = HeadMeta {
        title: ctx.site.title.clone(),
        description: ctx.site.description.clone(),
        canonical: page.canonical_url.clone(),
        og_type: "website",
        image: None,
        prev: Some(page.prev_url.clone()),
        next: page.next_url.clone(),
        jsonld: seo::listing_jsonld(ctx.site, ctx.urls, &page.articles),
    };
    let content = render_listing(ctx, &page.articles, false, page.next_url.as_deref());
    base_document(ctx, &head, content)
}

/// Renders an internal article page.
pub fn render_article(ctx: &RenderContext, article: &Article) -> Markup {
    let image_url = ctx.article_image_url(article);
    let head = HeadMeta {
        title: article.title.clone(),
        description: article
            .description
            .clone()
            .unwrap_or_else(|| article.title.clone()),
        canonical: ctx.urls.article_url(article),
        og_type: "article",
        image: image_url.clone(),
        prev: None,
        next: None,
        jsonld: seo::article_jsonld(article, ctx.site, ctx.urls, image_url.as_deref()),
    };

    let hero = article.image.as_deref().and_then(|rel| {
        let src = ctx.variant_url(rel, &ctx.images.article_variant)?;
        Some((src, ctx.srcset(rel)))
    });

    let content = html! {
        article.article {
            h1.article-title { (article.title) }
            @if let Some(author) = &article.author {
                div.article-sub {
                    (byline_date(ctx, article))
                    p.article-author {
                        @if let Some(link) = &article.author_link {
                            a href=(link) target="_blank" rel="noopener noreferrer" { (author) }
                            svg.author-link-icon width="14" height="14" viewBox="0 0 24 24"
                                fill="none" stroke="currentColor" stroke-width="2" {
                                path d="M7 17L17 7M17 7H7M17 7V17" {}
                            }
                        } @else {
                            (author)
                        }
                    }
                }
            } @else {
                div.article-sub { (byline_date(ctx, article)) }
            }
            @if let Some((src, srcset)) = &hero {
                img.article-image src=(src) srcset=[srcset.as_deref()] sizes="100vw"
                    alt=(article.title) fetchpriority="high";
            }
            div.article-content { (PreEscaped(&article.content)) }
        }
    };
    base_document(ctx, &head, content)
}
