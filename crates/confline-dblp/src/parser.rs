//! HTML extraction for dblp index and year pages

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::filter::{SectionFilter, is_excluded_title};

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid CSS selector")
}

static LINK: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));
static HEADER_OR_LIST: LazyLock<Selector> = LazyLock::new(|| selector("h2, ul.publ-list"));
static ARTICLE: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"li[itemtype="http://schema.org/ScholarlyArticle"]"#));
static TITLE: LazyLock<Selector> = LazyLock::new(|| selector(r#"span.title[itemprop="name"]"#));
static DATE_SPAN: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"span[itemprop="datePublished"]"#));
static DATE_META: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"meta[itemprop="datePublished"]"#));
static AUTHOR: LazyLock<Selector> = LazyLock::new(|| selector(r#"span[itemprop="author"]"#));
static NAV_LINK: LazyLock<Selector> = LazyLock::new(|| selector(".publ a[href]"));

/// A proceedings page for one year
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearPage {
    pub year: i64,
    pub url: String,
}

/// One article entry of a year page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DblpArticle {
    pub title: String,
    /// As reported by the entry (may differ from the page's year)
    pub year: String,
    pub authors: Vec<String>,
    pub openalex_link: Option<String>,
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>()
}

/// Year pages linked from a conference index page.
///
/// Keeps hrefs containing `index_url` that match `pattern` (year in capture
/// group 1) with the year in `[first, last]`. Sorted by year, deduplicated.
pub fn parse_year_links(
    html: &str,
    index_url: &str,
    pattern: &Regex,
    first: i64,
    last: i64,
) -> Vec<YearPage> {
    let doc = Html::parse_document(html);
    let mut pages = BTreeSet::new();

    for el in doc.select(&LINK) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        if !href.contains(index_url) {
            continue;
        }
        let Some(year) = pattern
            .captures(href)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<i64>().ok())
        else {
            continue;
        };
        if (first..=last).contains(&year) {
            pages.insert((year, href.to_string()));
        }
    }

    pages
        .into_iter()
        .map(|(year, url)| YearPage { year, url })
        .collect()
}

/// Main track articles of a year page, in document order.
///
/// A `ul.publ-list` is skipped when the nearest preceding `h2` matches the
/// section filter. Entries without a title or year are dropped.
pub fn parse_publications(html: &str, filter: &SectionFilter) -> Vec<DblpArticle> {
    let doc = Html::parse_document(html);
    let mut header = String::new();
    let mut articles = Vec::new();

    for el in doc.select(&HEADER_OR_LIST) {
        if el.value().name() == "h2" {
            header = text_of(el);
            continue;
        }
        if filter.skips(&header) {
            log::debug!("skipping section {:?}", header.trim());
            continue;
        }
        for item in el.select(&ARTICLE) {
            if let Some(article) = parse_article(item) {
                articles.push(article);
            }
        }
    }
    articles
}

fn parse_article(item: ElementRef<'_>) -> Option<DblpArticle> {
    let Some(title) = item.select(&TITLE).next().map(text_of) else {
        log::debug!("dblp entry without title");
        return None;
    };
    if is_excluded_title(&title) {
        return None;
    }

    let year = item
        .select(&DATE_SPAN)
        .last()
        .map(text_of)
        .or_else(|| {
            item.select(&DATE_META)
                .next()
                .and_then(|m| m.value().attr("content"))
                .map(str::to_string)
        });
    let Some(year) = year.map(|y| y.trim().to_string()).filter(|y| !y.is_empty()) else {
        log::warn!("dblp entry without year: {title}");
        return None;
    };

    let authors = item.select(&AUTHOR).map(text_of).collect();
    let openalex_link = item
        .select(&NAV_LINK)
        .filter_map(|a| a.value().attr("href"))
        .find(|href| href.contains("openalex"))
        .map(str::to_string);

    Some(DblpArticle {
        title,
        year,
        authors,
        openalex_link,
    })
}
