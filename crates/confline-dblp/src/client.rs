//! dblp page fetching

use confline_core::{ApiClient, HttpRequest, RetryPolicy, SharedTransport};

use crate::filter::{SectionFilter, SlugTable};
use crate::parser::{DblpArticle, YearPage, parse_publications, parse_year_links};

pub const DEFAULT_BASE_URL: &str = "https://dblp.org";

/// Fetches conference index and year pages through the retrying client
#[derive(Debug, Clone)]
pub struct DblpClient {
    api: ApiClient,
    sections: SectionFilter,
    slugs: SlugTable,
}

impl DblpClient {
    pub fn new(
        base_url: &str,
        transport: SharedTransport,
        policy: RetryPolicy,
        sections: SectionFilter,
        slugs: SlugTable,
    ) -> Self {
        Self {
            api: ApiClient::new("dblp", base_url, transport, policy),
            sections,
            slugs,
        }
    }

    /// `{base}/db/conf/{conference}/`
    pub fn index_url(&self, conference: &str) -> String {
        format!("{}/", self.api.url(&format!("db/conf/{conference}")))
    }

    /// Year pages of `conference` within `[first, last]`; empty if the index
    /// page cannot be fetched
    pub fn year_pages(&self, conference: &str, first: i64, last: i64) -> Vec<YearPage> {
        let index_url = self.index_url(conference);
        let pattern = match self.slugs.year_link_regex(self.api.base_url(), conference) {
            Ok(re) => re,
            Err(e) => {
                log::error!("dblp: invalid year link pattern for {conference}: {e}");
                return Vec::new();
            }
        };
        let Some(resp) = self
            .api
            .request(HttpRequest::get(&index_url), conference)
            .into_success()
        else {
            return Vec::new();
        };

        let pages = parse_year_links(&resp.body, &index_url, &pattern, first, last);
        log::info!(
            "dblp: {conference}: {} year pages in {first}..={last}",
            pages.len()
        );
        pages
    }

    /// Main track articles of one year page; empty if the page cannot be fetched
    pub fn articles(&self, page: &YearPage) -> Vec<DblpArticle> {
        let Some(resp) = self
            .api
            .request(HttpRequest::get(&page.url), &page.url)
            .into_success()
        else {
            return Vec::new();
        };
        let articles = parse_publications(&resp.body, &self.sections);
        log::debug!("dblp: {} articles on {}", articles.len(), page.url);
        articles
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use confline_core::mock::MockTransport;

    use super::*;

    fn client(mock: &Arc<MockTransport>) -> DblpClient {
        DblpClient::new(
            "https://dblp.org/",
            mock.clone(),
            RetryPolicy::immediate(0),
            SectionFilter::default(),
            SlugTable::default(),
        )
    }

    #[test]
    fn index_url_shape() {
        let mock = Arc::new(MockTransport::new());
        assert_eq!(
            client(&mock).index_url("icse"),
            "https://dblp.org/db/conf/icse/"
        );
    }

    #[test]
    fn year_pages_use_slug_override() {
        let mock = Arc::new(MockTransport::new());
        mock.on_get(
            "https://dblp.org/db/conf/cloud/",
            200,
            r#"<a href="https://dblp.org/db/conf/cloud/socc2018.html">x</a>
               <a href="https://dblp.org/db/conf/cloud/socc2019.html">y</a>"#,
        );
        let pages = client(&mock).year_pages("cloud", 2019, 2020);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].year, 2019);
    }

    #[test]
    fn failed_index_is_empty() {
        let mock = Arc::new(MockTransport::new());
        mock.on_get("https://dblp.org/db/conf/icse/", 500, "");
        assert!(client(&mock).year_pages("icse", 2019, 2020).is_empty());
    }

    #[test]
    fn failed_year_page_is_empty() {
        let mock = Arc::new(MockTransport::new());
        let page = YearPage {
            year: 2020,
            url: "https://dblp.org/db/conf/icse/icse2020.html".into(),
        };
        assert!(client(&mock).articles(&page).is_empty());
        assert_eq!(mock.hits(&page.url), 1);
    }
}
