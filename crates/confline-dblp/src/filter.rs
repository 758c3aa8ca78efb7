//! Section, title and link filters for dblp pages

use std::sync::LazyLock;

use regex::Regex;
use rustc_hash::FxHashMap;

/// Section headers (lower-case substrings) whose articles are not main track
pub const DEFAULT_SKIP_SECTIONS: &[&str] = &[
    "workshop",
    "tutorial",
    "keynote",
    "panel",
    "poster",
    "demo",
    "doctoral",
    "posters",
    "short papers",
    "demos",
];

static EXCLUDED_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(Demo:|Poster:|Welcome Message)").expect("valid title regex")
});

/// Demo, poster and welcome-message entries (case-sensitive prefix)
pub fn is_excluded_title(title: &str) -> bool {
    EXCLUDED_TITLE.is_match(title)
}

/// Case-insensitive substring match of section headers
#[derive(Debug, Clone)]
pub struct SectionFilter {
    terms: Vec<String>,
}

impl Default for SectionFilter {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl SectionFilter {
    /// Default vocabulary plus `extra` terms
    pub fn new(extra: &[String]) -> Self {
        let terms = DEFAULT_SKIP_SECTIONS
            .iter()
            .map(|s| s.to_string())
            .chain(extra.iter().map(|s| s.trim().to_lowercase()))
            .filter(|s| !s.is_empty())
            .collect();
        Self { terms }
    }

    /// True if articles under `header` should be skipped
    pub fn skips(&self, header: &str) -> bool {
        let header = header.to_lowercase().replace('\n', "");
        self.terms.iter().any(|t| header.contains(t.as_str()))
    }
}

/// Conference name → slug used in year-page file names
#[derive(Debug, Clone)]
pub struct SlugTable {
    overrides: FxHashMap<String, String>,
}

impl Default for SlugTable {
    fn default() -> Self {
        let mut overrides = FxHashMap::default();
        overrides.insert("cloud".to_string(), "socc".to_string());
        Self { overrides }
    }
}

impl SlugTable {
    /// Defaults extended (or replaced per key) by `extra`
    pub fn with_overrides<'a>(extra: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        let mut table = Self::default();
        for (conf, slug) in extra {
            table.overrides.insert(conf.clone(), slug.clone());
        }
        table
    }

    pub fn slug<'a>(&'a self, conference: &'a str) -> &'a str {
        self.overrides
            .get(conference)
            .map_or(conference, String::as_str)
    }

    /// `^{base}/db/conf/{conf}/{slug}(\d{4})\.html`, year captured
    pub fn year_link_regex(&self, base_url: &str, conference: &str) -> Result<Regex, regex::Error> {
        let base = base_url.trim_end_matches('/');
        Regex::new(&format!(
            r"^{}/db/conf/{}/{}(\d{{4}})\.html",
            regex::escape(base),
            regex::escape(conference),
            regex::escape(self.slug(conference)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_vocabulary() {
        let f = SectionFilter::default();
        assert!(f.skips("Workshop Papers"));
        assert!(f.skips("Doctoral Symposium"));
        assert!(f.skips("SHORT PAPERS\n"));
        assert!(f.skips("Tool Demos"));
        assert!(!f.skips("Research Track"));
        assert!(!f.skips(""));
    }

    #[test]
    fn extra_sections() {
        let f = SectionFilter::new(&["Industry Track".to_string(), " ".to_string()]);
        assert!(f.skips("Software Engineering in Practice / industry track"));
        assert!(!f.skips("Technical Papers"));
    }

    #[test]
    fn excluded_titles_are_anchored() {
        assert!(is_excluded_title("Demo: A Tool."));
        assert!(is_excluded_title("Poster: Early Results."));
        assert!(is_excluded_title("Welcome Message from the Chairs."));
        assert!(!is_excluded_title("A Demo: Of Something."));
        assert!(!is_excluded_title("demo: lower case."));
    }

    #[test]
    fn slug_overrides() {
        let slugs = SlugTable::default();
        assert_eq!(slugs.slug("cloud"), "socc");
        assert_eq!(slugs.slug("icse"), "icse");

        let extra: FxHashMap<String, String> =
            [("middleware".to_string(), "mw".to_string())].into_iter().collect();
        let slugs = SlugTable::with_overrides(&extra);
        assert_eq!(slugs.slug("middleware"), "mw");
        assert_eq!(slugs.slug("cloud"), "socc");
    }

    #[test]
    fn year_link_pattern() {
        let slugs = SlugTable::default();
        let re = slugs.year_link_regex("https://dblp.org/", "cloud").unwrap();
        let caps = re
            .captures("https://dblp.org/db/conf/cloud/socc2019.html")
            .unwrap();
        assert_eq!(&caps[1], "2019");
        assert!(!re.is_match("https://dblp.org/db/conf/cloud/cloud2019.html"));
        assert!(!re.is_match("https://dblp.org/db/conf/cloud/socc2019-1.html"));
        assert!(!re.is_match("https://dblpxorg/db/conf/cloud/socc2019.html"));
    }
}
