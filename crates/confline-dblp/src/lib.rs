//! confline-dblp - conference listings from dblp
//!
//! Finds a conference's per-year proceedings pages and extracts the main
//! track articles (title, year, authors, OpenAlex link) from them.

pub mod client;
pub mod filter;
pub mod parser;

pub use client::{DEFAULT_BASE_URL, DblpClient};
pub use filter::{DEFAULT_SKIP_SECTIONS, SectionFilter, SlugTable, is_excluded_title};
pub use parser::{DblpArticle, YearPage, parse_publications, parse_year_links};
