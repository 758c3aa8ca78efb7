//! Per-run parameters shared by the stages

use std::time::Duration;

use anyhow::ensure;

/// Conferences, year range and parallelism of one stage invocation
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub conferences: Vec<String>,
    pub first_year: i64,
    pub last_year: i64,
    /// Year-partition workers per conference
    pub workers: usize,
    /// Workers for the citations batch phase
    pub batch_workers: usize,
}

impl RunConfig {
    pub fn new(conferences: Vec<String>, first_year: i64, last_year: i64, workers: usize) -> Self {
        Self {
            conferences,
            first_year,
            last_year,
            workers,
            batch_workers: 1,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(!self.conferences.is_empty(), "at least one conference is required");
        ensure!(
            self.first_year <= self.last_year,
            "first year {} is after last year {}",
            self.first_year,
            self.last_year
        );
        ensure!(self.workers >= 1, "workers must be at least 1");
        ensure!(self.batch_workers >= 1, "batch workers must be at least 1");
        Ok(())
    }

    /// Year keys of the range, in order
    pub fn year_keys(&self) -> impl Iterator<Item = String> {
        (self.first_year..=self.last_year).map(|y| y.to_string())
    }
}

/// Fixed pauses around external calls
#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    /// After each Semantic Scholar single-paper or search call
    pub s2_request: Duration,
    /// After each citing paper's batch calls
    pub s2_batch: Duration,
    /// After each cited paper resolved outside the corpus
    pub cited_paper: Duration,
}

impl Default for Throttle {
    fn default() -> Self {
        Self {
            s2_request: Duration::from_millis(1000),
            s2_batch: Duration::from_millis(750),
            cited_paper: Duration::from_millis(500),
        }
    }
}

impl Throttle {
    /// No pauses (tests)
    pub const fn none() -> Self {
        Self {
            s2_request: Duration::ZERO,
            s2_batch: Duration::ZERO,
            cited_paper: Duration::ZERO,
        }
    }

    pub fn pause(delay: Duration) {
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}
