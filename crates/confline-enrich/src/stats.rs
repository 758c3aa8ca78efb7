//! Per-conference stage summaries

use std::time::Duration;

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use confline_core::progress::fmt_num;
use confline_store::StageName;

/// Outcome of one stage pass over one conference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConferenceSummary {
    pub conference: String,
    /// Year keys written
    pub years: usize,
    /// Records written (papers, or citing papers for citations)
    pub records: usize,
    /// Records with external data attached (OpenAlex link / S2 ID / cited papers)
    pub resolved: usize,
    pub elapsed: Duration,
}

impl ConferenceSummary {
    pub fn log(&self, stage: StageName) {
        log::info!(
            "({stage}) {}: {} years, {} records, {} resolved [{:.1}s]",
            self.conference,
            self.years,
            fmt_num(self.records),
            fmt_num(self.resolved),
            self.elapsed.as_secs_f64()
        );
    }
}

/// All conferences of one stage invocation
#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: StageName,
    pub conferences: Vec<ConferenceSummary>,
    pub elapsed: Duration,
}

impl StageReport {
    pub fn new(stage: StageName) -> Self {
        Self {
            stage,
            conferences: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn minutes(&self) -> f64 {
        self.elapsed.as_secs_f64() / 60.0
    }

    pub fn total_records(&self) -> usize {
        self.conferences.iter().map(|c| c.records).sum()
    }

    /// "(base) - done in 1.234 minutes"
    pub fn done_line(&self) -> String {
        format!("({}) - done in {:.3} minutes", self.stage, self.minutes())
    }

    /// Format summary table as a string.
    pub fn format_table(&self) -> String {
        let resolved_label = match self.stage {
            StageName::Base => "With OpenAlex",
            StageName::Extended => "With S2 ID",
            StageName::CitationBatches | StageName::Citations => "With citations",
        };
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![
                Cell::new(format!("{}", self.stage))
                    .fg(Color::Cyan)
                    .add_attribute(comfy_table::Attribute::Bold),
                Cell::new("Years").fg(Color::Cyan),
                Cell::new("Records").fg(Color::Cyan),
                Cell::new(resolved_label).fg(Color::Cyan),
                Cell::new("Time").fg(Color::Cyan),
            ]);

        for c in &self.conferences {
            table.add_row(vec![
                Cell::new(&c.conference),
                Cell::new(c.years),
                Cell::new(fmt_num(c.records)),
                Cell::new(fmt_num(c.resolved)),
                Cell::new(format!("{:.1}s", c.elapsed.as_secs_f64())),
            ]);
        }
        table.to_string()
    }

    /// Log every conference (non-TTY mode).
    pub fn log(&self) {
        for c in &self.conferences {
            c.log(self.stage);
        }
        log::info!("{}", self.done_line());
    }
}
