//! Disposition Summary Module
//!
//! Tallies the message counts of a decoded aggregate report by the disposition
//! the receiver applied.

use crate::models::Report;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispositionSummary {
    /// Messages with disposition `none`.
    pub pass: u64,
    pub quarantine: u64,
    pub reject: u64,
    /// Messages with a disposition outside the three DMARC policies.
    pub other: u64,
}

impl DispositionSummary {
    pub fn from_report(report: &Report) -> Self {
        let mut summary = DispositionSummary::default();
        for record in &report.records {
            let count = u64::from(record.row.count);
            let disposition = record.row.policy_evaluated.disposition.as_str();
            if disposition.eq_ignore_ascii_case("none") {
                summary.pass += count;
            } else if disposition.eq_ignore_ascii_case("quarantine") {
                summary.quarantine += count;
            } else if disposition.eq_ignore_ascii_case("reject") {
                summary.reject += count;
            } else {
                summary.other += count;
            }
        }
        summary
    }

    pub fn total(&self) -> u64 {
        self.pass + self.quarantine + self.reject + self.other
    }
}
