//! Data Models Module
//!
//! This module defines the core data structures produced by the decoders: the
//! closed tag enumerations and `Record` for a DMARC policy record, and the
//! `Report` tree for an aggregate (RUA) feedback report. It also provides the
//! string conversions for the enumerations.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

pub const DMARC_VERSION: &str = "DMARC1";
pub const DEFAULT_PERCENT: u8 = 100;
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(86400);

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    None,
    Quarantine,
    Reject,
}
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentMode {
    #[default]
    Relaxed,
    Strict,
}
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FailureOption {
    /// `0`: report when all mechanisms fail to produce an aligned pass.
    All,
    /// `1`: report when any mechanism fails.
    Any,
    /// `d`
    Dkim,
    /// `s`
    Spf,
}
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Afrf,
}

/// A decoded DMARC policy record. Only ever constructed fully valid.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Record {
    pub version: String,
    pub policy: Policy,
    pub subdomain_policy: Option<Policy>,
    pub dkim_alignment: AlignmentMode,
    pub spf_alignment: AlignmentMode,
    pub failure_options: Vec<FailureOption>,
    pub percent: u8,
    pub report_formats: Vec<ReportFormat>,
    pub report_interval: Duration,
    pub aggregate_report_uris: Vec<String>,
    pub failure_report_uris: Vec<String>,
}

impl Record {
    /// A record carrying only the mandatory tags; every optional field at its default.
    pub fn new(version: impl Into<String>, policy: Policy) -> Self {
        Record {
            version: version.into(),
            policy,
            subdomain_policy: None,
            dkim_alignment: AlignmentMode::Relaxed,
            spf_alignment: AlignmentMode::Relaxed,
            failure_options: Vec::new(),
            percent: DEFAULT_PERCENT,
            report_formats: vec![ReportFormat::Afrf],
            report_interval: DEFAULT_REPORT_INTERVAL,
            aggregate_report_uris: Vec::new(),
            failure_report_uris: Vec::new(),
        }
    }

    /// `sp` if published, otherwise `p`.
    pub fn effective_subdomain_policy(&self) -> Policy {
        self.subdomain_policy.unwrap_or(self.policy)
    }

    pub fn effective_failure_options(&self) -> Vec<FailureOption> {
        if self.failure_options.is_empty() {
            vec![FailureOption::All]
        } else {
            self.failure_options.clone()
        }
    }

    pub fn is_dmarc1(&self) -> bool {
        self.version == DMARC_VERSION
    }
}

/// Root of an aggregate feedback report.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct Report {
    pub report_metadata: ReportMetadata,
    pub policy_published: PolicyPublished,
    pub records: Vec<ReportRecord>,
}
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct ReportMetadata {
    pub org_name: String,
    pub email: String,
    pub extra_contact_info: String,
    pub report_id: String,
    pub date_range: DateRange,
}
/// Epoch seconds. `begin <= end` is not checked.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub begin: i64,
    pub end: i64,
}
/// Snapshot of the policy the reporter saw, kept as raw tag values.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct PolicyPublished {
    pub domain: String,
    pub adkim: Option<String>,
    pub aspf: Option<String>,
    pub p: String,
    pub sp: Option<String>,
    /// As published in the report. Not range-checked.
    pub pct: Option<i64>,
    pub np: Option<String>,
    pub fo: Option<String>,
}
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ReportRecord {
    pub row: Row,
    pub identifiers: Identifiers,
    pub auth_results: AuthResults,
}
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Row {
    pub source_ip: IpAddr,
    /// Messages covered by this row. A row without `<count>` decodes as 0.
    pub count: u32,
    pub policy_evaluated: PolicyEvaluated,
}
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct PolicyEvaluated {
    pub disposition: String,
    pub dkim: String,
    pub spf: String,
}
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct Identifiers {
    pub header_from: String,
    pub envelope_from: Option<String>,
    pub envelope_to: Option<String>,
}
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct AuthResults {
    pub dkim: Vec<DkimAuthResult>,
    pub spf: SpfAuthResult,
}
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct DkimAuthResult {
    pub domain: String,
    pub result: String,
    pub selector: String,
}
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct SpfAuthResult {
    pub domain: String,
    pub result: String,
    pub scope: Option<String>,
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::None => write!(f, "none"),
            Policy::Quarantine => write!(f, "quarantine"),
            Policy::Reject => write!(f, "reject"),
        }
    }
}
impl fmt::Display for AlignmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlignmentMode::Relaxed => write!(f, "r"),
            AlignmentMode::Strict => write!(f, "s"),
        }
    }
}
impl fmt::Display for FailureOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureOption::All => write!(f, "0"),
            FailureOption::Any => write!(f, "1"),
            FailureOption::Dkim => write!(f, "d"),
            FailureOption::Spf => write!(f, "s"),
        }
    }
}
impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Afrf => write!(f, "afrf"),
        }
    }
}

// Tag literals are case-sensitive.
impl FromStr for Policy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Policy::None),
            "quarantine" => Ok(Policy::Quarantine),
            "reject" => Ok(Policy::Reject),
            _ => Err(format!("Invalid policy: {}", s)),
        }
    }
}
impl FromStr for AlignmentMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "r" => Ok(AlignmentMode::Relaxed),
            "s" => Ok(AlignmentMode::Strict),
            _ => Err(format!("Invalid alignment mode: {}", s)),
        }
    }
}
impl FromStr for FailureOption {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0" => Ok(FailureOption::All),
            "1" => Ok(FailureOption::Any),
            "d" => Ok(FailureOption::Dkim),
            "s" => Ok(FailureOption::Spf),
            _ => Err(format!("Invalid failure option: {}", s)),
        }
    }
}
impl FromStr for ReportFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "afrf" => Ok(ReportFormat::Afrf),
            _ => Err(format!("Invalid report format: {}", s)),
        }
    }
}

fn join<T: fmt::Display>(items: &[T], sep: &str) -> String {
    items.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(sep)
}

/// Renders the record as a TXT value, emitting only tags that differ from their defaults.
impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v={}; p={}", self.version, self.policy)?;
        if let Some(sp) = self.subdomain_policy {
            write!(f, "; sp={}", sp)?;
        }
        if self.dkim_alignment != AlignmentMode::Relaxed {
            write!(f, "; adkim={}", self.dkim_alignment)?;
        }
        if self.spf_alignment != AlignmentMode::Relaxed {
            write!(f, "; aspf={}", self.spf_alignment)?;
        }
        if !self.failure_options.is_empty() {
            write!(f, "; fo={}", join(&self.failure_options, ":"))?;
        }
        if self.percent != DEFAULT_PERCENT {
            write!(f, "; pct={}", self.percent)?;
        }
        if !self.report_formats.is_empty() && self.report_formats != [ReportFormat::Afrf] {
            write!(f, "; rf={}", join(&self.report_formats, ":"))?;
        }
        if self.report_interval != DEFAULT_REPORT_INTERVAL {
            write!(f, "; ri={}", self.report_interval.as_secs())?;
        }
        if !self.aggregate_report_uris.is_empty() {
            write!(f, "; rua={}", self.aggregate_report_uris.join(","))?;
        }
        if !self.failure_report_uris.is_empty() {
            write!(f, "; ruf={}", self.failure_report_uris.join(","))?;
        }
        Ok(())
    }
}
