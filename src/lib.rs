//! DMARC Decoder Library
//!
//! This library decodes the two textual artifacts of DMARC: the policy record
//! published in DNS (`decode_record`) and the aggregate feedback report sent by
//! receivers (`decode_report`). Both are pure, synchronous functions returning a
//! typed value or a `DecodeError`. Archive extraction, configuration, and a
//! disposition summary are provided for callers that start from report files.

pub mod config;
pub mod error;
pub mod models;
pub mod validators;
pub mod uri;
pub mod record_parser;
pub mod xml_parser;
pub mod summary;
pub mod zip_handler;

pub use config::Config;
pub use error::{ArchiveError, DecodeError};
pub use models::{Record, Report};
pub use record_parser::decode_record;
pub use summary::DispositionSummary;
pub use uri::decode_uri_list;
pub use xml_parser::decode_report;
pub use zip_handler::extract_reports;
