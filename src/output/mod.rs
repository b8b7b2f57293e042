//! Output formatters for scan results.
//!
//! - JSON for automation and scripting
//! - Text for people at a terminal
//!
//! # Example
//!
//! ```no_run
//! use dupescan::controller::{scan, ScanRequest};
//! use dupescan::output::JsonOutput;
//! use dupescan::signal::CancelHandle;
//!
//! let result = scan(&ScanRequest::new("."), &CancelHandle::new()).unwrap();
//! println!("{}", JsonOutput::new(&result).to_json_pretty().unwrap());
//! ```

pub mod json;
pub mod text;

pub use json::{JsonOutput, JsonOutputError};
pub use text::TextOutput;
