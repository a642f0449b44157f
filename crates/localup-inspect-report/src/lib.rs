//! Report rendering for captured requests
//!
//! Turns filtered records into Markdown: decoded bodies, headers, and a
//! summary of the filters that produced them.

pub mod body;
pub mod formatter;
pub mod summary;

pub use body::{decode_body, render_body};
pub use formatter::ReportFormatter;
pub use summary::FiltersSummary;
