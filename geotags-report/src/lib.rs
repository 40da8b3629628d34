//! Summary statistics and the static HTML report for a geotags run.
//!
//! [`SummaryStatistics::compute`] measures exported features in an
//! equal-area projection centred on the boundary; [`render_html`] turns the
//! figures into a self-contained document and [`write_report`] stores it
//! atomically next to the other artefacts.
//!
//! # Example
//! ```
//! use chrono::NaiveDate;
//! use geotags_core::RunReport;
//! use geotags_core::test_support::square_boundary;
//! use geotags_report::{ReportContext, SummaryStatistics, render_html};
//!
//! let boundary = square_boundary("Ghent", 3.6, 51.0, 0.2);
//! let stats = SummaryStatistics::compute(&[], &boundary, &RunReport::default())?;
//! let context = ReportContext {
//!     city: "Ghent".into(),
//!     country: "Belgium".into(),
//!     crs: "EPSG:4326".into(),
//!     extraction_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap_or_default(),
//!     artefacts: Vec::new(),
//! };
//! let html = render_html(&stats, &context);
//! assert!(html.contains("January 05, 2026"));
//! # Ok::<(), geotags_report::ReportError>(())
//! ```
#![forbid(unsafe_code)]

mod chart;
mod error;
mod html;
mod projection;
mod stats;

pub use chart::{bar_chart_svg, boundary_outline_svg};
pub use error::ReportError;
pub use html::{ReportContext, escape, render_html, write_report};
pub use projection::{EARTH_RADIUS_M, LocalProjection};
pub use stats::{CategorySummary, SummaryStatistics, TagCount};
