//! Conversion-readiness assessment for Airbnb listing pages.
//!
//! A listing is rendered in headless Chrome, parsed into a [`ListingContent`]
//! snapshot, scored by deterministic rubrics and optionally nudged by an LLM.

pub mod browser;
pub mod config;
pub mod error;
pub mod extract;
pub mod heuristics;
pub mod matcher;
pub mod models;
pub mod pipeline;
pub mod refine;
pub mod url;

pub use error::{AssessError, RenderError, UrlError};
pub use models::{AssessmentResult, HeuristicResult, ListingContent};
pub use pipeline::{AssessOptions, Assessment, Assessor};
