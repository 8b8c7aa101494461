//! snapreport - Webpage analysis reporting library
//!
//! Takes the output of a screenshot-driven page analysis (a markdown
//! result organized into `### ` sections) and turns it into shareable
//! artifacts: a paginated A4 PDF built from rasterized blocks, or a
//! plain-text rendition. Also provides the surrounding session pieces:
//! a bounded analysis history, follow-up chat grounded in a result, and
//! read-aloud playback control.

#![deny(unsafe_code)]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(clippy::all))]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(clippy::pedantic))]
// Allow some pedantic lints that are too strict for this project
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod export;
pub mod fonts;
pub mod history;
pub mod paginate;
pub mod pdf;
pub mod raster;
pub mod section;
pub mod service;
pub mod snapshot;
pub mod speech;

pub use config::ExportConfig;
pub use export::{ExportError, PdfArtifact, ReportExporter, TextArtifact};
pub use fonts::FontSet;
pub use history::{HistoryEntry, HistoryStore, HISTORY_CAP};
pub use raster::Screenshot;
pub use section::{parse_sections, Section};
pub use service::{
    AnalysisRequest, AnalysisService, ChatService, Conversation, ServiceError, TieredAnalysis,
};
pub use speech::{SpeechController, SpeechEngine, SpeechState};
