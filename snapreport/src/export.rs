//! Report export pipeline
//!
//! Drives an analysis result through the full chain: section parsing,
//! config filtering, snapshot building, block rasterization, pagination
//! and PDF assembly. The pipeline is strictly staged and entirely
//! in-memory; a failure at any stage surfaces as an error without a
//! partial artifact, and the in-flight flag is released on every exit
//! path. At most one PDF export runs at a time per exporter.

use crate::config::ExportConfig;
use crate::fonts::FontSet;
use crate::paginate::{screenshot_page, single_block_page, OutputDocument, Page, PageGeometry, Paginator};
use crate::pdf::{assemble, export_file_name, AssembleError};
use crate::raster::{BlockBitmap, RasterError, Rasterizer, Screenshot};
use crate::section::{filter_sections, parse_sections};
use crate::snapshot::{build_snapshot, RenderBlock, REPORT_NAME};
use chrono::Utc;
use itertools::Itertools;
use pulldown_cmark::{Event, Parser, TagEnd};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Stem used for PDF artifact names.
const PDF_STEM: &str = "SnapReport_Analysis";

/// Stem used for plain-text artifact names.
const TEXT_STEM: &str = "SnapReport_Notes";

/// Errors raised by the export pipeline.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("an export is already in progress")]
    InFlight,

    #[error(transparent)]
    Raster(#[from] RasterError),

    #[error(transparent)]
    Assemble(#[from] AssembleError),

    #[error("failed to write artifact: {0}")]
    Io(#[from] std::io::Error),
}

/// A finished in-memory artifact, ready to be persisted or handed off.
#[derive(Debug, Clone)]
pub struct PdfArtifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl PdfArtifact {
    /// Write the artifact into `dir` under its generated name.
    pub fn save_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf, ExportError> {
        let path = dir.as_ref().join(&self.file_name);
        fs::write(&path, &self.bytes)?;
        log::info!("wrote {} ({} bytes)", path.display(), self.bytes.len());
        Ok(path)
    }
}

/// A plain-text rendition of an analysis result.
#[derive(Debug, Clone)]
pub struct TextArtifact {
    pub file_name: String,
    pub text: String,
}

impl TextArtifact {
    pub fn save_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf, ExportError> {
        let path = dir.as_ref().join(&self.file_name);
        fs::write(&path, &self.text)?;
        Ok(path)
    }
}

/// Clears the in-flight flag when the export scope ends, success or not.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// PDF and text exporter for analysis results.
pub struct ReportExporter {
    fonts: FontSet,
    in_flight: AtomicBool,
}

impl ReportExporter {
    pub fn new(fonts: FontSet) -> Self {
        Self {
            fonts,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Whether a PDF export is currently running.
    pub fn is_exporting(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Export one analysis result as a paginated A4 PDF.
    ///
    /// Returns the artifact entirely in memory; nothing touches the
    /// filesystem until [`PdfArtifact::save_to`]. Only one export may be
    /// in flight at a time; a second call while one runs fails fast with
    /// [`ExportError::InFlight`].
    pub fn export_pdf(
        &self,
        task: &str,
        page_url: Option<&str>,
        result_markdown: &str,
        screenshot: Option<&Screenshot>,
        config: &ExportConfig,
    ) -> Result<PdfArtifact, ExportError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::warn!("export rejected: another export is in progress");
            return Err(ExportError::InFlight);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let sections = parse_sections(result_markdown);
        let filtered = filter_sections(&sections, config);
        log::info!(
            "exporting PDF: {} sections ({} after filtering)",
            sections.len(),
            filtered.len()
        );

        let snapshot = build_snapshot(task, page_url, screenshot, &filtered, config);

        let rasterizer = Rasterizer::new(&self.fonts);
        let mut cover_bitmap: Option<BlockBitmap> = None;
        let mut content_bitmaps: Vec<BlockBitmap> = Vec::new();

        for block in &snapshot.blocks {
            let Some(bitmap) = rasterizer.rasterize(block)? else {
                continue;
            };
            log::debug!("rasterized block: {}x{} px", bitmap.width, bitmap.height);
            if matches!(block, RenderBlock::Cover { .. }) {
                cover_bitmap = Some(bitmap);
            } else {
                content_bitmaps.push(bitmap);
            }
        }

        let geometry = PageGeometry::a4();
        let mut pages: Vec<Page> = Vec::new();

        if let Some(bitmap) = cover_bitmap {
            pages.push(single_block_page(&geometry, bitmap));
        }

        let mut paginator = Paginator::new(geometry);
        for bitmap in content_bitmaps {
            paginator.place(bitmap);
        }
        pages.extend(paginator.into_pages());

        // The screenshot occupies a fixed second page: right after the
        // cover when there is one, otherwise after the first content page.
        // The content flow keeps page one and continues on page three.
        if config.include_screenshot {
            if let Some(shot) = screenshot {
                let slot = pages.len().min(1);
                pages.insert(
                    slot,
                    screenshot_page(&geometry, BlockBitmap::from_screenshot(shot)),
                );
            }
        }

        let document = OutputDocument { geometry, pages };
        let title = format!("{}: {}", REPORT_NAME, task);
        let bytes = assemble(&title, &document)?;

        Ok(PdfArtifact {
            file_name: export_file_name(PDF_STEM, Utc::now().date_naive()),
            bytes,
        })
    }

    /// Export one analysis result as plain text with markdown stripped.
    pub fn export_text(&self, result_markdown: &str) -> TextArtifact {
        let mut text = String::new();

        for event in Parser::new(result_markdown) {
            match event {
                Event::Text(chunk) | Event::Code(chunk) => text.push_str(&chunk),
                Event::SoftBreak | Event::HardBreak => text.push('\n'),
                Event::End(
                    TagEnd::Paragraph
                    | TagEnd::Heading(_)
                    | TagEnd::Item
                    | TagEnd::CodeBlock,
                ) => {
                    if !text.ends_with('\n') {
                        text.push('\n');
                    }
                }
                Event::Rule => text.push_str("\n---\n"),
                _ => {}
            }
        }

        let text = text.lines().map(str::trim_end).join("\n");
        let file_name = format!("{}_{}.txt", TEXT_STEM, Utc::now().format("%Y-%m-%d_%H%M%S"));
        TextArtifact {
            file_name,
            text: text.trim().to_string(),
        }
    }
}
