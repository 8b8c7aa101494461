//! Section model and parser for analysis documents
//!
//! The analysis service returns a flat markdown document whose top-level
//! structure is a sequence of `### ` headings. This module splits that
//! document into ordered titled sections and applies the export toggles
//! that decide which sections reach the PDF.

use crate::config::ExportConfig;

/// Title given to text that appears before the first heading.
pub const DEFAULT_SECTION_TITLE: &str = "Overview";

/// Heading marker that starts a new section.
const HEADING_MARKER: &str = "### ";

/// A titled, contiguous span of the analysis document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Heading text, trimmed. Not guaranteed unique.
    pub title: String,
    /// Body lines joined verbatim with `\n`, trimmed at the edges.
    pub content: String,
}

/// Split a markdown document into ordered sections.
///
/// A line starting with `### ` opens a new section titled with the rest of
/// that line. Lines before the first heading accumulate into an implicit
/// "Overview" section that is only emitted when it has content. Sections
/// with a real title are emitted even when their body is empty, so
/// consecutive headings survive the split. Empty input yields no sections.
pub fn parse_sections(markdown: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut title = DEFAULT_SECTION_TITLE.to_string();
    let mut body: Vec<&str> = Vec::new();

    for line in markdown.lines() {
        if let Some(rest) = line.strip_prefix(HEADING_MARKER) {
            flush_section(&mut sections, &title, &body);
            title = rest.trim().to_string();
            body.clear();
        } else {
            body.push(line);
        }
    }
    flush_section(&mut sections, &title, &body);

    sections
}

fn flush_section(sections: &mut Vec<Section>, title: &str, body: &[&str]) {
    let content = body.join("\n").trim().to_string();
    // Zero-content sections are kept only when they carry a real title.
    if !content.is_empty() || title != DEFAULT_SECTION_TITLE {
        sections.push(Section {
            title: title.to_string(),
            content,
        });
    }
}

/// Apply the export toggles to a parsed section sequence.
///
/// A section is excluded when its title contains "automation json" and the
/// JSON toggle is off, or contains "accessibility" and the accessibility
/// toggle is off. Matching is case-insensitive; every other section passes
/// regardless of configuration.
pub fn filter_sections<'a>(sections: &'a [Section], config: &ExportConfig) -> Vec<&'a Section> {
    sections
        .iter()
        .filter(|section| {
            let title = section.title.to_lowercase();
            if title.contains("automation json") && !config.include_automation_json {
                return false;
            }
            if title.contains("accessibility") && !config.include_accessibility_notes {
                return false;
            }
            true
        })
        .collect()
}
