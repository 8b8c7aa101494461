//! Render snapshot builder
//!
//! Builds the static visual representation of a report as an ordered list
//! of render blocks: branding header, optional cover, one block per
//! filtered section, footer. The builder is a pure function over its
//! inputs; the snapshot is a plain value that the rasterizer consumes and
//! the caller drops, whether or not the export succeeds.
//!
//! Section bodies are parsed with pulldown-cmark into paragraphs, code
//! blocks and list items carrying bold/italic/code runs, so the rasterizer
//! never touches raw markdown.

use crate::config::ExportConfig;
use crate::raster::Screenshot;
use crate::section::Section;
use pulldown_cmark::{Event, Parser, Tag, TagEnd};

/// Product name used on the branding header and in artifact names.
pub const REPORT_NAME: &str = "SnapReport";

/// Tagline printed under the product name on every report.
pub const REPORT_TAGLINE: &str = "Webpage Analysis Report";

/// Footer note printed at the end of the content flow.
pub const REPORT_FOOTER: &str = "Generated by SnapReport";

/// A contiguous span of styled text inside a body block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub code: bool,
}

impl TextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            italic: false,
            code: false,
        }
    }
}

/// One visual element inside a section body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyBlock {
    Paragraph(Vec<TextRun>),
    /// Fenced or indented code, line breaks preserved.
    Code(String),
    /// Bullet or numbered list entry with its rendered marker.
    ListItem { marker: String, runs: Vec<TextRun> },
    /// Heading nested inside a section body.
    Subheading(Vec<TextRun>),
    Rule,
}

/// One rasterizable unit of the export snapshot.
///
/// A block is never split across a page boundary: it either fits wholly on
/// the current page or moves entirely to a new one.
#[derive(Debug, Clone)]
pub enum RenderBlock {
    /// Product name and tagline at the top of the content flow.
    Branding,
    /// Cover block: report title, task description, optional source URL
    /// and an optional embedded screenshot thumbnail.
    Cover {
        task: String,
        page_url: Option<String>,
        thumbnail: Option<Screenshot>,
    },
    /// One filtered section: heading plus parsed body.
    Section {
        title: String,
        body: Vec<BodyBlock>,
    },
    /// Closing footer note.
    Footer,
}

/// The ordered snapshot fed to the rasterizer.
#[derive(Debug, Clone)]
pub struct ReportSnapshot {
    pub blocks: Vec<RenderBlock>,
}

/// Build the export snapshot for a report.
///
/// `sections` must already be filtered (see [`crate::section::filter_sections`]);
/// the cover toggle is the only configuration consulted here.
pub fn build_snapshot(
    task: &str,
    page_url: Option<&str>,
    screenshot: Option<&Screenshot>,
    sections: &[&Section],
    config: &ExportConfig,
) -> ReportSnapshot {
    let mut blocks = Vec::with_capacity(sections.len() + 3);

    blocks.push(RenderBlock::Branding);

    if config.include_cover {
        blocks.push(RenderBlock::Cover {
            task: task.to_string(),
            page_url: page_url.map(str::to_string),
            thumbnail: screenshot.cloned(),
        });
    }

    for section in sections {
        blocks.push(RenderBlock::Section {
            title: section.title.clone(),
            body: parse_body(&section.content),
        });
    }

    blocks.push(RenderBlock::Footer);

    ReportSnapshot { blocks }
}

/// Parse a section body into renderable blocks.
pub fn parse_body(markdown: &str) -> Vec<BodyBlock> {
    let mut blocks = Vec::new();
    let mut runs: Vec<TextRun> = Vec::new();
    let mut bold = 0usize;
    let mut italic = 0usize;
    let mut code_buffer = String::new();
    let mut in_code_block = false;
    let mut item_depth = 0usize;
    // One counter per open list; None marks an unordered list.
    let mut list_stack: Vec<Option<u64>> = Vec::new();
    let mut item_marker = String::new();

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::Paragraph) => {
                if item_depth == 0 {
                    runs.clear();
                }
            }
            Event::End(TagEnd::Paragraph) => {
                if item_depth == 0 && !runs.is_empty() {
                    blocks.push(BodyBlock::Paragraph(std::mem::take(&mut runs)));
                }
            }
            Event::Start(Tag::Heading { .. }) => {
                runs.clear();
            }
            Event::End(TagEnd::Heading(_)) => {
                if !runs.is_empty() {
                    blocks.push(BodyBlock::Subheading(std::mem::take(&mut runs)));
                }
            }
            // Language tags are ignored; code renders monospaced either way.
            Event::Start(Tag::CodeBlock(_)) => {
                in_code_block = true;
                code_buffer.clear();
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                blocks.push(BodyBlock::Code(code_buffer.trim_end().to_string()));
            }
            Event::Start(Tag::List(start)) => {
                list_stack.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                list_stack.pop();
            }
            Event::Start(Tag::Item) => {
                item_depth += 1;
                runs.clear();
                item_marker = match list_stack.last_mut() {
                    Some(Some(counter)) => {
                        let marker = format!("{}.", counter);
                        *counter += 1;
                        marker
                    }
                    _ => "\u{2022}".to_string(),
                };
            }
            Event::End(TagEnd::Item) => {
                item_depth = item_depth.saturating_sub(1);
                blocks.push(BodyBlock::ListItem {
                    marker: std::mem::take(&mut item_marker),
                    runs: std::mem::take(&mut runs),
                });
            }
            Event::Start(Tag::Strong) => bold += 1,
            Event::End(TagEnd::Strong) => bold = bold.saturating_sub(1),
            Event::Start(Tag::Emphasis) => italic += 1,
            Event::End(TagEnd::Emphasis) => italic = italic.saturating_sub(1),
            Event::Text(text) => {
                if in_code_block {
                    code_buffer.push_str(&text);
                } else {
                    runs.push(TextRun {
                        text: text.to_string(),
                        bold: bold > 0,
                        italic: italic > 0,
                        code: false,
                    });
                }
            }
            Event::Code(text) => {
                runs.push(TextRun {
                    text: text.to_string(),
                    bold: bold > 0,
                    italic: italic > 0,
                    code: true,
                });
            }
            Event::SoftBreak | Event::HardBreak => {
                runs.push(TextRun {
                    text: " ".to_string(),
                    bold: bold > 0,
                    italic: italic > 0,
                    code: false,
                });
            }
            Event::Rule => blocks.push(BodyBlock::Rule),
            _ => {}
        }
    }

    // Dangling runs happen when markdown ends mid-construct.
    if !runs.is_empty() {
        blocks.push(BodyBlock::Paragraph(runs));
    }

    blocks
}

impl RenderBlock {
    /// All visible text carried by the block, used to skip empty blocks.
    pub fn visible_text(&self) -> String {
        match self {
            RenderBlock::Branding => format!("{} {}", REPORT_NAME, REPORT_TAGLINE),
            RenderBlock::Cover { task, page_url, .. } => {
                let mut text = format!("{} {}", REPORT_NAME, task);
                if let Some(url) = page_url {
                    text.push(' ');
                    text.push_str(url);
                }
                text
            }
            RenderBlock::Section { title, body } => {
                let mut text = title.clone();
                for block in body {
                    match block {
                        BodyBlock::Paragraph(runs)
                        | BodyBlock::Subheading(runs)
                        | BodyBlock::ListItem { runs, .. } => {
                            for run in runs {
                                text.push(' ');
                                text.push_str(&run.text);
                            }
                        }
                        BodyBlock::Code(code) => {
                            text.push(' ');
                            text.push_str(code);
                        }
                        BodyBlock::Rule => {}
                    }
                }
                text
            }
            RenderBlock::Footer => REPORT_FOOTER.to_string(),
        }
    }

    /// Whether the block contributes anything to page flow.
    pub fn has_visible_content(&self) -> bool {
        if let RenderBlock::Cover { thumbnail, .. } = self {
            if thumbnail.is_some() {
                return true;
            }
        }
        !self.visible_text().trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::parse_sections;

    #[test]
    fn test_snapshot_block_order() {
        let sections = parse_sections("### One\na\n### Two\nb");
        let refs: Vec<&_> = sections.iter().collect();
        let snapshot = build_snapshot("task", None, None, &refs, &ExportConfig::default());

        assert!(matches!(snapshot.blocks[0], RenderBlock::Branding));
        assert!(matches!(snapshot.blocks[1], RenderBlock::Cover { .. }));
        assert!(matches!(snapshot.blocks[2], RenderBlock::Section { .. }));
        assert!(matches!(snapshot.blocks[3], RenderBlock::Section { .. }));
        assert!(matches!(snapshot.blocks[4], RenderBlock::Footer));
    }

    #[test]
    fn test_cover_toggle_removes_cover_block() {
        let config = ExportConfig {
            include_cover: false,
            ..ExportConfig::default()
        };
        let snapshot = build_snapshot("task", None, None, &[], &config);
        assert!(snapshot
            .blocks
            .iter()
            .all(|b| !matches!(b, RenderBlock::Cover { .. })));
    }

    #[test]
    fn test_parse_body_paragraph_runs() {
        let blocks = parse_body("plain **bold** and *italic* and `code`");
        assert_eq!(blocks.len(), 1);
        let BodyBlock::Paragraph(runs) = &blocks[0] else {
            panic!("expected paragraph");
        };
        assert!(runs.iter().any(|r| r.bold && r.text == "bold"));
        assert!(runs.iter().any(|r| r.italic && r.text == "italic"));
        assert!(runs.iter().any(|r| r.code && r.text == "code"));
    }

    #[test]
    fn test_parse_body_code_block_preserves_lines() {
        let blocks = parse_body("```\nfn main() {\n    run();\n}\n```");
        assert_eq!(blocks.len(), 1);
        let BodyBlock::Code(code) = &blocks[0] else {
            panic!("expected code block");
        };
        assert_eq!(code, "fn main() {\n    run();\n}");
    }

    #[test]
    fn test_parse_body_ordered_list_markers() {
        let blocks = parse_body("1. first\n2. second");
        let markers: Vec<_> = blocks
            .iter()
            .filter_map(|b| match b {
                BodyBlock::ListItem { marker, .. } => Some(marker.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(markers, vec!["1.", "2."]);
    }

    #[test]
    fn test_parse_body_bullet_list_markers() {
        let blocks = parse_body("- one\n- two");
        let markers: Vec<_> = blocks
            .iter()
            .filter_map(|b| match b {
                BodyBlock::ListItem { marker, .. } => Some(marker.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(markers, vec!["\u{2022}", "\u{2022}"]);
    }

    #[test]
    fn test_empty_section_has_visible_title() {
        let block = RenderBlock::Section {
            title: "Steps".to_string(),
            body: Vec::new(),
        };
        assert!(block.has_visible_content());
    }

    #[test]
    fn test_untitled_empty_section_is_invisible() {
        let block = RenderBlock::Section {
            title: String::new(),
            body: Vec::new(),
        };
        assert!(!block.has_visible_content());
    }
}
