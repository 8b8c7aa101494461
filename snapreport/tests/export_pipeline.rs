use snapreport::{ExportConfig, FontSet, ReportExporter, Screenshot};

const SAMPLE_RESULT: &str = "\
The page is a documentation portal with a search box and a sidebar.

### Key Elements
- A **search box** at the top of the page
- A sidebar listing *twelve* guide categories
- A `Get Started` call-to-action button

### Steps
1. Open the portal
2. Type a query into the search box
3. Pick a result from the dropdown

### Automation JSON
```json
{\"action\": \"click\", \"selector\": \"#search\"}
```

### Accessibility
The search box is missing an accessible label.
";

fn exporter() -> Option<ReportExporter> {
    let _ = env_logger::builder().is_test(true).try_init();
    match FontSet::discover() {
        Some(fonts) => Some(ReportExporter::new(fonts)),
        None => {
            eprintln!("no system fonts installed; skipping");
            None
        }
    }
}

fn sample_screenshot() -> Screenshot {
    let mut png = Vec::new();
    let image = image::RgbaImage::from_pixel(640, 400, image::Rgba([200, 220, 240, 255]));
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();
    Screenshot::from_bytes(&png).unwrap()
}

fn page_count(bytes: &[u8]) -> usize {
    lopdf::Document::load_mem(bytes).unwrap().get_pages().len()
}

/// Pixel widths of the image XObjects drawn on each page, in page order.
fn image_widths_by_page(bytes: &[u8]) -> Vec<Vec<i64>> {
    let doc = lopdf::Document::load_mem(bytes).unwrap();
    let mut pages = Vec::new();
    for (_, page_id) in doc.get_pages() {
        let mut widths = Vec::new();
        let page = doc.get_dictionary(page_id).unwrap();
        if let Ok(resources) = page.get(b"Resources").and_then(|o| o.as_dict()) {
            if let Ok(xobjects) = resources.get(b"XObject").and_then(|o| o.as_dict()) {
                for (_, value) in xobjects.iter() {
                    let id = value.as_reference().unwrap();
                    let stream = doc.get_object(id).unwrap().as_stream().unwrap();
                    widths.push(stream.dict.get(b"Width").unwrap().as_i64().unwrap());
                }
            }
        }
        pages.push(widths);
    }
    pages
}

/// Rasterized content blocks are always full content-column width.
const CONTENT_BLOCK_WIDTH: i64 = 1588;

/// Width of the screenshot produced by [`sample_screenshot`].
const SCREENSHOT_WIDTH: i64 = 640;

#[test]
fn test_full_export_is_valid_pdf() -> anyhow::Result<()> {
    let Some(exporter) = exporter() else {
        return Ok(());
    };
    let artifact = exporter.export_pdf(
        "Summarize the documentation portal",
        Some("https://docs.example.com"),
        SAMPLE_RESULT,
        None,
        &ExportConfig::default(),
    )?;
    assert!(artifact.bytes.starts_with(b"%PDF-1.5"));
    // Cover page plus at least one content page.
    assert!(page_count(&artifact.bytes) >= 2);
    Ok(())
}

#[test]
fn test_screenshot_adds_a_dedicated_page() {
    let Some(exporter) = exporter() else { return };
    let screenshot = sample_screenshot();

    let without = exporter
        .export_pdf("task", None, SAMPLE_RESULT, None, &ExportConfig::default())
        .unwrap();
    let with = exporter
        .export_pdf(
            "task",
            None,
            SAMPLE_RESULT,
            Some(&screenshot),
            &ExportConfig::default(),
        )
        .unwrap();
    assert_eq!(page_count(&with.bytes), page_count(&without.bytes) + 1);
}

#[test]
fn test_screenshot_is_page_two_without_cover() {
    let Some(exporter) = exporter() else { return };
    let config = ExportConfig {
        include_cover: false,
        ..ExportConfig::default()
    };
    // Enough sections that the content flow needs more than one page.
    let mut long = String::new();
    for i in 0..30 {
        long.push_str(&format!(
            "### Section {}\nA paragraph long enough to occupy real vertical \
             space when rasterized.\n",
            i
        ));
    }
    let artifact = exporter
        .export_pdf("task", None, &long, Some(&sample_screenshot()), &config)
        .unwrap();

    let pages = image_widths_by_page(&artifact.bytes);
    assert!(pages.len() >= 3);
    // Content starts on page one.
    assert!(!pages[0].is_empty());
    assert!(pages[0].iter().all(|&w| w == CONTENT_BLOCK_WIDTH));
    // The screenshot holds the fixed second page, alone.
    assert_eq!(pages[1], vec![SCREENSHOT_WIDTH]);
    // The flow resumes where it left off, from page three on.
    assert!(pages[2].iter().all(|&w| w == CONTENT_BLOCK_WIDTH));
    assert!(pages[2..].iter().flatten().all(|&w| w == CONTENT_BLOCK_WIDTH));
}

#[test]
fn test_screenshot_follows_the_cover() {
    let Some(exporter) = exporter() else { return };
    let artifact = exporter
        .export_pdf(
            "task",
            Some("https://example.com"),
            SAMPLE_RESULT,
            Some(&sample_screenshot()),
            &ExportConfig::default(),
        )
        .unwrap();

    let pages = image_widths_by_page(&artifact.bytes);
    assert!(pages.len() >= 3);
    // Page one is the cover, page two the screenshot, content after.
    assert_eq!(pages[0], vec![CONTENT_BLOCK_WIDTH]);
    assert_eq!(pages[1], vec![SCREENSHOT_WIDTH]);
    assert!(!pages[2].is_empty());
    assert!(pages[2].iter().all(|&w| w == CONTENT_BLOCK_WIDTH));
}

#[test]
fn test_screenshot_toggle_suppresses_the_page() {
    let Some(exporter) = exporter() else { return };
    let screenshot = sample_screenshot();
    let config = ExportConfig {
        include_screenshot: false,
        include_cover: false,
        ..ExportConfig::default()
    };

    let with_toggle_off = exporter
        .export_pdf("task", None, SAMPLE_RESULT, Some(&screenshot), &config)
        .unwrap();
    let without_screenshot = exporter
        .export_pdf("task", None, SAMPLE_RESULT, None, &config)
        .unwrap();
    assert_eq!(
        page_count(&with_toggle_off.bytes),
        page_count(&without_screenshot.bytes)
    );
}

#[test]
fn test_cover_toggle_removes_a_page() {
    let Some(exporter) = exporter() else { return };
    let config = ExportConfig {
        include_cover: false,
        ..ExportConfig::default()
    };

    let with_cover = exporter
        .export_pdf("task", None, SAMPLE_RESULT, None, &ExportConfig::default())
        .unwrap();
    let without_cover = exporter
        .export_pdf("task", None, SAMPLE_RESULT, None, &config)
        .unwrap();
    assert_eq!(
        page_count(&without_cover.bytes),
        page_count(&with_cover.bytes) - 1
    );
}

#[test]
fn test_long_result_spans_multiple_pages() {
    let Some(exporter) = exporter() else { return };
    let mut long = String::from("Intro paragraph.\n");
    for i in 0..30 {
        long.push_str(&format!(
            "### Section {}\nA paragraph long enough to occupy real vertical \
             space when rasterized, repeated across many sections so the \
             content flow must break onto further pages.\n",
            i
        ));
    }
    let config = ExportConfig {
        include_cover: false,
        ..ExportConfig::default()
    };
    let artifact = exporter
        .export_pdf("task", None, &long, None, &config)
        .unwrap();
    assert!(page_count(&artifact.bytes) > 1);
}

#[test]
fn test_text_export_round_trips_to_disk() {
    let Some(exporter) = exporter() else { return };
    let artifact = exporter.export_text(SAMPLE_RESULT);
    assert!(artifact.text.contains("search box"));
    assert!(!artifact.text.contains("**"));

    let dir = tempfile::tempdir().unwrap();
    let path = artifact.save_to(dir.path()).unwrap();
    assert_eq!(std::fs::read_to_string(path).unwrap(), artifact.text);
}
