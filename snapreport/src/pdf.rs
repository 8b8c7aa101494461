//! PDF assembly
//!
//! Turns the paginated output document into a single PDF byte buffer with
//! lopdf. Every placed bitmap becomes an RGB FlateDecode image XObject
//! drawn through a `q cm Do Q` sequence; pages keep the exact order the
//! paginator produced, including empty ones. Assembly is entirely
//! in-memory so a failing stage can never leave a partial file behind.

use crate::paginate::OutputDocument;
use crate::raster::BlockBitmap;
use chrono::NaiveDate;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::io::Write;
use thiserror::Error;

/// Errors raised while assembling or serializing the PDF.
#[derive(Error, Debug)]
pub enum AssembleError {
    #[error("content stream encode failed: {0}")]
    Content(String),

    #[error("image stream encode failed: {0}")]
    ImageStream(#[from] std::io::Error),

    #[error("PDF serialization failed: {0}")]
    Serialize(String),
}

/// Deterministic artifact name: `<stem>_<ISO date>.pdf`.
pub fn export_file_name(stem: &str, date: NaiveDate) -> String {
    format!("{}_{}.pdf", stem, date.format("%Y-%m-%d"))
}

/// Assemble the output document into PDF bytes.
pub fn assemble(title: &str, document: &OutputDocument) -> Result<Vec<u8>, AssembleError> {
    let mut doc = Document::with_version("1.5");

    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(title),
        "Creator" => Object::string_literal("snapreport"),
    });
    doc.trailer.set("Info", Object::Reference(info_id));

    let geometry = document.geometry;
    let mut page_ids = Vec::with_capacity(document.pages.len());
    let mut image_counter = 0usize;

    for page in &document.pages {
        let mut xobjects = lopdf::Dictionary::new();
        let mut operations = Vec::new();

        for placed in &page.images {
            image_counter += 1;
            let name = format!("Im{}", image_counter);
            let image_id = doc.add_object(image_xobject(&placed.bitmap)?);
            xobjects.set(name.as_bytes(), Object::Reference(image_id));

            // PDF origin is bottom-left; placements are top-left anchored.
            let w = placed.width.to_points();
            let h = placed.height.to_points();
            let x = placed.x.to_points();
            let y = (geometry.page_height - placed.y - placed.height).to_points();

            operations.push(Operation::new("q", vec![]));
            operations.push(Operation::new(
                "cm",
                vec![
                    w.into(),
                    0.into(),
                    0.into(),
                    h.into(),
                    x.into(),
                    y.into(),
                ],
            ));
            operations.push(Operation::new(
                "Do",
                vec![Object::Name(name.into_bytes())],
            ));
            operations.push(Operation::new("Q", vec![]));
        }

        let content = Content { operations };
        let content_data = content
            .encode()
            .map_err(|e| AssembleError::Content(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content_data));

        let mut resources = dictionary! {};
        if !xobjects.is_empty() {
            resources.set("XObject", Object::Dictionary(xobjects));
        }

        let page_dict = dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![
                0.into(),
                0.into(),
                geometry.page_width.to_points().into(),
                geometry.page_height.to_points().into(),
            ],
            "Contents" => Object::Reference(content_id),
            "Resources" => resources,
        };
        page_ids.push(doc.add_object(page_dict));
    }

    let pages_refs: Vec<Object> = page_ids.iter().map(|id| Object::Reference(*id)).collect();
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Count" => page_ids.len() as i64,
        "Kids" => pages_refs,
    };
    let pages_id = doc.add_object(pages_dict);

    for page_id in &page_ids {
        if let Ok(Object::Dictionary(dict)) = doc.get_object_mut(*page_id) {
            dict.set("Parent", Object::Reference(pages_id));
        }
    }

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| AssembleError::Serialize(e.to_string()))?;

    log::info!(
        "assembled PDF: {} pages, {} images, {} bytes",
        page_ids.len(),
        image_counter,
        bytes.len()
    );
    Ok(bytes)
}

/// Encode a bitmap as an RGB image XObject with Flate compression.
fn image_xobject(bitmap: &BlockBitmap) -> Result<Stream, AssembleError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&bitmap.rgb)?;
    let compressed = encoder.finish()?;

    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => bitmap.width as i64,
        "Height" => bitmap.height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
        "Filter" => "FlateDecode",
    };
    Ok(Stream::new(dict, compressed))
}
