use lopdf::content::Operation;
use lopdf::{dictionary, Dictionary, Object, ObjectId, StringFormat};
use time::OffsetDateTime;

use crate::error::WatermarkError;
use crate::font::{StampFont, FONT_RESOURCE_NAME};
use crate::geometry::TileGrid;

/// Ratio between the stamp font size and the shorter edge of the first page.
/// Chosen empirically so the text is legible without dominating a typical
/// page.
pub const FONT_SIZE_RATIO: f32 = 0.06;

/// Rotation of every stamp, in degrees, about its own anchor point.
pub const ROTATION_DEGREES: f32 = -45.0;

/// Fill color of the stamps (light gray, RGB components in `[0, 1]`).
pub const COLOR: [f32; 3] = [0.7, 0.7, 0.7];

/// Non-stroking alpha applied to every stamp.
pub const OPACITY: f32 = 0.3;

/// The PDF resource name of the transparency graphics state shared by all
/// stamps.
const GRAPHICS_STATE_RESOURCE_NAME: &str = "GSwmark";

/// How many `Parent` links to follow when resolving inherited page
/// attributes, so a malformed page tree cannot recurse forever.
const INHERITANCE_DEPTH_LIMIT: usize = 10;

/// The resolved drawing policy for one transformation call. The font size is
/// derived from the first page only and applied to every page, so the
/// watermark keeps a visually consistent size across a document whose pages
/// differ in dimensions; the remaining fields are fixed policy.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkSpec {
    pub text: String,
    pub font_size: f32,
    pub color: [f32; 3],
    pub opacity: f32,
    pub rotation_degrees: f32,
}

impl WatermarkSpec {
    /// Derives the document-global spec from the dimensions of the first
    /// page.
    pub fn derive(watermark_text: &str, first_page_width: f32, first_page_height: f32) -> Self {
        WatermarkSpec {
            text: watermark_text.to_string(),
            font_size: first_page_width.min(first_page_height) * FONT_SIZE_RATIO,
            color: COLOR,
            opacity: OPACITY,
            rotation_degrees: ROTATION_DEGREES,
        }
    }
}

/// Stamps the watermark text across every page of the given PDF and returns
/// the re-serialized document.
///
/// The input bytes are never mutated; the output is a new byte sequence with
/// the same page count, page order and page dimensions, plus one additional
/// content stream per page carrying the semi-transparent stamps. The
/// watermark text must already be resolved by the caller: this function
/// applies whatever string it is handed and supplies no default.
///
/// The whole transformation is all-or-nothing. Any failure (unparseable
/// input, zero pages, a page tree too corrupt to attach the font to, or a
/// serialization failure) aborts without producing partial output.
pub fn watermark_pdf(pdf_bytes: &[u8], watermark_text: &str) -> Result<Vec<u8>, WatermarkError> {
    let mut document = lopdf::Document::load_mem(pdf_bytes)
        .map_err(|error| WatermarkError::Parse(error.to_string()))?;

    // Pages in document order; the map is keyed by the 1-based page number.
    let pages = document.get_pages();
    let first_page_id = pages
        .values()
        .next()
        .copied()
        .ok_or(WatermarkError::EmptyDocument)?;

    let (first_page_width, first_page_height) = page_dimensions(&document, first_page_id)?;
    let spec = WatermarkSpec::derive(watermark_text, first_page_width, first_page_height);

    // One font and one transparency graphics state per call, shared by every
    // stamp on every page.
    let font = StampFont::embed_into_document(&mut document);
    let graphics_state_id = document.add_object(dictionary! {
        "Type" => "ExtGState",
        "ca" => spec.opacity,
        "CA" => spec.opacity,
    });

    let text_width = font.text_width(&spec.text, spec.font_size);
    let text_height = spec.font_size;

    for (page_number, page_id) in pages {
        let (page_width, page_height) = page_dimensions(&document, page_id)?;
        let grid = TileGrid::for_page(page_width, page_height, text_width, text_height);
        let centers = grid.visible_tile_centers(page_width, page_height, text_width, text_height);
        log::debug!(
            "Stamping {} watermark instances onto page {} ({} x {})",
            centers.len(),
            page_number,
            page_width,
            page_height
        );

        let operations = stamp_operations(&spec, &font, &centers, text_width, text_height);
        append_stamp_stream_to_page(&mut document, page_id, operations)?;
        attach_stamp_resources(&mut document, page_id, font.object_id(), graphics_state_id)?;
    }

    touch_modification_date(&mut document);

    let mut output = Vec::new();
    document
        .save_to(&mut output)
        .map_err(|error| WatermarkError::Serialize(error.to_string()))?;

    Ok(output)
}

/// Builds the content operations of one page's watermark layer: an isolated
/// graphics state block that sets the transparency and fill color once, then
/// one text section per visible tile, rotated about its anchor through the
/// text matrix.
fn stamp_operations(
    spec: &WatermarkSpec,
    font: &StampFont,
    tile_centers: &[[f32; 2]],
    text_width: f32,
    text_height: f32,
) -> Vec<Operation> {
    let (rotation_sin, rotation_cos) = spec.rotation_degrees.to_radians().sin_cos();
    let encoded_text = font.encode_text(&spec.text);

    let mut operations = vec![
        Operation::new("q", vec![]),
        Operation::new(
            "gs",
            vec![Object::Name(GRAPHICS_STATE_RESOURCE_NAME.into())],
        ),
        Operation::new(
            "rg",
            spec.color.iter().copied().map(Object::Real).collect(),
        ),
    ];

    for center in tile_centers {
        // The anchor is the tile center shifted by half the unrotated text
        // extents, so the stamp reads as centered on its tile.
        let anchor_x = center[0] - text_width / 2.0;
        let anchor_y = center[1] - text_height / 2.0;

        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![
                Object::Name(FONT_RESOURCE_NAME.into()),
                spec.font_size.into(),
            ],
        ));
        operations.push(Operation::new(
            "Tm",
            vec![
                rotation_cos.into(),
                rotation_sin.into(),
                (-rotation_sin).into(),
                rotation_cos.into(),
                anchor_x.into(),
                anchor_y.into(),
            ],
        ));
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(encoded_text.clone(), StringFormat::Literal)],
        ));
        operations.push(Operation::new("ET", vec![]));
    }

    operations.push(Operation::new("Q", vec![]));
    operations
}

/// Encodes the operations into a new content stream and appends it to the
/// page, preserving whatever content the page already carries: a single
/// existing stream reference becomes a two-element array, an existing array
/// is extended.
fn append_stamp_stream_to_page(
    document: &mut lopdf::Document,
    page_id: ObjectId,
    operations: Vec<Operation>,
) -> Result<(), WatermarkError> {
    let encoded_content = lopdf::content::Content { operations }
        .encode()
        .map_err(|error| WatermarkError::Serialize(error.to_string()))?;
    let stream_id = document.add_object(
        lopdf::Stream::new(Dictionary::new(), encoded_content).with_compression(false),
    );

    let page_object = document
        .get_object_mut(page_id)
        .map_err(|error| WatermarkError::Parse(error.to_string()))?;
    let Object::Dictionary(page_dictionary) = page_object else {
        return Err(WatermarkError::Parse(
            "the page object is not a dictionary".into(),
        ));
    };

    let existing_contents = page_dictionary.get(b"Contents").ok().cloned();
    match existing_contents {
        Some(Object::Reference(existing_id)) => {
            page_dictionary.set(
                "Contents",
                Object::Array(vec![
                    Object::Reference(existing_id),
                    Object::Reference(stream_id),
                ]),
            );
        }
        Some(Object::Array(mut streams)) => {
            streams.push(Object::Reference(stream_id));
            page_dictionary.set("Contents", Object::Array(streams));
        }
        _ => {
            page_dictionary.set("Contents", Object::Reference(stream_id));
        }
    }

    Ok(())
}

/// Registers the shared font and transparency graphics state in the page's
/// resources. Inherited or indirectly referenced resource dictionaries are
/// resolved into an owned copy that is written back inline on the page, so
/// the registration never mutates a dictionary shared with other pages.
fn attach_stamp_resources(
    document: &mut lopdf::Document,
    page_id: ObjectId,
    font_id: ObjectId,
    graphics_state_id: ObjectId,
) -> Result<(), WatermarkError> {
    let mut resources = resolved_page_resources(document, page_id)?;
    insert_resource_reference(document, &mut resources, b"Font", FONT_RESOURCE_NAME, font_id);
    insert_resource_reference(
        document,
        &mut resources,
        b"ExtGState",
        GRAPHICS_STATE_RESOURCE_NAME,
        graphics_state_id,
    );

    let page_object = document
        .get_object_mut(page_id)
        .map_err(|error| WatermarkError::FontEmbed(error.to_string()))?;
    match page_object {
        Object::Dictionary(page_dictionary) => {
            page_dictionary.set("Resources", Object::Dictionary(resources));
            Ok(())
        }
        _ => Err(WatermarkError::FontEmbed(
            "the page object is not a dictionary".into(),
        )),
    }
}

/// Resolves the resource dictionary that applies to a page, walking up the
/// `Parent` chain for inherited resources. A page without any resources in
/// scope starts from an empty dictionary.
fn resolved_page_resources(
    document: &lopdf::Document,
    page_id: ObjectId,
) -> Result<Dictionary, WatermarkError> {
    let mut current_object = document
        .get_object(page_id)
        .map_err(|error| WatermarkError::FontEmbed(error.to_string()))?;

    for _ in 0..INHERITANCE_DEPTH_LIMIT {
        let Object::Dictionary(dictionary) = current_object else {
            return Err(WatermarkError::FontEmbed(
                "encountered a page tree node that is not a dictionary".into(),
            ));
        };

        if let Ok(resources_object) = dictionary.get(b"Resources") {
            return resolved_dictionary(document, resources_object).ok_or_else(|| {
                WatermarkError::FontEmbed("the page resources are not a dictionary".into())
            });
        }

        match dictionary.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => {
                current_object = document
                    .get_object(*parent_id)
                    .map_err(|error| WatermarkError::FontEmbed(error.to_string()))?;
            }
            _ => break,
        }
    }

    Ok(Dictionary::new())
}

/// Inserts `name -> object_id` into one resource category (`Font`,
/// `ExtGState`), resolving an indirectly referenced category dictionary into
/// an owned copy first.
fn insert_resource_reference(
    document: &lopdf::Document,
    resources: &mut Dictionary,
    category: &[u8],
    name: &str,
    object_id: ObjectId,
) {
    let mut category_dictionary = match resources.get(category) {
        Ok(category_object) => {
            resolved_dictionary(document, category_object).unwrap_or_default()
        }
        Err(_) => Dictionary::new(),
    };
    category_dictionary.set(name, Object::Reference(object_id));
    resources.set(category, Object::Dictionary(category_dictionary));
}

/// Resolves an object into an owned dictionary, following at most one level
/// of indirection.
fn resolved_dictionary(document: &lopdf::Document, object: &Object) -> Option<Dictionary> {
    match object {
        Object::Dictionary(dictionary) => Some(dictionary.clone()),
        Object::Reference(object_id) => match document.get_object(*object_id) {
            Ok(Object::Dictionary(dictionary)) => Some(dictionary.clone()),
            _ => None,
        },
        _ => None,
    }
}

/// Reads the page dimensions from its `MediaBox`, which may be inline, an
/// indirect reference, or inherited from an ancestor in the page tree. A
/// page whose dimensions cannot be resolved at all is treated as a parse
/// failure.
fn page_dimensions(
    document: &lopdf::Document,
    page_id: ObjectId,
) -> Result<(f32, f32), WatermarkError> {
    let page_object = document
        .get_object(page_id)
        .map_err(|error| WatermarkError::Parse(error.to_string()))?;
    let media_box = resolve_media_box(document, page_object, INHERITANCE_DEPTH_LIMIT)
        .ok_or_else(|| WatermarkError::Parse("the page has no resolvable MediaBox".into()))?;

    Ok((media_box[2] - media_box[0], media_box[3] - media_box[1]))
}

fn resolve_media_box(
    document: &lopdf::Document,
    page_object: &Object,
    depth: usize,
) -> Option<[f32; 4]> {
    if depth == 0 {
        return None;
    }
    let Object::Dictionary(dictionary) = page_object else {
        return None;
    };

    if let Ok(media_box_object) = dictionary.get(b"MediaBox") {
        let array = match media_box_object {
            Object::Array(array) => Some(array),
            Object::Reference(object_id) => match document.get_object(*object_id) {
                Ok(Object::Array(array)) => Some(array),
                _ => None,
            },
            _ => None,
        }?;

        let coordinates: Vec<f32> = array
            .iter()
            .filter_map(|object| match object {
                Object::Integer(value) => Some(*value as f32),
                Object::Real(value) => Some(*value),
                _ => None,
            })
            .collect();
        if let [x0, y0, x1, y1] = coordinates[..] {
            return Some([x0, y0, x1, y1]);
        }
        return None;
    }

    if let Ok(Object::Reference(parent_id)) = dictionary.get(b"Parent") {
        if let Ok(parent_object) = document.get_object(*parent_id) {
            return resolve_media_box(document, parent_object, depth - 1);
        }
    }

    None
}

/// Updates the modification date of the document information dictionary to
/// record the stamping. A document without an information dictionary gets a
/// minimal one.
fn touch_modification_date(document: &mut lopdf::Document) {
    let timestamp = to_pdf_timestamp_format(&OffsetDateTime::now_utc());
    let modification_date = Object::String(timestamp.into_bytes(), StringFormat::Literal);

    // The Info entry is normally an indirect reference, but some producers
    // inline the dictionary directly in the trailer.
    if let Ok(Object::Dictionary(information)) = document.trailer.get_mut(b"Info") {
        information.set("ModDate", modification_date);
        return;
    }

    let info_id = match document.trailer.get(b"Info") {
        Ok(Object::Reference(object_id)) => Some(*object_id),
        _ => None,
    };
    match info_id {
        Some(info_id) => {
            if let Ok(Object::Dictionary(information)) = document.get_object_mut(info_id) {
                information.set("ModDate", modification_date);
            }
        }
        None => {
            let information = dictionary! { "ModDate" => modification_date };
            let information_id = document.add_object(information);
            document
                .trailer
                .set("Info", Object::Reference(information_id));
        }
    }
}

/// Formats the given time so that it matches what the PDF specification
/// expects. An example of it is the following: D:20170505150224+02'00'.
fn to_pdf_timestamp_format(date: &OffsetDateTime) -> String {
    let offset = date.offset();
    let offset_sign = if offset.is_negative() { '-' } else { '+' };
    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}{offset_sign}{:02}'{:02}'",
        date.year(),
        u8::from(date.month()),
        date.day(),
        date.hour(),
        date.minute(),
        date.second(),
        offset.whole_hours().abs(),
        offset.minutes_past_hour().abs(),
    )
}
