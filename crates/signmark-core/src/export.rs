//! Flatten annotations into the PDF's page content
//!
//! Each annotation's document-space box is re-projected into PDF space
//! (bottom-left origin) and drawn straight into its page's content stream,
//! so the output has no interactive annotations left.

use std::collections::BTreeMap;

use lopdf::content::Operation;
use lopdf::{dictionary, Object, ObjectId, StringFormat};

use crate::annotation::{Annotation, AnnotationSet, Mark};
use crate::config::TextConfig;
use crate::coords::pdf_y;
use crate::error::ExportError;
use crate::font;
use crate::pdf::{PageBox, PageResources, PdfDocument};
use crate::raster::{DataUri, PdfImage};

const FONT_RESOURCE: &str = "SmHelv";

/// Output of a successful export, ready for the download trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub filename: String,
    pub media_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    pub const MEDIA_TYPE: &'static str = "application/pdf";

    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            media_type: Self::MEDIA_TYPE,
            bytes,
        }
    }
}

/// Draw every non-placeholder annotation onto a copy of `pdf_bytes`.
///
/// Any failure aborts the whole export; the input bytes are never touched.
pub fn flatten(
    pdf_bytes: &[u8],
    annotations: &AnnotationSet,
    text: &TextConfig,
) -> Result<Vec<u8>, ExportError> {
    let mut pdf = PdfDocument::load(pdf_bytes)?;

    let mut by_page: BTreeMap<u32, Vec<&Annotation>> = BTreeMap::new();
    for annotation in annotations.iter().filter(|a| !a.is_placeholder()) {
        by_page.entry(annotation.page).or_default().push(annotation);
    }

    let mut font_id: Option<ObjectId> = None;
    let mut drawn = 0usize;

    for (page, marks) in &by_page {
        let page_id = pdf.page_id(*page)?;
        let page_box = pdf.page_box(*page)?;

        let mut operations = Vec::new();
        let mut resources = PageResources::default();

        for annotation in marks {
            match &annotation.mark {
                Mark::Text { text: body } => {
                    let font = *font_id.get_or_insert_with(|| pdf.add_object(helvetica()));
                    if resources.fonts.is_empty() {
                        resources.fonts.push((FONT_RESOURCE.to_string(), font));
                    }
                    operations.extend(text_operations(annotation, body, &page_box, text));
                }
                Mark::Signature { content: Some(uri) } | Mark::Initial { content: Some(uri) } => {
                    let name = format!("SmIm{}", annotation.id);
                    let image = PdfImage::from_data_uri(&DataUri::parse(uri)?)?;
                    let image_id = embed(&mut pdf, image);
                    resources.xobjects.push((name.clone(), image_id));
                    operations.extend(image_operations(annotation, &name, &page_box));
                }
                // Placeholders were filtered above
                Mark::Signature { content: None } | Mark::Initial { content: None } => continue,
            }
            drawn += 1;
        }

        pdf.append_content(page_id, operations, &resources)?;
    }

    tracing::info!(pages = by_page.len(), drawn, "flattened annotations");
    pdf.save()
}

fn helvetica() -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    }
}

fn embed(pdf: &mut PdfDocument, image: PdfImage) -> ObjectId {
    let mut xobject = image.xobject;
    if let Some(mask) = image.smask {
        let mask_id = pdf.add_object(mask);
        xobject.dict.set("SMask", Object::Reference(mask_id));
    }
    pdf.add_object(xobject)
}

fn real(v: f64) -> Object {
    Object::Real(v as f32)
}

/// Text lines: first baseline one font size below the box top, then one
/// line height per line
fn text_operations(
    annotation: &Annotation,
    body: &str,
    page_box: &PageBox,
    config: &TextConfig,
) -> Vec<Operation> {
    let size = config.font_size;
    let leading = size * config.line_height;
    let max_width = (annotation.size.width - config.padding).max(0.0);
    let lines = font::wrap(&font::sanitize(body), size, max_width);

    let x = page_box.x + annotation.position.x;
    let y = page_box.y + pdf_y(page_box.height, annotation.position.y, size);

    let mut ops = vec![
        Operation::new("BT", vec![]),
        Operation::new("rg", vec![real(0.0), real(0.0), real(0.0)]),
        Operation::new(
            "Tf",
            vec![Object::Name(FONT_RESOURCE.as_bytes().to_vec()), real(size)],
        ),
        Operation::new("Td", vec![real(x), real(y)]),
    ];
    for (i, line) in lines.into_iter().enumerate() {
        if i > 0 {
            ops.push(Operation::new("Td", vec![real(0.0), real(-leading)]));
        }
        ops.push(Operation::new(
            "Tj",
            vec![Object::String(font::encode(&line), StringFormat::Literal)],
        ));
    }
    ops.push(Operation::new("ET", vec![]));
    ops
}

/// Image drawn to fill the annotation box
fn image_operations(annotation: &Annotation, name: &str, page_box: &PageBox) -> Vec<Operation> {
    let size = annotation.size;
    let x = page_box.x + annotation.position.x;
    let y = page_box.y + pdf_y(page_box.height, annotation.position.y, size.height);
    vec![
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![
                real(size.width),
                real(0.0),
                real(0.0),
                real(size.height),
                real(x),
                real(y),
            ],
        ),
        Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
        Operation::new("Q", vec![]),
    ]
}
