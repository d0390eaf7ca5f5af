//! Page geometry and content mutation on top of lopdf

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::error::ExportError;

/// Inherited page attributes are looked up at most this many levels up
const MAX_TREE_DEPTH: usize = 32;

/// A page's MediaBox as origin plus extent, in PDF points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PageBox {
    /// US Letter, used when no MediaBox is found anywhere up the tree
    pub const LETTER: PageBox = PageBox {
        x: 0.0,
        y: 0.0,
        width: 612.0,
        height: 792.0,
    };
}

/// Resources a content append needs registered on the page
#[derive(Debug, Default)]
pub struct PageResources {
    pub fonts: Vec<(String, ObjectId)>,
    pub xobjects: Vec<(String, ObjectId)>,
}

impl PageResources {
    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty() && self.xobjects.is_empty()
    }
}

pub struct PdfDocument {
    doc: Document,
}

impl PdfDocument {
    pub fn load(bytes: &[u8]) -> Result<Self, ExportError> {
        let doc = Document::load_mem(bytes).map_err(|e| ExportError::Parse(e.to_string()))?;
        Ok(Self { doc })
    }

    pub fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    /// Object id of a 1-based page
    pub fn page_id(&self, page: u32) -> Result<ObjectId, ExportError> {
        self.doc
            .get_pages()
            .get(&page)
            .copied()
            .ok_or(ExportError::PageNotFound(page))
    }

    /// MediaBox for a page, inherited through `Parent` when the page has none
    pub fn page_box(&self, page: u32) -> Result<PageBox, ExportError> {
        let page_id = self.page_id(page)?;
        match self.inherited(page_id, b"MediaBox")? {
            Some(obj) => self.parse_rect(&obj),
            None => Ok(PageBox::LETTER),
        }
    }

    /// Walk the page tree upward for an inheritable attribute
    fn inherited(&self, page_id: ObjectId, key: &[u8]) -> Result<Option<Object>, ExportError> {
        let mut node = page_id;
        for _ in 0..MAX_TREE_DEPTH {
            let dict = self
                .doc
                .get_dictionary(node)
                .map_err(|e| ExportError::Parse(format!("page tree node: {}", e)))?;
            if let Ok(value) = dict.get(key) {
                return Ok(Some(value.clone()));
            }
            match dict.get(b"Parent").and_then(Object::as_reference) {
                Ok(parent) => node = parent,
                Err(_) => return Ok(None),
            }
        }
        Ok(None)
    }

    fn resolve<'a>(&'a self, obj: &'a Object) -> Result<&'a Object, ExportError> {
        match obj {
            Object::Reference(id) => self
                .doc
                .get_object(*id)
                .map_err(|e| ExportError::Parse(format!("dangling reference: {}", e))),
            other => Ok(other),
        }
    }

    fn parse_rect(&self, obj: &Object) -> Result<PageBox, ExportError> {
        let arr = self
            .resolve(obj)?
            .as_array()
            .map_err(|_| ExportError::Parse("MediaBox is not an array".to_string()))?;
        if arr.len() != 4 {
            return Err(ExportError::Parse(format!(
                "MediaBox has {} elements, expected 4",
                arr.len()
            )));
        }

        let mut v = [0.0f64; 4];
        for (slot, item) in v.iter_mut().zip(arr) {
            *slot = self.number(item)?;
        }
        // Corners may be given in any order
        Ok(PageBox {
            x: v[0].min(v[2]),
            y: v[1].min(v[3]),
            width: (v[2] - v[0]).abs(),
            height: (v[3] - v[1]).abs(),
        })
    }

    fn number(&self, obj: &Object) -> Result<f64, ExportError> {
        match self.resolve(obj)? {
            Object::Integer(i) => Ok(*i as f64),
            Object::Real(r) => Ok(*r as f64),
            _ => Err(ExportError::Parse(
                "expected number in rectangle".to_string(),
            )),
        }
    }

    pub fn add_object(&mut self, object: impl Into<Object>) -> ObjectId {
        self.doc.add_object(object)
    }

    /// The page's effective resource dictionary as an owned copy
    fn effective_resources(&self, page_id: ObjectId) -> Result<Dictionary, ExportError> {
        match self.inherited(page_id, b"Resources")? {
            Some(obj) => self
                .resolve(&obj)?
                .as_dict()
                .cloned()
                .map_err(|_| ExportError::Parse("Resources is not a dictionary".to_string())),
            None => Ok(Dictionary::new()),
        }
    }

    /// Merge named entries into one resource category (`Font`, `XObject`)
    fn merge_category(
        &self,
        resources: &mut Dictionary,
        category: &[u8],
        entries: &[(String, ObjectId)],
    ) -> Result<(), ExportError> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut sub = match resources.get(category) {
            Ok(obj) => self.resolve(obj)?.as_dict().cloned().map_err(|_| {
                ExportError::Parse(format!(
                    "/{} resource is not a dictionary",
                    String::from_utf8_lossy(category)
                ))
            })?,
            Err(_) => Dictionary::new(),
        };
        for (name, id) in entries {
            sub.set(name.as_bytes().to_vec(), Object::Reference(*id));
        }
        resources.set(category.to_vec(), Object::Dictionary(sub));
        Ok(())
    }

    /// Append drawing operations to a page.
    ///
    /// Existing content is bracketed in `q`/`Q` so its graphics state cannot
    /// leak into the appended operations. Resources are copied onto the page
    /// itself, which shadows anything inherited.
    pub fn append_content(
        &mut self,
        page_id: ObjectId,
        operations: Vec<Operation>,
        resources: &PageResources,
    ) -> Result<(), ExportError> {
        let mut page_resources = self.effective_resources(page_id)?;
        self.merge_category(&mut page_resources, b"Font", &resources.fonts)?;
        self.merge_category(&mut page_resources, b"XObject", &resources.xobjects)?;

        let existing: Vec<Object> = match self
            .doc
            .get_dictionary(page_id)
            .map_err(|e| ExportError::Parse(e.to_string()))?
            .get(b"Contents")
        {
            Ok(Object::Array(items)) => items.clone(),
            Ok(obj @ Object::Reference(_)) => vec![obj.clone()],
            _ => Vec::new(),
        };

        let appended = encode(Content { operations })?;
        let mut contents = Vec::with_capacity(existing.len() + 3);
        if !existing.is_empty() {
            let open = self.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
            let close = self.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));
            contents.push(Object::Reference(open));
            contents.extend(existing);
            contents.push(Object::Reference(close));
        }
        contents.push(Object::Reference(
            self.add_object(Stream::new(Dictionary::new(), appended)),
        ));

        let page = self
            .doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| ExportError::Parse(e.to_string()))?;
        page.set("Contents", Object::Array(contents));
        page.set("Resources", Object::Dictionary(page_resources));
        Ok(())
    }

    pub fn save(mut self) -> Result<Vec<u8>, ExportError> {
        let mut buffer = Vec::new();
        self.doc
            .save_to(&mut buffer)
            .map_err(|e| ExportError::Serialize(e.to_string()))?;
        Ok(buffer)
    }
}

fn encode(content: Content) -> Result<Vec<u8>, ExportError> {
    content
        .encode()
        .map_err(|e| ExportError::Serialize(format!("content stream: {}", e)))
}

#[cfg(test)]
pub(crate) mod testing {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    /// One-content-stream PDF with `pages` pages of the given MediaBox size
    pub(crate) fn sample_pdf(pages: u32, width: i64, height: i64) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });

        let mut kids = Vec::new();
        for i in 0..pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 10.into()]),
                    Operation::new("Td", vec![72.into(), 72.into()]),
                    Operation::new(
                        "Tj",
                        vec![Object::string_literal(format!("Page {}", i + 1))],
                    ),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(
                lopdf::Dictionary::new(),
                content.encode().unwrap(),
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }

        // MediaBox and Resources live on the Pages node and are inherited
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages as i64,
                "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }
}
