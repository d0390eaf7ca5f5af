//! Annotation model
//!
//! The set of placed marks across all pages. Every mutation returns a new
//! `AnnotationSet` backed by a fresh allocation; existing sets are never
//! modified, so a renderer holding an older snapshot never sees a
//! half-updated record and `ptr_eq` works as a change check.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::MarkSizes;
use crate::coords::{DocPoint, DocSize};
use crate::error::SignError;

pub type AnnotationId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkKind {
    Signature,
    Initial,
    Text,
}

impl MarkKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "signature" => Some(MarkKind::Signature),
            "initial" => Some(MarkKind::Initial),
            "text" => Some(MarkKind::Text),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarkKind::Signature => "signature",
            MarkKind::Initial => "initial",
            MarkKind::Text => "text",
        }
    }

    /// Capitalized name for notifications ("Signature field removed")
    pub fn title(&self) -> &'static str {
        match self {
            MarkKind::Signature => "Signature",
            MarkKind::Initial => "Initial",
            MarkKind::Text => "Text",
        }
    }

    /// Ink kinds are captured by drawing; text is typed
    pub fn is_ink(&self) -> bool {
        matches!(self, MarkKind::Signature | MarkKind::Initial)
    }
}

impl fmt::Display for MarkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Mark {
    /// `content` is a data-URI encoded raster, `None` until captured
    Signature { content: Option<String> },
    Initial { content: Option<String> },
    /// Empty text is the placeholder state
    Text { text: String },
}

impl Mark {
    pub fn empty(kind: MarkKind) -> Self {
        match kind {
            MarkKind::Signature => Mark::Signature { content: None },
            MarkKind::Initial => Mark::Initial { content: None },
            MarkKind::Text => Mark::Text {
                text: String::new(),
            },
        }
    }

    pub fn kind(&self) -> MarkKind {
        match self {
            Mark::Signature { .. } => MarkKind::Signature,
            Mark::Initial { .. } => MarkKind::Initial,
            Mark::Text { .. } => MarkKind::Text,
        }
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            Mark::Signature { content } | Mark::Initial { content } => content.as_deref(),
            Mark::Text { .. } => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Mark::Text { text } => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: AnnotationId,
    /// 1-based page number
    pub page: u32,
    pub position: DocPoint,
    pub size: DocSize,
    #[serde(flatten)]
    pub mark: Mark,
}

impl Annotation {
    pub fn new(id: AnnotationId, kind: MarkKind, page: u32, position: DocPoint, size: DocSize) -> Self {
        Self {
            id,
            page,
            position: position.clamped(),
            size,
            mark: Mark::empty(kind),
        }
    }

    pub fn kind(&self) -> MarkKind {
        self.mark.kind()
    }

    /// True when export has nothing to draw for this annotation
    pub fn is_placeholder(&self) -> bool {
        match &self.mark {
            Mark::Signature { content } | Mark::Initial { content } => content.is_none(),
            Mark::Text { text } => text.is_empty(),
        }
    }
}

/// Partial update. Fields that do not apply to the annotation's kind are rejected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationPatch {
    pub position: Option<DocPoint>,
    pub content: Option<String>,
    pub text: Option<String>,
}

impl AnnotationPatch {
    pub fn position(position: DocPoint) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    fn apply(&self, annotation: &Annotation) -> Result<Annotation, SignError> {
        let mut next = annotation.clone();
        if let Some(position) = self.position {
            next.position = position.clamped();
        }
        if let Some(content) = &self.content {
            match &mut next.mark {
                Mark::Signature { content: slot } | Mark::Initial { content: slot } => {
                    *slot = Some(content.clone());
                }
                Mark::Text { .. } => {
                    return Err(SignError::KindMismatch {
                        id: annotation.id,
                        kind: MarkKind::Text,
                    })
                }
            }
        }
        if let Some(text) = &self.text {
            match &mut next.mark {
                Mark::Text { text: slot } => *slot = text.clone(),
                other => {
                    return Err(SignError::KindMismatch {
                        id: annotation.id,
                        kind: other.kind(),
                    })
                }
            }
        }
        Ok(next)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnnotationSet {
    items: Arc<[Annotation]>,
}

impl AnnotationSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn from_vec(items: Vec<Annotation>) -> Self {
        Self {
            items: items.into(),
        }
    }

    /// Create the annotation(s) for one placement.
    ///
    /// `Initial` fans out to every page `1..=page_count` at the same position
    /// with ids `base_id + page`; other kinds create one annotation on `page`
    /// with id `base_id`.
    pub fn create(
        &self,
        kind: MarkKind,
        page: u32,
        position: DocPoint,
        page_count: u32,
        base_id: AnnotationId,
        sizes: &MarkSizes,
    ) -> (Self, Vec<Annotation>) {
        let size = sizes.for_kind(kind);
        let created: Vec<Annotation> = match kind {
            MarkKind::Initial => (1..=page_count)
                .map(|p| Annotation::new(base_id + p as u64, kind, p, position, size))
                .collect(),
            _ => vec![Annotation::new(base_id, kind, page, position, size)],
        };

        let mut items = self.items.to_vec();
        items.extend(created.iter().cloned());
        (Self::from_vec(items), created)
    }

    /// Replace one annotation with `patch` applied
    pub fn update(&self, id: AnnotationId, patch: &AnnotationPatch) -> Result<Self, SignError> {
        let index = self
            .items
            .iter()
            .position(|a| a.id == id)
            .ok_or(SignError::UnknownAnnotation(id))?;
        let updated = patch.apply(&self.items[index])?;

        let mut items = self.items.to_vec();
        items[index] = updated;
        Ok(Self::from_vec(items))
    }

    /// Set the same raster on every annotation of an ink kind
    pub fn broadcast_content(&self, kind: MarkKind, content: &str) -> Self {
        let items = self
            .items
            .iter()
            .map(|a| match &a.mark {
                Mark::Signature { .. } | Mark::Initial { .. } if a.kind() == kind => {
                    let mut next = a.clone();
                    next.mark = match kind {
                        MarkKind::Signature => Mark::Signature {
                            content: Some(content.to_string()),
                        },
                        _ => Mark::Initial {
                            content: Some(content.to_string()),
                        },
                    };
                    next
                }
                _ => a.clone(),
            })
            .collect();
        Self::from_vec(items)
    }

    /// Remove exactly one annotation, returning it
    pub fn delete(&self, id: AnnotationId) -> (Self, Option<Annotation>) {
        let removed = self.get(id).cloned();
        if removed.is_none() {
            return (self.clone(), None);
        }
        let items = self.items.iter().filter(|a| a.id != id).cloned().collect();
        (Self::from_vec(items), removed)
    }

    /// Drop everything (reset or a new document)
    pub fn clear(&self) -> Self {
        Self::new()
    }

    /// Annotations anchored to `page`, in insertion (paint) order
    pub fn list_for_page(&self, page: u32) -> Vec<&Annotation> {
        self.items.iter().filter(|a| a.page == page).collect()
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.items.iter().find(|a| a.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Same backing allocation, i.e. nothing changed between two snapshots
    pub fn ptr_eq(&self, other: &AnnotationSet) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&*self.items)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: an initial placement on N pages yields N distinct ids at one position
        #[test]
        fn initial_fanout_is_one_per_page(
            pages in 1u32..200,
            x in 0.0f64..600.0,
            y in 0.0f64..800.0,
            base in 0u64..1_000_000_000,
        ) {
            let (set, created) = AnnotationSet::new().create(
                MarkKind::Initial, 1, DocPoint::new(x, y), pages, base, &MarkSizes::default());
            prop_assert_eq!(created.len(), pages as usize);
            prop_assert_eq!(set.len(), pages as usize);

            let mut ids: Vec<u64> = created.iter().map(|a| a.id).collect();
            ids.sort_unstable();
            ids.dedup();
            prop_assert_eq!(ids.len(), pages as usize);
            prop_assert!(created.iter().all(|a| a.position == DocPoint::new(x, y)));
        }

        /// Property: deleting one id leaves every other record untouched
        #[test]
        fn delete_leaves_siblings(pages in 2u32..50, victim in 1u32..50) {
            let victim = 1 + (victim - 1) % pages;
            let (set, created) = AnnotationSet::new().create(
                MarkKind::Initial, 1, DocPoint::default(), pages, 0, &MarkSizes::default());
            let (after, removed) = set.delete(victim as u64);

            prop_assert!(removed.is_some());
            prop_assert_eq!(after.len(), created.len() - 1);
            for a in created.iter().filter(|a| a.id != victim as u64) {
                prop_assert_eq!(after.get(a.id), Some(a));
            }
        }
    }
}
