//! Editor configuration
//!
//! Every field has a default, so the page can pass a partial JSON object
//! (or nothing at all) when it creates a session.

use serde::{Deserialize, Serialize};

use crate::annotation::MarkKind;
use crate::coords::DocSize;
use crate::error::SignError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    pub zoom: ZoomConfig,
    /// Pixel movement on either axis that turns a press into a drag
    pub drag_threshold_px: f64,
    /// How long a notification stays visible
    pub notification_ttl_ms: u64,
    pub text: TextConfig,
    pub ink: InkConfig,
    pub sizes: MarkSizes,
    pub download_filename: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            zoom: ZoomConfig::default(),
            drag_threshold_px: 3.0,
            notification_ttl_ms: 3000,
            text: TextConfig::default(),
            ink: InkConfig::default(),
            sizes: MarkSizes::default(),
            download_filename: "signed_document.pdf".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ZoomConfig {
    pub min: f64,
    pub max: f64,
    pub initial: f64,
    pub step: f64,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            min: 0.5,
            max: 3.0,
            initial: 1.5,
            step: 0.1,
        }
    }
}

/// Flattened text rendering
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextConfig {
    pub font_size: f64,
    /// Subtracted from the annotation width to get the wrap width
    pub padding: f64,
    pub line_height: f64,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            font_size: 12.0,
            padding: 8.0,
            line_height: 1.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InkConfig {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub stroke_width: f64,
}

impl Default for InkConfig {
    fn default() -> Self {
        Self {
            canvas_width: 500,
            canvas_height: 180,
            stroke_width: 3.0,
        }
    }
}

/// Default annotation sizes in document space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MarkSizes {
    pub signature: DocSize,
    pub initial: DocSize,
    pub text: DocSize,
}

impl Default for MarkSizes {
    fn default() -> Self {
        Self {
            signature: DocSize::new(200.0, 80.0),
            initial: DocSize::new(80.0, 40.0),
            text: DocSize::new(180.0, 40.0),
        }
    }
}

impl MarkSizes {
    pub fn for_kind(&self, kind: MarkKind) -> DocSize {
        match kind {
            MarkKind::Signature => self.signature,
            MarkKind::Initial => self.initial,
            MarkKind::Text => self.text,
        }
    }
}

impl EditorConfig {
    /// Parse a (possibly partial) JSON config and validate it
    pub fn from_json(json: &str) -> Result<Self, SignError> {
        let config: EditorConfig =
            serde_json::from_str(json).map_err(|e| SignError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn validate(&self) -> Result<(), SignError> {
        let zoom = &self.zoom;
        if !(zoom.min > 0.0 && zoom.min <= zoom.max) {
            return Err(SignError::Config(format!(
                "zoom bounds must satisfy 0 < min <= max (min={}, max={})",
                zoom.min, zoom.max
            )));
        }
        if zoom.initial < zoom.min || zoom.initial > zoom.max {
            return Err(SignError::Config(format!(
                "initial zoom {} is outside [{}, {}]",
                zoom.initial, zoom.min, zoom.max
            )));
        }
        if zoom.step <= 0.0 {
            return Err(SignError::Config("zoom step must be positive".to_string()));
        }
        if self.drag_threshold_px < 0.0 {
            return Err(SignError::Config(
                "drag threshold must not be negative".to_string(),
            ));
        }
        if self.text.font_size <= 0.0 || self.text.line_height <= 0.0 {
            return Err(SignError::Config(
                "font size and line height must be positive".to_string(),
            ));
        }
        if self.ink.canvas_width == 0 || self.ink.canvas_height == 0 {
            return Err(SignError::Config("ink canvas must not be empty".to_string()));
        }
        for (name, size) in [
            ("signature", self.sizes.signature),
            ("initial", self.sizes.initial),
            ("text", self.sizes.text),
        ] {
            if size.width <= 0.0 || size.height <= 0.0 {
                return Err(SignError::Config(format!("{} size must be positive", name)));
            }
        }
        if self.download_filename.trim().is_empty() {
            return Err(SignError::Config(
                "download filename must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_match_editor_behaviour() {
        let config = EditorConfig::default();
        assert_eq!(config.zoom.initial, 1.5);
        assert_eq!(config.drag_threshold_px, 3.0);
        assert_eq!(config.notification_ttl_ms, 3000);
        assert_eq!(config.text.font_size, 12.0);
        assert_eq!(config.download_filename, "signed_document.pdf");
        assert_eq!(config.sizes.for_kind(MarkKind::Signature), DocSize::new(200.0, 80.0));
        assert_eq!(config.sizes.for_kind(MarkKind::Initial), DocSize::new(80.0, 40.0));
        assert_eq!(config.sizes.for_kind(MarkKind::Text), DocSize::new(180.0, 40.0));
    }

    #[test]
    fn test_partial_json_keeps_other_defaults() {
        let config = EditorConfig::from_json(r#"{"dragThresholdPx":5,"text":{"fontSize":10}}"#)
            .unwrap();
        assert_eq!(config.drag_threshold_px, 5.0);
        assert_eq!(config.text.font_size, 10.0);
        assert_eq!(config.text.padding, 8.0);
        assert_eq!(config.zoom, ZoomConfig::default());
    }

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(EditorConfig::from_json("{}").unwrap(), EditorConfig::default());
    }

    #[test]
    fn test_rejects_inverted_zoom_bounds() {
        let err = EditorConfig::from_json(r#"{"zoom":{"min":3,"max":0.5,"initial":1}}"#)
            .unwrap_err();
        assert!(matches!(err, SignError::Config(_)));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            EditorConfig::from_json("{not json"),
            Err(SignError::Config(_))
        ));
    }

    #[test]
    fn test_json_roundtrip() {
        let config = EditorConfig::default();
        let json = config.to_json().unwrap();
        assert_eq!(EditorConfig::from_json(&json).unwrap(), config);
    }
}
