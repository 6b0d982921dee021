//! Snapshot data model.
//!
//! A `Snapshot` is a structured, point-in-time extraction of a page's
//! interactive elements plus diagnostics about how reliable that extraction
//! is believed to be. Snapshots are immutable once returned by a source and
//! belong to exactly one capture attempt. Element ids are only meaningful
//! within the snapshot that produced them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Roles the runtime treats as directly operable by a user.
const ACTIONABLE_ROLES: &[&str] = &[
    "button",
    "link",
    "textbox",
    "searchbox",
    "combobox",
    "checkbox",
    "radio",
    "switch",
    "slider",
    "option",
    "menuitem",
    "tab",
];

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotStatus {
    Success,
    Error,
}

/// Point-in-time extraction of a page's interactive elements.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub status: SnapshotStatus,
    pub url: String,
    #[serde(default)]
    pub elements: Vec<Element>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<SnapshotDiagnostics>,
}

impl Snapshot {
    pub fn success(url: impl Into<String>, elements: Vec<Element>) -> Self {
        Self {
            status: SnapshotStatus::Success,
            url: url.into(),
            elements,
            timestamp: Utc::now(),
            diagnostics: None,
        }
    }

    /// Degraded snapshot for a capture that ran but could not extract.
    pub fn error(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            status: SnapshotStatus::Error,
            url: url.into(),
            elements: Vec::new(),
            timestamp: Utc::now(),
            diagnostics: Some(SnapshotDiagnostics::new(0.0).with_reason(reason)),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: SnapshotDiagnostics) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == SnapshotStatus::Success
    }

    /// Extraction confidence, when the source reported diagnostics.
    pub fn confidence(&self) -> Option<f64> {
        self.diagnostics.as_ref().map(|d| d.confidence)
    }

    pub fn element(&self, id: u64) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn actionable_count(&self) -> usize {
        self.elements.iter().filter(|e| e.is_actionable()).count()
    }
}

/// One extracted page element. `id` is unique within its snapshot and stable
/// across identical DOM states, nothing more.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Element {
    pub id: u64,
    pub role: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub importance: f64,
    #[serde(default)]
    pub bbox: BoundingBox,
    #[serde(default)]
    pub visual_cues: VisualCues,
    #[serde(default = "default_true")]
    pub in_viewport: bool,
    #[serde(default)]
    pub is_occluded: bool,
    #[serde(default)]
    pub z_index: i32,
}

fn default_true() -> bool {
    true
}

impl Element {
    pub fn new(id: u64, role: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id,
            role: role.into(),
            text: text.into(),
            importance: 0.0,
            bbox: BoundingBox::default(),
            visual_cues: VisualCues::default(),
            in_viewport: true,
            is_occluded: false,
            z_index: 0,
        }
    }

    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = bbox;
        self
    }

    pub fn with_importance(mut self, importance: f64) -> Self {
        self.importance = importance;
        self
    }

    pub fn occluded(mut self) -> Self {
        self.is_occluded = true;
        self
    }

    pub fn offscreen(mut self) -> Self {
        self.in_viewport = false;
        self
    }

    /// Role a user could operate, regardless of current visibility.
    pub fn has_actionable_role(&self) -> bool {
        ACTIONABLE_ROLES.contains(&self.role.as_str())
    }

    /// Operable role, on screen, and not covered by another element.
    pub fn is_actionable(&self) -> bool {
        self.in_viewport && !self.is_occluded && self.has_actionable_role()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Render-level hints the extractor attaches to an element.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct VisualCues {
    #[serde(default)]
    pub pointer_cursor: bool,
    #[serde(default)]
    pub bordered: bool,
    #[serde(default)]
    pub contrast_background: bool,
}

/// How trustworthy the extraction is, 0.0 (blind) to 1.0 (complete).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SnapshotDiagnostics {
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
    #[serde(default)]
    pub metrics: SnapshotMetrics,
}

impl SnapshotDiagnostics {
    pub fn new(confidence: f64) -> Self {
        Self {
            confidence,
            reasons: Vec::new(),
            metrics: SnapshotMetrics::default(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reasons.push(reason.into());
        self
    }

    pub fn with_metrics(mut self, metrics: SnapshotMetrics) -> Self {
        self.metrics = metrics;
        self
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct SnapshotMetrics {
    #[serde(default)]
    pub extraction_ms: u64,
    #[serde(default)]
    pub dom_nodes: u32,
    #[serde(default)]
    pub candidates: u32,
}
