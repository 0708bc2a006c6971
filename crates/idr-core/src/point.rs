//! Data points of a 2-D embedding.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::protocol::PointRecord;

/// Identifier of a data point. Assigned once at ingestion and never reused.
pub type PointId = String;

/// Default fill color for points without a usable label.
pub const DEFAULT_COLOR: &str = "black";
/// Default circle radius.
pub const DEFAULT_RADIUS: f64 = 5.0;
/// Colors picked by numeric class label.
pub const LABEL_PALETTE: [&str; 3] = ["red", "green", "blue"];

/// Generate a fresh point id.
pub fn generate_point_id() -> PointId {
    Uuid::new_v4().to_string()
}

/// A single point of the layout.
///
/// `x_val`/`y_val` are the domain coordinates as pushed by the server and are
/// never touched by interaction. `x`/`y` are the display coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub id: PointId,
    pub x_val: f64,
    pub y_val: f64,
    pub x: f64,
    pub y: f64,
    pub label: String,
    pub color: String,
    pub radius: f64,
}

impl DataPoint {
    /// Create a point whose display position starts at its domain position.
    pub fn new(id: impl Into<PointId>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            x_val: x,
            y_val: y,
            x,
            y,
            label: String::new(),
            color: DEFAULT_COLOR.to_string(),
            radius: DEFAULT_RADIUS,
        }
    }

    /// Ingest a wire record. Missing ids are generated, display is seeded
    /// from the domain coordinates.
    pub fn from_record(record: PointRecord) -> Self {
        let id = record
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(generate_point_id);
        let label = record.label.unwrap_or_default();
        let color = record
            .color
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| color_for_label(&label).to_string());

        Self {
            id,
            x_val: record.x,
            y_val: record.y,
            x: record.x,
            y: record.y,
            label,
            color,
            radius: record.radius.filter(|r| *r > 0.0).unwrap_or(DEFAULT_RADIUS),
        }
    }

    /// Builder-style label setter.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self.color = color_for_label(&self.label).to_string();
        self
    }

    /// Current display position.
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Domain position as received from the server.
    pub fn domain_position(&self) -> Point {
        Point::new(self.x_val, self.y_val)
    }

    /// Copy of this point with the display position shifted by `delta`.
    pub fn translated(&self, delta: Vec2) -> Self {
        Self {
            x: self.x + delta.x,
            y: self.y + delta.y,
            ..self.clone()
        }
    }
}

/// Palette color for a class label, or the default color.
pub fn color_for_label(label: &str) -> &'static str {
    label
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|idx| LABEL_PALETTE.get(idx).copied())
        .unwrap_or(DEFAULT_COLOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_seeded_from_domain() {
        let record = PointRecord {
            id: Some("p".to_string()),
            x: 1.5,
            y: -2.0,
            ..Default::default()
        };
        let point = DataPoint::from_record(record);
        assert_eq!(point.position(), Point::new(1.5, -2.0));
        assert_eq!(point.domain_position(), point.position());
        assert_eq!(point.radius, DEFAULT_RADIUS);
    }

    #[test]
    fn test_missing_id_is_generated() {
        let a = DataPoint::from_record(PointRecord::default());
        let b = DataPoint::from_record(PointRecord {
            id: Some(String::new()),
            ..Default::default()
        });
        assert!(!a.id.is_empty());
        assert!(!b.id.is_empty());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_label_color() {
        assert_eq!(color_for_label("0"), "red");
        assert_eq!(color_for_label("2"), "blue");
        assert_eq!(color_for_label("7"), DEFAULT_COLOR);
        assert_eq!(color_for_label("setosa"), DEFAULT_COLOR);

        let record = PointRecord {
            label: Some("1".to_string()),
            color: Some("#ff00ff".to_string()),
            ..Default::default()
        };
        assert_eq!(DataPoint::from_record(record).color, "#ff00ff");
    }

    #[test]
    fn test_translate_keeps_domain() {
        let point = DataPoint::new("p", 1.0, 1.0);
        let moved = point.translated(Vec2::new(2.0, -3.0));
        assert_eq!(moved.position(), Point::new(3.0, -2.0));
        assert_eq!(moved.domain_position(), Point::new(1.0, 1.0));
    }
}
