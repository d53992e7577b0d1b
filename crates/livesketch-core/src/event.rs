//! Drawing events: the atomic, immutable records of the event log.

use crate::tools::{ToolClass, ToolKind, ToolStyle};
use kurbo::{Circle, Line, Point, Rect};
use peniko::Color;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

/// Globally unique event identifier.
pub type EventId = Uuid;

/// Errors raised while constructing an event locally.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EventError {
    #[error("Unrecognized tool: {0}")]
    InvalidTool(String),
    #[error("Shape commit requires an anchor and a release point")]
    MissingGeometry,
    #[error("Stroke width must be positive, got {0}")]
    InvalidStrokeWidth(f64),
    #[error("Position must be finite")]
    NonFinitePosition,
    #[error("Tool {tool} cannot produce {kind:?} events")]
    IncompatibleTool { tool: ToolKind, kind: EventKind },
    #[error("Invalid color: {0}")]
    InvalidColor(String),
}

/// Identifier of a participant, supplied by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthorId(String);

impl AuthorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AuthorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Serializable color representation (RGBA8), stored as a CSS hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    /// Parse `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(s: &str) -> Result<Self, EventError> {
        let invalid = || EventError::InvalidColor(s.to_string());
        let hex = s.trim().strip_prefix('#').ok_or_else(invalid)?;
        if !hex.is_ascii() || !(hex.len() == 6 || hex.len() == 8) {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        let a = if hex.len() == 8 { channel(6)? } else { 255 };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?, a))
    }

    /// Format as `#rrggbb`, or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl TryFrom<String> for SerializableColor {
    type Error = EventError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<SerializableColor> for String {
    fn from(color: SerializableColor) -> Self {
        color.to_hex()
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Kind of a drawing event. There is no end-of-stroke marker: a stroke ends
/// where its segments stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    StrokeStart,
    StrokeSegment,
    ShapeCommit,
}

/// One discrete primitive computed from a shape commit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    Rect(Rect),
    Circle(Circle),
    Line(Line),
}

/// Anchor (pointer-down) and release (pointer-up) points of a shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeExtent {
    pub anchor: Point,
    pub release: Point,
}

impl ShapeExtent {
    pub fn new(anchor: Point, release: Point) -> Self {
        Self { anchor, release }
    }

    /// Euclidean distance from anchor to release.
    pub fn radius(&self) -> f64 {
        self.anchor.distance(self.release)
    }

    /// Primitive drawn by `tool` for this extent. Any drag direction is valid.
    pub fn primitive(&self, tool: &ToolKind) -> Option<Primitive> {
        match tool {
            ToolKind::Rectangle => Some(Primitive::Rect(Rect::from_points(
                self.anchor,
                self.release,
            ))),
            ToolKind::Circle => Some(Primitive::Circle(Circle::new(self.anchor, self.radius()))),
            ToolKind::Line => Some(Primitive::Line(Line::new(self.anchor, self.release))),
            ToolKind::Brush | ToolKind::Eraser | ToolKind::Unknown(_) => None,
        }
    }

    fn is_finite(&self) -> bool {
        is_finite(self.anchor) && is_finite(self.release)
    }
}

fn is_finite(p: Point) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

/// Milliseconds since the Unix epoch.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Per-session timestamp source that never runs backwards.
#[derive(Debug, Clone, Default)]
pub struct SessionClock {
    last: u64,
}

impl SessionClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&mut self) -> u64 {
        self.last = self.last.max(unix_millis());
        self.last
    }

    /// The most recent timestamp handed out, zero before the first.
    pub fn last(&self) -> u64 {
        self.last
    }
}

/// The atomic unit of the event log.
///
/// Fields are read-only after construction. Locally produced events go
/// through the validating constructors; events from the wire are accepted
/// as-is so that newer producers can be replayed tolerantly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingEvent {
    id: EventId,
    kind: EventKind,
    position: Point,
    color: SerializableColor,
    stroke_width: f64,
    tool: ToolKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    shape_extent: Option<ShapeExtent>,
    author_id: AuthorId,
    produced_at: u64,
}

impl DrawingEvent {
    /// Construct and validate an event.
    pub fn new(
        kind: EventKind,
        tool: ToolKind,
        position: Point,
        style: &ToolStyle,
        shape_extent: Option<ShapeExtent>,
        author_id: AuthorId,
        produced_at: u64,
    ) -> Result<Self, EventError> {
        tool.ensure_recognized()?;
        if !(style.stroke_width > 0.0 && style.stroke_width.is_finite()) {
            return Err(EventError::InvalidStrokeWidth(style.stroke_width));
        }
        if !is_finite(position) {
            return Err(EventError::NonFinitePosition);
        }
        let compatible = match (kind, tool.class()) {
            (EventKind::StrokeStart | EventKind::StrokeSegment, ToolClass::Stroke) => true,
            (EventKind::ShapeCommit, ToolClass::Shape) => true,
            _ => false,
        };
        if !compatible {
            return Err(EventError::IncompatibleTool { tool, kind });
        }
        let shape_extent = match kind {
            EventKind::ShapeCommit => {
                let extent = shape_extent.ok_or(EventError::MissingGeometry)?;
                if !extent.is_finite() {
                    return Err(EventError::NonFinitePosition);
                }
                Some(extent)
            }
            EventKind::StrokeStart | EventKind::StrokeSegment => None,
        };

        Ok(Self {
            id: Uuid::new_v4(),
            kind,
            position,
            color: style.color,
            stroke_width: style.stroke_width,
            tool,
            shape_extent,
            author_id,
            produced_at,
        })
    }

    pub fn stroke_start(
        tool: ToolKind,
        position: Point,
        style: &ToolStyle,
        author_id: AuthorId,
        produced_at: u64,
    ) -> Result<Self, EventError> {
        Self::new(
            EventKind::StrokeStart,
            tool,
            position,
            style,
            None,
            author_id,
            produced_at,
        )
    }

    pub fn stroke_segment(
        tool: ToolKind,
        position: Point,
        style: &ToolStyle,
        author_id: AuthorId,
        produced_at: u64,
    ) -> Result<Self, EventError> {
        Self::new(
            EventKind::StrokeSegment,
            tool,
            position,
            style,
            None,
            author_id,
            produced_at,
        )
    }

    /// A shape commit is positioned at its release point.
    pub fn shape_commit(
        tool: ToolKind,
        extent: Option<ShapeExtent>,
        style: &ToolStyle,
        author_id: AuthorId,
        produced_at: u64,
    ) -> Result<Self, EventError> {
        let position = extent.map(|e| e.release).unwrap_or(Point::ZERO);
        Self::new(
            EventKind::ShapeCommit,
            tool,
            position,
            style,
            extent,
            author_id,
            produced_at,
        )
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn color(&self) -> SerializableColor {
        self.color
    }

    pub fn stroke_width(&self) -> f64 {
        self.stroke_width
    }

    pub fn tool(&self) -> &ToolKind {
        &self.tool
    }

    pub fn shape_extent(&self) -> Option<&ShapeExtent> {
        self.shape_extent.as_ref()
    }

    pub fn author_id(&self) -> &AuthorId {
        &self.author_id
    }

    pub fn produced_at(&self) -> u64 {
        self.produced_at
    }

    /// Primitive for a shape commit, `None` for stroke events and for
    /// shape tools this build does not know.
    pub fn primitive(&self) -> Option<Primitive> {
        match self.kind {
            EventKind::ShapeCommit => self.shape_extent?.primitive(&self.tool),
            EventKind::StrokeStart | EventKind::StrokeSegment => None,
        }
    }

    /// Serialize the event to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize an event from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> AuthorId {
        AuthorId::new("alice")
    }

    #[test]
    fn test_stroke_start_construction() {
        let event = DrawingEvent::stroke_start(
            ToolKind::Brush,
            Point::new(3.0, 4.0),
            &ToolStyle::default(),
            alice(),
            10,
        )
        .unwrap();
        assert_eq!(event.kind(), EventKind::StrokeStart);
        assert_eq!(event.position(), Point::new(3.0, 4.0));
        assert!(event.shape_extent().is_none());
        assert_eq!(event.author_id(), &alice());
    }

    #[test]
    fn test_ids_are_unique() {
        let style = ToolStyle::default();
        let a = DrawingEvent::stroke_start(ToolKind::Brush, Point::ZERO, &style, alice(), 0).unwrap();
        let b = DrawingEvent::stroke_start(ToolKind::Brush, Point::ZERO, &style, alice(), 0).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_rejects_non_positive_width() {
        let style = ToolStyle::new(SerializableColor::black(), 0.0);
        let err = DrawingEvent::stroke_start(ToolKind::Brush, Point::ZERO, &style, alice(), 0)
            .unwrap_err();
        assert_eq!(err, EventError::InvalidStrokeWidth(0.0));

        let style = ToolStyle::new(SerializableColor::black(), f64::NAN);
        assert!(matches!(
            DrawingEvent::stroke_start(ToolKind::Brush, Point::ZERO, &style, alice(), 0),
            Err(EventError::InvalidStrokeWidth(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_tool() {
        let err = DrawingEvent::stroke_start(
            ToolKind::Unknown("spray".into()),
            Point::ZERO,
            &ToolStyle::default(),
            alice(),
            0,
        )
        .unwrap_err();
        assert_eq!(err, EventError::InvalidTool("spray".into()));
    }

    #[test]
    fn test_shape_commit_requires_geometry() {
        let err = DrawingEvent::shape_commit(
            ToolKind::Rectangle,
            None,
            &ToolStyle::default(),
            alice(),
            0,
        )
        .unwrap_err();
        assert_eq!(err, EventError::MissingGeometry);
    }

    #[test]
    fn test_tool_must_match_kind() {
        let extent = ShapeExtent::new(Point::ZERO, Point::new(1.0, 1.0));
        assert!(matches!(
            DrawingEvent::shape_commit(ToolKind::Brush, Some(extent), &ToolStyle::default(), alice(), 0),
            Err(EventError::IncompatibleTool { .. })
        ));
        assert!(matches!(
            DrawingEvent::stroke_start(ToolKind::Circle, Point::ZERO, &ToolStyle::default(), alice(), 0),
            Err(EventError::IncompatibleTool { .. })
        ));
    }

    #[test]
    fn test_rectangle_primitive_any_direction() {
        let forward = ShapeExtent::new(Point::new(10.0, 10.0), Point::new(50.0, 40.0));
        match forward.primitive(&ToolKind::Rectangle) {
            Some(Primitive::Rect(r)) => assert_eq!(r, Rect::new(10.0, 10.0, 50.0, 40.0)),
            other => panic!("expected rect, got {other:?}"),
        }

        let backward = ShapeExtent::new(Point::new(10.0, 10.0), Point::new(5.0, 5.0));
        match backward.primitive(&ToolKind::Rectangle) {
            Some(Primitive::Rect(r)) => {
                assert_eq!(r, Rect::new(5.0, 5.0, 10.0, 10.0));
                assert!((r.width() - 5.0).abs() < f64::EPSILON);
                assert!((r.height() - 5.0).abs() < f64::EPSILON);
            }
            other => panic!("expected rect, got {other:?}"),
        }
    }

    #[test]
    fn test_circle_radius_from_extent() {
        let extent = ShapeExtent::new(Point::new(0.0, 0.0), Point::new(3.0, 4.0));
        assert!((extent.radius() - 5.0).abs() < f64::EPSILON);
        match extent.primitive(&ToolKind::Circle) {
            Some(Primitive::Circle(c)) => {
                assert_eq!(c.center, Point::ZERO);
                assert!((c.radius - 5.0).abs() < f64::EPSILON);
            }
            other => panic!("expected circle, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_shape_tool_has_no_primitive() {
        let extent = ShapeExtent::new(Point::ZERO, Point::new(1.0, 1.0));
        assert!(extent.primitive(&ToolKind::Unknown("star".into())).is_none());
    }

    #[test]
    fn test_color_hex() {
        let c = SerializableColor::from_hex("#ff8000").unwrap();
        assert_eq!(c, SerializableColor::new(255, 128, 0, 255));
        assert_eq!(c.to_hex(), "#ff8000");

        let c = SerializableColor::from_hex("#00000080").unwrap();
        assert_eq!(c.a, 128);
        assert_eq!(c.to_hex(), "#00000080");

        assert!(SerializableColor::from_hex("red").is_err());
        assert!(SerializableColor::from_hex("#12345").is_err());
    }

    #[test]
    fn test_wire_format() {
        let extent = ShapeExtent::new(Point::new(1.0, 2.0), Point::new(3.0, 4.0));
        let event = DrawingEvent::shape_commit(
            ToolKind::Line,
            Some(extent),
            &ToolStyle::default(),
            alice(),
            42,
        )
        .unwrap();
        let json: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(json["kind"], "shape_commit");
        assert_eq!(json["tool"], "line");
        assert_eq!(json["color"], "#000000");
        assert_eq!(json["author_id"], "alice");
        assert_eq!(json["shape_extent"]["release"]["x"], 3.0);
    }

    #[test]
    fn test_foreign_event_deserializes() {
        let json = r##"{
            "id": "6f1c2b7e-51a4-4c1e-9a55-0a0a5d1c9e11",
            "kind": "stroke_segment",
            "position": {"x": 1.0, "y": 2.0},
            "color": "#112233",
            "stroke_width": 3.0,
            "tool": "airbrush",
            "author_id": "bob",
            "produced_at": 7
        }"##;
        let event = DrawingEvent::from_json(json).unwrap();
        assert_eq!(event.tool(), &ToolKind::Unknown("airbrush".into()));
        assert!(event.primitive().is_none());
    }

    #[test]
    fn test_session_clock_is_monotonic() {
        let mut clock = SessionClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
