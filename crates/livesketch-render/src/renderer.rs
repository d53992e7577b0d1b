//! Event renderer and the surface abstraction it draws on.

use kurbo::{BezPath, Point, Rect, Shape};
use livesketch_core::{AuthorId, DrawingEvent, EventKind, Primitive, Repaint, ToolKind};
use peniko::{Color, Compose};
use std::collections::HashMap;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Invalid surface size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
    #[error("Surface error: {0}")]
    Surface(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Flattening tolerance for shape outlines, in canvas units.
const PATH_TOLERANCE: f64 = 0.01;

/// How one stroke is painted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paint {
    pub color: Color,
    pub width: f64,
    /// `SrcOver` for ink, `DestOut` for the eraser.
    pub compose: Compose,
}

impl Paint {
    /// Paint for an event, or `None` if its width cannot be drawn.
    pub fn from_event(event: &DrawingEvent) -> Option<Self> {
        let width = event.stroke_width();
        if !(width > 0.0 && width.is_finite()) {
            return None;
        }
        let compose = match event.tool() {
            ToolKind::Eraser => Compose::DestOut,
            _ => Compose::SrcOver,
        };
        Some(Self {
            color: event.color().into(),
            width,
            compose,
        })
    }
}

/// Something strokes can be painted on.
///
/// Strokes are round-capped and round-joined.
pub trait DrawingSurface {
    /// Size in pixels.
    fn size(&self) -> (u32, u32);

    /// Erase everything.
    fn clear(&mut self);

    /// Paint one straight segment.
    fn stroke_segment(&mut self, from: Point, to: Point, paint: &Paint);

    /// Paint the outline of a path as a single mark.
    fn stroke_path(&mut self, path: &BezPath, paint: &Paint);
}

/// Maps events to surface operations.
///
/// Holds the open path of every author, so interleaved strokes from several
/// participants never connect to each other.
#[derive(Debug, Default)]
pub struct Renderer {
    open_paths: HashMap<AuthorId, Point>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `author` has a path that segments would extend.
    pub fn has_open_path(&self, author: &AuthorId) -> bool {
        self.open_paths.contains_key(author)
    }

    /// Forget all open paths.
    pub fn reset(&mut self) {
        self.open_paths.clear();
    }

    /// Paint a single event on top of the current surface.
    pub fn apply<S: DrawingSurface + ?Sized>(&mut self, surface: &mut S, event: &DrawingEvent) {
        match event.kind() {
            EventKind::StrokeStart => {
                if !event.tool().is_stroke_tool() {
                    log::debug!("Skipping stroke start with tool {}", event.tool());
                    return;
                }
                self.open_paths
                    .insert(event.author_id().clone(), event.position());
            }
            EventKind::StrokeSegment => {
                if !event.tool().is_stroke_tool() {
                    log::debug!("Skipping stroke segment with tool {}", event.tool());
                    return;
                }
                let Some(last) = self.open_paths.get_mut(event.author_id()) else {
                    log::debug!("Segment from {} with no open path", event.author_id());
                    return;
                };
                let from = std::mem::replace(last, event.position());
                if let Some(paint) = Paint::from_event(event) {
                    surface.stroke_segment(from, event.position(), &paint);
                }
            }
            EventKind::ShapeCommit => {
                // A shape is its own interaction.
                self.open_paths.remove(event.author_id());
                let (Some(primitive), Some(paint)) = (event.primitive(), Paint::from_event(event))
                else {
                    log::debug!("Skipping shape commit with tool {}", event.tool());
                    return;
                };
                let (w, h) = surface.size();
                let half = paint.width / 2.0;
                let reach = primitive_bounds(&primitive).inflate(half, half);
                if reach.intersect(Rect::new(0.0, 0.0, w as f64, h as f64)).area() <= 0.0 {
                    log::trace!("Shape {} lies outside the surface", event.id());
                    return;
                }
                surface.stroke_path(&primitive_path(&primitive), &paint);
            }
        }
    }

    /// Clear the surface and paint `events` in order.
    pub fn replay<S: DrawingSurface + ?Sized>(&mut self, surface: &mut S, events: &[DrawingEvent]) {
        surface.clear();
        self.reset();
        for event in events {
            self.apply(surface, event);
        }
        log::debug!("Replayed {} events", events.len());
    }

    /// Carry out a repaint decision.
    pub fn present<S: DrawingSurface + ?Sized>(&mut self, surface: &mut S, repaint: &Repaint) {
        match repaint {
            Repaint::None => {}
            Repaint::Incremental(events) => {
                for event in events {
                    self.apply(surface, event);
                }
            }
            Repaint::Full(events) => self.replay(surface, events),
        }
    }
}

fn primitive_bounds(primitive: &Primitive) -> Rect {
    match primitive {
        Primitive::Rect(rect) => rect.bounding_box(),
        Primitive::Circle(circle) => circle.bounding_box(),
        Primitive::Line(line) => line.bounding_box(),
    }
}

fn primitive_path(primitive: &Primitive) -> BezPath {
    match primitive {
        Primitive::Rect(rect) => rect.to_path(PATH_TOLERANCE),
        Primitive::Circle(circle) => circle.to_path(PATH_TOLERANCE),
        Primitive::Line(line) => line.to_path(PATH_TOLERANCE),
    }
}
