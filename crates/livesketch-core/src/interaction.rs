//! Interaction controller: pointer input to drawing events.

use crate::event::{AuthorId, DrawingEvent, EventError, SerializableColor, SessionClock, ShapeExtent};
use crate::tools::{ToolKind, ToolStyle};
use kurbo::Point;

/// State of the pointer interaction.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InteractionState {
    /// Waiting for pointer-down.
    #[default]
    Idle,
    /// A stroke tool is held down.
    Active {
        /// Last sampled pointer position.
        last: Point,
    },
    /// A shape tool is held down.
    Anchoring {
        /// Pointer-down position.
        anchor: Point,
        /// Latest pointer position, used when the interaction is cut short.
        current: Point,
    },
}

/// What an input step produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    StrokeStarted(DrawingEvent),
    StrokeExtended(DrawingEvent),
    /// The open stroke is done; no event, the boundary is the state machine's.
    StrokeFinished,
    ShapeCommitted(DrawingEvent),
}

/// Turns pointer callbacks into events according to the active tool.
///
/// Tool switches and the pointer leaving the surface finalize an open
/// interaction exactly like pointer-up, so no path is ever left open.
#[derive(Debug, Clone)]
pub struct InteractionController {
    tool: ToolKind,
    style: ToolStyle,
    state: InteractionState,
    clock: SessionClock,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new(ToolKind::default(), ToolStyle::default())
    }
}

impl InteractionController {
    pub fn new(tool: ToolKind, style: ToolStyle) -> Self {
        Self {
            tool,
            style,
            state: InteractionState::Idle,
            clock: SessionClock::new(),
        }
    }

    pub fn tool(&self) -> &ToolKind {
        &self.tool
    }

    pub fn style(&self) -> &ToolStyle {
        &self.style
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == InteractionState::Idle
    }

    pub fn set_color(&mut self, color: SerializableColor) {
        self.style.color = color;
    }

    pub fn set_stroke_width(&mut self, width: f64) -> Result<(), EventError> {
        if !(width > 0.0 && width.is_finite()) {
            return Err(EventError::InvalidStrokeWidth(width));
        }
        self.style.stroke_width = width;
        Ok(())
    }

    /// Switch tools, finalizing whatever is open with the previous one.
    pub fn set_tool(
        &mut self,
        tool: ToolKind,
        author: &AuthorId,
    ) -> Result<Option<Gesture>, EventError> {
        tool.ensure_recognized()?;
        let finalized = self.finalize(author);
        self.tool = tool;
        finalized
    }

    /// Switch tools without an author to commit as. An open interaction is
    /// dropped, never finalized.
    pub fn select_tool(&mut self, tool: ToolKind) -> Result<(), EventError> {
        tool.ensure_recognized()?;
        if !self.is_idle() {
            log::debug!("Dropping open {} interaction on tool switch", self.tool);
            self.cancel();
        }
        self.tool = tool;
        Ok(())
    }

    pub fn clock(&self) -> &SessionClock {
        &self.clock
    }

    pub fn pointer_down(
        &mut self,
        position: Point,
        author: &AuthorId,
    ) -> Result<Option<Gesture>, EventError> {
        if !self.is_idle() {
            log::debug!("Ignoring pointer-down while {:?}", self.state);
            return Ok(None);
        }
        match self.tool {
            ToolKind::Brush | ToolKind::Eraser => {
                let event = DrawingEvent::stroke_start(
                    self.tool.clone(),
                    position,
                    &self.style,
                    author.clone(),
                    self.clock.now(),
                )?;
                self.state = InteractionState::Active { last: position };
                Ok(Some(Gesture::StrokeStarted(event)))
            }
            ToolKind::Rectangle | ToolKind::Circle | ToolKind::Line => {
                self.state = InteractionState::Anchoring {
                    anchor: position,
                    current: position,
                };
                Ok(None)
            }
            ToolKind::Unknown(ref name) => Err(EventError::InvalidTool(name.clone())),
        }
    }

    pub fn pointer_move(
        &mut self,
        position: Point,
        author: &AuthorId,
    ) -> Result<Option<Gesture>, EventError> {
        match self.state {
            InteractionState::Idle => Ok(None),
            InteractionState::Active { .. } => {
                let event = DrawingEvent::stroke_segment(
                    self.tool.clone(),
                    position,
                    &self.style,
                    author.clone(),
                    self.clock.now(),
                )?;
                self.state = InteractionState::Active { last: position };
                Ok(Some(Gesture::StrokeExtended(event)))
            }
            InteractionState::Anchoring { anchor, .. } => {
                self.state = InteractionState::Anchoring {
                    anchor,
                    current: position,
                };
                Ok(None)
            }
        }
    }

    pub fn pointer_up(
        &mut self,
        position: Point,
        author: &AuthorId,
    ) -> Result<Option<Gesture>, EventError> {
        match std::mem::take(&mut self.state) {
            InteractionState::Idle => Ok(None),
            InteractionState::Active { .. } => Ok(Some(Gesture::StrokeFinished)),
            InteractionState::Anchoring { anchor, .. } => {
                let event = DrawingEvent::shape_commit(
                    self.tool.clone(),
                    Some(ShapeExtent::new(anchor, position)),
                    &self.style,
                    author.clone(),
                    self.clock.now(),
                )?;
                Ok(Some(Gesture::ShapeCommitted(event)))
            }
        }
    }

    /// The pointer left the drawing surface.
    pub fn pointer_leave(
        &mut self,
        position: Point,
        author: &AuthorId,
    ) -> Result<Option<Gesture>, EventError> {
        self.pointer_up(position, author)
    }

    /// Close the open interaction at the last known pointer position.
    pub fn finalize(&mut self, author: &AuthorId) -> Result<Option<Gesture>, EventError> {
        let position = match self.state {
            InteractionState::Idle => return Ok(None),
            InteractionState::Active { last } => last,
            InteractionState::Anchoring { current, .. } => current,
        };
        self.pointer_up(position, author)
    }

    /// Drop the open interaction without producing anything.
    pub fn cancel(&mut self) {
        self.state = InteractionState::Idle;
    }
}
