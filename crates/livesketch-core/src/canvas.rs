//! Live canvas session: interaction, session log and sync wired together.

use crate::drawing::{Drawing, DrawingId, DrawingUpdate};
use crate::error::{CanvasError, Notice};
use crate::event::{AuthorId, DrawingEvent, EventError, SerializableColor};
use crate::gateway::SyncGateway;
use crate::interaction::{Gesture, InteractionController};
use crate::session::{SessionError, SessionLog};
use crate::storage::DocumentStore;
use crate::sync::EventStore;
use crate::tools::{ToolKind, ToolStyle};
use kurbo::Point;

/// How the drawing surface has to be brought up to date.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Repaint {
    #[default]
    None,
    /// Apply these events on top of what is already painted.
    Incremental(Vec<DrawingEvent>),
    /// Clear the surface and replay these events from scratch.
    Full(Vec<DrawingEvent>),
}

impl Repaint {
    pub fn is_none(&self) -> bool {
        matches!(self, Repaint::None)
    }
}

/// Outcome of one canvas operation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CanvasUpdate {
    pub repaint: Repaint,
    pub notices: Vec<Notice>,
}

impl CanvasUpdate {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn incremental(events: Vec<DrawingEvent>) -> Self {
        if events.is_empty() {
            return Self::none();
        }
        Self {
            repaint: Repaint::Incremental(events),
            notices: Vec::new(),
        }
    }

    pub fn full(events: Vec<DrawingEvent>) -> Self {
        Self {
            repaint: Repaint::Full(events),
            notices: Vec::new(),
        }
    }

    pub fn notice(notice: Notice) -> Self {
        Self {
            repaint: Repaint::None,
            notices: vec![notice],
        }
    }

    pub fn with_notice(mut self, notice: Notice) -> Self {
        self.notices.push(notice);
        self
    }

    fn with_errors(mut self, errors: Vec<CanvasError>) -> Self {
        self.notices.extend(errors.into_iter().map(Notice::from));
        self
    }
}

/// One participant's live session on one drawing.
///
/// All methods run on the caller's thread. Pointer callbacks never fail:
/// whatever goes wrong comes back as a notice on the returned update.
pub struct Canvas<E: EventStore> {
    drawing_id: DrawingId,
    title: String,
    author: Option<AuthorId>,
    log: SessionLog,
    controller: InteractionController,
    gateway: SyncGateway<E>,
}

impl<E: EventStore> Canvas<E> {
    /// Open a live session on `drawing` and subscribe to its events.
    ///
    /// The stored snapshot is not loaded; call [`Canvas::hydrate`] with it.
    pub fn new(drawing: &Drawing, author: Option<AuthorId>, store: E) -> Result<Self, CanvasError> {
        let mut gateway = SyncGateway::new(store, drawing.id, author.clone());
        gateway.connect()?;
        if author.is_none() {
            log::info!("No identity for drawing {}, opening read-only", drawing.id);
        }
        Ok(Self {
            drawing_id: drawing.id,
            title: drawing.title.clone(),
            author,
            log: SessionLog::new(),
            controller: InteractionController::default(),
            gateway,
        })
    }

    pub fn drawing_id(&self) -> DrawingId {
        self.drawing_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> Option<&AuthorId> {
        self.author.as_ref()
    }

    pub fn is_read_only(&self) -> bool {
        self.author.is_none()
    }

    pub fn tool(&self) -> &ToolKind {
        self.controller.tool()
    }

    pub fn style(&self) -> &ToolStyle {
        self.controller.style()
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn session(&self) -> &SessionLog {
        &self.log
    }

    pub fn gateway(&self) -> &SyncGateway<E> {
        &self.gateway
    }

    /// The committed log.
    pub fn snapshot(&self) -> &[DrawingEvent] {
        self.log.snapshot()
    }

    pub fn pointer_down(&mut self, position: Point) -> CanvasUpdate {
        let Some(author) = self.author.clone() else {
            return CanvasUpdate::notice(CanvasError::NotAuthenticated.into());
        };
        let result = self.controller.pointer_down(position, &author);
        self.handle(result)
    }

    pub fn pointer_move(&mut self, position: Point) -> CanvasUpdate {
        let Some(author) = self.author.clone() else {
            return CanvasUpdate::none();
        };
        let result = self.controller.pointer_move(position, &author);
        self.handle(result)
    }

    pub fn pointer_up(&mut self, position: Point) -> CanvasUpdate {
        let Some(author) = self.author.clone() else {
            return CanvasUpdate::none();
        };
        let result = self.controller.pointer_up(position, &author);
        self.handle(result)
    }

    pub fn pointer_leave(&mut self, position: Point) -> CanvasUpdate {
        let Some(author) = self.author.clone() else {
            return CanvasUpdate::none();
        };
        let result = self.controller.pointer_leave(position, &author);
        self.handle(result)
    }

    /// Switch tools. An open interaction is finalized first.
    pub fn set_tool(&mut self, tool: ToolKind) -> CanvasUpdate {
        match self.author.clone() {
            Some(author) => {
                let result = self.controller.set_tool(tool, &author);
                self.handle(result)
            }
            None => match self.controller.select_tool(tool) {
                Ok(()) => CanvasUpdate::none(),
                Err(e) => self.rejected(e),
            },
        }
    }

    pub fn set_color(&mut self, color: SerializableColor) -> CanvasUpdate {
        self.controller.set_color(color);
        CanvasUpdate::none()
    }

    pub fn set_stroke_width(&mut self, width: f64) -> CanvasUpdate {
        match self.controller.set_stroke_width(width) {
            Ok(()) => CanvasUpdate::none(),
            Err(e) => self.rejected(e),
        }
    }

    /// Ingest whatever the event store delivered since the last poll.
    pub fn poll_remote(&mut self) -> CanvasUpdate {
        let inbound = self.gateway.poll();
        let accepted: Vec<DrawingEvent> = inbound
            .remote
            .into_iter()
            .filter(|event| self.log.ingest_remote(event.clone()))
            .collect();
        if !accepted.is_empty() {
            log::debug!("Ingested {} remote events", accepted.len());
        }
        CanvasUpdate::incremental(accepted).with_errors(inbound.failures)
    }

    /// Reset the log. The stored drawing is untouched until the next save.
    pub fn clear(&mut self) -> CanvasUpdate {
        self.controller.cancel();
        self.log.reset();
        log::info!("Cleared drawing {}", self.drawing_id);
        CanvasUpdate::full(Vec::new()).with_notice(Notice::success("Canvas cleared!"))
    }

    /// Load a stored snapshot and repaint everything.
    pub fn hydrate(&mut self, events: Vec<DrawingEvent>) -> CanvasUpdate {
        self.log.hydrate(events);
        log::info!(
            "Hydrated drawing {} with {} events",
            self.drawing_id,
            self.log.len()
        );
        CanvasUpdate::full(self.log.replay_sequence())
    }

    /// Write the committed log back as the drawing's snapshot.
    pub async fn save<S: DocumentStore + ?Sized>(
        &self,
        docs: &S,
    ) -> Result<CanvasUpdate, CanvasError> {
        if self.author.is_none() {
            return Err(CanvasError::NotAuthenticated);
        }
        let update = DrawingUpdate::new(self.log.snapshot().to_vec());
        docs.update_drawing(self.drawing_id, update)
            .await
            .map_err(|e| {
                log::error!("Failed to save drawing {}: {}", self.drawing_id, e);
                CanvasError::PersistenceFailure(e.to_string())
            })?;
        log::info!(
            "Saved drawing {} ({} events)",
            self.drawing_id,
            self.log.len()
        );
        Ok(CanvasUpdate::notice(Notice::success("Drawing saved!")))
    }

    fn handle(&mut self, result: Result<Option<Gesture>, EventError>) -> CanvasUpdate {
        match result {
            Ok(Some(gesture)) => self.apply(gesture),
            Ok(None) => CanvasUpdate::none(),
            Err(e) => self.rejected(e),
        }
    }

    fn apply(&mut self, gesture: Gesture) -> CanvasUpdate {
        match gesture {
            Gesture::StrokeStarted(event) => match self.log.begin_interaction(event.clone()) {
                Ok(()) => CanvasUpdate::incremental(vec![event]),
                Err(e) => self.out_of_step(e),
            },
            Gesture::StrokeExtended(event) => match self.log.extend_interaction(event.clone()) {
                Ok(()) => CanvasUpdate::incremental(vec![event]),
                Err(e) => self.out_of_step(e),
            },
            Gesture::StrokeFinished => match self.log.end_interaction() {
                Ok(batch) => {
                    let failures = self.gateway.persist(&batch);
                    CanvasUpdate::none().with_errors(failures)
                }
                Err(e) => self.out_of_step(e),
            },
            Gesture::ShapeCommitted(event) => match self.log.commit_shape(event.clone()) {
                Ok(()) => {
                    let failures = self.gateway.persist(std::slice::from_ref(&event));
                    CanvasUpdate::incremental(vec![event]).with_errors(failures)
                }
                Err(e) => self.out_of_step(e),
            },
        }
    }

    fn rejected(&self, err: EventError) -> CanvasUpdate {
        log::warn!("Rejected input: {}", err);
        CanvasUpdate::notice(CanvasError::from(err).into())
    }

    /// The controller and the log disagree about the open interaction.
    fn out_of_step(&mut self, err: SessionError) -> CanvasUpdate {
        if cfg!(debug_assertions) {
            panic!("Session log rejected controller transition: {err}");
        }
        log::warn!("Ignoring out-of-step interaction: {}", err);
        self.controller.cancel();
        CanvasUpdate::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NoticeLevel;
    use crate::event::EventKind;
    use crate::storage::{MemoryStorage, block_on};
    use crate::sync::{MemoryEventHub, MemoryEventStore};

    fn open(hub: &MemoryEventHub, drawing: &Drawing, author: Option<&str>) -> Canvas<MemoryEventStore> {
        let mut canvas = Canvas::new(drawing, author.map(AuthorId::new), hub.client()).unwrap();
        canvas.poll_remote();
        canvas
    }

    fn drawing() -> Drawing {
        Drawing::new("Test", AuthorId::new("alice"))
    }

    fn draw_stroke(canvas: &mut Canvas<MemoryEventStore>, points: &[(f64, f64)]) {
        let (x, y) = points[0];
        canvas.pointer_down(Point::new(x, y));
        for &(x, y) in &points[1..] {
            canvas.pointer_move(Point::new(x, y));
        }
        let (x, y) = points[points.len() - 1];
        canvas.pointer_up(Point::new(x, y));
    }

    #[test]
    fn test_stroke_renders_live_and_persists_on_release() {
        let hub = MemoryEventHub::new();
        let drawing = drawing();
        let mut canvas = open(&hub, &drawing, Some("alice"));

        let update = canvas.pointer_down(Point::new(1.0, 1.0));
        assert!(matches!(update.repaint, Repaint::Incremental(ref e) if e.len() == 1));
        let update = canvas.pointer_move(Point::new(5.0, 5.0));
        assert!(matches!(update.repaint, Repaint::Incremental(ref e) if e[0].kind() == EventKind::StrokeSegment));
        assert!(hub.events(drawing.id).is_empty());
        assert!(canvas.snapshot().is_empty());

        let update = canvas.pointer_up(Point::new(5.0, 5.0));
        assert!(update.repaint.is_none());
        assert!(update.notices.is_empty());
        assert_eq!(canvas.snapshot().len(), 2);
        assert_eq!(hub.events(drawing.id).len(), 2);
    }

    #[test]
    fn test_shape_persists_immediately() {
        let hub = MemoryEventHub::new();
        let drawing = drawing();
        let mut canvas = open(&hub, &drawing, Some("alice"));
        canvas.set_tool(ToolKind::Rectangle);

        assert!(canvas.pointer_down(Point::new(10.0, 10.0)).repaint.is_none());
        let update = canvas.pointer_up(Point::new(50.0, 40.0));
        assert!(matches!(update.repaint, Repaint::Incremental(ref e) if e[0].kind() == EventKind::ShapeCommit));
        assert_eq!(hub.events(drawing.id).len(), 1);
    }

    #[test]
    fn test_read_only_without_identity() {
        let hub = MemoryEventHub::new();
        let drawing = drawing();
        let mut canvas = open(&hub, &drawing, None);

        let update = canvas.pointer_down(Point::ZERO);
        assert_eq!(update.notices, vec![Notice::error("Sign in to draw")]);
        assert!(canvas.pointer_move(Point::new(1.0, 1.0)).repaint.is_none());
        assert!(canvas.pointer_up(Point::new(1.0, 1.0)).repaint.is_none());
        assert!(canvas.snapshot().is_empty());

        let result = block_on(canvas.save(&MemoryStorage::new()));
        assert_eq!(result, Err(CanvasError::NotAuthenticated));
    }

    #[test]
    fn test_remote_events_are_ingested_once() {
        let hub = MemoryEventHub::new();
        let drawing = drawing();
        let mut alice = open(&hub, &drawing, Some("alice"));
        let mut bob = open(&hub, &drawing, Some("bob"));

        draw_stroke(&mut bob, &[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]);
        assert!(bob.poll_remote().repaint.is_none());

        let update = alice.poll_remote();
        assert!(matches!(update.repaint, Repaint::Incremental(ref e) if e.len() == 3));
        assert_eq!(alice.snapshot().len(), 3);
        assert!(alice.poll_remote().repaint.is_none());
    }

    #[test]
    fn test_persistence_failure_keeps_local_state() {
        let hub = MemoryEventHub::new();
        let drawing = drawing();
        let mut canvas = open(&hub, &drawing, Some("alice"));
        hub.set_fail_inserts(true);

        draw_stroke(&mut canvas, &[(0.0, 0.0), (3.0, 3.0)]);
        let update = canvas.poll_remote();

        assert_eq!(update.notices.len(), 2);
        assert!(update.notices.iter().all(|n| n.level == NoticeLevel::Error));
        assert_eq!(canvas.snapshot().len(), 2);
    }

    #[test]
    fn test_clear_mid_stroke_discards_interaction() {
        let hub = MemoryEventHub::new();
        let drawing = drawing();
        let mut canvas = open(&hub, &drawing, Some("alice"));
        canvas.pointer_down(Point::ZERO);

        let update = canvas.clear();
        assert_eq!(update.repaint, Repaint::Full(Vec::new()));
        assert_eq!(update.notices, vec![Notice::success("Canvas cleared!")]);

        assert!(canvas.pointer_move(Point::new(4.0, 4.0)).repaint.is_none());
        assert!(canvas.pointer_up(Point::new(4.0, 4.0)).repaint.is_none());
        assert!(canvas.snapshot().is_empty());
        assert!(!canvas.session().has_open_interaction());
    }

    #[test]
    fn test_clear_then_save_persists_empty_snapshot() {
        let hub = MemoryEventHub::new();
        let docs = MemoryStorage::new();
        let drawing = block_on(docs.create_drawing("Test", &AuthorId::new("alice"))).unwrap();
        let mut canvas = open(&hub, &drawing, Some("alice"));

        draw_stroke(&mut canvas, &[(0.0, 0.0), (3.0, 3.0)]);
        block_on(canvas.save(&docs)).unwrap();
        assert_eq!(block_on(docs.get_drawing(drawing.id)).unwrap().canvas_data.len(), 2);

        canvas.clear();
        assert!(canvas.snapshot().is_empty());
        let update = block_on(canvas.save(&docs)).unwrap();
        assert_eq!(update.notices, vec![Notice::success("Drawing saved!")]);
        assert!(block_on(docs.get_drawing(drawing.id)).unwrap().canvas_data.is_empty());
    }

    #[test]
    fn test_cleared_drawing_stays_empty_after_reopen() {
        let hub = MemoryEventHub::new();
        let docs = MemoryStorage::new();
        let drawing = block_on(docs.create_drawing("Test", &AuthorId::new("alice"))).unwrap();
        let mut canvas = open(&hub, &drawing, Some("alice"));
        draw_stroke(&mut canvas, &[(0.0, 0.0), (3.0, 3.0)]);
        block_on(canvas.save(&docs)).unwrap();
        canvas.clear();
        block_on(canvas.save(&docs)).unwrap();
        drop(canvas);

        let stored = block_on(docs.get_drawing(drawing.id)).unwrap();
        assert!(stored.canvas_data.is_empty());
        assert_eq!(hub.events(drawing.id).len(), 2);

        let mut reopened = Canvas::new(&stored, Some(AuthorId::new("alice")), hub.client()).unwrap();
        assert_eq!(reopened.hydrate(stored.canvas_data.clone()).repaint, Repaint::Full(Vec::new()));
        assert!(reopened.poll_remote().repaint.is_none());
        assert!(reopened.snapshot().is_empty());
    }

    #[test]
    fn test_read_only_tool_switch() {
        let hub = MemoryEventHub::new();
        let mut canvas = open(&hub, &drawing(), None);
        canvas.set_color(SerializableColor::white());

        assert!(canvas.set_tool(ToolKind::Line).notices.is_empty());
        assert_eq!(canvas.tool(), &ToolKind::Line);
        assert_eq!(canvas.style().color, SerializableColor::white());
        assert_eq!(canvas.set_tool(ToolKind::Unknown("lasso".into())).notices.len(), 1);
        assert_eq!(canvas.tool(), &ToolKind::Line);
    }

    #[test]
    fn test_save_to_missing_drawing_fails() {
        let hub = MemoryEventHub::new();
        let canvas = open(&hub, &drawing(), Some("alice"));
        let result = block_on(canvas.save(&MemoryStorage::new()));
        assert!(matches!(result, Err(CanvasError::PersistenceFailure(_))));
    }

    #[test]
    fn test_hydrate_requests_full_replay() {
        let hub = MemoryEventHub::new();
        let drawing = drawing();
        let mut author = open(&hub, &drawing, Some("alice"));
        draw_stroke(&mut author, &[(0.0, 0.0), (3.0, 3.0)]);
        let stored = author.snapshot().to_vec();

        let mut viewer = Canvas::new(&drawing, Some(AuthorId::new("bob")), MemoryEventHub::new().client()).unwrap();
        let update = viewer.hydrate(stored.clone());
        assert_eq!(update.repaint, Repaint::Full(stored));
    }

    #[test]
    fn test_invalid_settings_become_notices() {
        let hub = MemoryEventHub::new();
        let mut canvas = open(&hub, &drawing(), Some("alice"));

        let update = canvas.set_tool(ToolKind::Unknown("lasso".into()));
        assert_eq!(update.notices, vec![Notice::error("Unrecognized tool: lasso")]);
        assert_eq!(canvas.tool(), &ToolKind::Brush);

        let update = canvas.set_stroke_width(0.0);
        assert_eq!(update.notices.len(), 1);
        assert!((canvas.style().stroke_width - ToolStyle::DEFAULT_STROKE_WIDTH).abs() < f64::EPSILON);
    }

    #[test]
    fn test_tool_switch_commits_open_shape() {
        let hub = MemoryEventHub::new();
        let drawing = drawing();
        let mut canvas = open(&hub, &drawing, Some("alice"));
        canvas.set_tool(ToolKind::Circle);
        canvas.pointer_down(Point::ZERO);
        canvas.pointer_move(Point::new(3.0, 4.0));

        let update = canvas.set_tool(ToolKind::Brush);
        assert!(matches!(update.repaint, Repaint::Incremental(ref e) if e[0].tool() == &ToolKind::Circle));
        assert_eq!(hub.events(drawing.id).len(), 1);
    }
}
