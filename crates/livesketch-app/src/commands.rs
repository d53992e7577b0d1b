//! Command implementations.
//!
//! Each command is generic over the document and event stores so the same
//! code runs against files and the relay server in the binary, and against
//! in-memory stores in tests.

use crate::error::{AppError, AppResult};
use kurbo::Point;
use livesketch_core::{
    AuthorId, Canvas, CanvasConfig, CanvasError, CanvasRoute, CanvasUpdate, DocumentStore,
    Drawing, DrawingId, EventStore, IdentityProvider, Notice, NoticeLevel, SerializableColor,
    ToolKind, open_drawing,
};
use livesketch_render::{RasterSurface, Renderer, export_png};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Print a notice the way a toast would show it.
pub fn report(notice: &Notice) {
    match notice.level {
        NoticeLevel::Error => {
            log::error!("{}", notice.message);
            eprintln!("error: {}", notice.message);
        }
        NoticeLevel::Info | NoticeLevel::Success => {
            log::info!("{}", notice.message);
            println!("{}", notice.message);
        }
    }
}

/// Create a drawing. Without a title the default-titled drawing from the
/// `/canvas` route is created.
pub fn create<S, I>(docs: &S, identity: &I, title: Option<&str>) -> AppResult<Drawing>
where
    S: DocumentStore + ?Sized,
    I: IdentityProvider + ?Sized,
{
    match title {
        None => {
            let opened = pollster::block_on(open_drawing(CanvasRoute::New, docs, identity))?;
            Ok(opened.drawing)
        }
        Some(title) => {
            let owner = identity
                .current_author()
                .ok_or(CanvasError::NotAuthenticated)?;
            let drawing = pollster::block_on(docs.create_drawing(title, &owner))?;
            log::info!("Created drawing {} ({})", drawing.id, drawing.title);
            Ok(drawing)
        }
    }
}

/// Stored drawings, most recently updated first.
pub fn list<S: DocumentStore + ?Sized>(docs: &S) -> AppResult<Vec<Drawing>> {
    let mut drawings = pollster::block_on(docs.list_drawings())?;
    drawings.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    Ok(drawings)
}

/// Paint a drawing's saved events onto a fresh surface.
pub fn render(drawing: &Drawing, config: &CanvasConfig) -> AppResult<RasterSurface> {
    let mut surface = RasterSurface::new(config.width, config.height)?;
    Renderer::new().replay(&mut surface, &drawing.canvas_data);
    Ok(surface)
}

/// Write `surface` as `<title>.png` into `out_dir`.
pub fn write_png(surface: &RasterSurface, title: &str, out_dir: &Path) -> AppResult<PathBuf> {
    let image = export_png(surface, title)?;
    let path = out_dir.join(&image.file_name);
    std::fs::write(&path, &image.bytes).map_err(|e| AppError::Write {
        path: path.clone(),
        message: e.to_string(),
    })?;
    Ok(path)
}

/// Load a drawing and export it to PNG.
pub fn export<S, I>(
    docs: &S,
    identity: &I,
    config: &CanvasConfig,
    id: DrawingId,
    out_dir: &Path,
) -> AppResult<PathBuf>
where
    S: DocumentStore + ?Sized,
    I: IdentityProvider + ?Sized,
{
    let opened = pollster::block_on(open_drawing(CanvasRoute::Drawing(id), docs, identity))
        .inspect_err(|_| report(&Notice::error("Failed to load drawing")))?;
    let surface = render(&opened.drawing, config)?;
    write_png(&surface, &opened.drawing.title, out_dir)
}

/// One stroke or shape to draw from the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Sketch {
    pub tool: ToolKind,
    pub color: Option<SerializableColor>,
    pub stroke_width: Option<f64>,
    pub points: Vec<Point>,
}

/// A live session: canvas, renderer and the surface it paints.
pub struct Session<E: EventStore> {
    canvas: Canvas<E>,
    renderer: Renderer,
    surface: RasterSurface,
}

impl<E: EventStore> Session<E> {
    /// Join a drawing, paint its saved state and apply the configured tool.
    pub fn open(
        drawing: &Drawing,
        author: Option<AuthorId>,
        store: E,
        config: &CanvasConfig,
    ) -> AppResult<Self> {
        let canvas = Canvas::new(drawing, author, store)?;
        let surface = RasterSurface::new(config.width, config.height)?;
        let mut session = Self {
            canvas,
            renderer: Renderer::new(),
            surface,
        };
        let update = session.canvas.hydrate(drawing.canvas_data.clone());
        session.present(update);
        let update = session.canvas.set_tool(config.tool.clone());
        session.present(update);
        let update = session.canvas.set_color(config.color);
        session.present(update);
        let update = session.canvas.set_stroke_width(config.stroke_width);
        session.present(update);
        Ok(session)
    }

    pub fn canvas(&self) -> &Canvas<E> {
        &self.canvas
    }

    pub fn surface(&self) -> &RasterSurface {
        &self.surface
    }

    fn present(&mut self, update: CanvasUpdate) {
        self.renderer.present(&mut self.surface, &update.repaint);
        update.notices.iter().for_each(report);
    }

    /// Paint and ingest whatever arrived from other participants.
    pub fn sync(&mut self) {
        let update = self.canvas.poll_remote();
        self.present(update);
    }

    /// Replay a sketch as pointer input.
    pub fn draw(&mut self, sketch: &Sketch) {
        let (Some(&first), Some(&last)) = (sketch.points.first(), sketch.points.last()) else {
            return;
        };
        let update = self.canvas.set_tool(sketch.tool.clone());
        self.present(update);
        if let Some(color) = sketch.color {
            let update = self.canvas.set_color(color);
            self.present(update);
        }
        if let Some(width) = sketch.stroke_width {
            let update = self.canvas.set_stroke_width(width);
            self.present(update);
        }

        let update = self.canvas.pointer_down(first);
        self.present(update);
        for &point in sketch.points.iter().skip(1) {
            let update = self.canvas.pointer_move(point);
            self.present(update);
        }
        let update = self.canvas.pointer_up(last);
        self.present(update);
    }

    /// Store the committed log as the drawing's snapshot.
    pub fn save<S: DocumentStore + ?Sized>(&self, docs: &S) -> AppResult<()> {
        let update = pollster::block_on(self.canvas.save(docs))?;
        update.notices.iter().for_each(report);
        Ok(())
    }

    /// Poll the event store every `interval` until `duration` has passed.
    pub fn watch(&mut self, interval: Duration, duration: Option<Duration>) {
        let started = Instant::now();
        loop {
            self.sync();
            if duration.is_some_and(|d| started.elapsed() >= d) {
                break;
            }
            std::thread::sleep(interval);
        }
        log::info!(
            "Stopped watching {} after {} events",
            self.canvas.drawing_id(),
            self.canvas.session().len()
        );
    }
}

/// Parse `x,y` into a point.
pub fn parse_point(s: &str) -> Result<Point, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected x,y, got {s:?}"))?;
    let x: f64 = x.trim().parse().map_err(|e| format!("bad x in {s:?}: {e}"))?;
    let y: f64 = y.trim().parse().map_err(|e| format!("bad y in {s:?}: {e}"))?;
    Ok(Point::new(x, y))
}
