//! LiveSketch Render Library
//!
//! Turns drawing events into pixels. The [`Renderer`] keeps per-author path
//! state and drives any [`DrawingSurface`]; [`RasterSurface`] is the CPU
//! implementation used for live sessions, tests and PNG export.

mod export;
mod raster;
mod renderer;

pub use export::{ExportError, ExportedImage, encode_png, export_png};
pub use raster::RasterSurface;
pub use renderer::{DrawingSurface, Paint, RenderResult, Renderer, RendererError};
