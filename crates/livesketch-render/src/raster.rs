//! CPU raster surface.
//!
//! Coverage is binary and evaluated at pixel centers, so the same sequence
//! of operations always yields the same bytes. A pixel belongs to a stroke
//! when its center lies within half the stroke width of the stroked geometry,
//! which gives round caps and joins.

use crate::renderer::{DrawingSurface, Paint, RenderResult, RendererError};
use image::{Rgba, RgbaImage};
use kurbo::{BezPath, Line, ParamCurveNearest, PathEl, Point, Rect, Shape};
use peniko::Compose;

/// Tolerance used when flattening curves into segments.
const FLATTEN_TOLERANCE: f64 = 0.1;

/// Straight-alpha RGBA8 pixel buffer.
pub struct RasterSurface {
    image: RgbaImage,
}

impl RasterSurface {
    /// A fully transparent surface.
    pub fn new(width: u32, height: u32) -> RenderResult<Self> {
        if width == 0 || height == 0 {
            return Err(RendererError::InvalidSize { width, height });
        }
        Ok(Self {
            image: RgbaImage::new(width, height),
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.image.get_pixel(x, y).0
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Raw RGBA bytes, row-major.
    pub fn as_bytes(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Number of pixels with non-zero alpha.
    pub fn painted_pixels(&self) -> usize {
        self.image.pixels().filter(|p| p.0[3] != 0).count()
    }

    /// Paint every pixel whose center is within `paint.width / 2` of any of
    /// `segments`. Each pixel is composited at most once.
    ///
    /// Coverage is collected in a mask first; each segment only tests the
    /// pixels inside its own inflated bounds, clipped to the surface.
    fn fill_coverage(&mut self, segments: &[Line], paint: &Paint) {
        let half = paint.width / 2.0;
        let Some(bounds) = segments
            .iter()
            .map(|s| segment_bounds(s, half))
            .reduce(|acc, r| acc.union(r))
        else {
            return;
        };
        let Some((x0, y0, x1, y1)) = self.pixel_span(bounds) else {
            return;
        };

        let stride = (x1 - x0) as usize;
        let mut mask = vec![false; stride * (y1 - y0) as usize];
        let mut covered = 0usize;
        for segment in segments {
            let Some((sx0, sy0, sx1, sy1)) = self.pixel_span(segment_bounds(segment, half)) else {
                continue;
            };
            for y in sy0..sy1 {
                let row = (y - y0) as usize * stride;
                for x in sx0..sx1 {
                    let cell = &mut mask[row + (x - x0) as usize];
                    if *cell {
                        continue;
                    }
                    let center = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                    if distance_to_segment(segment, center) <= half {
                        *cell = true;
                        covered += 1;
                    }
                }
            }
        }
        if covered == 0 {
            return;
        }

        let source = paint.color.to_rgba8();
        let source = [source.r, source.g, source.b, source.a];
        for (i, _) in mask.iter().enumerate().filter(|(_, hit)| **hit) {
            let x = x0 + (i % stride) as u32;
            let y = y0 + (i / stride) as u32;
            let dst = self.image.get_pixel_mut(x, y);
            *dst = Rgba(composite(dst.0, source, paint.compose));
        }
    }

    fn overlaps(&self, rect: Rect) -> bool {
        self.pixel_span(rect).is_some()
    }

    /// Pixel range `[x0, x1) x [y0, y1)` overlapping `rect`, clipped to the surface.
    fn pixel_span(&self, rect: Rect) -> Option<(u32, u32, u32, u32)> {
        let (w, h) = (self.width() as f64, self.height() as f64);
        let x0 = rect.x0.floor().clamp(0.0, w);
        let y0 = rect.y0.floor().clamp(0.0, h);
        let x1 = rect.x1.ceil().clamp(0.0, w);
        let y1 = rect.y1.ceil().clamp(0.0, h);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }
}

impl DrawingSurface for RasterSurface {
    fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }

    fn stroke_segment(&mut self, from: Point, to: Point, paint: &Paint) {
        self.fill_coverage(&[Line::new(from, to)], paint);
    }

    fn stroke_path(&mut self, path: &BezPath, paint: &Paint) {
        let half = paint.width / 2.0;
        if !self.overlaps(path.bounding_box().inflate(half, half)) {
            return;
        }
        let mut segments = Vec::new();
        let mut start = Point::ZERO;
        let mut last = Point::ZERO;
        kurbo::flatten(path.iter(), FLATTEN_TOLERANCE, |el| match el {
            PathEl::MoveTo(p) => {
                start = p;
                last = p;
                // Lone points still leave a round dot.
                segments.push(Line::new(p, p));
            }
            PathEl::LineTo(p) => {
                segments.push(Line::new(last, p));
                last = p;
            }
            PathEl::ClosePath => {
                segments.push(Line::new(last, start));
                last = start;
            }
            PathEl::QuadTo(..) | PathEl::CurveTo(..) => {}
        });
        self.fill_coverage(&segments, paint);
    }
}

fn segment_bounds(segment: &Line, half: f64) -> Rect {
    Rect::from_points(segment.p0, segment.p1).inflate(half, half)
}

fn distance_to_segment(segment: &Line, p: Point) -> f64 {
    if segment.p0 == segment.p1 {
        return segment.p0.distance(p);
    }
    segment.nearest(p, 1e-9).distance_sq.sqrt()
}

/// Composite `src` onto `dst`, both straight-alpha RGBA8.
fn composite(dst: [u8; 4], src: [u8; 4], compose: Compose) -> [u8; 4] {
    let sa = src[3] as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;
    match compose {
        Compose::DestOut => {
            let out_a = da * (1.0 - sa);
            let a = (out_a * 255.0).round() as u8;
            if a == 0 {
                [0, 0, 0, 0]
            } else {
                [dst[0], dst[1], dst[2], a]
            }
        }
        _ => {
            let out_a = sa + da * (1.0 - sa);
            if out_a <= 0.0 {
                return [0, 0, 0, 0];
            }
            let channel = |s: u8, d: u8| {
                let c = (s as f32 * sa + d as f32 * da * (1.0 - sa)) / out_a;
                c.round().clamp(0.0, 255.0) as u8
            };
            [
                channel(src[0], dst[0]),
                channel(src[1], dst[1]),
                channel(src[2], dst[2]),
                (out_a * 255.0).round() as u8,
            ]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Circle;
    use std::time::{Duration, Instant};
    use peniko::Color;

    fn ink(width: f64) -> Paint {
        Paint {
            color: Color::from_rgba8(0, 0, 0, 255),
            width,
            compose: Compose::SrcOver,
        }
    }

    #[test]
    fn test_zero_size_rejected() {
        assert!(matches!(
            RasterSurface::new(0, 10),
            Err(RendererError::InvalidSize { .. })
        ));
    }

    #[test]
    fn test_segment_coverage() {
        let mut surface = RasterSurface::new(20, 20).unwrap();
        surface.stroke_segment(Point::new(2.0, 10.0), Point::new(18.0, 10.0), &ink(2.0));

        assert_eq!(surface.pixel(10, 9), [0, 0, 0, 255]);
        assert_eq!(surface.pixel(10, 10), [0, 0, 0, 255]);
        assert_eq!(surface.pixel(10, 12), [0, 0, 0, 0]);
        // Round cap reaches one unit past the end point.
        assert_eq!(surface.pixel(1, 9), [0, 0, 0, 255]);
        assert_eq!(surface.pixel(0, 9), [0, 0, 0, 0]);
    }

    #[test]
    fn test_eraser_removes_pixels() {
        let mut surface = RasterSurface::new(20, 20).unwrap();
        surface.stroke_segment(Point::new(0.0, 10.0), Point::new(20.0, 10.0), &ink(4.0));
        let painted = surface.painted_pixels();

        let eraser = Paint {
            compose: Compose::DestOut,
            ..ink(4.0)
        };
        surface.stroke_segment(Point::new(10.0, 0.0), Point::new(10.0, 20.0), &eraser);

        assert_eq!(surface.pixel(10, 10), [0, 0, 0, 0]);
        assert_eq!(surface.pixel(2, 10), [0, 0, 0, 255]);
        assert!(surface.painted_pixels() < painted);
    }

    #[test]
    fn test_translucent_source_over() {
        let mut surface = RasterSurface::new(4, 4).unwrap();
        let paint = Paint {
            color: Color::from_rgba8(255, 0, 0, 128),
            width: 10.0,
            compose: Compose::SrcOver,
        };
        surface.stroke_segment(Point::new(2.0, 2.0), Point::new(2.0, 2.0), &paint);
        assert_eq!(surface.pixel(0, 0), [255, 0, 0, 128]);
    }

    #[test]
    fn test_closed_path_outline_only() {
        let mut surface = RasterSurface::new(30, 30).unwrap();
        let rect = Rect::new(5.0, 5.0, 25.0, 25.0);
        surface.stroke_path(&rect.to_path(0.1), &ink(2.0));

        assert_eq!(surface.pixel(5, 15)[3], 255);
        assert_eq!(surface.pixel(15, 4)[3], 255);
        assert_eq!(surface.pixel(15, 15)[3], 0);
    }

    #[test]
    fn test_circle_ring() {
        let mut surface = RasterSurface::new(40, 40).unwrap();
        let circle = Circle::new((20.0, 20.0), 10.0);
        surface.stroke_path(&circle.to_path(0.01), &ink(1.0));

        for y in 0..40u32 {
            for x in 0..40u32 {
                let d = Point::new(x as f64 + 0.5, y as f64 + 0.5).distance(Point::new(20.0, 20.0));
                let off = (d - 10.0).abs();
                if off <= 0.35 {
                    assert_eq!(surface.pixel(x, y)[3], 255, "({x},{y}) should be on the ring");
                } else if off >= 0.65 {
                    assert_eq!(surface.pixel(x, y)[3], 0, "({x},{y}) should be empty");
                }
            }
        }
    }

    #[test]
    fn test_large_circles_stay_cheap() {
        let mut surface = RasterSurface::new(1280, 800).unwrap();
        let started = Instant::now();

        let huge = Circle::new((640.0, 400.0), 1e6);
        surface.stroke_path(&huge.to_path(0.01), &ink(4.0));
        assert_eq!(surface.painted_pixels(), 0);

        let wide = Circle::new((640.0, 400.0), 390.0);
        surface.stroke_path(&wide.to_path(0.01), &ink(4.0));
        assert_eq!(surface.pixel(640 + 390, 400)[3], 255);
        assert_eq!(surface.pixel(640, 400)[3], 0);

        let far = Circle::new((1e7, 1e7), 50.0);
        surface.stroke_path(&far.to_path(0.01), &ink(4.0));

        assert!(
            started.elapsed() < Duration::from_secs(5),
            "large circles took {:?}",
            started.elapsed()
        );
    }

    #[test]
    fn test_clipped_to_surface() {
        let mut surface = RasterSurface::new(10, 10).unwrap();
        surface.stroke_segment(Point::new(-50.0, -50.0), Point::new(-40.0, -40.0), &ink(3.0));
        assert_eq!(surface.painted_pixels(), 0);
        surface.stroke_segment(Point::new(-5.0, 5.0), Point::new(50.0, 5.0), &ink(1.0));
        assert!(surface.painted_pixels() > 0);
    }

    #[test]
    fn test_clear() {
        let mut surface = RasterSurface::new(10, 10).unwrap();
        surface.stroke_segment(Point::new(0.0, 5.0), Point::new(10.0, 5.0), &ink(2.0));
        surface.clear();
        assert_eq!(surface.painted_pixels(), 0);
    }
}
