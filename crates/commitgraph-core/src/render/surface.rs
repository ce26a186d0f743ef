use crate::palette::Rgb;
use crate::render::geometry::{CubicBezier, Point, Size};

/// Drawing target of the renderer: a canvas, a terminal grid, a recorder.
pub trait Surface {
    /// `size` is in surface units; backends scale their backing store by
    /// `device_pixel_ratio`.
    fn resize(&mut self, size: Size, device_pixel_ratio: f32);
    fn clear(&mut self);
    fn stroke_line(&mut self, from: Point, to: Point, color: Rgb, width: f32);
    fn stroke_curve(&mut self, curve: CubicBezier, color: Rgb, width: f32);
    fn fill_circle(&mut self, center: Point, radius: f32, color: Rgb);
    fn stroke_circle(&mut self, center: Point, radius: f32, color: Rgb, width: f32);
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear,
    Line {
        from: Point,
        to: Point,
        color: Rgb,
        width: f32,
    },
    Curve {
        curve: CubicBezier,
        color: Rgb,
        width: f32,
    },
    FillCircle {
        center: Point,
        radius: f32,
        color: Rgb,
    },
    StrokeCircle {
        center: Point,
        radius: f32,
        color: Rgb,
        width: f32,
    },
}

impl DrawCommand {
    pub fn is_node(&self) -> bool {
        matches!(self, Self::FillCircle { .. } | Self::StrokeCircle { .. })
    }

    pub fn is_connector(&self) -> bool {
        matches!(self, Self::Line { .. } | Self::Curve { .. })
    }
}

/// Keeps the draw calls of the latest frame so they can be inspected or
/// replayed onto another backend.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    size: Size,
    device_pixel_ratio: f32,
    commands: Vec<DrawCommand>,
    frames: usize,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self {
            device_pixel_ratio: 1.0,
            ..Self::default()
        }
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// Backing store size in device pixels.
    pub fn backing_size(&self) -> (u32, u32) {
        let scale = self.device_pixel_ratio.max(0.0);
        (
            (self.size.width * scale).round() as u32,
            (self.size.height * scale).round() as u32,
        )
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Number of frames started with [`Surface::clear`].
    pub fn frames(&self) -> usize {
        self.frames
    }
}

impl Surface for RecordingSurface {
    fn resize(&mut self, size: Size, device_pixel_ratio: f32) {
        self.size = size;
        self.device_pixel_ratio = device_pixel_ratio;
    }

    fn clear(&mut self) {
        self.commands.clear();
        self.commands.push(DrawCommand::Clear);
        self.frames += 1;
    }

    fn stroke_line(&mut self, from: Point, to: Point, color: Rgb, width: f32) {
        self.commands.push(DrawCommand::Line {
            from,
            to,
            color,
            width,
        });
    }

    fn stroke_curve(&mut self, curve: CubicBezier, color: Rgb, width: f32) {
        self.commands.push(DrawCommand::Curve {
            curve,
            color,
            width,
        });
    }

    fn fill_circle(&mut self, center: Point, radius: f32, color: Rgb) {
        self.commands.push(DrawCommand::FillCircle {
            center,
            radius,
            color,
        });
    }

    fn stroke_circle(&mut self, center: Point, radius: f32, color: Rgb, width: f32) {
        self.commands.push(DrawCommand::StrokeCircle {
            center,
            radius,
            color,
            width,
        });
    }
}
