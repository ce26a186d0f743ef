use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use crate::layout::LayoutOptions;
use crate::palette::{Palette, Rgb};

/// Geometry and colors used by [`crate::render::GraphRenderer`].
///
/// All lengths are in surface units (CSS pixels for a canvas, braille dots
/// for a terminal canvas).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Used when the row container cannot report a row's position.
    pub row_height: f32,
    pub column_spacing: f32,
    pub left_margin: f32,
    pub node_radius: f32,
    pub line_width: f32,
    /// Maximum cursor distance for hover and click hit-testing.
    pub hit_radius: f32,
    pub min_width: f32,
    pub max_width: f32,
    pub background: Rgb,
    pub hover_ring: Rgb,
    pub selected_ring: Rgb,
    pub palette: Palette,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            row_height: 24.0,
            column_spacing: 16.0,
            left_margin: 12.0,
            node_radius: 4.0,
            line_width: 2.0,
            hit_radius: 8.0,
            min_width: 40.0,
            max_width: 480.0,
            background: Rgb::new(30, 30, 30),
            hover_ring: Rgb::new(200, 200, 200),
            selected_ring: Rgb::new(255, 255, 255),
            palette: Palette::default(),
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("render.row_height", self.row_height),
            ("render.column_spacing", self.column_spacing),
            ("render.node_radius", self.node_radius),
            ("render.line_width", self.line_width),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(GraphError::config(field, format!("must be > 0, got {value}")));
            }
        }
        if !(self.left_margin.is_finite() && self.left_margin >= 0.0) {
            return Err(GraphError::config("render.left_margin", "must be >= 0"));
        }
        if !(self.hit_radius.is_finite() && self.hit_radius >= 0.0) {
            return Err(GraphError::config("render.hit_radius", "must be >= 0"));
        }
        if !(self.min_width.is_finite() && self.min_width > 0.0 && self.min_width <= self.max_width)
        {
            return Err(GraphError::config(
                "render.min_width",
                format!(
                    "must be > 0 and <= max_width ({} > {})",
                    self.min_width, self.max_width
                ),
            ));
        }
        if self.palette.is_empty() {
            return Err(GraphError::config("render.palette", "must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub layout: LayoutOptions,
    pub render: RenderConfig,
}

impl GraphConfig {
    pub fn validate(&self) -> Result<()> {
        if self.layout.palette_size == 0 {
            return Err(GraphError::config("layout.palette_size", "must be >= 1"));
        }
        self.render.validate()
    }
}
