use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{GraphError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = GraphError;

    fn from_str(raw: &str) -> Result<Self> {
        let invalid = |reason| GraphError::InvalidColor {
            value: raw.to_string(),
            reason,
        };
        let hex = raw
            .trim()
            .strip_prefix('#')
            .ok_or_else(|| invalid("expected a leading '#'"))?;
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid("expected six hex digits"));
        }
        let channel = |idx: usize| {
            u8::from_str_radix(&hex[idx..idx + 2], 16).map_err(|_| invalid("bad hex channel"))
        };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

const DEFAULT_COLORS: [Rgb; 8] = [
    Rgb::new(0, 172, 193),
    Rgb::new(66, 133, 244),
    Rgb::new(52, 168, 83),
    Rgb::new(251, 188, 5),
    Rgb::new(156, 39, 176),
    Rgb::new(255, 87, 34),
    Rgb::new(129, 199, 132),
    Rgb::new(240, 98, 146),
];

/// Cyclic lane palette. Lookups wrap, so any palette index maps to a color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Palette {
    colors: Vec<Rgb>,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: DEFAULT_COLORS.to_vec(),
        }
    }
}

impl Palette {
    pub fn new(colors: Vec<Rgb>) -> Result<Self> {
        if colors.is_empty() {
            return Err(GraphError::config("palette", "must contain at least one color"));
        }
        Ok(Self { colors })
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn color(&self, index: usize) -> Rgb {
        if self.colors.is_empty() {
            return DEFAULT_COLORS[index % DEFAULT_COLORS.len()];
        }
        self.colors[index % self.colors.len()]
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }
}
