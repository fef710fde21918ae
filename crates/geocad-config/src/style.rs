//! Layer style presets.
//!
//! A project declares named presets under `styles`; a layer's `style` may name a
//! `preset` and override individual fields. Resolution layers built-in defaults,
//! then the preset, then the inline declaration, so more specific values win.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use geocad_types::{GeocadError, Result};

pub const DEFAULT_COLOR: u8 = 7;
pub const DEFAULT_LINETYPE: &str = "CONTINUOUS";
pub const DEFAULT_TEXT_HEIGHT: f64 = 2.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorValue {
    /// AutoCAD Color Index, 1-255.
    Index(u8),
    Name(String),
}

impl ColorValue {
    pub fn to_aci(&self) -> Result<u8> {
        match self {
            ColorValue::Index(0) => Err(GeocadError::Config(
                "color index 0 (BYBLOCK) is not a layer color".into(),
            )),
            ColorValue::Index(i) => Ok(*i),
            ColorValue::Name(name) => match name.to_ascii_lowercase().as_str() {
                "red" => Ok(1),
                "yellow" => Ok(2),
                "green" => Ok(3),
                "cyan" => Ok(4),
                "blue" => Ok(5),
                "magenta" => Ok(6),
                "white" | "black" => Ok(7),
                "gray" | "grey" => Ok(8),
                other => Err(GeocadError::Config(format!("unknown color name '{other}'"))),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StyleConfig {
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub color: Option<ColorValue>,
    #[serde(default)]
    pub linetype: Option<String>,
    #[serde(default)]
    pub text_height: Option<f64>,
}

/// Fully resolved style handed to the DXF writer.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStyle {
    pub color: u8,
    pub linetype: String,
    pub text_height: f64,
}

impl Default for ResolvedStyle {
    fn default() -> Self {
        Self {
            color: DEFAULT_COLOR,
            linetype: DEFAULT_LINETYPE.to_string(),
            text_height: DEFAULT_TEXT_HEIGHT,
        }
    }
}

impl ResolvedStyle {
    fn apply(&mut self, style: &StyleConfig) -> Result<()> {
        if let Some(ref color) = style.color {
            self.color = color.to_aci()?;
        }
        if let Some(ref linetype) = style.linetype {
            self.linetype = linetype.to_ascii_uppercase();
        }
        if let Some(height) = style.text_height {
            if height <= 0.0 {
                return Err(GeocadError::Config(format!(
                    "text_height must be positive, got {height}"
                )));
            }
            self.text_height = height;
        }
        Ok(())
    }
}

/// Resolve a layer's style against the project's presets.
pub fn resolve_style(
    presets: &IndexMap<String, StyleConfig>,
    style: Option<&StyleConfig>,
) -> Result<ResolvedStyle> {
    let mut resolved = ResolvedStyle::default();
    let Some(style) = style else {
        return Ok(resolved);
    };

    if let Some(ref name) = style.preset {
        let preset = presets
            .get(name)
            .ok_or_else(|| GeocadError::Config(format!("unknown style preset '{name}'")))?;
        if preset.preset.is_some() {
            tracing::warn!(preset = %name, "Nested style presets are not followed");
        }
        resolved.apply(preset)?;
    }
    resolved.apply(style)?;
    Ok(resolved)
}
