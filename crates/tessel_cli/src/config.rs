//! Tessel configuration file handling

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use tessel_text::{
    AutoSizeOptions, FontId, FontStyles, HorizontalAlignment, LayoutOptions, Margins, OverflowMode,
    TextSettings, VerticalAlignment,
};

/// Top-level Tessel configuration (tessel.toml)
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct TesselConfig {
    #[serde(default)]
    pub text: TextSettings,
    #[serde(default)]
    pub job: JobConfig,
}

/// One layout job
#[derive(Debug, Deserialize, Serialize)]
pub struct JobConfig {
    #[serde(default = "default_text")]
    pub text: String,
    /// System font family
    #[serde(default)]
    pub font_family: Option<String>,
    /// Font file, takes precedence over `font_family`
    #[serde(default)]
    pub font_path: Option<PathBuf>,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    #[serde(default)]
    pub width: Option<f32>,
    #[serde(default)]
    pub height: Option<f32>,
    #[serde(default)]
    pub margin: f32,
    #[serde(default = "default_true")]
    pub wrapping: bool,
    /// overflow | truncate | ellipsis | linked | page
    #[serde(default = "default_overflow")]
    pub overflow: String,
    /// left | center | right | geometry | justified | flush
    #[serde(default = "default_alignment")]
    pub alignment: String,
    /// top | middle | bottom | baseline
    #[serde(default = "default_vertical_alignment")]
    pub vertical_alignment: String,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default = "default_true")]
    pub rich_text: bool,
    #[serde(default)]
    pub decode_html_entities: bool,
    #[serde(default)]
    pub right_to_left: bool,
    #[serde(default)]
    pub line_spacing: f32,
    #[serde(default)]
    pub page: usize,
    #[serde(default)]
    pub auto_size: Option<AutoSizeConfig>,
}

fn default_text() -> String {
    "The quick brown fox jumps over the lazy dog".to_string()
}

fn default_font_size() -> f32 {
    36.0
}

fn default_true() -> bool {
    true
}

fn default_overflow() -> String {
    "overflow".to_string()
}

fn default_alignment() -> String {
    "left".to_string()
}

fn default_vertical_alignment() -> String {
    "top".to_string()
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            text: default_text(),
            font_family: None,
            font_path: None,
            font_size: default_font_size(),
            width: None,
            height: None,
            margin: 0.0,
            wrapping: true,
            overflow: default_overflow(),
            alignment: default_alignment(),
            vertical_alignment: default_vertical_alignment(),
            bold: false,
            italic: false,
            rich_text: true,
            decode_html_entities: false,
            right_to_left: false,
            line_spacing: 0.0,
            page: 0,
            auto_size: None,
        }
    }
}

/// Auto-size bounds
#[derive(Debug, Deserialize, Serialize)]
pub struct AutoSizeConfig {
    #[serde(default = "default_min_size")]
    pub min_size: f32,
    #[serde(default = "default_max_size")]
    pub max_size: f32,
    #[serde(default)]
    pub line_spacing_floor: f32,
    #[serde(default = "default_min_width")]
    pub min_width_percent: f32,
    #[serde(default = "default_iterations")]
    pub max_iterations: u32,
}

fn default_min_size() -> f32 {
    18.0
}

fn default_max_size() -> f32 {
    72.0
}

fn default_min_width() -> f32 {
    100.0
}

fn default_iterations() -> u32 {
    100
}

impl TesselConfig {
    /// Load configuration from a file, or a directory holding tessel.toml
    pub fn load(path: &Path) -> Result<Self> {
        let config_path = if path.is_dir() {
            path.join("tessel.toml")
        } else {
            path.to_path_buf()
        };

        if !config_path.exists() {
            anyhow::bail!("No config found at {}", config_path.display());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}

impl JobConfig {
    /// Layout options for this job with `font` as the primary font
    pub fn to_options(&self, font: FontId) -> Result<LayoutOptions> {
        let mut options = LayoutOptions::new(font)
            .with_size(self.font_size)
            .with_box(self.width, self.height)
            .with_wrapping(self.wrapping)
            .with_overflow(parse_overflow(&self.overflow)?)
            .with_alignment(parse_alignment(&self.alignment)?);

        options.vertical_alignment = parse_vertical_alignment(&self.vertical_alignment)?;
        options.margins = Margins::uniform(self.margin);
        options.rich_text = self.rich_text;
        options.decode_html_entities = self.decode_html_entities;
        options.right_to_left = self.right_to_left;
        options.line_spacing = self.line_spacing;
        options.page_to_display = self.page;
        if self.bold {
            options.styles = options.styles | FontStyles::BOLD;
        }
        if self.italic {
            options.styles = options.styles | FontStyles::ITALIC;
        }
        if let Some(auto) = &self.auto_size {
            options = options.with_auto_size(AutoSizeOptions {
                min_size: auto.min_size,
                max_size: auto.max_size,
                line_spacing_floor: auto.line_spacing_floor,
                min_width_percent: auto.min_width_percent,
                max_iterations: auto.max_iterations,
            });
        }
        Ok(options)
    }
}

fn parse_overflow(value: &str) -> Result<OverflowMode> {
    Ok(match value.to_ascii_lowercase().as_str() {
        "overflow" => OverflowMode::Overflow,
        "truncate" => OverflowMode::Truncate,
        "ellipsis" => OverflowMode::Ellipsis,
        "linked" => OverflowMode::Linked,
        "page" => OverflowMode::Page,
        other => anyhow::bail!("Unknown overflow mode '{}'", other),
    })
}

fn parse_alignment(value: &str) -> Result<HorizontalAlignment> {
    Ok(match value.to_ascii_lowercase().as_str() {
        "left" => HorizontalAlignment::Left,
        "center" => HorizontalAlignment::Center,
        "right" => HorizontalAlignment::Right,
        "geometry" => HorizontalAlignment::Geometry,
        "justified" => HorizontalAlignment::Justified,
        "flush" => HorizontalAlignment::Flush,
        other => anyhow::bail!("Unknown alignment '{}'", other),
    })
}

fn parse_vertical_alignment(value: &str) -> Result<VerticalAlignment> {
    Ok(match value.to_ascii_lowercase().as_str() {
        "top" => VerticalAlignment::Top,
        "middle" => VerticalAlignment::Middle,
        "bottom" => VerticalAlignment::Bottom,
        "baseline" => VerticalAlignment::Baseline,
        other => anyhow::bail!("Unknown vertical alignment '{}'", other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = TesselConfig::from_toml_str(
            r#"
            [text]
            warnings_enabled = false

            [job]
            text = "hello"
            width = 200.0
            overflow = "Ellipsis"
            "#,
        )
        .unwrap();
        assert!(!config.text.warnings_enabled);
        assert_eq!(config.text.ellipsis_codepoint, 0x2026);
        assert_eq!(config.job.text, "hello");
        assert_eq!(config.job.font_size, 36.0);

        let options = config.job.to_options(FontId::default()).unwrap();
        assert_eq!(options.overflow, OverflowMode::Ellipsis);
        assert_eq!(options.width, Some(200.0));
        assert!(options.auto_size.is_none());
    }

    #[test]
    fn test_auto_size_table() {
        let config = TesselConfig::from_toml_str(
            r#"
            [job]
            auto_size = { max_size = 48.0 }
            "#,
        )
        .unwrap();
        let options = config.job.to_options(FontId::default()).unwrap();
        let auto = options.auto_size.unwrap();
        assert_eq!(auto.max_size, 48.0);
        assert_eq!(auto.min_size, 18.0);
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        let job = JobConfig {
            alignment: "sideways".to_string(),
            ..Default::default()
        };
        assert!(job.to_options(FontId::default()).is_err());
    }

    #[test]
    fn test_round_trip_toml() {
        let config = TesselConfig::default();
        let text = config.to_toml().unwrap();
        let parsed = TesselConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed.job.text, config.job.text);
    }
}
