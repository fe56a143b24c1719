// 🔳 QR rendering - text → image data URI
//
// Pure: the same text and options always produce the same image. Encoding is
// done by the `qrcode` crate; we only lay the module matrix out as SVG so the
// margin and colours follow the options exactly.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use qrcode::{Color, QrCode};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use thiserror::Error;

pub const SVG_MIME: &str = "image/svg+xml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Rendered width and height in pixels
    pub size_px: u32,

    /// Quiet zone around the code, in modules
    pub margin_modules: u32,

    /// CSS hex colour of dark modules
    pub dark: String,

    /// CSS hex colour of the background
    pub light: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            size_px: 300,
            margin_modules: 2,
            dark: "#000000".to_string(),
            light: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("cannot encode text as QR: {0}")]
    Encode(String),

    #[error("invalid colour {0:?} (expected #RGB or #RRGGBB)")]
    InvalidColor(String),

    #[error("image size must be greater than zero")]
    ZeroSize,
}

/// A rendered image as a data URI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedImage {
    pub mime_type: String,
    pub data_uri: String,
}

impl RenderedImage {
    /// Empty sentinel handed out when rendering fails
    pub fn blank() -> Self {
        RenderedImage {
            mime_type: String::new(),
            data_uri: String::new(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.data_uri.is_empty()
    }

    /// File extension matching the mime type
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            SVG_MIME => "svg",
            "image/png" => "png",
            _ => "bin",
        }
    }
}

pub trait QrRenderer: Send + Sync {
    fn render(&self, text: &str, options: &RenderOptions) -> Result<RenderedImage, RenderError>;
}

/// Render, falling back to the blank sentinel
///
/// The error is handed back alongside so the caller can still surface it.
pub fn render_or_blank<R: QrRenderer + ?Sized>(
    renderer: &R,
    text: &str,
    options: &RenderOptions,
) -> (RenderedImage, Option<RenderError>) {
    match renderer.render(text, options) {
        Ok(image) => (image, None),
        Err(err) => {
            tracing::error!(error = %err, "QR rendering failed");
            (RenderedImage::blank(), Some(err))
        }
    }
}

fn validate_color(color: &str) -> Result<(), RenderError> {
    let valid = color
        .strip_prefix('#')
        .map(|hex| (hex.len() == 3 || hex.len() == 6) && hex.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false);

    if valid {
        Ok(())
    } else {
        Err(RenderError::InvalidColor(color.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SvgQrRenderer;

impl SvgQrRenderer {
    /// The bare SVG document
    pub fn render_svg(&self, text: &str, options: &RenderOptions) -> Result<String, RenderError> {
        if options.size_px == 0 {
            return Err(RenderError::ZeroSize);
        }
        validate_color(&options.dark)?;
        validate_color(&options.light)?;

        let code = QrCode::new(text.as_bytes()).map_err(|e| RenderError::Encode(e.to_string()))?;
        let width = code.width();
        let margin = options.margin_modules as usize;
        let total = width + 2 * margin;

        let mut path = String::new();
        for (index, color) in code.to_colors().into_iter().enumerate() {
            if color == Color::Dark {
                let x = index % width + margin;
                let y = index / width + margin;
                // Writing to a String cannot fail
                let _ = write!(path, "M{},{}h1v1h-1z", x, y);
            }
        }

        Ok(format!(
            concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" width="{size}" height="{size}" "#,
                r#"viewBox="0 0 {total} {total}" shape-rendering="crispEdges">"#,
                r#"<rect width="{total}" height="{total}" fill="{light}"/>"#,
                r#"<path d="{path}" fill="{dark}"/></svg>"#
            ),
            size = options.size_px,
            total = total,
            light = options.light,
            dark = options.dark,
            path = path,
        ))
    }
}

impl QrRenderer for SvgQrRenderer {
    fn render(&self, text: &str, options: &RenderOptions) -> Result<RenderedImage, RenderError> {
        let svg = self.render_svg(text, options)?;
        Ok(RenderedImage {
            mime_type: SVG_MIME.to_string(),
            data_uri: format!("data:{};base64,{}", SVG_MIME, STANDARD.encode(svg)),
        })
    }
}
