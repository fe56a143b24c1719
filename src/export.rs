// 📤 Export sinks - download, print, CSV
//
// Sinks consume an object's token, name and rendered QR image. They never
// read or write the registry.

use crate::entities::TrackedObject;
use crate::error::{Result, TrackerError};
use crate::render::RenderedImage;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

// ============================================================================
// DOWNLOAD
// ============================================================================

/// Object name as a file name stem: whitespace runs, path separators, `:`
/// and control characters all become `_`
fn file_stem(object_name: &str) -> String {
    object_name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// "QR_<sanitized name>.<ext>"
pub fn download_filename(object_name: &str, image: &RenderedImage) -> String {
    format!("QR_{}.{}", file_stem(object_name), image.extension())
}

/// Decode a base64 data URI into (mime type, bytes)
pub fn decode_data_uri(data_uri: &str) -> Result<(String, Vec<u8>)> {
    let rest = data_uri
        .strip_prefix("data:")
        .ok_or_else(|| TrackerError::Export("not a data URI".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| TrackerError::Export("data URI has no payload".to_string()))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| TrackerError::Export("only base64 data URIs are supported".to_string()))?;

    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| TrackerError::Export(format!("invalid base64 payload: {}", e)))?;
    Ok((mime.to_string(), bytes))
}

/// Writes exported artifacts into a directory
pub struct DownloadSink {
    dir: PathBuf,
}

impl DownloadSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DownloadSink { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save the QR image for `object_name`; returns the written path
    pub fn save_image(&self, object_name: &str, image: &RenderedImage) -> Result<PathBuf> {
        if image.is_blank() {
            return Err(TrackerError::Export("no image to save".to_string()));
        }

        let (_mime, bytes) = decode_data_uri(&image.data_uri)?;
        let path = self.dir.join(download_filename(object_name, image));
        self.write(&path, &bytes)?;
        tracing::info!(path = %path.display(), "Saved QR image");
        Ok(path)
    }

    /// Save a printable label sheet as HTML next to the images
    pub fn save_print_sheet(&self, sheet: &PrintSheet<'_>) -> Result<PathBuf> {
        let path = self.dir.join(format!("QR_{}.html", file_stem(sheet.name)));
        self.write(&path, sheet.to_html().as_bytes())?;
        tracing::info!(path = %path.display(), "Saved print sheet");
        Ok(path)
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .and_then(|_| std::fs::write(path, bytes))
            .map_err(|e| TrackerError::Export(format!("{}: {}", path.display(), e)))
    }
}

// ============================================================================
// PRINT
// ============================================================================

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Printable label: object name, token, QR image, scanning instructions
pub struct PrintSheet<'a> {
    pub name: &'a str,
    pub token: &'a str,
    pub image: &'a RenderedImage,
}

impl<'a> PrintSheet<'a> {
    pub fn for_object(object: &'a TrackedObject, image: &'a RenderedImage) -> Self {
        PrintSheet {
            name: object.name(),
            token: object.identity_token(),
            image,
        }
    }

    pub fn to_html(&self) -> String {
        let name = escape_html(self.name);
        let token = escape_html(self.token);
        let image = escape_html(&self.image.data_uri);

        format!(
            r#"<html>
  <head>
    <title>QR Code - {name}</title>
    <style>
      body {{ font-family: Arial, sans-serif; text-align: center; padding: 20px; margin: 0; }}
      .qr-container {{ max-width: 400px; margin: 0 auto; border: 2px solid #000; padding: 20px; border-radius: 10px; }}
      .qr-title {{ font-size: 24px; font-weight: bold; margin-bottom: 10px; }}
      .qr-code {{ font-size: 14px; color: #666; margin-bottom: 20px; }}
      .qr-image {{ max-width: 100%; height: auto; }}
      .instructions {{ font-size: 12px; color: #888; margin-top: 15px; line-height: 1.4; }}
      @media print {{ body {{ margin: 0; }} }}
    </style>
  </head>
  <body>
    <div class="qr-container">
      <div class="qr-title">{name}</div>
      <div class="qr-code">Code: {token}</div>
      <img src="{image}" alt="QR Code" class="qr-image" />
      <div class="instructions">
        Scan this QR code daily to record the object's location.
        <br>Use the QR Tracker app to scan it.
      </div>
    </div>
  </body>
</html>
"#
        )
    }
}

// ============================================================================
// CSV
// ============================================================================

#[derive(Serialize)]
struct HistoryRow<'a> {
    timestamp: String,
    latitude: f64,
    longitude: f64,
    address: &'a str,
}

/// Write an object's history (newest first) as CSV
///
/// The header row is written even when the history is empty.
pub fn history_csv<W: Write>(object: &TrackedObject, writer: W) -> Result<()> {
    let mut out = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    out.write_record(["timestamp", "latitude", "longitude", "address"])
        .map_err(|e| TrackerError::Export(e.to_string()))?;

    for sample in object.location_history().iter() {
        out.serialize(HistoryRow {
            timestamp: sample.timestamp().to_rfc3339(),
            latitude: sample.latitude(),
            longitude: sample.longitude(),
            address: sample.address().unwrap_or(""),
        })
        .map_err(|e| TrackerError::Export(e.to_string()))?;
    }

    out.flush().map_err(|e| TrackerError::Export(e.to_string()))
}
