#![warn(missing_docs)]
//! # qrid-encoder
//!
//! ## Purpose
//! Turns an [`Identifier`] into a square QR code PNG and writes it to disk.
//!
//! ## Responsibilities
//! - Encode the identifier bytes at a caller-chosen error-correction level.
//! - Rasterize modules into an exact `size x size` grayscale bitmap with a
//!   four-module quiet zone.
//! - Write the PNG without ever exposing a partially written artifact.
//!
//! ## Data flow
//! Identifier -> QR module matrix -> grayscale bitmap -> PNG bytes -> sibling
//! temp file -> rename onto the target path.
//!
//! ## Error model
//! Capacity, sizing, PNG, and filesystem failures are [`EncodeError`] values.
//! Callers treat them as fatal.
//!
//! ## Determinism
//! Rendering has no clock, randomness, or metadata chunks, so equal inputs
//! yield byte-identical PNG files.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use image::{GrayImage, ImageEncoder, Luma};
use qrcode::types::QrError;
use qrcode::{Color, EcLevel, QrCode};
use qrid_core::Identifier;
use thiserror::Error;

/// Side length of the generated artifact in pixels.
pub const DEFAULT_SIZE_PX: u32 = 256;
/// Light modules around the symbol, as required by the QR standard.
pub const QUIET_ZONE_MODULES: u32 = 4;

const DARK: Luma<u8> = Luma([0]);
const LIGHT: Luma<u8> = Luma([255]);

/// QR error-correction level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorCorrection {
    /// ~7% recovery, largest capacity.
    #[default]
    Low,
    /// ~15% recovery.
    Medium,
    /// ~25% recovery.
    Quartile,
    /// ~30% recovery.
    High,
}

impl From<ErrorCorrection> for EcLevel {
    fn from(level: ErrorCorrection) -> Self {
        match level {
            ErrorCorrection::Low => EcLevel::L,
            ErrorCorrection::Medium => EcLevel::M,
            ErrorCorrection::Quartile => EcLevel::Q,
            ErrorCorrection::High => EcLevel::H,
        }
    }
}

/// Renders the QR symbol for `identifier` into a `size x size` bitmap.
///
/// Modules are scaled by the largest integer factor that fits and centered;
/// leftover pixels become extra light border.
///
/// # Errors
/// Returns [`EncodeError::DataTooLong`] when the identifier exceeds the
/// capacity for `level`, or [`EncodeError::SizeTooSmall`] when `size` cannot
/// hold one pixel per module plus the quiet zone.
pub fn render_bitmap(
    identifier: &Identifier,
    size: u32,
    level: ErrorCorrection,
) -> Result<GrayImage, EncodeError> {
    let code = QrCode::with_error_correction_level(identifier.as_str().as_bytes(), level.into())
        .map_err(|error| match error {
            QrError::DataTooLong => EncodeError::DataTooLong {
                bytes: identifier.len(),
            },
            other => EncodeError::Qr(other.to_string()),
        })?;

    let modules = code.width() as u32;
    let required = modules + 2 * QUIET_ZONE_MODULES;
    if size < required {
        return Err(EncodeError::SizeTooSmall { size, required });
    }

    let scale = size / required;
    let origin = (size - required * scale) / 2 + QUIET_ZONE_MODULES * scale;
    let mut bitmap = GrayImage::from_pixel(size, size, LIGHT);

    for (index, color) in code.to_colors().into_iter().enumerate() {
        if color != Color::Dark {
            continue;
        }
        let module_x = index as u32 % modules;
        let module_y = index as u32 / modules;
        let left = origin + module_x * scale;
        let top = origin + module_y * scale;
        for y in top..top + scale {
            for x in left..left + scale {
                bitmap.put_pixel(x, y, DARK);
            }
        }
    }

    Ok(bitmap)
}

/// Renders the QR symbol and returns PNG-encoded bytes.
///
/// # Errors
/// Propagates [`render_bitmap`] failures and returns [`EncodeError::Png`]
/// when PNG encoding fails.
pub fn render_png(
    identifier: &Identifier,
    size: u32,
    level: ErrorCorrection,
) -> Result<Vec<u8>, EncodeError> {
    let bitmap = render_bitmap(identifier, size, level)?;
    let mut png_bytes = Vec::new();
    image::codecs::png::PngEncoder::new(&mut png_bytes)
        .write_image(
            bitmap.as_raw(),
            bitmap.width(),
            bitmap.height(),
            image::ColorType::L8.into(),
        )
        .map_err(|error| EncodeError::Png(error.to_string()))?;
    Ok(png_bytes)
}

/// Encodes `identifier` and atomically writes the PNG to `target`.
///
/// Bytes go to a hidden sibling temp file first and are renamed onto
/// `target` only after a successful flush. Any failure removes the temp file,
/// so `target` is either untouched or complete.
///
/// # Errors
/// Returns [`EncodeError`] for encoding failures, an unusable target path, or
/// filesystem errors.
pub fn encode_to_file(
    identifier: &Identifier,
    target: &Path,
    size: u32,
    level: ErrorCorrection,
) -> Result<(), EncodeError> {
    let png_bytes = render_png(identifier, size, level)?;
    let temp_path = temp_path_for(target)?;

    if let Err(source) = write_synced(&temp_path, &png_bytes) {
        let _ = fs::remove_file(&temp_path);
        return Err(EncodeError::Write {
            path: temp_path,
            source,
        });
    }

    if let Err(source) = fs::rename(&temp_path, target) {
        let _ = fs::remove_file(&temp_path);
        return Err(EncodeError::Write {
            path: target.to_path_buf(),
            source,
        });
    }

    Ok(())
}

/// Returns the temp-file path used while writing `target`.
///
/// # Errors
/// Returns [`EncodeError::InvalidTarget`] when `target` has no file name.
pub fn temp_path_for(target: &Path) -> Result<PathBuf, EncodeError> {
    let file_name = target
        .file_name()
        .ok_or_else(|| EncodeError::InvalidTarget(target.to_path_buf()))?;
    let mut temp_name = std::ffi::OsString::from(".");
    temp_name.push(file_name);
    temp_name.push(".tmp");
    Ok(target.with_file_name(temp_name))
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// Encoder error type.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Identifier does not fit in any QR version at the chosen level.
    #[error("identifier of {bytes} bytes exceeds QR capacity")]
    DataTooLong {
        /// Identifier length in bytes.
        bytes: usize,
    },
    /// Requested bitmap is smaller than the symbol plus quiet zone.
    #[error("bitmap size {size}px is smaller than the {required}px the symbol needs")]
    SizeTooSmall {
        /// Requested side length.
        size: u32,
        /// Minimum side length for this symbol.
        required: u32,
    },
    /// QR library rejected the input.
    #[error("qr encoding failed: {0}")]
    Qr(String),
    /// PNG encoder failed.
    #[error("png encoding failed: {0}")]
    Png(String),
    /// Target path has no file name component.
    #[error("invalid artifact path '{}'", .0.display())]
    InvalidTarget(PathBuf),
    /// Writing or finalizing the file failed.
    #[error("failed to write artifact '{}': {source}", path.display())]
    Write {
        /// File being written.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

#[cfg(test)]
mod tests {
    //! Unit tests for bitmap geometry.

    use super::*;

    #[test]
    fn bitmap_is_exact_square_with_light_border() {
        let identifier = Identifier::new("DEVICE-1234").expect("valid identifier");
        let bitmap =
            render_bitmap(&identifier, DEFAULT_SIZE_PX, ErrorCorrection::Low).expect("render");

        assert_eq!(bitmap.dimensions(), (DEFAULT_SIZE_PX, DEFAULT_SIZE_PX));
        assert_eq!(*bitmap.get_pixel(0, 0), LIGHT);
        assert_eq!(*bitmap.get_pixel(255, 255), LIGHT);
        assert!(bitmap.pixels().any(|pixel| *pixel == DARK));
    }

    #[test]
    fn temp_path_is_hidden_sibling() {
        let temp = temp_path_for(Path::new("out/output_qr_code.png")).expect("temp path");
        assert_eq!(temp, Path::new("out/.output_qr_code.png.tmp"));
        assert!(temp_path_for(Path::new("/")).is_err());
    }
}
