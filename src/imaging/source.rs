//! Resolving image URIs and decoding image files.

use crate::error::{Error, Result};
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader, RgbaImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// Turn a collaborator-supplied URI into a local path.
///
/// Accepts `file://` URLs and plain filesystem paths. Any other scheme is
/// rejected, since only local files are readable here.
pub fn resolve_uri(uri: &str) -> Result<PathBuf> {
    let invalid = || Error::InvalidImageUri {
        uri: uri.to_string(),
    };

    if uri.trim().is_empty() {
        return Err(invalid());
    }

    if uri.starts_with("file:") {
        let url = Url::parse(uri).map_err(|_| invalid())?;
        return url.to_file_path().map_err(|()| invalid());
    }

    if uri.contains("://") {
        return Err(invalid());
    }

    Ok(PathBuf::from(uri))
}

/// Resolve a URI and check that the file exists right now.
pub fn ensure_source(uri: &str) -> Result<PathBuf> {
    let path = resolve_uri(uri)?;
    if !path.is_file() {
        return Err(Error::SourceNotFound { path });
    }
    Ok(path)
}

/// Decode an image file into straight-alpha RGBA8, upright per its EXIF
/// orientation.
pub fn decode_file(path: &Path) -> Result<RgbaImage> {
    let bytes = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::SourceNotFound {
                path: path.to_path_buf(),
            }
        } else {
            Error::Io(e)
        }
    })?;

    let decode_err = |source| Error::DecodeError {
        path: path.to_path_buf(),
        source,
    };

    let mut decoder = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .into_decoder()
        .map_err(decode_err)?;
    // Camera JPEGs store the sensor frame plus an EXIF rotation; models and
    // callers both expect the upright image.
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let mut decoded = DynamicImage::from_decoder(decoder).map_err(decode_err)?;
    decoded.apply_orientation(orientation);

    let rgba = decoded.into_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(Error::EmptyImage { width, height });
    }

    debug!("Decoded {} ({}x{})", path.display(), width, height);
    Ok(rgba)
}

/// Resolve, check and decode an image URI in one step.
pub fn load_image(uri: &str) -> Result<RgbaImage> {
    let path = ensure_source(uri)?;
    decode_file(&path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_plain_path() {
        let path = resolve_uri("/tmp/bird.jpg").unwrap();
        assert_eq!(path, PathBuf::from("/tmp/bird.jpg"));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_file_url() {
        let path = resolve_uri("file:///data/user/0/cache/photo%201.jpg").unwrap();
        assert_eq!(path, PathBuf::from("/data/user/0/cache/photo 1.jpg"));
    }

    #[test]
    fn test_resolve_rejects_remote_scheme() {
        assert!(matches!(
            resolve_uri("https://example.com/bird.jpg"),
            Err(Error::InvalidImageUri { .. })
        ));
        assert!(matches!(resolve_uri("  "), Err(Error::InvalidImageUri { .. })));
    }

    #[test]
    fn test_missing_source() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.png");
        let result = load_image(missing.to_str().unwrap());
        assert!(matches!(result, Err(Error::SourceNotFound { .. })));
    }

    /// JPEG of `width × height` carrying an EXIF orientation tag.
    fn jpeg_with_orientation(width: u32, height: u32, orientation: u16) -> Vec<u8> {
        let mut jpeg = Vec::new();
        image::RgbImage::from_pixel(width, height, image::Rgb([90, 140, 60]))
            .write_to(&mut Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
            .unwrap();

        // Big-endian TIFF header, one IFD entry: 0x0112 Orientation, SHORT, 1.
        let mut tiff = vec![b'M', b'M', 0, 42, 0, 0, 0, 8, 0, 1, 0x01, 0x12, 0, 3, 0, 0, 0, 1];
        tiff.extend_from_slice(&orientation.to_be_bytes());
        tiff.extend_from_slice(&[0, 0, 0, 0, 0, 0]);

        let mut app1 = b"Exif\0\0".to_vec();
        app1.extend_from_slice(&tiff);
        let len = u16::try_from(app1.len() + 2).unwrap();

        let mut out = jpeg[..2].to_vec();
        out.extend_from_slice(&[0xFF, 0xE1]);
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(&app1);
        out.extend_from_slice(&jpeg[2..]);
        out
    }

    #[test]
    fn test_exif_rotation_is_applied() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("portrait.jpg");
        std::fs::write(&path, jpeg_with_orientation(40, 20, 6)).unwrap();

        let rgba = decode_file(&path).unwrap();

        assert_eq!(rgba.dimensions(), (20, 40));
    }

    #[test]
    fn test_upright_jpeg_keeps_dimensions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("landscape.jpg");
        std::fs::write(&path, jpeg_with_orientation(40, 20, 1)).unwrap();

        assert_eq!(decode_file(&path).unwrap().dimensions(), (40, 20));
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not an image").unwrap();
        let result = decode_file(&path);
        assert!(matches!(result, Err(Error::DecodeError { .. })));
    }
}
