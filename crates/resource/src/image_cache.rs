//! On-disk cache of preprocessed images.
//!
//! Background photos are often multi-megapixel camera shots with EXIF rotation
//! and sometimes an alpha channel. Both renderers only need a JPEG sized for
//! the area it is drawn into, so each distinct (source, mtime, target size,
//! quality) combination is transformed once and reused across exports.
//!
//! Entries are written under a unique temporary name and renamed into place,
//! so concurrent misses for the same key may duplicate work but never expose
//! a partially written file.

use crate::error::CacheError;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader, RgbImage};
use log::debug;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

pub const DEFAULT_IMAGE_DPI: u32 = 180;
pub const DEFAULT_IMAGE_QUALITY: u8 = 80;

const CACHE_EXTENSION: &str = "jpg";

#[derive(Debug, Clone, PartialEq)]
pub struct ImagePreprocessResult {
    pub path: PathBuf,
    pub cache_hit: bool,
    pub elapsed: Duration,
}

impl ImagePreprocessResult {
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

/// Pixel dimensions of an image after its EXIF orientation is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
}

/// Converts a drawing area in points to the pixel budget needed at `dpi`.
pub fn target_pixels_for_bounds(width_pt: f32, height_pt: f32, dpi: u32) -> (u32, u32) {
    let to_px = |pt: f32| ((pt / 72.0) * dpi as f32).round().max(1.0) as u32;
    (to_px(width_pt), to_px(height_pt))
}

fn open_decoder(path: &Path) -> Result<impl ImageDecoder, CacheError> {
    if !path.exists() {
        return Err(CacheError::NotFound(path.to_path_buf()));
    }
    let decode_err = |source| CacheError::Decode {
        path: path.to_path_buf(),
        source,
    };
    ImageReader::open(path)?
        .with_guessed_format()?
        .into_decoder()
        .map_err(decode_err)
}

/// Reads the oriented dimensions of an image without decoding its pixels.
pub fn probe(path: &Path) -> Result<ImageInfo, CacheError> {
    let mut decoder = open_decoder(path)?;
    let (width, height) = decoder.dimensions();
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let swapped = matches!(
        orientation,
        Orientation::Rotate90
            | Orientation::Rotate270
            | Orientation::Rotate90FlipH
            | Orientation::Rotate270FlipH
    );
    Ok(if swapped {
        ImageInfo {
            width: height,
            height: width,
        }
    } else {
        ImageInfo { width, height }
    })
}

/// Decodes an image and applies its EXIF orientation.
pub fn load_oriented(path: &Path) -> Result<DynamicImage, CacheError> {
    let mut decoder = open_decoder(path)?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let mut image = DynamicImage::from_decoder(decoder).map_err(|source| CacheError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    image.apply_orientation(orientation);
    Ok(image)
}

/// Composites any alpha channel onto a white backdrop.
fn flatten_onto_white(image: DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }
    let rgba = image.to_rgba8();
    let mut flat = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as u16;
        let blend = |c: u8| ((c as u16 * alpha + 255 * (255 - alpha)) / 255) as u8;
        flat.put_pixel(x, y, image::Rgb([blend(r), blend(g), blend(b)]));
    }
    flat
}

/// A directory of preprocessed JPEG copies shared by every export in the process.
#[derive(Debug, Clone)]
pub struct ImageCache {
    dir: PathBuf,
}

impl ImageCache {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Result<Self, CacheError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// A cache rooted in the system temp directory.
    pub fn in_temp_dir() -> Result<Self, CacheError> {
        Self::new(std::env::temp_dir().join("rigsheet_image_cache"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn cache_key(
        path: &Path,
        mtime: Duration,
        target_px: (u32, u32),
        quality: u8,
    ) -> String {
        let token = format!(
            "{}|{}|{}x{}|q{}",
            path.display(),
            mtime.as_nanos(),
            target_px.0,
            target_px.1,
            quality
        );
        format!("{:x}", Sha256::digest(token.as_bytes()))
    }

    /// Returns a JPEG copy of `path` fitting within the target pixel box,
    /// producing and caching it on first use.
    pub fn preprocess(
        &self,
        path: &Path,
        target_width: u32,
        target_height: u32,
        quality: u8,
    ) -> Result<ImagePreprocessResult, CacheError> {
        let start = Instant::now();
        if !path.exists() {
            return Err(CacheError::NotFound(path.to_path_buf()));
        }
        let absolute = path.canonicalize()?;
        let mtime = fs::metadata(&absolute)?
            .modified()?
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let target_px = (target_width.max(1), target_height.max(1));
        let quality = quality.clamp(1, 100);
        let key = Self::cache_key(&absolute, mtime, target_px, quality);
        let cache_path = self.dir.join(format!("{key}.{CACHE_EXTENSION}"));

        if cache_path.is_file() {
            let elapsed = start.elapsed();
            debug!(
                "image cache hit path={} target={}x{} quality={} elapsed_ms={:.2}",
                path.display(),
                target_px.0,
                target_px.1,
                quality,
                elapsed.as_secs_f64() * 1000.0
            );
            return Ok(ImagePreprocessResult {
                path: cache_path,
                cache_hit: true,
                elapsed,
            });
        }

        let oriented = load_oriented(&absolute)?;
        let mut working = DynamicImage::ImageRgb8(flatten_onto_white(oriented));
        if working.width() > target_px.0 || working.height() > target_px.1 {
            working = working.resize(target_px.0, target_px.1, FilterType::Lanczos3);
        }

        let mut staging = tempfile::Builder::new()
            .prefix(".staging-")
            .suffix(".tmp")
            .tempfile_in(&self.dir)?;
        {
            let mut writer = BufWriter::new(staging.as_file_mut());
            JpegEncoder::new_with_quality(&mut writer, quality)
                .encode_image(&working)
                .map_err(CacheError::Encode)?;
            writer.flush()?;
        }
        staging.persist(&cache_path).map_err(|e| CacheError::Io(e.error))?;

        let elapsed = start.elapsed();
        debug!(
            "image cache miss path={} target={}x{} quality={} elapsed_ms={:.2}",
            path.display(),
            target_px.0,
            target_px.1,
            quality,
            elapsed.as_secs_f64() * 1000.0
        );
        Ok(ImagePreprocessResult {
            path: cache_path,
            cache_hit: false,
            elapsed,
        })
    }

    /// Deletes cached files not modified within `max_age`. Returns how many
    /// files were removed. Files another process is still writing are left alone.
    pub fn purge_older_than(&self, max_age: Duration) -> Result<usize, CacheError> {
        let now = SystemTime::now();
        let mut removed = 0;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(CACHE_EXTENSION) {
                continue;
            }
            let modified = entry.metadata()?.modified()?;
            let age = now.duration_since(modified).unwrap_or_default();
            if age > max_age && fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
        if removed > 0 {
            debug!("purged {} cached images from {}", removed, self.dir.display());
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::tempdir;

    fn write_png(path: &Path, width: u32, height: u32, pixel: [u8; 4]) {
        RgbaImage::from_pixel(width, height, Rgba(pixel))
            .save(path)
            .unwrap();
    }

    #[test]
    fn second_call_is_a_hit_with_same_path() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("truck.png");
        write_png(&source, 64, 32, [200, 10, 10, 255]);
        let cache = ImageCache::new(dir.path().join("cache")).unwrap();

        let first = cache.preprocess(&source, 32, 32, 80).unwrap();
        let second = cache.preprocess(&source, 32, 32, 80).unwrap();

        assert!(!first.cache_hit);
        assert!(second.cache_hit);
        assert_eq!(first.path, second.path);
        assert!(first.path.is_file());
    }

    #[test]
    fn different_quality_or_size_uses_a_new_entry() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("truck.png");
        write_png(&source, 64, 32, [0, 0, 255, 255]);
        let cache = ImageCache::new(dir.path().join("cache")).unwrap();

        let a = cache.preprocess(&source, 32, 32, 80).unwrap();
        let b = cache.preprocess(&source, 32, 32, 60).unwrap();
        let c = cache.preprocess(&source, 16, 16, 80).unwrap();
        assert_ne!(a.path, b.path);
        assert_ne!(a.path, c.path);
        assert!(!c.cache_hit);
    }

    #[test]
    fn downscales_preserving_aspect_ratio() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("wide.png");
        write_png(&source, 400, 100, [0, 255, 0, 255]);
        let cache = ImageCache::new(dir.path().join("cache")).unwrap();

        let result = cache.preprocess(&source, 200, 200, 90).unwrap();
        let info = probe(&result.path).unwrap();
        assert_eq!(info, ImageInfo { width: 200, height: 50 });
    }

    #[test]
    fn never_upscales() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("small.png");
        write_png(&source, 10, 20, [0, 255, 0, 255]);
        let cache = ImageCache::new(dir.path().join("cache")).unwrap();

        let result = cache.preprocess(&source, 500, 500, 90).unwrap();
        assert_eq!(probe(&result.path).unwrap(), ImageInfo { width: 10, height: 20 });
    }

    #[test]
    fn transparency_is_flattened_onto_white() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("clear.png");
        write_png(&source, 8, 8, [0, 0, 0, 0]);
        let cache = ImageCache::new(dir.path().join("cache")).unwrap();

        let result = cache.preprocess(&source, 8, 8, 100).unwrap();
        let decoded = image::open(&result.path).unwrap().to_rgb8();
        let pixel = decoded.get_pixel(4, 4).0;
        assert!(pixel.iter().all(|&c| c > 240), "expected white, got {pixel:?}");
    }

    #[test]
    fn missing_source_is_reported() {
        let dir = tempdir().unwrap();
        let cache = ImageCache::new(dir.path().join("cache")).unwrap();
        let err = cache
            .preprocess(&dir.path().join("nope.png"), 8, 8, 80)
            .unwrap_err();
        assert!(matches!(err, CacheError::NotFound(_)));
    }

    #[test]
    fn purge_removes_only_stale_entries() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("truck.png");
        write_png(&source, 16, 16, [1, 2, 3, 255]);
        let cache = ImageCache::new(dir.path().join("cache")).unwrap();
        let result = cache.preprocess(&source, 8, 8, 80).unwrap();

        assert_eq!(cache.purge_older_than(Duration::from_secs(3600)).unwrap(), 0);
        assert!(result.path.exists());
        assert_eq!(cache.purge_older_than(Duration::ZERO).unwrap(), 1);
        assert!(!result.path.exists());
    }

    #[test]
    fn target_pixels_scale_with_dpi() {
        assert_eq!(target_pixels_for_bounds(72.0, 36.0, 180), (180, 90));
        assert_eq!(target_pixels_for_bounds(0.0, 0.0, 180), (1, 1));
    }
}
