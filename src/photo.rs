use std::fs;
use std::path::PathBuf;
use std::thread;

use base64::{engine::general_purpose, Engine as _};
use crossbeam_channel::{unbounded, Receiver, Sender};
use image::imageops::FilterType;
use image::ImageFormat;

const DATA_URI_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

#[derive(Debug, thiserror::Error)]
pub enum PhotoError {
    #[error("photo is empty")]
    Empty,
    #[error("photo is {size} bytes, limit is {limit}")]
    TooLarge { size: u64, limit: u64 },
    #[error("not an image ({0})")]
    NotAnImage(String),
    #[error("decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("malformed data uri")]
    MalformedUri,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Encodes image bytes as `data:<mime>;base64,<payload>`.
pub fn encode_data_uri(bytes: &[u8], max_bytes: u64) -> Result<String, PhotoError> {
    if bytes.is_empty() {
        return Err(PhotoError::Empty);
    }
    let size = bytes.len() as u64;
    if size > max_bytes {
        return Err(PhotoError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let mime = detect_mime(bytes);
    if !mime.starts_with("image/") {
        return Err(PhotoError::NotAnImage(mime));
    }
    image::load_from_memory(bytes)?;

    let payload = general_purpose::STANDARD.encode(bytes);
    Ok(format!("{DATA_URI_PREFIX}{mime}{BASE64_MARKER}{payload}"))
}

pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, PhotoError> {
    let rest = uri
        .strip_prefix(DATA_URI_PREFIX)
        .ok_or(PhotoError::MalformedUri)?;
    let (_, payload) = rest
        .split_once(BASE64_MARKER)
        .ok_or(PhotoError::MalformedUri)?;
    Ok(general_purpose::STANDARD.decode(payload.trim())?)
}

pub fn mime_of(uri: &str) -> Option<&str> {
    let rest = uri.strip_prefix(DATA_URI_PREFIX)?;
    rest.split_once(BASE64_MARKER).map(|(mime, _)| mime)
}

pub fn is_image_uri(uri: &str) -> bool {
    mime_of(uri).is_some_and(|mime| mime.starts_with("image/"))
}

fn detect_mime(bytes: &[u8]) -> String {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Jpeg) => "image/jpeg".into(),
        Ok(ImageFormat::Png) => "image/png".into(),
        Ok(ImageFormat::Gif) => "image/gif".into(),
        Ok(ImageFormat::WebP) => "image/webp".into(),
        _ => {
            let head = &bytes[..bytes.len().min(512)];
            tree_magic_mini::from_u8(head).to_string()
        }
    }
}

/// An image reduced to a grid of terminal cells. Each cell carries two
/// vertically stacked pixels, drawn as an upper half block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub cols: u16,
    pub rows: u16,
    pub width: u32,
    pub height: u32,
    cells: Vec<([u8; 3], [u8; 3])>,
}

impl Thumbnail {
    pub fn from_data_uri(uri: &str, max_cols: u16, max_rows: u16) -> Result<Self, PhotoError> {
        let bytes = decode_data_uri(uri)?;
        let image = image::load_from_memory(&bytes)?;
        let (width, height) = (image.width(), image.height());
        let (cols, rows) = fit_cells(width, height, max_cols, max_rows);

        let scaled = image
            .resize_exact(u32::from(cols), u32::from(rows) * 2, FilterType::Triangle)
            .to_rgb8();
        let mut cells = Vec::with_capacity(usize::from(cols) * usize::from(rows));
        for row in 0..u32::from(rows) {
            for col in 0..u32::from(cols) {
                let top = scaled.get_pixel(col, row * 2).0;
                let bottom = scaled.get_pixel(col, row * 2 + 1).0;
                cells.push((top, bottom));
            }
        }

        Ok(Self {
            cols,
            rows,
            width,
            height,
            cells,
        })
    }

    /// (top, bottom) colors of the cell at `col`, `row`.
    pub fn cell(&self, col: u16, row: u16) -> Option<([u8; 3], [u8; 3])> {
        if col >= self.cols || row >= self.rows {
            return None;
        }
        self.cells
            .get(usize::from(row) * usize::from(self.cols) + usize::from(col))
            .copied()
    }
}

// Terminal cells are roughly twice as tall as they are wide, so one cell
// row covers two source pixel rows.
fn fit_cells(width: u32, height: u32, max_cols: u16, max_rows: u16) -> (u16, u16) {
    let max_cols = f64::from(max_cols.max(1));
    let max_rows = f64::from(max_rows.max(1));
    let native_cols = f64::from(width.max(1));
    let native_rows = f64::from(height.max(1)) / 2.0;

    let scale = (max_cols / native_cols).min(max_rows / native_rows).min(1.0);
    let cols = (native_cols * scale).round().clamp(1.0, max_cols) as u16;
    let rows = (native_rows * scale).round().clamp(1.0, max_rows) as u16;
    (cols, rows)
}

/// Destination of a decoded photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Draft,
    Profile,
}

#[derive(Debug)]
pub struct DecodeResult {
    pub slot: Slot,
    pub generation: u64,
    pub outcome: Result<String, PhotoError>,
}

struct Job {
    slot: Slot,
    generation: u64,
    path: PathBuf,
}

/// Reads and encodes photo files off the UI thread. Results come back
/// through `try_recv` in completion order, tagged with the slot and
/// generation they were requested with.
pub struct Decoder {
    jobs: Option<Sender<Job>>,
    results: Receiver<DecodeResult>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Decoder {
    pub fn new(max_bytes: u64) -> Self {
        let (job_tx, job_rx) = unbounded::<Job>();
        let (result_tx, result_rx) = unbounded();
        let handle = thread::spawn(move || decode_worker(job_rx, result_tx, max_bytes));
        Self {
            jobs: Some(job_tx),
            results: result_rx,
            handle: Some(handle),
        }
    }

    pub fn request(&self, slot: Slot, generation: u64, path: PathBuf) {
        if let Some(jobs) = &self.jobs {
            let _ = jobs.send(Job {
                slot,
                generation,
                path,
            });
        }
    }

    pub fn try_recv(&self) -> Option<DecodeResult> {
        self.results.try_recv().ok()
    }
}

impl Drop for Decoder {
    fn drop(&mut self) {
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn decode_worker(jobs: Receiver<Job>, results: Sender<DecodeResult>, max_bytes: u64) {
    for job in jobs {
        let outcome = fs::read(&job.path)
            .map_err(|source| PhotoError::Read {
                path: job.path.clone(),
                source,
            })
            .and_then(|bytes| encode_data_uri(&bytes, max_bytes));
        if let Err(err) = &outcome {
            tracing::warn!(path = %job.path.display(), error = %err, "photo decode failed");
        }
        let result = DecodeResult {
            slot: job.slot,
            generation: job.generation,
            outcome,
        };
        if results.send(result).is_err() {
            break;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;
    use std::thread;
    use std::time::Duration;
    use tempfile::tempdir;

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = image::RgbImage::from_fn(width, height, |x, _| {
            if x % 2 == 0 {
                image::Rgb([255, 0, 0])
            } else {
                image::Rgb([0, 0, 255])
            }
        });
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(image)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn encodes_png_as_data_uri() {
        let bytes = png_bytes(4, 4);
        let uri = encode_data_uri(&bytes, 1024 * 1024).unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
        assert_eq!(mime_of(&uri), Some("image/png"));
        assert_eq!(decode_data_uri(&uri).unwrap(), bytes);
    }

    #[test]
    fn rejects_empty_and_oversized() {
        assert!(matches!(encode_data_uri(&[], 10), Err(PhotoError::Empty)));
        let bytes = png_bytes(8, 8);
        let err = encode_data_uri(&bytes, 10).unwrap_err();
        assert!(matches!(err, PhotoError::TooLarge { limit: 10, .. }));
    }

    #[test]
    fn rejects_non_images() {
        let err = encode_data_uri(b"just some plain text, not an image", 1024).unwrap_err();
        assert!(matches!(err, PhotoError::NotAnImage(_)));
    }

    #[test]
    fn rejects_truncated_images() {
        let bytes = png_bytes(16, 16);
        let err = encode_data_uri(&bytes[..40], 1024 * 1024).unwrap_err();
        assert!(matches!(err, PhotoError::Decode(_)));
    }

    #[test]
    fn decode_rejects_malformed_uris() {
        assert!(matches!(
            decode_data_uri("http://example.com/a.png"),
            Err(PhotoError::MalformedUri)
        ));
        assert!(matches!(
            decode_data_uri("data:image/png;base64,***"),
            Err(PhotoError::Base64(_))
        ));
        assert!(!is_image_uri("data:text/plain;base64,aGk="));
        assert!(is_image_uri("data:image/gif;base64,R0lG"));
    }

    #[test]
    fn thumbnail_fits_within_bounds() {
        let uri = encode_data_uri(&png_bytes(64, 32), 1024 * 1024).unwrap();
        let thumb = Thumbnail::from_data_uri(&uri, 16, 8).unwrap();
        assert_eq!((thumb.width, thumb.height), (64, 32));
        assert!(thumb.cols <= 16);
        assert!(thumb.rows <= 8);
        assert!(thumb.cell(0, 0).is_some());
        assert!(thumb.cell(thumb.cols, 0).is_none());
    }

    #[test]
    fn small_images_are_not_upscaled() {
        assert_eq!(fit_cells(4, 4, 40, 20), (4, 2));
        assert_eq!(fit_cells(1, 1, 40, 20), (1, 1));
    }

    fn wait_for(decoder: &Decoder) -> DecodeResult {
        for _ in 0..200 {
            if let Some(result) = decoder.try_recv() {
                return result;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("decoder produced no result");
    }

    #[test]
    fn decoder_reads_files_on_worker() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("photo.png");
        fs::write(&path, png_bytes(4, 4)).unwrap();

        let decoder = Decoder::new(1024 * 1024);
        decoder.request(Slot::Profile, 7, path);
        let result = wait_for(&decoder);
        assert_eq!(result.slot, Slot::Profile);
        assert_eq!(result.generation, 7);
        assert!(result.outcome.unwrap().starts_with("data:image/png"));
    }

    #[test]
    fn decoder_reports_missing_files() {
        let dir = tempdir().unwrap();
        let decoder = Decoder::new(1024);
        decoder.request(Slot::Draft, 1, dir.path().join("missing.png"));
        let result = wait_for(&decoder);
        assert!(matches!(result.outcome, Err(PhotoError::Read { .. })));
    }

    #[test]
    fn decoder_applies_the_size_limit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.png");
        fs::write(&path, png_bytes(32, 32)).unwrap();
        let decoder = Decoder::new(16);
        decoder.request(Slot::Draft, 1, path);
        let result = wait_for(&decoder);
        assert!(matches!(result.outcome, Err(PhotoError::TooLarge { .. })));
    }
}
