//! Texture acquisition pipeline
//!
//! Turns an [`ImageSource`] into CPU-side texture pixels without blocking the
//! frame tick. Loads are futures polled cooperatively from [`TexturePipeline::poll`]
//! with a no-op waker; the frame loop drives them, so no extra threads are
//! involved. Every finished attempt produces a [`Texture`]: either the decoded
//! image or the procedural fallback. The previous texture stays current until
//! the next one is complete.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;
use image::RgbaImage;

use super::fallback;
use crate::error::TextureLoadError;

/// Raw result of fetching a source.
#[derive(Debug, Clone, PartialEq)]
pub enum SourcePayload {
    /// Encoded file contents (PNG, JPEG, ...)
    Encoded(Vec<u8>),
    /// Already decoded, tightly packed RGBA8 pixels
    Rgba {
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    },
}

/// Something a code image can be read from.
pub trait ImageSource {
    /// Human readable name for logs and errors.
    fn name(&self) -> &str;

    /// Starts fetching the image. The future is polled from the frame tick.
    fn fetch(&self) -> LocalBoxFuture<'static, Result<SourcePayload, TextureLoadError>>;

    /// Revokes whatever handle backs the source. Called once the source is
    /// superseded or the viewer is torn down.
    fn release(&mut self) {}
}

/// Image file on disk.
pub struct FileSource {
    path: PathBuf,
    name: String,
    remove_on_release: bool,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self {
            path,
            name,
            remove_on_release: false,
        }
    }

    /// Deletes the file on release, for images written to a scratch location.
    pub fn disposable(path: impl Into<PathBuf>) -> Self {
        Self {
            remove_on_release: true,
            ..Self::new(path)
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ImageSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self) -> LocalBoxFuture<'static, Result<SourcePayload, TextureLoadError>> {
        let path = self.path.clone();
        let name = self.name.clone();
        async move {
            std::fs::read(&path)
                .map(SourcePayload::Encoded)
                .map_err(|err| TextureLoadError::Io {
                    source_name: name,
                    message: err.to_string(),
                })
        }
        .boxed_local()
    }

    fn release(&mut self) {
        if !self.remove_on_release {
            return;
        }
        self.remove_on_release = false;
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("removed disposable source {}", self.name),
            Err(err) => log::warn!("could not remove disposable source {}: {err}", self.name),
        }
    }
}

/// Encoded image bytes held in memory.
pub struct MemorySource {
    name: String,
    bytes: Arc<[u8]>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes: Vec<u8> = bytes.into();
        Self {
            name: name.into(),
            bytes: Arc::from(bytes),
        }
    }
}

impl ImageSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self) -> LocalBoxFuture<'static, Result<SourcePayload, TextureLoadError>> {
        future::ready(Ok(SourcePayload::Encoded(self.bytes.to_vec()))).boxed_local()
    }
}

/// Decoded RGBA image, e.g. straight from a code generator.
pub struct RasterSource {
    name: String,
    image: Arc<RgbaImage>,
}

impl RasterSource {
    pub fn new(name: impl Into<String>, image: RgbaImage) -> Self {
        Self {
            name: name.into(),
            image: Arc::new(image),
        }
    }
}

impl ImageSource for RasterSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self) -> LocalBoxFuture<'static, Result<SourcePayload, TextureLoadError>> {
        let (width, height) = self.image.dimensions();
        future::ready(Ok(SourcePayload::Rgba {
            width,
            height,
            pixels: self.image.as_raw().clone(),
        }))
        .boxed_local()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    Valid,
    Fallback,
}

/// CPU copy of a texture. The renderer uploads it when the id changes.
#[derive(Debug, Clone)]
pub struct Texture {
    pub id: u64,
    pub kind: TextureKind,
    pub image: Arc<RgbaImage>,
}

impl Texture {
    pub fn is_fallback(&self) -> bool {
        self.kind == TextureKind::Fallback
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Outcome of a finished load.
#[derive(Debug, Clone)]
pub enum TextureUpdate {
    Ready(Texture),
    Fallback {
        texture: Texture,
        error: TextureLoadError,
    },
}

impl TextureUpdate {
    pub fn texture(&self) -> &Texture {
        match self {
            TextureUpdate::Ready(texture) => texture,
            TextureUpdate::Fallback { texture, .. } => texture,
        }
    }
}

struct PendingLoad {
    id: u64,
    source_name: String,
    future: LocalBoxFuture<'static, Result<SourcePayload, TextureLoadError>>,
    deadline: Instant,
}

pub struct TexturePipeline {
    timeout: Duration,
    fallback_size: u32,
    next_id: u64,
    current: Option<Texture>,
    pending: Option<PendingLoad>,
    /// Source behind `current`, plus the one currently loading
    active_source: Option<Box<dyn ImageSource>>,
    loading_source: Option<Box<dyn ImageSource>>,
    /// Time spent decoding the last fetched payload on the frame thread
    last_decode: Option<Duration>,
}

impl TexturePipeline {
    pub fn new(timeout: Duration, fallback_size: u32) -> Self {
        Self {
            timeout,
            fallback_size,
            next_id: 1,
            current: None,
            pending: None,
            active_source: None,
            loading_source: None,
            last_decode: None,
        }
    }

    pub fn current(&self) -> Option<&Texture> {
        self.current.as_ref()
    }

    pub fn last_decode_time(&self) -> Option<Duration> {
        self.last_decode
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Starts loading `source`. An absent source yields the fallback at once.
    ///
    /// A load still in flight is cancelled and its source released. Loads
    /// that finish on the first poll are reported straight away.
    pub fn acquire(
        &mut self,
        source: Option<Box<dyn ImageSource>>,
        now: Instant,
    ) -> Option<TextureUpdate> {
        self.cancel_pending();

        let id = self.next_id;
        self.next_id += 1;

        let Some(source) = source else {
            return Some(self.finish_fallback(id, TextureLoadError::MissingSource, None));
        };

        log::debug!("loading texture {id} from {}", source.name());
        self.pending = Some(PendingLoad {
            id,
            source_name: source.name().to_string(),
            future: source.fetch(),
            deadline: now + self.timeout,
        });
        self.loading_source = Some(source);
        self.poll(now)
    }

    /// Drives the in-flight load, if any. Never blocks.
    pub fn poll(&mut self, now: Instant) -> Option<TextureUpdate> {
        let pending = self.pending.as_mut()?;

        let mut cx = Context::from_waker(futures::task::noop_waker_ref());
        let outcome = match pending.future.poll_unpin(&mut cx) {
            Poll::Ready(result) => result,
            Poll::Pending if now >= pending.deadline => Err(TextureLoadError::Timeout {
                source_name: pending.source_name.clone(),
                timeout: self.timeout,
            }),
            Poll::Pending => return None,
        };

        let PendingLoad { id, source_name, .. } = self.pending.take()?;
        let source = self.loading_source.take();
        let decoded = outcome.and_then(|payload| {
            let started = Instant::now();
            let decoded = decode(&source_name, payload);
            let elapsed = started.elapsed();
            log::debug!("decoding texture {id} from {source_name} took {elapsed:?}");
            self.last_decode = Some(elapsed);
            decoded
        });
        let update = match decoded {
            Ok(image) => {
                let texture = Texture {
                    id,
                    kind: TextureKind::Valid,
                    image: Arc::new(image),
                };
                log::info!(
                    "texture {id} ready from {source_name} ({}x{})",
                    texture.image.width(),
                    texture.image.height()
                );
                self.swap_in(texture.clone(), source);
                TextureUpdate::Ready(texture)
            }
            Err(error) => self.finish_fallback(id, error, source),
        };
        Some(update)
    }

    /// Drops every texture and revokes every source handle.
    pub fn release_all(&mut self) {
        self.cancel_pending();
        self.current = None;
        if let Some(mut source) = self.active_source.take() {
            source.release();
        }
    }

    fn finish_fallback(
        &mut self,
        id: u64,
        error: TextureLoadError,
        source: Option<Box<dyn ImageSource>>,
    ) -> TextureUpdate {
        log::warn!("texture {id} falls back to placeholder: {error}");
        let texture = Texture {
            id,
            kind: TextureKind::Fallback,
            image: Arc::new(fallback::fallback_image(self.fallback_size)),
        };
        self.swap_in(texture.clone(), source);
        TextureUpdate::Fallback { texture, error }
    }

    fn swap_in(&mut self, texture: Texture, source: Option<Box<dyn ImageSource>>) {
        self.current = Some(texture);
        if let Some(mut previous) = std::mem::replace(&mut self.active_source, source) {
            previous.release();
        }
    }

    fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            log::debug!("cancelling texture load {} from {}", pending.id, pending.source_name);
        }
        if let Some(mut source) = self.loading_source.take() {
            source.release();
        }
    }
}

fn decode(source_name: &str, payload: SourcePayload) -> Result<RgbaImage, TextureLoadError> {
    let image = match payload {
        SourcePayload::Encoded(bytes) => image::load_from_memory(&bytes)
            .map_err(|err| match err {
                image::ImageError::Unsupported(_) => TextureLoadError::Unsupported {
                    source_name: source_name.to_string(),
                    message: err.to_string(),
                },
                other => TextureLoadError::Decode {
                    source_name: source_name.to_string(),
                    message: other.to_string(),
                },
            })?
            .to_rgba8(),
        SourcePayload::Rgba {
            width,
            height,
            pixels,
        } => {
            let expected = width as usize * height as usize * 4;
            let got = pixels.len();
            RgbaImage::from_raw(width, height, pixels).ok_or_else(|| {
                TextureLoadError::Unsupported {
                    source_name: source_name.to_string(),
                    message: format!("{width}x{height} needs {expected} bytes, got {got}"),
                }
            })?
        }
    };

    if image.width() == 0 || image.height() == 0 {
        return Err(TextureLoadError::Unsupported {
            source_name: source_name.to_string(),
            message: "image has zero size".to_string(),
        });
    }
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io::Cursor;
    use std::rc::Rc;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, image::Rgba([0, 0, 0, 255]));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    /// Never finishes; counts releases.
    struct StalledSource {
        released: Rc<Cell<u32>>,
    }

    impl ImageSource for StalledSource {
        fn name(&self) -> &str {
            "stalled"
        }

        fn fetch(&self) -> LocalBoxFuture<'static, Result<SourcePayload, TextureLoadError>> {
            future::pending().boxed_local()
        }

        fn release(&mut self) {
            self.released.set(self.released.get() + 1);
        }
    }

    fn pipeline() -> TexturePipeline {
        TexturePipeline::new(Duration::from_millis(500), 300)
    }

    #[test]
    fn valid_png_becomes_valid_texture() {
        let mut pipeline = pipeline();
        let update = pipeline
            .acquire(Some(Box::new(MemorySource::new("code", png_bytes(21, 21)))), Instant::now())
            .unwrap();
        assert!(matches!(update, TextureUpdate::Ready(_)));
        let current = pipeline.current().unwrap();
        assert_eq!(current.kind, TextureKind::Valid);
        assert_eq!(current.dimensions(), (21, 21));
    }

    #[test]
    fn decode_time_is_recorded_only_for_fetched_payloads() {
        let mut pipeline = pipeline();
        pipeline.acquire(None, Instant::now());
        assert_eq!(pipeline.last_decode_time(), None);

        pipeline.acquire(
            Some(Box::new(MemorySource::new("large", png_bytes(1024, 1024)))),
            Instant::now(),
        );
        assert!(pipeline.last_decode_time().is_some());
        assert_eq!(pipeline.current().unwrap().dimensions(), (1024, 1024));
    }

    #[test]
    fn missing_source_is_fallback() {
        let mut pipeline = pipeline();
        let update = pipeline.acquire(None, Instant::now()).unwrap();
        match update {
            TextureUpdate::Fallback { texture, error } => {
                assert_eq!(error, TextureLoadError::MissingSource);
                assert_eq!(texture.dimensions(), (300, 300));
            }
            other => panic!("expected fallback, got {other:?}"),
        }
    }

    #[test]
    fn garbage_bytes_fall_back() {
        let mut pipeline = pipeline();
        let update = pipeline
            .acquire(Some(Box::new(MemorySource::new("junk", vec![1, 2, 3, 4]))), Instant::now())
            .unwrap();
        assert!(update.texture().is_fallback());
    }

    #[test]
    fn unreadable_file_falls_back() {
        let mut pipeline = pipeline();
        let source = FileSource::new("/definitely/not/here/code.png");
        let update = pipeline.acquire(Some(Box::new(source)), Instant::now()).unwrap();
        match update {
            TextureUpdate::Fallback { error, .. } => {
                assert!(matches!(error, TextureLoadError::Io { .. }))
            }
            other => panic!("expected fallback, got {other:?}"),
        }
    }

    #[test]
    fn short_raster_is_rejected() {
        let err = decode(
            "raw",
            SourcePayload::Rgba {
                width: 4,
                height: 4,
                pixels: vec![0; 10],
            },
        )
        .unwrap_err();
        assert!(matches!(err, TextureLoadError::Unsupported { .. }));
    }

    #[test]
    fn stalled_source_times_out_into_fallback() {
        let released = Rc::new(Cell::new(0));
        let mut pipeline = pipeline();
        let start = Instant::now();

        let first = pipeline.acquire(
            Some(Box::new(StalledSource {
                released: released.clone(),
            })),
            start,
        );
        assert!(first.is_none());
        assert!(pipeline.is_loading());
        assert!(pipeline.poll(start + Duration::from_millis(100)).is_none());

        let update = pipeline.poll(start + Duration::from_millis(500)).unwrap();
        match update {
            TextureUpdate::Fallback { error, .. } => {
                assert!(matches!(error, TextureLoadError::Timeout { .. }))
            }
            other => panic!("expected timeout fallback, got {other:?}"),
        }
        assert!(!pipeline.is_loading());
        assert_eq!(released.get(), 0);

        pipeline.release_all();
        assert_eq!(released.get(), 1);
        assert!(pipeline.current().is_none());
    }

    #[test]
    fn current_texture_survives_until_replacement_is_ready() {
        let released = Rc::new(Cell::new(0));
        let mut pipeline = pipeline();
        let now = Instant::now();
        pipeline.acquire(Some(Box::new(MemorySource::new("a", png_bytes(8, 8)))), now);
        let first_id = pipeline.current().unwrap().id;

        pipeline.acquire(
            Some(Box::new(StalledSource {
                released: released.clone(),
            })),
            now,
        );
        assert_eq!(pipeline.current().unwrap().id, first_id);

        // Superseding an in-flight load releases its source
        pipeline.acquire(Some(Box::new(MemorySource::new("b", png_bytes(4, 4)))), now);
        assert_eq!(released.get(), 1);
        assert_ne!(pipeline.current().unwrap().id, first_id);
        assert_eq!(pipeline.current().unwrap().dimensions(), (4, 4));
    }

    #[test]
    fn disposable_file_is_removed_when_superseded() {
        let path = std::env::temp_dir().join(format!("codecube-src-{}.png", std::process::id()));
        std::fs::write(&path, png_bytes(5, 5)).unwrap();

        let mut pipeline = pipeline();
        let now = Instant::now();
        let update = pipeline.acquire(Some(Box::new(FileSource::disposable(&path))), now);
        assert!(matches!(update, Some(TextureUpdate::Ready(_))));
        assert!(path.exists());

        pipeline.acquire(None, now);
        assert!(!path.exists());
    }
}
