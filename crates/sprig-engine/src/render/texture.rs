use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use anyhow::{bail, Context};
use futures::future::{FutureExt, LocalBoxFuture, Shared};
use thiserror::Error;

use crate::coords::Vec2;
use crate::device::{GpuDevice, ImageData, TextureId};

struct TextureInner {
    width: u32,
    height: u32,
    id: Cell<Option<TextureId>>,
    /// Decoded pixels waiting for the first upload.
    pending: RefCell<Option<ImageData>>,
    released: Cell<bool>,
}

/// Shared handle to an RGBA texture.
///
/// Clones refer to the same texture; regions keep clones of the textures they
/// have bound, so a texture stays alive while a batch still samples it.
/// A texture created from decoded pixels uploads itself the first time a draw
/// needs it.
#[derive(Clone)]
pub struct Texture {
    inner: Rc<TextureInner>,
}

impl Texture {
    /// Texture that uploads `image` on first use.
    pub fn from_image(image: ImageData) -> Self {
        Self {
            inner: Rc::new(TextureInner {
                width: image.width,
                height: image.height,
                id: Cell::new(None),
                pending: RefCell::new(Some(image)),
                released: Cell::new(false),
            }),
        }
    }

    /// Texture already living on the device.
    pub(crate) fn uploaded(id: TextureId, width: u32, height: u32) -> Self {
        Self {
            inner: Rc::new(TextureInner {
                width,
                height,
                id: Cell::new(Some(id)),
                pending: RefCell::new(None),
                released: Cell::new(false),
            }),
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.inner.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.inner.height
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.inner.width as f32, self.inner.height as f32)
    }

    /// Device id, `None` until uploaded.
    #[inline]
    pub fn id(&self) -> Option<TextureId> {
        self.inner.id.get()
    }

    #[inline]
    pub fn is_released(&self) -> bool {
        self.inner.released.get()
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Texture) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Uploads pending pixels if needed and returns the device id.
    pub fn ensure_uploaded(&self, device: &mut dyn GpuDevice) -> anyhow::Result<TextureId> {
        if let Some(id) = self.inner.id.get() {
            return Ok(id);
        }
        if self.inner.released.get() {
            bail!("texture was deleted");
        }
        let Some(image) = self.inner.pending.take() else {
            bail!("texture has no pixel data");
        };
        let id = match device.create_texture(&image) {
            Ok(id) => id,
            Err(err) => {
                self.inner.pending.replace(Some(image));
                return Err(err).context("failed to upload texture");
            }
        };
        self.inner.id.set(Some(id));
        log::debug!("uploaded texture {:?} ({}x{})", id, self.inner.width, self.inner.height);
        Ok(id)
    }

    /// Uploads pending pixels, returning whether a device texture was created.
    pub(crate) fn upload_if_pending(&self, device: &mut dyn GpuDevice) -> bool {
        self.id().is_none() && !self.is_released() && self.ensure_uploaded(device).is_ok()
    }

    /// Frees the device texture. Later draws with this handle fail to bind.
    pub fn release(&self, device: &mut dyn GpuDevice) {
        if let Some(id) = self.inner.id.take() {
            device.delete_texture(id);
        }
        self.inner.pending.replace(None);
        self.inner.released.set(true);
    }
}

impl PartialEq for Texture {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("width", &self.inner.width)
            .field("height", &self.inner.height)
            .field("id", &self.inner.id.get())
            .field("released", &self.inner.released.get())
            .finish()
    }
}

// ── loading ───────────────────────────────────────────────────────────────

/// Decodes an image identified by a source string (path, URL, asset key).
pub trait ImageLoader {
    fn decode(&self, source: &str) -> LocalBoxFuture<'static, anyhow::Result<ImageData>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("failed to load image `{key}`: {message}")]
    Decode { key: String, message: String },
}

/// In-flight or finished load; every requester of one source polls the same one.
pub type TextureLoad = Shared<LocalBoxFuture<'static, Result<Texture, LoadError>>>;

/// Memoized source → texture map with single-flight loading.
///
/// The first `load` of a source starts one decode; later requests for the same
/// source, finished or not, get the same shared future and resolve to the same
/// [`Texture`]. Failures stay memoized until [`forget`](Self::forget).
pub struct TextureCache<L: ImageLoader> {
    loader: L,
    entries: HashMap<String, TextureLoad>,
}

impl<L: ImageLoader> TextureCache<L> {
    pub fn new(loader: L) -> Self {
        Self { loader, entries: HashMap::new() }
    }

    #[inline]
    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn load(&mut self, source: &str) -> TextureLoad {
        if let Some(load) = self.entries.get(source) {
            return load.clone();
        }

        log::debug!("loading texture `{source}`");
        let key = source.to_owned();
        let decode = self.loader.decode(source);
        let load = async move {
            match decode.await {
                Ok(image) => Ok(Texture::from_image(image)),
                Err(err) => Err(LoadError::Decode { key, message: format!("{err:#}") }),
            }
        }
        .boxed_local()
        .shared();

        self.entries.insert(source.to_owned(), load.clone());
        load
    }

    /// Resolved texture for `source`, if its load finished successfully.
    pub fn get(&self, source: &str) -> Option<Texture> {
        match self.entries.get(source)?.peek()? {
            Ok(texture) => Some(texture.clone()),
            Err(_) => None,
        }
    }

    #[inline]
    pub fn contains(&self, source: &str) -> bool {
        self.entries.contains_key(source)
    }

    /// Drops the memoized entry so the next `load` decodes again.
    pub fn forget(&mut self, source: &str) -> bool {
        self.entries.remove(source).is_some()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<L: ImageLoader> fmt::Debug for TextureCache<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureCache").field("entries", &self.entries.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HeadlessDevice;
    use anyhow::anyhow;
    use futures::channel::oneshot;

    type Reply = oneshot::Sender<anyhow::Result<ImageData>>;

    /// Loader whose decodes complete only when the test answers them.
    #[derive(Default)]
    struct ManualLoader {
        decodes: Cell<usize>,
        replies: RefCell<Vec<Reply>>,
    }

    impl ManualLoader {
        fn answer(&self, result: anyhow::Result<ImageData>) {
            let reply = self.replies.borrow_mut().remove(0);
            let _ = reply.send(result);
        }
    }

    impl ImageLoader for ManualLoader {
        fn decode(&self, _source: &str) -> LocalBoxFuture<'static, anyhow::Result<ImageData>> {
            self.decodes.set(self.decodes.get() + 1);
            let (tx, rx) = oneshot::channel();
            self.replies.borrow_mut().push(tx);
            async move {
                match rx.await {
                    Ok(result) => result,
                    Err(_) => Err(anyhow!("decode abandoned")),
                }
            }
            .boxed_local()
        }
    }

    // ── handles ───────────────────────────────────────────────────────────

    #[test]
    fn upload_is_lazy_and_once() {
        let mut dev = HeadlessDevice::new(4);
        let tex = Texture::from_image(ImageData::solid(2, 3, [0, 0, 0, 255]));
        assert_eq!(tex.id(), None);
        assert_eq!(tex.size(), Vec2::new(2.0, 3.0));

        let id = tex.ensure_uploaded(&mut dev).unwrap();
        assert_eq!(tex.clone().ensure_uploaded(&mut dev).unwrap(), id);
        assert_eq!(dev.live_textures(), 1);
    }

    #[test]
    fn released_texture_cannot_upload() {
        let mut dev = HeadlessDevice::new(4);
        let tex = Texture::from_image(ImageData::solid(1, 1, [255; 4]));
        tex.ensure_uploaded(&mut dev).unwrap();
        tex.release(&mut dev);
        assert_eq!(dev.live_textures(), 0);
        assert!(tex.ensure_uploaded(&mut dev).is_err());
    }

    #[test]
    fn failed_upload_keeps_pixels_for_retry() {
        let mut failing = HeadlessDevice::new(4).fail_texture_creation();
        let tex = Texture::from_image(ImageData::solid(1, 1, [255; 4]));
        assert!(tex.ensure_uploaded(&mut failing).is_err());

        let mut dev = HeadlessDevice::new(4);
        assert!(tex.ensure_uploaded(&mut dev).is_ok());
    }

    // ── cache ─────────────────────────────────────────────────────────────

    #[test]
    fn concurrent_loads_share_one_decode() {
        let mut cache = TextureCache::new(ManualLoader::default());
        let first = cache.load("hero.png");
        let second = cache.load("hero.png");
        assert_eq!(cache.loader().decodes.get(), 1);

        cache.loader().answer(Ok(ImageData::solid(4, 4, [255; 4])));
        let (a, b) = pollster::block_on(futures::future::join(first, second));
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(a.ptr_eq(&b));
        assert!(cache.get("hero.png").unwrap().ptr_eq(&a));

        // finished loads are memoized too
        let third = pollster::block_on(cache.load("hero.png")).unwrap();
        assert!(third.ptr_eq(&a));
        assert_eq!(cache.loader().decodes.get(), 1);
    }

    #[test]
    fn failures_are_memoized_until_forgotten() {
        let mut cache = TextureCache::new(ManualLoader::default());
        let load = cache.load("missing.png");
        cache.loader().answer(Err(anyhow!("404")));
        let err = pollster::block_on(load).unwrap_err();
        assert!(err.to_string().contains("missing.png"));
        assert!(cache.get("missing.png").is_none());

        assert!(pollster::block_on(cache.load("missing.png")).is_err());
        assert_eq!(cache.loader().decodes.get(), 1);

        assert!(cache.forget("missing.png"));
        let retry = cache.load("missing.png");
        cache.loader().answer(Ok(ImageData::solid(1, 1, [255; 4])));
        assert!(pollster::block_on(retry).is_ok());
        assert_eq!(cache.loader().decodes.get(), 2);
    }
}
