use g3dkit::model::{G3dModel, ModelObserver};
use g3dkit::texture::{TextureCache, TextureHandle, TextureUploader};

use crate::prelude::*;

/// Stands in for a renderer: accepts PNG and JPEG data and hands out
/// sequential handles.
#[derive(Debug, Default)]
pub struct ImageSniffer {
    pub uploaded: Vec<(String, &'static str, usize)>,
}

impl ImageSniffer {
    fn image_kind(bytes: &[u8]) -> Option<&'static str> {
        if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some("png")
        } else if bytes.starts_with(&[0xff, 0xd8, 0xff]) {
            Some("jpeg")
        } else {
            None
        }
    }
}

impl TextureUploader for ImageSniffer {
    fn upload(&mut self, path: &str, bytes: &[u8]) -> Option<TextureHandle> {
        let Some(kind) = Self::image_kind(bytes) else {
            log::warn!("{path} is not a PNG or JPEG image");
            return None;
        };
        self.uploaded.push((path.to_owned(), kind, bytes.len()));
        TextureHandle::new(self.uploaded.len() as u32)
    }
}

/// Remembers what the model reported about itself.
#[derive(Debug, Default)]
pub struct LoadStatus {
    pub loaded: Option<bool>,
}

impl ModelObserver for LoadStatus {
    fn on_model_loaded(&mut self, filename: &str, ok: bool) {
        log::info!("{filename}: {}", if ok { "ready" } else { "failed" });
        self.loaded = Some(ok);
    }
}

pub fn read_file(path: &Path) -> AnyResult<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Could not read {}", path.display()))
}

/// Fetches every texture the model asked for from the local filesystem
/// and delivers the results, until nothing is outstanding.
pub fn load_textures(
    model: &mut G3dModel,
    cache: &mut TextureCache<ImageSniffer>,
    status: &mut LoadStatus,
) -> AnyResult<()> {
    loop {
        let outbound = cache.take_outbound();
        if outbound.is_empty() {
            break;
        }
        for path in outbound {
            let bytes = std::fs::read(&path)
                .inspect_err(|e| log::warn!("Cannot read texture {path}: {e}"))
                .ok();
            cache.on_bytes(&path, bytes.as_deref());
        }
        for note in cache.drain_notifications() {
            model
                .on_texture_loaded(&note, status)
                .with_context(|| format!("Texture {} failed", note.path))?;
        }
    }
    Ok(())
}
