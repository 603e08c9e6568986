use crate::mesh::{Aabb, G3dMesh, LOAD_TEXTURE, TextureError};
use crate::read::{ErrorKind, G3dReader, G3dReaderSettings, ReadError};
use crate::texture::{RequesterId, TextureCancel, TextureFetch, TextureNotification};

/// Failed decode of one container, with where it happened.
#[derive(Debug, thiserror::Error)]
#[error("{filename} @{offset}: {source}")]
pub struct LoadError {
    pub filename: String,
    pub offset: usize,
    #[source]
    pub source: ReadError,
}

impl LoadError {
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

/// Told once per model: when it has loaded and every mesh is ready, or when
/// loading failed.
pub trait ModelObserver {
    fn on_model_loaded(&mut self, filename: &str, ok: bool);
}

/// A decoded container: its meshes in file order.
///
/// Decoding is all-or-nothing; a model only exists if every mesh in the file
/// decoded. Meshes with a diffuse texture stay not-ready until the texture
/// notification for them arrives.
#[derive(Debug, Clone)]
pub struct G3dModel {
    filename: String,
    owner: u64,
    meshes: Vec<G3dMesh>,
    notified: bool,
}

impl G3dModel {
    pub fn decode(
        filename: &str,
        data: &[u8],
        owner: u64,
    ) -> Result<Self, LoadError> {
        Self::decode_with_settings(Default::default(), filename, data, owner)
    }

    pub fn decode_with_settings(
        settings: G3dReaderSettings,
        filename: &str,
        data: &[u8],
        owner: u64,
    ) -> Result<Self, LoadError> {
        let mut reader = G3dReader::new_with_settings(settings, filename, data);
        match reader.read_meshes() {
            Ok(meshes) => Ok(Self {
                filename: filename.to_owned(),
                owner,
                meshes,
                notified: false,
            }),
            Err(source) => {
                log::error!("ERROR loading G3D {filename}: {source}");
                Err(LoadError {
                    filename: filename.to_owned(),
                    offset: reader.offset(),
                    source,
                })
            }
        }
    }

    /// Decodes the bytes a content fetch delivered (`None` if the fetch
    /// failed), asks `fetch` for every diffuse texture, and reports the
    /// outcome to `observer` as soon as it is known.
    pub fn load(
        filename: &str,
        data: Option<&[u8]>,
        owner: u64,
        fetch: &mut dyn TextureFetch,
        observer: &mut dyn ModelObserver,
    ) -> Result<Self, LoadError> {
        let result = match data {
            Some(data) => Self::decode(filename, data, owner),
            None => {
                log::error!("ERROR loading G3D {filename}: {}", ReadError::NoData);
                Err(LoadError {
                    filename: filename.to_owned(),
                    offset: 0,
                    source: ReadError::NoData,
                })
            }
        };
        match result {
            Ok(mut model) => {
                model.request_textures(fetch);
                model.notify_if_ready(observer);
                Ok(model)
            }
            Err(e) => {
                observer.on_model_loaded(filename, false);
                Err(e)
            }
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn owner(&self) -> u64 {
        self.owner
    }

    pub fn meshes(&self) -> &[G3dMesh] {
        &self.meshes
    }

    pub fn mesh_by_name(&self, name: &str) -> Option<&G3dMesh> {
        self.meshes.iter().find(|m| m.name() == name)
    }

    /// Requester key mesh `index` uses for its texture request.
    pub fn requester(&self, index: usize) -> RequesterId {
        RequesterId {
            owner: self.owner,
            slot: index as u32,
        }
    }

    /// Issues one request per mesh that references a diffuse texture.
    pub fn request_textures(
        &self,
        fetch: &mut dyn TextureFetch,
    ) {
        for (i, mesh) in self.meshes.iter().enumerate() {
            if let Some(path) = mesh.diffuse_path() {
                log::debug!("{}:{} wants texture {path}", self.filename, mesh.name());
                fetch.fetch_texture(path, self.requester(i), LOAD_TEXTURE);
            }
        }
    }

    /// Withdraws the texture requests of meshes that are still waiting.
    pub fn cancel_textures(
        &self,
        cancel: &mut dyn TextureCancel,
    ) {
        for (i, mesh) in self.meshes.iter().enumerate() {
            if !mesh.is_ready() {
                cancel.cancel_texture(self.requester(i), LOAD_TEXTURE);
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.meshes.iter().all(G3dMesh::is_ready)
    }

    /// Union of every mesh's bounds.
    pub fn bounds(&self) -> Aabb {
        self.meshes
            .iter()
            .fold(Aabb::EMPTY, |acc, m| acc.union(&m.bounds()))
    }

    /// Routes a texture notification to the mesh that asked for it. Returns
    /// whether the whole model is ready afterwards.
    pub fn on_texture_loaded(
        &mut self,
        note: &TextureNotification,
        observer: &mut dyn ModelObserver,
    ) -> Result<bool, TextureError> {
        let mesh = (note.requester.owner == self.owner)
            .then(|| self.meshes.get_mut(note.requester.slot as usize))
            .flatten();
        let result = match mesh {
            Some(mesh) => mesh.on_texture_loaded(note),
            None => Err(TextureError::Unrequested {
                mesh: format!("{}#{}", self.filename, note.requester.slot),
                path: note.path.clone(),
            }),
        };
        if let Err(e) = result {
            log::error!("ERROR loading G3D {}: {e}", self.filename);
            if !self.notified {
                self.notified = true;
                observer.on_model_loaded(&self.filename, false);
            }
            return Err(e);
        }
        Ok(self.notify_if_ready(observer))
    }

    fn notify_if_ready(
        &mut self,
        observer: &mut dyn ModelObserver,
    ) -> bool {
        let ready = self.is_ready();
        if ready && !self.notified {
            self.notified = true;
            observer.on_model_loaded(&self.filename, true);
        }
        ready
    }
}
