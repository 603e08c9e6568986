use crate::cursor::{BinaryCursor, CursorError};
use crate::header::*;
use crate::mesh::{Aabb, G3dMesh, UV_STRIDE, VN_STRIDE};
use crate::path::{PathError, resolve_path};

/// Broad class of a failure: bad input, or a dependency that did not arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Format,
    Resource,
}

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("Could not load")]
    NoData,
    #[error("({0:x}) is not a G3D model")]
    BadMagic(u32),
    #[error("Not a supported G3D model version ({0})")]
    BadVersion(u8),
    #[error("Has no meshes")]
    NoMeshes,
    #[error("Not a G3D mtMorphMesh")]
    MorphMesh,
    #[error("{0} has no frames")]
    NoFrames(String),
    #[error("{0} has no vertices")]
    NoVertices(String),
    #[error("{0} has no indices")]
    NoIndices(String),
    #[error("{name} bad number of indices: {count}")]
    BadIndexCount { name: String, count: u32 },
    #[error("{name} index[{position}]={index} out of bounds ({vertex_count})")]
    IndexOutOfBounds {
        name: String,
        position: u32,
        index: u32,
        vertex_count: u32,
    },
    #[error("{name} index[{position}]={index} does not fit in 16 bits")]
    IndexTooLarge {
        name: String,
        position: u32,
        index: u32,
    },
    #[error("{name} texture slot {slot}: {source}")]
    TexturePath {
        name: String,
        slot: usize,
        #[source]
        source: PathError,
    },
    #[error("Data ends too early: {0}")]
    NotEnoughData(#[from] CursorError),
    #[error("Unexpected extra data ({0} bytes)")]
    TooMuchData(usize),
}

impl ReadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReadError::NoData => ErrorKind::Resource,
            _ => ErrorKind::Format,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct G3dReaderSettings {
    /// Store V as `1 - v` so that textures come out upright in a renderer
    /// whose texture origin is the top-left corner.
    pub flip_tex_v: bool,
    /// Fail if bytes remain after the last mesh.
    pub reject_trailing_data: bool,
}

impl Default for G3dReaderSettings {
    fn default() -> Self {
        Self {
            flip_tex_v: true,
            reject_trailing_data: false,
        }
    }
}

/// Decodes a whole container in one pass.
///
/// Texture paths are resolved against `filename`, the path the container
/// itself was loaded from.
pub struct G3dReader<'s> {
    cursor: BinaryCursor<'s>,
    filename: &'s str,
    settings: G3dReaderSettings,
    version: Option<u8>,
}

impl<'s> G3dReader<'s> {
    pub fn new(
        filename: &'s str,
        data: &'s [u8],
    ) -> Self {
        Self::new_with_settings(Default::default(), filename, data)
    }

    pub fn new_with_settings(
        settings: G3dReaderSettings,
        filename: &'s str,
        data: &'s [u8],
    ) -> Self {
        Self {
            cursor: BinaryCursor::new(data),
            filename,
            settings,
            version: None,
        }
    }

    /// Byte offset the reader has reached; after a failure, where it stopped.
    pub fn offset(&self) -> usize {
        self.cursor.offset()
    }

    /// Reads the magic word and returns the format version.
    ///
    /// The magic word is only consumed once; later calls return the version
    /// already read.
    pub fn read_version(&mut self) -> Result<u8, ReadError> {
        if let Some(version) = self.version {
            return Ok(version);
        }
        let word = self.cursor.read_u32()?;
        let (tag, version) = split_magic(word);
        if tag != crate::MAGIC {
            return Err(ReadError::BadMagic(word));
        }
        if version != crate::FORMAT_VERSION {
            return Err(ReadError::BadVersion(version));
        }
        self.version = Some(version);
        Ok(version)
    }

    /// Decodes every mesh, in file order. Any failure discards them all.
    pub fn read_meshes(&mut self) -> Result<Vec<G3dMesh>, ReadError> {
        if self.version.is_none() && self.cursor.is_empty() {
            return Err(ReadError::NoData);
        }
        self.read_version()?;
        let mesh_count = self.cursor.read_u16()?;
        if mesh_count == 0 {
            return Err(ReadError::NoMeshes);
        }
        if self.cursor.read_u8()? != 0 {
            return Err(ReadError::MorphMesh);
        }
        let mut meshes = Vec::with_capacity(mesh_count as usize);
        for _ in 0..mesh_count {
            meshes.push(self.read_mesh()?);
        }
        if self.settings.reject_trailing_data && self.cursor.remaining() > 0 {
            return Err(ReadError::TooMuchData(self.cursor.remaining()));
        }
        Ok(meshes)
    }

    fn read_mesh(&mut self) -> Result<G3dMesh, ReadError> {
        let cur = &mut self.cursor;
        let record = cur.read_pod::<MeshRecordHeader>()?.to_native();
        let raw_name = record.name;
        let name = str_from_fixed(&raw_name);
        let frame_count = record.frame_count;
        if frame_count == 0 {
            return Err(ReadError::NoFrames(name));
        }
        let vertex_count = record.vertex_count;
        if vertex_count == 0 {
            return Err(ReadError::NoVertices(name));
        }
        let index_count = record.index_count;
        if index_count == 0 {
            return Err(ReadError::NoIndices(name));
        }
        if index_count % 3 != 0 {
            return Err(ReadError::BadIndexCount { name, count: index_count });
        }
        let texture_mask = record.texture_mask;

        let mut texture_paths: [Option<String>; TEXTURE_SLOTS] = Default::default();
        let mut diffuse_path = None;
        for (slot, path) in texture_paths.iter_mut().enumerate() {
            if texture_mask & (1 << slot) == 0 {
                continue;
            }
            let raw = cur.read_fixed_str::<FIXED_STR_LEN>()?;
            if slot == DIFFUSE_SLOT {
                let resolved = resolve_path(self.filename, &raw).map_err(|source| {
                    ReadError::TexturePath { name: name.clone(), slot, source }
                })?;
                diffuse_path = Some(resolved);
            }
            *path = Some(raw);
        }
        let tex_frame_count = if texture_mask != 0 { 1 } else { 0 };

        let frames = frame_count as usize;
        let vertices = vertex_count as usize;
        // f32 position+normal values, u/v pairs, u32 indices
        let payload = frames
            .checked_mul(vertices)
            .and_then(|n| n.checked_mul(VN_STRIDE))
            .and_then(|n| n.checked_add(tex_frame_count * vertices * UV_STRIDE))
            .and_then(|n| n.checked_add(index_count as usize))
            .and_then(|n| n.checked_mul(4))
            .unwrap_or(usize::MAX);
        cur.ensure(payload)?;
        // position pass fills slots 0..3 of each vertex, normal pass 3..6
        let mut vn_data = vec![0.0f32; frames * vertices * VN_STRIDE];
        let mut bounds = Aabb::EMPTY;
        for pass in 0..2 {
            for f in 0..frames {
                for v in 0..vertices {
                    let slot = f * vertices * VN_STRIDE + v * VN_STRIDE + pass * 3;
                    for j in 0..3 {
                        let value = cur.read_f32()?;
                        vn_data[slot + j] = value;
                        if pass == 0 {
                            bounds.extend_axis(j, value);
                        }
                    }
                }
            }
        }

        let mut t_data = Vec::with_capacity(tex_frame_count * vertices * UV_STRIDE);
        for _ in 0..tex_frame_count * vertices {
            let u = cur.read_f32()?;
            let v = cur.read_f32()?;
            t_data.push(u);
            t_data.push(if self.settings.flip_tex_v { 1.0 - v } else { v });
        }

        let mut i_data = Vec::with_capacity(index_count as usize);
        for position in 0..index_count {
            let index = cur.read_u32()?;
            if index > u16::MAX as u32 {
                return Err(ReadError::IndexTooLarge {
                    name,
                    position,
                    index,
                });
            }
            if index >= vertex_count {
                return Err(ReadError::IndexOutOfBounds {
                    name,
                    position,
                    index,
                    vertex_count,
                });
            }
            i_data.push(index as u16);
        }

        Ok(G3dMesh {
            name,
            frame_count,
            vertex_count,
            texture_mask,
            texture_paths,
            diffuse_path,
            vn_data,
            t_data,
            i_data,
            bounds,
            texture: None,
        })
    }
}

/// Checks only the magic word, without decoding anything else.
pub fn is_g3d_file(data: &[u8]) -> bool {
    BinaryCursor::new(data)
        .read_u32()
        .is_ok_and(|word| split_magic(word).0 == crate::MAGIC)
}
