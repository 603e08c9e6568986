use crate::header::{DIFFUSE_SLOT, TEXTURE_SLOTS};
use crate::texture::{RequestTag, TextureHandle, TextureNotification};

/// Floats per vertex per frame in the vertex/normal buffer.
pub const VN_STRIDE: usize = 6;
/// Floats per vertex per texture frame in the texture-coordinate buffer.
pub const UV_STRIDE: usize = 2;
/// Tag every mesh uses when asking for its diffuse texture.
pub const LOAD_TEXTURE: RequestTag = RequestTag(0);

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aabb {
    /// Contains nothing; extending it by any point yields that point.
    pub const EMPTY: Self = Self {
        min: [f32::MAX; 3],
        max: [f32::MIN; 3],
    };

    pub fn is_empty(&self) -> bool {
        (0..3).any(|i| self.min[i] > self.max[i])
    }

    pub fn extend_axis(&mut self, axis: usize, v: f32) {
        self.min[axis] = self.min[axis].min(v);
        self.max[axis] = self.max[axis].max(v);
    }

    pub fn extend(&mut self, p: [f32; 3]) {
        for (axis, v) in p.into_iter().enumerate() {
            self.extend_axis(axis, v);
        }
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        let mut r = *self;
        for i in 0..3 {
            r.min[i] = r.min[i].min(other.min[i]);
            r.max[i] = r.max[i].max(other.max[i]);
        }
        r
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("{mesh} could not load {path} (tag {tag})")]
    LoadFailed {
        mesh: String,
        path: String,
        tag: u32,
    },
    #[error("{mesh} did not ask for a texture but got {path}")]
    Unrequested { mesh: String, path: String },
}

/// One animated triangle mesh out of a container.
///
/// All arrays are filled by the decoder and never change afterwards; only the
/// diffuse texture handle arrives later.
#[derive(Debug, Clone)]
pub struct G3dMesh {
    pub(crate) name: String,
    pub(crate) frame_count: u32,
    pub(crate) vertex_count: u32,
    pub(crate) texture_mask: u32,
    pub(crate) texture_paths: [Option<String>; TEXTURE_SLOTS],
    pub(crate) diffuse_path: Option<String>,
    pub(crate) vn_data: Vec<f32>,
    pub(crate) t_data: Vec<f32>,
    pub(crate) i_data: Vec<u16>,
    pub(crate) bounds: Aabb,
    pub(crate) texture: Option<TextureHandle>,
}

impl G3dMesh {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.i_data.len() as u32
    }

    pub fn texture_mask(&self) -> u32 {
        self.texture_mask
    }

    /// 1 if the mesh references any texture, else 0.
    pub fn tex_frame_count(&self) -> u32 {
        if self.texture_mask != 0 { 1 } else { 0 }
    }

    /// Raw (unresolved) path of texture slot `slot`, as stored in the file.
    pub fn texture_path(&self, slot: usize) -> Option<&str> {
        self.texture_paths.get(slot)?.as_deref()
    }

    /// Diffuse texture path resolved against the container's own path.
    pub fn diffuse_path(&self) -> Option<&str> {
        self.diffuse_path.as_deref()
    }

    pub fn has_diffuse(&self) -> bool {
        self.texture_mask & (1 << DIFFUSE_SLOT) != 0
    }

    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Interleaved position+normal data of every frame, 6 floats per vertex.
    pub fn vertex_normals(&self) -> &[f32] {
        &self.vn_data
    }

    pub fn tex_coords(&self) -> &[f32] {
        &self.t_data
    }

    pub fn indices(&self) -> &[u16] {
        &self.i_data
    }

    pub fn frame_data(&self, frame: usize) -> Option<&[f32]> {
        let len = self.vertex_count as usize * VN_STRIDE;
        self.vn_data.get(frame_range(frame, len)?)
    }

    pub fn tex_frame_data(&self, frame: usize) -> Option<&[f32]> {
        let len = self.vertex_count as usize * UV_STRIDE;
        self.t_data.get(frame_range(frame, len)?)
    }

    /// Position of vertex `v` in frame `frame`.
    pub fn position(
        &self,
        frame: usize,
        v: usize,
    ) -> Option<[f32; 3]> {
        let vertex = frame_range(v, VN_STRIDE)?;
        let p = self.frame_data(frame)?.get(vertex.start..vertex.end - 3)?;
        Some([p[0], p[1], p[2]])
    }

    /// Normal of vertex `v` in frame `frame`.
    pub fn normal(
        &self,
        frame: usize,
        v: usize,
    ) -> Option<[f32; 3]> {
        let vertex = frame_range(v, VN_STRIDE)?;
        let n = self.frame_data(frame)?.get(vertex.start + 3..vertex.end)?;
        Some([n[0], n[1], n[2]])
    }

    /// Byte view of one frame, ready for upload as a vertex buffer.
    pub fn frame_bytes(&self, frame: usize) -> Option<&[u8]> {
        self.frame_data(frame).map(bytemuck::cast_slice)
    }

    pub fn tex_frame_bytes(&self, frame: usize) -> Option<&[u8]> {
        self.tex_frame_data(frame).map(bytemuck::cast_slice)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.i_data)
    }

    /// Picks the two keyframes to blend for `time` in `[0, 1]` (clamped) and
    /// the blend factor between them.
    pub fn frame_at(&self, time: f32) -> (usize, usize, f32) {
        let frames = self.frame_count.max(1) as usize;
        let t = time.clamp(0.0, 1.0) * frames as f32;
        let frame_0 = t as usize % frames;
        let frame_1 = (frame_0 + 1) % frames;
        (frame_0, frame_1, t.fract())
    }

    /// A mesh can be drawn once its diffuse texture (if any) has arrived.
    pub fn is_ready(&self) -> bool {
        !self.has_diffuse() || self.texture.is_some()
    }

    pub(crate) fn on_texture_loaded(
        &mut self,
        note: &TextureNotification,
    ) -> Result<(), TextureError> {
        if !self.has_diffuse() {
            return Err(TextureError::Unrequested {
                mesh: self.name.clone(),
                path: note.path.clone(),
            });
        }
        match note.handle {
            Some(handle) if note.tag == LOAD_TEXTURE => {
                self.texture = Some(handle);
                Ok(())
            }
            _ => Err(TextureError::LoadFailed {
                mesh: self.name.clone(),
                path: note.path.clone(),
                tag: note.tag.0,
            }),
        }
    }
}

/// Element range of chunk `index` when chunks are `len` long, if it is
/// addressable at all.
fn frame_range(
    index: usize,
    len: usize,
) -> Option<std::ops::Range<usize>> {
    let start = index.checked_mul(len)?;
    Some(start..start.checked_add(len)?)
}
