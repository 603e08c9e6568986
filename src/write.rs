use std::io::Write;

use crate::header::*;

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid mesh {name}: {reason}")]
    InvalidMesh { name: String, reason: &'static str },
    #[error("No source meshes provided")]
    NoMeshes,
    #[error("Too many meshes: {0}")]
    TooManyMeshes(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct G3dWriterSettings {
    /// Version byte written into the magic word.
    pub version: u8,
    /// Refuse meshes a decoder would reject.
    ///
    /// Turning this off lets malformed files be produced on purpose.
    pub validate: bool,
}

impl Default for G3dWriterSettings {
    fn default() -> Self {
        Self {
            version: crate::FORMAT_VERSION,
            validate: true,
        }
    }
}

/// Borrowed arrays of one mesh, in file order.
#[derive(Debug, Clone, Default)]
pub struct MeshSource<'s> {
    pub name: &'s str,
    pub frame_count: u32,
    pub vertex_count: u32,
    /// `frame_count * vertex_count * 3` floats, frame by frame.
    pub positions: &'s [f32],
    /// Same layout as `positions`.
    pub normals: &'s [f32],
    /// `vertex_count * 2` floats (u, v), as stored on disk.
    pub tex_coords: Option<&'s [f32]>,
    pub indices: &'s [u32],
    pub texture_paths: [Option<&'s str>; TEXTURE_SLOTS],
}

impl<'s> MeshSource<'s> {
    pub fn texture_mask(&self) -> u32 {
        self.texture_paths
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_some())
            .fold(0, |mask, (slot, _)| mask | (1 << slot))
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        let per_frame = self.frame_count as usize * self.vertex_count as usize * 3;
        if self.name.len() > FIXED_STR_LEN {
            return Err("name longer than 64 bytes");
        }
        if self.frame_count == 0 || self.vertex_count == 0 {
            return Err("no frames or no vertices");
        }
        if self.indices.is_empty() || self.indices.len() % 3 != 0 {
            return Err("index count must be a non-zero multiple of 3");
        }
        if self.positions.len() != per_frame || self.normals.len() != per_frame {
            return Err("position/normal data does not match frame and vertex counts");
        }
        let uv_len = self.vertex_count as usize * 2;
        match (self.texture_mask() != 0, self.tex_coords) {
            (true, Some(uv)) if uv.len() == uv_len => {}
            (false, None) => {}
            _ => return Err("texture coordinates must be present exactly when textures are"),
        }
        if self.texture_paths.iter().flatten().any(|p| p.is_empty() || p.len() > FIXED_STR_LEN) {
            return Err("texture path empty or longer than 64 bytes");
        }
        let limit = self.vertex_count.min(u16::MAX as u32 + 1);
        if self.indices.iter().any(|i| *i >= limit) {
            return Err("index out of bounds");
        }
        Ok(())
    }
}

/// Encodes meshes into a container.
pub struct G3dWriter<'s> {
    settings: G3dWriterSettings,
    src_meshes: Vec<MeshSource<'s>>,
}

impl<'s> G3dWriter<'s> {
    pub fn new() -> Self {
        Self::new_with_settings(Default::default())
    }

    pub fn new_with_settings(settings: G3dWriterSettings) -> Self {
        Self {
            settings,
            src_meshes: vec![],
        }
    }

    pub fn add_mesh(
        &mut self,
        mesh: MeshSource<'s>,
    ) -> Result<(), WriteError> {
        if self.settings.validate {
            mesh.validate().map_err(|reason| WriteError::InvalidMesh {
                name: mesh.name.to_owned(),
                reason,
            })?;
        }
        self.src_meshes.push(mesh);
        Ok(())
    }

    pub fn with_mesh(
        mut self,
        mesh: MeshSource<'s>,
    ) -> Result<Self, WriteError> {
        self.add_mesh(mesh)?;
        Ok(self)
    }

    pub fn write_to(
        &self,
        write: &mut dyn Write,
    ) -> Result<(), WriteError> {
        if self.settings.validate && self.src_meshes.is_empty() {
            return Err(WriteError::NoMeshes);
        }
        let mesh_count = u16::try_from(self.src_meshes.len())
            .map_err(|_| WriteError::TooManyMeshes(self.src_meshes.len()))?;
        let header = G3dHeader::new(self.settings.version, mesh_count);
        write.write_all(header.as_bytes())?;
        for m in self.src_meshes.iter() {
            let record = MeshRecordHeader {
                name: fixed_str(m.name),
                frame_count: m.frame_count,
                vertex_count: m.vertex_count,
                index_count: m.indices.len() as u32,
                reserved: [0; MESH_RESERVED_LEN / 4],
                texture_mask: m.texture_mask(),
            }
            .to_le();
            write.write_all(record.as_bytes())?;
            for path in m.texture_paths.iter().flatten() {
                write.write_all(&fixed_str(path))?;
            }
            write_f32s(write, m.positions)?;
            write_f32s(write, m.normals)?;
            if let Some(uv) = m.tex_coords {
                write_f32s(write, uv)?;
            }
            for i in m.indices {
                write.write_all(&i.to_le_bytes())?;
            }
        }
        Ok(())
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, WriteError> {
        let mut out = vec![];
        self.write_to(&mut out)?;
        Ok(out)
    }
}

impl Default for G3dWriter<'_> {
    fn default() -> Self {
        Self::new()
    }
}

fn write_f32s(
    write: &mut dyn Write,
    values: &[f32],
) -> Result<(), WriteError> {
    for v in values {
        write.write_all(&v.to_le_bytes())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    static POSITIONS: &[f32] = &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    static NORMALS: &[f32] = &[0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0];

    fn triangle() -> MeshSource<'static> {
        MeshSource {
            name: "tri",
            frame_count: 1,
            vertex_count: 3,
            positions: POSITIONS,
            normals: NORMALS,
            indices: &[0, 1, 2],
            ..Default::default()
        }
    }

    #[test]
    fn encoded_size() {
        let bytes = G3dWriter::new().with_mesh(triangle()).unwrap().to_vec().unwrap();
        let expected = G3dHeader::encoded_len() + MeshRecordHeader::encoded_len() + 18 * 4 + 3 * 4;
        assert_eq!(bytes.len(), expected);
        assert_eq!(&bytes[..4], b"G3D\x04");
    }

    #[test]
    fn texture_mask_from_paths() {
        let mut mesh = triangle();
        mesh.texture_paths[0] = Some("a.png");
        mesh.texture_paths[3] = Some("b.png");
        assert_eq!(mesh.texture_mask(), 0b1001);
        // textures without coordinates
        assert!(mesh.validate().is_err());
        mesh.tex_coords = Some(&[0.0; 6]);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn rejects_invalid_meshes() {
        let mut mesh = triangle();
        mesh.indices = &[0, 1, 2, 0];
        assert!(matches!(
            G3dWriter::new().add_mesh(mesh),
            Err(WriteError::InvalidMesh { .. })
        ));
        let mut mesh = triangle();
        mesh.indices = &[0, 1, 3];
        assert!(mesh.validate().is_err());
        assert!(matches!(G3dWriter::new().to_vec(), Err(WriteError::NoMeshes)));
    }
}
