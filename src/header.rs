/// Bytes of uninterpreted header fields between the counts and the texture
/// bitmask of each mesh record (nine 32-bit words).
pub const MESH_RESERVED_LEN: usize = 9 * 4;
/// Width of every fixed string field (mesh name, texture path).
pub const FIXED_STR_LEN: usize = 64;
/// Number of texture slots addressable by the texture bitmask.
pub const TEXTURE_SLOTS: usize = 5;
/// Slot 0 of the texture bitmask holds the diffuse texture.
pub const DIFFUSE_SLOT: usize = 0;

/// Leading bytes of a container: magic, version, mesh count, morph flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C, packed)]
pub struct G3dHeader {
    pub magic: [u8; 4],
    pub mesh_count: u16,
    pub morph_flag: u8,
}

/// Fixed-size part of a mesh record, up to and including the texture bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C, packed)]
pub struct MeshRecordHeader {
    pub name: [u8; FIXED_STR_LEN],
    pub frame_count: u32,
    pub vertex_count: u32,
    pub index_count: u32,
    pub reserved: [u32; MESH_RESERVED_LEN / 4],
    pub texture_mask: u32,
}

/// Splits the little-endian magic word into the format tag and its version.
pub fn split_magic(word: u32) -> ([u8; 3], u8) {
    let [a, b, c, version] = word.to_le_bytes();
    ([a, b, c], version)
}

/// Text of a fixed string field, clipped at the first NUL byte.
pub fn str_from_fixed(raw: &[u8]) -> String {
    let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

pub fn fixed_str(s: &str) -> [u8; FIXED_STR_LEN] {
    let mut out = [0; FIXED_STR_LEN];
    let len = s.len().min(FIXED_STR_LEN);
    out[..len].copy_from_slice(&s.as_bytes()[..len]);
    out
}

impl G3dHeader {
    pub const fn encoded_len() -> usize {
        std::mem::size_of::<Self>()
    }

    pub fn new(
        version: u8,
        mesh_count: u16,
    ) -> Self {
        let [a, b, c] = crate::MAGIC;
        Self {
            magic: [a, b, c, version],
            mesh_count,
            morph_flag: 0,
        }
        .to_le()
    }

    pub fn to_le(&self) -> Self {
        Self {
            magic: self.magic,
            mesh_count: self.mesh_count.to_le(),
            morph_flag: self.morph_flag,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

impl MeshRecordHeader {
    pub const fn encoded_len() -> usize {
        std::mem::size_of::<Self>()
    }

    pub fn to_le(&self) -> Self {
        Self {
            name: self.name,
            frame_count: self.frame_count.to_le(),
            vertex_count: self.vertex_count.to_le(),
            index_count: self.index_count.to_le(),
            reserved: self.reserved,
            texture_mask: self.texture_mask.to_le(),
        }
    }

    pub fn to_native(&self) -> Self {
        Self {
            name: self.name,
            frame_count: u32::from_le(self.frame_count),
            vertex_count: u32::from_le(self.vertex_count),
            index_count: u32::from_le(self.index_count),
            reserved: self.reserved,
            texture_mask: u32::from_le(self.texture_mask),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_sizes() {
        assert_eq!(G3dHeader::encoded_len(), 7);
        assert_eq!(MeshRecordHeader::encoded_len(), 64 + 12 + MESH_RESERVED_LEN + 4);
    }

    #[test]
    fn magic_word_is_tag_then_version() {
        let header = G3dHeader::new(4, 1);
        let word = u32::from_le_bytes(header.magic);
        assert_eq!(split_magic(word), (*b"G3D", 4));
        assert_eq!(&header.as_bytes()[..4], b"G3D\x04");
    }

    #[test]
    fn record_reads_back_through_cursor() {
        let record = MeshRecordHeader {
            name: fixed_str("hull"),
            frame_count: 2,
            vertex_count: 30,
            index_count: 90,
            reserved: [0; MESH_RESERVED_LEN / 4],
            texture_mask: 1,
        }
        .to_le();
        let mut cur = crate::cursor::BinaryCursor::new(record.as_bytes());
        let back: MeshRecordHeader = cur.read_pod().unwrap();
        assert_eq!(back, record);
        assert_eq!(cur.remaining(), 0);
        let back = back.to_native();
        assert_eq!({ back.index_count }, 90);
        let name = back.name;
        assert_eq!(str_from_fixed(&name), "hull");
    }

    #[test]
    fn fixed_strings_clip_at_nul() {
        assert_eq!(str_from_fixed(b"ab\0cd"), "ab");
        assert_eq!(str_from_fixed(b"abcd"), "abcd");
        assert_eq!(str_from_fixed(&fixed_str("")), "");
    }
}
