pub mod cursor;
pub mod header;
pub mod path;

pub mod read;
pub mod write;

pub mod mesh;
pub mod model;
pub mod texture;

pub mod xml;

/// The only container layout this crate can decode.
pub const FORMAT_VERSION: u8 = 4;
pub const MAGIC: [u8; 3] = [b'G', b'3', b'D'];

pub type HashMap<K, V> = rapidhash::RapidHashMap<K, V>;
pub type HashSet<T> = rapidhash::RapidHashSet<T>;
