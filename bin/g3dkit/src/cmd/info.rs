use g3dkit::HashSet;
use g3dkit::model::G3dModel;
use g3dkit::read::G3dReaderSettings;
use g3dkit::texture::TextureCache;

use crate::CommonArgs;
use crate::prelude::*;
use crate::util::{ImageSniffer, LoadStatus, load_textures, read_file};

#[derive(clap::Args, Debug)]
pub struct InfoArgs {
    /// Do not try to load the textures the model references
    #[arg(long)]
    no_textures: bool,
    #[command(flatten)]
    rarg: crate::ReadArgs,
    #[command(flatten)]
    inpath: crate::InputPath,
}

pub fn run(
    args_common: &CommonArgs,
    args_cmd: &InfoArgs,
) -> AnyResult<()> {
    let path = &args_cmd.inpath.in_file;
    let filename = path.to_string_lossy();
    let data = read_file(path)?;
    let mut model = G3dModel::decode_with_settings(
        G3dReaderSettings::from(&args_cmd.rarg),
        &filename,
        &data,
        0,
    )
    .context("Cannot decode model")?;

    let mut cache = TextureCache::new(ImageSniffer::default());
    let mut status = LoadStatus::default();
    if !args_cmd.no_textures {
        model.request_textures(&mut cache);
        load_textures(&mut model, &mut cache, &mut status)?;
    }

    println!("{}: {} mesh(es)", model.filename(), model.meshes().len());
    for mesh in model.meshes() {
        println!("  {:?}", mesh.name());
        println!(
            "    frames: {}  vertices: {}  triangles: {}",
            mesh.frame_count(),
            mesh.vertex_count(),
            mesh.index_count() / 3,
        );
        for slot in 0..g3dkit::header::TEXTURE_SLOTS {
            if let Some(tex) = mesh.texture_path(slot) {
                println!("    texture[{slot}]: {tex}");
            }
        }
        let b = mesh.bounds();
        println!("    bounds: {:?} .. {:?}", b.min, b.max);
        println!("    ready: {}", mesh.is_ready());
    }
    let b = model.bounds();
    println!("bounds: {:?} .. {:?}", b.min, b.max);

    let textures: HashSet<&str> = model.meshes().iter().filter_map(|m| m.diffuse_path()).collect();
    println!("diffuse textures: {}", textures.len());
    if args_common.verbose {
        for (path, kind, len) in cache.uploader().uploaded.iter() {
            eprintln!("Loaded {path} ({kind}, {len} bytes)");
        }
    }
    println!("ready: {}", model.is_ready());
    Ok(())
}
