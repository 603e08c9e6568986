use std::io::{BufReader, BufWriter};

use g3dkit::write::{G3dWriter, G3dWriterSettings, MeshSource};
use obj::raw::{RawObj, parse_obj};
use obj::{Obj, Position, TexturedVertex, Vertex};

use crate::CommonArgs;
use crate::prelude::*;

#[derive(clap::Args, Debug)]
pub struct FromObjArgs {
    /// Diffuse texture path to store in every mesh, relative to the output
    /// file
    ///
    /// Requires the OBJ files to have texture coordinates.
    #[arg(short, long)]
    texture: Option<String>,
    #[command(flatten)]
    warg: crate::WriteArgs,
    #[command(flatten)]
    oarg: crate::OutputArgs,
    #[command(flatten)]
    outpath: crate::OutputPath,
    #[command(flatten)]
    inpaths: crate::InputPaths,
}

/// Flat arrays of one OBJ file, single frame.
#[derive(Default)]
struct ObjBuffers {
    name: String,
    positions: Vec<f32>,
    normals: Vec<f32>,
    tex_coords: Vec<f32>,
    indices: Vec<u32>,
}

pub fn run(
    args_common: &CommonArgs,
    args_cmd: &FromObjArgs,
) -> AnyResult<()> {
    if args_cmd.inpaths.in_files.is_empty() {
        bail!("No input files provided.");
    }

    let mut bufs = vec![];
    for path in args_cmd.inpaths.in_files.iter() {
        let infile = std::fs::File::open(path)
            .context("Cannot open input OBJ file")?;
        let rawobj = parse_obj(BufReader::new(infile)).context("Cannot parse OBJ file")?;
        let mut b = ObjBuffers {
            name: rawobj
                .name
                .clone()
                .or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
                .unwrap_or_default(),
            ..Default::default()
        };
        try_ptn(rawobj.clone(), &mut b)
            .or_else(|_| try_pn(rawobj.clone(), &mut b))
            .or_else(|_| try_p(rawobj, &mut b))
            .context("OBJ file is not in any valid vertex format")?;
        if args_common.verbose {
            eprintln!(
                "{}: mesh {:?}, {} vertices, {} triangles",
                path.display(),
                b.name,
                b.positions.len() / 3,
                b.indices.len() / 3,
            );
        }
        bufs.push(b);
    }

    let mut writer = G3dWriter::new_with_settings(G3dWriterSettings::from(&args_cmd.warg));
    for b in bufs.iter() {
        let mut mesh = MeshSource {
            name: &b.name,
            frame_count: 1,
            vertex_count: (b.positions.len() / 3) as u32,
            positions: &b.positions,
            normals: &b.normals,
            indices: &b.indices,
            ..Default::default()
        };
        if let Some(texture) = &args_cmd.texture {
            if b.tex_coords.is_empty() {
                bail!("{:?} has no texture coordinates", b.name);
            }
            mesh.tex_coords = Some(b.tex_coords.as_slice());
            mesh.texture_paths[0] = Some(texture.as_str());
        }
        writer.add_mesh(mesh).context("Mesh cannot be stored as G3D")?;
    }

    let outfile = if args_cmd.oarg.overwrite {
        std::fs::File::create(&args_cmd.outpath.out_file)
            .context("Could not open output file")?
    } else {
        std::fs::File::create_new(&args_cmd.outpath.out_file)
            .context("Could not open output file")?
    };
    let mut bufout = BufWriter::new(outfile);
    writer.write_to(&mut bufout).context("Cannot encode output file")?;
    log::info!("Wrote {} mesh(es) to {}", bufs.len(), args_cmd.outpath.out_file.display());

    Ok(())
}

fn try_ptn(rawobj: RawObj, b: &mut ObjBuffers) -> AnyResult<()> {
    let obj: Obj<TexturedVertex, u32> = Obj::new(rawobj)?;
    b.indices = obj.indices;
    for v in obj.vertices {
        b.positions.extend_from_slice(&v.position);
        b.normals.extend_from_slice(&v.normal);
        b.tex_coords.extend_from_slice(&v.texture[..2]);
    }
    Ok(())
}

fn try_pn(rawobj: RawObj, b: &mut ObjBuffers) -> AnyResult<()> {
    let obj: Obj<Vertex, u32> = Obj::new(rawobj)?;
    b.indices = obj.indices;
    for v in obj.vertices {
        b.positions.extend_from_slice(&v.position);
        b.normals.extend_from_slice(&v.normal);
    }
    Ok(())
}

/// Positions only; normals are left zero.
fn try_p(rawobj: RawObj, b: &mut ObjBuffers) -> AnyResult<()> {
    let obj: Obj<Position, u32> = Obj::new(rawobj)?;
    b.indices = obj.indices;
    for v in obj.vertices {
        b.positions.extend_from_slice(&v.position);
        b.normals.extend_from_slice(&[0.0; 3]);
    }
    Ok(())
}
