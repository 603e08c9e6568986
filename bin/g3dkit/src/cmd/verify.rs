use g3dkit::model::G3dModel;
use g3dkit::read::{G3dReaderSettings, is_g3d_file};

use crate::CommonArgs;
use crate::prelude::*;
use crate::util::read_file;

#[derive(clap::Args, Debug)]
pub struct VerifyArgs {
    #[command(flatten)]
    rarg: crate::ReadArgs,
    #[command(flatten)]
    inpath: crate::InputPath,
}

pub fn run(
    args_common: &CommonArgs,
    args_cmd: &VerifyArgs,
) -> AnyResult<()> {
    let path = &args_cmd.inpath.in_file;
    let data = read_file(path)?;
    if !is_g3d_file(&data) {
        bail!("{} is not a G3D file", path.display());
    }
    if args_common.verbose {
        eprintln!("File magic OK.");
    }
    let model = G3dModel::decode_with_settings(
        G3dReaderSettings::from(&args_cmd.rarg),
        &path.to_string_lossy(),
        &data,
        0,
    )
    .context("Cannot decode model")?;
    if args_common.verbose {
        eprintln!(
            "All {} mesh(es) successfully decoded.",
            model.meshes().len()
        );
    }
    Ok(())
}
