use g3dkit::{read::G3dReaderSettings, write::G3dWriterSettings};

use crate::prelude::*;

#[allow(unused_imports)]
mod prelude {
    pub use std::path::{Path, PathBuf};

    pub use anyhow::{Context, Result as AnyResult, bail};
}

mod cmd {
    pub mod info;
    pub mod verify;
    pub mod xml;
    #[cfg(feature = "obj")]
    pub mod from_obj;
}

mod util;

#[derive(clap::Parser, Debug)]
#[command(about = "Tool for working with G3D models and XML data files.")]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
    /// Operation to perform
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Args, Debug)]
struct CommonArgs {
    /// Print extra info about what the tool is doing
    #[arg(short, long)]
    verbose: bool,
}

#[derive(clap::Args, Debug)]
struct ReadArgs {
    /// Keep texture V coordinates as stored in the file
    #[arg(long)]
    no_flip_v: bool,
    /// Fail if there is data after the last mesh
    #[arg(long)]
    strict: bool,
}

#[derive(clap::Args, Debug)]
struct WriteArgs {
    /// Write meshes even if a decoder would reject them
    #[arg(long)]
    no_validate: bool,
}

#[derive(clap::Args, Debug)]
struct OutputArgs {
    /// Overwrite output file if it exists
    #[arg(short, long)]
    overwrite: bool,
}

#[derive(clap::Args, Debug)]
struct InputPath {
    /// Path to the input file
    in_file: PathBuf,
}

#[derive(clap::Args, Debug)]
struct InputPaths {
    /// Path to the input files
    in_files: Vec<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct OutputPath {
    /// Path where to save the output file
    out_file: PathBuf,
}

#[derive(clap::Subcommand, Debug)]
enum CliCommand {
    /// Print information about the tool
    Version,
    /// Show the meshes in a model and load their textures
    Info(cmd::info::InfoArgs),
    /// Try decoding the file to check for errors
    Verify(cmd::verify::VerifyArgs),
    /// Parse an XML file and print its tokens
    Xml(cmd::xml::XmlArgs),
    /// Import from OBJ format
    #[cfg(feature = "obj")]
    FromObj(cmd::from_obj::FromObjArgs),
}

impl From<&ReadArgs> for G3dReaderSettings {
    fn from(args: &ReadArgs) -> Self {
        Self {
            flip_tex_v: !args.no_flip_v,
            reject_trailing_data: args.strict,
        }
    }
}

impl From<&WriteArgs> for G3dWriterSettings {
    fn from(args: &WriteArgs) -> Self {
        Self {
            validate: !args.no_validate,
            ..Default::default()
        }
    }
}

fn run_command(cli: &Cli) -> AnyResult<()> {
    match &cli.command {
        CliCommand::Version => {
            // Verbose always prints version anyway
            if !cli.common.verbose {
                print_version();
            }
            Ok(())
        }
        CliCommand::Info(args) => cmd::info::run(&cli.common, args),
        CliCommand::Verify(args) => cmd::verify::run(&cli.common, args),
        CliCommand::Xml(args) => cmd::xml::run(&cli.common, args),
        #[cfg(feature = "obj")]
        CliCommand::FromObj(args) => cmd::from_obj::run(&cli.common, args),
    }
}

fn print_version() {
    eprintln!(
        "{} version {}. Works with G3D file format version {}.",
        env!("CARGO_BIN_NAME"),
        env!("CARGO_PKG_VERSION"),
        g3dkit::FORMAT_VERSION,
    );
    eprintln!();
}

fn main() {
    use clap::Parser;
    let cli = Cli::parse();

    let level = if cli.common.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if cli.common.verbose {
        print_version();
    }

    if let Err(e) = run_command(&cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(2);
    }
}
