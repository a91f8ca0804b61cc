//! `goty` — compile Go packages to TypeScript.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use goty_compiler::overlay::DirOverlays;
use goty_compiler::{Compiler, Config};

#[derive(Parser)]
#[command(name = "goty", version, about = "Go to TypeScript compiler")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile Go packages to TypeScript.
    Compile(CompileArgs),
}

#[derive(Args)]
struct CompileArgs {
    /// The package pattern(s) to compile.
    #[arg(
        short = 'p',
        long = "package",
        env = "GOTY_PACKAGES",
        value_delimiter = ',',
        required = true
    )]
    packages: Vec<String>,

    /// The output TypeScript path to use.
    #[arg(long, env = "GOTY_OUTPUT", default_value = "./output")]
    output: PathBuf,

    /// The working directory to use for package resolution.
    #[arg(long, env = "GOTY_DIR")]
    dir: Option<PathBuf>,

    /// Go build flags (tags) to use during analysis.
    #[arg(short = 'b', long = "build-flags", env = "GOTY_BUILD_FLAGS")]
    build_flags: Vec<String>,

    /// Disable emitting the bundled built-in overlay packages.
    #[arg(long, env = "GOTY_DISABLE_EMIT_BUILTIN")]
    disable_emit_builtin: bool,

    /// Compile all dependencies of the requested packages.
    #[arg(long, alias = "all-deps", env = "GOTY_ALL_DEPENDENCIES")]
    all_dependencies: bool,

    /// Directory containing the hand-written `gs/` overlay tree.
    #[arg(long, env = "GOTY_OVERLAY_DIR", default_value = ".")]
    overlay_root: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Compile(args) => match run_compile(args) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("error: {err:#}");
                ExitCode::FAILURE
            }
        },
    }
}

fn run_compile(args: CompileArgs) -> anyhow::Result<()> {
    if args.packages.is_empty() {
        bail!("package(s) must be specified");
    }

    let config = Config {
        output_path: args.output,
        dir: args.dir,
        build_flags: args.build_flags,
        all_dependencies: args.all_dependencies,
        disable_emit_builtin: args.disable_emit_builtin,
    };

    // The overlay tree ships as a gs/ directory under the overlay root.
    let overlays = Arc::new(DirOverlays::new(args.overlay_root));

    let compiler = Compiler::new(config, overlays).context("invalid configuration")?;
    compiler
        .compile_packages(&args.packages)
        .context("compilation failed")?;
    Ok(())
}
