use clap::builder::{styling::AnsiColor, Styles};
use clap::ColorChoice;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use commands::{
    build_package, info_manifest, BuildPackageArgs, CliBuildMode, CliCopyBuildin, CliEncryption,
    CliNameStyle, CliPipeline, InfoManifestArgs,
};
use miette::Result;

mod commands;
mod errors;
mod utils;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build one package of a project
    Build {
        /// The path to the collector settings file
        #[arg(short, long)]
        config: Option<String>,

        /// The package to build. Optional when the settings declare a single package
        #[arg(short, long)]
        package: Option<String>,

        /// The package version
        #[arg(short, long)]
        version: String,

        /// The output root directory
        #[arg(short, long, default_value = "build")]
        output_dir: String,

        #[arg(long, value_enum, default_value = "incremental")]
        mode: CliBuildMode,

        #[arg(long, value_enum, default_value = "scriptable")]
        pipeline: CliPipeline,

        #[arg(long, value_enum, default_value = "bundle-name-hash")]
        name_style: CliNameStyle,

        #[arg(long, value_enum, default_value = "none")]
        encryption: CliEncryption,

        /// JSON file mapping asset paths to their direct dependencies
        #[arg(short, long)]
        deps: Option<String>,

        /// What to copy into the built-in directory
        #[arg(long, value_enum, default_value = "none")]
        copy_buildin: CliCopyBuildin,

        /// Root of the built-in directory
        #[arg(long)]
        buildin_dir: Option<String>,

        /// Tags selecting bundles for the by-tags copy options, `;`-separated
        #[arg(long, default_value = "")]
        buildin_tags: String,

        /// Skip checking the packager output against the build map
        #[arg(long)]
        no_verify: bool,
    },
    /// Show information about a package manifest
    Info {
        /// The path to a PackageManifest_*.bytes or PackageManifest_*.json file
        #[arg(short, long)]
        file: String,
    },
}

fn parse_args() -> Args {
    // Configure colored/styled help output
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default())
        .placeholder(AnsiColor::Blue.on_default());

    let matches = Args::command()
        .styles(styles)
        .color(ColorChoice::Auto)
        .get_matches();

    match Args::from_arg_matches(&matches) {
        Ok(args) => args,
        Err(err) => err.exit(),
    }
}

fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bundlekit=info".into());

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_logging();

    let args = parse_args();

    match args.command {
        Commands::Build {
            config,
            package,
            version,
            output_dir,
            mode,
            pipeline,
            name_style,
            encryption,
            deps,
            copy_buildin,
            buildin_dir,
            buildin_tags,
            no_verify,
        } => build_package(BuildPackageArgs {
            config,
            package,
            version,
            output_dir,
            mode,
            pipeline,
            name_style,
            encryption,
            deps,
            copy_buildin,
            buildin_dir,
            buildin_tags,
            verify: !no_verify,
        }),
        Commands::Info { file } => info_manifest(InfoManifestArgs { file }),
    }
}
