use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("Collector settings not found in {search_path}")]
    #[diagnostic(
        code(config::not_found),
        help("Create a bundlekit.config.json or bundlekit.config.toml file, or pass --config")
    )]
    ConfigNotFound { search_path: Utf8PathBuf },

    #[error("Failed to load collector settings from {path}")]
    #[diagnostic(
        code(config::parse_error),
        help("Check the settings file for syntax errors and unknown rule names")
    )]
    ConfigParseError {
        path: Utf8PathBuf,
        #[source]
        source: bundlekit_core::Error,
    },

    #[error("Failed to load dependency table from {path}")]
    #[diagnostic(
        code(deps::parse_error),
        help("The dependency table is a JSON object mapping asset paths to dependency lists")
    )]
    DependencyTableError {
        path: Utf8PathBuf,
        #[source]
        source: bundlekit_core::Error,
    },

    #[error("No package selected, available packages: {available}")]
    #[diagnostic(
        code(package::not_selected),
        help("The settings declare several packages, choose one with --package")
    )]
    PackageNotSelected { available: String },

    #[error("Path is not valid UTF-8: {}", path.display())]
    #[diagnostic(code(path::not_utf8))]
    NonUtf8Path { path: std::path::PathBuf },

    #[error("Build failed in task {task}")]
    #[diagnostic(
        code(build::failed),
        help("Run with RUST_LOG=bundlekit=debug for per-asset details")
    )]
    BuildFailed {
        task: String,
        #[source]
        source: bundlekit_build::Error,
    },

    #[error("Failed to read manifest {path}")]
    #[diagnostic(
        code(manifest::read_failed),
        help("Pass a PackageManifest_*.bytes or PackageManifest_*.json file")
    )]
    ManifestReadFailed {
        path: Utf8PathBuf,
        #[source]
        source: bundlekit_manifest::ManifestError,
    },

    #[error("Copy option {option} requires --buildin-dir")]
    #[diagnostic(code(copy_buildin::missing_dir))]
    MissingBuildinDir { option: String },
}

impl CliError {
    pub fn config_not_found(search_path: Utf8PathBuf) -> Self {
        Self::ConfigNotFound { search_path }
    }

    pub fn config_parse_error(path: Utf8PathBuf, source: bundlekit_core::Error) -> Self {
        Self::ConfigParseError { path, source }
    }
}
