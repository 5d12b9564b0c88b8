use std::sync::Arc;

use bundlekit_build::{
    AssetBundleBuilder, BuildMap, BuildParameters, BuildProgress, CopyBuildinOption,
    EncryptionKind, PipelineKind,
};
use bundlekit_collect::{split_tags, CollectorSettings, DependencyTable, PackageCollector};
use bundlekit_core::BuildMode;
use bundlekit_manifest::OutputNameStyle;
use camino::Utf8PathBuf;
use colored::Colorize;
use miette::Result;

use crate::{
    errors::CliError,
    println_pad,
    utils::{absolute_path, format_size},
};

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliBuildMode {
    Force,
    Incremental,
    DryRun,
    Simulate,
}

impl From<CliBuildMode> for BuildMode {
    fn from(mode: CliBuildMode) -> Self {
        match mode {
            CliBuildMode::Force => BuildMode::ForceRebuild,
            CliBuildMode::Incremental => BuildMode::IncrementalBuild,
            CliBuildMode::DryRun => BuildMode::DryRunBuild,
            CliBuildMode::Simulate => BuildMode::SimulateBuild,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliPipeline {
    Scriptable,
    Legacy,
}

impl From<CliPipeline> for PipelineKind {
    fn from(pipeline: CliPipeline) -> Self {
        match pipeline {
            CliPipeline::Scriptable => PipelineKind::Scriptable,
            CliPipeline::Legacy => PipelineKind::Legacy,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliNameStyle {
    Hash,
    BundleName,
    BundleNameHash,
}

impl From<CliNameStyle> for OutputNameStyle {
    fn from(style: CliNameStyle) -> Self {
        match style {
            CliNameStyle::Hash => OutputNameStyle::HashName,
            CliNameStyle::BundleName => OutputNameStyle::BundleName,
            CliNameStyle::BundleNameHash => OutputNameStyle::BundleNameHashName,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliEncryption {
    None,
    FileOffset,
}

impl From<CliEncryption> for EncryptionKind {
    fn from(encryption: CliEncryption) -> Self {
        match encryption {
            CliEncryption::None => EncryptionKind::None,
            CliEncryption::FileOffset => EncryptionKind::FileOffset,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliCopyBuildin {
    None,
    ClearAndCopyAll,
    ClearAndCopyByTags,
    OnlyCopyAll,
    OnlyCopyByTags,
}

impl From<CliCopyBuildin> for CopyBuildinOption {
    fn from(option: CliCopyBuildin) -> Self {
        match option {
            CliCopyBuildin::None => CopyBuildinOption::None,
            CliCopyBuildin::ClearAndCopyAll => CopyBuildinOption::ClearAndCopyAll,
            CliCopyBuildin::ClearAndCopyByTags => CopyBuildinOption::ClearAndCopyByTags,
            CliCopyBuildin::OnlyCopyAll => CopyBuildinOption::OnlyCopyAll,
            CliCopyBuildin::OnlyCopyByTags => CopyBuildinOption::OnlyCopyByTags,
        }
    }
}

#[derive(Debug)]
pub struct BuildPackageArgs {
    pub config: Option<String>,
    pub package: Option<String>,
    pub version: String,
    pub output_dir: String,
    pub mode: CliBuildMode,
    pub pipeline: CliPipeline,
    pub name_style: CliNameStyle,
    pub encryption: CliEncryption,
    pub deps: Option<String>,
    pub copy_buildin: CliCopyBuildin,
    pub buildin_dir: Option<String>,
    pub buildin_tags: String,
    pub verify: bool,
}

pub fn build_package(args: BuildPackageArgs) -> Result<()> {
    let config_path = resolve_config_path(args.config.as_deref())?;
    let settings = CollectorSettings::load(&config_path)
        .map_err(|source| CliError::config_parse_error(config_path.clone(), source))?;
    let project_root = config_path
        .parent()
        .map(|dir| dir.to_path_buf())
        .ok_or_else(|| CliError::config_not_found(config_path.clone()))?;

    let package_name = resolve_package_name(&settings, args.package)?;
    let dependencies = load_dependencies(args.deps.as_deref())?;

    if args.copy_buildin != CliCopyBuildin::None && args.buildin_dir.is_none() {
        return Err(CliError::MissingBuildinDir {
            option: format!("{:?}", args.copy_buildin),
        }
        .into());
    }
    let buildin_root = args.buildin_dir.map(absolute_path).transpose()?;

    let parameters = BuildParameters::new(
        project_root.clone(),
        absolute_path(&args.output_dir)?,
        package_name.clone(),
        args.version,
    )
    .with_build_mode(args.mode.into())
    .with_pipeline(args.pipeline.into())
    .with_output_name_style(args.name_style.into())
    .with_encryption(args.encryption.into())
    .with_addressable(settings.enable_addressable)
    .with_unique_bundle_name(settings.unique_bundle_name)
    .with_copy_buildin(
        args.copy_buildin.into(),
        buildin_root,
        split_tags(&args.buildin_tags),
    );
    let parameters = BuildParameters {
        verify_output: args.verify,
        ..parameters
    };

    println!(
        "{} {} {}",
        "📦 Building package:".bright_blue().bold(),
        package_name.bright_cyan().bold(),
        format!("({}, {})", parameters.build_mode, parameters.pipeline).dimmed()
    );

    let collector = PackageCollector::new(project_root, settings, Box::new(dependencies));
    let mut builder =
        AssetBundleBuilder::new(parameters, Arc::new(collector)).with_progress(print_progress);
    let result = builder.run();

    if !result.success {
        let task = result.failed_task.unwrap_or_default();
        return match result.error {
            Some(source) => Err(CliError::BuildFailed { task, source }.into()),
            None => Err(miette::miette!(
                "Build failed in task {}: {}",
                task,
                result.error_info.unwrap_or_default()
            )),
        };
    }

    if let Ok(map) = builder.context().get::<BuildMap>() {
        let total_size: u64 = map.bundles.iter().map(|bundle| bundle.size).sum();
        println_pad!(
            "{} {} bundles, {} assets ({} folded), {}",
            "📊 Result:".bright_green(),
            map.bundles.len().to_string().bright_white().bold(),
            map.total_asset_count,
            map.folded_asset_count,
            format_size(total_size)
        );
    }

    println!(
        "{}\n{} {}\n{} {:.2?}",
        "✅ Package built successfully!".bright_green().bold(),
        "📍 Path:".bright_green(),
        result
            .output_package_directory
            .as_str()
            .bright_white()
            .bold(),
        "⏱️ Time:".bright_green(),
        result.build_time
    );

    Ok(())
}

fn print_progress(progress: BuildProgress) {
    match progress.current_file {
        None => println_pad!("{} {}", "▶".bright_cyan(), progress.task.bright_white()),
        Some(file) => tracing::debug!(
            "Progress task={} file={} current={} total={}",
            progress.task,
            file,
            progress.current,
            progress.total
        ),
    }
}

fn resolve_config_path(config: Option<&str>) -> Result<Utf8PathBuf> {
    match config {
        Some(path) => {
            let path = absolute_path(path)?;
            if path.is_file() {
                Ok(path)
            } else {
                Err(CliError::config_not_found(path).into())
            }
        }
        None => {
            let cwd = absolute_path(".")?;
            CollectorSettings::find_in_dir(&cwd)
                .ok_or_else(|| CliError::config_not_found(cwd).into())
        }
    }
}

fn resolve_package_name(settings: &CollectorSettings, package: Option<String>) -> Result<String> {
    if let Some(package) = package {
        return Ok(package);
    }
    match settings.packages.as_slice() {
        [only] => Ok(only.name.clone()),
        packages => Err(CliError::PackageNotSelected {
            available: packages
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }
        .into()),
    }
}

fn load_dependencies(deps: Option<&str>) -> Result<DependencyTable> {
    let Some(path) = deps else {
        return Ok(DependencyTable::new());
    };
    let path = absolute_path(path)?;
    DependencyTable::load(&path)
        .map_err(|source| CliError::DependencyTableError { path, source }.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bundlekit_collect::PackageSettings;

    fn settings(names: &[&str]) -> CollectorSettings {
        CollectorSettings {
            packages: names
                .iter()
                .map(|name| PackageSettings {
                    name: name.to_string(),
                    description: None,
                    groups: Vec::new(),
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_single_package_is_default() {
        assert_eq!(
            resolve_package_name(&settings(&["Main"]), None).unwrap(),
            "Main"
        );
        assert_eq!(
            resolve_package_name(&settings(&["Main", "Dlc"]), Some("Dlc".to_string())).unwrap(),
            "Dlc"
        );
        assert!(resolve_package_name(&settings(&["Main", "Dlc"]), None).is_err());
    }

    #[test]
    fn test_value_enum_mapping() {
        assert_eq!(BuildMode::from(CliBuildMode::DryRun), BuildMode::DryRunBuild);
        assert_eq!(
            OutputNameStyle::from(CliNameStyle::BundleNameHash),
            OutputNameStyle::BundleNameHashName
        );
        assert_eq!(
            CopyBuildinOption::from(CliCopyBuildin::OnlyCopyByTags),
            CopyBuildinOption::OnlyCopyByTags
        );
    }
}
