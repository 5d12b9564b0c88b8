//! Build configuration.
//!
//! [`BuildParameters`] is created once at the entry point, validated by the
//! first pipeline task and then read by every other task through the
//! [`BuildContext`](crate::BuildContext). Nothing in the pipeline reads global
//! state.

use crate::context::{ContextKind, ContextObject};
use crate::error::{Error, Result};
use bundlekit_core::{BuildMode, CollectorKind};
use bundlekit_manifest::OutputNameStyle;
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the packager working directory inside `{output_root}/{package}`.
pub const OUTPUT_CACHE_DIR: &str = "OutputCache";

/// Which packager contract the pipeline drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineKind {
    /// Monolithic packager returning a hash table plus a dependency table.
    /// Raw files are copied by a separate task.
    Legacy,
    /// Incremental packager returning per-bundle details. Handles raw files itself.
    #[default]
    Scriptable,
}

/// Which built-in encryption service post-processes bundle files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EncryptionKind {
    #[default]
    None,
    /// Prefix every bundle with a fixed-size header skipped at load time.
    FileOffset,
}

/// What to copy into the built-in (shipped with the application) directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CopyBuildinOption {
    #[default]
    None,
    ClearAndCopyAll,
    ClearAndCopyByTags,
    OnlyCopyAll,
    OnlyCopyByTags,
}

impl CopyBuildinOption {
    pub fn clears_target(self) -> bool {
        matches!(
            self,
            CopyBuildinOption::ClearAndCopyAll | CopyBuildinOption::ClearAndCopyByTags
        )
    }

    pub fn by_tags(self) -> bool {
        matches!(
            self,
            CopyBuildinOption::ClearAndCopyByTags | CopyBuildinOption::OnlyCopyByTags
        )
    }
}

/// Immutable configuration of one build invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildParameters {
    /// Directory collected asset paths are relative to.
    pub project_root: Utf8PathBuf,

    /// Root of all build output. Packages are written to
    /// `{output_root}/{package_name}/{package_version}`.
    pub output_root: Utf8PathBuf,

    pub package_name: String,
    pub package_version: String,

    pub build_mode: BuildMode,
    pub pipeline: PipelineKind,
    pub output_name_style: OutputNameStyle,
    pub encryption: EncryptionKind,

    pub enable_addressable: bool,
    pub unique_bundle_name: bool,

    pub copy_buildin_option: CopyBuildinOption,

    /// Tags selecting bundles for the `*ByTags` copy options.
    pub copy_buildin_tags: Vec<String>,

    /// Root of the built-in directory. Required by every copy option but `None`.
    pub buildin_root: Option<Utf8PathBuf>,

    /// Extensions (without dot, lowercase) of assets pooled into the system bundle.
    pub system_asset_extensions: Vec<String>,

    /// Collector kinds whose assets are dropped unless a primary asset depends on them.
    pub dependency_only_kinds: Vec<CollectorKind>,

    /// Check the packager output against the build map.
    pub verify_output: bool,
}

impl BuildParameters {
    pub fn new(
        project_root: impl Into<Utf8PathBuf>,
        output_root: impl Into<Utf8PathBuf>,
        package_name: impl Into<String>,
        package_version: impl Into<String>,
    ) -> Self {
        Self {
            project_root: project_root.into(),
            output_root: output_root.into(),
            package_name: package_name.into(),
            package_version: package_version.into(),
            build_mode: BuildMode::default(),
            pipeline: PipelineKind::default(),
            output_name_style: OutputNameStyle::default(),
            encryption: EncryptionKind::default(),
            enable_addressable: false,
            unique_bundle_name: false,
            copy_buildin_option: CopyBuildinOption::default(),
            copy_buildin_tags: Vec::new(),
            buildin_root: None,
            system_asset_extensions: vec!["shader".to_string(), "shadervariants".to_string()],
            dependency_only_kinds: vec![CollectorKind::DependAssetCollector],
            verify_output: true,
        }
    }

    pub fn with_build_mode(mut self, mode: BuildMode) -> Self {
        self.build_mode = mode;
        self
    }

    pub fn with_pipeline(mut self, pipeline: PipelineKind) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_output_name_style(mut self, style: OutputNameStyle) -> Self {
        self.output_name_style = style;
        self
    }

    pub fn with_encryption(mut self, encryption: EncryptionKind) -> Self {
        self.encryption = encryption;
        self
    }

    pub fn with_addressable(mut self, enable_addressable: bool) -> Self {
        self.enable_addressable = enable_addressable;
        self
    }

    pub fn with_unique_bundle_name(mut self, unique_bundle_name: bool) -> Self {
        self.unique_bundle_name = unique_bundle_name;
        self
    }

    pub fn with_copy_buildin(
        mut self,
        option: CopyBuildinOption,
        buildin_root: Option<Utf8PathBuf>,
        tags: Vec<String>,
    ) -> Self {
        self.copy_buildin_option = option;
        self.buildin_root = buildin_root;
        self.copy_buildin_tags = tags;
        self
    }

    /// Check the parameters for configuration errors.
    pub fn validate(&self) -> Result<()> {
        if self.package_name.trim().is_empty() {
            return Err(Error::EmptyPackageName);
        }
        if !is_valid_slug(&self.package_name) {
            return Err(Error::InvalidPackageName(self.package_name.clone()));
        }

        if self.package_version.trim().is_empty() {
            return Err(Error::EmptyPackageVersion);
        }
        if !is_valid_version(&self.package_version) {
            return Err(Error::InvalidPackageVersion(self.package_version.clone()));
        }

        if self.copy_buildin_option != CopyBuildinOption::None && self.buildin_root.is_none() {
            return Err(Error::MissingParameter("buildin_root"));
        }

        Ok(())
    }

    /// `{output_root}/{package}`: parent of every version and of the packager cache.
    pub fn package_root(&self) -> Utf8PathBuf {
        self.output_root.join(&self.package_name)
    }

    /// Directory the packager writes bundles into. Kept between incremental builds.
    pub fn pipeline_output_dir(&self) -> Utf8PathBuf {
        self.package_root().join(OUTPUT_CACHE_DIR)
    }

    /// `{output_root}/{package}/{version}`: the final package directory.
    pub fn package_output_dir(&self) -> Utf8PathBuf {
        self.package_root().join(&self.package_version)
    }

    /// `{buildin_root}/{package}`, if a built-in root is configured.
    pub fn buildin_package_dir(&self) -> Option<Utf8PathBuf> {
        self.buildin_root
            .as_deref()
            .map(|root: &Utf8Path| root.join(&self.package_name))
    }
}

impl ContextObject for BuildParameters {
    const KIND: ContextKind = ContextKind::Parameters;
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PipelineKind::Legacy => "legacy",
            PipelineKind::Scriptable => "scriptable",
        })
    }
}

impl fmt::Display for EncryptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EncryptionKind::None => "none",
            EncryptionKind::FileOffset => "file-offset",
        })
    }
}

/// Package names end up in file names, so they are limited to slugs.
pub fn is_valid_slug(name: impl AsRef<str>) -> bool {
    Regex::new(r"^[[:word:]-]+$")
        .map(|re| re.is_match(name.as_ref()))
        .unwrap_or(false)
}

/// A version becomes one directory under the package root, beside the
/// packager cache, so it must be a single plain path component.
fn is_valid_version(version: &str) -> bool {
    let mut components = Utf8Path::new(version).components();
    matches!(
        (components.next(), components.next()),
        (Some(Utf8Component::Normal(name)), None) if name == version && name != OUTPUT_CACHE_DIR
    ) && !version.contains('\\')
}
