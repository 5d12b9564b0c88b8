//! Top-level entry point of a package build.

use crate::context::BuildContext;
use crate::encryption::{services_for, EncryptionServices};
use crate::error::Error;
use crate::packager::{ArchivePackager, LegacyPackager, ScriptablePackager};
use crate::parameters::{BuildParameters, PipelineKind};
use crate::pipeline::{BuildPipeline, TaskFailure};
use crate::progress::BuildProgress;
use bundlekit_core::{AssetCollector, BuildMode};
use camino::Utf8PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of [`AssetBundleBuilder::run`].
///
/// A failed build never returns an `Err`: the failing task and its error are
/// reported here instead.
#[derive(Debug)]
pub struct BuildResult {
    pub success: bool,
    pub failed_task: Option<String>,
    pub error_info: Option<String>,
    pub error: Option<Error>,
    pub output_package_directory: Utf8PathBuf,
    pub build_time: Duration,
}

/// Builds one package.
///
/// Create a builder with [`new`](Self::new), optionally swap the packagers,
/// the encryption service or add a progress callback, then call
/// [`run`](Self::run). The builder can be run again; every run starts from an
/// empty [`BuildContext`].
pub struct AssetBundleBuilder {
    parameters: BuildParameters,
    collector: Arc<dyn AssetCollector>,
    legacy_packager: Arc<dyn LegacyPackager>,
    scriptable_packager: Arc<dyn ScriptablePackager>,
    encryption: Option<Arc<dyn EncryptionServices>>,
    context: BuildContext,
}

impl AssetBundleBuilder {
    pub fn new(parameters: BuildParameters, collector: Arc<dyn AssetCollector>) -> Self {
        let packager = Arc::new(ArchivePackager::default());
        Self {
            parameters,
            collector,
            legacy_packager: packager.clone(),
            scriptable_packager: packager,
            encryption: None,
            context: BuildContext::new(),
        }
    }

    pub fn with_legacy_packager(mut self, packager: Arc<dyn LegacyPackager>) -> Self {
        self.legacy_packager = packager;
        self
    }

    pub fn with_scriptable_packager(mut self, packager: Arc<dyn ScriptablePackager>) -> Self {
        self.scriptable_packager = packager;
        self
    }

    /// Override the service chosen by [`BuildParameters::encryption`].
    pub fn with_encryption(mut self, services: Arc<dyn EncryptionServices>) -> Self {
        self.encryption = Some(services);
        self
    }

    /// Register a progress callback.
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(BuildProgress) + Send + Sync + 'static,
    {
        self.context = BuildContext::with_progress(Arc::new(callback));
        self
    }

    pub fn parameters(&self) -> &BuildParameters {
        &self.parameters
    }

    /// Context of the last run, for inspecting what each task published.
    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    /// The task list this builder's parameters select.
    pub fn pipeline(&self) -> BuildPipeline {
        let encryption = self
            .encryption
            .clone()
            .unwrap_or_else(|| services_for(self.parameters.encryption));

        if self.parameters.build_mode == BuildMode::SimulateBuild {
            return BuildPipeline::simulate(self.collector.clone());
        }
        match self.parameters.pipeline {
            PipelineKind::Legacy => BuildPipeline::legacy(
                self.collector.clone(),
                self.legacy_packager.clone(),
                encryption,
            ),
            PipelineKind::Scriptable => BuildPipeline::scriptable(
                self.collector.clone(),
                self.scriptable_packager.clone(),
                encryption,
            ),
        }
    }

    pub fn run(&mut self) -> BuildResult {
        let started = Instant::now();
        let output_package_directory = self.parameters.package_output_dir();

        tracing::info!(
            "Building package={} version={} mode={} pipeline={}",
            self.parameters.package_name,
            self.parameters.package_version,
            self.parameters.build_mode,
            self.parameters.pipeline
        );

        self.context.clear();
        let pipeline = self.pipeline();
        let outcome = self
            .context
            .set(self.parameters.clone())
            .map_err(|error| TaskFailure {
                task: "Initialize",
                error,
            })
            .and_then(|_| pipeline.run(&mut self.context));

        let build_time = started.elapsed();
        match outcome {
            Ok(()) => {
                tracing::info!(
                    "Build succeeded package={} elapsed_ms={}",
                    self.parameters.package_name,
                    build_time.as_millis()
                );
                BuildResult {
                    success: true,
                    failed_task: None,
                    error_info: None,
                    error: None,
                    output_package_directory,
                    build_time,
                }
            }
            Err(TaskFailure { task, error }) => BuildResult {
                success: false,
                failed_task: Some(task.to_string()),
                error_info: Some(error.to_string()),
                error: Some(error),
                output_package_directory,
                build_time,
            },
        }
    }
}
