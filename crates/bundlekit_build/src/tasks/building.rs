use super::{copy_files, BuildTask};
use crate::assignment::BuildMap;
use crate::context::BuildContext;
use crate::error::{Error, Result};
use crate::packager::{LegacyPackager, PackagerContext, PackagerRequest, ScriptablePackager};
use crate::parameters::BuildParameters;
use camino::Utf8PathBuf;
use std::sync::Arc;

/// Invokes the monolithic packager on every non-raw bundle.
pub struct TaskBuildingLegacy {
    packager: Arc<dyn LegacyPackager>,
}

impl TaskBuildingLegacy {
    pub fn new(packager: Arc<dyn LegacyPackager>) -> Self {
        Self { packager }
    }
}

impl BuildTask for TaskBuildingLegacy {
    fn name(&self) -> &'static str {
        "BuildingLegacy"
    }

    fn run(&self, ctx: &mut BuildContext) -> Result<()> {
        let params = ctx.get::<BuildParameters>()?;
        let map = ctx.get::<BuildMap>()?;

        let request = PackagerRequest::from_build_map(map, params, false);
        let output = self.packager.build(&request)?;

        tracing::info!("Legacy packager finished bundles={}", output.bundle_hashes.len());
        ctx.set(PackagerContext::new(output))
    }
}

/// Invokes the incremental packager on every bundle, raw ones included.
pub struct TaskBuildingScriptable {
    packager: Arc<dyn ScriptablePackager>,
}

impl TaskBuildingScriptable {
    pub fn new(packager: Arc<dyn ScriptablePackager>) -> Self {
        Self { packager }
    }
}

impl BuildTask for TaskBuildingScriptable {
    fn name(&self) -> &'static str {
        "BuildingScriptable"
    }

    fn run(&self, ctx: &mut BuildContext) -> Result<()> {
        let params = ctx.get::<BuildParameters>()?;
        let map = ctx.get::<BuildMap>()?;

        let request = PackagerRequest::from_build_map(map, params, true);
        let output = self.packager.build(&request)?;

        tracing::info!("Scriptable packager finished bundles={}", output.bundles.len());
        ctx.set(PackagerContext::new(output))
    }
}

/// Copies raw files next to the legacy packager's output.
#[derive(Debug, Default)]
pub struct TaskCopyRawFile;

impl BuildTask for TaskCopyRawFile {
    fn name(&self) -> &'static str {
        "CopyRawFile"
    }

    fn run(&self, ctx: &mut BuildContext) -> Result<()> {
        let params = ctx.get::<BuildParameters>()?;
        if !params.build_mode.writes_bundles() {
            return Ok(());
        }
        let map = ctx.get::<BuildMap>()?;
        let output_dir = params.pipeline_output_dir();

        let mut jobs: Vec<(Utf8PathBuf, Utf8PathBuf)> = Vec::new();
        for bundle in map.bundles.iter().filter(|bundle| bundle.is_raw) {
            for asset in map.members(bundle) {
                jobs.push((
                    params.project_root.join(&asset.path),
                    output_dir.join(&bundle.bundle_name),
                ));
            }
        }

        if jobs.is_empty() {
            return Ok(());
        }

        std::fs::create_dir_all(&output_dir).map_err(Error::io_at(&output_dir))?;
        let pairs: Vec<_> = jobs
            .iter()
            .map(|(source, target)| (source.as_path(), target.as_path()))
            .collect();
        copy_files(self.name(), &pairs, ctx.progress_callback())?;

        tracing::info!("Copied raw files count={}", jobs.len());
        Ok(())
    }
}
