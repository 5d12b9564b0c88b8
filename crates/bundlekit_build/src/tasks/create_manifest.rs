use super::BuildTask;
use crate::assignment::BuildMap;
use crate::context::{BuildContext, ContextKind, ContextObject};
use crate::error::Result;
use crate::generator::create_manifest;
use crate::packager::{PackagerContext, SimulateReport};
use crate::parameters::BuildParameters;
use bundlekit_core::BuildMode;
use bundlekit_manifest::PatchManifest;

/// The generated manifest, published by [`TaskCreateManifest`].
#[derive(Debug, Clone)]
pub struct ManifestContext {
    pub manifest: PatchManifest,
}

impl ContextObject for ManifestContext {
    const KIND: ContextKind = ContextKind::Manifest;
}

/// Generates the manifest from the build map and the packager report.
///
/// Simulate builds have no packager output; their bundle references are
/// derived from the asset graph instead.
#[derive(Debug, Default)]
pub struct TaskCreateManifest;

impl BuildTask for TaskCreateManifest {
    fn name(&self) -> &'static str {
        "CreateManifest"
    }

    fn run(&self, ctx: &mut BuildContext) -> Result<()> {
        let params = ctx.get::<BuildParameters>()?;
        let map = ctx.get::<BuildMap>()?;

        let manifest = if params.build_mode == BuildMode::SimulateBuild {
            create_manifest(map, &SimulateReport::from_build_map(map), params)?
        } else {
            let packager = ctx.get::<PackagerContext>()?;
            create_manifest(map, packager.report.as_ref(), params)?
        };

        ctx.set(ManifestContext { manifest })
    }
}
