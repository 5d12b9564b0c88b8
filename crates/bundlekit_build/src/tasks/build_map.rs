use super::BuildTask;
use crate::assignment::BuildMap;
use crate::context::BuildContext;
use crate::error::Result;
use crate::parameters::BuildParameters;
use bundlekit_core::AssetCollector;
use std::sync::Arc;

/// Runs the collector and publishes the [`BuildMap`].
pub struct TaskGetBuildMap {
    collector: Arc<dyn AssetCollector>,
}

impl TaskGetBuildMap {
    pub fn new(collector: Arc<dyn AssetCollector>) -> Self {
        Self { collector }
    }
}

impl BuildTask for TaskGetBuildMap {
    fn name(&self) -> &'static str {
        "GetBuildMap"
    }

    fn run(&self, ctx: &mut BuildContext) -> Result<()> {
        let params = ctx.get::<BuildParameters>()?;
        let collected = self
            .collector
            .collect(params.build_mode, &params.package_name)?;

        tracing::info!(
            "Collected package={} assets={} system_bundle={}",
            collected.package_name,
            collected.assets.len(),
            collected.system_bundle_name
        );

        let map = BuildMap::create(&collected, params)?;
        ctx.set(map)
    }
}
