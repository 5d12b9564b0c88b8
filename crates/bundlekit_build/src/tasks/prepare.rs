use super::{remove_dir_if_exists, BuildTask};
use crate::context::BuildContext;
use crate::error::Result;
use crate::parameters::BuildParameters;
use bundlekit_core::BuildMode;

/// Validates the parameters and, for a forced rebuild, wipes the package
/// output root including the packager cache.
#[derive(Debug, Default)]
pub struct TaskPrepare;

impl BuildTask for TaskPrepare {
    fn name(&self) -> &'static str {
        "Prepare"
    }

    fn run(&self, ctx: &mut BuildContext) -> Result<()> {
        let params = ctx.get::<BuildParameters>()?;
        params.validate()?;

        if params.build_mode == BuildMode::ForceRebuild {
            let root = params.package_root();
            tracing::info!("Force rebuild, clearing output root={}", root);
            remove_dir_if_exists(&root)?;
        }

        Ok(())
    }
}
