use super::BuildTask;
use crate::assignment::BuildMap;
use crate::context::BuildContext;
use crate::error::{Error, Result};
use crate::packager::PackagerContext;
use crate::parameters::{BuildParameters, PipelineKind};
use std::collections::BTreeSet;

/// Checks the packager output against the build map.
///
/// The packager must report exactly the bundles of the build map (raw bundles
/// excepted for the legacy packager, which never sees them), and every bundle
/// file must exist when the build writes bundles.
#[derive(Debug, Default)]
pub struct TaskVerifyBuildResult;

impl BuildTask for TaskVerifyBuildResult {
    fn name(&self) -> &'static str {
        "VerifyBuildResult"
    }

    fn run(&self, ctx: &mut BuildContext) -> Result<()> {
        let params = ctx.get::<BuildParameters>()?;
        if !params.verify_output {
            tracing::debug!("Output verification disabled");
            return Ok(());
        }

        let map = ctx.get::<BuildMap>()?;
        let report = &ctx.get::<PackagerContext>()?.report;

        let expected: BTreeSet<&str> = map
            .bundles
            .iter()
            .filter(|bundle| params.pipeline == PipelineKind::Scriptable || !bundle.is_raw)
            .map(|bundle| bundle.bundle_name.as_str())
            .collect();
        let actual = report.bundle_names();
        let actual: BTreeSet<&str> = actual.iter().map(String::as_str).collect();

        if let Some(missing) = expected.difference(&actual).next() {
            return Err(Error::MissingOutput {
                bundle: missing.to_string(),
            });
        }
        if let Some(extra) = actual.difference(&expected).next() {
            return Err(Error::UnexpectedOutput(extra.to_string()));
        }

        if params.build_mode.writes_bundles() {
            let output_dir = params.pipeline_output_dir();
            for bundle in &map.bundles {
                if !output_dir.join(&bundle.bundle_name).is_file() {
                    return Err(Error::MissingOutput {
                        bundle: bundle.bundle_name.clone(),
                    });
                }
            }
        }

        tracing::info!("Verified packager output bundles={}", actual.len());
        Ok(())
    }
}
