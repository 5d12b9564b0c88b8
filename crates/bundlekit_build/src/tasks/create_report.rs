use super::{BuildTask, ManifestContext};
use crate::assignment::BuildMap;
use crate::context::BuildContext;
use crate::error::Result;
use crate::parameters::BuildParameters;
use crate::report::{report_file_name, BuildReport, ReportContext};

/// Writes the JSON build report into the packager output directory.
#[derive(Debug, Default)]
pub struct TaskCreateReport;

impl BuildTask for TaskCreateReport {
    fn name(&self) -> &'static str {
        "CreateReport"
    }

    fn run(&self, ctx: &mut BuildContext) -> Result<()> {
        let params = ctx.get::<BuildParameters>()?;
        let map = ctx.get::<BuildMap>()?;
        let manifest = &ctx.get::<ManifestContext>()?.manifest;

        let report = BuildReport::create(map, manifest, params);
        let report_path = params
            .pipeline_output_dir()
            .join(report_file_name(&params.package_name, &params.package_version));
        report.save(&report_path)?;

        tracing::info!("Wrote build report path={}", report_path);
        ctx.set(ReportContext { report_path })
    }
}
