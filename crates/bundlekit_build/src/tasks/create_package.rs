use super::{copy_files, remove_dir_if_exists, BuildTask, ManifestContext};
use crate::assignment::BuildMap;
use crate::context::{BuildContext, ContextKind, ContextObject};
use crate::error::{Error, Result};
use crate::parameters::BuildParameters;
use crate::report::ReportContext;
use bundlekit_manifest::{write_manifest_files, write_version_file, ManifestFiles};
use camino::Utf8PathBuf;

/// The finished package directory, published by [`TaskCreatePackage`].
#[derive(Debug, Clone)]
pub struct PackageContext {
    pub package_dir: Utf8PathBuf,
    pub manifest_files: ManifestFiles,
    pub version_file: Utf8PathBuf,
}

impl ContextObject for PackageContext {
    const KIND: ContextKind = ContextKind::Package;
}

/// Assembles `{output_root}/{package}/{version}`.
///
/// The version file is written last: a directory without it is not a
/// complete package.
#[derive(Debug, Default)]
pub struct TaskCreatePackage;

impl BuildTask for TaskCreatePackage {
    fn name(&self) -> &'static str {
        "CreatePackage"
    }

    fn run(&self, ctx: &mut BuildContext) -> Result<()> {
        let params = ctx.get::<BuildParameters>()?;
        let map = ctx.get::<BuildMap>()?;
        let manifest = &ctx.get::<ManifestContext>()?.manifest;

        let package_dir = params.package_output_dir();
        remove_dir_if_exists(&package_dir)?;
        std::fs::create_dir_all(&package_dir).map_err(Error::io_at(&package_dir))?;

        if params.build_mode.writes_bundles() {
            let output_dir = params.pipeline_output_dir();
            let jobs: Vec<(Utf8PathBuf, Utf8PathBuf)> = map
                .bundles
                .iter()
                .map(|bundle| {
                    let source = bundle
                        .encrypted_path
                        .clone()
                        .unwrap_or_else(|| output_dir.join(&bundle.bundle_name));
                    (source, package_dir.join(&bundle.output_file_name))
                })
                .collect();
            let pairs: Vec<_> = jobs
                .iter()
                .map(|(source, target)| (source.as_path(), target.as_path()))
                .collect();
            copy_files(self.name(), &pairs, ctx.progress_callback())?;
        }

        if ctx.contains::<ReportContext>() {
            let report_path = &ctx.get::<ReportContext>()?.report_path;
            if let Some(file_name) = report_path.file_name() {
                let target = package_dir.join(file_name);
                std::fs::copy(report_path, &target).map_err(Error::io_at(report_path))?;
            }
        }

        let manifest_files = write_manifest_files(&package_dir, manifest)?;
        let version_file =
            write_version_file(&package_dir, &params.package_name, &params.package_version)?;

        tracing::info!(
            "Created package dir={} bundles={} hash={}",
            package_dir,
            map.bundles.len(),
            manifest_files.package_hash
        );

        ctx.set(PackageContext {
            package_dir,
            manifest_files,
            version_file,
        })
    }
}
