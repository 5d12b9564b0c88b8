use super::{copy_files, remove_dir_if_exists, BuildTask, PackageContext};
use crate::assignment::BuildMap;
use crate::context::BuildContext;
use crate::error::{Error, Result};
use crate::parameters::{BuildParameters, CopyBuildinOption};
use camino::Utf8PathBuf;

/// Copies the package, or its tagged subset, into the built-in directory
/// shipped with the application.
#[derive(Debug, Default)]
pub struct TaskCopyBuildinFiles;

impl BuildTask for TaskCopyBuildinFiles {
    fn name(&self) -> &'static str {
        "CopyBuildinFiles"
    }

    fn run(&self, ctx: &mut BuildContext) -> Result<()> {
        let params = ctx.get::<BuildParameters>()?;
        let option = params.copy_buildin_option;
        if option == CopyBuildinOption::None {
            return Ok(());
        }

        let target_dir = params
            .buildin_package_dir()
            .ok_or(Error::MissingParameter("buildin_root"))?;
        if option.clears_target() {
            remove_dir_if_exists(&target_dir)?;
        }
        std::fs::create_dir_all(&target_dir).map_err(Error::io_at(&target_dir))?;

        let package = ctx.get::<PackageContext>()?;
        let map = ctx.get::<BuildMap>()?;

        let mut sources: Vec<Utf8PathBuf> = vec![
            package.manifest_files.bytes.clone(),
            package.manifest_files.hash.clone(),
            package.version_file.clone(),
        ];
        if params.build_mode.writes_bundles() {
            sources.extend(
                map.bundles
                    .iter()
                    .filter(|bundle| !option.by_tags() || bundle.has_tag(&params.copy_buildin_tags))
                    .map(|bundle| package.package_dir.join(&bundle.output_file_name)),
            );
        }

        let jobs: Vec<(Utf8PathBuf, Utf8PathBuf)> = sources
            .into_iter()
            .filter_map(|source| {
                let target = target_dir.join(source.file_name()?);
                Some((source, target))
            })
            .collect();
        let pairs: Vec<_> = jobs
            .iter()
            .map(|(source, target)| (source.as_path(), target.as_path()))
            .collect();
        copy_files(self.name(), &pairs, ctx.progress_callback())?;

        tracing::info!(
            "Copied built-in files option={:?} dir={} files={}",
            option,
            target_dir,
            jobs.len()
        );
        Ok(())
    }
}
