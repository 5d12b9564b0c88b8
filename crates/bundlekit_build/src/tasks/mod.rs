//! Build tasks.
//!
//! Each task reads what earlier tasks published in the [`BuildContext`],
//! does one step of the build and publishes its own result. Tasks never run
//! concurrently; a task may parallelize its own file work internally but
//! merges the results on the calling thread before touching the context.

mod build_map;
mod building;
mod bundle_info;
mod copy_buildin;
mod create_manifest;
mod create_package;
mod create_report;
mod encryption;
mod prepare;
mod verify;

pub use build_map::TaskGetBuildMap;
pub use building::{TaskBuildingLegacy, TaskBuildingScriptable, TaskCopyRawFile};
pub use bundle_info::TaskUpdateBundleInfo;
pub use copy_buildin::TaskCopyBuildinFiles;
pub use create_manifest::{ManifestContext, TaskCreateManifest};
pub use create_package::{PackageContext, TaskCreatePackage};
pub use create_report::TaskCreateReport;
pub use encryption::TaskEncryption;
pub use prepare::TaskPrepare;
pub use verify::TaskVerifyBuildResult;

use crate::context::BuildContext;
use crate::error::{Error, Result};
use crate::progress::{BuildProgress, ProgressCallback};
use camino::Utf8Path;
use rayon::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};

/// One step of the build pipeline.
pub trait BuildTask {
    /// Stable name reported when the task fails.
    fn name(&self) -> &'static str;

    fn run(&self, ctx: &mut BuildContext) -> Result<()>;
}

/// Copy files in parallel, reporting one progress event per file.
pub(crate) fn copy_files(
    task: &'static str,
    jobs: &[(&Utf8Path, &Utf8Path)],
    progress: Option<ProgressCallback>,
) -> Result<()> {
    let total = jobs.len() as u32;
    let done = AtomicU32::new(0);

    jobs.par_iter().try_for_each(|&(source, target)| {
        std::fs::copy(source, target).map_err(Error::io_at(source))?;
        let current = done.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(callback) = &progress {
            callback(BuildProgress::file(
                task,
                target.file_name().unwrap_or(target.as_str()),
                current,
                total,
            ));
        }
        Ok(())
    })
}

/// Remove a directory tree if it exists.
pub(crate) fn remove_dir_if_exists(dir: &Utf8Path) -> Result<()> {
    if dir.exists() {
        std::fs::remove_dir_all(dir).map_err(Error::io_at(dir))?;
    }
    Ok(())
}
