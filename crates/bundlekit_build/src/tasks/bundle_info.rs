use super::BuildTask;
use crate::assignment::BuildMap;
use crate::context::BuildContext;
use crate::error::{Error, Result};
use crate::packager::PackagerContext;
use crate::parameters::BuildParameters;
use crate::progress::BuildProgress;
use bundlekit_core::hash::{digest_file, FileDigest, ZERO_HASH};
use camino::Utf8PathBuf;
use rayon::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};

/// Computes content hash, file hash, CRC and size of every bundle, then the
/// bundle's output file name.
///
/// Builds that write no bundles get the all-zero sentinels. Output file
/// names depend on the file hash, so they are only computed here.
#[derive(Debug, Default)]
pub struct TaskUpdateBundleInfo;

impl BuildTask for TaskUpdateBundleInfo {
    fn name(&self) -> &'static str {
        "UpdateBundleInfo"
    }

    fn run(&self, ctx: &mut BuildContext) -> Result<()> {
        let params = ctx.get::<BuildParameters>()?;
        let style = params.output_name_style;
        let map = ctx.get::<BuildMap>()?;

        let infos: Vec<(String, FileDigest)> = if params.build_mode.writes_bundles() {
            let output_dir = params.pipeline_output_dir();
            let report = &ctx.get::<PackagerContext>()?.report;

            let files: Vec<Utf8PathBuf> = map
                .bundles
                .iter()
                .map(|bundle| {
                    bundle
                        .encrypted_path
                        .clone()
                        .unwrap_or_else(|| output_dir.join(&bundle.bundle_name))
                })
                .collect();

            let progress = ctx.progress_callback();
            let total = files.len() as u32;
            let done = AtomicU32::new(0);
            let task = self.name();

            // Digest in parallel, merge on this thread.
            let digests = files
                .par_iter()
                .map(|path| {
                    let digest = digest_file(path).map_err(Error::io_at(path))?;
                    let current = done.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(callback) = &progress {
                        callback(BuildProgress::file(task, path.as_str(), current, total));
                    }
                    Ok(digest)
                })
                .collect::<Result<Vec<_>>>()?;

            map.bundles
                .iter()
                .zip(digests)
                .map(|(bundle, digest)| {
                    let content_hash = if bundle.is_raw {
                        digest.md5.clone()
                    } else {
                        report
                            .content_hash(&bundle.bundle_name)
                            .map(str::to_string)
                            .ok_or_else(|| Error::MissingOutput {
                                bundle: bundle.bundle_name.clone(),
                            })?
                    };
                    Ok((content_hash, digest))
                })
                .collect::<Result<Vec<_>>>()?
        } else {
            map.bundles
                .iter()
                .map(|_| (ZERO_HASH.to_string(), FileDigest::sentinel()))
                .collect()
        };

        let map = ctx.get_mut::<BuildMap>()?;
        for (bundle, (content_hash, digest)) in map.bundles.iter_mut().zip(infos) {
            bundle.apply_digest(content_hash, digest);
            bundle.output_file_name =
                style.file_name(&bundle.bundle_name, &bundle.file_hash, &bundle.extension);
        }

        tracing::info!(
            "Updated bundle info bundles={} total_size={}",
            map.bundles.len(),
            map.bundles.iter().map(|b| b.size).sum::<u64>()
        );
        Ok(())
    }
}
