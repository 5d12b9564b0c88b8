//! Fixed task lists and the sequential runner.

use crate::context::BuildContext;
use crate::encryption::EncryptionServices;
use crate::error::Error;
use crate::packager::{LegacyPackager, ScriptablePackager};
use crate::progress::BuildProgress;
use crate::tasks::*;
use bundlekit_core::AssetCollector;
use std::sync::Arc;
use std::time::Instant;

/// The first task error of a pipeline run.
#[derive(Debug)]
pub struct TaskFailure {
    pub task: &'static str,
    pub error: Error,
}

/// An ordered list of build tasks.
pub struct BuildPipeline {
    tasks: Vec<Box<dyn BuildTask>>,
}

impl BuildPipeline {
    pub fn new(tasks: Vec<Box<dyn BuildTask>>) -> Self {
        Self { tasks }
    }

    pub fn legacy(
        collector: Arc<dyn AssetCollector>,
        packager: Arc<dyn LegacyPackager>,
        encryption: Arc<dyn EncryptionServices>,
    ) -> Self {
        Self::new(vec![
            Box::new(TaskPrepare),
            Box::new(TaskGetBuildMap::new(collector)),
            Box::new(TaskBuildingLegacy::new(packager)),
            Box::new(TaskCopyRawFile),
            Box::new(TaskVerifyBuildResult),
            Box::new(TaskEncryption::new(encryption)),
            Box::new(TaskUpdateBundleInfo),
            Box::new(TaskCreateManifest),
            Box::new(TaskCreateReport),
            Box::new(TaskCreatePackage),
            Box::new(TaskCopyBuildinFiles),
        ])
    }

    pub fn scriptable(
        collector: Arc<dyn AssetCollector>,
        packager: Arc<dyn ScriptablePackager>,
        encryption: Arc<dyn EncryptionServices>,
    ) -> Self {
        Self::new(vec![
            Box::new(TaskPrepare),
            Box::new(TaskGetBuildMap::new(collector)),
            Box::new(TaskBuildingScriptable::new(packager)),
            Box::new(TaskVerifyBuildResult),
            Box::new(TaskEncryption::new(encryption)),
            Box::new(TaskUpdateBundleInfo),
            Box::new(TaskCreateManifest),
            Box::new(TaskCreateReport),
            Box::new(TaskCreatePackage),
            Box::new(TaskCopyBuildinFiles),
        ])
    }

    /// Packager-free pipeline producing only the manifest.
    pub fn simulate(collector: Arc<dyn AssetCollector>) -> Self {
        Self::new(vec![
            Box::new(TaskPrepare),
            Box::new(TaskGetBuildMap::new(collector)),
            Box::new(TaskUpdateBundleInfo),
            Box::new(TaskCreateManifest),
            Box::new(TaskCreatePackage),
        ])
    }

    pub fn task_names(&self) -> Vec<&'static str> {
        self.tasks.iter().map(|task| task.name()).collect()
    }

    /// Run every task in order, stopping at the first failure.
    pub fn run(&self, ctx: &mut BuildContext) -> Result<(), TaskFailure> {
        for task in &self.tasks {
            let name = task.name();
            let started = Instant::now();
            tracing::info!("Task started task={}", name);
            ctx.emit_progress(BuildProgress::started(name));

            if let Err(error) = task.run(ctx) {
                tracing::error!("Task failed task={} error={}", name, error);
                return Err(TaskFailure { task: name, error });
            }

            tracing::info!(
                "Task finished task={} elapsed_ms={}",
                name,
                started.elapsed().as_millis()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;

    struct Record(&'static str, bool);

    impl BuildTask for Record {
        fn name(&self) -> &'static str {
            self.0
        }

        fn run(&self, _ctx: &mut BuildContext) -> Result<()> {
            if self.1 {
                Ok(())
            } else {
                Err(Error::Packager("boom".to_string()))
            }
        }
    }

    #[test]
    fn test_stops_at_first_failure() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut ctx = BuildContext::with_progress(Arc::new(move |p: BuildProgress| {
            sink.lock().unwrap().push(p.task);
        }));

        let pipeline = BuildPipeline::new(vec![
            Box::new(Record("first", true)),
            Box::new(Record("second", false)),
            Box::new(Record("third", true)),
        ]);
        let failure = pipeline.run(&mut ctx).unwrap_err();

        assert_eq!(failure.task, "second");
        assert!(matches!(failure.error, Error::Packager(_)));
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_task_lists() {
        let collector: Arc<dyn AssetCollector> = Arc::new(NoAssets);
        let packager = Arc::new(crate::packager::ArchivePackager::new());
        let encryption = crate::encryption::services_for(Default::default());

        let legacy = BuildPipeline::legacy(collector.clone(), packager.clone(), encryption.clone());
        assert!(legacy.task_names().contains(&"CopyRawFile"));
        assert_eq!(legacy.task_names().len(), 11);

        let scriptable = BuildPipeline::scriptable(collector.clone(), packager, encryption);
        assert!(!scriptable.task_names().contains(&"CopyRawFile"));

        assert_eq!(
            BuildPipeline::simulate(collector).task_names(),
            vec![
                "Prepare",
                "GetBuildMap",
                "UpdateBundleInfo",
                "CreateManifest",
                "CreatePackage"
            ]
        );
    }

    struct NoAssets;

    impl AssetCollector for NoAssets {
        fn collect(
            &self,
            _mode: bundlekit_core::BuildMode,
            package_name: &str,
        ) -> bundlekit_core::Result<bundlekit_core::CollectResult> {
            Ok(bundlekit_core::CollectResult {
                package_name: package_name.to_string(),
                assets: Vec::new(),
                system_bundle_name: bundlekit_core::naming::system_bundle_name(package_name),
            })
        }
    }
}
