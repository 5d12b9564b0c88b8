use super::BuildTask;
use crate::assignment::BuildMap;
use crate::context::BuildContext;
use crate::encryption::{EncryptOutcome, EncryptionServices};
use crate::error::{Error, Result};
use crate::parameters::BuildParameters;
use std::sync::Arc;

/// Extension appended to the encrypted copy of a bundle.
pub const ENCRYPTED_EXTENSION: &str = "encrypt";

/// Passes every bundle file through the encryption service.
///
/// Encrypted output is written beside the original as `{bundle}.encrypt`;
/// the original stays in place for the packager cache.
pub struct TaskEncryption {
    services: Arc<dyn EncryptionServices>,
}

impl TaskEncryption {
    pub fn new(services: Arc<dyn EncryptionServices>) -> Self {
        Self { services }
    }
}

impl BuildTask for TaskEncryption {
    fn name(&self) -> &'static str {
        "Encryption"
    }

    fn run(&self, ctx: &mut BuildContext) -> Result<()> {
        let params = ctx.get::<BuildParameters>()?;
        if !params.build_mode.writes_bundles() {
            return Ok(());
        }
        let output_dir = params.pipeline_output_dir();

        let mut encrypted = 0usize;
        let map = ctx.get_mut::<BuildMap>()?;
        for bundle in &mut map.bundles {
            let source = output_dir.join(&bundle.bundle_name);
            let data = std::fs::read(&source).map_err(Error::io_at(&source))?;

            let outcome = self
                .services
                .encrypt(&bundle.bundle_name, &data)
                .map_err(|e| Error::Encryption {
                    bundle: bundle.bundle_name.clone(),
                    message: e.to_string(),
                })?;

            if let EncryptOutcome::Encrypted { data, load_method } = outcome {
                let target =
                    output_dir.join(format!("{}.{}", bundle.bundle_name, ENCRYPTED_EXTENSION));
                std::fs::write(&target, data).map_err(Error::io_at(&target))?;
                bundle.encrypted_path = Some(target);
                bundle.load_method = load_method;
                encrypted += 1;
            }
        }

        tracing::info!("Encryption finished encrypted={}", encrypted);
        Ok(())
    }
}
