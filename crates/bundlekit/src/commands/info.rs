use bundlekit_manifest::{load_manifest, LoadMethod, PatchManifest};
use colored::Colorize;

use crate::{
    errors::CliError,
    println_pad,
    utils::{absolute_path, format_size},
};

pub struct InfoManifestArgs {
    pub file: String,
}

pub fn info_manifest(args: InfoManifestArgs) -> miette::Result<()> {
    let path = absolute_path(&args.file)?;
    let manifest =
        load_manifest(&path).map_err(|source| CliError::ManifestReadFailed { path, source })?;

    println_pad!(
        "{} {}",
        "📦 Package:".bright_blue().bold(),
        manifest.package_name.bright_cyan().bold()
    );
    println_pad!(
        "{} {}",
        "🏷️ Version:".bright_green(),
        manifest.package_version.bright_white().bold()
    );
    println_pad!(
        "{} {} {}",
        "📝 Format:".bright_yellow(),
        manifest.file_version.bright_white(),
        format!(
            "(addressable: {}, name style: {:?})",
            manifest.enable_addressable, manifest.output_name_style
        )
        .dimmed()
    );
    println_pad!(
        "{} {} bundles, {} assets, {}",
        "📊 Contents:".bright_yellow(),
        manifest.bundle_list.len().to_string().bright_white().bold(),
        manifest.asset_list.len().to_string().bright_white().bold(),
        format_size(manifest.total_size())
    );

    println_pad!("\n{}", "🗂️  Bundles:".bright_magenta().bold());
    for line in bundle_lines(&manifest) {
        println_pad!("{}", line);
    }

    Ok(())
}

fn bundle_lines(manifest: &PatchManifest) -> Vec<String> {
    let width = manifest
        .bundle_list
        .iter()
        .map(|bundle| bundle.bundle_name.len())
        .max()
        .unwrap_or(0);

    manifest
        .bundle_list
        .iter()
        .enumerate()
        .map(|(id, bundle)| {
            let assets = manifest
                .asset_list
                .iter()
                .filter(|asset| asset.bundle_id as usize == id)
                .count();
            let mut flags = Vec::new();
            if bundle.is_raw_file {
                flags.push("raw".to_string());
            }
            if bundle.load_method != LoadMethod::Normal {
                flags.push(format!("{:?}", bundle.load_method));
            }
            if !bundle.tags.is_empty() {
                flags.push(format!("tags: {}", bundle.tags.join(";")));
            }

            format!(
                "   {} {:<width$}  {:>10}  {} assets, {} refs  {}  {}",
                "•".bright_cyan(),
                bundle.bundle_name,
                format_size(bundle.file_size),
                assets,
                bundle.reference_ids.len(),
                bundle.file_hash.dimmed(),
                flags.join(", ").dimmed(),
                width = width
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bundlekit_manifest::{PatchAsset, PatchBundle};

    #[test]
    fn test_bundle_lines() {
        colored::control::set_override(false);

        let mut manifest = PatchManifest::new("pkg", "v1");
        manifest.bundle_list = vec![
            PatchBundle {
                bundle_name: "ui.bundle".to_string(),
                file_hash: "abc".to_string(),
                file_size: 2048,
                tags: vec!["startup".to_string()],
                ..Default::default()
            },
            PatchBundle {
                bundle_name: "intro.rawfile".to_string(),
                file_hash: "def".to_string(),
                is_raw_file: true,
                reference_ids: vec![0],
                ..Default::default()
            },
        ];
        manifest.asset_list = vec![PatchAsset {
            asset_path: "UI/Login.prefab".to_string(),
            ..Default::default()
        }];

        let lines = bundle_lines(&manifest);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("ui.bundle"));
        assert!(lines[0].contains("1 assets, 0 refs"));
        assert!(lines[0].contains("tags: startup"));
        assert!(lines[1].contains("0 assets, 1 refs"));
        assert!(lines[1].contains("raw"));
    }
}
