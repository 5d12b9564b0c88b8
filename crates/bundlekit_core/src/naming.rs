//! Bundle name normalization.
//!
//! Bundle names are derived from asset paths and must be stable across
//! platforms: the same asset path always yields the same bundle name, whatever
//! separator style the host uses.

/// Extension appended to packaged bundle names.
pub const BUNDLE_EXTENSION: &str = "bundle";

/// Extension appended to raw-file bundle names.
pub const RAW_BUNDLE_EXTENSION: &str = "rawfile";

/// Marker prefix of synthesized shared bundles.
pub const SHARE_BUNDLE_PREFIX: &str = "share";

/// Suffix of the package-scoped system bundle that pools shader-like assets.
pub const SYSTEM_BUNDLE_SUFFIX: &str = "systemshaders";

/// Normalize a raw bundle name.
///
/// `\`, `/`, `.` and spaces become `_`, and the result is lowercased:
///
/// - `Assets/UI/Icons` -> `assets_ui_icons`
/// - `Assets\Maps\Level 1` -> `assets_maps_level_1`
pub fn normalize_bundle_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '\\' | '/' | '.' | ' ' => '_',
            other => other,
        })
        .collect::<String>()
        .to_lowercase()
}

/// Normalize a path to forward slashes.
pub fn normalize_asset_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Remove the file extension from a path, keeping any directory components.
///
/// Dots inside directory names are left alone.
pub fn strip_extension(path: &str) -> &str {
    let file_start = path.rfind(['/', '\\']).map(|i| i + 1).unwrap_or(0);
    match path[file_start..].rfind('.') {
        Some(dot) if dot > 0 => &path[..file_start + dot],
        _ => path,
    }
}

/// Extension of a path without the leading dot, lowercased. Empty if none.
pub fn extension_of(path: &str) -> String {
    let file_start = path.rfind(['/', '\\']).map(|i| i + 1).unwrap_or(0);
    match path[file_start..].rfind('.') {
        Some(dot) if dot > 0 => path[file_start + dot + 1..].to_ascii_lowercase(),
        _ => String::new(),
    }
}

/// Build a full bundle name: `{normalized name}.{extension}`, optionally
/// prefixed with the package name so names are unique across packages.
pub fn make_bundle_name(
    package_name: &str,
    name: &str,
    extension: &str,
    unique_bundle_name: bool,
) -> String {
    let normalized = normalize_bundle_name(name);
    if unique_bundle_name {
        format!(
            "{}_{}.{}",
            normalize_bundle_name(package_name),
            normalized,
            extension
        )
    } else {
        format!("{}.{}", normalized, extension)
    }
}

/// Synthesize the name of the shared bundle holding a multiply-referenced
/// dependency. Derived from the asset path alone, so it is deterministic.
pub fn share_bundle_name(package_name: &str, asset_path: &str, unique_bundle_name: bool) -> String {
    let name = format!(
        "{}_{}",
        SHARE_BUNDLE_PREFIX,
        strip_extension(&normalize_asset_path(asset_path))
    );
    make_bundle_name(package_name, &name, BUNDLE_EXTENSION, unique_bundle_name)
}

/// Name of the package-scoped system bundle. Always carries the package name.
pub fn system_bundle_name(package_name: &str) -> String {
    make_bundle_name(package_name, SYSTEM_BUNDLE_SUFFIX, BUNDLE_EXTENSION, true)
}

/// Bundle name without its trailing extension.
pub fn bundle_stem(bundle_name: &str) -> &str {
    match bundle_name.rfind('.') {
        Some(dot) if dot > 0 => &bundle_name[..dot],
        _ => bundle_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_bundle_name() {
        assert_eq!(normalize_bundle_name("Assets/UI/Icons"), "assets_ui_icons");
        assert_eq!(
            normalize_bundle_name("Assets\\Maps\\Level 1"),
            "assets_maps_level_1"
        );
        assert_eq!(normalize_bundle_name("a.b.c"), "a_b_c");
    }

    #[test]
    fn test_strip_extension() {
        assert_eq!(strip_extension("assets/e.png"), "assets/e");
        assert_eq!(strip_extension("assets/v1.2/e"), "assets/v1.2/e");
        assert_eq!(strip_extension("assets/.hidden"), "assets/.hidden");
        assert_eq!(strip_extension("e.tar.gz"), "e.tar");
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("assets/Video.MP4"), "mp4");
        assert_eq!(extension_of("assets/v1.2/readme"), "");
    }

    #[test]
    fn test_share_bundle_name() {
        assert_eq!(share_bundle_name("main", "e.png", false), "share_e.bundle");
        assert_eq!(
            share_bundle_name("main", "Assets/Textures/Stone.png", false),
            "share_assets_textures_stone.bundle"
        );
        assert_eq!(
            share_bundle_name("Main", "Assets\\Textures\\Stone.png", true),
            "main_share_assets_textures_stone.bundle"
        );
    }

    #[test]
    fn test_system_bundle_name() {
        assert_eq!(system_bundle_name("DefaultPackage"), "defaultpackage_systemshaders.bundle");
    }

    #[test]
    fn test_bundle_stem() {
        assert_eq!(bundle_stem("share_e.bundle"), "share_e");
        assert_eq!(bundle_stem("plain"), "plain");
    }
}
