//! JSON-backed dependency table standing in for a host asset database.

use bundlekit_core::{naming, DependencyProvider, Result};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Direct dependency lists keyed by asset path.
///
/// [`DependencyProvider::dependencies`] flattens the direct lists into the full
/// transitive set. Cycles are tolerated: each path is visited once.
///
/// # JSON format
///
/// ```json
/// {
///   "Assets/UI/Login.prefab": ["Assets/UI/Atlas.mat"],
///   "Assets/UI/Atlas.mat": ["Assets/UI/Atlas.png", "Assets/Shaders/UI.shader"]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyTable {
    direct: BTreeMap<String, Vec<String>>,
}

impl DependencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a table from a JSON file.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_std_path())?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Set the direct dependencies of one asset, replacing earlier entries.
    pub fn insert<I, S>(&mut self, asset_path: impl Into<String>, dependencies: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let deps = dependencies
            .into_iter()
            .map(|d| naming::normalize_asset_path(&d.into()))
            .collect();
        self.direct
            .insert(naming::normalize_asset_path(&asset_path.into()), deps);
    }

    pub fn direct_dependencies(&self, asset_path: &str) -> &[String] {
        self.direct
            .get(asset_path)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

impl DependencyProvider for DependencyTable {
    fn dependencies(&self, asset_path: &str) -> Result<Vec<String>> {
        let root = naming::normalize_asset_path(asset_path);
        let mut visited: HashSet<&str> = HashSet::new();
        let mut out = Vec::new();
        let mut stack: Vec<&str> = self
            .direct_dependencies(&root)
            .iter()
            .rev()
            .map(String::as_str)
            .collect();

        visited.insert(root.as_str());
        while let Some(path) = stack.pop() {
            if !visited.insert(path) {
                continue;
            }
            out.push(path.to_string());
            stack.extend(self.direct_dependencies(path).iter().rev().map(String::as_str));
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitive_closure_in_discovery_order() {
        let mut table = DependencyTable::new();
        table.insert("a", ["b", "c"]);
        table.insert("b", ["d"]);
        table.insert("c", ["d", "e"]);

        assert_eq!(table.dependencies("a").unwrap(), vec!["b", "d", "c", "e"]);
        assert_eq!(table.dependencies("c").unwrap(), vec!["d", "e"]);
        assert!(table.dependencies("unknown").unwrap().is_empty());
    }

    #[test]
    fn test_cycles_terminate_and_exclude_self() {
        let mut table = DependencyTable::new();
        table.insert("a", ["b"]);
        table.insert("b", ["c"]);
        table.insert("c", ["a"]);

        assert_eq!(table.dependencies("a").unwrap(), vec!["b", "c"]);
        assert_eq!(table.dependencies("b").unwrap(), vec!["c", "a"]);
    }

    #[test]
    fn test_backslashes_normalized() {
        let mut table = DependencyTable::new();
        table.insert("Assets\\a.prefab", ["Assets\\b.mat"]);
        assert_eq!(
            table.dependencies("Assets/a.prefab").unwrap(),
            vec!["Assets/b.mat"]
        );
    }

    #[test]
    fn test_json_format() {
        let json = r#"{ "a": ["b"], "b": [] }"#;
        let table: DependencyTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.direct_dependencies("a"), ["b".to_string()]);
    }
}
