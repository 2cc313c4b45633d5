//! Resolution result types.
//!
//! These serialize directly to the JSON document printed by the CLI.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Caller label used for module calls declared in the root module.
pub const ROOT_CALLER: &str = "(root)";

/// A module whose files live on the local filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRecord {
    /// Call name; `None` for the root module.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Source string as written in the call; `None` for the root module.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Canonical absolute directory of the module.
    pub resolved_path: PathBuf,
    /// Configuration files directly inside `resolved_path`.
    pub files: Vec<PathBuf>,
}

impl ModuleRecord {
    /// Record for the root module.
    pub fn root(resolved_path: PathBuf, files: Vec<PathBuf>) -> Self {
        Self {
            name: None,
            source: None,
            resolved_path,
            files,
        }
    }

    /// Record for a local module reached through a call.
    pub fn local(
        name: impl Into<String>,
        source: impl Into<String>,
        resolved_path: PathBuf,
        files: Vec<PathBuf>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            source: Some(source.into()),
            resolved_path,
            files,
        }
    }
}

/// A module call whose source is not a local path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteModuleReference {
    pub name: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Name of the declaring module, or [`ROOT_CALLER`].
    pub called_from: String,
}

/// Everything discovered from one root directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub root_module: ModuleRecord,
    pub local_modules: Vec<ModuleRecord>,
    pub remote_modules: Vec<RemoteModuleReference>,
}

impl ResolutionResult {
    /// Root record followed by every local record, in discovery order.
    pub fn modules(&self) -> impl Iterator<Item = &ModuleRecord> {
        std::iter::once(&self.root_module).chain(self.local_modules.iter())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> ResolutionResult {
        ResolutionResult {
            root_module: ModuleRecord::root(
                PathBuf::from("/repo/root"),
                vec![PathBuf::from("/repo/root/main.tf")],
            ),
            local_modules: vec![ModuleRecord::local(
                "vpc",
                "../modules/vpc",
                PathBuf::from("/repo/modules/vpc"),
                vec![PathBuf::from("/repo/modules/vpc/main.tf")],
            )],
            remote_modules: vec![
                RemoteModuleReference {
                    name: "eks".to_string(),
                    source: "terraform-aws-modules/eks/aws".to_string(),
                    version: Some("~> 19.0".to_string()),
                    called_from: ROOT_CALLER.to_string(),
                },
                RemoteModuleReference {
                    name: "labels".to_string(),
                    source: "git::https://example.com/labels.git".to_string(),
                    version: None,
                    called_from: "vpc".to_string(),
                },
            ],
        }
    }

    #[test]
    fn serializes_to_output_document() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(
            value,
            json!({
                "root_module": {
                    "resolved_path": "/repo/root",
                    "files": ["/repo/root/main.tf"]
                },
                "local_modules": [{
                    "name": "vpc",
                    "source": "../modules/vpc",
                    "resolved_path": "/repo/modules/vpc",
                    "files": ["/repo/modules/vpc/main.tf"]
                }],
                "remote_modules": [
                    {
                        "name": "eks",
                        "source": "terraform-aws-modules/eks/aws",
                        "version": "~> 19.0",
                        "called_from": "(root)"
                    },
                    {
                        "name": "labels",
                        "source": "git::https://example.com/labels.git",
                        "called_from": "vpc"
                    }
                ]
            })
        );
    }

    #[test]
    fn empty_collections_serialize_as_arrays() {
        let result = ResolutionResult {
            root_module: ModuleRecord::root(PathBuf::from("/empty"), Vec::new()),
            local_modules: Vec::new(),
            remote_modules: Vec::new(),
        };
        let value = serde_json::to_value(result).unwrap();
        assert_eq!(value["root_module"]["files"], json!([]));
        assert_eq!(value["local_modules"], json!([]));
        assert_eq!(value["remote_modules"], json!([]));
    }

    #[test]
    fn modules_yields_root_first() {
        let result = sample();
        let paths: Vec<_> = result.modules().map(|m| m.resolved_path.clone()).collect();
        assert_eq!(
            paths,
            vec![PathBuf::from("/repo/root"), PathBuf::from("/repo/modules/vpc")]
        );
    }
}
