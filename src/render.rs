//! Manifest rendering collaborator
//!
//! Turning an IstioOperator spec into concrete resource manifests is the
//! translator's job, not the verifier's. The engine consumes it through the
//! narrow [`ManifestRenderer`] interface: one atomic call producing named
//! text blobs plus a list of errors. The shipped [`PackageRenderer`] reads
//! pre-rendered YAML out of the install package path.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[cfg(test)]
use mockall::automock;
use tracing::debug;

use crate::operator::InstallOperator;

/// A rendered manifest: category name to ordered resource text blobs.
///
/// Ordered map so walks are deterministic across runs.
pub type RenderedManifest = BTreeMap<String, Vec<String>>;

/// Trait for rendering an installation spec into concrete manifests.
///
/// Any non-empty error list is converted to a single aggregate error by the
/// operator expander; a renderer may return partial output alongside errors.
#[cfg_attr(test, automock)]
pub trait ManifestRenderer: Send + Sync {
    /// Render the operator spec into category-named manifest blobs
    fn render(&self, operator: &InstallOperator) -> (RenderedManifest, Vec<String>);
}

// =============================================================================
// Package Renderer
// =============================================================================

/// Renders by reading pre-rendered YAML from the install package path.
///
/// Layout: each subdirectory of the package path is a category, each `.yaml`
/// file inside it one blob, in filename order. Loose `.yaml` files at the
/// top level become single-blob categories named after the file stem.
pub struct PackageRenderer {
    /// Package path used when the operator spec declares none
    default_path: Option<PathBuf>,
}

impl PackageRenderer {
    /// Create a renderer with an optional fallback package path
    pub fn new(default_path: Option<PathBuf>) -> Self {
        Self { default_path }
    }

    fn package_path(&self, operator: &InstallOperator) -> Option<PathBuf> {
        operator
            .spec
            .install_package_path
            .as_ref()
            .map(PathBuf::from)
            .or_else(|| self.default_path.clone())
    }

    fn read_category(dir: &Path, blobs: &mut Vec<String>, errors: &mut Vec<String>) {
        let mut files: Vec<PathBuf> = match std::fs::read_dir(dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| is_yaml(p))
                .collect(),
            Err(e) => {
                errors.push(format!("failed to read {}: {}", dir.display(), e));
                return;
            }
        };
        files.sort();
        for file in files {
            match std::fs::read_to_string(&file) {
                Ok(content) => blobs.push(content),
                Err(e) => errors.push(format!("failed to read {}: {}", file.display(), e)),
            }
        }
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

impl ManifestRenderer for PackageRenderer {
    fn render(&self, operator: &InstallOperator) -> (RenderedManifest, Vec<String>) {
        let mut manifest = RenderedManifest::new();
        let mut errors = Vec::new();

        let Some(root) = self.package_path(operator) else {
            errors.push(format!(
                "operator {} declares no installPackagePath and no --manifests override was given",
                operator.name()
            ));
            return (manifest, errors);
        };

        debug!(path = %root.display(), operator = operator.name(), "rendering from install package");

        let entries = match std::fs::read_dir(&root) {
            Ok(entries) => entries,
            Err(e) => {
                errors.push(format!("failed to read {}: {}", root.display(), e));
                return (manifest, errors);
            }
        };

        let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
        paths.sort();

        for path in paths {
            if path.is_dir() {
                let category = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let blobs = manifest.entry(category).or_default();
                Self::read_category(&path, blobs, &mut errors);
            } else if is_yaml(&path) {
                let category = path
                    .file_stem()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                match std::fs::read_to_string(&path) {
                    Ok(content) => manifest.entry(category).or_default().push(content),
                    Err(e) => errors.push(format!("failed to read {}: {}", path.display(), e)),
                }
            }
        }

        (manifest, errors)
    }
}
