//! Project manifest persistence.
//!
//! # Storage layout
//!
//! ```text
//! <project>/
//!   .keel/                (mode 0700, created on first init)
//!     config.yaml         (the manifest: mode 0600)
//!     tests/              (see [`crate::records`])
//! ```
//!
//! # API pattern
//!
//! Every function takes the project root explicitly (`fn_at(root: &Path, …)`);
//! [`find_project_root`] resolves the root from a working directory.

use std::path::{Path, PathBuf};

use crate::error::{io_err, StoreError};
use crate::types::ProjectManifest;

const KEEL_DIR: &str = ".keel";
const MANIFEST_FILE: &str = "config.yaml";
const MANIFEST_HEADER: &str = "# keel project manifest\n# Aliases below are reconciled by `keel sync`.\n\n";

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<root>/.keel/`: pure, no I/O.
pub fn keel_dir_path_at(root: &Path) -> PathBuf {
    root.join(KEEL_DIR)
}

/// `<root>/.keel/`, created (mode `0700`) if it does not yet exist.
pub fn keel_dir_at(root: &Path) -> Result<PathBuf, StoreError> {
    let dir = keel_dir_path_at(root);
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        set_dir_permissions(&dir)?;
    }
    Ok(dir)
}

/// `<root>/.keel/config.yaml`: pure, no I/O.
pub fn manifest_path_at(root: &Path) -> PathBuf {
    keel_dir_path_at(root).join(MANIFEST_FILE)
}

/// Walk up from `start` to the nearest directory holding `.keel/config.yaml`.
pub fn find_project_root(start: &Path) -> Result<PathBuf, StoreError> {
    start
        .ancestors()
        .find(|dir| manifest_path_at(dir).is_file())
        .map(Path::to_path_buf)
        .ok_or_else(|| StoreError::ProjectNotFound {
            start: start.to_path_buf(),
        })
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load the manifest from `<root>/.keel/config.yaml`.
///
/// Returns `StoreError::ManifestNotFound` if absent,
/// `StoreError::Parse` (with path + line context) if malformed YAML.
pub fn load_manifest_at(root: &Path) -> Result<ProjectManifest, StoreError> {
    let path = manifest_path_at(root);
    if !path.exists() {
        return Err(StoreError::ManifestNotFound { path });
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    serde_yaml::from_str(&contents).map_err(|source| StoreError::Parse { path, source })
}

// ---------------------------------------------------------------------------
// 3. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save the manifest to `<root>/.keel/config.yaml`.
///
/// Write flow: serialize → `config.yaml.tmp` sibling → `chmod 0600` → `rename`.
/// The `.tmp` file lives in the same directory as the target, so the rename
/// never crosses filesystems; on failure the previous manifest is untouched.
pub fn save_manifest_at(root: &Path, manifest: &ProjectManifest) -> Result<(), StoreError> {
    keel_dir_at(root)?;
    let path = manifest_path_at(root);
    let tmp_path = path.with_file_name(format!("{MANIFEST_FILE}.tmp"));

    let yaml = serde_yaml::to_string(manifest)?;
    std::fs::write(&tmp_path, format!("{MANIFEST_HEADER}{yaml}"))
        .map_err(|e| io_err(&tmp_path, e))?;
    set_file_permissions(&tmp_path)?;
    if let Err(e) = std::fs::rename(&tmp_path, &path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(io_err(&path, e));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// 4. Init
// ---------------------------------------------------------------------------

/// Create `<root>/.keel/config.yaml` for a project named `name`.
///
/// Idempotent: if the manifest already exists, loads and returns it unchanged.
pub fn init_at(root: &Path, name: &str) -> Result<ProjectManifest, StoreError> {
    if manifest_path_at(root).exists() {
        return load_manifest_at(root);
    }
    let manifest = ProjectManifest::new(name);
    save_manifest_at(root, &manifest)?;
    Ok(manifest)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Alias, RemoteId};
    use tempfile::TempDir;

    #[test]
    fn manifest_path_is_correct() {
        let root = TempDir::new().expect("tempdir");
        let path = manifest_path_at(root.path());
        assert!(path.ends_with(".keel/config.yaml"));
    }

    #[test]
    fn keel_dir_created_with_perms() {
        let root = TempDir::new().expect("tempdir");
        let dir = keel_dir_at(root.path()).expect("keel_dir_at");
        assert!(dir.exists());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&dir).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o700);
        }
    }

    #[test]
    fn save_and_load_manifest_roundtrip() {
        let root = TempDir::new().expect("tempdir");
        let mut manifest = ProjectManifest::new("shop");
        manifest
            .tests
            .insert(Alias::from("login-flow"), RemoteId::from("T1"));
        save_manifest_at(root.path(), &manifest).expect("save");

        let loaded = load_manifest_at(root.path()).expect("load");
        assert_eq!(loaded, manifest);
        let raw = std::fs::read_to_string(manifest_path_at(root.path())).unwrap();
        assert!(raw.starts_with("# keel project manifest"));
    }

    #[test]
    fn atomic_write_cleans_up_tmp() {
        let root = TempDir::new().expect("tempdir");
        save_manifest_at(root.path(), &ProjectManifest::new("shop")).expect("save");
        let tmp = manifest_path_at(root.path()).with_file_name("config.yaml.tmp");
        assert!(!tmp.exists(), ".tmp must be gone after successful save");
    }

    #[test]
    fn load_missing_manifest_returns_not_found() {
        let root = TempDir::new().expect("tempdir");
        let err = load_manifest_at(root.path()).unwrap_err();
        assert!(matches!(err, StoreError::ManifestNotFound { .. }));
    }

    #[test]
    fn init_is_idempotent() {
        let root = TempDir::new().expect("tempdir");
        let first = init_at(root.path(), "shop").expect("init");
        let mut edited = first.clone();
        edited
            .workflows
            .insert(Alias::from("smoke"), RemoteId::from("W1"));
        save_manifest_at(root.path(), &edited).expect("save");

        let second = init_at(root.path(), "other-name").expect("re-init");
        assert_eq!(second, edited);
    }

    #[test]
    fn find_project_root_walks_up() {
        let root = TempDir::new().expect("tempdir");
        init_at(root.path(), "shop").expect("init");
        let nested = root.path().join("src").join("screens");
        std::fs::create_dir_all(&nested).unwrap();

        let found = find_project_root(&nested).expect("found");
        assert_eq!(found, root.path());
    }

    #[test]
    fn find_project_root_reports_start_dir() {
        let root = TempDir::new().expect("tempdir");
        let err = find_project_root(root.path()).unwrap_err();
        assert!(matches!(err, StoreError::ProjectNotFound { .. }));
        assert!(err.to_string().contains("no keel project"));
    }
}
