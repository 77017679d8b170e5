// src/app/import.rs
// Importing a model file from disk into the local models directory, including the replace / keep both / cancel handling of name collisions.

use crate::app::{error::ImportError, model::Model, store::ModelRepository};
use log::{debug, info, warn};
use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Upper bound on `name_N` probes when keeping both files.
pub const MAX_KEEP_BOTH_PROBES: u32 = 10_000;

/// The user's answer to "a file with this name already exists".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportDecision {
    Replace,
    KeepBoth,
    Cancel,
}

/// What the caller must do at the resolved path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportAction {
    /// Path is free, copy into it.
    Copy,
    /// Delete the existing file at the path, then copy.
    Replace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImport {
    pub final_path: PathBuf,
    pub action: ImportAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportResolution {
    Resolved(ResolvedImport),
    Cancelled,
}

/// Result of the collision probe for the candidate path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Collision {
    Free(PathBuf),
    Conflict(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    NothingPicked,
    Cancelled,
    Imported(Model),
}

/// File operations the import flow needs.
pub trait FileSystem {
    fn exists(&self, path: &Path) -> io::Result<bool>;
    fn mkdir(&self, path: &Path) -> io::Result<()>;
    fn copy_file(&self, src: &Path, dst: &Path) -> io::Result<()>;
    fn unlink(&self, path: &Path) -> io::Result<()>;
}

/// `FileSystem` backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn exists(&self, path: &Path) -> io::Result<bool> {
        path.try_exists()
    }

    fn mkdir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn copy_file(&self, src: &Path, dst: &Path) -> io::Result<()> {
        fs::copy(src, dst).map(|_| ())
    }

    fn unlink(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

/// File name for the imported copy: the picked file's name, or `file_<uuid>`.
pub fn candidate_name(picked: &Path) -> String {
    picked
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| format!("file_{}", uuid::Uuid::new_v4()))
}

/// Splits at the last dot. A leading dot or a trailing dot does not start an extension.
pub fn split_name(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    }
}

fn suffixed_name(stem: &str, ext: Option<&str>, n: u32) -> String {
    match ext {
        Some(ext) => format!("{}_{}.{}", stem, n, ext),
        None => format!("{}_{}", stem, n),
    }
}

fn probe<E>(exists: &mut E, path: &Path) -> Result<bool, ImportError>
where
    E: FnMut(&Path) -> io::Result<bool>,
{
    exists(path).map_err(|e| ImportError::fs("exists", path, e))
}

/// Checks whether `target_dir/candidate` is already taken.
pub fn detect_collision<E>(candidate: &str, target_dir: &Path, mut exists: E) -> Result<Collision, ImportError>
where
    E: FnMut(&Path) -> io::Result<bool>,
{
    let path = target_dir.join(candidate);
    if probe(&mut exists, &path)? {
        Ok(Collision::Conflict(path))
    } else {
        Ok(Collision::Free(path))
    }
}

/// First free `stem_N.ext` in `target_dir`, counting from 1.
pub fn next_free_path<E>(target_dir: &Path, name: &str, mut exists: E) -> Result<PathBuf, ImportError>
where
    E: FnMut(&Path) -> io::Result<bool>,
{
    let (stem, ext) = split_name(name);
    for n in 1..=MAX_KEEP_BOTH_PROBES {
        let path = target_dir.join(suffixed_name(stem, ext, n));
        if !probe(&mut exists, &path)? {
            debug!("Keep both: '{}' is free after {} probe(s).", path.display(), n);
            return Ok(path);
        }
    }
    Err(ImportError::SuffixesExhausted {
        stem: stem.to_string(),
        probes: MAX_KEEP_BOTH_PROBES,
    })
}

/// Turns the user's answer for a conflicting path into a resolution.
pub fn apply_decision<E>(
    conflict_path: &Path,
    decision: ImportDecision,
    exists: E,
) -> Result<ImportResolution, ImportError>
where
    E: FnMut(&Path) -> io::Result<bool>,
{
    match decision {
        ImportDecision::Replace => Ok(ImportResolution::Resolved(ResolvedImport {
            final_path: conflict_path.to_path_buf(),
            action: ImportAction::Replace,
        })),
        ImportDecision::KeepBoth => {
            let dir = conflict_path.parent().unwrap_or_else(|| Path::new(""));
            let name = conflict_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let final_path = next_free_path(dir, &name, exists)?;
            Ok(ImportResolution::Resolved(ResolvedImport {
                final_path,
                action: ImportAction::Copy,
            }))
        }
        ImportDecision::Cancel => Ok(ImportResolution::Cancelled),
    }
}

/// Decides where an imported file goes. `decide` is called at most once,
/// and only when the candidate path is taken.
pub fn resolve_import_path<E, D>(
    candidate: &str,
    target_dir: &Path,
    mut exists: E,
    decide: D,
) -> Result<ImportResolution, ImportError>
where
    E: FnMut(&Path) -> io::Result<bool>,
    D: FnOnce(&Path) -> ImportDecision,
{
    match detect_collision(candidate, target_dir, &mut exists)? {
        Collision::Free(final_path) => Ok(ImportResolution::Resolved(ResolvedImport {
            final_path,
            action: ImportAction::Copy,
        })),
        Collision::Conflict(path) => {
            let decision = decide(&path);
            info!("Import of '{}' collided, user chose {:?}.", path.display(), decision);
            apply_decision(&path, decision, exists)
        }
    }
}

/// An import waiting for the collision check (and possibly the user).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingImport {
    pub source: PathBuf,
    pub collision: Collision,
}

/// Creates the target directory and probes the candidate path.
pub fn prepare_import<F>(source: &Path, target_dir: &Path, fs: &F) -> Result<PendingImport, ImportError>
where
    F: FileSystem + ?Sized,
{
    fs.mkdir(target_dir)
        .map_err(|e| ImportError::fs("mkdir", target_dir, e))?;
    let candidate = candidate_name(source);
    let collision = detect_collision(&candidate, target_dir, |p| fs.exists(p))?;
    Ok(PendingImport {
        source: source.to_path_buf(),
        collision,
    })
}

/// Performs the file operations of a resolved import. Returns the final path.
pub fn perform_copy<F>(source: &Path, resolved: &ResolvedImport, fs: &F) -> Result<PathBuf, ImportError>
where
    F: FileSystem + ?Sized,
{
    let dst = &resolved.final_path;
    if resolved.action == ImportAction::Replace {
        fs.unlink(dst).map_err(|e| ImportError::fs("unlink", dst, e))?;
    }
    if let Err(e) = fs.copy_file(source, dst) {
        discard_file(dst, fs);
        return Err(ImportError::fs("copy", dst, e));
    }
    info!("Copied '{}' to '{}'.", source.display(), dst.display());
    Ok(dst.clone())
}

/// Best-effort removal of a file an aborted import left behind.
pub fn discard_file<F>(path: &Path, fs: &F)
where
    F: FileSystem + ?Sized,
{
    match fs.unlink(path) {
        Ok(()) => debug!("Removed leftover '{}'.", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove leftover '{}': {}", path.display(), e),
    }
}

/// Registers a copied file with the store. The copy is removed again if that fails.
pub fn register_copied<F, R>(path: &Path, fs: &F, store: &mut R) -> Result<Model, ImportError>
where
    F: FileSystem + ?Sized,
    R: ModelRepository + ?Sized,
{
    store.add_local_model(path).map_err(|e| {
        discard_file(path, fs);
        ImportError::from(e)
    })
}

/// The whole import: pick -> resolve -> copy -> register.
pub fn import_local_model<F, R, D>(
    picked: Option<&Path>,
    target_dir: &Path,
    fs: &F,
    store: &mut R,
    decide: D,
) -> Result<ImportOutcome, ImportError>
where
    F: FileSystem + ?Sized,
    R: ModelRepository + ?Sized,
    D: FnOnce(&Path) -> ImportDecision,
{
    let Some(source) = picked else {
        debug!("No file picked, nothing to import.");
        return Ok(ImportOutcome::NothingPicked);
    };
    let pending = prepare_import(source, target_dir, fs)?;
    let resolution = match pending.collision {
        Collision::Free(final_path) => ImportResolution::Resolved(ResolvedImport {
            final_path,
            action: ImportAction::Copy,
        }),
        Collision::Conflict(path) => apply_decision(&path, decide(&path), |p| fs.exists(p))?,
    };
    let resolved = match resolution {
        ImportResolution::Resolved(resolved) => resolved,
        ImportResolution::Cancelled => {
            info!("Import of '{}' cancelled by user.", source.display());
            return Ok(ImportOutcome::Cancelled);
        }
    };
    let final_path = perform_copy(source, &resolved, fs)?;
    let model = register_copied(&final_path, fs, store)?;
    Ok(ImportOutcome::Imported(model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::store::LocalModelStore;
    use std::{cell::RefCell, collections::HashSet};
    use tempfile::TempDir;

    /// In-memory file system that records every mutating call.
    #[derive(Default)]
    struct FakeFs {
        files: RefCell<HashSet<PathBuf>>,
        ops: RefCell<Vec<String>>,
        fail_exists: bool,
        fail_copy: bool,
    }

    impl FakeFs {
        fn with_files(files: &[&str]) -> Self {
            Self {
                files: RefCell::new(files.iter().map(PathBuf::from).collect()),
                ..Self::default()
            }
        }
    }

    impl FileSystem for FakeFs {
        fn exists(&self, path: &Path) -> io::Result<bool> {
            if self.fail_exists {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
            }
            Ok(self.files.borrow().contains(path))
        }

        fn mkdir(&self, path: &Path) -> io::Result<()> {
            self.ops.borrow_mut().push(format!("mkdir {}", path.display()));
            Ok(())
        }

        fn copy_file(&self, src: &Path, dst: &Path) -> io::Result<()> {
            self.ops
                .borrow_mut()
                .push(format!("copy {} {}", src.display(), dst.display()));
            self.files.borrow_mut().insert(dst.to_path_buf());
            if self.fail_copy {
                return Err(io::Error::new(io::ErrorKind::Other, "No space left on device"));
            }
            Ok(())
        }

        fn unlink(&self, path: &Path) -> io::Result<()> {
            self.ops.borrow_mut().push(format!("unlink {}", path.display()));
            self.files.borrow_mut().remove(path);
            Ok(())
        }
    }

    fn exists_in<'a>(fs: &'a FakeFs) -> impl FnMut(&Path) -> io::Result<bool> + 'a {
        move |p| fs.exists(p)
    }

    #[test]
    fn free_path_resolves_without_prompt() {
        let fs = FakeFs::default();
        let mut prompts = 0;
        let resolution = resolve_import_path("foo.gguf", Path::new("/m"), exists_in(&fs), |_| {
            prompts += 1;
            ImportDecision::Cancel
        })
        .unwrap();
        assert_eq!(prompts, 0);
        assert_eq!(
            resolution,
            ImportResolution::Resolved(ResolvedImport {
                final_path: PathBuf::from("/m/foo.gguf"),
                action: ImportAction::Copy,
            })
        );
    }

    #[test]
    fn keep_both_skips_taken_suffixes() {
        let fs = FakeFs::with_files(&["/m/foo.gguf", "/m/foo_1.gguf"]);
        let resolution =
            resolve_import_path("foo.gguf", Path::new("/m"), exists_in(&fs), |_| ImportDecision::KeepBoth).unwrap();
        assert_eq!(
            resolution,
            ImportResolution::Resolved(ResolvedImport {
                final_path: PathBuf::from("/m/foo_2.gguf"),
                action: ImportAction::Copy,
            })
        );
    }

    #[test]
    fn keep_both_without_extension_has_no_trailing_dot() {
        let fs = FakeFs::with_files(&["/m/weights"]);
        let resolution =
            resolve_import_path("weights", Path::new("/m"), exists_in(&fs), |_| ImportDecision::KeepBoth).unwrap();
        match resolution {
            ImportResolution::Resolved(r) => assert_eq!(r.final_path, PathBuf::from("/m/weights_1")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn keep_both_splits_at_last_dot() {
        assert_eq!(split_name("model.Q4_K_M.gguf"), ("model.Q4_K_M", Some("gguf")));
        assert_eq!(split_name(".hidden"), (".hidden", None));
        assert_eq!(split_name("trailing."), ("trailing.", None));
        assert_eq!(suffixed_name("model.Q4_K_M", Some("gguf"), 3), "model.Q4_K_M_3.gguf");
    }

    #[test]
    fn replace_keeps_path_and_asks_once() {
        let fs = FakeFs::with_files(&["/m/foo.gguf"]);
        let mut prompts = 0;
        let resolution = resolve_import_path("foo.gguf", Path::new("/m"), exists_in(&fs), |p| {
            prompts += 1;
            assert_eq!(p, Path::new("/m/foo.gguf"));
            ImportDecision::Replace
        })
        .unwrap();
        assert_eq!(prompts, 1);
        assert_eq!(
            resolution,
            ImportResolution::Resolved(ResolvedImport {
                final_path: PathBuf::from("/m/foo.gguf"),
                action: ImportAction::Replace,
            })
        );
    }

    #[test]
    fn replace_unlinks_then_copies_exactly_once() {
        let fs = FakeFs::with_files(&["/m/foo.gguf"]);
        let resolved = ResolvedImport {
            final_path: PathBuf::from("/m/foo.gguf"),
            action: ImportAction::Replace,
        };
        perform_copy(Path::new("/picked/foo.gguf"), &resolved, &fs).unwrap();
        assert_eq!(
            *fs.ops.borrow(),
            vec![
                "unlink /m/foo.gguf".to_string(),
                "copy /picked/foo.gguf /m/foo.gguf".to_string(),
            ]
        );
    }

    #[test]
    fn cancel_resolves_to_cancelled() {
        let fs = FakeFs::with_files(&["/m/foo.gguf"]);
        let resolution =
            resolve_import_path("foo.gguf", Path::new("/m"), exists_in(&fs), |_| ImportDecision::Cancel).unwrap();
        assert_eq!(resolution, ImportResolution::Cancelled);
        assert!(fs.ops.borrow().is_empty());
    }

    #[test]
    fn exists_errors_propagate() {
        let fs = FakeFs {
            fail_exists: true,
            ..FakeFs::default()
        };
        let err = resolve_import_path("foo.gguf", Path::new("/m"), exists_in(&fs), |_| ImportDecision::KeepBoth)
            .unwrap_err();
        assert!(matches!(err, ImportError::FileSystem { operation: "exists", .. }));
    }

    #[test]
    fn keep_both_gives_up_after_ceiling() {
        let err = next_free_path(Path::new("/m"), "foo.gguf", |_| Ok(true)).unwrap_err();
        assert!(matches!(
            err,
            ImportError::SuffixesExhausted { probes: MAX_KEEP_BOTH_PROBES, .. }
        ));
    }

    #[test]
    fn candidate_name_falls_back_to_generated_id() {
        assert_eq!(candidate_name(Path::new("/tmp/foo.gguf")), "foo.gguf");
        let generated = candidate_name(Path::new("/"));
        assert!(generated.starts_with("file_"));
        assert!(generated.len() > "file_".len());
    }

    #[test]
    fn nothing_picked_is_a_no_op() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = LocalModelStore::open(dir.path()).expect("store");
        let fs = FakeFs::default();
        let outcome = import_local_model(None, Path::new("/m"), &fs, &mut store, |_| ImportDecision::Replace).unwrap();
        assert_eq!(outcome, ImportOutcome::NothingPicked);
        assert!(fs.ops.borrow().is_empty());
    }

    #[test]
    fn failed_copy_removes_partial_destination() {
        let fs = FakeFs {
            fail_copy: true,
            ..FakeFs::default()
        };
        let resolved = ResolvedImport {
            final_path: PathBuf::from("/m/foo.gguf"),
            action: ImportAction::Copy,
        };
        let err = perform_copy(Path::new("/picked/foo.gguf"), &resolved, &fs).unwrap_err();
        assert!(matches!(err, ImportError::FileSystem { operation: "copy", .. }));
        assert!(!fs.files.borrow().contains(Path::new("/m/foo.gguf")));
    }

    #[test]
    fn replace_through_import_runs_mkdir_unlink_copy_once() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = LocalModelStore::open(dir.path()).expect("store");
        let fs = FakeFs::with_files(&["/m/foo.gguf"]);
        let mut prompts = 0;
        // The fake copy never touches the real disk, so registering fails afterwards.
        let result = import_local_model(Some(Path::new("/picked/foo.gguf")), Path::new("/m"), &fs, &mut store, |_| {
            prompts += 1;
            ImportDecision::Replace
        });
        assert!(matches!(result, Err(ImportError::Store(_))));
        assert_eq!(prompts, 1);
        assert_eq!(
            fs.ops.borrow()[..3],
            [
                "mkdir /m".to_string(),
                "unlink /m/foo.gguf".to_string(),
                "copy /picked/foo.gguf /m/foo.gguf".to_string(),
            ]
        );
        assert_eq!(fs.ops.borrow().iter().filter(|op| op.starts_with("copy")).count(), 1);
    }

    #[test]
    fn failed_registration_removes_the_copy() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = LocalModelStore::open(dir.path()).expect("store");
        let before = store.models().len();
        let fs = FakeFs::default();
        let result = import_local_model(Some(Path::new("/picked/foo.gguf")), Path::new("/m"), &fs, &mut store, |_| {
            panic!("no collision expected")
        });
        assert!(matches!(result, Err(ImportError::Store(_))));
        assert!(!fs.files.borrow().contains(Path::new("/m/foo.gguf")));
        assert_eq!(fs.ops.borrow().last().map(String::as_str), Some("unlink /m/foo.gguf"));
        assert_eq!(store.models().len(), before);
    }

    #[test]
    fn exists_failure_during_import_touches_nothing() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = LocalModelStore::open(dir.path()).expect("store");
        let before = store.models().to_vec();
        let fs = FakeFs {
            fail_exists: true,
            ..FakeFs::default()
        };
        let err = import_local_model(Some(Path::new("/picked/foo.gguf")), Path::new("/m"), &fs, &mut store, |_| {
            ImportDecision::Replace
        })
        .unwrap_err();
        assert!(matches!(err, ImportError::FileSystem { operation: "exists", .. }));
        assert!(fs
            .ops
            .borrow()
            .iter()
            .all(|op| !op.starts_with("copy") && !op.starts_with("unlink")));
        assert_eq!(store.models(), &before[..]);
    }

    #[test]
    fn end_to_end_import_on_disk() {
        let dir = TempDir::new().expect("tempdir");
        let source_dir = dir.path().join("downloads");
        fs::create_dir_all(&source_dir).unwrap();
        let source = source_dir.join("tiny.gguf");
        fs::write(&source, b"GGUF0000").unwrap();

        let mut store = LocalModelStore::open(dir.path()).expect("store");
        let target = store.local_models_dir();

        let first = import_local_model(Some(&source), &target, &StdFileSystem, &mut store, |_| {
            panic!("no collision expected")
        })
        .unwrap();
        match first {
            ImportOutcome::Imported(model) => {
                assert_eq!(model.id, "tiny.gguf");
                assert_eq!(model.size, 8);
            }
            other => panic!("unexpected {:?}", other),
        }

        let second =
            import_local_model(Some(&source), &target, &StdFileSystem, &mut store, |_| ImportDecision::KeepBoth)
                .unwrap();
        assert!(matches!(second, ImportOutcome::Imported(ref m) if m.id == "tiny_1.gguf"));
        assert!(target.join("tiny_1.gguf").exists());

        let cancelled =
            import_local_model(Some(&source), &target, &StdFileSystem, &mut store, |_| ImportDecision::Cancel)
                .unwrap();
        assert_eq!(cancelled, ImportOutcome::Cancelled);
        assert!(!target.join("tiny_2.gguf").exists());

        let local_count = store.models().iter().filter(|m| m.is_local_file()).count();
        assert_eq!(local_count, 2);
    }
}
