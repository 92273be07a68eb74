//! Integration tests for rotcheck
//!
//! Every test builds its own fixture tree in a temporary directory and runs
//! full passes through the engine.

use rotcheck::content::compute_md5_bytes;
use rotcheck::error::{ManifestError, SetupError};
use rotcheck::{
    ChecksumEngine, DirState, DirectoryManifest, EngineConfig, Mode, RotError, RunResult,
    MANIFEST_FILE_NAME,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn engine(root: &Path, workers: usize) -> ChecksumEngine {
    ChecksumEngine::new(EngineConfig::new(root).workers(workers).quiet(true)).unwrap()
}

fn write(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Write a manifest by hand, as an earlier run would have
fn write_manifest(dir: &Path, files: &[(&str, &str)]) {
    let files: serde_json::Map<String, serde_json::Value> = files
        .iter()
        .map(|(name, sum)| (name.to_string(), serde_json::Value::from(*sum)))
        .collect();
    let doc = serde_json::json!({ "created": 1_600_000_000, "updated": 1_600_000_000, "files": files });
    fs::write(dir.join(MANIFEST_FILE_NAME), doc.to_string()).unwrap();
}

fn totals(result: &RunResult) -> (usize, u64, u64, u64, u64) {
    (
        result.total_dirs,
        result.verified,
        result.new,
        result.updated,
        result.failed,
    )
}

fn relative(root: &Path, files: &[PathBuf]) -> Vec<PathBuf> {
    files
        .iter()
        .map(|f| f.strip_prefix(root).unwrap().to_path_buf())
        .collect()
}

#[test]
fn test_empty_tree() {
    let dir = tempdir().unwrap();
    let mut engine = engine(dir.path(), 4);

    let verify = engine.verify().unwrap();
    assert_eq!(totals(&verify), (1, 0, 0, 0, 0));
    assert!(verify.success());
    assert!(verify.is_clean());

    let update = engine.update().unwrap();
    assert_eq!(totals(&update), (1, 0, 0, 0, 0));
    assert!(update.is_clean());
    assert_eq!(update.count_state(DirState::Unchanged), 1);
    assert!(!dir.path().join(MANIFEST_FILE_NAME).exists());
}

#[test]
fn test_update_is_idempotent() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"a");
    write(&dir.path().join("sub/b.txt"), b"b");
    write(&dir.path().join("sub/deeper/c.txt"), b"c");

    let first = engine(dir.path(), 2).update().unwrap();
    assert_eq!(first.new, 3);
    assert!(first.success());
    assert!(!first.is_clean());

    let second = engine(dir.path(), 2).update().unwrap();
    assert_eq!(second.new, 0);
    assert_eq!(second.updated, 0);
    assert_eq!(second.verified, 3);
    assert!(second.is_clean());
}

#[test]
fn test_unchanged_update_keeps_manifest_bytes() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"a");

    engine(dir.path(), 1).update().unwrap();
    let before = fs::read(dir.path().join(MANIFEST_FILE_NAME)).unwrap();

    engine(dir.path(), 1).update().unwrap();
    let after = fs::read(dir.path().join(MANIFEST_FILE_NAME)).unwrap();

    assert_eq!(before, after);
}

#[test]
fn test_detection_of_changed_content() {
    let dir = tempdir().unwrap();
    let c1 = compute_md5_bytes(b"original");
    write(&dir.path().join("a.txt"), b"rotted");
    write_manifest(dir.path(), &[("a.txt", &c1)]);

    let mut engine = engine(dir.path(), 2);
    let root = engine.root().to_path_buf();

    let verify = engine.verify().unwrap();
    assert_eq!(verify.failed, 1);
    assert_eq!(verify.failed_files, vec![root.join("a.txt")]);
    assert!(!verify.success());
    assert_eq!(verify.count_state(DirState::Mismatched), 1);

    // Verify never writes
    let on_disk = DirectoryManifest::load(&root).unwrap();
    assert_eq!(on_disk.checksum("a.txt"), Some(c1.as_str()));

    let update = engine.update().unwrap();
    assert_eq!(update.updated, 1);
    assert_eq!(update.updated_files, vec![root.join("a.txt")]);
    assert_eq!(update.count_state(DirState::Updated), 1);

    let c2 = compute_md5_bytes(b"rotted");
    let on_disk = DirectoryManifest::load(&root).unwrap();
    assert_eq!(on_disk.checksum("a.txt"), Some(c2.as_str()));
    assert_eq!(on_disk.created(), 1_600_000_000);
    assert!(on_disk.updated() > 1_600_000_000);
}

#[test]
fn test_new_file_discovery() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("old.txt"), b"old");
    engine(dir.path(), 1).update().unwrap();

    write(&dir.path().join("fresh.txt"), b"fresh");

    let mut engine = engine(dir.path(), 1);
    let root = engine.root().to_path_buf();

    let verify = engine.verify().unwrap();
    assert_eq!((verify.verified, verify.failed), (1, 0));
    assert!(verify.is_clean());

    let add = engine.add().unwrap();
    assert_eq!(add.new, 1);
    assert_eq!(add.new_files, vec![root.join("fresh.txt")]);

    let verify = engine.verify().unwrap();
    assert_eq!((verify.verified, verify.failed), (2, 0));
}

#[test]
fn test_add_only_keeps_existing_entries() {
    let dir = tempdir().unwrap();
    let stale = compute_md5_bytes(b"before");
    write(&dir.path().join("a.txt"), b"after");
    write(&dir.path().join("b.txt"), b"b");
    write_manifest(dir.path(), &[("a.txt", &stale)]);

    let mut engine = engine(dir.path(), 2);
    let add = engine.add().unwrap();
    assert_eq!((add.new, add.updated, add.verified), (1, 0, 0));

    let on_disk = DirectoryManifest::load(engine.root()).unwrap();
    assert_eq!(on_disk.checksum("a.txt"), Some(stale.as_str()));
    assert!(on_disk.checksum("b.txt").is_some());

    // The mismatch is still reported afterwards
    assert_eq!(engine.verify().unwrap().failed, 1);
}

#[test]
fn test_hidden_entries_are_excluded() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("visible.txt"), b"v");
    write(&dir.path().join(".dotfile"), b"d");
    write(&dir.path().join(".git/config"), b"c");
    write(&dir.path().join(".git/objects/ab"), b"o");
    write(&dir.path().join(".hidden/visible/f.txt"), b"f");
    write(&dir.path().join("docs/readme.md"), b"r");

    let mut engine = engine(dir.path(), 3);
    let root = engine.root().to_path_buf();

    let dirs: Vec<_> = engine.directories().map(Path::to_path_buf).collect();
    assert_eq!(
        dirs,
        vec![
            root.clone(),
            root.join(".git/objects"),
            root.join(".hidden/visible"),
            root.join("docs"),
        ]
    );

    let update = engine.update().unwrap();
    assert_eq!(update.new, 4);
    assert_eq!(
        relative(&root, &update.new_files),
        vec![
            PathBuf::from(".git/objects/ab"),
            PathBuf::from(".hidden/visible/f.txt"),
            PathBuf::from("docs/readme.md"),
            PathBuf::from("visible.txt"),
        ]
    );

    let manifest = DirectoryManifest::load(&root).unwrap();
    let names: Vec<_> = manifest.files().keys().cloned().collect();
    assert_eq!(names, vec!["visible.txt".to_string()]);

    // Hidden directories never get a manifest of their own
    assert!(!root.join(".git").join(MANIFEST_FILE_NAME).exists());
    assert!(!root.join(".hidden").join(MANIFEST_FILE_NAME).exists());
    assert!(root.join(".hidden/visible").join(MANIFEST_FILE_NAME).is_file());
}

#[test]
fn test_failed_save_is_retried_by_next_update() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("blocked/a.txt"), b"a");
    write(&dir.path().join("open/b.txt"), b"b");

    let mut engine = engine(dir.path(), 2);
    let root = engine.root().to_path_buf();
    let blocked = root.join("blocked");

    // A directory in the scratch file's place makes the save fail
    let blocker = blocked.join(format!("{}.tmp", MANIFEST_FILE_NAME));
    fs::create_dir(&blocker).unwrap();

    let first = engine.update().unwrap();
    assert_eq!(first.total_dirs, 3);
    assert_eq!(first.new, 2);
    assert!(!first.success());
    assert!(!first.is_clean());
    assert_eq!(first.errors.len(), 1);
    assert_eq!(first.errors[0].directory, blocked);
    assert!(matches!(first.errors[0].error, ManifestError::Write { .. }));
    assert_eq!(first.count_state(DirState::Failed), 1);

    // The other directory finished and was saved
    assert!(root.join("open").join(MANIFEST_FILE_NAME).is_file());
    assert!(!blocked.join(MANIFEST_FILE_NAME).exists());

    // Nothing unsaved is treated as recorded
    assert_eq!(engine.manifest(&blocked).unwrap().checksum("a.txt"), None);
    let verify = engine.verify().unwrap();
    assert_eq!((verify.verified, verify.failed), (1, 0));

    fs::remove_dir(&blocker).unwrap();

    let second = engine.update().unwrap();
    assert_eq!(second.new, 1);
    assert_eq!(second.new_files, vec![blocked.join("a.txt")]);
    assert!(second.success());
    assert!(!second.is_clean());

    let on_disk = DirectoryManifest::load(&blocked).unwrap();
    assert_eq!(on_disk.checksum("a.txt"), Some(compute_md5_bytes(b"a").as_str()));
}

#[test]
fn test_manifest_file_format() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"hello");
    engine(dir.path(), 1).update().unwrap();

    let raw = fs::read_to_string(dir.path().join(MANIFEST_FILE_NAME)).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();

    assert!(doc["created"].is_i64());
    assert!(doc["updated"].is_i64());
    assert_eq!(doc["files"]["a.txt"], "5d41402abc4b2a76b9719d911017c592");
    assert!(raw.starts_with(r#"{"created":"#));
}

/// Twelve directories with a mix of unchanged, new, changed and rotted files
fn build_mixed_fixture(root: &Path) {
    for i in 0..12 {
        let dir = root.join(format!("dir{:02}", i));
        write(&dir.join("stable.txt"), format!("stable {}", i).as_bytes());

        let mut recorded = vec![(
            "stable.txt".to_string(),
            compute_md5_bytes(format!("stable {}", i).as_bytes()),
        )];

        match i % 3 {
            0 => write(&dir.join("new.txt"), b"new"),
            1 => {
                write(&dir.join("changed.txt"), b"current");
                recorded.push(("changed.txt".into(), compute_md5_bytes(b"previous")));
            }
            _ => {}
        }

        let entries: Vec<(&str, &str)> = recorded
            .iter()
            .map(|(n, s)| (n.as_str(), s.as_str()))
            .collect();
        write_manifest(&dir, &entries);
    }
}

#[test]
fn test_worker_count_does_not_change_totals() {
    let single = tempdir().unwrap();
    let multi = tempdir().unwrap();
    build_mixed_fixture(single.path());
    build_mixed_fixture(multi.path());

    for mode in [Mode::Verify, Mode::Update, Mode::Verify] {
        let mut one = engine(single.path(), 1);
        let mut many = engine(multi.path(), 5);

        let a = one.run(mode).unwrap();
        let b = many.run(mode).unwrap();

        assert_eq!(totals(&a), totals(&b), "mode {}", mode);
        assert_eq!(
            relative(one.root(), &a.failed_files),
            relative(many.root(), &b.failed_files)
        );
        assert_eq!(
            relative(one.root(), &a.updated_files),
            relative(many.root(), &b.updated_files)
        );
        assert_eq!(
            relative(one.root(), &a.new_files),
            relative(many.root(), &b.new_files)
        );
    }
}

#[test]
fn test_mixed_fixture_outcomes() {
    let dir = tempdir().unwrap();
    build_mixed_fixture(dir.path());

    let mut engine = engine(dir.path(), 4);

    let verify = engine.verify().unwrap();
    // root + 12 directories; 4 of them carry a changed file
    assert_eq!(totals(&verify), (13, 12, 0, 0, 4));
    assert_eq!(verify.count_state(DirState::Mismatched), 4);

    let update = engine.update().unwrap();
    assert_eq!((update.new, update.updated), (4, 4));
    assert_eq!(update.count_state(DirState::Added), 4);
    assert_eq!(update.count_state(DirState::Updated), 4);
    assert_eq!(update.count_state(DirState::Unchanged), 5);

    let verify = engine.verify().unwrap();
    assert_eq!(verify.failed, 0);
    assert_eq!(verify.verified, 20);
}

#[test]
fn test_corrupt_manifest_aborts_setup() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("sub/a.txt"), b"a");
    write(&dir.path().join("sub").join(MANIFEST_FILE_NAME), b"{\"files\": [");

    let err = ChecksumEngine::new(EngineConfig::new(dir.path()).quiet(true))
        .err()
        .unwrap();
    assert!(matches!(err, RotError::Manifest(ManifestError::Parse { .. })));

    // The corrupt manifest is left as it was
    let raw = fs::read(dir.path().join("sub").join(MANIFEST_FILE_NAME)).unwrap();
    assert_eq!(raw, b"{\"files\": [");
}

#[test]
fn test_missing_root() {
    let dir = tempdir().unwrap();
    let err = ChecksumEngine::new(EngineConfig::new(dir.path().join("nope")))
        .err()
        .unwrap();
    assert!(matches!(
        err,
        RotError::Setup(SetupError::RootNotFound { .. })
    ));
}

#[test]
fn test_root_is_a_file() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("file"), b"x");
    let err = ChecksumEngine::new(EngineConfig::new(dir.path().join("file")))
        .err()
        .unwrap();
    assert!(matches!(
        err,
        RotError::Setup(SetupError::NotADirectory { .. })
    ));
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_fails_only_its_directory() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("good/a.txt"), b"a");
    write(&dir.path().join("bad/b.txt"), b"b");
    std::os::unix::fs::symlink(
        dir.path().join("bad/missing-target"),
        dir.path().join("bad/link.txt"),
    )
    .unwrap();
    write_manifest(
        &dir.path().join("bad"),
        &[("link.txt", &compute_md5_bytes(b"gone"))],
    );
    write_manifest(
        &dir.path().join("good"),
        &[("a.txt", &compute_md5_bytes(b"a"))],
    );

    let mut engine = engine(dir.path(), 2);
    let root = engine.root().to_path_buf();

    let verify = engine.verify().unwrap();
    assert_eq!(verify.total_dirs, 3);
    assert_eq!(verify.verified, 1);
    assert_eq!(verify.failed, 0);
    assert!(!verify.success());
    assert!(!verify.is_clean());

    assert_eq!(verify.errors.len(), 1);
    assert_eq!(verify.errors[0].directory, root.join("bad"));
    assert!(matches!(
        verify.errors[0].error,
        ManifestError::Checksum { .. }
    ));
    assert_eq!(verify.count_state(DirState::Failed), 1);

    // The failed directory is still available for the next pass
    assert!(engine.manifest(&root.join("bad")).is_some());
}
