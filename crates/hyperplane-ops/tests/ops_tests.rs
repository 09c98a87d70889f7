use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, TimeZone};
use hyperplane_ops::{
    EventBus, FileHandle, FsEvent, HyperplaneConfig, NameIssue, NameValidator, OperationResult,
    OperationType, OpsError, PathResolver, TransferEngine, TrashIndex, ValidationMessage,
};
use tempfile::TempDir;

/// A home root and a private trash inside a temp dir.
struct Fixture {
    _dir: TempDir,
    config: HyperplaneConfig,
    bus: EventBus,
    engine: TransferEngine,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = HyperplaneConfig::new(dir.path().join("home"));
        config.data_home = Some(dir.path().join("share"));
        fs::create_dir_all(&config.home).unwrap();
        fs::create_dir_all(config.trash_files_dir()).unwrap();
        fs::create_dir_all(config.trash_info_dir()).unwrap();

        let bus = EventBus::new();
        let engine = TransferEngine::new(&config, Arc::new(bus.clone()));

        Self {
            _dir: dir,
            config,
            bus,
            engine,
        }
    }

    fn home(&self) -> &Path {
        &self.config.home
    }

    /// Put an entry into the trash the way a desktop would.
    fn trash(
        &self,
        name: impl AsRef<OsStr>,
        original: &Path,
        deleted_at: i64,
        contents: &str,
    ) -> PathBuf {
        let name = name.as_ref();
        let storage = self.config.trash_files_dir().join(name);
        fs::write(&storage, contents).unwrap();

        fs::write(
            TrashIndex::new(&self.config).info_path(name),
            trashinfo(original, Some(deleted_at)),
        )
        .unwrap();

        storage
    }
}

/// A `.trashinfo` record with a percent-encoded path and local deletion time.
fn trashinfo(original: &Path, deleted_at: Option<i64>) -> String {
    let path: Vec<String> = original
        .as_os_str()
        .as_encoded_bytes()
        .split(|byte| *byte == b'/')
        .map(|segment| urlencoding::encode_binary(segment).into_owned())
        .collect();

    let mut text = format!("[Trash Info]\nPath={}\n", path.join("/"));
    if let Some(t) = deleted_at {
        let date = Local.timestamp_opt(t, 0).unwrap().naive_local();
        text.push_str(&format!("DeletionDate={}\n", date.format("%Y-%m-%dT%H:%M:%S")));
    }
    text
}

const DELETED_AT: i64 = 1_700_000_000;

#[tokio::test]
async fn test_copy_onto_existing_fails_before_io() {
    let fx = Fixture::new();
    let src = fx.home().join("src.txt");
    let dst = fx.home().join("dst.txt");
    fs::write(&src, "new").unwrap();
    fs::write(&dst, "old").unwrap();

    let err = fx.engine.copy(&src, &dst, false).unwrap_err();
    assert!(matches!(err, OpsError::AlreadyExists { .. }));

    let err = fx.engine.move_to(&src, &dst, false).unwrap_err();
    assert!(err.is_already_exists());

    assert_eq!(fs::read_to_string(&dst).unwrap(), "old");
    assert_eq!(fs::read_to_string(&src).unwrap(), "new");
}

#[tokio::test]
async fn test_copy_file() {
    let fx = Fixture::new();
    let src = fx.home().join("a.txt");
    fs::write(&src, "hello").unwrap();
    let dst = fx.home().join("b.txt");

    let complete = fx.engine.copy(&src, &dst, false).unwrap().wait().await.unwrap();

    assert_eq!(complete.operation_type, OperationType::Copy);
    assert_eq!(complete.bytes_processed, 5);
    assert_eq!(fs::read_to_string(&dst).unwrap(), "hello");
    assert!(src.exists());
}

#[tokio::test]
async fn test_copy_directory_reports_progress() {
    let fx = Fixture::new();
    let src = fx.home().join("project");
    fs::create_dir_all(src.join("docs")).unwrap();
    fs::write(src.join("readme"), "r").unwrap();
    fs::write(src.join("docs/guide"), "gg").unwrap();
    let dst = fx.home().join("project (copy)");

    let mut pending = fx.engine.copy(&src, &dst, false).unwrap();

    let mut saw_progress = false;
    let mut complete = None;
    while let Some(message) = pending.recv().await {
        match message {
            OperationResult::Progress(progress) => {
                saw_progress = true;
                assert_eq!(progress.files_total, 2);
            }
            OperationResult::Complete(result) => complete = Some(result.unwrap()),
        }
    }

    assert!(saw_progress);
    assert_eq!(complete.unwrap().bytes_processed, 3);
    assert_eq!(fs::read_to_string(dst.join("docs/guide")).unwrap(), "gg");
}

#[tokio::test]
async fn test_copy_creates_ancestors_and_announces_tag() {
    let fx = Fixture::new();
    let mut events = fx.bus.subscribe();
    let src = fx.home().join("a.txt");
    fs::write(&src, "a").unwrap();
    let dst = fx.home().join("work/urgent/a.txt");

    let pending = fx.engine.copy(&src, &dst, true).unwrap();
    // Ancestors exist before the background work runs.
    assert!(fx.home().join("work/urgent").is_dir());
    pending.wait().await.unwrap();

    match events.recv().await.unwrap() {
        FsEvent::TagLocationCreated { tags, location } => {
            assert_eq!(tags.to_string(), "//work//urgent//");
            assert_eq!(location, fx.home().join("work/urgent"));
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn test_no_tag_event_when_parent_exists() {
    let fx = Fixture::new();
    let mut events = fx.bus.subscribe();
    fs::create_dir_all(fx.home().join("work")).unwrap();
    let src = fx.home().join("a.txt");
    fs::write(&src, "a").unwrap();

    fx.engine
        .copy(&src, fx.home().join("work/a.txt"), true)
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_missing_source_fails_through_completion() {
    let fx = Fixture::new();
    let pending = fx
        .engine
        .copy(fx.home().join("ghost"), fx.home().join("copy"), false)
        .unwrap();

    assert!(pending.wait().await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_move_directory() {
    let fx = Fixture::new();
    let src = fx.home().join("from");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("x"), "x").unwrap();
    let dst = fx.home().join("nested/to");

    let complete = fx.engine.move_to(&src, &dst, false).unwrap().wait().await.unwrap();

    assert_eq!(complete.destination.as_deref(), Some(dst.as_path()));
    assert!(!src.exists());
    assert_eq!(fs::read_to_string(dst.join("x")).unwrap(), "x");
}

#[tokio::test]
async fn test_move_announces_tag_location() {
    let fx = Fixture::new();
    let mut events = fx.bus.subscribe();
    let src = fx.home().join("a.txt");
    fs::write(&src, "a").unwrap();
    let dst = fx.home().join("work/a.txt");

    fx.engine.move_to(&src, &dst, true).unwrap().wait().await.unwrap();

    assert!(!src.exists());
    assert_eq!(fs::read_to_string(&dst).unwrap(), "a");
    match events.recv().await.unwrap() {
        FsEvent::TagLocationCreated { tags, location } => {
            assert_eq!(tags.to_string(), "//work//");
            assert_eq!(location, fx.home().join("work"));
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn test_transfer_into_own_subtree_is_refused() {
    let fx = Fixture::new();
    let src = fx.home().join("a");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("f.txt"), "f").unwrap();

    let err = fx.engine.copy(&src, src.join("a"), false).unwrap_err();
    assert!(matches!(err, OpsError::DestinationInsideSource { .. }));

    let err = fx.engine.move_to(&src, src.join("deeper/a"), true).unwrap_err();
    assert!(matches!(err, OpsError::DestinationInsideSource { .. }));

    // Nothing was created, the source is untouched.
    assert!(!src.join("a").exists());
    assert!(!src.join("deeper").exists());
    assert_eq!(fs::read_to_string(src.join("f.txt")).unwrap(), "f");

    // A sibling sharing the name prefix is not inside.
    fx.engine
        .move_to(&src, fx.home().join("a2"), false)
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert_eq!(fs::read_to_string(fx.home().join("a2/f.txt")).unwrap(), "f");
}

#[tokio::test]
async fn test_delete_file_and_directory() {
    let fx = Fixture::new();
    let file = fx.home().join("f");
    let tree = fx.home().join("t");
    fs::write(&file, "f").unwrap();
    fs::create_dir_all(tree.join("deep/er")).unwrap();
    fs::write(tree.join("deep/er/leaf"), "leaf").unwrap();

    fx.engine.delete(&file).wait().await.unwrap();
    let complete = fx.engine.delete(&tree).wait().await.unwrap();

    assert_eq!(complete.bytes_processed, 4);
    assert!(!file.exists());
    assert!(!tree.exists());
    assert!(fx.engine.delete(&tree).wait().await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_restore_round_trip() {
    let fx = Fixture::new();
    let original = fx.home().join("docs/report.txt");
    let storage = fx.trash("report.txt", &original, DELETED_AT, "content");
    let index = TrashIndex::new(&fx.config);

    let complete = fx
        .engine
        .restore(&original, DELETED_AT)
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert!(!complete.skipped);
    assert_eq!(fs::read_to_string(&original).unwrap(), "content");
    assert!(!storage.exists());
    assert!(!index.info_path("report.txt").exists());
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_restore_non_utf8_name() {
    use std::os::unix::ffi::OsStrExt;

    let fx = Fixture::new();
    let name = OsStr::from_bytes(b"caf\xe9.txt");
    let original = fx.home().join(name);
    let storage = fx.trash(name, &original, DELETED_AT, "latin-1");
    let index = TrashIndex::new(&fx.config);

    let record = index.lookup(&original, DELETED_AT).unwrap();
    assert_eq!(record.storage_path, storage);
    assert_eq!(index.records().unwrap(), vec![record]);

    fx.engine
        .restore(&original, DELETED_AT)
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_eq!(fs::read_to_string(&original).unwrap(), "latin-1");
    assert!(!storage.exists());
    assert!(!index.info_path(name).exists());
}

#[tokio::test]
async fn test_restore_onto_occupied_path_is_a_no_op() {
    let fx = Fixture::new();
    let original = fx.home().join("report.txt");
    fs::write(&original, "newer").unwrap();
    let storage = fx.trash("report.txt", &original, DELETED_AT, "older");
    let index = TrashIndex::new(&fx.config);

    let complete = fx
        .engine
        .restore(&original, DELETED_AT)
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert!(complete.skipped);
    assert_eq!(fs::read_to_string(&original).unwrap(), "newer");
    assert!(storage.exists());
    assert!(index.info_path("report.txt").exists());
}

#[tokio::test]
async fn test_restore_unknown_record() {
    let fx = Fixture::new();
    let original = fx.home().join("report.txt");
    fx.trash("report.txt", &original, DELETED_AT, "x");

    let err = fx.engine.restore(&original, DELETED_AT + 1).unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_restore_by_handle() {
    let fx = Fixture::new();
    let original = fx.home().join("photo.png");
    fx.trash("photo.png", &original, DELETED_AT, "png");

    let handle = FileHandle::for_trash_entry("photo.png");
    fx.engine.restore_handle(handle).wait().await.unwrap();

    assert_eq!(fs::read_to_string(&original).unwrap(), "png");
    assert!(TrashIndex::new(&fx.config).records().unwrap().is_empty());
}

#[tokio::test]
async fn test_restore_by_unknown_handle() {
    let fx = Fixture::new();
    let pending = fx.engine.restore_handle(FileHandle::for_trash_entry("nothing"));
    assert!(pending.wait().await.unwrap_err().is_not_found());

    let pending = fx.engine.restore_handle(FileHandle::for_path("/not/trash"));
    assert!(pending.wait().await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_purge_trashed_entry() {
    let fx = Fixture::new();
    let original = fx.home().join("junk");
    let storage = fx.trash("junk", &original, DELETED_AT, "junk");
    let index = TrashIndex::new(&fx.config);

    fx.engine
        .purge(FileHandle::for_trash_entry("junk"))
        .wait()
        .await
        .unwrap();

    assert!(!storage.exists());
    assert!(!index.info_path("junk").exists());
    assert!(!original.exists());
}

#[test]
fn test_lookup_requires_exact_timestamp() {
    let fx_dir = TempDir::new().unwrap();
    let mut config = HyperplaneConfig::new(fx_dir.path().join("home"));
    config.data_home = Some(fx_dir.path().join("share"));
    fs::create_dir_all(config.trash_files_dir()).unwrap();
    fs::create_dir_all(config.trash_info_dir()).unwrap();
    let index = TrashIndex::new(&config);

    let original = config.home.join("a.txt");
    for (name, t) in [("a.txt", DELETED_AT), ("a.2.txt", DELETED_AT + 60)] {
        fs::write(index.files_dir().join(name), name).unwrap();
        fs::write(index.info_path(name), trashinfo(&original, Some(t))).unwrap();
    }

    let record = index.lookup(&original, DELETED_AT + 60).unwrap();
    assert_eq!(record.storage_path, index.files_dir().join("a.2.txt"));
    assert_eq!(record.deleted_at, DELETED_AT + 60);

    assert!(index.lookup(&original, DELETED_AT + 30).unwrap_err().is_not_found());
    assert!(index
        .lookup(&config.home.join("b.txt"), DELETED_AT)
        .unwrap_err()
        .is_not_found());
}

#[test]
fn test_remove_record_checks_original_path() {
    let dir = TempDir::new().unwrap();
    let mut config = HyperplaneConfig::new(dir.path().join("home"));
    config.data_home = Some(dir.path().join("share"));
    fs::create_dir_all(config.trash_info_dir()).unwrap();
    let index = TrashIndex::new(&config);

    fs::write(
        index.info_path("with space.txt"),
        trashinfo(Path::new("/home/user/with space.txt"), None),
    )
    .unwrap();
    let storage = index.files_dir().join("with space.txt");

    index.remove_record(&storage, Path::new("/home/user/other.txt"));
    assert!(index.info_path("with space.txt").exists());

    index.remove_record(&storage, Path::new("/home/user/with space.txt"));
    assert!(!index.info_path("with space.txt").exists());

    // Missing records are not an error.
    index.remove_record(&storage, Path::new("/home/user/with space.txt"));
}

#[test]
fn test_validator_through_handles() {
    let dir = TempDir::new().unwrap();
    let config = HyperplaneConfig::new(dir.path());
    let validator = NameValidator::new(PathResolver::new(&config));
    fs::create_dir(dir.path().join("existing")).unwrap();

    let parent = FileHandle::for_path(dir.path());
    assert!(!validator.validate(&parent, ".", false).is_valid);
    assert!(!validator.validate(&parent, "a/b", false).is_valid);
    assert_eq!(
        validator.validate(&parent, "existing", false).issue,
        Some(NameIssue::FolderExists)
    );

    let sibling = FileHandle::for_path(dir.path().join("existing"));
    let result = validator.validate(&sibling, ".hidden", true);
    assert!(result.is_valid);
    assert!(matches!(result.message, Some(ValidationMessage::Warning(_))));

    let remote = FileHandle::for_uri("sftp://host/share").unwrap();
    let result = validator.validate(&remote, "fine", false);
    assert!(!result.is_valid);
    assert_eq!(result.issue, Some(NameIssue::NotWritable));
}
