mod common;

use anyhow::Result;
use common::{FIXED_MTIME, TestSite};
use orphanage::engine::{FullScanReport, IndexStats};
use orphanage::hooks::HookEffect;
use orphanage::registry::{ManagedEntity, ManagedRegistry, MemoryRegistry};
use orphanage::storage::{IndexStore, OrphanStore};

#[test]
fn test_scan_with_lists_caps_list_only() -> Result<()> {
    let site = TestSite::with_files(&["a.txt", "b.txt", "c.txt"])?;
    let mut engine = site.engine(MemoryRegistry::default(), "")?;

    let lists = engine.scan_with_lists(1)?;
    assert_eq!(lists.files, 3);
    assert_eq!(lists.orphans, 3);
    assert_eq!(lists.to_manage, vec!["public://a.txt"]);

    // Every orphan is persisted, not just the listed one
    let orphans = OrphanStore::open(site.orphans_path())?;
    assert_eq!(orphans.len(), 3);
    Ok(())
}

#[test]
fn test_counts_continue_past_limit() -> Result<()> {
    let site = TestSite::with_files(&["a.txt", "b.txt", "c.txt", "d.txt", "e.txt", "f.txt"])?;
    let registry = MemoryRegistry::with_uris(["public://b.txt"]);
    let mut engine = site.engine(registry, "")?;

    let lists = engine.scan_with_lists(2)?;
    assert_eq!(lists.files, 6);
    assert_eq!(lists.orphans, 5);
    assert_eq!(lists.to_manage, vec!["public://a.txt", "public://c.txt"]);

    let counts = engine.record_orphans(2)?;
    assert_eq!((counts.files, counts.orphans, counts.adopted), (6, 5, 0));
    Ok(())
}

#[test]
fn test_full_scan_flags_ignored_files() -> Result<()> {
    let site = TestSite::with_files(&["example.txt", "css/skip.txt"])?;
    let mut engine = site.engine(MemoryRegistry::default(), "css/*")?;

    let report = engine.scan_public_files()?;
    assert_eq!(report.files, 2);

    let index = IndexStore::open(site.index_path())?;
    let example = index.get("public://example.txt").map(|r| r.is_ignored);
    let skipped = index.get("public://css/skip.txt").map(|r| r.is_ignored);
    assert_eq!(example, Some(false));
    assert_eq!(skipped, Some(true));
    assert_eq!(index.get("public://css/skip.txt").map(|r| r.directory_depth), Some(1));
    assert_eq!(index.get("public://example.txt").map(|r| r.timestamp), Some(FIXED_MTIME));
    Ok(())
}

#[test]
fn test_rescan_removes_deleted_file() -> Result<()> {
    let site = TestSite::with_files(&["keep.txt", "docs/gone.txt"])?;
    let mut engine = site.engine(MemoryRegistry::default(), "")?;
    engine.scan_public_files()?;
    assert!(engine.index().get("public://docs/gone.txt").is_some());

    site.remove("docs/gone.txt")?;
    let report = engine.scan_public_files()?;

    assert_eq!(report.removed, 1);
    assert!(engine.index().get("public://docs/gone.txt").is_none());
    assert!(IndexStore::open(site.index_path())?.get("public://docs/gone.txt").is_none());
    Ok(())
}

#[test]
fn test_unavailable_root_keeps_index() -> Result<()> {
    let site = TestSite::with_files(&["a.txt", "b.txt", "docs/c.txt"])?;
    let mut engine = site.engine(MemoryRegistry::default(), "")?;
    engine.scan_public_files()?;
    assert_eq!(engine.index().len(), 3);

    let parked = site.state.path().join("parked");
    std::fs::rename(site.root(), &parked)?;
    let report = engine.scan_public_files()?;
    let rebuilt = engine.build_index()?;
    std::fs::rename(&parked, site.root())?;

    assert_eq!(report, FullScanReport::default());
    assert_eq!(rebuilt, 0);
    assert_eq!(engine.index().len(), 3);
    assert_eq!(IndexStore::open(site.index_path())?.len(), 3);
    Ok(())
}

#[test]
fn test_index_partitions_files_by_managed_state() -> Result<()> {
    let files = ["a.txt", "b.txt", "img/logo.png", "img/raw/photo.jpg", "tmp/x.tmp"];
    let site = TestSite::with_files(&files)?;
    let registry = MemoryRegistry::with_uris(["public:///b.txt", "public://img/raw/photo.jpg"]);
    let mut engine = site.engine(registry, "*.tmp")?;

    engine.scan_public_files()?;

    assert_eq!(engine.index().len(), files.len());
    for file in files {
        let uri = format!("public://{file}");
        let row = engine.index().get(&uri);
        assert!(row.is_some(), "{uri} missing from index");
        let expected = file == "b.txt" || file == "img/raw/photo.jpg";
        assert_eq!(row.map(|r| r.is_managed), Some(expected), "{uri}");
    }

    assert_eq!(
        engine.stats(),
        IndexStats {
            total: 5,
            managed: 2,
            ignored: 1,
            unmanaged: 2,
            orphans: 0,
        }
    );
    Ok(())
}

#[test]
fn test_dotfiles_are_not_scanned() -> Result<()> {
    let site = TestSite::with_files(&["a.txt", ".hidden", ".cache/b.txt"])?;
    let mut engine = site.engine(MemoryRegistry::default(), "")?;

    let lists = engine.scan_with_lists(10)?;
    assert_eq!(lists.files, 1);
    assert_eq!(lists.to_manage, vec!["public://a.txt"]);
    Ok(())
}

#[test]
fn test_build_index_is_byte_identical() -> Result<()> {
    let site = TestSite::with_files(&["a.txt", "docs/b.md", "docs/img/c.png", "z/d.txt"])?;
    let mut engine = site.engine(MemoryRegistry::with_uris(["public://docs/b.md"]), "*.png")?;

    assert_eq!(engine.build_index()?, 4);
    let first = site.index_bytes()?;

    assert_eq!(engine.build_index()?, 4);
    assert_eq!(site.index_bytes()?, first);

    // An unchanged tree leaves the full scan a no-op too
    engine.scan_public_files()?;
    assert_eq!(site.index_bytes()?, first);
    Ok(())
}

#[test]
fn test_build_index_drops_stale_flags() -> Result<()> {
    let site = TestSite::with_files(&["a.txt", "css/site.css"])?;
    let mut engine = site.engine(MemoryRegistry::default(), "")?;
    engine.scan_public_files()?;
    assert_eq!(engine.index().get("public://css/site.css").map(|r| r.is_ignored), Some(false));

    let mut engine = site.engine(MemoryRegistry::default(), "css/*")?;
    engine.build_index()?;
    assert_eq!(engine.index().get("public://css/site.css").map(|r| r.is_ignored), Some(true));
    Ok(())
}

#[test]
fn test_snapshot_is_reloaded_per_call() -> Result<()> {
    let site = TestSite::with_files(&["a.txt", "b.txt", "c.txt"])?;
    let mut engine = site.engine(MemoryRegistry::default(), "")?;
    assert_eq!(engine.scan_with_lists(10)?.orphans, 3);

    engine.registry_mut().create_managed_entry("public://b.txt", "b.txt", 0)?;
    let lists = engine.scan_with_lists(10)?;
    assert_eq!(lists.orphans, 2);
    assert_eq!(lists.to_manage, vec!["public://a.txt", "public://c.txt"]);
    Ok(())
}

#[test]
fn test_managed_file_is_never_readopted() -> Result<()> {
    let site = TestSite::with_files(&["a.txt", "b.txt"])?;
    // Stored with a non-canonical spelling
    let registry = MemoryRegistry::with_uris(["public:////a.txt"]);
    let mut engine = site.engine(registry, "")?;

    assert!(!engine.adopt_file("public://a.txt")?);
    let summary = engine.adopt_files(["public://a.txt", "public:///a.txt"])?;
    assert_eq!(summary.adopted, 0);
    assert_eq!(summary.skipped, 2);
    assert_eq!(engine.registry().len(), 1);
    Ok(())
}

#[test]
fn test_adoption_removes_orphan_row() -> Result<()> {
    let site = TestSite::with_files(&["a.txt", "b.txt"])?;
    let mut engine = site.engine(MemoryRegistry::default(), "")?;
    engine.scan_with_lists(10)?;
    assert!(engine.orphans().contains("public://a.txt"));

    assert!(engine.adopt_file("public://a.txt")?);
    assert!(!engine.orphans().contains("public://a.txt"));
    assert!(engine.orphans().contains("public://b.txt"));
    assert!(!OrphanStore::open(site.orphans_path())?.contains("public://a.txt"));

    let entity = engine.registry().find("public://a.txt").cloned();
    assert_eq!(entity.map(|e| (e.filename, e.timestamp)), Some(("a.txt".to_string(), FIXED_MTIME)));
    Ok(())
}

#[test]
fn test_scan_and_process_survives_failures() -> Result<()> {
    let site = TestSite::with_files(&["a.txt", "b.txt", "c.txt", "d.txt"])?;
    let mut registry = MemoryRegistry::default();
    registry.fail_on("public://b.txt");
    let mut engine = site.engine(registry, "")?;

    let counts = engine.scan_and_process(true, 10)?;
    assert_eq!((counts.files, counts.orphans, counts.adopted), (4, 4, 3));
    assert!(engine.orphans().contains("public://b.txt"));
    assert_eq!(engine.orphans().len(), 1);

    // Adopted files are marked managed in the index right away
    assert_eq!(engine.index().get("public://c.txt").map(|r| r.is_managed), Some(true));
    Ok(())
}

#[test]
fn test_scan_and_process_respects_limit() -> Result<()> {
    let site = TestSite::with_files(&["a.txt", "b.txt", "c.txt"])?;
    let mut engine = site.engine(MemoryRegistry::default(), "")?;

    let counts = engine.scan_and_process(true, 1)?;
    assert_eq!((counts.orphans, counts.adopted), (3, 1));
    assert!(engine.registry().find("public://a.txt").is_some());

    let counts = engine.scan_and_process(false, 10)?;
    assert_eq!((counts.orphans, counts.adopted), (2, 0));
    Ok(())
}

#[test]
fn test_adopt_unmanaged_uses_index_order() -> Result<()> {
    let site = TestSite::with_files(&["a.txt", "b.txt", "c.txt", "skip.tmp"])?;
    let mut engine = site.engine(MemoryRegistry::default(), "*.tmp")?;
    engine.scan_public_files()?;

    let summary = engine.adopt_unmanaged(2)?;
    assert_eq!(summary.adopted, 2);
    assert!(engine.registry().find("public://a.txt").is_some());
    assert!(engine.registry().find("public://b.txt").is_some());
    assert_eq!(engine.index().list_unmanaged_unignored(10, None), vec!["public://c.txt"]);
    Ok(())
}

#[test]
fn test_entity_hooks_persist_index_changes() -> Result<()> {
    let site = TestSite::with_files(&["a.txt"])?;
    let mut engine = site.engine(MemoryRegistry::default(), "")?;
    let entity = ManagedEntity {
        id: 9,
        uri: "public:///a.txt".to_string(),
        filename: "a.txt".to_string(),
        timestamp: 1,
    };

    assert_eq!(engine.on_entity_insert(&entity)?, HookEffect::Upserted);
    let row = IndexStore::open(site.index_path())?.get("public://a.txt").cloned();
    assert_eq!(row.map(|r| (r.is_managed, r.timestamp)), Some((true, FIXED_MTIME)));

    site.remove("a.txt")?;
    assert_eq!(engine.on_entity_delete(&entity)?, HookEffect::Removed);
    assert!(IndexStore::open(site.index_path())?.is_empty());
    Ok(())
}

#[test]
fn test_prune_stale_orphans() -> Result<()> {
    let site = TestSite::with_files(&["a.txt", "b.txt", "c.txt"])?;
    let mut engine = site.engine(MemoryRegistry::default(), "")?;
    engine.scan_with_lists(10)?;

    site.remove("a.txt")?;
    engine.registry_mut().create_managed_entry("public://b.txt", "b.txt", 0)?;

    assert_eq!(engine.prune_stale_orphans()?, 2);
    assert_eq!(engine.orphans().list_all(10), vec!["public://c.txt"]);
    assert_eq!(engine.prune_stale_orphans()?, 0);
    Ok(())
}

#[test]
fn test_missing_root_yields_empty_results() -> Result<()> {
    let site = TestSite::new()?;
    let missing = site.root().join("nope");
    let mut engine = orphanage::engine::ReconciliationEngine::new(
        orphanage::uri::Scheme::new("public", missing),
        orphanage::scanner::IgnoreMatcher::default(),
        MemoryRegistry::default(),
        IndexStore::open(site.index_path())?,
        OrphanStore::open(site.orphans_path())?,
    );

    assert_eq!(engine.scan_with_lists(10)?.files, 0);
    assert_eq!(engine.scan_public_files()?.files, 0);
    assert!(engine.scan_chunk("", 5, None)?.is_complete());
    Ok(())
}

#[test]
fn test_invalid_pattern_never_matches() -> Result<()> {
    let site = TestSite::with_files(&["a.txt", "b.tmp"])?;
    let mut engine = site.engine(MemoryRegistry::default(), "[, *.tmp")?;

    assert_eq!(engine.get_ignore_patterns(), ["[", "*.tmp"]);
    let lists = engine.scan_with_lists(10)?;
    assert_eq!(lists.to_manage, vec!["public://a.txt"]);
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_symlink_cycle_terminates() -> Result<()> {
    let site = TestSite::with_files(&["docs/a.txt", "b.txt"])?;
    std::os::unix::fs::symlink(site.root(), site.root().join("docs/loop"))?;
    let mut engine = site.engine(MemoryRegistry::default(), "")?;

    let lists = engine.scan_with_lists(100)?;
    assert_eq!(lists.to_manage, vec!["public://docs/a.txt", "public://b.txt"]);

    let mut chunked = Vec::new();
    let mut cursor = String::new();
    loop {
        let chunk = engine.scan_chunk(&cursor, 1, None)?;
        chunked.extend(chunk.to_manage);
        if chunk.resume.is_empty() {
            break;
        }
        cursor = chunk.resume;
    }
    assert_eq!(chunked, lists.to_manage);
    Ok(())
}
