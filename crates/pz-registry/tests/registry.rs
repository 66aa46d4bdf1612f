//! Integration tests for pz-registry

use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use pz_registry::{EditSessions, RegistryConfig, RegistryError, ZoneRegistry};
use pz_storage::{FsZoneStore, Manifest, MemoryZoneStore, StorageResult, ZoneRecord, ZoneStore};
use pz_zone::{BlockPos, EVERYWHERE, Flag, State, Zone, ZoneError};

// ============================================================================
// Helpers
// ============================================================================

fn memory_registry() -> ZoneRegistry<Arc<MemoryZoneStore>> {
    ZoneRegistry::open(Arc::new(MemoryZoneStore::new()), RegistryConfig::default()).unwrap()
}

fn square<S: ZoneStore>(registry: &ZoneRegistry<S>, name: &str, min: i32, max: i32) {
    for (x, z) in [(min, min), (max, min), (max, max), (min, max)] {
        registry.add_point(name, x, z).unwrap();
    }
}

/// Zone A from the reference scenario: `[0,0]-[10,10]`, band `(60, 80)`.
fn zone_a<S: ZoneStore>(registry: &ZoneRegistry<S>) {
    registry.create("A", "w", EVERYWHERE).unwrap();
    square(registry, "A", 0, 10);
    registry.set_floor("A", 60).unwrap();
    registry.set_ceiling("A", 80).unwrap();
}

fn which<S: ZoneStore>(registry: &ZoneRegistry<S>, x: i32, z: i32, y: i32) -> String {
    registry
        .resolve_containing(BlockPos::new(x, y, z), "w")
        .name()
        .to_owned()
}

// ============================================================================
// Containment
// ============================================================================

#[test]
fn test_point_outside_every_zone_resolves_to_root() {
    let registry = memory_registry();
    zone_a(&registry);

    assert_eq!(which(&registry, 500, -500, 70), EVERYWHERE);
    assert_eq!(which(&registry, 5, 5, 90), EVERYWHERE);
    assert!(registry.resolve_containing(BlockPos::new(5, 70, 5), "nether").is_root());
}

#[test]
fn test_two_level_nesting() {
    let registry = memory_registry();
    zone_a(&registry);

    assert_eq!(which(&registry, 5, 5, 70), "A");
    // Inside the polygon, below the band.
    assert_eq!(which(&registry, 5, 5, 50), EVERYWHERE);
}

#[test]
fn test_nested_child_wins_over_parent() {
    let registry = memory_registry();
    zone_a(&registry);
    registry.create("inner", "w", "a").unwrap();
    square(&registry, "inner", 2, 4);

    assert_eq!(which(&registry, 3, 3, 70), "inner");
    assert_eq!(which(&registry, 8, 8, 70), "A");
}

#[test]
fn test_everywhere_world_zone_matches_any_world() {
    let registry = memory_registry();
    registry.create("global", EVERYWHERE, EVERYWHERE).unwrap();
    square(&registry, "global", 0, 10);

    let pos = BlockPos::new(5, 64, 5);
    assert_eq!(registry.resolve_containing(pos, "nether").name(), "global");
    assert_eq!(registry.resolve_containing(pos, "w").name(), "global");
}

// ============================================================================
// Tree structure
// ============================================================================

#[test]
fn test_delete_reparents_children() {
    let registry = memory_registry();
    zone_a(&registry);
    registry.create("b", "w", "A").unwrap();
    square(&registry, "b", 2, 4);
    registry.create("c", "w", "A").unwrap();
    square(&registry, "c", 6, 8);

    assert!(registry.delete("a").unwrap());

    assert!(registry.lookup("A").is_none());
    assert_eq!(registry.lookup("b").unwrap().parent(), Some(EVERYWHERE));
    assert_eq!(registry.lookup("c").unwrap().parent(), Some(EVERYWHERE));
    assert_eq!(which(&registry, 3, 3, 70), "b");
    assert_eq!(which(&registry, 7, 7, 70), "c");

    // Storage follows.
    let store = registry.store();
    assert_eq!(store.record_keys(), vec!["b", "c", EVERYWHERE]);
    assert_eq!(store.load_record("b").unwrap().parent.as_deref(), Some(EVERYWHERE));
    assert_eq!(
        store.load_manifest().unwrap().unwrap().zones,
        vec![EVERYWHERE, "b", "c"]
    );
}

#[test]
fn test_delete_unknown_and_root() {
    let registry = memory_registry();

    assert!(!registry.delete("ghost").unwrap());
    assert!(matches!(
        registry.delete("Everywhere"),
        Err(RegistryError::RootImmutable(_))
    ));
    assert_eq!(registry.zone_count(), 1);
}

#[test]
fn test_set_parent_rejects_cycles() {
    let registry = memory_registry();
    registry.create("a", "w", EVERYWHERE).unwrap();
    registry.create("b", "w", "a").unwrap();
    registry.create("c", "w", "b").unwrap();

    assert!(matches!(
        registry.set_parent("a", "c"),
        Err(RegistryError::CycleDetected { .. })
    ));
    assert!(matches!(
        registry.set_parent("a", "a"),
        Err(RegistryError::CycleDetected { .. })
    ));
    assert_eq!(registry.lookup("a").unwrap().parent(), Some(EVERYWHERE));

    registry.set_parent("c", "a").unwrap();
    assert_eq!(registry.children("a").unwrap(), vec!["b", "c"]);
    assert_eq!(registry.store().load_record("c").unwrap().parent.as_deref(), Some("a"));
}

#[test]
fn test_names_are_case_insensitive() {
    let registry = memory_registry();
    registry.create("Market", "w", EVERYWHERE).unwrap();

    assert!(matches!(
        registry.create("MARKET", "w", EVERYWHERE),
        Err(RegistryError::DuplicateName(_))
    ));
    assert_eq!(registry.lookup("market").unwrap().name(), "Market");
    assert!(registry.contains("mArKeT"));
}

#[test]
fn test_create_validation_errors() {
    let registry = memory_registry();

    assert!(matches!(
        registry.create("a", "w", "ghost"),
        Err(RegistryError::UnknownParent(_))
    ));
    assert!(matches!(
        registry.create("bad name", "w", EVERYWHERE),
        Err(RegistryError::Validation(ZoneError::InvalidName(_)))
    ));
    assert_eq!(registry.list(), vec![EVERYWHERE]);
}

// ============================================================================
// Attributes
// ============================================================================

#[test]
fn test_band_violations_leave_state_unchanged() {
    let registry = memory_registry();
    zone_a(&registry);

    let err = registry.set_ceiling("A", 59).unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Validation(ZoneError::InvalidBounds { floor: 60, ceiling: 59 })
    ));
    assert_eq!(registry.lookup("A").unwrap().ceiling(), 80);

    assert!(registry.set_floor("A", 81).is_err());
    assert_eq!(registry.lookup("A").unwrap().floor(), 60);
    assert_eq!(registry.store().load_record("a").unwrap().floor, 60);
}

#[test]
fn test_flag_inheritance() {
    let registry = memory_registry();
    zone_a(&registry);
    registry.create("b", "w", "a").unwrap();

    assert_eq!(registry.flag_state("b", Flag::Pvp).unwrap(), State::Off);
    assert_eq!(registry.flag_state("b", Flag::Mobs).unwrap(), State::On);

    registry.set_flag("a", Flag::Pvp, State::On).unwrap();
    assert_eq!(registry.flag_state("b", Flag::Pvp).unwrap(), State::On);

    registry.set_flag("b", Flag::Pvp, State::Off).unwrap();
    registry.set_flag("a", Flag::Pvp, State::Inherit).unwrap();
    assert_eq!(registry.flag_state("a", Flag::Pvp).unwrap(), State::Off);
    assert_eq!(registry.lookup("a").unwrap().flag(Flag::Pvp), State::Inherit);
}

#[test]
fn test_root_flags() {
    let registry = memory_registry();
    let root = registry.root();

    assert_eq!(root.flag(Flag::Healing), State::Off);
    assert_eq!(root.flag(Flag::Pvp), State::Off);
    assert_eq!(root.flag(Flag::Sanctuary), State::Off);
    assert_eq!(root.flag(Flag::Mobs), State::On);
    assert!(root.flags().first_inherit().is_none());

    assert!(matches!(
        registry.set_flag(EVERYWHERE, Flag::Fire, State::Inherit),
        Err(RegistryError::Validation(ZoneError::InheritOnRoot(Flag::Fire)))
    ));
    registry.set_flag(EVERYWHERE, Flag::Fire, State::Off).unwrap();
    assert_eq!(registry.flag_state(EVERYWHERE, Flag::Fire).unwrap(), State::Off);
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_duplicate_create_leaves_disk_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ZoneRegistry::open(FsZoneStore::open(dir.path()), RegistryConfig::default()).unwrap();
    zone_a(&registry);

    let manifest_path = dir.path().join("zones.json");
    let record_path = dir.path().join("zones/a.json");
    let manifest_before = fs::read(&manifest_path).unwrap();
    let record_before = fs::read(&record_path).unwrap();

    assert!(matches!(
        registry.create("a", "nether", EVERYWHERE),
        Err(RegistryError::DuplicateName(_))
    ));

    assert_eq!(registry.list(), vec![EVERYWHERE, "A"]);
    assert_eq!(fs::read(&manifest_path).unwrap(), manifest_before);
    assert_eq!(fs::read(&record_path).unwrap(), record_before);
}

#[test]
fn test_reload_reproduces_every_zone() {
    let dir = tempfile::tempdir().unwrap();
    let config = RegistryConfig::default().with_data_dir(dir.path());

    let before: Vec<Zone> = {
        let registry = ZoneRegistry::from_config(config.clone()).unwrap();
        zone_a(&registry);
        registry.create("b", "w", "A").unwrap();
        square(&registry, "b", 1, 3);
        registry.set_flag("b", Flag::Tnt, State::Off).unwrap();
        registry.set_greeting("b", Some("Hello".into())).unwrap();
        registry.set_farewell("A", Some("Bye".into())).unwrap();
        registry.set_flag(EVERYWHERE, Flag::Creeper, State::Off).unwrap();

        registry.list().iter().filter_map(|n| registry.lookup(n)).collect()
    };

    let registry = ZoneRegistry::from_config(config).unwrap();
    let after: Vec<Zone> = registry.list().iter().filter_map(|n| registry.lookup(n)).collect();

    assert_eq!(before, after);
    assert_eq!(which(&registry, 2, 2, 70), "b");
}

#[test]
fn test_load_ignores_manifest_order() {
    let store = Arc::new(MemoryZoneStore::new());
    {
        let registry = ZoneRegistry::open(store.clone(), RegistryConfig::default()).unwrap();
        registry.create("a", "w", EVERYWHERE).unwrap();
        registry.create("b", "w", "a").unwrap();
        registry.create("c", "w", "b").unwrap();
    }

    // Children first, root last, with a duplicate entry.
    let manifest = Manifest::new(vec!["c".into(), "b".into(), "B".into(), "a".into(), EVERYWHERE.into()]);
    store.save_manifest(&manifest).unwrap();

    let registry = ZoneRegistry::open(store, RegistryConfig::default()).unwrap();
    assert_eq!(registry.list(), vec![EVERYWHERE, "a", "b", "c"]);
    assert_eq!(registry.lookup("c").unwrap().parent(), Some("b"));
}

#[test]
fn test_load_reports_missing_record() {
    let store = Arc::new(MemoryZoneStore::new());
    ZoneRegistry::open(store.clone(), RegistryConfig::default()).unwrap();

    store
        .save_manifest(&Manifest::new(vec![EVERYWHERE.into(), "ghost".into()]))
        .unwrap();

    assert!(matches!(
        ZoneRegistry::open(store, RegistryConfig::default()),
        Err(RegistryError::Persistence(pz_storage::StorageError::MissingRecord(key))) if key == "ghost"
    ));
}

#[test]
fn test_load_rejects_orphaned_record() {
    let store = Arc::new(MemoryZoneStore::new());
    ZoneRegistry::open(store.clone(), RegistryConfig::default()).unwrap();

    let orphan = Zone::new("lost", "w", "nowhere").unwrap();
    store.save_record(&ZoneRecord::from_zone(&orphan)).unwrap();
    store
        .save_manifest(&Manifest::new(vec![EVERYWHERE.into(), "lost".into()]))
        .unwrap();

    let err = ZoneRegistry::open(store, RegistryConfig::default()).err().unwrap();
    assert!(err.is_persistence());
}

#[test]
fn test_persistence_failure_keeps_in_memory_change() {
    let registry = memory_registry();
    zone_a(&registry);
    registry.store().set_fail_writes(true);

    let err = registry.create("b", "w", EVERYWHERE).unwrap_err();
    assert!(err.is_persistence());
    assert!(registry.contains("b"));

    let err = registry.set_flag("a", Flag::Fire, State::Off).unwrap_err();
    assert!(err.is_persistence());
    assert_eq!(registry.lookup("a").unwrap().flag(Flag::Fire), State::Off);

    registry.store().set_fail_writes(false);
    registry.persist_zone("b").unwrap();
    registry.persist_zone("a").unwrap();
    registry.persist_manifest().unwrap();

    let reloaded = ZoneRegistry::open(registry.store().clone(), RegistryConfig::default()).unwrap();
    assert_eq!(reloaded.list(), registry.list());
    assert_eq!(reloaded.lookup("a").unwrap().flag(Flag::Fire), State::Off);
}

#[test]
fn test_bootstrap_only_once() {
    let dir = tempfile::tempdir().unwrap();
    let config = RegistryConfig::default().with_data_dir(dir.path());

    let first = ZoneRegistry::from_config(config.clone()).unwrap();
    first.set_flag(EVERYWHERE, Flag::Pvp, State::On).unwrap();
    drop(first);

    let second = ZoneRegistry::from_config(config).unwrap();
    assert_eq!(second.root().flag(Flag::Pvp), State::On);
    assert_eq!(second.zone_count(), 1);
}

// ============================================================================
// Editing and movement
// ============================================================================

#[test]
fn test_edit_session_persists_polygon() {
    let registry = memory_registry();
    registry.create("plot", "w", EVERYWHERE).unwrap();
    let sessions = EditSessions::new();

    sessions.begin(&registry, "steve", "plot").unwrap();
    for (x, z) in [(0, 0), (4, 0), (4, 4), (0, 4)] {
        assert!(sessions.toggle_point("steve", x, z).unwrap());
    }
    sessions.save(&registry, "steve").unwrap();

    let record = registry.store().load_record("plot").unwrap();
    assert_eq!(record.point_count, 4);
    assert_eq!(which(&registry, 2, 2, 64), "plot");
}

#[test]
fn test_transition_between_siblings() {
    let registry = memory_registry();
    registry.create("west", "w", EVERYWHERE).unwrap();
    square(&registry, "west", 0, 10);
    registry.create("east", "w", EVERYWHERE).unwrap();
    square(&registry, "east", 10, 20);
    registry.set_farewell("west", Some("Leaving the west".into())).unwrap();
    registry.set_greeting("east", Some("Entering the east".into())).unwrap();

    let t = registry
        .transition(BlockPos::new(9, 64, 5), BlockPos::new(10, 64, 15), "w")
        .unwrap();

    assert_eq!((t.left.as_str(), t.entered.as_str()), ("west", "east"));
    assert_eq!(t.farewell.as_deref(), Some("Leaving the west"));
    assert_eq!(t.greeting.as_deref(), Some("Entering the east"));
}

// ============================================================================
// Concurrency
// ============================================================================

const SLOW_SAVE: Duration = Duration::from_millis(400);

/// Memory store whose record saves stall once `slow` is set.
#[derive(Default)]
struct SlowStore {
    inner: MemoryZoneStore,
    slow: AtomicBool,
}

impl ZoneStore for SlowStore {
    fn load_manifest(&self) -> StorageResult<Option<Manifest>> {
        self.inner.load_manifest()
    }

    fn save_manifest(&self, manifest: &Manifest) -> StorageResult<()> {
        self.inner.save_manifest(manifest)
    }

    fn load_record(&self, key: &str) -> StorageResult<ZoneRecord> {
        self.inner.load_record(key)
    }

    fn save_record(&self, record: &ZoneRecord) -> StorageResult<()> {
        if self.slow.load(Ordering::SeqCst) {
            thread::sleep(SLOW_SAVE);
        }
        self.inner.save_record(record)
    }

    fn delete_record(&self, key: &str) -> StorageResult<bool> {
        self.inner.delete_record(key)
    }
}

#[test]
fn test_readers_do_not_wait_on_queued_writes() {
    let registry = ZoneRegistry::open(SlowStore::default(), RegistryConfig::default()).unwrap();
    zone_a(&registry);
    registry.store().slow.store(true, Ordering::SeqCst);

    let read_time = thread::scope(|s| {
        s.spawn(|| registry.set_greeting("A", Some("first".into())).unwrap());
        thread::sleep(Duration::from_millis(50));
        // Queued behind the first save, which is still sleeping.
        s.spawn(|| registry.set_greeting("A", Some("second".into())).unwrap());
        thread::sleep(Duration::from_millis(50));

        let start = Instant::now();
        assert_eq!(which(&registry, 5, 5, 70), "A");
        assert!(registry.lookup("A").is_some());
        start.elapsed()
    });

    assert!(read_time < Duration::from_millis(100), "reader blocked for {read_time:?}");

    // Saves land in mutation order.
    let record = registry.store().load_record("A").unwrap();
    assert_eq!(record.greeting.as_deref(), Some("second"));
    assert_eq!(registry.lookup("A").unwrap().greeting(), Some("second"));
}
