use pretty_assertions::assert_eq;
use stateview_tree::{
    ApiId, CaptureFile, MemoryLayout, NodePath, PoolMemory, Record, Snapshot, SnapshotProvider,
    StateAfter, StateTreeService, StaticConstants, TreeConfig, TreeError, TreeId, Value,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct FixedState {
    calls: AtomicUsize,
}

impl SnapshotProvider for FixedState {
    fn state_after(&self, after: &StateAfter) -> stateview_tree::Result<Snapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let command = after.top_level_command().unwrap_or_default();
        Ok(Snapshot {
            api: ApiId::new("gles"),
            root: Record::builder("State")
                .field("command", &command)
                .field("items", &vec![10u8, 20, 30])
                .field("many", &(0u32..25).collect::<Vec<_>>())
                .build(),
            layout: MemoryLayout::default(),
            memory: Arc::new(PoolMemory::new()),
        })
    }
}

fn service() -> (StateTreeService, Arc<FixedState>) {
    let snapshots = Arc::new(FixedState::default());
    let service = StateTreeService::new(
        snapshots.clone(),
        Arc::new(StaticConstants::new()),
        TreeConfig::default(),
    )
    .expect("service");
    (service, snapshots)
}

#[test]
fn equal_requests_share_a_handle_and_a_build() {
    let (service, snapshots) = service();
    let after = StateAfter::new("cap", vec![3]);
    let a = service.resolve_tree(&after, 10).expect("a");
    let b = service.resolve_tree(&after, 10).expect("b");
    assert_eq!(a, b);
    assert_ne!(a, service.resolve_tree(&after, 20).expect("other limit"));
    assert_ne!(
        a,
        service
            .resolve_tree(&StateAfter::new("cap", vec![4]), 10)
            .expect("other command")
    );

    // Registration is lazy.
    assert_eq!(snapshots.calls.load(Ordering::SeqCst), 0);
    service.node_at(&a.node([0])).expect("command");
    service.node_at(&b.node([1])).expect("items");
    assert_eq!(snapshots.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn sub_command_addresses_are_rejected() {
    let (service, snapshots) = service();
    let err = service
        .resolve_tree(&StateAfter::new("cap", vec![3, 1]), 10)
        .expect_err("nested");
    assert!(matches!(err, TreeError::Unsupported(_)));
    assert!(matches!(
        service.resolve_tree(&StateAfter::new("cap", vec![]), 10),
        Err(TreeError::Unsupported(_))
    ));
    assert_eq!(snapshots.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn out_of_range_walk_names_bound_and_prefix() {
    let (service, _) = service();
    let handle = service
        .resolve_tree(&StateAfter::new("cap", vec![0]), 10)
        .expect("handle");
    let items = service.node_at(&handle.node([1])).expect("items");
    assert_eq!(items.num_children, 3);

    let err = service
        .node_at(&handle.node([1, 5]))
        .expect_err("index 5 is out of range");
    assert_eq!(err.valid_bound(), Some((0, 2)));
    assert_eq!(
        err,
        TreeError::IndexOutOfBounds {
            index: 5,
            count: 3,
            at: handle.node([1]),
        }
    );
    assert_eq!(err.to_string(), "Index 5 out of bounds [0, 2] at root/1");

    let root_err = service
        .node_at(&handle.node([5]))
        .expect_err("root has three fields");
    assert_eq!(root_err.to_string(), "Index 5 out of bounds [0, 2] at root");
}

#[test]
fn descriptors_carry_previews_and_paths() {
    let (service, _) = service();
    let handle = service
        .resolve_tree(&StateAfter::new("cap", vec![6]), 10)
        .expect("handle");

    let command = service.node_at(&handle.node([0])).expect("command");
    assert_eq!(command.name, "command");
    assert_eq!(command.preview, Some(Value::Uint(6)));
    assert!(command.preview_is_value);
    assert_eq!(command.value_path.to_string(), "after(cap, [6]).command");

    let root = service.node_at(&handle.root).expect("root");
    assert_eq!(root.name, "root");
    assert_eq!(root.num_children, 3);
    assert_eq!(root.preview, None);
    assert!(!root.preview_is_value);
}

#[test]
fn children_at_pages_and_clips() {
    let (service, _) = service();
    let handle = service
        .resolve_tree(&StateAfter::new("cap", vec![0]), 10)
        .expect("handle");
    let many = handle.node([2]);

    let groups = service.children_at(&many, 0..10).expect("groups");
    let names: Vec<_> = groups.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["[0 - 9]", "[10 - 19]", "[20 - 24]"]);
    assert_eq!(groups[2].num_children, 5);

    let tail = service
        .children_at(&many.child(2), 3..100)
        .expect("tail");
    let names: Vec<_> = tail.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["23", "24"]);

    assert!(service
        .children_at(&many, 7..2)
        .expect("empty")
        .is_empty());
}

#[test]
fn unknown_trees_are_reported() {
    let (service, _) = service();
    let id = TreeId::fingerprint("nothing");
    assert_eq!(
        service.node_at(&NodePath::root(id.clone())),
        Err(TreeError::UnknownTree(id))
    );
}

#[test]
fn default_limit_comes_from_config() {
    let snapshots = Arc::new(FixedState::default());
    let service = StateTreeService::new(
        snapshots,
        Arc::new(StaticConstants::new()),
        TreeConfig {
            default_group_limit: 0,
            ..TreeConfig::default()
        },
    )
    .expect("service");
    let handle = service
        .resolve_default_tree(&StateAfter::new("cap", vec![0]))
        .expect("handle");
    let many = service.node_at(&handle.node([2])).expect("many");
    assert_eq!(many.num_children, 25);
    assert_eq!(service.tree(handle.id()).expect("tree").group_limit().get(), 0);
}

#[test]
fn invalid_config_is_rejected() {
    let result = StateTreeService::new(
        Arc::new(FixedState::default()),
        Arc::new(StaticConstants::new()),
        TreeConfig {
            store_capacity: 0,
            ..TreeConfig::default()
        },
    );
    assert!(matches!(result, Err(TreeError::InvalidConfig(_))));
}

#[test]
fn capture_documents_drive_the_service() {
    let capture = Arc::new(
        CaptureFile::from_json(
            r#"{
                "capture": "demo",
                "api": "gles",
                "memory": [{ "pool": 0, "base": 64, "bytes": "AQAAAAIAAAADAAAA" }],
                "constant_sets": [{
                    "index": 1,
                    "name": "Target",
                    "constants": [{ "name": "ARRAY_BUFFER", "value": 34962 }]
                }],
                "states": [{
                    "command": 0,
                    "state": { "record": {
                        "type_name": "Buffer",
                        "fields": [
                            { "name": "target", "value": { "uint": 34962 }, "constant_set": 1 },
                            { "name": "data", "value": { "slice": {
                                "pool": 0, "base": 64, "count": 3, "element": "u32"
                            } } }
                        ]
                    } }
                }]
            }"#,
        )
        .expect("capture"),
    );
    let service = StateTreeService::new(
        capture.clone(),
        capture.constants(),
        TreeConfig::default(),
    )
    .expect("service");

    let handle = service
        .resolve_tree(&StateAfter::new("demo", vec![12]), 100)
        .expect("handle");
    let target = service.node_at(&handle.node([0])).expect("target");
    let set = target.constants.expect("constant set");
    assert_eq!(set.name_of(34962), Some("ARRAY_BUFFER"));

    let data = service
        .children_at(&handle.node([1]), 0..3)
        .expect("data");
    let values: Vec<_> = data.into_iter().filter_map(|d| d.preview).collect();
    assert_eq!(values, vec![Value::Uint(1), Value::Uint(2), Value::Uint(3)]);

    let missing = service
        .resolve_tree(&StateAfter::new("other", vec![0]), 100)
        .expect("registration is lazy");
    assert!(matches!(
        service.node_at(&missing.root),
        Err(TreeError::Snapshot(_))
    ));
}
