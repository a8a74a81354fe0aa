//
// Copyright (c) The yang-ctx Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Integration tests for instance data trees: construction over a fixture
//! schema, schema-path lookup, metadata, and the LYB binary codec's
//! round-trip and failure-mode behavior.

use yang_ctx::context::{Context, ContextFlags};
use yang_ctx::data::{DataNodeInner, DataTree, Metadata};
use yang_ctx::schema::{ContainerInfo, LeafInfo, LeafListInfo, ModuleKey, NodeKey, NodeKind, SchemaNode};
use yang_ctx::value::{BaseType, Value};

/// A `container system { leaf hostname { type string; } leaf-list
/// dns-server { type string; } }`-shaped fixture, installed directly (no
/// textual parser exists to load real `.yang` source through).
struct Fixture {
    ctx: Context,
    system: NodeKey,
    hostname: NodeKey,
    dns_server: NodeKey,
    #[allow(dead_code)]
    module: ModuleKey,
}

fn build_fixture() -> Fixture {
    let _ = env_logger::try_init();
    let mut ctx = Context::new(ContextFlags::NO_YANG_LIBRARY).unwrap();
    let module = ctx
        .install(yang_ctx::schema::ModuleBuilder::new("example-system", "urn:example:system", "sys").build());

    let system = ctx.alloc_node(SchemaNode::new(
        "system",
        module,
        NodeKind::Container(ContainerInfo { presence: false }),
    ));
    let hostname = ctx.alloc_node(SchemaNode::new(
        "hostname",
        module,
        NodeKind::Leaf(LeafInfo {
            base_type: BaseType::String,
            leafref_target: None,
            default: None,
            units: None,
            is_key: false,
            mandatory: false,
        }),
    ));
    let dns_server = ctx.alloc_node(SchemaNode::new(
        "dns-server",
        module,
        NodeKind::LeafList(LeafListInfo {
            base_type: BaseType::String,
            leafref_target: None,
            defaults: vec![],
            units: None,
            min_elements: None,
            max_elements: None,
            user_ordered: true,
        }),
    ));
    ctx.attach_child(system, hostname);
    ctx.attach_child(system, dns_server);
    ctx.module_mut(module).root_nodes.push(system);

    Fixture {
        ctx,
        system,
        hostname,
        dns_server,
        module,
    }
}

#[test]
fn find_path_descends_through_container_to_a_leaf() {
    let f = build_fixture();
    let mut tree = DataTree::new(&f.ctx);
    let system = tree.new_inner(None, f.system).unwrap();
    tree.new_term(Some(system), f.hostname, Value::String("router1".into()))
        .unwrap();

    let found = tree.find_path(&["system", "hostname"]).unwrap();
    assert_eq!(found.value(), Some(&Value::String("router1".into())));
    assert!(tree.find_path(&["system", "nonexistent"]).is_none());
}

#[test]
fn leaf_list_instances_are_siblings_sharing_one_schema_node() {
    let f = build_fixture();
    let mut tree = DataTree::new(&f.ctx);
    let system = tree.new_inner(None, f.system).unwrap();
    tree.new_term(Some(system), f.dns_server, Value::String("1.1.1.1".into()))
        .unwrap();
    tree.new_term(Some(system), f.dns_server, Value::String("8.8.8.8".into()))
        .unwrap();

    let system_ref = tree.roots().next().unwrap();
    let values: Vec<String> = match system_ref.inner() {
        DataNodeInner::Inner { children, .. } => children
            .iter()
            .map(|&key| {
                let node_ref = yang_ctx::data::DataNodeRef { tree: &tree, key };
                node_ref.value().unwrap().canonical()
            })
            .collect(),
        _ => panic!("expected an inner node"),
    };
    assert_eq!(values, vec!["1.1.1.1", "8.8.8.8"]);
}

#[test]
fn metadata_round_trips_through_the_arena() {
    let f = build_fixture();
    let mut tree = DataTree::new(&f.ctx);
    let key = tree
        .new_term(None, f.hostname, Value::String("router1".into()))
        .unwrap();
    tree.node_mut(key).metadata_mut().push(Metadata {
        annotation_module: "ietf-netconf".to_string(),
        name: "operation".to_string(),
        value: Value::String("merge".into()),
    });

    assert_eq!(tree.node(key).metadata().len(), 1);
    assert_eq!(tree.node(key).metadata()[0].name, "operation");
}

#[test]
fn single_leaf_round_trips_through_lyb() {
    let f = build_fixture();
    let mut tree = DataTree::new(&f.ctx);
    tree.new_term(None, f.hostname, Value::String("router1".into()))
        .unwrap();

    let bytes = tree.to_lyb().unwrap();
    assert_eq!(&bytes[0..3], b"lyb");

    let decoded = DataTree::from_lyb(&f.ctx, &bytes).unwrap();
    let root = decoded.roots().next().unwrap();
    assert_eq!(root.value(), Some(&Value::String("router1".into())));
}

#[test]
fn nested_tree_with_leaf_list_round_trips_through_lyb() {
    let f = build_fixture();
    let mut tree = DataTree::new(&f.ctx);
    let system = tree.new_inner(None, f.system).unwrap();
    tree.new_term(Some(system), f.hostname, Value::String("router1".into()))
        .unwrap();
    tree.new_term(Some(system), f.dns_server, Value::String("1.1.1.1".into()))
        .unwrap();
    tree.new_term(Some(system), f.dns_server, Value::String("8.8.8.8".into()))
        .unwrap();

    let bytes = tree.to_lyb().unwrap();
    let decoded = DataTree::from_lyb(&f.ctx, &bytes).unwrap();

    let hostname = decoded.find_path(&["system", "hostname"]).unwrap();
    assert_eq!(hostname.value(), Some(&Value::String("router1".into())));

    let system_ref = decoded.roots().next().unwrap();
    let dns_values: Vec<String> = match system_ref.inner() {
        DataNodeInner::Inner { children, .. } => children
            .iter()
            .filter_map(|&key| {
                let node_ref = yang_ctx::data::DataNodeRef { tree: &decoded, key };
                if node_ref.schema().node().name != "dns-server" {
                    return None;
                }
                node_ref.value().map(Value::canonical)
            })
            .collect(),
        _ => panic!("expected an inner node"),
    };
    assert_eq!(dns_values, vec!["1.1.1.1", "8.8.8.8"]);
}

#[test]
fn leafref_target_value_is_reported_unresolved_after_decode() {
    let mut ctx = Context::new(ContextFlags::NO_YANG_LIBRARY).unwrap();
    let module = ctx.get_module("yang", None, false).unwrap().key;
    let leaf = ctx.alloc_node(SchemaNode::new(
        "pointer",
        module,
        NodeKind::Leaf(LeafInfo {
            base_type: BaseType::LeafRef,
            leafref_target: None,
            default: None,
            units: None,
            is_key: false,
            mandatory: false,
        }),
    ));

    let mut tree = DataTree::new(&ctx);
    tree.new_term(None, leaf, Value::LeafRef("/sys:system/sys:hostname".into()))
        .unwrap();
    let bytes = tree.to_lyb().unwrap();

    let decoded = DataTree::from_lyb(&ctx, &bytes).unwrap();
    let root = decoded.roots().next().unwrap();
    assert!(root.value().unwrap().is_unresolved_reference());
}

#[test]
fn decode_of_truncated_buffer_fails_cleanly() {
    let f = build_fixture();
    let mut tree = DataTree::new(&f.ctx);
    tree.new_term(None, f.hostname, Value::String("router1".into()))
        .unwrap();
    let bytes = tree.to_lyb().unwrap();

    for cut in [0, 1, 2, 3, 4, bytes.len() / 2] {
        let truncated = &bytes[..cut.min(bytes.len())];
        assert!(DataTree::from_lyb(&f.ctx, truncated).is_err());
    }
}

#[test]
fn decode_rejects_bad_magic() {
    let f = build_fixture();
    assert!(DataTree::from_lyb(&f.ctx, b"not-lyb-at-all").is_err());
}

#[test]
fn context_info_reports_content_id_and_a_loaded_modules_revision() {
    let mut ctx = Context::new(ContextFlags::empty()).unwrap();
    ctx.load_module("ietf-yang-types", Some("2013-07-15"), &[])
        .unwrap();

    let tree = ctx.info().unwrap();
    let content_id = tree.find_path(&["yang-library", "content-id"]).unwrap();
    assert_eq!(
        content_id.value(),
        Some(&Value::String(ctx.module_set_id().to_string()))
    );

    let module_entries: Vec<_> = match tree.roots().next().unwrap().inner() {
        DataNodeInner::Inner { children, .. } => children
            .iter()
            .filter(|&&key| {
                matches!(tree.node(key), DataNodeInner::Inner { .. })
            })
            .copied()
            .collect(),
        _ => panic!("expected an inner node"),
    };
    let found_yang_types = module_entries.iter().any(|&entry| {
        let name_node = match tree.node(entry) {
            DataNodeInner::Inner { children, .. } => children
                .iter()
                .find(|&&c| tree.context().node(tree.node(c).schema()).name == "name")
                .copied(),
            _ => None,
        };
        name_node
            .map(|key| {
                yang_ctx::data::DataNodeRef { tree: &tree, key }.value()
                    == Some(&Value::String("ietf-yang-types".into()))
            })
            .unwrap_or(false)
    });
    assert!(found_yang_types);
}
