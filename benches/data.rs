//
// Copyright (c) The yang-ctx Core Contributors
//
// SPDX-License-Identifier: MIT
//

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use yang_ctx::context::{Context, ContextFlags};
use yang_ctx::data::DataTree;
use yang_ctx::schema::{ContainerInfo, LeafInfo, ListInfo, ModuleBuilder, NodeKind, NodeKey, SchemaNode};
use yang_ctx::value::{BaseType, Value};

/// A small `ietf-interfaces`-shaped fixture schema, built directly through
/// `ModuleBuilder`/`alloc_node` since no textual parser exists to load
/// `.yang` source through.
struct Fixture {
    ctx: Context,
    interfaces: NodeKey,
    interface: NodeKey,
    name: NodeKey,
    if_type: NodeKey,
    enabled: NodeKey,
}

fn build_fixture_context() -> Fixture {
    let mut ctx = Context::new(ContextFlags::NO_YANG_LIBRARY).expect("failed to create context");
    let module = ctx.install(
        ModuleBuilder::new(
            "ietf-interfaces",
            "urn:ietf:params:xml:ns:yang:ietf-interfaces",
            "if",
        )
        .build(),
    );

    let interfaces = ctx.alloc_node(SchemaNode::new(
        "interfaces",
        module,
        NodeKind::Container(ContainerInfo { presence: false }),
    ));
    let name = ctx.alloc_node(SchemaNode::new(
        "name",
        module,
        NodeKind::Leaf(LeafInfo {
            base_type: BaseType::String,
            leafref_target: None,
            default: None,
            units: None,
            is_key: true,
            mandatory: true,
        }),
    ));
    let if_type = ctx.alloc_node(SchemaNode::new(
        "type",
        module,
        NodeKind::Leaf(LeafInfo {
            base_type: BaseType::IdentityRef,
            leafref_target: None,
            default: None,
            units: None,
            is_key: false,
            mandatory: true,
        }),
    ));
    let enabled = ctx.alloc_node(SchemaNode::new(
        "enabled",
        module,
        NodeKind::Leaf(LeafInfo {
            base_type: BaseType::Bool,
            leafref_target: None,
            default: Some(Value::Bool(true)),
            units: None,
            is_key: false,
            mandatory: false,
        }),
    ));
    let interface = ctx.alloc_node(SchemaNode::new(
        "interface",
        module,
        NodeKind::List(ListInfo {
            keys: vec![name],
            min_elements: None,
            max_elements: None,
            user_ordered: false,
        }),
    ));
    ctx.attach_child(interface, name);
    ctx.attach_child(interface, if_type);
    ctx.attach_child(interface, enabled);
    ctx.attach_child(interfaces, interface);
    ctx.module_mut(module).root_nodes.push(interfaces);

    Fixture {
        ctx,
        interfaces,
        interface,
        name,
        if_type,
        enabled,
    }
}

fn data_generate<'a>(fixture: &'a Fixture, interface_count: u32) -> DataTree<'a> {
    let mut dtree = DataTree::new(&fixture.ctx);
    let interfaces = dtree.new_inner(None, fixture.interfaces).unwrap();
    for i in 1..=interface_count {
        let interface = dtree.new_inner(Some(interfaces), fixture.interface).unwrap();
        dtree
            .new_term(Some(interface), fixture.name, Value::String(format!("eth{i}")))
            .unwrap();
        dtree
            .new_term(
                Some(interface),
                fixture.if_type,
                Value::IdentityRef("iana-if-type:ethernetCsmacd".to_string()),
            )
            .unwrap();
        dtree
            .new_term(Some(interface), fixture.enabled, Value::Bool(true))
            .unwrap();
    }
    dtree
}

fn criterion_benchmark(c: &mut Criterion) {
    let tree_sizes = [128, 256, 512, 1024, 2048, 4096];

    let fixture = build_fixture_context();

    let mut group = c.benchmark_group("DataTree construction / interface count");
    for size in &tree_sizes {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| data_generate(&fixture, size));
        });
    }
    group.finish();

    let mut group = c.benchmark_group("LYB encode / interface count");
    for size in &tree_sizes {
        let dtree = data_generate(&fixture, *size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| dtree.to_lyb().expect("failed to encode data tree"));
        });
    }
    group.finish();

    let mut group = c.benchmark_group("LYB decode / interface count");
    for size in &tree_sizes {
        let dtree = data_generate(&fixture, *size);
        let bytes = dtree.to_lyb().expect("failed to encode data tree");
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| DataTree::from_lyb(&fixture.ctx, &bytes).expect("failed to decode data tree"));
        });
    }
    group.finish();

    let mut group = c.benchmark_group("DataTree.find_path() / interface count");
    for size in &tree_sizes {
        let dtree = data_generate(&fixture, *size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                dtree
                    .find_path(&["interfaces", "interface", "name"])
                    .expect("failed to find data")
            });
        });
    }
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
