//
// Copyright (c) The yang-ctx Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! The handful of modules every context preloads at construction time.
//!
//! A full implementation would parse these from their published `.yang`
//! text; since the textual parser is out of scope here, they are instead
//! built directly through [`crate::schema::ModuleBuilder`] and installed
//! through the same `Context::install` path any other module goes through.
//! Only the structure later modules actually need to reference (the
//! `ietf-yang-types`/`ietf-inet-types` typedefs are referenced by name only,
//! not modeled as schema nodes) is populated.

use crate::context::Context;
use crate::error::Result;
use crate::schema::{ContainerInfo, LeafInfo, ListInfo, ModuleBuilder, NodeKind, SchemaNode};
use crate::value::BaseType;

pub(crate) fn install_all(ctx: &mut Context, skip_yang_library: bool) -> Result<()> {
    install_yang_metadata(ctx);
    install_yang(ctx);
    install_ietf_inet_types(ctx);
    install_ietf_yang_types(ctx);
    if !skip_yang_library {
        // `ietf-datastores` exists to give `ietf-yang-library`'s
        // `module-set`/`schema` entries a `datastore` identity to point at;
        // with the library itself skipped there is nothing left to
        // reference it, so it is skipped alongside it.
        install_ietf_datastores(ctx);
        install_ietf_yang_library(ctx);
    }
    Ok(())
}

fn internal(mut module: crate::schema::Module) -> crate::schema::Module {
    module.internal = true;
    module
}

fn install_yang_metadata(ctx: &mut Context) {
    let module = internal(
        ModuleBuilder::new(
            "yang-metadata",
            "urn:ietf:params:xml:ns:yang:1",
            "md",
        )
        .revision("2016-08-05")
        .description("Defines the annotation statement used to attach metadata (e.g. `ietf-netconf`'s `operation` attribute) to data nodes.")
        .build(),
    );
    ctx.install(module);
}

fn install_yang(ctx: &mut Context) {
    let module = internal(
        ModuleBuilder::new("yang", "urn:ietf:params:xml:ns:yang:1", "yang")
            .revision("2022-06-16")
            .description("Common YANG extensions (e.g. `default-deny-all`).")
            .build(),
    );
    ctx.install(module);
}

fn install_ietf_inet_types(ctx: &mut Context) {
    let module = internal(
        ModuleBuilder::new(
            "ietf-inet-types",
            "urn:ietf:params:xml:ns:yang:ietf-inet-types",
            "inet",
        )
        .revision("2013-07-15")
        .description("Internet-address derived types (`ip-address`, `ipv4-address`, `ipv6-address`, `port-number`, ...).")
        .build(),
    );
    ctx.install(module);
}

fn install_ietf_yang_types(ctx: &mut Context) {
    let module = internal(
        ModuleBuilder::new(
            "ietf-yang-types",
            "urn:ietf:params:xml:ns:yang:ietf-yang-types",
            "yang",
        )
        .revision("2013-07-15")
        .description("Commonly useful derived types (`counter32`, `date-and-time`, `mac-address`, ...).")
        .build(),
    );
    ctx.install(module);
}

fn install_ietf_datastores(ctx: &mut Context) {
    let module = internal(
        ModuleBuilder::new(
            "ietf-datastores",
            "urn:ietf:params:xml:ns:yang:ietf-datastores",
            "ds",
        )
        .revision("2018-02-14")
        .description("Identities for the standard configuration datastores (`running`, `candidate`, `startup`, `operational`, `intended`).")
        .build(),
    );
    ctx.install(module);
}

/// Builds the `/ietf-yang-library:yang-library` subtree that
/// `Context::info` returns a populated copy of: a `content-id` leaf plus a
/// `module` list keyed by `name`, with `revision`/`namespace` leaves. A
/// simplified rendition of RFC 8525's `module-set`/`module` shape (no
/// `schema`/`datastore` containers), close enough to be useful as a
/// read-only introspection snapshot.
fn install_ietf_yang_library(ctx: &mut Context) {
    let key = ctx.install(internal(
        ModuleBuilder::new(
            "ietf-yang-library",
            "urn:ietf:params:xml:ns:yang:ietf-yang-library",
            "yanglib",
        )
        .revision("2019-01-04")
        .description("RFC 8525: describes the YANG modules, datastores and schemas used by a server; exposed read-only via `Context::info`.")
        .build(),
    ));

    let root = ctx.alloc_node(SchemaNode::new(
        "yang-library",
        key,
        NodeKind::Container(ContainerInfo { presence: true }),
    ));

    let content_id = ctx.alloc_node(SchemaNode::new(
        "content-id",
        key,
        NodeKind::Leaf(LeafInfo {
            base_type: BaseType::String,
            leafref_target: None,
            default: None,
            units: None,
            is_key: false,
            mandatory: true,
        }),
    ));
    ctx.attach_child(root, content_id);

    let module_name = ctx.alloc_node(SchemaNode::new(
        "name",
        key,
        NodeKind::Leaf(LeafInfo {
            base_type: BaseType::String,
            leafref_target: None,
            default: None,
            units: None,
            is_key: true,
            mandatory: true,
        }),
    ));
    let module_revision = ctx.alloc_node(SchemaNode::new(
        "revision",
        key,
        NodeKind::Leaf(LeafInfo {
            base_type: BaseType::String,
            leafref_target: None,
            default: None,
            units: None,
            is_key: false,
            mandatory: false,
        }),
    ));
    let module_namespace = ctx.alloc_node(SchemaNode::new(
        "namespace",
        key,
        NodeKind::Leaf(LeafInfo {
            base_type: BaseType::String,
            leafref_target: None,
            default: None,
            units: None,
            is_key: false,
            mandatory: true,
        }),
    ));
    let module_list = ctx.alloc_node(SchemaNode::new(
        "module",
        key,
        NodeKind::List(ListInfo {
            keys: vec![module_name],
            min_elements: None,
            max_elements: None,
            user_ordered: false,
        }),
    ));
    ctx.attach_child(module_list, module_name);
    ctx.attach_child(module_list, module_revision);
    ctx.attach_child(module_list, module_namespace);
    ctx.attach_child(root, module_list);

    ctx.module_mut(key).root_nodes.push(root);
}
