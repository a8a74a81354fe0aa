//
// Copyright (c) The yang-ctx Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! The LYB tree codec: ties [`super::framing`], [`super::hash`] and
//! [`super::value`] together into a full data-tree wire format.
//!
//! Layout: a 3-byte magic (`l`, `y`, `b`), a reserved flags byte, a module
//! table (every module referenced anywhere in the tree, so later schema
//! hashes need only an index into it rather than repeating the module
//! name — a `u16` count followed by, per module, a chunked name string and
//! a `u16`-packed revision date, `(year-2000)<<9 | month<<5 | day`, with 0
//! meaning "no revision"), the root sibling group, and a trailing list of
//! canonical paths for every value that is still an unresolved reference
//! (leafref/instance-identifier/identityref/unresolved union) once decoding
//! finishes — the caller is expected to resolve those against the context
//! out of band.
//!
//! A schema node's identity on the wire is `(module_index, hash)`, where
//! `hash` is a [`super::hash`]-encoded `(digest, collision_id)` pair.
//! `collision_id` is derived purely from the candidate schema list at that
//! position in the tree (module root nodes, or a parent node's children) —
//! the index, among same-digest candidates in schema declaration order, of
//! the node being written. Because it only depends on the schema (not on
//! which children happen to be present in a particular tree), the decoder
//! can invert it without needing to have seen the encoder's traversal
//! order, on the condition that children are written in schema declaration
//! order (an invariant this codec's writer upholds).

use crate::context::Context;
use crate::data::{DataKey, DataNodeInner, DataTree, Metadata};
use crate::error::{Error, Result};
use crate::schema::{ModuleKey, NodeKey};

const MAGIC: &[u8; 3] = b"lyb";

const KIND_INNER: u8 = 0;
const KIND_TERM: u8 = 1;
const KIND_ANY: u8 = 2;
/// Set on `KIND_INNER` when the container is non-presence and carries no
/// children of its own — default-container promotion leaves it on the wire
/// (so the schema position is preserved) but flagged as implicit.
const FLAG_PROMOTED: u8 = 0x80;

struct ModuleTable {
    keys: Vec<ModuleKey>,
}

impl ModuleTable {
    fn build(tree: &DataTree<'_>) -> ModuleTable {
        let ctx = tree.context();
        let mut keys = Vec::new();
        for root in all_keys(tree) {
            let module = ctx.node(tree.node(root).schema()).module;
            if !keys.contains(&module) {
                keys.push(module);
            }
        }
        ModuleTable { keys }
    }

    fn index_of(&self, module: ModuleKey) -> u32 {
        self.keys.iter().position(|k| *k == module).expect("module was collected from the tree") as u32
    }
}

fn all_keys(tree: &DataTree<'_>) -> Vec<DataKey> {
    let mut out = Vec::new();
    let mut stack: Vec<DataKey> = tree.roots().map(|n| n.key).collect();
    while let Some(key) = stack.pop() {
        out.push(key);
        if let DataNodeInner::Inner { children, .. } = tree.node(key) {
            stack.extend(children.iter().copied());
        }
    }
    out
}

/// The index, in schema declaration order among same-digest siblings, of
/// `schema_key` within `candidates`.
fn collision_id(ctx: &Context, candidates: &[NodeKey], schema_key: NodeKey) -> u8 {
    let module = ctx.node(schema_key).module;
    let module_name = &ctx.module(module).name;
    let digest = super::hash::schema_hash(module_name, &ctx.node(schema_key).name);
    candidates
        .iter()
        .take_while(|&&k| k != schema_key)
        .filter(|&&k| {
            let m = &ctx.module(ctx.node(k).module).name;
            super::hash::schema_hash(m, &ctx.node(k).name) == digest
        })
        .count() as u8
}

/// Inverts [`collision_id`]: finds the schema node in `candidates` at
/// `collision_id` among those whose digest matches.
fn resolve_schema(ctx: &Context, candidates: &[NodeKey], digest: u8, collision_id: u8) -> Option<NodeKey> {
    let mut seen = 0u8;
    for &key in candidates {
        let module_name = &ctx.module(ctx.node(key).module).name;
        if super::hash::schema_hash(module_name, &ctx.node(key).name) == digest {
            if seen == collision_id {
                return Some(key);
            }
            seen += 1;
        }
    }
    None
}

fn write_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn read_u32(data: &[u8], pos: &mut usize) -> Result<u32> {
    let bytes = data
        .get(*pos..*pos + 4)
        .ok_or_else(|| Error::invalid("truncated LYB u32"))?;
    *pos += 4;
    Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
}

fn write_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn read_u16(data: &[u8], pos: &mut usize) -> Result<u16> {
    let bytes = data
        .get(*pos..*pos + 2)
        .ok_or_else(|| Error::invalid("truncated LYB u16"))?;
    *pos += 2;
    Ok(u16::from_le_bytes(bytes.try_into().unwrap()))
}

/// Packs a YANG revision date (`YYYY-MM-DD`) into the 2-byte
/// `(year-2000)<<9 | month<<5 | day` form the module table uses on the
/// wire; `None` packs as `0`.
fn pack_revision(revision: Option<&str>) -> Result<u16> {
    let Some(rev) = revision else { return Ok(0) };
    let malformed = || Error::invalid(format!("malformed revision date '{rev}'"));
    let mut parts = rev.splitn(3, '-');
    let year: u32 = parts.next().and_then(|s| s.parse().ok()).ok_or_else(malformed)?;
    let month: u32 = parts.next().and_then(|s| s.parse().ok()).ok_or_else(malformed)?;
    let day: u32 = parts.next().and_then(|s| s.parse().ok()).ok_or_else(malformed)?;
    if !(2000..=2127).contains(&year) {
        return Err(Error::invalid(format!(
            "revision year {year} is out of the packed u16 range 2000..=2127"
        )));
    }
    Ok((((year - 2000) as u16) << 9) | ((month as u16) << 5) | day as u16)
}

/// Inverts [`pack_revision`]. `0` unpacks as `None`.
fn unpack_revision(packed: u16) -> Option<String> {
    if packed == 0 {
        return None;
    }
    let day = packed & 0x1f;
    let month = (packed >> 5) & 0xf;
    let year = 2000 + (packed >> 9);
    Some(format!("{year:04}-{month:02}-{day:02}"))
}

/// Writes `s` as a chunked string (its UTF-8 bytes framed through
/// [`super::framing::write_block`]), matching how the module table and
/// every other on-wire string is specified.
fn write_string(out: &mut Vec<u8>, s: &str) {
    super::framing::write_block(out, s.as_bytes());
}

fn read_string(data: &[u8], pos: &mut usize) -> Result<String> {
    let bytes = super::framing::read_block(data, pos)?;
    String::from_utf8(bytes).map_err(|e| Error::invalid(format!("LYB string is not UTF-8: {e}")))
}

fn write_metadata(out: &mut Vec<u8>, metadata: &[Metadata]) {
    let count: u8 = metadata
        .len()
        .try_into()
        .expect("more than 255 metadata attributes on a single node");
    out.push(count);
    for m in metadata {
        write_string(out, &m.annotation_module);
        write_string(out, &m.name);
        super::value::encode(out, &m.value, false);
    }
}

fn read_metadata(data: &[u8], pos: &mut usize) -> Result<Vec<Metadata>> {
    let count = *data
        .get(*pos)
        .ok_or_else(|| Error::invalid("truncated LYB metadata count"))?;
    *pos += 1;
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let annotation_module = read_string(data, pos)?;
        let name = read_string(data, pos)?;
        let (value, _is_default) = super::value::decode(data, pos)?;
        out.push(Metadata { annotation_module, name, value });
    }
    Ok(out)
}

fn encode_group(
    ctx: &Context,
    tree: &DataTree<'_>,
    keys: &[DataKey],
    candidates: &[NodeKey],
    modules: &ModuleTable,
    out: &mut Vec<u8>,
) {
    write_u32(out, keys.len() as u32);
    for &key in keys {
        let mut payload = Vec::new();
        let node = tree.node(key);
        let schema_key = node.schema();
        let module = ctx.node(schema_key).module;
        write_u32(&mut payload, modules.index_of(module));

        let module_name = &ctx.module(module).name;
        let digest = super::hash::schema_hash(module_name, &ctx.node(schema_key).name);
        let cid = collision_id(ctx, candidates, schema_key);
        payload.extend(super::hash::encode(digest, cid));

        match node {
            DataNodeInner::Inner { children, metadata, .. } => {
                let promoted = ctx.node(schema_key).is_np_container() && children.is_empty();
                payload.push(KIND_INNER | if promoted { FLAG_PROMOTED } else { 0 });
                write_metadata(&mut payload, metadata);
                let child_candidates = ctx.node(schema_key).children.clone();
                encode_group(ctx, tree, children, &child_candidates, modules, &mut payload);
            }
            DataNodeInner::Term { value, is_default, metadata, .. } => {
                payload.push(KIND_TERM);
                write_metadata(&mut payload, metadata);
                super::value::encode(&mut payload, value, *is_default);
            }
            DataNodeInner::Any { data, metadata, .. } => {
                payload.push(KIND_ANY);
                write_metadata(&mut payload, metadata);
                write_u32(&mut payload, data.len() as u32);
                payload.extend_from_slice(data);
            }
        }

        super::framing::write_block(out, &payload);
    }
}

fn decode_group<'a>(
    ctx: &'a Context,
    tree: &mut DataTree<'a>,
    parent: Option<DataKey>,
    candidates: &[NodeKey],
    modules: &[ModuleKey],
    data: &[u8],
    pos: &mut usize,
    unresolved: &mut Vec<String>,
    path_prefix: &str,
) -> Result<()> {
    let count = read_u32(data, pos)?;
    for _ in 0..count {
        let payload = super::framing::read_block(data, pos)?;
        let mut p = 0usize;
        let module_index = read_u32(&payload, &mut p)? as usize;
        let module = *modules
            .get(module_index)
            .ok_or_else(|| Error::invalid("LYB module table index out of range"))?;
        let (digest, cid) = super::hash::decode(&payload, &mut p)?;

        let schema_key = resolve_schema(ctx, candidates, digest, cid).ok_or_else(|| {
            Error::invalid(format!(
                "no schema node in module '{}' matches LYB hash {:#x}/{}",
                ctx.module(module).name,
                digest,
                cid
            ))
        })?;
        let node_name = ctx.node(schema_key).name.clone();
        let node_path = format!("{path_prefix}/{node_name}");

        let kind_byte = *payload
            .get(p)
            .ok_or_else(|| Error::invalid("truncated LYB node kind"))?;
        p += 1;
        let kind = kind_byte & 0x7f;

        let metadata = read_metadata(&payload, &mut p)?;

        match kind {
            KIND_INNER => {
                let key = tree.new_inner(parent, schema_key)?;
                *tree.node_mut(key).metadata_mut() = metadata;
                let promoted = kind_byte & FLAG_PROMOTED != 0;
                if !promoted {
                    let child_candidates = ctx.node(schema_key).children.clone();
                    decode_group(ctx, tree, Some(key), &child_candidates, modules, &payload, &mut p, unresolved, &node_path)?;
                }
            }
            KIND_TERM => {
                let (value, is_default) = super::value::decode(&payload, &mut p)?;
                if value.is_unresolved_reference() {
                    unresolved.push(node_path.clone());
                }
                let key = tree.new_term(parent, schema_key, value)?;
                if let DataNodeInner::Term { is_default: flag, .. } = tree.node_mut(key) {
                    *flag = is_default;
                }
                *tree.node_mut(key).metadata_mut() = metadata;
            }
            KIND_ANY => {
                let len = read_u32(&payload, &mut p)? as usize;
                let bytes = payload
                    .get(p..p + len)
                    .ok_or_else(|| Error::invalid("truncated LYB anydata blob"))?
                    .to_vec();
                let key = tree.new_any(parent, schema_key, bytes)?;
                *tree.node_mut(key).metadata_mut() = metadata;
            }
            other => return Err(Error::invalid(format!("unknown LYB node kind {other}"))),
        }
    }
    Ok(())
}

pub fn encode(tree: &DataTree<'_>) -> Result<Vec<u8>> {
    let ctx = tree.context();
    let modules = ModuleTable::build(tree);

    let mut out = Vec::new();
    out.extend_from_slice(MAGIC);
    out.push(0); // flags, reserved

    let module_count: u16 = modules
        .keys
        .len()
        .try_into()
        .map_err(|_| Error::invalid("more than 65535 modules referenced by one LYB stream"))?;
    write_u16(&mut out, module_count);
    for &key in &modules.keys {
        let module = ctx.module(key);
        write_string(&mut out, &module.name);
        write_u16(&mut out, pack_revision(module.revision.as_deref())?);
    }

    let roots: Vec<DataKey> = tree.roots().map(|n| n.key).collect();
    // Root candidates span every loaded module's root nodes, in the same
    // order the module table lists them.
    let root_candidates: Vec<NodeKey> = modules
        .keys
        .iter()
        .flat_map(|&m| ctx.module(m).root_nodes.clone())
        .collect();
    encode_group(ctx, tree, &roots, &root_candidates, &modules, &mut out);

    let mut unresolved = Vec::new();
    collect_unresolved(tree, &mut unresolved, "");
    write_u32(&mut out, unresolved.len() as u32);
    for path in unresolved {
        write_string(&mut out, &path);
    }

    Ok(out)
}

fn collect_unresolved(tree: &DataTree<'_>, out: &mut Vec<String>, prefix: &str) {
    for node in tree.roots() {
        collect_unresolved_rec(tree, node.key, out, prefix);
    }
}

fn collect_unresolved_rec(tree: &DataTree<'_>, key: DataKey, out: &mut Vec<String>, prefix: &str) {
    let ctx = tree.context();
    let name = &ctx.node(tree.node(key).schema()).name;
    let path = format!("{prefix}/{name}");
    match tree.node(key) {
        DataNodeInner::Term { value, .. } if value.is_unresolved_reference() => {
            out.push(path);
        }
        DataNodeInner::Inner { children, .. } => {
            for &child in children {
                collect_unresolved_rec(tree, child, out, &path);
            }
        }
        _ => {}
    }
}

pub fn decode<'a>(ctx: &'a Context, data: &[u8]) -> Result<DataTree<'a>> {
    if data.len() < 4 || &data[0..3] != MAGIC {
        return Err(Error::invalid("not an LYB byte stream: bad magic"));
    }
    let mut pos = 3usize;
    let _flags = data[pos];
    pos += 1;

    let module_count = read_u16(data, &mut pos)?;
    let mut modules = Vec::with_capacity(module_count as usize);
    for _ in 0..module_count {
        let name = read_string(data, &mut pos)?;
        let revision = unpack_revision(read_u16(data, &mut pos)?);
        let key = ctx
            .get_module(&name, revision.as_deref(), false)
            .map(|m| m.key)
            .ok_or_else(|| Error::invalid(format!("module '{name}' referenced by LYB stream is not loaded")))?;
        modules.push(key);
    }

    let root_candidates: Vec<NodeKey> = modules
        .iter()
        .flat_map(|&m| ctx.module(m).root_nodes.clone())
        .collect();

    let mut tree = DataTree::new(ctx);
    let mut unresolved = Vec::new();
    decode_group(ctx, &mut tree, None, &root_candidates, &modules, data, &mut pos, &mut unresolved, "")?;

    // The trailing deferred-reference list the encoder wrote is redundant
    // with what `decode_group` just collected on the way in; skip past it
    // (rather than trusting it blindly) and report from our own findings.
    let trailer_count = read_u32(data, &mut pos)?;
    for _ in 0..trailer_count {
        read_string(data, &mut pos)?;
    }
    for path in &unresolved {
        crate::error::push(Error::invalid(format!(
            "value at '{path}' is an unresolved reference and needs out-of-band resolution"
        )));
    }

    Ok(tree)
}
