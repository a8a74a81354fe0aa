//
// Copyright (c) The yang-ctx Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! YANG instance data trees.
//!
//! Construction, path lookup and the LYB codec are in scope; XML/JSON
//! printing/parsing and XPath-based lookup are not (see `find_path`'s
//! schema-path-only navigation, and `lyb` for the only supported wire
//! format).

use slotmap::{new_key_type, SlotMap};

use crate::context::Context;
use crate::error::{Error, Result};
use crate::schema::NodeKey;
use crate::value::Value;

new_key_type! {
    /// A stable handle to a [`DataNodeInner`] inside a [`DataTree`]'s arena.
    pub struct DataKey;
}

/// A metadata (`RFC 7952` annotation) attached to a data node, e.g. a
/// NETCONF `operation` attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct Metadata {
    pub annotation_module: String,
    pub name: String,
    pub value: Value,
}

/// The payload of one data node.
#[derive(Clone, Debug)]
pub enum DataNodeInner {
    /// An inner (container/list/rpc/action/notification) node.
    Inner {
        schema: NodeKey,
        parent: Option<DataKey>,
        children: Vec<DataKey>,
        metadata: Vec<Metadata>,
    },
    /// A terminal (leaf/leaf-list) node holding a typed value.
    Term {
        schema: NodeKey,
        parent: Option<DataKey>,
        value: Value,
        /// `true` if this value was added implicitly from the schema
        /// default rather than supplied explicitly.
        is_default: bool,
        metadata: Vec<Metadata>,
    },
    /// An opaque `anydata`/`anyxml` blob, stored as its LYB-decoded typed
    /// value when known, or as raw bytes when the schema gives it no type.
    Any {
        schema: NodeKey,
        parent: Option<DataKey>,
        data: Vec<u8>,
        metadata: Vec<Metadata>,
    },
}

impl DataNodeInner {
    pub fn schema(&self) -> NodeKey {
        match self {
            DataNodeInner::Inner { schema, .. }
            | DataNodeInner::Term { schema, .. }
            | DataNodeInner::Any { schema, .. } => *schema,
        }
    }

    pub fn parent(&self) -> Option<DataKey> {
        match self {
            DataNodeInner::Inner { parent, .. }
            | DataNodeInner::Term { parent, .. }
            | DataNodeInner::Any { parent, .. } => *parent,
        }
    }

    fn parent_mut(&mut self) -> &mut Option<DataKey> {
        match self {
            DataNodeInner::Inner { parent, .. }
            | DataNodeInner::Term { parent, .. }
            | DataNodeInner::Any { parent, .. } => parent,
        }
    }

    pub fn metadata(&self) -> &[Metadata] {
        match self {
            DataNodeInner::Inner { metadata, .. }
            | DataNodeInner::Term { metadata, .. }
            | DataNodeInner::Any { metadata, .. } => metadata,
        }
    }

    pub fn metadata_mut(&mut self) -> &mut Vec<Metadata> {
        match self {
            DataNodeInner::Inner { metadata, .. }
            | DataNodeInner::Term { metadata, .. }
            | DataNodeInner::Any { metadata, .. } => metadata,
        }
    }
}

/// A YANG instance data tree: an arena of [`DataNodeInner`] nodes plus the
/// keys of its top-level siblings, borrowing the [`Context`] whose schema it
/// is instantiated against.
#[derive(Debug)]
pub struct DataTree<'a> {
    context: &'a Context,
    nodes: SlotMap<DataKey, DataNodeInner>,
    roots: Vec<DataKey>,
}

/// A borrowing handle to one node inside a [`DataTree`].
#[derive(Clone, Copy, Debug)]
pub struct DataNodeRef<'a> {
    pub tree: &'a DataTree<'a>,
    pub key: DataKey,
}

impl<'a> PartialEq for DataNodeRef<'a> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.key == other.key
    }
}

/// A recorded change between two data trees. Populated only by a future
/// diff algorithm; this crate carries the shape (so callers can already
/// write code against it) without implementing the comparison itself.
#[derive(Clone, Debug)]
pub struct DataDiff {
    pub path: String,
    pub op: DataDiffOp,
    pub value: Option<Value>,
}

/// The kind of change a [`DataDiff`] entry records.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DataDiffOp {
    Create,
    Delete,
    Replace,
}

impl<'a> DataTree<'a> {
    pub fn new(context: &'a Context) -> DataTree<'a> {
        DataTree {
            context,
            nodes: SlotMap::with_key(),
            roots: Vec::new(),
        }
    }

    pub fn context(&self) -> &'a Context {
        self.context
    }

    pub fn roots(&self) -> impl Iterator<Item = DataNodeRef<'_>> {
        self.roots.iter().map(move |&key| DataNodeRef { tree: self, key })
    }

    fn alloc(&mut self, node: DataNodeInner) -> DataKey {
        self.nodes.insert(node)
    }

    /// Appends `child` under `parent`, or as a new top-level sibling when
    /// `parent` is `None`.
    pub fn attach(&mut self, parent: Option<DataKey>, child: DataKey) -> Result<()> {
        match parent {
            Some(parent_key) => {
                *self.nodes[child].parent_mut() = Some(parent_key);
                match self.nodes.get_mut(parent_key) {
                    Some(DataNodeInner::Inner { children, .. }) => {
                        children.push(child);
                        Ok(())
                    }
                    Some(_) => Err(Error::invalid("parent data node is not an inner node")),
                    None => Err(Error::internal("attach: parent key not found in arena")),
                }
            }
            None => {
                self.roots.push(child);
                Ok(())
            }
        }
    }

    /// Creates and attaches a new inner (container/list/rpc/action/
    /// notification) data node.
    pub fn new_inner(&mut self, parent: Option<DataKey>, schema: NodeKey) -> Result<DataKey> {
        let key = self.alloc(DataNodeInner::Inner {
            schema,
            parent: None,
            children: Vec::new(),
            metadata: Vec::new(),
        });
        self.attach(parent, key)?;
        Ok(key)
    }

    /// Creates and attaches a new terminal (leaf/leaf-list) data node.
    pub fn new_term(&mut self, parent: Option<DataKey>, schema: NodeKey, value: Value) -> Result<DataKey> {
        let key = self.alloc(DataNodeInner::Term {
            schema,
            parent: None,
            value,
            is_default: false,
            metadata: Vec::new(),
        });
        self.attach(parent, key)?;
        Ok(key)
    }

    /// Creates and attaches a new `anydata`/`anyxml` data node.
    pub fn new_any(&mut self, parent: Option<DataKey>, schema: NodeKey, data: Vec<u8>) -> Result<DataKey> {
        let key = self.alloc(DataNodeInner::Any {
            schema,
            parent: None,
            data,
            metadata: Vec::new(),
        });
        self.attach(parent, key)?;
        Ok(key)
    }

    pub fn node(&self, key: DataKey) -> &DataNodeInner {
        &self.nodes[key]
    }

    pub fn node_mut(&mut self, key: DataKey) -> &mut DataNodeInner {
        &mut self.nodes[key]
    }

    /// Finds the first data node whose schema-name path from a root matches
    /// `segments` exactly (e.g. `["interfaces", "interface"]`), descending
    /// breadth-first within each level. This is schema-path navigation, not
    /// a general XPath evaluator.
    pub fn find_path(&self, segments: &[&str]) -> Option<DataNodeRef<'_>> {
        let mut candidates: Vec<DataKey> = self.roots.clone();
        let mut found = None;
        for (i, segment) in segments.iter().enumerate() {
            found = candidates.iter().copied().find(|&key| {
                self.context.node(self.nodes[key].schema()).name == *segment
            });
            let key = found?;
            if i + 1 < segments.len() {
                candidates = match &self.nodes[key] {
                    DataNodeInner::Inner { children, .. } => children.clone(),
                    _ => return None,
                };
            }
        }
        found.map(|key| DataNodeRef { tree: self, key })
    }

    /// Encodes this tree using the LYB binary format.
    pub fn to_lyb(&self) -> Result<Vec<u8>> {
        crate::lyb::codec::encode(self)
    }

    /// Decodes an LYB byte stream into a new data tree bound to `context`.
    pub fn from_lyb(context: &'a Context, bytes: &[u8]) -> Result<DataTree<'a>> {
        crate::lyb::codec::decode(context, bytes)
    }
}

impl<'a> DataNodeRef<'a> {
    pub fn inner(&self) -> &'a DataNodeInner {
        self.tree.node(self.key)
    }

    pub fn schema(&self) -> crate::schema::SchemaNodeRef<'a> {
        crate::schema::SchemaNodeRef {
            context: self.tree.context(),
            key: self.inner().schema(),
        }
    }

    pub fn value(&self) -> Option<&'a Value> {
        match self.inner() {
            DataNodeInner::Term { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn metadata(&self) -> &'a [Metadata] {
        self.inner().metadata()
    }
}

impl<'a> crate::iter::NodeIterable<'a> for DataNodeRef<'a> {
    fn parent(&self) -> Option<Self> {
        self.inner().parent().map(|key| DataNodeRef { tree: self.tree, key })
    }

    fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        let tree = self.tree;
        match self.inner() {
            DataNodeInner::Inner { children, .. } => {
                Box::new(children.clone().into_iter().map(move |key| DataNodeRef { tree, key }))
            }
            _ => Box::new(std::iter::empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Context, ContextFlags};
    use crate::schema::{LeafInfo, NodeKind, SchemaNode};
    use crate::value::BaseType;

    fn test_context() -> Context {
        Context::new(ContextFlags::NO_YANG_LIBRARY).unwrap()
    }

    #[test]
    fn new_term_attaches_as_root_with_correct_value() {
        let mut ctx = test_context();
        let module = ctx.get_module("yang", None, false).unwrap().key;
        let leaf_schema = ctx.alloc_node(SchemaNode::new(
            "greeting",
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

        let mut tree = DataTree::new(&ctx);
        let key = tree.new_term(None, leaf_schema, Value::String("hi".into())).unwrap();
        let node = DataNodeRef { tree: &tree, key };
        assert_eq!(node.value(), Some(&Value::String("hi".into())));
        assert_eq!(tree.roots().count(), 1);
    }

    #[test]
    fn find_path_descends_by_schema_name() {
        let mut ctx = test_context();
        let module = ctx.get_module("yang", None, false).unwrap().key;
        let container_schema = ctx.alloc_node(SchemaNode::new(
            "outer",
            module,
            NodeKind::Container(crate::schema::ContainerInfo { presence: true }),
        ));
        let leaf_schema = ctx.alloc_node(SchemaNode::new(
            "inner",
            module,
            NodeKind::Leaf(LeafInfo {
                base_type: BaseType::Uint8,
                leafref_target: None,
                default: None,
                units: None,
                is_key: false,
                mandatory: false,
            }),
        ));
        ctx.attach_child(container_schema, leaf_schema);

        let mut tree = DataTree::new(&ctx);
        let outer = tree.new_inner(None, container_schema).unwrap();
        tree.new_term(Some(outer), leaf_schema, Value::Uint8(7)).unwrap();

        let found = tree.find_path(&["outer", "inner"]).unwrap();
        assert_eq!(found.value(), Some(&Value::Uint8(7)));
        assert!(tree.find_path(&["outer", "missing"]).is_none());
    }
}
