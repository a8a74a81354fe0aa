//
// Copyright (c) The yang-ctx Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! YANG schema graph: modules, submodules and schema nodes.
//!
//! Modules and schema nodes are owned by arenas on [`crate::context::Context`]
//! (`SlotMap<ModuleKey, Module>` and `SlotMap<NodeKey, SchemaNode>`).
//! Cross-references (imports, leafref targets, parent/child/sibling links,
//! augment targets) are `ModuleKey`/`NodeKey` handles copied by value rather
//! than owning pointers, so the schema graph has no lifetime tangles and
//! needs no unsafe code.

use std::path::PathBuf;

use slotmap::new_key_type;
use smallvec::SmallVec;

use crate::value::{BaseType, Value};

/// Most schema nodes have only a handful of children/`must`/`when`
/// substatements; inlining a few of them avoids a heap allocation per node
/// for the common case (a leaf with no `must`, a container with two or
/// three children) while still spilling to the heap for the rare node that
/// has more.
pub type NodeList = SmallVec<[NodeKey; 4]>;
pub type MustList = SmallVec<[Must; 2]>;
pub type WhenList = SmallVec<[When; 2]>;

new_key_type! {
    /// A stable handle to a [`Module`] inside a [`crate::context::Context`].
    pub struct ModuleKey;

    /// A stable handle to a [`SchemaNode`] inside a [`crate::context::Context`].
    pub struct NodeKey;
}

/// A YANG `must` substatement.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Must {
    pub xpath: String,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub error_message: Option<String>,
    pub error_app_tag: Option<String>,
}

/// A YANG `when` substatement.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct When {
    pub xpath: String,
    pub description: Option<String>,
    pub reference: Option<String>,
}

/// The status of a definition: `current`, `deprecated` or `obsolete`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Status {
    #[default]
    Current,
    Deprecated,
    Obsolete,
}

/// A reference to another module's import slot, recording both the prefix
/// used locally and the revision actually bound.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Import {
    pub module: ModuleKey,
    pub prefix: String,
    pub bound_revision: Option<String>,
}

/// A submodule, owned by exactly one parent [`Module`] via an include edge.
/// Shares the parent's namespace.
#[derive(Clone, Debug)]
pub struct Submodule {
    pub name: String,
    pub revision: Option<String>,
    pub root_nodes: Vec<NodeKey>,
}

/// A reference to an identity, qualified by the module that defines it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IdentityRef {
    pub module: ModuleKey,
    pub name: String,
}

/// A named singleton that other identities may declare as a base, forming a
/// DAG. Only the forward `bases` edges are stored here; the reverse
/// `derived` set lives in the cross-reference index and is queried via
/// `Context::identity_derived`.
#[derive(Clone, Debug, Default)]
pub struct Identity {
    pub name: String,
    pub bases: Vec<IdentityRef>,
    pub description: Option<String>,
    pub reference: Option<String>,
}

/// A YANG feature. Only the forward `if_features` edges are stored here; the
/// reverse `dependents` set lives in the cross-reference index.
#[derive(Clone, Debug, Default)]
pub struct Feature {
    pub name: String,
    pub enabled: bool,
    pub if_features: Vec<IdentityRef>,
    pub description: Option<String>,
    pub reference: Option<String>,
}

/// The kind of a deviation target patch.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeviationKind {
    NotSupported,
    Add,
    Replace,
    Delete,
}

/// A deviation applied by one module to the schema graph of another;
/// applied on enable, torn down on disable.
#[derive(Clone, Debug)]
pub struct Deviation {
    pub target_path: String,
    pub kind: DeviationKind,
}

/// An augment applied by one module to the schema graph of another; applied
/// on enable, torn down on disable.
#[derive(Clone, Debug)]
pub struct Augment {
    pub target_path: String,
    pub nodes: Vec<NodeKey>,
}

/// A YANG module.
#[derive(Clone, Debug)]
pub struct Module {
    pub name: String,
    pub revision: Option<String>,
    pub namespace: String,
    pub prefix: String,
    pub implemented: bool,
    pub disabled: bool,
    pub latest_revision: bool,
    pub imports: Vec<Import>,
    pub includes: Vec<Submodule>,
    pub features: Vec<Feature>,
    pub identities: Vec<Identity>,
    pub deviations: Vec<Deviation>,
    pub augments: Vec<Augment>,
    pub root_nodes: Vec<NodeKey>,
    pub origin_path: Option<PathBuf>,
    pub organization: Option<String>,
    pub contact: Option<String>,
    pub description: Option<String>,
    pub reference: Option<String>,
    /// True for the handful of modules `Context::new` preloads
    /// (`yang-metadata`, `yang`, `ietf-inet-types`, `ietf-yang-types`,
    /// `ietf-datastores`, `ietf-yang-library`). Internal modules cannot be
    /// disabled or removed.
    pub internal: bool,
}

impl Module {
    pub fn feature(&self, name: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.name == name)
    }

    pub fn feature_mut(&mut self, name: &str) -> Option<&mut Feature> {
        self.features.iter_mut().find(|f| f.name == name)
    }

    pub fn identity(&self, name: &str) -> Option<&Identity> {
        self.identities.iter().find(|i| i.name == name)
    }
}

/// Container-specific payload.
#[derive(Clone, Debug, Default)]
pub struct ContainerInfo {
    /// `true` for a presence container; `false` for a non-presence
    /// container eligible for default-container promotion.
    pub presence: bool,
}

/// List-specific payload.
#[derive(Clone, Debug, Default)]
pub struct ListInfo {
    pub keys: Vec<NodeKey>,
    pub min_elements: Option<u32>,
    pub max_elements: Option<u32>,
    pub user_ordered: bool,
}

/// Leaf-specific payload.
#[derive(Clone, Debug)]
pub struct LeafInfo {
    pub base_type: BaseType,
    /// The resolved target schema node, populated only when `base_type` is
    /// `BaseType::LeafRef`.
    pub leafref_target: Option<NodeKey>,
    pub default: Option<Value>,
    pub units: Option<String>,
    pub is_key: bool,
    pub mandatory: bool,
}

/// Leaf-list-specific payload.
#[derive(Clone, Debug)]
pub struct LeafListInfo {
    pub base_type: BaseType,
    pub leafref_target: Option<NodeKey>,
    pub defaults: Vec<Value>,
    pub units: Option<String>,
    pub min_elements: Option<u32>,
    pub max_elements: Option<u32>,
    pub user_ordered: bool,
}

/// Choice-specific payload.
#[derive(Clone, Debug, Default)]
pub struct ChoiceInfo {
    pub default_case: Option<NodeKey>,
    pub mandatory: bool,
}

/// RPC/action-specific payload: separate `input`/`output` child lists plus
/// their own `must` restrictions.
#[derive(Clone, Debug, Default)]
pub struct ActionInfo {
    pub input: NodeList,
    pub input_musts: MustList,
    pub output: NodeList,
    pub output_musts: MustList,
}

/// The tagged variant over schema node kinds.
#[derive(Clone, Debug)]
pub enum NodeKind {
    Container(ContainerInfo),
    List(ListInfo),
    Leaf(LeafInfo),
    LeafList(LeafListInfo),
    AnyData,
    Choice(ChoiceInfo),
    Case,
    Rpc(ActionInfo),
    Action(ActionInfo),
    Notification,
    Input,
    Output,
    Grouping,
    Uses,
    Augment,
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Container(_) => "container",
            NodeKind::List(_) => "list",
            NodeKind::Leaf(_) => "leaf",
            NodeKind::LeafList(_) => "leaf-list",
            NodeKind::AnyData => "anydata",
            NodeKind::Choice(_) => "choice",
            NodeKind::Case => "case",
            NodeKind::Rpc(_) => "rpc",
            NodeKind::Action(_) => "action",
            NodeKind::Notification => "notification",
            NodeKind::Input => "input",
            NodeKind::Output => "output",
            NodeKind::Grouping => "grouping",
            NodeKind::Uses => "uses",
            NodeKind::Augment => "augment",
        }
    }

    /// Whether this node type can appear in a *data* tree (as opposed to
    /// schema-only structuring nodes like `choice`/`case`/`grouping`/`uses`).
    pub fn is_data_node(&self) -> bool {
        !matches!(
            self,
            NodeKind::Choice(_) | NodeKind::Case | NodeKind::Grouping | NodeKind::Uses
        )
    }
}

/// A generic YANG schema node. Per-kind payloads live inside [`NodeKind`].
#[derive(Clone, Debug)]
pub struct SchemaNode {
    pub name: String,
    pub module: ModuleKey,
    pub parent: Option<NodeKey>,
    pub children: NodeList,
    pub kind: NodeKind,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub config: bool,
    pub status: Status,
    pub musts: MustList,
    pub whens: WhenList,
}

impl SchemaNode {
    pub fn new(name: impl Into<String>, module: ModuleKey, kind: NodeKind) -> SchemaNode {
        SchemaNode {
            name: name.into(),
            module,
            parent: None,
            children: NodeList::new(),
            kind,
            description: None,
            reference: None,
            config: true,
            status: Status::Current,
            musts: MustList::new(),
            whens: WhenList::new(),
        }
    }

    pub fn is_list_key(&self) -> bool {
        matches!(&self.kind, NodeKind::Leaf(leaf) if leaf.is_key)
    }

    pub fn is_np_container(&self) -> bool {
        matches!(&self.kind, NodeKind::Container(c) if !c.presence)
    }

    pub fn is_schema_only(&self) -> bool {
        matches!(self.kind, NodeKind::Choice(_) | NodeKind::Case)
    }
}

/// A borrowing handle to a module inside a context, mirroring
/// [`crate::data::DataNodeRef`]'s `(context, key)` shape.
#[derive(Clone, Copy, Debug)]
pub struct SchemaModuleRef<'a> {
    pub context: &'a crate::context::Context,
    pub key: ModuleKey,
}

impl<'a> SchemaModuleRef<'a> {
    pub fn module(&self) -> &'a Module {
        self.context.module(self.key)
    }

    pub fn root_nodes(&self) -> impl Iterator<Item = SchemaNodeRef<'a>> + 'a {
        let context = self.context;
        self.module()
            .root_nodes
            .clone()
            .into_iter()
            .map(move |key| SchemaNodeRef { context, key })
    }
}

/// A borrowing handle to a schema node inside a context.
#[derive(Clone, Copy, Debug)]
pub struct SchemaNodeRef<'a> {
    pub context: &'a crate::context::Context,
    pub key: NodeKey,
}

impl<'a> PartialEq for SchemaNodeRef<'a> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.context, other.context) && self.key == other.key
    }
}

impl<'a> SchemaNodeRef<'a> {
    pub fn node(&self) -> &'a SchemaNode {
        self.context.node(self.key)
    }

    pub fn module(&self) -> SchemaModuleRef<'a> {
        SchemaModuleRef {
            context: self.context,
            key: self.node().module,
        }
    }
}

impl<'a> crate::iter::NodeIterable<'a> for SchemaNodeRef<'a> {
    fn parent(&self) -> Option<Self> {
        self.node().parent.map(|key| SchemaNodeRef {
            context: self.context,
            key,
        })
    }

    fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        let context = self.context;
        Box::new(
            self.node()
                .children
                .clone()
                .into_iter()
                .map(move |key| SchemaNodeRef { context, key }),
        )
    }
}

/// A module still under construction, used by built-in module definitions
/// and by [`crate::context::SchemaSource`] implementations to assemble a
/// [`Module`] and its [`SchemaNode`]s before they are committed into a
/// context's arenas.
#[derive(Clone, Debug)]
pub struct ModuleBuilder {
    pub name: String,
    pub revision: Option<String>,
    pub namespace: String,
    pub prefix: String,
    pub organization: Option<String>,
    pub contact: Option<String>,
    pub description: Option<String>,
    pub reference: Option<String>,
}

impl ModuleBuilder {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, prefix: impl Into<String>) -> ModuleBuilder {
        ModuleBuilder {
            name: name.into(),
            revision: None,
            namespace: namespace.into(),
            prefix: prefix.into(),
            organization: None,
            contact: None,
            description: None,
            reference: None,
        }
    }

    pub fn revision(mut self, revision: impl Into<String>) -> ModuleBuilder {
        self.revision = Some(revision.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> ModuleBuilder {
        self.description = Some(description.into());
        self
    }

    /// Finishes the builder into an implemented, non-internal [`Module`]
    /// with no schema nodes yet (callers add those via
    /// `Context::alloc_node`/`Context::attach_child` and then push the root
    /// keys onto `Module::root_nodes`).
    pub fn build(self) -> Module {
        Module {
            name: self.name,
            revision: self.revision,
            namespace: self.namespace,
            prefix: self.prefix,
            implemented: true,
            disabled: false,
            latest_revision: true,
            imports: Vec::new(),
            includes: Vec::new(),
            features: Vec::new(),
            identities: Vec::new(),
            deviations: Vec::new(),
            augments: Vec::new(),
            root_nodes: Vec::new(),
            origin_path: None,
            organization: self.organization,
            contact: self.contact,
            description: self.description,
            reference: self.reference,
            internal: false,
        }
    }
}
