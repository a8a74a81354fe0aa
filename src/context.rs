//
// Copyright (c) The yang-ctx Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! The YANG context: the module registry and its schema/data arenas.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use bitflags::bitflags;
use slotmap::SlotMap;

use crate::error::{Error, Result};
use crate::schema::{
    Augment, Deviation, DeviationKind, IdentityRef, Module, ModuleKey, NodeKey, NodeKind,
    SchemaModuleRef, SchemaNode, SchemaNodeRef,
};
use crate::utils::canonicalize_dir;
use crate::xref::XrefIndex;

/// Where a deviation's target node sat before `not-supported` detached it,
/// so enable-time teardown can reinsert it in the same place.
struct DetachedNode {
    node: NodeKey,
    parent: Option<NodeKey>,
    /// The node's owning module, used to reinsert into `root_nodes` when
    /// `parent` is `None` (the target was itself a module root).
    owning_module: ModuleKey,
    index: usize,
}

bitflags! {
    /// Options that shape a context's behavior. Named and numbered the way
    /// the schema registry this crate is modeled on does, so a reader
    /// familiar with one recognizes the other.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ContextFlags: u16 {
        /// Every module imported while loading an implemented module is
        /// itself marked implemented.
        const ALL_IMPLEMENTED = 0x01;
        /// Implement every module referenced from an implemented module's
        /// leafrefs, augments, deviations, whens, musts and defaults, not
        /// only the ones YANG 1.1 requires.
        const REF_IMPLEMENTED = 0x02;
        /// Skip preloading `ietf-yang-library`. Fixed at construction time.
        const NO_YANG_LIBRARY = 0x04;
        /// Never consult search directories (neither registered ones nor
        /// the working directory).
        const DISABLE_SEARCHDIRS = 0x08;
        /// Don't implicitly search the working directory.
        const DISABLE_SEARCHDIR_CWD = 0x10;
        /// Try search directories before the external source.
        const PREFER_SEARCHDIRS = 0x20;
    }
}

/// An external collaborator that resolves a module name (and optional
/// revision) to a built [`Module`]/[`SchemaNode`] tree, committing it into
/// the context's arenas via `alloc_module`/`alloc_node`/`attach_child`.
///
/// This stands in for the textual YANG/YIN parser and the "fetch from a
/// remote NETCONF server" import callback a full implementation would
/// plug in here; constructing schema nodes from parsed text is out of
/// scope for this crate.
pub trait SchemaSource {
    /// Attempt to resolve `name`/`revision` using an out-of-band channel
    /// (an import callback, an embedded-module table, a network fetch).
    /// Returns `Ok(None)` if this source has nothing for the request.
    fn load_external(
        &self,
        ctx: &mut Context,
        name: &str,
        revision: Option<&str>,
    ) -> Result<Option<ModuleKey>>;

    /// Attempt to resolve `name`/`revision` by consulting `search_dirs`.
    /// Returns `Ok(None)` if none of the directories hold a match.
    fn load_from_searchdirs(
        &self,
        ctx: &mut Context,
        name: &str,
        revision: Option<&str>,
        search_dirs: &[PathBuf],
    ) -> Result<Option<ModuleKey>>;
}

/// A [`SchemaSource`] that never resolves anything. The default for a
/// freshly constructed context: `load_module` then only ever succeeds for
/// modules already present (the built-ins, or ones installed directly via
/// `Context::install`).
#[derive(Debug, Default)]
pub struct NullSource;

impl SchemaSource for NullSource {
    fn load_external(
        &self,
        _ctx: &mut Context,
        _name: &str,
        _revision: Option<&str>,
    ) -> Result<Option<ModuleKey>> {
        Ok(None)
    }

    fn load_from_searchdirs(
        &self,
        _ctx: &mut Context,
        _name: &str,
        _revision: Option<&str>,
        _search_dirs: &[PathBuf],
    ) -> Result<Option<ModuleKey>> {
        Ok(None)
    }
}

/// The YANG context: owns every [`Module`] and [`SchemaNode`] it has
/// loaded, plus the cross-reference index over them.
pub struct Context {
    modules: SlotMap<ModuleKey, Module>,
    nodes: SlotMap<NodeKey, SchemaNode>,
    xref: XrefIndex,
    search_dirs: Vec<PathBuf>,
    flags: ContextFlags,
    module_set_id: AtomicU64,
    source: Box<dyn SchemaSource + Send + Sync>,
    /// Per deviating module, the `not-supported` targets currently detached
    /// from their schema tree because that module is implemented.
    deviation_detached: std::collections::HashMap<ModuleKey, Vec<DetachedNode>>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("modules", &self.modules.len())
            .field("nodes", &self.nodes.len())
            .field("search_dirs", &self.search_dirs)
            .field("flags", &self.flags)
            .field("module_set_id", &self.module_set_id.load(Ordering::Relaxed))
            .finish()
    }
}

impl Context {
    /// Creates a context and preloads its built-in modules (`yang-metadata`,
    /// `yang`, `ietf-inet-types`, `ietf-yang-types`, `ietf-datastores`, and
    /// `ietf-yang-library` unless [`ContextFlags::NO_YANG_LIBRARY`] is set).
    pub fn new(flags: ContextFlags) -> Result<Context> {
        let mut context = Context {
            modules: SlotMap::with_key(),
            nodes: SlotMap::with_key(),
            xref: XrefIndex::new(),
            search_dirs: Vec::new(),
            flags,
            module_set_id: AtomicU64::new(0),
            source: Box::new(NullSource),
            deviation_detached: std::collections::HashMap::new(),
        };

        crate::builtins::install_all(&mut context, flags.contains(ContextFlags::NO_YANG_LIBRARY))?;
        if !flags.contains(ContextFlags::DISABLE_SEARCHDIRS)
            && !flags.contains(ContextFlags::DISABLE_SEARCHDIR_CWD)
        {
            if let Ok(cwd) = std::env::current_dir() {
                let _ = context.set_searchdir(cwd);
            }
        }

        Ok(context)
    }

    /// Installs an external collaborator used by `load_module` to resolve
    /// modules not already present in the context.
    pub fn set_source(&mut self, source: impl SchemaSource + Send + Sync + 'static) {
        self.source = Box::new(source);
    }

    pub fn flags(&self) -> ContextFlags {
        self.flags
    }

    /// A counter bumped every time the set of loaded modules changes (load,
    /// disable, enable or remove). Callers can cheaply detect "has anything
    /// changed since I last looked".
    pub fn module_set_id(&self) -> u64 {
        self.module_set_id.load(Ordering::Relaxed)
    }

    fn bump_module_set_id(&self) {
        self.module_set_id.fetch_add(1, Ordering::Relaxed);
    }

    // ===== search directories =====

    /// Registers a search directory, canonicalized and deduplicated against
    /// the already-registered set; insertion order is preserved, so the
    /// most recently added directory is searched last.
    pub fn set_searchdir(&mut self, dir: impl AsRef<Path>) -> Result<()> {
        let canon = canonicalize_dir(&dir)?;
        if !self.search_dirs.contains(&canon) {
            self.search_dirs.push(canon);
        }
        Ok(())
    }

    pub fn unset_searchdir(&mut self, dir: impl AsRef<Path>) -> Result<()> {
        let canon = canonicalize_dir(&dir)?;
        self.search_dirs.retain(|d| *d != canon);
        Ok(())
    }

    pub fn unset_searchdirs(&mut self) {
        self.search_dirs.clear();
    }

    pub fn get_searchdirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    // ===== arena access (used by SchemaSource implementations and builtins) =====

    pub fn alloc_module(&mut self, module: Module) -> ModuleKey {
        self.modules.insert(module)
    }

    pub fn alloc_node(&mut self, node: SchemaNode) -> NodeKey {
        self.nodes.insert(node)
    }

    /// Wires `child` into `parent`'s child list and sets `child.parent`.
    pub fn attach_child(&mut self, parent: NodeKey, child: NodeKey) {
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
    }

    pub fn module(&self, key: ModuleKey) -> &Module {
        &self.modules[key]
    }

    pub fn module_mut(&mut self, key: ModuleKey) -> &mut Module {
        &mut self.modules[key]
    }

    pub fn node(&self, key: NodeKey) -> &SchemaNode {
        &self.nodes[key]
    }

    pub fn node_mut(&mut self, key: NodeKey) -> &mut SchemaNode {
        &mut self.nodes[key]
    }

    /// Renders `key`'s schema path, e.g. `/ietf-interfaces:interfaces/interface`.
    pub fn node_path(&self, key: NodeKey) -> String {
        let mut segments = vec![self.nodes[key].name.clone()];
        let mut current = key;
        while let Some(parent) = self.nodes[current].parent {
            segments.push(self.nodes[parent].name.clone());
            current = parent;
        }
        segments.reverse();
        let module_name = self.module(self.nodes[key].module).name.clone();
        let segment_refs: Vec<&str> = segments.iter().map(String::as_str).collect();
        crate::utils::join_schema_path(&module_name, &segment_refs)
    }

    pub fn xref(&self) -> &XrefIndex {
        &self.xref
    }

    pub fn xref_mut(&mut self) -> &mut XrefIndex {
        &mut self.xref
    }

    // ===== module lookup =====

    /// Resolves `name`/`revision` against the loaded-module cache, per the
    /// cache-scan step of the load algorithm: (a) an exact revision match
    /// always wins; (b) with no revision requested, the entry flagged
    /// latest-revision is returned; (c) unless `require_implemented` is set
    /// and some other, possibly older, entry is the one actually
    /// implemented, in which case that one is returned instead so a caller
    /// asking for "whichever revision is implemented" isn't handed a
    /// newer, merely-imported revision.
    fn find_module_key(&self, name: &str, revision: Option<&str>, require_implemented: bool) -> Option<ModuleKey> {
        if let Some(rev) = revision {
            return self
                .modules
                .iter()
                .find(|(_, m)| m.name == name && m.revision.as_deref() == Some(rev) && !m.disabled)
                .map(|(k, _)| k);
        }

        if require_implemented {
            if let Some(key) = self
                .modules
                .iter()
                .find(|(_, m)| m.name == name && m.implemented && !m.disabled)
                .map(|(k, _)| k)
            {
                return Some(key);
            }
        }

        self.modules
            .iter()
            .find(|(_, m)| m.name == name && m.latest_revision && !m.disabled)
            .map(|(k, _)| k)
            .or_else(|| {
                self.modules
                    .iter()
                    .filter(|(_, m)| m.name == name && !m.disabled)
                    .max_by_key(|(_, m)| m.revision.clone())
                    .map(|(k, _)| k)
            })
    }

    /// Like [`Context::find_module_key`], but also considers disabled
    /// entries, so `load_module`'s cache-scan step can find a disabled
    /// module and reactivate it rather than treating it as unloaded and
    /// trying to fetch a fresh copy from the source chain.
    fn find_module_key_any(&self, name: &str, revision: Option<&str>) -> Option<(ModuleKey, bool)> {
        if let Some(rev) = revision {
            return self
                .modules
                .iter()
                .find(|(_, m)| m.name == name && m.revision.as_deref() == Some(rev))
                .map(|(k, m)| (k, m.disabled));
        }
        self.modules
            .iter()
            .find(|(_, m)| m.name == name && m.latest_revision)
            .map(|(k, m)| (k, m.disabled))
            .or_else(|| {
                self.modules
                    .iter()
                    .filter(|(_, m)| m.name == name)
                    .max_by_key(|(_, m)| m.revision.clone())
                    .map(|(k, m)| (k, m.disabled))
            })
    }

    /// Looks up `name`, optionally pinned to an exact `revision`. When
    /// `revision` is `None` and `require_implemented` is set, prefers
    /// whichever same-named revision is actually implemented over the
    /// newest-flagged one (see [`Context::find_module_key`]).
    pub fn get_module(
        &self,
        name: &str,
        revision: Option<&str>,
        require_implemented: bool,
    ) -> Option<SchemaModuleRef<'_>> {
        self.find_module_key(name, revision, require_implemented)
            .map(|key| SchemaModuleRef { context: self, key })
    }

    /// Shorthand for `get_module(name, None, true)`.
    pub fn get_module_implemented(&self, name: &str) -> Option<SchemaModuleRef<'_>> {
        self.get_module(name, None, true)
    }

    /// All loaded modules, optionally skipping the built-ins.
    pub fn modules(&self, skip_internal: bool) -> impl Iterator<Item = SchemaModuleRef<'_>> {
        self.modules
            .iter()
            .filter(move |(_, m)| !m.disabled && (!skip_internal || !m.internal))
            .map(move |(key, _)| SchemaModuleRef { context: self, key })
    }

    /// Modules that have been disabled but not removed.
    pub fn disabled_modules(&self) -> impl Iterator<Item = SchemaModuleRef<'_>> {
        self.modules
            .iter()
            .filter(|(_, m)| m.disabled)
            .map(move |(key, _)| SchemaModuleRef { context: self, key })
    }

    /// The number of preloaded built-in modules currently registered (6 with
    /// `ietf-yang-library`, 4 without).
    pub fn internal_modules_count(&self) -> usize {
        self.modules.values().filter(|m| m.internal).count()
    }

    /// Every schema node reachable from every loaded module, depth-first.
    pub fn traverse(&self) -> impl Iterator<Item = SchemaNodeRef<'_>> {
        self.modules(false).flat_map(|module| {
            let context = module.context;
            module
                .module()
                .root_nodes
                .clone()
                .into_iter()
                .flat_map(move |key| {
                    crate::iter::Traverse::new(SchemaNodeRef { context, key })
                })
        })
    }

    // ===== loading =====

    /// Resolves `name`/`revision`, per the five-step algorithm: (1) scan
    /// the cache of already-loaded modules, (2) try the external source or
    /// the search directories first depending on
    /// [`ContextFlags::PREFER_SEARCHDIRS`], (3) try the other one, (4) mark
    /// the requested `features` enabled, (5) record the load by bumping
    /// `module_set_id`.
    pub fn load_module(
        &mut self,
        name: &str,
        revision: Option<&str>,
        features: &[&str],
    ) -> Result<ModuleKey> {
        if let Some((key, disabled)) = self.find_module_key_any(name, revision) {
            if disabled {
                log::debug!("load_module('{name}', {revision:?}) found a disabled cache entry, reactivating it");
                let disabled_name = self.modules[key].name.clone();
                self.enable_module(&disabled_name)?;
            } else {
                log::trace!("load_module('{name}', {revision:?}) hit the cache");
            }
            self.enable_features(key, features)?;
            return Ok(key);
        }

        let prefer_searchdirs = self.flags.contains(ContextFlags::PREFER_SEARCHDIRS);
        let disable_searchdirs = self.flags.contains(ContextFlags::DISABLE_SEARCHDIRS);

        let source = std::mem::replace(&mut self.source, Box::new(NullSource));
        let result = (|| -> Result<Option<ModuleKey>> {
            let search_dirs = self.search_dirs.clone();
            if prefer_searchdirs && !disable_searchdirs {
                if let Some(key) = source.load_from_searchdirs(self, name, revision, &search_dirs)? {
                    return Ok(Some(key));
                }
                if let Some(key) = source.load_external(self, name, revision)? {
                    return Ok(Some(key));
                }
            } else {
                if let Some(key) = source.load_external(self, name, revision)? {
                    return Ok(Some(key));
                }
                if !disable_searchdirs {
                    if let Some(key) = source.load_from_searchdirs(self, name, revision, &search_dirs)? {
                        return Ok(Some(key));
                    }
                }
            }
            Ok(None)
        })();
        self.source = source;

        let key = result?.ok_or_else(|| {
            log::warn!("load_module('{name}', {revision:?}) found nothing in any source");
            Error::invalid(format!("module '{name}' could not be found"))
        })?;
        log::debug!("loaded module '{name}' ({revision:?})");
        self.recompute_latest_revision(name);

        self.enable_features(key, features)?;
        self.apply_module_patches(key)?;
        self.sync_module_xrefs(key);
        self.bump_module_set_id();
        Ok(key)
    }

    fn enable_features(&mut self, key: ModuleKey, features: &[&str]) -> Result<()> {
        if features.is_empty() {
            return Ok(());
        }
        let module = &mut self.modules[key];
        if features == ["*"] {
            for f in &mut module.features {
                f.enabled = true;
            }
            return Ok(());
        }
        for name in features {
            match module.feature_mut(name) {
                Some(f) => f.enabled = true,
                None => {
                    return Err(Error::invalid(format!(
                        "module '{}' has no feature '{}'",
                        module.name, name
                    )))
                }
            }
        }
        Ok(())
    }

    /// Directly installs a fully-built module (used by built-ins and by
    /// tests that bypass `SchemaSource`).
    pub fn install(&mut self, module: Module) -> ModuleKey {
        log::debug!("installing module '{}'", module.name);
        let name = module.name.clone();
        let key = self.modules.insert(module);
        self.recompute_latest_revision(&name);
        self.bump_module_set_id();
        key
    }

    /// Flags whichever non-disabled entry named `name` has the newest
    /// revision (`None` sorting before every dated revision) as
    /// latest-revision, and clears the flag on every other same-named
    /// entry. Called after every insertion so `find_module_key`'s
    /// no-revision-requested lookup has exactly one candidate to pick.
    fn recompute_latest_revision(&mut self, name: &str) {
        let latest = self
            .modules
            .iter()
            .filter(|(_, m)| m.name == name && !m.disabled)
            .max_by_key(|(_, m)| m.revision.clone())
            .map(|(k, _)| k);
        for (key, module) in self.modules.iter_mut() {
            if module.name == name {
                module.latest_revision = Some(key) == latest;
            }
        }
    }

    /// Every schema node reachable from `key`'s `root_nodes`, plus the nodes
    /// contributed by `key`'s own augments (which hang off a foreign
    /// module's tree rather than `key`'s `root_nodes`), depth-first. Used to
    /// find the set of nodes "owned" by a module for cross-reference
    /// bookkeeping (building/tearing down leafref back-edges, computing
    /// which back-edges must disappear when the module is disabled/removed)
    /// and for freeing a removed module's nodes.
    fn collect_module_nodes(&self, key: ModuleKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeKey> = self.modules[key].root_nodes.clone();
        for augment in &self.modules[key].augments {
            stack.extend(augment.nodes.iter().copied());
        }
        while let Some(node) = stack.pop() {
            out.push(node);
            if let Some(n) = self.nodes.get(node) {
                stack.extend(n.children.iter().copied());
            }
        }
        out
    }

    /// Resolves a `/module:segment/segment/...` schema path (the format
    /// [`crate::utils::join_schema_path`] builds) to the node it names, by
    /// walking children from the named module's root nodes.
    fn resolve_schema_path(&self, path: &str) -> Option<NodeKey> {
        let trimmed = path.strip_prefix('/')?;
        let mut segments = trimmed.split('/');
        let (module_name, first_name) = segments.next()?.split_once(':')?;
        let module_key = self.find_module_key(module_name, None, false)?;
        let mut current = self.modules[module_key]
            .root_nodes
            .iter()
            .copied()
            .find(|&k| self.nodes[k].name == first_name)?;
        for seg in segments {
            current = self.nodes[current]
                .children
                .iter()
                .copied()
                .find(|&k| self.nodes[k].name == seg)?;
        }
        Some(current)
    }

    /// Applies every deviation/augment `key` contributes to the rest of the
    /// schema graph: a `not-supported` deviation detaches its target node
    /// (recorded so teardown can restore it); an augment attaches its nodes
    /// as children of its target.
    fn apply_module_patches(&mut self, key: ModuleKey) -> Result<()> {
        let deviations = self.modules[key].deviations.clone();
        for deviation in &deviations {
            if deviation.kind != DeviationKind::NotSupported {
                continue;
            }
            self.detach_deviation_target(key, deviation)?;
        }

        let augments = self.modules[key].augments.clone();
        for augment in &augments {
            self.apply_augment(augment)?;
        }
        Ok(())
    }

    /// Undoes every deviation/augment `key` contributes: reinserts each
    /// `not-supported` target where it was, and detaches each augment's
    /// nodes from their target.
    fn teardown_module_patches(&mut self, key: ModuleKey) {
        if let Some(detached) = self.deviation_detached.remove(&key) {
            for entry in detached {
                match entry.parent {
                    Some(parent) => {
                        let children = &mut self.nodes[parent].children;
                        let at = entry.index.min(children.len());
                        children.insert(at, entry.node);
                    }
                    None => {
                        let roots = &mut self.modules[entry.owning_module].root_nodes;
                        let at = entry.index.min(roots.len());
                        roots.insert(at, entry.node);
                    }
                }
                self.nodes[entry.node].parent = entry.parent;
            }
        }

        let augments = self.modules[key].augments.clone();
        for augment in &augments {
            self.teardown_augment(augment);
        }
    }

    fn detach_deviation_target(&mut self, owner: ModuleKey, deviation: &Deviation) -> Result<()> {
        let target = self.resolve_schema_path(&deviation.target_path).ok_or_else(|| {
            Error::invalid_schema_path("deviation target not found", deviation.target_path.clone())
        })?;
        let parent = self.nodes[target].parent;
        let owning_module = self.nodes[target].module;
        let index = match parent {
            Some(p) => self.nodes[p].children.iter().position(|&k| k == target).unwrap_or(0),
            None => self.modules[owning_module]
                .root_nodes
                .iter()
                .position(|&k| k == target)
                .unwrap_or(0),
        };

        match parent {
            Some(p) => self.nodes[p].children.retain(|&k| k != target),
            None => self.modules[owning_module].root_nodes.retain(|&k| k != target),
        }

        self.deviation_detached.entry(owner).or_default().push(DetachedNode {
            node: target,
            parent,
            owning_module,
            index,
        });
        Ok(())
    }

    fn apply_augment(&mut self, augment: &Augment) -> Result<()> {
        let target = self.resolve_schema_path(&augment.target_path).ok_or_else(|| {
            Error::invalid_schema_path("augment target not found", augment.target_path.clone())
        })?;
        for &node in &augment.nodes {
            let name = self.nodes[node].name.clone();
            if self.nodes[target].children.iter().any(|&c| self.nodes[c].name == name) {
                return Err(Error::invalid_schema_path(
                    format!("augment node '{name}' collides with an existing child"),
                    self.node_path(target),
                ));
            }
            self.attach_child(target, node);
        }
        Ok(())
    }

    fn teardown_augment(&mut self, augment: &Augment) {
        if let Some(target) = self.resolve_schema_path(&augment.target_path) {
            self.nodes[target].children.retain(|&k| !augment.nodes.contains(&k));
        }
    }

    /// Scans `key`'s identities, features and leafref-typed leaves/leaf-lists
    /// and records the corresponding back-edges in the cross-reference
    /// index. Callers that assemble a module's schema tree directly
    /// (built-ins, `SchemaSource` implementations, tests) call this once the
    /// module's `root_nodes` are fully populated; `load_module`,
    /// `enable_module` call it automatically for modules they bring into an
    /// implemented state.
    pub fn sync_module_xrefs(&mut self, key: ModuleKey) {
        let identities = self.modules[key].identities.clone();
        for identity in &identities {
            let derived = IdentityRef {
                module: key,
                name: identity.name.clone(),
            };
            for base in &identity.bases {
                self.xref.add_identity_edge(base.clone(), derived.clone());
            }
        }

        let features = self.modules[key].features.clone();
        for feature in &features {
            let dependent = IdentityRef {
                module: key,
                name: feature.name.clone(),
            };
            for dep in &feature.if_features {
                self.xref.add_feature_edge(dep.clone(), dependent.clone());
            }
        }

        for node_key in self.collect_module_nodes(key) {
            let target = match &self.nodes[node_key].kind {
                NodeKind::Leaf(info) => info.leafref_target,
                NodeKind::LeafList(info) => info.leafref_target,
                _ => None,
            };
            if let Some(target) = target {
                self.xref.add_leafref_edge(target, node_key);
            }
        }
    }

    // ===== disable / enable / remove =====

    /// Disables `name` and every module that transitively depends on it
    /// (importers, plus, through [`Context::dependency_closure`]'s
    /// import-only cascade, modules left with nothing else to implement
    /// them), computed as a fixpoint over the import graph. For each module
    /// in the closure, its contributed deviations/augments are torn down
    /// before it is marked disabled. Internal modules cannot be disabled.
    /// Disabling an already-disabled module is a no-op success.
    pub fn disable_module(&mut self, name: &str) -> Result<()> {
        let (root, already_disabled) = self
            .find_module_key_any(name, None)
            .ok_or_else(|| Error::invalid(format!("module '{name}' is not loaded")))?;
        if already_disabled {
            log::trace!("disable_module('{name}') is already disabled, no-op");
            return Ok(());
        }
        if self.modules[root].internal {
            return Err(Error::invalid(format!("module '{name}' is internal and cannot be disabled")));
        }

        let closure = self.dependency_closure(root);
        log::debug!(
            "disabling module '{name}' ({} module(s) in its dependency closure)",
            closure.len()
        );
        for key in &closure {
            self.teardown_module_patches(*key);
            let owned_nodes: std::collections::HashSet<NodeKey> =
                self.collect_module_nodes(*key).into_iter().collect();
            self.xref.remove_module_edges(*key, &owned_nodes);
            self.modules[*key].disabled = true;
        }
        self.bump_module_set_id();
        Ok(())
    }

    /// Enables `name`: seeds a set with `name` plus (recursively) every
    /// module it imports that is currently disabled, then iterates to
    /// fixpoint — a disabled module joins the set once all of its imports
    /// are either already enabled or already in the set, and at least one of
    /// its imports is in the set. Back-edges are rebuilt for every module
    /// that ends up enabled, and deviations/augments are re-applied for
    /// whichever of those are implemented.
    pub fn enable_module(&mut self, name: &str) -> Result<()> {
        let root = self
            .modules
            .iter()
            .find(|(_, m)| m.name == name && m.disabled)
            .map(|(k, _)| k)
            .ok_or_else(|| Error::invalid(format!("module '{name}' is not disabled")))?;
        log::debug!("enabling module '{name}'");

        let mut seed = vec![root];
        let mut i = 0;
        while i < seed.len() {
            let key = seed[i];
            i += 1;
            for imp in self.modules[key].imports.clone() {
                if self.modules[imp.module].disabled && !seed.contains(&imp.module) {
                    seed.push(imp.module);
                }
            }
        }

        loop {
            let mut grew = false;
            let candidates: Vec<ModuleKey> = self.modules.keys().collect();
            for key in candidates {
                if seed.contains(&key) || !self.modules[key].disabled {
                    continue;
                }
                let imports = &self.modules[key].imports;
                let any_in_seed = imports.iter().any(|imp| seed.contains(&imp.module));
                let all_resolved = imports
                    .iter()
                    .all(|imp| seed.contains(&imp.module) || !self.modules[imp.module].disabled);
                if any_in_seed && all_resolved {
                    seed.push(key);
                    grew = true;
                }
            }
            if !grew {
                break;
            }
        }

        for key in &seed {
            self.modules[*key].disabled = false;
        }
        for key in &seed {
            if self.modules[*key].implemented {
                if let Err(err) = self.apply_module_patches(*key) {
                    log::warn!(
                        "module '{}' could not reapply its deviations/augments on enable: {err}",
                        self.modules[*key].name
                    );
                }
            }
            self.sync_module_xrefs(*key);
        }
        self.bump_module_set_id();
        Ok(())
    }

    /// Removes `name` and its transitive dependents from the context
    /// entirely, freeing their schema nodes. Internal modules cannot be
    /// removed.
    pub fn remove_module(&mut self, name: &str) -> Result<()> {
        let root = self
            .find_module_key(name, None, false)
            .ok_or_else(|| Error::invalid(format!("module '{name}' is not loaded")))?;
        if self.modules[root].internal {
            return Err(Error::invalid(format!("module '{name}' is internal and cannot be removed")));
        }

        let closure = self.dependency_closure(root);
        log::debug!(
            "removing module '{name}' ({} module(s) in its dependency closure)",
            closure.len()
        );
        let mut removed_names = Vec::new();
        for key in &closure {
            self.teardown_module_patches(*key);
            let owned_nodes: std::collections::HashSet<NodeKey> =
                self.collect_module_nodes(*key).into_iter().collect();
            self.xref.remove_module_edges(*key, &owned_nodes);
            if let Some(module) = self.modules.remove(*key) {
                removed_names.push(module.name.clone());
                for node in module.root_nodes {
                    self.remove_node_subtree(node);
                }
                for augment in module.augments {
                    for node in augment.nodes {
                        self.remove_node_subtree(node);
                    }
                }
            }
        }
        for removed_name in &removed_names {
            self.recompute_latest_revision(removed_name);
        }
        self.bump_module_set_id();
        Ok(())
    }

    fn remove_node_subtree(&mut self, root: NodeKey) {
        let children = self
            .nodes
            .get(root)
            .map(|n| n.children.clone())
            .unwrap_or_default();
        for child in children {
            self.remove_node_subtree(child);
        }
        self.nodes.remove(root);
    }

    /// Computes the set of modules that must be disabled/removed alongside
    /// `root`: `root` itself; every non-disabled module that imports any
    /// closure member (cascading *up* through importers); and every
    /// import-only module imported by a closure member whose every importer
    /// is itself now in the closure (cascading *down* through now-unneeded
    /// imports). A module still imported by something outside the closure
    /// stays out of it — removing an import-only module still imported
    /// elsewhere is a no-op for that module.
    fn dependency_closure(&self, root: ModuleKey) -> Vec<ModuleKey> {
        let mut closure = vec![root];
        loop {
            let mut grew = false;

            let candidates: Vec<ModuleKey> = self.modules.keys().collect();
            for key in candidates {
                if closure.contains(&key) {
                    continue;
                }
                let depends = self.modules[key]
                    .imports
                    .iter()
                    .any(|imp| closure.contains(&imp.module));
                if depends {
                    closure.push(key);
                    grew = true;
                }
            }

            let imported: Vec<ModuleKey> = closure
                .iter()
                .flat_map(|k| self.modules[*k].imports.iter().map(|imp| imp.module))
                .collect();
            for m in imported {
                if closure.contains(&m) || self.modules[m].implemented {
                    continue;
                }
                let all_importers_in_closure = self
                    .modules
                    .iter()
                    .filter(|(_, module)| module.imports.iter().any(|imp| imp.module == m))
                    .all(|(k, _)| closure.contains(&k));
                if all_importers_in_closure {
                    closure.push(m);
                    grew = true;
                }
            }

            if !grew {
                break;
            }
        }
        closure
    }

    /// Cross-reference accessors backed by the C3 index.
    pub fn identity_derived(&self, module: ModuleKey, name: &str) -> &[crate::schema::IdentityRef] {
        let key = crate::schema::IdentityRef {
            module,
            name: name.to_string(),
        };
        self.xref.identity_derived(&key)
    }

    pub fn feature_dependents(&self, module: ModuleKey, name: &str) -> &[crate::schema::IdentityRef] {
        let key = crate::schema::IdentityRef {
            module,
            name: name.to_string(),
        };
        self.xref.feature_dependents(&key)
    }

    pub fn leafref_backlinks(&self, target: NodeKey) -> &[NodeKey] {
        self.xref.leafref_backlinks(target)
    }

    /// A data-tree snapshot of `/ietf-yang-library:yang-library`,
    /// populated from the currently loaded modules: `content-id` is set to
    /// the current `module_set_id`, and one `module` entry is emitted per
    /// implemented, non-disabled module (per RFC 8525's `module-set`
    /// container shape).
    pub fn info(&self) -> Result<crate::data::DataTree<'_>> {
        let yanglib_key = self
            .get_module("ietf-yang-library", None, false)
            .ok_or_else(|| Error::invalid("ietf-yang-library was not loaded (NO_YANG_LIBRARY?)"))?
            .key;
        let yanglib_module = &self.modules[yanglib_key];
        let root_schema = *yanglib_module
            .root_nodes
            .first()
            .ok_or_else(|| Error::internal("ietf-yang-library has no root schema node"))?;
        let root_children = self
            .nodes
            .get(root_schema)
            .map(|n| n.children.clone())
            .ok_or_else(|| Error::internal("ietf-yang-library has no children"))?;
        let content_id_schema = *root_children
            .first()
            .ok_or_else(|| Error::internal("ietf-yang-library has no content-id child"))?;
        let module_list_schema = *root_children
            .get(1)
            .ok_or_else(|| Error::internal("ietf-yang-library has no module list child"))?;
        let module_list_children = self.nodes[module_list_schema].children.clone();
        let name_schema = module_list_children
            .first()
            .copied()
            .ok_or_else(|| Error::internal("yang-library module list has no name child"))?;
        let revision_schema = module_list_children
            .get(1)
            .copied()
            .ok_or_else(|| Error::internal("yang-library module list has no revision child"))?;
        let namespace_schema = module_list_children
            .get(2)
            .copied()
            .ok_or_else(|| Error::internal("yang-library module list has no namespace child"))?;

        let mut tree = crate::data::DataTree::new(self);
        let root = tree.new_inner(None, root_schema)?;
        tree.new_term(
            Some(root),
            content_id_schema,
            crate::value::Value::String(self.module_set_id().to_string()),
        )?;

        for module_ref in self.modules(false) {
            let module = module_ref.module();
            if !module.implemented {
                continue;
            }
            let entry = tree.new_inner(Some(root), module_list_schema)?;
            tree.new_term(
                Some(entry),
                name_schema,
                crate::value::Value::String(module.name.clone()),
            )?;
            if let Some(revision) = &module.revision {
                tree.new_term(
                    Some(entry),
                    revision_schema,
                    crate::value::Value::String(revision.clone()),
                )?;
            }
            tree.new_term(
                Some(entry),
                namespace_schema,
                crate::value::Value::String(module.namespace.clone()),
            )?;
        }

        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Identity, ModuleBuilder};

    #[test]
    fn new_preloads_six_internal_modules() {
        let ctx = Context::new(ContextFlags::empty()).unwrap();
        assert_eq!(ctx.internal_modules_count(), 6);
    }

    #[test]
    fn no_yang_library_preloads_four_internal_modules() {
        let ctx = Context::new(ContextFlags::NO_YANG_LIBRARY).unwrap();
        assert_eq!(ctx.internal_modules_count(), 4);
        assert!(ctx.get_module("ietf-yang-library", None, false).is_none());
    }

    #[test]
    fn set_searchdir_canonicalizes_and_dedupes() {
        let tmp = std::env::temp_dir();
        let a = tmp.join("yang-ctx-context-test-a");
        let _ = std::fs::create_dir_all(&a);
        let roundabout = a.join("..").join("yang-ctx-context-test-a");

        let mut ctx = Context::new(ContextFlags::DISABLE_SEARCHDIRS).unwrap();
        ctx.set_searchdir(&a).unwrap();
        ctx.set_searchdir(&roundabout).unwrap();
        assert_eq!(ctx.get_searchdirs().len(), 1);

        let _ = std::fs::remove_dir(&a);
    }

    #[test]
    fn load_module_twice_returns_same_instance() {
        let mut ctx = Context::new(ContextFlags::NO_YANG_LIBRARY).unwrap();
        let first = ctx.load_module("yang", None, &[]).unwrap();
        let second = ctx.load_module("yang", None, &[]).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn info_reports_content_id_and_loaded_module_revision() {
        let ctx = Context::new(ContextFlags::empty()).unwrap();
        let tree = ctx.info().unwrap();

        let content_id = tree.find_path(&["yang-library", "content-id"]).unwrap();
        assert_eq!(
            content_id.value(),
            Some(&crate::value::Value::String(ctx.module_set_id().to_string()))
        );

        let found = ctx
            .modules(false)
            .filter(|m| m.module().name == "ietf-yang-types")
            .count();
        assert_eq!(found, 1);
    }

    fn derived_test_module(ctx: &mut Context, name: &str, base_module: ModuleKey) -> ModuleKey {
        let mut module = ModuleBuilder::new(name, format!("urn:test:{name}"), name).build();
        module.identities.push(Identity {
            name: "A".to_string(),
            bases: vec![IdentityRef {
                module: base_module,
                name: "B".to_string(),
            }],
            description: None,
            reference: None,
        });
        ctx.install(module)
    }

    #[test]
    fn disable_then_enable_restores_identity_derived_set() {
        let mut ctx = Context::new(ContextFlags::NO_YANG_LIBRARY).unwrap();
        let mut base = ModuleBuilder::new("base", "urn:test:base", "base").build();
        base.identities.push(Identity {
            name: "B".to_string(),
            bases: vec![],
            description: None,
            reference: None,
        });
        let base_key = ctx.install(base);
        let derived_key = derived_test_module(&mut ctx, "derived", base_key);
        ctx.sync_module_xrefs(derived_key);

        let derived_ref = IdentityRef {
            module: derived_key,
            name: "A".to_string(),
        };
        assert_eq!(ctx.identity_derived(base_key, "B"), &[derived_ref.clone()]);

        let before_id = ctx.module_set_id();
        ctx.disable_module("derived").unwrap();
        assert!(ctx.identity_derived(base_key, "B").is_empty());

        ctx.enable_module("derived").unwrap();
        assert_eq!(ctx.identity_derived(base_key, "B"), &[derived_ref]);
        assert_eq!(ctx.module_set_id(), before_id + 2);
    }

    #[test]
    fn remove_leaves_unrelated_import_only_module_alone() {
        let mut ctx = Context::new(ContextFlags::NO_YANG_LIBRARY).unwrap();
        let shared = ctx.install(ModuleBuilder::new("shared", "urn:test:shared", "shared").build());
        ctx.module_mut(shared).implemented = false;
        let mut user = ModuleBuilder::new("user", "urn:test:user", "user").build();
        user.imports.push(crate::schema::Import {
            module: shared,
            prefix: "shared".to_string(),
            bound_revision: None,
        });
        ctx.install(user);

        let mut other = ModuleBuilder::new("other", "urn:test:other", "other").build();
        other.imports.push(crate::schema::Import {
            module: shared,
            prefix: "shared".to_string(),
            bound_revision: None,
        });
        ctx.install(other);

        ctx.remove_module("user").unwrap();
        assert!(ctx.get_module("shared", None, false).is_some());
        assert!(ctx.get_module("other", None, false).is_some());
    }

    #[test]
    fn load_module_reactivates_a_disabled_cache_entry_instead_of_refetching() {
        let mut ctx = Context::new(ContextFlags::NO_YANG_LIBRARY).unwrap();
        let key = ctx.install(ModuleBuilder::new("shared", "urn:test:shared", "shared").build());
        ctx.disable_module("shared").unwrap();
        assert!(ctx.get_module("shared", None, false).is_none());

        let found = ctx.load_module("shared", None, &[]).unwrap();
        assert_eq!(found, key);
        assert!(ctx.get_module("shared", None, false).is_some());
    }

    #[test]
    fn disabling_an_already_disabled_module_is_a_no_op_success() {
        let mut ctx = Context::new(ContextFlags::NO_YANG_LIBRARY).unwrap();
        ctx.install(ModuleBuilder::new("shared", "urn:test:shared", "shared").build());
        ctx.disable_module("shared").unwrap();
        let id_after_first_disable = ctx.module_set_id();

        ctx.disable_module("shared").unwrap();
        assert_eq!(ctx.module_set_id(), id_after_first_disable);
        assert!(ctx
            .disabled_modules()
            .any(|m| m.module().name == "shared"));
    }
}
