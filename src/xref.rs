//
// Copyright (c) The yang-ctx Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! The cross-reference index: reverse-edge side-tables kept alongside the
//! schema arenas.
//!
//! Every forward edge in the schema graph (an identity's `bases`, a
//! feature's `if_features`, a leaf's `leafref_target`) has a matching
//! reverse edge stored here rather than as a field on the target, per design
//! note "Back-edges as side-tables, not struct fields": the target doesn't
//! know who points at it until something asks, and the answer can change
//! independently of the target's own definition as modules are loaded,
//! enabled or disabled.
//!
//! The invariant maintained across every registry mutation is that the
//! forward reference count equals the back-edge count: every entry added to
//! `identity_derived`/`feature_dependents`/`leafref_backlinks` corresponds
//! to exactly one forward edge, and is removed when that forward edge is
//! torn down (module disabled or removed).

use std::collections::HashMap;

use crate::schema::{IdentityRef, NodeKey};

/// Reverse-edge side-tables for the schema graph.
#[derive(Debug, Default)]
pub struct XrefIndex {
    /// A base identity -> the identities that declare it as a base, i.e.
    /// the reverse of `Identity::bases`.
    identity_derived: HashMap<IdentityRef, Vec<IdentityRef>>,
    /// A feature -> the features that name it in their `if_features`, i.e.
    /// the reverse of `Feature::if_features`.
    feature_dependents: HashMap<IdentityRef, Vec<IdentityRef>>,
    /// A leafref target node -> the leaf/leaf-list nodes whose
    /// `leafref_target` resolves to it.
    leafref_backlinks: HashMap<NodeKey, Vec<NodeKey>>,
}

impl XrefIndex {
    pub fn new() -> XrefIndex {
        XrefIndex::default()
    }

    /// Records that `derived` declares `base` as one of its bases.
    pub fn add_identity_edge(&mut self, base: IdentityRef, derived: IdentityRef) {
        let entry = self.identity_derived.entry(base).or_default();
        if !entry.contains(&derived) {
            entry.push(derived);
        }
    }

    pub fn remove_identity_edge(&mut self, base: &IdentityRef, derived: &IdentityRef) {
        if let Some(entry) = self.identity_derived.get_mut(base) {
            entry.retain(|d| d != derived);
            if entry.is_empty() {
                self.identity_derived.remove(base);
            }
        }
    }

    /// The identities that directly derive from `base` (not transitive).
    pub fn identity_derived(&self, base: &IdentityRef) -> &[IdentityRef] {
        self.identity_derived
            .get(base)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Records that `dependent` names `feature` in one of its `if-feature`
    /// substatements.
    pub fn add_feature_edge(&mut self, feature: IdentityRef, dependent: IdentityRef) {
        let entry = self.feature_dependents.entry(feature).or_default();
        if !entry.contains(&dependent) {
            entry.push(dependent);
        }
    }

    pub fn remove_feature_edge(&mut self, feature: &IdentityRef, dependent: &IdentityRef) {
        if let Some(entry) = self.feature_dependents.get_mut(feature) {
            entry.retain(|d| d != dependent);
            if entry.is_empty() {
                self.feature_dependents.remove(feature);
            }
        }
    }

    /// The features/modules whose `if-feature` expressions mention
    /// `feature` directly.
    pub fn feature_dependents(&self, feature: &IdentityRef) -> &[IdentityRef] {
        self.feature_dependents
            .get(feature)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Records that `leaf` is a leafref resolving to `target`.
    pub fn add_leafref_edge(&mut self, target: NodeKey, leaf: NodeKey) {
        let entry = self.leafref_backlinks.entry(target).or_default();
        if !entry.contains(&leaf) {
            entry.push(leaf);
        }
    }

    pub fn remove_leafref_edge(&mut self, target: NodeKey, leaf: NodeKey) {
        if let Some(entry) = self.leafref_backlinks.get_mut(&target) {
            entry.retain(|l| *l != leaf);
            if entry.is_empty() {
                self.leafref_backlinks.remove(&target);
            }
        }
    }

    /// The leaf/leaf-list nodes whose `leafref` resolves to `target`.
    pub fn leafref_backlinks(&self, target: NodeKey) -> &[NodeKey] {
        self.leafref_backlinks
            .get(&target)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Drops every back-edge whose forward edge lived in the module being
    /// disabled or removed: `owner`'s identities/features as bases or
    /// dependents, and every leafref edge touching one of `owner_nodes`
    /// (either as the leaf that declared the leafref, or as the target being
    /// pointed at). Called by `Context::disable_module`/`remove_module` to
    /// keep the forward/back-edge counts in lockstep.
    pub fn remove_module_edges(
        &mut self,
        owner: crate::schema::ModuleKey,
        owner_nodes: &std::collections::HashSet<NodeKey>,
    ) {
        self.identity_derived.retain(|base, derived| {
            derived.retain(|d| d.module != owner);
            base.module != owner && !derived.is_empty()
        });
        self.feature_dependents.retain(|feature, dependents| {
            dependents.retain(|d| d.module != owner);
            feature.module != owner && !dependents.is_empty()
        });
        self.leafref_backlinks.retain(|target, leaves| {
            leaves.retain(|l| !owner_nodes.contains(l));
            !owner_nodes.contains(target) && !leaves.is_empty()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn iref(module: crate::schema::ModuleKey, name: &str) -> IdentityRef {
        IdentityRef {
            module,
            name: name.to_string(),
        }
    }

    #[test]
    fn identity_edge_round_trips() {
        let mut modules: SlotMap<crate::schema::ModuleKey, ()> = SlotMap::with_key();
        let m = modules.insert(());
        let base = iref(m, "base");
        let derived = iref(m, "derived");

        let mut xref = XrefIndex::new();
        xref.add_identity_edge(base.clone(), derived.clone());
        assert_eq!(xref.identity_derived(&base), &[derived.clone()]);

        xref.remove_identity_edge(&base, &derived);
        assert!(xref.identity_derived(&base).is_empty());
    }

    #[test]
    fn leafref_backlinks_track_multiple_leaves() {
        let mut nodes: SlotMap<NodeKey, ()> = SlotMap::with_key();
        let target = nodes.insert(());
        let leaf_a = nodes.insert(());
        let leaf_b = nodes.insert(());

        let mut xref = XrefIndex::new();
        xref.add_leafref_edge(target, leaf_a);
        xref.add_leafref_edge(target, leaf_b);
        assert_eq!(xref.leafref_backlinks(target).len(), 2);

        xref.remove_leafref_edge(target, leaf_a);
        assert_eq!(xref.leafref_backlinks(target), &[leaf_b]);
    }

    #[test]
    fn remove_module_edges_drops_both_directions() {
        let mut modules: SlotMap<crate::schema::ModuleKey, ()> = SlotMap::with_key();
        let owner = modules.insert(());
        let other = modules.insert(());
        let base = iref(owner, "base");
        let derived = iref(other, "derived");

        let mut xref = XrefIndex::new();
        xref.add_identity_edge(base.clone(), derived.clone());
        xref.remove_module_edges(owner, &std::collections::HashSet::new());
        assert!(xref.identity_derived(&base).is_empty());
    }

    #[test]
    fn remove_module_edges_drops_leafref_backlinks_for_owned_nodes() {
        let mut modules: SlotMap<crate::schema::ModuleKey, ()> = SlotMap::with_key();
        let owner = modules.insert(());
        let mut nodes: SlotMap<NodeKey, ()> = SlotMap::with_key();
        let target = nodes.insert(());
        let leaf = nodes.insert(());

        let mut xref = XrefIndex::new();
        xref.add_leafref_edge(target, leaf);
        assert_eq!(xref.leafref_backlinks(target), &[leaf]);

        let mut owned = std::collections::HashSet::new();
        owned.insert(leaf);
        xref.remove_module_edges(owner, &owned);
        assert!(xref.leafref_backlinks(target).is_empty());
    }
}
