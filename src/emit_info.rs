//! Per-node emit side data.
//!
//! The AST is read-only after parsing, so everything the passes decide
//! about a node — its synthesized comment lists, whether its original text
//! range may still produce comments, the range kept for source maps — is
//! stored here, keyed by `NodeIndex`, never on the node itself.

use bitflags::bitflags;
use rustc_hash::FxHashMap;

use crate::ast::{NodeArena, NodeIndex, TextRange};
use crate::comments::SynthesizedComment;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct EmitFlags: u8 {
        /// The printer must not emit original-text comments for this node;
        /// synthesized comments are the only comment source.
        const NO_ORIGINAL_COMMENTS = 1 << 0;
        /// The node's displayed text range is invalid; only the separately
        /// stored source-map range remains meaningful.
        const RANGE_RESET = 1 << 1;
    }
}

/// Emit data for one node.
#[derive(Clone, Debug, Default)]
pub struct EmitInfo {
    pub flags: EmitFlags,
    pub leading: Vec<SynthesizedComment>,
    pub trailing: Vec<SynthesizedComment>,
    /// Original range preserved for debug-symbol mapping after the
    /// displayed range was neutralized.
    pub source_map_range: Option<TextRange>,
}

/// Side table of emit data keyed by node index.
#[derive(Debug, Default)]
pub struct EmitInfoTable {
    infos: FxHashMap<NodeIndex, EmitInfo>,
}

impl EmitInfoTable {
    pub fn new() -> EmitInfoTable {
        EmitInfoTable {
            infos: FxHashMap::default(),
        }
    }

    pub fn get(&self, node: NodeIndex) -> Option<&EmitInfo> {
        self.infos.get(&node)
    }

    fn entry(&mut self, node: NodeIndex) -> &mut EmitInfo {
        self.infos.entry(node).or_default()
    }

    pub fn flags(&self, node: NodeIndex) -> EmitFlags {
        self.get(node).map_or(EmitFlags::empty(), |i| i.flags)
    }

    pub fn add_flags(&mut self, node: NodeIndex, flags: EmitFlags) {
        self.entry(node).flags |= flags;
    }

    pub fn leading_comments(&self, node: NodeIndex) -> &[SynthesizedComment] {
        self.get(node).map_or(&[], |i| i.leading.as_slice())
    }

    pub fn trailing_comments(&self, node: NodeIndex) -> &[SynthesizedComment] {
        self.get(node).map_or(&[], |i| i.trailing.as_slice())
    }

    pub fn append_leading(&mut self, node: NodeIndex, comments: Vec<SynthesizedComment>) {
        if !comments.is_empty() {
            self.entry(node).leading.extend(comments);
        }
    }

    pub fn append_trailing(&mut self, node: NodeIndex, comments: Vec<SynthesizedComment>) {
        if !comments.is_empty() {
            self.entry(node).trailing.extend(comments);
        }
    }

    /// Move one node's synthesized comment lists onto another. Used by the
    /// post-pass to re-home comments from a replaced declaration onto its
    /// lowered form. The source is drained on the first move, so a
    /// declaration lowered into several statements (a multi-declarator
    /// export group) hands its comments to exactly one of them.
    pub fn move_comments(&mut self, from: NodeIndex, to: NodeIndex) {
        let Some(source) = self.infos.get_mut(&from) else {
            return;
        };
        if source.leading.is_empty() && source.trailing.is_empty() {
            return;
        }
        let leading = std::mem::take(&mut source.leading);
        let trailing = std::mem::take(&mut source.trailing);
        let target = self.entry(to);
        if target.leading.is_empty() {
            target.leading = leading;
        }
        if target.trailing.is_empty() {
            target.trailing = trailing;
        }
    }

    /// Neutralize a node's displayed text range so the emitter relies
    /// solely on synthesized comments, preserving the original range for
    /// source maps. Idempotent: a second call leaves the same state.
    pub fn neutralize_text_range(&mut self, node: NodeIndex, arena: &NodeArena) {
        let range = arena
            .base(node)
            .filter(|b| b.has_valid_range())
            .map(|b| TextRange::new(b.pos, b.end));
        let info = self.entry(node);
        info.flags |= EmitFlags::NO_ORIGINAL_COMMENTS | EmitFlags::RANGE_RESET;
        if info.source_map_range.is_none() {
            info.source_map_range = range;
        }
    }

    /// Move a node's emit data onto its rebuilt clone. Rebuilding a node
    /// (new statement list, replaced child) produces a fresh index; the
    /// comments synthesized for the original must follow it.
    pub fn transfer(&mut self, from: NodeIndex, to: NodeIndex) {
        if from == to {
            return;
        }
        if let Some(info) = self.infos.remove(&from) {
            self.infos.insert(to, info);
        }
    }

    /// Mark a node's original comments as suppressed without touching its
    /// displayed range. Used for the node categories whose range must stay
    /// valid until after the semantic rewrite.
    pub fn suppress_original_comments(&mut self, node: NodeIndex) {
        self.entry(node).flags |= EmitFlags::NO_ORIGINAL_COMMENTS;
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeIndex, &EmitInfo)> {
        self.infos.iter()
    }
}
