// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Language backend interface and registry.
//!
//! The dispatcher invokes a fixed callback set once a definition is
//! fully resolved; backends walk the resolved entities and emit source
//! text. The core never reads backend output and backends never mutate
//! core state. Backend modules are registered as trait objects and
//! selected per `--lang`.

pub mod c;

use crate::core::error::SdlError;
use crate::core::model::{Aggregate, CommentMember, Constant, Entry, Enumeration, Item, Member};
use crate::core::registry::TypeRegistry;

pub type BackendResult = Result<(), SdlError>;

/// Read-only view handed to every backend callback.
pub struct EmitContext<'a> {
    pub registry: &'a TypeRegistry,
    pub module_name: &'a str,
    pub ident: Option<&'a str>,
    pub source: &'a str,
}

/// Emit-time options shared by all backends.
#[derive(Debug, Clone, Default)]
pub struct EmitSettings {
    pub suppress_prefix: bool,
    pub suppress_tag: bool,
    pub comments: bool,
    pub header: bool,
    pub word_size: i64,
}

/// One target-language emitter.
pub trait LanguageBackend {
    fn name(&self) -> &str;

    fn module_begin(&mut self, ctx: &EmitContext<'_>) -> BackendResult;
    fn module_end(&mut self, ctx: &EmitContext<'_>) -> BackendResult;
    fn item(&mut self, ctx: &EmitContext<'_>, item: &Item) -> BackendResult;
    fn constant(&mut self, ctx: &EmitContext<'_>, constant: &Constant) -> BackendResult;
    fn enumeration(&mut self, ctx: &EmitContext<'_>, en: &Enumeration) -> BackendResult;
    fn aggregate_begin(&mut self, ctx: &EmitContext<'_>, aggr: &Aggregate) -> BackendResult;
    fn aggregate_end(&mut self, ctx: &EmitContext<'_>, aggr: &Aggregate) -> BackendResult;
    /// Called once per item or comment member, twice (open/close) per
    /// subaggregate member.
    fn member(
        &mut self,
        ctx: &EmitContext<'_>,
        member: &Member,
        depth: u32,
        closing: bool,
    ) -> BackendResult;
    fn comment(&mut self, ctx: &EmitContext<'_>, comment: &CommentMember) -> BackendResult;
    fn literal_line(&mut self, ctx: &EmitContext<'_>, line: &str) -> BackendResult;
    fn entry(&mut self, ctx: &EmitContext<'_>, entry: &Entry) -> BackendResult;
}

/// The set of registered backends, indexed in `--lang` order. The
/// per-language enable vector of the conditional machinery uses the
/// same indices.
#[derive(Default)]
pub struct BackendSet {
    backends: Vec<Box<dyn LanguageBackend>>,
}

impl BackendSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, backend: Box<dyn LanguageBackend>) {
        self.backends.push(backend);
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.backends.iter().map(|b| b.name().to_string()).collect()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.backends
            .iter()
            .position(|b| b.name().eq_ignore_ascii_case(name))
    }

    /// Invoke `f` on every backend whose enable flag is set, stopping at
    /// the first error.
    pub fn for_each_enabled<F>(&mut self, enabled: &[bool], mut f: F) -> BackendResult
    where
        F: FnMut(&mut dyn LanguageBackend) -> BackendResult,
    {
        for (idx, backend) in self.backends.iter_mut().enumerate() {
            if enabled.get(idx).copied().unwrap_or(true) {
                f(backend.as_mut())?;
            }
        }
        Ok(())
    }
}

/// Walk a resolved aggregate through one backend: begin, every member in
/// source order (recursing into subaggregates), end.
pub fn emit_aggregate(
    backend: &mut dyn LanguageBackend,
    ctx: &EmitContext<'_>,
    aggr: &Aggregate,
) -> BackendResult {
    backend.aggregate_begin(ctx, aggr)?;
    emit_members(backend, ctx, &aggr.members, 1)?;
    backend.aggregate_end(ctx, aggr)
}

fn emit_members(
    backend: &mut dyn LanguageBackend,
    ctx: &EmitContext<'_>,
    members: &[Member],
    depth: u32,
) -> BackendResult {
    for member in members {
        match member {
            Member::Subaggregate(sub) => {
                backend.member(ctx, member, depth, false)?;
                emit_members(backend, ctx, &sub.members, depth + 1)?;
                backend.member(ctx, member, depth, true)?;
            }
            _ => backend.member(ctx, member, depth, false)?,
        }
    }
    Ok(())
}
