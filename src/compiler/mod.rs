// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Directive dispatcher.
//!
//! Entry points correspond one-to-one with source statements and are
//! invoked by the parser. Each checks the conditional processing gate,
//! applies or accumulates pending options, delegates to the layout
//! engine, and hands fully resolved entities to every enabled backend.

mod conditionals;
mod directives_aggregates;
mod directives_constants;
mod directives_entries;
mod directives_types;
pub mod cli;
pub mod options;
#[cfg(test)]
mod tests;

pub use directives_aggregates::MemberPayload;
pub use directives_types::SizeSpec;

use crate::core::conditional::ConditionalStack;
use crate::core::error::{Diagnostic, SdlError, SdlErrorKind, Status};
use crate::core::model::{
    Alignment, CommentMember, Constant, ConstantValue, Entry, Member, MemberItem, Parameter,
    SourceLoc, Subaggregate,
};
use crate::core::registry::TypeRegistry;
use crate::core::symbols::{LocalTable, SetLocal, SymbolTable};
use crate::core::types::{Namespace, TypeId, TypeRef};
use crate::lang::{BackendSet, EmitContext};

use options::{DimensionTable, OptionList, PendingOption};

/// Dispatcher configuration distilled from the command line.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Target word size in bytes (4 for `--b32`, 8 for `--b64`).
    pub word_size: i64,
    /// `--align=N`: 0 packs members, N caps natural alignment at N.
    pub align: u32,
    /// `--member`: members take their full natural alignment.
    pub member_align: bool,
    pub check_alignment: bool,
    pub comments: bool,
    pub header: bool,
    pub suppress_prefix: bool,
    pub suppress_tag: bool,
    /// Copyright text emitted at module start, from `--copy`.
    pub copyright: Option<String>,
    pub trace: bool,
    pub verbose: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            word_size: 8,
            align: 0,
            member_align: false,
            check_alignment: false,
            comments: true,
            header: true,
            suppress_prefix: false,
            suppress_tag: false,
            copyright: None,
            trace: false,
            verbose: false,
        }
    }
}

impl Settings {
    /// Default alignment rule for a member of the given natural size.
    pub fn default_member_alignment(&self, natural: i64) -> Alignment {
        if self.member_align {
            Alignment::Natural
        } else if self.align == 0 {
            Alignment::NoAlign
        } else {
            Alignment::Fixed((natural.max(1) as u32).min(self.align))
        }
    }

    /// Default alignment rule for aggregates themselves.
    pub fn default_aggregate_alignment(&self) -> Alignment {
        if self.member_align {
            Alignment::Natural
        } else if self.align == 0 {
            Alignment::NoAlign
        } else {
            Alignment::Fixed(self.align)
        }
    }
}

/// The directive dispatcher and module state cursor.
pub struct Compiler {
    pub settings: Settings,
    pub registry: TypeRegistry,
    pub constants: Vec<Constant>,
    pub entries: Vec<Entry>,
    pub symbols: SymbolTable,
    pub locals: LocalTable,
    pub backends: BackendSet,
    pub diagnostics: Vec<Diagnostic>,
    pub(crate) lang_enabled: Vec<bool>,
    pub(crate) cond_stack: ConditionalStack,
    pub(crate) processing_enabled: bool,
    pub(crate) options: OptionList,
    pub(crate) dimensions: DimensionTable,
    pub(crate) parameters: Vec<Parameter>,
    pub(crate) module_name: Option<String>,
    pub(crate) ident: Option<String>,
    pub(crate) source: String,
    pub(crate) aggregate_depth: u32,
    /// Member-index path from the open top aggregate down to the open
    /// subaggregate; empty while populating the top level.
    pub(crate) aggregate_path: Vec<usize>,
    pub(crate) filler_count: u32,
    pub(crate) in_literal: bool,
    pub(crate) literal_lines: Vec<String>,
    pub(crate) pending_constant: Option<(String, ConstantValue)>,
    pub(crate) declare_open: bool,
    pub(crate) item_open: bool,
    pub(crate) precision: i64,
    pub(crate) scale: i64,
    pub(crate) fatal: bool,
}

impl Compiler {
    pub fn new(settings: Settings, symbols: SymbolTable, backends: BackendSet) -> Self {
        let langs = backends.len();
        Self {
            settings,
            registry: TypeRegistry::new(),
            constants: Vec::new(),
            entries: Vec::new(),
            symbols,
            locals: LocalTable::new(),
            backends,
            diagnostics: Vec::new(),
            lang_enabled: vec![true; langs],
            cond_stack: ConditionalStack::new(),
            processing_enabled: true,
            options: OptionList::new(),
            dimensions: DimensionTable::new(),
            parameters: Vec::new(),
            module_name: None,
            ident: None,
            source: String::new(),
            aggregate_depth: 0,
            aggregate_path: Vec::new(),
            filler_count: 0,
            in_literal: false,
            literal_lines: Vec::new(),
            pending_constant: None,
            declare_open: false,
            item_open: false,
            precision: 0,
            scale: 0,
            fatal: false,
        }
    }

    pub fn set_source(&mut self, source: &str) {
        self.source = source.to_string();
    }

    pub fn module_name(&self) -> Option<&str> {
        self.module_name.as_deref()
    }

    pub fn had_fatal(&self) -> bool {
        self.fatal
    }

    pub(crate) fn trace_call(&self, name: &str) {
        if self.settings.trace {
            eprintln!("sdlforge: {name}");
        }
    }

    /// Record an advisory diagnostic; never touches the exit status.
    pub(crate) fn warn(&mut self, line: u32, error: SdlError) {
        let trace = self.aggregate_trace();
        self.diagnostics
            .push(Diagnostic::warning(line, error).with_trace(trace));
    }

    /// Record a fault with the enclosing aggregate names and classify
    /// its severity.
    pub(crate) fn fault(&mut self, line: u32, error: SdlError) -> Status {
        let status = error.kind.status();
        let trace = self.aggregate_trace();
        self.diagnostics
            .push(Diagnostic::new(line, error).with_trace(trace));
        if status == Status::Fatal {
            self.fatal = true;
        }
        status
    }

    /// Names of the open aggregates, outermost first.
    pub(crate) fn aggregate_trace(&self) -> Vec<String> {
        let mut trace = Vec::new();
        if self.aggregate_depth == 0 {
            return trace;
        }
        let Some(aggr) = self.registry.aggregates.last() else {
            return trace;
        };
        trace.push(aggr.id.clone());
        let mut members = &aggr.members;
        for &idx in &self.aggregate_path {
            match members.get(idx) {
                Some(Member::Subaggregate(sub)) => {
                    trace.push(sub.id.clone());
                    members = &sub.members;
                }
                _ => break,
            }
        }
        trace
    }

    /// Natural size in bytes of a resolved type reference.
    pub(crate) fn size_of(&self, type_ref: TypeRef) -> i64 {
        match type_ref {
            TypeRef::Scalar(scalar) => scalar.natural_size(self.settings.word_size),
            TypeRef::User(id) => self.size_of_user(id),
        }
    }

    fn size_of_user(&self, id: TypeId) -> i64 {
        match id.namespace() {
            Some(Namespace::Declare) => self.registry.declare(id).map_or(0, |d| d.size),
            Some(Namespace::Item) => self.registry.item(id).map_or(0, |i| i.size),
            Some(Namespace::Aggregate) => self.registry.aggregate(id).map_or(0, |a| a.size),
            Some(Namespace::Enum) => self.registry.enumeration(id).map_or(0, |e| e.size),
            None => 0,
        }
    }

    /// The member list currently being populated.
    pub(crate) fn current_members_mut(&mut self) -> Option<&mut Vec<Member>> {
        members_at_mut(&mut self.registry, &self.aggregate_path)
    }

    /// The open subaggregate, when the cursor is below the top level.
    pub(crate) fn current_sub_mut(&mut self) -> Option<&mut Subaggregate> {
        sub_at_path_mut(&mut self.registry, &self.aggregate_path)
    }

    /// Whether the list being populated belongs to a union.
    pub(crate) fn current_is_union(&self) -> bool {
        let Some(aggr) = self.registry.aggregates.last() else {
            return false;
        };
        if self.aggregate_path.is_empty() {
            return aggr.kind.is_union();
        }
        let mut members = &aggr.members;
        let mut kind = aggr.kind;
        for &idx in &self.aggregate_path {
            match members.get(idx) {
                Some(Member::Subaggregate(sub)) => {
                    kind = sub.kind;
                    members = &sub.members;
                }
                _ => break,
            }
        }
        kind.is_union()
    }

    /// Mutable access to the last layout member of the current list when
    /// it is an item.
    pub(crate) fn last_member_item_mut(&mut self) -> Option<&mut MemberItem> {
        let members = self.current_members_mut()?;
        let idx = crate::core::bitfield::last_layout_member(members)?;
        members[idx].as_item_mut()
    }

    /// Queue a resolved constant and hand it to every enabled backend.
    pub(crate) fn queue_constant(&mut self, constant: Constant) -> Status {
        let ctx = EmitContext {
            registry: &self.registry,
            module_name: self.module_name.as_deref().unwrap_or(""),
            ident: self.ident.as_deref(),
            source: &self.source,
        };
        let result = self
            .backends
            .for_each_enabled(&self.lang_enabled, |b| b.constant(&ctx, &constant));
        let line = constant.loc.first_line;
        self.constants.push(constant);
        match result {
            Ok(()) => Status::Normal,
            Err(e) => self.fault(line, e),
        }
    }

    // ------------------------------------------------------------------
    // Module directives
    // ------------------------------------------------------------------

    /// MODULE name [IDENT string];
    pub fn module(&mut self, name: &str, ident: Option<&str>, loc: SourceLoc) -> Status {
        self.trace_call("module");
        self.module_name = Some(name.to_string());
        self.ident = ident.map(str::to_string);
        self.lang_enabled = vec![true; self.backends.len()];
        let copyright = self.settings.copyright.clone();
        let ctx = EmitContext {
            registry: &self.registry,
            module_name: self.module_name.as_deref().unwrap_or(""),
            ident: self.ident.as_deref(),
            source: &self.source,
        };
        let result = self.backends.for_each_enabled(&self.lang_enabled, |b| {
            b.module_begin(&ctx)?;
            if let Some(text) = &copyright {
                for line in text.lines() {
                    b.literal_line(&ctx, line)?;
                }
            }
            Ok(())
        });
        match result {
            Ok(()) => Status::Normal,
            Err(e) => self.fault(loc.first_line, e),
        }
    }

    /// END_MODULE [name];
    ///
    /// Releases every module-owned table. Calling it again without an
    /// intervening MODULE yields MatchEndName without touching state.
    pub fn module_end(&mut self, name: Option<&str>, loc: SourceLoc) -> Status {
        self.trace_call("module_end");
        let Some(open) = self.module_name.clone() else {
            return self.fault(
                loc.first_line,
                SdlError::new(SdlErrorKind::MatchEndName).with_insert("END_MODULE"),
            );
        };
        let mut status = Status::Normal;
        if let Some(name) = name {
            if !open.eq_ignore_ascii_case(name) {
                status = self.fault(
                    loc.first_line,
                    SdlError::new(SdlErrorKind::MatchEndName).with_insert(open.clone()),
                );
            }
        }
        if status.is_normal() {
            let ctx = EmitContext {
                registry: &self.registry,
                module_name: &open,
                ident: self.ident.as_deref(),
                source: &self.source,
            };
            let result = self
                .backends
                .for_each_enabled(&self.lang_enabled, |b| b.module_end(&ctx));
            if let Err(e) = result {
                status = self.fault(loc.first_line, e);
            }
        }
        self.locals.clear();
        self.dimensions.clear();
        self.options.clear();
        self.parameters.clear();
        self.cond_stack.clear();
        self.processing_enabled = true;
        self.aggregate_depth = 0;
        self.aggregate_path.clear();
        self.in_literal = false;
        self.literal_lines.clear();
        self.pending_constant = None;
        self.declare_open = false;
        self.item_open = false;
        self.module_name = None;
        self.ident = None;
        status
    }

    /// LOCAL name = value;
    pub fn set_local(&mut self, name: &str, value: i64, _loc: SourceLoc) -> Status {
        if !self.processing_enabled {
            return Status::Normal;
        }
        self.trace_call("set_local");
        self.locals.set(name, value);
        Status::Normal
    }

    pub(crate) fn bind_local(&mut self, name: &str, value: i64) -> SetLocal {
        self.locals.set(name, value)
    }

    // ------------------------------------------------------------------
    // Comments
    // ------------------------------------------------------------------

    /// A `/* ...` line comment.
    pub fn comment_line(&mut self, text: &str, loc: SourceLoc) -> Status {
        self.comment(text, true, false, false, false, loc)
    }

    /// A block comment with explicit position flags.
    pub fn comment_block(
        &mut self,
        text: &str,
        start: bool,
        middle: bool,
        end: bool,
        loc: SourceLoc,
    ) -> Status {
        self.comment(text, false, start, middle, end, loc)
    }

    fn comment(
        &mut self,
        text: &str,
        line: bool,
        start: bool,
        middle: bool,
        end: bool,
        loc: SourceLoc,
    ) -> Status {
        if !self.processing_enabled {
            return Status::Normal;
        }
        self.trace_call("comment");
        let comment = CommentMember {
            text: text.to_string(),
            line_comment: line,
            start_comment: start,
            middle_comment: middle,
            end_comment: end,
            loc,
        };
        if self.aggregate_depth > 0 {
            // Stored in authoring position; never enters layout.
            if let Some(members) = self.current_members_mut() {
                members.push(Member::Comment(comment));
            }
            return Status::Normal;
        }
        let ctx = EmitContext {
            registry: &self.registry,
            module_name: self.module_name.as_deref().unwrap_or(""),
            ident: self.ident.as_deref(),
            source: &self.source,
        };
        let result = self
            .backends
            .for_each_enabled(&self.lang_enabled, |b| b.comment(&ctx, &comment));
        match result {
            Ok(()) => Status::Normal,
            Err(e) => self.fault(loc.first_line, e),
        }
    }

    // ------------------------------------------------------------------
    // Literal passthrough
    // ------------------------------------------------------------------

    /// LITERAL;
    pub fn literal_begin(&mut self, _loc: SourceLoc) -> Status {
        self.trace_call("literal_begin");
        self.in_literal = true;
        self.literal_lines.clear();
        Status::Normal
    }

    /// One verbatim line between LITERAL and END_LITERAL.
    pub fn literal_line(&mut self, line: &str, _loc: SourceLoc) -> Status {
        if self.processing_enabled && self.in_literal {
            self.literal_lines.push(line.to_string());
        }
        Status::Normal
    }

    /// END_LITERAL; releases the queued lines to the backends in order.
    pub fn literal_end(&mut self, loc: SourceLoc) -> Status {
        self.trace_call("literal_end");
        self.in_literal = false;
        if !self.processing_enabled {
            self.literal_lines.clear();
            return Status::Normal;
        }
        let lines = std::mem::take(&mut self.literal_lines);
        let ctx = EmitContext {
            registry: &self.registry,
            module_name: self.module_name.as_deref().unwrap_or(""),
            ident: self.ident.as_deref(),
            source: &self.source,
        };
        let result = self.backends.for_each_enabled(&self.lang_enabled, |b| {
            for line in &lines {
                b.literal_line(&ctx, line)?;
            }
            Ok(())
        });
        match result {
            Ok(()) => Status::Normal,
            Err(e) => self.fault(loc.first_line, e),
        }
    }

    pub fn in_literal(&self) -> bool {
        self.in_literal
    }

    // ------------------------------------------------------------------
    // Options and scratch state
    // ------------------------------------------------------------------

    /// Accumulate one option for the entity in flight.
    pub fn add_option(&mut self, option: PendingOption, _loc: SourceLoc) -> Status {
        if !self.processing_enabled {
            return Status::Normal;
        }
        self.options.push(option);
        Status::Normal
    }

    /// DIMENSION l:u — registers the bound pair, returning the slot a
    /// Dimension option refers to.
    pub fn dimension(&mut self, lbound: i64, hbound: i64, _loc: SourceLoc) -> usize {
        self.dimensions.insert(lbound, hbound)
    }

    /// PRECISION p[, scale] for a following DECIMAL item.
    pub fn set_precision(&mut self, precision: i64, scale: i64, _loc: SourceLoc) -> Status {
        self.precision = precision;
        self.scale = scale;
        Status::Normal
    }

    /// Resolve a type name used in source against the registry.
    pub fn lookup_type(&self, name: &str) -> Option<TypeRef> {
        self.registry.type_by_name(name).map(TypeRef::User)
    }
}

/// Member list at `path` under the newest aggregate. A free function so
/// callers can borrow the registry and other dispatcher fields at once.
pub(crate) fn members_at_mut<'a>(
    registry: &'a mut TypeRegistry,
    path: &[usize],
) -> Option<&'a mut Vec<Member>> {
    let aggr = registry.aggregates.last_mut()?;
    let mut members = &mut aggr.members;
    for &idx in path {
        match members.get_mut(idx)? {
            Member::Subaggregate(sub) => members = &mut sub.members,
            _ => return None,
        }
    }
    Some(members)
}

/// The subaggregate `path` points at, when below the top level.
pub(crate) fn sub_at_path_mut<'a>(
    registry: &'a mut TypeRegistry,
    path: &[usize],
) -> Option<&'a mut Subaggregate> {
    let (last, front) = path.split_last()?;
    let members = members_at_mut(registry, front)?;
    match members.get_mut(*last)? {
        Member::Subaggregate(sub) => Some(sub),
        _ => None,
    }
}
