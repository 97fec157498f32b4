// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! CONSTANT and ENUM directives.
//!
//! A constant statement may define a single value, a comma list with
//! per-item comments, or (with ENUMERATE) an enumeration. List values
//! step by INCREMENT; enumerations auto-increment by one when no
//! increment is given.

use crate::core::error::Status;
use crate::core::model::{Constant, ConstantValue, EnumMember, Enumeration, SourceLoc};
use crate::core::tag::resolve_tag;
use crate::core::types::{all_lower, Radix, ScalarType, TypeRef};
use crate::lang::EmitContext;

use super::options::PendingOption;
use super::Compiler;

/// One parsed element of a constant name list.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ListEntry {
    name: String,
    comment: Option<String>,
}

/// Split a raw constant name list. Names are comma separated; `/* ...`
/// text attaches to the preceding name as an output comment and
/// `{ ... }` text is a source-local comment that is dropped.
fn parse_name_list(raw: &str) -> Vec<ListEntry> {
    let mut entries = Vec::new();
    for line in raw.lines() {
        let mut rest = line;
        loop {
            rest = rest.trim_start_matches([' ', '\t', ',']);
            if rest.is_empty() {
                break;
            }
            if let Some(stripped) = rest.strip_prefix("/*") {
                // An output comment for the previous name, running to
                // the end of the line.
                if let Some(ListEntry { comment, .. }) = entries.last_mut() {
                    *comment = Some(stripped.trim_end_matches("*/").trim_end().to_string());
                }
                rest = "";
                continue;
            }
            if let Some(stripped) = rest.strip_prefix('{') {
                rest = match stripped.find('}') {
                    Some(idx) => &stripped[idx + 1..],
                    None => "",
                };
                continue;
            }
            let end = rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '$'))
                .unwrap_or(rest.len());
            if end == 0 {
                // Not a name character; skip it to make progress.
                rest = &rest[1..];
                continue;
            }
            entries.push(ListEntry {
                name: rest[..end].to_string(),
                comment: None,
            });
            rest = &rest[end..];
        }
    }
    entries
}

impl Compiler {
    /// CONSTANT names EQUALS value; stores the raw payload until the
    /// trailing options have been gathered.
    pub fn constant(&mut self, raw_names: &str, value: ConstantValue, _loc: SourceLoc) -> Status {
        if !self.processing_enabled {
            return Status::Normal;
        }
        self.trace_call("constant");
        self.pending_constant = Some((raw_names.to_string(), value));
        Status::Normal
    }

    /// Completes the pending constant statement.
    pub fn constant_end(&mut self, loc: SourceLoc) -> Status {
        if !self.processing_enabled {
            self.options.clear();
            self.pending_constant = None;
            return Status::Normal;
        }
        self.trace_call("constant_end");
        let Some((raw, value)) = self.pending_constant.take() else {
            self.options.clear();
            return Status::Normal;
        };

        let mut prefix = None;
        let mut tag = None;
        let mut counter = None;
        let mut type_name = None;
        let mut enum_name = None;
        let mut increment = None;
        let mut radix = Radix::Dec;
        let mut typedef = false;
        for option in self.options.drain() {
            match option {
                PendingOption::Prefix(p) => prefix = Some(p),
                PendingOption::Tag(t) => tag = Some(t),
                PendingOption::Counter(c) => counter = Some(c),
                PendingOption::TypeName(t) => type_name = Some(t),
                PendingOption::Enumerate(e) => enum_name = Some(e),
                PendingOption::Increment(n) => increment = Some(n),
                PendingOption::Radix(r) => radix = r,
                PendingOption::Typedef => typedef = true,
                _ => {}
            }
        }

        let entries = parse_name_list(&raw);
        let string_value = matches!(value, ConstantValue::String(_));
        let is_enum = enum_name.is_some() && !string_value;
        let step = increment.unwrap_or(if is_enum { 1 } else { 0 });
        let mut current = match &value {
            ConstantValue::Number(n) => *n,
            ConstantValue::String(_) => 0,
        };
        if let Some(counter) = &counter {
            self.bind_local(counter, current);
        }

        let mut status = Status::Normal;
        if is_enum {
            let enum_name = enum_name.expect("enum name present");
            let type_id = self.registry.next_enum_id();
            let resolved_tag = resolve_tag(
                &self.registry,
                tag.as_deref(),
                TypeRef::Scalar(ScalarType::Enum),
                all_lower(&enum_name),
            );
            let mut members = Vec::new();
            let mut prev = None;
            for entry in entries {
                let value_set = match prev {
                    None => current != 0,
                    Some(prev) => current - prev != 1,
                };
                members.push(EnumMember {
                    id: entry.name,
                    value: current,
                    value_set,
                    comment: entry.comment,
                });
                prev = Some(current);
                current += step;
            }
            let en = Enumeration {
                id: enum_name,
                type_id,
                prefix,
                tag: resolved_tag,
                typedef,
                size: ScalarType::Enum.natural_size(self.settings.word_size),
                members,
                loc,
            };
            self.registry.enums.push(en);
            let en = self.registry.enums.last().expect("enum exists").clone();
            let ctx = EmitContext {
                registry: &self.registry,
                module_name: self.module_name.as_deref().unwrap_or(""),
                ident: self.ident.as_deref(),
                source: &self.source,
            };
            let result = self
                .backends
                .for_each_enabled(&self.lang_enabled, |b| b.enumeration(&ctx, &en));
            if let Err(e) = result {
                status = self.fault(loc.first_line, e);
            }
        } else {
            let shared_tag = tag.clone();
            let mut prev = current;
            for entry in entries {
                let resolved_tag = resolve_tag(
                    &self.registry,
                    shared_tag.as_deref(),
                    TypeRef::Scalar(ScalarType::Constant),
                    all_lower(&entry.name),
                );
                let constant = Constant {
                    id: entry.name,
                    prefix: prefix.clone(),
                    tag: resolved_tag,
                    comment: entry.comment,
                    type_name: type_name.clone(),
                    radix,
                    value: match &value {
                        ConstantValue::String(s) => ConstantValue::String(s.clone()),
                        ConstantValue::Number(_) => ConstantValue::Number(current),
                    },
                    size: self.settings.word_size,
                    loc,
                };
                status = status.worst(self.queue_constant(constant));
                if let Some(counter) = &counter {
                    if current != prev {
                        self.bind_local(counter, current);
                        prev = current;
                    }
                }
                current += step;
            }
        }
        status
    }
}
