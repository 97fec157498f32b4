// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! ENTRY and PARAMETER directives.
//!
//! Parameters accumulate ahead of the ENTRY statement that owns them.
//! Each parameter consumes only its own option kinds so entry-level
//! options stay buffered for the ENTRY call.

use crate::core::error::Status;
use crate::core::model::{Entry, Parameter, PassingMech, ReturnSpec, SourceLoc};
use crate::core::types::{ScalarType, TypeRef};
use crate::lang::EmitContext;

use super::options::PendingOption;
use super::Compiler;

impl Compiler {
    /// One parameter of the entry being declared. `CHARACTER *` is
    /// permitted here and nowhere else.
    pub fn parameter(
        &mut self,
        type_ref: TypeRef,
        unsigned: bool,
        passing: PassingMech,
        loc: SourceLoc,
    ) -> Status {
        if !self.processing_enabled {
            return Status::Normal;
        }
        self.trace_call("parameter");
        let mut param = Parameter {
            name: None,
            type_ref,
            unsigned: unsigned
                || type_ref
                    .as_scalar()
                    .map(ScalarType::default_unsigned)
                    .unwrap_or(false),
            passing,
            is_in: false,
            is_out: false,
            default_value: None,
            bound: None,
            type_name: None,
            optional: false,
            list: false,
            loc,
        };
        let taken = self.options.take_matching(|o| {
            matches!(
                o,
                PendingOption::Named(_)
                    | PendingOption::In
                    | PendingOption::Out
                    | PendingOption::Dimension(_)
                    | PendingOption::Default(_)
                    | PendingOption::TypeName(_)
                    | PendingOption::Optional
                    | PendingOption::List
            )
        });
        for option in taken {
            match option {
                PendingOption::Named(n) => param.name = Some(n),
                PendingOption::In => param.is_in = true,
                PendingOption::Out => param.is_out = true,
                PendingOption::Dimension(idx) => {
                    param.bound = self.dimensions.take(idx).map(|d| d.cardinality());
                }
                PendingOption::Default(v) => param.default_value = Some(v),
                PendingOption::TypeName(t) => param.type_name = Some(t),
                PendingOption::Optional => param.optional = true,
                PendingOption::List => param.list = true,
                _ => {}
            }
        }
        self.parameters.push(param);
        Status::Normal
    }

    /// ENTRY name; collects buffered entry options and the accumulated
    /// parameter list, then emits the signature.
    pub fn entry(&mut self, name: &str, loc: SourceLoc) -> Status {
        if !self.processing_enabled {
            self.options.clear();
            self.parameters.clear();
            return Status::Normal;
        }
        self.trace_call("entry");
        let mut entry = Entry {
            id: name.to_string(),
            alias: None,
            linkage: None,
            type_name: None,
            variable: false,
            returns: ReturnSpec::default(),
            parameters: std::mem::take(&mut self.parameters),
            loc,
        };
        for option in self.options.drain() {
            match option {
                PendingOption::Alias(a) => entry.alias = Some(a),
                PendingOption::Linkage(l) => entry.linkage = Some(l),
                PendingOption::TypeName(t) => entry.type_name = Some(t),
                PendingOption::Variable => entry.variable = true,
                PendingOption::ReturnsType(type_ref, unsigned) => {
                    entry.returns.type_ref = Some(type_ref);
                    entry.returns.unsigned = unsigned;
                }
                PendingOption::ReturnsNamed(n) => entry.returns.named = Some(n),
                _ => {}
            }
        }
        self.entries.push(entry);
        let entry = self.entries.last().expect("entry exists").clone();
        let ctx = EmitContext {
            registry: &self.registry,
            module_name: self.module_name.as_deref().unwrap_or(""),
            ident: self.ident.as_deref(),
            source: &self.source,
        };
        let result = self
            .backends
            .for_each_enabled(&self.lang_enabled, |b| b.entry(&ctx, &entry));
        match result {
            Ok(()) => Status::Normal,
            Err(e) => self.fault(loc.first_line, e),
        }
    }
}
