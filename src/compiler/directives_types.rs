// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! DECLARE and ITEM directives.

use crate::core::error::{SdlError, SdlErrorKind, Status};
use crate::core::model::{Alignment, Declare, Item, SourceLoc};
use crate::core::tag::resolve_tag;
use crate::core::types::{all_lower, Namespace, ScalarType, TypeRef};
use crate::lang::EmitContext;

use super::options::PendingOption;
use super::Compiler;

/// The size clause of a DECLARE: a type reference or a literal byte
/// count (`SIZEOF n` declares a character type of that size).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeSpec {
    Type(TypeRef),
    Bytes(i64),
}

impl Compiler {
    /// DECLARE name SIZEOF (type | n);
    pub fn declare(
        &mut self,
        name: &str,
        size_spec: SizeSpec,
        unsigned: bool,
        loc: SourceLoc,
    ) -> Status {
        if !self.processing_enabled {
            return Status::Normal;
        }
        self.trace_call("declare");
        self.declare_open = false;
        if self.registry.name_in_namespace(Namespace::Declare, name) {
            return self.fault(
                loc.first_line,
                SdlError::new(SdlErrorKind::DuplicateName).with_insert(name),
            );
        }
        let (base, size) = match size_spec {
            SizeSpec::Type(type_ref) => (type_ref, self.size_of(type_ref)),
            SizeSpec::Bytes(n) => (TypeRef::Scalar(ScalarType::Char), n),
        };
        let type_id = self.registry.next_declare_id();
        self.registry.declares.push(Declare {
            id: name.to_string(),
            type_id,
            prefix: None,
            tag: String::new(),
            base,
            unsigned,
            size,
            loc,
        });
        self.declare_open = true;
        Status::Normal
    }

    /// Completes the most recent DECLARE once its options have arrived.
    pub fn declare_end(&mut self, _loc: SourceLoc) -> Status {
        if !self.processing_enabled || !self.declare_open {
            self.options.clear();
            return Status::Normal;
        }
        self.declare_open = false;
        self.trace_call("declare_end");
        let mut prefix = None;
        let mut tag = None;
        for option in self.options.drain() {
            match option {
                PendingOption::Prefix(p) => prefix = Some(p),
                PendingOption::Tag(t) => tag = Some(t),
                _ => {}
            }
        }
        if let Some(last) = self.registry.declares.last() {
            let resolved = resolve_tag(
                &self.registry,
                tag.as_deref(),
                last.base,
                all_lower(&last.id),
            );
            let declare = self.registry.declares.last_mut().expect("declare exists");
            declare.prefix = prefix;
            declare.tag = resolved;
        }
        Status::Normal
    }

    /// ITEM name type;
    pub fn item(&mut self, name: &str, type_ref: TypeRef, unsigned: bool, loc: SourceLoc) -> Status {
        if !self.processing_enabled {
            return Status::Normal;
        }
        self.trace_call("item");
        self.item_open = false;
        if self.registry.name_in_namespace(Namespace::Item, name) {
            return self.fault(
                loc.first_line,
                SdlError::new(SdlErrorKind::DuplicateName).with_insert(name),
            );
        }
        if type_ref == TypeRef::Scalar(ScalarType::CharStar) {
            return self.fault(loc.first_line, SdlError::new(SdlErrorKind::InvalidUnknownLength));
        }
        let type_id = self.registry.next_item_id();
        let size = self.size_of(type_ref);
        let (precision, scale) = if type_ref == TypeRef::Scalar(ScalarType::Decimal) {
            (self.precision, self.scale)
        } else {
            (0, 0)
        };
        self.registry.items.push(Item {
            id: name.to_string(),
            type_id,
            prefix: None,
            tag: String::new(),
            type_ref,
            unsigned,
            size,
            alignment: Alignment::NoAlign,
            dimension: None,
            common: false,
            global: false,
            typedef: false,
            length: 0,
            precision,
            scale,
            subtype: None,
            loc,
        });
        self.item_open = true;
        Status::Normal
    }

    /// Completes the most recent ITEM: applies options, resolves the
    /// tag, checks address subtypes, and emits.
    pub fn item_end(&mut self, loc: SourceLoc) -> Status {
        if !self.processing_enabled || !self.item_open {
            self.options.clear();
            return Status::Normal;
        }
        self.item_open = false;
        self.trace_call("item_end");
        let mut prefix = None;
        let mut tag = None;
        let mut alignment = None;
        let mut dimension = None;
        let mut length = None;
        let mut common = false;
        let mut global = false;
        let mut typedef = false;
        let mut subtype = None;
        for option in self.options.drain() {
            match option {
                PendingOption::Prefix(p) => prefix = Some(p),
                PendingOption::Tag(t) => tag = Some(t),
                PendingOption::Align => alignment = Some(Alignment::Natural),
                PendingOption::NoAlign => alignment = Some(Alignment::NoAlign),
                PendingOption::BaseAlign(n) => {
                    alignment = Some(if n <= 0 {
                        Alignment::NoAlign
                    } else {
                        Alignment::Fixed(n as u32)
                    })
                }
                PendingOption::Dimension(idx) => dimension = self.dimensions.take(idx),
                PendingOption::Length(n) => length = Some(n),
                PendingOption::Common => common = true,
                PendingOption::Global => global = true,
                PendingOption::Typedef => typedef = true,
                PendingOption::SubType(t) => subtype = Some(t),
                _ => {}
            }
        }
        let Some(item) = self.registry.items.last() else {
            return Status::Normal;
        };
        let resolved_tag = resolve_tag(
            &self.registry,
            tag.as_deref(),
            item.type_ref,
            all_lower(&item.id),
        );
        let mut status = Status::Normal;
        let mut based_fault = None;
        if item.type_ref.is_address() {
            if let Some(TypeRef::User(id)) = subtype {
                if id.namespace() == Some(Namespace::Aggregate) {
                    if let Some(aggr) = self.registry.aggregate(id) {
                        if aggr.based_name.is_none() {
                            based_fault = Some(aggr.id.clone());
                        }
                    }
                }
            }
        }
        let item = self.registry.items.last_mut().expect("item exists");
        item.prefix = prefix;
        item.tag = resolved_tag;
        if let Some(alignment) = alignment {
            item.alignment = alignment;
        }
        item.dimension = dimension;
        if let Some(length) = length {
            item.length = length;
        }
        item.common = common;
        item.global = global;
        item.typedef = typedef;
        if item.type_ref.is_address() {
            item.subtype = subtype;
        }
        if let Some(id) = based_fault {
            status = self.fault(
                loc.first_line,
                SdlError::new(SdlErrorKind::AddressObjectNotBased).with_insert(id),
            );
        }
        if status.is_normal() {
            let item = self.registry.items.last().expect("item exists").clone();
            let ctx = EmitContext {
                registry: &self.registry,
                module_name: self.module_name.as_deref().unwrap_or(""),
                ident: self.ident.as_deref(),
                source: &self.source,
            };
            let result = self
                .backends
                .for_each_enabled(&self.lang_enabled, |b| b.item(&ctx, &item));
            if let Err(e) = result {
                status = self.fault(loc.first_line, e);
            }
        }
        status
    }
}
