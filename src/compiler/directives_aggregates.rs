// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! AGGREGATE, member, and END directives.
//!
//! The dispatcher keeps a cursor (newest aggregate plus a member-index
//! path) into the definition being populated. Options buffered since
//! the previous statement attach to the previously completed member;
//! bitfield-shape options (LENGTH, MASK, SIGNED, host size) belong to
//! the member being opened and are captured instead.

use crate::core::bitfield;
use crate::core::error::{SdlError, SdlErrorKind, Status};
use crate::core::layout::{self, LayoutEnv};
use crate::core::model::{
    Aggregate, AggregateKind, Alignment, Constant, ConstantValue, Member, MemberItem, SourceLoc,
    Subaggregate,
};
use crate::core::tag::resolve_tag;
use crate::core::types::{all_lower, Namespace, Radix, ScalarType, TypeRef};
use crate::lang::{self, EmitContext};

use super::options::PendingOption;
use super::{members_at_mut, sub_at_path_mut, Compiler};

/// Payload of one member statement.
#[derive(Debug, Clone)]
pub enum MemberPayload {
    /// A data member.
    Item {
        name: String,
        type_ref: TypeRef,
        unsigned: bool,
    },
    /// A nested STRUCTURE or UNION header.
    Subaggregate {
        name: String,
        union: bool,
        scalar: Option<ScalarType>,
        unsigned: bool,
    },
    /// No new member; just attach buffered options to the predecessor.
    OptionsOnly,
}

/// Bitfield-shape options captured for the member being opened.
#[derive(Debug, Default)]
struct NewMemberCapture {
    length: Option<i64>,
    mask: bool,
    signed: bool,
    subtype: Option<TypeRef>,
    sized_host: Option<ScalarType>,
}

impl Compiler {
    /// AGGREGATE name STRUCTURE|UNION [scalar];
    pub fn aggregate(
        &mut self,
        name: &str,
        union: bool,
        scalar: Option<ScalarType>,
        unsigned: bool,
        loc: SourceLoc,
    ) -> Status {
        if !self.processing_enabled {
            return Status::Normal;
        }
        self.trace_call("aggregate");
        if self.registry.name_in_namespace(Namespace::Aggregate, name) {
            return self.fault(
                loc.first_line,
                SdlError::new(SdlErrorKind::DuplicateName).with_insert(name),
            );
        }
        let implicit = scalar.map(ScalarType::is_integer).unwrap_or(false);
        let (kind, type_ref) = if implicit {
            (
                AggregateKind::ImplicitUnion,
                TypeRef::Scalar(scalar.expect("implicit union scalar")),
            )
        } else if union {
            (AggregateKind::Union, TypeRef::Scalar(ScalarType::Union))
        } else {
            (
                AggregateKind::Structure,
                TypeRef::Scalar(ScalarType::Structure),
            )
        };
        let keyword_type = if kind == AggregateKind::Structure {
            ScalarType::Structure
        } else {
            ScalarType::Union
        };
        let tag = resolve_tag(
            &self.registry,
            None,
            TypeRef::Scalar(keyword_type),
            all_lower(name),
        );
        let type_id = self.registry.next_aggregate_id();
        self.registry.aggregates.push(Aggregate {
            id: name.to_string(),
            type_id,
            prefix: None,
            marker: None,
            tag,
            based_name: None,
            kind,
            type_ref,
            unsigned,
            alignment: self.settings.default_aggregate_alignment(),
            alignment_present: false,
            origin_id: None,
            origin: None,
            dimension: None,
            common: false,
            global: false,
            typedef: false,
            fill: false,
            size: 0,
            members: Vec::new(),
            loc,
        });
        self.aggregate_depth = 1;
        self.aggregate_path.clear();
        Status::Normal
    }

    /// One member statement inside an open aggregate.
    pub fn aggregate_member(&mut self, payload: MemberPayload, loc: SourceLoc) -> Status {
        if !self.processing_enabled {
            self.options.clear();
            return Status::Normal;
        }
        self.trace_call("aggregate_member");
        if self.aggregate_depth == 0 {
            self.options.clear();
            return self.fault(loc.first_line, SdlError::new(SdlErrorKind::InvalidName));
        }
        let mut capture = NewMemberCapture::default();
        let options = self.options.drain();
        self.apply_member_options(options, Some(&mut capture));
        match payload {
            MemberPayload::OptionsOnly => Status::Normal,
            MemberPayload::Item {
                name,
                type_ref,
                unsigned,
            } => self.member_item(&name, type_ref, unsigned, capture, loc),
            MemberPayload::Subaggregate {
                name,
                union,
                scalar,
                unsigned,
            } => self.member_subaggregate(&name, union, scalar, unsigned, loc),
        }
    }

    /// END [name]; closes the innermost open aggregate level.
    pub fn aggregate_end(&mut self, name: Option<&str>, loc: SourceLoc) -> Status {
        if !self.processing_enabled {
            self.options.clear();
            return Status::Normal;
        }
        self.trace_call("aggregate_end");
        if self.aggregate_depth == 0 {
            self.options.clear();
            return self.fault(
                loc.first_line,
                SdlError::new(SdlErrorKind::MatchEndName).with_insert("END"),
            );
        }
        let options = self.options.drain();
        self.apply_member_options(options, None);

        if !self.aggregate_path.is_empty() {
            self.close_subaggregate(name, loc)
        } else {
            self.close_aggregate(name, loc)
        }
    }

    fn close_subaggregate(&mut self, name: Option<&str>, loc: SourceLoc) -> Status {
        let path = self.aggregate_path.clone();
        let word_size = self.settings.word_size;
        let mut status = Status::Normal;

        let info = match sub_at_path_mut(&mut self.registry, &path) {
            None => None,
            Some(sub) => {
                let mut env = LayoutEnv {
                    word_size,
                    filler_count: &mut self.filler_count,
                };
                let close = layout::finish_aggregate(
                    &mut env,
                    &mut sub.members,
                    sub.kind,
                    sub.type_ref,
                    sub.alignment,
                    Some(sub.offset),
                    sub.prefix.as_deref(),
                );
                sub.size = close.size;
                if let Some(new_offset) = close.new_offset {
                    sub.offset = new_offset;
                }
                Some((
                    sub.id.clone(),
                    sub.prefix.clone(),
                    close,
                    sub.members.is_empty(),
                ))
            }
        };
        let Some((sub_id, sub_prefix, close, empty)) = info else {
            return self.fault(loc.first_line, SdlError::new(SdlErrorKind::Abort));
        };
        self.aggregate_path.pop();
        self.aggregate_depth -= 1;

        if let Some(name) = name {
            if !sub_id.eq_ignore_ascii_case(name) {
                status = self.fault(
                    loc.first_line,
                    SdlError::new(SdlErrorKind::MatchEndName).with_insert(sub_id.clone()),
                );
            }
        }
        if status.is_normal() && empty {
            status = self.fault(
                loc.first_line,
                SdlError::new(SdlErrorKind::NullStructure).with_insert(sub_id.clone()),
            );
        }

        // Bitfield constants for the closed level, then its size
        // constant.
        let consts = match sub_at_path_mut(&mut self.registry, &path) {
            Some(sub) => bitfield::bitfield_constants(&sub.members),
            None => Vec::new(),
        };
        status = status.worst(self.queue_bitfield_constants(consts, loc));
        status.worst(self.queue_size_constant(&sub_id, sub_prefix.as_deref(), close.size, loc))
    }

    fn close_aggregate(&mut self, name: Option<&str>, loc: SourceLoc) -> Status {
        let word_size = self.settings.word_size;
        let mut status = Status::Normal;

        let info = match self.registry.aggregates.last_mut() {
            None => None,
            Some(aggr) => {
                let mut env = LayoutEnv {
                    word_size,
                    filler_count: &mut self.filler_count,
                };
                let close = layout::finish_aggregate(
                    &mut env,
                    &mut aggr.members,
                    aggr.kind,
                    aggr.type_ref,
                    aggr.alignment,
                    None,
                    aggr.prefix.as_deref(),
                );
                aggr.size = close.size;
                Some((
                    aggr.id.clone(),
                    aggr.prefix.clone(),
                    close.size,
                    aggr.members.is_empty(),
                ))
            }
        };
        let Some((aggr_id, aggr_prefix, size, empty)) = info else {
            return self.fault(loc.first_line, SdlError::new(SdlErrorKind::Abort));
        };
        self.aggregate_depth = 0;
        self.aggregate_path.clear();

        let consts = self
            .registry
            .aggregates
            .last()
            .map(|a| bitfield::bitfield_constants(&a.members))
            .unwrap_or_default();
        status = status.worst(self.queue_bitfield_constants(consts, loc));
        status =
            status.worst(self.queue_size_constant(&aggr_id, aggr_prefix.as_deref(), size, loc));

        if let Some(name) = name {
            if !aggr_id.eq_ignore_ascii_case(name) {
                status = self.fault(
                    loc.first_line,
                    SdlError::new(SdlErrorKind::MatchEndName).with_insert(aggr_id.clone()),
                );
            }
        }
        if status.is_normal() && empty {
            status = self.fault(
                loc.first_line,
                SdlError::new(SdlErrorKind::NullStructure).with_insert(aggr_id.clone()),
            );
        }

        if status.is_normal() {
            if let Some(aggr) = self.registry.aggregates.last() {
                let ctx = EmitContext {
                    registry: &self.registry,
                    module_name: self.module_name.as_deref().unwrap_or(""),
                    ident: self.ident.as_deref(),
                    source: &self.source,
                };
                let result = self
                    .backends
                    .for_each_enabled(&self.lang_enabled, |b| lang::emit_aggregate(b, &ctx, aggr));
                if let Err(e) = result {
                    status = self.fault(loc.first_line, e);
                }
            }
        }
        status
    }

    // ------------------------------------------------------------------
    // Member creation
    // ------------------------------------------------------------------

    fn member_item(
        &mut self,
        name: &str,
        type_ref: TypeRef,
        unsigned: bool,
        capture: NewMemberCapture,
        loc: SourceLoc,
    ) -> Status {
        let mut status = Status::Normal;
        let scalar = type_ref.as_scalar();

        if scalar == Some(ScalarType::CharStar) {
            return self.fault(loc.first_line, SdlError::new(SdlErrorKind::InvalidUnknownLength));
        }

        let is_bitfield = scalar.map(ScalarType::is_bitfield).unwrap_or(false);
        let (resolved_type, sized, length, member_unsigned) = if is_bitfield {
            let host = capture
                .sized_host
                .or_else(|| scalar.filter(|s| *s != ScalarType::Bitfield))
                .unwrap_or(ScalarType::BitfieldByte);
            let length = capture.length.unwrap_or(1);
            if length <= 0 {
                return self.fault(
                    loc.first_line,
                    SdlError::new(SdlErrorKind::ZeroLength).with_insert(name),
                );
            }
            (
                TypeRef::Scalar(host),
                capture.sized_host.is_some(),
                length,
                !capture.signed,
            )
        } else {
            let length = capture.length.unwrap_or(0);
            let unsigned = unsigned || scalar.map(ScalarType::default_unsigned).unwrap_or(false);
            (type_ref, false, length, unsigned)
        };

        // Address members referencing an aggregate need that aggregate
        // to carry a based pointer.
        let mut subtype = None;
        if type_ref.is_address() {
            subtype = capture.subtype;
            if let Some(TypeRef::User(id)) = subtype {
                if id.namespace() == Some(Namespace::Aggregate) {
                    if let Some(target) = self.registry.aggregate(id) {
                        if target.based_name.is_none() {
                            let target_id = target.id.clone();
                            status = self.fault(
                                loc.first_line,
                                SdlError::new(SdlErrorKind::AddressObjectNotBased)
                                    .with_insert(target_id),
                            );
                        }
                    }
                }
            }
        }

        let tag_type = if is_bitfield && !sized {
            TypeRef::Scalar(ScalarType::Bitfield)
        } else {
            resolved_type
        };
        let tag = resolve_tag(&self.registry, None, tag_type, all_lower(name));
        let size = self.size_of(resolved_type);
        let (precision, scale) = if scalar == Some(ScalarType::Decimal) {
            (self.precision, self.scale)
        } else {
            (0, 0)
        };
        let item = MemberItem {
            id: name.to_string(),
            prefix: self.container_prefix(),
            tag,
            type_ref: resolved_type,
            unsigned: member_unsigned,
            size,
            offset: 0,
            bit_offset: 0,
            length,
            precision,
            scale,
            mask: capture.mask,
            sized_bitfield: sized,
            alignment: self.container_alignment(size),
            parent_alignment: true,
            dimension: None,
            subtype,
            typedef: false,
            fill: false,
            filler: false,
            loc,
        };

        let (idx, offset) = self.place_and_push(Member::Item(item));
        self.check_origin(name, idx);
        if self.settings.check_alignment && !is_bitfield && size > 0 && offset % size != 0 {
            self.warn(
                loc.first_line,
                SdlError::new(SdlErrorKind::UnalignedMember).with_insert(name),
            );
        }
        status
    }

    fn member_subaggregate(
        &mut self,
        name: &str,
        union: bool,
        scalar: Option<ScalarType>,
        unsigned: bool,
        loc: SourceLoc,
    ) -> Status {
        let implicit = scalar.map(ScalarType::is_integer).unwrap_or(false);
        let (kind, type_ref) = if implicit {
            (
                AggregateKind::ImplicitUnion,
                TypeRef::Scalar(scalar.expect("implicit union scalar")),
            )
        } else if union {
            (AggregateKind::Union, TypeRef::Scalar(ScalarType::Union))
        } else {
            (
                AggregateKind::Structure,
                TypeRef::Scalar(ScalarType::Structure),
            )
        };
        let keyword_type = if kind == AggregateKind::Structure {
            ScalarType::Structure
        } else {
            ScalarType::Union
        };
        let tag = resolve_tag(
            &self.registry,
            None,
            TypeRef::Scalar(keyword_type),
            all_lower(name),
        );
        let type_id = self.registry.next_aggregate_id();
        let sub = Subaggregate {
            id: name.to_string(),
            type_id,
            prefix: self.container_prefix(),
            marker: self.container_marker(),
            tag,
            kind,
            type_ref,
            unsigned,
            based_name: None,
            alignment: self.container_alignment_for_sub(),
            parent_alignment: true,
            dimension: None,
            offset: 0,
            size: 0,
            members: Vec::new(),
            typedef: false,
            fill: false,
            loc,
        };
        let (idx, _offset) = self.place_and_push(Member::Subaggregate(sub));
        self.check_origin(name, idx);
        self.aggregate_path.push(idx);
        self.aggregate_depth += 1;
        Status::Normal
    }

    /// Run layout for the new member and append it, returning its index
    /// in the current list and its assigned offset.
    fn place_and_push(&mut self, mut member: Member) -> (usize, i64) {
        let path = self.aggregate_path.clone();
        let word_size = self.settings.word_size;
        let union = self.current_is_union();
        let members = members_at_mut(&mut self.registry, &path).expect("open member list");
        let mut env = LayoutEnv {
            word_size,
            filler_count: &mut self.filler_count,
        };
        layout::place_member(&mut env, members, &mut member, union);
        let idx = members.len();
        let offset = member.offset();
        members.push(member);
        (idx, offset)
    }

    fn check_origin(&mut self, member_id: &str, index: usize) {
        let mut full = self.aggregate_path.clone();
        full.push(index);
        if let Some(aggr) = self.registry.aggregates.last_mut() {
            if aggr.origin.is_none() && aggr.origin_id.as_deref() == Some(member_id) {
                aggr.origin = Some(full);
            }
        }
    }

    // ------------------------------------------------------------------
    // Option application
    // ------------------------------------------------------------------

    /// Attach buffered options: member-level ones to the previously
    /// completed item (falling back to the open subaggregate, then the
    /// aggregate itself), aggregate-level ones to their owner. With a
    /// capture, bitfield-shape options go to the member being opened;
    /// at END they modify the predecessor instead.
    fn apply_member_options(
        &mut self,
        options: Vec<PendingOption>,
        mut capture: Option<&mut NewMemberCapture>,
    ) {
        let has_prev = {
            let depth_open = self.aggregate_depth > 0;
            depth_open && self.last_member_item_mut().is_some()
        };
        let in_sub = !self.aggregate_path.is_empty();
        for option in options {
            match option {
                PendingOption::Align => {
                    self.set_alignment_option(has_prev, in_sub, Alignment::Natural)
                }
                PendingOption::NoAlign => {
                    self.set_alignment_option(has_prev, in_sub, Alignment::NoAlign)
                }
                PendingOption::BaseAlign(n) => {
                    let alignment = if n <= 0 {
                        Alignment::NoAlign
                    } else {
                        Alignment::Fixed(n as u32)
                    };
                    self.set_alignment_option(has_prev, in_sub, alignment)
                }
                PendingOption::Dimension(idx) => {
                    let dimension = self.dimensions.take(idx);
                    if dimension.is_none() {
                        continue;
                    }
                    if has_prev {
                        if let Some(it) = self.last_member_item_mut() {
                            it.dimension = dimension;
                        }
                    } else if in_sub {
                        if let Some(sub) = self.current_sub_mut() {
                            sub.dimension = dimension;
                        }
                    } else if let Some(aggr) = self.registry.aggregates.last_mut() {
                        aggr.dimension = dimension;
                    }
                }
                PendingOption::Prefix(p) => {
                    if has_prev {
                        if let Some(it) = self.last_member_item_mut() {
                            it.prefix = Some(p);
                        }
                    } else if in_sub {
                        if let Some(sub) = self.current_sub_mut() {
                            sub.prefix = Some(p);
                        }
                    } else if let Some(aggr) = self.registry.aggregates.last_mut() {
                        aggr.prefix = Some(p);
                    }
                }
                PendingOption::Tag(t) => {
                    if has_prev {
                        if let Some(it) = self.last_member_item_mut() {
                            it.tag = t;
                        }
                    } else if in_sub {
                        if let Some(sub) = self.current_sub_mut() {
                            sub.tag = t;
                        }
                    } else if let Some(aggr) = self.registry.aggregates.last_mut() {
                        aggr.tag = t;
                    }
                }
                PendingOption::Typedef => {
                    if has_prev {
                        if let Some(it) = self.last_member_item_mut() {
                            it.typedef = true;
                        }
                    } else if in_sub {
                        if let Some(sub) = self.current_sub_mut() {
                            sub.typedef = true;
                        }
                    } else if let Some(aggr) = self.registry.aggregates.last_mut() {
                        aggr.typedef = true;
                    }
                }
                PendingOption::Fill => {
                    if has_prev {
                        if let Some(it) = self.last_member_item_mut() {
                            it.fill = true;
                        }
                    } else if in_sub {
                        if let Some(sub) = self.current_sub_mut() {
                            sub.fill = true;
                        }
                    } else if let Some(aggr) = self.registry.aggregates.last_mut() {
                        aggr.fill = true;
                    }
                }
                PendingOption::Marker(m) => {
                    if has_prev {
                        continue;
                    }
                    if in_sub {
                        if let Some(sub) = self.current_sub_mut() {
                            sub.marker = Some(m);
                        }
                    } else if let Some(aggr) = self.registry.aggregates.last_mut() {
                        aggr.marker = Some(m);
                    }
                }
                PendingOption::Based(b) => {
                    if !has_prev && !in_sub {
                        if let Some(aggr) = self.registry.aggregates.last_mut() {
                            aggr.based_name = Some(b);
                        }
                    }
                }
                PendingOption::Origin(o) => {
                    if !has_prev && !in_sub {
                        if let Some(aggr) = self.registry.aggregates.last_mut() {
                            aggr.origin_id = Some(o);
                        }
                    }
                }
                PendingOption::Common => {
                    if !has_prev && !in_sub {
                        if let Some(aggr) = self.registry.aggregates.last_mut() {
                            aggr.common = true;
                        }
                    }
                }
                PendingOption::Global => {
                    if !has_prev && !in_sub {
                        if let Some(aggr) = self.registry.aggregates.last_mut() {
                            aggr.global = true;
                        }
                    }
                }
                PendingOption::Length(n) => match capture.as_deref_mut() {
                    Some(c) => c.length = Some(n),
                    None => {
                        if let Some(it) = self.last_member_item_mut() {
                            it.length = n;
                        }
                    }
                },
                PendingOption::Mask => match capture.as_deref_mut() {
                    Some(c) => c.mask = true,
                    None => {
                        if let Some(it) = self.last_member_item_mut() {
                            it.mask = true;
                        }
                    }
                },
                PendingOption::Signed => match capture.as_deref_mut() {
                    Some(c) => c.signed = true,
                    None => {
                        if let Some(it) = self.last_member_item_mut() {
                            it.unsigned = false;
                        }
                    }
                },
                PendingOption::SubType(t) => {
                    if let Some(c) = capture.as_deref_mut() {
                        if let TypeRef::Scalar(s) = t {
                            if s.is_integer() {
                                c.sized_host = ScalarType::bitfield_for_host(s);
                            }
                        }
                        c.subtype = Some(t);
                    }
                }
                _ => {}
            }
        }
    }

    fn set_alignment_option(&mut self, has_prev: bool, in_sub: bool, alignment: Alignment) {
        if has_prev {
            if let Some(it) = self.last_member_item_mut() {
                it.alignment = alignment;
                it.parent_alignment = false;
            }
        } else if in_sub {
            if let Some(sub) = self.current_sub_mut() {
                sub.alignment = alignment;
                sub.parent_alignment = false;
            }
        } else if let Some(aggr) = self.registry.aggregates.last_mut() {
            aggr.alignment = alignment;
            aggr.alignment_present = true;
        }
    }

    // ------------------------------------------------------------------
    // Container lookups
    // ------------------------------------------------------------------

    fn current_sub(&self) -> Option<&Subaggregate> {
        let (last, front) = self.aggregate_path.split_last()?;
        let aggr = self.registry.aggregates.last()?;
        let mut members = &aggr.members;
        for &idx in front {
            match members.get(idx)? {
                Member::Subaggregate(sub) => members = &sub.members,
                _ => return None,
            }
        }
        match members.get(*last)? {
            Member::Subaggregate(sub) => Some(sub),
            _ => None,
        }
    }

    fn container_prefix(&self) -> Option<String> {
        match self.current_sub() {
            Some(sub) => sub.prefix.clone(),
            None => self
                .registry
                .aggregates
                .last()
                .and_then(|a| a.prefix.clone()),
        }
    }

    fn container_marker(&self) -> Option<String> {
        match self.current_sub() {
            Some(sub) => sub.marker.clone(),
            None => self
                .registry
                .aggregates
                .last()
                .and_then(|a| a.marker.clone()),
        }
    }

    /// The container's alignment when it was set explicitly (directly
    /// or by inheritance from an explicit parent).
    fn container_explicit_alignment(&self) -> Option<Alignment> {
        let default_aggr = self.settings.default_aggregate_alignment();
        if let Some(sub) = self.current_sub() {
            if !sub.parent_alignment || sub.alignment != default_aggr {
                return Some(sub.alignment);
            }
        } else if let Some(aggr) = self.registry.aggregates.last() {
            if aggr.alignment_present || aggr.alignment != default_aggr {
                return Some(aggr.alignment);
            }
        }
        None
    }

    /// Alignment a new member inherits: the container's when it was set
    /// explicitly, otherwise the settings default for this natural size.
    fn container_alignment(&self, natural: i64) -> Alignment {
        self.container_explicit_alignment()
            .unwrap_or_else(|| self.settings.default_member_alignment(natural))
    }

    /// Nested aggregates inherit the aggregate-level default instead of
    /// the per-member cap; their own realignment happens at close.
    fn container_alignment_for_sub(&self) -> Alignment {
        self.container_explicit_alignment()
            .unwrap_or_else(|| self.settings.default_aggregate_alignment())
    }

    // ------------------------------------------------------------------
    // Derived constants
    // ------------------------------------------------------------------

    pub(crate) fn queue_size_constant(
        &mut self,
        id: &str,
        prefix: Option<&str>,
        size: i64,
        loc: SourceLoc,
    ) -> Status {
        let tag = if all_lower(id) { "s" } else { "S" };
        self.queue_constant(Constant {
            id: id.to_string(),
            prefix: prefix.map(str::to_string),
            tag: tag.to_string(),
            comment: None,
            type_name: None,
            radix: Radix::Dec,
            value: ConstantValue::Number(size),
            size: self.settings.word_size,
            loc,
        })
    }

    fn queue_bitfield_constants(
        &mut self,
        consts: Vec<bitfield::BitfieldConstant>,
        loc: SourceLoc,
    ) -> Status {
        let mut status = Status::Normal;
        for bc in consts {
            let (tag, radix, size) = if bc.is_mask {
                let tag = if all_lower(&bc.id) { "m" } else { "M" };
                (tag, Radix::Hex, bc.size)
            } else {
                let tag = if all_lower(&bc.id) { "s" } else { "S" };
                (tag, Radix::Dec, self.settings.word_size)
            };
            status = status.worst(self.queue_constant(Constant {
                id: bc.id,
                prefix: bc.prefix,
                tag: tag.to_string(),
                comment: None,
                type_name: None,
                radix,
                value: ConstantValue::Number(bc.value),
                size,
                loc,
            }));
        }
        status
    }
}
