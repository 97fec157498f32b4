// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Resolved in-memory model of a module.
//!
//! Entities are created by directive calls during a module open/close
//! cycle and are owned by the enclosing [`super::registry::TypeRegistry`]
//! or module driver. Members form a tree: an aggregate owns its member
//! list, a subaggregate member owns its nested members. Cross-references
//! (origin) are stored as index paths, never as owning pointers.

use super::types::{Radix, ScalarType, TypeId, TypeRef};

/// Source span for a directive, `(first_line, first_col)` to
/// `(last_line, last_col)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceLoc {
    pub first_line: u32,
    pub first_col: u32,
    pub last_line: u32,
    pub last_col: u32,
}

impl SourceLoc {
    pub fn line(line: u32) -> Self {
        Self {
            first_line: line,
            first_col: 0,
            last_line: line,
            last_col: 0,
        }
    }
}

/// Alignment rule for an item, member, or aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    /// Packed; no padding is inserted.
    #[default]
    NoAlign,
    /// Pad to the entity's own natural size.
    Natural,
    /// Pad to an explicit power-of-two byte boundary.
    Fixed(u32),
}

impl Alignment {
    /// Bytes of padding needed to align `offset` for an entity of
    /// natural size `natural`.
    pub fn adjustment(self, offset: i64, natural: i64) -> i64 {
        let boundary = match self {
            Alignment::NoAlign => return 0,
            Alignment::Natural => natural,
            Alignment::Fixed(n) => i64::from(n),
        };
        if boundary <= 0 {
            return 0;
        }
        let rem = offset % boundary;
        if rem == 0 {
            0
        } else {
            boundary - rem
        }
    }
}

/// An inclusive array bound pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimension {
    pub lbound: i64,
    pub hbound: i64,
}

impl Dimension {
    pub fn cardinality(self) -> i64 {
        self.hbound - self.lbound + 1
    }
}

/// A type alias created by DECLARE.
#[derive(Debug, Clone)]
pub struct Declare {
    pub id: String,
    pub type_id: TypeId,
    pub prefix: Option<String>,
    pub tag: String,
    pub base: TypeRef,
    pub unsigned: bool,
    pub size: i64,
    pub loc: SourceLoc,
}

/// A named data slot created by ITEM.
#[derive(Debug, Clone)]
pub struct Item {
    pub id: String,
    pub type_id: TypeId,
    pub prefix: Option<String>,
    pub tag: String,
    pub type_ref: TypeRef,
    pub unsigned: bool,
    pub size: i64,
    pub alignment: Alignment,
    pub dimension: Option<Dimension>,
    pub common: bool,
    pub global: bool,
    pub typedef: bool,
    pub length: i64,
    pub precision: i64,
    pub scale: i64,
    pub subtype: Option<TypeRef>,
    pub loc: SourceLoc,
}

/// Struct-versus-union flavour of an aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    Structure,
    Union,
    /// A scalar type appeared where STRUCTURE/UNION was expected; the
    /// aggregate is a union floored at that scalar's size.
    ImplicitUnion,
}

impl AggregateKind {
    pub fn is_union(self) -> bool {
        matches!(self, AggregateKind::Union | AggregateKind::ImplicitUnion)
    }
}

/// A member of an aggregate: a contained item, a nested aggregate, or a
/// comment that never participates in layout.
#[derive(Debug, Clone)]
pub enum Member {
    Item(MemberItem),
    Subaggregate(Subaggregate),
    Comment(CommentMember),
}

impl Member {
    pub fn as_item(&self) -> Option<&MemberItem> {
        match self {
            Member::Item(it) => Some(it),
            _ => None,
        }
    }

    pub fn as_item_mut(&mut self) -> Option<&mut MemberItem> {
        match self {
            Member::Item(it) => Some(it),
            _ => None,
        }
    }

    pub fn as_subaggregate(&self) -> Option<&Subaggregate> {
        match self {
            Member::Subaggregate(sub) => Some(sub),
            _ => None,
        }
    }

    pub fn is_comment(&self) -> bool {
        matches!(self, Member::Comment(_))
    }

    pub fn is_bitfield(&self) -> bool {
        matches!(self, Member::Item(it) if it.type_ref.is_bitfield())
    }

    /// The member's byte offset relative to its immediate parent.
    /// Comments have no offset.
    pub fn offset(&self) -> i64 {
        match self {
            Member::Item(it) => it.offset,
            Member::Subaggregate(sub) => sub.offset,
            Member::Comment(_) => 0,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Member::Item(it) => Some(&it.id),
            Member::Subaggregate(sub) => Some(&sub.id),
            Member::Comment(_) => None,
        }
    }
}

/// A data member fully contained in its aggregate.
#[derive(Debug, Clone)]
pub struct MemberItem {
    pub id: String,
    pub prefix: Option<String>,
    pub tag: String,
    pub type_ref: TypeRef,
    pub unsigned: bool,
    /// Natural size of one element; for bitfields the host width in
    /// bytes.
    pub size: i64,
    /// Byte offset relative to the immediate parent aggregate.
    pub offset: i64,
    /// Bit position within the host integer (bitfields only).
    pub bit_offset: i64,
    /// Character count, or declared bit length for bitfields.
    pub length: i64,
    pub precision: i64,
    pub scale: i64,
    /// Emit a mask constant for this bitfield at aggregate close.
    pub mask: bool,
    /// The bitfield host width was written in the source; promotion must
    /// leave it alone.
    pub sized_bitfield: bool,
    pub alignment: Alignment,
    /// Alignment was inherited from the parent rather than written on
    /// the member.
    pub parent_alignment: bool,
    pub dimension: Option<Dimension>,
    pub subtype: Option<TypeRef>,
    pub typedef: bool,
    pub fill: bool,
    /// Compiler-synthesised padding member.
    pub filler: bool,
    pub loc: SourceLoc,
}

impl MemberItem {
    /// Bytes one element occupies in layout: natural size times length
    /// (or precision), plus the 2-byte count prefix for varying text and
    /// the sign byte for packed decimal.
    pub fn real_size(&self) -> i64 {
        let scalar = self.type_ref.as_scalar();
        let length = match scalar {
            Some(ScalarType::Char) | Some(ScalarType::CharVary) => self.length.max(1),
            Some(ScalarType::Decimal) => self.precision.max(1),
            _ => 1,
        };
        let mut size = self.size * length;
        match scalar {
            Some(ScalarType::CharVary) => size += 2,
            Some(ScalarType::Decimal) => size += 1,
            _ => {}
        }
        size
    }

    /// `real_size` times the array cardinality.
    pub fn total_size(&self) -> i64 {
        let dim = self.dimension.map_or(1, Dimension::cardinality);
        self.real_size() * dim
    }
}

/// A nested aggregate member.
#[derive(Debug, Clone)]
pub struct Subaggregate {
    pub id: String,
    pub type_id: TypeId,
    pub prefix: Option<String>,
    pub marker: Option<String>,
    pub tag: String,
    pub kind: AggregateKind,
    /// The scalar floor type for implicit unions, otherwise
    /// Structure/Union.
    pub type_ref: TypeRef,
    pub unsigned: bool,
    pub based_name: Option<String>,
    pub alignment: Alignment,
    pub parent_alignment: bool,
    pub dimension: Option<Dimension>,
    /// Byte offset relative to the immediate parent aggregate.
    pub offset: i64,
    pub size: i64,
    pub typedef: bool,
    pub fill: bool,
    pub members: Vec<Member>,
    pub loc: SourceLoc,
}

impl Subaggregate {
    pub fn total_size(&self) -> i64 {
        let dim = self.dimension.map_or(1, Dimension::cardinality);
        self.size * dim
    }
}

/// Authoring position of a comment inside an aggregate body.
#[derive(Debug, Clone)]
pub struct CommentMember {
    pub text: String,
    pub line_comment: bool,
    pub start_comment: bool,
    pub middle_comment: bool,
    pub end_comment: bool,
    pub loc: SourceLoc,
}

/// A top-level structure or union definition.
#[derive(Debug, Clone)]
pub struct Aggregate {
    pub id: String,
    pub type_id: TypeId,
    pub prefix: Option<String>,
    pub marker: Option<String>,
    pub tag: String,
    pub based_name: Option<String>,
    pub kind: AggregateKind,
    /// Scalar floor for implicit unions.
    pub type_ref: TypeRef,
    pub unsigned: bool,
    pub alignment: Alignment,
    pub alignment_present: bool,
    pub origin_id: Option<String>,
    /// Index path from `members` down to the origin member, recorded on
    /// first append of a member whose id matches `origin_id`.
    pub origin: Option<Vec<usize>>,
    pub dimension: Option<Dimension>,
    pub common: bool,
    pub global: bool,
    pub typedef: bool,
    pub fill: bool,
    pub size: i64,
    pub members: Vec<Member>,
    pub loc: SourceLoc,
}

impl Aggregate {
    /// Offset of the origin member, summed along the recorded path so
    /// nested origins come back relative to the aggregate itself.
    /// Offsets elsewhere stay source-literal; whether to subtract this
    /// is the backend's decision.
    pub fn origin_offset(&self) -> Option<i64> {
        let path = self.origin.as_ref()?;
        let mut members = &self.members;
        let mut offset = 0;
        for (hop, &idx) in path.iter().enumerate() {
            let member = members.get(idx)?;
            offset += member.offset();
            if hop + 1 < path.len() {
                members = &member.as_subaggregate()?.members;
            }
        }
        Some(offset)
    }
}

/// Value payload of a constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstantValue {
    Number(i64),
    String(String),
}

/// A named constant definition.
#[derive(Debug, Clone)]
pub struct Constant {
    pub id: String,
    pub prefix: Option<String>,
    pub tag: String,
    pub comment: Option<String>,
    pub type_name: Option<String>,
    pub radix: Radix,
    pub value: ConstantValue,
    /// Width in bytes used when rendering mask literals.
    pub size: i64,
    pub loc: SourceLoc,
}

/// One member of an enumeration.
#[derive(Debug, Clone)]
pub struct EnumMember {
    pub id: String,
    pub value: i64,
    pub value_set: bool,
    pub comment: Option<String>,
}

/// An enumeration definition.
#[derive(Debug, Clone)]
pub struct Enumeration {
    pub id: String,
    pub type_id: TypeId,
    pub prefix: Option<String>,
    pub tag: String,
    pub typedef: bool,
    pub size: i64,
    pub members: Vec<EnumMember>,
    pub loc: SourceLoc,
}

/// How an entry parameter is passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassingMech {
    ByValue,
    ByReference,
}

/// One parameter of an entry definition.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: Option<String>,
    pub type_ref: TypeRef,
    pub unsigned: bool,
    pub passing: PassingMech,
    pub is_in: bool,
    pub is_out: bool,
    pub default_value: Option<i64>,
    pub bound: Option<i64>,
    pub type_name: Option<String>,
    pub optional: bool,
    pub list: bool,
    pub loc: SourceLoc,
}

/// Return descriptor of an entry.
#[derive(Debug, Clone, Default)]
pub struct ReturnSpec {
    pub type_ref: Option<TypeRef>,
    pub unsigned: bool,
    pub named: Option<String>,
}

/// A function or procedure signature created by ENTRY.
#[derive(Debug, Clone)]
pub struct Entry {
    pub id: String,
    pub alias: Option<String>,
    pub linkage: Option<String>,
    pub type_name: Option<String>,
    pub variable: bool,
    pub returns: ReturnSpec,
    pub parameters: Vec<Parameter>,
    pub loc: SourceLoc,
}
