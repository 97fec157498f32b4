// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Byte-offset assignment and aggregate sizing.
//!
//! Offsets are relative to the immediate parent aggregate. Structures
//! advance a running offset with alignment padding tracked in offsets
//! only; unions place every member at offset zero. Sizing happens at
//! aggregate close, after the trailing bitfield run is sealed.

use super::bitfield;
use super::model::{AggregateKind, Alignment, Member, MemberItem, SourceLoc};
use super::types::{ScalarType, TypeRef};

/// Module-wide layout state threaded through member placement.
pub struct LayoutEnv<'a> {
    pub word_size: i64,
    pub filler_count: &'a mut u32,
}

/// Assign the byte offset for a freshly created member, sealing any open
/// bitfield run first. The caller pushes the member afterwards.
pub fn place_member(
    env: &mut LayoutEnv<'_>,
    members: &mut Vec<Member>,
    member: &mut Member,
    parent_is_union: bool,
) {
    match member {
        Member::Comment(_) => {}
        Member::Item(it) if it.type_ref.is_bitfield() => {
            bitfield::place_bitfield(members, it, parent_is_union, env.filler_count);
        }
        _ => {
            bitfield::seal_run(members, parent_is_union, env.filler_count);
            let offset = if parent_is_union {
                0
            } else {
                match bitfield::last_layout_member(members).map(|idx| &members[idx]) {
                    Some(Member::Item(prev)) => prev.offset + prev.total_size(),
                    Some(Member::Subaggregate(prev)) => prev.offset + prev.total_size(),
                    _ => 0,
                }
            };
            match member {
                Member::Item(it) => {
                    let adjustment = it.alignment.adjustment(offset, it.size);
                    it.offset = offset + adjustment;
                }
                Member::Subaggregate(sub) => {
                    // Subaggregates realign themselves at close, once
                    // their first member is known.
                    sub.offset = offset;
                }
                Member::Comment(_) => unreachable!(),
            }
        }
    }
}

/// Result of closing an aggregate or subaggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateClose {
    pub size: i64,
    /// Realigned offset of a subaggregate within its parent.
    pub new_offset: Option<i64>,
}

fn member_natural_size(member: &Member) -> i64 {
    match member {
        Member::Item(it) => it.size,
        Member::Subaggregate(sub) => sub.size,
        Member::Comment(_) => 0,
    }
}

fn member_total_size(member: &Member) -> i64 {
    match member {
        Member::Item(it) => it.total_size(),
        Member::Subaggregate(sub) => sub.total_size(),
        Member::Comment(_) => 0,
    }
}

fn floor_filler(
    env: &mut LayoutEnv<'_>,
    members: &[Member],
    floor: ScalarType,
    floor_size: i64,
    prefix: Option<&str>,
    alignment: Alignment,
) -> MemberItem {
    let id = format!("filler_{:03}", *env.filler_count);
    *env.filler_count += 1;
    let last = bitfield::last_layout_member(members)
        .and_then(|idx| members[idx].as_item())
        .filter(|it| it.type_ref.is_bitfield());
    let (type_ref, size, length, bit_offset, tag) = match last {
        // The floor complements a bitfield union member bit-for-bit.
        Some(it) => {
            let host = ScalarType::bitfield_for_host(floor).unwrap_or(ScalarType::BitfieldOcta);
            let used = it.bit_offset + it.length;
            (
                TypeRef::Scalar(host),
                floor_size,
                floor_size * 8 - used,
                used,
                ScalarType::Bitfield.default_tag().to_lowercase(),
            )
        }
        None => (
            TypeRef::Scalar(floor),
            floor_size,
            0,
            0,
            floor.default_tag().to_lowercase(),
        ),
    };
    MemberItem {
        id,
        prefix: prefix.map(str::to_string),
        tag,
        type_ref,
        unsigned: false,
        size,
        offset: 0,
        bit_offset,
        length,
        precision: 0,
        scale: 0,
        mask: false,
        sized_bitfield: false,
        alignment,
        parent_alignment: true,
        dimension: None,
        subtype: None,
        typedef: false,
        fill: false,
        filler: true,
        loc: SourceLoc::default(),
    }
}

/// Seal the trailing bitfield run, realign a subaggregate's own offset
/// for its first member, and compute the aggregate's size.
///
/// `floor` is the aggregate's nominal type; for implicit unions it is
/// the scalar whose size floors the union. `sub_offset` carries the
/// current offset when a subaggregate is being closed.
pub fn finish_aggregate(
    env: &mut LayoutEnv<'_>,
    members: &mut Vec<Member>,
    kind: AggregateKind,
    floor: TypeRef,
    alignment: Alignment,
    sub_offset: Option<i64>,
    prefix: Option<&str>,
) -> AggregateClose {
    let is_union = kind.is_union();
    let floor_scalar = floor.as_scalar().filter(|_| kind == AggregateKind::ImplicitUnion);
    let floor_size = floor_scalar.map_or(0, |s| s.natural_size(env.word_size));

    // Realign the subaggregate so its first member lands on its natural
    // boundary (or the declared one).
    let new_offset = sub_offset.map(|offset| {
        let mut align_size = floor_size.max(1);
        if is_union {
            for member in members.iter() {
                align_size = align_size.max(member_natural_size(member));
            }
        } else if let Some(idx) = members.iter().position(|m| !m.is_comment()) {
            align_size = member_natural_size(&members[idx]).max(1);
        }
        offset + alignment.adjustment(offset, align_size)
    });

    bitfield::seal_run(members, is_union, env.filler_count);

    let size = if is_union {
        let mut size = members.iter().map(member_total_size).max().unwrap_or(0);
        if floor_size > size {
            if let Some(floor) = floor_scalar {
                let filler = floor_filler(env, members, floor, floor_size, prefix, alignment);
                members.push(Member::Item(filler));
            }
            size = floor_size;
        }
        size
    } else {
        match bitfield::last_layout_member(members) {
            Some(idx) => {
                let last = &members[idx];
                last.offset() + member_total_size(last)
            }
            None => 0,
        }
    };

    AggregateClose { size, new_offset }
}
