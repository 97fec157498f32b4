// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Bitfield packing.
//!
//! Consecutive bitfield members of one host width share a host integer.
//! Unsized bitfields may be promoted to a wider host when a run
//! overflows; explicitly sized bitfields keep their width. Unused tail
//! bits of a sealed run become a synthesised `filler_NNN` member unless
//! the parent is a union.

use super::model::{Member, MemberItem, SourceLoc};
use super::types::{ScalarType, TypeRef};

/// Unused bits between the end of `prev` and the end of its host.
pub fn tail_bits(prev: &MemberItem) -> i64 {
    prev.size * 8 - prev.bit_offset - prev.length
}

/// Index of the last member that takes part in layout.
pub fn last_layout_member(members: &[Member]) -> Option<usize> {
    members.iter().rposition(|m| !m.is_comment())
}

fn make_filler(prev: &MemberItem, bits: i64, number: u32) -> MemberItem {
    let mut filler = prev.clone();
    filler.id = format!("filler_{number:03}");
    filler.length = bits;
    filler.mask = false;
    filler.bit_offset = prev.bit_offset + prev.length;
    filler.dimension = None;
    filler.filler = true;
    filler
}

/// Seal an open bitfield run: when the last layout member is a bitfield
/// with unused tail bits and the parent is not a union, append a filler
/// covering those bits.
pub fn seal_run(members: &mut Vec<Member>, parent_is_union: bool, filler_count: &mut u32) {
    if parent_is_union {
        return;
    }
    let Some(idx) = last_layout_member(members) else {
        return;
    };
    let Some(prev) = members[idx].as_item() else {
        return;
    };
    if !prev.type_ref.is_bitfield() {
        return;
    }
    let avail = tail_bits(prev);
    if avail > 0 {
        let filler = make_filler(prev, avail, *filler_count);
        *filler_count += 1;
        members.push(Member::Item(filler));
    }
}

/// Walk backwards over the contiguous run of unsized bitfields ending at
/// `run_end`, add the incoming member's length, and promote the whole
/// run to the smallest host width in {8,16,32,64,128} that holds the
/// sum. Bit offsets of already placed members are preserved. The
/// incoming member adopts the run's host.
fn promote_run(members: &mut [Member], run_end: usize, incoming: &mut MemberItem) {
    let mut total = incoming.length;
    let mut run_start = run_end;
    let mut idx = run_end + 1;
    while idx > 0 {
        idx -= 1;
        match &members[idx] {
            Member::Comment(_) => continue,
            // A filler marks an already sealed run; stop there.
            Member::Item(it)
                if it.type_ref.is_bitfield() && !it.sized_bitfield && !it.filler =>
            {
                total += it.length;
                run_start = idx;
            }
            _ => break,
        }
    }
    let host = ScalarType::bitfield_for_bits(total);
    let host_size = host.natural_size(0);
    for member in &mut members[run_start..=run_end] {
        if let Some(it) = member.as_item_mut() {
            if it.type_ref.is_bitfield() && !it.sized_bitfield && it.size < host_size {
                it.type_ref = TypeRef::Scalar(host);
                it.size = host_size;
            }
        }
    }
    // The incoming member joins the run at the (possibly promoted)
    // host of its predecessor.
    if let Some(prev) = members[run_end].as_item() {
        if !prev.sized_bitfield {
            incoming.type_ref = prev.type_ref;
            incoming.size = prev.size;
        }
    }
}

/// Assign bit and byte offsets for a new bitfield member, promoting or
/// sealing the current run as needed. The caller pushes `member`
/// afterwards; fillers for a sealed run are appended here first.
///
/// Promotion applies only when the run still has unused tail bits the
/// new field overflows; an exactly full host starts a fresh run.
pub fn place_bitfield(
    members: &mut Vec<Member>,
    member: &mut MemberItem,
    parent_is_union: bool,
    filler_count: &mut u32,
) {
    let prev_idx = last_layout_member(members);
    let prev_bitfield = prev_idx
        .and_then(|idx| members[idx].as_item())
        .filter(|it| it.type_ref.is_bitfield())
        .cloned();

    let Some(prev) = prev_bitfield else {
        // A new run: place it after the previous member and let an
        // unsized field start at the smallest sufficient host.
        member.bit_offset = 0;
        member.offset = match prev_idx.map(|idx| &members[idx]) {
            _ if parent_is_union => 0,
            Some(Member::Item(it)) => it.offset + it.total_size(),
            Some(Member::Subaggregate(sub)) => sub.offset + sub.total_size(),
            _ => 0,
        };
        if !member.sized_bitfield {
            let host = ScalarType::bitfield_for_bits(member.length);
            member.type_ref = TypeRef::Scalar(host);
            member.size = host.natural_size(0);
        }
        return;
    };

    let prev_idx = prev_idx.unwrap_or_default();
    let run_is_unsized = !member.sized_bitfield && !prev.sized_bitfield;
    if run_is_unsized {
        member.type_ref = prev.type_ref;
        member.size = prev.size;
    }
    let avail = tail_bits(&prev);
    if member.size == prev.size && member.length <= avail {
        member.bit_offset = prev.bit_offset + prev.length;
        member.offset = prev.offset;
        return;
    }

    if avail > 0 && run_is_unsized {
        promote_run(members, prev_idx, member);
        if let Some(prev) = members[prev_idx].as_item() {
            let avail = tail_bits(prev);
            if member.size == prev.size && member.length <= avail {
                member.bit_offset = prev.bit_offset + prev.length;
                member.offset = prev.offset;
                return;
            }
        }
    }

    // Seal the run and start a fresh host integer. Promotion may have
    // widened the predecessor, so take a fresh snapshot.
    let prev = match members[prev_idx].as_item() {
        Some(it) => it.clone(),
        None => prev,
    };
    let avail = tail_bits(&prev);
    member.bit_offset = 0;
    member.offset = if parent_is_union {
        0
    } else {
        prev.offset + prev.size
    };
    if !member.sized_bitfield {
        let host = ScalarType::bitfield_for_bits(member.length);
        member.type_ref = TypeRef::Scalar(host);
        member.size = host.natural_size(0);
    }
    if avail > 0 && !parent_is_union {
        let filler = make_filler(&prev, avail, *filler_count);
        *filler_count += 1;
        members.push(Member::Item(filler));
    }
}

/// Mask and size constant requests derived from the bitfields of one
/// member list at aggregate close. Fillers are skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitfieldConstant {
    pub id: String,
    pub prefix: Option<String>,
    /// `false` for the decimal size constant, `true` for the hex mask.
    pub is_mask: bool,
    pub value: i64,
    /// Host width in bytes, controlling how wide the mask renders.
    pub size: i64,
    pub loc: SourceLoc,
}

pub fn bitfield_constants(members: &[Member]) -> Vec<BitfieldConstant> {
    let mut out = Vec::new();
    for member in members {
        let Some(it) = member.as_item() else {
            continue;
        };
        if !it.type_ref.is_bitfield() || it.filler {
            continue;
        }
        out.push(BitfieldConstant {
            id: it.id.clone(),
            prefix: it.prefix.clone(),
            is_mask: false,
            value: it.length,
            size: 0,
            loc: it.loc,
        });
        if it.mask {
            // TODO: octaword masks overflow a 64-bit constant value;
            // computed in u128 and truncated until ConstantValue grows
            // a wide variant.
            let ones: u128 = if it.length >= 128 {
                u128::MAX
            } else {
                (1u128 << it.length) - 1
            };
            let shifted = ones << (it.bit_offset.clamp(0, 127) as u32);
            let value = shifted as u64 as i64;
            out.push(BitfieldConstant {
                id: it.id.clone(),
                prefix: it.prefix.clone(),
                is_mask: true,
                value,
                size: it.size,
                loc: it.loc,
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Alignment;

    fn bitfield(id: &str, length: i64, sized: Option<ScalarType>) -> MemberItem {
        let type_ref = TypeRef::Scalar(sized.unwrap_or(ScalarType::BitfieldByte));
        MemberItem {
            id: id.to_string(),
            prefix: None,
            tag: "V".to_string(),
            type_ref,
            unsigned: true,
            size: type_ref.as_scalar().unwrap().natural_size(0),
            offset: 0,
            bit_offset: 0,
            length,
            precision: 0,
            scale: 0,
            mask: false,
            sized_bitfield: sized.is_some(),
            alignment: Alignment::NoAlign,
            parent_alignment: true,
            dimension: None,
            subtype: None,
            typedef: false,
            fill: false,
            filler: false,
            loc: SourceLoc::default(),
        }
    }

    fn push_bitfield(members: &mut Vec<Member>, mut item: MemberItem, fillers: &mut u32) {
        place_bitfield(members, &mut item, false, fillers);
        members.push(Member::Item(item));
    }

    #[test]
    fn fields_extend_a_byte_host() {
        let mut members = Vec::new();
        let mut fillers = 0;
        push_bitfield(&mut members, bitfield("f1", 3, None), &mut fillers);
        push_bitfield(&mut members, bitfield("f2", 5, None), &mut fillers);
        let f1 = members[0].as_item().unwrap();
        let f2 = members[1].as_item().unwrap();
        assert_eq!((f1.offset, f1.bit_offset), (0, 0));
        assert_eq!((f2.offset, f2.bit_offset), (0, 3));
        assert_eq!(fillers, 0);
    }

    #[test]
    fn exact_fit_starts_the_next_host_without_filler() {
        let mut members = Vec::new();
        let mut fillers = 0;
        push_bitfield(&mut members, bitfield("f1", 3, None), &mut fillers);
        push_bitfield(&mut members, bitfield("f2", 5, None), &mut fillers);
        let mut f3 = bitfield("f3", 1, None);
        place_bitfield(&mut members, &mut f3, false, &mut fillers);
        // f1+f2 fill their byte exactly; f3 starts a fresh byte host
        // rather than widening the full run.
        assert_eq!((f3.offset, f3.bit_offset), (1, 0));
        assert_eq!(f3.type_ref, TypeRef::Scalar(ScalarType::BitfieldByte));
        assert_eq!(fillers, 0, "a full host leaves nothing to fill");
        members.push(Member::Item(f3));
        seal_run(&mut members, false, &mut fillers);
        let tail = members.last().unwrap().as_item().unwrap();
        assert!(tail.filler);
        assert_eq!(tail.length, 7);
        assert_eq!(tail.bit_offset, 1);
    }

    #[test]
    fn adaptive_promotion_widens_the_whole_run() {
        let mut members = Vec::new();
        let mut fillers = 0;
        push_bitfield(&mut members, bitfield("a", 6, None), &mut fillers);
        push_bitfield(&mut members, bitfield("b", 6, None), &mut fillers);
        let a = members[0].as_item().unwrap();
        let b = members[1].as_item().unwrap();
        assert_eq!(a.type_ref, TypeRef::Scalar(ScalarType::BitfieldWord));
        assert_eq!(a.size, 2);
        assert_eq!((a.offset, a.bit_offset), (0, 0));
        assert_eq!(b.type_ref, TypeRef::Scalar(ScalarType::BitfieldWord));
        assert_eq!((b.offset, b.bit_offset), (0, 6));
    }

    #[test]
    fn promotion_crosses_the_64_bit_boundary() {
        let mut members = Vec::new();
        let mut fillers = 0;
        push_bitfield(&mut members, bitfield("lo", 60, None), &mut fillers);
        push_bitfield(&mut members, bitfield("hi", 10, None), &mut fillers);
        let lo = members[0].as_item().unwrap();
        let hi = members[1].as_item().unwrap();
        assert_eq!(lo.type_ref, TypeRef::Scalar(ScalarType::BitfieldOcta));
        assert_eq!(hi.type_ref, TypeRef::Scalar(ScalarType::BitfieldOcta));
        assert_eq!((hi.offset, hi.bit_offset), (0, 60));
    }

    #[test]
    fn sized_field_is_never_promoted() {
        let mut members = Vec::new();
        let mut fillers = 0;
        push_bitfield(
            &mut members,
            bitfield("a", 6, Some(ScalarType::BitfieldByte)),
            &mut fillers,
        );
        let mut b = bitfield("b", 6, Some(ScalarType::BitfieldByte));
        place_bitfield(&mut members, &mut b, false, &mut fillers);
        // No room in the byte host and no promotion allowed: a filler
        // seals the first host and b starts the next one.
        assert_eq!((b.offset, b.bit_offset), (1, 0));
        assert_eq!(fillers, 1);
        let filler = members.last().unwrap().as_item().unwrap();
        assert!(filler.filler);
        assert_eq!(filler.length, 2);
    }

    #[test]
    fn unsized_run_start_picks_smallest_host() {
        let mut members = Vec::new();
        let mut fillers = 0;
        push_bitfield(&mut members, bitfield("wide", 20, None), &mut fillers);
        let wide = members[0].as_item().unwrap();
        assert_eq!(wide.type_ref, TypeRef::Scalar(ScalarType::BitfieldLong));
        assert_eq!(wide.size, 4);
    }

    #[test]
    fn differing_host_width_starts_a_new_run() {
        let mut members = Vec::new();
        let mut fillers = 0;
        push_bitfield(
            &mut members,
            bitfield("a", 4, Some(ScalarType::BitfieldLong)),
            &mut fillers,
        );
        let mut b = bitfield("b", 4, Some(ScalarType::BitfieldByte));
        place_bitfield(&mut members, &mut b, false, &mut fillers);
        assert_eq!((b.offset, b.bit_offset), (4, 0));
        assert_eq!(fillers, 1);
        let filler = members.last().unwrap().as_item().unwrap();
        assert_eq!(filler.length, 28);
        assert_eq!(filler.bit_offset, 4);
    }

    #[test]
    fn union_runs_never_fill() {
        let mut members = Vec::new();
        let mut fillers = 0;
        let mut a = bitfield("a", 4, None);
        place_bitfield(&mut members, &mut a, true, &mut fillers);
        members.push(Member::Item(a));
        seal_run(&mut members, true, &mut fillers);
        assert_eq!(fillers, 0);
        assert_eq!(members.len(), 1);
    }

    #[test]
    fn constants_cover_size_and_mask() {
        let mut members = Vec::new();
        let mut fillers = 0;
        let mut f = bitfield("flags", 3, None);
        f.mask = true;
        push_bitfield(&mut members, f, &mut fillers);
        let mut g = bitfield("gate", 2, None);
        g.mask = true;
        push_bitfield(&mut members, g, &mut fillers);
        let consts = bitfield_constants(&members);
        assert_eq!(consts.len(), 4);
        assert_eq!(consts[0].id, "flags");
        assert!(!consts[0].is_mask);
        assert_eq!(consts[0].value, 3);
        assert!(consts[1].is_mask);
        assert_eq!(consts[1].value, 0b111);
        assert!(consts[3].is_mask);
        assert_eq!(consts[3].value, 0b11 << 3);
    }

    #[test]
    fn fillers_get_no_constants() {
        let mut members = Vec::new();
        let mut fillers = 0;
        push_bitfield(&mut members, bitfield("only", 3, None), &mut fillers);
        seal_run(&mut members, false, &mut fillers);
        assert_eq!(members.len(), 2);
        let consts = bitfield_constants(&members);
        assert_eq!(consts.len(), 1);
        assert_eq!(consts[0].id, "only");
    }
}
