// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! End-to-end dispatcher tests: parse SDL fragments and inspect the
//! resolved module, diagnostics, and backend callback stream.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;

use super::{Compiler, Settings};
use crate::core::error::{SdlErrorKind, Status};
use crate::core::model::{Aggregate, AggregateKind, ConstantValue, Member};
use crate::core::types::{ScalarType, TypeRef};
use crate::lang::{
    BackendResult, BackendSet, EmitContext, LanguageBackend,
};
use crate::parser::Parser;

type Log = Rc<RefCell<Vec<String>>>;

/// Backend that records every callback for assertions.
struct RecordingBackend {
    name: &'static str,
    log: Log,
}

impl RecordingBackend {
    fn new(name: &'static str, log: Log) -> Self {
        Self { name, log }
    }

    fn push(&self, entry: String) {
        self.log.borrow_mut().push(format!("{}:{}", self.name, entry));
    }
}

impl LanguageBackend for RecordingBackend {
    fn name(&self) -> &str {
        self.name
    }

    fn module_begin(&mut self, ctx: &EmitContext<'_>) -> BackendResult {
        self.push(format!("module_begin {}", ctx.module_name));
        Ok(())
    }

    fn module_end(&mut self, ctx: &EmitContext<'_>) -> BackendResult {
        self.push(format!("module_end {}", ctx.module_name));
        Ok(())
    }

    fn item(&mut self, _ctx: &EmitContext<'_>, item: &crate::core::model::Item) -> BackendResult {
        self.push(format!("item {}", item.id));
        Ok(())
    }

    fn constant(
        &mut self,
        _ctx: &EmitContext<'_>,
        constant: &crate::core::model::Constant,
    ) -> BackendResult {
        let value = match &constant.value {
            ConstantValue::Number(n) => n.to_string(),
            ConstantValue::String(s) => format!("\"{s}\""),
        };
        self.push(format!("constant {}_{}={}", constant.tag, constant.id, value));
        Ok(())
    }

    fn enumeration(
        &mut self,
        _ctx: &EmitContext<'_>,
        en: &crate::core::model::Enumeration,
    ) -> BackendResult {
        self.push(format!("enum {} ({} members)", en.id, en.members.len()));
        Ok(())
    }

    fn aggregate_begin(&mut self, _ctx: &EmitContext<'_>, aggr: &Aggregate) -> BackendResult {
        self.push(format!("aggregate_begin {}", aggr.id));
        Ok(())
    }

    fn aggregate_end(&mut self, _ctx: &EmitContext<'_>, aggr: &Aggregate) -> BackendResult {
        self.push(format!("aggregate_end {}", aggr.id));
        Ok(())
    }

    fn member(
        &mut self,
        _ctx: &EmitContext<'_>,
        member: &Member,
        depth: u32,
        closing: bool,
    ) -> BackendResult {
        let label = match member {
            Member::Item(it) => format!("item {}@{}", it.id, it.offset),
            Member::Subaggregate(sub) => {
                if closing {
                    format!("subend {}", sub.id)
                } else {
                    format!("sub {}@{}", sub.id, sub.offset)
                }
            }
            Member::Comment(c) => format!("comment {}", c.text.trim()),
        };
        self.push(format!("member[{depth}] {label}"));
        Ok(())
    }

    fn comment(
        &mut self,
        _ctx: &EmitContext<'_>,
        comment: &crate::core::model::CommentMember,
    ) -> BackendResult {
        self.push(format!("comment {}", comment.text.trim()));
        Ok(())
    }

    fn literal_line(&mut self, _ctx: &EmitContext<'_>, line: &str) -> BackendResult {
        self.push(format!("literal {line}"));
        Ok(())
    }

    fn entry(&mut self, _ctx: &EmitContext<'_>, entry: &crate::core::model::Entry) -> BackendResult {
        self.push(format!(
            "entry {} ({} params)",
            entry.id,
            entry.parameters.len()
        ));
        Ok(())
    }
}

fn compile_full(
    source: &str,
    settings: Settings,
    symbols: &[(&str, i64)],
    langs: &[&'static str],
) -> (Compiler, Log) {
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let mut backends = BackendSet::new();
    for lang in langs {
        backends.register(Box::new(RecordingBackend::new(lang, Rc::clone(&log))));
    }
    let mut table = crate::core::symbols::SymbolTable::new();
    for (name, value) in symbols {
        table.define(name, *value);
    }
    let mut compiler = Compiler::new(settings, table, backends);
    compiler.set_source("test.sdl");
    let mut parser = Parser::new(source);
    parser.run(&mut compiler);
    (compiler, log)
}

fn compile(source: &str) -> Compiler {
    compile_full(source, Settings::default(), &[], &["cc"]).0
}

fn compile_aligned(source: &str, align: u32) -> Compiler {
    let settings = Settings {
        align,
        ..Settings::default()
    };
    compile_full(source, settings, &[], &["cc"]).0
}

fn aggr<'a>(compiler: &'a Compiler, name: &str) -> &'a Aggregate {
    compiler
        .registry
        .aggregate_by_name(name)
        .unwrap_or_else(|| panic!("aggregate '{name}' not found"))
}

fn layout_offsets(aggr: &Aggregate) -> Vec<i64> {
    aggr.members
        .iter()
        .filter(|m| !m.is_comment())
        .map(Member::offset)
        .collect()
}

fn constant_value(compiler: &Compiler, tag: &str, id: &str) -> i64 {
    let constant = compiler
        .constants
        .iter()
        .find(|c| c.id == id && c.tag == tag)
        .unwrap_or_else(|| panic!("constant {tag}_{id} not found"));
    match &constant.value {
        ConstantValue::Number(n) => *n,
        ConstantValue::String(_) => panic!("constant {tag}_{id} is a string"),
    }
}

fn diagnostics_kinds(compiler: &Compiler) -> Vec<SdlErrorKind> {
    compiler.diagnostics.iter().map(|d| d.error.kind).collect()
}

// ----------------------------------------------------------------------
// Aggregates and layout
// ----------------------------------------------------------------------

#[test]
fn empty_structure_reports_null_structure() {
    let compiler = compile(
        "MODULE m;\n\
         AGGREGATE s STRUCTURE;\n\
         END s;\n\
         END_MODULE m;\n",
    );
    assert!(diagnostics_kinds(&compiler).contains(&SdlErrorKind::NullStructure));
    let s = aggr(&compiler, "s");
    assert_eq!(s.size, 0);
    assert!(s.members.is_empty());
    // The size constant is still derived.
    assert_eq!(constant_value(&compiler, "s", "s"), 0);
}

#[test]
fn packed_scalars_run_back_to_back() {
    let compiler = compile(
        "MODULE m;\n\
         AGGREGATE s STRUCTURE;\n\
             a BYTE;\n\
             b WORD;\n\
             c LONGWORD;\n\
         END s;\n\
         END_MODULE m;\n",
    );
    let s = aggr(&compiler, "s");
    assert_eq!(layout_offsets(s), vec![0, 1, 3]);
    assert_eq!(s.size, 7);
    assert_eq!(constant_value(&compiler, "s", "s"), 7);
}

#[test]
fn align_caps_natural_alignment() {
    let compiler = compile_aligned(
        "MODULE m;\n\
         AGGREGATE s STRUCTURE;\n\
             a BYTE;\n\
             b WORD;\n\
             c LONGWORD;\n\
         END s;\n\
         END_MODULE m;\n",
        4,
    );
    let s = aggr(&compiler, "s");
    assert_eq!(layout_offsets(s), vec![0, 2, 4]);
    assert_eq!(s.size, 8);
}

#[test]
fn bitfields_pack_into_one_byte_then_the_next() {
    let compiler = compile(
        "MODULE m;\n\
         AGGREGATE flags STRUCTURE;\n\
             f1 BITFIELD LENGTH 3;\n\
             f2 BITFIELD LENGTH 5;\n\
             f3 BITFIELD LENGTH 1;\n\
         END flags;\n\
         END_MODULE m;\n",
    );
    let flags = aggr(&compiler, "flags");
    let items: Vec<_> = flags
        .members
        .iter()
        .filter_map(Member::as_item)
        .collect();
    assert_eq!(items.len(), 4, "three fields plus one tail filler");
    assert_eq!(
        items
            .iter()
            .take(3)
            .map(|it| (it.offset, it.bit_offset))
            .collect::<Vec<_>>(),
        vec![(0, 0), (0, 3), (1, 0)]
    );
    let filler = items[3];
    assert!(filler.filler);
    assert_eq!((filler.offset, filler.bit_offset, filler.length), (1, 1, 7));
    assert_eq!(flags.size, 2);
}

#[test]
fn adaptive_promotion_widens_both_fields() {
    let compiler = compile(
        "MODULE m;\n\
         AGGREGATE w STRUCTURE;\n\
             a BITFIELD LENGTH 6;\n\
             b BITFIELD LENGTH 6;\n\
         END w;\n\
         END_MODULE m;\n",
    );
    let w = aggr(&compiler, "w");
    let items: Vec<_> = w.members.iter().filter_map(Member::as_item).collect();
    assert_eq!(items[0].type_ref, TypeRef::Scalar(ScalarType::BitfieldWord));
    assert_eq!(items[1].type_ref, TypeRef::Scalar(ScalarType::BitfieldWord));
    assert_eq!(
        (items[0].bit_offset, items[1].bit_offset, items[1].offset),
        (0, 6, 0)
    );
    assert_eq!(w.size, 2);
}

#[test]
fn promotion_covers_the_64_bit_boundary() {
    let compiler = compile(
        "MODULE m;\n\
         AGGREGATE big STRUCTURE;\n\
             lo BITFIELD LENGTH 60;\n\
             hi BITFIELD LENGTH 10;\n\
         END big;\n\
         END_MODULE m;\n",
    );
    let big = aggr(&compiler, "big");
    let items: Vec<_> = big.members.iter().filter_map(Member::as_item).collect();
    assert_eq!(items[0].type_ref, TypeRef::Scalar(ScalarType::BitfieldOcta));
    assert_eq!(items[1].bit_offset, 60);
    assert_eq!(big.size, 16);
}

#[test]
fn sized_bitfields_keep_their_host() {
    let compiler = compile(
        "MODULE m;\n\
         AGGREGATE s STRUCTURE;\n\
             a BITFIELD BYTE LENGTH 6;\n\
             b BITFIELD BYTE LENGTH 6;\n\
         END s;\n\
         END_MODULE m;\n",
    );
    let s = aggr(&compiler, "s");
    let items: Vec<_> = s.members.iter().filter_map(Member::as_item).collect();
    assert_eq!(items[0].type_ref, TypeRef::Scalar(ScalarType::BitfieldByte));
    // b does not fit and the host cannot grow: a 2-bit filler seals the
    // first byte and b starts the next one.
    let named: Vec<_> = items.iter().filter(|it| !it.filler).collect();
    assert_eq!(named[1].offset, 1);
    assert_eq!(named[1].bit_offset, 0);
    let fillers: Vec<_> = items.iter().filter(|it| it.filler).collect();
    assert_eq!(fillers[0].length, 2);
}

#[test]
fn implicit_union_floors_at_the_scalar_size() {
    let compiler = compile(
        "MODULE m;\n\
         AGGREGATE x STRUCTURE LONGWORD;\n\
             a BITFIELD LENGTH 4;\n\
         END x;\n\
         END_MODULE m;\n",
    );
    let x = aggr(&compiler, "x");
    assert_eq!(x.kind, AggregateKind::ImplicitUnion);
    assert_eq!(x.size, 4);
    let filler = x
        .members
        .iter()
        .filter_map(Member::as_item)
        .find(|it| it.filler)
        .expect("floor filler present");
    assert_eq!(filler.length, 28);
    assert_eq!(filler.bit_offset, 4);
    assert_eq!(constant_value(&compiler, "s", "x"), 4);
}

#[test]
fn origin_records_the_member_without_shifting_offsets() {
    let compiler = compile(
        "MODULE m;\n\
         AGGREGATE q STRUCTURE ORIGIN b;\n\
             a ADDRESS;\n\
             b ADDRESS;\n\
         END q;\n\
         END_MODULE m;\n",
    );
    let q = aggr(&compiler, "q");
    assert_eq!(layout_offsets(q), vec![0, 8]);
    assert_eq!(q.size, 16);
    assert_eq!(q.origin_id.as_deref(), Some("b"));
    assert_eq!(q.origin_offset(), Some(8));
    assert_eq!(constant_value(&compiler, "s", "q"), 16);
}

#[test]
fn unions_share_offset_zero_and_take_the_maximum() {
    let compiler = compile(
        "MODULE m;\n\
         AGGREGATE u UNION;\n\
             a LONGWORD;\n\
             b QUADWORD;\n\
             c BYTE;\n\
         END u;\n\
         END_MODULE m;\n",
    );
    let u = aggr(&compiler, "u");
    assert_eq!(u.kind, AggregateKind::Union);
    assert_eq!(layout_offsets(u), vec![0, 0, 0]);
    assert_eq!(u.size, 8);
}

#[test]
fn nested_structures_report_relative_offsets() {
    let compiler = compile(
        "MODULE m;\n\
         AGGREGATE outer STRUCTURE;\n\
             a LONGWORD;\n\
             inner STRUCTURE;\n\
                 b BYTE;\n\
             END inner;\n\
             c BYTE;\n\
         END outer;\n\
         END_MODULE m;\n",
    );
    let outer = aggr(&compiler, "outer");
    assert_eq!(outer.size, 6);
    let sub = outer.members[1]
        .as_subaggregate()
        .expect("inner is a subaggregate");
    assert_eq!(sub.offset, 4);
    assert_eq!(sub.size, 1);
    assert_eq!(sub.members[0].offset(), 0);
    assert_eq!(outer.members[2].offset(), 5);
    // Every closed level derives a size constant.
    assert_eq!(constant_value(&compiler, "s", "inner"), 1);
    assert_eq!(constant_value(&compiler, "s", "outer"), 6);
}

#[test]
fn varying_text_adds_its_count_prefix_to_layout() {
    let compiler = compile(
        "MODULE m;\n\
         AGGREGATE s STRUCTURE;\n\
             v CHARACTER LENGTH 10 VARYING;\n\
             w BYTE;\n\
         END s;\n\
         END_MODULE m;\n",
    );
    let s = aggr(&compiler, "s");
    assert_eq!(layout_offsets(s), vec![0, 12]);
    assert_eq!(s.size, 13);
}

#[test]
fn packed_decimal_adds_its_sign_byte() {
    let compiler = compile(
        "MODULE m;\n\
         AGGREGATE s STRUCTURE;\n\
             d DECIMAL PRECISION (5, 2);\n\
             e BYTE;\n\
         END s;\n\
         END_MODULE m;\n",
    );
    let s = aggr(&compiler, "s");
    assert_eq!(layout_offsets(s), vec![0, 6]);
    assert_eq!(s.size, 7);
}

#[test]
fn dimensions_multiply_member_footprints() {
    let compiler = compile(
        "MODULE m;\n\
         AGGREGATE s STRUCTURE;\n\
             table LONGWORD DIMENSION 0:9;\n\
             next BYTE;\n\
         END s;\n\
         END_MODULE m;\n",
    );
    let s = aggr(&compiler, "s");
    assert_eq!(layout_offsets(s), vec![0, 40]);
    assert_eq!(s.size, 41);
}

#[test]
fn mask_constants_follow_the_formula() {
    let compiler = compile(
        "MODULE m;\n\
         AGGREGATE fl STRUCTURE;\n\
             low BITFIELD LENGTH 3 MASK;\n\
             mid BITFIELD LENGTH 5 MASK;\n\
         END fl;\n\
         END_MODULE m;\n",
    );
    assert_eq!(constant_value(&compiler, "s", "low"), 3);
    assert_eq!(constant_value(&compiler, "m", "low"), 0b111);
    assert_eq!(constant_value(&compiler, "s", "mid"), 5);
    assert_eq!(constant_value(&compiler, "m", "mid"), 0b1_1111 << 3);
}

#[test]
fn uppercase_ids_get_uppercase_derived_tags() {
    let compiler = compile(
        "MODULE m;\n\
         AGGREGATE RECHDR STRUCTURE;\n\
             FLAGS BITFIELD LENGTH 2 MASK;\n\
         END RECHDR;\n\
         END_MODULE m;\n",
    );
    assert_eq!(constant_value(&compiler, "S", "RECHDR"), 1);
    assert_eq!(constant_value(&compiler, "S", "FLAGS"), 2);
    assert_eq!(constant_value(&compiler, "M", "FLAGS"), 0b11);
}

#[test]
fn check_mode_warns_about_unaligned_members() {
    let settings = Settings {
        check_alignment: true,
        ..Settings::default()
    };
    let (compiler, _log) = compile_full(
        "MODULE m;\n\
         AGGREGATE s STRUCTURE;\n\
             a BYTE;\n\
             b LONGWORD;\n\
         END s;\n\
         END_MODULE m;\n",
        settings,
        &[],
        &["cc"],
    );
    let warning = compiler
        .diagnostics
        .iter()
        .find(|d| d.error.kind == SdlErrorKind::UnalignedMember)
        .expect("unaligned member flagged");
    assert_eq!(warning.severity, crate::core::error::Severity::Warning);
    assert!(warning.format().starts_with("%SDL-W-UNALIGNED"));
}

#[test]
fn end_name_mismatch_is_reported() {
    let compiler = compile(
        "MODULE m;\n\
         AGGREGATE s STRUCTURE;\n\
             a BYTE;\n\
         END wrong;\n\
         END_MODULE m;\n",
    );
    assert!(diagnostics_kinds(&compiler).contains(&SdlErrorKind::MatchEndName));
}

#[test]
fn aggregate_errors_carry_the_enclosing_names() {
    let compiler = compile(
        "MODULE m;\n\
         AGGREGATE outer STRUCTURE;\n\
             inner STRUCTURE;\n\
             END inner;\n\
             a BYTE;\n\
         END outer;\n\
         END_MODULE m;\n",
    );
    let diag = compiler
        .diagnostics
        .iter()
        .find(|d| d.error.kind == SdlErrorKind::NullStructure)
        .expect("empty inner reported");
    assert_eq!(diag.aggregate_trace, vec!["outer".to_string()]);
}

// ----------------------------------------------------------------------
// Items, declares, constants, enums
// ----------------------------------------------------------------------

#[test]
fn declare_chain_supplies_size_and_tag() {
    let compiler = compile(
        "MODULE m;\n\
         DECLARE counter_t SIZEOF (QUADWORD);\n\
         ITEM total counter_t;\n\
         END_MODULE m;\n",
    );
    let declare = compiler.registry.declare_by_name("counter_t").unwrap();
    assert_eq!(declare.size, 8);
    assert_eq!(declare.tag, "q");
    let item = compiler.registry.item_by_name("total").unwrap();
    assert_eq!(item.size, 8);
    assert_eq!(item.tag, "q");
}

#[test]
fn declare_sizeof_bytes_makes_a_character_type() {
    let compiler = compile(
        "MODULE m;\n\
         DECLARE namebuf SIZEOF 32;\n\
         END_MODULE m;\n",
    );
    let declare = compiler.registry.declare_by_name("namebuf").unwrap();
    assert_eq!(declare.size, 32);
    assert_eq!(declare.base, TypeRef::Scalar(ScalarType::Char));
}

#[test]
fn item_star_length_is_rejected() {
    let compiler = compile(
        "MODULE m;\n\
         ITEM oops CHARACTER *;\n\
         END_MODULE m;\n",
    );
    assert!(diagnostics_kinds(&compiler).contains(&SdlErrorKind::InvalidUnknownLength));
    assert!(compiler.registry.item_by_name("oops").is_none());
}

#[test]
fn duplicate_names_collide_only_within_a_namespace() {
    let compiler = compile(
        "MODULE m;\n\
         ITEM shared LONGWORD;\n\
         AGGREGATE shared STRUCTURE;\n\
             a BYTE;\n\
         END shared;\n\
         ITEM shared WORD;\n\
         END_MODULE m;\n",
    );
    let kinds = diagnostics_kinds(&compiler);
    assert_eq!(
        kinds
            .iter()
            .filter(|k| **k == SdlErrorKind::DuplicateName)
            .count(),
        1,
        "item/aggregate collision allowed, item/item rejected"
    );
}

#[test]
fn constant_lists_step_by_increment() {
    let (compiler, _log) = compile_full(
        "MODULE m;\n\
         CONSTANT red, green, blue EQUALS 4 INCREMENT 4;\n\
         END_MODULE m;\n",
        Settings::default(),
        &[],
        &["cc"],
    );
    assert_eq!(constant_value(&compiler, "k", "red"), 4);
    assert_eq!(constant_value(&compiler, "k", "green"), 8);
    assert_eq!(constant_value(&compiler, "k", "blue"), 12);
}

#[test]
fn constant_counters_track_the_last_value() {
    let compiler = compile(
        "MODULE m;\n\
         CONSTANT a, b EQUALS 5 INCREMENT 5 COUNTER ctr;\n\
         CONSTANT after EQUALS ctr + 1;\n\
         END_MODULE m;\n",
    );
    assert_eq!(compiler.locals.get("ctr"), Some(10));
    assert_eq!(constant_value(&compiler, "k", "after"), 11);
}

#[test]
fn constant_list_comments_attach_per_name() {
    let compiler = compile(
        "MODULE m;\n\
         CONSTANT first /* the first\n\
                  second { hidden } EQUALS 1 INCREMENT 1;\n\
         END_MODULE m;\n",
    );
    let first = compiler
        .constants
        .iter()
        .find(|c| c.id == "first")
        .unwrap();
    assert_eq!(first.comment.as_deref(), Some(" the first"));
    let second = compiler
        .constants
        .iter()
        .find(|c| c.id == "second")
        .unwrap();
    assert!(second.comment.is_none());
}

#[test]
fn string_constants_pass_through() {
    let compiler = compile(
        "MODULE m;\n\
         CONSTANT ident EQUALS STRING \"V2.1\";\n\
         END_MODULE m;\n",
    );
    let constant = compiler.constants.iter().find(|c| c.id == "ident").unwrap();
    assert_eq!(constant.value, ConstantValue::String("V2.1".to_string()));
}

#[test]
fn enumerations_auto_increment_by_one() {
    let (compiler, log) = compile_full(
        "MODULE m;\n\
         CONSTANT red, green, blue EQUALS 0 ENUMERATE colors;\n\
         END_MODULE m;\n",
        Settings::default(),
        &[],
        &["cc"],
    );
    let en = &compiler.registry.enums[0];
    assert_eq!(en.id, "colors");
    let values: Vec<i64> = en.members.iter().map(|m| m.value).collect();
    assert_eq!(values, vec![0, 1, 2]);
    assert!(en.members.iter().all(|m| !m.value_set));
    assert!(log
        .borrow()
        .iter()
        .any(|e| e.contains("enum colors (3 members)")));
}

#[test]
fn enumeration_members_flag_explicit_values() {
    let compiler = compile(
        "MODULE m;\n\
         CONSTANT one, two EQUALS 5 ENUMERATE nums;\n\
         END_MODULE m;\n",
    );
    let en = &compiler.registry.enums[0];
    assert!(en.members[0].value_set, "5 is not the enum default start");
    assert!(!en.members[1].value_set, "6 continues the sequence");
}

#[test]
fn local_variables_feed_expressions() {
    let compiler = compile(
        "MODULE m;\n\
         LOCAL base = 100;\n\
         CONSTANT derived EQUALS base * 2 + 1;\n\
         END_MODULE m;\n",
    );
    assert_eq!(constant_value(&compiler, "k", "derived"), 201);
}

// ----------------------------------------------------------------------
// Addresses and based aggregates
// ----------------------------------------------------------------------

#[test]
fn address_of_unbased_aggregate_is_rejected() {
    let compiler = compile(
        "MODULE m;\n\
         AGGREGATE target STRUCTURE;\n\
             a LONGWORD;\n\
         END target;\n\
         ITEM p ADDRESS (target);\n\
         END_MODULE m;\n",
    );
    assert!(diagnostics_kinds(&compiler).contains(&SdlErrorKind::AddressObjectNotBased));
}

#[test]
fn address_of_based_aggregate_is_accepted() {
    let compiler = compile(
        "MODULE m;\n\
         AGGREGATE target STRUCTURE BASED target_ptr;\n\
             a LONGWORD;\n\
         END target;\n\
         ITEM p ADDRESS (target);\n\
         END_MODULE m;\n",
    );
    assert!(!diagnostics_kinds(&compiler).contains(&SdlErrorKind::AddressObjectNotBased));
    let target = aggr(&compiler, "target");
    assert_eq!(target.based_name.as_deref(), Some("target_ptr"));
}

#[test]
fn zero_length_bitfield_is_rejected() {
    let compiler = compile(
        "MODULE m;\n\
         AGGREGATE s STRUCTURE;\n\
             bad BITFIELD LENGTH 0;\n\
             ok BYTE;\n\
         END s;\n\
         END_MODULE m;\n",
    );
    assert!(diagnostics_kinds(&compiler).contains(&SdlErrorKind::ZeroLength));
    let s = aggr(&compiler, "s");
    assert!(s.members.iter().all(|m| m.id() != Some("bad")));
}

// ----------------------------------------------------------------------
// Conditionals
// ----------------------------------------------------------------------

#[test]
fn ifsymbol_gates_processing() {
    let (compiler, _log) = compile_full(
        "MODULE m;\n\
         IFSYMBOL DEBUG;\n\
         ITEM hidden LONGWORD;\n\
         ELSE;\n\
         ITEM shown LONGWORD;\n\
         END_IFSYMBOL;\n\
         END_MODULE m;\n",
        Settings::default(),
        &[("DEBUG", 0)],
        &["cc"],
    );
    assert!(compiler.registry.item_by_name("hidden").is_none());
    assert!(compiler.registry.item_by_name("shown").is_some());
}

#[test]
fn undefined_symbol_is_reported() {
    let (compiler, _log) = compile_full(
        "MODULE m;\n\
         IFSYMBOL NOPE;\n\
         END_IFSYMBOL;\n\
         END_MODULE m;\n",
        Settings::default(),
        &[],
        &["cc"],
    );
    assert!(diagnostics_kinds(&compiler).contains(&SdlErrorKind::SymbolNotDefined));
}

#[test]
fn conditional_statements_out_of_order_are_rejected() {
    let compiler = compile(
        "MODULE m;\n\
         ELSE_IFSYMBOL X;\n\
         END_MODULE m;\n",
    );
    assert!(diagnostics_kinds(&compiler).contains(&SdlErrorKind::InvalidConditionalState));
}

#[test]
fn iflanguage_routes_output_per_backend() {
    let (_compiler, log) = compile_full(
        "MODULE m;\n\
         IFLANGUAGE cc;\n\
         CONSTANT only_c EQUALS 1;\n\
         END_IFLANGUAGE;\n\
         CONSTANT both EQUALS 2;\n\
         END_MODULE m;\n",
        Settings::default(),
        &[],
        &["cc", "pli"],
    );
    let log = log.borrow();
    assert!(log.iter().any(|e| e == "cc:constant k_only_c=1"));
    assert!(!log.iter().any(|e| e.starts_with("pli:constant k_only_c")));
    assert!(log.iter().any(|e| e == "cc:constant k_both=2"));
    assert!(log.iter().any(|e| e == "pli:constant k_both=2"));
}

#[test]
fn iflanguage_else_inverts_the_enable_vector() {
    let (_compiler, log) = compile_full(
        "MODULE m;\n\
         IFLANGUAGE cc;\n\
         CONSTANT c_only EQUALS 1;\n\
         ELSE;\n\
         CONSTANT pli_only EQUALS 2;\n\
         END_IFLANGUAGE;\n\
         END_MODULE m;\n",
        Settings::default(),
        &[],
        &["cc", "pli"],
    );
    let log = log.borrow();
    assert!(log.iter().any(|e| e == "cc:constant k_c_only=1"));
    assert!(log.iter().any(|e| e == "pli:constant k_pli_only=2"));
    assert!(!log.iter().any(|e| e == "pli:constant k_c_only=1"));
    assert!(!log.iter().any(|e| e == "cc:constant k_pli_only=2"));
}

#[test]
fn ifsymbol_nests_inside_iflanguage() {
    let (compiler, _log) = compile_full(
        "MODULE m;\n\
         IFLANGUAGE cc;\n\
         IFSYMBOL WIDE;\n\
         ITEM wide QUADWORD;\n\
         END_IFSYMBOL;\n\
         END_IFLANGUAGE;\n\
         END_MODULE m;\n",
        Settings::default(),
        &[("WIDE", 1)],
        &["cc"],
    );
    assert!(compiler.registry.item_by_name("wide").is_some());
    assert!(compiler.diagnostics.is_empty());
}

// ----------------------------------------------------------------------
// Comments, literals, entries, module protocol
// ----------------------------------------------------------------------

#[test]
fn comments_inside_aggregates_become_members() {
    let (compiler, log) = compile_full(
        "MODULE m;\n\
         /* top level\n\
         AGGREGATE s STRUCTURE;\n\
             a BYTE;\n\
             /* inline note\n\
             b BYTE;\n\
         END s;\n\
         END_MODULE m;\n",
        Settings::default(),
        &[],
        &["cc"],
    );
    let s = aggr(&compiler, "s");
    assert!(s.members.iter().any(|m| m.is_comment()));
    // Comment members do not disturb layout.
    assert_eq!(layout_offsets(s), vec![0, 1]);
    let log = log.borrow();
    assert!(log.iter().any(|e| e == "cc:comment top level"));
    assert!(log.iter().any(|e| e.contains("member[1] comment inline note")));
}

#[test]
fn literal_lines_flow_through_in_order() {
    let (_compiler, log) = compile_full(
        "MODULE m;\n\
         LITERAL;\n\
         #define FIRST 1\n\
         #define SECOND 2\n\
         END_LITERAL;\n\
         END_MODULE m;\n",
        Settings::default(),
        &[],
        &["cc"],
    );
    let log = log.borrow();
    let literals: Vec<&String> = log.iter().filter(|e| e.contains(":literal ")).collect();
    assert_eq!(
        literals,
        vec!["cc:literal #define FIRST 1", "cc:literal #define SECOND 2"]
    );
}

#[test]
fn entries_collect_parameters_and_attributes() {
    let (compiler, log) = compile_full(
        "MODULE m;\n\
         ENTRY sys$read ALIAS sysread RETURNS LONGWORD\n\
             PARAMETER (LONGWORD VALUE NAMED fd IN,\n\
                        CHARACTER * REFERENCE NAMED buffer OUT)\n\
             VARIABLE;\n\
         END_MODULE m;\n",
        Settings::default(),
        &[],
        &["cc"],
    );
    let entry = &compiler.entries[0];
    assert_eq!(entry.id, "sys$read");
    assert_eq!(entry.alias.as_deref(), Some("sysread"));
    assert!(entry.variable);
    assert_eq!(
        entry.returns.type_ref,
        Some(TypeRef::Scalar(ScalarType::Long))
    );
    assert_eq!(entry.parameters.len(), 2);
    assert_eq!(entry.parameters[0].name.as_deref(), Some("fd"));
    assert!(entry.parameters[0].is_in);
    assert_eq!(
        entry.parameters[1].type_ref,
        TypeRef::Scalar(ScalarType::CharStar),
        "star length is legal in entry parameters"
    );
    assert!(entry.parameters[1].is_out);
    assert!(log.borrow().iter().any(|e| e.contains("entry sys$read (2 params)")));
}

#[test]
fn module_end_releases_module_state() {
    let compiler = compile(
        "MODULE m;\n\
         LOCAL x = 1;\n\
         END_MODULE m;\n\
         END_MODULE m;\n",
    );
    assert!(compiler.locals.is_empty());
    assert!(diagnostics_kinds(&compiler).contains(&SdlErrorKind::MatchEndName));
}

#[test]
fn module_end_name_mismatch_is_reported() {
    let compiler = compile(
        "MODULE alpha;\n\
         END_MODULE beta;\n",
    );
    assert!(diagnostics_kinds(&compiler).contains(&SdlErrorKind::MatchEndName));
}

#[test]
fn backend_stream_orders_aggregate_callbacks() {
    let (_compiler, log) = compile_full(
        "MODULE m;\n\
         AGGREGATE s STRUCTURE;\n\
             a BYTE;\n\
             inner UNION;\n\
                 b BYTE;\n\
             END inner;\n\
         END s;\n\
         END_MODULE m;\n",
        Settings::default(),
        &[],
        &["cc"],
    );
    let log = log.borrow();
    let stream: Vec<&String> = log
        .iter()
        .filter(|e| e.contains("aggregate") || e.contains("member"))
        .collect();
    assert_eq!(
        stream,
        vec![
            "cc:aggregate_begin s",
            "cc:member[1] item a@0",
            "cc:member[1] sub inner@1",
            "cc:member[2] item b@0",
            "cc:member[1] subend inner",
            "cc:aggregate_end s",
        ]
    );
}

#[test]
fn prefix_option_attaches_to_the_previous_member() {
    let compiler = compile(
        "MODULE m;\n\
         AGGREGATE s STRUCTURE PREFIX ctx$;\n\
             a BYTE;\n\
             b BYTE PREFIX own$;\n\
         END s;\n\
         END_MODULE m;\n",
    );
    let s = aggr(&compiler, "s");
    // The aggregate prefix arrived before the first member and is
    // inherited; b's trailing prefix re-targets b itself when END
    // applies the buffered options.
    assert_eq!(s.prefix.as_deref(), Some("ctx$"));
    let a = s.members[0].as_item().unwrap();
    assert_eq!(a.prefix.as_deref(), Some("ctx$"));
    let b = s.members[1].as_item().unwrap();
    assert_eq!(b.prefix.as_deref(), Some("own$"));
}

#[test]
fn status_is_normal_for_a_clean_module() {
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let mut backends = BackendSet::new();
    backends.register(Box::new(RecordingBackend::new("cc", Rc::clone(&log))));
    let mut compiler = Compiler::new(
        Settings::default(),
        crate::core::symbols::SymbolTable::new(),
        backends,
    );
    let status = Parser::new(
        "MODULE m;\n\
         ITEM x LONGWORD;\n\
         END_MODULE m;\n",
    )
    .run(&mut compiler);
    assert_eq!(status, Status::Normal);
    assert!(compiler.diagnostics.is_empty());
}

// ----------------------------------------------------------------------
// Properties
// ----------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum GenType {
    Byte,
    Word,
    Long,
    Quad,
    Char(i64),
    Address,
}

impl GenType {
    fn source(&self) -> String {
        match self {
            GenType::Byte => "BYTE".to_string(),
            GenType::Word => "WORD".to_string(),
            GenType::Long => "LONGWORD".to_string(),
            GenType::Quad => "QUADWORD".to_string(),
            GenType::Char(n) => format!("CHARACTER LENGTH {n}"),
            GenType::Address => "ADDRESS".to_string(),
        }
    }
}

fn gen_type() -> impl Strategy<Value = GenType> {
    prop_oneof![
        Just(GenType::Byte),
        Just(GenType::Word),
        Just(GenType::Long),
        Just(GenType::Quad),
        (1i64..16).prop_map(GenType::Char),
        Just(GenType::Address),
    ]
}

proptest! {
    #[test]
    fn structure_members_stay_inside_the_computed_size(
        types in proptest::collection::vec(gen_type(), 1..8),
        dims in proptest::collection::vec(proptest::option::of(1i64..4), 1..8),
        align in prop_oneof![Just(0u32), Just(2), Just(4), Just(8)],
        union in proptest::bool::ANY,
    ) {
        let mut source = String::from("MODULE m;\nAGGREGATE s ");
        source.push_str(if union { "UNION" } else { "STRUCTURE" });
        source.push_str(";\n");
        for (idx, ty) in types.iter().enumerate() {
            let dim = dims
                .get(idx)
                .copied()
                .flatten()
                .map(|d| format!(" DIMENSION {d}"))
                .unwrap_or_default();
            source.push_str(&format!("    m{idx} {}{dim};\n", ty.source()));
        }
        source.push_str("END s;\nEND_MODULE m;\n");

        let settings = Settings { align, ..Settings::default() };
        let (compiler, _log) = compile_full(&source, settings, &[], &["cc"]);
        let s = aggr(&compiler, "s");
        let mut max_end = 0;
        for member in s.members.iter().filter(|m| !m.is_comment()) {
            let it = member.as_item().expect("scalar members only");
            prop_assert!(it.offset >= 0);
            let end = it.offset + it.total_size();
            prop_assert!(end <= s.size, "member {} ends at {end} past size {}", it.id, s.size);
            max_end = max_end.max(end);
            if union {
                prop_assert_eq!(it.offset, 0);
            }
        }
        prop_assert_eq!(max_end, s.size, "size is tight");
        // The derived size constant matches the aggregate size.
        prop_assert_eq!(constant_value(&compiler, "s", "s"), s.size);
    }

    #[test]
    fn bitfield_runs_respect_their_hosts(
        lengths in proptest::collection::vec(1i64..30, 1..7),
    ) {
        let mut source = String::from("MODULE m;\nAGGREGATE s STRUCTURE;\n");
        for (idx, len) in lengths.iter().enumerate() {
            source.push_str(&format!("    f{idx} BITFIELD LENGTH {len} MASK;\n"));
        }
        source.push_str("END s;\nEND_MODULE m;\n");
        let (compiler, _log) = compile_full(&source, Settings::default(), &[], &["cc"]);
        let s = aggr(&compiler, "s");

        for member in s.members.iter().filter_map(Member::as_item) {
            // Every field fits its host integer.
            prop_assert!(member.bit_offset + member.length <= member.size * 8);
            if member.filler {
                continue;
            }
            let mask = constant_value(&compiler, "m", &member.id);
            let ones = (1u128 << member.length) - 1;
            let expected = (ones << member.bit_offset) as u64 as i64;
            prop_assert_eq!(mask, expected, "mask mismatch for {}", &member.id);
        }
    }
}
