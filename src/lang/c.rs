// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! C language backend.
//!
//! Emits one header file per module: guard and prologue, `#define`
//! constants, item and enum declarations, struct/union blocks with
//! bitfields, and entry prototypes. Names render as
//! `<prefix><tag>_<id>`, with the prefix or tag dropped when
//! suppressed.

use std::io::Write;

use crate::core::error::{SdlError, SdlErrorKind};
use crate::core::model::{
    Aggregate, CommentMember, Constant, ConstantValue, Entry, Enumeration, Item, Member,
    MemberItem, Parameter, PassingMech, Subaggregate,
};
use crate::core::registry::TypeRegistry;
use crate::core::types::{Namespace, Radix, ScalarType, TypeRef};

use super::{BackendResult, EmitContext, EmitSettings, LanguageBackend};

/// C header emitter writing to `out`.
pub struct CBackend<W: Write> {
    out: W,
    settings: EmitSettings,
}

impl<W: Write> CBackend<W> {
    pub fn new(out: W, settings: EmitSettings) -> Self {
        Self { out, settings }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, text: &str) -> BackendResult {
        self.out
            .write_all(text.as_bytes())
            .map_err(|e| SdlError::new(SdlErrorKind::Abort).with_insert(format!("C output: {e}")))
    }

    /// `<prefix><tag>_<id>`, honouring the suppression switches. A
    /// suppressed or empty tag drops its underscore too.
    fn generate_name(&self, id: &str, prefix: Option<&str>, tag: &str) -> String {
        let mut out = String::new();
        if !self.settings.suppress_prefix {
            if let Some(prefix) = prefix {
                out.push_str(prefix);
            }
        }
        if !self.settings.suppress_tag && !tag.is_empty() {
            out.push_str(tag);
            out.push('_');
        }
        out.push_str(id);
        out
    }

    /// The C type spelling for a resolved type reference. User types
    /// chain through the registry to their underlying scalar; aggregate
    /// types render by generated name.
    fn c_type(&self, registry: &TypeRegistry, type_ref: TypeRef, unsigned: bool) -> String {
        match type_ref {
            TypeRef::Scalar(scalar) => scalar_type_str(scalar, unsigned),
            TypeRef::User(id) => match id.namespace() {
                Some(Namespace::Declare) => registry
                    .declare(id)
                    .map(|d| self.c_type(registry, d.base, d.unsigned))
                    .unwrap_or_else(|| "void *".to_string()),
                Some(Namespace::Item) => registry
                    .item(id)
                    .map(|i| self.c_type(registry, i.type_ref, i.unsigned))
                    .unwrap_or_else(|| "void *".to_string()),
                Some(Namespace::Aggregate) => registry
                    .aggregate(id)
                    .map(|a| {
                        let keyword = if a.kind.is_union() { "union" } else { "struct" };
                        let name = self.generate_name(&a.id, a.prefix.as_deref(), &a.tag);
                        format!("{keyword} {name}")
                    })
                    .unwrap_or_else(|| "void *".to_string()),
                Some(Namespace::Enum) => registry
                    .enumeration(id)
                    .map(|e| {
                        format!(
                            "enum {}",
                            self.generate_name(&e.id, e.prefix.as_deref(), &e.tag)
                        )
                    })
                    .unwrap_or_else(|| "void *".to_string()),
                None => "void *".to_string(),
            },
        }
    }

    /// One member declaration line, shared between standalone items and
    /// aggregate members.
    fn item_declaration(
        &self,
        registry: &TypeRegistry,
        id: &str,
        prefix: Option<&str>,
        tag: &str,
        type_ref: TypeRef,
        unsigned: bool,
        length: i64,
        precision: i64,
        bit_length: Option<i64>,
        dimension: Option<i64>,
    ) -> String {
        let name = self.generate_name(id, prefix, tag);
        let scalar = type_ref.as_scalar();
        match scalar {
            Some(ScalarType::CharVary) => {
                let bound = length.max(1);
                format!(
                    "struct {{ int16_t string_length; char string_text[{bound}]; }} {name}"
                )
            }
            Some(ScalarType::Char) if length > 0 || dimension.is_some() => {
                let bound = dimension.unwrap_or_else(|| length.max(1));
                format!("char {name}[{bound}]")
            }
            Some(ScalarType::Decimal) => {
                let bound = precision.max(1) + 1;
                format!("char {name}[{bound}]")
            }
            Some(s) if s.is_bitfield() => {
                let host = bitfield_host_str(s, unsigned);
                let bits = bit_length.unwrap_or(length);
                format!("{host} {name} : {bits}")
            }
            _ => {
                let type_str = self.c_type(registry, type_ref, unsigned);
                match dimension {
                    Some(dim) => format!("{type_str} {name}[{dim}]"),
                    None => format!("{type_str} {name}"),
                }
            }
        }
    }

    fn member_item(&mut self, ctx: &EmitContext<'_>, it: &MemberItem, depth: u32) -> BackendResult {
        let indent = leading_spaces(depth);
        let decl = self.item_declaration(
            ctx.registry,
            &it.id,
            it.prefix.as_deref(),
            &it.tag,
            it.type_ref,
            it.unsigned,
            it.length,
            it.precision,
            Some(it.length),
            it.dimension.map(|d| d.cardinality()),
        );
        self.write(&format!("{indent}{decl};\n"))
    }

    fn subaggregate_open(&mut self, sub: &Subaggregate, depth: u32) -> BackendResult {
        let indent = leading_spaces(depth);
        let keyword = if sub.kind.is_union() { "union" } else { "struct" };
        let marker = sub
            .marker
            .as_deref()
            .map(|m| format!("  /* {m} */"))
            .unwrap_or_default();
        self.write(&format!("{indent}{keyword} {{{marker}\n"))
    }

    fn subaggregate_close(&mut self, sub: &Subaggregate, depth: u32) -> BackendResult {
        let indent = leading_spaces(depth);
        let name = self.generate_name(&sub.id, sub.prefix.as_deref(), &sub.tag);
        match sub.dimension {
            Some(dim) => self.write(&format!("{indent}}} {name}[{}];\n", dim.cardinality())),
            None => self.write(&format!("{indent}}} {name};\n")),
        }
    }

    fn comment_text(&mut self, comment: &CommentMember, indent: &str) -> BackendResult {
        if !self.settings.comments {
            return Ok(());
        }
        let text = &comment.text;
        let rendered = if comment.line_comment {
            format!("{indent}/*{text} */\n")
        } else if comment.start_comment && comment.end_comment {
            format!("\n{indent}/*{text}*/\n")
        } else if comment.start_comment && text.is_empty() {
            format!("\n{indent}/*\n")
        } else if comment.start_comment {
            format!("\n{indent}/*\n{indent} *{text}\n")
        } else if comment.end_comment && text.is_empty() {
            format!("{indent} */\n")
        } else if comment.end_comment {
            format!("{indent} *{text}\n{indent} */\n")
        } else if comment.middle_comment {
            format!("{indent} *{text}\n")
        } else {
            format!("{indent}{text}\n")
        };
        self.write(&rendered)
    }

    fn parameter(&self, registry: &TypeRegistry, param: &Parameter, index: usize) -> String {
        let type_str = self.c_type(registry, param.type_ref, param.unsigned);
        let name = param
            .name
            .clone()
            .unwrap_or_else(|| format!("p{}", index + 1));
        match param.passing {
            PassingMech::ByValue => format!("{type_str} {name}"),
            PassingMech::ByReference => format!("{type_str} *{name}"),
        }
    }
}

fn scalar_type_str(scalar: ScalarType, unsigned: bool) -> String {
    use ScalarType::*;
    let integer = |base: &str| {
        if unsigned {
            format!("u{base}")
        } else {
            base.to_string()
        }
    };
    match scalar {
        Byte => integer("int8_t"),
        Word => integer("int16_t"),
        Long => integer("int32_t"),
        Quad => integer("int64_t"),
        Octa => {
            if unsigned {
                "unsigned __int128".to_string()
            } else {
                "__int128".to_string()
            }
        }
        SFloat | FFloat => "float".to_string(),
        TFloat | DFloat | GFloat => "double".to_string(),
        XFloat | HFloat => "long double".to_string(),
        SFloatComplex | FFloatComplex => "float _Complex".to_string(),
        TFloatComplex | DFloatComplex | GFloatComplex => "double _Complex".to_string(),
        XFloatComplex => "long double _Complex".to_string(),
        Decimal | Char | CharVary | CharStar => "char".to_string(),
        Bitfield | BitfieldByte | BitfieldWord | BitfieldLong | BitfieldQuad | BitfieldOcta => {
            bitfield_host_str(scalar, unsigned)
        }
        Addr | AddrLong | AddrQuad | AddrHw | Ptr | PtrLong | PtrQuad | PtrHw | Any => {
            "void *".to_string()
        }
        Boolean => "bool".to_string(),
        Void => "void".to_string(),
        Structure => "struct".to_string(),
        Union => "union".to_string(),
        Enum => "int".to_string(),
        Entry | Constant => "int".to_string(),
    }
}

fn bitfield_host_str(scalar: ScalarType, unsigned: bool) -> String {
    use ScalarType::*;
    let base = match scalar {
        BitfieldWord => "int16_t",
        BitfieldLong => "int32_t",
        BitfieldQuad => "int64_t",
        BitfieldOcta => "__int128",
        _ => "int8_t",
    };
    if scalar == BitfieldOcta {
        return if unsigned {
            "unsigned __int128".to_string()
        } else {
            "__int128".to_string()
        };
    }
    if unsigned {
        format!("u{base}")
    } else {
        base.to_string()
    }
}

fn leading_spaces(depth: u32) -> String {
    "    ".repeat(depth as usize)
}

fn guard_symbol(module: &str) -> String {
    let mut guard: String = module
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    guard.insert(0, '_');
    guard.push('_');
    guard
}

fn format_value(constant: &Constant) -> String {
    match &constant.value {
        ConstantValue::String(s) => format!("\"{s}\""),
        ConstantValue::Number(n) => match constant.radix {
            Radix::Dec => format!("{n}"),
            Radix::Oct => format!("0{:o}", *n as u64),
            Radix::Bin => format!("0x{:x}", *n as u64),
            Radix::Hex => {
                let width = (constant.size.clamp(1, 16) * 2) as usize;
                format!("0x{:0width$x}", *n as u64, width = width)
            }
        },
    }
}

impl<W: Write> LanguageBackend for CBackend<W> {
    fn name(&self) -> &str {
        "cc"
    }

    fn module_begin(&mut self, ctx: &EmitContext<'_>) -> BackendResult {
        if self.settings.header {
            let ident = ctx
                .ident
                .map(|i| format!(" IDENT = {i}"))
                .unwrap_or_default();
            self.write(&format!(
                "/*** MODULE {}{ident} ***/\n/* Generated by sdlforge from {} */\n",
                ctx.module_name, ctx.source
            ))?;
        }
        let guard = guard_symbol(ctx.module_name);
        self.write(&format!(
            "#ifndef {guard}\n#define {guard} 1\n\n#include <stdint.h>\n#include <stdbool.h>\n\n\
             #ifdef __cplusplus\nextern \"C\" {{\n#endif\n",
        ))
    }

    fn module_end(&mut self, ctx: &EmitContext<'_>) -> BackendResult {
        let guard = guard_symbol(ctx.module_name);
        self.write(&format!(
            "\n#ifdef __cplusplus\n}}\n#endif\n\n#endif /* {guard} */\n"
        ))?;
        self.out
            .flush()
            .map_err(|e| SdlError::new(SdlErrorKind::Abort).with_insert(format!("C output: {e}")))
    }

    fn item(&mut self, ctx: &EmitContext<'_>, item: &Item) -> BackendResult {
        let decl = self.item_declaration(
            ctx.registry,
            &item.id,
            item.prefix.as_deref(),
            &item.tag,
            item.type_ref,
            item.unsigned,
            item.length,
            item.precision,
            None,
            item.dimension.map(|d| d.cardinality()),
        );
        if item.typedef {
            self.write(&format!("typedef {decl};\n"))
        } else if item.common || item.global {
            self.write(&format!("extern {decl};\n"))
        } else {
            self.write(&format!("{decl};\n"))
        }
    }

    fn constant(&mut self, _ctx: &EmitContext<'_>, constant: &Constant) -> BackendResult {
        let name = self.generate_name(&constant.id, constant.prefix.as_deref(), &constant.tag);
        let value = format_value(constant);
        let comment = constant
            .comment
            .as_deref()
            .filter(|_| self.settings.comments)
            .map(|c| format!("\t/*{c} */"))
            .unwrap_or_default();
        self.write(&format!("#define {name}\t{value}{comment}\n"))
    }

    fn enumeration(&mut self, _ctx: &EmitContext<'_>, en: &Enumeration) -> BackendResult {
        let name = self.generate_name(&en.id, en.prefix.as_deref(), &en.tag);
        if en.typedef {
            self.write(&format!("typedef enum _{name} {{\n"))?;
        } else {
            self.write(&format!("enum {name} {{\n"))?;
        }
        for member in &en.members {
            let comment = member
                .comment
                .as_deref()
                .filter(|_| self.settings.comments)
                .map(|c| format!("\t/*{c} */"))
                .unwrap_or_default();
            if member.value_set {
                self.write(&format!("    {} = {},{comment}\n", member.id, member.value))?;
            } else {
                self.write(&format!("    {},{comment}\n", member.id))?;
            }
        }
        if en.typedef {
            self.write(&format!("}} {name};\n"))
        } else {
            self.write("};\n")
        }
    }

    fn aggregate_begin(&mut self, _ctx: &EmitContext<'_>, aggr: &Aggregate) -> BackendResult {
        let name = self.generate_name(&aggr.id, aggr.prefix.as_deref(), &aggr.tag);
        let keyword = if aggr.kind.is_union() { "union" } else { "struct" };
        let marker = aggr
            .marker
            .as_deref()
            .map(|m| format!("  /* {m} */"))
            .unwrap_or_default();
        if aggr.typedef {
            self.write(&format!("typedef {keyword} _{name} {{{marker}\n"))
        } else {
            self.write(&format!("{keyword} {name} {{{marker}\n"))
        }
    }

    fn aggregate_end(&mut self, _ctx: &EmitContext<'_>, aggr: &Aggregate) -> BackendResult {
        let name = self.generate_name(&aggr.id, aggr.prefix.as_deref(), &aggr.tag);
        let keyword = if aggr.kind.is_union() { "union" } else { "struct" };
        if let Some(origin) = aggr.origin_offset() {
            let id = aggr.origin_id.as_deref().unwrap_or("");
            self.write(&format!("    /* origin {id} at byte offset {origin} */\n"))?;
        }
        if aggr.typedef {
            self.write(&format!("}} {name};\n"))?;
        } else {
            self.write("};\n")?;
        }
        if let Some(based) = &aggr.based_name {
            self.write(&format!("typedef {keyword} {name} *{based};\n"))?;
        }
        Ok(())
    }

    fn member(
        &mut self,
        ctx: &EmitContext<'_>,
        member: &Member,
        depth: u32,
        closing: bool,
    ) -> BackendResult {
        match member {
            Member::Item(it) => self.member_item(ctx, it, depth),
            Member::Subaggregate(sub) => {
                if closing {
                    self.subaggregate_close(sub, depth)
                } else {
                    self.subaggregate_open(sub, depth)
                }
            }
            Member::Comment(comment) => {
                let indent = leading_spaces(depth);
                self.comment_text(comment, &indent)
            }
        }
    }

    fn comment(&mut self, _ctx: &EmitContext<'_>, comment: &CommentMember) -> BackendResult {
        self.comment_text(comment, "")
    }

    fn literal_line(&mut self, _ctx: &EmitContext<'_>, line: &str) -> BackendResult {
        self.write(&format!("{line}\n"))
    }

    fn entry(&mut self, ctx: &EmitContext<'_>, entry: &Entry) -> BackendResult {
        let returns = match entry.returns.type_ref {
            Some(type_ref) => self.c_type(ctx.registry, type_ref, entry.returns.unsigned),
            None => "void".to_string(),
        };
        let name = entry.alias.as_deref().unwrap_or(&entry.id);
        let mut params: Vec<String> = entry
            .parameters
            .iter()
            .enumerate()
            .map(|(idx, p)| self.parameter(ctx.registry, p, idx))
            .collect();
        if entry.variable {
            params.push("...".to_string());
        }
        let params = if params.is_empty() {
            "void".to_string()
        } else {
            params.join(", ")
        };
        self.write(&format!("extern {returns} {name}({params});\n"))
    }
}
