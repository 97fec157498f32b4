// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Statement parser: turns token streams into dispatcher calls.
//!
//! Statement recognition is keyword-driven and recovery is per
//! statement: a malformed statement is reported once and the parser
//! resynchronises at the next semicolon. Bitfield-shape and character
//! length clauses are part of the type syntax and are pushed as options
//! before the member entry fires; trailing options are pushed after it,
//! attaching to the statement's entity when the next one opens.

use crate::compiler::options::PendingOption;
use crate::compiler::{Compiler, MemberPayload, SizeSpec};
use crate::core::error::{SdlError, SdlErrorKind, Status};
use crate::core::model::{ConstantValue, PassingMech, SourceLoc};
use crate::core::types::{Radix, ScalarType, TypeRef};
use crate::scanner::{Scanner, Token, TokenKind};

pub struct Parser<'a> {
    scanner: Scanner<'a>,
    lookahead: Option<Token>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            scanner: Scanner::new(source),
            lookahead: None,
        }
    }

    /// Drive the whole source through the dispatcher, returning the
    /// most severe status seen.
    pub fn run(&mut self, compiler: &mut Compiler) -> Status {
        let mut status = Status::Normal;
        loop {
            let token = self.peek().clone();
            match token.kind {
                TokenKind::Eof => break,
                TokenKind::Comment => {
                    self.next();
                    status = status.worst(compiler.comment_line(&token.text, loc(&token)));
                }
                TokenKind::Semicolon => {
                    self.next();
                }
                TokenKind::Name => {
                    status = status.worst(self.statement(compiler, &token));
                    if compiler.in_literal() {
                        status = status.worst(self.literal_body(compiler));
                    }
                }
                _ => {
                    self.next();
                    status = status.worst(compiler.fault(
                        token.line,
                        SdlError::new(SdlErrorKind::SyntaxError).with_insert(token.text.clone()),
                    ));
                    self.resync();
                }
            }
            if status == Status::Fatal {
                break;
            }
        }
        status
    }

    // ------------------------------------------------------------------
    // Token plumbing
    // ------------------------------------------------------------------

    fn peek(&mut self) -> &Token {
        if self.lookahead.is_none() {
            self.lookahead = Some(self.scanner.next_token());
        }
        self.lookahead.as_ref().expect("lookahead filled")
    }

    fn next(&mut self) -> Token {
        self.peek();
        self.lookahead.take().expect("lookahead filled")
    }

    fn accept_keyword(&mut self, keyword: &str) -> bool {
        if self.peek().is_keyword(keyword) {
            self.next();
            true
        } else {
            false
        }
    }

    fn accept_kind(&mut self, kind: TokenKind) -> Option<Token> {
        if self.peek().kind == kind {
            Some(self.next())
        } else {
            None
        }
    }

    /// Skip to just past the next semicolon.
    fn resync(&mut self) {
        loop {
            let token = self.next();
            if matches!(token.kind, TokenKind::Semicolon | TokenKind::Eof) {
                break;
            }
        }
    }

    fn syntax_error(&mut self, compiler: &mut Compiler, token: &Token) -> Status {
        let text = if token.text.is_empty() {
            format!("{:?}", token.kind)
        } else {
            token.text.clone()
        };
        let status = compiler.fault(
            token.line,
            SdlError::new(SdlErrorKind::SyntaxError).with_insert(text),
        );
        self.resync();
        status
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn statement(&mut self, compiler: &mut Compiler, head: &Token) -> Status {
        if head.is_keyword("MODULE") {
            self.next();
            return self.module(compiler);
        }
        if head.is_keyword("END_MODULE") {
            self.next();
            return self.end_module(compiler);
        }
        if head.is_keyword("DECLARE") {
            self.next();
            return self.declare(compiler);
        }
        if head.is_keyword("ITEM") {
            self.next();
            return self.item(compiler);
        }
        if head.is_keyword("CONSTANT") {
            self.next();
            return self.constant(compiler);
        }
        if head.is_keyword("AGGREGATE") {
            self.next();
            return self.aggregate(compiler);
        }
        if head.is_keyword("ENTRY") {
            self.next();
            return self.entry(compiler);
        }
        if head.is_keyword("LOCAL") {
            self.next();
            return self.local(compiler);
        }
        if head.is_keyword("LITERAL") {
            self.next();
            let status = compiler.literal_begin(loc(head));
            // Consume the terminator without tokenizing into the body;
            // the rest of the LITERAL line is not part of it.
            self.scanner.accept_punct(';');
            self.scanner.raw_line();
            return status;
        }
        if head.is_keyword("IFSYMBOL") {
            self.next();
            return self.if_symbol(compiler, false);
        }
        if head.is_keyword("ELSE_IFSYMBOL") {
            self.next();
            return self.if_symbol(compiler, true);
        }
        if head.is_keyword("ELSE") {
            self.next();
            self.accept_kind(TokenKind::Semicolon);
            return compiler.cond_else(loc(head));
        }
        if head.is_keyword("END_IFSYMBOL") {
            self.next();
            self.accept_kind(TokenKind::Semicolon);
            return compiler.end_if_symbol(loc(head));
        }
        if head.is_keyword("IFLANGUAGE") {
            self.next();
            return self.if_language(compiler);
        }
        if head.is_keyword("END_IFLANGUAGE") {
            self.next();
            while self.accept_kind(TokenKind::Name).is_some() || self.accept_kind(TokenKind::Comma).is_some() {}
            self.accept_kind(TokenKind::Semicolon);
            return compiler.end_if_language(loc(head));
        }
        if compiler.aggregate_depth > 0 {
            return self.member_statement(compiler);
        }
        let token = self.next();
        self.syntax_error(compiler, &token)
    }

    fn module(&mut self, compiler: &mut Compiler) -> Status {
        let Some(name) = self.accept_kind(TokenKind::Name) else {
            let token = self.next();
            return self.syntax_error(compiler, &token);
        };
        let mut ident = None;
        if self.accept_keyword("IDENT") {
            if let Some(text) = self.accept_kind(TokenKind::String) {
                ident = Some(text.text);
            }
        }
        self.accept_kind(TokenKind::Semicolon);
        compiler.module(&name.text, ident.as_deref(), loc(&name))
    }

    fn end_module(&mut self, compiler: &mut Compiler) -> Status {
        let name = self.accept_kind(TokenKind::Name);
        let line = self.scanner.line();
        self.accept_kind(TokenKind::Semicolon);
        compiler.module_end(name.as_ref().map(|t| t.text.as_str()), SourceLoc::line(line))
    }

    fn declare(&mut self, compiler: &mut Compiler) -> Status {
        let Some(name) = self.accept_kind(TokenKind::Name) else {
            let token = self.next();
            return self.syntax_error(compiler, &token);
        };
        if !self.accept_keyword("SIZEOF") {
            let token = self.next();
            return self.syntax_error(compiler, &token);
        }
        let spec = if self.accept_kind(TokenKind::OpenParen).is_some() {
            let Some((type_ref, _unsigned)) = self.datatype(compiler, false) else {
                let token = self.next();
                return self.syntax_error(compiler, &token);
            };
            self.accept_kind(TokenKind::CloseParen);
            SizeSpec::Type(type_ref)
        } else if let Some(n) = self.accept_kind(TokenKind::Integer) {
            SizeSpec::Bytes(n.value)
        } else {
            let token = self.next();
            return self.syntax_error(compiler, &token);
        };
        let mut status = compiler.declare(&name.text, spec, false, loc(&name));
        status = status.worst(self.options_until_semicolon(compiler));
        status.worst(compiler.declare_end(loc(&name)))
    }

    fn item(&mut self, compiler: &mut Compiler) -> Status {
        let Some(name) = self.accept_kind(TokenKind::Name) else {
            let token = self.next();
            return self.syntax_error(compiler, &token);
        };
        let Some((type_ref, unsigned)) = self.datatype(compiler, false) else {
            let token = self.next();
            return self.syntax_error(compiler, &token);
        };
        let mut status = compiler.item(&name.text, type_ref, unsigned, loc(&name));
        status = status.worst(self.options_until_semicolon(compiler));
        status.worst(compiler.item_end(loc(&name)))
    }

    fn constant(&mut self, compiler: &mut Compiler) -> Status {
        // Collect the raw name list, keeping output comments, up to
        // EQUALS.
        let start = self.peek().clone();
        let mut raw = String::new();
        loop {
            let token = self.peek().clone();
            match token.kind {
                TokenKind::Name if token.is_keyword("EQUALS") => {
                    self.next();
                    break;
                }
                TokenKind::Name => {
                    self.next();
                    raw.push_str(&token.text);
                }
                TokenKind::Comma => {
                    self.next();
                    raw.push_str(", ");
                }
                TokenKind::Comment => {
                    self.next();
                    raw.push_str("/*");
                    raw.push_str(&token.text);
                    raw.push('\n');
                }
                _ => {
                    let token = self.next();
                    return self.syntax_error(compiler, &token);
                }
            }
        }
        let value = if self.accept_keyword("STRING") {
            match self.accept_kind(TokenKind::String) {
                Some(text) => ConstantValue::String(text.text),
                None => {
                    let token = self.next();
                    return self.syntax_error(compiler, &token);
                }
            }
        } else {
            match self.expression(compiler) {
                Some(v) => ConstantValue::Number(v),
                None => {
                    let token = self.next();
                    return self.syntax_error(compiler, &token);
                }
            }
        };
        let mut status = compiler.constant(&raw, value, loc(&start));
        status = status.worst(self.options_until_semicolon(compiler));
        status.worst(compiler.constant_end(loc(&start)))
    }

    fn aggregate(&mut self, compiler: &mut Compiler) -> Status {
        let Some(name) = self.accept_kind(TokenKind::Name) else {
            let token = self.next();
            return self.syntax_error(compiler, &token);
        };
        let union = if self.accept_keyword("STRUCTURE") {
            false
        } else if self.accept_keyword("UNION") {
            true
        } else {
            let token = self.next();
            return self.syntax_error(compiler, &token);
        };
        let (scalar, unsigned) = self.implicit_scalar();
        let mut status = compiler.aggregate(&name.text, union, scalar, unsigned, loc(&name));
        status = status.worst(self.options_until_semicolon(compiler));
        status
    }

    /// An optional scalar after STRUCTURE/UNION, making the aggregate an
    /// implicit union.
    fn implicit_scalar(&mut self) -> (Option<ScalarType>, bool) {
        let unsigned = self.accept_keyword("UNSIGNED");
        for (keyword, scalar) in INTEGER_TYPES {
            if self.accept_keyword(keyword) {
                return (Some(*scalar), unsigned);
            }
        }
        (None, unsigned)
    }

    fn member_statement(&mut self, compiler: &mut Compiler) -> Status {
        let head = self.next();
        if head.is_keyword("END") {
            let name = self
                .peek()
                .clone()
                .is_name_not_option()
                .then(|| self.next().text);
            let mut status = self.options_until_semicolon(compiler);
            status =
                status.worst(compiler.aggregate_end(name.as_deref(), loc(&head)));
            return status;
        }
        if head.kind != TokenKind::Name {
            return self.syntax_error(compiler, &head);
        }
        // name STRUCTURE|UNION [scalar] opens a subaggregate.
        if self.peek().is_keyword("STRUCTURE") || self.peek().is_keyword("UNION") {
            let union = self.next().is_keyword("UNION");
            let (scalar, unsigned) = self.implicit_scalar();
            let status = compiler.aggregate_member(
                MemberPayload::Subaggregate {
                    name: head.text.clone(),
                    union,
                    scalar,
                    unsigned,
                },
                loc(&head),
            );
            return status.worst(self.options_until_semicolon(compiler));
        }
        let Some((type_ref, unsigned)) = self.datatype(compiler, false) else {
            let token = self.next();
            return self.syntax_error(compiler, &token);
        };
        let status = compiler.aggregate_member(
            MemberPayload::Item {
                name: head.text.clone(),
                type_ref,
                unsigned,
            },
            loc(&head),
        );
        status.worst(self.options_until_semicolon(compiler))
    }

    fn entry(&mut self, compiler: &mut Compiler) -> Status {
        let Some(name) = self.accept_kind(TokenKind::Name) else {
            let token = self.next();
            return self.syntax_error(compiler, &token);
        };
        // Entry-level options are held back until the parameters are
        // in, so a parameter cannot steal them from the buffer.
        let mut entry_options: Vec<PendingOption> = Vec::new();
        let mut status = Status::Normal;
        loop {
            let token = self.peek().clone();
            if matches!(token.kind, TokenKind::Semicolon | TokenKind::Eof) {
                self.next();
                break;
            }
            if token.is_keyword("PARAMETER") {
                self.next();
                status = status.worst(self.parameter_list(compiler));
                continue;
            }
            if token.is_keyword("ALIAS") {
                self.next();
                if let Some(n) = self.name_or_string() {
                    entry_options.push(PendingOption::Alias(n));
                }
                continue;
            }
            if token.is_keyword("LINKAGE") {
                self.next();
                if let Some(n) = self.name_or_string() {
                    entry_options.push(PendingOption::Linkage(n));
                }
                continue;
            }
            if token.is_keyword("TYPENAME") {
                self.next();
                if let Some(n) = self.name_or_string() {
                    entry_options.push(PendingOption::TypeName(n));
                }
                continue;
            }
            if token.is_keyword("VARIABLE") {
                self.next();
                entry_options.push(PendingOption::Variable);
                continue;
            }
            if token.is_keyword("RETURNS") {
                self.next();
                if let Some((type_ref, unsigned)) = self.datatype(compiler, true) {
                    entry_options.push(PendingOption::ReturnsType(type_ref, unsigned));
                }
                if self.accept_keyword("NAMED") {
                    if let Some(n) = self.name_or_string() {
                        entry_options.push(PendingOption::ReturnsNamed(n));
                    }
                }
                continue;
            }
            let token = self.next();
            status = status.worst(self.syntax_error(compiler, &token));
            return status;
        }
        for option in entry_options {
            compiler.add_option(option, loc(&name));
        }
        status.worst(compiler.entry(&name.text, loc(&name)))
    }

    fn parameter_list(&mut self, compiler: &mut Compiler) -> Status {
        let mut status = Status::Normal;
        if self.accept_kind(TokenKind::OpenParen).is_none() {
            let token = self.next();
            return self.syntax_error(compiler, &token);
        }
        loop {
            let start = self.peek().clone();
            let Some((type_ref, unsigned)) = self.datatype(compiler, true) else {
                let token = self.next();
                return self.syntax_error(compiler, &token);
            };
            let mut passing = PassingMech::ByReference;
            loop {
                let token = self.peek().clone();
                if token.is_keyword("VALUE") {
                    self.next();
                    passing = PassingMech::ByValue;
                } else if token.is_keyword("REFERENCE") {
                    self.next();
                    passing = PassingMech::ByReference;
                } else if token.is_keyword("NAMED") {
                    self.next();
                    if let Some(n) = self.name_or_string() {
                        compiler.add_option(PendingOption::Named(n), loc(&token));
                    }
                } else if token.is_keyword("IN") {
                    self.next();
                    compiler.add_option(PendingOption::In, loc(&token));
                } else if token.is_keyword("OUT") {
                    self.next();
                    compiler.add_option(PendingOption::Out, loc(&token));
                } else if token.is_keyword("OPTIONAL") {
                    self.next();
                    compiler.add_option(PendingOption::Optional, loc(&token));
                } else if token.is_keyword("LIST") {
                    self.next();
                    compiler.add_option(PendingOption::List, loc(&token));
                } else if token.is_keyword("DEFAULT") {
                    self.next();
                    if let Some(v) = self.expression(compiler) {
                        compiler.add_option(PendingOption::Default(v), loc(&token));
                    }
                } else if token.is_keyword("TYPENAME") {
                    self.next();
                    if let Some(n) = self.name_or_string() {
                        compiler.add_option(PendingOption::TypeName(n), loc(&token));
                    }
                } else if token.is_keyword("DIMENSION") {
                    self.next();
                    if let Some((lbound, hbound)) = self.bounds(compiler) {
                        let idx = compiler.dimension(lbound, hbound, loc(&token));
                        compiler.add_option(PendingOption::Dimension(idx), loc(&token));
                    }
                } else {
                    break;
                }
            }
            status = status.worst(compiler.parameter(type_ref, unsigned, passing, loc(&start)));
            if self.accept_kind(TokenKind::Comma).is_some() {
                continue;
            }
            self.accept_kind(TokenKind::CloseParen);
            break;
        }
        status
    }

    fn local(&mut self, compiler: &mut Compiler) -> Status {
        let Some(name) = self.accept_kind(TokenKind::Name) else {
            let token = self.next();
            return self.syntax_error(compiler, &token);
        };
        if self.accept_kind(TokenKind::Equals).is_none() && !self.accept_keyword("EQUALS") {
            let token = self.next();
            return self.syntax_error(compiler, &token);
        }
        let Some(value) = self.expression(compiler) else {
            let token = self.next();
            return self.syntax_error(compiler, &token);
        };
        self.accept_kind(TokenKind::Semicolon);
        compiler.set_local(&name.text, value, loc(&name))
    }

    fn if_symbol(&mut self, compiler: &mut Compiler, else_if: bool) -> Status {
        let Some(symbol) = self.accept_kind(TokenKind::Name) else {
            let token = self.next();
            return self.syntax_error(compiler, &token);
        };
        self.accept_kind(TokenKind::Semicolon);
        if else_if {
            compiler.else_if_symbol(&symbol.text, loc(&symbol))
        } else {
            compiler.if_symbol(&symbol.text, loc(&symbol))
        }
    }

    fn if_language(&mut self, compiler: &mut Compiler) -> Status {
        let start = self.peek().clone();
        let mut languages = Vec::new();
        while let Some(name) = self.accept_kind(TokenKind::Name) {
            languages.push(name.text);
            if self.accept_kind(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.accept_kind(TokenKind::Semicolon);
        compiler.if_language(&languages, loc(&start))
    }

    fn literal_body(&mut self, compiler: &mut Compiler) -> Status {
        let mut status = Status::Normal;
        while compiler.in_literal() {
            let line_no = self.scanner.line();
            let Some(line) = self.scanner.raw_line() else {
                break;
            };
            let trimmed = line.trim().trim_end_matches(';').trim_end();
            if trimmed.eq_ignore_ascii_case("END_LITERAL") {
                status = status.worst(compiler.literal_end(SourceLoc::line(line_no)));
            } else {
                status = status.worst(compiler.literal_line(&line, SourceLoc::line(line_no)));
            }
        }
        self.lookahead = None;
        status
    }

    // ------------------------------------------------------------------
    // Shared pieces
    // ------------------------------------------------------------------

    /// Trailing options of a statement, pushed into the buffer for the
    /// dispatcher to attach.
    fn options_until_semicolon(&mut self, compiler: &mut Compiler) -> Status {
        let mut status = Status::Normal;
        loop {
            let token = self.peek().clone();
            match token.kind {
                TokenKind::Semicolon | TokenKind::Eof => {
                    self.next();
                    break;
                }
                TokenKind::Comment => {
                    self.next();
                    status = status.worst(compiler.comment_line(&token.text, loc(&token)));
                }
                TokenKind::Comma => {
                    self.next();
                }
                TokenKind::Name => {
                    if !self.one_option(compiler, &token) {
                        let token = self.next();
                        return status.worst(self.syntax_error(compiler, &token));
                    }
                }
                _ => {
                    let token = self.next();
                    return status.worst(self.syntax_error(compiler, &token));
                }
            }
        }
        status
    }

    /// Parse one trailing option; returns false on an unknown keyword.
    fn one_option(&mut self, compiler: &mut Compiler, token: &Token) -> bool {
        let at = loc(token);
        macro_rules! with_name {
            ($variant:ident) => {{
                self.next();
                if let Some(n) = self.name_or_string() {
                    compiler.add_option(PendingOption::$variant(n), at);
                }
                return true;
            }};
        }
        if token.is_keyword("PREFIX") {
            with_name!(Prefix);
        }
        if token.is_keyword("TAG") {
            with_name!(Tag);
        }
        if token.is_keyword("BASED") {
            with_name!(Based);
        }
        if token.is_keyword("MARKER") {
            with_name!(Marker);
        }
        if token.is_keyword("ORIGIN") {
            with_name!(Origin);
        }
        if token.is_keyword("COUNTER") {
            with_name!(Counter);
        }
        if token.is_keyword("TYPENAME") {
            with_name!(TypeName);
        }
        if token.is_keyword("ENUMERATE") {
            with_name!(Enumerate);
        }
        if token.is_keyword("ALIGN") {
            self.next();
            compiler.add_option(PendingOption::Align, at);
            return true;
        }
        if token.is_keyword("NOALIGN") {
            self.next();
            compiler.add_option(PendingOption::NoAlign, at);
            return true;
        }
        if token.is_keyword("BASEALIGN") {
            self.next();
            let paren = self.accept_kind(TokenKind::OpenParen).is_some();
            if let Some(v) = self.expression(compiler) {
                compiler.add_option(PendingOption::BaseAlign(v), at);
            }
            if paren {
                self.accept_kind(TokenKind::CloseParen);
            }
            return true;
        }
        if token.is_keyword("DIMENSION") {
            self.next();
            if let Some((lbound, hbound)) = self.bounds(compiler) {
                let idx = compiler.dimension(lbound, hbound, at);
                compiler.add_option(PendingOption::Dimension(idx), at);
            }
            return true;
        }
        if token.is_keyword("LENGTH") {
            self.next();
            if let Some(v) = self.expression(compiler) {
                compiler.add_option(PendingOption::Length(v), at);
            }
            return true;
        }
        if token.is_keyword("INCREMENT") {
            self.next();
            if let Some(v) = self.expression(compiler) {
                compiler.add_option(PendingOption::Increment(v), at);
            }
            return true;
        }
        if token.is_keyword("RADIX") {
            self.next();
            let radix = if self.accept_keyword("DEC") || self.accept_keyword("DECIMAL") {
                Radix::Dec
            } else if self.accept_keyword("OCT") || self.accept_keyword("OCTAL") {
                Radix::Oct
            } else if self.accept_keyword("HEX") {
                Radix::Hex
            } else if self.accept_keyword("BIN") || self.accept_keyword("BINARY") {
                Radix::Bin
            } else {
                Radix::Dec
            };
            compiler.add_option(PendingOption::Radix(radix), at);
            return true;
        }
        if token.is_keyword("MASK") {
            self.next();
            compiler.add_option(PendingOption::Mask, at);
            return true;
        }
        if token.is_keyword("SIGNED") {
            self.next();
            compiler.add_option(PendingOption::Signed, at);
            return true;
        }
        if token.is_keyword("COMMON") {
            self.next();
            compiler.add_option(PendingOption::Common, at);
            return true;
        }
        if token.is_keyword("GLOBAL") {
            self.next();
            compiler.add_option(PendingOption::Global, at);
            return true;
        }
        if token.is_keyword("TYPEDEF") {
            self.next();
            compiler.add_option(PendingOption::Typedef, at);
            return true;
        }
        if token.is_keyword("FILL") {
            self.next();
            compiler.add_option(PendingOption::Fill, at);
            return true;
        }
        false
    }

    fn name_or_string(&mut self) -> Option<String> {
        if let Some(token) = self.accept_kind(TokenKind::Name) {
            return Some(token.text);
        }
        self.accept_kind(TokenKind::String).map(|t| t.text)
    }

    /// `[l:]u` bounds; a single bound means `1:u`.
    fn bounds(&mut self, compiler: &mut Compiler) -> Option<(i64, i64)> {
        let first = self.expression(compiler)?;
        if self.accept_kind(TokenKind::Colon).is_some() {
            let second = self.expression(compiler)?;
            Some((first, second))
        } else {
            Some((1, first))
        }
    }

    /// Left-associative +,-,*,/ over integers and module locals.
    fn expression(&mut self, compiler: &mut Compiler) -> Option<i64> {
        let mut value = self.term(compiler)?;
        loop {
            if self.accept_kind(TokenKind::Plus).is_some() {
                value += self.term(compiler)?;
            } else if self.accept_kind(TokenKind::Minus).is_some() {
                value -= self.term(compiler)?;
            } else if self.accept_kind(TokenKind::Star).is_some() {
                value *= self.term(compiler)?;
            } else if self.accept_kind(TokenKind::Slash).is_some() {
                let divisor = self.term(compiler)?;
                if divisor != 0 {
                    value /= divisor;
                }
            } else {
                return Some(value);
            }
        }
    }

    fn term(&mut self, compiler: &mut Compiler) -> Option<i64> {
        if self.accept_kind(TokenKind::Minus).is_some() {
            return Some(-self.term(compiler)?);
        }
        if let Some(token) = self.accept_kind(TokenKind::Integer) {
            return Some(token.value);
        }
        if self.accept_kind(TokenKind::OpenParen).is_some() {
            let value = self.expression(compiler)?;
            self.accept_kind(TokenKind::CloseParen);
            return Some(value);
        }
        if self.peek().kind == TokenKind::Name {
            let name = self.next().text;
            return compiler.locals.get(&name).or(Some(0));
        }
        None
    }

    /// Parse a type reference. Bitfield shape and character lengths are
    /// pushed as options so the member entry can capture them.
    /// `_allow_star` marks entry-parameter positions, the one place
    /// `CHARACTER *` is legal; the dispatcher enforces it.
    fn datatype(&mut self, compiler: &mut Compiler, _allow_star: bool) -> Option<(TypeRef, bool)> {
        let unsigned = if self.accept_keyword("UNSIGNED") {
            true
        } else {
            self.accept_keyword("SIGNED");
            false
        };
        let token = self.peek().clone();
        if token.kind != TokenKind::Name {
            return None;
        }
        let at = loc(&token);

        for (keyword, scalar) in INTEGER_TYPES {
            if token.is_keyword(keyword) {
                self.next();
                return Some((TypeRef::Scalar(*scalar), unsigned));
            }
        }
        for (keyword, scalar) in FLOAT_TYPES {
            if token.is_keyword(keyword) {
                self.next();
                let complex = self.accept_keyword("COMPLEX");
                let scalar = if complex { complex_of(*scalar) } else { *scalar };
                return Some((TypeRef::Scalar(scalar), unsigned));
            }
        }
        if token.is_keyword("BOOLEAN") {
            self.next();
            return Some((TypeRef::Scalar(ScalarType::Boolean), unsigned));
        }
        if token.is_keyword("ANY") {
            self.next();
            return Some((TypeRef::Scalar(ScalarType::Any), unsigned));
        }
        if token.is_keyword("VOID") {
            self.next();
            return Some((TypeRef::Scalar(ScalarType::Void), unsigned));
        }
        if token.is_keyword("DECIMAL") {
            self.next();
            if self.accept_keyword("PRECISION") {
                let paren = self.accept_kind(TokenKind::OpenParen).is_some();
                let precision = self.expression(compiler).unwrap_or(0);
                let scale = if self.accept_kind(TokenKind::Comma).is_some() {
                    self.expression(compiler).unwrap_or(0)
                } else {
                    0
                };
                if paren {
                    self.accept_kind(TokenKind::CloseParen);
                }
                compiler.set_precision(precision, scale, at);
            }
            return Some((TypeRef::Scalar(ScalarType::Decimal), unsigned));
        }
        if token.is_keyword("CHARACTER") {
            self.next();
            let mut star = false;
            if self.accept_keyword("LENGTH") {
                if self.accept_kind(TokenKind::Star).is_some() {
                    star = true;
                } else if let Some(v) = self.expression(compiler) {
                    compiler.add_option(PendingOption::Length(v), at);
                }
            } else if self.accept_kind(TokenKind::Star).is_some() {
                star = true;
            }
            let vary = self.accept_keyword("VARYING");
            // Star length parses everywhere; outside entry parameters
            // the dispatcher rejects it with InvalidUnknownLength.
            let scalar = if star {
                ScalarType::CharStar
            } else if vary {
                ScalarType::CharVary
            } else {
                ScalarType::Char
            };
            return Some((TypeRef::Scalar(scalar), unsigned));
        }
        if token.is_keyword("BITFIELD") {
            self.next();
            for (keyword, scalar) in INTEGER_TYPES {
                if self.accept_keyword(keyword) {
                    compiler.add_option(PendingOption::SubType(TypeRef::Scalar(*scalar)), at);
                    break;
                }
            }
            if self.accept_keyword("LENGTH") {
                if let Some(v) = self.expression(compiler) {
                    compiler.add_option(PendingOption::Length(v), at);
                }
            }
            loop {
                if self.accept_keyword("MASK") {
                    compiler.add_option(PendingOption::Mask, at);
                } else if self.accept_keyword("SIGNED") {
                    compiler.add_option(PendingOption::Signed, at);
                } else {
                    break;
                }
            }
            return Some((TypeRef::Scalar(ScalarType::Bitfield), true));
        }
        for (keyword, scalar) in ADDRESS_TYPES {
            if token.is_keyword(keyword) {
                self.next();
                if self.accept_kind(TokenKind::OpenParen).is_some() {
                    if let Some(target) = self.accept_kind(TokenKind::Name) {
                        if let Some(type_ref) = compiler.lookup_type(&target.text) {
                            compiler.add_option(PendingOption::SubType(type_ref), at);
                        }
                    }
                    self.accept_kind(TokenKind::CloseParen);
                }
                return Some((TypeRef::Scalar(*scalar), unsigned));
            }
        }
        // A previously defined user type.
        if let Some(type_ref) = compiler.lookup_type(&token.text) {
            self.next();
            return Some((type_ref, unsigned));
        }
        None
    }
}

const INTEGER_TYPES: &[(&str, ScalarType)] = &[
    ("BYTE", ScalarType::Byte),
    ("WORD", ScalarType::Word),
    ("LONGWORD", ScalarType::Long),
    ("QUADWORD", ScalarType::Quad),
    ("OCTAWORD", ScalarType::Octa),
];

const FLOAT_TYPES: &[(&str, ScalarType)] = &[
    ("S_FLOAT", ScalarType::SFloat),
    ("T_FLOAT", ScalarType::TFloat),
    ("X_FLOAT", ScalarType::XFloat),
    ("F_FLOAT", ScalarType::FFloat),
    ("D_FLOAT", ScalarType::DFloat),
    ("G_FLOAT", ScalarType::GFloat),
    ("H_FLOAT", ScalarType::HFloat),
];

const ADDRESS_TYPES: &[(&str, ScalarType)] = &[
    ("ADDRESS", ScalarType::Addr),
    ("ADDRESS_LONG", ScalarType::AddrLong),
    ("ADDRESS_QUAD", ScalarType::AddrQuad),
    ("ADDRESS_HARDWARE", ScalarType::AddrHw),
    ("POINTER", ScalarType::Ptr),
    ("POINTER_LONG", ScalarType::PtrLong),
    ("POINTER_QUAD", ScalarType::PtrQuad),
    ("POINTER_HW", ScalarType::PtrHw),
];

fn complex_of(scalar: ScalarType) -> ScalarType {
    match scalar {
        ScalarType::SFloat => ScalarType::SFloatComplex,
        ScalarType::TFloat => ScalarType::TFloatComplex,
        ScalarType::XFloat => ScalarType::XFloatComplex,
        ScalarType::FFloat => ScalarType::FFloatComplex,
        ScalarType::DFloat => ScalarType::DFloatComplex,
        ScalarType::GFloat => ScalarType::GFloatComplex,
        other => other,
    }
}

fn loc(token: &Token) -> SourceLoc {
    SourceLoc {
        first_line: token.line,
        first_col: token.column,
        last_line: token.line,
        last_col: token.column,
    }
}

trait NameProbe {
    fn is_name_not_option(&self) -> bool;
}

impl NameProbe for Token {
    /// A bare name on an END line (the closing name), as opposed to a
    /// trailing option keyword.
    fn is_name_not_option(&self) -> bool {
        const OPTION_KEYWORDS: &[&str] = &[
            "PREFIX", "TAG", "ALIGN", "NOALIGN", "BASEALIGN", "DIMENSION", "LENGTH", "MASK",
            "SIGNED", "COMMON", "GLOBAL", "TYPEDEF", "FILL", "MARKER", "BASED", "ORIGIN",
        ];
        self.kind == TokenKind::Name
            && !OPTION_KEYWORDS
                .iter()
                .any(|k| self.text.eq_ignore_ascii_case(k))
    }
}
