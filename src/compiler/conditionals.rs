// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! IFSYMBOL / IFLANGUAGE conditional directives.
//!
//! Symbol conditionals flip the processing gate that fronts every other
//! entry point; language conditionals flip the per-backend enable
//! vector. The legal transitions are checked against the innermost open
//! frame; anything else is InvalidConditionalState.

use crate::core::conditional::CondState;
use crate::core::error::{SdlError, SdlErrorKind, Status};
use crate::core::model::SourceLoc;

use super::Compiler;

impl Compiler {
    /// IFSYMBOL symbol;
    pub fn if_symbol(&mut self, symbol: &str, loc: SourceLoc) -> Status {
        self.trace_call("if_symbol");
        let top = self.cond_stack.top().map(|f| f.state);
        match top {
            None | Some(CondState::IfLang) | Some(CondState::Else) => {
                self.cond_stack.push(CondState::IfSymbol, false);
                self.apply_symbol(symbol, loc)
            }
            _ => self.fault(
                loc.first_line,
                SdlError::new(SdlErrorKind::InvalidConditionalState),
            ),
        }
    }

    /// ELSE_IFSYMBOL symbol;
    pub fn else_if_symbol(&mut self, symbol: &str, loc: SourceLoc) -> Status {
        self.trace_call("else_if_symbol");
        match self.cond_stack.top().map(|f| f.state) {
            Some(CondState::IfSymbol) => {
                self.cond_stack.replace_top(CondState::ElseIf);
                self.apply_symbol(symbol, loc)
            }
            _ => self.fault(
                loc.first_line,
                SdlError::new(SdlErrorKind::InvalidConditionalState),
            ),
        }
    }

    /// ELSE; for either conditional family.
    pub fn cond_else(&mut self, loc: SourceLoc) -> Status {
        self.trace_call("cond_else");
        match self.cond_stack.top() {
            Some(frame) if frame.state == CondState::IfLang => {
                if self.processing_enabled {
                    self.cond_stack.replace_top(CondState::Else);
                    for enabled in &mut self.lang_enabled {
                        *enabled = !*enabled;
                    }
                }
                Status::Normal
            }
            Some(frame)
                if frame.state == CondState::IfSymbol || frame.state == CondState::ElseIf =>
            {
                self.cond_stack.replace_top(CondState::Else);
                self.processing_enabled = !self.processing_enabled;
                Status::Normal
            }
            _ if self.processing_enabled => self.fault(
                loc.first_line,
                SdlError::new(SdlErrorKind::InvalidConditionalState),
            ),
            _ => Status::Normal,
        }
    }

    /// END_IFSYMBOL;
    pub fn end_if_symbol(&mut self, loc: SourceLoc) -> Status {
        self.trace_call("end_if_symbol");
        match self.cond_stack.top().map(|f| f.state) {
            Some(CondState::IfSymbol) | Some(CondState::ElseIf) | Some(CondState::Else) => {
                self.cond_stack.pop();
                self.processing_enabled = true;
                Status::Normal
            }
            _ => self.fault(
                loc.first_line,
                SdlError::new(SdlErrorKind::InvalidConditionalState),
            ),
        }
    }

    /// IFLANGUAGE lang[, lang...];
    pub fn if_language(&mut self, languages: &[String], loc: SourceLoc) -> Status {
        self.trace_call("if_language");
        if !self.processing_enabled {
            return Status::Normal;
        }
        match self.cond_stack.top().map(|f| f.state) {
            None
            | Some(CondState::IfLang)
            | Some(CondState::IfSymbol)
            | Some(CondState::ElseIf)
            | Some(CondState::Else) => {
                self.cond_stack.push(CondState::IfLang, true);
                for enabled in &mut self.lang_enabled {
                    *enabled = false;
                }
                for language in languages {
                    if let Some(idx) = self.backends.index_of(language) {
                        self.lang_enabled[idx] = true;
                    }
                }
                Status::Normal
            }
            _ => self.fault(
                loc.first_line,
                SdlError::new(SdlErrorKind::InvalidConditionalState),
            ),
        }
    }

    /// END_IFLANGUAGE [lang...];
    pub fn end_if_language(&mut self, loc: SourceLoc) -> Status {
        self.trace_call("end_if_language");
        if !self.processing_enabled {
            return Status::Normal;
        }
        match self.cond_stack.top().map(|f| f.state) {
            Some(CondState::IfLang) | Some(CondState::Else) => {
                self.cond_stack.pop();
                for enabled in &mut self.lang_enabled {
                    *enabled = true;
                }
                Status::Normal
            }
            _ => self.fault(
                loc.first_line,
                SdlError::new(SdlErrorKind::InvalidConditionalState),
            ),
        }
    }

    /// Flip the processing gate from a symbol's value; missing bindings
    /// fail with SymbolNotDefined.
    fn apply_symbol(&mut self, symbol: &str, loc: SourceLoc) -> Status {
        match self.symbols.lookup(symbol) {
            Some(value) => {
                self.processing_enabled = value != 0;
                Status::Normal
            }
            None => self.fault(
                loc.first_line,
                SdlError::new(SdlErrorKind::SymbolNotDefined).with_insert(symbol),
            ),
        }
    }
}
