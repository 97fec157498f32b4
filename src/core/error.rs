// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Error types, diagnostics, and reporting for the compiler.
//!
//! Errors are a kind plus a small vector of inserts (strings or
//! integers); rendering a message is a pure function of that value.
//! Recoverable errors accumulate as diagnostics and the caller
//! continues; fatal errors unwind the module.

use std::fmt;

/// Result code returned by every dispatcher entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Status {
    Normal = 0,
    Error = 1,
    Fatal = 2,
}

impl Status {
    pub fn is_normal(self) -> bool {
        self == Status::Normal
    }

    /// Combine two results, keeping the more severe.
    pub fn worst(self, other: Status) -> Status {
        self.max(other)
    }
}

/// Categories of compiler errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SdlErrorKind {
    SyntaxError,
    ParseError,
    MatchEndName,
    NullStructure,
    AddressObjectNotBased,
    ZeroLength,
    InvalidUnknownLength,
    SymbolNotDefined,
    InvalidConditionalState,
    InvalidName,
    DuplicateName,
    UnalignedMember,
    DuplicateLanguage,
    DuplicateListingQualifier,
    InvalidQualifier,
    InvalidAlignment,
    NoOutput,
    NoInputFile,
    InputFileOpen,
    OutputFileOpen,
    NoCopyFile,
    Abort,
    ErrorExit,
}

impl SdlErrorKind {
    /// Stable uppercase mnemonic used in rendered messages.
    pub fn mnemonic(self) -> &'static str {
        use SdlErrorKind::*;
        match self {
            SyntaxError => "SYNTAXERR",
            ParseError => "PARSEERR",
            MatchEndName => "MATCHEND",
            NullStructure => "NULLSTRUCT",
            AddressObjectNotBased => "ADROBJBAS",
            ZeroLength => "ZEROLEN",
            InvalidUnknownLength => "INVUNKLEN",
            SymbolNotDefined => "SYMNOTDEF",
            InvalidConditionalState => "INVCONDST",
            InvalidName => "INVNAME",
            DuplicateName => "DUPNAME",
            UnalignedMember => "UNALIGNED",
            DuplicateLanguage => "DUPLANG",
            DuplicateListingQualifier => "DUPLISTQUAL",
            InvalidQualifier => "INVQUAL",
            InvalidAlignment => "INVALIGN",
            NoOutput => "NOOUTPUT",
            NoInputFile => "NOINPFIL",
            InputFileOpen => "INFILOPN",
            OutputFileOpen => "OUTFILOPN",
            NoCopyFile => "NOCOPYFIL",
            Abort => "ABORT",
            ErrorExit => "ERREXIT",
        }
    }

    /// Fatal errors unwind the module and force a nonzero exit; the
    /// parser may continue past recoverable ones.
    pub fn is_fatal(self) -> bool {
        matches!(self, SdlErrorKind::Abort | SdlErrorKind::ErrorExit)
    }

    pub fn status(self) -> Status {
        if self.is_fatal() {
            Status::Fatal
        } else {
            Status::Error
        }
    }
}

/// A message insert: either text or a number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insert {
    Str(String),
    Num(i64),
}

impl From<&str> for Insert {
    fn from(s: &str) -> Self {
        Insert::Str(s.to_string())
    }
}

impl From<String> for Insert {
    fn from(s: String) -> Self {
        Insert::Str(s)
    }
}

impl From<i64> for Insert {
    fn from(n: i64) -> Self {
        Insert::Num(n)
    }
}

impl fmt::Display for Insert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Insert::Str(s) => write!(f, "{s}"),
            Insert::Num(n) => write!(f, "{n}"),
        }
    }
}

/// A compiler error: kind code plus its message inserts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdlError {
    pub kind: SdlErrorKind,
    pub inserts: Vec<Insert>,
}

impl SdlError {
    pub fn new(kind: SdlErrorKind) -> Self {
        Self {
            kind,
            inserts: Vec::new(),
        }
    }

    pub fn with_insert(mut self, insert: impl Into<Insert>) -> Self {
        self.inserts.push(insert.into());
        self
    }

    fn insert(&self, idx: usize) -> String {
        self.inserts
            .get(idx)
            .map(ToString::to_string)
            .unwrap_or_default()
    }
}

impl fmt::Display for SdlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use SdlErrorKind::*;
        let severity = if self.kind.is_fatal() { 'F' } else { 'E' };
        write!(f, "%SDL-{severity}-{}, ", self.kind.mnemonic())?;
        match self.kind {
            SyntaxError => write!(f, "syntax error near '{}'", self.insert(0)),
            ParseError => write!(f, "unable to parse statement: {}", self.insert(0)),
            MatchEndName => write!(
                f,
                "name on END does not match '{}' on the opening statement",
                self.insert(0)
            ),
            NullStructure => write!(f, "aggregate '{}' has no members", self.insert(0)),
            AddressObjectNotBased => write!(
                f,
                "aggregate '{}' addressed without BASED storage",
                self.insert(0)
            ),
            ZeroLength => write!(
                f,
                "bitfield '{}' declared with non-positive length",
                self.insert(0)
            ),
            InvalidUnknownLength => {
                write!(f, "CHARACTER * is only valid for entry parameters")
            }
            SymbolNotDefined => write!(f, "symbol '{}' is not defined", self.insert(0)),
            InvalidConditionalState => write!(f, "conditional statement out of order"),
            InvalidName => write!(f, "missing or invalid name"),
            DuplicateName => write!(f, "'{}' is already defined", self.insert(0)),
            UnalignedMember => write!(
                f,
                "member '{}' is not aligned to its natural boundary",
                self.insert(0)
            ),
            DuplicateLanguage => {
                write!(f, "language '{}' specified more than once", self.insert(0))
            }
            DuplicateListingQualifier => {
                write!(f, "listing qualifier specified more than once")
            }
            InvalidQualifier => write!(f, "unknown qualifier '{}'", self.insert(0)),
            InvalidAlignment => write!(
                f,
                "invalid alignment '{}', expected 0, 1, 2, 4, or 8",
                self.insert(0)
            ),
            NoOutput => write!(f, "no output language specified"),
            NoInputFile => write!(f, "no input file specified"),
            InputFileOpen => write!(
                f,
                "unable to open input file '{}': {}",
                self.insert(0),
                self.insert(1)
            ),
            OutputFileOpen => write!(
                f,
                "unable to open output file '{}': {}",
                self.insert(0),
                self.insert(1)
            ),
            NoCopyFile => write!(f, "copyright file '{}' not found", self.insert(0)),
            Abort => write!(f, "internal failure: {}", self.insert(0)),
            ErrorExit => write!(f, "terminating due to previous errors"),
        }
    }
}

impl std::error::Error for SdlError {}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
    Fatal,
}

/// A recorded fault with source position and aggregate context.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub line: u32,
    pub severity: Severity,
    pub error: SdlError,
    /// Names of the enclosing aggregates, outermost first, when the
    /// fault occurred inside an aggregate body.
    pub aggregate_trace: Vec<String>,
}

impl Diagnostic {
    pub fn new(line: u32, error: SdlError) -> Self {
        let severity = if error.kind.is_fatal() {
            Severity::Fatal
        } else {
            Severity::Error
        };
        Self {
            line,
            severity,
            error,
            aggregate_trace: Vec::new(),
        }
    }

    /// An advisory diagnostic; never affects the exit status.
    pub fn warning(line: u32, error: SdlError) -> Self {
        Self {
            line,
            severity: Severity::Warning,
            error,
            aggregate_trace: Vec::new(),
        }
    }

    pub fn with_trace(mut self, trace: Vec<String>) -> Self {
        self.aggregate_trace = trace;
        self
    }

    /// Render the stable single-line form, with the aggregate backtrace
    /// appended when present.
    pub fn format(&self) -> String {
        let mut rendered = self.error.to_string();
        if self.severity == Severity::Warning {
            rendered = rendered.replacen("%SDL-E-", "%SDL-W-", 1);
        }
        let mut out = if self.line > 0 {
            format!("{rendered}, at line {}", self.line)
        } else {
            rendered
        };
        if !self.aggregate_trace.is_empty() {
            out.push_str(&format!(
                "\n  in aggregate {}",
                self.aggregate_trace.join(" -> ")
            ));
        }
        out
    }

    /// Machine-readable form for `--format json`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "kind": self.error.kind.mnemonic(),
            "severity": match self.severity {
                Severity::Warning => "warning",
                Severity::Error => "error",
                Severity::Fatal => "fatal",
            },
            "line": self.line,
            "message": self.error.to_string(),
            "aggregate": self.aggregate_trace,
        })
    }
}
