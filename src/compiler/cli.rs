// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Command-line interface parsing and argument validation.

use std::fs;
use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

use crate::core::error::{SdlError, SdlErrorKind};
use crate::core::symbols::SymbolTable;

use super::Settings;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const LONG_ABOUT: &str = "Structure Definition Language compiler.

Reads an SDL source file and emits one declaration file per --lang
(currently cc, the C header backend). Conditional processing symbols
are supplied with --symbol NAME=VALUE; layout defaults are controlled
by --align, --b32/--b64 and --member.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "sdlforge",
    version = VERSION,
    about = "Structure Definition Language compiler emitting C declarations",
    long_about = LONG_ABOUT
)]
pub struct Cli {
    /// Input SDL source file.
    pub input: Option<PathBuf>,

    #[arg(
        long = "align",
        value_name = "N",
        long_help = "Default member alignment: 0 packs members, 1|2|4|8 caps \
                     natural alignment at N bytes."
    )]
    pub align: Option<u32>,
    #[arg(long = "b32", action = ArgAction::SetTrue, conflicts_with = "b64",
          long_help = "Target a 32-bit word size for address types.")]
    pub b32: bool,
    #[arg(long = "b64", action = ArgAction::SetTrue,
          long_help = "Target a 64-bit word size for address types (default).")]
    pub b64: bool,
    #[arg(long = "check", action = ArgAction::SetTrue, conflicts_with = "nocheck")]
    pub check: bool,
    #[arg(long = "nocheck", action = ArgAction::SetTrue)]
    pub nocheck: bool,
    #[arg(long = "comments", action = ArgAction::SetTrue, conflicts_with = "nocomments",
          long_help = "Pass source comments through to the output (default).")]
    pub comments: bool,
    #[arg(long = "nocomments", action = ArgAction::SetTrue)]
    pub nocomments: bool,
    #[arg(
        long = "copy",
        value_name = "FILE",
        num_args = 0..=1,
        default_missing_value = "sdlforge.copy",
        conflicts_with = "nocopy",
        long_help = "Emit the named copyright file at the top of each output."
    )]
    pub copy: Option<PathBuf>,
    #[arg(long = "nocopy", action = ArgAction::SetTrue)]
    pub nocopy: bool,
    #[arg(long = "header", action = ArgAction::SetTrue, conflicts_with = "noheader",
          long_help = "Open outputs with a generated banner (default).")]
    pub header: bool,
    #[arg(long = "noheader", action = ArgAction::SetTrue)]
    pub noheader: bool,
    #[arg(
        long = "list",
        value_name = "FILE",
        num_args = 0..=1,
        default_missing_value = "",
        action = ArgAction::Append,
        conflicts_with = "nolist",
        long_help = "Write a listing file; FILE defaults to the input name \
                     with a .lis extension."
    )]
    pub list: Vec<String>,
    #[arg(long = "nolist", action = ArgAction::SetTrue)]
    pub nolist: bool,
    #[arg(long = "member", action = ArgAction::SetTrue, conflicts_with = "nomember",
          long_help = "Align members to their full natural size.")]
    pub member: bool,
    #[arg(long = "nomember", action = ArgAction::SetTrue)]
    pub nomember: bool,
    #[arg(
        long = "suppress",
        value_name = "prefix|tag",
        num_args = 0..=1,
        default_missing_value = "prefix,tag",
        action = ArgAction::Append,
        conflicts_with = "nosuppress",
        long_help = "Drop the prefix and/or tag from generated names."
    )]
    pub suppress: Vec<String>,
    #[arg(long = "nosuppress", action = ArgAction::SetTrue)]
    pub nosuppress: bool,
    #[arg(
        long = "lang",
        value_name = "NAME[=FILE]",
        action = ArgAction::Append,
        long_help = "Enable a target language backend; repeatable, at least \
                     one required. FILE overrides the output file name."
    )]
    pub lang: Vec<String>,
    #[arg(
        long = "symbol",
        value_name = "NAME=VALUE",
        action = ArgAction::Append,
        long_help = "Define a conditional processing symbol for IFSYMBOL."
    )]
    pub symbol: Vec<String>,
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text,
          long_help = "Diagnostic rendering: text (default) or json.")]
    pub format: OutputFormat,
    #[arg(long = "trace", action = ArgAction::SetTrue)]
    pub trace: bool,
    #[arg(long = "verbose", short = 'v', action = ArgAction::SetTrue)]
    pub verbose: bool,
}

/// One enabled output language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LangSpec {
    pub name: String,
    pub output: Option<PathBuf>,
}

/// Everything the driver needs after validation.
#[derive(Debug)]
pub struct Config {
    pub input: PathBuf,
    pub settings: Settings,
    pub symbols: SymbolTable,
    pub languages: Vec<LangSpec>,
    pub listing: Option<PathBuf>,
    pub format: OutputFormat,
    /// Recoverable complaints raised during validation (missing copy
    /// file); reported but not fatal.
    pub warnings: Vec<SdlError>,
}

const KNOWN_LANGUAGES: &[&str] = &["cc"];

/// Validate parsed arguments into a runnable configuration.
pub fn validate_cli(cli: &Cli) -> Result<Config, SdlError> {
    let input = cli
        .input
        .clone()
        .ok_or_else(|| SdlError::new(SdlErrorKind::NoInputFile))?;

    let align = cli.align.unwrap_or(0);
    if ![0, 1, 2, 4, 8].contains(&align) {
        return Err(
            SdlError::new(SdlErrorKind::InvalidAlignment).with_insert(i64::from(align))
        );
    }

    if cli.lang.is_empty() {
        return Err(SdlError::new(SdlErrorKind::NoOutput));
    }
    let mut languages: Vec<LangSpec> = Vec::new();
    for spec in &cli.lang {
        let (name, output) = match spec.split_once('=') {
            Some((name, file)) => (name.to_string(), Some(PathBuf::from(file))),
            None => (spec.clone(), None),
        };
        if !KNOWN_LANGUAGES
            .iter()
            .any(|k| k.eq_ignore_ascii_case(&name))
        {
            return Err(SdlError::new(SdlErrorKind::InvalidQualifier).with_insert(name));
        }
        if languages
            .iter()
            .any(|l| l.name.eq_ignore_ascii_case(&name))
        {
            return Err(SdlError::new(SdlErrorKind::DuplicateLanguage).with_insert(name));
        }
        languages.push(LangSpec {
            name: name.to_lowercase(),
            output,
        });
    }

    let mut symbols = SymbolTable::new();
    for binding in &cli.symbol {
        let (name, value) = match binding.split_once('=') {
            Some((name, value)) => {
                let value = value.parse::<i64>().map_err(|_| {
                    SdlError::new(SdlErrorKind::InvalidQualifier).with_insert(binding.clone())
                })?;
                (name, value)
            }
            None => (binding.as_str(), 1),
        };
        symbols.define(name, value);
    }

    if cli.list.len() > 1 {
        return Err(SdlError::new(SdlErrorKind::DuplicateListingQualifier));
    }
    let listing = if cli.nolist {
        None
    } else {
        cli.list.first().map(|file| {
            if file.is_empty() {
                input.with_extension("lis")
            } else {
                PathBuf::from(file)
            }
        })
    };

    let mut suppress_prefix = false;
    let mut suppress_tag = false;
    if !cli.nosuppress {
        for spec in &cli.suppress {
            for part in spec.split(',') {
                match part.trim().to_ascii_lowercase().as_str() {
                    "prefix" => suppress_prefix = true,
                    "tag" => suppress_tag = true,
                    "" => {}
                    other => {
                        return Err(SdlError::new(SdlErrorKind::InvalidQualifier)
                            .with_insert(other.to_string()))
                    }
                }
            }
        }
    }

    let mut warnings = Vec::new();
    let copyright = if cli.nocopy {
        None
    } else {
        match &cli.copy {
            None => None,
            Some(path) => match fs::read_to_string(path) {
                Ok(text) => Some(text),
                Err(_) => {
                    warnings.push(
                        SdlError::new(SdlErrorKind::NoCopyFile)
                            .with_insert(path.display().to_string()),
                    );
                    None
                }
            },
        }
    };

    let settings = Settings {
        word_size: if cli.b32 { 4 } else { 8 },
        align,
        member_align: cli.member,
        check_alignment: cli.check,
        comments: !cli.nocomments,
        header: !cli.noheader,
        suppress_prefix,
        suppress_tag,
        copyright,
        trace: cli.trace,
        verbose: cli.verbose,
    };

    Ok(Config {
        input,
        settings,
        symbols,
        languages,
        listing,
        format: cli.format,
        warnings,
    })
}

/// Default output path for a language: the input name with the
/// backend's extension.
pub fn resolve_output_path(input: &std::path::Path, lang: &LangSpec) -> PathBuf {
    match &lang.output {
        Some(path) => path.clone(),
        None => {
            let extension = match lang.name.as_str() {
                "cc" => "h",
                other => other,
            };
            input.with_extension(extension)
        }
    }
}
