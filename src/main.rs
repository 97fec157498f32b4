// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// CLI entrypoint for sdlforge.

use std::fs::{self, File};
use std::io::BufWriter;
use std::process::ExitCode;

use clap::Parser as ClapParser;

use sdlforge::compiler::cli::{resolve_output_path, validate_cli, Cli, Config, OutputFormat};
use sdlforge::compiler::Compiler;
use sdlforge::core::error::{Diagnostic, SdlError, SdlErrorKind, Status};
use sdlforge::core::listing::ListingWriter;
use sdlforge::lang::c::CBackend;
use sdlforge::lang::{BackendSet, EmitSettings};
use sdlforge::parser::Parser;

fn report(format: OutputFormat, diag: &Diagnostic) {
    match format {
        OutputFormat::Text => eprintln!("{}", diag.format()),
        OutputFormat::Json => eprintln!("{}", diag.to_json()),
    }
}

fn fail(format: OutputFormat, error: SdlError) -> ExitCode {
    report(format, &Diagnostic::new(0, error));
    ExitCode::FAILURE
}

fn write_listing(config: &Config, source: &str, diagnostics: &[Diagnostic]) -> std::io::Result<()> {
    let Some(path) = &config.listing else {
        return Ok(());
    };
    let file = File::create(path)?;
    let title = format!("sdlforge V{}", sdlforge::compiler::cli::VERSION);
    let subtitle = config.input.display().to_string();
    let mut writer = ListingWriter::new(BufWriter::new(file), &title, &subtitle);
    for (idx, line) in source.lines().enumerate() {
        let line_no = (idx + 1) as u32;
        writer.source_line(line_no, line)?;
        // At most one message per source line.
        if let Some(diag) = diagnostics.iter().find(|d| d.line == line_no) {
            writer.error(diag)?;
        }
    }
    writer.finish()?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let format = cli.format;
    let config = match validate_cli(&cli) {
        Ok(config) => config,
        Err(error) => return fail(format, error),
    };
    for warning in &config.warnings {
        report(config.format, &Diagnostic::new(0, warning.clone()));
    }

    let source = match fs::read_to_string(&config.input) {
        Ok(source) => source,
        Err(e) => {
            return fail(
                config.format,
                SdlError::new(SdlErrorKind::InputFileOpen)
                    .with_insert(config.input.display().to_string())
                    .with_insert(e.to_string()),
            )
        }
    };

    let emit_settings = EmitSettings {
        suppress_prefix: config.settings.suppress_prefix,
        suppress_tag: config.settings.suppress_tag,
        comments: config.settings.comments,
        header: config.settings.header,
        word_size: config.settings.word_size,
    };
    let mut backends = BackendSet::new();
    for lang in &config.languages {
        let path = resolve_output_path(&config.input, lang);
        let file = match File::create(&path) {
            Ok(file) => file,
            Err(e) => {
                return fail(
                    config.format,
                    SdlError::new(SdlErrorKind::OutputFileOpen)
                        .with_insert(path.display().to_string())
                        .with_insert(e.to_string()),
                )
            }
        };
        match lang.name.as_str() {
            "cc" => backends.register(Box::new(CBackend::new(
                BufWriter::new(file),
                emit_settings.clone(),
            ))),
            other => {
                return fail(
                    config.format,
                    SdlError::new(SdlErrorKind::InvalidQualifier).with_insert(other.to_string()),
                )
            }
        }
    }

    let mut compiler = Compiler::new(config.settings.clone(), config.symbols.clone(), backends);
    compiler.set_source(&config.input.display().to_string());
    let status = Parser::new(&source).run(&mut compiler);

    for diag in &compiler.diagnostics {
        report(config.format, diag);
    }
    if let Err(e) = write_listing(&config, &source, &compiler.diagnostics) {
        report(
            config.format,
            &Diagnostic::new(
                0,
                SdlError::new(SdlErrorKind::OutputFileOpen)
                    .with_insert("listing".to_string())
                    .with_insert(e.to_string()),
            ),
        );
    }
    if config.settings.verbose {
        eprintln!(
            "sdlforge: {} diagnostic(s), status {:?}",
            compiler.diagnostics.len(),
            status
        );
    }

    if status == Status::Fatal || compiler.had_fatal() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
