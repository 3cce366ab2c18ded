//! Validation of parsed options.

use miette::SourceSpan;

use crate::{CompilerOptions, OutputOptions, Result, SourceContext};

pub(crate) fn validate_options(options: &CompilerOptions, ctx: &SourceContext) -> Result<()> {
    for (name, entry) in options.entry.iter().chain(options.includes.iter()) {
        if name.is_empty() {
            return Err(ctx.validation_error_at("entry names must not be empty", None));
        }
        if entry.import.is_empty() || entry.import.iter().any(String::is_empty) {
            return Err(ctx.validation_error_at(
                format!("entry '{name}' must import at least one module"),
                find_key_span(ctx.src(), name),
            ));
        }
    }

    let filename = &options.output.filename;
    if filename.starts_with('/') {
        return Err(ctx.validation_error_at(
            "output.filename must be relative to output.path",
            find_key_span(ctx.src(), "filename"),
        ));
    }

    let shared = options
        .entry
        .values()
        .chain(options.includes.values())
        .filter(|entry| entry.filename.is_none())
        .count();
    if shared > 1 && !OutputOptions::is_templated(filename) {
        return Err(ctx.filename_conflict_error(filename, find_key_span(ctx.src(), "filename")));
    }

    if options.watch.aggregate_timeout > 60_000 {
        return Err(ctx.validation_error_at(
            "watch.aggregate_timeout must be at most 60000 milliseconds",
            find_key_span(ctx.src(), "aggregate_timeout"),
        ));
    }

    if let Err(err) = options.watch.ignored_paths() {
        return Err(ctx.validation_error_at(
            format!("watch.ignored contains an invalid pattern: {err}"),
            find_key_span(ctx.src(), "ignored"),
        ));
    }

    Ok(())
}

/// Find the span of a key as it appears in TOML source.
fn find_key_span(src: &str, key: &str) -> Option<SourceSpan> {
    let patterns = [
        (format!(".{}]", key), 1usize),    // [entry.name]
        (format!("\"{}\" ", key), 1usize), // "name" = ...
        (format!("\"{}\"=", key), 1usize), // "name"=...
        (format!("\n{} ", key), 1usize),   // name = ...
        (format!("\n{}=", key), 1usize),   // name=...
    ];

    for (pattern, skip) in &patterns {
        if let Some(pos) = src.find(pattern.as_str()) {
            return Some(SourceSpan::from((pos + skip, key.len())));
        }
    }

    // Indented keys
    src.lines()
        .scan(0usize, |offset, line| {
            let start = *offset;
            *offset += line.len() + 1;
            Some((start, line))
        })
        .find_map(|(start, line)| {
            let trimmed = line.trim_start();
            let indent = line.len() - trimmed.len();
            let rest = trimmed.strip_prefix(key)?;
            rest.trim_start()
                .starts_with('=')
                .then(|| SourceSpan::from((start + indent, key.len())))
        })
}
