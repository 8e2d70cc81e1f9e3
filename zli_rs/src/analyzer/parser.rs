//! Syntax parser: command file → arena-allocated syntax tree + scopes.
//!
//! Wraps the OXC parser. The tree and the semantic (scope) information built
//! alongside it borrow from one [`Allocator`], which the caller owns for the
//! duration of a single extraction pass.

use std::fs;
use std::path::{Path, PathBuf};

use oxc_allocator::Allocator;
use oxc_ast::ast::Program;
use oxc_parser::Parser;
use oxc_semantic::{Scoping, Semantic, SemanticBuilder};
use oxc_span::{SourceType, Span};

use super::errors::ParseError;

/// A parsed command file. Read-only for every consumer.
pub struct SyntaxTree<'a> {
    path: PathBuf,
    source_text: &'a str,
    program: &'a Program<'a>,
    semantic: Semantic<'a>,
}

impl<'a> SyntaxTree<'a> {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn program(&self) -> &'a Program<'a> {
        self.program
    }

    pub fn scoping(&self) -> &Scoping {
        self.semantic.scoping()
    }

    pub fn source_text(&self) -> &'a str {
        self.source_text
    }

    /// 1-based line of a span start.
    pub fn line(&self, span: Span) -> usize {
        line_of(self.source_text, span.start as usize)
    }
}

/// Read and parse the file at `path`.
pub fn parse<'a>(allocator: &'a Allocator, path: &Path) -> Result<SyntaxTree<'a>, ParseError> {
    let contents = fs::read_to_string(path).map_err(|e| ParseError::new(path, e.to_string()))?;
    parse_source(allocator, path, &contents)
}

/// Parse `contents` as if it had been read from `path`.
///
/// The extension of `path` selects the dialect (`.ts`/`.mts` enable
/// TypeScript); everything is parsed as an ES module.
pub fn parse_source<'a>(
    allocator: &'a Allocator,
    path: &Path,
    contents: &str,
) -> Result<SyntaxTree<'a>, ParseError> {
    let source_text: &'a str = allocator.alloc_str(contents);
    let source_type = SourceType::from_path(path)
        .unwrap_or_default()
        .with_module(true);

    let ret = Parser::new(allocator, source_text, source_type).parse();

    if let Some(err) = ret.errors.first() {
        let offset = err
            .labels
            .as_ref()
            .and_then(|labels| labels.first())
            .map(|label| label.offset());
        let parse_error = ParseError::new(path, err.to_string());
        return Err(match offset {
            Some(offset) => parse_error.at(
                line_of(source_text, offset),
                column_of(source_text, offset),
            ),
            None => parse_error,
        });
    }
    if ret.panicked {
        return Err(ParseError::new(path, "parser aborted"));
    }

    let program: &'a Program<'a> = allocator.alloc(ret.program);
    let semantic = SemanticBuilder::new().build(program).semantic;

    Ok(SyntaxTree {
        path: path.to_path_buf(),
        source_text,
        program,
        semantic,
    })
}

pub(crate) fn line_of(source: &str, offset: usize) -> usize {
    let capped = offset.min(source.len());
    source.as_bytes()[..capped]
        .iter()
        .filter(|b| **b == b'\n')
        .count()
        + 1
}

fn column_of(source: &str, offset: usize) -> usize {
    let capped = offset.min(source.len());
    let line_start = source.as_bytes()[..capped]
        .iter()
        .rposition(|b| *b == b'\n')
        .map_or(0, |idx| idx + 1);
    capped - line_start + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn parses_valid_module() {
        let allocator = Allocator::default();
        let tree = parse_source(&allocator, Path::new("cmd.js"), "export const foo = 42;")
            .expect("valid module");
        assert_eq!(tree.program().body.len(), 1);
        assert_eq!(tree.path(), Path::new("cmd.js"));
    }

    #[test]
    fn reads_file_from_disk() {
        let mut file = NamedTempFile::with_suffix(".js").expect("temp file");
        writeln!(file, "export const OPTS = {{ name: 'x' }};").expect("write");
        let allocator = Allocator::default();
        let tree = parse(&allocator, file.path()).expect("parse temp file");
        assert!(tree.source_text().contains("OPTS"));
    }

    #[test]
    fn missing_file_is_a_parse_error() {
        let allocator = Allocator::default();
        let err = parse(&allocator, Path::new("definitely/not/here.js"))
            .err()
            .expect("missing file must fail");
        assert!(err.to_string().contains("definitely/not/here.js"));
    }

    #[test]
    fn syntax_error_reports_location() {
        let allocator = Allocator::default();
        let source = "export const OPTS = {\n  name: 'x',\n  options: [\n};\n";
        let err = parse_source(&allocator, Path::new("/cmds/bad.js"), source)
            .err()
            .expect("syntax error");
        assert_eq!(err.path, Path::new("/cmds/bad.js"));
        assert!(err.line.is_some());
        assert!(err.to_string().starts_with("failed parsing /cmds/bad.js"));
    }

    #[test]
    fn line_and_column_are_one_based() {
        let src = "a\nbc\ndef";
        assert_eq!(line_of(src, 0), 1);
        assert_eq!(line_of(src, 3), 2);
        assert_eq!(column_of(src, 3), 2);
        assert_eq!(line_of(src, 5), 3);
        assert_eq!(column_of(src, 5), 1);
    }
}
