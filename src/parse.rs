use swc_core::{
    common::{
        comments::{CommentKind, SingleThreadedComments},
        sync::Lrc,
        BytePos, FileName, SourceMap, Span,
    },
    ecma::{
        ast::{EsVersion, Expr, Program, Stmt},
        parser::{lexer::Lexer, EsSyntax, Parser, StringInput, Syntax},
    },
};

use crate::dependency_map::resource_module_name;
use crate::error::{AutofixError, Result};
use crate::text::{LineIndex, Position, TextRange};

const BOM: char = '\u{feff}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentRange {
    pub range: TextRange,
    pub block: bool,
}

/// One resource parsed into an swc program, together with everything needed
/// to translate between spans, offsets and 1-based positions.
pub struct ParsedSource {
    resource_path: String,
    module_name: Option<String>,
    text: String,
    has_bom: bool,
    program: Program,
    comments: Vec<CommentRange>,
    base: BytePos,
    line_index: LineIndex,
}

pub fn parse_source(
    resource_path: &str,
    source: &str,
    resource_prefix: &str,
) -> Result<ParsedSource> {
    let (text, has_bom) = match source.strip_prefix(BOM) {
        Some(rest) => (rest.to_string(), true),
        None => (source.to_string(), false),
    };

    let cm: Lrc<SourceMap> = Default::default();
    let fm = cm.new_source_file(
        Lrc::new(FileName::Custom(resource_path.to_string())),
        text.clone(),
    );
    let comments = SingleThreadedComments::default();
    let lexer = Lexer::new(
        Syntax::Es(EsSyntax::default()),
        EsVersion::latest(),
        StringInput::from(&*fm),
        Some(&comments),
    );
    let mut parser = Parser::new_from(lexer);
    let program = parser
        .parse_program()
        .map_err(|e| AutofixError::parse(resource_path, e.kind().msg()))?;
    // Recovered errors mean the tree does not reflect the text faithfully
    if let Some(e) = parser.take_errors().into_iter().next() {
        return Err(AutofixError::parse(resource_path, e.kind().msg()));
    }

    let base = fm.start_pos;
    let mut comment_ranges = Vec::new();
    {
        let (leading, trailing) = comments.borrow_all();
        for c in leading.values().chain(trailing.values()).flatten() {
            comment_ranges.push(CommentRange {
                range: TextRange::new(
                    (c.span.lo.0 - base.0) as usize,
                    (c.span.hi.0 - base.0) as usize,
                ),
                block: c.kind == CommentKind::Block,
            });
        }
    }
    comment_ranges.sort_by_key(|c| c.range);
    comment_ranges.dedup();

    Ok(ParsedSource {
        resource_path: resource_path.to_string(),
        module_name: resource_module_name(resource_path, resource_prefix),
        line_index: LineIndex::new(&text),
        text,
        has_bom,
        program,
        comments: comment_ranges,
        base,
    })
}

/// Parses a standalone expression, e.g. the output of a fix template.
pub fn parse_expression(text: &str) -> Result<Box<Expr>> {
    let cm: Lrc<SourceMap> = Default::default();
    let fm = cm.new_source_file(
        Lrc::new(FileName::Custom("expression".to_string())),
        format!("({text});"),
    );
    let lexer = Lexer::new(
        Syntax::Es(EsSyntax::default()),
        EsVersion::latest(),
        StringInput::from(&*fm),
        None,
    );
    let mut parser = Parser::new_from(lexer);
    let program = parser
        .parse_program()
        .map_err(|e| AutofixError::parse("<expression>", e.kind().msg()))?;
    if let Some(e) = parser.take_errors().into_iter().next() {
        return Err(AutofixError::parse("<expression>", e.kind().msg()));
    }
    let stmts = match program {
        Program::Script(script) => script.body,
        Program::Module(module) => {
            return Err(AutofixError::parse(
                "<expression>",
                format!("expected an expression, found {} module items", module.body.len()),
            ))
        }
    };
    match <[Stmt; 1]>::try_from(stmts) {
        Ok([Stmt::Expr(stmt)]) => match *stmt.expr {
            Expr::Paren(paren) => Ok(paren.expr),
            other => Ok(Box::new(other)),
        },
        _ => Err(AutofixError::parse(
            "<expression>",
            format!("`{text}` is not a single expression"),
        )),
    }
}

impl ParsedSource {
    pub fn resource_path(&self) -> &str {
        &self.resource_path
    }

    /// Module name derived from the resource path, if it carries the prefix.
    pub fn module_name(&self) -> Option<&str> {
        self.module_name.as_deref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn has_bom(&self) -> bool {
        self.has_bom
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn comments(&self) -> &[CommentRange] {
        &self.comments
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    pub fn offset(&self, pos: BytePos) -> usize {
        pos.0.saturating_sub(self.base.0) as usize
    }

    pub fn range(&self, span: Span) -> TextRange {
        TextRange::new(self.offset(span.lo), self.offset(span.hi))
    }

    pub fn slice(&self, range: TextRange) -> &str {
        &self.text[range.start..range.end]
    }

    pub fn position(&self, offset: usize) -> Position {
        self.line_index.position_at(&self.text, offset)
    }

    pub fn offset_at(&self, position: Position) -> Option<usize> {
        self.line_index.offset_at(&self.text, position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swc_core::common::Spanned;

    #[test]
    fn maps_spans_to_offsets() {
        let code = "var x = 1; // hi\n/* c */ foo();";
        let src = parse_source("/resources/a/b.js", code, "/resources/").unwrap();
        assert_eq!(src.module_name(), Some("a/b"));
        let Program::Script(script) = src.program() else {
            panic!("expected a script");
        };
        let Stmt::Expr(call) = &script.body[1] else {
            panic!("expected an expression statement");
        };
        assert_eq!(src.slice(src.range(call.expr.span())), "foo()");
        assert_eq!(src.comments().len(), 2);
        assert!(src.comments()[1].block);
    }

    #[test]
    fn strips_and_remembers_bom() {
        let src = parse_source("x.js", "\u{feff}a;", "/resources/").unwrap();
        assert!(src.has_bom());
        assert_eq!(src.text(), "a;");
        assert_eq!(src.module_name(), None);
    }

    #[test]
    fn rejects_broken_sources() {
        let err = parse_source("x.js", "sap.ui.define([", "/resources/").err().unwrap();
        assert!(matches!(err, AutofixError::Parse { .. }));
    }

    #[test]
    fn parses_single_expressions() {
        let expr = parse_expression("a + b").unwrap();
        assert!(matches!(*expr, Expr::Bin(_)));
        assert!(parse_expression("a; b").is_err());
    }
}
