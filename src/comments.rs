use crate::parse::ParsedSource;
use crate::text::TextRange;

/// Comments inside `replaced` that would be lost by the replacement, i.e.
/// those not inside any of the `kept` sub-ranges, rendered as block comments
/// followed by a space so they can be prepended to the replacement text.
pub fn lost_comments(source: &ParsedSource, replaced: TextRange, kept: &[TextRange]) -> String {
    let mut out = String::new();
    for comment in source.comments() {
        if !replaced.contains(comment.range) || kept.iter().any(|k| k.contains(comment.range)) {
            continue;
        }
        let raw = source.slice(comment.range);
        if comment.block {
            out.push_str(raw);
        } else {
            let body = raw.strip_prefix("//").unwrap_or(raw).replace("*/", "* /");
            out.push_str("/*");
            out.push_str(body.trim_end());
            out.push_str(" */");
        }
        out.push(' ');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_source;

    #[test]
    fn keeps_comments_outside_preserved_ranges() {
        let code = "jQuery/*a*/.sap // b\n.log.info(/*c*/ x);";
        let source = parse_source("x.js", code, "/resources/").unwrap();
        let replaced = TextRange::new(0, code.find("(").unwrap());
        assert_eq!(lost_comments(&source, replaced, &[]), "/*a*/ /* b */ ");

        let whole = TextRange::new(0, code.len());
        let arg = TextRange::new(code.find("/*c*/").unwrap(), code.len() - 2);
        assert_eq!(lost_comments(&source, whole, &[arg]), "/*a*/ /* b */ ");
    }
}
