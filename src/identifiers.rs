use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use swc_core::ecma::{
    ast::*,
    visit::{Visit, VisitWith},
};

const RESERVED: &[&str] = &[
    "arguments", "await", "break", "case", "catch", "class", "const", "continue", "debugger",
    "default", "delete", "do", "else", "enum", "eval", "export", "extends", "false", "finally",
    "for", "function", "if", "implements", "import", "in", "instanceof", "interface", "let",
    "new", "null", "package", "private", "protected", "public", "return", "static", "super",
    "switch", "this", "throw", "true", "try", "typeof", "undefined", "var", "void", "while",
    "with", "yield",
];

/// Every identifier name appearing in one file, extended with the names
/// handed out while resolving imports for that file.
#[derive(Debug, Clone, Default)]
pub struct UsedIdentifiers {
    names: HashSet<String>,
}

struct NameCollector<'a> {
    names: &'a mut HashSet<String>,
}

impl Visit for NameCollector<'_> {
    fn visit_ident(&mut self, n: &Ident) {
        self.names.insert(n.sym.to_string());
    }
}

impl UsedIdentifiers {
    pub fn collect(program: &Program) -> Self {
        let mut names = HashSet::new();
        program.visit_with(&mut NameCollector { names: &mut names });
        Self { names }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name) || RESERVED.contains(&name)
    }

    pub fn insert(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }

    /// Returns `preferred` if it is still free, otherwise the first free
    /// `preferred1`, `preferred2`, ... The returned name is registered.
    pub fn claim(&mut self, preferred: &str) -> String {
        let name = if self.contains(preferred) {
            (1..)
                .map(|n| format!("{preferred}{n}"))
                .find(|candidate| !self.contains(candidate))
                .unwrap_or_else(|| preferred.to_string())
        } else {
            preferred.to_string()
        };
        self.names.insert(name.clone());
        name
    }
}

static NON_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_$]+").expect("valid identifier separator pattern"));

/// Identifier suggested for a module: its last path segment turned into a
/// valid JavaScript identifier (`sap/base/Log` becomes `Log`,
/// `sap/ui/thirdparty/URI-util` becomes `URIUtil`).
pub fn default_identifier(module_name: &str) -> String {
    let last = module_name.rsplit('/').next().unwrap_or(module_name);
    let last = last.strip_suffix(".js").unwrap_or(last);
    let mut out = String::with_capacity(last.len());
    for (i, part) in NON_IDENTIFIER.split(last).filter(|p| !p.is_empty()).enumerate() {
        let mut chars = part.chars();
        if i > 0 {
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
            }
        }
        out.push_str(chars.as_str());
    }
    if out.is_empty() {
        return "module".to_string();
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_source;

    #[test]
    fn claims_unique_names() {
        let code = "var Log = 1; function f(Log1) { return Log + Log1; }";
        let source = parse_source("x.js", code, "/").unwrap();
        let mut used = UsedIdentifiers::collect(source.program());
        assert_eq!(used.claim("Log"), "Log2");
        assert_eq!(used.claim("Log"), "Log3");
        assert_eq!(used.claim("Button"), "Button");
        assert_eq!(used.claim("Button"), "Button1");
        assert_eq!(used.claim("default"), "default1");
    }

    #[test]
    fn derives_identifiers_from_module_names() {
        assert_eq!(default_identifier("sap/base/Log"), "Log");
        assert_eq!(default_identifier("sap/ui/thirdparty/URI-util"), "URIUtil");
        assert_eq!(default_identifier("sap/ui/thirdparty/jquery"), "jquery");
        assert_eq!(default_identifier("lib/2d"), "_2d");
        assert_eq!(default_identifier(""), "module");
    }
}
