//! Serialized input and output of an autofix run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::syntax::NodeKind;
use crate::text::Position;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutofixInput {
    pub resources: BTreeMap<String, ResourceInput>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceInput {
    /// Source text; read from `file` when absent.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default)]
    pub findings: Vec<Finding>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    #[serde(default)]
    pub rule_id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub line: Option<usize>,
    #[serde(default)]
    pub column: Option<usize>,
    #[serde(default)]
    pub fix: Option<FixDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FixDescriptor {
    GlobalAccess(GlobalAccessFixData),
    CallExpression(CallExpressionFixData),
    CallGenerator(CallGeneratorFixData),
    RequireSync(RequireSyncFixData),
    ObsoleteImport(ObsoleteImportFixData),
}

impl FixDescriptor {
    pub fn position(&self) -> Position {
        match self {
            Self::GlobalAccess(d) => d.position,
            Self::CallExpression(d) => d.position,
            Self::CallGenerator(d) => d.position,
            Self::RequireSync(d) => d.position,
            Self::ObsoleteImport(d) => d.position,
        }
    }
}

/// Replace a global access chain such as `jQuery.sap.log` by a module export.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalAccessFixData {
    pub position: Position,
    #[serde(default)]
    pub allowed_kinds: Option<Vec<NodeKind>>,
    pub module_name: String,
    #[serde(default)]
    pub preferred_identifier: Option<String>,
    /// Member of the module export to access, e.g. `info`.
    #[serde(default)]
    pub property_access: Option<String>,
    pub access_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallExpressionFixData {
    pub position: Position,
    #[serde(default)]
    pub allowed_kinds: Option<Vec<NodeKind>>,
    pub module_name: String,
    #[serde(default)]
    pub preferred_identifier: Option<String>,
    #[serde(default)]
    pub property_access: Option<String>,
    #[serde(default)]
    pub callee_path: Option<String>,
}

/// Replace a whole call by text generated from `template`.
///
/// Placeholders: `$moduleIdentifier`, `$0` to `$9` (argument text) and
/// `$args` (all arguments as written).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallGeneratorFixData {
    pub position: Position,
    #[serde(default)]
    pub allowed_kinds: Option<Vec<NodeKind>>,
    pub template: String,
    #[serde(default)]
    pub module_name: Option<String>,
    #[serde(default)]
    pub preferred_identifier: Option<String>,
    #[serde(default)]
    pub min_arguments: Option<usize>,
    #[serde(default)]
    pub max_arguments: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequireSyncFixData {
    pub position: Position,
    #[serde(default)]
    pub allowed_kinds: Option<Vec<NodeKind>>,
    #[serde(default)]
    pub preferred_identifier: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObsoleteImportFixData {
    pub position: Position,
    #[serde(default)]
    pub allowed_kinds: Option<Vec<NodeKind>>,
    pub module_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutofixOutput {
    /// Rewritten text of every resource that changed.
    pub resources: BTreeMap<String, String>,
    pub failures: Vec<ResourceFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceFailure {
    pub resource: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_lint_output() {
        let input: AutofixInput = serde_json::from_str(
            r#"{
                "resources": {
                    "/resources/my/app/Main.js": {
                        "source": "sap.ui.define([], function() {});",
                        "findings": [
                            {
                                "ruleId": "no-globals",
                                "message": "Access of global variable 'jQuery.sap.log'",
                                "fix": {
                                    "type": "globalAccess",
                                    "position": {"line": 1, "column": 30},
                                    "moduleName": "sap/base/Log",
                                    "accessPath": "jQuery.sap.log"
                                }
                            },
                            {"ruleId": "no-deprecated-api", "message": "no fix"}
                        ]
                    }
                }
            }"#,
        )
        .unwrap();
        let resource = &input.resources["/resources/my/app/Main.js"];
        assert_eq!(resource.findings.len(), 2);
        let Some(FixDescriptor::GlobalAccess(fix)) = &resource.findings[0].fix else {
            panic!("expected a global access fix");
        };
        assert_eq!(fix.position, Position::new(1, 30));
        assert_eq!(fix.access_path, "jQuery.sap.log");
        assert!(fix.allowed_kinds.is_none());
        assert!(resource.findings[1].fix.is_none());
    }

    #[test]
    fn reads_fix_types_by_tag() {
        let fix: FixDescriptor = serde_json::from_str(
            r#"{"type": "callGenerator", "position": {"line": 2, "column": 5}, "template": "$0 + 1", "allowedKinds": ["CallExpression"], "maxArguments": 1}"#,
        )
        .unwrap();
        assert_eq!(fix.position(), Position::new(2, 5));
        let FixDescriptor::CallGenerator(data) = fix else {
            panic!("expected a call generator fix");
        };
        assert_eq!(data.allowed_kinds, Some(vec![NodeKind::CallExpression]));
        assert_eq!(data.max_arguments, Some(1));
    }
}
