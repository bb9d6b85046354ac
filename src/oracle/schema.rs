//! 预言机线格式：请求端的 responseSchema 与响应端的 serde 类型一一对应。

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub use crate::kernel::chat::AgentResponse;
pub use crate::kernel::problems::{CodeProblem, ProblemSeverity};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Composer,
    Npm,
}

impl PackageManager {
    pub fn label(self) -> &'static str {
        match self {
            Self::Composer => "composer",
            Self::Npm => "npm",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    #[serde(default)]
    pub terminal_output: String,
    #[serde(default)]
    pub web_output: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LintReport {
    #[serde(default)]
    pub problems: Vec<CodeProblem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixResult {
    pub fixed_code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InlineResult {
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageInfo {
    pub package_name: String,
    pub latest_version: String,
}

pub fn execution_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "terminalOutput": {
                "type": "STRING",
                "description": "The textual output from PHP commands like echo, print, var_dump. Should include any PHP errors or warnings.",
            },
            "webOutput": {
                "type": "STRING",
                "description": "The raw HTML content rendered by the script, specifically content outside of <?php ?> tags. If no HTML is outside the tags, this should be an empty string.",
            },
        },
        "required": ["terminalOutput", "webOutput"],
    })
}

pub fn lint_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "problems": {
                "type": "ARRAY",
                "description": "A list of problems found in the code.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "line": {
                            "type": "INTEGER",
                            "description": "The line number where the problem occurs."
                        },
                        "message": {
                            "type": "STRING",
                            "description": "A description of the problem."
                        },
                        "severity": {
                            "type": "STRING",
                            "enum": ["error", "warning"],
                            "description": "The severity of the problem."
                        }
                    },
                    "required": ["line", "message", "severity"]
                }
            }
        },
        "required": ["problems"],
    })
}

pub fn fix_all_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "fixedCode": {
                "type": "STRING",
                "description": "The complete, corrected PHP code as a single string, with all identified problems fixed. The code should be fully functional and ready to be placed into a file."
            },
        },
        "required": ["fixedCode"],
    })
}

fn agent_action_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "type": {
                "type": "STRING",
                "enum": ["CREATE_FILE", "UPDATE_FILE", "DELETE_FILE", "CREATE_FOLDER", "DELETE_FOLDER"],
                "description": "The type of action to perform on the file system."
            },
            "path": {
                "type": "STRING",
                "description": "The full path of the file or folder from the workspace root. e.g., 'src/components/Button.php'. When creating a new file/folder, this path should not exist."
            },
            "content": {
                "type": "STRING",
                "description": "The full content of the file for CREATE_FILE and UPDATE_FILE actions. This field is ignored for DELETE_FILE and CREATE_FOLDER."
            }
        },
        "required": ["type", "path"],
    })
}

pub fn agent_builder_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "explanation": {
                "type": "STRING",
                "description": "A friendly, step-by-step explanation of the changes you are proposing. This will be shown to the user before they approve the changes. Use markdown for formatting."
            },
            "actions": {
                "type": "ARRAY",
                "description": "A list of file system actions to be executed to fulfill the user's request. This can be empty if you are only answering a question.",
                "items": agent_action_schema()
            }
        },
        "required": ["explanation", "actions"],
    })
}

pub fn package_schema(manager: PackageManager) -> Value {
    let (name_desc, version_desc) = match manager {
        PackageManager::Composer => (
            "The full name of the package, e.g., 'monolog/monolog'.",
            "The latest stable version constraint, e.g., '^3.5'.",
        ),
        PackageManager::Npm => (
            "The name of the package, e.g., 'lodash'.",
            "The latest stable version constraint, e.g., '^4.17.21'.",
        ),
    };
    json!({
        "type": "OBJECT",
        "properties": {
            "packageName": { "type": "STRING", "description": name_desc },
            "latestVersion": { "type": "STRING", "description": version_desc },
        },
        "required": ["packageName", "latestVersion"],
    })
}

pub fn generate_inline_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "code": {
                "type": "STRING",
                "description": "The generated PHP code snippet. The code should be concise and directly address the user's prompt. Do not include <?php or ?> tags unless the context explicitly requires a full script block. The snippet should be ready to be inserted directly into existing code."
            },
        },
        "required": ["code"],
    })
}

pub fn edit_inline_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "code": {
                "type": "STRING",
                "description": "The modified PHP code snippet. This code will directly replace the user's original selection. Do not include explanations, markdown formatting, or any text other than the code itself."
            },
        },
        "required": ["code"],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_result_uses_camel_case_and_defaults() {
        let full: ExecutionResult =
            serde_json::from_str(r#"{"terminalOutput":"int(3)","webOutput":"<p>hi</p>"}"#).unwrap();
        assert_eq!(full.terminal_output, "int(3)");
        assert_eq!(full.web_output, "<p>hi</p>");

        let partial: ExecutionResult = serde_json::from_str(r#"{"terminalOutput":"x"}"#).unwrap();
        assert_eq!(partial.web_output, "");
    }

    #[test]
    fn lint_report_parses_severities() {
        let report: LintReport = serde_json::from_str(
            r#"{"problems":[{"line":3,"message":"Missing semicolon","severity":"error"}]}"#,
        )
        .unwrap();
        assert_eq!(report.problems[0].severity, ProblemSeverity::Error);
        assert_eq!(report.problems[0].line, 3);
    }

    #[test]
    fn schemas_declare_required_fields() {
        assert_eq!(execution_schema()["required"][0], "terminalOutput");
        assert_eq!(fix_all_schema()["required"][0], "fixedCode");
        assert_eq!(
            agent_builder_schema()["properties"]["actions"]["items"]["properties"]["type"]["enum"][0],
            "CREATE_FILE"
        );
    }

    #[test]
    fn package_info_roundtrip() {
        let info: PackageInfo =
            serde_json::from_str(r#"{"packageName":"monolog/monolog","latestVersion":"^3.5"}"#)
                .unwrap();
        assert_eq!(info.package_name, "monolog/monolog");
    }
}
