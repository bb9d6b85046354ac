//! 预言机客户端：传输层抓原始文本，类型化操作各自解析自己的 schema。

use std::fmt;
use std::future::Future;

use serde_json::{json, Value};

use crate::kernel::chat::{AgentKind, AgentResponse, ImageAttachment};
use crate::kernel::problems::CodeProblem;

use super::prompts;
use super::schema::{
    self, ExecutionResult, FixResult, InlineResult, LintReport, PackageInfo, PackageManager,
};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug)]
pub enum OracleError {
    MissingApiKey,
    Http(reqwest::Error),
    Status { code: u16, body: String },
    Malformed(serde_json::Error),
    EmptyResponse,
}

impl fmt::Display for OracleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OracleError::MissingApiKey => {
                write!(f, "GEMINI_API_KEY environment variable is not set")
            }
            OracleError::Http(e) => write!(f, "request failed: {e}"),
            OracleError::Status { code, body } => {
                write!(f, "oracle returned HTTP {code}: {body}")
            }
            OracleError::Malformed(e) => write!(f, "malformed oracle reply: {e}"),
            OracleError::EmptyResponse => write!(f, "oracle reply contained no text"),
        }
    }
}

impl std::error::Error for OracleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OracleError::Http(e) => Some(e),
            OracleError::Malformed(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for OracleError {
    fn from(e: reqwest::Error) -> Self {
        OracleError::Http(e)
    }
}

impl From<serde_json::Error> for OracleError {
    fn from(e: serde_json::Error) -> Self {
        OracleError::Malformed(e)
    }
}

/// 一次生成调用的全部输入。带 schema 时要求 JSON 输出，不带时为纯文本。
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub system_instruction: String,
    pub user_text: String,
    pub response_schema: Option<Value>,
    pub temperature: f32,
    pub image: Option<ImageAttachment>,
}

pub trait OracleTransport {
    fn generate(
        &self,
        request: GenerateRequest,
    ) -> impl Future<Output = Result<String, OracleError>> + Send;
}

/// Gemini REST 传输。只负责把请求变成响应文本，不懂任何操作语义。
pub struct GeminiTransport {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiTransport {
    pub fn from_env() -> Result<Self, OracleError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("API_KEY"))
            .map_err(|_| OracleError::MissingApiKey)?;
        Ok(Self {
            http: reqwest::Client::new(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
        })
    }

    fn body(request: &GenerateRequest) -> Value {
        let mut parts = Vec::new();
        if let Some(image) = &request.image {
            parts.push(json!({
                "inlineData": {
                    "mimeType": image.mime_type,
                    "data": image.data,
                }
            }));
        }
        parts.push(json!({ "text": request.user_text }));

        let mut body = json!({
            "system_instruction": { "parts": [{ "text": request.system_instruction }] },
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": { "temperature": request.temperature },
        });
        if let Some(schema) = &request.response_schema {
            body["generationConfig"]["responseMimeType"] = json!("application/json");
            body["generationConfig"]["responseSchema"] = schema.clone();
        }
        body
    }

    fn extract_text(reply: &Value) -> Option<String> {
        let parts = reply
            .get("candidates")?
            .get(0)?
            .get("content")?
            .get("parts")?
            .as_array()?;
        let text: String = parts
            .iter()
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

impl OracleTransport for GeminiTransport {
    async fn generate(&self, request: GenerateRequest) -> Result<String, OracleError> {
        let url = format!(
            "{API_BASE}/{}:generateContent?key={}",
            self.model, self.api_key
        );
        let response = self
            .http
            .post(&url)
            .json(&Self::body(&request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let reply: Value = response.json().await?;
        Self::extract_text(&reply).ok_or(OracleError::EmptyResponse)
    }
}

/// 类型化操作层。泛型在测试里换成桩传输。
pub struct OracleClient<T> {
    transport: T,
}

impl<T: OracleTransport> OracleClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub async fn execute(&self, code: &str) -> Result<ExecutionResult, OracleError> {
        let text = self
            .transport
            .generate(GenerateRequest {
                system_instruction: prompts::EXECUTION_SYSTEM.to_string(),
                user_text: prompts::execution_prompt(code),
                response_schema: Some(schema::execution_schema()),
                temperature: 0.0,
                image: None,
            })
            .await?;
        Ok(serde_json::from_str(text.trim())?)
    }

    /// lint 是尽力而为：空代码或没有 `<?php` 直接短路，任何失败都折叠成空列表。
    pub async fn lint(&self, code: &str) -> Vec<CodeProblem> {
        if code.trim().is_empty() || !code.contains("<?php") {
            return Vec::new();
        }
        let request = GenerateRequest {
            system_instruction: prompts::LINT_SYSTEM.to_string(),
            user_text: prompts::lint_prompt(code),
            response_schema: Some(schema::lint_schema()),
            temperature: 0.1,
            image: None,
        };
        match self.transport.generate(request).await {
            Ok(text) => serde_json::from_str::<LintReport>(text.trim())
                .map(|r| r.problems)
                .unwrap_or_else(|e| {
                    tracing::debug!(error = %e, "lint reply discarded");
                    Vec::new()
                }),
            Err(e) => {
                tracing::debug!(error = %e, "lint call discarded");
                Vec::new()
            }
        }
    }

    pub async fn fix_all(
        &self,
        code: &str,
        problems: &[CodeProblem],
    ) -> Result<String, OracleError> {
        let text = self
            .transport
            .generate(GenerateRequest {
                system_instruction: prompts::FIX_ALL_SYSTEM.to_string(),
                user_text: prompts::fix_all_prompt(code, problems),
                response_schema: Some(schema::fix_all_schema()),
                temperature: 0.0,
                image: None,
            })
            .await?;
        let result: FixResult = serde_json::from_str(text.trim())?;
        Ok(result.fixed_code)
    }

    pub async fn generate_inline(
        &self,
        prompt: &str,
        context_code: &str,
    ) -> Result<String, OracleError> {
        let text = self
            .transport
            .generate(GenerateRequest {
                system_instruction: prompts::GENERATE_INLINE_SYSTEM.to_string(),
                user_text: prompts::generate_inline_prompt(prompt, context_code),
                response_schema: Some(schema::generate_inline_schema()),
                temperature: 0.1,
                image: None,
            })
            .await?;
        let result: InlineResult = serde_json::from_str(text.trim())?;
        Ok(result.code)
    }

    pub async fn edit_inline(
        &self,
        prompt: &str,
        code_to_edit: &str,
        context_code: &str,
    ) -> Result<String, OracleError> {
        let text = self
            .transport
            .generate(GenerateRequest {
                system_instruction: prompts::EDIT_INLINE_SYSTEM.to_string(),
                user_text: prompts::edit_inline_prompt(prompt, code_to_edit, context_code),
                response_schema: Some(schema::edit_inline_schema()),
                temperature: 0.0,
                image: None,
            })
            .await?;
        let result: InlineResult = serde_json::from_str(text.trim())?;
        Ok(result.code)
    }

    /// 非 Builder 角色的会话：无 schema，纯文本回复。
    pub async fn chat(
        &self,
        agent: AgentKind,
        message: &str,
        workspace_json: &str,
        active_file: &str,
        image: Option<ImageAttachment>,
    ) -> Result<String, OracleError> {
        self.transport
            .generate(GenerateRequest {
                system_instruction: prompts::agent_system(agent, workspace_json, active_file),
                user_text: prompts::chat_user_text(message),
                response_schema: None,
                temperature: 0.7,
                image,
            })
            .await
    }

    pub async fn build_plan(
        &self,
        message: &str,
        workspace_json: &str,
        active_file: &str,
        image: Option<ImageAttachment>,
    ) -> Result<AgentResponse, OracleError> {
        let text = self
            .transport
            .generate(GenerateRequest {
                system_instruction: prompts::agent_system(
                    AgentKind::Builder,
                    workspace_json,
                    active_file,
                ),
                user_text: prompts::builder_user_text(message),
                response_schema: Some(schema::agent_builder_schema()),
                temperature: 0.1,
                image,
            })
            .await?;
        Ok(serde_json::from_str(text.trim())?)
    }

    pub async fn package_info(
        &self,
        manager: PackageManager,
        package_name: &str,
    ) -> Result<PackageInfo, OracleError> {
        let text = self
            .transport
            .generate(GenerateRequest {
                system_instruction: prompts::package_system(manager).to_string(),
                user_text: prompts::package_prompt(manager, package_name),
                response_schema: Some(schema::package_schema(manager)),
                temperature: 0.0,
                image: None,
            })
            .await?;
        Ok(serde_json::from_str(text.trim())?)
    }
}
