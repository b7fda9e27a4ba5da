//! Model gateway: the single external call.
//!
//! Two seams make the call testable without a network or an API key:
//!
//! * [`ModelGateway`]: the whole call. Inject a fake through
//!   [`crate::config::CleaningConfig::gateway`] to return canned JSON.
//! * [`Transport`]: only the HTTP hop. [`GeminiGateway`] is generic over
//!   it, so request building, credential checks and status mapping run for
//!   real against a recording transport.
//!
//! The credential is a value handed to the gateway at construction, never
//! read from the process environment here. A missing or blank credential
//! fails with [`Doc2TtsError::AuthError`] before the transport is touched.
//!
//! No retries: one request, one answer or one error.

use crate::config::{CleaningConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::error::Doc2TtsError;
use crate::pipeline::contract::ResponseContract;
use crate::pipeline::encode::EncodedDocument;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Finish reasons meaning the model refused to answer.
const BLOCKING_FINISH_REASONS: [&str; 5] =
    ["SAFETY", "RECITATION", "BLOCKLIST", "PROHIBITED_CONTENT", "SPII"];

// ── Credential ───────────────────────────────────────────────────────────

/// An API key. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Build from an optional raw value (e.g. a CLI flag), treating an
    /// empty or whitespace-only value as absent.
    pub fn from_optional(value: Option<String>) -> Option<Self> {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(Self)
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub(crate) fn expose(&self) -> &str {
        self.0.trim()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

// ── Gateway trait ────────────────────────────────────────────────────────

/// Raw model output plus the metadata the service reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOutput {
    /// The model's JSON text, unparsed.
    pub text: String,
    pub prompt_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
    pub finish_reason: Option<String>,
    pub model_version: Option<String>,
}

impl RawOutput {
    /// Output carrying only text, as a fake gateway would return it.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Performs one structured-output generation request.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Send the instruction and document, requiring output that conforms to
    /// `contract`.
    async fn invoke(
        &self,
        instruction: &str,
        document: &EncodedDocument,
        contract: &ResponseContract,
    ) -> Result<RawOutput, Doc2TtsError>;

    /// Model identifier, for logs and stats.
    fn model(&self) -> &str {
        "custom"
    }
}

// ── Transport ────────────────────────────────────────────────────────────

/// Status and body of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

/// The HTTP hop under [`GeminiGateway`].
///
/// Implementations return `Ok` for every response that arrived, whatever
/// its status; only failures to get a response at all are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &Value,
    ) -> Result<HttpReply, Doc2TtsError>;
}

/// Production transport over `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl ReqwestTransport {
    pub fn new(timeout_secs: u64) -> Result<Self, Doc2TtsError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Doc2TtsError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            timeout_secs,
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &Value,
    ) -> Result<HttpReply, Doc2TtsError> {
        let mut request = self.client.post(url);
        for (key, value) in headers {
            request = request.header(*key, *value);
        }

        let response = request.json(body).send().await.map_err(|e| self.map_error(e))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.map_error(e))?;

        Ok(HttpReply { status, body })
    }
}

impl ReqwestTransport {
    fn map_error(&self, e: reqwest::Error) -> Doc2TtsError {
        if e.is_timeout() {
            Doc2TtsError::Timeout {
                secs: self.timeout_secs,
            }
        } else if e.is_connect() {
            Doc2TtsError::Transport {
                detail: format!("connection failed: {e}"),
            }
        } else {
            Doc2TtsError::Transport {
                detail: e.to_string(),
            }
        }
    }
}

// ── Gemini ───────────────────────────────────────────────────────────────

/// Gemini `generateContent` gateway with schema-constrained output.
pub struct GeminiGateway<T: Transport = ReqwestTransport> {
    transport: T,
    credential: Option<Credential>,
    model: String,
    base_url: String,
    temperature: f32,
}

impl<T: Transport> fmt::Debug for GeminiGateway<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiGateway")
            .field("credential", &self.credential)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl GeminiGateway<ReqwestTransport> {
    /// Build the production gateway from a [`CleaningConfig`].
    pub fn from_config(config: &CleaningConfig) -> Result<Self, Doc2TtsError> {
        let transport = ReqwestTransport::new(config.api_timeout_secs)?;
        Ok(GeminiGateway::new(transport, config.credential.clone())
            .with_model(config.model.clone())
            .with_base_url(config.base_url.clone())
            .with_temperature(config.temperature))
    }
}

impl<T: Transport> GeminiGateway<T> {
    pub fn new(transport: T, credential: Option<Credential>) -> Self {
        Self {
            transport,
            credential,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.1,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.model = model.strip_prefix("models/").unwrap_or(&model).to_string();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, t: f32) -> Self {
        self.temperature = t;
        self
    }

    /// `generateContent` endpoint for the configured model.
    pub fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    /// Request body: one user turn with the instruction text followed by the
    /// inline document, plus the schema-constrained generation config.
    pub fn build_request(
        &self,
        instruction: &str,
        document: &EncodedDocument,
        contract: &ResponseContract,
    ) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": instruction },
                    {
                        "inlineData": {
                            "mimeType": document.media_type,
                            "data": document.to_base64(),
                        }
                    }
                ]
            }],
            "generationConfig": {
                "responseMimeType": contract.mime_type(),
                "responseSchema": contract.schema(),
                "temperature": self.temperature,
            }
        })
    }

    fn usable_credential(&self) -> Result<&Credential, Doc2TtsError> {
        match self.credential {
            Some(ref c) if !c.is_blank() => Ok(c),
            Some(_) => Err(Doc2TtsError::AuthError {
                detail: "the configured API key is empty".into(),
            }),
            None => Err(Doc2TtsError::AuthError {
                detail: "no API key configured. Set GEMINI_API_KEY or pass --api-key.".into(),
            }),
        }
    }
}

#[async_trait]
impl<T: Transport> ModelGateway for GeminiGateway<T> {
    async fn invoke(
        &self,
        instruction: &str,
        document: &EncodedDocument,
        contract: &ResponseContract,
    ) -> Result<RawOutput, Doc2TtsError> {
        let credential = self.usable_credential()?;

        let url = self.endpoint();
        let body = self.build_request(instruction, document, contract);
        let headers = [
            ("x-goog-api-key", credential.expose()),
            ("Content-Type", "application/json"),
        ];

        info!(
            "Sending {} ({} bytes) to {}",
            document.media_type,
            document.len(),
            self.model
        );
        let reply = self.transport.post_json(&url, &headers, &body).await?;
        debug!("Gemini replied HTTP {} ({} bytes)", reply.status, reply.body.len());

        parse_reply(reply)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ── Response parsing ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
    status: Option<String>,
}

/// Map an HTTP reply to [`RawOutput`] or a classified error.
fn parse_reply(reply: HttpReply) -> Result<RawOutput, Doc2TtsError> {
    let status = reply.status;
    if !(200..300).contains(&status) {
        return Err(classify_failure(status, &reply.body));
    }

    let parsed: GenerateContentResponse =
        serde_json::from_str(&reply.body).map_err(|e| Doc2TtsError::Model {
            status: Some(status),
            message: format!("unreadable response envelope: {e}"),
        })?;

    if let Some(reason) = parsed
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
    {
        return Err(Doc2TtsError::Model {
            status: None,
            message: format!("document was blocked by the model: {reason}"),
        });
    }

    let candidate = parsed.candidates.into_iter().next().ok_or_else(|| Doc2TtsError::Model {
        status: None,
        message: "response contained no candidates".into(),
    })?;

    let finish_reason = candidate.finish_reason;
    if let Some(reason) = finish_reason.as_deref() {
        if BLOCKING_FINISH_REASONS.contains(&reason) {
            return Err(Doc2TtsError::Model {
                status: None,
                message: format!("generation stopped: {reason}"),
            });
        }
        if reason == "MAX_TOKENS" {
            warn!("Model output hit the token limit; the chapter list is likely truncated");
        }
    }

    let content = candidate.content.ok_or_else(|| Doc2TtsError::Model {
        status: None,
        message: format!(
            "response contained no content (finish reason: {})",
            finish_reason.as_deref().unwrap_or("unknown")
        ),
    })?;

    let text: String = content
        .parts
        .into_iter()
        .filter(|p| !p.thought)
        .filter_map(|p| p.text)
        .collect();

    let (prompt_tokens, output_tokens) = parsed
        .usage_metadata
        .map(|u| (u.prompt_token_count, u.candidates_token_count))
        .unwrap_or((None, None));

    debug!(
        "Gemini output: {} chars, {:?} prompt tokens, {:?} output tokens",
        text.len(),
        prompt_tokens,
        output_tokens
    );

    Ok(RawOutput {
        text,
        prompt_tokens,
        output_tokens,
        finish_reason,
        model_version: parsed.model_version,
    })
}

fn classify_failure(status: u16, body: &str) -> Doc2TtsError {
    let api_error = serde_json::from_str::<ApiErrorEnvelope>(body).ok().map(|e| e.error);
    let message = match api_error {
        Some(ref e) => match e.status {
            Some(ref s) => format!("{} ({s})", e.message),
            None => e.message.clone(),
        },
        None if body.trim().is_empty() => "no response body".to_string(),
        None => body.trim().chars().take(300).collect(),
    };

    let invalid_key = status == 400
        && api_error
            .as_ref()
            .is_some_and(|e| e.message.contains("API key"));

    match status {
        401 | 403 => Doc2TtsError::AuthError { detail: message },
        _ if invalid_key => Doc2TtsError::AuthError { detail: message },
        429 => Doc2TtsError::Model {
            status: Some(status),
            message: format!("rate limited or quota exhausted: {message}"),
        },
        500..=599 => Doc2TtsError::Model {
            status: Some(status),
            message: format!("service unavailable or overloaded: {message}"),
        },
        _ => Doc2TtsError::Model {
            status: Some(status),
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::encode::encode_bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct RecordingTransport {
        reply: HttpReply,
        calls: AtomicUsize,
        last: Mutex<Option<(String, Vec<(String, String)>, Value)>>,
    }

    impl RecordingTransport {
        fn replying(status: u16, body: impl Into<String>) -> Self {
            Self {
                reply: HttpReply {
                    status,
                    body: body.into(),
                },
                calls: AtomicUsize::new(0),
                last: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn post_json(
            &self,
            url: &str,
            headers: &[(&str, &str)],
            body: &Value,
        ) -> Result<HttpReply, Doc2TtsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let headers = headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            *self.last.lock().unwrap() = Some((url.to_string(), headers, body.clone()));
            Ok(self.reply.clone())
        }
    }

    fn ok_body(text: &str) -> String {
        json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 1200, "candidatesTokenCount": 80 },
            "modelVersion": "gemini-2.5-pro"
        })
        .to_string()
    }

    fn doc() -> EncodedDocument {
        encode_bytes(b"Hello world.".to_vec(), "text/plain").unwrap()
    }

    #[tokio::test]
    async fn missing_credential_fails_before_transport() {
        let gw = GeminiGateway::new(RecordingTransport::replying(200, ok_body("{}")), None);
        let err = gw
            .invoke("clean", &doc(), &ResponseContract::chapters())
            .await
            .unwrap_err();
        assert!(matches!(err, Doc2TtsError::AuthError { .. }), "got: {err:?}");
        assert_eq!(gw.transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blank_credential_fails_before_transport() {
        let gw = GeminiGateway::new(
            RecordingTransport::replying(200, ok_body("{}")),
            Some(Credential::new("   ")),
        );
        let err = gw
            .invoke("clean", &doc(), &ResponseContract::chapters())
            .await
            .unwrap_err();
        assert!(matches!(err, Doc2TtsError::AuthError { .. }), "got: {err:?}");
        assert_eq!(gw.transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn request_carries_instruction_document_and_schema() {
        let gw = GeminiGateway::new(
            RecordingTransport::replying(200, ok_body(r#"{"chapters":[]}"#)),
            Some(Credential::new("k-123")),
        )
        .with_model("models/gemini-2.5-flash")
        .with_base_url("https://example.test/");

        let out = gw
            .invoke("the instruction", &doc(), &ResponseContract::chapters())
            .await
            .expect("invoke should succeed");
        assert_eq!(out.text, r#"{"chapters":[]}"#);
        assert_eq!(out.prompt_tokens, Some(1200));
        assert_eq!(out.output_tokens, Some(80));
        assert_eq!(out.finish_reason.as_deref(), Some("STOP"));

        assert_eq!(gw.transport.calls.load(Ordering::SeqCst), 1);
        let (url, headers, body) = gw.transport.last.lock().unwrap().clone().unwrap();
        assert_eq!(
            url,
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert!(headers.contains(&("x-goog-api-key".to_string(), "k-123".to_string())));

        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "the instruction");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "text/plain");
        assert_eq!(parts[1]["inlineData"]["data"], "SGVsbG8gd29ybGQu");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(
            body["generationConfig"]["responseSchema"],
            *ResponseContract::chapters().schema()
        );
    }

    #[test]
    fn text_parts_are_concatenated_and_thoughts_skipped() {
        let body = json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "thinking...", "thought": true },
                    { "text": "{\"chapters\":" },
                    { "text": "[]}" }
                ]},
                "finishReason": "STOP"
            }]
        })
        .to_string();
        let out = parse_reply(HttpReply { status: 200, body }).unwrap();
        assert_eq!(out.text, r#"{"chapters":[]}"#);
        assert_eq!(out.prompt_tokens, None);
    }

    #[test]
    fn unauthorized_maps_to_auth_error() {
        let body = r#"{"error":{"code":403,"message":"Permission denied","status":"PERMISSION_DENIED"}}"#;
        let err = parse_reply(HttpReply { status: 403, body: body.into() }).unwrap_err();
        match err {
            Doc2TtsError::AuthError { detail } => assert!(detail.contains("Permission denied")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn invalid_key_400_maps_to_auth_error() {
        let body = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#;
        let err = parse_reply(HttpReply { status: 400, body: body.into() }).unwrap_err();
        assert!(matches!(err, Doc2TtsError::AuthError { .. }), "got: {err:?}");
    }

    #[test]
    fn overloaded_maps_to_model_error() {
        let body = r#"{"error":{"code":503,"message":"The model is overloaded.","status":"UNAVAILABLE"}}"#;
        let err = parse_reply(HttpReply { status: 503, body: body.into() }).unwrap_err();
        match err {
            Doc2TtsError::Model { status, message } => {
                assert_eq!(status, Some(503));
                assert!(message.contains("overloaded"), "{message}");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn rate_limit_maps_to_model_error() {
        let err = parse_reply(HttpReply { status: 429, body: String::new() }).unwrap_err();
        assert!(matches!(err, Doc2TtsError::Model { status: Some(429), .. }), "got: {err:?}");
    }

    #[test]
    fn other_client_errors_keep_service_message() {
        let body = r#"{"error":{"code":400,"message":"Unsupported MIME type: application/rtf","status":"INVALID_ARGUMENT"}}"#;
        let err = parse_reply(HttpReply { status: 400, body: body.into() }).unwrap_err();
        assert!(err.to_string().contains("Unsupported MIME type"), "{err}");
    }

    #[test]
    fn blocked_prompt_maps_to_model_error() {
        let body = json!({ "promptFeedback": { "blockReason": "SAFETY" } }).to_string();
        let err = parse_reply(HttpReply { status: 200, body }).unwrap_err();
        assert!(err.to_string().contains("SAFETY"), "{err}");
    }

    #[test]
    fn blocking_finish_reason_maps_to_model_error() {
        let body = json!({ "candidates": [{ "finishReason": "RECITATION" }] }).to_string();
        let err = parse_reply(HttpReply { status: 200, body }).unwrap_err();
        assert!(matches!(err, Doc2TtsError::Model { .. }), "got: {err:?}");
    }

    #[test]
    fn no_candidates_maps_to_model_error() {
        let err = parse_reply(HttpReply { status: 200, body: "{}".into() }).unwrap_err();
        assert!(matches!(err, Doc2TtsError::Model { .. }), "got: {err:?}");
    }

    #[test]
    fn credential_debug_is_redacted() {
        let c = Credential::new("secret");
        assert_eq!(format!("{c:?}"), "Credential(<redacted>)");
        assert_eq!(Credential::from_optional(Some("  ".into())), None);
        assert_eq!(
            Credential::from_optional(Some(" key ".into())),
            Some(Credential::new("key"))
        );
    }
}
