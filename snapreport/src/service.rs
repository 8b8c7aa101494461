//! Analysis and chat services
//!
//! The analysis backend is abstracted behind traits so the pipeline can
//! run against any multimodal model endpoint. [`TieredAnalysis`] wraps a
//! preferred and a fallback backend: when the preferred model is not
//! available the request is retried once against the fallback, any other
//! failure propagates unchanged.

use crate::history::HistoryEntry;
use thiserror::Error;

/// Reply used when the chat backend fails; the conversation degrades
/// instead of erroring out.
pub const CHAT_FALLBACK_REPLY: &str =
    "Sorry, I could not process that question right now. Please try again.";

/// Errors surfaced by analysis and chat backends.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("model not available: {0}")]
    ModelNotFound(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("quota exhausted: {0}")]
    Quota(String),
}

/// Errors raised while validating an analysis request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("task description is empty")]
    BlankTask,

    #[error("no screenshot captured")]
    MissingScreenshot,
}

/// A validated analysis request: the captured page plus the user's task.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub task: String,
    pub screenshot_data_url: String,
    pub page_url: Option<String>,
}

impl AnalysisRequest {
    /// Validate and build a request. The task must be non-blank and a
    /// screenshot must have been captured.
    pub fn new(
        task: impl Into<String>,
        screenshot_data_url: impl Into<String>,
        page_url: Option<String>,
    ) -> Result<Self, RequestError> {
        let task = task.into();
        if task.trim().is_empty() {
            return Err(RequestError::BlankTask);
        }
        let screenshot_data_url = screenshot_data_url.into();
        if screenshot_data_url.is_empty() {
            return Err(RequestError::MissingScreenshot);
        }
        Ok(Self {
            task,
            screenshot_data_url,
            page_url,
        })
    }
}

/// A multimodal backend that turns a screenshot and task into a markdown
/// analysis result.
pub trait AnalysisService {
    fn analyze(&self, request: &AnalysisRequest) -> Result<String, ServiceError>;
}

/// A text backend answering follow-up questions about a finished analysis.
pub trait ChatService {
    fn reply(&self, context: &str, turns: &[ChatTurn], question: &str)
        -> Result<String, ServiceError>;
}

/// Preferred backend with a one-shot fallback for unavailable models.
pub struct TieredAnalysis<P, F> {
    preferred: P,
    fallback: F,
}

impl<P: AnalysisService, F: AnalysisService> TieredAnalysis<P, F> {
    pub fn new(preferred: P, fallback: F) -> Self {
        Self {
            preferred,
            fallback,
        }
    }

    /// Run the request against the preferred backend, retrying once on the
    /// fallback only when the preferred model does not exist.
    pub fn analyze(&self, request: &AnalysisRequest) -> Result<String, ServiceError> {
        match self.preferred.analyze(request) {
            Ok(result) => Ok(result),
            Err(ServiceError::ModelNotFound(model)) => {
                log::warn!("model {} unavailable, retrying on fallback", model);
                self.fallback.analyze(request)
            }
            Err(e) => Err(e),
        }
    }
}

/// Who produced a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

/// One exchange in a follow-up conversation.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

/// A follow-up conversation grounded in one analysis result.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    context: String,
    turns: Vec<ChatTurn>,
}

impl Conversation {
    /// Start a conversation about a completed analysis.
    pub fn for_entry(entry: &HistoryEntry) -> Self {
        Self {
            context: format!("Task: {}\n\n{}", entry.task, entry.result),
            turns: Vec::new(),
        }
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// Ask a follow-up question. A backend failure degrades to the
    /// fallback reply; the conversation always gains exactly one user and
    /// one assistant turn.
    pub fn ask(&mut self, service: &impl ChatService, question: &str) -> &str {
        let reply = match service.reply(&self.context, &self.turns, question) {
            Ok(reply) => reply,
            Err(e) => {
                log::warn!("chat backend failed: {}", e);
                CHAT_FALLBACK_REPLY.to_string()
            }
        };
        self.turns.push(ChatTurn {
            role: ChatRole::User,
            text: question.to_string(),
        });
        self.turns.push(ChatTurn {
            role: ChatRole::Assistant,
            text: reply,
        });
        &self.turns[self.turns.len() - 1].text
    }
}
