pub mod document;
pub mod export;
pub mod identity;
pub mod knowledge_base;
pub mod latex;
pub mod llm_service;
pub mod ocr_provider;
pub mod question_store;

pub use export::{ExamBuilder, ExportPayload, PdfExporter};
pub use identity::IdentityService;
pub use knowledge_base::KnowledgeBase;
pub use llm_service::LlmService;
pub use ocr_provider::OcrProvider;
pub use question_store::{QuestionStore, RemoveOutcome};
