pub mod draft;
pub mod knowledge;
pub mod ocr;
pub mod question;
pub mod schema;
pub mod user;

pub use draft::{DraftEdit, DraftStatus, OcrDraft};
pub use knowledge::{KnowledgePointNode, SubPoint};
pub use ocr::{OcrItem, OcrRequest, UploadedFile};
pub use question::{Difficulty, Question, QuestionFilter, QuestionType, UNCATEGORIZED};
pub use user::{Identity, Role, User};
