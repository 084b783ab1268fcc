pub mod attributes;
pub mod block;
pub mod loaders;
pub mod paragraph;
pub mod question;
pub mod question_type;

pub use attributes::{ExtractedAttributes, ExtractionMode, KeyedTexts, QuestionContent};
pub use block::{BlockKind, QuestionBlock, Section, SubQuestionBlock};
pub use paragraph::{DocxDocument, MathNode, MediaRelationship, Paragraph, Run, VertAlign};
pub use question::QuestionRecord;
pub use question_type::QuestionType;
pub use loaders::{load_all_docx_files, validate_docx_file};
