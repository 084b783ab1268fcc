//! 解析层：docx 读取、结构识别、属性提取、公式与图片、富文本渲染

pub mod content;
pub mod docx;
pub mod formula;
pub mod image;
pub mod structure;
pub mod token;

pub use content::{has_attribute_marker, option_letter, AttributeExtractor};
pub use docx::DocxReader;
pub use formula::FormulaConverter;
pub use image::{ImageInfo, ImageRegister};
pub use structure::{RecognizerOptions, RecognizerState, StructureRecognizer};
pub use token::{escape_html, text_to_html, Token, TokenGenerator};
