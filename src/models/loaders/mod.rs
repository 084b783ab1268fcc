pub mod docx_loader;

pub use docx_loader::{load_all_docx_files, validate_docx_file};
