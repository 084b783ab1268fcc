//! 富文本 token 流：把段落的文本块转换为文本/上下标/公式/图片 token，再渲染为 HTML

use crate::models::{Paragraph, Run, VertAlign};
use crate::parser::formula::FormulaConverter;
use crate::parser::image::ImageRegister;
use tracing::debug;

/// 公式转换失败时的占位文本
pub const FORMULA_PLACEHOLDER: &str = "[Formula]";

/// 富文本 token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Text(String),
    Subscript(String),
    Superscript(String),
    Math { omml: String, mathml: Option<String> },
    Image { id: u32 },
}

impl Token {
    /// 是否带可见内容（用于判断图片是否与文字混排）
    fn has_visible_content(&self) -> bool {
        match self {
            Token::Text(text) => !text.trim().is_empty(),
            Token::Subscript(_) | Token::Superscript(_) | Token::Math { .. } => true,
            Token::Image { .. } => false,
        }
    }
}

/// HTML 转义，`&` 必须最先替换
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// 转义后把换行转为 `<br>`
pub fn text_to_html(text: &str) -> String {
    escape_html(text).replace('\n', "<br>")
}

/// token 生成与渲染
pub struct TokenGenerator<'a> {
    formula: &'a FormulaConverter,
    images: &'a ImageRegister,
    image_url_prefix: String,
    task_id: String,
}

impl<'a> TokenGenerator<'a> {
    pub fn new(
        formula: &'a FormulaConverter,
        images: &'a ImageRegister,
        image_url_prefix: impl Into<String>,
        task_id: impl Into<String>,
    ) -> Self {
        Self {
            formula,
            images,
            image_url_prefix: image_url_prefix.into(),
            task_id: task_id.into(),
        }
    }

    /// 按文档顺序生成 token，段落之间插入换行
    pub fn generate_tokens(&self, paragraphs: &[&Paragraph]) -> Vec<Token> {
        let mut tokens = Vec::new();
        for (i, paragraph) in paragraphs.iter().enumerate() {
            for run in paragraph.runs() {
                self.process_run(run, &mut tokens);
            }
            if i + 1 < paragraphs.len() {
                tokens.push(Token::Text("\n".to_string()));
            }
        }
        tokens
    }

    fn process_run(&self, run: &Run, tokens: &mut Vec<Token>) {
        if let Some(math) = &run.math {
            tokens.push(Token::Math {
                omml: math.to_omml(),
                mathml: self.formula.omml_to_mathml(math),
            });
            return;
        }

        if run.has_image() {
            for rel_id in &run.image_refs {
                match self.images.image_id_for(rel_id) {
                    Some(id) => tokens.push(Token::Image { id }),
                    None => debug!("图片引用 {} 未登记，已忽略", rel_id),
                }
            }
            return;
        }

        if run.text.is_empty() {
            return;
        }
        let text = run.text.clone();
        tokens.push(match run.vert_align {
            VertAlign::Subscript => Token::Subscript(text),
            VertAlign::Superscript => Token::Superscript(text),
            VertAlign::Baseline => Token::Text(text),
        });
    }

    /// 渲染 token 流
    pub fn tokens_to_html(&self, tokens: &[Token]) -> String {
        let mut html = String::new();
        for (i, token) in tokens.iter().enumerate() {
            match token {
                Token::Text(text) => html.push_str(&text_to_html(text)),
                Token::Subscript(text) => {
                    html.push_str("<sub>");
                    html.push_str(&escape_html(text));
                    html.push_str("</sub>");
                }
                Token::Superscript(text) => {
                    html.push_str("<sup>");
                    html.push_str(&escape_html(text));
                    html.push_str("</sup>");
                }
                Token::Math { mathml, .. } => match mathml.as_deref().filter(|m| !m.is_empty()) {
                    Some(mathml) => html.push_str(mathml),
                    None => html.push_str(FORMULA_PLACEHOLDER),
                },
                Token::Image { id } => {
                    let inline_class = if is_inline_image(tokens, i) { " inline" } else { "" };
                    html.push_str(&format!(
                        r#"<img class="question-img{}" src="{}/{}/{}" />"#,
                        inline_class, self.image_url_prefix, self.task_id, id
                    ));
                }
            }
        }
        html
    }

    /// 生成并渲染
    pub fn render(&self, paragraphs: &[&Paragraph]) -> String {
        self.tokens_to_html(&self.generate_tokens(paragraphs))
    }
}

/// 前后任一相邻 token 有可见内容时，图片视为行内图片
fn is_inline_image(tokens: &[Token], index: usize) -> bool {
    let prev = index.checked_sub(1).and_then(|i| tokens.get(i));
    let next = tokens.get(index + 1);
    prev.is_some_and(Token::has_visible_content) || next.is_some_and(Token::has_visible_content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MathNode, MediaRelationship};

    fn register_with_png(dir: &std::path::Path) -> ImageRegister {
        let mut register = ImageRegister::new(dir);
        register
            .register_all(&[MediaRelationship {
                rel_id: "rId7".to_string(),
                target: "media/image1.png".to_string(),
                data: b"\x89PNG\r\n\x1a\n\0\0".to_vec(),
            }])
            .unwrap();
        register
    }

    #[test]
    fn test_plain_text_round_trip() {
        let formula = FormulaConverter::new();
        let register = ImageRegister::new("unused");
        let generator = TokenGenerator::new(&formula, &register, "/api/paper/images", "t1");
        let a = Paragraph::from_text("第一行");
        let b = Paragraph::from_text("第二行");
        assert_eq!(generator.render(&[&a, &b]), "第一行<br>第二行");
    }

    #[test]
    fn test_escape_applied_once() {
        assert_eq!(text_to_html("a&b<c>\nd"), "a&amp;b&lt;c&gt;<br>d");
        assert_eq!(escape_html("&amp;"), "&amp;amp;");
    }

    #[test]
    fn test_sub_sup_and_formula_placeholder() {
        let formula = FormulaConverter::new();
        let register = ImageRegister::new("unused");
        let generator = TokenGenerator::new(&formula, &register, "/p", "t1");
        let para = Paragraph::new(vec![
            Run::text("H"),
            Run::subscript("2"),
            Run::text("O "),
            Run::superscript("+"),
            Run::math(MathNode::new("oMath")),
        ]);
        let tokens = generator.generate_tokens(&[&para]);
        assert_eq!(tokens.len(), 5);
        assert_eq!(
            generator.tokens_to_html(&tokens),
            "H<sub>2</sub>O <sup>+</sup>[Formula]"
        );
    }

    #[test]
    fn test_inline_vs_block_image() {
        let dir = tempfile::tempdir().unwrap();
        let register = register_with_png(dir.path());
        let formula = FormulaConverter::new();
        let generator = TokenGenerator::new(&formula, &register, "/api/paper/images", "task-9");

        let standalone = Paragraph::new(vec![Run::image("rId7")]);
        let stem = Paragraph::from_text("如图所示");
        let html = generator.render(&[&stem, &standalone]);
        assert_eq!(
            html,
            r#"如图所示<br><img class="question-img" src="/api/paper/images/task-9/1" />"#
        );

        let mixed = Paragraph::new(vec![Run::text("见"), Run::image("rId7"), Run::text("。")]);
        let html = generator.render(&[&mixed]);
        assert!(html.contains(r#"class="question-img inline""#));
    }

    #[test]
    fn test_unregistered_image_reference_is_dropped() {
        let formula = FormulaConverter::new();
        let register = ImageRegister::new("unused");
        let generator = TokenGenerator::new(&formula, &register, "/p", "t");
        let para = Paragraph::new(vec![Run::image("rId404")]);
        assert!(generator.generate_tokens(&[&para]).is_empty());
    }
}
