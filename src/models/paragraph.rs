//! 文档输入模型：段落、文本块（run）、公式树与嵌入媒体
//!
//! 这些结构由 docx 读取器一次性构建，之后只读。

/// 文本块的上下标格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VertAlign {
    #[default]
    Baseline,
    Superscript,
    Subscript,
}

/// OMML 公式树节点（只保留本地标签名、文本与子节点）
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MathNode {
    pub tag: String,
    pub text: Option<String>,
    pub children: Vec<MathNode>,
}

impl MathNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: MathNode) -> Self {
        self.children.push(child);
        self
    }

    /// 按本地标签名查找直接子节点
    pub fn child(&self, tag: &str) -> Option<&MathNode> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// 序列化回 OMML 片段（统一使用 `m:` 前缀），作为公式 token 的源文本
    pub fn to_omml(&self) -> String {
        let mut out = String::new();
        self.write_omml(&mut out);
        out
    }

    fn write_omml(&self, out: &mut String) {
        out.push_str("<m:");
        out.push_str(&self.tag);
        out.push('>');
        if let Some(text) = &self.text {
            out.push_str(&crate::parser::token::escape_html(text));
        }
        for child in &self.children {
            child.write_omml(out);
        }
        out.push_str("</m:");
        out.push_str(&self.tag);
        out.push('>');
    }
}

/// 段落中的一个文本块
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Run {
    pub text: String,
    pub vert_align: VertAlign,
    /// 该文本块承载的公式
    pub math: Option<MathNode>,
    /// 该文本块引用的图片关系 ID（如 `rId5`）
    pub image_refs: Vec<String>,
}

impl Run {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn subscript(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            vert_align: VertAlign::Subscript,
            ..Default::default()
        }
    }

    pub fn superscript(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            vert_align: VertAlign::Superscript,
            ..Default::default()
        }
    }

    pub fn math(node: MathNode) -> Self {
        Self {
            math: Some(node),
            ..Default::default()
        }
    }

    pub fn image(rel_id: impl Into<String>) -> Self {
        Self {
            image_refs: vec![rel_id.into()],
            ..Default::default()
        }
    }

    pub fn has_math(&self) -> bool {
        self.math.is_some()
    }

    pub fn has_image(&self) -> bool {
        !self.image_refs.is_empty()
    }
}

/// 文档段落
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paragraph {
    runs: Vec<Run>,
    text: String,
}

impl Paragraph {
    pub fn new(runs: Vec<Run>) -> Self {
        let text = runs.iter().map(|r| r.text.as_str()).collect();
        Self { runs, text }
    }

    /// 只含一个普通文本块的段落
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(vec![Run::text(text)])
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    /// 段落纯文本（不含公式与图片）
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn has_image(&self) -> bool {
        self.runs.iter().any(Run::has_image)
    }

    pub fn has_math(&self) -> bool {
        self.runs.iter().any(Run::has_math)
    }

    /// 有非空白文本、图片或公式
    pub fn has_visible_content(&self) -> bool {
        !self.text.trim().is_empty() || self.has_image() || self.has_math()
    }
}

/// 文档中的一条嵌入媒体关系
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRelationship {
    /// 关系 ID，例如 `rId7`
    pub rel_id: String,
    /// 关系目标，例如 `media/image1.png`
    pub target: String,
    pub data: Vec<u8>,
}

/// 读取器交给解析流程的完整输入
#[derive(Debug, Clone, Default)]
pub struct DocxDocument {
    pub paragraphs: Vec<Paragraph>,
    pub media: Vec<MediaRelationship>,
}
