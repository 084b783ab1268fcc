use indexmap::IndexMap;
use serde::Serialize;

/// 属性提取模式 / 答案编码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// 整段答案原样保留
    #[default]
    Single,
    /// 按题号分组：`3．B 4．A`
    Grouped,
    /// 按小题编号：`(1)甲 (2)乙`
    Sub,
    /// 根据答案文本自动识别
    Auto,
}

/// 按编号索引的答案/解析，保持首次出现的顺序
pub type KeyedTexts = IndexMap<String, String>;

/// 单个题块（或小题）提取出的属性
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractedAttributes {
    pub answer: Option<String>,
    /// 归一化后的 1-5 难度
    pub difficulty: Option<u8>,
    pub knowledge_points: Vec<String>,
    pub analysis: Option<String>,
    /// 从答案文本识别出的编码（`Single` / `Grouped` / `Sub`）
    pub detected_mode: ExtractionMode,
    /// 分组模式：绝对题号 → 内容
    pub grouped_answers: KeyedTexts,
    pub grouped_analyses: KeyedTexts,
    /// 小题模式：`(n)` → 内容
    pub sub_answers: KeyedTexts,
    pub sub_analyses: KeyedTexts,
}

impl ExtractedAttributes {
    /// 取分组模式下某道题的答案与解析
    pub fn grouped_entry(&self, number: &str) -> (Option<&str>, Option<&str>) {
        (
            self.grouped_answers.get(number).map(String::as_str),
            self.grouped_analyses.get(number).map(String::as_str),
        )
    }

    /// 取小题模式下某个 `(n)` 的答案与解析
    pub fn sub_entry(&self, number: &str) -> (Option<&str>, Option<&str>) {
        (
            self.sub_answers.get(number).map(String::as_str),
            self.sub_analyses.get(number).map(String::as_str),
        )
    }
}

/// 题目内容解析结果：题干纯文本、选项与属性
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestionContent {
    pub stem: String,
    pub options: Option<Vec<String>>,
    pub attributes: ExtractedAttributes,
}
