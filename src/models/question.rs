use serde::{Deserialize, Serialize};

/// 解析输出的题目记录
///
/// 材料题/题组/带小题的填空题只产生一条顶层记录，小题放在 `children` 中，
/// 父记录自身的 `answer`、`options`、`analysis` 为空。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    pub id: String,
    /// 题号，如 `1`、`(1)`
    pub number: String,
    #[serde(rename = "type")]
    pub question_type: String,
    /// 题干 HTML
    pub stem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
    #[serde(default)]
    pub knowledge_points: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<QuestionRecord>>,
}

impl QuestionRecord {
    /// 小题数量
    pub fn child_count(&self) -> usize {
        self.children.as_ref().map_or(0, Vec::len)
    }
}

impl std::fmt::Display for QuestionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let preview = crate::utils::logging::truncate_text(&self.stem, 40);
        write!(f, "[{} {}] {}", self.question_type, self.number, preview)?;
        if self.child_count() > 0 {
            write!(f, " (小题 {})", self.child_count())?;
        }
        Ok(())
    }
}
