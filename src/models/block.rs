//! 结构识别结果：大题（Section）与题块（QuestionBlock）

use crate::models::paragraph::Paragraph;
use crate::models::question_type::QuestionType;

/// 题块形态，由结构识别器一次性确定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// 普通题
    Regular,
    /// 填空题 + (1)(2) 小题，各小题单独取答案
    FillInWithSubs,
    /// 材料 + (1)(2) 小题
    SubQuestionMaterial,
    /// 材料 + 3．4． 题组
    GroupedMaterial,
    /// 同一材料下混用两种小题编号，无法可靠分配答案
    MixedNumbering,
}

/// 小题
#[derive(Debug, Clone)]
pub struct SubQuestionBlock<'a> {
    /// `3` 或 `(1)`
    pub number: String,
    pub parent_number: String,
    pub paragraphs: Vec<&'a Paragraph>,
}

/// 一个可见题号对应的题块
#[derive(Debug, Clone)]
pub struct QuestionBlock<'a> {
    pub number: String,
    pub question_type: QuestionType,
    pub kind: BlockKind,
    /// 父题自身的段落（材料、引导语、归入父题的属性与解析）
    pub paragraphs: Vec<&'a Paragraph>,
    /// 父题与小题的全部段落，按文档顺序
    pub all_paragraphs: Vec<&'a Paragraph>,
    pub sub_questions: Vec<SubQuestionBlock<'a>>,
}

impl QuestionBlock<'_> {
    pub fn is_fill_in(&self) -> bool {
        self.kind == BlockKind::FillInWithSubs
    }
}

/// 大题
#[derive(Debug, Clone)]
pub struct Section<'a> {
    /// 标题中的名称，例如 `选择题`
    pub name: String,
    /// 中文序号对应的数字（`二` → 2）
    pub ordinal: Option<u32>,
    pub question_type: QuestionType,
    pub questions: Vec<QuestionBlock<'a>>,
}
