//! 题干段落过滤
//!
//! 渲染题干前去掉属性区（第一个属性标记段落及其后全部段落）、`故选` 结论句；
//! 材料父题还要去掉逐题/逐项解析复述；选择题去掉选项行（选项单独渲染）。

use crate::models::{Paragraph, QuestionType};
use crate::parser::content::{has_attribute_marker, option_letter};
use crate::parser::structure::{ANALYSIS_DETAIL_RE, ANALYSIS_OPTION_DETAIL_RE};

const CONCLUSION_PREFIX: &str = "故选";

/// 过滤时所处的上下文
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterContext {
    /// 普通题或小题自身的段落
    Question,
    /// 材料题父题的段落
    Material,
}

/// 段落过滤器
#[derive(Debug, Clone)]
pub struct StemFilter<'t> {
    question_type: &'t QuestionType,
    context: FilterContext,
}

impl<'t> StemFilter<'t> {
    pub fn new(question_type: &'t QuestionType, context: FilterContext) -> Self {
        Self {
            question_type,
            context,
        }
    }

    /// 返回用于渲染题干的段落，保持原顺序
    pub fn apply<'a>(&self, paragraphs: &[&'a Paragraph]) -> Vec<&'a Paragraph> {
        paragraphs
            .iter()
            .copied()
            .take_while(|p| !has_attribute_marker(p.text()))
            .filter(|p| self.keep(p))
            .collect()
    }

    fn keep(&self, paragraph: &Paragraph) -> bool {
        let text = paragraph.text().trim();
        if text.starts_with(CONCLUSION_PREFIX) {
            return false;
        }
        if self.context == FilterContext::Material
            && (ANALYSIS_DETAIL_RE.is_match(text) || ANALYSIS_OPTION_DETAIL_RE.is_match(text))
        {
            return false;
        }
        if self.question_type.is_choice() && option_letter(text).is_some() {
            return false;
        }
        true
    }
}

/// 属性区之前的段落（选项公式重扫用）
pub fn before_attributes<'a>(paragraphs: &[&'a Paragraph]) -> Vec<&'a Paragraph> {
    paragraphs
        .iter()
        .copied()
        .take_while(|p| !has_attribute_marker(p.text()))
        .collect()
}
