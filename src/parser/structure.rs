//! 试卷结构识别
//!
//! 逐段落扫描，识别大题标题、材料引导语、题号 `1．`、小题号 `(1)`，
//! 把线性的段落序列切分为 大题 → 题块 → 小题 的层级结构。
//!
//! 分类优先级（先匹配者生效）：
//! 1. 大题标题 `一、选择题`
//! 2. 材料引导语（填空题大题内不识别）
//! 3. 材料阶段、尚无小题：非编号段落归入材料本身
//! 4. 材料阶段、已有小题：属性段落及答案区内的逐项解析归入父题
//! 5. 材料阶段的 `3．` → 新小题（第一道小题的题号提升为父题题号）
//! 6. 非材料阶段的 `3．` → 新题
//! 7. `(1)` → 排版型题型内联追加，否则拆为小题
//! 8. 其余段落追加到最内层的打开单元

use crate::models::{BlockKind, Paragraph, QuestionBlock, QuestionType, Section, SubQuestionBlock};
use crate::parser::content::has_attribute_marker;
use phf::phf_map;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

static TYPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([一二三四五六七八九十]+)、\s*(.+)$").unwrap());
static QUESTION_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)[．.]\s*").unwrap());
static SUB_QUESTION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[（(](\d+)[）)]\s*").unwrap());

/// 逐题解析复述：`4．A、……`
pub static ANALYSIS_DETAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)[．.]\s*([A-D])[、．.]").unwrap());
/// 逐项解析复述：`A、……`
pub static ANALYSIS_OPTION_DETAIL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([A-D])、").unwrap());

/// 材料题引导语
pub const MATERIAL_KEYWORDS: [&str; 6] = [
    "阅读下列材料，完成下面小题",
    "阅读下列材料，回答下列问题",
    "阅读下列材料，回答问题",
    "回答下列小题",
    "完成下列题目",
    "完成下面小题",
];

static CHINESE_NUMERALS: phf::Map<char, u32> = phf_map! {
    '一' => 1, '二' => 2, '三' => 3, '四' => 4, '五' => 5,
    '六' => 6, '七' => 7, '八' => 8, '九' => 9, '十' => 10,
};

/// 中文序号转数字，支持 `十二`、`二十`、`二十三`
pub fn chinese_numeral_value(s: &str) -> Option<u32> {
    let digits = s
        .chars()
        .map(|c| CHINESE_NUMERALS.get(&c).copied())
        .collect::<Option<Vec<u32>>>()?;
    match digits.as_slice() {
        [d] => Some(*d),
        [10, d] if *d < 10 => Some(10 + d),
        [d, 10] if *d < 10 => Some(d * 10),
        [d, 10, e] if *d < 10 && *e < 10 => Some(d * 10 + e),
        _ => None,
    }
}

pub fn is_material_intro(text: &str) -> bool {
    MATERIAL_KEYWORDS.iter().any(|k| text.contains(k))
}

fn question_number(text: &str) -> Option<String> {
    QUESTION_NUMBER_RE.captures(text).map(|c| c[1].to_string())
}

/// `(1)` 或 `（1）` → 统一为半角 `(1)`
fn sub_question_number(text: &str) -> Option<String> {
    SUB_QUESTION_RE.captures(text).map(|c| format!("({})", &c[1]))
}

/// 识别器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognizerState {
    /// 尚未遇到大题标题
    Idle,
    InSection,
    /// 正在收集材料题（材料正文、小题、共享属性）
    InMaterial,
}

/// 识别选项
#[derive(Debug, Clone, Copy, Default)]
pub struct RecognizerOptions {
    /// 填空题中的 (1)(2) 拆为独立小题，按小题分配答案
    pub preserve_fill_in_sub_questions: bool,
}

/// 段落及其在文档中的序号，扁平化小题时用于恢复文档顺序
type Indexed<'a> = (usize, &'a Paragraph);

#[derive(Debug)]
struct OpenSub<'a> {
    number: String,
    paragraphs: Vec<Indexed<'a>>,
}

#[derive(Debug, Default)]
struct OpenQuestion<'a> {
    /// 材料占位题在第一道小题出现前没有题号
    number: Option<String>,
    paragraphs: Vec<Indexed<'a>>,
    sub_questions: Vec<OpenSub<'a>>,
    /// 已进入答案/解析区
    in_analysis: bool,
}

impl<'a> OpenQuestion<'a> {
    fn has_sub(&self, number: &str) -> bool {
        self.sub_questions.iter().any(|s| s.number == number)
    }
}

#[derive(Debug)]
struct OpenSection<'a> {
    name: String,
    ordinal: Option<u32>,
    question_type: QuestionType,
    questions: Vec<OpenQuestion<'a>>,
}

/// 结构识别器，每次解析新建一个
#[derive(Debug)]
pub struct StructureRecognizer<'a> {
    options: RecognizerOptions,
    state: RecognizerState,
    sections: Vec<OpenSection<'a>>,
    current: Option<OpenQuestion<'a>>,
}

impl<'a> StructureRecognizer<'a> {
    pub fn new(options: RecognizerOptions) -> Self {
        Self {
            options,
            state: RecognizerState::Idle,
            sections: Vec::new(),
            current: None,
        }
    }

    /// 识别整篇文档的大题与题块
    pub fn parse(mut self, paragraphs: &'a [Paragraph]) -> Vec<Section<'a>> {
        for (index, paragraph) in paragraphs.iter().enumerate() {
            self.classify(index, paragraph);
        }
        self.close_question();

        self.sections.into_iter().map(finalize_section).collect()
    }

    /// 识别并按文档顺序展开为题块列表
    pub fn extract_question_blocks(self, paragraphs: &'a [Paragraph]) -> Vec<QuestionBlock<'a>> {
        self.parse(paragraphs)
            .into_iter()
            .flat_map(|section| section.questions)
            .collect()
    }

    fn classify(&mut self, index: usize, paragraph: &'a Paragraph) {
        if !paragraph.has_visible_content() {
            return;
        }
        let text = paragraph.text().trim();
        let item = (index, paragraph);

        if let Some(caps) = TYPE_RE.captures(text) {
            self.open_section(&caps[1], caps[2].trim());
            return;
        }

        let section_type = self.sections.last().map(|s| s.question_type.clone());
        let is_fill_section = section_type.as_ref().is_some_and(QuestionType::is_fill_in);

        if !is_fill_section && is_material_intro(text) {
            self.open_material(item);
            return;
        }

        if self.state == RecognizerState::InMaterial && self.route_material(item, text) {
            return;
        }

        if let Some(number) = question_number(text) {
            if self.state == RecognizerState::InMaterial {
                self.open_sub_question(number, item);
            } else {
                self.open_question(number, item);
            }
            return;
        }

        if let Some(sub_number) = sub_question_number(text) {
            if self.current.is_some() {
                // 排版型题型的 (n) 从不拆为小题，收尾阶段无需再展平
                let inline = section_type.as_ref().is_some_and(|t| {
                    t.has_cosmetic_sub_numbering()
                        && !(t.is_fill_in() && self.options.preserve_fill_in_sub_questions)
                });
                if inline {
                    self.append_to_open_unit(item);
                } else {
                    self.open_sub_question(sub_number, item);
                }
                return;
            }
        }

        self.append_to_open_unit(item);
    }

    /// 材料阶段的专属规则，已处理返回 `true`
    fn route_material(&mut self, item: Indexed<'a>, text: &str) -> bool {
        let Some(block) = self.current.as_mut() else {
            return false;
        };
        let is_attribute = has_attribute_marker(text);
        let numbered = question_number(text);
        let is_numbered = numbered.is_some() || sub_question_number(text).is_some();

        if block.sub_questions.is_empty() && !is_numbered {
            block.in_analysis |= is_attribute;
            block.paragraphs.push(item);
            return true;
        }

        if !block.sub_questions.is_empty() && is_attribute {
            block.in_analysis = true;
            block.paragraphs.push(item);
            return true;
        }

        if block.in_analysis {
            let restates_existing = numbered.as_deref().is_some_and(|n| block.has_sub(n));
            let option_detail = !block.sub_questions.is_empty() && ANALYSIS_OPTION_DETAIL_RE.is_match(text);
            if restates_existing || ANALYSIS_DETAIL_RE.is_match(text) || option_detail {
                block.paragraphs.push(item);
                return true;
            }
        }

        false
    }

    // ========== 状态转换 ==========

    fn open_section(&mut self, numeral: &str, name: &str) {
        self.close_question();
        debug!("识别到大题: {}、{}", numeral, name);
        self.sections.push(OpenSection {
            name: name.to_string(),
            ordinal: chinese_numeral_value(numeral),
            question_type: QuestionType::from_section_name(name),
            questions: Vec::new(),
        });
        self.state = RecognizerState::InSection;
    }

    fn open_material(&mut self, item: Indexed<'a>) {
        self.close_question();
        let mut block = OpenQuestion::default();
        block.paragraphs.push(item);
        self.current = Some(block);
        self.state = RecognizerState::InMaterial;
    }

    fn open_question(&mut self, number: String, item: Indexed<'a>) {
        self.close_question();
        self.current = Some(OpenQuestion {
            number: Some(number),
            paragraphs: vec![item],
            ..Default::default()
        });
        if !self.sections.is_empty() {
            self.state = RecognizerState::InSection;
        }
    }

    fn open_sub_question(&mut self, number: String, item: Indexed<'a>) {
        let Some(block) = self.current.as_mut() else {
            self.append_to_open_unit(item);
            return;
        };
        if block.number.is_none() && !number.starts_with('(') {
            block.number = Some(number.clone());
        }
        block.sub_questions.push(OpenSub {
            number,
            paragraphs: vec![item],
        });
    }

    fn append_to_open_unit(&mut self, item: Indexed<'a>) {
        match self.current.as_mut() {
            Some(block) => match block.sub_questions.last_mut() {
                Some(sub) => sub.paragraphs.push(item),
                None => block.paragraphs.push(item),
            },
            None => debug!("段落 {} 不属于任何题目，已忽略", item.0),
        }
    }

    fn close_question(&mut self) {
        let Some(block) = self.current.take() else {
            return;
        };
        match self.sections.last_mut() {
            Some(section) => section.questions.push(block),
            None => debug!("大题标题之前的题目已忽略: {:?}", block.number),
        }
    }
}

fn strip_index<'a>(items: Vec<Indexed<'a>>) -> Vec<&'a Paragraph> {
    items.into_iter().map(|(_, p)| p).collect()
}

/// 把小题段落按文档顺序并回父题
fn flatten<'a>(mut paragraphs: Vec<Indexed<'a>>, subs: &[OpenSub<'a>]) -> Vec<Indexed<'a>> {
    for sub in subs {
        paragraphs.extend(sub.paragraphs.iter().copied());
    }
    paragraphs.sort_by_key(|(index, _)| *index);
    paragraphs
}

fn finalize_section(section: OpenSection<'_>) -> Section<'_> {
    let question_type = section.question_type.clone();
    let questions = section
        .questions
        .into_iter()
        .enumerate()
        .map(|(i, raw)| finalize_block(raw, i + 1, &question_type))
        .collect();
    Section {
        name: section.name,
        ordinal: section.ordinal,
        question_type,
        questions,
    }
}

fn finalize_block<'a>(
    raw: OpenQuestion<'a>,
    ordinal: usize,
    question_type: &QuestionType,
) -> QuestionBlock<'a> {
    let number = raw.number.unwrap_or_else(|| {
        debug!("材料题未出现题号，使用序号 {}", ordinal);
        ordinal.to_string()
    });

    let subs = raw.sub_questions;
    let parenthesized = subs.iter().filter(|s| s.number.starts_with('(')).count();
    let all_parenthesized = !subs.is_empty() && parenthesized == subs.len();
    let mixed = parenthesized > 0 && parenthesized < subs.len();
    let all_paragraphs = strip_index(flatten(raw.paragraphs.clone(), &subs));

    let (kind, paragraphs, subs) = if subs.is_empty() {
        (BlockKind::Regular, raw.paragraphs, Vec::new())
    } else if mixed {
        warn!("⚠️ 题 {} 混用了两种小题编号，按普通题处理", number);
        (BlockKind::MixedNumbering, flatten(raw.paragraphs, &subs), Vec::new())
    } else if all_parenthesized && question_type.is_fill_in() {
        (BlockKind::FillInWithSubs, raw.paragraphs, subs)
    } else if all_parenthesized {
        (BlockKind::SubQuestionMaterial, raw.paragraphs, subs)
    } else {
        (BlockKind::GroupedMaterial, raw.paragraphs, subs)
    };

    let sub_questions = subs
        .into_iter()
        .map(|sub| SubQuestionBlock {
            number: sub.number,
            parent_number: number.clone(),
            paragraphs: strip_index(sub.paragraphs),
        })
        .collect();

    QuestionBlock {
        number,
        question_type: question_type.clone(),
        kind,
        paragraphs: strip_index(paragraphs),
        all_paragraphs,
        sub_questions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraphs(lines: &[&str]) -> Vec<Paragraph> {
        lines.iter().map(|l| Paragraph::from_text(*l)).collect()
    }

    fn texts(block: &[&Paragraph]) -> Vec<String> {
        block.iter().map(|p| p.text().to_string()).collect()
    }

    #[test]
    fn test_chinese_numerals() {
        assert_eq!(chinese_numeral_value("三"), Some(3));
        assert_eq!(chinese_numeral_value("十"), Some(10));
        assert_eq!(chinese_numeral_value("十二"), Some(12));
        assert_eq!(chinese_numeral_value("二十"), Some(20));
        assert_eq!(chinese_numeral_value("二十三"), Some(23));
        assert_eq!(chinese_numeral_value("十十"), None);
    }

    #[test]
    fn test_no_heading_yields_nothing() {
        let paras = paragraphs(&["1．题目", "A.对", "【答案】A"]);
        let sections = StructureRecognizer::new(RecognizerOptions::default()).parse(&paras);
        assert!(sections.is_empty());
    }

    #[test]
    fn test_heading_closes_open_question() {
        let paras = paragraphs(&["一、选择题", "1．题一", "补充", "二、填空题", "说明文字", "2．题二"]);
        let sections = StructureRecognizer::new(RecognizerOptions::default()).parse(&paras);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].ordinal, Some(1));
        assert_eq!(sections[0].questions.len(), 1);
        assert_eq!(texts(&sections[0].questions[0].paragraphs), vec!["1．题一", "补充"]);
        assert_eq!(sections[1].question_type, QuestionType::FillIn);
        assert_eq!(sections[1].questions.len(), 1);
        assert_eq!(sections[1].questions[0].number, "2");
    }

    #[test]
    fn test_grouped_material() {
        let paras = paragraphs(&[
            "二、简答题",
            "阅读下列材料，完成下面小题",
            "某段材料文本",
            "3．问题一",
            "4．问题二",
            "【答案】3．B 4．A",
            "【解析】3．解析一 4．解析二",
        ]);
        let blocks = StructureRecognizer::new(RecognizerOptions::default()).extract_question_blocks(&paras);
        assert_eq!(blocks.len(), 1);
        let block = &blocks[0];
        assert_eq!(block.kind, BlockKind::GroupedMaterial);
        assert_eq!(block.number, "3");
        assert_eq!(block.sub_questions.len(), 2);
        assert_eq!(block.sub_questions[1].parent_number, "3");
        assert_eq!(texts(&block.sub_questions[1].paragraphs), vec!["4．问题二"]);
        assert_eq!(block.paragraphs.len(), 4);
        assert_eq!(
            texts(&block.all_paragraphs),
            vec![
                "阅读下列材料，完成下面小题",
                "某段材料文本",
                "3．问题一",
                "4．问题二",
                "【答案】3．B 4．A",
                "【解析】3．解析一 4．解析二",
            ]
        );
    }

    #[test]
    fn test_analysis_restatement_goes_to_parent() {
        let paras = paragraphs(&[
            "一、选择题",
            "阅读下列材料，完成下面小题",
            "材料",
            "1．问题一",
            "A.甲",
            "2．问题二",
            "【答案】1．A 2．B",
            "【解析】",
            "1．A、甲正确",
            "2．详细解析",
            "B、乙错误",
        ]);
        let blocks = StructureRecognizer::new(RecognizerOptions::default()).extract_question_blocks(&paras);
        let block = &blocks[0];
        assert_eq!(block.sub_questions.len(), 2);
        assert_eq!(texts(&block.sub_questions[0].paragraphs), vec!["1．问题一", "A.甲"]);
        assert_eq!(texts(&block.sub_questions[1].paragraphs), vec!["2．问题二"]);
        assert!(texts(&block.paragraphs).contains(&"B、乙错误".to_string()));
        assert!(texts(&block.paragraphs).contains(&"2．详细解析".to_string()));
    }

    #[test]
    fn test_material_keyword_wins_over_number() {
        let paras = paragraphs(&["一、选择题", "1．题一", "12．阅读下列材料，回答问题", "13．小题"]);
        let blocks = StructureRecognizer::new(RecognizerOptions::default()).extract_question_blocks(&paras);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].number, "13");
        assert_eq!(blocks[1].kind, BlockKind::GroupedMaterial);
    }

    #[test]
    fn test_sub_question_material_in_choice_section() {
        let paras = paragraphs(&["一、选择题", "5．主题干", "（1）小题一", "(2)小题二", "【答案】(1)A (2)B"]);
        let blocks = StructureRecognizer::new(RecognizerOptions::default()).extract_question_blocks(&paras);
        let block = &blocks[0];
        assert_eq!(block.kind, BlockKind::SubQuestionMaterial);
        assert_eq!(block.sub_questions[0].number, "(1)");
        assert_eq!(block.sub_questions[1].number, "(2)");
        assert_eq!(texts(&block.sub_questions[1].paragraphs), vec!["(2)小题二", "【答案】(1)A (2)B"]);
    }

    #[test]
    fn test_fill_in_sub_numbers_inline_by_default() {
        let lines = ["一、填空题", "6．主题干", "(1)空一", "(2)空二", "【答案】(1)甲 (2)乙"];
        let paras = paragraphs(&lines);
        let blocks = StructureRecognizer::new(RecognizerOptions::default()).extract_question_blocks(&paras);
        assert_eq!(blocks[0].kind, BlockKind::Regular);
        assert_eq!(blocks[0].paragraphs.len(), 4);

        let options = RecognizerOptions {
            preserve_fill_in_sub_questions: true,
        };
        let blocks = StructureRecognizer::new(options).extract_question_blocks(&paras);
        assert_eq!(blocks[0].kind, BlockKind::FillInWithSubs);
        assert!(blocks[0].is_fill_in());
        assert_eq!(blocks[0].sub_questions.len(), 2);
    }

    #[test]
    fn test_mixed_numbering_is_flattened_in_order() {
        let paras = paragraphs(&[
            "一、选择题",
            "阅读下列材料，完成下面小题",
            "材料",
            "(1)括号小题",
            "3．数字小题",
            "【答案】3．A",
        ]);
        let blocks = StructureRecognizer::new(RecognizerOptions::default()).extract_question_blocks(&paras);
        let block = &blocks[0];
        assert_eq!(block.kind, BlockKind::MixedNumbering);
        assert!(block.sub_questions.is_empty());
        assert_eq!(
            texts(&block.paragraphs),
            vec!["阅读下列材料，完成下面小题", "材料", "(1)括号小题", "3．数字小题", "【答案】3．A"]
        );
    }

    #[test]
    fn test_material_without_sub_questions_uses_ordinal() {
        let paras = paragraphs(&["一、选择题", "1．题一", "阅读下列材料，回答下列问题", "材料正文"]);
        let blocks = StructureRecognizer::new(RecognizerOptions::default()).extract_question_blocks(&paras);
        assert_eq!(blocks[1].number, "2");
        assert_eq!(blocks[1].kind, BlockKind::Regular);
    }

    #[test]
    fn test_empty_paragraphs_skipped() {
        let paras = paragraphs(&["一、选择题", "  ", "1．题一", ""]);
        let blocks = StructureRecognizer::new(RecognizerOptions::default()).extract_question_blocks(&paras);
        assert_eq!(blocks[0].paragraphs.len(), 1);
    }
}
