//! 属性/答案提取
//!
//! 从题块的拼接文本中提取 `【答案】`、`【难度】`、`【知识点】`、`【解析】/【详解】`，
//! 支持三种答案编码：整段、按题号分组（`3．B 4．A`）、按小题编号（`(1)甲 (2)乙`）。

use crate::models::{ExtractedAttributes, ExtractionMode, KeyedTexts, Paragraph, QuestionContent, QuestionType};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static ANSWER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"【答案】\s*([^【]*)").unwrap());
static DIFFICULTY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"【难度】\s*([\d.]+)").unwrap());
static KNOWLEDGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"【知识点】\s*([^【]*)").unwrap());
static ANALYSIS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"【(?:解析|详解)】\s*([^【]*)").unwrap());
static ATTRIBUTE_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"【(?:答案|难度|知识点|解析|详解)】[^【]*").unwrap());
static KNOWLEDGE_SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[,，;；、]").unwrap());

static GROUPED_ANSWER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)[．.]\s*([A-Z\p{Han}]+)").unwrap());
static GROUPED_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)[．.]").unwrap());
static SUB_ANSWER_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\((\d+)\)").unwrap());
static SUB_ANALYSIS_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[（(](\d+)[）)]").unwrap());

static OPTION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([A-D])[.．、]\s*(.*)$").unwrap());

/// 题块属性中出现的标记
pub const ATTRIBUTE_MARKERS: [&str; 5] = ["【答案】", "【难度】", "【知识点】", "【解析】", "【详解】"];

/// 文本是否包含任一属性标记
pub fn has_attribute_marker(text: &str) -> bool {
    ATTRIBUTE_MARKERS.iter().any(|m| text.contains(m))
}

/// 将难度值归一化为 1-5 级
///
/// 0-1 之间的小数视为难度系数（系数越高越容易）；大于 1 的值视为已离散的等级，
/// 截断到 `[1, 5]`。
pub fn normalize_difficulty(value: f64) -> Option<u8> {
    if !value.is_finite() {
        return None;
    }
    if value <= 1.0 {
        let level = if value >= 0.85 {
            1
        } else if value >= 0.75 {
            2
        } else if value >= 0.65 {
            3
        } else if value >= 0.50 {
            4
        } else {
            5
        };
        Some(level)
    } else {
        Some(value.clamp(1.0, 5.0) as u8)
    }
}

/// 解析难度文本，非数字返回 `None`
pub fn parse_difficulty(raw: &str) -> Option<u8> {
    raw.trim().parse::<f64>().ok().and_then(normalize_difficulty)
}

/// 按编号标记切分文本：每个标记到下一个标记（或文本末尾）之间的内容归属该标记
fn split_by_markers<'t, F>(text: &'t str, marker: &Regex, mut key_of: F) -> Vec<(String, &'t str)>
where
    F: FnMut(&regex::Captures) -> String,
{
    let captures: Vec<_> = marker.captures_iter(text).collect();
    let mut segments = Vec::with_capacity(captures.len());
    for (i, cap) in captures.iter().enumerate() {
        let Some(whole) = cap.get(0) else { continue };
        let end = captures
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(text.len(), |m| m.start());
        segments.push((key_of(cap), &text[whole.end()..end]));
    }
    segments
}

fn first_value(map: &KeyedTexts) -> Option<String> {
    map.first().map(|(_, v)| v.clone())
}

/// 取出标记块内容，空内容视为缺失
fn capture_block(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// 属性提取器
#[derive(Debug, Default, Clone, Copy)]
pub struct AttributeExtractor;

impl AttributeExtractor {
    pub fn new() -> Self {
        Self
    }

    /// 识别答案文本的编码方式
    pub fn detect_answer_mode(&self, answer_text: &str) -> ExtractionMode {
        if answer_text.is_empty() {
            return ExtractionMode::Single;
        }
        if GROUPED_ANSWER_RE.is_match(answer_text) {
            return ExtractionMode::Grouped;
        }
        if !self.parse_sub_answers(answer_text).is_empty() {
            return ExtractionMode::Sub;
        }
        ExtractionMode::Single
    }

    /// `3．B    4．A` → `{"3": "B", "4": "A"}`
    pub fn parse_grouped_answers(&self, answer_text: &str) -> KeyedTexts {
        GROUPED_ANSWER_RE
            .captures_iter(answer_text)
            .map(|c| (c[1].to_string(), c[2].trim().to_string()))
            .collect()
    }

    /// `(1)答案1 (2)答案2` → `{"(1)": "答案1", "(2)": "答案2"}`
    ///
    /// 某段内容中若夹有非编号的半角括号，该段被跳过。
    pub fn parse_sub_answers(&self, answer_text: &str) -> KeyedTexts {
        split_by_markers(answer_text, &SUB_ANSWER_MARKER_RE, |c| format!("({})", &c[1]))
            .into_iter()
            .filter(|(_, seg)| !seg.is_empty() && !seg.contains('('))
            .map(|(k, seg)| (k, seg.trim().to_string()))
            .collect()
    }

    /// `3．解析A 4．解析B` → `{"3": "解析A", "4": "解析B"}`
    pub fn parse_grouped_analyses(&self, analysis_text: &str) -> KeyedTexts {
        split_by_markers(analysis_text, &GROUPED_MARKER_RE, |c| c[1].to_string())
            .into_iter()
            .filter(|(_, seg)| !seg.is_empty())
            .map(|(k, seg)| (k, seg.trim().to_string()))
            .collect()
    }

    /// `（1）解析1 (2)解析2` → `{"(1)": "解析1", "(2)": "解析2"}`，全角半角括号均可
    pub fn parse_sub_analyses(&self, analysis_text: &str) -> KeyedTexts {
        split_by_markers(analysis_text, &SUB_ANALYSIS_MARKER_RE, |c| format!("({})", &c[1]))
            .into_iter()
            .filter(|(_, seg)| !seg.is_empty() && !seg.contains(['(', '（']))
            .map(|(k, seg)| (k, seg.trim().to_string()))
            .collect()
    }

    /// 从文本中提取全部属性
    pub fn extract_attributes(&self, text: &str, mode: ExtractionMode) -> ExtractedAttributes {
        let mut attrs = ExtractedAttributes::default();
        let mut mode = mode;

        if let Some(answer_text) = capture_block(&ANSWER_RE, text) {
            attrs.detected_mode = self.detect_answer_mode(&answer_text);
            if mode == ExtractionMode::Auto {
                mode = attrs.detected_mode;
            }
            match mode {
                ExtractionMode::Grouped => {
                    attrs.grouped_answers = self.parse_grouped_answers(&answer_text);
                    attrs.answer = first_value(&attrs.grouped_answers);
                }
                ExtractionMode::Sub => {
                    attrs.sub_answers = self.parse_sub_answers(&answer_text);
                    attrs.answer = first_value(&attrs.sub_answers);
                }
                ExtractionMode::Single | ExtractionMode::Auto => {
                    attrs.answer = Some(answer_text);
                }
            }
        }

        if let Some(raw) = DIFFICULTY_RE.captures(text).and_then(|c| c.get(1)) {
            attrs.difficulty = parse_difficulty(raw.as_str());
            if attrs.difficulty.is_none() {
                debug!("无法解析难度值: {}", raw.as_str());
            }
        }

        if let Some(knowledge_text) = capture_block(&KNOWLEDGE_RE, text) {
            attrs.knowledge_points = KNOWLEDGE_SPLIT_RE
                .split(&knowledge_text)
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(analysis_text) = capture_block(&ANALYSIS_RE, text) {
            match mode {
                ExtractionMode::Grouped => {
                    attrs.grouped_analyses = self.parse_grouped_analyses(&analysis_text);
                    attrs.analysis = first_value(&attrs.grouped_analyses);
                }
                ExtractionMode::Sub => {
                    attrs.sub_analyses = self.parse_sub_analyses(&analysis_text);
                    attrs.analysis = first_value(&attrs.sub_analyses);
                }
                ExtractionMode::Single | ExtractionMode::Auto => {
                    attrs.analysis = Some(analysis_text);
                }
            }
        }

        attrs
    }

    /// 去掉全部属性块，得到干净的题目文本
    pub fn remove_attributes(&self, text: &str) -> String {
        ATTRIBUTE_BLOCK_RE.replace_all(text, "").trim().to_string()
    }

    /// 拆分选择题题干与选项
    ///
    /// 第一个选项行之前的行属于题干；之后的非选项行被忽略。
    pub fn extract_options(&self, text: &str) -> (String, Option<Vec<String>>) {
        let mut stem_lines = Vec::new();
        let mut options = Vec::new();

        for line in text.split('\n').map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(c) = OPTION_RE.captures(line) {
                options.push(format!("{}. {}", &c[1], c[2].trim()));
            } else if options.is_empty() {
                stem_lines.push(line);
            }
        }

        let stem = stem_lines.join("\n").trim().to_string();
        (stem, (!options.is_empty()).then_some(options))
    }

    /// 解析题块段落：提取属性、去除属性块、拆分选项
    pub fn parse_question_content(
        &self,
        paragraphs: &[&Paragraph],
        question_type: &QuestionType,
        mode: ExtractionMode,
    ) -> QuestionContent {
        let full_text = paragraphs
            .iter()
            .map(|p| p.text())
            .collect::<Vec<_>>()
            .join("\n");

        let attributes = self.extract_attributes(&full_text, mode);
        let clean_text = self.remove_attributes(&full_text);

        let (stem, options) = if question_type.is_choice() {
            self.extract_options(&clean_text)
        } else {
            (clean_text, None)
        };

        QuestionContent {
            stem,
            options,
            attributes,
        }
    }
}

/// 选项行：`A.`、`B．`、`C、` 开头
pub fn option_letter(text: &str) -> Option<char> {
    OPTION_RE
        .captures(text.trim())
        .and_then(|c| c[1].chars().next())
}
