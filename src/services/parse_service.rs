//! 题目组装服务 - 业务能力层
//!
//! 对一篇文档执行完整解析：登记图片 → 识别结构 → 按题块形态提取属性、渲染题干，
//! 产出题目记录树。每次调用独立持有识别器、提取器、图片登记表与渲染器。

use crate::config::Config;
use crate::error::AppResult;
use crate::models::{
    BlockKind, DocxDocument, ExtractedAttributes, ExtractionMode, Paragraph, QuestionBlock, QuestionRecord,
    QuestionType, SubQuestionBlock,
};
use crate::parser::content::{option_letter, AttributeExtractor};
use crate::parser::formula::FormulaConverter;
use crate::parser::image::{ImageInfo, ImageRegister};
use crate::parser::structure::{RecognizerOptions, StructureRecognizer};
use crate::parser::token::{escape_html, text_to_html, TokenGenerator};
use crate::services::paragraph_filter::{before_attributes, FilterContext, StemFilter};
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

static OPTION_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*[A-D][.．、]\s*").unwrap());
static EXTRACTED_OPTION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([A-D])\.\s*(.*)$").unwrap());

/// 解析选项
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// 图片根目录，实际写入 `<image_dir>/<task_id>/`
    pub image_dir: PathBuf,
    pub image_url_prefix: String,
    pub preserve_fill_in_sub_questions: bool,
}

impl ParseOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            image_dir: PathBuf::from(&config.image_dir),
            image_url_prefix: config.image_url_prefix.trim_end_matches('/').to_string(),
            preserve_fill_in_sub_questions: config.preserve_fill_in_sub_questions,
        }
    }
}

/// 一次解析的结果
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    pub questions: Vec<QuestionRecord>,
    pub images: Vec<ImageInfo>,
    pub section_count: usize,
}

impl ParseOutcome {
    /// 顶层记录与小题记录的总数
    pub fn record_count(&self) -> usize {
        self.questions.iter().map(|q| 1 + q.child_count()).sum()
    }
}

/// 题目组装服务
#[derive(Debug, Clone)]
pub struct ParseService {
    options: ParseOptions,
}

impl ParseService {
    pub fn new(options: ParseOptions) -> Self {
        Self { options }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(ParseOptions::from_config(config))
    }

    /// 该任务的图片目录
    pub fn task_image_dir(&self, task_id: &str) -> PathBuf {
        self.options.image_dir.join(task_id)
    }

    /// 解析整篇文档
    pub fn parse_document(&self, document: &DocxDocument, task_id: &str) -> AppResult<ParseOutcome> {
        let mut images = ImageRegister::new(self.task_image_dir(task_id));
        images.register_all(&document.media)?;

        let outcome = self.assemble(&document.paragraphs, &images, task_id);
        info!(
            "📊 解析完成: {} 个大题, {} 道题, {} 张图片",
            outcome.section_count,
            outcome.questions.len(),
            images.image_count()
        );
        Ok(ParseOutcome {
            images: images.images().to_vec(),
            ..outcome
        })
    }

    /// 只解析段落（没有嵌入媒体），图片目录不会被创建
    pub fn parse_paragraphs(&self, paragraphs: &[Paragraph], task_id: &str) -> ParseOutcome {
        let images = ImageRegister::new(Path::new(""));
        self.assemble(paragraphs, &images, task_id)
    }

    fn assemble(&self, paragraphs: &[Paragraph], images: &ImageRegister, task_id: &str) -> ParseOutcome {
        let formula = FormulaConverter::new();
        let tokens = TokenGenerator::new(&formula, images, self.options.image_url_prefix.as_str(), task_id);
        let assembler = Assembler {
            extractor: AttributeExtractor::new(),
            tokens,
        };

        let recognizer = StructureRecognizer::new(RecognizerOptions {
            preserve_fill_in_sub_questions: self.options.preserve_fill_in_sub_questions,
        });
        let sections = recognizer.parse(paragraphs);

        let mut questions = Vec::new();
        for section in &sections {
            debug!("大题 {:?} {}: {} 个题块", section.ordinal, section.name, section.questions.len());
            for block in &section.questions {
                let record = assembler.assemble(block);
                debug!("✓ {}", record);
                questions.push(record);
            }
        }

        ParseOutcome {
            questions,
            images: Vec::new(),
            section_count: sections.len(),
        }
    }
}

/// 难度只保留 1-5
fn valid_difficulty(difficulty: Option<u8>) -> Option<u8> {
    difficulty.filter(|d| (1..=5).contains(d))
}

struct Assembler<'a> {
    extractor: AttributeExtractor,
    tokens: TokenGenerator<'a>,
}

impl Assembler<'_> {
    fn assemble(&self, block: &QuestionBlock) -> QuestionRecord {
        match block.kind {
            BlockKind::Regular => self.build_regular(block),
            BlockKind::MixedNumbering => {
                warn!("⚠️ 题 {} 的小题编号无法分配答案，输出为普通题", block.number);
                self.build_regular(block)
            }
            BlockKind::FillInWithSubs => self.build_sub_keyed(block, FilterContext::Question),
            BlockKind::SubQuestionMaterial => self.build_sub_keyed(block, FilterContext::Material),
            BlockKind::GroupedMaterial => self.build_grouped(block),
        }
    }

    fn build_regular(&self, block: &QuestionBlock) -> QuestionRecord {
        let question_type = &block.question_type;
        let content = self
            .extractor
            .parse_question_content(&block.paragraphs, question_type, ExtractionMode::Single);
        let stem_paragraphs = StemFilter::new(question_type, FilterContext::Question).apply(&block.paragraphs);
        let options = self.build_options(content.options, &block.paragraphs, question_type);
        let attrs = content.attributes;

        QuestionRecord {
            id: block.number.clone(),
            number: block.number.clone(),
            question_type: question_type.name().to_string(),
            stem: self.tokens.render(&stem_paragraphs),
            options,
            answer: attrs.answer.unwrap_or_default(),
            analysis: attrs.analysis.as_deref().map(text_to_html),
            knowledge_points: attrs.knowledge_points,
            difficulty: valid_difficulty(attrs.difficulty),
            parent_id: None,
            children: None,
        }
    }

    /// 按 `(n)` 分配答案：带小题的填空题、材料 + (1)(2) 小题
    fn build_sub_keyed(&self, block: &QuestionBlock, parent_context: FilterContext) -> QuestionRecord {
        let parent_attrs = self.block_attributes(block, ExtractionMode::Sub);

        let children = block
            .sub_questions
            .iter()
            .map(|sub| {
                let (answer, analysis) = parent_attrs.sub_entry(&sub.number);
                let id = format!("{}-{}", block.number, sub.number);
                self.build_child(block, sub, id, sub.number.clone(), (answer, analysis), &parent_attrs)
            })
            .collect();

        self.build_parent(block, parent_context, parent_attrs, children)
    }

    /// 材料 + 3．4． 题组：小题题号改为组内相对序号，答案按绝对题号分配
    fn build_grouped(&self, block: &QuestionBlock) -> QuestionRecord {
        let parent_attrs = self.block_attributes(block, ExtractionMode::Grouped);

        let children = block
            .sub_questions
            .iter()
            .enumerate()
            .map(|(i, sub)| {
                let relative = (i + 1).to_string();
                let (answer, analysis) = parent_attrs.grouped_entry(&sub.number);
                let id = format!("{}-{}", block.number, relative);
                self.build_child(block, sub, id, relative, (answer, analysis), &parent_attrs)
            })
            .collect();

        self.build_parent(block, FilterContext::Material, parent_attrs, children)
    }

    /// 父题属性按文档顺序从父题及全部小题的文本中提取（答案可能落在最后一道小题的段落里）
    fn block_attributes(&self, block: &QuestionBlock, mode: ExtractionMode) -> ExtractedAttributes {
        self.extractor
            .parse_question_content(&block.all_paragraphs, &block.question_type, mode)
            .attributes
    }

    fn build_parent(
        &self,
        block: &QuestionBlock,
        context: FilterContext,
        attrs: ExtractedAttributes,
        children: Vec<QuestionRecord>,
    ) -> QuestionRecord {
        let stem_paragraphs = StemFilter::new(&block.question_type, context).apply(&block.paragraphs);
        QuestionRecord {
            id: block.number.clone(),
            number: block.number.clone(),
            question_type: block.question_type.name().to_string(),
            stem: self.tokens.render(&stem_paragraphs),
            options: None,
            answer: String::new(),
            analysis: None,
            knowledge_points: attrs.knowledge_points,
            difficulty: valid_difficulty(attrs.difficulty),
            parent_id: None,
            children: Some(children),
        }
    }

    /// 小题记录：答案与解析取自父题映射，缺失时退回小题自身的属性块
    fn build_child(
        &self,
        block: &QuestionBlock,
        sub: &SubQuestionBlock,
        id: String,
        number: String,
        (answer, analysis): (Option<&str>, Option<&str>),
        parent_attrs: &ExtractedAttributes,
    ) -> QuestionRecord {
        let question_type = &block.question_type;
        let own = self
            .extractor
            .parse_question_content(&sub.paragraphs, question_type, ExtractionMode::Single);
        let stem_paragraphs = StemFilter::new(question_type, FilterContext::Question).apply(&sub.paragraphs);
        let options = self.build_options(own.options, &sub.paragraphs, question_type);

        let answer = answer.map(str::to_string).or(own.attributes.answer).unwrap_or_default();
        let analysis = analysis.map(str::to_string).or(own.attributes.analysis);
        if answer.is_empty() {
            debug!("小题 {} (父题 {}) 没有找到答案", sub.number, sub.parent_number);
        }

        QuestionRecord {
            id,
            number,
            question_type: question_type.name().to_string(),
            stem: self.tokens.render(&stem_paragraphs),
            options,
            answer,
            analysis: analysis.as_deref().map(text_to_html),
            knowledge_points: parent_attrs.knowledge_points.clone(),
            difficulty: valid_difficulty(parent_attrs.difficulty),
            parent_id: Some(sub.parent_number.clone()),
            children: None,
        }
    }

    /// 选项渲染：普通选项转义；属性区之前带公式的选项行改用富文本渲染，保持字母顺序
    fn build_options(
        &self,
        options: Option<Vec<String>>,
        paragraphs: &[&Paragraph],
        question_type: &QuestionType,
    ) -> Option<Vec<String>> {
        let options = options.filter(|_| question_type.is_choice())?;

        let mut rich: HashMap<char, String> = HashMap::new();
        for paragraph in before_attributes(paragraphs) {
            if !paragraph.has_math() {
                continue;
            }
            if let Some(letter) = option_letter(paragraph.text()) {
                let html = self.tokens.render(&[paragraph]);
                rich.insert(letter, OPTION_PREFIX_RE.replace(&html, "").into_owned());
            }
        }

        let rendered = options
            .iter()
            .filter_map(|option| EXTRACTED_OPTION_RE.captures(option))
            .map(|caps| {
                let letter = &caps[1];
                let content = letter
                    .chars()
                    .next()
                    .and_then(|c| rich.remove(&c))
                    .unwrap_or_else(|| escape_html(&caps[2]));
                format!("{}. {}", letter, content)
            })
            .collect();
        Some(rendered)
    }
}
