/// 题型
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum QuestionType {
    /// 选择题
    Choice,
    /// 填空题
    FillIn,
    /// 解答题（含计算题）
    Solution,
    /// 实验题
    Experiment,
    /// 简答题
    ShortAnswer,
    /// 其他题型，保留大题标题原文
    Other(String),
}

impl QuestionType {
    /// 选择类题型关键字
    const CHOICE_KEYS: [&'static str; 4] = ["选择", "单选", "多选", "选"];

    /// 获取标准名称
    pub fn name(&self) -> &str {
        match self {
            QuestionType::Choice => "选择题",
            QuestionType::FillIn => "填空题",
            QuestionType::Solution => "解答题",
            QuestionType::Experiment => "实验题",
            QuestionType::ShortAnswer => "简答题",
            QuestionType::Other(name) => name,
        }
    }

    /// 从大题标题推断题型（模糊匹配）
    pub fn from_section_name(s: &str) -> Self {
        let s = s.trim();
        if s.contains("选择") {
            QuestionType::Choice
        } else if s.contains("填空") {
            QuestionType::FillIn
        } else if s.contains("解答") || s.contains("计算") {
            QuestionType::Solution
        } else if s.contains("实验") {
            QuestionType::Experiment
        } else if s.contains("简答") {
            QuestionType::ShortAnswer
        } else {
            QuestionType::Other(s.to_string())
        }
    }

    /// 是否按选择题处理选项
    pub fn is_choice(&self) -> bool {
        match self {
            QuestionType::Choice => true,
            QuestionType::Other(name) => Self::CHOICE_KEYS.iter().any(|k| name.contains(k)),
            _ => false,
        }
    }

    pub fn is_fill_in(&self) -> bool {
        matches!(self, QuestionType::FillIn)
    }

    /// 该题型中的 (1)(2) 编号只是排版用途，不构成独立小题
    pub fn has_cosmetic_sub_numbering(&self) -> bool {
        match self {
            QuestionType::FillIn
            | QuestionType::Solution
            | QuestionType::Experiment
            | QuestionType::ShortAnswer => true,
            QuestionType::Other(name) => name.contains("综合应用"),
            QuestionType::Choice => false,
        }
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
