//! Locale handling for summary generation.
//!
//! The category a summary may carry is constrained to a fixed list per
//! locale; prompts, provider schemas, and fallback summaries all draw from
//! the same enumeration so the feed's category filter stays closed.

use serde::{Deserialize, Serialize};

const CATEGORIES_EN: &[&str] = &[
    "Frontend",
    "Backend",
    "Full Stack",
    "AI/ML",
    "Mobile",
    "Database",
    "DevOps",
    "Game Dev",
    "CLI Tools",
    "Others",
    "Tech News",
    "Design",
    "Product",
];

const CATEGORIES_ZH: &[&str] = &[
    "前端",
    "后端",
    "全栈",
    "人工智能",
    "移动端",
    "数据库",
    "DevOps",
    "游戏开发",
    "命令行工具",
    "其他",
    "科技资讯",
    "设计",
    "产品",
];

/// Active output locale. Controls the category enumeration and the language
/// the model is instructed to answer in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Locale {
    #[serde(rename = "en")]
    En,
    #[default]
    #[serde(rename = "zh-CN")]
    ZhCn,
}

impl Locale {
    /// Fixed category list for this locale.
    pub fn categories(self) -> &'static [&'static str] {
        match self {
            Locale::En => CATEGORIES_EN,
            Locale::ZhCn => CATEGORIES_ZH,
        }
    }

    /// Human-readable language name used inside prompts.
    pub fn language_name(self) -> &'static str {
        match self {
            Locale::En => "English",
            Locale::ZhCn => "Simplified Chinese",
        }
    }

    /// Placeholder introduction when a repository has no description.
    pub fn no_description_line(self) -> &'static str {
        match self {
            Locale::En => "No description provided.",
            Locale::ZhCn => "暂无描述 (No description provided)",
        }
    }

    /// Placeholder feature line when a repository has no topics.
    pub fn default_feature_line(self) -> &'static str {
        match self {
            Locale::En => "View the source code for details.",
            Locale::ZhCn => "查看源码了解详情 (View source code for details)",
        }
    }

    /// Label for an unknown language / tech stack.
    pub fn unknown_label(self) -> &'static str {
        match self {
            Locale::En => "Unknown",
            Locale::ZhCn => "未知",
        }
    }
}
