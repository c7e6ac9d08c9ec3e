//! Message classifier for model routing.
//!
//! Scores free text against a fixed registry of weighted keyword/regex
//! categories and derives a complexity score used by the router. The
//! classifier is pure: it holds no mutable state, so classifying the same
//! text twice always produces identical results.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Keyword match contributes the rule weight; pattern match contributes
/// weight times this factor.
const PATTERN_WEIGHT_FACTOR: f32 = 1.5;

/// Score above which a category counts toward complexity.
const COMPLEXITY_SCORE_THRESHOLD: f32 = 2.0;

/// Maximum complexity score.
const COMPLEXITY_CAP: f32 = 5.0;

/// Semantic category assigned to a message.
///
/// The variant order here is the registry order and therefore the tie-break
/// order: when two categories accumulate the same score, the earlier variant
/// wins. Reasoning deliberately outranks everything else so analytical
/// messages never lose a tie to a softer category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Analysis, logic, math, multi-step problems.
    Reasoning,
    /// Emotional support and venting.
    Emotional,
    /// Health, sleep, diet, symptoms.
    Health,
    /// Creative writing, stories, roleplay.
    Creative,
    /// Factual lookup questions.
    Knowledge,
    /// Small talk; also the default when nothing matches.
    Casual,
}

impl Category {
    /// All categories in registry (tie-break) order.
    pub const ALL: [Category; 6] = [
        Category::Reasoning,
        Category::Emotional,
        Category::Health,
        Category::Creative,
        Category::Knowledge,
        Category::Casual,
    ];
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reasoning => write!(f, "reasoning"),
            Self::Emotional => write!(f, "emotional"),
            Self::Health => write!(f, "health"),
            Self::Creative => write!(f, "creative"),
            Self::Knowledge => write!(f, "knowledge"),
            Self::Casual => write!(f, "casual"),
        }
    }
}

/// One entry in the category registry.
struct CategoryRule {
    category: Category,
    /// Literal keywords, matched case-insensitively as substrings.
    keywords: &'static [&'static str],
    /// Compiled patterns; each matching pattern adds `weight * 1.5`.
    patterns: Vec<Regex>,
    /// Score added per matched keyword.
    weight: f32,
}

/// Build the category registry. Rules are evaluated in declaration order,
/// which must match [`Category::ALL`].
fn registry() -> &'static Vec<CategoryRule> {
    static REGISTRY: OnceLock<Vec<CategoryRule>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        vec![
            CategoryRule {
                category: Category::Reasoning,
                keywords: &[
                    "analyze", "reason", "logic", "deduce", "prove", "step by step",
                    "therefore", "calculate",
                ],
                patterns: compile(&[
                    r"(?i)\bwhy\b",
                    r"(?i)\bif\b.+\bthen\b",
                    r"(?i)\bhow (does|do|can|would)\b",
                ]),
                weight: 1.0,
            },
            CategoryRule {
                category: Category::Emotional,
                keywords: &[
                    "sad", "lonely", "anxious", "stressed", "miss you", "exhausted",
                    "upset", "crying",
                ],
                patterns: compile(&[r"(?i)\bfeel(ing)?\b", r"(?i)\bi hate\b"]),
                weight: 1.0,
            },
            CategoryRule {
                category: Category::Health,
                keywords: &[
                    "sleep", "headache", "diet", "exercise", "doctor", "medicine",
                    "symptom", "insomnia",
                ],
                patterns: compile(&[r"(?i)\b(hurt|ache)s?\b"]),
                weight: 1.0,
            },
            CategoryRule {
                category: Category::Creative,
                keywords: &[
                    "write a", "story", "poem", "imagine", "roleplay", "lyrics",
                    "compose",
                ],
                patterns: compile(&[r"(?i)\bonce upon\b"]),
                weight: 1.0,
            },
            CategoryRule {
                category: Category::Knowledge,
                keywords: &[
                    "what is", "explain", "define", "history of", "meaning of",
                    "difference between",
                ],
                patterns: compile(&[r"(?i)\bwho (is|was)\b", r"(?i)\bwhen (did|was)\b"]),
                weight: 1.0,
            },
            CategoryRule {
                category: Category::Casual,
                keywords: &[
                    "hello", "hey there", "haha", "lol", "good morning", "good night",
                    "what's up",
                ],
                patterns: Vec::new(),
                weight: 1.0,
            },
        ]
    })
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("invalid classifier pattern"))
        .collect()
}

/// Result of classifying a single message.
///
/// Produced fresh per message and never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    /// Highest-scoring category (ties broken by registry order).
    pub category: Category,
    /// Accumulated score per category.
    pub scores: HashMap<Category, f32>,
    /// Derived complexity, 0.0 to 5.0.
    pub complexity: f32,
    /// Whether the text contains a question.
    pub contains_question: bool,
    /// Whether the text contains more than one question.
    pub multi_question: bool,
}

impl ClassificationResult {
    /// Score for a single category (0.0 when absent).
    pub fn score(&self, category: Category) -> f32 {
        self.scores.get(&category).copied().unwrap_or(0.0)
    }
}

/// Stateless text classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct Classifier;

impl Classifier {
    /// Create a classifier.
    pub fn new() -> Self {
        Self
    }

    /// Classify a message. Never fails: empty input degrades to zero scores
    /// and the default category.
    pub fn classify(&self, text: &str) -> ClassificationResult {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            let scores = Category::ALL.iter().map(|c| (*c, 0.0)).collect();
            return ClassificationResult {
                category: Category::Casual,
                scores,
                complexity: 0.0,
                contains_question: false,
                multi_question: false,
            };
        }

        let lowered = trimmed.to_lowercase();
        let mut scores: HashMap<Category, f32> = HashMap::new();
        let mut best = Category::Casual;
        let mut best_score = 0.0_f32;

        for rule in registry() {
            let mut score = 0.0_f32;
            for keyword in rule.keywords {
                if lowered.contains(keyword) {
                    score += rule.weight;
                }
            }
            for pattern in &rule.patterns {
                if pattern.is_match(trimmed) {
                    score += rule.weight * PATTERN_WEIGHT_FACTOR;
                }
            }
            scores.insert(rule.category, score);
            // Strictly-greater keeps the earlier rule on a tie.
            if score > best_score {
                best_score = score;
                best = rule.category;
            }
        }

        let question_marks = trimmed.chars().filter(|c| *c == '?' || *c == '？').count();
        let complexity = derive_complexity(trimmed, &scores);

        ClassificationResult {
            category: best,
            scores,
            complexity,
            contains_question: question_marks > 0,
            multi_question: question_marks > 1,
        }
    }
}

/// Derive the 0–5 complexity score from length and per-category scores.
fn derive_complexity(text: &str, scores: &HashMap<Category, f32>) -> f32 {
    let len = text.chars().count();
    let mut complexity = 0.0_f32;
    if len > 100 {
        complexity += 1.0;
    }
    if len > 300 {
        complexity += 1.0;
    }
    for score in scores.values() {
        if *score > COMPLEXITY_SCORE_THRESHOLD {
            complexity += 0.5;
        }
    }
    // High-value categories push complexity further.
    if scores.get(&Category::Reasoning).copied().unwrap_or(0.0) > 3.0 {
        complexity += 2.0;
    }
    if scores.get(&Category::Knowledge).copied().unwrap_or(0.0) > 3.0 {
        complexity += 1.0;
    }
    if scores.get(&Category::Creative).copied().unwrap_or(0.0) > 3.0 {
        complexity += 1.0;
    }
    complexity.min(COMPLEXITY_CAP)
}
