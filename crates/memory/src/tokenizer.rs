//! Keyword extraction for mixed latin/CJK text.
//!
//! Latin words are maximal `[a-z]` runs of two or more letters. Everything
//! that is not an ASCII letter, an ASCII digit or whitespace is concatenated
//! into a residual string and cut into overlapping two-character windows,
//! which stand in for words in scripts without explicit word boundaries.
//! Punctuation stays in the residual, so windows can straddle it.

use std::{
    collections::{BTreeSet, HashSet},
    sync::LazyLock,
};

/// Function words dropped from both latin tokens and CJK bigrams.
const STOP_WORDS: &[&str] = &[
    // English
    "the", "is", "a", "an", "of", "and", "or", "to", "in", "on", "at", "by", "as", "be", "are",
    "was", "were", "that", "this", "it", "its", "for", "with", "from", "but", "not",
    // Chinese
    "的", "是", "了", "在", "和", "与", "或", "等", "这", "那", "有", "没有", "不", "也", "都",
    "就", "要", "会", "可以", "能够", "于", "把", "被", "为", "以", "之", "其", "但", "却",
    "我们", "你们", "他们", "自己", "什么", "怎么", "致力于", "实现", "支持", "使用", "目标",
    "响应", "时间", "小于",
];

static STOP_WORD_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| STOP_WORDS.iter().copied().collect());

/// Minimum length of a latin token.
const MIN_LATIN_LEN: usize = 2;

pub fn is_stop_word(token: &str) -> bool {
    STOP_WORD_SET.contains(token)
}

/// Turn `text` into its deduplicated keyword set.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    let lower = text.to_lowercase();
    let mut tokens = BTreeSet::new();
    let mut run = String::new();
    let mut residual: Vec<char> = Vec::new();

    for c in lower.chars() {
        if c.is_ascii_lowercase() {
            run.push(c);
            continue;
        }
        push_latin(&mut run, &mut tokens);
        if is_residual(c) {
            residual.push(c);
        }
    }
    push_latin(&mut run, &mut tokens);

    for pair in residual.windows(2) {
        let bigram: String = pair.iter().collect();
        if !is_stop_word(&bigram) {
            tokens.insert(bigram);
        }
    }

    tokens
}

fn push_latin(run: &mut String, tokens: &mut BTreeSet<String>) {
    if run.len() >= MIN_LATIN_LEN && !is_stop_word(run) {
        tokens.insert(std::mem::take(run));
    } else {
        run.clear();
    }
}

/// Characters kept for bigram extraction.
fn is_residual(c: char) -> bool {
    !c.is_ascii_alphanumeric() && !c.is_whitespace()
}
