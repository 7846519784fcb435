//! Locale tables for reply interpretation and user-facing copy.
//!
//! Affirmation and cancellation detection is a pure function over explicit
//! token tables so it can be tested in isolation. Matching is
//! case-insensitive and happens in three passes: whole input, first word,
//! then multi-word phrases as substrings. Single-word tokens are never
//! substring-matched ("y" must not fire inside "why").
//!
//! Only terminal copy shown to the end user is localized. Observations are
//! planner context and stay English regardless of locale.

use serde::{Deserialize, Serialize};

/// Supported reply locales.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Vi,
}

impl std::str::FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "en-us" | "en-gb" => Ok(Locale::En),
            "vi" | "vi-vn" => Ok(Locale::Vi),
            other => Err(format!("unsupported locale: {other}")),
        }
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locale::En => write!(f, "en"),
            Locale::Vi => write!(f, "vi"),
        }
    }
}

const AFFIRMATIONS_EN: &[&str] = &[
    "yes",
    "y",
    "yeah",
    "yep",
    "ok",
    "okay",
    "sure",
    "confirm",
    "confirmed",
    "approve",
    "approved",
    "proceed",
    "correct",
    "right",
    "go ahead",
    "do it",
    "sounds good",
];

const AFFIRMATIONS_VI: &[&str] = &[
    "có",
    "ừ",
    "dạ",
    "vâng",
    "chốt",
    "đúng",
    "được",
    "đồng ý",
    "xác nhận",
    "làm đi",
    "tiếp tục",
    "ok luôn",
];

const CANCELLATIONS_EN: &[&str] = &[
    "cancel",
    "stop",
    "abort",
    "quit",
    "nevermind",
    "never mind",
    "forget it",
    "don't do it",
];

const CANCELLATIONS_VI: &[&str] = &[
    "hủy",
    "huỷ",
    "dừng",
    "thôi",
    "dừng lại",
    "bỏ qua",
    "hủy bỏ",
    "không làm nữa",
];

fn affirmation_table(locale: Locale) -> &'static [&'static str] {
    match locale {
        Locale::En => AFFIRMATIONS_EN,
        Locale::Vi => AFFIRMATIONS_VI,
    }
}

fn cancellation_table(locale: Locale) -> &'static [&'static str] {
    match locale {
        Locale::En => CANCELLATIONS_EN,
        Locale::Vi => CANCELLATIONS_VI,
    }
}

fn matches_table(input: &str, table: &[&str]) -> bool {
    let normalized = input.trim().to_lowercase();
    if normalized.is_empty() {
        return false;
    }
    // "ok," and "yes!" carry their punctuation into the first word.
    let first_word = normalized
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .trim_matches(|c: char| c.is_ascii_punctuation());
    table.iter().any(|token| {
        normalized == *token
            || first_word == *token
            || (token.contains(' ') && normalized.contains(token))
    })
}

/// Does the input affirm a pending confirmation?
pub fn is_affirmative(input: &str, locale: Locale) -> bool {
    matches_table(input, affirmation_table(locale))
}

/// Does the input cancel the whole request? Checked before affirmation by
/// callers: "stop, yes really stop" is a cancellation.
pub fn is_cancellation(input: &str, locale: Locale) -> bool {
    matches_table(input, cancellation_table(locale))
}

// --- User-facing terminal copy ---

/// Final response after the user cancels a pending confirmation.
pub fn cancellation_message(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "Okay, I've cancelled that request.",
        Locale::Vi => "Đã hủy yêu cầu theo xác nhận của bạn.",
    }
}

/// Final response when the loop exhausts its step budget.
pub fn max_steps_message(locale: Locale, max_steps: u32) -> String {
    match locale {
        Locale::En => format!(
            "Reached the maximum of {max_steps} steps without a final answer. \
             Please refine your request and try again."
        ),
        Locale::Vi => format!(
            "Đã chạy tối đa {max_steps} bước mà chưa có câu trả lời cuối cùng. \
             Vui lòng điều chỉnh yêu cầu và thử lại."
        ),
    }
}

/// Generic user-facing message for aborted runs. The detail travels in the
/// response's `error` field, not here.
pub fn generic_error_message(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "Something went wrong while processing your request. Please try again.",
        Locale::Vi => "Đã xảy ra lỗi khi xử lý yêu cầu của bạn. Vui lòng thử lại.",
    }
}
