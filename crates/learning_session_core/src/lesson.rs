//! crates/learning_session_core/src/lesson.rs
//!
//! Derived, display-ready views of a loaded lesson.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::domain::{LearningPreference, LessonContent, Video};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "text", rename_all = "snake_case")]
pub enum Span {
    Plain(String),
    Bold(String),
}

/// One line of the lesson body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LessonUnit {
    Image { url: String },
    Paragraph { spans: Vec<Span> },
}

fn bold_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\*\*.*?\*\*").expect("valid bold pattern"))
}

/// Splits a line on `**bold**` markers, dropping the asterisks.
pub fn spans(line: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut last = 0;
    for m in bold_pattern().find_iter(line) {
        if m.start() > last {
            spans.push(Span::Plain(line[last..m.start()].to_string()));
        }
        let inner = &line[m.start() + 2..m.end() - 2];
        spans.push(Span::Bold(inner.to_string()));
        last = m.end();
    }
    if last < line.len() {
        spans.push(Span::Plain(line[last..].to_string()));
    }
    spans
}

/// Breaks a lesson body into paragraphs and image units.
///
/// Blank lines are dropped. A line whose trimmed text equals one of `images`
/// is an image sentinel.
pub fn lesson_units(body: &str, images: &[String]) -> Vec<LessonUnit> {
    body.split('\n')
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let trimmed = line.trim();
            if images.iter().any(|url| url == trimmed) {
                LessonUnit::Image {
                    url: trimmed.to_string(),
                }
            } else {
                LessonUnit::Paragraph { spans: spans(line) }
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TabKind {
    Content,
    Summary,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LessonTab {
    pub kind: TabKind,
    pub enabled: bool,
}

/// The tabs shown over a loaded lesson.
pub fn available_tabs(preference: LearningPreference, content: &LessonContent) -> Vec<LessonTab> {
    let mut tabs = vec![
        LessonTab {
            kind: TabKind::Content,
            enabled: true,
        },
        LessonTab {
            kind: TabKind::Summary,
            enabled: preference != LearningPreference::Video && !content.body.trim().is_empty(),
        },
    ];
    if !content.videos.is_empty() {
        tabs.push(LessonTab {
            kind: TabKind::Video,
            enabled: true,
        });
    }
    tabs
}

/// The most-viewed video. Ties go to the later entry.
pub fn featured_video(videos: &[Video]) -> Option<&Video> {
    videos
        .iter()
        .reduce(|best, v| if best.view_count > v.view_count { best } else { v })
}

pub fn embed_url(url: &str) -> String {
    url.replace("watch?v=", "embed/")
}
