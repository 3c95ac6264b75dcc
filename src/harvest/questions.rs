//! Question block parsing for review pages

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use crate::page_extractor::PageSnapshot;

static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

static QUESTION_BLOCK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".que").expect("Invalid question block selector"));

static QUESTION_TEXT: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".qtext").expect("Invalid question text selector"));

static ANSWER_OPTION: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".answer label, .answer [data-region='answer-label']")
        .expect("Invalid answer option selector")
});

static STATE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".state").expect("Invalid state selector"));

static RIGHT_ANSWER: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".rightanswer").expect("Invalid right answer selector"));

/// One question as rendered on a review page
///
/// All fields are the page's visible text, whitespace-collapsed. Nothing here
/// is interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestedQuestion {
    pub text: String,
    pub answers: Vec<String>,
    /// Grading state label, e.g. "Верно" / "Correct"
    pub state: Option<String>,
    /// The "right answer" feedback line, when the quiz reveals it
    pub right_answer: Option<String>,
    pub source_url: String,
}

fn visible_text(element: &ElementRef<'_>) -> String {
    let raw: String = element.text().collect::<Vec<_>>().join(" ");
    WHITESPACE.replace_all(raw.trim(), " ").into_owned()
}

fn first_text(block: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    block
        .select(selector)
        .next()
        .map(|el| visible_text(&el))
        .filter(|text| !text.is_empty())
}

/// Parse every question block (`.que`) of a review page
///
/// Blocks without question text are skipped.
#[must_use]
pub fn extract_questions(snapshot: &PageSnapshot) -> Vec<HarvestedQuestion> {
    let document = Html::parse_document(&snapshot.html);

    document
        .select(&QUESTION_BLOCK)
        .filter_map(|block| {
            let text = first_text(&block, &QUESTION_TEXT)?;
            let answers = block
                .select(&ANSWER_OPTION)
                .map(|el| visible_text(&el))
                .filter(|answer| !answer.is_empty())
                .collect();
            Some(HarvestedQuestion {
                text,
                answers,
                state: first_text(&block, &STATE),
                right_answer: first_text(&block, &RIGHT_ANSWER),
                source_url: snapshot.url.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_question_blocks() {
        let html = r#"<html><body id="page-mod-quiz-review">
            <div class="que multichoice">
              <div class="state">Верно</div>
              <div class="qtext"><p>2 +   2 =</p></div>
              <div class="answer">
                <div><label>3</label></div>
                <div><label> 4 </label></div>
              </div>
              <div class="rightanswer">Правильный ответ: 4</div>
            </div>
            <div class="que description"><div class="info">no text</div></div>
        </body></html>"#;
        let snapshot = PageSnapshot::new(
            "https://lms.example/mod/quiz/review.php?attempt=5",
            "Review",
            html,
        );

        let questions = extract_questions(&snapshot);
        assert_eq!(questions.len(), 1);
        let q = &questions[0];
        assert_eq!(q.text, "2 + 2 =");
        assert_eq!(q.answers, vec!["3".to_string(), "4".to_string()]);
        assert_eq!(q.state.as_deref(), Some("Верно"));
        assert_eq!(q.right_answer.as_deref(), Some("Правильный ответ: 4"));
    }
}
