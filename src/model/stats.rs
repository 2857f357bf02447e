//! Summaries over stored forms and responses.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{
    api::id::ApiId,
    common::QuestionType,
    db::{
        form::{Form, FormCore, Question},
        response::ResponseCore,
    },
    mongodb::{Coll, Id},
};

/// Dashboard totals for one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    /// Number of forms owned.
    pub forms: u64,
    /// Sum of the owned forms' response counters.
    pub responses: u64,
}

impl UserStats {
    /// Total up the given forms. Trusts each form's response counter rather
    /// than counting stored responses.
    pub fn from_forms<'a>(forms: impl IntoIterator<Item = &'a FormCore>) -> Self {
        forms.into_iter().fold(Self::default(), |stats, form| Self {
            forms: stats.forms + 1,
            responses: stats.responses + form.response_count,
        })
    }

    /// Compute stats for every form owned by the given user.
    pub async fn for_owner(forms: &Coll<Form>, owner_id: Id) -> Result<Self> {
        let owned = Form::for_owner(forms, owner_id).await?;
        Ok(Self::from_forms(owned.iter().map(|f| &f.form)))
    }
}

/// One multiple choice option's share of the responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionCount {
    pub count: u64,
    /// Share of *all* responses to the form, to one decimal place. Skipped
    /// answers mean these need not sum to 100.
    pub percentage: f64,
}

/// The per-type part of a question summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "questionType", rename_all = "camelCase")]
pub enum QuestionSummary {
    #[serde(rename_all = "camelCase")]
    Text { response_count: u64 },
    #[serde(rename_all = "camelCase")]
    MultipleChoice {
        distribution: BTreeMap<String, OptionCount>,
    },
    #[serde(rename_all = "camelCase")]
    Rating {
        /// Mean of the numeric answers, each truncated to an integer, to two
        /// decimal places.
        average_rating: f64,
        /// How many answers went into the average.
        rating_count: u64,
        max_rating: u8,
    },
}

/// Analytics for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAnalytics {
    pub question_id: ApiId,
    pub question_text: String,
    #[serde(flatten)]
    pub summary: QuestionSummary,
}

/// Analytics for a whole form, one entry per current question in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormAnalytics {
    pub total_responses: u64,
    pub questions: Vec<QuestionAnalytics>,
}

impl FormAnalytics {
    /// Summarise the given responses against the form's current questions.
    /// Answers to questions no longer on the form are ignored.
    pub fn compute<'a>(
        form: &FormCore,
        responses: impl IntoIterator<Item = &'a ResponseCore>,
    ) -> Self {
        let responses: Vec<&ResponseCore> = responses.into_iter().collect();
        let total_responses = responses.len() as u64;
        let questions = form
            .questions
            .iter()
            .map(|question| QuestionAnalytics {
                question_id: question.id.into(),
                question_text: question.question_text.clone(),
                summary: summarise(question, &responses),
            })
            .collect();
        Self {
            total_responses,
            questions,
        }
    }
}

fn summarise(question: &Question, responses: &[&ResponseCore]) -> QuestionSummary {
    let total = responses.len() as u64;
    let answers = responses
        .iter()
        .filter_map(|r| r.answer_to(question.id))
        .map(|a| a.answer.as_str());

    match question.question_type {
        QuestionType::Text => QuestionSummary::Text {
            response_count: total,
        },
        QuestionType::MultipleChoice => {
            let mut counts: BTreeMap<String, u64> = BTreeMap::new();
            for answer in answers {
                *counts.entry(answer.to_string()).or_default() += 1;
            }
            let distribution = counts
                .into_iter()
                .map(|(option, count)| {
                    let percentage = round_to(count as f64 / total as f64 * 100.0, 1);
                    (option, OptionCount { count, percentage })
                })
                .collect();
            QuestionSummary::MultipleChoice { distribution }
        }
        QuestionType::Rating => {
            let ratings: Vec<i64> = answers.filter_map(parse_rating).collect();
            let average_rating = if ratings.is_empty() {
                0.0
            } else {
                round_to(ratings.iter().sum::<i64>() as f64 / ratings.len() as f64, 2)
            };
            QuestionSummary::Rating {
                average_rating,
                rating_count: ratings.len() as u64,
                max_rating: question.max_rating,
            }
        }
    }
}

/// Read a rating answer as its leading integer, so `"4.5"` counts as 4.
/// Answers that are not numbers at all are skipped.
fn parse_rating(answer: &str) -> Option<i64> {
    let answer = answer.trim();
    answer.parse::<f64>().ok().filter(|n| n.is_finite())?;
    let end = answer
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map_or(answer.len(), |(i, _)| i);
    answer[..end].parse().ok()
}

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10_f64.powi(places);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    use rocket::serde::json::serde_json::{self, json};

    use crate::model::db::response::{AnswerRecord, Response};

    fn responses_to(question: &Question, answers: &[&str]) -> Vec<Response> {
        answers
            .iter()
            .map(|a| {
                Response::example(
                    Id::new(),
                    vec![AnswerRecord::example(question.id, question.question_type, a)],
                )
            })
            .collect()
    }

    #[test]
    fn user_stats_sum_counters() {
        let owner = Id::new();
        let mut first = FormCore::example(owner);
        first.response_count = 4;
        let mut second = FormCore::example(owner);
        second.response_count = 3;

        let stats = UserStats::from_forms([&first, &second]);
        assert_eq!(stats, UserStats { forms: 2, responses: 7 });
        assert_eq!(UserStats::from_forms([]), UserStats::default());
        assert_eq!(
            serde_json::to_value(stats).unwrap(),
            json!({ "forms": 2, "responses": 7 })
        );
    }

    #[test]
    fn average_rating() {
        let mut form = FormCore::example(Id::new());
        form.questions = vec![Question::rating("Score", false, 5)];
        let responses = responses_to(&form.questions[0], &["3", "5", "great"]);

        let analytics = FormAnalytics::compute(&form, responses.iter().map(|r| &r.response));
        assert_eq!(analytics.total_responses, 3);
        assert_eq!(
            analytics.questions[0].summary,
            QuestionSummary::Rating {
                average_rating: 4.0,
                rating_count: 2,
                max_rating: 5,
            }
        );
    }

    #[test]
    fn average_rating_rounds_to_two_places() {
        let mut form = FormCore::example(Id::new());
        form.questions = vec![Question::rating("Score", false, 5)];
        let responses = responses_to(&form.questions[0], &["1", "2", "2"]);

        let analytics = FormAnalytics::compute(&form, responses.iter().map(|r| &r.response));
        match analytics.questions[0].summary {
            QuestionSummary::Rating { average_rating, .. } => assert_eq!(average_rating, 1.67),
            ref other => panic!("unexpected summary {other:?}"),
        }
    }

    #[test]
    fn fractional_ratings_are_truncated() {
        let mut form = FormCore::example(Id::new());
        form.questions = vec![Question::rating("Score", false, 5)];
        let responses = responses_to(&form.questions[0], &["4.5", "2", "3abc", "NaN"]);

        let analytics = FormAnalytics::compute(&form, responses.iter().map(|r| &r.response));
        assert_eq!(
            analytics.questions[0].summary,
            QuestionSummary::Rating {
                average_rating: 3.0,
                rating_count: 2,
                max_rating: 5,
            }
        );
    }

    #[test]
    fn rating_parsing() {
        assert_eq!(parse_rating(" 5 "), Some(5));
        assert_eq!(parse_rating("-2.9"), Some(-2));
        assert_eq!(parse_rating("+3"), Some(3));
        assert_eq!(parse_rating(".5"), None);
        assert_eq!(parse_rating("inf"), None);
        assert_eq!(parse_rating("great"), None);
    }

    #[test]
    fn choice_distribution_over_all_responses() {
        let mut form = FormCore::example(Id::new());
        form.questions = vec![Question::multiple_choice("Pick", false, &["A", "B"])];
        let responses = responses_to(&form.questions[0], &["A", "A", "B"]);

        let analytics = FormAnalytics::compute(&form, responses.iter().map(|r| &r.response));
        let expected = BTreeMap::from([
            ("A".to_string(), OptionCount { count: 2, percentage: 66.7 }),
            ("B".to_string(), OptionCount { count: 1, percentage: 33.3 }),
        ]);
        assert_eq!(
            analytics.questions[0].summary,
            QuestionSummary::MultipleChoice {
                distribution: expected
            }
        );
    }

    #[test]
    fn skipped_choices_undercount() {
        let mut form = FormCore::example(Id::new());
        form.questions = vec![Question::multiple_choice("Pick", false, &["A", "B"])];
        let mut responses = responses_to(&form.questions[0], &["A"]);
        responses.push(Response::example(Id::new(), Vec::new()));

        let analytics = FormAnalytics::compute(&form, responses.iter().map(|r| &r.response));
        match &analytics.questions[0].summary {
            QuestionSummary::MultipleChoice { distribution } => {
                assert_eq!(distribution["A"].percentage, 50.0);
            }
            other => panic!("unexpected summary {other:?}"),
        }
    }

    #[test]
    fn no_responses_means_zeros() {
        let mut form = FormCore::example(Id::new());
        form.questions.push(Question::multiple_choice("Pick", false, &["A"]));

        let analytics = FormAnalytics::compute(&form, []);
        assert_eq!(analytics.total_responses, 0);
        assert_eq!(
            analytics.questions[0].summary,
            QuestionSummary::Text { response_count: 0 }
        );
        assert_eq!(
            analytics.questions[1].summary,
            QuestionSummary::Rating {
                average_rating: 0.0,
                rating_count: 0,
                max_rating: 5,
            }
        );
        assert_eq!(
            analytics.questions[2].summary,
            QuestionSummary::MultipleChoice {
                distribution: BTreeMap::new()
            }
        );
    }

    #[test]
    fn analytics_serialise_flat() {
        let form = FormCore::example(Id::new());
        let analytics = FormAnalytics::compute(&form, []);
        let json = serde_json::to_value(analytics).unwrap();
        assert_eq!(json["totalResponses"], json!(0));
        assert_eq!(json["questions"][0]["questionType"], json!("text"));
        assert_eq!(json["questions"][0]["questionText"], json!("Name?"));
        assert_eq!(json["questions"][1]["averageRating"], json!(0.0));
        assert_eq!(json["questions"][1]["maxRating"], json!(5));
    }
}
