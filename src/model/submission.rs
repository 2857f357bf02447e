//! Deciding whether a candidate response to a form is acceptable.

use rocket::serde::json::Value;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::{
    api::response::{CandidateAnswer, Submission},
    db::{form::FormCore, response::AnswerRecord},
    mongodb::Id,
};

/// Validate a submission body against a form, returning the answers to store.
///
/// Checks run in a fixed order and stop at the first failure:
///
/// 1. The form must be active, whatever the body contains.
/// 2. The body must be `{answers: [{questionId, answer}, ...]}`.
/// 3. Each required question, in the form's order, must have exactly one
///    matching candidate with a non-empty answer.
///
/// Candidates naming unknown questions are dropped. For optional questions
/// answered more than once the first candidate wins, and empty answers are
/// not recorded. Nothing here checks answers against `options` or
/// `max_rating`.
pub fn validate(form: &FormCore, body: &Value) -> Result<Vec<AnswerRecord>> {
    if !form.is_active {
        return Err(Error::FormInactive);
    }
    let submission = parse(body)?;

    let candidates: Vec<(Option<Id>, &CandidateAnswer)> = submission
        .answers
        .iter()
        .map(|c| (c.question_id.parse::<Id>().ok(), c))
        .collect();

    let mut records = Vec::new();
    for question in &form.questions {
        let mut matching = candidates
            .iter()
            .filter(|(id, _)| *id == Some(question.id))
            .map(|(_, candidate)| candidate.answer.as_ref().filter(|v| !v.is_empty()));
        let first = matching.next().flatten();
        let duplicated = matching.next().is_some();

        if question.required && (first.is_none() || duplicated) {
            return Err(Error::MissingRequiredAnswer(question.question_text.clone()));
        }

        if let Some(value) = first {
            records.push(AnswerRecord {
                question_id: question.id,
                question_text: question.question_text.clone(),
                question_type: question.question_type,
                answer: value.clone().coerce(question.question_type),
            });
        }
    }
    Ok(records)
}

fn parse(body: &Value) -> Result<Submission> {
    if !body.get("answers").map_or(false, Value::is_array) {
        return Err(Error::InvalidPayload("Answers array is required".to_string()));
    }
    Submission::deserialize(body)
        .map_err(|e| Error::InvalidPayload(format!("Malformed answers: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    use rocket::serde::json::serde_json::json;

    use crate::model::{common::QuestionType, db::form::Question};

    fn answer(question: &Question, value: Value) -> Value {
        json!({ "questionId": question.id.to_string(), "answer": value })
    }

    #[test]
    fn optional_questions_may_be_skipped() {
        let form = FormCore::example(Id::new());
        let name = &form.questions[0];
        let body = json!({ "answers": [answer(name, json!("Alice"))] });

        let records = validate(&form, &body).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].question_id, name.id);
        assert_eq!(records[0].question_text, "Name?");
        assert_eq!(records[0].question_type, QuestionType::Text);
        assert_eq!(records[0].answer, "Alice");
    }

    #[test]
    fn missing_required_answer_names_the_question() {
        let form = FormCore::example(Id::new());
        let err = validate(&form, &json!({ "answers": [] })).unwrap_err();
        assert!(matches!(err, Error::MissingRequiredAnswer(ref q) if q == "Name?"));
        assert_eq!(err.to_string(), "Required question \"Name?\" not answered");
    }

    #[test]
    fn blank_or_null_required_answers_are_missing() {
        let form = FormCore::example(Id::new());
        let name = &form.questions[0];
        for value in [json!("   "), json!(""), Value::Null] {
            let body = json!({ "answers": [answer(name, value)] });
            assert!(matches!(
                validate(&form, &body),
                Err(Error::MissingRequiredAnswer(_))
            ));
        }
    }

    #[test]
    fn required_questions_need_exactly_one_answer() {
        let form = FormCore::example(Id::new());
        let name = &form.questions[0];
        let body = json!({
            "answers": [answer(name, json!("Alice")), answer(name, json!("Bob"))]
        });
        assert!(matches!(
            validate(&form, &body),
            Err(Error::MissingRequiredAnswer(_))
        ));
    }

    #[test]
    fn first_failing_question_is_reported() {
        let mut form = FormCore::example(Id::new());
        form.questions.push(Question::text("Email?", true));
        form.questions.insert(0, Question::text("Team?", true));
        let name = &form.questions[1];

        let body = json!({ "answers": [answer(name, json!("Alice"))] });
        let err = validate(&form, &body).unwrap_err();
        assert!(matches!(err, Error::MissingRequiredAnswer(ref q) if q == "Team?"));
    }

    #[test]
    fn inactive_forms_reject_everything() {
        let mut form = FormCore::example(Id::new());
        form.is_active = false;
        let name = &form.questions[0];
        for body in [
            json!({ "answers": [answer(name, json!("Alice"))] }),
            json!({ "answers": [] }),
            json!({ "answers": "nope" }),
            Value::Null,
        ] {
            assert!(matches!(validate(&form, &body), Err(Error::FormInactive)));
        }
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        let form = FormCore::example(Id::new());
        let name = &form.questions[0];
        for body in [
            Value::Null,
            json!({}),
            json!({ "answers": { "a": 1 } }),
            json!({ "answers": [42] }),
            json!({ "answers": [{ "answer": "Alice" }] }),
            json!({ "answers": [answer(name, json!(true))] }),
            json!({ "answers": [answer(name, json!(["Alice"]))] }),
        ] {
            assert!(
                matches!(validate(&form, &body), Err(Error::InvalidPayload(_))),
                "{body} should be rejected"
            );
        }
    }

    #[test]
    fn answers_are_normalised_in_question_order() {
        let form = FormCore::example(Id::new());
        let (name, rating) = (&form.questions[0], &form.questions[1]);
        let body = json!({
            "answers": [
                answer(rating, json!(4)),
                { "questionId": Id::new().to_string(), "answer": "stray" },
                { "questionId": "not an id", "answer": "stray" },
                answer(name, json!("Alice")),
            ]
        });

        let records = validate(&form, &body).unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.question_id).collect();
        assert_eq!(ids, vec![name.id, rating.id]);
        assert_eq!(records[1].answer, "4");
        assert_eq!(records[1].question_type, QuestionType::Rating);
    }

    #[test]
    fn zero_is_an_answer_and_empty_optionals_are_dropped() {
        let mut form = FormCore::example(Id::new());
        form.questions[1].required = true;
        let (name, rating) = (&form.questions[0], &form.questions[1]);
        let body = json!({
            "answers": [answer(name, json!("Alice")), answer(rating, json!(0))]
        });
        let records = validate(&form, &body).unwrap();
        assert_eq!(records[1].answer, "0");

        let form = FormCore::example(Id::new());
        let (name, rating) = (&form.questions[0], &form.questions[1]);
        let body = json!({
            "answers": [answer(name, json!("Alice")), answer(rating, json!(" "))]
        });
        assert_eq!(validate(&form, &body).unwrap().len(), 1);
    }

    #[test]
    fn content_is_not_checked_against_options_or_scale() {
        let mut form = FormCore::example(Id::new());
        form.questions = vec![
            Question::multiple_choice("Colour", true, &["Red", "Blue"]),
            Question::rating("Score", true, 5),
        ];
        let (colour, score) = (&form.questions[0], &form.questions[1]);
        let body = json!({
            "answers": [answer(colour, json!("Green")), answer(score, json!(42))]
        });
        let records = validate(&form, &body).unwrap();
        assert_eq!(records[0].answer, "Green");
        assert_eq!(records[1].answer, "42");
    }
}
