//! Types shared between the database and API representations.

pub mod answer;
pub mod question;

pub use answer::AnswerValue;
pub use question::QuestionType;
