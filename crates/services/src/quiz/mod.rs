//! Quick quiz: pick questions, step through them, persist the outcome.

mod plan;
mod session;
mod workflow;

pub use crate::error::QuizError;
pub use plan::{DEFAULT_QUIZ_SIZE, QuestionSetSelector, QuizPlan};
pub use session::{AnswerFeedback, QUIZ_TIME_LIMIT_SECS, QuizProgress, QuizSession};
pub use workflow::{QuizAnswerResult, QuizLoopService};
