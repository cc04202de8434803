pub mod domain;
pub mod ports;
pub mod results;
pub mod session;

pub use domain::{Attempt, Message, Question, Quiz, Role, User};
pub use ports::{AttemptStore, CompletionService, CompletionStream, PortError, PortResult};
pub use results::{render_results, OptionMark, QuestionReview, ResultView, ScoreTier};
pub use session::{ChatSession, Phase, RejectReason, Submission, APOLOGY};
