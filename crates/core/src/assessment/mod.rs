//! Assessment core shared by practice, lesson quiz and exam simulation.

mod evaluator;
mod policy;
mod result;
mod sampler;
mod session;

pub use evaluator::{evaluate, evaluate_question};
pub use policy::{ModePolicy, PassPolicy, SessionMode};
pub use result::{FinishReason, SessionEvent, SessionResult};
pub use sampler::{SamplingError, sample};
pub use session::{
    AnswerOutcome, AssessmentSession, RecordedAnswer, SessionProgress, SessionState,
    TransitionError,
};
