//! Running assessment sessions against storage.

mod active;
mod recorder;
mod service;
mod timer;

pub use active::{ActiveSession, QuestionView, SessionSnapshot};
pub use recorder::ProgressRecorder;
pub use service::AssessmentService;
pub use timer::ExamTimer;
