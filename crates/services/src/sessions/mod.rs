mod observer;
mod progress;
mod service;
mod state;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use observer::{ObserverId, SessionObserver};
pub use progress::SessionProgress;
pub use service::SessionService;
pub use state::{Advance, AnswerOutcome, QuizPhase, SessionState};
