#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod progress_service;
pub mod sessions;

pub use stars_core::Clock;
pub use sessions as session;

pub use app_services::{AppServices, CompletionReport};
pub use error::{AppServicesError, ProgressError, SessionError};
pub use progress_service::{ProgressService, SessionHistoryItem, SessionSummaryId};

pub use sessions::{
    Advance, AnswerOutcome, ObserverId, QuizPhase, SessionObserver, SessionProgress,
    SessionService, SessionState,
};
