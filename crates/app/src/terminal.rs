//! Line-oriented front end: renders each quiz phase and maps typed input to
//! session transitions.

use std::error::Error;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

use services::{
    AnswerOutcome, AppServices, AppServicesError, CompletionReport, QuizPhase, SessionService,
};
use stars_core::model::{Avatar, Grade, Subject};

type TerminalResult<T> = Result<T, Box<dyn Error>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub struct Terminal<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Terminal<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub async fn run(&mut self, services: &AppServices) -> TerminalResult<()> {
        let mut session = services.start_session().await?;
        writeln!(self.output, "⭐ Florida Learning Stars ⭐")?;

        loop {
            let flow = match session.phase() {
                QuizPhase::Home => self.home(services, &mut session).await?,
                QuizPhase::AvatarSelect => self.avatar(services, &mut session).await?,
                QuizPhase::SubjectSelect => self.subject(&mut session)?,
                QuizPhase::Answering => self.question(&mut session)?,
                QuizPhase::Submitted => self.next(&mut session)?,
                QuizPhase::Finished => self.finish(services, &mut session).await?,
                QuizPhase::NoQuestions => {
                    writeln!(self.output, "No questions for this grade yet.")?;
                    session.return_home();
                    Flow::Continue
                }
                QuizPhase::Completed => self.completed(&mut session)?,
            };
            if flow == Flow::Quit {
                break;
            }
        }

        services.save_progress(&session).await?;
        writeln!(self.output, "Bye!")?;
        Ok(())
    }

    //
    // ─── SCREENS ───────────────────────────────────────────────────────────────
    //

    async fn home(
        &mut self,
        services: &AppServices,
        session: &mut SessionService,
    ) -> TerminalResult<Flow> {
        writeln!(self.output)?;
        writeln!(
            self.output,
            "Total stars: {} ⭐",
            session.state().user.total_stars()
        )?;
        for grade in Grade::ALL {
            writeln!(self.output, "  {}) {}", grade.value(), grade.label())?;
        }
        writeln!(self.output, "  h) history   r) reset progress   q) quit")?;

        let Some(line) = self.prompt("Pick a grade:")? else {
            return Ok(Flow::Quit);
        };
        match line.as_str() {
            "q" => Ok(Flow::Quit),
            "h" => {
                self.history(services).await?;
                Ok(Flow::Continue)
            }
            "r" => {
                services.reset(session).await?;
                writeln!(self.output, "Progress cleared.")?;
                Ok(Flow::Continue)
            }
            other => {
                match parse_grade(other) {
                    Some(grade) => {
                        session.initialize_grade(grade);
                        services.save_progress(session).await?;
                    }
                    None => writeln!(self.output, "Unknown choice: {other}")?,
                }
                Ok(Flow::Continue)
            }
        }
    }

    async fn avatar(
        &mut self,
        services: &AppServices,
        session: &mut SessionService,
    ) -> TerminalResult<Flow> {
        let catalog = services.catalog();
        let avatars = catalog.avatars();
        let listing: Vec<String> = avatars
            .iter()
            .enumerate()
            .map(|(i, avatar)| format!("{}) {avatar}", i + 1))
            .collect();
        writeln!(self.output, "{}", listing.join("  "))?;

        let Some(line) = self.prompt("Choose your buddy (Enter keeps the current one):")? else {
            return Ok(Flow::Quit);
        };
        let avatar = if line.is_empty() {
            session.state().user.avatar().clone()
        } else {
            line.parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| avatars.get(i).cloned())
                .unwrap_or_else(|| Avatar::new(line))
        };
        session.select_avatar(avatar);
        services.save_progress(session).await?;
        Ok(Flow::Continue)
    }

    fn subject(&mut self, session: &mut SessionService) -> TerminalResult<Flow> {
        for (i, subject) in Subject::ALL.iter().enumerate() {
            writeln!(self.output, "  {}) {}", i + 1, subject.label())?;
        }
        let Some(line) = self.prompt("Pick a subject:")? else {
            return Ok(Flow::Quit);
        };
        match parse_subject(&line) {
            Some(subject) => session.select_subject(subject),
            None => writeln!(self.output, "Unknown subject: {line}")?,
        }
        Ok(Flow::Continue)
    }

    fn question(&mut self, session: &mut SessionService) -> TerminalResult<Flow> {
        let state = session.state();
        let Some(question) = state.current_question.clone() else {
            return Ok(Flow::Continue);
        };
        writeln!(self.output)?;
        writeln!(
            self.output,
            "Question {} of {}  |  ⭐ {}",
            state.question_index, state.total_questions, state.session_stars
        )?;
        writeln!(self.output, "{}", question.prompt())?;
        for (i, option) in question.options().iter().enumerate() {
            writeln!(self.output, "  {}) {option}", i + 1)?;
        }

        let Some(line) = self.prompt("Your answer (q to stop):")? else {
            return Ok(Flow::Quit);
        };
        if line == "q" {
            session.return_home();
            return Ok(Flow::Continue);
        }
        let Some(index) = line.parse::<usize>().ok().and_then(|n| n.checked_sub(1)) else {
            writeln!(self.output, "Type the number of an answer.")?;
            return Ok(Flow::Continue);
        };

        session.select_answer(index);
        if let Some(outcome) = session.submit_answer() {
            let correct_text = question
                .options()
                .get(outcome.correct_option)
                .map_or("", String::as_str);
            self.feedback(&outcome, correct_text)?;
        }
        Ok(Flow::Continue)
    }

    fn next(&mut self, session: &mut SessionService) -> TerminalResult<Flow> {
        if self.prompt("Press Enter for the next question.")?.is_none() {
            return Ok(Flow::Quit);
        }
        session.advance();
        Ok(Flow::Continue)
    }

    async fn finish(
        &mut self,
        services: &AppServices,
        session: &mut SessionService,
    ) -> TerminalResult<Flow> {
        if self.prompt("Press Enter to see your results.")?.is_none() {
            return Ok(Flow::Quit);
        }
        match services.finish_session(session).await {
            Ok(report) => self.report(&report)?,
            // The session stays on this screen; Enter tries again.
            Err(AppServicesError::Progress(err)) => {
                tracing::warn!(error = %err, "saving the finished session failed");
                writeln!(self.output, "Could not save your stars ({err}).")?;
            }
            Err(err) => return Err(err.into()),
        }
        Ok(Flow::Continue)
    }

    fn completed(&mut self, session: &mut SessionService) -> TerminalResult<Flow> {
        if self.prompt("Press Enter to go home.")?.is_none() {
            return Ok(Flow::Quit);
        }
        session.return_home();
        Ok(Flow::Continue)
    }

    async fn history(&mut self, services: &AppServices) -> TerminalResult<()> {
        let items = services.progress().recent_sessions(5).await?;
        if items.is_empty() {
            writeln!(self.output, "No sessions yet.")?;
        }
        for item in items {
            writeln!(
                self.output,
                "  {}  {} {}: {}/{} correct, +{} ⭐",
                item.completed_at.format("%Y-%m-%d %H:%M"),
                item.grade.label(),
                item.subject.label(),
                item.correct_answers,
                item.total_questions,
                item.stars_earned
            )?;
        }
        Ok(())
    }

    //
    // ─── OUTPUT ────────────────────────────────────────────────────────────────
    //

    fn feedback(&mut self, outcome: &AnswerOutcome, correct_text: &str) -> io::Result<()> {
        if outcome.is_correct {
            writeln!(self.output, "✅ Correct! +{} ⭐", outcome.stars_awarded)?;
        } else {
            writeln!(self.output, "❌ Not quite. The answer is {correct_text}.")?;
        }
        if !outcome.explanation.is_empty() {
            writeln!(self.output, "💡 {}", outcome.explanation)?;
        }
        Ok(())
    }

    fn report(&mut self, report: &CompletionReport) -> io::Result<()> {
        let summary = &report.summary;
        writeln!(self.output)?;
        writeln!(self.output, "🎉 Session complete!")?;
        writeln!(
            self.output,
            "You got {} of {} right ({}%).",
            summary.correct_answers(),
            summary.total_questions(),
            summary.score_percent()
        )?;
        writeln!(self.output, "Stars earned: {} ⭐", summary.stars_earned())?;
        let seconds = summary.duration().num_seconds().max(0);
        writeln!(self.output, "Time: {}m {:02}s", seconds / 60, seconds % 60)?;
        writeln!(self.output, "Total stars: {} ⭐", report.total_stars)?;
        for badge in &report.new_badges {
            writeln!(self.output, "New badge: {} {}", badge.emoji, badge.name)?;
        }
        Ok(())
    }

    /// `None` at end of input.
    fn prompt(&mut self, text: &str) -> io::Result<Option<String>> {
        write!(self.output, "{text} ")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

fn parse_grade(raw: &str) -> Option<Grade> {
    if raw.eq_ignore_ascii_case("k") {
        return Some(Grade::KINDERGARTEN);
    }
    raw.parse::<u8>().ok().map(Grade::from)
}

fn parse_subject(raw: &str) -> Option<Subject> {
    if let Some(index) = raw.parse::<usize>().ok().and_then(|n| n.checked_sub(1)) {
        return Subject::ALL.get(index).copied();
    }
    Subject::from_str(&raw.to_lowercase()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use stars_core::model::UserProgress;
    use stars_core::time::fixed_clock;
    use stars_core::StaticCatalog;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use storage::repository::{InMemoryRepository, ProgressRepository, Storage, StorageError};

    /// Fails the first save that carries any stars.
    #[derive(Default)]
    struct FlakyProgress {
        failed_once: AtomicBool,
        inner: InMemoryRepository,
    }

    #[async_trait]
    impl ProgressRepository for FlakyProgress {
        async fn load_progress(&self) -> Result<Option<UserProgress>, StorageError> {
            self.inner.load_progress().await
        }

        async fn save_progress(&self, progress: &UserProgress) -> Result<(), StorageError> {
            if progress.total_stars() > 0 && !self.failed_once.swap(true, Ordering::SeqCst) {
                return Err(StorageError::Connection("disk full".into()));
            }
            self.inner.save_progress(progress).await
        }
    }

    fn catalog() -> StaticCatalog {
        let json = r#"{
            "topics": { "1": { "math": [ { "id": "m", "name": "Math", "standard": "M.1" } ] } },
            "questions": [
                { "id": "m1", "subject": "math", "grade": 1, "topicId": "m", "question": "2 + 2?",
                  "options": ["3", "4"], "correct": 1, "explanation": "Four.", "stars": 3 }
            ],
            "badges": [
                { "id": "first_star", "name": "First Star", "description": "Earn a star",
                  "emoji": "⭐", "requirement": { "type": "stars", "value": 1 } }
            ]
        }"#;
        StaticCatalog::from_json(json).unwrap()
    }

    fn services() -> AppServices {
        AppServices::in_memory(Arc::new(catalog()), fixed_clock())
    }

    async fn drive(services: &AppServices, script: &str) -> String {
        let mut output = Vec::new();
        Terminal::new(script.as_bytes(), &mut output)
            .run(services)
            .await
            .unwrap();
        String::from_utf8(output).unwrap()
    }

    #[tokio::test]
    async fn plays_a_full_session() {
        let services = services();
        // grade 1, default avatar, math, answer "4", results, home, quit
        let output = drive(&services, "1\n\nmath\n2\n\n\nq\n").await;

        assert!(output.contains("✅ Correct! +3 ⭐"));
        assert!(output.contains("You got 1 of 1 right (100%)."));
        assert!(output.contains("New badge: ⭐ First Star"));
        assert!(output.contains("Total stars: 3 ⭐"));
        assert!(output.contains("Time: 0m 00s"));

        let stored = services.progress().load().await.unwrap();
        assert_eq!(stored.total_stars(), 3);
        assert_eq!(stored.grade(), Grade::new(1));
    }

    #[tokio::test]
    async fn failed_save_on_results_can_be_retried() {
        let storage = Storage {
            progress: Arc::new(FlakyProgress::default()),
            session_summaries: Arc::new(InMemoryRepository::new()),
        };
        let services = AppServices::new(Arc::new(catalog()), fixed_clock(), &storage);
        // grade 1, default avatar, math, answer "4", results (fails), results again, home, quit
        let output = drive(&services, "1\n\nmath\n2\n\n\n\nq\n").await;

        assert!(output.contains("Could not save your stars (connection error: disk full)."));
        assert!(output.contains("You got 1 of 1 right (100%)."));
        assert_eq!(services.progress().load().await.unwrap().total_stars(), 3);
        assert_eq!(services.progress().recent_sessions(5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn wrong_answer_shows_correct_option() {
        let services = services();
        let output = drive(&services, "1\n1\n1\n1\n").await;
        assert!(output.contains("❌ Not quite. The answer is 4."));
        assert!(output.contains("💡 Four."));
    }

    #[tokio::test]
    async fn grade_without_content_returns_home() {
        let services = services();
        let output = drive(&services, "4\n\n2\nq\n").await;
        assert!(output.contains("No questions for this grade yet."));
    }

    #[test]
    fn parses_grade_and_subject_shortcuts() {
        assert_eq!(parse_grade("k"), Some(Grade::KINDERGARTEN));
        assert_eq!(parse_grade("3"), Some(Grade::new(3)));
        assert_eq!(parse_grade("x"), None);
        assert_eq!(parse_subject("2"), Some(Subject::Reading));
        assert_eq!(parse_subject("Science"), Some(Subject::Science));
        assert_eq!(parse_subject("9"), None);
    }
}
