use std::io;

use drill_core::model::{ItemRecord, SessionReport};
use drill_core::session::{AnswerStep, Direction, GradedRound, Prompt, Session};
use rand::Rng;
use tracing::{info, warn};

use crate::drill::{DrillService, Persisted};
use crate::error::SessionError;
use crate::transcript::TranscriptSink;

/// The learner's side of the loop: shows prompts and returns typed answers.
///
/// `ask` blocks until the learner answers; it has no timeout of its own.
pub trait Prompter {
    /// Show `prompt` and return the learner's raw input.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if input cannot be read.
    fn ask(&mut self, prompt: &Prompt, direction: Direction) -> io::Result<String>;

    /// Called after a graded round has been persisted.
    fn feedback(&mut self, _round: &GradedRound) {}

    /// Called before each prompt when weight diagnostics are enabled.
    fn show_weights(&mut self, _items: &[ItemRecord], _weights: &[f64]) {}
}

/// Drives one session round by round until the deadline or a quit token.
pub struct QuizLoop<'a> {
    service: &'a DrillService,
    transcript: Option<&'a dyn TranscriptSink>,
}

impl<'a> QuizLoop<'a> {
    #[must_use]
    pub fn new(service: &'a DrillService) -> Self {
        Self {
            service,
            transcript: None,
        }
    }

    #[must_use]
    pub fn with_transcript(mut self, transcript: &'a dyn TranscriptSink) -> Self {
        self.transcript = Some(transcript);
        self
    }

    /// Run `session` to completion and return its report.
    ///
    /// The deadline is checked between rounds only, so a slow answer can
    /// overrun the limit by one round. Each graded outcome is written to the
    /// store before the next prompt is drawn. The session is finished and its
    /// transcript written even when a round fails.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Input` if the prompter fails to read input and
    /// `SessionError::Round` on a misuse of the session state machine.
    pub async fn run<P, R>(
        &self,
        session: &mut Session,
        prompter: &mut P,
        rng: &mut R,
    ) -> Result<SessionReport, SessionError>
    where
        P: Prompter + ?Sized,
        R: Rng + ?Sized,
    {
        let outcome = self.play_rounds(session, prompter, rng).await;

        let report = session.finish(self.service.clock().now());
        info!(
            chapter = %report.chapter,
            correct = report.num_correct,
            wrong = report.num_wrong,
            ended_by = ?report.ended_by,
            "session finished"
        );

        if let Some(sink) = self.transcript {
            if let Err(e) = sink.append(&report) {
                warn!(error = %e, "failed to write session transcript");
            }
        }

        outcome.map(|()| report)
    }

    async fn play_rounds<P, R>(
        &self,
        session: &mut Session,
        prompter: &mut P,
        rng: &mut R,
    ) -> Result<(), SessionError>
    where
        P: Prompter + ?Sized,
        R: Rng + ?Sized,
    {
        let clock = self.service.clock();
        let show_weights = self.service.config().show_weights;

        while !session.deadline_reached(clock.now()) {
            if show_weights {
                prompter.show_weights(session.items(), &session.weights());
            }

            let prompt = session.next_prompt(rng)?.clone();
            let input = prompter.ask(&prompt, session.direction())?;

            match session.answer(&input)? {
                AnswerStep::Quit => break,
                AnswerStep::Graded(round) => {
                    if self.service.apply(&round).await != Persisted::Applied {
                        warn!(index = round.index, "outcome kept in memory only");
                    }
                    prompter.feedback(&round);
                }
            }
        }
        Ok(())
    }
}
