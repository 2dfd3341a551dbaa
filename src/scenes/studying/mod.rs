// src/scenes/studying/mod.rs

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;

use thiserror::Error;

use crate::debug::Tracer;
use crate::deck::{Flashcard, StudyDeck};
use crate::review::{Confidence, ReviewError, ReviewSink};
use crate::state::{PendingReview, ReviewInbox, ReviewMessage, SessionPhase, StudySessionState};
use crate::ui::{CardView, Progress, Renderer};

pub mod input;
pub mod logic;

pub use self::logic::{AdvanceResult, Direction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("there are no flashcards to study")]
    EmptyDeck,
    #[error("no study session is active")]
    NoActiveSession,
    #[error("the study session is already complete")]
    SessionCompleted,
    #[error("a review for this card is still being recorded")]
    ReviewInFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStarted {
    pub total: usize,
}

/// The answer to a `rate_current_card` call, once the sink has replied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewResult {
    /// Recorded; the session moved on to the card at `position`.
    Advanced { position: usize },
    /// Recorded on the last card; the session is over.
    SessionComplete { total: usize },
    /// Not recorded. The session still sits on the same card, so the user may retry.
    ReviewFailed(ReviewError),
}

/// Runs one study session at a time over a deck of flashcards.
///
/// Ratings are recorded on a worker thread so the caller's loop keeps
/// running; their results come back through `poll_review` or
/// `wait_for_review`. Only one rating may be outstanding at a time.
pub struct StudySessionController {
    sink: Arc<dyn ReviewSink>,
    renderer: Box<dyn Renderer>,
    phase: SessionPhase,
    // Bumped on every start and exit so late replies can be recognised.
    generation: u64,
    tx: Sender<ReviewMessage>,
    inbox: ReviewInbox,
}

impl StudySessionController {
    pub fn new<S, R>(sink: S, renderer: R) -> Self
    where
        S: ReviewSink + 'static,
        R: Renderer + 'static,
    {
        let (tx, inbox) = mpsc::channel();
        StudySessionController {
            sink: Arc::new(sink),
            renderer: Box::new(renderer),
            phase: SessionPhase::NoSession,
            generation: 0,
            tx,
            inbox,
        }
    }

    /// Begins a session on the first card of `deck`, question side up.
    pub fn start(&mut self, deck: StudyDeck) -> Result<SessionStarted, SessionError> {
        let Some(state) = StudySessionState::new(deck) else {
            log::warn!("Refusing to start a study session on an empty deck.");
            return Err(SessionError::EmptyDeck);
        };
        if self.phase.is_active() {
            log::info!("Replacing the active study session.");
        }

        let total = state.deck.len();
        self.generation += 1;
        self.phase = SessionPhase::Active(state);
        log::info!("Study session started with {} card(s).", total);
        self.render_current();
        Ok(SessionStarted { total })
    }

    /// Shows the answer side of the current card.
    pub fn reveal(&mut self) -> Result<(), SessionError> {
        let state = self.active_mut()?;
        state.is_revealed = true;
        self.render_current();
        Ok(())
    }

    pub fn advance(&mut self, direction: Direction) -> Result<AdvanceResult, SessionError> {
        let state = self.active_mut()?;
        if state.in_flight.is_some() {
            return Err(SessionError::ReviewInFlight);
        }

        let result = logic::step(state, direction);
        match result {
            AdvanceResult::Advanced => self.render_current(),
            AdvanceResult::DeckExhausted => log::info!("Reached the end of the deck."),
            AdvanceResult::AtStart => {}
        }
        Ok(result)
    }

    /// Hands a rating for the current card to the review sink.
    ///
    /// Returns as soon as the request is on its way. The session does not
    /// move until the reply is collected with `poll_review` or
    /// `wait_for_review`.
    pub fn rate_current_card(&mut self, confidence: Confidence) -> Result<PendingReview, SessionError> {
        let generation = self.generation;
        let state = self.active_mut()?;
        if state.in_flight.is_some() {
            log::warn!("Ignoring rating: a review is already in flight.");
            return Err(SessionError::ReviewInFlight);
        }

        let review = PendingReview {
            card_id: state.current_card().id.clone(),
            position: state.position,
            confidence,
        };
        state.in_flight = Some(review.clone());
        log::debug!("Submitting confidence {} for card {}.", confidence, review.card_id);

        let sink = Arc::clone(&self.sink);
        let tx = self.tx.clone();
        let job = review.clone();
        let spawned = thread::Builder::new()
            .name("review-submit".into())
            .spawn(move || {
                let _trace = Tracer::new("Submit review", job.card_id.clone());
                let result = panic::catch_unwind(AssertUnwindSafe(|| sink.submit_review(&job.card_id, job.confidence)))
                    .unwrap_or_else(|_| {
                        log::error!("Review sink panicked while recording card {}.", job.card_id);
                        Err(ReviewError::Transport("review worker panicked".into()))
                    });
                let message = ReviewMessage::Finished { generation, review: job, result };
                if tx.send(message).is_err() {
                    log::debug!("Study session went away before its review finished.");
                }
            });

        if let Err(e) = spawned {
            // Report it through the inbox so the caller sees an ordinary failed review.
            let message = ReviewMessage::Finished {
                generation,
                review: review.clone(),
                result: Err(ReviewError::Transport(format!("could not start review worker: {}", e))),
            };
            if self.tx.send(message).is_err() {
                log::debug!("Study session inbox closed before the failed review was reported.");
            }
        }
        Ok(review)
    }

    /// Collects a finished review without blocking.
    pub fn poll_review(&mut self) -> Option<ReviewResult> {
        while let Ok(message) = self.inbox.try_recv() {
            if let Some(result) = self.apply_message(message) {
                return Some(result);
            }
        }
        None
    }

    /// Blocks until the outstanding review finishes. Returns `None` straight
    /// away when nothing is in flight.
    pub fn wait_for_review(&mut self) -> Option<ReviewResult> {
        while self.is_review_in_flight() {
            let message = self.inbox.recv().ok()?;
            if let Some(result) = self.apply_message(message) {
                return Some(result);
            }
        }
        self.poll_review()
    }

    /// Rates the current card and waits for the sink to reply.
    pub fn rate_and_wait(&mut self, confidence: Confidence) -> Result<ReviewResult, SessionError> {
        self.rate_current_card(confidence)?;
        self.wait_for_review().ok_or(SessionError::NoActiveSession)
    }

    /// Drops the session. Replies to reviews already sent are ignored.
    pub fn exit(&mut self) {
        if matches!(self.phase, SessionPhase::NoSession) {
            return;
        }
        self.generation += 1;
        self.phase = SessionPhase::NoSession;
        self.renderer.clear();
        log::info!("Study session closed.");
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn position(&self) -> Option<usize> {
        match &self.phase {
            SessionPhase::Active(state) => Some(state.position),
            _ => None,
        }
    }

    pub fn is_revealed(&self) -> bool {
        matches!(&self.phase, SessionPhase::Active(state) if state.is_revealed)
    }

    pub fn current_card(&self) -> Option<&Flashcard> {
        match &self.phase {
            SessionPhase::Active(state) => Some(state.current_card()),
            _ => None,
        }
    }

    pub fn deck_len(&self) -> Option<usize> {
        match &self.phase {
            SessionPhase::Active(state) => Some(state.deck.len()),
            SessionPhase::Completed { total } => Some(*total),
            SessionPhase::NoSession => None,
        }
    }

    pub fn is_review_in_flight(&self) -> bool {
        matches!(&self.phase, SessionPhase::Active(state) if state.in_flight.is_some())
    }

    fn active_mut(&mut self) -> Result<&mut StudySessionState, SessionError> {
        match &mut self.phase {
            SessionPhase::Active(state) => Ok(state),
            SessionPhase::Completed { .. } => Err(SessionError::SessionCompleted),
            SessionPhase::NoSession => Err(SessionError::NoActiveSession),
        }
    }

    fn render_current(&mut self) {
        if let SessionPhase::Active(state) = &self.phase {
            let card = state.current_card();
            let view = CardView {
                question: &card.question,
                answer: state.is_revealed.then_some(card.answer.as_str()),
                progress: Progress { position: state.position, total: state.deck.len() },
            };
            self.renderer.show_card(&view);
        }
    }

    /// Applies a worker's reply, or drops it if it belongs to a session that
    /// has since ended.
    fn apply_message(&mut self, message: ReviewMessage) -> Option<ReviewResult> {
        let ReviewMessage::Finished { generation, review, result } = message;
        if generation != self.generation {
            log::debug!("Discarding late review reply for card {}.", review.card_id);
            return None;
        }
        let SessionPhase::Active(state) = &mut self.phase else {
            return None;
        };
        if state.in_flight.as_ref() != Some(&review) {
            log::debug!("Discarding unexpected review reply for card {}.", review.card_id);
            return None;
        }

        match logic::apply_review(state, result) {
            logic::ReviewOutcome::Advanced => {
                let position = state.position;
                self.render_current();
                Some(ReviewResult::Advanced { position })
            }
            logic::ReviewOutcome::Completed => {
                let total = state.deck.len();
                self.phase = SessionPhase::Completed { total };
                self.renderer.show_complete(total);
                log::info!("Study session complete after {} card(s).", total);
                Some(ReviewResult::SessionComplete { total })
            }
            logic::ReviewOutcome::Failed(e) => {
                log::warn!("Failed to record review for card {}: {}", review.card_id, e);
                Some(ReviewResult::ReviewFailed(e))
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::deck::tests::deck;
    use std::collections::VecDeque;
    use std::sync::mpsc::Receiver;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Frame {
        Card { question: String, answer: Option<String>, progress: String },
        Complete(usize),
        Clear,
    }

    #[derive(Clone, Default)]
    pub struct RecordingRenderer {
        pub frames: Arc<Mutex<Vec<Frame>>>,
    }

    impl RecordingRenderer {
        pub fn last(&self) -> Option<Frame> {
            self.frames.lock().unwrap().last().cloned()
        }
    }

    impl Renderer for RecordingRenderer {
        fn show_card(&mut self, view: &CardView<'_>) {
            self.frames.lock().unwrap().push(Frame::Card {
                question: view.question.to_string(),
                answer: view.answer.map(str::to_string),
                progress: view.progress.to_string(),
            });
        }

        fn show_complete(&mut self, total: usize) {
            self.frames.lock().unwrap().push(Frame::Complete(total));
        }

        fn clear(&mut self) {
            self.frames.lock().unwrap().push(Frame::Clear);
        }
    }

    /// Replies with queued results in order, then succeeds.
    #[derive(Clone, Default)]
    pub struct ScriptedSink {
        replies: Arc<Mutex<VecDeque<Result<(), ReviewError>>>>,
        pub calls: Arc<Mutex<Vec<(String, u8)>>>,
    }

    impl ScriptedSink {
        pub fn with_replies(replies: Vec<Result<(), ReviewError>>) -> Self {
            ScriptedSink { replies: Arc::new(Mutex::new(replies.into())), ..Default::default() }
        }
    }

    impl ReviewSink for ScriptedSink {
        fn submit_review(&self, card_id: &str, confidence: Confidence) -> Result<(), ReviewError> {
            self.calls.lock().unwrap().push((card_id.to_string(), confidence.value()));
            self.replies.lock().unwrap().pop_front().unwrap_or(Ok(()))
        }
    }

    /// Holds every review until the test releases it.
    struct GatedSink {
        gate: Mutex<Receiver<Result<(), ReviewError>>>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    fn gated() -> (GatedSink, Sender<Result<(), ReviewError>>, Arc<Mutex<Vec<String>>>) {
        let (tx, rx) = mpsc::channel();
        let calls = Arc::new(Mutex::new(Vec::new()));
        (GatedSink { gate: Mutex::new(rx), calls: Arc::clone(&calls) }, tx, calls)
    }

    impl ReviewSink for GatedSink {
        fn submit_review(&self, card_id: &str, _confidence: Confidence) -> Result<(), ReviewError> {
            self.calls.lock().unwrap().push(card_id.to_string());
            self.gate
                .lock()
                .unwrap()
                .recv()
                .unwrap_or_else(|_| Err(ReviewError::Transport("gate closed".into())))
        }
    }

    /// Panics on the first review, then succeeds.
    #[derive(Default)]
    struct PanickyOnceSink {
        calls: Mutex<usize>,
    }

    impl ReviewSink for PanickyOnceSink {
        fn submit_review(&self, card_id: &str, _confidence: Confidence) -> Result<(), ReviewError> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if *calls == 1 {
                drop(calls);
                panic!("sink blew up on {}", card_id);
            }
            Ok(())
        }
    }

    fn conf(n: u8) -> Confidence {
        Confidence::new(n).unwrap()
    }

    fn controller(sink: impl ReviewSink + 'static) -> (StudySessionController, RecordingRenderer) {
        let renderer = RecordingRenderer::default();
        (StudySessionController::new(sink, renderer.clone()), renderer)
    }

    #[test]
    fn test_start_shows_question_of_first_card() {
        let (mut c, frames) = controller(ScriptedSink::default());
        assert_eq!(c.start(deck(&["a", "b", "c"])), Ok(SessionStarted { total: 3 }));
        assert_eq!(c.position(), Some(0));
        assert!(!c.is_revealed());
        assert_eq!(
            frames.last(),
            Some(Frame::Card { question: "Question a".into(), answer: None, progress: "1 / 3".into() })
        );
    }

    #[test]
    fn test_empty_deck_is_refused() {
        let (mut c, frames) = controller(ScriptedSink::default());
        assert_eq!(c.start(deck(&[])), Err(SessionError::EmptyDeck));
        assert!(matches!(c.phase(), SessionPhase::NoSession));
        assert!(frames.frames.lock().unwrap().is_empty());

        // An active session survives a refused start.
        c.start(deck(&["a", "b"])).unwrap();
        c.advance(Direction::Next).unwrap();
        assert_eq!(c.start(deck(&[])), Err(SessionError::EmptyDeck));
        assert_eq!(c.position(), Some(1));
    }

    #[test]
    fn test_reveal_is_idempotent_and_shows_answer() {
        let (mut c, frames) = controller(ScriptedSink::default());
        c.start(deck(&["a"])).unwrap();
        c.reveal().unwrap();
        c.reveal().unwrap();
        assert!(c.is_revealed());
        assert_eq!(
            frames.last(),
            Some(Frame::Card {
                question: "Question a".into(),
                answer: Some("Answer a".into()),
                progress: "1 / 1".into()
            })
        );
    }

    #[test]
    fn test_operations_without_session() {
        let (mut c, _) = controller(ScriptedSink::default());
        assert_eq!(c.reveal(), Err(SessionError::NoActiveSession));
        assert_eq!(c.advance(Direction::Next), Err(SessionError::NoActiveSession));
        assert_eq!(c.rate_current_card(conf(3)), Err(SessionError::NoActiveSession));
        assert_eq!(c.wait_for_review(), None);
        c.exit();
        assert!(matches!(c.phase(), SessionPhase::NoSession));
    }

    #[test]
    fn test_advance_boundaries() {
        let (mut c, _) = controller(ScriptedSink::default());
        c.start(deck(&["a", "b", "c"])).unwrap();
        assert_eq!(c.advance(Direction::Previous), Ok(AdvanceResult::AtStart));
        assert_eq!(c.position(), Some(0));

        c.reveal().unwrap();
        assert_eq!(c.advance(Direction::Next), Ok(AdvanceResult::Advanced));
        assert!(!c.is_revealed());
        assert_eq!(c.advance(Direction::Next), Ok(AdvanceResult::Advanced));
        for _ in 0..3 {
            assert_eq!(c.advance(Direction::Next), Ok(AdvanceResult::DeckExhausted));
            assert_eq!(c.position(), Some(2));
        }

        c.reveal().unwrap();
        assert_eq!(c.advance(Direction::Previous), Ok(AdvanceResult::Advanced));
        assert_eq!(c.position(), Some(1));
        assert!(!c.is_revealed());
    }

    #[test]
    fn test_three_card_walkthrough() {
        let sink = ScriptedSink::default();
        let (mut c, frames) = controller(sink.clone());
        c.start(deck(&["A", "B", "C"])).unwrap();

        assert_eq!(c.rate_and_wait(conf(4)), Ok(ReviewResult::Advanced { position: 1 }));
        assert_eq!(c.current_card().unwrap().id, "B");
        assert!(!c.is_revealed());

        c.reveal().unwrap();
        assert!(c.is_revealed());
        assert_eq!(c.rate_and_wait(conf(5)), Ok(ReviewResult::Advanced { position: 2 }));
        assert_eq!(c.current_card().unwrap().id, "C");

        assert_eq!(c.rate_and_wait(conf(2)), Ok(ReviewResult::SessionComplete { total: 3 }));
        assert!(c.phase().is_completed());
        assert_eq!(frames.last(), Some(Frame::Complete(3)));

        let calls = sink.calls.lock().unwrap().clone();
        assert_eq!(calls, vec![("A".into(), 4), ("B".into(), 5), ("C".into(), 2)]);
    }

    #[test]
    fn test_single_card_completes_immediately() {
        let (mut c, _) = controller(ScriptedSink::default());
        c.start(deck(&["A"])).unwrap();
        assert_eq!(c.rate_and_wait(conf(3)), Ok(ReviewResult::SessionComplete { total: 1 }));
    }

    #[test]
    fn test_every_deck_length_completes_once() {
        for n in 1..=6 {
            let ids: Vec<String> = (0..n).map(|i| format!("c{}", i)).collect();
            let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
            let (mut c, _) = controller(ScriptedSink::default());
            c.start(deck(&ids)).unwrap();

            let mut advanced = 0;
            let mut completed = 0;
            for _ in 0..n {
                let before = c.position();
                match c.rate_and_wait(conf(3)).unwrap() {
                    ReviewResult::Advanced { .. } => advanced += 1,
                    ReviewResult::SessionComplete { total } => {
                        assert_eq!(total, n);
                        assert_eq!(before, Some(n - 1));
                        completed += 1;
                    }
                    other => panic!("unexpected {:?}", other),
                }
            }
            assert_eq!((advanced, completed), (n - 1, 1));
        }
    }

    #[test]
    fn test_failed_review_keeps_state_and_allows_retry() {
        let sink = ScriptedSink::with_replies(vec![Ok(()), Err(ReviewError::Rejected { status: 500 })]);
        let (mut c, _) = controller(sink.clone());
        c.start(deck(&["A", "B", "C"])).unwrap();
        c.rate_and_wait(conf(4)).unwrap();

        c.reveal().unwrap();
        assert_eq!(
            c.rate_and_wait(conf(2)),
            Ok(ReviewResult::ReviewFailed(ReviewError::Rejected { status: 500 }))
        );
        assert_eq!(c.position(), Some(1));
        assert!(c.is_revealed());
        assert!(!c.is_review_in_flight());

        assert_eq!(c.rate_and_wait(conf(2)), Ok(ReviewResult::Advanced { position: 2 }));
        assert_eq!(sink.calls.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_completed_session_rejects_operations() {
        let (mut c, frames) = controller(ScriptedSink::default());
        c.start(deck(&["A"])).unwrap();
        c.rate_and_wait(conf(5)).unwrap();

        assert_eq!(c.reveal(), Err(SessionError::SessionCompleted));
        assert_eq!(c.advance(Direction::Previous), Err(SessionError::SessionCompleted));
        assert_eq!(c.rate_current_card(conf(5)), Err(SessionError::SessionCompleted));
        assert_eq!(c.deck_len(), Some(1));

        c.exit();
        assert_eq!(frames.last(), Some(Frame::Clear));
        assert!(matches!(c.phase(), SessionPhase::NoSession));
        assert!(c.start(deck(&["B"])).is_ok());
    }

    #[test]
    fn test_second_rating_while_in_flight_is_rejected() {
        let (sink, release, calls) = gated();
        let (mut c, _) = controller(sink);
        c.start(deck(&["A", "B"])).unwrap();

        let pending = c.rate_current_card(conf(4)).unwrap();
        assert_eq!(pending.card_id, "A");
        assert!(c.is_review_in_flight());
        assert_eq!(c.rate_current_card(conf(4)), Err(SessionError::ReviewInFlight));
        assert_eq!(c.advance(Direction::Next), Err(SessionError::ReviewInFlight));
        assert_eq!(c.position(), Some(0));

        release.send(Ok(())).unwrap();
        assert_eq!(c.wait_for_review(), Some(ReviewResult::Advanced { position: 1 }));
        assert_eq!(*calls.lock().unwrap(), vec!["A".to_string()]);
    }

    #[test]
    fn test_reply_after_exit_is_discarded() {
        let (sink, release, _) = gated();
        let (mut c, _) = controller(sink);
        c.start(deck(&["A", "B"])).unwrap();
        c.rate_current_card(conf(4)).unwrap();
        c.exit();
        assert_eq!(c.wait_for_review(), None);

        c.start(deck(&["X", "Y"])).unwrap();
        release.send(Ok(())).unwrap();
        let late = c.inbox.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(c.apply_message(late), None);
        assert_eq!(c.position(), Some(0));
        assert_eq!(c.current_card().unwrap().id, "X");
        assert!(!c.is_review_in_flight());
    }

    #[test]
    fn test_restart_discards_reply_for_old_session() {
        let (sink, release, _) = gated();
        let (mut c, _) = controller(sink);
        c.start(deck(&["A", "B"])).unwrap();
        c.rate_current_card(conf(1)).unwrap();

        c.start(deck(&["X", "Y"])).unwrap();
        assert!(!c.is_review_in_flight());
        release.send(Ok(())).unwrap();
        let late = c.inbox.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(c.apply_message(late), None);
        assert_eq!(c.position(), Some(0));
    }

    #[test]
    fn test_panicking_sink_fails_review_and_allows_retry() {
        let (mut c, _) = controller(PanickyOnceSink::default());
        c.start(deck(&["A", "B"])).unwrap();
        c.reveal().unwrap();

        let failed = c.rate_and_wait(conf(3)).unwrap();
        assert!(matches!(failed, ReviewResult::ReviewFailed(ReviewError::Transport(_))));
        assert!(!c.is_review_in_flight());
        assert_eq!(c.position(), Some(0));
        assert!(c.is_revealed());

        assert_eq!(c.rate_and_wait(conf(3)), Ok(ReviewResult::Advanced { position: 1 }));
        assert_eq!(c.advance(Direction::Previous), Ok(AdvanceResult::Advanced));
    }

    #[test]
    fn test_poll_review_does_not_block() {
        let (sink, release, _) = gated();
        let (mut c, _) = controller(sink);
        c.start(deck(&["A", "B"])).unwrap();
        c.rate_current_card(conf(3)).unwrap();
        assert_eq!(c.poll_review(), None);
        assert!(c.is_review_in_flight());

        release.send(Err(ReviewError::Transport("offline".into()))).unwrap();
        assert_eq!(
            c.wait_for_review(),
            Some(ReviewResult::ReviewFailed(ReviewError::Transport("offline".into())))
        );
        assert_eq!(c.position(), Some(0));
    }
}
