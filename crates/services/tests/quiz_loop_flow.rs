use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Duration;
use drill_core::Clock;
use drill_core::model::{
    Chapter, ChapterAttribution, EndReason, ItemKey, ItemRecord, Outcome, Scope, SessionReport,
};
use drill_core::session::{Direction, GradedRound, Prompt};
use drill_core::time::{ManualClock, TimeLimit, fixed_now};
use rand::SeedableRng;
use rand::rngs::StdRng;
use services::{
    DrillConfig, DrillService, Prompter, QuizLoop, SessionError, StaticVocabulary,
    TranscriptError, TranscriptSink,
};
use storage::repository::{
    IncrementResult, InMemoryRepository, PerformanceStore, Storage, StorageError,
};

//
// ─── FAKES ─────────────────────────────────────────────────────────────────────
//

enum Scripted {
    Correct,
    Wrong,
    Raw(&'static str),
    Fail,
}

/// Answers from a script, then quits. Optionally advances a manual clock per answer.
struct ScriptedPrompter {
    script: VecDeque<Scripted>,
    asked: Vec<Prompt>,
    graded: Vec<GradedRound>,
    weight_calls: usize,
    tick: Option<(ManualClock, Duration)>,
}

impl ScriptedPrompter {
    fn new(script: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            script: script.into_iter().collect(),
            asked: Vec::new(),
            graded: Vec::new(),
            weight_calls: 0,
            tick: None,
        }
    }

    fn ticking(mut self, clock: ManualClock, step: Duration) -> Self {
        self.tick = Some((clock, step));
        self
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&mut self, prompt: &Prompt, _direction: Direction) -> io::Result<String> {
        self.asked.push(prompt.clone());
        if let Some((clock, step)) = &self.tick {
            clock.advance(*step);
        }
        if matches!(self.script.front(), Some(Scripted::Fail)) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "terminal closed"));
        }
        Ok(match self.script.pop_front() {
            Some(Scripted::Correct) => prompt.expected.clone(),
            Some(Scripted::Wrong) => format!("{}-nope", prompt.expected),
            Some(Scripted::Raw(raw)) => raw.to_string(),
            Some(Scripted::Fail) | None => "q".to_string(),
        })
    }

    fn feedback(&mut self, round: &GradedRound) {
        self.graded.push(round.clone());
    }

    fn show_weights(&mut self, items: &[ItemRecord], weights: &[f64]) {
        assert_eq!(items.len(), weights.len());
        self.weight_calls += 1;
    }
}

/// Counts store writes and can be told to fail them.
#[derive(Clone, Default)]
struct CountingStore {
    inner: InMemoryRepository,
    increments: Arc<AtomicUsize>,
    fail_increments: bool,
}

#[async_trait]
impl PerformanceStore for CountingStore {
    async fn ensure_schema(&self) -> Result<(), StorageError> {
        self.inner.ensure_schema().await
    }

    async fn load(&self, scope: Scope) -> Result<Vec<ItemRecord>, StorageError> {
        self.inner.load(scope).await
    }

    async fn create(&self, key: &ItemKey) -> Result<ItemRecord, StorageError> {
        self.inner.create(key).await
    }

    async fn increment(
        &self,
        key: &ItemKey,
        outcome: Outcome,
    ) -> Result<IncrementResult, StorageError> {
        self.increments.fetch_add(1, Ordering::SeqCst);
        if self.fail_increments {
            return Err(StorageError::Connection("disk unplugged".into()));
        }
        self.inner.increment(key, outcome).await
    }
}

#[derive(Default)]
struct MemoryTranscript {
    reports: Mutex<Vec<SessionReport>>,
}

impl TranscriptSink for MemoryTranscript {
    fn append(&self, report: &SessionReport) -> Result<(), TranscriptError> {
        self.reports.lock().unwrap().push(report.clone());
        Ok(())
    }
}

fn animals() -> StaticVocabulary {
    StaticVocabulary::new()
        .with_chapter(&[("gato", "cat"), ("perro", "dog"), ("casa", "house")])
        .with_chapter(&[("libro", "book"), ("gato", "cat")])
}

fn service(store: &CountingStore, clock: Clock) -> DrillService {
    DrillService::new(Arc::new(store.clone()), Arc::new(animals()))
        .with_clock(clock)
        .with_config(DrillConfig::default().with_time_limit(TimeLimit::Unlimited))
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[tokio::test]
async fn quit_on_first_round_writes_nothing() {
    let store = CountingStore::default();
    let svc = service(&store, Clock::fixed(fixed_now()));
    let mut session = svc.start_session(Scope::from_number(1)).await.unwrap();
    let mut prompter = ScriptedPrompter::new([Scripted::Raw("q")]);

    let report = QuizLoop::new(&svc)
        .run(&mut session, &mut prompter, &mut StdRng::seed_from_u64(1))
        .await
        .unwrap();

    assert_eq!(report.num_correct, 0);
    assert_eq!(report.num_wrong, 0);
    assert_eq!(report.ended_by, EndReason::Quit);
    assert_eq!(prompter.asked.len(), 1);
    assert_eq!(store.increments.load(Ordering::SeqCst), 0);
    let items = store.load(Scope::All).await.unwrap();
    assert!(items.iter().all(|i| i.attempts() == 0));
}

#[tokio::test]
async fn counters_match_sampled_rounds() {
    let store = CountingStore::default();
    let svc = service(&store, Clock::fixed(fixed_now()));
    let mut session = svc.start_session(Scope::All).await.unwrap();
    let script = (0..40).map(|i| {
        if i % 3 == 0 {
            Scripted::Wrong
        } else {
            Scripted::Correct
        }
    });
    let mut prompter = ScriptedPrompter::new(script);

    let report = QuizLoop::new(&svc)
        .run(&mut session, &mut prompter, &mut StdRng::seed_from_u64(42))
        .await
        .unwrap();

    assert_eq!(report.rounds(), 40);
    assert_eq!(store.increments.load(Ordering::SeqCst), 40);

    // the 41st prompt was abandoned by the implicit quit
    let graded = &prompter.asked[..40];
    let stored = store.load(Scope::All).await.unwrap();
    for (index, item) in session.items().iter().enumerate() {
        let sampled = graded.iter().filter(|p| p.index == index).count() as u64;
        assert_eq!(item.attempts(), sampled, "in-memory {}", item.source_term());

        let durable = stored.iter().find(|s| s.key() == item.key()).unwrap();
        assert_eq!(durable, item, "store and session diverged");
    }
}

#[tokio::test]
async fn elapsed_deadline_runs_zero_rounds() {
    let manual = ManualClock::starting_at(fixed_now());
    let store = CountingStore::default();
    let svc = service(&store, Clock::manual(manual.clone()))
        .with_config(DrillConfig::default().with_time_limit(TimeLimit::Seconds(30)));
    let mut session = svc.start_session(Scope::All).await.unwrap();

    manual.advance(Duration::seconds(30));
    let mut prompter = ScriptedPrompter::new([Scripted::Correct]);
    let report = QuizLoop::new(&svc)
        .run(&mut session, &mut prompter, &mut StdRng::seed_from_u64(1))
        .await
        .unwrap();

    assert!(prompter.asked.is_empty());
    assert_eq!(report.rounds(), 0);
    assert_eq!(report.ended_by, EndReason::Deadline);
    assert_eq!(report.time_limit_secs, 30);
}

#[tokio::test]
async fn deadline_is_checked_between_rounds() {
    let manual = ManualClock::starting_at(fixed_now());
    let store = CountingStore::default();
    let svc = service(&store, Clock::manual(manual.clone()))
        .with_config(DrillConfig::default().with_time_limit(TimeLimit::Seconds(10)));
    let mut session = svc.start_session(Scope::All).await.unwrap();

    // answers land at t=4, 8, 12; the third round overruns the limit and still counts
    let mut prompter = ScriptedPrompter::new((0..10).map(|_| Scripted::Correct))
        .ticking(manual.clone(), Duration::seconds(4));
    let report = QuizLoop::new(&svc)
        .run(&mut session, &mut prompter, &mut StdRng::seed_from_u64(3))
        .await
        .unwrap();

    assert_eq!(report.rounds(), 3);
    assert_eq!(report.num_correct, 3);
    assert_eq!(report.ended_at, fixed_now() + Duration::seconds(12));
    assert_eq!(store.increments.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn answers_match_case_insensitively() {
    let store = CountingStore::default();
    let vocab = StaticVocabulary::new().with_chapter(&[("gato", "cat")]);
    let svc = DrillService::new(Arc::new(store.clone()), Arc::new(vocab))
        .with_clock(Clock::fixed(fixed_now()));
    let mut session = svc.start_session(Scope::All).await.unwrap();
    let mut prompter = ScriptedPrompter::new([Scripted::Raw("Gato"), Scripted::Raw("")]);

    let report = QuizLoop::new(&svc)
        .run(&mut session, &mut prompter, &mut StdRng::seed_from_u64(1))
        .await
        .unwrap();

    assert_eq!(report.correct, vec!["gato".to_string()]);
    assert_eq!(report.incorrect, vec!["gato".to_string()]);
    assert_eq!(prompter.graded[0].outcome, Outcome::Correct);
}

#[tokio::test]
async fn store_failures_do_not_end_the_session() {
    let store = CountingStore {
        fail_increments: true,
        ..CountingStore::default()
    };
    let svc = service(&store, Clock::fixed(fixed_now()));
    let mut session = svc.start_session(Scope::from_number(1)).await.unwrap();
    let mut prompter = ScriptedPrompter::new((0..5).map(|_| Scripted::Wrong));

    let report = QuizLoop::new(&svc)
        .run(&mut session, &mut prompter, &mut StdRng::seed_from_u64(9))
        .await
        .unwrap();

    assert_eq!(report.num_wrong, 5);
    let in_memory: u64 = session.items().iter().map(ItemRecord::attempts).sum();
    assert_eq!(in_memory, 5);
    let durable: u64 = store
        .load(Scope::All)
        .await
        .unwrap()
        .iter()
        .map(ItemRecord::attempts)
        .sum();
    assert_eq!(durable, 0);
}

#[tokio::test]
async fn transcript_receives_report_with_loaded_scope_chapter() {
    let store = CountingStore::default();
    let svc = service(&store, Clock::fixed(fixed_now()));
    let sink = MemoryTranscript::default();

    let mut all = svc.start_session(Scope::All).await.unwrap();
    QuizLoop::new(&svc)
        .with_transcript(&sink)
        .run(
            &mut all,
            &mut ScriptedPrompter::new([Scripted::Correct]),
            &mut StdRng::seed_from_u64(5),
        )
        .await
        .unwrap();

    let mut single = svc.start_session(Scope::from_number(2)).await.unwrap();
    QuizLoop::new(&svc)
        .with_transcript(&sink)
        .run(&mut single, &mut ScriptedPrompter::new([]), &mut StdRng::seed_from_u64(5))
        .await
        .unwrap();

    let reports = sink.reports.lock().unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].chapter, ChapterAttribution::All);
    assert_eq!(reports[0].num_correct, 1);
    assert_eq!(
        reports[1].chapter,
        ChapterAttribution::Single(Chapter::new(2).unwrap())
    );
}

#[tokio::test]
async fn weight_diagnostics_shown_each_round() {
    let store = CountingStore::default();
    let config = DrillConfig::default()
        .with_time_limit(TimeLimit::Unlimited)
        .with_show_weights(true);
    let svc = service(&store, Clock::fixed(fixed_now())).with_config(config);
    let mut session = svc.start_session(Scope::All).await.unwrap();
    let mut prompter = ScriptedPrompter::new([Scripted::Correct, Scripted::Wrong]);

    QuizLoop::new(&svc)
        .run(&mut session, &mut prompter, &mut StdRng::seed_from_u64(2))
        .await
        .unwrap();

    // two graded rounds plus the quit round
    assert_eq!(prompter.weight_calls, 3);
}

#[tokio::test]
async fn replay_over_sqlite_keeps_counters() {
    let storage = Storage::sqlite("sqlite:file:memdb_services_replay?mode=memory&cache=shared")
        .await
        .unwrap();
    let vocab = StaticVocabulary::new().with_chapter(&[("gato", "cat"), ("perro", "dog")]);
    let svc = DrillService::new(Arc::clone(&storage.items), Arc::new(vocab))
        .with_clock(Clock::fixed(fixed_now()))
        .with_config(DrillConfig::default().with_direction(Direction::SourceToTarget));

    let mut first = svc.start_session(Scope::from_number(1)).await.unwrap();
    let mut prompter = ScriptedPrompter::new((0..6).map(|_| Scripted::Wrong));
    QuizLoop::new(&svc)
        .run(&mut first, &mut prompter, &mut StdRng::seed_from_u64(11))
        .await
        .unwrap();
    assert!(prompter.asked.iter().all(|p| p.prompt == "gato" || p.prompt == "perro"));

    let second = svc.start_session(Scope::from_number(1)).await.unwrap();
    assert_eq!(second.items().len(), 2);
    let wrong: u32 = second.items().iter().map(ItemRecord::incorrect_count).sum();
    assert_eq!(wrong, 6);
    assert_eq!(second.items(), first.items());
}

#[tokio::test]
async fn input_failure_still_writes_transcript() {
    let store = CountingStore::default();
    let svc = service(&store, Clock::fixed(fixed_now()));
    let sink = MemoryTranscript::default();
    let mut session = svc.start_session(Scope::from_number(1)).await.unwrap();
    let mut prompter = ScriptedPrompter::new([Scripted::Correct, Scripted::Wrong, Scripted::Fail]);

    let err = QuizLoop::new(&svc)
        .with_transcript(&sink)
        .run(&mut session, &mut prompter, &mut StdRng::seed_from_u64(4))
        .await
        .err()
        .unwrap();

    assert!(matches!(err, SessionError::Input(_)));
    assert_eq!(store.increments.load(Ordering::SeqCst), 2);
    let reports = sink.reports.lock().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].num_correct, 1);
    assert_eq!(reports[0].num_wrong, 1);
}
