//! Integration tests for the playback session
//!
//! The OpenAI clients, the audio player, the keyboard and the terminal are
//! replaced with in-process fakes, so these run without network or sound.

use async_trait::async_trait;
use repeat_chat::input::{InputError, KeyBindings, KeyReader, PauseKey};
use repeat_chat::playback::{AudioPlayer, PlaybackError};
use repeat_chat::session::{
    CleanupRegistry, CommandQueue, CompiledBatch, DialogueDisplay, Peripherals,
    PrefetchScheduler, Session, SessionOutcome, SessionSettings, TurnCompiler,
};
use repeat_chat::shutdown::ShutdownSignal;
use repeat_chat::speech::{SpeechError, SpeechSynthesizer};
use sdk::types::{PerRole, Role, Scenario, Turn};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

struct FakeSpeech;

#[async_trait]
impl SpeechSynthesizer for FakeSpeech {
    async fn synthesize(&self, _text: &str, _voice: &str) -> Result<Vec<u8>, SpeechError> {
        Ok(vec![7u8; 256])
    }
}

struct BrokenSpeech;

#[async_trait]
impl SpeechSynthesizer for BrokenSpeech {
    async fn synthesize(&self, _text: &str, _voice: &str) -> Result<Vec<u8>, SpeechError> {
        Err(SpeechError::Status {
            status: 500,
            body: "server error".to_string(),
        })
    }
}

/// Returns audio too short to be a real clip
struct TinySpeech;

#[async_trait]
impl SpeechSynthesizer for TinySpeech {
    async fn synthesize(&self, _text: &str, _voice: &str) -> Result<Vec<u8>, SpeechError> {
        Ok(vec![7u8; 50])
    }
}

/// A player whose program cannot be started
#[derive(Clone, Default)]
struct MissingProgramPlayer {
    attempts: Arc<Mutex<usize>>,
}

#[async_trait]
impl AudioPlayer for MissingProgramPlayer {
    async fn play(&self, _path: &Path) -> Result<(), PlaybackError> {
        *self.attempts.lock().unwrap() += 1;
        Err(PlaybackError::Spawn {
            program: "no-such-player".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })
    }
}

/// A keyboard that has gone away
struct DeadTerminal;

#[async_trait]
impl KeyReader for DeadTerminal {
    async fn read_key(&mut self) -> Result<PauseKey, InputError> {
        Err(InputError::Terminal(std::io::Error::other("not a tty")))
    }
}

#[derive(Clone, Default)]
struct RecordingPlayer {
    played: Arc<Mutex<Vec<PathBuf>>>,
}

#[async_trait]
impl AudioPlayer for RecordingPlayer {
    async fn play(&self, path: &Path) -> Result<(), PlaybackError> {
        self.played.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

/// Answers pauses from a script, then advances forever
struct ScriptedKeys {
    keys: VecDeque<PauseKey>,
}

impl ScriptedKeys {
    fn new(keys: &[PauseKey]) -> Self {
        Self {
            keys: keys.iter().copied().collect(),
        }
    }
}

#[async_trait]
impl KeyReader for ScriptedKeys {
    async fn read_key(&mut self) -> Result<PauseKey, InputError> {
        Ok(self.keys.pop_front().unwrap_or(PauseKey::Advance))
    }
}

/// Behaves like Ctrl-C pressed at the first pause
struct CtrlCKeys {
    shutdown: ShutdownSignal,
}

#[async_trait]
impl KeyReader for CtrlCKeys {
    async fn read_key(&mut self) -> Result<PauseKey, InputError> {
        self.shutdown.trigger();
        Err(InputError::Interrupted)
    }
}

#[derive(Clone, Default)]
struct RecordingDisplay {
    events: Arc<Mutex<Vec<String>>>,
}

impl RecordingDisplay {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl DialogueDisplay for RecordingDisplay {
    fn show_message(&mut self, role: Role, text: &str, _translation: &str) {
        self.push(format!("message {}: {}", role, text));
    }

    fn show_sentence(&mut self, role: Role, text: &str, translation: &str) {
        self.push(format!("sentence {}: {} / {}", role, text, translation));
    }

    fn prompt(&mut self, text: &str) {
        self.push(format!("prompt {}", text));
    }

    fn end_prompt(&mut self) {}

    fn notice(&mut self, text: &str) {
        self.push(format!("notice {}", text));
    }
}

fn scenario(turns: &[(&str, &str)]) -> Scenario {
    let script = turns
        .iter()
        .enumerate()
        .map(|(i, (text, translation))| {
            let role = if i % 2 == 0 { Role::A } else { Role::B };
            Turn::new(role, *text, *translation)
        })
        .collect();

    Scenario {
        scene: "A small café".to_string(),
        roles: PerRole::new("barista".to_string(), "student".to_string()),
        voices: PerRole::new("nova".to_string(), "onyx".to_string()),
        script,
    }
}

fn settings(root: &Path) -> SessionSettings {
    SessionSettings {
        scratch_root: root.to_path_buf(),
        low_water_mark: 4,
        min_audio_bytes: 100,
        poll_interval: Duration::from_millis(10),
        first_prompt: KeyBindings::default().hint(),
    }
}

async fn run_with_timeout(session: Session) -> SessionOutcome {
    tokio::time::timeout(Duration::from_secs(10), session.run())
        .await
        .expect("session should finish")
}

#[tokio::test]
async fn test_two_sentence_turn_plays_in_order() {
    let temp = TempDir::new().unwrap();
    let player = RecordingPlayer::default();
    let display = RecordingDisplay::default();

    let session = Session::new(
        &scenario(&[("Hi there! | Studying hard today?", "やあ！ | 今日も勉強？")]),
        Arc::new(FakeSpeech),
        Peripherals {
            player: Box::new(player.clone()),
            keys: Box::new(ScriptedKeys::new(&[])),
            display: Box::new(display.clone()),
        },
        ShutdownSignal::new(),
        settings(temp.path()),
    )
    .unwrap();
    let scratch = session.scratch_dir().to_path_buf();
    let registry = session.registry();

    assert_eq!(run_with_timeout(session).await, SessionOutcome::Completed);

    let f0 = scratch.join("turn_0_0.mp3");
    let f1 = scratch.join("turn_0_1.mp3");
    assert_eq!(*player.played.lock().unwrap(), vec![f0.clone(), f1.clone()]);
    assert_eq!(
        display.events(),
        vec![
            "message A: Hi there! Studying hard today?".to_string(),
            "sentence A: Hi there! / やあ！".to_string(),
            "prompt [press space to repeat, enter for next]> ".to_string(),
            "sentence A: Studying hard today? / 今日も勉強？".to_string(),
            "prompt > ".to_string(),
        ]
    );

    assert_eq!(registry.registered(), vec![f0.clone(), f1.clone()]);
    assert!(!f0.exists());
    assert!(!f1.exists());
    assert!(!scratch.exists());
}

#[tokio::test]
async fn test_turns_play_in_script_order() {
    let temp = TempDir::new().unwrap();
    let display = RecordingDisplay::default();
    let lines = [
        ("One.", ""),
        ("Two. | Three.", ""),
        ("Four.", ""),
        ("Five. | Six.", ""),
        ("Seven.", ""),
    ];

    let session = Session::new(
        &scenario(&lines),
        Arc::new(FakeSpeech),
        Peripherals {
            player: Box::new(RecordingPlayer::default()),
            keys: Box::new(ScriptedKeys::new(&[])),
            display: Box::new(display.clone()),
        },
        ShutdownSignal::new(),
        settings(temp.path()),
    )
    .unwrap();

    assert_eq!(run_with_timeout(session).await, SessionOutcome::Completed);

    let spoken: Vec<String> = display
        .events()
        .into_iter()
        .filter(|event| event.starts_with("sentence"))
        .collect();
    assert_eq!(
        spoken,
        vec![
            "sentence A: One. / ",
            "sentence B: Two. / ",
            "sentence B: Three. / ",
            "sentence A: Four. / ",
            "sentence B: Five. / ",
            "sentence B: Six. / ",
            "sentence A: Seven. / ",
        ]
    );
}

#[tokio::test]
async fn test_repeat_replays_sentence() {
    let temp = TempDir::new().unwrap();
    let player = RecordingPlayer::default();
    let display = RecordingDisplay::default();

    let session = Session::new(
        &scenario(&[("Once more.", "もう一度。")]),
        Arc::new(FakeSpeech),
        Peripherals {
            player: Box::new(player.clone()),
            keys: Box::new(ScriptedKeys::new(&[
                PauseKey::Repeat,
                PauseKey::Repeat,
                PauseKey::Repeat,
                PauseKey::Advance,
            ])),
            display: Box::new(display.clone()),
        },
        ShutdownSignal::new(),
        settings(temp.path()),
    )
    .unwrap();
    let file = session.scratch_dir().join("turn_0_0.mp3");

    assert_eq!(run_with_timeout(session).await, SessionOutcome::Completed);

    // First playback plus three replays
    assert_eq!(*player.played.lock().unwrap(), vec![file.clone(); 4]);

    let prompts: Vec<String> = display
        .events()
        .into_iter()
        .filter(|event| event.starts_with("prompt"))
        .collect();
    assert_eq!(prompts.len(), 4);
    assert_eq!(prompts[0], "prompt [press space to repeat, enter for next]> ");
    assert!(prompts[1..].iter().all(|prompt| prompt == "prompt > "));
    assert!(!file.exists());
}

#[tokio::test]
async fn test_interrupt_removes_queued_files() {
    let temp = TempDir::new().unwrap();
    let shutdown = ShutdownSignal::new();
    let player = RecordingPlayer::default();
    let display = RecordingDisplay::default();

    let session = Session::new(
        &scenario(&[("First part. | Second part.", ""), ("Never reached.", "")]),
        Arc::new(FakeSpeech),
        Peripherals {
            player: Box::new(player.clone()),
            keys: Box::new(CtrlCKeys {
                shutdown: shutdown.clone(),
            }),
            display: Box::new(display.clone()),
        },
        shutdown.clone(),
        settings(temp.path()),
    )
    .unwrap();
    let scratch = session.scratch_dir().to_path_buf();
    let registry = session.registry();

    assert_eq!(run_with_timeout(session).await, SessionOutcome::Interrupted);
    assert!(shutdown.is_triggered());

    assert_eq!(player.played.lock().unwrap().len(), 1);
    assert_eq!(
        display.events().last().map(String::as_str),
        Some("notice Exiting repeat-chat")
    );

    for file in registry.registered() {
        assert!(!file.exists(), "{:?} should be gone", file);
    }
    assert!(!scratch.join("turn_0_0.mp3").exists());
    assert!(!scratch.join("turn_0_1.mp3").exists());

    // A second sweep has nothing left to do
    assert_eq!(registry.final_sweep(), 0);
}

#[tokio::test]
async fn test_shutdown_before_start() {
    let temp = TempDir::new().unwrap();
    let shutdown = ShutdownSignal::new();
    shutdown.trigger();
    let player = RecordingPlayer::default();

    let session = Session::new(
        &scenario(&[("Hello.", "")]),
        Arc::new(FakeSpeech),
        Peripherals {
            player: Box::new(player.clone()),
            keys: Box::new(ScriptedKeys::new(&[])),
            display: Box::new(RecordingDisplay::default()),
        },
        shutdown,
        settings(temp.path()),
    )
    .unwrap();
    let scratch = session.scratch_dir().to_path_buf();

    assert_eq!(run_with_timeout(session).await, SessionOutcome::Interrupted);
    assert!(player.played.lock().unwrap().is_empty());
    assert!(!scratch.exists());
}

#[tokio::test]
async fn test_failed_synthesis_is_skipped() {
    let temp = TempDir::new().unwrap();
    let player = RecordingPlayer::default();
    let display = RecordingDisplay::default();

    let session = Session::new(
        &scenario(&[("Silent one. | Silent two.", ""), ("Silent three.", "")]),
        Arc::new(BrokenSpeech),
        Peripherals {
            player: Box::new(player.clone()),
            keys: Box::new(ScriptedKeys::new(&[PauseKey::Repeat])),
            display: Box::new(display.clone()),
        },
        ShutdownSignal::new(),
        settings(temp.path()),
    )
    .unwrap();

    assert_eq!(run_with_timeout(session).await, SessionOutcome::Completed);
    assert!(player.played.lock().unwrap().is_empty());

    let sentences = display
        .events()
        .into_iter()
        .filter(|event| event.starts_with("sentence"))
        .count();
    assert_eq!(sentences, 3);
}

#[tokio::test]
async fn test_undersized_audio_never_reaches_player() {
    let temp = TempDir::new().unwrap();
    let player = RecordingPlayer::default();

    let session = Session::new(
        &scenario(&[("Too short. | Also short.", "")]),
        Arc::new(TinySpeech),
        Peripherals {
            player: Box::new(player.clone()),
            keys: Box::new(ScriptedKeys::new(&[PauseKey::Repeat])),
            display: Box::new(RecordingDisplay::default()),
        },
        ShutdownSignal::new(),
        settings(temp.path()),
    )
    .unwrap();
    let scratch = session.scratch_dir().to_path_buf();
    let registry = session.registry();

    assert_eq!(run_with_timeout(session).await, SessionOutcome::Completed);
    assert!(player.played.lock().unwrap().is_empty());

    // The clips were written, then removed like any other
    assert_eq!(registry.registered().len(), 2);
    assert!(!scratch.join("turn_0_0.mp3").exists());
}

#[tokio::test]
async fn test_player_failure_does_not_stop_session() {
    let temp = TempDir::new().unwrap();
    let player = MissingProgramPlayer::default();
    let display = RecordingDisplay::default();

    let session = Session::new(
        &scenario(&[("One.", ""), ("Two.", "")]),
        Arc::new(FakeSpeech),
        Peripherals {
            player: Box::new(player.clone()),
            keys: Box::new(ScriptedKeys::new(&[])),
            display: Box::new(display.clone()),
        },
        ShutdownSignal::new(),
        settings(temp.path()),
    )
    .unwrap();

    assert_eq!(run_with_timeout(session).await, SessionOutcome::Completed);
    assert_eq!(*player.attempts.lock().unwrap(), 2);

    let sentences = display
        .events()
        .into_iter()
        .filter(|event| event.starts_with("sentence"))
        .count();
    assert_eq!(sentences, 2);
}

#[tokio::test]
async fn test_lost_terminal_ends_session() {
    let temp = TempDir::new().unwrap();
    let shutdown = ShutdownSignal::new();
    let display = RecordingDisplay::default();

    let session = Session::new(
        &scenario(&[("First. | Second.", "")]),
        Arc::new(FakeSpeech),
        Peripherals {
            player: Box::new(RecordingPlayer::default()),
            keys: Box::new(DeadTerminal),
            display: Box::new(display.clone()),
        },
        shutdown.clone(),
        settings(temp.path()),
    )
    .unwrap();
    let scratch = session.scratch_dir().to_path_buf();

    assert_eq!(run_with_timeout(session).await, SessionOutcome::Interrupted);
    assert!(shutdown.is_triggered());
    assert!(!scratch.exists());
    assert_eq!(
        display.events().last().map(String::as_str),
        Some("notice Exiting repeat-chat")
    );
}

#[tokio::test]
async fn test_single_clause_turns_with_high_water_mark() {
    let temp = TempDir::new().unwrap();
    let display = RecordingDisplay::default();
    let lines: Vec<(&str, &str)> = vec![("|", ""), ("Hi.", ""), ("|", ""), ("Bye.", "")];

    let mut settings = settings(temp.path());
    settings.low_water_mark = 8;

    let session = Session::new(
        &scenario(&lines),
        Arc::new(FakeSpeech),
        Peripherals {
            player: Box::new(RecordingPlayer::default()),
            keys: Box::new(ScriptedKeys::new(&[])),
            display: Box::new(display.clone()),
        },
        ShutdownSignal::new(),
        settings,
    )
    .unwrap();

    assert_eq!(run_with_timeout(session).await, SessionOutcome::Completed);

    let messages = display
        .events()
        .into_iter()
        .filter(|event| event.starts_with("message"))
        .count();
    assert_eq!(messages, 4);
}

#[tokio::test]
async fn test_prefetch_keeps_one_turn_ahead() {
    let temp = TempDir::new().unwrap();
    let registry = Arc::new(CleanupRegistry::new());
    let compiler = Arc::new(TurnCompiler::new(
        Arc::new(FakeSpeech),
        registry,
        temp.path(),
    ));
    let script = vec![
        Turn::new(Role::A, "Good morning.", ""),
        Turn::new(Role::B, "Morning!", ""),
    ];
    let mut scheduler = PrefetchScheduler::new(
        script,
        PerRole::new("nova".to_string(), "onyx".to_string()),
        compiler,
        4,
    );
    let mut queue = CommandQueue::new();

    async fn next_batch(scheduler: &PrefetchScheduler) -> CompiledBatch {
        for _ in 0..200 {
            if let Some(batch) = scheduler.take_pending() {
                return batch;
            }
            scheduler.wait_for_batch(Duration::from_millis(10)).await;
        }
        panic!("no batch compiled");
    }

    // The first turn goes through the same path as every other
    assert!(scheduler.maybe_prefetch(queue.len()));
    let first = next_batch(&scheduler).await;
    assert_eq!(first.index, 0);
    queue.extend_batch(first);
    assert_eq!(queue.len(), 5);

    assert!(!scheduler.maybe_prefetch(queue.len()));
    queue.pop_front();
    assert!(!scheduler.maybe_prefetch(queue.len()));
    queue.pop_front();

    // Three commands left: below the low-water mark
    assert!(scheduler.maybe_prefetch(queue.len()));
    assert!(!scheduler.maybe_prefetch(queue.len()));

    let second = next_batch(&scheduler).await;
    assert_eq!(second.index, 1);
    assert_eq!(second.role, Role::B);
    assert!(scheduler.is_finished());
    assert!(!scheduler.maybe_prefetch(0));
}
