//! Input handling for the MockMaster TUI.

use anyhow::{Result, anyhow};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::sync::mpsc;
use tracing::debug;

use mockmaster_engine::{App, OptionIndex, View, ui::SetupField};

const INPUT_POLL_TIMEOUT: Duration = Duration::from_millis(25); // shutdown responsiveness
const INPUT_CHANNEL_CAPACITY: usize = 1024; // bounded: no OOM
const MAX_EVENTS_PER_FRAME: usize = 64; // never starve rendering

enum InputMsg {
    Event(Event),
    Error(String),
}

/// Reads terminal events on a blocking thread and hands them to the frame loop.
pub struct InputPump {
    rx: mpsc::Receiver<InputMsg>,
    stop: Arc<AtomicBool>,
    join: Option<tokio::task::JoinHandle<()>>,
}

impl InputPump {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);
        let stop = Arc::new(AtomicBool::new(false));
        let stop2 = stop.clone();

        let join = tokio::task::spawn_blocking(move || input_loop(stop2, tx));
        Self {
            rx,
            stop,
            join: Some(join),
        }
    }

    pub async fn shutdown(&mut self) {
        // Close the receiver first so a reader blocked on a full channel wakes up.
        self.rx.close();

        self.stop.store(true, Ordering::Release);
        if let Some(join) = self.join.take() {
            let _ = tokio::time::timeout(Duration::from_secs(2), join).await;
        }
    }
}

impl Default for InputPump {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InputPump {
    fn drop(&mut self) {
        // Best-effort stop if caller exits early; do not block in Drop.
        self.rx.close();
        self.stop.store(true, Ordering::Release);
    }
}

fn input_loop(stop: Arc<AtomicBool>, tx: mpsc::Sender<InputMsg>) {
    while !stop.load(Ordering::Acquire) {
        match event::poll(INPUT_POLL_TIMEOUT) {
            Ok(true) => match event::read() {
                Ok(ev) => {
                    // Bounded queue: apply backpressure instead of dropping events.
                    if tx.blocking_send(InputMsg::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = tx.blocking_send(InputMsg::Error(e.to_string()));
                    break;
                }
            },
            Ok(false) => {}
            Err(e) => {
                let _ = tx.blocking_send(InputMsg::Error(e.to_string()));
                break;
            }
        }
    }
}

/// Drain queued input into `app`. Returns `true` when the app should quit.
pub fn handle_events(app: &mut App, input: &mut InputPump) -> Result<bool> {
    let mut processed = 0;
    while processed < MAX_EVENTS_PER_FRAME {
        let ev = match input.rx.try_recv() {
            Ok(InputMsg::Event(ev)) => ev,
            Ok(InputMsg::Error(msg)) => return Err(anyhow!("input error: {msg}")),
            Err(mpsc::error::TryRecvError::Empty) => break,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                return Err(anyhow!("input pump disconnected"));
            }
        };

        if apply_event(app, ev) {
            return Ok(true);
        }
        processed += 1;
    }
    Ok(app.should_quit())
}

pub(crate) fn apply_event(app: &mut App, event: Event) -> bool {
    match event {
        Event::Key(key) => {
            if matches!(key.kind, KeyEventKind::Release) {
                return app.should_quit();
            }

            if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
                if app.cancel_generation() {
                    return app.should_quit();
                }
                app.request_quit();
                return true;
            }

            match app.view() {
                View::Setup => handle_setup_key(app, key),
                View::Active => handle_active_key(app, key),
                View::Result => handle_result_key(app, key),
            }
        }
        Event::Paste(text) => {
            if app.view() == View::Setup && app.setup().focus() == SetupField::Topic {
                app.setup_mut().topic_mut().enter_text(&text);
            }
        }
        _ => {}
    }
    app.should_quit()
}

fn handle_setup_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => {
            if app.is_generating() {
                return;
            }
            if !app.setup().can_submit() {
                debug!("Ignoring submit with blank topic");
                return;
            }
            if let Err(e) = app.submit_setup() {
                debug!(error = %e, "Quiz not started");
            }
            return;
        }
        KeyCode::Esc => {
            if !app.cancel_generation() {
                app.dismiss_notice();
            }
            return;
        }
        KeyCode::Tab | KeyCode::Down => {
            app.setup_mut().focus_next();
            return;
        }
        KeyCode::BackTab | KeyCode::Up => {
            app.setup_mut().focus_prev();
            return;
        }
        _ => {}
    }

    if app.setup().focus() == SetupField::Topic {
        handle_topic_key(app, key);
        return;
    }

    match key.code {
        KeyCode::Left | KeyCode::Char('h') => app.setup_mut().select_prev(),
        KeyCode::Right | KeyCode::Char('l' | ' ') => app.setup_mut().select_next(),
        KeyCode::Char('q') => app.request_quit(),
        _ => {}
    }
}

fn handle_topic_key(app: &mut App, key: KeyEvent) {
    let topic = app.setup_mut().topic_mut();
    match key.code {
        KeyCode::Char('w') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            topic.delete_word_backwards();
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => topic.clear(),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => topic.enter_char(c),
        KeyCode::Backspace => topic.delete_char(),
        KeyCode::Delete => topic.delete_char_forward(),
        KeyCode::Left => topic.move_cursor_left(),
        KeyCode::Right => topic.move_cursor_right(),
        KeyCode::Home => topic.move_cursor_home(),
        KeyCode::End => topic.move_cursor_end(),
        _ => {}
    }
}

fn current_is_answered(app: &App) -> bool {
    app.session().is_some_and(|session| {
        session
            .current_question()
            .is_some_and(|q| session.state().answer_for(q.id()).is_some())
    })
}

fn handle_active_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.request_quit(),
        KeyCode::Char('f' | 'F') => {
            app.finish();
        }
        KeyCode::Char(c @ '1'..='4') => {
            if let Some(option) = c
                .to_digit(10)
                .and_then(|d| OptionIndex::new(d as usize - 1).ok())
            {
                app.answer_current(option);
            }
        }
        KeyCode::Char(' ') => {
            app.answer_at_cursor();
        }
        KeyCode::Char(c) => {
            if let Some(option) = OptionIndex::from_letter(c) {
                app.answer_current(option);
            }
        }
        KeyCode::Up => app.move_option_cursor(-1),
        KeyCode::Down => app.move_option_cursor(1),
        KeyCode::Enter | KeyCode::Right => {
            if !current_is_answered(app) {
                debug!("Next disabled until the current question is answered");
                return;
            }
            let last = app.session().is_some_and(|s| s.is_last_question());
            if last {
                app.finish();
            } else {
                app.advance();
            }
        }
        KeyCode::Left => {
            app.go_back();
        }
        KeyCode::Esc => app.reset(),
        _ => {}
    }
}

fn handle_result_key(app: &mut App, key: KeyEvent) {
    let len = app.session().map_or(0, |s| s.quiz().len());
    match key.code {
        KeyCode::Char('q') => app.request_quit(),
        KeyCode::Char('r' | 'R') => {
            app.retry();
        }
        KeyCode::Char('n' | 'N') | KeyCode::Esc => app.reset(),
        KeyCode::Up | KeyCode::Char('k') => app.breakdown_mut().select_prev(),
        KeyCode::Down | KeyCode::Char('j') => app.breakdown_mut().select_next(len),
        KeyCode::Enter | KeyCode::Char(' ') => app.breakdown_mut().toggle_selected(),
        _ => {}
    }
}
