//! # Interactive keyboard input
//!
//! Captures single keystrokes and translates them into loop commands sent
//! over an mpsc channel. The terminal's raw mode is held by an RAII guard
//! owned by the caller, not by the capture thread: the thread may be blocked
//! in a read when the control loop bails out, so restoring the terminal must
//! not depend on the thread unwinding.
//!
//! Commands are case sensitive: `e` enables the motors, `d` disables them and
//! `Q` (or Ctrl-C, which raw mode swallows) quits the program. Any other key
//! prints the key map.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use log::{info, warn};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A command for the control loop, entered at the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    /// Enable the motors
    Enable,

    /// Disable the motors
    Disable,

    /// Quit the program
    Quit,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Guard holding the terminal in raw, non-echoing mode.
///
/// Dropping the guard restores the terminal. The guard must outlive the
/// capture thread's usefulness, i.e. be held until the program exits.
pub struct RawModeGuard;

impl RawModeGuard {
    fn new() -> std::io::Result<Self> {
        enable_raw_mode()?;
        Ok(RawModeGuard)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        disable_raw_mode().ok();
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Spawn the keyboard capture thread.
///
/// The thread runs until a quit command is issued or the receiving side of
/// the channel is dropped. The returned guard keeps the terminal in raw mode
/// and must be held by the caller until the program exits, so the terminal is
/// restored even when the thread is still blocked in a read.
pub fn spawn(sender: Sender<KeyCommand>) -> std::io::Result<(RawModeGuard, JoinHandle<()>)> {
    let guard = RawModeGuard::new()?;

    let handle = thread::Builder::new()
        .name("key_input".into())
        .spawn(move || key_thread(sender))?;

    Ok((guard, handle))
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn key_thread(sender: Sender<KeyCommand>) {
    loop {
        let key = match event::read() {
            Ok(Event::Key(key)) => key,
            Ok(_) => continue,
            Err(e) => {
                warn!("Keyboard input error: {}", e);
                break;
            }
        };

        if key.kind != KeyEventKind::Press {
            continue;
        }

        // Raw mode swallows the interrupt signal, so Ctrl-C is handled here
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            sender.send(KeyCommand::Quit).ok();
            break;
        }

        match key.code {
            KeyCode::Char('e') => {
                if sender.send(KeyCommand::Enable).is_err() {
                    break;
                }
            }
            KeyCode::Char('d') => {
                if sender.send(KeyCommand::Disable).is_err() {
                    break;
                }
            }
            KeyCode::Char('Q') => {
                sender.send(KeyCommand::Quit).ok();
                break;
            }
            KeyCode::Char(c) => {
                info!("Unhandled key '{}' was pressed", c);
                print_key_map();
            }
            _ => (),
        }
    }
}

fn print_key_map() {
    info!("Key map:");
    info!("    Q: quit program");
    info!("    e: enable motors");
    info!("    d: disable motors");
}
