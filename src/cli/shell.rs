//! Interactive mode: one box stays open while commands are typed.
//!
//! A reader thread feeds stdin lines into a channel and waits for an ack
//! before prompting again, so a running command can still prompt on the
//! terminal. The loop ends on quit, end of input, Ctrl-C or inactivity.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

use cryptex::Session;

use super::{Cli, Commands, commands};

const PROMPT: &str = "cryptex> ";

enum Event {
    Line(String),
    Eof,
    Interrupt,
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub fn run(
    session: &mut Session,
    box_name: Option<&str>,
    timeout: Duration,
    verbose: bool,
) -> Result<()> {
    let name = session.open(box_name)?.secret_box().name().to_string();
    println!("Box '{name}' is ready, type 'help' for commands and 'quit' to leave.");

    let (events, incoming) = mpsc::channel();
    let (ack, acks) = mpsc::channel();

    let interrupt = events.clone();
    ctrlc::set_handler(move || {
        let _ = interrupt.send(Event::Interrupt);
    })
    .context("failed to install the Ctrl-C handler")?;

    thread::spawn(move || read_lines(events, acks));

    match drive(session, &incoming, &ack, timeout, verbose) {
        Ending::Interrupted => println!(),
        Ending::TimedOut => {
            println!();
            println!("no input for {} seconds, closing the box", timeout.as_secs());
        }
        Ending::Quit | Ending::EndOfInput => {}
    }
    println!("Bye!");
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Ending {
    Quit,
    EndOfInput,
    Interrupted,
    TimedOut,
}

/// Runs commands from `incoming` until the shell ends, acking each line.
/// The session cache is cleared whatever the ending.
fn drive(
    session: &mut Session,
    incoming: &Receiver<Event>,
    ack: &Sender<()>,
    timeout: Duration,
    verbose: bool,
) -> Ending {
    let ending = loop {
        match incoming.recv_timeout(timeout) {
            Ok(Event::Line(line)) => {
                if handle_line(session, &line, verbose) == Flow::Quit {
                    break Ending::Quit;
                }
                if ack.send(()).is_err() {
                    break Ending::EndOfInput;
                }
            }
            Ok(Event::Eof) | Err(RecvTimeoutError::Disconnected) => break Ending::EndOfInput,
            Ok(Event::Interrupt) => {
                info!("interrupted");
                break Ending::Interrupted;
            }
            Err(RecvTimeoutError::Timeout) => {
                info!(seconds = timeout.as_secs(), "idle timeout");
                break Ending::TimedOut;
            }
        }
    };

    session.clear();
    ending
}

fn read_lines(events: Sender<Event>, acks: Receiver<()>) {
    let stdin = io::stdin();
    loop {
        print!("{PROMPT}");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => {
                let _ = events.send(Event::Eof);
                return;
            }
            Ok(_) => {}
        }

        if events.send(Event::Line(line.trim().to_string())).is_err() {
            return;
        }
        if acks.recv().is_err() {
            return;
        }
    }
}

fn handle_line(session: &mut Session, line: &str, verbose: bool) -> Flow {
    match line {
        "" => return Flow::Continue,
        "quit" | "q" | "exit" | "bye" => return Flow::Quit,
        "clear" | "cl" => {
            print!("\x1b[2J\x1b[H");
            let _ = io::stdout().flush();
            return Flow::Continue;
        }
        _ => {}
    }

    let args = std::iter::once("cryptex").chain(line.split_whitespace());
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return Flow::Continue;
        }
    };

    if let Commands::Open { .. } = cli.command {
        eprintln!("warning: a box is already open, quit first to open another one");
        return Flow::Continue;
    }

    debug!(command = line.split_whitespace().next(), "shell command");
    if let Err(e) = commands::run(cli.command, session, verbose || cli.verbose) {
        eprintln!("error: {e:#}");
    }
    Flow::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryptex::{BoxStore, Config, Fixed};
    use tempfile::{TempDir, tempdir};

    fn open_session() -> (TempDir, Session) {
        let dir = tempdir().unwrap();
        let store = BoxStore::with_dir(dir.path().to_path_buf(), Config::default());
        store.create("test", "me", "secret1").unwrap();
        let mut session = Session::new(store, Box::new(Fixed::new("secret1")));
        session.open(Some("test")).unwrap();
        (dir, session)
    }

    #[test]
    fn idle_shell_times_out_and_forgets_box() {
        let (_dir, mut session) = open_session();
        let (_events, incoming) = mpsc::channel::<Event>();
        let (ack, _acks) = mpsc::channel();

        let ending = drive(&mut session, &incoming, &ack, Duration::from_millis(20), false);
        assert_eq!(ending, Ending::TimedOut);
        assert!(session.current().is_none());
    }

    #[test]
    fn interrupt_ends_shell_and_forgets_box() {
        let (_dir, mut session) = open_session();
        let (events, incoming) = mpsc::channel();
        let (ack, _acks) = mpsc::channel();
        events.send(Event::Interrupt).unwrap();

        let ending = drive(&mut session, &incoming, &ack, Duration::from_secs(5), false);
        assert_eq!(ending, Ending::Interrupted);
        assert!(session.current().is_none());
    }

    #[test]
    fn commands_are_acked_until_quit() {
        let (_dir, mut session) = open_session();
        let (events, incoming) = mpsc::channel();
        let (ack, acks) = mpsc::channel();
        events.send(Event::Line("list secrets".into())).unwrap();
        events.send(Event::Line(String::new())).unwrap();
        events.send(Event::Line("quit".into())).unwrap();

        let ending = drive(&mut session, &incoming, &ack, Duration::from_secs(5), false);
        assert_eq!(ending, Ending::Quit);
        assert_eq!(acks.try_iter().count(), 2);
        assert!(session.current().is_none());
    }

    #[test]
    fn closed_input_ends_shell() {
        let (_dir, mut session) = open_session();
        let (events, incoming) = mpsc::channel::<Event>();
        let (ack, _acks) = mpsc::channel();
        drop(events);

        let ending = drive(&mut session, &incoming, &ack, Duration::from_secs(5), false);
        assert_eq!(ending, Ending::EndOfInput);
        assert!(session.current().is_none());
    }
}
