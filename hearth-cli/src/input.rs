use std::io::{self, BufRead, Write};
use std::thread::{self, JoinHandle};

use hearth_peripherals::control::Command;
use tokio::sync::mpsc;

pub const CONTROLS: &str = "Controls: [1] Toggle mode  [2] Temp +  [3] Temp -  [q] Quit";

const PROMPT: &str = "\nPress a button (1/2/3/q): ";

/// Reads commands from stdin on a plain thread, so a pending read never holds
/// up runtime shutdown.
pub fn spawn_stdin_reader(command_sender: mpsc::Sender<Command>) -> JoinHandle<()> {
    thread::spawn(move || read_commands(io::stdin().lock(), io::stdout(), &command_sender))
}

fn prompt<W: Write>(console: &mut W, text: &str) {
    if let Err(e) = write!(console, "{}", text).and_then(|_| console.flush()) {
        debug!("could not write prompt: {}", e);
    }
}

/// Forwards one command per recognised line, prompting on `console` before
/// each read. End of input counts as quit.
pub fn read_commands<R: BufRead, W: Write>(
    input: R,
    mut console: W,
    command_sender: &mpsc::Sender<Command>,
) {
    let mut lines = input.lines();
    loop {
        prompt(&mut console, PROMPT);
        let line = match lines.next() {
            Some(line) => line,
            None => break,
        };
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("could not read input: {}", e);
                break;
            }
        };
        match line.parse::<Command>() {
            Ok(command) => {
                if command_sender.blocking_send(command).is_err() {
                    info!("command receiver closed");
                    return;
                }
                if command == Command::Quit {
                    return;
                }
            }
            Err(e) => {
                if line.trim().is_empty() {
                    trace!("{}", e);
                } else {
                    info!("{}, continuing", e);
                }
                prompt(&mut console, "[NO INPUT] Continuing...\n");
            }
        }
    }
    info!("input closed");
    if command_sender.blocking_send(Command::Quit).is_err() {
        trace!("command receiver already closed");
    }
}
