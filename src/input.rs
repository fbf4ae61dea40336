//! Purpose: Line-oriented input handling for the console transcript.
//! Exports: `ReadLine`, `read_bounded_line`, `split_input`, `DEFAULT_MAX_LINE`.
//! Role: Enforce the input size policy and split command lines.
//! Invariants: No line longer than the configured limit is ever buffered in full.
//! Invariants: An over-long line is drained up to and including its newline.
use std::io::{self, BufRead};

pub const DEFAULT_MAX_LINE: usize = 4096;

const DELIMITERS: [char; 3] = [' ', '\t', '\n'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadLine {
    /// One line without its terminator.
    Line(String),
    /// The line exceeded the limit and was discarded.
    TooLong,
    Eof,
}

/// Reads one line of at most `limit` bytes (terminator excluded).
///
/// A trailing `\r` is dropped along with the newline. Invalid UTF-8 is
/// replaced rather than rejected.
pub fn read_bounded_line<R: BufRead + ?Sized>(reader: &mut R, limit: usize) -> io::Result<ReadLine> {
    let mut line = Vec::new();
    let mut seen_any = false;
    let mut overflow = false;

    loop {
        let available = match reader.fill_buf() {
            Ok(available) => available,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        if available.is_empty() {
            break;
        }
        seen_any = true;

        let (chunk, used, done) = match available.iter().position(|&b| b == b'\n') {
            Some(index) => (&available[..index], index + 1, true),
            None => (available, available.len(), false),
        };
        if !overflow {
            // One spare byte for a `\r` that is stripped below.
            if line.len() + chunk.len() > limit.saturating_add(1) {
                overflow = true;
                line.clear();
            } else {
                line.extend_from_slice(chunk);
            }
        }
        reader.consume(used);
        if done {
            break;
        }
    }

    if !seen_any {
        return Ok(ReadLine::Eof);
    }
    if overflow {
        return Ok(ReadLine::TooLong);
    }
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    if line.len() > limit {
        return Ok(ReadLine::TooLong);
    }
    Ok(ReadLine::Line(String::from_utf8_lossy(&line).into_owned()))
}

/// Splits a command line into the command token and its parameter.
///
/// The command ends at the first space, tab, or newline. Delimiters
/// before the parameter and the line terminator are discarded; trailing
/// spaces are kept so a prompt such as `$ ` survives.
pub fn split_input(line: &str) -> (&str, &str) {
    let line = line.strip_suffix('\n').unwrap_or(line);
    match line.find(DELIMITERS) {
        Some(index) => {
            let command = &line[..index];
            let param = line[index + 1..].trim_start_matches(DELIMITERS);
            (command, param)
        }
        None => (line, ""),
    }
}

pub fn is_exit_command(command: &str) -> bool {
    command == "exit" || command == "quit"
}
