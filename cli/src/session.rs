//! Line-oriented interactive session over a [`RootView`].
//!
//! Each input line is one command. A field name followed by text sets that
//! field; a field name alone clears it. Everything else is a verb.

use std::io::{self, BufRead, Write};
use std::str::FromStr;

use nutrient_core::{render_view, FormError, FormField, RootView, Transport};
use thiserror::Error;
use tracing::debug;

pub const HELP: &str = "\
Commands:
  <field> <value>   set a field (ndvi, chlorophyll, latitude, longitude,
                    day_of_year, field_id, notes)
  <field>           clear a field
  submit            validate and request a prediction
  retry             check the backend connection again
  show              redraw the screen
  reset, clear      clear every field
  help              show this list
  quit              leave the session
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Set(FormField, String),
    Clear(FormField),
    Submit,
    Retry,
    Show,
    Reset,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command or field '{0}'")]
    Unknown(String),
}

impl FromStr for SessionCommand {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };
        if head.is_empty() {
            return Err(ParseCommandError::Empty);
        }
        let verb = match head.to_ascii_lowercase().as_str() {
            "submit" | "predict" => Some(SessionCommand::Submit),
            "retry" => Some(SessionCommand::Retry),
            "show" => Some(SessionCommand::Show),
            "reset" | "clear" => Some(SessionCommand::Reset),
            "help" | "?" => Some(SessionCommand::Help),
            "quit" | "exit" => Some(SessionCommand::Quit),
            _ => None,
        };
        if let Some(verb) = verb {
            return Ok(verb);
        }
        let field = head
            .parse::<FormField>()
            .map_err(|_| ParseCommandError::Unknown(head.to_string()))?;
        if rest.is_empty() {
            Ok(SessionCommand::Clear(field))
        } else {
            Ok(SessionCommand::Set(field, rest.to_string()))
        }
    }
}

/// Mount the view, then read commands until `quit` or end of input.
pub fn run_session<T, R, W>(view: &mut RootView<T>, input: R, mut output: W) -> io::Result<()>
where
    T: Transport,
    R: BufRead,
    W: Write,
{
    view.mount();
    write!(output, "{}", render_view(view))?;
    writeln!(output, "Type 'help' for commands.")?;

    let mut lines = input.lines();
    loop {
        write!(output, "> ")?;
        output.flush()?;
        let Some(line) = lines.next().transpose()? else {
            writeln!(output)?;
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<SessionCommand>() {
            Ok(command) => command,
            Err(e) => {
                writeln!(output, "! {e}. Type 'help' for commands.")?;
                continue;
            }
        };
        debug!(?command, "session command");
        match command {
            SessionCommand::Set(field, value) => view.form_mut().set_field(field, value),
            SessionCommand::Clear(field) => view.form_mut().clear_field(field),
            SessionCommand::Submit => {
                // The outcome is already reflected in the view and the form.
                if let Err(FormError::Busy) = view.submit() {
                    writeln!(output, "! a submission is already in progress")?;
                }
                write!(output, "{}", render_view(view))?;
            }
            SessionCommand::Retry => {
                view.retry();
                write!(output, "{}", render_view(view))?;
            }
            SessionCommand::Show => write!(output, "{}", render_view(view))?,
            SessionCommand::Reset => view.form_mut().reset(),
            SessionCommand::Help => write!(output, "{HELP}")?,
            SessionCommand::Quit => break,
        }
    }
    Ok(())
}
