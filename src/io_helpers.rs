use std::io;
use std::path::PathBuf;

use log::{debug, warn};
use minishell::config::ShellConfig;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, EditMode, Editor};

use crate::completion::LineHelper;

/// Where input lines come from: a line editor with history when stdin is a
/// terminal, plain reads otherwise.
pub enum LineReader {
    Editor {
        editor: Box<Editor<LineHelper, DefaultHistory>>,
        history_path: Option<PathBuf>,
    },
    Plain,
}

impl LineReader {
    pub fn new(interactive: bool, config: &ShellConfig) -> rustyline::Result<Self> {
        if !interactive {
            return Ok(LineReader::Plain);
        }
        let edit_mode = if config.vi_mode {
            EditMode::Vi
        } else {
            EditMode::Emacs
        };
        let rl_config = Config::builder()
            .auto_add_history(true)
            .edit_mode(edit_mode)
            .build();
        let mut editor = Editor::with_config(rl_config)?;
        editor.set_helper(Some(LineHelper::new()));
        if let Some(path) = &config.history_path {
            if let Err(err) = editor.load_history(path) {
                debug!("history event=load path={} error={}", path.display(), err);
            }
        }
        Ok(LineReader::Editor {
            editor: Box::new(editor),
            history_path: config.history_path.clone(),
        })
    }

    /// Next input line, or `None` at end of input. Ctrl-C at the prompt
    /// gives an empty line.
    pub fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        match self {
            LineReader::Editor { editor, .. } => match editor.readline(prompt) {
                Ok(line) => Ok(Some(line)),
                Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
                Err(ReadlineError::Eof) => Ok(None),
                Err(err) => Err(io::Error::other(err)),
            },
            LineReader::Plain => {
                let mut line = String::new();
                if io::stdin().read_line(&mut line)? == 0 {
                    return Ok(None);
                }
                Ok(Some(line))
            }
        }
    }

    pub fn save_history(&mut self) {
        if let LineReader::Editor {
            editor,
            history_path: Some(path),
        } = self
        {
            if let Err(err) = editor.save_history(path) {
                warn!("history event=save path={} error={}", path.display(), err);
            }
        }
    }
}
