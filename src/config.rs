use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{ErrorKind, ShellError, ShellResult};

pub const RC_FILE: &str = ".minishellrc";
pub const HISTORY_FILE: &str = ".minishell_history";

/// Settings read at startup from `~/.minishellrc` and the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellConfig {
    pub prompt_template: Option<String>,
    pub history_path: Option<PathBuf>,
    pub vi_mode: bool,
}

impl ShellConfig {
    /// Apply the rc file, then the environment (which the rc file may have
    /// just extended with `export`).
    pub fn load() -> Self {
        let mut cfg = Self::default();
        if let Some(home) = env::var_os("HOME") {
            if let Err(err) = load_config(&Path::new(&home).join(RC_FILE), &mut cfg) {
                err.report();
            }
        }
        cfg.apply_env();
        cfg
    }

    pub fn apply_env(&mut self) {
        if let Ok(mode) = env::var("MINISHELL_EDITMODE") {
            self.vi_mode = mode.trim().eq_ignore_ascii_case("vi");
        }
        self.history_path = match env::var_os("MINISHELL_HISTORY") {
            Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
            _ => env::var_os("HOME").map(|home| Path::new(&home).join(HISTORY_FILE)),
        };
    }
}

/// Read an rc file into `cfg`. A missing file is not an error; bad lines
/// are reported and skipped.
pub fn load_config(path: &Path, cfg: &mut ShellConfig) -> ShellResult<()> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => {
            return Err(ShellError::from_io(
                ErrorKind::Config,
                &path.display().to_string(),
                &err,
            ));
        }
    };
    debug!("config event=load path={}", path.display());
    for err in parse_config(&content, cfg) {
        err.report();
    }
    Ok(())
}

pub fn parse_config(content: &str, cfg: &mut ShellConfig) -> Vec<ShellError> {
    let mut errors = Vec::new();
    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let result = if let Some(rest) = line.strip_prefix("export ") {
            parse_assignment(rest)
        } else if let Some((key, value)) = line.split_once('=') {
            if key.trim().eq_ignore_ascii_case("prompt") {
                cfg.prompt_template = Some(strip_quotes(value.trim()).to_string());
                Ok(())
            } else {
                parse_assignment(line)
            }
        } else {
            Err("unrecognized directive".to_string())
        };
        if let Err(message) = result {
            errors.push(ShellError::new(
                ErrorKind::Config,
                format!("config:{}: {message}", idx + 1),
            ));
        }
    }
    errors
}

fn parse_assignment(input: &str) -> Result<(), String> {
    let (name, value) = input
        .trim()
        .split_once('=')
        .ok_or_else(|| "assignment missing '='".to_string())?;
    let name = name.trim();
    if !is_valid_var_name(name) {
        return Err(format!("invalid variable name '{name}'"));
    }
    env::set_var(name, strip_quotes(value.trim()));
    Ok(())
}

pub fn is_valid_var_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_ascii_alphabetic() => {
            chars.all(|ch| ch == '_' || ch.is_ascii_alphanumeric())
        }
        _ => false,
    }
}

fn strip_quotes(input: &str) -> &str {
    let bytes = input.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if first == last && (first == b'"' || first == b'\'') {
            return &input[1..bytes.len() - 1];
        }
    }
    input
}

/// Prompt for the next line. Empty when input is not a terminal.
pub fn build_prompt(
    interactive: bool,
    template: Option<&str>,
    last_status: i32,
    cwd: &Path,
) -> String {
    if !interactive {
        return String::new();
    }
    match template {
        Some(template) => {
            let status = last_status.to_string();
            let status_opt = if last_status == 0 { "" } else { &status };
            template
                .replace("{status?}", status_opt)
                .replace("{status}", &status)
                .replace("{cwd}", &cwd.display().to_string())
        }
        None if last_status == 0 => format!("{} $ ", cwd.display()),
        None => format!("[{}] {} $ ", last_status, cwd.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::tempdir;

    #[test]
    fn default_prompt_shows_failures() {
        let cwd = Path::new("/tmp");
        assert_eq!(build_prompt(true, None, 0, cwd), "/tmp $ ");
        assert_eq!(build_prompt(true, None, 2, cwd), "[2] /tmp $ ");
        assert_eq!(build_prompt(false, None, 2, cwd), "");
    }

    #[test]
    fn template_placeholders() {
        let cwd = Path::new("/srv");
        let template = Some("{status?}|{status} {cwd}> ");
        assert_eq!(build_prompt(true, template, 0, cwd), "|0 /srv> ");
        assert_eq!(build_prompt(true, template, 1, cwd), "1|1 /srv> ");
    }

    #[test]
    fn var_names() {
        assert!(is_valid_var_name("_A1"));
        assert!(is_valid_var_name("path"));
        assert!(!is_valid_var_name("1A"));
        assert!(!is_valid_var_name("A-B"));
        assert!(!is_valid_var_name(""));
    }

    #[test]
    #[serial]
    fn rc_lines_set_prompt_and_environment() {
        let mut cfg = ShellConfig::default();
        let content = "# comment\n\nprompt='> '\nexport MINISHELL_TEST_A=\"one two\"\nMINISHELL_TEST_B=2\n";
        let errors = parse_config(content, &mut cfg);
        assert!(errors.is_empty());
        assert_eq!(cfg.prompt_template.as_deref(), Some("> "));
        assert_eq!(env::var("MINISHELL_TEST_A").unwrap(), "one two");
        assert_eq!(env::var("MINISHELL_TEST_B").unwrap(), "2");
        env::remove_var("MINISHELL_TEST_A");
        env::remove_var("MINISHELL_TEST_B");
    }

    #[test]
    fn bad_lines_are_numbered() {
        let mut cfg = ShellConfig::default();
        let errors = parse_config("prompt=x\nbogus\n1BAD=3\n", &mut cfg);
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        assert_eq!(
            messages,
            vec![
                "config:2: unrecognized directive",
                "config:3: invalid variable name '1BAD'",
            ]
        );
        assert_eq!(cfg.prompt_template.as_deref(), Some("x"));
    }

    #[test]
    fn missing_rc_file_is_fine() {
        let dir = tempdir().unwrap();
        let mut cfg = ShellConfig::default();
        load_config(&dir.path().join(RC_FILE), &mut cfg).unwrap();
        assert_eq!(cfg, ShellConfig::default());
    }

    #[test]
    #[serial]
    fn environment_selects_edit_mode_and_history() {
        env::set_var("MINISHELL_EDITMODE", "vi");
        env::set_var("MINISHELL_HISTORY", "/tmp/minishell-test-history");
        let mut cfg = ShellConfig::default();
        cfg.apply_env();
        env::remove_var("MINISHELL_EDITMODE");
        env::remove_var("MINISHELL_HISTORY");
        assert!(cfg.vi_mode);
        assert_eq!(
            cfg.history_path,
            Some(PathBuf::from("/tmp/minishell-test-history"))
        );
    }
}
