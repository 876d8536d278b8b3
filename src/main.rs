use std::env;
use std::io;
use std::process;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use log::debug;
use minishell::config::{ShellConfig, build_prompt};
use minishell::debug::{format_ast, format_tokens};
use minishell::signals::install_signal_handlers;
use minishell::{Evaluator, ShellExit, parse_line};
use signal_hook::consts::signal::SIGCHLD;
use signal_hook::flag;

mod completion;
mod io_helpers;

use io_helpers::LineReader;

struct ShellState {
    reader: LineReader,
    evaluator: Evaluator,
    config: ShellConfig,
    sigchld_flag: Arc<AtomicBool>,
    last_status: i32,
    interactive: bool,
    trace: bool,
}

fn main() {
    init_logging();
    let trace = env::args().skip(1).any(|arg| arg == "-x");
    let interactive = unsafe { libc::isatty(libc::STDIN_FILENO) == 1 };
    if let Err(err) = install_signal_handlers() {
        eprintln!("error: {err}");
        return;
    }
    let config = ShellConfig::load();
    let reader = match LineReader::new(interactive, &config) {
        Ok(reader) => reader,
        Err(err) => {
            eprintln!("error: {err}");
            return;
        }
    };
    let sigchld_flag = Arc::new(AtomicBool::new(false));
    if let Err(err) = flag::register(SIGCHLD, Arc::clone(&sigchld_flag)) {
        eprintln!("error: {err}");
        return;
    }
    debug!("shell event=start interactive={} trace={}", interactive, trace);

    let mut state = ShellState {
        reader,
        evaluator: Evaluator::new(),
        config,
        sigchld_flag,
        last_status: 0,
        interactive,
        trace,
    };
    let code = loop {
        match run_once(&mut state) {
            Ok(Some(code)) => break code,
            Ok(None) => {}
            Err(err) => eprintln!("error: {err}"),
        }
    };
    state.reader.save_history();
    debug!("shell event=exit code={}", code);
    process::exit(code);
}

fn init_logging() {
    let env = env_logger::Env::default().filter_or("MINISHELL_LOG", "info");
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init();
}

/// Read and evaluate one line. Returns the exit code once the session is
/// over.
fn run_once(state: &mut ShellState) -> io::Result<Option<i32>> {
    if state.sigchld_flag.swap(false, Ordering::SeqCst) {
        state.evaluator.poll_background_jobs();
    }
    let cwd = env::current_dir().unwrap_or_else(|_| "/".into());
    let prompt = build_prompt(
        state.interactive,
        state.config.prompt_template.as_deref(),
        state.last_status,
        &cwd,
    );

    let Some(line) = state.reader.read_line(&prompt)? else {
        if state.interactive {
            println!();
        }
        return Ok(Some(0));
    };
    let line = line.trim();
    if line.is_empty() {
        state.evaluator.poll_background_jobs();
        return Ok(None);
    }

    if state.trace {
        for token in format_tokens(line) {
            eprintln!("trace: {token}");
        }
    }
    let ast = parse_line(line);
    if state.trace {
        for node in format_ast(&ast).lines() {
            eprintln!("trace: {node}");
        }
    }

    match state.evaluator.run(&ast) {
        Ok(status) => {
            state.last_status = status;
            Ok(None)
        }
        Err(ShellExit(code)) => Ok(Some(code)),
    }
}
