use std::io;
use std::os::unix::process::CommandExt;
use std::process::Command;

use log::debug;
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};

/// Signals the shell itself ignores so that Ctrl-C, Ctrl-Z and Ctrl-\ only
/// reach the foreground program.
pub const SHELL_IGNORED_SIGNALS: [Signal; 3] = [Signal::SIGINT, Signal::SIGTSTP, Signal::SIGQUIT];

pub fn install_signal_handlers() -> io::Result<()> {
    let action = SigAction::new(SigHandler::SigIgn, SaFlags::SA_RESTART, SigSet::empty());
    for &sig in &SHELL_IGNORED_SIGNALS {
        install_action(sig, &action)?;
    }
    debug!("signal event=install mode=ignore");
    Ok(())
}

/// Put the default disposition back on every signal the shell ignores.
/// Runs in forked children, so it only calls `sigaction`.
pub fn reset_ignored_signals() -> io::Result<()> {
    let action = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    for &sig in &SHELL_IGNORED_SIGNALS {
        install_action(sig, &action)?;
    }
    Ok(())
}

pub fn restore_default_signals(command: &mut Command) {
    unsafe {
        command.pre_exec(reset_ignored_signals);
    }
}

fn install_action(signal: Signal, action: &SigAction) -> io::Result<()> {
    unsafe { sigaction(signal, action) }
        .map(|_| ())
        .map_err(|err| io::Error::from_raw_os_error(err as i32))
}
