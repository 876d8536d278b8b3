use std::io::Write;

use crate::error::{ErrorKind, ShellError, ShellResult};
use crate::job_control::JobTable;

/// `jobs`: probe every background job and print one line per job.
/// Finished jobs are dropped from the table as they are listed.
pub(crate) fn list_jobs(jobs: &mut JobTable, args: &[&str], out: &mut dyn Write) -> ShellResult<()> {
    if !args.is_empty() {
        return Err(ShellError::invalid_argument("jobs"));
    }
    let mut failed = None;
    for report in jobs.probe() {
        match report.state {
            Ok(state) => writeln!(out, "[{}]+ {state}", report.id)
                .map_err(|err| ShellError::from_io(ErrorKind::Builtin, "jobs", &err))?,
            Err(err) => {
                let err = ShellError::from_errno(ErrorKind::Job, "jobs", err)
                    .with_context(format!("job {} (pid {})", report.id, report.pid));
                failed.get_or_insert(err);
            }
        }
    }
    match failed {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use std::thread;
    use std::time::{Duration, Instant};

    use nix::unistd::Pid;

    #[test]
    fn finished_job_is_listed_done_once() {
        let mut jobs = JobTable::new();
        let child = Command::new("true").spawn().unwrap();
        jobs.add(Pid::from_raw(child.id() as i32));

        let deadline = Instant::now() + Duration::from_secs(5);
        let listing = loop {
            let mut out = Vec::new();
            list_jobs(&mut jobs, &[], &mut out).unwrap();
            let listing = String::from_utf8(out).unwrap();
            if listing != "[1]+ Running\n" || Instant::now() > deadline {
                break listing;
            }
            thread::sleep(Duration::from_millis(20));
        };
        assert_eq!(listing, "[1]+ Done\n");
        assert!(jobs.is_empty());

        let mut out = Vec::new();
        list_jobs(&mut jobs, &[], &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn job_that_is_not_our_child_is_forgotten() {
        let mut jobs = JobTable::new();
        jobs.add(Pid::from_raw(1));
        let mut out = Vec::new();
        list_jobs(&mut jobs, &[], &mut out).unwrap();
        assert!(out.is_empty());
        assert!(jobs.is_empty());
        list_jobs(&mut jobs, &[], &mut out).unwrap();
    }

    #[test]
    fn arguments_are_rejected() {
        let mut jobs = JobTable::new();
        let mut out = Vec::new();
        let err = list_jobs(&mut jobs, &["%1"], &mut out).unwrap_err();
        assert_eq!(err.to_string(), "jobs: Invalid argument");
    }
}
