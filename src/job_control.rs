use std::fmt;

use log::{debug, warn};
use nix::errno::Errno;
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;

/// A statement running in the background, identified by the pid of the
/// forked shell that evaluates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Job {
    pub id: usize,
    pub pid: Pid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    Done(i32),
    Killed(i32),
    Stopped(i32),
    Continued,
}

impl JobState {
    /// Terminal states; the process has been reaped and the job is gone.
    pub fn is_finished(self) -> bool {
        matches!(self, JobState::Done(_) | JobState::Killed(_))
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Running => f.write_str("Running"),
            JobState::Done(_) => f.write_str("Done"),
            JobState::Killed(sig) => write!(f, "Killed by signal {sig}"),
            JobState::Stopped(sig) => write!(f, "Stopped by signal {sig}"),
            JobState::Continued => f.write_str("Continued"),
        }
    }
}

#[derive(Debug)]
pub struct JobReport {
    pub id: usize,
    pub pid: Pid,
    pub state: Result<JobState, Errno>,
}

/// Background jobs in insertion order. Ids start at 1 and are never reused.
#[derive(Debug, Default)]
pub struct JobTable {
    jobs: Vec<Job>,
    last_job_id: usize,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, pid: Pid) -> usize {
        self.last_job_id += 1;
        let id = self.last_job_id;
        self.jobs.push(Job { id, pid });
        debug!("job event=add id={} pid={}", id, pid);
        id
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Forget every job without waiting on it. Used by a forked child,
    /// which cannot wait on its parent's children.
    pub fn clear(&mut self) {
        self.jobs.clear();
    }

    /// Non-blocking wait on each job; returns the ids of the jobs that
    /// terminated, which are removed from the table.
    pub fn reap_finished(&mut self) -> Vec<usize> {
        let mut finished = Vec::new();
        self.jobs.retain(|job| loop {
            match waitpid(job.pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::Exited(_, code)) => {
                    debug!("job event=reap id={} pid={} code={}", job.id, job.pid, code);
                    finished.push(job.id);
                    return false;
                }
                Ok(WaitStatus::Signaled(_, sig, _)) => {
                    debug!(
                        "job event=reap id={} pid={} signal={}",
                        job.id, job.pid, sig as i32
                    );
                    finished.push(job.id);
                    return false;
                }
                Ok(_) => return true,
                Err(Errno::EINTR) => continue,
                Err(Errno::ECHILD) => {
                    warn!("job event=lost id={} pid={}", job.id, job.pid);
                    return false;
                }
                Err(err) => {
                    warn!("job event=poll id={} error={}", job.id, err);
                    return true;
                }
            }
        });
        finished
    }

    /// Classify every job with stop/continue reporting. Jobs found finished
    /// are removed, as are jobs that are no longer our children.
    pub fn probe(&mut self) -> Vec<JobReport> {
        let flags = WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED;
        let mut reports = Vec::with_capacity(self.jobs.len());
        self.jobs.retain(|job| {
            let state = loop {
                match waitpid(job.pid, Some(flags)) {
                    Ok(WaitStatus::StillAlive) => break Ok(JobState::Running),
                    Ok(WaitStatus::Exited(_, code)) => break Ok(JobState::Done(code)),
                    Ok(WaitStatus::Signaled(_, sig, _)) => break Ok(JobState::Killed(sig as i32)),
                    Ok(WaitStatus::Stopped(_, sig)) => break Ok(JobState::Stopped(sig as i32)),
                    Ok(WaitStatus::Continued(_)) => break Ok(JobState::Continued),
                    Ok(_) => break Ok(JobState::Running),
                    Err(Errno::EINTR) => continue,
                    Err(Errno::ECHILD) => {
                        warn!("job event=lost id={} pid={}", job.id, job.pid);
                        return false;
                    }
                    Err(err) => break Err(err),
                }
            };
            debug!("job event=probe id={} pid={} state={:?}", job.id, job.pid, state);
            let keep = !matches!(state, Ok(s) if s.is_finished());
            reports.push(JobReport {
                id: job.id,
                pid: job.pid,
                state,
            });
            keep
        });
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use std::thread;
    use std::time::{Duration, Instant};

    use nix::sys::signal::{Signal, kill};

    fn spawn(args: &[&str]) -> Pid {
        let child = Command::new(args[0]).args(&args[1..]).spawn().unwrap();
        Pid::from_raw(child.id() as i32)
    }

    fn probe_until(table: &mut JobTable, want: impl Fn(JobState) -> bool) -> JobState {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let reports = table.probe();
            let state = reports[0].state.unwrap();
            if want(state) || Instant::now() > deadline {
                return state;
            }
            thread::sleep(Duration::from_millis(20));
        }
    }

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let mut table = JobTable::new();
        let first = table.add(spawn(&["sh", "-c", "exit 0"]));
        let deadline = Instant::now() + Duration::from_secs(5);
        while !table.is_empty() && Instant::now() < deadline {
            table.reap_finished();
            thread::sleep(Duration::from_millis(20));
        }
        assert!(table.is_empty());
        let second = table.add(spawn(&["sh", "-c", "exit 0"]));
        assert_eq!((first, second), (1, 2));
        let deadline = Instant::now() + Duration::from_secs(5);
        while !table.is_empty() && Instant::now() < deadline {
            table.reap_finished();
            thread::sleep(Duration::from_millis(20));
        }
    }

    #[test]
    fn probe_reports_exit_and_removes_job() {
        let mut table = JobTable::new();
        table.add(spawn(&["sh", "-c", "exit 3"]));
        let state = probe_until(&mut table, JobState::is_finished);
        assert_eq!(state, JobState::Done(3));
        assert!(table.is_empty());
    }

    #[test]
    fn probe_tracks_stop_continue_and_kill() {
        let mut table = JobTable::new();
        let pid = spawn(&["sleep", "5"]);
        table.add(pid);
        assert_eq!(table.probe()[0].state, Ok(JobState::Running));

        kill(pid, Signal::SIGSTOP).unwrap();
        let state = probe_until(&mut table, |s| matches!(s, JobState::Stopped(_)));
        assert_eq!(state, JobState::Stopped(libc::SIGSTOP));
        assert_eq!(state.to_string(), format!("Stopped by signal {}", libc::SIGSTOP));

        kill(pid, Signal::SIGCONT).unwrap();
        let state = probe_until(&mut table, |s| s == JobState::Continued);
        assert_eq!(state, JobState::Continued);

        kill(pid, Signal::SIGKILL).unwrap();
        let state = probe_until(&mut table, JobState::is_finished);
        assert_eq!(state, JobState::Killed(libc::SIGKILL));
        assert!(table.is_empty());
    }

    #[test]
    fn reap_skips_running_jobs() {
        let mut table = JobTable::new();
        let pid = spawn(&["sleep", "5"]);
        table.add(pid);
        assert!(table.reap_finished().is_empty());
        assert_eq!(table.len(), 1);
        kill(pid, Signal::SIGKILL).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut reaped = Vec::new();
        while reaped.is_empty() && Instant::now() < deadline {
            reaped = table.reap_finished();
            thread::sleep(Duration::from_millis(20));
        }
        assert_eq!(reaped, vec![1]);
    }

    #[test]
    fn foreign_pid_is_dropped() {
        let mut table = JobTable::new();
        table.add(Pid::from_raw(1));
        assert!(table.reap_finished().is_empty());
        assert!(table.is_empty());
    }

    #[test]
    fn probe_drops_foreign_pid_without_reporting() {
        let mut table = JobTable::new();
        table.add(Pid::from_raw(1));
        assert!(table.probe().is_empty());
        assert!(table.is_empty());
        assert!(table.probe().is_empty());
    }
}
