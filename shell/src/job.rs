use std::fmt;

use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::sys::wait::{self, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum State { Running, Completed }

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Status {
	Running,
	Exited(i32),
	Signaled(Signal),
	/// The process could no longer be waited for.
	Lost,
}

impl Status {
	pub fn state(self) -> State {
		match self {
			Status::Running => State::Running,
			_ => State::Completed,
		}
	}

	/// Shell-style exit code: the exit status, or 128 plus the signal number.
	pub fn code(self) -> i32 {
		match self {
			Status::Running | Status::Lost => 0,
			Status::Exited(code) => code,
			Status::Signaled(sig) => 128 + sig as i32,
		}
	}
}

trait WaitStatusExt {
	fn status(self) -> Option<Status>;
}

impl WaitStatusExt for WaitStatus {
	/// `None` for anything that isn't termination.
	fn status(self) -> Option<Status> {
		match self {
			WaitStatus::Exited(_, code) => Some(Status::Exited(code)),
			WaitStatus::Signaled(_, sig, _) => Some(Status::Signaled(sig)),
			_ => None,
		}
	}
}

/// Calls `f` again as long as it fails with `EINTR`.
pub fn retry<T, F>(mut f: F) -> nix::Result<T> where F: FnMut() -> nix::Result<T> {
	loop {
		match f() {
			Err(Errno::EINTR) => (),
			result => return result,
		}
	}
}

/// Blocks until `pid` terminates and reaps it.
pub fn wait_for(pid: Pid) -> nix::Result<Status> {
	loop {
		match retry(|| wait::waitpid(pid, None)) {
			Ok(ws) => if let Some(status) = ws.status() {
				return Ok(status);
			},
			Err(Errno::ECHILD) => return Ok(Status::Lost),
			Err(e) => return Err(e),
		}
	}
}

/// Reaps `pid` if it has terminated, without blocking.
fn poll(pid: Pid) -> Status {
	match retry(|| wait::waitpid(pid, Some(WaitPidFlag::WNOHANG))) {
		Ok(ws) => ws.status().unwrap_or(Status::Running),
		Err(_) => Status::Lost,
	}
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Process {
	pub pid: Pid,
	pub status: Status,
}

/// The processes of one pipeline, in spawn order.
#[derive(Debug)]
pub struct Job {
	pub processes: Vec<Process>,
	pub is_background: bool,
	pub command: String,
}

impl Job {
	pub fn new(pids: &[Pid], is_background: bool, command: String) -> Job {
		let processes = pids.iter().map(|&pid| Process { pid: pid, status: Status::Running }).collect();
		Job { processes: processes, is_background: is_background, command: command }
	}

	pub fn state(&self) -> State {
		self.processes.iter().map(|pr| pr.status.state()).min().unwrap_or(State::Completed)
	}

	/// Status of the last stage, which is the status of the pipeline.
	pub fn status(&self) -> Status {
		self.processes.last().map_or(Status::Lost, |pr| pr.status)
	}

	pub fn last_pid(&self) -> Option<Pid> {
		self.processes.last().map(|pr| pr.pid)
	}

	/// Waits for every process in spawn order.
	pub fn wait(&mut self) -> nix::Result<Status> {
		for pr in self.processes.iter_mut().filter(|pr| pr.status == Status::Running) {
			pr.status = wait_for(pr.pid)?;
		}
		Ok(self.status())
	}

	/// Reaps whatever has terminated so far.
	pub fn poll(&mut self) -> State {
		for pr in self.processes.iter_mut().filter(|pr| pr.status == Status::Running) {
			pr.status = poll(pr.pid);
		}
		self.state()
	}
}

/// A finished background job, ready to be announced.
#[derive(Debug)]
pub struct Report {
	pub number: usize,
	pub job: Job,
}

impl fmt::Display for Report {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self.job.status() {
			Status::Exited(code) if code != 0 => write!(f, "[{}] Exit {} {}", self.number, code, self.job.command),
			Status::Signaled(sig) => write!(f, "[{}] Killed by {} {}", self.number, sig.as_str(), self.job.command),
			_ => write!(f, "[{}] Done {}", self.number, self.job.command),
		}
	}
}

/// Background jobs, numbered from 1. A number is reused once its job is
/// reported.
#[derive(Debug, Default)]
pub struct JobSet {
	jobs: Vec<Option<Job>>,
}

impl JobSet {
	pub fn new() -> JobSet {
		JobSet::default()
	}

	pub fn push(&mut self, job: Job) -> usize {
		let job_idx = match self.jobs.iter().position(|o| o.is_none()) {
			Some(i) => {
				self.jobs[i] = Some(job);
				i
			},
			None => {
				self.jobs.push(Some(job));
				self.jobs.len() - 1
			},
		};
		job_idx + 1
	}

	pub fn get(&self, number: usize) -> Option<&Job> {
		number.checked_sub(1).and_then(|i| self.jobs.get(i)).and_then(|o| o.as_ref())
	}

	pub fn len(&self) -> usize {
		self.jobs.iter().filter(|o| o.is_some()).count()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Reaps terminated processes of every job without blocking. Nothing is
	/// announced; finished jobs wait in their slots for `reap`.
	pub fn collect(&mut self) {
		for job in self.jobs.iter_mut().flatten() {
			job.poll();
		}
	}

	/// Whether some job has finished but not been reported yet.
	pub fn has_completed(&self) -> bool {
		self.jobs.iter().flatten().any(|job| job.state() == State::Completed)
	}

	/// Polls every job without blocking and takes out the ones that have
	/// completed. Each job is returned by exactly one call.
	pub fn reap(&mut self) -> Vec<Report> {
		self.collect();
		let mut reports = vec![];
		for (i, slot) in self.jobs.iter_mut().enumerate() {
			let completed = slot.as_ref().map_or(false, |job| job.state() == State::Completed);
			if completed {
				if let Some(job) = slot.take() {
					reports.push(Report { number: i + 1, job: job });
				}
			}
		}
		let len = self.jobs.iter().rposition(|o| o.is_some()).map_or(0, |i| i + 1);
		self.jobs.truncate(len);
		reports
	}
}
