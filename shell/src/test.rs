use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use std::thread::sleep;
use std::time::{Duration, Instant};

use assert_matches::assert_matches;
use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitPidFlag};
use tempfile::TempDir;

use crate::config::Config;
use crate::error::{EvalError, ParseError};
use crate::eval;
use crate::global::{Signals, State};
use crate::job::Status;

static SERIAL: Mutex<()> = Mutex::new(());

/// Taken by every test that forks, so children and open descriptors of one
/// test never show up in another.
pub fn serial() -> MutexGuard<'static, ()> {
	SERIAL.lock().unwrap_or_else(|e| e.into_inner())
}

struct Fixture {
	_guard: MutexGuard<'static, ()>,
	dir: TempDir,
	state: State,
}

impl Fixture {
	fn new() -> Fixture {
		Fixture::with_direct(&["fake_builtin"])
	}

	fn with_direct(names: &[&str]) -> Fixture {
		let guard = serial();
		let direct = names.iter().map(|n| n.to_string()).collect();
		let config = Config { direct: direct, ..Config::default() };
		Fixture { _guard: guard, dir: TempDir::new().unwrap(), state: State::new(config, Signals::default()) }
	}

	fn path(&self, name: &str) -> PathBuf {
		self.dir.path().join(name)
	}

	/// Runs `line` with `@` replaced by the scratch directory.
	fn eval(&mut self, line: &str) -> Result<i32, EvalError> {
		let line = line.replace('@', self.dir.path().to_str().unwrap());
		eval::eval_line(&mut self.state, line.as_bytes())
	}

	fn read(&self, name: &str) -> String {
		fs::read_to_string(self.path(name)).unwrap()
	}
}

fn open_pipes() -> HashSet<PathBuf> {
	fs::read_dir("/proc/self/fd").unwrap()
		.filter_map(|entry| fs::read_link(entry.ok()?.path()).ok())
		.filter(|link| link.to_string_lossy().starts_with("pipe:"))
		.collect()
}

fn wait_until<F>(mut f: F) -> bool where F: FnMut() -> bool {
	let deadline = Instant::now() + Duration::from_secs(10);
	while Instant::now() < deadline {
		if f() {
			return true;
		}
		sleep(Duration::from_millis(20));
	}
	false
}

#[test]
fn pipeline_output_reaches_last_stage() {
	let mut t = Fixture::new();
	assert_eq!(t.eval("echo hello world | wc -w > @/count").unwrap(), 0);
	assert_eq!(t.read("count").trim(), "2");
}

#[test]
fn three_stage_pipeline() {
	let mut t = Fixture::new();
	t.eval("printf b\\na\\nb\\n > @/in").unwrap();
	assert_eq!(t.eval("cat @/in | sort | uniq -c > @/out").unwrap(), 0);
	let out = t.read("out");
	let lines: Vec<_> = out.lines().map(|l| l.split_whitespace().collect::<Vec<_>>()).collect();
	assert_eq!(lines, [["1", "a"], ["2", "b"]]);
}

#[test]
fn output_redirect_truncates() {
	let mut t = Fixture::new();
	fs::write(t.path("out.txt"), "previous contents").unwrap();
	assert_eq!(t.eval("printf A > @/out.txt").unwrap(), 0);
	assert_eq!(t.read("out.txt"), "A");
}

#[test]
fn fd1_and_stderr_redirects() {
	let mut t = Fixture::new();
	t.eval("ls @/missing 1> @/out 2> @/err").unwrap();
	assert_eq!(t.read("out"), "");
	assert!(t.read("err").contains("missing"));
}

#[test]
fn combined_redirect_collects_both_streams() {
	let mut t = Fixture::new();
	fs::write(t.path("present"), "").unwrap();
	t.eval("ls @/present @/absent &> @/all").unwrap();
	let all = t.read("all");
	assert!(all.contains("present"));
	assert!(all.contains("absent"));
}

#[test]
fn input_redirect() {
	let mut t = Fixture::new();
	fs::write(t.path("in"), "one two three\n").unwrap();
	t.eval("wc -w < @/in > @/out").unwrap();
	assert_eq!(t.read("out").trim(), "3");
}

#[test]
fn redirect_overrides_pipe_on_last_stage() {
	let mut t = Fixture::new();
	t.eval("echo piped | cat > @/out").unwrap();
	assert_eq!(t.read("out"), "piped\n");
}

#[test]
fn redirect_overrides_pipe_on_first_stage() {
	let mut t = Fixture::new();
	assert_eq!(t.eval("echo diverted > @/out | wc -c > @/count").unwrap(), 0);
	assert_eq!(t.read("out"), "diverted\n");
	assert_eq!(t.read("count").trim(), "0");
}

#[test]
fn missing_input_file_exits_1_without_running_program() {
	let mut t = Fixture::new();
	assert_eq!(t.eval("cat < @/missing_file.txt 2> @/err").unwrap(), 1);
	assert!(t.read("err").contains("missing_file.txt"));
}

#[test]
fn unwritable_output_files() {
	let mut t = Fixture::new();
	assert_eq!(t.eval("echo x > @/no/such/dir").unwrap(), 2);
	assert_eq!(t.eval("echo x 2> @/no/such/dir").unwrap(), 3);
	assert_eq!(t.eval("echo x &> @/no/such/dir").unwrap(), 3);
}

#[test]
fn unknown_program_exits_127() {
	let mut t = Fixture::new();
	assert_eq!(t.eval("no_such_program_for_pish 2> @/err").unwrap(), 127);
	assert!(t.read("err").contains("no_such_program_for_pish"));
	assert_eq!(t.eval("true").unwrap(), 0);
}

#[test]
fn builtins_are_not_searched() {
	let mut t = Fixture::new();
	// `fake_builtin` is not a file in the working directory.
	assert_eq!(t.eval("fake_builtin 2> @/err").unwrap(), 127);
	fs::write(t.path("not_executable"), "").unwrap();
	assert_eq!(t.eval("@/not_executable 2> @/err").unwrap(), 126);
}

#[test]
fn builtins_run_by_literal_path() {
	// `echo` is on PATH but not in the working directory.
	let mut t = Fixture::with_direct(&["echo", "tru"]);
	assert_eq!(t.eval("echo hi > @/out 2> @/err").unwrap(), 127);
	assert_eq!(t.read("out"), "");
	assert!(t.read("err").contains("echo"));
	// `true` only contains a registered name, so PATH is searched.
	assert_eq!(t.eval("true").unwrap(), 0);
	assert_eq!(t.eval("printf hi > @/out").unwrap(), 0);
	assert_eq!(t.read("out"), "hi");
}

#[test]
fn exit_status_is_the_last_stage() {
	let mut t = Fixture::new();
	assert_eq!(t.eval("true | false").unwrap(), 1);
	assert_eq!(t.eval("false | true").unwrap(), 0);
}

#[test]
fn sequential_pipelines_run_in_order() {
	let mut t = Fixture::new();
	assert_eq!(t.eval("false; echo ok > @/out").unwrap(), 0);
	assert_eq!(t.read("out"), "ok\n");
	t.eval("echo first > @/seq; cat @/seq > @/copy").unwrap();
	assert_eq!(t.read("copy"), "first\n");
}

#[test]
fn parse_error_runs_nothing() {
	let mut t = Fixture::new();
	assert_matches!(t.eval("echo x > @/out; cat <"),
		Err(EvalError::Parse(ParseError::MissingRedirectTarget { .. })));
	assert!(!t.path("out").exists());
	assert_matches!(t.eval("echo | | cat"), Err(EvalError::Parse(ParseError::EmptyPipeline)));
}

#[test]
fn blank_line_keeps_status() {
	let mut t = Fixture::new();
	t.eval("false").unwrap();
	assert_eq!(t.eval("   ").unwrap(), 1);
}

#[test]
fn parent_holds_no_pipe_ends_afterwards() {
	let mut t = Fixture::new();
	let before = open_pipes();
	t.eval("echo a | cat | cat | cat > @/out").unwrap();
	assert_eq!(open_pipes(), before);
	assert_eq!(t.read("out"), "a\n");
}

#[test]
fn background_job_returns_immediately_and_is_reported_once() {
	let mut t = Fixture::new();
	let start = Instant::now();
	assert_eq!(t.eval("sleep 1 &").unwrap(), 0);
	assert!(start.elapsed() < Duration::from_millis(900));
	assert_eq!(t.state.job_set.len(), 1);

	let mut reports = vec![];
	assert!(wait_until(|| {
		reports.extend(t.state.job_set.reap());
		!reports.is_empty()
	}));
	assert_eq!(reports.len(), 1);
	assert_eq!(reports[0].to_string(), "[1] Done sleep 1 &");
	assert!(t.state.job_set.reap().is_empty());
	assert!(t.state.job_set.is_empty());
}

#[test]
fn report_jobs_waits_for_the_child_flag() {
	let mut t = Fixture::new();
	t.eval("true &").unwrap();
	sleep(Duration::from_millis(200));
	eval::report_jobs(&mut t.state);
	assert_eq!(t.state.job_set.len(), 1);
	assert!(wait_until(|| {
		t.state.signals.raise_child();
		eval::report_jobs(&mut t.state);
		t.state.job_set.is_empty()
	}));
}

#[test]
fn repeated_commands_make_independent_jobs() {
	let mut t = Fixture::new();
	t.eval("sleep 0.2 > @/a &").unwrap();
	t.eval("sleep 0.2 > @/b &").unwrap();
	let first: Vec<_> = t.state.job_set.get(1).unwrap().processes.iter().map(|pr| pr.pid).collect();
	let second: Vec<_> = t.state.job_set.get(2).unwrap().processes.iter().map(|pr| pr.pid).collect();
	assert!(first.iter().all(|pid| !second.contains(pid)));

	let mut reported = 0;
	assert!(wait_until(|| {
		reported += t.state.job_set.reap().len();
		reported == 2
	}));
}

#[test]
fn foreground_wait_also_reaps_background_jobs() {
	let mut t = Fixture::new();
	t.eval("true > @/bg &").unwrap();
	let pid = t.state.job_set.get(1).unwrap().processes[0].pid;
	t.eval("sleep 0.3").unwrap();

	let job = t.state.job_set.get(1).unwrap();
	assert_eq!(job.processes[0].status, Status::Exited(0));
	assert_eq!(waitpid(pid, Some(WaitPidFlag::WNOHANG)), Err(Errno::ECHILD));

	// Reaped already, so it is announced even without a new SIGCHLD.
	eval::report_jobs(&mut t.state);
	assert!(t.state.job_set.is_empty());
}
