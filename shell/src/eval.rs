use std::io::{self, Write};

use crate::error::EvalError;
use crate::global;
use crate::job;
use crate::launch;
use crate::lexer;
use crate::parser;
use crate::types::Pipeline;

/// Runs one pipeline. A foreground job is waited for and its status
/// returned; a background job is handed to the job set and counts as 0.
fn eval_pipeline(state: &mut global::State, pipeline: &Pipeline) -> Result<i32, EvalError> {
	if state.config.trace {
		let _ = writeln!(&mut io::stderr(), "+ {}", pipeline);
	}

	let pids = launch::spawn(pipeline, &state.builtins)?;
	let mut job = job::Job::new(&pids, pipeline.is_background, pipeline.to_string());
	if job.is_background {
		let number = state.job_set.push(job);
		if let Some(pid) = state.job_set.get(number).and_then(job::Job::last_pid) {
			let _ = writeln!(&mut io::stderr(), "[{}] {}", number, pid);
		}
		return Ok(0);
	}

	let status = job.wait()?;
	state.job_set.collect();
	if state.signals.take_interrupt() {
		let _ = writeln!(&mut io::stderr());
	}
	Ok(status.code())
}

/// Parses the whole line first, then runs its pipelines strictly in order.
/// A line that fails to parse runs nothing; a pipeline that fails to launch
/// ends the line.
pub fn eval_line(state: &mut global::State, line: &[u8]) -> Result<i32, EvalError> {
	let tokens = lexer::tokenize(line)?;
	let pipelines = parser::parse(&tokens)?;
	for pipeline in &pipelines {
		state.last_status = eval_pipeline(state, pipeline)?;
	}
	Ok(state.last_status)
}

/// Evaluates a line and reports any error, returning the resulting status.
pub fn run(state: &mut global::State, line: &[u8]) -> i32 {
	state.signals.take_interrupt();
	if let Err(e) = eval_line(state, line) {
		let _ = writeln!(&mut io::stderr(), "pish: {}", e);
		state.last_status = e.status();
	}
	state.last_status
}

/// Announces background jobs that finished since the last call, each once.
/// Jobs already reaped after a foreground wait count as finished even when
/// no SIGCHLD arrived since.
pub fn report_jobs(state: &mut global::State) {
	let changed = state.signals.take_child();
	if state.job_set.is_empty() || !(changed || state.job_set.has_completed()) {
		return;
	}
	let stderr = io::stderr();
	let mut stderr = stderr.lock();
	for report in state.job_set.reap() {
		if state.config.trace {
			for pr in &report.job.processes {
				let _ = writeln!(stderr, "+ reaped {} ({})", pr.pid, pr.status.code());
			}
		}
		let _ = writeln!(stderr, "{}", report);
	}
}
