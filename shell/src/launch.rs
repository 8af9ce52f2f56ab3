use std::ffi::{self, CStr, CString};
use std::fs::File;
use std::io::{self, Write};
use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use nix::errno::Errno;
use nix::fcntl::{self, OFlag};
use nix::sys::signal::{self, SigHandler, Signal};
use nix::sys::stat::Mode;
use nix::unistd::{self, ForkResult, Pid};

use crate::builtin::{Builtins, Resolution};
use crate::error::{ChildError, SpawnError};
use crate::job;
use crate::pipe::{PipeSet, Wiring};
use crate::types::{Pipeline, RedirectOp, Stage};

const DIAG_PREFIX: &[u8] = b"pish: ";

/// A stage with every string the child needs already converted, so the child
/// only makes system calls between `fork` and `exec`.
#[derive(Debug)]
struct Prepared {
	resolution: Resolution,
	argv: Vec<CString>,
	redirects: Vec<(RedirectOp, CString)>,
	claims_stdin: bool,
	claims_stdout: bool,
}

impl Prepared {
	fn new(stage: &Stage, builtins: &Builtins) -> Result<Prepared, ffi::NulError> {
		let argv = stage.arguments.iter()
			.map(|&arg| CString::new(arg))
			.collect::<Result<Vec<_>, _>>()?;
		let mut redirects = stage.redirects.entries()
			.map(|(op, target)| CString::new(target).map(|t| (op, t)))
			.collect::<Result<Vec<_>, _>>()?;
		// stderr first, so a failing `<` or `>` is reported where the stage asked
		redirects.sort_by_key(|&(op, _)| !matches!(op, RedirectOp::Error | RedirectOp::OutputAndError));
		Ok(Prepared {
			resolution: builtins.resolve(stage.name()),
			argv: argv,
			redirects: redirects,
			claims_stdin: stage.redirects.claims_stdin(),
			claims_stdout: stage.redirects.claims_stdout(),
		})
	}
}

/// Holds every forked stage until the whole pipeline has been forked. A child
/// reads one byte before doing anything else; end-of-stream tells it to give up.
#[derive(Debug)]
struct Gate {
	read: OwnedFd,
	write: OwnedFd,
}

impl Gate {
	fn new() -> nix::Result<Gate> {
		let (read, write) = unistd::pipe2(OFlag::O_CLOEXEC)?;
		Ok(Gate { read: read, write: write })
	}

	/// Child side. Returns whether the parent let this child through.
	fn wait(&self) -> bool {
		let _ = unistd::close(self.write.as_raw_fd());
		let mut byte = 0u8;
		let passed = loop {
			let n = unsafe { libc::read(self.read.as_raw_fd(), &mut byte as *mut u8 as *mut libc::c_void, 1) };
			if n < 0 && Errno::last() == Errno::EINTR {
				continue;
			}
			break n == 1;
		};
		let _ = unistd::close(self.read.as_raw_fd());
		passed
	}

	/// Parent side. Lets `count` children through; dropping the gate instead
	/// turns them all away.
	fn open(self, count: usize) -> io::Result<()> {
		let mut write = File::from(self.write);
		write.write_all(&vec![0u8; count])
	}
}

/// Writes `pish: <subject>: <reason>` with bare `write` calls.
fn report(subject: &[u8], errno: Errno) {
	let parts: [&[u8]; 5] = [DIAG_PREFIX, subject, b": ", errno.desc().as_bytes(), b"\n"];
	for part in &parts {
		unsafe { libc::write(libc::STDERR_FILENO, part.as_ptr() as *const libc::c_void, part.len()); }
	}
}

fn dup_onto(fd: RawFd, to: RawFd) -> nix::Result<()> {
	if fd != to {
		unistd::dup2(fd, to)?;
	}
	Ok(())
}

fn open_redirect(op: RedirectOp, target: &CStr) -> nix::Result<()> {
	let output = OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC;
	let (flags, fds): (OFlag, &[RawFd]) = match op {
		RedirectOp::Input => (OFlag::O_RDONLY, &[libc::STDIN_FILENO][..]),
		RedirectOp::Output => (output, &[libc::STDOUT_FILENO][..]),
		RedirectOp::Error => (output, &[libc::STDERR_FILENO][..]),
		RedirectOp::OutputAndError => (output, &[libc::STDOUT_FILENO, libc::STDERR_FILENO][..]),
	};
	let fd = fcntl::open(target, flags, Mode::S_IRUSR | Mode::S_IWUSR)?;
	for &to in fds {
		dup_onto(fd, to)?;
	}
	if !fds.contains(&fd) {
		unistd::close(fd)?;
	}
	Ok(())
}

/// Child side of one stage: redirections, then pipe ends not claimed by a
/// redirection, then exec. Returns only on failure.
fn exec_stage(stage: &Prepared, wiring: Wiring, pipes: &PipeSet, is_background: bool) -> ChildError {
	if is_background {
		unsafe {
			let _ = signal::signal(Signal::SIGINT, SigHandler::SigIgn);
			let _ = signal::signal(Signal::SIGQUIT, SigHandler::SigIgn);
		}
	}

	for (op, target) in &stage.redirects {
		if let Err(errno) = open_redirect(*op, target) {
			report(target.to_bytes(), errno);
			return ChildError::RedirectOpenFailed(*op, errno);
		}
	}

	let wired = [
		(wiring.stdin.filter(|_| !stage.claims_stdin), libc::STDIN_FILENO),
		(wiring.stdout.filter(|_| !stage.claims_stdout), libc::STDOUT_FILENO),
	];
	for &(fd, to) in &wired {
		if let Some(fd) = fd {
			if let Err(errno) = dup_onto(fd, to) {
				report(b"dup2", errno);
				return ChildError::Wiring(errno);
			}
		}
	}
	pipes.close_in_child();

	let program = &stage.argv[0];
	let result = match stage.resolution {
		Resolution::Direct => unistd::execv(program, &stage.argv),
		Resolution::Search => unistd::execvp(program, &stage.argv),
	};
	let errno = match result {
		Ok(never) => match never {},
		Err(errno) => errno,
	};
	report(program.to_bytes(), errno);
	ChildError::ExecFailed(errno)
}

/// Reaps children that were turned away at the gate.
fn abort(pids: &[Pid]) {
	for &pid in pids {
		let _ = job::wait_for(pid);
	}
}

/// Forks one process per stage, left to right, and returns their pids in that
/// order.
///
/// All pipes are made before the first fork. No child gets past the gate
/// until every fork has succeeded, so on error no stage has run its program
/// and every forked child has been reaped. The parent holds no pipe end when
/// this returns.
pub fn spawn(pipeline: &Pipeline, builtins: &Builtins) -> Result<Vec<Pid>, SpawnError> {
	let stages = pipeline.stages.iter()
		.map(|stage| Prepared::new(stage, builtins))
		.collect::<Result<Vec<_>, _>>()?;
	let pipes = PipeSet::new(stages.len()).map_err(SpawnError::Pipe)?;
	debug_assert_eq!(pipes.len(), stages.len().saturating_sub(1));
	let gate = Gate::new().map_err(SpawnError::Pipe)?;

	let mut pids = Vec::with_capacity(stages.len());
	for (index, stage) in stages.iter().enumerate() {
		match unsafe { unistd::fork() } {
			Ok(ForkResult::Parent { child }) => pids.push(child),
			Ok(ForkResult::Child) => {
				let error = if gate.wait() {
					exec_stage(stage, pipes.wiring(index), &pipes, pipeline.is_background)
				} else {
					ChildError::Aborted
				};
				unsafe { libc::_exit(error.exit_code()) }
			},
			Err(e) => {
				drop(gate);
				drop(pipes);
				abort(&pids);
				return Err(SpawnError::Fork(e));
			},
		}
	}

	drop(pipes);
	if let Err(e) = gate.open(pids.len()) {
		abort(&pids);
		return Err(SpawnError::Gate(e));
	}
	Ok(pids)
}
