use std::{ffi, io};

use nix::errno::Errno;
use thiserror::Error;

use crate::types::RedirectOp;

/// Errors found while turning a line into pipelines. Nothing has been
/// spawned when one of these is returned.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ParseError {
	#[error("invalid character {byte:#04x} at offset {position}")]
	InvalidCharacter { byte: u8, position: usize },
	#[error("syntax error: empty command in pipeline")]
	EmptyPipeline,
	#[error("syntax error: `{operator}` needs a file name")]
	MissingRedirectTarget { operator: RedirectOp },
	#[error("syntax error: `{operator}` conflicts with another redirection")]
	ConflictingRedirect { operator: RedirectOp },
	#[error("syntax error: redirection without a command")]
	MissingCommand,
}

/// Failures to set up a pipeline. No stage has run a program when one of
/// these is returned.
#[derive(Debug, Error)]
pub enum SpawnError {
	#[error("cannot create pipe: {0}")]
	Pipe(#[source] nix::Error),
	#[error("cannot fork: {0}")]
	Fork(#[source] nix::Error),
	#[error("cannot release stages: {0}")]
	Gate(#[source] io::Error),
	#[error("argument contains a NUL byte")]
	Nul(#[from] ffi::NulError),
}

#[derive(Debug, Error)]
pub enum EvalError {
	#[error(transparent)]
	Parse(#[from] ParseError),
	#[error(transparent)]
	Spawn(#[from] SpawnError),
	#[error("wait failed: {0}")]
	Wait(#[from] nix::Error),
}

impl EvalError {
	/// Status recorded for a line that could not run.
	pub fn status(&self) -> i32 {
		match *self {
			EvalError::Parse(_) => 2,
			EvalError::Spawn(_) | EvalError::Wait(_) => 1,
		}
	}
}

/// Why a child gave up before its program image was replaced. Only used on
/// the child side of `fork`, where the exit status is the sole channel back
/// to the shell.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ChildError {
	RedirectOpenFailed(RedirectOp, Errno),
	Wiring(Errno),
	ExecFailed(Errno),
	Aborted,
}

impl ChildError {
	pub fn exit_code(self) -> i32 {
		match self {
			ChildError::RedirectOpenFailed(RedirectOp::Input, _) => 1,
			ChildError::RedirectOpenFailed(RedirectOp::Output, _) => 2,
			ChildError::RedirectOpenFailed(RedirectOp::Error, _) => 3,
			ChildError::RedirectOpenFailed(RedirectOp::OutputAndError, _) => 3,
			ChildError::ExecFailed(Errno::ENOENT) => 127,
			ChildError::ExecFailed(_) | ChildError::Wiring(_) => 126,
			ChildError::Aborted => 125,
		}
	}
}
