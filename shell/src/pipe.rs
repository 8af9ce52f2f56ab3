use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use nix::fcntl::OFlag;
use nix::unistd;

/// Which pipe ends a stage takes as its stdin and stdout.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct Wiring {
	pub stdin: Option<RawFd>,
	pub stdout: Option<RawFd>,
}

/// The `N - 1` pipes joining the stages of one pipeline, as `(read, write)`
/// pairs. Pipe `i` runs from stage `i` to stage `i + 1`.
///
/// Every end is close-on-exec, and the parent drops the whole set once all
/// stages are forked. A child keeps only the ends it duplicated onto its
/// standard descriptors.
#[derive(Debug)]
pub struct PipeSet {
	pipes: Vec<(OwnedFd, OwnedFd)>,
}

impl PipeSet {
	/// Creates all pipes up front so that a failure leaves no child behind.
	/// Pipes made before the failing one are closed on return.
	pub fn new(stages: usize) -> nix::Result<PipeSet> {
		let count = stages.saturating_sub(1);
		let mut pipes = Vec::with_capacity(count);
		for _ in 0 .. count {
			pipes.push(unistd::pipe2(OFlag::O_CLOEXEC)?);
		}
		Ok(PipeSet { pipes: pipes })
	}

	pub fn len(&self) -> usize {
		self.pipes.len()
	}

	pub fn wiring(&self, index: usize) -> Wiring {
		let stdin = index.checked_sub(1)
			.and_then(|i| self.pipes.get(i))
			.map(|(read, _)| read.as_raw_fd());
		let stdout = self.pipes.get(index).map(|(_, write)| write.as_raw_fd());
		Wiring { stdin: stdin, stdout: stdout }
	}

	pub fn raw_fds(&self) -> impl Iterator<Item = RawFd> + '_ {
		self.pipes.iter().flat_map(|(read, write)| [read.as_raw_fd(), write.as_raw_fd()])
	}

	/// Closes every end in a forked child without running destructors.
	/// Only the duplicates on fds 0 and 1 survive.
	pub fn close_in_child(&self) {
		for fd in self.raw_fds() {
			let _ = unistd::close(fd);
		}
	}
}
