use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use signal_hook::consts::{SIGCHLD, SIGINT};
use signal_hook::flag;

use crate::builtin;
use crate::config::Config;
use crate::job;

/// Flags raised by the process-wide signal handlers.
///
/// `install` registers handlers for SIGCHLD and SIGINT once at startup and
/// they stay for the life of the process. The handlers only store `true`;
/// everything else, reaping included, happens on the main loop. Catching
/// SIGINT keeps the shell alive while its foreground children, which get the
/// default action back at exec, are interrupted.
#[derive(Debug, Default, Clone)]
pub struct Signals {
	child: Arc<AtomicBool>,
	interrupt: Arc<AtomicBool>,
}

impl Signals {
	pub fn install() -> io::Result<Signals> {
		let signals = Signals::default();
		flag::register(SIGCHLD, Arc::clone(&signals.child))?;
		flag::register(SIGINT, Arc::clone(&signals.interrupt))?;
		Ok(signals)
	}

	/// Whether a child changed state since the last call.
	pub fn take_child(&self) -> bool {
		self.child.swap(false, Ordering::SeqCst)
	}

	/// Whether an interrupt arrived since the last call.
	pub fn take_interrupt(&self) -> bool {
		self.interrupt.swap(false, Ordering::SeqCst)
	}

	#[cfg(test)]
	pub fn raise_child(&self) {
		self.child.store(true, Ordering::SeqCst);
	}
}

pub struct State {
	pub config: Config,
	pub builtins: builtin::Builtins,
	pub job_set: job::JobSet,
	pub signals: Signals,
	pub last_status: i32,
}

impl State {
	pub fn new(config: Config, signals: Signals) -> State {
		let builtins = builtin::Builtins::new(&config.direct);
		State {
			config: config,
			builtins: builtins,
			job_set: job::JobSet::new(),
			signals: signals,
			last_status: 0,
		}
	}
}
