mod builtin;
mod config;
mod error;
mod eval;
mod global;
mod job;
mod launch;
mod lexer;
mod parser;
mod pipe;
mod redirect;
mod types;
#[cfg(test)]
mod test;

use std::io;
use std::process;
use io::Write;
use io::BufRead;

use clap::Parser;

/// Reads and runs lines until end of input. Background jobs still running at
/// that point are left alone.
fn repl(state: &mut global::State) -> i32 {
	let mut stdout = io::stdout();
	let stdin = io::stdin();
	let mut stdin_locked = stdin.lock();
	loop {
		eval::report_jobs(state);
		let _ = stdout.write_all(state.config.prompt.as_bytes());
		let _ = stdout.flush();
		let mut line: Vec<u8> = vec![];
		match stdin_locked.read_until(b'\n', &mut line) {
			Ok(0) => break,
			Ok(_) => {},
			Err(e) => {
				let _ = writeln!(&mut io::stderr(), "pish: cannot read input: {}", e);
				break;
			},
		}
		eval::run(state, &line);
	}
	state.last_status
}

fn main() {
	let mut config = config::Config::parse();
	let signals = match global::Signals::install() {
		Ok(signals) => signals,
		Err(e) => {
			let _ = writeln!(&mut io::stderr(), "pish: cannot install signal handlers: {}", e);
			process::exit(2);
		},
	};
	let command = config.command.take();
	let mut state = global::State::new(config, signals);
	let status = match command {
		Some(command) => eval::run(&mut state, command.as_bytes()),
		None => repl(&mut state),
	};
	process::exit(status)
}
