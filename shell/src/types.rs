use std::fmt;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RedirectOp { Input, Output, Error, OutputAndError }

impl fmt::Display for RedirectOp {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(match *self {
			RedirectOp::Input => "<",
			RedirectOp::Output => ">",
			RedirectOp::Error => "2>",
			RedirectOp::OutputAndError => "&>",
		})
	}
}

/// One lexical unit of a command line. Operators never carry text, so a word
/// can't be mistaken for one.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Token<'a> {
	Word(&'a [u8]),
	Redirect(RedirectOp),
	Pipe,
	Semicolon,
	Background,
}

/// Redirection targets of one stage. `both` is exclusive with `stdout` and
/// `stderr`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Redirects<'a> {
	pub stdin: Option<&'a [u8]>,
	pub stdout: Option<&'a [u8]>,
	pub stderr: Option<&'a [u8]>,
	pub both: Option<&'a [u8]>,
}

impl<'a> Redirects<'a> {
	pub fn is_empty(&self) -> bool {
		self.stdin.is_none() && self.stdout.is_none() && self.stderr.is_none() && self.both.is_none()
	}

	pub fn claims_stdin(&self) -> bool {
		self.stdin.is_some()
	}

	pub fn claims_stdout(&self) -> bool {
		self.stdout.is_some() || self.both.is_some()
	}

	pub fn entries(&self) -> impl Iterator<Item = (RedirectOp, &'a [u8])> {
		[
			(RedirectOp::Input, self.stdin),
			(RedirectOp::Output, self.stdout),
			(RedirectOp::Error, self.stderr),
			(RedirectOp::OutputAndError, self.both),
		].into_iter().filter_map(|(op, target)| target.map(|t| (op, t)))
	}
}

#[derive(Debug, PartialEq, Eq)]
pub struct Stage<'a> {
	pub arguments: Vec<&'a [u8]>,
	pub redirects: Redirects<'a>,
}

impl<'a> Stage<'a> {
	pub fn name(&self) -> &'a [u8] {
		self.arguments[0]
	}
}

impl<'a> fmt::Display for Stage<'a> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		let mut sep = "";
		for word in &self.arguments {
			write!(f, "{}{}", sep, String::from_utf8_lossy(word))?;
			sep = " ";
		}
		for (op, target) in self.redirects.entries() {
			write!(f, " {} {}", op, String::from_utf8_lossy(target))?;
		}
		Ok(())
	}
}

#[derive(Debug, PartialEq, Eq)]
pub struct Pipeline<'a> {
	pub stages: Vec<Stage<'a>>,
	pub is_background: bool,
}

impl<'a> fmt::Display for Pipeline<'a> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		let mut sep = "";
		for stage in &self.stages {
			write!(f, "{}{}", sep, stage)?;
			sep = " | ";
		}
		if self.is_background {
			f.write_str(" &")?;
		}
		Ok(())
	}
}
