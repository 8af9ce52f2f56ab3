use crate::error::ParseError;
use crate::types::{RedirectOp, Redirects, Stage};

impl<'a> Redirects<'a> {
	fn claim(&mut self, operator: RedirectOp, target: &'a [u8]) -> Result<(), ParseError> {
		let conflict = ParseError::ConflictingRedirect { operator: operator };
		let slot = match operator {
			RedirectOp::Input => &mut self.stdin,
			RedirectOp::Output if self.both.is_none() => &mut self.stdout,
			RedirectOp::Error if self.both.is_none() => &mut self.stderr,
			RedirectOp::OutputAndError if self.stdout.is_none() && self.stderr.is_none() => &mut self.both,
			_ => return Err(conflict),
		};
		if slot.is_some() {
			return Err(conflict);
		}
		*slot = Some(target);
		Ok(())
	}
}

/// Collects the words of one stage, moving each redirection operator and the
/// word right after it into the stage's redirect targets.
#[derive(Debug, Default)]
pub struct Resolver<'a> {
	arguments: Vec<&'a [u8]>,
	redirects: Redirects<'a>,
	pending: Option<RedirectOp>,
}

impl<'a> Resolver<'a> {
	pub fn new() -> Resolver<'a> {
		Resolver::default()
	}

	pub fn word(&mut self, word: &'a [u8]) -> Result<(), ParseError> {
		match self.pending.take() {
			Some(operator) => self.redirects.claim(operator, word),
			None => {
				self.arguments.push(word);
				Ok(())
			},
		}
	}

	pub fn operator(&mut self, operator: RedirectOp) -> Result<(), ParseError> {
		if let Some(pending) = self.pending {
			return Err(ParseError::MissingRedirectTarget { operator: pending });
		}
		self.pending = Some(operator);
		Ok(())
	}

	/// Returns `None` when nothing at all was fed in.
	pub fn finish(self) -> Result<Option<Stage<'a>>, ParseError> {
		if let Some(operator) = self.pending {
			return Err(ParseError::MissingRedirectTarget { operator: operator });
		}
		if self.arguments.is_empty() {
			if self.redirects.is_empty() {
				return Ok(None);
			}
			return Err(ParseError::MissingCommand);
		}
		Ok(Some(Stage { arguments: self.arguments, redirects: self.redirects }))
	}
}
