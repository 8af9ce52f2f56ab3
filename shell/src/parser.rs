use crate::error::ParseError;
use crate::redirect::Resolver;
use crate::types::*;

type ParseResult<T> = Result<T, ParseError>;

struct Parser<'a> {
	pipelines: Vec<Pipeline<'a>>,
	stages: Vec<Stage<'a>>,
	current: Resolver<'a>,
	after_pipe: bool,
}

impl<'a> Parser<'a> {
	/// Returns whether a stage was added.
	fn close_stage(&mut self) -> ParseResult<bool> {
		let resolver = std::mem::replace(&mut self.current, Resolver::new());
		match resolver.finish()? {
			Some(stage) => {
				self.stages.push(stage);
				Ok(true)
			},
			None => Ok(false),
		}
	}

	fn pipe(&mut self) -> ParseResult<()> {
		if !self.close_stage()? {
			return Err(ParseError::EmptyPipeline);
		}
		self.after_pipe = true;
		Ok(())
	}

	fn close_pipeline(&mut self, is_background: bool) -> ParseResult<()> {
		let closed = self.close_stage()?;
		if !closed && (self.after_pipe || (is_background && self.stages.is_empty())) {
			return Err(ParseError::EmptyPipeline);
		}
		self.after_pipe = false;
		if !self.stages.is_empty() {
			let stages = std::mem::replace(&mut self.stages, vec![]);
			self.pipelines.push(Pipeline { stages: stages, is_background: is_background });
		}
		Ok(())
	}

	fn feed(&mut self, token: Token<'a>) -> ParseResult<()> {
		match token {
			Token::Word(word) => self.current.word(word),
			Token::Redirect(op) => self.current.operator(op),
			Token::Pipe => self.pipe(),
			Token::Semicolon => self.close_pipeline(false),
			Token::Background => self.close_pipeline(true),
		}
	}
}

/// Groups tokens into pipelines. `;` and `&` end a pipeline, `|` ends a stage
/// within one. A stage left empty by a trailing `;` is dropped, but one next
/// to a `|` is an error.
pub fn parse<'a>(tokens: &[Token<'a>]) -> ParseResult<Vec<Pipeline<'a>>> {
	let mut parser = Parser {
		pipelines: vec![],
		stages: vec![],
		current: Resolver::new(),
		after_pipe: false,
	};
	for &token in tokens {
		parser.feed(token)?;
	}
	parser.close_pipeline(false)?;
	Ok(parser.pipelines)
}
