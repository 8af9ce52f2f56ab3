use crate::error::ParseError;
use crate::types::{RedirectOp, Token};

struct Lexer<'a> {
	line: &'a [u8],
	i: usize,
}

impl<'a> Lexer<'a> {
	fn proceed_while<F>(&mut self, f: F) where F: Fn(u8) -> bool {
		while let Some(c) = self.line.get(self.i) {
			if !f(*c) { break; }
			self.i += 1;
		}
	}

	fn is_whitespace(c: u8) -> bool {
		matches!(c, b' ' | b'\t' | b'\r' | b'\n')
	}

	fn is_invalid(c: u8) -> bool {
		(c < 0x20 && !Lexer::is_whitespace(c)) || c == 0x7f
	}

	fn is_letter(c: u8) -> bool {
		match c {
			b';' | b'|' | b'<' | b'>' | b'&' => false,
			_ => !Lexer::is_whitespace(c),
		}
	}

	fn skip_whitespaces(&mut self) {
		self.proceed_while(Lexer::is_whitespace);
	}

	fn read_word(&mut self) -> &'a [u8] {
		let orig = self.i;
		self.proceed_while(Lexer::is_letter);
		&self.line[orig .. self.i]
	}

	/// Reads an operator starting at the current position. `1>` and `2>` are
	/// only operators at the start of a token.
	fn read_operator(&mut self) -> Option<Token<'a>> {
		let (token, len) = match &self.line[self.i ..] {
			[b'&', b'>', ..] => (Token::Redirect(RedirectOp::OutputAndError), 2),
			[b'1', b'>', ..] => (Token::Redirect(RedirectOp::Output), 2),
			[b'2', b'>', ..] => (Token::Redirect(RedirectOp::Error), 2),
			[b'<', ..] => (Token::Redirect(RedirectOp::Input), 1),
			[b'>', ..] => (Token::Redirect(RedirectOp::Output), 1),
			[b'&', ..] => (Token::Background, 1),
			[b'|', ..] => (Token::Pipe, 1),
			[b';', ..] => (Token::Semicolon, 1),
			_ => return None,
		};
		self.i += len;
		Some(token)
	}

	fn next_token(&mut self) -> Option<Token<'a>> {
		self.skip_whitespaces();
		if self.i >= self.line.len() {
			return None;
		}
		if let Some(op) = self.read_operator() {
			return Some(op);
		}
		Some(Token::Word(self.read_word()))
	}
}

/// Splits one input line into tokens. A line of only whitespace gives an
/// empty vector.
pub fn tokenize(line: &[u8]) -> Result<Vec<Token>, ParseError> {
	if let Some(position) = line.iter().position(|&c| Lexer::is_invalid(c)) {
		return Err(ParseError::InvalidCharacter { byte: line[position], position: position });
	}
	let mut lexer = Lexer { line: line, i: 0 };
	let mut tokens = vec![];
	while let Some(token) = lexer.next_token() {
		tokens.push(token);
	}
	Ok(tokens)
}
