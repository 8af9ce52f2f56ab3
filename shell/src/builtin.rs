use std::collections::HashSet;

/// Programs run by their literal path instead of a `PATH` search.
pub const DEFAULT_BUILTINS: &[&str] = &["matformatter", "matmult_t", "foo", "boo", "too"];

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Resolution {
	/// Execute the name as a path, relative to the working directory if not absolute.
	Direct,
	/// Let the OS search `PATH` for the name.
	Search,
}

#[derive(Debug, Clone)]
pub struct Builtins {
	names: HashSet<Vec<u8>>,
}

impl Builtins {
	pub fn new<I, S>(extra: I) -> Builtins where I: IntoIterator<Item = S>, S: AsRef<[u8]> {
		let names = DEFAULT_BUILTINS.iter().map(|n| n.as_bytes().to_vec())
			.chain(extra.into_iter().map(|n| n.as_ref().to_vec()))
			.collect();
		Builtins { names: names }
	}

	/// Whole-name match only: `footer` is not `foo`.
	pub fn resolve(&self, name: &[u8]) -> Resolution {
		if self.names.contains(name) {
			Resolution::Direct
		} else {
			Resolution::Search
		}
	}
}
