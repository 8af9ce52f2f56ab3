use clap::Parser;

pub const DEFAULT_PROMPT: &str = "pish> ";

#[derive(Debug, Clone, Parser)]
#[command(name = "pish", version, about = "Runs pipelines of programs read one line at a time")]
pub struct Config {
	/// Run COMMAND as a single input line and exit with its status
	#[arg(short = 'c', value_name = "COMMAND")]
	pub command: Option<String>,

	/// Text printed before each line is read
	#[arg(long, default_value = DEFAULT_PROMPT)]
	pub prompt: String,

	/// Run NAME by its literal path instead of searching PATH (repeatable)
	#[arg(long = "direct", value_name = "NAME")]
	pub direct: Vec<String>,

	/// Print each pipeline before running it and each reaped background job
	#[arg(short = 'x', long)]
	pub trace: bool,
}

impl Default for Config {
	fn default() -> Config {
		Config {
			command: None,
			prompt: DEFAULT_PROMPT.to_string(),
			direct: vec![],
			trace: false,
		}
	}
}
