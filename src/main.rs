use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use hierconf::{ConfigError, ConfigValue, LoadOptions, Preprocessor, load_config_with};

#[derive(Parser)]
#[command(name = "hierconf")]
#[command(
	author,
	version,
	about = "Load hierarchical, environment-aware YAML configuration"
)]
#[command(arg_required_else_help = true)]
struct Cli {
	/// Increase log verbosity (-v info, -vv debug, -vvv trace)
	#[arg(short, long, action = ArgAction::Count, global = true)]
	verbose: u8,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Args)]
struct Source {
	/// Config name; loads NAME.yml and, if present, NAME-overrides.yml
	name: String,

	/// Directory containing the config files
	#[arg(short, long, default_value = "config")]
	dir: PathBuf,

	/// Environment whose stanzas are applied
	#[arg(short, long, default_value = "development")]
	env: String,

	/// Preprocessor applied to the file text before parsing (erb or none)
	#[arg(long, default_value = "erb")]
	preprocess: Preprocessor,
}

#[derive(Subcommand)]
enum Commands {
	/// Print the merged, validated configuration as YAML
	Show {
		#[command(flatten)]
		source: Source,

		/// Also list the record types synthesized for each shape
		#[arg(long)]
		typed: bool,
	},
	/// Check that every required value is supplied
	Validate {
		#[command(flatten)]
		source: Source,
	},
	/// Print one value by path, e.g. `database.hosts[0]`
	Get {
		#[command(flatten)]
		source: Source,

		/// Dotted path to the value
		path: String,
	},
}

fn main() -> ExitCode {
	let cli = Cli::parse();
	init_logging(cli.verbose);

	match run(cli.command) {
		Ok(code) => code,
		Err(e) => {
			eprintln!("error: {e:?}");
			ExitCode::FAILURE
		}
	}
}

fn init_logging(verbose: u8) {
	let level = match verbose {
		0 => "warn",
		1 => "info",
		2 => "debug",
		_ => "trace",
	};
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

	// A subscriber may already be installed when embedded; keep the existing one.
	let _ = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(false)
		.try_init();
}

fn run(command: Commands) -> Result<ExitCode> {
	match command {
		Commands::Show { source, typed } => handle_show(&source, typed),
		Commands::Validate { source } => handle_validate(&source),
		Commands::Get { source, path } => handle_get(&source, &path),
	}
}

fn load(source: &Source, typed: bool) -> hierconf::Result<ConfigValue> {
	let options = LoadOptions {
		preprocessor: source.preprocess,
		typed,
	};
	tracing::info!(name = %source.name, dir = %source.dir.display(), env = %source.env, "loading configuration");
	load_config_with(&source.name, &source.dir, &source.env, &options)
}

fn handle_show(source: &Source, typed: bool) -> Result<ExitCode> {
	let config = load(source, typed)
		.with_context(|| format!("Failed to load configuration {}", source.name))?;

	if typed {
		let mut types = BTreeMap::new();
		collect_types(&config, &mut types);
		for (name, fields) in &types {
			println!("# type {name} {{ {} }}", fields.join(", "));
		}
	}

	let yaml = serde_yaml::to_string(&config).context("Failed to render configuration")?;
	print!("{yaml}");
	Ok(ExitCode::SUCCESS)
}

fn handle_validate(source: &Source) -> Result<ExitCode> {
	match load(source, false) {
		Ok(_) => {
			println!("{} is valid for {}", source.name, source.env);
			Ok(ExitCode::SUCCESS)
		}
		Err(ConfigError::MissingRequired { errors, .. }) => {
			eprintln!("{} is missing required values:", source.name);
			for error in &errors {
				eprintln!("  {error}");
			}
			Ok(ExitCode::FAILURE)
		}
		Err(e) => Err(e).with_context(|| format!("Failed to load configuration {}", source.name)),
	}
}

fn handle_get(source: &Source, path: &str) -> Result<ExitCode> {
	let config = load(source, false)
		.with_context(|| format!("Failed to load configuration {}", source.name))?;
	let value = config
		.lookup(path)
		.with_context(|| format!("No value at {path}"))?;

	match value {
		ConfigValue::String(s) => println!("{s}"),
		ConfigValue::Record(_) | ConfigValue::Table(_) | ConfigValue::Sequence(_) => {
			let yaml = serde_yaml::to_string(value).context("Failed to render value")?;
			print!("{yaml}");
		}
		scalar => {
			let yaml = serde_yaml::to_string(scalar).context("Failed to render value")?;
			println!("{}", yaml.trim_end());
		}
	}

	Ok(ExitCode::SUCCESS)
}

/// Gather each synthesized record type with its field names.
fn collect_types(value: &ConfigValue, types: &mut BTreeMap<String, Vec<String>>) {
	match value {
		ConfigValue::Record(record) => {
			if let Some(record_type) = record.record_type() {
				types
					.entry(record_type.name().to_string())
					.or_insert_with(|| record_type.fields().map(str::to_string).collect());
			}
			for (_, field) in record.iter() {
				collect_types(field, types);
			}
		}
		ConfigValue::Table(table) => {
			for (_, entry) in table.iter() {
				collect_types(entry, types);
			}
		}
		ConfigValue::Sequence(items) => {
			for item in items.iter() {
				collect_types(item, types);
			}
		}
		_ => {}
	}
}
