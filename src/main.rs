use clap::Parser;
use lloggs::{LoggingArgs, PreArgs, WorkerGuard};
use miette::{Result, miette};
use statusd::Config;
use tracing::debug;

/// BES tooling: status page and incident daemon
///
/// Ingests Alertmanager-compatible webhooks, folds them into per-site
/// incidents, and serves a read-only status page. Watches the site tree for
/// changes and automatically reloads; send SIGHUP to trigger a reload
/// manually.
#[derive(Debug, Clone, Parser)]
struct Args {
	#[command(flatten)]
	logging: LoggingArgs,

	#[command(flatten)]
	config: Config,

	/// Print CLI reference documentation as Markdown and exit (for maintainers)
	#[arg(long, hide = true)]
	write_help_markdown: bool,
}

fn get_args() -> Result<(Args, WorkerGuard)> {
	let log_guard = PreArgs::parse().setup().map_err(|err| miette!("{err}"))?;

	debug!("parsing arguments");
	let args = Args::parse();

	let log_guard = match log_guard {
		Some(g) => g,
		None => args
			.logging
			.setup(|v| match v {
				0 => "statusd=info",
				1 => "info,statusd=debug",
				2 => "debug",
				3 => "debug,statusd=trace",
				_ => "trace",
			})
			.map_err(|err| miette!("{err}"))?,
	};

	debug!(?args, "got arguments");
	Ok((args, log_guard))
}

#[tokio::main]
async fn main() -> Result<()> {
	let (args, _guard) = get_args()?;

	if args.write_help_markdown {
		println!("{}", clap_markdown::help_markdown::<Args>());
		return Ok(());
	}

	statusd::run(args.config).await
}
