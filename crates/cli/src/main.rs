mod prompt;
mod session;
mod setup;

use clap::{Args, Parser, Subcommand};
use prompt::LinePrompt;
use session::Session;
use setup::{Component, Overrides};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use wslup_boundary::WslBoundary;
use wslup_config::Config;
use wslup_converge::{
    desired_steps, ensure_elevated, ConsoleReporter, Provision, RunMode, RunOptions,
};

#[derive(Parser)]
#[command(
    name = "wslup",
    version,
    about = "Idempotent provisioning of a WSL2 development distro"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    args: RunArgs,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Converge the distro to the desired state (default)
    Apply,
    /// Probe every step and show what apply would change
    Plan,
}

#[derive(Args)]
struct RunArgs {
    /// Config file [default: ./.wslup.toml]
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Distro to provision (overrides config)
    #[arg(long, global = true)]
    distro: Option<String>,
    /// Account to create in the distro
    #[arg(long, global = true)]
    user: Option<String>,
    /// Git user.name inside the distro
    #[arg(long, global = true)]
    git_name: Option<String>,
    /// Git user.email inside the distro
    #[arg(long, global = true)]
    git_email: Option<String>,
    /// Enable a component regardless of config
    #[arg(long, global = true, value_enum, value_delimiter = ',')]
    with: Vec<Component>,
    /// Disable a component regardless of config
    #[arg(long, global = true, value_enum, value_delimiter = ',')]
    without: Vec<Component>,
    /// Accept all defaults and skip the confirmation
    #[arg(short, long, global = true)]
    yes: bool,
    /// Read the account password from the first unanswered line of stdin
    #[arg(long, global = true)]
    password_stdin: bool,
    /// Do not offer an interactive session afterwards
    #[arg(long, global = true)]
    no_launch: bool,
    /// Print the run report as JSON on stdout
    #[arg(long, global = true)]
    json: bool,
    /// Abort when a required step cannot be probed
    #[arg(long, global = true)]
    strict_probe: bool,
    /// Let the guest bootstrap print its commands instead of running them
    #[arg(long, global = true)]
    guest_dry_run: bool,
    /// Keep the bootstrap script in the guest
    #[arg(long, global = true)]
    keep_bootstrap: bool,
    /// Path to wsl.exe
    #[arg(long, global = true)]
    wsl_bin: Option<PathBuf>,
    /// Debug logging on stderr (otherwise WSLUP_LOG, default warn)
    #[arg(short, long, global = true)]
    verbose: bool,
}

impl RunArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            distro: self.distro.clone(),
            user: self.user.clone(),
            git_name: self.git_name.clone(),
            git_email: self.git_email.clone(),
            with: self.with.clone(),
            without: self.without.clone(),
            keep_bootstrap: self.keep_bootstrap,
            guest_dry_run: self.guest_dry_run,
            assume_yes: self.yes,
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("WSLUP_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_plan(provision: &Provision, mode: RunMode) {
    let c = provision.components;
    let enabled: Vec<&str> = [
        ("docker", c.docker),
        ("python", c.python),
        ("cuda", c.cuda),
        ("zsh", c.zsh),
    ]
    .into_iter()
    .filter(|(_, on)| *on)
    .map(|(name, _)| name)
    .collect();

    let verb = match mode {
        RunMode::Apply => "Provisioning",
        RunMode::Plan => "Planning",
    };
    eprintln!("{verb} {} for account '{}'", provision.distro, provision.username);
    eprintln!(
        "  components: {}",
        if enabled.is_empty() {
            "none".to_string()
        } else {
            enabled.join(", ")
        }
    );
    if !provision.git_name.is_empty() || !provision.git_email.is_empty() {
        eprintln!("  git:        {} <{}>", provision.git_name, provision.git_email);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let args = cli.args;
    init_tracing(args.verbose);

    let mode = match cli.command.unwrap_or(Commands::Apply) {
        Commands::Apply => RunMode::Apply,
        Commands::Plan => RunMode::Plan,
    };

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_from_dir(Path::new("."))?,
    };

    let boundary = match &args.wsl_bin {
        Some(bin) => WslBoundary::with_binary(bin),
        None => WslBoundary::new(),
    };
    ensure_elevated(&boundary).await?;

    let stdin = std::io::stdin();
    let mut prompt = LinePrompt::new(stdin.lock(), std::io::stderr(), args.password_stdin);
    let setup = setup::resolve(
        &config,
        &args.overrides(),
        &mut prompt,
        mode == RunMode::Apply,
    )?;

    print_plan(&setup.provision, mode);
    let session = Session {
        run: RunOptions {
            mode,
            strict_probe: args.strict_probe || config.probe.strict,
        },
        assume_yes: args.yes,
        offer_launch: !args.no_launch,
        json: args.json,
    };
    tracing::debug!(provision = ?setup.provision, ?session, "resolved");

    let provision = setup.provision;
    let steps = desired_steps(&provision, setup.credential);
    let mut reporter = if args.json {
        ConsoleReporter::quiet()
    } else {
        ConsoleReporter::new()
    };
    session::converge(
        &boundary,
        &mut prompt,
        &mut reporter,
        &provision,
        &steps,
        session,
    )
    .await?;

    Ok(ExitCode::SUCCESS)
}
