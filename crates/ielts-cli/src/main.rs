//! ielts CLI: take IELTS practice tests from the terminal.

use std::io::Write;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;
mod console;

#[derive(Parser)]
#[command(name = "ielts", version, about = "Take IELTS listening and reading practice tests")]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session token
    Login {
        #[arg(long)]
        email: String,

        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Sign out and forget the stored token
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Take a test interactively
    Take {
        /// Test id on the server
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        test_id: Option<String>,

        /// Take a local test definition offline
        #[arg(long)]
        file: Option<PathBuf>,

        /// Where offline submissions are written
        #[arg(long, default_value = "./ielts-submissions")]
        output: PathBuf,
    },

    /// List your submissions
    Submissions {
        /// Read local submissions from this directory instead of the server
        #[arg(long)]
        offline: Option<PathBuf>,
    },

    /// Grade a submission (admin)
    Grade {
        /// Submission id
        submission_id: String,

        /// Band score, 0 to 9 in half-band steps
        #[arg(long)]
        grade: f64,

        #[arg(long)]
        feedback: Option<String>,

        /// Grade a local submission in this directory instead
        #[arg(long)]
        offline: Option<PathBuf>,
    },

    /// Validate test definition files
    Validate {
        /// Test file or directory
        #[arg(long)]
        tests: PathBuf,
    },

    /// Show the URL a media reference resolves to
    ResolveMedia {
        /// Media reference as stored in test data
        reference: String,

        /// Legacy media host, overriding the config
        #[arg(long)]
        host: Option<String>,
    },

    /// Create a starter config and example test
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ielts=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    let result = match cli.command {
        Commands::Login { email, password } => {
            commands::login::execute(config, email, password).await
        }
        Commands::Logout => commands::logout::execute(config).await,
        Commands::Whoami => commands::whoami::execute(config).await,
        Commands::Take {
            test_id,
            file,
            output,
        } => commands::take::execute(config, test_id, file, output).await,
        Commands::Submissions { offline } => commands::submissions::execute(config, offline).await,
        Commands::Grade {
            submission_id,
            grade,
            feedback,
            offline,
        } => commands::grade::execute(config, submission_id, grade, feedback, offline).await,
        Commands::Validate { tests } => commands::validate::execute(tests),
        Commands::ResolveMedia { reference, host } => {
            commands::resolve_media::execute(config, reference, host)
        }
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }

    // A pending stdin read cannot be cancelled and would keep the runtime
    // from shutting down.
    let _ = std::io::stdout().flush();
    process::exit(0);
}
