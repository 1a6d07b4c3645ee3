//! promptgrade CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "promptgrade",
    version,
    about = "LLM function evaluation and version-tree harness"
)]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory the aggregate store lives in (overrides config)
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// Owner key to operate on (overrides config)
    #[arg(long, global = true)]
    owner: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create starter config and an example function definition
    Init,

    /// Validate a function definition and print its grading schema
    Validate {
        /// Path to a .toml function definition
        #[arg(long)]
        definition: PathBuf,
    },

    /// Create a function from a definition file
    Create {
        /// Path to a .toml function definition
        #[arg(long)]
        definition: PathBuf,
    },

    /// Branch a new version off an existing one
    Branch {
        /// Function name or key
        #[arg(long)]
        function: String,

        /// Parent version id or unique prefix (defaults to the deployed
        /// version)
        #[arg(long)]
        parent: Option<String>,

        /// New system prompt (inherits the parent's when omitted)
        #[arg(long)]
        prompt: Option<String>,

        /// New model (inherits the parent's when omitted)
        #[arg(long)]
        model: Option<String>,

        /// New temperature (inherits the parent's when omitted)
        #[arg(long)]
        temperature: Option<f64>,

        /// Evaluate the new version against the test set right away
        #[arg(long)]
        evaluate: bool,

        /// Completion provider (defaults to the configured one)
        #[arg(long)]
        provider: Option<String>,
    },

    /// Evaluate a version against the function's test set
    Evaluate {
        /// Function name or key
        #[arg(long)]
        function: String,

        /// Version id or unique prefix (defaults to the deployed version)
        #[arg(long)]
        version: Option<String>,

        /// Completion provider (defaults to the configured one)
        #[arg(long)]
        provider: Option<String>,
    },

    /// Move the deployment pointer
    Deploy {
        /// Function name or key
        #[arg(long)]
        function: String,

        /// Version id or unique prefix
        #[arg(long)]
        version: String,
    },

    /// Generate synthetic test inputs and merge them into the test set
    GenTests {
        /// Function name or key
        #[arg(long)]
        function: String,

        /// How many inputs to request
        #[arg(long, default_value = "5")]
        count: usize,

        /// Completion provider (defaults to the configured one)
        #[arg(long)]
        provider: Option<String>,
    },

    /// Show the version tree and its evaluation scores
    Show {
        /// Function name or key
        #[arg(long)]
        function: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("promptgrade=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let ctx = match commands::context::CliContext::load(
        cli.config.as_deref(),
        cli.store_dir.clone(),
        cli.owner.clone(),
    ) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Validate { definition } => commands::validate::execute(definition),
        Commands::Create { definition } => commands::create::execute(&ctx, definition),
        Commands::Branch {
            function,
            parent,
            prompt,
            model,
            temperature,
            evaluate,
            provider,
        } => {
            commands::branch::execute(
                &ctx,
                function,
                parent,
                prompt,
                model,
                temperature,
                evaluate,
                provider,
            )
            .await
        }
        Commands::Evaluate {
            function,
            version,
            provider,
        } => commands::evaluate::execute(&ctx, function, version, provider).await,
        Commands::Deploy { function, version } => {
            commands::deploy::execute(&ctx, function, version)
        }
        Commands::GenTests {
            function,
            count,
            provider,
        } => commands::gen_tests::execute(&ctx, function, count, provider).await,
        Commands::Show { function } => commands::show::execute(&ctx, function),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
