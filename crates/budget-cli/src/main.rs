use budget_core::{HttpMethod, Revision};
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "budget",
    about = "Budget tracker stack — declare and inspect the deployable unit",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct StackArgs {
    /// Path to stack.toml
    #[arg(short, long, default_value = "stack.toml")]
    config: String,
    /// Override [stack].revision (open, gateway-no-auth, gateway-with-indexes, gateway-with-auth)
    #[arg(short, long)]
    revision: Option<Revision>,
    /// Target account, used when [environment].account is unset
    #[arg(long, env = "BUDGET_ACCOUNT")]
    account: Option<String>,
    /// Target region, used when [environment].region is unset
    #[arg(long, env = "BUDGET_REGION")]
    region: Option<String>,
    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble the stack and print its template or a summary
    Synth {
        #[command(flatten)]
        args: StackArgs,
    },
    /// Print the HTTP route table with access policies
    Routes {
        #[command(flatten)]
        args: StackArgs,
        /// Resolve a concrete request path (e.g. /categories/abc) instead of listing
        #[arg(long = "match", value_name = "PATH")]
        request: Option<String>,
        /// Verb used with --match
        #[arg(short = 'm', long, default_value = "GET", requires = "request")]
        method: HttpMethod,
    },
    /// Generate a stack.toml scaffold
    Init {
        /// Directory to write stack.toml into
        #[arg(short, long, default_value = ".")]
        path: String,
        /// Stack name
        #[arg(short, long, default_value = "budget-tracker")]
        name: String,
        #[arg(short, long, default_value_t = Revision::latest())]
        revision: Revision,
        /// Overwrite an existing stack.toml
        #[arg(long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("budget=info".parse()?)
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Synth { args } => {
            let config = commands::load_config(&args.config, args.revision, args.account, args.region)?;
            commands::synth::synth(&config, &args.format)
        }
        Commands::Routes { args, request, method } => {
            let config = commands::load_config(&args.config, args.revision, args.account, args.region)?;
            let query = request.as_deref().map(|path| commands::routes::RequestQuery { path, verb: method });
            commands::routes::routes(&config, &args.format, query)
        }
        Commands::Init { path, name, revision, force } => {
            commands::init::init(&path, &name, revision, force)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_revision_override() {
        let cli = Cli::try_parse_from(["budget", "routes", "--revision", "gateway-no-auth"]).unwrap();
        match cli.command {
            Commands::Routes { args, .. } => assert_eq!(args.revision, Some(Revision::GatewayNoAuth)),
            _ => panic!("expected Routes"),
        }
    }

    #[test]
    fn parses_route_match() {
        let cli = Cli::try_parse_from([
            "budget", "routes", "--match", "/categories/abc", "--method", "delete",
        ])
        .unwrap();
        match cli.command {
            Commands::Routes { request, method, .. } => {
                assert_eq!(request.as_deref(), Some("/categories/abc"));
                assert_eq!(method, HttpMethod::Delete);
            }
            _ => panic!("expected Routes"),
        }
    }

    #[test]
    fn method_requires_match() {
        assert!(Cli::try_parse_from(["budget", "routes", "--method", "POST"]).is_err());
    }

    #[test]
    fn rejects_unknown_revision() {
        assert!(Cli::try_parse_from(["budget", "synth", "--revision", "final"]).is_err());
    }
}
