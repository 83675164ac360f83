use crate::commands::{
    run_documents, run_evaluate, run_profile, DocumentsArgs, EvaluateArgs, ProfileArgs,
};
use crate::server;
use benefits_engine::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "Benefits Engine",
    about = "Serve or run benefit eligibility, profile and document checks from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Evaluate one catalog benefit for one user record
    Evaluate(EvaluateArgs),
    /// Print the masked profile view for a user record
    Profile(ProfileArgs),
    /// Print document availability for every configured document type
    Documents(DocumentsArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Evaluate(args) => run_evaluate(args).await,
        Command::Profile(args) => run_profile(args).await,
        Command::Documents(args) => run_documents(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["benefits-engine-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn evaluate_accepts_dates_and_paths() {
        let cli = Cli::try_parse_from([
            "benefits-engine-api",
            "evaluate",
            "--benefit",
            "demos/benefit.json",
            "--user",
            "demos/user.json",
            "--now",
            "2025-07-01",
        ])
        .expect("parses");

        match cli.command {
            Some(Command::Evaluate(args)) => {
                assert_eq!(args.benefit.to_str(), Some("demos/benefit.json"));
                assert_eq!(
                    args.now.map(|now| now.format("%Y-%m-%d").to_string()),
                    Some("2025-07-01".to_string())
                );
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_unparseable_now() {
        let result = Cli::try_parse_from([
            "benefits-engine-api",
            "documents",
            "--user",
            "demos/user.json",
            "--now",
            "soon",
        ]);
        assert!(result.is_err());
    }
}
