use crate::score::{run_score, ScoreArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use maturity_engine::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Maturity Scoring Engine",
    about = "Score maturity assessments from the command line or serve the scoring API",
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
    /// Score a single assessment read from a JSON file
    Score(ScoreArgs),
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
        Command::Score(args) => run_score(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_serve_without_subcommand() {
        let cli = Cli::try_parse_from(["maturity-engine-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_score_arguments() {
        let cli = Cli::try_parse_from([
            "maturity-engine-api",
            "score",
            "--input",
            "assessment.json",
            "--rule",
            "strict",
            "--json",
        ])
        .expect("parses");

        match cli.command {
            Some(Command::Score(args)) => {
                assert_eq!(args.input.to_str(), Some("assessment.json"));
                assert_eq!(args.rule.as_deref(), Some("strict"));
                assert!(args.json);
            }
            other => panic!("expected score command, got {other:?}"),
        }
    }
}
