use std::path::PathBuf;

use clap::{Arg, Command as ClapCommand};
use tracing_subscriber::EnvFilter;

use spanner_snippets::config::{Config, DATABASE_ID};
use spanner_snippets::snippets::{run_with_state, Command};

fn cli() -> ClapCommand {
    ClapCommand::new("spanner-snippets")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Runs the Spanner getting-started snippets against a local instance")
        .arg(Arg::new("instance_id").help("Your instance ID.").required(true))
        .arg(
            Arg::new("command")
                .required(true)
                .value_parser(Command::ALL.map(|c| c.name())),
        )
        .arg(
            Arg::new("database-id")
                .long("database-id")
                .help("Your database ID.")
                .default_value(DATABASE_ID),
        )
        .arg(
            Arg::new("state")
                .long("state")
                .value_name("PATH")
                .help("File holding the instance state between runs.")
                .value_parser(clap::value_parser!(PathBuf)),
        )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let matches = cli().get_matches();
    let mut config = Config::default();
    if let Some(instance_id) = matches.get_one::<String>("instance_id") {
        config.instance_id = instance_id.clone();
    }
    if let Some(database_id) = matches.get_one::<String>("database-id") {
        config.database_id = database_id.clone();
    }
    if let Some(path) = matches.get_one::<PathBuf>("state") {
        config.state_path = path.clone();
    }
    let command: Command = matches
        .get_one::<String>("command")
        .map(String::as_str)
        .unwrap_or_default()
        .parse()?;

    for line in run_with_state(&config, command).await? {
        println!("{}", line);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_command() {
        let matches = cli()
            .try_get_matches_from(["spanner-snippets", "my-instance", "query_data", "--state", "/tmp/x.json"])
            .unwrap();
        assert_eq!(matches.get_one::<String>("instance_id").unwrap(), "my-instance");
        assert_eq!(matches.get_one::<String>("command").unwrap(), "query_data");
        assert_eq!(matches.get_one::<String>("database-id").unwrap(), DATABASE_ID);
        assert_eq!(matches.get_one::<PathBuf>("state").unwrap(), &PathBuf::from("/tmp/x.json"));
    }

    #[test]
    fn test_cli_rejects_unknown_command() {
        assert!(cli().try_get_matches_from(["spanner-snippets", "my-instance", "drop_everything"]).is_err());
    }
}
