use super::*;

#[test]
fn parses_db_ping_command() {
    let cli =
        Cli::try_parse_from(["sportrend-cli", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli =
        Cli::try_parse_from(["sportrend-cli", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["sportrend-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn parses_stage_commands() {
    for (arg, check) in [
        ("run", matches!(parse(&["run"]), Some(Commands::Run))),
        ("collect", matches!(parse(&["collect"]), Some(Commands::Collect))),
        ("normalize", matches!(parse(&["normalize"]), Some(Commands::Normalize))),
        ("entities", matches!(parse(&["entities"]), Some(Commands::Entities))),
        ("sentiment", matches!(parse(&["sentiment"]), Some(Commands::Sentiment))),
    ] {
        assert!(check, "{arg} should parse");
    }
}

fn parse(args: &[&str]) -> Option<Commands> {
    let argv = std::iter::once("sportrend-cli").chain(args.iter().copied());
    Cli::try_parse_from(argv).expect("expected valid cli args").command
}

#[test]
fn aggregate_window_defaults_to_config() {
    assert!(matches!(
        parse(&["aggregate"]),
        Some(Commands::Aggregate { window_days: None })
    ));
    assert!(matches!(
        parse(&["aggregate", "--window-days", "14"]),
        Some(Commands::Aggregate {
            window_days: Some(14)
        })
    ));
}

#[test]
fn snapshot_filters_parse_entity_type_case_insensitively() {
    let command = parse(&["snapshot", "--entity-type", "player", "--sport-type", "football"]);
    assert!(matches!(
        command,
        Some(Commands::Snapshot {
            entity_type: Some(EntityType::Player),
            sport_type: Some(ref s)
        }) if s == "football"
    ));
}

#[test]
fn snapshot_rejects_unknown_entity_type() {
    let result = Cli::try_parse_from(["sportrend-cli", "snapshot", "--entity-type", "coach"]);
    assert!(result.is_err());
}

#[test]
fn purge_accepts_day_override() {
    assert!(matches!(
        parse(&["purge", "--days", "90"]),
        Some(Commands::Purge { days: Some(90) })
    ));
    assert!(matches!(parse(&["purge"]), Some(Commands::Purge { days: None })));
}

#[test]
fn purge_rejects_horizon_past_limit() {
    let too_long = (MAX_RETENTION_DAYS + 1).to_string();
    let result = Cli::try_parse_from(["sportrend-cli", "purge", "--days", too_long.as_str()]);
    assert!(result.is_err());
}

#[test]
fn aggregate_rejects_zero_and_oversized_windows() {
    let too_long = (MAX_WINDOW_DAYS + 1).to_string();
    for days in ["0", too_long.as_str(), "4294967295"] {
        let result = Cli::try_parse_from(["sportrend-cli", "aggregate", "--window-days", days]);
        assert!(result.is_err(), "window {days} should be rejected");
    }
    let widest = MAX_WINDOW_DAYS.to_string();
    assert!(matches!(
        parse(&["aggregate", "--window-days", widest.as_str()]),
        Some(Commands::Aggregate { window_days: Some(days) }) if days == MAX_WINDOW_DAYS
    ));
}
