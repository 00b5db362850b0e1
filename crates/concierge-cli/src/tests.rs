use super::*;

#[test]
fn parses_db_migrate_command() {
    let cli = Cli::try_parse_from(["concierge-cli", "db", "migrate"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["concierge-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
    assert!(!cli.in_memory);
}

#[test]
fn seed_flags_default_off() {
    let cli = Cli::try_parse_from(["concierge-cli", "seed"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Seed {
            bypass_cache: false,
            enrich: false
        })
    ));
}

#[test]
fn in_memory_is_global() {
    let cli = Cli::try_parse_from(["concierge-cli", "stream-seed", "--in-memory"]).unwrap();
    assert!(cli.in_memory);
    assert!(matches!(cli.command, Some(Commands::StreamSeed)));
}

#[test]
fn search_collects_repeated_args() {
    let cli = Cli::try_parse_from([
        "concierge-cli",
        "search",
        "--hotel",
        "H1",
        "--hotel",
        "H2",
        "--checkin",
        "2026-11-02",
        "--checkout",
        "2026-11-05",
        "--child-age",
        "7",
        "--nationality",
        "fr",
        "--no-sweep",
    ])
    .unwrap();
    let Some(Commands::Search(args)) = cli.command else {
        panic!("expected search command");
    };
    assert_eq!(args.hotels, vec!["H1", "H2"]);
    assert_eq!(args.child_ages, vec![7]);
    assert_eq!(args.adults, 2);
    assert!(args.no_sweep);
}

#[test]
fn search_requires_a_hotel() {
    let result = Cli::try_parse_from([
        "concierge-cli",
        "search",
        "--checkin",
        "2026-11-02",
        "--checkout",
        "2026-11-05",
    ]);
    assert!(result.is_err());
}

#[test]
fn runs_show_parses_uuid() {
    let cli = Cli::try_parse_from([
        "concierge-cli",
        "runs",
        "show",
        "1b4e28ba-2fa1-11d2-883f-0016d3cca427",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Runs {
            command: RunsCommands::Show { .. }
        })
    ));
}

#[test]
fn curated_defaults() {
    let cli = Cli::try_parse_from(["concierge-cli", "curated"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Curated {
            limit: 20,
            cursor: None
        })
    ));
}
