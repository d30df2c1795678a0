use super::*;

#[test]
fn parses_trustpilot_with_filters_and_output() {
    let cli = Cli::try_parse_from([
        "revscrape-cli",
        "trustpilot",
        "https://www.trustpilot.com/review/example.com",
        "--ratings",
        "5,4",
        "--keywords",
        "late,refund",
        "--output-dir",
        "/tmp/out",
        "--file-name",
        "acme",
    ])
    .expect("expected valid cli args");

    match cli.command {
        Commands::Trustpilot {
            company_url,
            filter,
            output,
        } => {
            assert_eq!(company_url, "https://www.trustpilot.com/review/example.com");
            assert_eq!(filter.ratings, "5,4");
            assert_eq!(filter.keywords, "late,refund");
            assert_eq!(output.output_dir, Some(PathBuf::from("/tmp/out")));
            assert_eq!(output.file_name.as_deref(), Some("acme"));
        }
        other @ Commands::Google { .. } => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn trustpilot_filters_default_to_accept_all() {
    let cli = Cli::try_parse_from([
        "revscrape-cli",
        "trustpilot",
        "https://www.trustpilot.com/review/example.com",
    ])
    .expect("expected valid cli args");

    let Commands::Trustpilot { filter, output, .. } = cli.command else {
        panic!("expected trustpilot command");
    };
    assert!(filter.criteria().expect("criteria").is_empty());
    assert!(output.output_dir.is_none());
    assert!(output.file_name.is_none());
}

#[test]
fn parses_google_with_provider_override() {
    let cli = Cli::try_parse_from([
        "revscrape-cli",
        "google",
        "Blue Bottle Coffee",
        "--location",
        "Oakland, CA",
        "--provider",
        "dataforseo",
    ])
    .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Google {
            ref query,
            ref location,
            provider: Some(GoogleProvider::DataForSeo),
            ..
        } if query == "Blue Bottle Coffee" && location.as_deref() == Some("Oakland, CA")
    ));
}

#[test]
fn rejects_unknown_provider() {
    let result = Cli::try_parse_from([
        "revscrape-cli",
        "google",
        "Blue Bottle Coffee",
        "--provider",
        "bing",
    ]);
    assert!(result.is_err());
}

#[test]
fn subcommand_is_required() {
    assert!(Cli::try_parse_from(["revscrape-cli"]).is_err());
}

#[test]
fn invalid_rating_surfaces_as_error() {
    let filter = FilterArgs {
        ratings: "5,nine".to_owned(),
        keywords: String::new(),
    };
    assert!(filter.criteria().is_err());
}

#[test]
fn file_name_gets_xlsx_extension_once() {
    assert_eq!(run::with_xlsx_extension("acme"), "acme.xlsx");
    assert_eq!(run::with_xlsx_extension("acme.xlsx"), "acme.xlsx");
    assert_eq!(run::with_xlsx_extension(" Acme.XLSX "), "Acme.XLSX");
}
