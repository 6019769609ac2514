use anyhow::Result;
use clap::Parser;
use stopbias::cli::{Cli, OutputFormat};
use stopbias::config::AnalysisConfig;
use stopbias::csv_output::CsvOutput;
use stopbias::json_output::JsonOutput;
use stopbias::report::BiasReport;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber, logging to stderr
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_file(path)?,
        None => AnalysisConfig::default(),
    };
    args.apply_overrides(&mut config);

    let report = BiasReport::build(&config, &args.run_inputs())?;

    match args.format {
        OutputFormat::Text => print!("{}", report.to_text()),
        OutputFormat::Json => println!("{}", JsonOutput::new(&report).to_json()?),
        OutputFormat::Csv => {
            let mut output = CsvOutput::new();
            output.extend(report.test_results());
            print!("{}", output.to_csv()?);
        }
    }

    Ok(())
}
