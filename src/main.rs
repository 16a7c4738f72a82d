use clap::Parser;
use std::path::PathBuf;

use stampr::configuration::WatermarkConfiguration;

#[derive(Parser, Debug)]
#[command(version, long_about = None)]
struct CliArguments {
    #[arg(short = 'i', long = "input", value_name = "pdf_file")]
    input_file_path: PathBuf,
    #[arg(short = 'o', long = "output", value_name = "file_path")]
    output_file_path: PathBuf,
    /// The watermark text; falls back to the configured default when omitted.
    #[arg(short = 't', long = "text", value_name = "watermark_text")]
    watermark_text: Option<String>,
    #[arg(short = 'c', long = "configuration", value_name = "json_file")]
    configuration_file_path: Option<PathBuf>,
}

fn main() {
    if let Err(error) = fallible_main() {
        log::error!("{}", error);
        std::process::exit(1);
    }
}

fn fallible_main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
    let arguments = CliArguments::parse();
    log::debug!("{:?}", arguments);

    let configuration = match &arguments.configuration_file_path {
        Some(configuration_file_path) => {
            WatermarkConfiguration::from_path(configuration_file_path)?
        }
        None => WatermarkConfiguration::default(),
    };
    let watermark_text = configuration.resolve_text(arguments.watermark_text.as_deref());

    let pdf_bytes = std::fs::read(&arguments.input_file_path)?;
    let watermarked_bytes = stampr::compositor::watermark_pdf(&pdf_bytes, watermark_text)?;
    std::fs::write(&arguments.output_file_path, watermarked_bytes)?;
    log::info!(
        "Saved the watermarked document to the path: {:?}",
        arguments.output_file_path
    );

    Ok(())
}
