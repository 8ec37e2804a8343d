mod cli;

use std::process::ExitCode;

use clap::Parser;
use strata_raster::{LayerStack, ManifestStack};
use strata_runtime::{CancelToken, LogObserver, export_mesh};

use crate::cli::{Cli, CliError};

/// Exit status for an export that was cancelled, as after SIGINT.
const EXIT_CANCELLED: u8 = 130;

fn run(cli: &Cli) -> Result<(), CliError> {
    let options = cli.export_options()?;
    let stack = ManifestStack::from_path(&cli.manifest)?;
    log::debug!(
        "{}: {} layers, pixel {:?}, bounds {:?}",
        cli.manifest.display(),
        stack.layer_count(),
        stack.pixel_size(),
        stack.bounds()
    );
    let cancel = CancelToken::new();
    let report = export_mesh(&stack, &cli.output, &options, &cancel, &LogObserver)?;
    log::info!(
        "{}: {} triangles ({} faces from {} runs, {} layers from {}) in {}ms",
        report.output.display(),
        report.triangles,
        report.faces.root_faces,
        report.faces.run_faces,
        report.layers,
        report.first_layer,
        report.timings.total.as_millis()
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_cancelled() => {
            log::warn!("{e}");
            ExitCode::from(EXIT_CANCELLED)
        }
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
