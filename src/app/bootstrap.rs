use crate::app::controller::AppController;
use crate::cli::Cli;
use crate::config::Config;
use crate::error::Result;

/// Entry point used by `main` to bootstrap the controller.
pub fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(&cli.config)?;
    if let Some(path) = cli.history_file {
        config.history_file = path;
    }
    let controller = AppController::new(config);
    controller.run(cli.command)
}
