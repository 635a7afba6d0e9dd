mod app;
mod error;
mod logging;
mod mirror;
mod model;
mod nav;
mod services;
mod theme;
mod ui;
mod widgets;

use anyhow::Result;

fn main() -> Result<()> {
    let config = ui::load_config()?;
    let _log_guard = logging::init_logging(&config.log)?;
    ui::run(config)
}
