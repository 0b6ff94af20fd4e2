//! Binary entry point: config, logging, and the winit event loop.

mod app;

use tellus_config::{CliArgs, Config, default_config_dir};
use winit::event_loop::EventLoop;

use crate::app::App;

fn main() {
    let args = CliArgs::from_env();
    let config_dir = args.config.clone().unwrap_or_else(default_config_dir);

    let mut config = match Config::load_or_create(&config_dir) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("config unavailable ({error}), using defaults");
            Config::default()
        }
    };
    config.apply_cli_overrides(&args);

    tellus_log::init_logging(Some(&config));

    let event_loop = EventLoop::new().expect("failed to create event loop");
    let mut app = App::new(config);
    event_loop.run_app(&mut app).expect("event loop failed");
}
