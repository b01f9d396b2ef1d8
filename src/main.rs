use std::process::ExitCode;

use engine::{Engine, EngineConfig};
use log::*;

fn main() -> ExitCode {
    pretty_env_logger::init();

    match Engine::new(EngineConfig::default()).and_then(|engine| engine.run()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}
