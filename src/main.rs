//=========================================================================
// Railway Runner: Binary Entry Point
//
// Installs the logger, declares the prototype scenes and blocks until the
// initial scene is active. Set `RUST_LOG=debug` to see container traces.
//
//=========================================================================

use std::process::ExitCode;

use log::{error, info};
use railway_runner::scenes::{self, RunInteractor, ScoreRepository};
use railway_runner::GameBuilder;

fn main() -> ExitCode {
    env_logger::init();

    let builder = match scenes::install(GameBuilder::new()) {
        Ok(builder) => builder,
        Err(err) => {
            error!("Invalid scene declaration: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let mut game = builder.build();
    if let Err(err) = game.run() {
        error!("{}", err);
        return ExitCode::FAILURE;
    }

    let manager = game.scene_manager();
    let (Ok(run), Ok(score)) = (
        manager.get_interactor::<RunInteractor>(),
        manager.get_repository::<ScoreRepository>(),
    ) else {
        error!("Railway services missing after activation");
        return ExitCode::FAILURE;
    };

    while run.advance() {}
    info!("Reached segment {} with score {}", run.position(), score.score());

    for trace in manager.last_traces() {
        info!("\n{}", trace.render());
    }

    ExitCode::SUCCESS
}
