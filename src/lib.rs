//=========================================================================
// Railway Runner: Library Root
//
// This crate defines the public API surface of the Railway Runner scene
// lifecycle core.
//
// Responsibilities:
// - Expose the top-level facade (`Game`, `GameBuilder`)
// - Expose the lifecycle core (`core`) for gameplay code that talks to
//   the `SceneManager` directly
// - Ship the prototype's scene declarations (`scenes`)
//
// Typical usage:
// ```no_run
// use railway_runner::{scenes, GameBuilder};
//
// fn main() {
//     let mut game = scenes::install(GameBuilder::new()).unwrap().build();
//     game.run().unwrap();
// }
// ```
//
//=========================================================================

//--- Public Modules ------------------------------------------------------
//
// `core` contains the loading pipeline, the dependency container and the
// scene manager.
//
pub mod core;
pub mod prelude;
pub mod scenes;

//--- Internal Modules ----------------------------------------------------
//
// `game` defines the main entry point and its builder.
//
mod game;

//--- Public Exports ------------------------------------------------------
pub use game::{Game, GameBuilder};
