//! Tasks that make up the application as well as the resources they use.
pub mod buttons;
pub mod display;
pub mod environment;
pub mod orchestrate;
pub mod resources;
pub mod sound;
pub mod time_updater;
