pub mod config;
pub mod logging;
pub mod predict;
pub mod train;
pub mod util;
