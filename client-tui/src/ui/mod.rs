pub mod app;
pub mod widgets;

pub mod render_loop;

pub use render_loop::run_app;
