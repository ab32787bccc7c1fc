// Server module entry point
// Listener creation, TLS setup, connection serving and the accept loop

pub mod connection;
pub mod listener;
pub mod signal;
pub mod tls;

// `loop` is a keyword, so the module is named server_loop
#[path = "loop.rs"]
pub mod server_loop;

pub use connection::AccessLogOptions;
pub use listener::create_listener;
pub use server_loop::{run, ServeOptions};
pub use signal::shutdown_signal;
