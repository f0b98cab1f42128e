mod handlers;
mod models;
mod process;
mod state;
mod upload;

pub use handlers::{router, run_server};
pub use state::ServerState;
