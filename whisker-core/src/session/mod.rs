//! Session layer: authenticated-identity lifecycle and observable state

mod diagnostics;
mod manager;
mod state;

pub use diagnostics::AuthReport;
pub use manager::{MIN_PASSWORD_LEN, SessionManager};
pub use state::SessionState;
