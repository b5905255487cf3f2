pub mod attendance;
pub mod auth;
pub mod clock;
pub mod dao;

pub use attendance::AttendanceService;
pub use auth::AuthService;
pub use clock::{Clock, SystemClock};
