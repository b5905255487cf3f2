mod meeting;
mod user;

pub use meeting::{AttendanceSession, Meeting, MeetingStatus};
pub use user::{User, UserRole};
