use mongodb::Database;
use rollcall_config::Settings;
use rollcall_services::{
    AuthService, Clock, SystemClock,
    attendance::{AttendancePolicy, AttendanceService},
    dao::{meeting::MeetingDao, user::UserDao},
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub settings: Settings,
    pub auth: Arc<AuthService>,
    pub clock: Arc<dyn Clock>,
    pub users: Arc<UserDao>,
    pub meetings: Arc<MeetingDao>,
    pub attendance: Arc<AttendanceService>,
}

impl AppState {
    pub fn new(db: Database, settings: Settings) -> Self {
        let auth = Arc::new(AuthService::new(settings.jwt.clone()));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let users = Arc::new(UserDao::new(&db));
        let meetings = Arc::new(MeetingDao::new(&db));
        let attendance = Arc::new(AttendanceService::new(
            meetings.clone(),
            clock.clone(),
            AttendancePolicy::from(&settings.attendance),
        ));

        Self {
            db,
            settings,
            auth,
            clock,
            users,
            meetings,
            attendance,
        }
    }
}
