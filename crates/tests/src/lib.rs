pub mod fixtures;

#[cfg(test)]
mod attendance_tests;
#[cfg(test)]
mod auth_tests;
#[cfg(test)]
mod meeting_tests;
