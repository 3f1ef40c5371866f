pub mod attendance;
pub mod tenant;
pub mod user;

pub use attendance::{ApplicationRef, AttendanceRow};
pub use tenant::{App, Organization, Tenant};
pub use user::{User, USER_COLUMNS};
