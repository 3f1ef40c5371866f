pub mod attendance_service;
pub mod element_service;
pub mod identity_service;
