//! Login Audit Aggregate

pub mod api;
pub mod entity;
pub mod repository;

pub use api::{LoginRecordState, login_record_router};
pub use entity::LoginRecord;
pub use repository::{LoginRecordQuery, LoginRecordRepository};
