pub mod questions;
pub mod stats;
pub mod users;

pub use questions::{create_question, delete_question, list_questions, update_question};
pub use stats::get_statistics;
pub use users::{
    create_user, get_user, list_user_sessions, list_users, reset_user_password,
    reset_user_progress, toggle_user_status, update_user,
};
