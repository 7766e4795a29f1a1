// Utility functions

pub mod request_info;

pub use request_info::{client_ip, extract_referrer, extract_user_agent};
