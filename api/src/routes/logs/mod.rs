//! `/api/logs/*`: submission, lookup and per-owner history.

pub mod get_log_route;
pub mod history_route;
pub mod submit_log_request;
pub mod submit_log_route;
