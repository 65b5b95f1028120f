//! Credential handling for signup and login.
//!
//! There are no sessions or tokens: login checks the password and returns the user's id, which
//! clients pass back on later requests (e.g. as `user_id` on uploads).

pub mod password;
