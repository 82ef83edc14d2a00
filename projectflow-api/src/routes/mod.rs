/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, confirmation and session endpoints
/// - `users`: User profiles
/// - `projects`: Projects and their members
/// - `tasks`: Tasks, board positions and the dashboard

pub mod auth;
pub mod health;
pub mod projects;
pub mod tasks;
pub mod users;
