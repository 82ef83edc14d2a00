/// Domain services
///
/// The services are the only entry points the HTTP layer calls. Each takes
/// the acting user's ID as an explicit argument and returns domain types or
/// a [`ServiceError`].
///
/// # Modules
///
/// - [`auth`]: Registration, email confirmation, login, refresh, logout
/// - [`project`]: Projects and memberships
/// - [`task`]: Tasks, board positioning and the dashboard
/// - [`user`]: User profiles
/// - [`mail`]: Outgoing mail collaborator
/// - [`pagination`], [`field`]: Request helpers shared by the services

pub mod auth;
pub mod error;
pub mod field;
pub mod mail;
pub mod pagination;
pub mod project;
pub mod task;
pub mod user;

pub use error::ServiceError;
