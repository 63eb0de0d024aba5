//! Authentication and authorization on top of the converted Sentinel schema.
//!
//! [`Sentinel`] owns the database connection and exposes user registration,
//! logins bound to an explicit [`Session`], activations, password reminders,
//! roles and permission checks.

pub use activations::Model as Activation;
pub use error::SentinelError;
pub use ops::{Sentinel, SentinelBuilder};
pub use permissions::Permissions;
pub use reminders::Model as Reminder;
pub use roles::Role;
pub use session::Session;
pub use users::{Credentials, User};

mod activations;
mod error;
mod ops;
mod permissions;
mod persistences;
mod reminders;
mod role_users;
mod roles;
mod session;
mod users;
mod util;

type ResultSentinel<T> = Result<T, SentinelError>;
