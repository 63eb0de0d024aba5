//! Login state for one client.
//!
//! A [`Session`] carries the persistence code created by
//! [`Sentinel::login`](crate::Sentinel::login). Callers keep it next to their
//! request or connection and pass it back to `check` / `logout`.

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    pub(crate) code: Option<String>,
    pub(crate) remember: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a session from a code handed out earlier, e.g. a cookie.
    pub fn resume(code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            remember: true,
        }
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn is_guest(&self) -> bool {
        self.code.is_none()
    }

    /// Whether the login asked to be remembered across restarts.
    pub fn remembered(&self) -> bool {
        self.remember
    }

    pub(crate) fn clear(&mut self) {
        self.code = None;
        self.remember = false;
    }
}
