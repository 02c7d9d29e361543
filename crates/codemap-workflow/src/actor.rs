use chrono::{DateTime, Utc};

/// The user performing an operation, and the instant it happens at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub login: String,
    pub now: DateTime<Utc>,
}

impl Actor {
    pub fn new(login: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            login: login.into(),
            now,
        }
    }

    /// Actor stamped with the current time.
    pub fn current(login: impl Into<String>) -> Self {
        Self::new(login, Utc::now())
    }

    pub fn is(&self, login: &str) -> bool {
        self.login == login
    }
}
