use serde::{Deserialize, Serialize};

/// Acting user within the current tenant.
///
/// Sourced from the authentication layer and passed explicitly into every
/// permission check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    uid: String,
    role: String,
    department: String,
}

impl Identity {
    /// Creates an identity from authentication and membership data.
    #[must_use]
    pub fn new(
        uid: impl Into<String>,
        role: impl Into<String>,
        department: impl Into<String>,
    ) -> Self {
        Self {
            uid: uid.into(),
            role: role.into(),
            department: department.into(),
        }
    }

    /// Returns the stable user id.
    #[must_use]
    pub fn uid(&self) -> &str {
        self.uid.as_str()
    }

    /// Returns the role key as stored on the membership.
    #[must_use]
    pub fn role(&self) -> &str {
        self.role.as_str()
    }

    /// Returns the department key as stored on the membership.
    #[must_use]
    pub fn department(&self) -> &str {
        self.department.as_str()
    }
}
