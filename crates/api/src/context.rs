use serde::Serialize;

/// Which grant path admitted a request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Grant {
    /// The pre-shared admin secret matched.
    AdminSecret,
    /// The default roles cover the permission.
    Default,
    /// The verified subject's roles cover the permission.
    Subject,
}

/// Authorization outcome attached to an admitted request's extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationContext {
    grant: Grant,
    access_token: Option<String>,
}

impl AuthorizationContext {
    pub fn new(grant: Grant, access_token: Option<String>) -> Self {
        Self {
            grant,
            access_token,
        }
    }

    pub fn grant(&self) -> Grant {
        self.grant
    }

    /// Access token of the verified subject, when a valid token was presented.
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }
}
