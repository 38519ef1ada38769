/// Caller identity carried by the `X-User-Id` / `X-User-Name` headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// Stable user identifier.
    pub user_id: String,
    /// Display name; defaults to the identifier when the name header is absent.
    pub display_name: String,
}

impl Caller {
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
        }
    }
}
