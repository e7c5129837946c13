use secrecy::SecretString;

/// Process-wide secrets, injected where needed instead of read from ambient
/// state.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub access_secret: SecretString,
    pub refresh_secret: SecretString,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(access_secret: SecretString, refresh_secret: SecretString) -> Self {
        Self {
            access_secret,
            refresh_secret,
        }
    }
}
