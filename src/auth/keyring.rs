use keyring::Entry;

use crate::{auth::AuthProvider, errors::AppError};

/// API token stored in the platform secret store under `service`.
pub struct KeyringAuth {
    entry: Entry,
}

impl KeyringAuth {
    pub fn new(service: &str) -> Result<Self, AppError> {
        let user = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "default".to_string());
        let entry = Entry::new(service, &user)?;
        Ok(Self { entry })
    }
}

impl AuthProvider for KeyringAuth {
    fn get_token(&self) -> Result<String, AppError> {
        let token = self.entry.get_password()?;
        if token.trim().is_empty() {
            return Err(AppError::Keyring(keyring::Error::NoEntry));
        }
        Ok(token)
    }

    fn set_token(&self, token: &str) -> Result<(), AppError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::Validation("token cannot be empty".to_string()));
        }
        self.entry.set_password(token)?;
        Ok(())
    }
}
