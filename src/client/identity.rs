use crate::model::MAX_USERNAME_CHARS;

use super::ClientError;

/// Free-text display name attached to outgoing messages. Not unique, not
/// authenticated.
#[derive(Debug, Default, Clone)]
pub struct Identity {
    name: Option<String>,
}

impl Identity {
    pub fn set(&mut self, raw: &str) -> Result<&str, ClientError> {
        let name = raw.trim();
        if name.is_empty() || name.chars().count() > MAX_USERNAME_CHARS {
            return Err(ClientError::InvalidName);
        }
        Ok(self.name.insert(name.to_owned()))
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}
