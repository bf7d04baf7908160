//! Command definitions
//!
//! The three commands the client issues.

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    Get,
    Set,
    Auth,
}

impl CommandType {
    /// Command name as sent on the wire
    pub fn name(&self) -> &'static [u8] {
        match self {
            CommandType::Get => b"GET",
            CommandType::Set => b"SET",
            CommandType::Auth => b"AUTH",
        }
    }
}

/// A command ready to be encoded
#[derive(Clone, PartialEq, Eq)]
pub enum Command {
    /// Get a value by key
    Get { key: Vec<u8> },

    /// Set a key-value pair
    Set { key: Vec<u8>, value: Vec<u8> },

    /// Authenticate the connection
    Auth { password: Vec<u8> },
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Get { .. } => CommandType::Get,
            Command::Set { .. } => CommandType::Set,
            Command::Auth { .. } => CommandType::Auth,
        }
    }

    /// Positional arguments following the command name
    pub fn args(&self) -> Vec<&[u8]> {
        match self {
            Command::Get { key } => vec![key.as_slice()],
            Command::Set { key, value } => vec![key.as_slice(), value.as_slice()],
            Command::Auth { password } => vec![password.as_slice()],
        }
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Get { key } => f
                .debug_struct("Get")
                .field("key", &String::from_utf8_lossy(key))
                .finish(),
            Command::Set { key, value } => f
                .debug_struct("Set")
                .field("key", &String::from_utf8_lossy(key))
                .field("value_len", &value.len())
                .finish(),
            // Never print the password
            Command::Auth { .. } => f.debug_struct("Auth").finish_non_exhaustive(),
        }
    }
}
