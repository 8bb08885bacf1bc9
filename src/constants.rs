/// Minimum number of operands a calculation accepts
pub const MIN_CALCULATION_INPUTS: usize = 2;

/// Maximum username length in characters
pub const MAX_USERNAME_LEN: usize = 50;

/// Maximum length of first and last name
pub const MAX_NAME_LEN: usize = 50;

/// Maximum email length (RFC 5321 path limit)
pub const MAX_EMAIL_LEN: usize = 254;

/// Maximum password length accepted before hashing
pub const MAX_PASSWORD_LEN: usize = 128;

/// Token type reported to clients on login/refresh
pub const BEARER_TOKEN_TYPE: &str = "bearer";

// =============================================================================
// Error Messages
// =============================================================================

/// Login failure; deliberately identical for unknown user and wrong password
pub const ERR_INVALID_CREDENTIALS: &str = "Incorrect username or password";

/// Duplicate username or email on registration
pub const ERR_USER_EXISTS: &str = "Username or email already exists";

/// Missing or malformed Authorization header
pub const ERR_NOT_AUTHENTICATED: &str = "Not authenticated";

/// Token could not be decoded or its subject no longer exists
pub const ERR_COULD_NOT_VALIDATE: &str = "Could not validate credentials";

/// Account exists but has been deactivated
pub const ERR_INACTIVE_USER: &str = "Inactive user";

/// Calculation id does not exist (or is not visible to the caller)
pub const ERR_CALCULATION_NOT_FOUND: &str = "Calculation not found";

/// Caller tried to act on behalf of another user
pub const ERR_FOREIGN_USER: &str = "Cannot act on calculations of another user";
