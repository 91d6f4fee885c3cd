//! Persisted session keys

pub const AUTH_TOKEN: &str = "authToken";
pub const TOKEN_TYPE: &str = "tokenType";
pub const EXPIRES_IN: &str = "expiresIn";
pub const TOKEN_EXPIRATION: &str = "tokenExpiration";
pub const REFRESH_TOKEN: &str = "refreshToken";
pub const USER_INFO: &str = "userInfo";
pub const EMPLOYEE_ID: &str = "employeeId";
pub const USER_NAME: &str = "userName";
pub const USER_EMAIL: &str = "userEmail";
pub const CUSTOMER_ID: &str = "customerId";
pub const CUSTOMER_ORIGIN: &str = "customerOrigin";

/// Every key derived from a session; cleared together on logout.
pub const SESSION_KEYS: &[&str] = &[
    AUTH_TOKEN,
    TOKEN_TYPE,
    EXPIRES_IN,
    TOKEN_EXPIRATION,
    REFRESH_TOKEN,
    USER_INFO,
    EMPLOYEE_ID,
    USER_NAME,
    USER_EMAIL,
    CUSTOMER_ID,
    CUSTOMER_ORIGIN,
];
