//! Result type alias for Claimwright

use super::errors::ClaimwrightError;

/// Result type alias for Claimwright operations
///
/// # Examples
///
/// ```
/// use claimwright::domain::result::Result;
/// use claimwright::domain::errors::ClaimwrightError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(ClaimwrightError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, ClaimwrightError>;
