use thiserror::Error;

/// Framework-wide error type.
///
/// Controller construction and dispatch-queue building fail synchronously
/// with these variants; everything that happens inside a running queue step
/// reports through the response instead.
#[derive(Debug, Error)]
pub enum Error {
	/// No controller registered under this name
	#[error("controller '{0}' is not defined")]
	UnknownController(String),

	/// The dispatched action does not exist on the controller
	#[error("undefined action '{action}' on controller '{controller}'")]
	UndefinedAction { controller: String, action: String },

	/// Authorization failure (CSRF and friends)
	#[error("authorization failed: {0}")]
	Authorization(String),

	/// View rendering error
	#[error("render error: {0}")]
	Render(String),

	/// Serialization error
	#[error("serialization error: {0}")]
	Serialization(String),

	/// Invalid input or configuration
	#[error("invalid: {0}")]
	Invalid(String),

	/// Internal error
	#[error("internal error: {0}")]
	Internal(String),
}

/// Framework-wide result alias
pub type Result<T> = std::result::Result<T, Error>;
