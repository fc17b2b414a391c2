pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Conflict: {message}")]
	Conflict { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Transport error: {message}")]
	Transport { message: String },
	#[error("Identity error: {message}")]
	Identity { message: String },
	#[error("Local store error: {message}")]
	LocalStore { message: String },
}
impl Error {
	/// True when the write may have landed even though the call failed.
	pub fn is_ambiguous(&self) -> bool {
		matches!(self, Self::Transport { .. } | Self::Identity { .. })
	}
}

impl From<tender_storage::Error> for Error {
	fn from(err: tender_storage::Error) -> Self {
		if err.is_unique_violation() {
			return Self::Conflict { message: err.to_string() };
		}
		if err.is_transport() {
			return Self::Transport { message: err.to_string() };
		}

		match err {
			tender_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			other => Self::Storage { message: other.to_string() },
		}
	}
}

impl From<tender_domain::ParamsError> for Error {
	fn from(err: tender_domain::ParamsError) -> Self {
		Self::InvalidRequest { message: err.to_string() }
	}
}

impl From<tender_config::Error> for Error {
	fn from(err: tender_config::Error) -> Self {
		Self::InvalidRequest { message: err.to_string() }
	}
}
