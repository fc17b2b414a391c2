#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Decode error: {0}")]
	Decode(String),
}
impl Error {
	/// True when Postgres rejected a write because the row already exists.
	pub fn is_unique_violation(&self) -> bool {
		match self {
			Self::Sqlx(sqlx::Error::Database(err)) => err.is_unique_violation(),
			_ => false,
		}
	}

	/// True when the request may or may not have reached the database.
	///
	/// Pool, TLS and worker failures happen before a statement is sent, so they are definite.
	pub fn is_transport(&self) -> bool {
		matches!(self, Self::Sqlx(sqlx::Error::Io(_) | sqlx::Error::Protocol(_)))
	}
}
