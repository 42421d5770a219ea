//! Maps search errors to skycast_core::AppError for consistent user-facing messages.

use crate::types::GeocodeError;
use skycast_core::{AppError, NetworkError};

impl From<GeocodeError> for AppError {
    fn from(e: GeocodeError) -> Self {
        match e {
            GeocodeError::Network(n) => AppError::Network(n),
            GeocodeError::Client(s) => AppError::Network(NetworkError::ConnectionFailed(s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_maps_to_network_timeout() {
        let app: AppError = GeocodeError::Network(NetworkError::Timeout).into();
        assert_eq!(app.user_message(), "The request timed out. Please try again.");
    }

    #[test]
    fn test_client_error_maps_to_connection_failure() {
        let app: AppError = GeocodeError::Client("no tls backend".into()).into();
        assert!(matches!(app, AppError::Network(NetworkError::ConnectionFailed(_))));
    }
}
