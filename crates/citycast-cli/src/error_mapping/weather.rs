use citycast_core::{AppError, ConfigError, NetworkError, ReqwestErrorExt, WeatherError};
use citycast_weather::WeatherError as ServiceError;

pub trait WeatherErrorExt {
    fn into_app_error(self) -> AppError;
}

impl WeatherErrorExt for ServiceError {
    fn into_app_error(self) -> AppError {
        match self {
            ServiceError::Network(e) => AppError::Network(e.into_network_error()),
            ServiceError::MissingApiKey => AppError::Config(ConfigError::MissingSetting(
                "weather.api_key (or OPENWEATHER_API_KEY)".into(),
            )),
            ServiceError::InvalidApiKey => AppError::Weather(WeatherError::InvalidApiKey),
            ServiceError::LocationNotFound(s) => {
                AppError::Weather(WeatherError::LocationNotFound(s))
            }
            ServiceError::Api { status: 503, .. } => {
                AppError::Weather(WeatherError::ServiceUnavailable)
            }
            ServiceError::Api { status, message } if status >= 500 => {
                AppError::Network(NetworkError::ServerError { status, message })
            }
            ServiceError::Api { status, message } => {
                AppError::Weather(WeatherError::ApiError(format!("{}: {}", status, message)))
            }
            ServiceError::Parse(s) => AppError::Network(NetworkError::InvalidResponse(s)),
        }
    }
}
