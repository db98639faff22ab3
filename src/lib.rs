pub mod audio;
pub mod client;
pub mod config;
pub mod messages;
pub mod session;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ParleyError {
    #[error("Audio device error: {0}")]
    AudioDeviceError(String),

    #[error("Recording error: {0}")]
    RecordingError(String),

    #[error("Audio processing error: {0}")]
    AudioProcessingError(String),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("IO error: {0}")]
    IOError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Channel error: {0}")]
    ChannelError(String),
}

impl From<std::io::Error> for ParleyError {
    fn from(e: std::io::Error) -> Self {
        ParleyError::IOError(e.to_string())
    }
}

impl ParleyError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Hardware/device errors may require user intervention
            ParleyError::AudioDeviceError(_) => false,
            // Recording failures clear back to Idle and can be retried
            ParleyError::RecordingError(_) => true,
            ParleyError::AudioProcessingError(_) => true,
            // Network and payload errors are absorbed by the apology path
            ParleyError::TransportError(_) => true,
            ParleyError::MalformedPayload(_) => true,
            ParleyError::IOError(_) => false,
            ParleyError::ConfigError(_) => false,
            ParleyError::ChannelError(_) => false,
        }
    }

    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            ParleyError::AudioDeviceError(_) => {
                "Audio device error. Please check your microphone.".to_string()
            }
            ParleyError::RecordingError(_) => {
                "Recording failed. Please try again.".to_string()
            }
            ParleyError::AudioProcessingError(_) => {
                "Audio processing failed. Please try again.".to_string()
            }
            ParleyError::TransportError(_) => {
                "Could not reach the assistant. Please try again.".to_string()
            }
            ParleyError::MalformedPayload(_) => {
                "The assistant sent a response we could not read.".to_string()
            }
            ParleyError::IOError(_) => "File system error occurred.".to_string(),
            ParleyError::ConfigError(_) => {
                "Configuration error. Please check settings.".to_string()
            }
            ParleyError::ChannelError(_) => {
                "Internal communication error. Please restart the application.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ParleyError>;
