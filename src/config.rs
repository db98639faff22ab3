//! Configuration for the conversational client
//!
//! Provides centralized configuration for the capture pipeline and the
//! backend endpoint.

use std::time::Duration;

/// Configuration for the complete widget core
#[derive(Clone, Debug)]
pub struct WidgetConfig {
    /// Base URL of the conversational backend, e.g. "http://localhost:8080"
    pub api_host: String,

    /// Sample rate requested from the microphone
    pub sample_rate: u32,

    /// Number of capture channels (the backend expects mono)
    pub channels: u16,

    /// How long the signal must stay below the floor before speech-end fires
    pub silence_delay: Duration,

    /// Energy floor in dBFS below which the signal counts as silence
    pub min_decibels: f32,

    /// Whether to enable microphone capture
    pub enable_audio_input: bool,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            api_host: "http://localhost:8080".to_string(),
            sample_rate: 48000,
            channels: 1,
            silence_delay: Duration::from_millis(1000),
            min_decibels: -80.0,
            enable_audio_input: true,
        }
    }
}

impl WidgetConfig {
    /// Create a configuration pointing at the given backend host
    pub fn with_api_host(api_host: impl Into<String>) -> Self {
        Self {
            api_host: api_host.into(),
            ..Self::default()
        }
    }

    /// Set the silence confirmation delay
    pub fn with_silence_delay(mut self, delay: Duration) -> Self {
        self.silence_delay = delay;
        self
    }

    /// Set the silence energy floor in dBFS
    pub fn with_min_decibels(mut self, min_decibels: f32) -> Self {
        self.min_decibels = min_decibels;
        self
    }

    /// Disable microphone capture (text-only mode)
    pub fn without_audio_input(mut self) -> Self {
        self.enable_audio_input = false;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.api_host.is_empty() {
            return Err("api_host is required".to_string());
        }
        if self.sample_rate == 0 {
            return Err("sample_rate must be non-zero".to_string());
        }
        if self.channels == 0 {
            return Err("channels must be non-zero".to_string());
        }
        if self.min_decibels >= 0.0 {
            return Err(format!(
                "min_decibels must be negative (dBFS), got {}",
                self.min_decibels
            ));
        }
        Ok(())
    }
}
