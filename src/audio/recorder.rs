//! Microphone recording lifecycle
//!
//! Owns the capture session end to end: requesting the device, buffering
//! samples, driving the silence detector, ticking elapsed time, and
//! finalizing the capture into a WAV blob. One session at a time; every
//! exit path releases the device, the ticker, and the detector exactly once.

use crate::audio::silence::{SilenceConfig, SilenceDetector};
use crate::audio::{encode_wav, LevelTap, RecordedAudio};
use crate::config::WidgetConfig;
use crate::{ParleyError, Result};
use chrono::Utc;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

type SpeakingListener = Arc<dyn Fn() + Send + Sync>;

/// Everything owned for the lifetime of one capture
struct RecordingSession {
    stream: Stream,
    samples: Arc<Mutex<Vec<f32>>>,
    detector: SilenceDetector,
    ticker_stop: Arc<AtomicBool>,
    ticker: JoinHandle<()>,
}

impl RecordingSession {
    /// Tear down the session: detector, ticker, then the audio track.
    /// Consumes the session so teardown can only happen once.
    fn release(mut self) {
        self.detector.stop();
        self.ticker_stop.store(true, Ordering::SeqCst);
        let _ = self.ticker.join();
        drop(self.stream);
        debug!("Released capture session");
    }
}

pub struct Recorder {
    config: WidgetConfig,
    session: Option<RecordingSession>,
    on_speak_start: Option<SpeakingListener>,
    on_speak_end: Option<SpeakingListener>,
    recorded_tx: Sender<RecordedAudio>,
    recorded_rx: Receiver<RecordedAudio>,
    time_tx: Sender<String>,
    time_rx: Receiver<String>,
    failed_tx: Sender<String>,
    failed_rx: Receiver<String>,
}

impl Recorder {
    pub fn new(config: WidgetConfig) -> Self {
        let (recorded_tx, recorded_rx) = bounded(16);
        let (time_tx, time_rx) = bounded(16);
        let (failed_tx, failed_rx) = bounded(16);

        Self {
            config,
            session: None,
            on_speak_start: None,
            on_speak_end: None,
            recorded_tx,
            recorded_rx,
            time_tx,
            time_rx,
            failed_tx,
            failed_rx,
        }
    }

    /// Install the session-level speaking indicators the silence detector
    /// forwards to. Takes effect on the next `start`.
    pub fn set_speaking_listeners(
        &mut self,
        on_start: impl Fn() + Send + Sync + 'static,
        on_end: impl Fn() + Send + Sync + 'static,
    ) {
        self.on_speak_start = Some(Arc::new(on_start));
        self.on_speak_end = Some(Arc::new(on_end));
    }

    /// Completed captures, one per successful `stop`
    pub fn recorded(&self) -> Receiver<RecordedAudio> {
        self.recorded_rx.clone()
    }

    /// Elapsed-time strings ("mm:ss"), one per second while recording
    pub fn recording_time(&self) -> Receiver<String> {
        self.time_rx.clone()
    }

    /// Failure notices: device denied, unsupported, or encoding failed
    pub fn recording_failed(&self) -> Receiver<String> {
        self.failed_rx.clone()
    }

    /// Check if a capture session is active
    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    /// Begin a capture session.
    ///
    /// A second call while recording is a no-op. Device denial or an
    /// unsupported profile emits a recording-failed event and leaves the
    /// recorder Idle; no error propagates.
    pub fn start(&mut self) {
        if self.session.is_some() {
            warn!("Already recording");
            return;
        }

        if !self.config.enable_audio_input {
            warn!("Audio input disabled by configuration");
            let _ = self.failed_tx.try_send(
                ParleyError::ConfigError("audio input disabled".into()).user_message(),
            );
            return;
        }

        let _ = self.time_tx.try_send("00:00".to_string());

        match self.open_session() {
            Ok(session) => {
                info!("Started recording");
                self.session = Some(session);
            }
            Err(e) => {
                error!("Failed to start recording: {}", e);
                let _ = self.failed_tx.try_send(e.user_message());
            }
        }
    }

    /// Finalize the capture into a WAV blob and emit it, then release the
    /// device. Emits recording-failed instead if encoding fails; resources
    /// are released either way. A stop without a session is a no-op.
    pub fn stop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        let samples = session.samples.lock().clone();
        match encode_wav(&samples, self.config.sample_rate, self.config.channels) {
            Ok(data) => {
                let title = recording_title(Utc::now().timestamp_millis());
                info!("Finished recording: {} ({} bytes)", title, data.len());
                let _ = self.recorded_tx.try_send(RecordedAudio { data, title });
            }
            Err(e) => {
                error!("Failed to finalize recording: {}", e);
                let _ = self.failed_tx.try_send(e.user_message());
            }
        }
        session.release();
    }

    /// Release the device without producing a blob
    pub fn abort(&mut self) {
        if let Some(session) = self.session.take() {
            info!("Recording aborted");
            session.release();
        }
    }

    fn open_session(&self) -> Result<RecordingSession> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or_else(|| {
            ParleyError::AudioDeviceError("No input device available".into())
        })?;

        info!(
            "Using input device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        // Fixed capture profile: mono, 48 kHz
        let stream_config = StreamConfig {
            channels: self.config.channels,
            sample_rate: SampleRate(self.config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let samples = Arc::new(Mutex::new(Vec::new()));
        // one second of level history is plenty for a 60 Hz poller
        let tap = LevelTap::new(self.config.sample_rate as usize);

        let channels = self.config.channels as usize;
        let samples_writer = Arc::clone(&samples);
        let tap_writer = tap.clone();

        let err_fn = |err| {
            error!("Audio input stream error: {}", err);
        };

        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // Convert to mono if necessary
                    let mono: Vec<f32> = if channels == 1 {
                        data.to_vec()
                    } else {
                        data.chunks(channels)
                            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                            .collect()
                    };
                    tap_writer.write(&mono);
                    samples_writer.lock().extend_from_slice(&mono);
                },
                err_fn,
                None,
            )
            .map_err(|e| {
                ParleyError::AudioDeviceError(format!("Failed to build input stream: {}", e))
            })?;

        stream.play().map_err(|e| {
            ParleyError::AudioDeviceError(format!("Failed to start input stream: {}", e))
        })?;

        let on_start = self.on_speak_start.clone();
        let on_end = self.on_speak_end.clone();
        let detector = SilenceDetector::attach(
            tap,
            SilenceConfig {
                silence_delay: self.config.silence_delay,
                min_decibels: self.config.min_decibels,
            },
            Box::new(move || {
                if let Some(listener) = &on_start {
                    listener();
                }
            }),
            Box::new(move || {
                if let Some(listener) = &on_end {
                    listener();
                }
            }),
        )?;

        let ticker_stop = Arc::new(AtomicBool::new(false));
        let ticker = spawn_ticker(Instant::now(), self.time_tx.clone(), Arc::clone(&ticker_stop));

        Ok(RecordingSession {
            stream,
            samples,
            detector,
            ticker_stop,
            ticker,
        })
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Emit an elapsed-time string once per second until stopped
fn spawn_ticker(
    started_at: Instant,
    time_tx: Sender<String>,
    stop: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut last_whole = 0;
        while !stop.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(100));
            let secs = started_at.elapsed().as_secs();
            if secs != last_whole {
                last_whole = secs;
                let _ = time_tx.try_send(format_elapsed(started_at.elapsed()));
            }
        }
    })
}

/// Format an elapsed duration as a clamped, zero-padded "mm:ss" string
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let minutes = (total / 60).min(99);
    let seconds = total % 60;
    format!("{}:{}", pad_unit(minutes), pad_unit(seconds))
}

fn pad_unit(value: u64) -> String {
    if value == 0 {
        "00".to_string()
    } else if value < 10 {
        format!("0{}", value)
    } else {
        value.to_string()
    }
}

/// Upload filename for a finished capture. The generated name contains no
/// characters that need percent-encoding, so it is already URL-safe.
fn recording_title(epoch_ms: i64) -> String {
    format!("audio_{}.mp3", epoch_ms)
}
