//! Speech-boundary detection over a live capture level signal
//!
//! `SilenceTracker` is the pure state machine; `SilenceDetector` wraps it in
//! a polling thread with an explicit stop handle so the loop can never
//! outlive the capture session that feeds it.

use crate::audio::LevelTap;
use crate::{ParleyError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// How long the signal must stay quiet before speech-end fires
pub const DEFAULT_SILENCE_DELAY: Duration = Duration::from_millis(1000);

/// Energy floor in dBFS; anything at or below this counts as silence
pub const DEFAULT_MIN_DECIBELS: f32 = -80.0;

/// Polling cadence, roughly one tick per display refresh
const POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Callback fired on a speech boundary
pub type SpeechCallback = Box<dyn FnMut() + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechEvent {
    Started,
    Ended,
}

#[derive(Clone, Debug)]
pub struct SilenceConfig {
    pub silence_delay: Duration,
    pub min_decibels: f32,
}

impl Default for SilenceConfig {
    fn default() -> Self {
        Self {
            silence_delay: DEFAULT_SILENCE_DELAY,
            min_decibels: DEFAULT_MIN_DECIBELS,
        }
    }
}

/// Classifies a level trace into alternating speech-start/speech-end events.
///
/// `Started` fires at most once per burst: after it fires, the tracker is
/// disarmed until the signal has stayed below the floor for the configured
/// delay, at which point `Ended` fires and the tracker re-arms. `Ended`
/// never fires before the first `Started`.
pub struct SilenceTracker {
    config: SilenceConfig,
    last_loud: Instant,
    armed: bool,
    speech_started: bool,
}

impl SilenceTracker {
    pub fn new(config: SilenceConfig, now: Instant) -> Self {
        Self {
            config,
            last_loud: now,
            armed: true,
            speech_started: false,
        }
    }

    /// Feed one level observation, returning the boundary event it crossed
    pub fn update(&mut self, level_db: f32, now: Instant) -> Option<SpeechEvent> {
        if level_db > self.config.min_decibels {
            self.last_loud = now;
            self.speech_started = true;
            if self.armed {
                self.armed = false;
                return Some(SpeechEvent::Started);
            }
        } else if !self.armed
            && self.speech_started
            && now.duration_since(self.last_loud) > self.config.silence_delay
        {
            self.armed = true;
            return Some(SpeechEvent::Ended);
        }
        None
    }

    /// Whether a speech burst is currently in progress
    pub fn is_speaking(&self) -> bool {
        !self.armed
    }
}

/// Root-mean-square level of a frame in dBFS
///
/// An empty or all-zero frame reports negative infinity, i.e. below any
/// configurable floor.
pub fn rms_dbfs(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return f32::NEG_INFINITY;
    }
    let mean_square = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    if mean_square <= 0.0 {
        return f32::NEG_INFINITY;
    }
    10.0 * mean_square.log10()
}

/// Polling loop over a [`LevelTap`] with an explicit disposer.
///
/// The owner must call [`SilenceDetector::stop`] (or drop the detector) when
/// the capture stream is released; nothing else stops the loop.
pub struct SilenceDetector {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SilenceDetector {
    /// Attach to a capture tap and start polling at ~60 Hz
    pub fn attach(
        tap: LevelTap,
        config: SilenceConfig,
        mut on_speech_start: SpeechCallback,
        mut on_speech_end: SpeechCallback,
    ) -> Result<Self> {
        if config.silence_delay.is_zero() {
            return Err(ParleyError::ConfigError(
                "silence_delay must be non-zero".into(),
            ));
        }
        if config.min_decibels >= 0.0 {
            return Err(ParleyError::ConfigError(format!(
                "min_decibels must be negative (dBFS), got {}",
                config.min_decibels
            )));
        }

        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = thread::spawn(move || {
            let mut tracker = SilenceTracker::new(config, Instant::now());
            while !stop_flag.load(Ordering::SeqCst) {
                let frame = tap.drain();
                let level = rms_dbfs(&frame);
                match tracker.update(level, Instant::now()) {
                    Some(SpeechEvent::Started) => {
                        debug!("Speech started ({:.1} dBFS)", level);
                        on_speech_start();
                    }
                    Some(SpeechEvent::Ended) => {
                        debug!("Speech ended");
                        on_speech_end();
                    }
                    None => {}
                }
                thread::sleep(POLL_INTERVAL);
            }
        });

        info!("Silence detector attached");
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Stop the polling loop and wait for it to exit. Safe to call twice.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            debug!("Silence detector stopped");
        }
    }
}

impl Drop for SilenceDetector {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    fn config(delay_ms: u64) -> SilenceConfig {
        SilenceConfig {
            silence_delay: Duration::from_millis(delay_ms),
            min_decibels: -80.0,
        }
    }

    /// Replay a level trace at a fixed tick length, collecting events
    fn run_trace(levels: &[f32], delay_ms: u64, tick_ms: u64) -> Vec<SpeechEvent> {
        let start = Instant::now();
        let mut tracker = SilenceTracker::new(config(delay_ms), start);
        let mut events = Vec::new();
        for (i, &level) in levels.iter().enumerate() {
            let now = start + Duration::from_millis(tick_ms * (i + 1) as u64);
            if let Some(event) = tracker.update(level, now) {
                events.push(event);
            }
        }
        events
    }

    #[test]
    fn test_start_end_alternate() {
        // loud burst, long silence, loud burst, long silence
        let mut trace = vec![-20.0; 5];
        trace.extend(vec![-95.0; 10]);
        trace.extend(vec![-15.0; 5]);
        trace.extend(vec![-95.0; 10]);

        let events = run_trace(&trace, 100, 50);
        assert_eq!(
            events,
            vec![
                SpeechEvent::Started,
                SpeechEvent::Ended,
                SpeechEvent::Started,
                SpeechEvent::Ended,
            ]
        );
    }

    #[test]
    fn test_no_end_without_start() {
        let trace = vec![-95.0; 50];
        let events = run_trace(&trace, 100, 50);
        assert!(events.is_empty());
    }

    #[test]
    fn test_no_double_start() {
        // sustained loudness fires exactly one start
        let trace = vec![-10.0; 100];
        let events = run_trace(&trace, 100, 50);
        assert_eq!(events, vec![SpeechEvent::Started]);
    }

    #[test]
    fn test_brief_dip_does_not_end_speech() {
        // 50 ms dip is shorter than the 200 ms delay
        let mut trace = vec![-20.0; 4];
        trace.push(-95.0);
        trace.extend(vec![-20.0; 4]);

        let events = run_trace(&trace, 200, 50);
        assert_eq!(events, vec![SpeechEvent::Started]);
    }

    #[test]
    fn test_min_decibels_is_authoritative() {
        // everything below the floor, however energetic, stays silence
        let quiet = vec![-85.0; 20];
        let events = run_trace(&quiet, 100, 50);
        assert!(events.is_empty());

        let mut cfg = config(100);
        cfg.min_decibels = -30.0;
        let start = Instant::now();
        let mut tracker = SilenceTracker::new(cfg, start);
        assert!(tracker
            .update(-40.0, start + Duration::from_millis(10))
            .is_none());
        assert_eq!(
            tracker.update(-20.0, start + Duration::from_millis(20)),
            Some(SpeechEvent::Started)
        );
    }

    #[test]
    fn test_rms_dbfs() {
        assert_eq!(rms_dbfs(&[]), f32::NEG_INFINITY);
        assert_eq!(rms_dbfs(&[0.0; 128]), f32::NEG_INFINITY);

        // full-scale square wave sits at 0 dBFS
        let full: Vec<f32> = vec![1.0; 128];
        assert!(rms_dbfs(&full).abs() < 0.01);

        // half amplitude is about -6 dBFS
        let half: Vec<f32> = vec![0.5; 128];
        assert!((rms_dbfs(&half) + 6.02).abs() < 0.1);
    }

    #[test]
    fn test_detector_fires_and_stops() {
        let tap = LevelTap::new(4800);
        let (tx, rx) = unbounded();
        let tx_end = tx.clone();

        let mut detector = SilenceDetector::attach(
            tap.clone(),
            config(100),
            Box::new(move || tx.send(SpeechEvent::Started).unwrap()),
            Box::new(move || tx_end.send(SpeechEvent::Ended).unwrap()),
        )
        .unwrap();

        // feed a loud burst, then go quiet
        tap.write(&vec![0.5; 480]);
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(
            rx.recv_timeout(Duration::from_millis(500)),
            Ok(SpeechEvent::Started)
        );
        assert_eq!(
            rx.recv_timeout(Duration::from_millis(1000)),
            Ok(SpeechEvent::Ended)
        );

        detector.stop();
        detector.stop(); // second stop is a no-op
    }

    #[test]
    fn test_bad_config_rejected() {
        let tap = LevelTap::new(64);
        let bad = SilenceConfig {
            silence_delay: Duration::ZERO,
            min_decibels: -80.0,
        };
        assert!(
            SilenceDetector::attach(tap.clone(), bad, Box::new(|| {}), Box::new(|| {})).is_err()
        );

        let bad = SilenceConfig {
            silence_delay: DEFAULT_SILENCE_DELAY,
            min_decibels: 3.0,
        };
        assert!(SilenceDetector::attach(tap, bad, Box::new(|| {}), Box::new(|| {})).is_err());
    }
}
