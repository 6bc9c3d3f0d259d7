//! Microphone capture using cpal
//!
//! The cpal stream is `!Send`, so it lives on a dedicated thread that owns it
//! for the whole capture session. Stopping the handle (or dropping it) ends
//! the thread and releases the device; the session teardown guarantees rely
//! on that, so the stream is never leaked.

use crate::error::{VoxError, VoxResult};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{info, warn};

const SAMPLE_RATE: u32 = 16000;
const CHUNK_SIZE: usize = 1024;

/// Handle to a running microphone capture
pub struct AudioCapture {
    stop: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl AudioCapture {
    /// Start capturing and return the handle plus a receiver of audio chunks
    pub fn start(device_index: Option<usize>) -> VoxResult<(Self, UnboundedReceiver<Vec<i16>>)> {
        let (tx, rx) = mpsc::unbounded_channel::<Vec<i16>>();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_thread = stop.clone();

        // Surface device/stream errors from the capture thread back to the caller
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<VoxResult<()>>();

        let thread = std::thread::spawn(move || {
            let stream = match build_stream(device_index, tx) {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    stream
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            if let Err(e) = stream.play() {
                warn!("Audio stream failed to start: {}", e);
                return;
            }

            while !stop_thread.load(Ordering::Relaxed) {
                std::thread::sleep(std::time::Duration::from_millis(50));
            }
            // Stream drops here, releasing the device
        });

        match ready_rx.recv() {
            Ok(Ok(())) => Ok((
                Self {
                    stop,
                    thread: Some(thread),
                },
                rx,
            )),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => Err(VoxError::Audio("capture thread died during setup".into())),
        }
    }

    /// Stop capture and release the input device
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }

    /// Whether the capture thread is still running
    pub fn is_active(&self) -> bool {
        self.thread
            .as_ref()
            .map(|t| !t.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

fn build_stream(
    device_index: Option<usize>,
    tx: mpsc::UnboundedSender<Vec<i16>>,
) -> VoxResult<cpal::Stream> {
    let host = cpal::default_host();

    // List available devices
    info!("Available audio input devices:");
    let devices = host
        .input_devices()
        .map_err(|e| VoxError::Permission(format!("cannot enumerate input devices: {e}")))?;
    for (i, device) in devices.enumerate() {
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let marker = if device_index == Some(i) { "*" } else { " " };
        info!("  {} [{}] {}", marker, i, name);
    }

    // Select device
    let device = if let Some(idx) = device_index {
        host.input_devices()
            .map_err(|e| VoxError::Permission(format!("cannot enumerate input devices: {e}")))?
            .nth(idx)
            .ok_or_else(|| VoxError::Capability(format!("device index {idx} out of range")))?
    } else {
        host.default_input_device()
            .ok_or_else(|| VoxError::Capability("no default input device".into()))?
    };

    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    info!("Using audio device: {}", device_name);

    let config = cpal::StreamConfig {
        channels: 1,
        sample_rate: cpal::SampleRate(SAMPLE_RATE),
        buffer_size: cpal::BufferSize::Fixed(CHUNK_SIZE as u32),
    };

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                if tx.send(data.to_vec()).is_err() {
                    warn!("Audio receiver dropped");
                }
            },
            |err| {
                warn!("Audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| VoxError::Permission(format!("cannot open input stream: {e}")))?;

    Ok(stream)
}
