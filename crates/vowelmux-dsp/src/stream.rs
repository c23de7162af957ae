//! Block streaming between a capture thread and a processing thread.
//!
//! The capture side records one block from every device per iteration and
//! pushes it into a bounded queue. When the queue is full the oldest queued
//! block is discarded so capture never stalls behind processing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use serde::Serialize;
use vowelmux_spec::StreamConfig;

use crate::device::CaptureDevice;
use crate::error::{DspError, DspResult};
use crate::signal::ChannelInputs;

/// Shared stop flag for a running stream.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates an unset token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that the stream stop after the block in flight.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true once [`CancelToken::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One captured block, keyed by channel label.
#[derive(Debug, Clone)]
pub struct Block {
    /// Capture sequence number, starting at zero.
    pub index: u64,
    /// Recorded audio per channel.
    pub inputs: ChannelInputs,
}

/// Counters reported when a stream ends.
///
/// A stream that runs until its devices are exhausted satisfies
/// `processed + dropped == captured`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamStats {
    /// Blocks recorded.
    pub captured: u64,
    /// Blocks handed to the processor successfully.
    pub processed: u64,
    /// Blocks discarded on queue overrun.
    pub dropped: u64,
}

struct Produced {
    captured: u64,
    dropped: u64,
}

fn check_config(config: &StreamConfig) -> DspResult<()> {
    if !(config.block_seconds.is_finite() && config.block_seconds > 0.0) {
        return Err(DspError::invalid_param(
            "block_seconds",
            format!("must be positive, got {}", config.block_seconds),
        ));
    }
    if config.queue_depth == 0 {
        return Err(DspError::invalid_param("queue_depth", "must be at least 1"));
    }
    Ok(())
}

fn produce<D: CaptureDevice>(
    devices: &mut [(String, D)],
    block_seconds: f64,
    sample_rate: u32,
    tx: &Sender<Block>,
    drain: &Receiver<Block>,
    cancel: &CancelToken,
) -> DspResult<Produced> {
    let mut produced = Produced {
        captured: 0,
        dropped: 0,
    };

    'capture: while !cancel.is_cancelled() {
        let mut inputs = ChannelInputs::new();
        for (label, device) in devices.iter_mut() {
            let rate = device.native_rate().unwrap_or(sample_rate);
            match device.record(block_seconds, rate)? {
                Some(signal) => {
                    inputs.insert(label.clone(), signal);
                }
                None => {
                    tracing::debug!(device = %label, "capture exhausted");
                    break 'capture;
                }
            }
        }

        let mut block = Block {
            index: produced.captured,
            inputs,
        };
        produced.captured += 1;

        loop {
            match tx.try_send(block) {
                Ok(()) => break,
                Err(TrySendError::Full(rejected)) => {
                    if let Ok(stale) = drain.try_recv() {
                        produced.dropped += 1;
                        tracing::warn!(
                            block = stale.index,
                            dropped = produced.dropped,
                            "processing overrun, dropped oldest block"
                        );
                    }
                    block = rejected;
                }
                Err(TrySendError::Disconnected(_)) => break 'capture,
            }
        }
    }

    Ok(produced)
}

/// Streams blocks from `devices` into `process` until the devices run dry,
/// `cancel` is set, or either side fails.
///
/// Every device records `block_seconds` per block, at its native rate when it
/// has one and at `sample_rate` otherwise. The first
/// device to return no audio ends capture; queued blocks are still processed.
/// A processing error cancels the stream and is returned.
pub fn run<D, P>(
    config: &StreamConfig,
    sample_rate: u32,
    devices: &mut [(String, D)],
    cancel: &CancelToken,
    mut process: P,
) -> DspResult<StreamStats>
where
    D: CaptureDevice + Send,
    P: FnMut(Block) -> DspResult<()> + Send,
{
    check_config(config)?;
    if devices.is_empty() {
        return Err(DspError::invalid_input("no capture devices"));
    }

    tracing::info!(
        devices = devices.len(),
        block_seconds = config.block_seconds,
        queue_depth = config.queue_depth,
        "starting stream"
    );

    let (tx, rx) = channel::bounded::<Block>(config.queue_depth);
    let drain = rx.clone();
    let block_seconds = config.block_seconds;

    let (produced, processed) = thread::scope(|s| {
        let producer = s.spawn(move || {
            let result = produce(devices, block_seconds, sample_rate, &tx, &drain, cancel);
            if result.is_err() {
                cancel.cancel();
            }
            result
        });

        let consumer = s.spawn(move || -> DspResult<u64> {
            let mut processed = 0;
            for block in rx.iter() {
                if cancel.is_cancelled() {
                    break;
                }
                let index = block.index;
                if let Err(e) = process(block) {
                    tracing::error!(block = index, error = %e, "processing failed");
                    cancel.cancel();
                    return Err(e);
                }
                processed += 1;
            }
            Ok(processed)
        });

        let produced = producer
            .join()
            .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
        let processed = consumer
            .join()
            .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
        (produced, processed)
    });

    let processed = processed?;
    let produced = produced?;
    let stats = StreamStats {
        captured: produced.captured,
        processed,
        dropped: produced.dropped,
    };
    tracing::info!(
        captured = stats.captured,
        processed = stats.processed,
        dropped = stats.dropped,
        "stream finished"
    );
    Ok(stats)
}
