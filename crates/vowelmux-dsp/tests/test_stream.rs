//! Streaming pipeline tests: capture thread feeding the multiplexer.

use std::f64::consts::PI;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use vowelmux_dsp::device::{PlaybackDevice, SignalReplay, WavSink};
use vowelmux_dsp::stream::{self, Block};
use vowelmux_dsp::{CancelToken, Multiplexer, Signal};
use vowelmux_spec::{PipelineConfig, StreamConfig};

const RATE: u32 = 24000;
const BLOCK_SECONDS: f64 = 0.1;

fn devices(blocks: usize) -> Vec<(String, SignalReplay)> {
    [("a", 1000.0), ("e", 1200.0), ("i", 1500.0)]
        .into_iter()
        .map(|(label, freq)| {
            let signal = Signal::from_fn(blocks as f64 * BLOCK_SECONDS, RATE, |t| {
                0.5 * (2.0 * PI * freq * t).sin()
            });
            (label.to_string(), SignalReplay::new(signal))
        })
        .collect()
}

#[test]
fn test_overrun_drops_oldest_blocks() {
    let mux = Multiplexer::new(PipelineConfig::default()).unwrap();
    let config = StreamConfig {
        block_seconds: BLOCK_SECONDS,
        queue_depth: 1,
    };
    let mut devices = devices(20);
    let mut last_index = None;

    let stats = stream::run(&config, RATE, &mut devices, &CancelToken::new(), |block: Block| {
        if let Some(prev) = last_index {
            assert!(block.index > prev);
        }
        last_index = Some(block.index);
        mux.run(&block.inputs)?;
        thread::sleep(Duration::from_millis(20));
        Ok(())
    })
    .unwrap();

    assert_eq!(stats.captured, 20);
    assert!(stats.dropped > 0, "expected drops, got {:?}", stats);
    assert_eq!(stats.processed + stats.dropped, stats.captured);
}

#[test]
fn test_cancel_stops_after_current_block() {
    let config = StreamConfig {
        block_seconds: BLOCK_SECONDS,
        queue_depth: 64,
    };
    let cancel = CancelToken::new();
    let processed = AtomicU64::new(0);
    let mut devices = devices(20);

    let stats = stream::run(&config, RATE, &mut devices, &cancel, |_block| {
        if processed.fetch_add(1, Ordering::SeqCst) + 1 == 3 {
            cancel.cancel();
        }
        Ok(())
    })
    .unwrap();

    assert_eq!(stats.processed, 3);
    assert_eq!(processed.load(Ordering::SeqCst), 3);
    assert_eq!(stats.dropped, 0);
}

#[test]
fn test_recovered_blocks_written_to_sink() {
    let mux = Multiplexer::new(PipelineConfig::default()).unwrap();
    let config = StreamConfig {
        block_seconds: BLOCK_SECONDS,
        queue_depth: 8,
    };
    let dir = tempfile::tempdir().unwrap();
    let mut sink = WavSink::new(dir.path().join("out"), "a").unwrap();
    let mut devices = devices(4);

    let stats = stream::run(&config, RATE, &mut devices, &CancelToken::new(), |block| {
        let output = mux.run(&block.inputs)?;
        if let Some(channel) = output.channel("a") {
            sink.play(&channel.recovered)?;
        }
        Ok(())
    })
    .unwrap();

    assert_eq!(stats.processed, 4);
    assert_eq!(sink.written().len(), 4);
    assert!(sink.written().iter().all(|p| p.exists()));
}
