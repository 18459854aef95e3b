//! Concurrency properties of the admission gate under load

use bg_matte::{MatteConfig, MatteProcessor, MattingBackend, MattingOptions, Result};
use image::{DynamicImage, RgbImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Engine double that tracks its concurrent-call high-water mark
struct ConcurrencyProbe {
    in_flight: AtomicUsize,
    high_water: AtomicUsize,
    calls: AtomicUsize,
}

impl ConcurrencyProbe {
    fn new() -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            high_water: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    fn high_water_mark(&self) -> usize {
        self.high_water.load(Ordering::SeqCst)
    }
}

impl MattingBackend for ConcurrencyProbe {
    fn matte(&self, image: &DynamicImage, _options: &MattingOptions) -> Result<DynamicImage> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);

        // Hold the slot long enough for other requests to pile up on the
        // gate.
        std::thread::sleep(Duration::from_millis(30));

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(DynamicImage::ImageRgb8(image.to_rgb8()))
    }

    fn name(&self) -> &str {
        "concurrency-probe"
    }
}

fn tiny_png() -> Vec<u8> {
    let img = RgbImage::from_pixel(8, 8, image::Rgb([0, 0, 255]));
    let mut buffer = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
        .unwrap();
    buffer
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn gate_bounds_concurrent_matting_calls() {
    const PERMITS: usize = 2;
    const REQUESTS: usize = 8;

    let probe = Arc::new(ConcurrencyProbe::new());
    let config = MatteConfig::builder()
        .cache_capacity(REQUESTS)
        .max_workers(PERMITS)
        .build()
        .unwrap();
    let processor = Arc::new(MatteProcessor::new(config, Arc::clone(&probe) as _).unwrap());

    let input = tiny_png();
    let tasks: Vec<_> = (0..REQUESTS)
        .map(|i| {
            let processor = Arc::clone(&processor);
            let input = input.clone();
            tokio::spawn(async move {
                // Distinct identifiers force a cache miss per request.
                let id = format!("req-{}", i);
                processor.process(&input, Some(id.as_str())).await
            })
        })
        .collect();

    for result in futures::future::join_all(tasks).await {
        assert!(result.unwrap().is_ok());
    }

    assert_eq!(probe.calls.load(Ordering::SeqCst), REQUESTS);
    assert!(
        probe.high_water_mark() <= PERMITS,
        "observed {} concurrent matting calls with {} permits",
        probe.high_water_mark(),
        PERMITS
    );
    assert_eq!(processor.gate().available_permits(), PERMITS);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_hits_never_touch_the_gate() {
    let probe = Arc::new(ConcurrencyProbe::new());
    let config = MatteConfig::builder()
        .cache_capacity(4)
        .max_workers(1)
        .build()
        .unwrap();
    let processor = Arc::new(MatteProcessor::new(config, Arc::clone(&probe) as _).unwrap());

    let input = tiny_png();
    let warm = processor.process(&input, Some("hot")).await.unwrap();
    assert_eq!(probe.calls.load(Ordering::SeqCst), 1);

    // A burst of identical resubmissions is answered entirely from the
    // cache; one permit would otherwise serialize them visibly.
    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let processor = Arc::clone(&processor);
            let input = input.clone();
            tokio::spawn(async move { processor.process(&input, Some("hot")).await })
        })
        .collect();

    for result in futures::future::join_all(tasks).await {
        assert_eq!(result.unwrap().unwrap(), warm);
    }

    assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_misses_for_one_identifier_may_both_run() {
    // The core does not deduplicate in-flight work: simultaneous first
    // submissions of one identifier may each take a permit and run the
    // engine, with the cache settling on the last write. Correctness
    // requires only that every caller gets valid output.
    let probe = Arc::new(ConcurrencyProbe::new());
    let config = MatteConfig::builder()
        .cache_capacity(4)
        .max_workers(2)
        .build()
        .unwrap();
    let processor = Arc::new(MatteProcessor::new(config, Arc::clone(&probe) as _).unwrap());

    let input = tiny_png();
    let tasks: Vec<_> = (0..2)
        .map(|_| {
            let processor = Arc::clone(&processor);
            let input = input.clone();
            tokio::spawn(async move { processor.process(&input, Some("shared")).await })
        })
        .collect();

    for result in futures::future::join_all(tasks).await {
        let bytes = result.unwrap().unwrap();
        assert!(image::load_from_memory(&bytes).is_ok());
    }

    let calls = probe.calls.load(Ordering::SeqCst);
    assert!((1..=2).contains(&calls));
    assert_eq!(processor.cache().stats().entries, 1);
}
