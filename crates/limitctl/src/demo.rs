use anyhow::Result;
use limiter_core::{Clock, LimiterConfig, ManualClock, RateLimiter, SystemClock};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

struct Tally {
    allowed: usize,
    attempted: usize,
}

impl Tally {
    fn fire(
        &mut self,
        limiter: &RateLimiter<Arc<ManualClock>>,
        clock: &ManualClock,
        start: u64,
        key: &str,
    ) {
        let allowed = limiter.allow_request(key);
        self.attempted += 1;
        if allowed {
            self.allowed += 1;
        }
        let offset = clock.now_millis() - start;
        let verdict = if allowed { "ALLOWED" } else { "DENIED" };
        println!(
            "  +{:>3}.{:03}s request {:>2}: {}",
            offset / 1000,
            offset % 1000,
            self.attempted,
            verdict
        );
    }
}

/// Burst at the start of a window, a second attempt half a window later,
/// then a trickle after the window has shifted. Runs on a simulated clock so
/// nothing actually sleeps.
pub fn run(config: LimiterConfig, key: &str) -> Result<()> {
    let window_ms = config.window_ms;
    let start = SystemClock.now_millis();
    let clock = Arc::new(ManualClock::new(start));
    let limiter = RateLimiter::from_config(config, clock.clone())?;
    let burst = config.max_requests as usize + config.max_requests.div_ceil(2) as usize;
    let mut tally = Tally {
        allowed: 0,
        attempted: 0,
    };

    println!(
        "limit: {} requests per {} ms for key {key}",
        config.max_requests, window_ms
    );

    println!("-- burst of {burst} at window start");
    for _ in 0..burst {
        tally.fire(&limiter, &clock, start, key);
    }

    println!("-- half a window later");
    clock.advance(Duration::from_millis(window_ms / 2));
    for _ in 0..5 {
        tally.fire(&limiter, &clock, start, key);
    }

    println!("-- just past the window shift, one request every {} ms", window_ms / 20);
    clock.advance(Duration::from_millis(window_ms / 2 + window_ms / 60));
    for _ in 0..11 {
        tally.fire(&limiter, &clock, start, key);
        clock.advance(Duration::from_millis(window_ms / 20));
    }

    println!("allowed {} of {}", tally.allowed, tally.attempted);

    clock.advance(Duration::from_millis(2 * window_ms));
    let evicted = limiter.cleanup_expired_entries();
    info!(evicted, "demo cleanup");
    println!("evicted {evicted} idle key(s) after two quiet windows");
    Ok(())
}
