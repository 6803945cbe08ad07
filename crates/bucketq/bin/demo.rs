//! Producer/consumer session over a shared bounded queue.
//!
//! Run with: `cargo run -p bucketq --features demo --bin bucketq-demo`
//!
//! Knobs (environment): `BUCKETQ_CAPACITY`, `BUCKETQ_PRODUCERS`,
//! `BUCKETQ_CONSUMERS`. Log level via `RUST_LOG` (default `debug`).

use bucketq::{BlockingQueue, Config, ConsumeError, DEFAULT_CAPACITY};
use rand::Rng;
use std::env;
use std::thread;
use std::time::Duration;

const MESSAGES_PER_PRODUCER: usize = 5;
const PUBLISH_PAUSE: Duration = Duration::from_millis(300);
const CONSUME_PAUSE: Duration = Duration::from_millis(400);

fn env_or(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

    let capacity = env_or("BUCKETQ_CAPACITY", DEFAULT_CAPACITY);
    let producers = env_or("BUCKETQ_PRODUCERS", 2);
    let consumers = env_or("BUCKETQ_CONSUMERS", 3);

    log::info!("starting: capacity={capacity}, producers={producers}, consumers={consumers}");
    let queue = BlockingQueue::<String>::with_config(Config::new(capacity, true))?;

    let consumer_handles = (0..consumers)
        .map(|i| {
            let queue = queue.clone();
            thread::Builder::new()
                .name(format!("consumer-{i}"))
                .spawn(move || consume_loop(&queue))
        })
        .collect::<Result<Vec<_>, _>>()?;

    // Let the consumers block on the empty queue first
    thread::sleep(Duration::from_millis(500));

    let producer_handles = (0..producers)
        .map(|i| {
            let queue = queue.clone();
            thread::Builder::new()
                .name(format!("producer-{i}"))
                .spawn(move || produce(&queue))
        })
        .collect::<Result<Vec<_>, _>>()?;

    for handle in producer_handles {
        if handle.join().is_err() {
            log::error!("producer thread panicked");
        }
    }

    queue.close();

    let mut total = 0;
    for handle in consumer_handles {
        match handle.join() {
            Ok(n) => total += n,
            Err(_) => log::error!("consumer thread panicked"),
        }
    }

    let m = queue.metrics();
    log::info!(
        "done: consumed={total}, published={}, publish_waits={}, consume_waits={}",
        m.published,
        m.publish_waits,
        m.consume_waits
    );
    Ok(())
}

fn produce(queue: &BlockingQueue<String>) {
    let mut rng = rand::thread_rng();
    for _ in 0..MESSAGES_PER_PRODUCER {
        let payload = format!("Message-{}", rng.gen_range(0..1000));
        if let Err(e) = queue.publish(payload) {
            log::warn!("publish failed: {e}");
            return;
        }
        thread::sleep(PUBLISH_PAUSE);
    }
}

fn consume_loop(queue: &BlockingQueue<String>) -> usize {
    let mut consumed = 0;
    loop {
        match queue.consume() {
            Ok(message) => {
                log::info!("handled {{ID: '{}', data: '{}'}}", message.id(), message.payload());
                consumed += 1;
                thread::sleep(CONSUME_PAUSE);
            }
            Err(ConsumeError::Closed) => return consumed,
            Err(e) => log::warn!("consume failed: {e}"),
        }
    }
}
