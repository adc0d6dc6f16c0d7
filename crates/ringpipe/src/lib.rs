//! ringpipe - Bounded Blocking Ring Buffer
//!
//! A thread-safe circular byte buffer that decouples producers and consumers
//! in a streaming pipeline. One lock and one condition variable govern two
//! transfer modes:
//!
//! - **Blocking** (flow-controlled): writers wait for space, readers wait for
//!   data, with an optional timeout bounding the whole call.
//! - **Non-blocking** (best effort): writes overwrite unread data, reads
//!   return whatever is buffered.
//!
//! # Key Features
//!
//! - Power-of-two byte capacity with masked index arithmetic
//! - Fixed-size elements; every length and count is in elements
//! - Cooperative shutdown: [`RingBuffer::end_blocking`] releases every waiter
//! - Transactional [`RingBuffer::resize`]: on failure nothing changes
//!
//! # Example
//!
//! ```
//! use ringpipe::RingBuffer;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let ring = Arc::new(RingBuffer::new(1024, 1).unwrap());
//!
//! let producer = {
//!     let ring = Arc::clone(&ring);
//!     thread::spawn(move || {
//!         let data = vec![7u8; 10_000];
//!         for chunk in data.chunks(256) {
//!             ring.blocking_write(chunk, chunk.len(), None).unwrap();
//!         }
//!         ring.end_blocking();
//!     })
//! };
//!
//! let mut received = 0;
//! let mut chunk = [0u8; 256];
//! while ring.is_alive() {
//!     let chunk_len = chunk.len();
//!     received += ring.blocking_read(&mut chunk, chunk_len, None).unwrap();
//! }
//! producer.join().unwrap();
//! assert_eq!(received, 10_000);
//! ```

mod buffer;
mod capacity;
mod config;
mod deadline;
mod error;
mod invariants;
mod metrics;
mod ring;
mod sync;

pub use buffer::RingBuffer;
pub use capacity::{Capacity, GlobalStorage, StorageAllocator};
pub use config::{Config, HIGH_THROUGHPUT_CONFIG, LOW_LATENCY_CONFIG};
pub use error::RingError;
pub use metrics::Metrics;
