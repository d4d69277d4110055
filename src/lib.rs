//! kstate - kernel trace state reconstruction.
//!
//! Rebuilds the full state of a traced system (processes, cpus, interrupt
//! lines, soft-irq vectors, traps and block devices) by replaying a
//! chronological stream of decoded kernel events. The library performs no
//! I/O of its own: a trace reader decodes events into [`event::TraceEvent`]
//! records and feeds them through an [`handlers::EventDispatcher`] into a
//! [`store::TraceStateStore`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use kstate::event::{fields, EventType, TraceEvent};
//! use kstate::handlers::EventDispatcher;
//! use kstate::names::NameRegistry;
//! use kstate::store::{TimeWindow, TraceContext, TraceStateStore};
//!
//! let mut store = TraceStateStore::with_context(
//!     Arc::new(NameRegistry::default()),
//!     TraceContext {
//!         trace_id: 1,
//!         cpu_count: 2,
//!         time_window: TimeWindow { start: 0, end: 1_000_000 },
//!     },
//! );
//!
//! let dispatcher = EventDispatcher::new();
//! let event = TraceEvent::new(EventType::SchedSchedule, 1000, 0)
//!     .with_long(fields::PREV_PID, 0)
//!     .with_long(fields::NEXT_PID, 42)
//!     .with_long(fields::PREV_STATE, 0);
//! dispatcher.dispatch(&event, &mut store);
//!
//! assert_eq!(store.running_process_on(0).unwrap().pid, 42);
//!
//! // Snapshots are independent deep copies, usable as seek checkpoints.
//! let checkpoint = store.snapshot();
//! assert_eq!(checkpoint.nb_events(), 1);
//! ```

pub mod constants;
pub mod error;
pub mod event;
pub mod handlers;
pub mod model;
pub mod names;
pub mod stack;
pub mod store;

pub use error::StateError;
pub use event::{EventType, TraceEvent};
pub use handlers::EventDispatcher;
pub use names::NameRegistry;
pub use store::{TraceContext, TraceStateStore};
