//! Small fixed-shape data structures used by the broad-phase and the world's
//! deferred body mutation queue.

pub mod bit_array;
pub mod ring_buffer;

pub use bit_array::BitArray;
pub use ring_buffer::RingBuffer;
