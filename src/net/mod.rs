pub mod ring_buffer;
pub mod transport;
