//! Byte-stream transport.
//!
//! The engine only needs an ordered byte stream: the M1XEP ethernet
//! interface speaks the same ASCII frames as the panel's RS-232 port,
//! so [`Connection::from_stream`] accepts any `AsyncRead + AsyncWrite`
//! (a TCP socket, a serial port device, or an in-memory duplex in
//! tests) while [`Connection::connect_tcp`] covers the common case.

pub mod direct;

pub use direct::Connection;
