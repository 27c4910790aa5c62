//! Byte-stream collaborator beneath the host link (USB CDC, UART...).

/// Non-blocking access to the host byte stream.
pub trait ByteStream {
    /// Bytes ready to be read.
    fn bytes_available(&self) -> usize;

    /// Next received byte, `None` when nothing is pending.
    fn read_byte(&mut self) -> Option<u8>;

    /// Room in the outbound buffer. `None` when the stream cannot tell, in
    /// which case writes are attempted unconditionally.
    fn write_space(&self) -> Option<usize>;

    /// Queue `bytes` for transmission. Only called once `write_space`
    /// reported room for the whole slice (or no hint).
    fn write(&mut self, bytes: &[u8]);

    /// Push buffered output towards the host.
    fn flush(&mut self);
}
