//! Scratch buffer shared by every read/write cycle

pub const DEFAULT_BUFFER_BYTE_SIZE: usize = 32768;

#[derive(Debug)]
pub struct BufferPool {
    buffer: Vec<u8>,
}

impl BufferPool {
    pub fn new(byte_size: usize) -> Self {
        assert!(byte_size > 0, "buffer size must be greater than 0");
        Self { buffer: vec![0u8; byte_size] }
    }

    pub fn byte_size(&self) -> usize {
        self.buffer.len()
    }

    /// Whole frames of `bytes_per_frame` that fit in the buffer.
    pub fn frames_for(&self, bytes_per_frame: u32) -> u32 {
        assert!(bytes_per_frame > 0, "bytes per frame must be greater than 0");
        (self.buffer.len() / bytes_per_frame as usize).min(u32::MAX as usize) as u32
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    /// The first `frames` frames of the buffer.
    pub fn filled(&self, frames: u32, bytes_per_frame: u32) -> &[u8] {
        let len = (frames as usize * bytes_per_frame as usize).min(self.buffer.len());
        &self.buffer[..len]
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_BYTE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_sizing() {
        let pool = BufferPool::default();
        assert_eq!(pool.byte_size(), 32768);
        assert_eq!(pool.frames_for(2), 16384);
        assert_eq!(pool.frames_for(8), 4096);
        assert_eq!(pool.frames_for(6), 5461);
    }

    #[test]
    fn test_filled_slice() {
        let mut pool = BufferPool::new(16);
        pool.as_mut_slice()[..4].copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(pool.filled(2, 2), &[1, 2, 3, 4]);
        assert_eq!(pool.filled(100, 2).len(), 16);
    }

    #[test]
    #[should_panic]
    fn test_zero_bytes_per_frame_panics() {
        BufferPool::new(16).frames_for(0);
    }
}
