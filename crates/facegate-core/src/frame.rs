//! Frame type handed from the camera to the analyzer.

/// A snapshot of the live video stream.
#[derive(Clone)]
pub struct Frame {
    /// Packed pixel data as delivered by the camera backend.
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: std::time::Instant,
    pub sequence: u32,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, sequence: u32) -> Self {
        Self {
            data,
            width,
            height,
            timestamp: std::time::Instant::now(),
            sequence,
        }
    }

    /// A mid-grey frame of the given size, one byte per pixel.
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(vec![128; width as usize * height as usize], width, height, 0)
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sequence", &self.sequence)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_keeps_sequence() {
        let frame = Frame::new(vec![0, 100, 200], 3, 1, 7);
        assert_eq!(frame.sequence, 7);
        assert_eq!(format!("{frame:?}"), "Frame { width: 3, height: 1, sequence: 7, bytes: 3 }");
    }

    #[test]
    fn test_blank_frame_size() {
        let frame = Frame::blank(4, 3);
        assert_eq!(frame.data.len(), 12);
        assert!(frame.data.iter().all(|&b| b == 128));
    }
}
