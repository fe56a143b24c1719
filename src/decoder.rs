// 🔍 Token decoding seam
//
// A scan starts from a captured frame. Turning that frame into an identity
// token is the decoder's job; the workflow only sees `Option<String>`.

/// Raw capture handed to a decoder
#[derive(Debug, Clone, PartialEq)]
pub struct ScanFrame {
    pub data: Vec<u8>,
}

impl ScanFrame {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        ScanFrame { data: data.into() }
    }

    /// Frame carrying an already-decoded QR text payload
    pub fn from_payload(payload: &str) -> Self {
        Self::new(payload.as_bytes().to_vec())
    }

    /// A frame with nothing in it
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

pub trait TokenDecoder: Send + Sync {
    /// Extract the identity token from `frame`, if one is present
    fn decode(&self, frame: &ScanFrame) -> Option<String>;
}

/// Treats the frame bytes as the QR text payload (UTF-8, surrounding
/// whitespace ignored). Blank or non-UTF-8 frames decode to nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextPayloadDecoder;

impl TokenDecoder for TextPayloadDecoder {
    fn decode(&self, frame: &ScanFrame) -> Option<String> {
        let text = std::str::from_utf8(&frame.data).ok()?.trim();
        if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }
}

/// Ignores the frame and always yields the same token
///
/// Stand-in for a camera decoder in demos: every scan "sees" one
/// pre-selected object.
#[derive(Debug, Clone)]
pub struct FixedTokenDecoder {
    token: String,
}

impl FixedTokenDecoder {
    pub fn new(token: impl Into<String>) -> Self {
        FixedTokenDecoder { token: token.into() }
    }
}

impl TokenDecoder for FixedTokenDecoder {
    fn decode(&self, _frame: &ScanFrame) -> Option<String> {
        Some(self.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_payload_decoder() {
        let decoder = TextPayloadDecoder;
        assert_eq!(
            decoder.decode(&ScanFrame::from_payload("  QR_CAMERA_002\n")),
            Some("QR_CAMERA_002".to_string())
        );
        assert_eq!(decoder.decode(&ScanFrame::empty()), None);
        assert_eq!(decoder.decode(&ScanFrame::from_payload("   ")), None);
        assert_eq!(decoder.decode(&ScanFrame::new(vec![0xff, 0xfe])), None);
    }

    #[test]
    fn test_frame_is_just_its_payload() {
        let a = ScanFrame::from_payload("QR_CAMERA_002");
        let b = ScanFrame::new(b"QR_CAMERA_002".to_vec());
        assert_eq!(a, b);
        assert_eq!(a.data, b"QR_CAMERA_002");
        assert!(ScanFrame::empty().data.is_empty());
    }

    #[test]
    fn test_fixed_decoder_ignores_frame() {
        let decoder = FixedTokenDecoder::new("QR_NOTEBOOK_001");
        assert_eq!(decoder.decode(&ScanFrame::empty()), Some("QR_NOTEBOOK_001".to_string()));
        assert_eq!(
            decoder.decode(&ScanFrame::from_payload("anything")),
            Some("QR_NOTEBOOK_001".to_string())
        );
    }
}
