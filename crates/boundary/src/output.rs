//! Output decoding for Windows tools.
//!
//! `wsl.exe` writes UTF-16LE to pipes unless `WSL_UTF8=1` is honoured, which
//! older builds ignore. Both encodings are accepted here.

/// Decodes raw process output into a `String` with `\r\n` normalised to `\n`.
pub fn decode_output(bytes: &[u8]) -> String {
    let text = if looks_like_utf16le(bytes) {
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    };

    text.trim_start_matches('\u{feff}').replace("\r\n", "\n")
}

fn looks_like_utf16le(bytes: &[u8]) -> bool {
    if bytes.len() < 2 || bytes.len() % 2 != 0 {
        return false;
    }
    if bytes.starts_with(&[0xff, 0xfe]) {
        return true;
    }
    // ASCII text in UTF-16LE has a zero in every odd byte.
    let odd = bytes.len() / 2;
    let zeros = bytes.iter().skip(1).step_by(2).filter(|b| **b == 0).count();
    zeros * 2 > odd
}
