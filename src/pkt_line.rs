use bytes::{BufMut, BytesMut};

/// Encodes `data` as a single pkt-line.
///
/// An empty string yields the flush packet `0000`. Otherwise the line is prefixed
/// with its total length (payload bytes plus the four prefix bytes) as lowercase hex.
pub fn write_pkt_line(data: &str) -> BytesMut {
    let mut buf = BytesMut::new();
    if data.is_empty() {
        buf.put_slice(b"0000");
        return buf;
    }
    let total_len = data.len() + 4;
    buf.put_slice(format!("{:04x}", total_len).as_bytes());
    buf.put_slice(data.as_bytes());
    buf
}
