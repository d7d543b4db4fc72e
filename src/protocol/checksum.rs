//! RFC 1071 Internet checksum shared by IPv4 and ICMP

/// One's complement of the one's complement sum of 16-bit words.
///
/// An odd trailing byte is padded with zero. Running this over data that
/// already carries a valid checksum yields 0.
pub fn checksum(data: &[u8]) -> u16 {
    let mut chunks = data.chunks_exact(2);
    let mut sum: u32 = chunks
        .by_ref()
        .map(|w| u32::from(u16::from_be_bytes([w[0], w[1]])))
        .sum();
    if let [last] = chunks.remainder() {
        sum += u32::from(*last) << 8;
    }

    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }

    !(sum as u16)
}
