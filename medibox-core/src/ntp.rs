//! # NTP
//! SNTP client packet encoding and server reply decoding.

/// Size of an NTP packet without extensions
pub const PACKET_LEN: usize = 48;

/// UDP port of NTP servers
pub const NTP_PORT: u16 = 123;

/// Seconds between the NTP era (1900) and the Unix epoch (1970)
const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

/// Length of one NTP era in seconds
const ERA_SECONDS: u64 = 1 << 32;

/// LI = 0, VN = 3, Mode = 3 (client)
const CLIENT_HEADER: u8 = 0x1B;

/// Mode field value of a server reply
const MODE_SERVER: u8 = 4;

/// Offset of the transmit timestamp's seconds field
const TRANSMIT_SECONDS: usize = 40;

/// Rejected server replies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NtpError {
    /// Reply shorter than an NTP header
    TooShort,
    /// Mode field is not "server"
    NotServerReply,
    /// Stratum 0: the server asks us to back off
    KissOfDeath,
}

/// A client request
pub const fn request_packet() -> [u8; PACKET_LEN] {
    let mut packet = [0; PACKET_LEN];
    packet[0] = CLIENT_HEADER;
    packet
}

/// Unix seconds from the transmit timestamp of a server reply
pub fn parse_response(reply: &[u8]) -> Result<u64, NtpError> {
    if reply.len() < PACKET_LEN {
        return Err(NtpError::TooShort);
    }
    if reply[0] & 0x07 != MODE_SERVER {
        return Err(NtpError::NotServerReply);
    }
    if reply[1] == 0 {
        return Err(NtpError::KissOfDeath);
    }

    let seconds = u32::from_be_bytes([
        reply[TRANSMIT_SECONDS],
        reply[TRANSMIT_SECONDS + 1],
        reply[TRANSMIT_SECONDS + 2],
        reply[TRANSMIT_SECONDS + 3],
    ]);
    // timestamps before 1970 are read as era 1, which starts in February 2036
    let mut seconds = u64::from(seconds);
    if seconds < NTP_UNIX_OFFSET {
        seconds += ERA_SECONDS;
    }
    Ok(seconds - NTP_UNIX_OFFSET)
}
