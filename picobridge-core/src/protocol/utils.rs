use crate::protocol::ProtocolError;

/// MQTT limits the remaining length to 268,435,455 (0x0FFFFFFF)
const MAX_VARIABLE_LENGTH: usize = 268_435_455;

pub const fn variable_length_length(value: usize) -> usize {
    if value < 128 {
        1
    } else if value < 16_384 {
        2
    } else if value < 2_097_152 {
        3
    } else {
        4
    }
}

/// Decode a variable byte integer.
///
/// Returns `(value, bytes_consumed)`. Runs out of input with
/// `IncompletePacket` so callers can wait for more bytes.
pub fn read_variable_length(bytes: &[u8]) -> Result<(usize, usize), ProtocolError> {
    let mut multiplier = 1usize;
    let mut value = 0usize;
    let mut bytes_read = 0usize;

    loop {
        if bytes_read >= bytes.len() {
            return Err(ProtocolError::IncompletePacket {
                available: bytes.len(),
            });
        }
        if bytes_read == 4 {
            return Err(ProtocolError::InvalidLengthEncoding);
        }
        let byte = bytes[bytes_read] as usize;
        bytes_read += 1;
        value += (byte & 0x7F) * multiplier;

        if (byte & 0x80) == 0 {
            break;
        }
        multiplier *= 128;
    }

    if value > MAX_VARIABLE_LENGTH {
        return Err(ProtocolError::InvalidLengthEncoding);
    }

    Ok((value, bytes_read))
}

pub fn write_variable_length(value: usize, buffer: &mut [u8]) -> Result<usize, ProtocolError> {
    if value > MAX_VARIABLE_LENGTH {
        return Err(ProtocolError::InvalidLengthEncoding);
    }

    let mut encoded = value;
    let mut bytes_written = 0;

    loop {
        if bytes_written >= buffer.len() {
            return Err(ProtocolError::BufferTooSmall {
                buffer_size: buffer.len(),
            });
        }
        let mut byte = (encoded & 0x7F) as u8;
        encoded >>= 7;
        if encoded > 0 {
            byte |= 0x80;
        }
        buffer[bytes_written] = byte;
        bytes_written += 1;
        if encoded == 0 {
            break;
        }
    }

    Ok(bytes_written)
}

/// Write the first header byte and the remaining length, returning the offset
/// at which the variable header starts.
pub fn write_fixed_header(
    header: u8,
    remaining_length: usize,
    buffer: &mut [u8],
) -> Result<usize, ProtocolError> {
    let total = 1 + variable_length_length(remaining_length) + remaining_length;
    if buffer.len() < total {
        return Err(ProtocolError::BufferTooSmall {
            buffer_size: buffer.len(),
        });
    }
    buffer[0] = header;
    let len_bytes = write_variable_length(remaining_length, &mut buffer[1..])?;
    Ok(1 + len_bytes)
}

/// Split a complete frame into `(header_byte, body)`, checking that the
/// remaining length matches the slice exactly.
pub fn split_frame(bytes: &[u8]) -> Result<(u8, &[u8]), ProtocolError> {
    if bytes.is_empty() {
        return Err(ProtocolError::IncompletePacket { available: 0 });
    }
    let (remaining_length, len_bytes) = read_variable_length(&bytes[1..])?;
    let body_start = 1 + len_bytes;
    let available = bytes.len() - body_start;
    if available < remaining_length {
        return Err(ProtocolError::IncompletePacket {
            available: bytes.len(),
        });
    }
    if available > remaining_length {
        return Err(ProtocolError::InvalidPacketLength {
            expected: remaining_length,
            actual: available,
        });
    }
    Ok((bytes[0], &bytes[body_start..]))
}

pub fn read_u16(bytes: &[u8], offset: &mut usize) -> Result<u16, ProtocolError> {
    if *offset + 2 > bytes.len() {
        return Err(ProtocolError::IncompletePacket {
            available: bytes.len(),
        });
    }
    let value = u16::from_be_bytes([bytes[*offset], bytes[*offset + 1]]);
    *offset += 2;
    Ok(value)
}

pub fn write_u16(value: u16, buffer: &mut [u8], offset: &mut usize) -> Result<(), ProtocolError> {
    if *offset + 2 > buffer.len() {
        return Err(ProtocolError::BufferTooSmall {
            buffer_size: buffer.len(),
        });
    }
    buffer[*offset..*offset + 2].copy_from_slice(&value.to_be_bytes());
    *offset += 2;
    Ok(())
}

pub fn read_binary<'a>(bytes: &'a [u8], offset: &mut usize) -> Result<&'a [u8], ProtocolError> {
    let len = read_u16(bytes, offset)? as usize;
    if *offset + len > bytes.len() {
        return Err(ProtocolError::IncompletePacket {
            available: bytes.len(),
        });
    }
    let data = &bytes[*offset..*offset + len];
    *offset += len;
    Ok(data)
}

pub fn write_binary(data: &[u8], buffer: &mut [u8], offset: &mut usize) -> Result<(), ProtocolError> {
    let len = u16::try_from(data.len()).map_err(|_| ProtocolError::PayloadTooLarge {
        max_size: u16::MAX as usize,
        actual_size: data.len(),
    })?;
    if *offset + 2 + data.len() > buffer.len() {
        return Err(ProtocolError::BufferTooSmall {
            buffer_size: buffer.len(),
        });
    }
    write_u16(len, buffer, offset)?;
    buffer[*offset..*offset + data.len()].copy_from_slice(data);
    *offset += data.len();
    Ok(())
}

pub fn read_string<'a>(bytes: &'a [u8], offset: &mut usize) -> Result<&'a str, ProtocolError> {
    let raw = read_binary(bytes, offset)?;
    core::str::from_utf8(raw).map_err(|_| ProtocolError::InvalidUtf8String)
}

pub fn write_string(s: &str, buffer: &mut [u8], offset: &mut usize) -> Result<(), ProtocolError> {
    write_binary(s.as_bytes(), buffer, offset)
}
