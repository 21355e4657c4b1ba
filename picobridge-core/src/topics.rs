//! Topic names used by the bridge

use crate::protocol::ProtocolError;

/// Topic name
/// Represents an MQTT topic name (or subscription filter) with a maximum length.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TopicName<const MAX_TOPIC_NAME_LENGTH: usize>(heapless::String<MAX_TOPIC_NAME_LENGTH>);

impl<const MAX_TOPIC_NAME_LENGTH: usize> TopicName<MAX_TOPIC_NAME_LENGTH> {
    pub const fn new(name: heapless::String<MAX_TOPIC_NAME_LENGTH>) -> Self {
        TopicName(name)
    }

    /// `+` and `#` are only valid in subscription filters
    pub fn has_wildcards(&self) -> bool {
        self.0.contains(['+', '#'])
    }
}

impl<const MAX_TOPIC_NAME_LENGTH: usize> TryFrom<&str> for TopicName<MAX_TOPIC_NAME_LENGTH> {
    type Error = ProtocolError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(ProtocolError::TopicEmpty);
        }
        let topic_str = heapless::String::try_from(value).map_err(|_| {
            ProtocolError::TopicNameLengthExceeded {
                max_length: MAX_TOPIC_NAME_LENGTH,
                actual_length: value.len(),
            }
        })?;
        Ok(TopicName(topic_str))
    }
}

impl<const MAX_TOPIC_NAME_LENGTH: usize> core::ops::Deref for TopicName<MAX_TOPIC_NAME_LENGTH> {
    type Target = heapless::String<MAX_TOPIC_NAME_LENGTH>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<const MAX_TOPIC_NAME_LENGTH: usize> core::fmt::Display for TopicName<MAX_TOPIC_NAME_LENGTH> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}
