// Copyright (c) 2025 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! Topic names, topic filters and the matching rules between them.

use std::fmt;

use crate::{ByteArray, DecodeError, DecodePacket, EncodeError, EncodePacket, StringData};

/// Prefix introducing a shared subscription filter.
pub const SHARE_PREFIX: &str = "$share/";

/// A concrete topic name attached to a PUBLISH packet.
///
/// Topic names are nonempty, contain no U+0000 and no wildcard
/// characters [MQTT-3.3.2-2]. On the wire a topic name is an UTF-8
/// Encoded String.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct PubTopic(StringData);

impl PubTopic {
    /// Create a new topic name from `s`.
    ///
    /// # Errors
    ///
    /// Returns error if `s` is empty or contains wildcard characters.
    pub fn new(s: &str) -> Result<Self, EncodeError> {
        if !is_valid_topic_name(s) {
            return Err(EncodeError::InvalidTopic);
        }
        Ok(Self(StringData::from_str(s)?))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Byte length in packet.
    #[must_use]
    pub fn bytes(&self) -> usize {
        self.0.bytes()
    }
}

impl AsRef<str> for PubTopic {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for PubTopic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl DecodePacket for PubTopic {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let s = StringData::decode(ba)?;
        if !is_valid_topic_name(s.as_str()) {
            return Err(DecodeError::InvalidTopicName);
        }
        Ok(Self(s))
    }
}

impl EncodePacket for PubTopic {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        self.0.encode(buf)
    }
}

fn is_valid_topic_name(s: &str) -> bool {
    !s.is_empty() && !s.contains(['\u{0000}', '+', '#'])
}

/// One parsed segment of a topic filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterSegment {
    /// Matches an equal segment only.
    Literal(String),

    /// The `+` wildcard, matches exactly one segment.
    SingleLevel,

    /// The `#` wildcard, matches all remaining segments. Only valid as
    /// the final segment.
    MultiLevel,
}

/// A parsed topic filter as carried in SUBSCRIBE packets.
///
/// `$share/<ShareName>/<filter>` designates a shared subscription; the
/// share prefix takes no part in topic matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicFilter {
    /// The full original filter string, share prefix included.
    filter: String,

    /// Share group name for shared subscriptions.
    share: Option<String>,

    /// Segments of the matching part of the filter.
    segments: Vec<FilterSegment>,

    /// Offset of the matching part within `filter`.
    path_start: usize,
}

impl TopicFilter {
    /// Parse and validate a topic filter string.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - the filter is empty or contains U+0000,
    /// - `#` appears anywhere but as the whole final segment,
    /// - `+` appears as part of a longer segment,
    /// - a `$share` prefix has an empty or wildcard share name, or no
    ///   filter behind it.
    pub fn parse(s: &str) -> Result<Self, DecodeError> {
        if s.is_empty() || s.contains('\u{0000}') {
            return Err(DecodeError::InvalidTopicFilter);
        }

        let (share, path_start) = if let Some(rest) = s.strip_prefix(SHARE_PREFIX) {
            let Some((name, path)) = rest.split_once('/') else {
                return Err(DecodeError::InvalidTopicFilter);
            };
            if name.is_empty() || name.contains(['+', '#']) || path.is_empty() {
                return Err(DecodeError::InvalidTopicFilter);
            }
            (Some(name.to_owned()), SHARE_PREFIX.len() + name.len() + 1)
        } else {
            (None, 0)
        };

        let path = &s[path_start..];
        let mut segments = Vec::new();
        let count = path.split('/').count();
        for (i, part) in path.split('/').enumerate() {
            let segment = match part {
                "+" => FilterSegment::SingleLevel,
                "#" => {
                    if i + 1 != count {
                        return Err(DecodeError::InvalidTopicFilter);
                    }
                    FilterSegment::MultiLevel
                }
                literal => {
                    if literal.contains(['+', '#']) {
                        return Err(DecodeError::InvalidTopicFilter);
                    }
                    FilterSegment::Literal(literal.to_owned())
                }
            };
            segments.push(segment);
        }

        Ok(Self {
            filter: s.to_owned(),
            share,
            segments,
            path_start,
        })
    }

    /// The full original filter string, share prefix included.
    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// The matching part of the filter, share prefix stripped.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.filter[self.path_start..]
    }

    #[must_use]
    pub fn share_name(&self) -> Option<&str> {
        self.share.as_deref()
    }

    #[must_use]
    pub const fn is_shared(&self) -> bool {
        self.share.is_some()
    }

    /// Whether `topic` matches this filter.
    ///
    /// Matching is segment-wise: `+` accepts any single segment, `#`
    /// accepts all remaining segments including none. A filter whose first
    /// segment is a wildcard never matches topics whose first segment
    /// starts with `$` [MQTT-4.7.2-1].
    #[must_use]
    pub fn is_match(&self, topic: &str) -> bool {
        if topic.starts_with('$') && !matches!(self.segments[0], FilterSegment::Literal(_)) {
            return false;
        }

        let parts: Vec<&str> = topic.split('/').collect();
        let mut pos = 0;
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                FilterSegment::MultiLevel => return true,
                FilterSegment::SingleLevel => {
                    if pos == parts.len() {
                        return false;
                    }
                    pos += 1;
                }
                FilterSegment::Literal(literal) => {
                    if pos == parts.len() || parts[pos] != literal {
                        return false;
                    }
                    pos += 1;
                }
            }

            // Topic exhausted with filter segments left: only a single
            // trailing `#` still matches, e.g. `a/#` matches `a`.
            if pos == parts.len() && i + 1 < self.segments.len() {
                return self.segments.len() == i + 2
                    && self.segments[i + 1] == FilterSegment::MultiLevel;
            }
        }

        pos == parts.len()
    }
}

impl fmt::Display for TopicFilter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_name_rejects_wildcards() {
        assert!(PubTopic::new("a/b/c").is_ok());
        assert!(PubTopic::new("").is_err());
        assert!(PubTopic::new("a/+/c").is_err());
        assert!(PubTopic::new("a/#").is_err());
    }

    #[test]
    fn test_filter_validation() {
        assert!(TopicFilter::parse("a/b").is_ok());
        assert!(TopicFilter::parse("#").is_ok());
        assert!(TopicFilter::parse("a/+/b").is_ok());
        assert!(TopicFilter::parse("a/#/b").is_err());
        assert!(TopicFilter::parse("a/b#").is_err());
        assert!(TopicFilter::parse("a/b+/c").is_err());
        assert!(TopicFilter::parse("").is_err());
    }

    #[test]
    fn test_shared_filter_validation() {
        let filter = TopicFilter::parse("$share/group/a/+").unwrap();
        assert_eq!(filter.share_name(), Some("group"));
        assert_eq!(filter.path(), "a/+");

        assert!(TopicFilter::parse("$share//a").is_err());
        assert!(TopicFilter::parse("$share/g").is_err());
        assert!(TopicFilter::parse("$share/g/").is_err());
        assert!(TopicFilter::parse("$share/g+/a").is_err());
    }

    #[test]
    fn test_literal_match() {
        let filter = TopicFilter::parse("a/b/c").unwrap();
        assert!(filter.is_match("a/b/c"));
        assert!(!filter.is_match("a/b"));
        assert!(!filter.is_match("a/b/c/d"));
        assert!(!filter.is_match("a/b/x"));
    }

    #[test]
    fn test_single_level_match() {
        let filter = TopicFilter::parse("+/+/+").unwrap();
        assert!(filter.is_match("a/b/c"));
        assert!(filter.is_match("a//c"));
        assert!(!filter.is_match("a/b"));
        assert!(!filter.is_match("a/b/c/d"));
    }

    #[test]
    fn test_multi_level_match() {
        let filter = TopicFilter::parse("sport/tennis/#").unwrap();
        assert!(filter.is_match("sport/tennis"));
        assert!(filter.is_match("sport/tennis/player1"));
        assert!(filter.is_match("sport/tennis/player1/ranking"));
        assert!(!filter.is_match("sport/golf"));

        let all = TopicFilter::parse("#").unwrap();
        assert!(all.is_match("a"));
        assert!(all.is_match("a/b/c"));
    }

    #[test]
    fn test_dollar_topics_need_literal_first_segment() {
        let all = TopicFilter::parse("#").unwrap();
        assert!(!all.is_match("$SYS/uptime"));

        let plus = TopicFilter::parse("+/uptime").unwrap();
        assert!(!plus.is_match("$SYS/uptime"));

        let sys = TopicFilter::parse("$SYS/#").unwrap();
        assert!(sys.is_match("$SYS/uptime"));
    }

    #[test]
    fn test_shared_filter_matches_by_path() {
        let filter = TopicFilter::parse("$share/g/x").unwrap();
        assert!(filter.is_match("x"));
        assert!(!filter.is_match("$share/g/x"));
    }
}
