/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Group-aware FIX record parsing.
//!
//! The first tag seen after a group count marks the start of each group
//! member: whenever it reappears a new member begins. Any tag that is neither
//! a member tag nor a nested group count closes the group and is handed back
//! to the enclosing level.

use crate::decoder::{Decoder, Field, SOH};
use marketcast_core::DecodeError;
use marketcast_dictionary::{FixSpec, Group, MSG_TYPE_TAG, MessageType, SortingKey};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;

/// Number of leading pairs searched for the message type.
const MSG_TYPE_WINDOW: usize = 4;

/// A decoded tag value: raw bytes or a repeating group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagValue<'a> {
    /// Raw value bytes.
    Value(&'a [u8]),
    /// Repeating group members.
    Group(RepeatingGroup<'a>),
}

/// Members of one repeating group occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepeatingGroup<'a> {
    /// Tag number of the count field.
    pub count_tag: u32,
    /// Tag that opened each member, if any member was seen.
    pub first_tag: Option<u32>,
    /// Members in wire order.
    pub members: Vec<FieldMap<'a>>,
}

impl RepeatingGroup<'_> {
    /// Creates a group with no members.
    #[must_use]
    pub const fn empty(count_tag: u32) -> Self {
        Self {
            count_tag,
            first_tag: None,
            members: Vec::new(),
        }
    }

    /// Returns the number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns true if the group has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Ordered tag to value map.
///
/// Keeps first-seen order. Setting a tag that is already present replaces
/// its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap<'a> {
    fields: SmallVec<[(u32, TagValue<'a>); 16]>,
}

impl<'a> FieldMap<'a> {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value of a tag.
    pub fn insert(&mut self, tag: u32, value: TagValue<'a>) {
        match self.fields.iter_mut().find(|(t, _)| *t == tag) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((tag, value)),
        }
    }

    /// Gets the value of a tag.
    #[must_use]
    pub fn get(&self, tag: u32) -> Option<&TagValue<'a>> {
        self.fields.iter().find(|(t, _)| *t == tag).map(|(_, v)| v)
    }

    /// Gets the raw bytes of a scalar tag.
    #[must_use]
    pub fn raw(&self, tag: u32) -> Option<&'a [u8]> {
        match self.get(tag) {
            Some(TagValue::Value(raw)) => Some(raw),
            _ => None,
        }
    }

    /// Gets a repeating group by count tag.
    #[must_use]
    pub fn group(&self, tag: u32) -> Option<&RepeatingGroup<'a>> {
        match self.get(tag) {
            Some(TagValue::Group(group)) => Some(group),
            _ => None,
        }
    }

    /// Returns true if the tag is present.
    #[must_use]
    pub fn contains(&self, tag: u32) -> bool {
        self.get(tag).is_some()
    }

    /// Returns an iterator over `(tag, value)` pairs in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &TagValue<'a>)> {
        self.fields.iter().map(|(t, v)| (*t, v))
    }

    /// Returns the tags sorted into wire order by `key`.
    #[must_use]
    pub fn tags_in_order(&self, key: &SortingKey) -> Vec<u32> {
        let mut tags: Vec<u32> = self.fields.iter().map(|(t, _)| *t).collect();
        key.sort_tags(&mut tags);
        tags
    }

    /// Returns the number of tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Group-aware FIX record parser.
#[derive(Debug, Clone, Copy)]
pub struct Codec<'s> {
    spec: &'s FixSpec,
    separator: u8,
}

impl<'s> Codec<'s> {
    /// Creates a codec using SOH as the separator.
    #[must_use]
    pub const fn new(spec: &'s FixSpec) -> Self {
        Self { spec, separator: SOH }
    }

    /// Sets the pair separator.
    #[must_use]
    pub const fn with_separator(mut self, separator: u8) -> Self {
        self.separator = separator;
        self
    }

    /// Returns the pair separator.
    #[must_use]
    pub const fn separator(&self) -> u8 {
        self.separator
    }

    /// Finds the message type among the first pairs.
    fn message_type(&self, fields: &[Field<'_>]) -> Option<&'s MessageType> {
        fields
            .iter()
            .take(MSG_TYPE_WINDOW)
            .find(|f| f.tag == MSG_TYPE_TAG)
            .and_then(|f| std::str::from_utf8(f.value).ok())
            .and_then(|msgtype| self.spec.msg_type(msgtype))
    }

    /// Parses a record into a tag map with repeating groups nested.
    ///
    /// If the message type is missing or unknown the map is flat.
    ///
    /// # Errors
    /// Returns `DecodeError::MalformedField` or `DecodeError::InvalidTag` if
    /// the record cannot be tokenized.
    pub fn parse<'a>(&self, buf: &'a [u8]) -> Result<FieldMap<'a>, DecodeError> {
        let fields = Decoder::new(buf)
            .with_separator(self.separator)
            .collect::<Result<Vec<_>, _>>()?;

        let mut map = FieldMap::new();
        let Some(msg_type) = self.message_type(&fields) else {
            for field in fields {
                map.insert(field.tag, TagValue::Value(field.value));
            }
            return Ok(map);
        };

        let mut cursor = Cursor { fields: &fields, pos: 0 };
        while let Some(field) = cursor.next() {
            let value = nested_value(field, &msg_type.groups, &mut cursor);
            map.insert(field.tag, value);
        }
        Ok(map)
    }
}

struct Cursor<'f, 'a> {
    fields: &'f [Field<'a>],
    pos: usize,
}

impl<'a> Cursor<'_, 'a> {
    fn peek(&self) -> Option<Field<'a>> {
        self.fields.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Field<'a>> {
        let field = self.peek()?;
        self.pos += 1;
        Some(field)
    }
}

fn nested_value<'a>(
    field: Field<'a>,
    groups: &HashMap<u32, Arc<Group>>,
    cursor: &mut Cursor<'_, 'a>,
) -> TagValue<'a> {
    match groups.get(&field.tag) {
        Some(_) if field.value == b"0" => TagValue::Group(RepeatingGroup::empty(field.tag)),
        Some(group) => TagValue::Group(process_group(group, cursor)),
        None => TagValue::Value(field.value),
    }
}

fn process_group<'a>(group: &Group, cursor: &mut Cursor<'_, 'a>) -> RepeatingGroup<'a> {
    let mut result = RepeatingGroup::empty(group.count_tag);
    let mut member = FieldMap::new();

    while let Some(field) = cursor.peek() {
        let tag = field.tag;
        if !group.all_child_tags.contains(&tag) && !group.groups.contains_key(&tag) {
            break;
        }
        match result.first_tag {
            None => result.first_tag = Some(tag),
            Some(first) if first == tag => result.members.push(std::mem::take(&mut member)),
            Some(_) => {}
        }
        cursor.pos += 1;
        let value = nested_value(field, &group.groups, cursor);
        member.insert(tag, value);
    }

    if !member.is_empty() {
        result.members.push(member);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketcast_dictionary::Element;

    const FIX44_SUBSET: &str = include_str!("../../fixtures/fix44-subset.xml");

    fn spec() -> FixSpec {
        FixSpec::parse_str(FIX44_SUBSET).unwrap()
    }

    fn raw<'a>(map: &FieldMap<'a>, tag: u32) -> &'a str {
        std::str::from_utf8(map.raw(tag).unwrap()).unwrap()
    }

    #[test]
    fn test_flat_message() {
        let spec = spec();
        let buf = b"8=FIX.4.4|9=40|35=D|11=ORD1|55=ES|54=1|38=5|10=123|";
        let map = Codec::new(&spec).with_separator(b'|').parse(buf).unwrap();
        assert_eq!(map.len(), 8);
        assert_eq!(raw(&map, 55), "ES");
        let tags: Vec<u32> = map.iter().map(|(t, _)| t).collect();
        assert_eq!(tags, vec![8, 9, 35, 11, 55, 54, 38, 10]);
    }

    #[test]
    fn test_nested_groups() {
        let spec = spec();
        let buf = b"8=FIX.4.4\x0135=W\x0155=ES\x01268=2\x01269=0\x01270=100.5\x01\
                    453=2\x01448=A\x01452=1\x01448=B\x01452=3\x01\
                    269=1\x01270=101\x0110=001\x01";
        let map = Codec::new(&spec).parse(buf).unwrap();

        let entries = map.group(268).unwrap();
        assert_eq!(entries.first_tag, Some(269));
        assert_eq!(entries.len(), 2);
        assert_eq!(raw(&entries.members[0], 270), "100.5");

        let parties = entries.members[0].group(453).unwrap();
        assert_eq!(parties.len(), 2);
        assert_eq!(raw(&parties.members[1], 448), "B");
        assert_eq!(raw(&parties.members[1], 452), "3");

        assert_eq!(raw(&entries.members[1], 269), "1");
        assert!(!entries.members[1].contains(453));
        assert_eq!(raw(&map, 10), "001");
    }

    #[test]
    fn test_zero_count_is_empty_group() {
        let spec = spec();
        let buf = b"35=W\x01268=0\x0110=001\x01";
        let map = Codec::new(&spec).parse(buf).unwrap();
        assert!(map.group(268).unwrap().is_empty());
        assert_eq!(raw(&map, 10), "001");
    }

    #[test]
    fn test_component_group_is_nested() {
        let spec = spec();
        let buf = b"35=D\x0111=A\x01454=2\x01455=X1\x01456=8\x01455=X2\x0154=2\x01";
        let map = Codec::new(&spec).parse(buf).unwrap();
        let alt = map.group(454).unwrap();
        assert_eq!(alt.len(), 2);
        assert_eq!(raw(&alt.members[1], 455), "X2");
        assert_eq!(raw(&map, 54), "2");
    }

    #[test]
    fn test_added_group_is_nested() {
        let mut spec = spec();
        let buf = b"35=0\x01454=2\x01455=X1\x01455=X2\x0110=001\x01";
        assert!(Codec::new(&spec).parse(buf).unwrap().group(454).is_none());

        let members = vec![(Element::Tag(455), false), (Element::Tag(456), false)];
        spec.add_group("0", 454, members, None).unwrap();
        let map = Codec::new(&spec).parse(buf).unwrap();
        assert_eq!(map.group(454).unwrap().len(), 2);
        assert_eq!(raw(&map, 10), "001");
    }

    #[test]
    fn test_msg_type_outside_window_is_flat() {
        let spec = spec();
        let buf = b"8=FIX.4.4\x019=1\x0149=S\x0156=T\x0135=W\x01268=1\x01269=0\x01";
        let map = Codec::new(&spec).parse(buf).unwrap();
        assert!(map.group(268).is_none());
        assert_eq!(raw(&map, 268), "1");
    }

    #[test]
    fn test_tags_in_order() {
        let spec = spec();
        let buf = b"10=1\x0154=1\x0135=D\x0111=A\x018=FIX.4.4\x01";
        let map = Codec::new(&spec).parse(buf).unwrap();
        let key = &spec.msg_type("D").unwrap().sorting_key;
        assert_eq!(map.tags_in_order(key), vec![35, 8, 11, 54, 10]);
    }

    #[test]
    fn test_tokenize_error() {
        let spec = spec();
        let err = Codec::new(&spec).parse(b"35=D\x01oops\x01").unwrap_err();
        assert_eq!(err, DecodeError::MalformedField { offset: 5 });
    }

    #[test]
    fn test_duplicate_tag_replaces_in_place() {
        let mut map = FieldMap::new();
        map.insert(55, TagValue::Value(b"A"));
        map.insert(54, TagValue::Value(b"1"));
        map.insert(55, TagValue::Value(b"B"));
        assert_eq!(map.len(), 2);
        assert_eq!(map.raw(55), Some(&b"B"[..]));
        assert_eq!(map.iter().next().unwrap().0, 55);
    }
}
