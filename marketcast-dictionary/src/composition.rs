/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Message, component and group compositions.
//!
//! A [`Composition`] is the ordered list of tags, components and groups that
//! make up a FIX message, component or group. Components are shared through
//! `Arc` since many messages include the same ones.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Tag number of MsgType.
pub const MSG_TYPE_TAG: u32 = 35;

/// Tag number of CheckSum.
pub const CHECKSUM_TAG: u32 = 10;

/// Header tags used when a dictionary defines no header.
pub const DEFAULT_HEADER_TAGS: [u32; 30] = [
    8, 9, 35, 1128, 1156, 1129, 49, 56, 115, 128, 90, 91, 34, 50, 142, 57, 143, 116, 144, 129, 145,
    43, 97, 52, 122, 212, 213, 347, 369, 370,
];

/// Trailer tags used when a dictionary defines no trailer.
pub const DEFAULT_TRAILER_TAGS: [u32; 3] = [93, 89, 10];

/// One entry of a composition.
#[derive(Debug, Clone)]
pub enum Element {
    /// A tag, by number.
    Tag(u32),
    /// A component, flattened in place.
    Component(Arc<Component>),
    /// A repeating group.
    Group(Arc<Group>),
}

/// Ordered `(element, required)` pairs.
pub type Composition = Vec<(Element, bool)>;

/// Collects the groups of a composition, including those reachable through
/// components, keyed by count tag.
pub(crate) fn collect_groups(composition: &Composition, out: &mut HashMap<u32, Arc<Group>>) {
    for (element, _) in composition {
        match element {
            Element::Group(group) => {
                out.insert(group.count_tag, Arc::clone(group));
            }
            Element::Component(component) => collect_groups(&component.composition, out),
            Element::Tag(_) => {}
        }
    }
}

/// Collects the tags of a composition, including those of components but
/// not the members of groups.
pub(crate) fn collect_tags(composition: &Composition, out: &mut HashSet<u32>) {
    for (element, _) in composition {
        match element {
            Element::Tag(number) => {
                out.insert(*number);
            }
            Element::Component(component) => collect_tags(&component.composition, out),
            Element::Group(_) => {}
        }
    }
}

/// Tag ordering used to serialize a message in wire order.
///
/// MsgType sorts first, then the header tags, then the body tags in
/// composition order. Unknown tags sort after the body by tag number, the
/// trailer tags follow and CheckSum is last.
#[derive(Debug, Clone, Default)]
pub struct SortingKey {
    positions: HashMap<u32, u64>,
}

impl SortingKey {
    const UNKNOWN_BASE: u64 = 1 << 40;
    const TRAILER_BASE: u64 = u64::MAX - 1024;

    /// Builds the key for a composition.
    ///
    /// # Arguments
    /// * `composition` - Body composition walked depth first
    /// * `header` - Header tags in dictionary order
    /// * `trailer` - Trailer tags in dictionary order
    #[must_use]
    pub fn build(composition: &Composition, header: &[u32], trailer: &[u32]) -> Self {
        let mut positions = HashMap::new();
        positions.insert(MSG_TYPE_TAG, 0);
        let mut next = 1u64;
        for &tag in header {
            positions.entry(tag).or_insert_with(|| {
                next += 1;
                next - 1
            });
        }
        Self::walk(composition, &mut positions, &mut next);
        for (i, &tag) in trailer.iter().enumerate() {
            positions.insert(tag, Self::TRAILER_BASE + i as u64);
        }
        positions.insert(CHECKSUM_TAG, u64::MAX);
        Self { positions }
    }

    fn walk(composition: &Composition, positions: &mut HashMap<u32, u64>, next: &mut u64) {
        for (element, _) in composition {
            match element {
                Element::Tag(tag) => Self::assign(*tag, positions, next),
                Element::Group(group) => Self::assign(group.count_tag, positions, next),
                Element::Component(component) => {
                    Self::walk(&component.composition, positions, next);
                }
            }
        }
    }

    fn assign(tag: u32, positions: &mut HashMap<u32, u64>, next: &mut u64) {
        if let std::collections::hash_map::Entry::Vacant(slot) = positions.entry(tag) {
            slot.insert(*next);
            *next += 1;
        }
    }

    /// Returns the sort position of a tag.
    #[must_use]
    pub fn position(&self, tag: u32) -> u64 {
        self.positions
            .get(&tag)
            .copied()
            .unwrap_or(Self::UNKNOWN_BASE + u64::from(tag))
    }

    /// Places a tag at an explicit sort position.
    pub fn set_position(&mut self, tag: u32, position: u64) {
        self.positions.insert(tag, position);
    }

    /// Sorts tags into wire order.
    pub fn sort_tags(&self, tags: &mut [u32]) {
        tags.sort_by_key(|&tag| self.position(tag));
    }
}

/// A reusable named composition.
#[derive(Debug, Clone)]
pub struct Component {
    /// Component name.
    pub name: String,
    /// Ordered contents.
    pub composition: Composition,
    /// Wire order of the component's tags.
    pub sorting_key: SortingKey,
}

/// A repeating group.
#[derive(Debug, Clone)]
pub struct Group {
    /// Tag number of the count field.
    pub count_tag: u32,
    /// Name of the count field.
    pub name: String,
    /// Ordered contents of one instance.
    pub composition: Composition,
    /// Tags placed directly in the group.
    pub tags: HashSet<u32>,
    /// Tags of one instance, including those of components.
    pub all_child_tags: HashSet<u32>,
    /// Nested groups by count tag, including those inside components.
    pub groups: HashMap<u32, Arc<Group>>,
    /// Wire order of an instance's tags.
    pub sorting_key: SortingKey,
}

impl Group {
    /// Creates a group and derives its tag sets and sorting key.
    #[must_use]
    pub fn new(
        count_tag: u32,
        name: impl Into<String>,
        composition: Composition,
        header: &[u32],
        trailer: &[u32],
    ) -> Self {
        let tags = composition
            .iter()
            .filter_map(|(e, _)| match e {
                Element::Tag(tag) => Some(*tag),
                _ => None,
            })
            .collect();
        let mut all_child_tags = HashSet::new();
        collect_tags(&composition, &mut all_child_tags);
        let mut groups = HashMap::new();
        collect_groups(&composition, &mut groups);
        let sorting_key = SortingKey::build(&composition, header, trailer);
        Self {
            count_tag,
            name: name.into(),
            composition,
            tags,
            all_child_tags,
            groups,
            sorting_key,
        }
    }

    /// Returns the tag that opens each instance.
    #[must_use]
    pub fn first_tag(&self) -> Option<u32> {
        self.composition.first().and_then(|(element, _)| first_tag_of(element))
    }
}

fn first_tag_of(element: &Element) -> Option<u32> {
    match element {
        Element::Tag(tag) => Some(*tag),
        Element::Group(group) => Some(group.count_tag),
        Element::Component(component) => component
            .composition
            .first()
            .and_then(|(element, _)| first_tag_of(element)),
    }
}

/// A message type of the specification.
#[derive(Debug, Clone)]
pub struct MessageType {
    /// Value of tag 35.
    pub msgtype: String,
    /// Message name.
    pub name: String,
    /// Ordered body contents.
    pub composition: Composition,
    /// Groups by count tag, including those inside components.
    pub groups: HashMap<u32, Arc<Group>>,
    /// Wire order of the message's tags.
    pub sorting_key: SortingKey,
}

impl MessageType {
    /// Creates a message type and derives its group table and sorting key.
    #[must_use]
    pub fn new(
        msgtype: impl Into<String>,
        name: impl Into<String>,
        composition: Composition,
        header: &[u32],
        trailer: &[u32],
    ) -> Self {
        let mut groups = HashMap::new();
        collect_groups(&composition, &mut groups);
        let sorting_key = SortingKey::build(&composition, header, trailer);
        Self {
            msgtype: msgtype.into(),
            name: name.into(),
            composition,
            groups,
            sorting_key,
        }
    }

    /// Registers a synthetic repeating group on the message type.
    ///
    /// Without `insert_at` the count tag keeps its current position, which
    /// for a tag outside the composition is after the body by tag number.
    ///
    /// # Arguments
    /// * `group` - Group to register, replacing any group with the same count tag
    /// * `insert_at` - Optional sort position of the count tag
    pub fn add_group(&mut self, group: Group, insert_at: Option<u64>) {
        if let Some(position) = insert_at {
            self.sorting_key.set_position(group.count_tag, position);
        }
        self.groups.insert(group.count_tag, Arc::new(group));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(name: &str, composition: Composition) -> Arc<Component> {
        let sorting_key = SortingKey::build(&composition, &[], &[]);
        Arc::new(Component {
            name: name.to_string(),
            composition,
            sorting_key,
        })
    }

    #[test]
    fn test_sorting_key_order() {
        let instrument = component(
            "Instrument",
            vec![(Element::Tag(55), false), (Element::Tag(48), false)],
        );
        let composition = vec![
            (Element::Tag(11), true),
            (Element::Component(instrument), true),
            (Element::Tag(54), true),
        ];
        let key = SortingKey::build(&composition, &[8, 9, 35, 49], &[93, 89, 10]);

        let mut tags = vec![10, 54, 7777, 55, 49, 89, 11, 35, 8, 48, 9];
        key.sort_tags(&mut tags);
        assert_eq!(tags, vec![35, 8, 9, 49, 11, 55, 48, 54, 7777, 89, 10]);
        assert!(key.position(7777) < key.position(93));
        assert!(key.position(7777) < key.position(7778));
    }

    #[test]
    fn test_group_tag_sets() {
        let parties = Arc::new(Group::new(
            453,
            "NoPartyIDs",
            vec![(Element::Tag(448), false), (Element::Tag(452), false)],
            &[],
            &[],
        ));
        let wrapper = component("Parties", vec![(Element::Group(Arc::clone(&parties)), false)]);
        let extra = component("Extra", vec![(Element::Tag(58), false)]);
        let entries = Group::new(
            268,
            "NoMDEntries",
            vec![
                (Element::Tag(269), true),
                (Element::Tag(270), false),
                (Element::Component(extra), false),
                (Element::Component(wrapper), false),
            ],
            &[],
            &[],
        );

        assert_eq!(entries.first_tag(), Some(269));
        assert_eq!(entries.tags, HashSet::from([269, 270]));
        assert_eq!(entries.all_child_tags, HashSet::from([269, 270, 58]));
        assert!(entries.groups.contains_key(&453));
        assert_eq!(parties.first_tag(), Some(448));
    }

    #[test]
    fn test_message_type_collects_component_groups() {
        let alt_members = vec![(Element::Tag(455), false)];
        let alt = Arc::new(Group::new(454, "NoSecurityAltID", alt_members, &[], &[]));
        let instrument = component(
            "Instrument",
            vec![(Element::Tag(55), false), (Element::Group(alt), false)],
        );
        let body = vec![(Element::Component(instrument), true)];
        let message = MessageType::new("D", "NewOrderSingle", body, &[], &[]);
        assert_eq!(message.groups.len(), 1);
        assert!(message.groups.contains_key(&454));
        assert!(message.sorting_key.position(55) < message.sorting_key.position(454));
    }

    #[test]
    fn test_message_type_add_group() {
        let body = vec![(Element::Tag(11), true)];
        let mut message = MessageType::new("D", "NewOrderSingle", body, &[], &[]);
        let legs = Group::new(555, "NoLegs", vec![(Element::Tag(600), false)], &[], &[]);
        message.add_group(legs, None);
        assert_eq!(message.groups[&555].first_tag(), Some(600));
        assert!(message.sorting_key.position(555) > message.sorting_key.position(11));

        let legs = Group::new(555, "NoLegs", vec![(Element::Tag(654), false)], &[], &[]);
        message.add_group(legs, Some(1));
        assert_eq!(message.groups[&555].first_tag(), Some(654));
        assert_eq!(message.sorting_key.position(555), 1);
    }
}
