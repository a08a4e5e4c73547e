/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Repeating group decoding.
//!
//! A group container is a dimension header followed by `count` instance
//! blocks. Nested groups of an instance follow its block and are not counted
//! in the block length, so instance positions depend on the encoded size of
//! every nested group before them.

use crate::field::FieldView;
use crate::message::{is_present, mapped_value};
use crate::primitive::slice_at;
use crate::schema::GroupSpec;
use marketcast_core::{DecodeError, Record, Value};

/// A wrapped repeating group container.
#[derive(Debug, Clone)]
pub struct GroupContainer<'a> {
    spec: &'a GroupSpec,
    block_length: usize,
    instances: Vec<GroupInstance<'a>>,
    encoded_len: usize,
}

/// One instance of a repeating group.
#[derive(Debug, Clone)]
pub struct GroupInstance<'a> {
    spec: &'a GroupSpec,
    buf: &'a [u8],
    base: usize,
    relative: usize,
    version: u64,
    groups: Vec<GroupContainer<'a>>,
}

impl<'a> GroupContainer<'a> {
    /// Wraps a group container and all of its nested groups.
    ///
    /// # Arguments
    /// * `spec` - Group layout
    /// * `buf` - Message buffer
    /// * `base` - Offset of the message in the buffer
    /// * `start` - Offset of the dimension header from the message start
    /// * `version` - Message version used to skip newer nested groups
    ///
    /// # Errors
    /// Returns `DecodeError::BufferTooShort` if the header or any instance
    /// extends past the buffer.
    pub fn wrap(
        spec: &'a GroupSpec,
        buf: &'a [u8],
        base: usize,
        start: usize,
        version: u64,
    ) -> Result<Self, DecodeError> {
        let dimension = &spec.dimension;
        let block_length =
            FieldView::wrap(&dimension.block_length, buf, base, start).raw_unsigned()? as usize;
        let count = FieldView::wrap(&dimension.num_in_group, buf, base, start).raw_unsigned()?;
        let mut instance_offset = start + dimension.size;

        let nested_present = spec.groups.iter().any(|g| is_present(g.since_version, version));
        if block_length == 0 && count > 0 && !nested_present {
            return Err(DecodeError::InvalidFieldValue {
                field: spec.name.clone(),
                reason: format!("{count} instances with a zero block length"),
            });
        }
        let available = buf.len().saturating_sub(base + instance_offset);
        let needed = usize::try_from(count)
            .ok()
            .and_then(|n| n.checked_mul(block_length))
            .unwrap_or(usize::MAX);
        if needed > available {
            return Err(DecodeError::BufferTooShort {
                offset: base + instance_offset,
                needed,
                available,
            });
        }

        let mut instances = Vec::new();
        let mut nested_len = 0usize;
        for _ in 0..count {
            let relative = instance_offset + nested_len;
            slice_at(buf, base + relative, block_length)?;
            instance_offset += block_length;

            let mut groups = Vec::with_capacity(spec.groups.len());
            for nested in spec.groups.iter().filter(|g| is_present(g.since_version, version)) {
                let nested_start = instance_offset + nested_len;
                let container = Self::wrap(nested, buf, base, nested_start, version)?;
                nested_len += container.encoded_len;
                groups.push(container);
            }

            instances.push(GroupInstance {
                spec,
                buf,
                base,
                relative,
                version,
                groups,
            });
        }

        let encoded_len = dimension.size + instances.len() * block_length + nested_len;
        Ok(Self {
            spec,
            block_length,
            instances,
            encoded_len,
        })
    }

    /// Returns the group layout.
    #[must_use]
    pub const fn spec(&self) -> &'a GroupSpec {
        self.spec
    }

    /// Returns the group name.
    #[must_use]
    pub fn name(&self) -> &'a str {
        &self.spec.name
    }

    /// Returns the block length read from the dimension header.
    #[must_use]
    pub const fn block_length(&self) -> usize {
        self.block_length
    }

    /// Returns the number of instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Returns true if the group has no instances.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Returns the instances in wire order.
    #[must_use]
    pub fn instances(&self) -> &[GroupInstance<'a>] {
        &self.instances
    }

    /// Returns the total bytes consumed: header, instance blocks and nested groups.
    #[must_use]
    pub const fn encoded_len(&self) -> usize {
        self.encoded_len
    }

    /// Decodes every instance into a record.
    ///
    /// # Errors
    /// Returns the first `DecodeError` raised by any field.
    pub fn to_records(&self) -> Result<Vec<Record>, DecodeError> {
        self.instances.iter().map(GroupInstance::to_record).collect()
    }
}

impl<'a> GroupInstance<'a> {
    /// Returns the offset of the instance block from the message start.
    #[must_use]
    pub const fn relative_offset(&self) -> usize {
        self.relative
    }

    /// Returns views over the fields present in this instance.
    pub fn fields(&self) -> impl Iterator<Item = FieldView<'a>> + '_ {
        self.spec
            .fields
            .iter()
            .filter(|f| is_present(f.since_version, self.version))
            .map(|f| FieldView::wrap(f, self.buf, self.base, self.relative))
    }

    /// Returns the view of a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<FieldView<'a>> {
        self.fields().find(|f| f.name() == name)
    }

    /// Returns the nested groups of this instance.
    #[must_use]
    pub fn groups(&self) -> &[GroupContainer<'a>] {
        &self.groups
    }

    /// Decodes the instance fields and nested groups into a record.
    ///
    /// # Errors
    /// Returns the first `DecodeError` raised by any field.
    pub fn to_record(&self) -> Result<Record, DecodeError> {
        let mut record = Record::with_capacity(self.spec.fields.len() + self.groups.len());
        for view in self.fields().filter(|f| f.spec().id.is_some()) {
            record.insert(view.name(), mapped_value(&view)?);
        }
        for group in &self.groups {
            record.insert(group.name(), Value::List(group.to_records()?));
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CatalogueOptions, SchemaCatalogue};

    const NESTED_SCHEMA: &str = r#"<messageSchema byteOrder="littleEndian">
  <types>
    <composite name="messageHeader">
      <type name="blockLength" primitiveType="uint16"/>
      <type name="templateId" primitiveType="uint16"/>
      <type name="schemaId" primitiveType="uint16"/>
      <type name="version" primitiveType="uint16"/>
    </composite>
    <composite name="groupSize">
      <type name="blockLength" primitiveType="uint16"/>
      <type name="numInGroup" primitiveType="uint8"/>
    </composite>
  </types>
  <message name="Book" id="5" blockLength="0">
    <group name="Entries" id="1" dimensionType="groupSize">
      <field name="Px" id="2" type="int32"/>
      <group name="Orders" id="3" dimensionType="groupSize">
        <field name="OrderQty" id="4" type="uint16"/>
      </group>
    </group>
  </message>
</messageSchema>"#;

    fn dimension(buf: &mut Vec<u8>, block_length: u16, count: u8) {
        buf.extend_from_slice(&block_length.to_le_bytes());
        buf.push(count);
    }

    #[test]
    fn test_nested_groups_span_matches_advance() {
        let catalogue =
            SchemaCatalogue::parse_str(NESTED_SCHEMA, CatalogueOptions::default()).unwrap();
        let entries = &catalogue.template(5).unwrap().groups[0];

        let mut buf = Vec::new();
        dimension(&mut buf, 4, 2);
        buf.extend_from_slice(&100i32.to_le_bytes());
        dimension(&mut buf, 2, 2);
        buf.extend_from_slice(&7u16.to_le_bytes());
        buf.extend_from_slice(&8u16.to_le_bytes());
        buf.extend_from_slice(&200i32.to_le_bytes());
        dimension(&mut buf, 2, 0);

        let container = GroupContainer::wrap(entries, &buf, 0, 0, 0).unwrap();
        assert_eq!(container.len(), 2);
        assert_eq!(container.encoded_len(), buf.len());
        assert_eq!(container.instances()[1].relative_offset(), 3 + 4 + 3 + 4);

        let records = container.to_records().unwrap();
        assert_eq!(records[0].get("px"), Some(&Value::Int(100)));
        let orders = records[0].get("orders").unwrap().as_list().unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[1].get("order_qty"), Some(&Value::UInt(8)));
        assert_eq!(records[1].get("px"), Some(&Value::Int(200)));
        assert_eq!(records[1].get("orders").unwrap().as_list().unwrap().len(), 0);

        let again = GroupContainer::wrap(entries, &buf, 0, 0, 0).unwrap();
        assert_eq!(again.encoded_len(), container.encoded_len());
    }

    #[test]
    fn test_empty_group_consumes_dimension_only() {
        let catalogue =
            SchemaCatalogue::parse_str(NESTED_SCHEMA, CatalogueOptions::default()).unwrap();
        let entries = &catalogue.template(5).unwrap().groups[0];
        let mut buf = Vec::new();
        dimension(&mut buf, 4, 0);
        let container = GroupContainer::wrap(entries, &buf, 0, 0, 0).unwrap();
        assert!(container.is_empty());
        assert_eq!(container.encoded_len(), entries.dimension.size);
        assert!(container.to_records().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_count_is_bounds_checked() {
        let catalogue =
            SchemaCatalogue::parse_str(NESTED_SCHEMA, CatalogueOptions::default()).unwrap();
        let entries = &catalogue.template(5).unwrap().groups[0];
        let mut buf = Vec::new();
        dimension(&mut buf, 4, 255);
        buf.extend_from_slice(&1i32.to_le_bytes());
        let err = GroupContainer::wrap(entries, &buf, 0, 0, 0).unwrap_err();
        assert!(matches!(err, DecodeError::BufferTooShort { .. }));
    }

    #[test]
    fn test_zero_block_length_with_count_is_rejected() {
        let catalogue =
            SchemaCatalogue::parse_str(NESTED_SCHEMA, CatalogueOptions::default()).unwrap();
        let orders = &catalogue.template(5).unwrap().groups[0].groups[0];
        let mut buf = Vec::new();
        dimension(&mut buf, 0, 255);
        buf.extend_from_slice(&[0u8; 7]);

        let err = GroupContainer::wrap(orders, &buf, 0, 0, 0).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::InvalidFieldValue { ref field, .. } if field == "orders"
        ));

        let mut empty = Vec::new();
        dimension(&mut empty, 0, 0);
        assert_eq!(GroupContainer::wrap(orders, &empty, 0, 0, 0).unwrap().encoded_len(), 3);
    }
}
