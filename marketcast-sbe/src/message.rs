/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Binary message wrapping.
//!
//! [`SbeMessage::wrap`] positions every field and repeating group of a
//! template over a borrowed buffer. Field values stay undecoded until they are
//! read or the message is flattened with [`SbeMessage::to_record`].

use crate::field::FieldView;
use crate::group::GroupContainer;
use crate::schema::{MESSAGE_SIZE_FIELD, MessageTemplate};
use marketcast_core::{DecodeError, Record, Value};

/// Name of the header field carrying the message version.
const VERSION_FIELD: &str = "version";

/// Returns true if an element introduced in `since_version` exists in a
/// message of `version`. Version 0 means unversioned and keeps everything.
#[inline]
pub(crate) fn is_present(since_version: u32, version: u64) -> bool {
    version == 0 || u64::from(since_version) <= version
}

/// Decodes a field for the flattened record, trimming string values.
pub(crate) fn mapped_value(view: &FieldView<'_>) -> Result<Value, DecodeError> {
    Ok(trim_strings(view.value()?))
}

fn trim_strings(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.trim().to_string()),
        Value::Record(record) => Value::Record(
            record
                .iter()
                .map(|(name, v)| (name.to_string(), trim_strings(v.clone())))
                .collect(),
        ),
        other => other,
    }
}

/// A template wrapped over a buffer.
#[derive(Debug, Clone)]
pub struct SbeMessage<'a> {
    template: &'a MessageTemplate,
    buf: &'a [u8],
    offset: usize,
    version: u64,
    groups: Vec<GroupContainer<'a>>,
    encoded_len: usize,
}

impl<'a> SbeMessage<'a> {
    /// Wraps a template at `offset` in `buf`.
    ///
    /// The root block starts after the header, and groups follow the root
    /// block chained by each group's encoded length.
    ///
    /// # Errors
    /// Returns `DecodeError::BufferTooShort` if the header or a group
    /// extends past the buffer.
    pub fn wrap(
        template: &'a MessageTemplate,
        buf: &'a [u8],
        offset: usize,
    ) -> Result<Self, DecodeError> {
        let version = match template.field(VERSION_FIELD) {
            Some(spec) if spec.id.is_none() => {
                FieldView::wrap(spec, buf, offset, 0).raw_unsigned()?
            }
            _ => 0,
        };

        let mut group_offset = template.header_size + template.block_length;
        let mut groups = Vec::with_capacity(template.groups.len());
        for spec in template.groups.iter().filter(|g| is_present(g.since_version, version)) {
            let container = GroupContainer::wrap(spec, buf, offset, group_offset, version)?;
            group_offset += container.encoded_len();
            groups.push(container);
        }

        Ok(Self {
            template,
            buf,
            offset,
            version,
            groups,
            encoded_len: group_offset,
        })
    }

    /// Returns the template.
    #[must_use]
    pub const fn template(&self) -> &'a MessageTemplate {
        self.template
    }

    /// Returns the message name.
    #[must_use]
    pub fn name(&self) -> &'a str {
        &self.template.name
    }

    /// Returns the offset of the message in the buffer.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the version read from the header, or 0.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Returns the total bytes spanned by header, root block and groups.
    #[must_use]
    pub const fn encoded_len(&self) -> usize {
        self.encoded_len
    }

    /// Returns the value of the `message_size` header field, if present.
    ///
    /// # Errors
    /// Returns `DecodeError::BufferTooShort` if the field extends past the buffer.
    pub fn message_size(&self) -> Result<Option<u64>, DecodeError> {
        self.template
            .field(MESSAGE_SIZE_FIELD)
            .filter(|spec| spec.id.is_none())
            .map(|spec| FieldView::wrap(spec, self.buf, self.offset, 0).raw_unsigned())
            .transpose()
    }

    /// Returns views over the header and body fields present in this version.
    pub fn fields(&self) -> impl Iterator<Item = FieldView<'a>> + '_ {
        self.template
            .fields
            .iter()
            .filter(|f| is_present(f.since_version, self.version))
            .map(|f| FieldView::wrap(f, self.buf, self.offset, 0))
    }

    /// Returns the view of a field by snake-case name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<FieldView<'a>> {
        self.fields().find(|f| f.name() == name)
    }

    /// Returns the wrapped groups.
    #[must_use]
    pub fn groups(&self) -> &[GroupContainer<'a>] {
        &self.groups
    }

    /// Returns a wrapped group by snake-case name.
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&GroupContainer<'a>> {
        self.groups.iter().find(|g| g.name() == name)
    }

    /// Flattens the message into a record.
    ///
    /// Only body fields (those with ids) are included. String values are
    /// trimmed and each group becomes a list of instance records.
    ///
    /// # Errors
    /// Returns the first `DecodeError` raised by any field.
    pub fn to_record(&self) -> Result<Record, DecodeError> {
        let mut record = Record::with_capacity(self.template.fields.len() + self.groups.len());
        for view in self.fields().filter(|f| f.spec().id.is_some()) {
            record.insert(view.name(), mapped_value(&view)?);
        }
        for group in &self.groups {
            record.insert(group.name(), Value::List(group.to_records()?));
        }
        Ok(record)
    }
}
