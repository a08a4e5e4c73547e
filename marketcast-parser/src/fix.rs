/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! FIX tag=value parser.
//!
//! Schemas are built by flattening each message's composition. Components are
//! inlined, groups become nested group fields, and a tag seen twice at the
//! same level keeps its first position. Records are split by the
//! group-aware codec and every value is cast by its dictionary type.

use crate::config::ParserConfig;
use crate::contract::{FormatDecoder, Parser};
use marketcast_core::{
    ConfigError, DecodeError, MarketcastError, MessageIdentity, Record, SchemaDescriptor,
    SchemaField, Value,
};
use marketcast_dictionary::{Composition, Element, FixSpec, FixTag, MSG_TYPE_TAG};
use marketcast_tagvalue::{Codec, FieldMap, TagValue};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

/// Parser kinds served by the FIX decoder.
pub const FIX_TYPES: [&str; 1] = ["fix"];

/// Format hooks for FIX records.
#[derive(Debug, Clone)]
pub struct FixParser {
    spec: Arc<FixSpec>,
    separator: u8,
    header_tags: Vec<u32>,
    excluded_tags: HashSet<u32>,
}

impl FixParser {
    /// Creates a parser over a shared specification.
    ///
    /// The configured extra header tags come first in every schema, followed
    /// by the specification's header tags.
    ///
    /// # Errors
    /// Returns `ConfigError::UnknownTag` if an extra header tag is not defined
    /// in the specification.
    pub fn new(spec: Arc<FixSpec>, config: &ParserConfig) -> Result<Self, ConfigError> {
        if let Some(&unknown) = config.fix_header_tags.iter().find(|&&t| spec.tag(t).is_none()) {
            return Err(ConfigError::UnknownTag(unknown));
        }
        let header_tags = config
            .fix_header_tags
            .iter()
            .chain(spec.header_tags())
            .copied()
            .collect();
        Ok(Self {
            spec,
            separator: config.fix_separator,
            header_tags,
            excluded_tags: config.excluded_record_tags.iter().copied().collect(),
        })
    }

    /// Loads the dictionary named by `config` and wraps it in the lifecycle.
    ///
    /// # Errors
    /// Returns `MarketcastError::Schema` if the dictionary cannot be loaded,
    /// or `MarketcastError::Config` for invalid settings.
    pub fn from_config(config: ParserConfig) -> Result<Parser<Self>, MarketcastError> {
        let spec = FixSpec::parse(&config.schema_path)?;
        let parser = Self::new(Arc::new(spec), &config)?;
        Ok(Parser::new(parser, config)?)
    }

    /// Returns the specification.
    #[must_use]
    pub fn spec(&self) -> &Arc<FixSpec> {
        &self.spec
    }

    /// Returns the header tags prepended to every schema.
    #[must_use]
    pub fn header_tags(&self) -> &[u32] {
        &self.header_tags
    }

    fn codec(&self) -> Codec<'_> {
        Codec::new(&self.spec).with_separator(self.separator)
    }

    /// Flattens a composition into schema fields.
    fn traverse<'s>(
        &'s self,
        message: &str,
        composition: &'s Composition,
        seen: &mut Vec<&'s FixTag>,
        fields: &mut Vec<SchemaField>,
    ) {
        for (element, _) in composition {
            match element {
                Element::Tag(number) => self.unique_append(message, *number, seen, fields),
                Element::Component(component) => {
                    self.traverse(message, &component.composition, seen, fields);
                }
                Element::Group(group) => {
                    let mut group_fields = Vec::new();
                    self.traverse(message, &group.composition, &mut Vec::new(), &mut group_fields);
                    fields.push(SchemaField::Group {
                        name: group.name.clone(),
                        fields: group_fields,
                    });
                }
            }
        }
    }

    fn unique_append<'s>(
        &'s self,
        message: &str,
        number: u32,
        seen: &mut Vec<&'s FixTag>,
        fields: &mut Vec<SchemaField>,
    ) {
        let Some(tag) = self.spec.tag(number) else {
            return;
        };
        if seen.iter().any(|s| s.is_equal(tag)) {
            warn!(
                msg_type = message,
                tag = number,
                name = tag.name(),
                "duplicate field dropped from schema"
            );
            return;
        }
        seen.push(tag);
        fields.push(SchemaField::scalar(tag.name(), tag.logical_type()));
    }

    /// Converts a tag map into a record, recursing into groups.
    fn record(&self, map: &FieldMap<'_>) -> Result<Record, DecodeError> {
        let mut record = Record::with_capacity(map.len());
        for (number, value) in map.iter() {
            if self.excluded_tags.contains(&number) {
                continue;
            }
            let tag = self.spec.tag(number).ok_or(DecodeError::UnknownTag(number))?;
            let value = match value {
                TagValue::Value(raw) => {
                    let text = std::str::from_utf8(raw)
                        .map_err(|_| DecodeError::InvalidUtf8(tag.name().to_string()))?;
                    tag.cast_value(text)?
                }
                TagValue::Group(group) => Value::List(
                    group
                        .members
                        .iter()
                        .map(|member| self.record(member))
                        .collect::<Result<_, _>>()?,
                ),
            };
            record.insert(tag.name(), value);
        }
        Ok(record)
    }
}

impl FormatDecoder for FixParser {
    type Frame<'a> = FieldMap<'a>;

    fn supported_types(&self) -> &'static [&'static str] {
        &FIX_TYPES
    }

    fn extract_schemas(&self) -> Vec<SchemaDescriptor> {
        let mut msg_types: Vec<_> = self.spec.msg_types().collect();
        msg_types.sort_by(|a, b| a.msgtype.cmp(&b.msgtype));

        msg_types
            .into_iter()
            .map(|msg_type| {
                let mut seen = Vec::new();
                let mut fields = Vec::new();
                for &number in &self.header_tags {
                    self.unique_append(&msg_type.name, number, &mut seen, &mut fields);
                }
                self.traverse(&msg_type.name, &msg_type.composition, &mut seen, &mut fields);
                SchemaDescriptor::new(msg_type.msgtype.as_str(), msg_type.name.clone(), fields)
            })
            .collect()
    }

    fn identify<'a>(
        &'a self,
        raw: &'a [u8],
    ) -> Result<(MessageIdentity, FieldMap<'a>), DecodeError> {
        let map = self.codec().parse(raw)?;
        let msgtype = map.raw(MSG_TYPE_TAG).ok_or(DecodeError::MissingMsgType)?;
        let msgtype = std::str::from_utf8(msgtype)
            .map_err(|_| DecodeError::InvalidUtf8(MSG_TYPE_TAG.to_string()))?;
        let msg_type = self
            .spec
            .msg_type(msgtype)
            .ok_or_else(|| DecodeError::UnknownMessageType {
                msg_type: msgtype.to_string(),
            })?;
        Ok((MessageIdentity::new(msgtype, msg_type.name.clone()), map))
    }

    fn decode_fields(&self, frame: &FieldMap<'_>) -> Result<Record, DecodeError> {
        self.record(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use marketcast_core::{DecodeStage, MessageTypeId};
    use std::io::Write;

    const FIX44_SUBSET: &str = include_str!("../../fixtures/fix44-subset.xml");

    const ORDER: &str = "8=FIX.4.4|9=120|35=D|49=S|56=T|34=1|52=20240101-09:30:00|\
                         11=ord-1|55=IBM|48=459200101|454=1|455=US4592001014|456=4|\
                         54=1|38=100|44=12.50|114=Y|10=042|";

    const SNAPSHOT: &str = "8=FIX.4.4|9=150|35=W|49=S|56=T|34=2|52=20240101-09:30:01|\
                            262=req-7|55=ES|268=2|269=0|270=100.25|271=5|453=1|448=P1|\
                            452=3|269=1|270=100.50|271=7|10=017|";

    fn spec() -> Arc<FixSpec> {
        Arc::new(FixSpec::parse_str(FIX44_SUBSET).unwrap())
    }

    fn parser(config: ParserConfig) -> Parser<FixParser> {
        let config = config.with_fix_separator(b'|');
        let fix = FixParser::new(spec(), &config).unwrap();
        Parser::new(fix, config).unwrap()
    }

    fn names(schema: &SchemaDescriptor) -> Vec<&str> {
        schema.fields.iter().map(SchemaField::name).collect()
    }

    #[test]
    fn test_schema_flattens_components_and_drops_duplicates() {
        let mut parser = parser(ParserConfig::new("FIX44.xml"));
        let schemas = parser.process_schema();
        let ids: Vec<String> = schemas.iter().map(|s| s.message_id.to_string()).collect();
        assert_eq!(ids, vec!["0", "D", "W"]);

        let order = &schemas[1];
        assert_eq!(order.message_name, "NewOrderSingle");
        assert_eq!(
            names(order),
            vec![
                "BeginString",
                "BodyLength",
                "MsgType",
                "SenderCompID",
                "TargetCompID",
                "MsgSeqNum",
                "SendingTime",
                "ClOrdID",
                "Symbol",
                "SecurityID",
                "NoSecurityAltID",
                "Side",
                "OrderQty",
                "Price",
                "LocateReqd",
            ]
        );
        assert!(matches!(
            order.field("NoSecurityAltID"),
            Some(SchemaField::Group { fields, .. }) if fields.len() == 2
        ));
    }

    #[test]
    fn test_schema_nests_component_groups_in_groups() {
        let mut parser = parser(ParserConfig::new("FIX44.xml"));
        let schemas = parser.process_schema();
        let Some(SchemaField::Group { fields, .. }) = schemas[2].field("NoMDEntries") else {
            panic!("NoMDEntries should be a group");
        };
        let nested: Vec<&str> = fields.iter().map(SchemaField::name).collect();
        assert_eq!(nested, vec!["MDEntryType", "MDEntryPx", "MDEntrySize", "NoPartyIDs"]);
    }

    #[test]
    fn test_extra_header_tags_come_first() {
        let mut parser = parser(ParserConfig::new("FIX44.xml").with_fix_header_tags(vec![112]));
        assert_eq!(parser.decoder().header_tags()[..2], [112, 8]);
        let schemas = parser.process_schema();
        let heartbeat = names(&schemas[0]);
        assert_eq!(heartbeat[0], "TestReqID");
        assert_eq!(heartbeat.iter().filter(|n| **n == "TestReqID").count(), 1);

        let config = ParserConfig::new("FIX44.xml").with_fix_header_tags(vec![9999]);
        assert_eq!(
            FixParser::new(spec(), &config).unwrap_err(),
            ConfigError::UnknownTag(9999)
        );
    }

    #[test]
    fn test_decode_order() {
        let mut parser = parser(ParserConfig::new("FIX44.xml"));
        let message = parser.process_message(Bytes::from_static(ORDER.as_bytes())).unwrap();
        assert!(!message.has_exception());
        assert_eq!(message.type_id, Some(MessageTypeId::Text("D".to_string())));
        assert_eq!(message.name(), "NewOrderSingle");

        let record = &message.dictionary;
        assert_eq!(record.get("MsgType"), Some(&Value::from("ORDER_SINGLE")));
        assert_eq!(record.get("BodyLength"), Some(&Value::Int(120)));
        assert_eq!(record.get("Side"), Some(&Value::from("BUY")));
        assert_eq!(record.get("Price").and_then(Value::as_decimal).unwrap().to_string(), "12.50");
        assert_eq!(record.get("LocateReqd"), Some(&Value::Bool(true)));
        assert_eq!(record.get("CheckSum"), Some(&Value::from("042")));

        let alt_ids = record.get("NoSecurityAltID").unwrap().as_list().unwrap();
        assert_eq!(alt_ids.len(), 1);
        assert_eq!(alt_ids[0].get("SecurityAltIDSource"), Some(&Value::from("4")));
    }

    #[test]
    fn test_decode_nested_groups() {
        let mut parser = parser(ParserConfig::new("FIX44.xml"));
        let message = parser.process_message(Bytes::from_static(SNAPSHOT.as_bytes())).unwrap();
        let entries = message.dictionary.get("NoMDEntries").unwrap().as_list().unwrap();
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].get("MDEntryType"), Some(&Value::from("BID")));
        let parties = entries[0].get("NoPartyIDs").unwrap().as_list().unwrap();
        assert_eq!(parties[0].get("PartyID"), Some(&Value::from("P1")));
        assert_eq!(parties[0].get("PartyRole"), Some(&Value::Int(3)));

        assert_eq!(entries[1].get("MDEntryType"), Some(&Value::from("OFFER")));
        assert_eq!(
            entries[1].get("MDEntryPx").and_then(Value::as_decimal).unwrap().to_string(),
            "100.50"
        );
        assert!(!entries[1].contains("NoPartyIDs"));
        assert_eq!(message.dictionary.get("CheckSum"), Some(&Value::from("017")));
    }

    #[test]
    fn test_excluded_record_tags() {
        let mut keeping = parser(ParserConfig::new("FIX44.xml"));
        let message = keeping.process_message(Bytes::from_static(ORDER.as_bytes())).unwrap();
        assert_eq!(message.dictionary.get("BeginString"), Some(&Value::from("FIX.4.4")));
        assert!(message.dictionary.contains("BodyLength"));
        assert!(message.dictionary.contains("CheckSum"));

        let config = ParserConfig::new("FIX44.xml").with_excluded_record_tags(vec![8, 9, 10]);
        let mut dropping = parser(config);
        let message = dropping.process_message(Bytes::from_static(ORDER.as_bytes())).unwrap();
        assert!(!message.dictionary.contains("BodyLength"));
        assert!(!message.dictionary.contains("BeginString"));
        assert!(!message.dictionary.contains("CheckSum"));
        assert!(message.dictionary.contains("ClOrdID"));
    }

    #[test]
    fn test_identify_errors_are_captured() {
        let mut parser = parser(ParserConfig::new("FIX44.xml"));

        let raw = Bytes::from_static(b"8=FIX.4.4|35=Z|10=000|");
        let unknown = parser.process_message(raw).unwrap();
        let captured = unknown.exception.unwrap();
        assert_eq!(captured.stage, DecodeStage::DecodeMessage);
        assert_eq!(
            captured.error,
            DecodeError::UnknownMessageType {
                msg_type: "Z".to_string()
            }
        );

        let missing = parser.process_message(Bytes::from_static(b"8=FIX.4.4|49=S|")).unwrap();
        assert_eq!(missing.exception.unwrap().error, DecodeError::MissingMsgType);
        assert_eq!(parser.stats().error_count("UNKNOWN"), 2);
    }

    #[test]
    fn test_field_errors_are_captured() {
        let mut parser = parser(ParserConfig::new("FIX44.xml"));

        let bad_bool = parser
            .process_message(Bytes::from_static(b"8=FIX.4.4|35=D|11=o|114=X|"))
            .unwrap();
        let captured = bad_bool.exception.unwrap();
        assert_eq!(captured.stage, DecodeStage::ParseMessage);
        assert_eq!(captured.message_type.as_deref(), Some("NewOrderSingle"));
        assert!(matches!(captured.error, DecodeError::InvalidFieldValue { .. }));

        let unknown_tag = parser
            .process_message(Bytes::from_static(b"8=FIX.4.4|35=0|7777=x|"))
            .unwrap();
        assert_eq!(unknown_tag.exception.unwrap().error, DecodeError::UnknownTag(7777));
        assert_eq!(parser.stats().error_count("NewOrderSingle"), 1);
        assert_eq!(parser.stats().error_count("Heartbeat"), 1);
    }

    #[test]
    fn test_filter_by_msgtype() {
        let mut parser = parser(ParserConfig::new("FIX44.xml").with_inclusions(["W"]));
        assert_eq!(parser.process_schema().len(), 1);
        assert!(parser.process_message(Bytes::from_static(ORDER.as_bytes())).unwrap().ignored);
        assert!(!parser.process_message(Bytes::from_static(SNAPSHOT.as_bytes())).unwrap().ignored);
    }

    #[test]
    fn test_from_config_reads_dictionary() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FIX44_SUBSET.as_bytes()).unwrap();

        let config = ParserConfig::new(file.path()).with_fix_separator(b'|');
        let mut parser = FixParser::from_config(config).unwrap();
        assert_eq!(parser.decoder().spec().version(), "FIX4.4");
        let message = parser.process_message(Bytes::from_static(ORDER.as_bytes())).unwrap();
        assert_eq!(message.name(), "NewOrderSingle");

        let config = ParserConfig::new(file.path()).with_fix_header_tags(vec![4242]);
        assert!(matches!(
            FixParser::from_config(config),
            Err(MarketcastError::Config(ConfigError::UnknownTag(4242)))
        ));
    }
}
