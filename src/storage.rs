use std::{
    collections::HashMap,
    fmt::Display,
    net::{Ipv4Addr, Ipv6Addr},
    str::{FromStr, SplitWhitespace},
};

use async_trait::async_trait;
use bytes::BytesMut;
use serde::{Deserialize, Serialize};

use crate::dns::{self, DomainName, QClass, QType, RecordData, ResourceRecord, StartOfAuthority};
use crate::serializer;

#[derive(Debug, thiserror::Error)]
#[error("record lookup failed: {0}")]
pub struct LookupError(pub String);

/// Where the server takes its answers from.
#[async_trait]
pub trait Lookup: Send + Sync {
    /// Returns all records stored for `name` with type mnemonic `rtype`.
    /// `ANY` and `*` match records of every type.
    async fn lookup(&self, name: &str, rtype: &str) -> Result<Vec<ResourceRecord>, LookupError>;
}

/// A record as it is configured, with its payload in presentation format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordEntry {
    pub name: DomainName,
    #[serde(rename = "type")]
    pub rtype: String,
    #[serde(default = "default_class")]
    pub class: String,
    pub ttl: u32,
    pub data: String,
}

fn default_class() -> String {
    QClass::IN.to_string()
}

/// In-memory record table, looked up by case-insensitive name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Storage {
    records: HashMap<String, Vec<RecordEntry>>,
}

impl Storage {
    pub fn new(entries: Vec<RecordEntry>) -> Self {
        let mut records: HashMap<String, Vec<RecordEntry>> = HashMap::new();
        for entry in entries {
            records
                .entry(storage_key(entry.name.as_str()))
                .or_default()
                .push(entry);
        }

        Self { records }
    }

    pub fn get(&self, name: &str) -> &[RecordEntry] {
        self.records
            .get(&storage_key(name))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn storage_key(name: &str) -> String {
    DomainName::from(name).as_str().to_ascii_lowercase()
}

#[async_trait]
impl Lookup for Storage {
    async fn lookup(&self, name: &str, rtype: &str) -> Result<Vec<ResourceRecord>, LookupError> {
        let any = QType::from_mnemonic(rtype) == Some(QType::ANY);

        let records = self
            .get(name)
            .iter()
            .filter(|entry| any || entry.rtype.eq_ignore_ascii_case(rtype))
            .filter_map(|entry| match ResourceRecord::try_from(entry) {
                Ok(record) => Some(record),
                Err(err) => {
                    log::warn!(
                        "Skipping {} record of {}: {}",
                        entry.rtype,
                        entry.name,
                        err
                    );
                    None
                }
            })
            .collect();

        Ok(records)
    }
}

impl TryFrom<&RecordEntry> for ResourceRecord {
    type Error = dns::Error;

    fn try_from(entry: &RecordEntry) -> Result<Self, Self::Error> {
        let rtype = QType::from_str(&entry.rtype).map_err(malformed)?;
        let class = QClass::from_str(&entry.class).map_err(malformed)?;
        let record = ResourceRecord {
            name: entry.name.clone(),
            class,
            ttl: entry.ttl,
            data: record_data(rtype, &entry.data)?,
        };

        // a record that can't be put on the wire would fail the whole reply
        serializer::write_record(&mut BytesMut::new(), &record)?;

        Ok(record)
    }
}

fn malformed(err: impl Display) -> dns::Error {
    dns::Error::MalformedRecord(err.to_string())
}

fn record_data(rtype: QType, data: &str) -> Result<RecordData, dns::Error> {
    let mut fields = Fields(data.split_whitespace());

    let data = match rtype {
        QType::A => RecordData::A(fields.next::<Ipv4Addr>()?),
        QType::AAAA => RecordData::AAAA(fields.next::<Ipv6Addr>()?),
        QType::NS => RecordData::NS(fields.next()?),
        QType::CNAME => RecordData::CNAME(fields.next()?),
        QType::PTR => RecordData::PTR(fields.next()?),
        QType::MX => RecordData::MX {
            preference: fields.next()?,
            exchange: fields.next()?,
        },
        QType::SRV => RecordData::SRV {
            priority: fields.next()?,
            weight: fields.next()?,
            port: fields.next()?,
            target: fields.next()?,
        },
        QType::SOA => RecordData::SOA(StartOfAuthority {
            name: fields.next()?,
            admin: fields.next()?,
            serial: fields.next()?,
            refresh: fields.next()?,
            retry: fields.next()?,
            expiration: fields.next()?,
            ttl: fields.next()?,
        }),
        // text is taken verbatim, spaces included
        QType::TXT => return Ok(RecordData::TXT(data.to_string())),
        QType::ANY | QType::Reserved(_) => {
            return Err(dns::Error::MalformedRecord(format!(
                "no data format known for type {}",
                rtype
            )))
        }
    };

    match fields.0.next() {
        Some(extra) => Err(dns::Error::MalformedRecord(format!(
            "unexpected trailing field {:?}",
            extra
        ))),
        None => Ok(data),
    }
}

struct Fields<'a>(SplitWhitespace<'a>);

impl Fields<'_> {
    fn next<T>(&mut self) -> Result<T, dns::Error>
    where
        T: FromStr,
        T::Err: Display,
    {
        let field = self
            .0
            .next()
            .ok_or_else(|| dns::Error::MalformedRecord("missing field".to_string()))?;

        field.parse().map_err(|err| {
            dns::Error::MalformedRecord(format!("invalid field {:?}: {}", field, err))
        })
    }
}
