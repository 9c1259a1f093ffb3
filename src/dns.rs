pub mod codec;
pub mod error;
pub mod request;
pub mod response;
pub mod server;

pub use codec::Codec;
pub use error::Error;
pub use server::Server;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use std::borrow::Borrow;
use std::convert::Infallible;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// A complete DNS message, either a request or a reply.
///
/// The section counts of the wire header are not stored; they are always
/// derived from the length of the sections when the message is serialized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    pub id: u16,
    pub flags: Flags,
    pub question: Vec<Question>,
    pub answer: Vec<ResourceRecord>,
    pub authority: Vec<ResourceRecord>,
    pub additional: Vec<ResourceRecord>,
}

impl Message {
    /// Creates a standard query for a single question.
    pub fn query(id: u16, question: Question) -> Self {
        Self {
            id,
            question: vec![question],
            ..Self::default()
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Flags {
    pub response: bool,
    pub authoritative: bool,
    pub truncated: bool,
    pub recursion_desired: bool,
    pub recursion_available: bool,
    pub opcode: OpCode,
    pub response_code: ResponseCode,
}

bitflags! {
    /// The single-bit header flags at their position in the flags word.
    ///
    /// ```text
    /// [QR:1][Opcode:4][AA:1][TC:1][RD:1][RA:1][Z:3][RCODE:4]
    /// ```
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    struct HeaderBits: u16 {
        const QR = 0b1000_0000_0000_0000;
        const AA = 0b0000_0100_0000_0000;
        const TC = 0b0000_0010_0000_0000;
        const RD = 0b0000_0001_0000_0000;
        const RA = 0b0000_0000_1000_0000;
    }
}

const OPCODE_SHIFT: u16 = 11;
const NIBBLE: u16 = 0b1111;

/// Packs the flags into the second header word.
///
/// Opcode and response code only get four bits each, anything above 15 is
/// cut down to its lowest nibble. The Z bits are always zero.
impl From<Flags> for u16 {
    fn from(flags: Flags) -> Self {
        let mut bits = HeaderBits::empty();
        bits.set(HeaderBits::QR, flags.response);
        bits.set(HeaderBits::AA, flags.authoritative);
        bits.set(HeaderBits::TC, flags.truncated);
        bits.set(HeaderBits::RD, flags.recursion_desired);
        bits.set(HeaderBits::RA, flags.recursion_available);

        let opcode = u16::from(u8::from(flags.opcode)) & NIBBLE;
        let response_code = u16::from(flags.response_code) & NIBBLE;

        bits.bits() | (opcode << OPCODE_SHIFT) | response_code
    }
}

impl From<u16> for Flags {
    fn from(word: u16) -> Self {
        let bits = HeaderBits::from_bits_truncate(word);

        Flags {
            response: bits.contains(HeaderBits::QR),
            authoritative: bits.contains(HeaderBits::AA),
            truncated: bits.contains(HeaderBits::TC),
            recursion_desired: bits.contains(HeaderBits::RD),
            recursion_available: bits.contains(HeaderBits::RA),
            opcode: OpCode::from(((word >> OPCODE_SHIFT) & NIBBLE) as u8),
            response_code: ResponseCode::from(word & NIBBLE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub name: DomainName,
    pub qtype: QType,
    pub qclass: QClass,
}

impl Question {
    pub fn new(name: impl Into<DomainName>, qtype: QType, qclass: QClass) -> Self {
        Self {
            name: name.into(),
            qtype,
            qclass,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub name: DomainName,
    pub class: QClass,
    pub ttl: u32,
    pub data: RecordData,
}

impl ResourceRecord {
    /// The record type, as implied by the payload.
    pub fn rtype(&self) -> QType {
        self.data.rtype()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordData {
    A(Ipv4Addr),
    NS(DomainName),
    CNAME(DomainName),
    SOA(StartOfAuthority),
    PTR(DomainName),
    MX {
        preference: u16,
        exchange: DomainName,
    },
    /// Text stored like a domain name: every dot starts a new
    /// length-prefixed segment on the wire.
    TXT(String),
    SRV {
        priority: u16,
        weight: u16,
        port: u16,
        target: DomainName,
    },
    AAAA(Ipv6Addr),
    /// Payload of a type we don't interpret, kept as is.
    Unknown { rtype: QType, data: Vec<u8> },
}

impl RecordData {
    pub fn rtype(&self) -> QType {
        match *self {
            RecordData::A(..) => QType::A,
            RecordData::NS(..) => QType::NS,
            RecordData::CNAME(..) => QType::CNAME,
            RecordData::SOA(..) => QType::SOA,
            RecordData::PTR(..) => QType::PTR,
            RecordData::MX { .. } => QType::MX,
            RecordData::TXT(..) => QType::TXT,
            RecordData::SRV { .. } => QType::SRV,
            RecordData::AAAA(..) => QType::AAAA,
            RecordData::Unknown { rtype, .. } => rtype,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartOfAuthority {
    pub name: DomainName,
    pub admin: DomainName,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expiration: u32,
    pub ttl: u32,
}

/// A fully-qualified domain name in its textual form.
///
/// The name is normalized to end with a dot; the root is `"."`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub struct DomainName(String);

impl DomainName {
    pub fn root() -> Self {
        Self(".".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "."
    }

    pub(crate) fn from_labels<S: Borrow<str>>(labels: &[S]) -> Self {
        if labels.is_empty() {
            Self::root()
        } else {
            Self(format!("{}.", labels.join(".")))
        }
    }
}

impl From<String> for DomainName {
    fn from(mut name: String) -> Self {
        if !name.ends_with('.') {
            name.push('.');
        }
        Self(name)
    }
}

impl From<&str> for DomainName {
    fn from(name: &str) -> Self {
        Self::from(name.to_string())
    }
}

impl From<DomainName> for String {
    fn from(name: DomainName) -> Self {
        name.0
    }
}

impl FromStr for DomainName {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mnemonic {0:?}")]
pub struct UnknownMnemonic(pub String);

wire_enum! {
    OpCode(u8), Reserved, "OPCODE";
    Query = 0, "Query";
    IQuery = 1, "IQuery";
    Status = 2, "Status";
    Unassigned = 3, "Unassigned";
    Notify = 4, "Notify";
    Update = 5, "Update";
    /// DNS Stateful Operations (RFC 8490).
    DNS = 6, "DNS";
}

impl Default for OpCode {
    fn default() -> Self {
        OpCode::Query
    }
}

wire_enum! {
    /// Only the values up to 15 fit into the header; the rest were
    /// introduced for EDNS and TSIG and can't be sent by this server.
    ResponseCode(u16), Reserved, "RCODE";
    NoError = 0, "NoError";
    FormErr = 1, "FormErr";
    ServFail = 2, "ServFail";
    NXDomain = 3, "NXDomain";
    NotImp = 4, "NotImp";
    Refused = 5, "Refused";
    YXDomain = 6, "YXDomain";
    YXRRSet = 7, "YXRRSet";
    NXRRSet = 8, "NXRRSet";
    NotAuth = 9, "NotAuth";
    NotZone = 10, "NotZone";
    DSOTypeNI = 11, "DSOTYPENI";
    /// Shares its code with BADSIG.
    BadVers = 16, "BADVERS" | "BADSIG";
    BadKey = 17, "BADKEY";
    BadTime = 18, "BADTIME";
    BadMode = 19, "BADMODE";
    BadName = 20, "BADNAME";
    BadAlg = 21, "BADALG";
    BadTrunc = 22, "BADTRUNC";
    BadCookie = 23, "BADCOOKIE";
}

impl Default for ResponseCode {
    fn default() -> Self {
        ResponseCode::NoError
    }
}

wire_enum! {
    QType(u16), Reserved, "TYPE";
    A = 1, "A";
    NS = 2, "NS";
    //NOTE: 3 and 4 Obsolete
    CNAME = 5, "CNAME";
    SOA = 6, "SOA";
    PTR = 12, "PTR";
    MX = 15, "MX";
    TXT = 16, "TXT";
    AAAA = 28, "AAAA";
    SRV = 33, "SRV";
    ANY = 255, "ANY" | "*";
}

wire_enum! {
    QClass(u16), Reserved, "CLASS";
    IN = 1, "IN";
    CS = 2, "CS";
    CH = 3, "CH";
    HS = 4, "HS";
}
