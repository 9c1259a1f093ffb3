use std::borrow::Cow;
use std::net::{Ipv4Addr, Ipv6Addr};

use nom::{
    branch::alt,
    bytes::complete::{tag, take},
    combinator::{eof, map},
    error::{ErrorKind, ParseError},
    multi::{count, many_till},
    number::complete::{be_u128, be_u16, be_u32, be_u8},
    sequence::tuple,
    IResult,
};

use crate::dns::{
    self, DomainName, Flags, Message, QType, Question, RecordData, ResourceRecord,
    StartOfAuthority,
};

/// The zero length octet ending every name.
const ROOT: &[u8] = &[0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The input ended before a field could be read.
    Incomplete,
    /// A length or payload doesn't fit the bytes around it.
    Malformed(&'static str),
}

impl<I> ParseError<I> for Error {
    fn from_error_kind(_input: I, _kind: ErrorKind) -> Self {
        // every parser used here works on complete input, so a failing
        // primitive always means we ran out of bytes
        Error::Incomplete
    }

    fn append(_input: I, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

type ParseResult<'a, T> = IResult<&'a [u8], T, Error>;

fn malformed(reason: &'static str) -> nom::Err<Error> {
    nom::Err::Failure(Error::Malformed(reason))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Counts {
    question: u16,
    answer: u16,
    authority: u16,
    additional: u16,
}

fn dns_header(input: &[u8]) -> ParseResult<'_, (u16, Flags, Counts)> {
    let (input, (id, flags, question, answer, authority, additional)) =
        tuple((be_u16, be_u16, be_u16, be_u16, be_u16, be_u16))(input)?;

    Ok((
        input,
        (
            id,
            Flags::from(flags),
            Counts {
                question,
                answer,
                authority,
                additional,
            },
        ),
    ))
}

/// A single length-prefixed label.
///
/// The two upper bits of the length are not treated specially, so a
/// compression pointer shows up as an (invalid) oversized length. Bytes
/// that aren't UTF-8 are replaced rather than rejected.
fn dns_label(input: &[u8]) -> ParseResult<'_, Cow<'_, str>> {
    let (input, length) = be_u8(input)?;
    if usize::from(length) > input.len() {
        return Err(malformed("label length exceeds the remaining buffer"));
    }

    let (input, label) = take(length)(input)?;
    Ok((input, String::from_utf8_lossy(label)))
}

/// Implemented as described in [RFC 1035](https://tools.ietf.org/html/rfc1035#section-3.1),
/// without the message compression of section 4.1.4.
fn dns_name(input: &[u8]) -> ParseResult<'_, DomainName> {
    let (input, (labels, _)) = many_till(dns_label, tag(ROOT))(input)?;

    Ok((input, DomainName::from_labels(&labels)))
}

/// TXT data is written like a name that isn't finalised: its segments may
/// run up to the end of the record instead of a zero octet.
fn dns_text(input: &[u8]) -> ParseResult<'_, String> {
    let (input, (labels, end)) = many_till(dns_label, alt((tag(ROOT), eof)))(input)?;

    let mut text = labels.join(".");
    if !labels.is_empty() && !end.is_empty() {
        text.push('.');
    }

    Ok((input, text))
}

fn dns_question(input: &[u8]) -> ParseResult<'_, Question> {
    let (input, (name, qtype, qclass)) = tuple((dns_name, be_u16, be_u16))(input)?;

    Ok((
        input,
        Question {
            name,
            qtype: qtype.into(),
            qclass: qclass.into(),
        },
    ))
}

fn start_of_authority(input: &[u8]) -> ParseResult<'_, StartOfAuthority> {
    let (input, (name, admin, serial, refresh, retry, expiration, ttl)) = tuple((
        dns_name, dns_name, be_u32, be_u32, be_u32, be_u32, be_u32,
    ))(input)?;

    Ok((
        input,
        StartOfAuthority {
            name,
            admin,
            serial,
            refresh,
            retry,
            expiration,
            ttl,
        },
    ))
}

/// Parses the payload of a record, `rdata` being exactly the bytes covered
/// by its RDLENGTH. Bytes left over after the known fields are ignored.
fn record_data(rtype: QType, rdata: &[u8]) -> Result<RecordData, nom::Err<Error>> {
    let parsed = match rtype {
        QType::A => map(be_u32, |addr| RecordData::A(Ipv4Addr::from(addr)))(rdata),
        QType::NS => map(dns_name, RecordData::NS)(rdata),
        QType::CNAME => map(dns_name, RecordData::CNAME)(rdata),
        QType::SOA => map(start_of_authority, RecordData::SOA)(rdata),
        QType::PTR => map(dns_name, RecordData::PTR)(rdata),
        QType::MX => map(tuple((be_u16, dns_name)), |(preference, exchange)| {
            RecordData::MX {
                preference,
                exchange,
            }
        })(rdata),
        QType::TXT => map(dns_text, RecordData::TXT)(rdata),
        QType::SRV => map(
            tuple((be_u16, be_u16, be_u16, dns_name)),
            |(priority, weight, port, target)| RecordData::SRV {
                priority,
                weight,
                port,
                target,
            },
        )(rdata),
        QType::AAAA => map(be_u128, |addr| RecordData::AAAA(Ipv6Addr::from(addr)))(rdata),
        QType::ANY | QType::Reserved(_) => Ok((
            &rdata[rdata.len()..],
            RecordData::Unknown {
                rtype,
                data: rdata.to_vec(),
            },
        )),
    };

    // the payload is a buffer of its own, running out of it means the
    // record lied about its length rather than the message being cut off
    parsed.map(|(_, data)| data).map_err(|err| match err {
        nom::Err::Error(Error::Malformed(reason)) | nom::Err::Failure(Error::Malformed(reason)) => {
            malformed(reason)
        }
        _ => malformed("record data is shorter than its type requires"),
    })
}

fn dns_resource_record(input: &[u8]) -> ParseResult<'_, ResourceRecord> {
    let (input, (name, rtype, class, ttl, rdlength)) =
        tuple((dns_name, be_u16, be_u16, be_u32, be_u16))(input)?;
    let (input, rdata) = take(rdlength)(input)?;
    let data = record_data(QType::from(rtype), rdata)?;

    Ok((
        input,
        ResourceRecord {
            name,
            class: class.into(),
            ttl,
            data,
        },
    ))
}

fn dns_message_parser(input: &[u8]) -> ParseResult<'_, Message> {
    let (input, (id, flags, counts)) = dns_header(input)?;
    let (input, question) = count(dns_question, counts.question.into())(input)?;
    let (input, answer) = count(dns_resource_record, counts.answer.into())(input)?;
    let (input, authority) = count(dns_resource_record, counts.authority.into())(input)?;
    let (input, additional) = count(dns_resource_record, counts.additional.into())(input)?;

    Ok((
        input,
        Message {
            id,
            flags,
            question,
            answer,
            authority,
            additional,
        },
    ))
}

/// Decodes one complete DNS message.
///
/// Bytes following the last announced record are ignored.
pub fn dns_message(input: &[u8]) -> Result<Message, dns::Error> {
    match dns_message_parser(input) {
        Ok((_, message)) => Ok(message),
        Err(nom::Err::Incomplete(_))
        | Err(nom::Err::Error(Error::Incomplete))
        | Err(nom::Err::Failure(Error::Incomplete)) => Err(dns::Error::TruncatedMessage),
        Err(nom::Err::Error(Error::Malformed(reason)))
        | Err(nom::Err::Failure(Error::Malformed(reason))) => {
            Err(dns::Error::MalformedRecord(reason.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    // Note this useful idiom: importing names from outer (for mod tests) scope.
    use super::*;
    use crate::dns::{OpCode, QClass, ResponseCode};

    const RAW_HEADER: &[u8] = b"\x66\xf3\x01\x00\x00\x01\x00\x00\x00\x00\x00\x00";

    #[test]
    fn test_parse_id() {
        let (_, (id, flags, _)) = dns_header(RAW_HEADER).unwrap();

        assert_eq!(id, 26355);
        assert_eq!(flags.opcode, OpCode::Query);
    }

    #[test]
    fn test_parse_flags() {
        let (_, (_, flags, _)) = dns_header(RAW_HEADER).unwrap();

        assert!(!flags.response);
        assert!(!flags.truncated);
        assert!(flags.recursion_desired);
        assert!(!flags.recursion_available);
        assert_eq!(flags.response_code, ResponseCode::NoError);
    }

    #[test]
    fn test_parse_counts() {
        let (_, (_, _, counts)) = dns_header(RAW_HEADER).unwrap();

        assert_eq!(counts.question, 1);
        assert_eq!(counts.answer, 0);
        assert_eq!(counts.authority, 0);
        assert_eq!(counts.additional, 0);
    }

    #[test]
    fn test_parse_hyphen_label() {
        let (_, label) = dns_label(b"\x0Btest-hyphen").unwrap();

        assert_eq!(label, "test-hyphen");
    }

    #[test]
    fn test_parse_name() {
        let (rem, name) = dns_name(b"\x07example\x03com\x00").unwrap();

        assert!(rem.is_empty());
        assert_eq!(name.as_str(), "example.com.");
    }

    #[test]
    fn test_parse_label_with_invalid_utf8() {
        let (rem, label) = dns_label(b"\x03w\xffw\x00").unwrap();

        assert_eq!(rem, b"\x00");
        assert_eq!(label, "w\u{fffd}w");
    }

    #[test]
    fn test_query_with_invalid_utf8_name_decodes() {
        let raw = b"\x00\x2a\x01\x00\x00\x01\x00\x00\x00\x00\x00\x00\x03w\xffw\x07example\x03com\x00\x00\x01\x00\x01";

        let message = dns_message(raw).unwrap();

        assert_eq!(message.id, 42);
        assert_eq!(message.question[0].name.as_str(), "w\u{fffd}w.example.com.");
        assert_eq!(message.question[0].qtype, QType::A);
    }

    #[test]
    fn test_parse_root_name() {
        let (_, name) = dns_name(b"\x00").unwrap();

        assert!(name.is_root());
    }

    #[test]
    fn test_label_longer_than_buffer_is_malformed() {
        let err = dns_name(b"\x04te").unwrap_err();

        assert!(matches!(err, nom::Err::Failure(Error::Malformed(_))));
    }

    #[test]
    fn test_compression_pointer_is_read_as_length() {
        let err = dns_name(b"\x03www\xc0\x0c").unwrap_err();

        assert!(matches!(err, nom::Err::Failure(Error::Malformed(_))));
    }

    #[test]
    fn test_unterminated_name_is_incomplete() {
        let err = dns_name(b"\x03www").unwrap_err();

        assert_eq!(err, nom::Err::Error(Error::Incomplete));
    }

    #[test]
    fn test_parse_question() {
        let raw_question = b"\x04\x74\x65\x73\x74\x03\x64\x79\x6e\x07\x65\x78\x61\x6d\x70\x6c\x65\x03\x63\x6f\x6d\x00\x00\x01\x00\x01";

        let (_, question) = dns_question(raw_question).unwrap();

        assert_eq!(question.name.as_str(), "test.dyn.example.com.");
        assert_eq!(question.qtype, QType::A);
        assert_eq!(question.qclass, QClass::IN);
    }

    #[test]
    fn test_parse_standard_query() {
        let raw_data = b"\xf4\x4c\x01\x00\x00\x01\x00\x00\x00\x00\x00\x00\x04\x74\x65\x73\x74\x03\x64\x79\x6e\x07\x65\x78\x61\x6d\x70\x6c\x65\x03\x63\x6f\x6d\x00\x00\x01\x00\x01";

        let message = dns_message(raw_data).unwrap();

        assert_eq!(message.id, 0xf44c);
        assert_eq!(message.question.len(), 1);
        assert!(message.answer.is_empty());
        assert!(message.authority.is_empty());
        assert!(message.additional.is_empty());
    }

    #[test]
    fn test_short_header_is_truncated() {
        let err = dns_message(&RAW_HEADER[..11]).unwrap_err();

        assert!(matches!(err, dns::Error::TruncatedMessage));
    }

    #[test]
    fn test_missing_question_is_truncated() {
        let err = dns_message(RAW_HEADER).unwrap_err();

        assert!(matches!(err, dns::Error::TruncatedMessage));
    }

    #[test]
    fn test_parse_a_record() {
        let raw = b"\x03www\x00\x00\x01\x00\x01\x00\x00\x01\x2c\x00\x04\x0b\x0c\x0d\x0e";

        let (rem, record) = dns_resource_record(raw).unwrap();

        assert!(rem.is_empty());
        assert_eq!(record.name.as_str(), "www.");
        assert_eq!(record.ttl, 300);
        assert_eq!(record.data, RecordData::A(Ipv4Addr::new(11, 12, 13, 14)));
    }

    #[test]
    fn test_parse_aaaa_record() {
        let raw = b"\x00\x00\x1c\x00\x01\x00\x00\x00\x3c\x00\x10\
                    \x20\x01\x0d\xb8\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x01";

        let (_, record) = dns_resource_record(raw).unwrap();

        match record.data {
            RecordData::AAAA(addr) => assert_eq!(addr.to_string(), "2001:db8::1"),
            data => panic!("unexpected record data {:?}", data),
        }
    }

    #[test]
    fn test_parse_mx_record() {
        let raw = b"\x00\x00\x0f\x00\x01\x00\x00\x00\x3c\x00\x0b\x00\x0a\x04mail\x02io\x00";

        let (_, record) = dns_resource_record(raw).unwrap();

        assert_eq!(
            record.data,
            RecordData::MX {
                preference: 10,
                exchange: DomainName::from("mail.io"),
            }
        );
    }

    #[test]
    fn test_parse_txt_without_terminator() {
        let (_, text) = dns_text(b"\x05hello\x05world").unwrap();

        assert_eq!(text, "hello.world");
    }

    #[test]
    fn test_short_record_data_is_malformed() {
        // an A record with only three address bytes
        let raw = b"\x00\x00\x01\x00\x01\x00\x00\x00\x3c\x00\x03\x0b\x0c\x0d";

        let err = dns_resource_record(raw).unwrap_err();

        assert!(matches!(err, nom::Err::Failure(Error::Malformed(_))));
    }

    #[test]
    fn test_unknown_type_is_kept_opaque() {
        let raw = b"\x00\x00\x63\x00\x01\x00\x00\x00\x3c\x00\x03\x01\x02\x03";

        let (_, record) = dns_resource_record(raw).unwrap();

        assert_eq!(
            record.data,
            RecordData::Unknown {
                rtype: QType::Reserved(99),
                data: vec![1, 2, 3],
            }
        );
    }

    #[test]
    fn test_record_data_past_message_end_is_truncated() {
        let mut raw = RAW_HEADER.to_vec();
        // no questions, one answer announcing more data than there is
        raw[5] = 0;
        raw[7] = 1;
        raw.extend_from_slice(b"\x00\x00\x01\x00\x01\x00\x00\x00\x3c\x00\x04\x0b");

        let err = dns_message(&raw).unwrap_err();

        assert!(matches!(err, dns::Error::TruncatedMessage));
    }
}
