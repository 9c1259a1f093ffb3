use bytes::{BufMut, BytesMut};

use crate::dns::{DomainName, Error, Message, Question, RecordData, ResourceRecord};

/// Encodes a complete DNS message.
///
/// Section counts are taken from the section lengths. Names are always
/// written in full, no compression pointers are produced.
pub fn dns_message(message: &Message) -> Result<BytesMut, Error> {
    let mut buf = BytesMut::with_capacity(512);

    buf.put_u16(message.id);
    buf.put_u16(message.flags.into());
    buf.put_u16(section_len("question", message.question.len())?);
    buf.put_u16(section_len("answer", message.answer.len())?);
    buf.put_u16(section_len("authority", message.authority.len())?);
    buf.put_u16(section_len("additional", message.additional.len())?);

    for question in &message.question {
        write_question(&mut buf, question)?;
    }

    let records = message
        .answer
        .iter()
        .chain(&message.authority)
        .chain(&message.additional);
    for record in records {
        write_record(&mut buf, record)?;
    }

    Ok(buf)
}

fn section_len(section: &'static str, len: usize) -> Result<u16, Error> {
    u16::try_from(len).map_err(|_| Error::SectionOverflow { section, len })
}

/// Writes `text` as a sequence of length-prefixed labels.
///
/// With `finalise` a missing trailing dot is added, so the sequence ends
/// with the zero octet of the root label. Without it the text is written
/// exactly as split on its dots, which is how TXT data goes on the wire.
pub fn write_labels(buf: &mut BytesMut, text: &str, finalise: bool) -> Result<(), Error> {
    if text.is_empty() || (finalise && text == ".") {
        buf.put_u8(0);
        return Ok(());
    }

    let text = if finalise && !text.ends_with('.') {
        format!("{}.", text)
    } else {
        text.to_string()
    };

    let labels: Vec<&str> = text.split('.').collect();
    let last = labels.len() - 1;
    for (i, label) in labels.into_iter().enumerate() {
        if label.is_empty() && i != last {
            return Err(Error::MalformedRecord(format!("empty label in {:?}", text)));
        }

        let len = u8::try_from(label.len()).map_err(|_| {
            Error::MalformedRecord(format!(
                "label of {} bytes in {:?} does not fit a length octet",
                label.len(),
                text
            ))
        })?;
        buf.put_u8(len);
        buf.put_slice(label.as_bytes());
    }

    Ok(())
}

pub fn write_name(buf: &mut BytesMut, name: &DomainName) -> Result<(), Error> {
    write_labels(buf, name.as_str(), true)
}

pub fn write_question(buf: &mut BytesMut, question: &Question) -> Result<(), Error> {
    write_name(buf, &question.name)?;
    buf.put_u16(question.qtype.into());
    buf.put_u16(question.qclass.into());

    Ok(())
}

/// Writes one record. The payload goes through a scratch buffer of its own
/// since its length has to precede it.
pub fn write_record(buf: &mut BytesMut, record: &ResourceRecord) -> Result<(), Error> {
    let mut rdata = BytesMut::new();
    write_record_data(&mut rdata, &record.data)?;
    let rdlength = u16::try_from(rdata.len()).map_err(|_| {
        Error::MalformedRecord(format!(
            "record data of {} bytes for {} exceeds the RDLENGTH field",
            rdata.len(),
            record.name
        ))
    })?;

    write_name(buf, &record.name)?;
    buf.put_u16(record.rtype().into());
    buf.put_u16(record.class.into());
    buf.put_u32(record.ttl);
    buf.put_u16(rdlength);
    buf.put(rdata);

    Ok(())
}

fn write_record_data(buf: &mut BytesMut, data: &RecordData) -> Result<(), Error> {
    match data {
        RecordData::A(addr) => buf.put_slice(&addr.octets()),
        RecordData::NS(name) | RecordData::CNAME(name) | RecordData::PTR(name) => {
            write_name(buf, name)?
        }
        RecordData::SOA(soa) => {
            write_name(buf, &soa.name)?;
            write_name(buf, &soa.admin)?;
            buf.put_u32(soa.serial);
            buf.put_u32(soa.refresh);
            buf.put_u32(soa.retry);
            buf.put_u32(soa.expiration);
            buf.put_u32(soa.ttl);
        }
        RecordData::MX {
            preference,
            exchange,
        } => {
            buf.put_u16(*preference);
            write_name(buf, exchange)?;
        }
        RecordData::TXT(text) => write_labels(buf, text, false)?,
        RecordData::SRV {
            priority,
            weight,
            port,
            target,
        } => {
            buf.put_u16(*priority);
            buf.put_u16(*weight);
            buf.put_u16(*port);
            write_name(buf, target)?;
        }
        RecordData::AAAA(addr) => buf.put_slice(&addr.octets()),
        RecordData::Unknown { data, .. } => buf.put_slice(data),
    }

    Ok(())
}
