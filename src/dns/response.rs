use crate::dns::{request::Query, Flags, Message, OpCode, Question, ResourceRecord, ResponseCode};

/// The outcome for one request, before it becomes a wire message.
///
/// Only the fields that vary between replies are kept here; the header flags
/// are filled in when converting into a [`Message`].
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub id: u16,
    pub response_code: ResponseCode,
    pub question: Option<Question>,
    pub answer: Vec<ResourceRecord>,
}

impl Response {
    pub fn format_error(id: u16, question: Option<Question>) -> Self {
        Self {
            id,
            response_code: ResponseCode::FormErr,
            question,
            answer: vec![],
        }
    }

    pub fn server_failure(query: Query) -> Self {
        Self {
            id: query.id,
            response_code: ResponseCode::ServFail,
            question: Some(query.question),
            answer: vec![],
        }
    }

    /// Answers with the records exactly as found, or NXDOMAIN when there
    /// are none.
    pub fn answer(query: Query, answer: Vec<ResourceRecord>) -> Self {
        let response_code = if answer.is_empty() {
            ResponseCode::NXDomain
        } else {
            ResponseCode::NoError
        };

        Self {
            id: query.id,
            response_code,
            question: Some(query.question),
            answer,
        }
    }
}

impl From<Response> for Message {
    fn from(response: Response) -> Self {
        Message {
            id: response.id,
            flags: Flags {
                response: true,
                opcode: OpCode::Query,
                response_code: response.response_code,
                ..Flags::default()
            },
            question: response.question.into_iter().collect(),
            answer: response.answer,
            authority: vec![],
            additional: vec![],
        }
    }
}
