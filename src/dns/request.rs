use crate::dns::{Message, Question};

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Query(Query),
    /// The message is a response itself or asks nothing. It is answered
    /// with FORMERR, echoing the first question if there is one.
    Invalid {
        id: u16,
        question: Option<Question>,
    },
}

/// A query reduced to what gets answered: the first question.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub id: u16,
    pub question: Question,
}

impl From<Message> for Request {
    fn from(msg: Message) -> Self {
        let id = msg.id;
        let is_response = msg.flags.response;
        let question = msg.question.into_iter().next();

        match question {
            Some(question) if !is_response => Request::Query(Query { id, question }),
            question => Request::Invalid { id, question },
        }
    }
}
