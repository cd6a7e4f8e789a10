use core::fmt;
use serde::Serialize;
use word_transport::Word;

/// What a register read yields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RegisterValue {
    /// Single-word registers and two-word `short` registers.
    Word(Word),
    /// Any other multi-word register, raw and in address order.
    Words(Vec<Word>),
}

impl RegisterValue {
    pub fn as_word(&self) -> Option<Word> {
        match self {
            RegisterValue::Word(w) => Some(*w),
            RegisterValue::Words(_) => None,
        }
    }

    pub fn words(&self) -> &[Word] {
        match self {
            RegisterValue::Word(w) => core::slice::from_ref(w),
            RegisterValue::Words(ws) => ws,
        }
    }
}

impl fmt::Display for RegisterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterValue::Word(w) => write!(f, "{w}"),
            RegisterValue::Words(ws) => write!(f, "{ws:?}"),
        }
    }
}
