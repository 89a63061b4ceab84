use serde::{Deserialize, Serialize};

pub type ContextId = i64;

/// Permission scope that objects such as labels may belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub id: ContextId,
    pub name: String,
}

impl Context {
    pub fn new(id: ContextId, name: String) -> Self {
        Self { id, name }
    }
}
