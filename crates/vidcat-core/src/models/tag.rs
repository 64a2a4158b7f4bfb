use serde::{Deserialize, Serialize};

pub type TagId = i64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Tag {
    pub tag_id: TagId,
    pub tag_name: String,
}
