use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Exam {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub owner_id: i64,
}
