#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub created_at: String,
}

impl Project {
    /// Calendar date part of `created_at`, as shown on project cards.
    pub fn created_date(&self) -> &str {
        self.created_at.split('T').next().unwrap_or(&self.created_at)
    }
}

pub struct CreateProjectInput {
    pub name: String,
    pub owner_id: String,
}
