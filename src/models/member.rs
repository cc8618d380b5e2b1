/// Links a user to a project with the implicit "member" role.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamMember {
    pub id: String,
    pub project_id: String,
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub added_by: String,
    pub created_at: String,
}

pub struct NewTeamMember {
    pub project_id: String,
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub added_by: String,
}
