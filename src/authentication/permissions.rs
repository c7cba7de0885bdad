use crate::{schema::UserRole, session::SessionData};

const ACTION_TABLE: &[(UserRole, &[ActionType])] = &[
    (
        UserRole::User,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnInterests,
            ActionType::ManageOwnSubscriptions,
            ActionType::ManageOwnAccount,
        ],
    ),
    (
        UserRole::Admin,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnInterests,
            ActionType::ManageOwnSubscriptions,
            ActionType::ManageOwnAccount,
            ActionType::ManageCatalog,
            ActionType::ManageUsers,
        ],
    ),
];

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionType {
    CreateRecipes,

    ManageOwnRecipes,
    ManageOwnInterests,
    ManageOwnSubscriptions,
    ManageOwnAccount,

    ManageCatalog,
    ManageUsers,
}

impl ActionType {
    pub fn authenticate(self, session: &SessionData) -> bool {
        ACTION_TABLE
            .iter()
            .find_map(|(role, actions)| {
                if &session.role != role {
                    return None;
                }

                Some(actions.contains(&self))
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: UserRole) -> SessionData {
        SessionData::new(1, "someone", role)
    }

    #[test]
    fn users_cannot_touch_the_catalog() {
        let user = session(UserRole::User);
        assert!(ActionType::CreateRecipes.authenticate(&user));
        assert!(ActionType::ManageOwnInterests.authenticate(&user));
        assert!(!ActionType::ManageCatalog.authenticate(&user));
        assert!(!ActionType::ManageUsers.authenticate(&user));
    }

    #[test]
    fn admins_can_do_everything() {
        let admin = session(UserRole::Admin);
        assert!(ActionType::ManageCatalog.authenticate(&admin));
        assert!(ActionType::ManageUsers.authenticate(&admin));
        assert!(ActionType::ManageOwnSubscriptions.authenticate(&admin));
    }
}
