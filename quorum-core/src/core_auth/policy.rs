//! Primary identity gate: per-action role and ownership checks
//!
//! Free functions so call sites read as the rule they enforce. Every
//! check takes the identity explicitly; nothing here reads ambient
//! state.

use super::errors::{AuthError, AuthResult};
use super::session::SessionStore;
use crate::core_store::model::{Answer, Identity, Question};

/// The identity from the session, or AuthRequired
pub fn require_identity(session: &SessionStore) -> AuthResult<Identity> {
    session.current().ok_or(AuthError::AuthRequired)
}

/// Banned accounts keep read access but may not write
pub fn ensure_not_banned(identity: &Identity) -> AuthResult<()> {
    if identity.role.is_banned() {
        return Err(AuthError::AuthzDenied(
            "account is banned".to_string(),
        ));
    }
    Ok(())
}

pub fn ensure_admin(identity: &Identity) -> AuthResult<()> {
    if !identity.role.is_admin() {
        return Err(AuthError::AuthzDenied(
            "admin role required".to_string(),
        ));
    }
    Ok(())
}

/// Only the question author or an admin may delete or edit a question
pub fn ensure_can_modify_question(identity: &Identity, question: &Question) -> AuthResult<()> {
    if identity.user_id == question.author_id || identity.role.is_admin() {
        return Ok(());
    }
    Err(AuthError::AuthzDenied(
        "only the author or an admin may modify this question".to_string(),
    ))
}

/// Only the answer author or an admin may delete an answer
pub fn ensure_can_delete_answer(identity: &Identity, answer: &Answer) -> AuthResult<()> {
    if identity.user_id == answer.author_id || identity.role.is_admin() {
        return Ok(());
    }
    Err(AuthError::AuthzDenied(
        "only the author or an admin may delete this answer".to_string(),
    ))
}

/// Only the question author may accept or unaccept an answer
pub fn ensure_question_author(identity: &Identity, question: &Question) -> AuthResult<()> {
    if identity.user_id == question.author_id {
        return Ok(());
    }
    Err(AuthError::AuthzDenied(
        "only the question author may accept answers".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_store::model::{Profile, Role, UserId};

    fn identity_with_role(role: Role) -> Identity {
        let mut profile = Profile::new(UserId::generate(), "someone".to_string());
        profile.role = role;
        profile.identity()
    }

    fn question_by(author: &Identity) -> Question {
        Question::new(
            "t".to_string(),
            "b".to_string(),
            vec![],
            author.user_id.clone(),
        )
    }

    #[test]
    fn test_require_identity() {
        let session = SessionStore::new();
        assert!(matches!(
            require_identity(&session),
            Err(AuthError::AuthRequired)
        ));

        session.sign_in(identity_with_role(Role::User));
        assert!(require_identity(&session).is_ok());
    }

    #[test]
    fn test_banned_cannot_write() {
        let banned = identity_with_role(Role::Banned);
        assert!(matches!(
            ensure_not_banned(&banned),
            Err(AuthError::AuthzDenied(_))
        ));
        assert!(ensure_not_banned(&identity_with_role(Role::User)).is_ok());
    }

    #[test]
    fn test_author_or_admin_may_modify_question() {
        let author = identity_with_role(Role::User);
        let question = question_by(&author);

        assert!(ensure_can_modify_question(&author, &question).is_ok());
        assert!(ensure_can_modify_question(&identity_with_role(Role::Admin), &question).is_ok());
        assert!(matches!(
            ensure_can_modify_question(&identity_with_role(Role::User), &question),
            Err(AuthError::AuthzDenied(_))
        ));
    }

    #[test]
    fn test_only_author_accepts_answers() {
        let author = identity_with_role(Role::User);
        let question = question_by(&author);

        assert!(ensure_question_author(&author, &question).is_ok());
        // Even admins may not accept on someone else's question
        assert!(matches!(
            ensure_question_author(&identity_with_role(Role::Admin), &question),
            Err(AuthError::AuthzDenied(_))
        ));
    }
}
