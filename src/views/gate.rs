use crate::backend::Backend;
use crate::models::Session;

/// Where unauthenticated visitors are sent.
pub const LOGIN: &str = "/login";

#[derive(Debug, Clone, PartialEq)]
pub enum Access {
    Granted(Session),
    Redirect(&'static str),
}

/// Guards protected views behind a live session.
pub struct AuthGate;

impl AuthGate {
    pub async fn check<B: Backend>(backend: &B) -> Access {
        match backend.get_session().await {
            Ok(Some(session)) => Access::Granted(session),
            Ok(None) => Access::Redirect(LOGIN),
            Err(e) => {
                tracing::warn!("session check failed: {e}");
                Access::Redirect(LOGIN)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::testing::{sign_in_as, test_backend};

    #[tokio::test]
    async fn test_redirects_without_session() {
        let (backend, _dir) = test_backend();
        assert_eq!(AuthGate::check(&backend).await, Access::Redirect(LOGIN));
    }

    #[tokio::test]
    async fn test_grants_with_session() {
        let (mut backend, _dir) = test_backend();
        let user = sign_in_as(&mut backend, "ada@example.com").await;

        match AuthGate::check(&backend).await {
            Access::Granted(session) => assert_eq!(session.user, user),
            other => panic!("expected access, got {other:?}"),
        }

        backend.sign_out().await.unwrap();
        assert_eq!(AuthGate::check(&backend).await, Access::Redirect(LOGIN));
    }
}
