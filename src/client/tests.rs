use super::{Session, validate_user_id};
use crate::broker::message::Message;
use crate::utils::error::CommandError;

#[test]
fn test_validate_user_id() {
    assert!(validate_user_id("alice").is_ok());
    assert!(validate_user_id("user-42").is_ok());
    assert_eq!(
        validate_user_id(""),
        Err(CommandError::InvalidUserId(String::new()))
    );
    assert!(validate_user_id("two words").is_err());
    assert!(validate_user_id("*").is_err());
}

#[test]
fn test_session_new_rejects_bad_id() {
    assert!(Session::new("bad id", 4).is_err());
}

#[test]
fn test_anonymous_session_has_id() {
    let (session, _) = Session::anonymous(4);
    assert!(session.id.starts_with("user-"));
    assert!(validate_user_id(&session.id).is_ok());
}

#[tokio::test]
async fn test_session_receives_from_mailbox() {
    let (mut session, mailbox) = Session::new("alice", 2).unwrap();
    assert!(session.try_recv().is_none());

    mailbox
        .send(Message::unicast("bob", "alice", "hello"))
        .await
        .unwrap();
    assert_eq!(session.recv().await.unwrap().content, "hello");

    drop(mailbox);
    assert!(session.recv().await.is_none());
}
