use super::*;
use crate::core::store::test_store;

fn record(id: &str, agent_type: &str) -> AgentRecord {
    AgentRecord {
        id: id.to_string(),
        project_id: "p".to_string(),
        name: format!("agent {}", id),
        agent_type: agent_type.to_string(),
        system_prompt: format!("prompt {}", id),
        is_default: false,
        created_at: String::new(),
        updated_at: String::new(),
    }
}

async fn project(store: &CouncilStore) -> String {
    store
        .create_project("owner", "Atlas", None, None)
        .await
        .unwrap()
        .id
}

fn draft(name: &str, agent_type: &str) -> AgentDraft {
    AgentDraft {
        name: name.to_string(),
        agent_type: agent_type.to_string(),
        system_prompt: "Look closely.".to_string(),
    }
}

#[test]
fn roles_follow_the_type_tag() {
    assert_eq!(
        AgentRole::of(AgentKind::CeoCpo, "x"),
        AgentRole::Synthesis("x".to_string())
    );
    for kind in AgentKind::ALL.into_iter().filter(|k| !k.is_synthesis()) {
        assert!(matches!(AgentRole::of(kind, "x"), AgentRole::Analysis(_)));
    }
}

#[test]
fn roster_splits_analysts_from_synthesis() {
    let roster = Roster::from_records(&[
        record("1", "marketing"),
        record("2", "ceo_cpo"),
        record("3", "custom"),
    ])
    .unwrap();
    assert_eq!(roster.analysts.len(), 2);
    assert_eq!(roster.analysts[1].kind, AgentKind::Custom);
    assert_eq!(roster.require_synthesis().unwrap().id, "2");
}

#[test]
fn roster_rejects_two_synthesis_agents() {
    let err = Roster::from_records(&[record("1", "ceo_cpo"), record("2", "ceo_cpo")]).unwrap_err();
    assert!(matches!(err, CouncilError::Configuration(_)));
}

#[test]
fn roster_rejects_unknown_tags() {
    let err = Roster::from_records(&[record("1", "astrologer")]).unwrap_err();
    assert!(matches!(err, CouncilError::Configuration(_)));
}

#[test]
fn empty_roster_reports_missing_pieces() {
    let roster = Roster::from_records(&[]).unwrap();
    assert!(matches!(
        roster.require_analysts(),
        Err(CouncilError::Configuration(_))
    ));
    assert!(matches!(
        roster.require_synthesis(),
        Err(CouncilError::Configuration(_))
    ));
}

#[tokio::test]
async fn seeding_inserts_seven_defaults_once() {
    let store = test_store();
    let pid = project(&store).await;
    let rows = seed_defaults(&store, &pid).await.unwrap();
    assert_eq!(rows.len(), 7);
    assert!(rows.iter().all(|r| r.is_default));
    assert_eq!(
        rows.iter().filter(|r| r.agent_type == "ceo_cpo").count(),
        1
    );
    assert_eq!(rows[0].name, "User Persona Agent");

    let again = seed_defaults(&store, &pid).await.unwrap_err();
    assert!(matches!(again, CouncilError::Validation(_)));

    let roster = Roster::load(&store, &pid).await.unwrap();
    assert_eq!(roster.analysts.len(), 6);
}

#[tokio::test]
async fn second_synthesis_agent_is_refused() {
    let store = test_store();
    let pid = project(&store).await;
    create_agent(&store, &pid, &draft("Boss", "ceo_cpo"))
        .await
        .unwrap();
    let err = create_agent(&store, &pid, &draft("Boss 2", "ceo_cpo"))
        .await
        .unwrap_err();
    assert!(matches!(err, CouncilError::Validation(_)));

    let custom = create_agent(&store, &pid, &draft("Helper", "custom"))
        .await
        .unwrap();
    let err = update_agent(
        &store,
        &custom,
        &AgentPatch {
            agent_type: Some("ceo_cpo".into()),
            ..AgentPatch::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CouncilError::Validation(_)));
}

#[tokio::test]
async fn create_validates_fields() {
    let store = test_store();
    let pid = project(&store).await;
    assert!(matches!(
        create_agent(&store, &pid, &draft("  ", "custom")).await,
        Err(CouncilError::Validation(_))
    ));
    assert!(matches!(
        create_agent(&store, &pid, &draft("X", "wizard")).await,
        Err(CouncilError::Validation(_))
    ));
}

#[tokio::test]
async fn default_agents_keep_their_type_and_existence() {
    let store = test_store();
    let pid = project(&store).await;
    let rows = seed_defaults(&store, &pid).await.unwrap();
    let designer = rows.iter().find(|r| r.agent_type == "designer").unwrap();

    let renamed = update_agent(
        &store,
        designer,
        &AgentPatch {
            name: Some("UX Lead".into()),
            agent_type: Some("designer".into()),
            ..AgentPatch::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(renamed.name, "UX Lead");

    let err = update_agent(
        &store,
        designer,
        &AgentPatch {
            agent_type: Some("custom".into()),
            ..AgentPatch::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CouncilError::Validation(_)));

    assert!(matches!(
        delete_agent(&store, designer).await,
        Err(CouncilError::Validation(_))
    ));

    let custom = create_agent(&store, &pid, &draft("Temp", "custom"))
        .await
        .unwrap();
    delete_agent(&store, &custom).await.unwrap();
    assert!(store.get_agent(&custom.id).await.unwrap().is_none());
}
